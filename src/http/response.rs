use serde::de::DeserializeOwned;
use serde_json::Value;

#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub status_text: String,
    pub duration_ms: u64,
    pub size_bytes: usize,
    pub content_type: String,
    pub body: String,
}

impl HttpResponse {
    pub fn is_status(&self, code: u16) -> bool {
        self.status == code
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_str(&self.body)
    }

    pub fn is_json(&self) -> bool {
        self.content_type.to_ascii_lowercase().contains("json")
    }

    /// The `message` field of a JSON body, if the body is JSON and has one.
    pub fn message(&self) -> Option<String> {
        if !self.is_json() {
            return None;
        }
        let value: Value = self.json().ok()?;
        value.get("message")?.as_str().map(str::to_string)
    }
}
