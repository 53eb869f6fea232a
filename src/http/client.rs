use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Url};
use std::time::{Duration, Instant};
use tracing::debug;

use crate::error::{Error, Result};

use super::request::RequestInput;
use super::response::HttpResponse;

/// HTTP client bound to the service's base URL (e.g. `http://127.0.0.1:5000/api`).
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: Client,
    base: Url,
}

impl ApiClient {
    pub fn new(base_url: &str, timeout: Option<Duration>) -> Result<Self> {
        let mut base = Url::parse(base_url).map_err(|e| Error::invalid_url(base_url, e))?;
        if base.cannot_be_a_base() {
            return Err(Error::invalid_url(base_url, "not a base URL"));
        }
        // Relative joins replace the last segment unless the path ends in '/'.
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }

        let mut builder = Client::builder().redirect(reqwest::redirect::Policy::limited(10));
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build()?;

        Ok(Self { client, base })
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    pub fn url(&self, path: &str) -> Result<Url> {
        let relative = path.trim_start_matches('/');
        self.base
            .join(relative)
            .map_err(|e| Error::invalid_url(path, e))
    }

    /// Sends the request and returns the response whatever its status.
    ///
    /// Only transport faults (connection refused, timeout, unreadable body)
    /// surface as errors.
    pub async fn send(&self, request: RequestInput) -> Result<HttpResponse> {
        let url = self.url(&request.path)?;
        debug!(method = %request.method, %url, "sending request");

        let mut req_builder = self.client.request(request.method.into(), url);
        if let Some(token) = request.bearer.as_deref() {
            req_builder = req_builder.bearer_auth(token);
        }
        if let Some(body) = &request.body {
            req_builder = req_builder.json(body);
        }

        let started = Instant::now();
        let response = req_builder.send().await?;
        let elapsed = started.elapsed().as_millis() as u64;

        let status = response.status();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or("text/plain")
            .to_string();
        let bytes = response.bytes().await?;

        let response = HttpResponse {
            status: status.as_u16(),
            status_text: status.canonical_reason().unwrap_or("Unknown").to_string(),
            duration_ms: elapsed,
            size_bytes: bytes.len(),
            content_type,
            body: String::from_utf8_lossy(&bytes).into_owned(),
        };
        debug!(
            status = response.status,
            status_text = %response.status_text,
            duration_ms = response.duration_ms,
            size_bytes = response.size_bytes,
            content_type = %response.content_type,
            "received response"
        );
        Ok(response)
    }
}
