use thiserror::Error;

/// Faults that abort a run.
///
/// A non-success HTTP status is not one of these: the client hands every
/// response back and the caller decides what the status means.
#[derive(Error, Debug)]
pub enum Error {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("invalid URL `{url}`: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("invalid JSON in {context}: {source}")]
    Json {
        context: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("login failed with status {status}")]
    LoginFailed {
        status: u16,
        message: Option<String>,
    },

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl Error {
    pub fn invalid_url(url: impl Into<String>, reason: impl ToString) -> Self {
        Self::InvalidUrl {
            url: url.into(),
            reason: reason.to_string(),
        }
    }

    pub fn json(context: &'static str, source: serde_json::Error) -> Self {
        Self::Json { context, source }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
