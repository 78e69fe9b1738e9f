/// Shared error type used across all Tether crates.
///
/// Cloneable so a single failure can be fanned out to every caller waiting
/// on the same open attempt.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// Missing identity fields, unknown region, unusable runtime.
    /// Raised before any network activity and never retried.
    #[error("config: {0}")]
    Config(String),

    #[error("HTTP: {0}")]
    Http(String),

    #[error("timeout: {0}")]
    Timeout(String),

    /// A REST or routing response whose body carried an `error` field.
    #[error("server error{}: {message}", fmt_code(.code))]
    Server { code: Option<i64>, message: String },

    #[error("transport: {0}")]
    Transport(String),

    #[error("WebSocket is not ready")]
    NotReady,

    #[error("protocol: {0}")]
    Protocol(String),

    #[error("JSON: {0}")]
    Json(String),

    /// The client was closed while the operation was still pending.
    #[error("client closed")]
    Closed,
}

impl Error {
    /// Server-assigned error code, when the failure came from a response body.
    pub fn code(&self) -> Option<i64> {
        match self {
            Error::Server { code, .. } => *code,
            _ => None,
        }
    }

    /// Build a [`Error::Server`] from a decoded `{error, code}` body.
    pub fn from_body(body: &serde_json::Value) -> Option<Self> {
        let message = body.get("error")?;
        let message = match message.as_str() {
            Some(s) => s.to_owned(),
            None => message.to_string(),
        };
        Some(Error::Server {
            code: body.get("code").and_then(serde_json::Value::as_i64),
            message,
        })
    }
}

fn fmt_code(code: &Option<i64>) -> String {
    match code {
        Some(c) => format!(" ({c})"),
        None => String::new(),
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Json(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
