use thiserror::Error;

/// Failures decoding a frame at the connection boundary.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("frame is not valid JSON: {0}")]
    InvalidJson(#[source] serde_json::Error),
    #[error("frame does not match any known message: {0}")]
    SchemaMismatch(#[source] serde_json::Error),
    #[error("failed to encode frame: {0}")]
    Encode(#[source] serde_json::Error),
}

/// Protocol-level rejection sent by the backend instead of a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExceptionKind {
    InvalidJson,
    NoAction,
    UnknownAction,
    NotEnoughData,
}

impl ExceptionKind {
    pub fn message(self) -> &'static str {
        match self {
            Self::InvalidJson => "Invalid JSON data",
            Self::NoAction => "No action",
            Self::UnknownAction => "Unknown action",
            Self::NotEnoughData => "Not enough data",
        }
    }
}
