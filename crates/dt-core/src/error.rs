use thiserror::Error;

#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("{program} not found; make sure Android SDK platform-tools is in PATH")]
    NotFound { program: String },
    #[error("{program} forward failed (exit code {code:?}): {stderr}")]
    Failed {
        program: String,
        code: Option<i32>,
        stderr: String,
    },
    #[error("failed to run {program}: {reason}")]
    Spawn { program: String, reason: String },
}

#[derive(Debug, Error)]
pub enum ListenError {
    #[error(
        "connection to {url} refused: is the app running and the WebSocket service enabled in its settings?"
    )]
    Refused { url: String },
    #[error("connection closed")]
    Closed,
    #[error("transport error: {reason}")]
    Transport { reason: String },
    #[error("output error: {reason}")]
    Output { reason: String },
}

impl From<std::io::Error> for ListenError {
    fn from(value: std::io::Error) -> Self {
        ListenError::Output {
            reason: value.to_string(),
        }
    }
}

#[derive(Debug, Error)]
pub enum VisionError {
    #[error("no image data to upload")]
    EmptyImage,
    #[error("request timed out")]
    Timeout,
    #[error("{url} returned HTTP {status}")]
    Status { status: u16, url: String },
    #[error("transport error: {reason}")]
    Transport { reason: String },
    #[error("invalid response body: {reason}")]
    InvalidBody { reason: String },
}
