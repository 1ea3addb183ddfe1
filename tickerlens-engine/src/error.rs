use thiserror::Error;

/// Errors raised at the transport boundary that feeds the engine.
///
/// The engine itself never raises: malformed payloads, unknown timeframes and
/// sentinel values are tolerated silently. `FeedError` exists for the
/// collaborators (socket consumer, snapshot fetcher) whose failures the view
/// surfaces as connection status rather than crashes.
#[derive(Debug, Clone, Eq, PartialEq, Error)]
pub enum FeedError {
    #[error("failed to parse feed frame: {0}")]
    Parse(String),

    #[error("SocketError: {0}")]
    Socket(String),

    #[error("initial position snapshot fetch failed: {0}")]
    Snapshot(String),
}

impl FeedError {
    /// Determine if an error requires the feed connection to re-initialise.
    pub fn is_terminal(&self) -> bool {
        match self {
            FeedError::Socket(error_msg) => {
                let error_lower = error_msg.to_lowercase();
                error_lower.contains("terminated")
                    || error_lower.contains("connectionclosed")
                    || error_lower.contains("alreadyclosed")
                    || error_lower.contains("io(")
                    || error_lower.contains("timeout")
            }
            FeedError::Parse(_) | FeedError::Snapshot(_) => false,
        }
    }
}

impl From<serde_json::Error> for FeedError {
    fn from(value: serde_json::Error) -> Self {
        Self::Parse(value.to_string())
    }
}
