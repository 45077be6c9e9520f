use thiserror::Error;

/// Why a match load produced nothing. Every variant leaves the deck empty;
/// the distinction only matters for the hint shown to the user and the log.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Matching service rejected the request ({status}): {body}")]
    Rejected { status: u16, body: String },

    #[error("Malformed response: {0}")]
    Malformed(String),
}

impl FetchError {
    /// Short text for the swipe screen's status line.
    pub fn hint(&self) -> &'static str {
        match self {
            FetchError::Network(_) => "Could not reach the matching service",
            FetchError::Rejected { status: 404, .. } => "Resume not found on the server",
            FetchError::Rejected { .. } => "The matching service refused the request",
            FetchError::Malformed(_) => "The matching service sent an unreadable reply",
        }
    }
}

impl From<serde_json::Error> for FetchError {
    fn from(e: serde_json::Error) -> Self {
        FetchError::Malformed(e.to_string())
    }
}
