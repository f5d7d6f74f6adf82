use thiserror::Error;

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Missing configuration: {0} is not set")]
    MissingConfig(&'static str),

    #[error("Access denied - check that the sheet is shared and the API key is allowed: {0}")]
    AccessDenied(String),

    #[error("Spreadsheet or tab not found: {0}")]
    NotFound(String),

    #[error("Malformed request - check the spreadsheet id and API key: {0}")]
    BadRequest(String),

    #[error("Rate limited - please wait before retrying")]
    RateLimited,

    #[error("Server error ({status}): {body}")]
    Server { status: u16, body: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// Maximum length for error response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

impl FetchError {
    /// Truncate a response body to avoid carrying excessive data in messages
    fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            body.to_string()
        } else {
            format!(
                "{}... (truncated, {} total bytes)",
                &body[..MAX_ERROR_BODY_LENGTH],
                body.len()
            )
        }
    }

    pub fn from_status(status: reqwest::StatusCode, body: &str) -> Self {
        let truncated = Self::truncate_body(body);
        match status.as_u16() {
            400 => FetchError::BadRequest(truncated),
            403 => FetchError::AccessDenied(truncated),
            404 => FetchError::NotFound(truncated),
            429 => FetchError::RateLimited,
            s @ 500..=599 => FetchError::Server {
                status: s,
                body: truncated,
            },
            _ => FetchError::InvalidResponse(format!("Status {}: {}", status, truncated)),
        }
    }

    /// Whether this failure is worth retrying with backoff.
    ///
    /// Rate limiting is deliberately excluded: a 429 surfaces immediately so
    /// callers do not hammer the quota with automatic retries.
    pub fn is_transient(&self) -> bool {
        match self {
            FetchError::Server { .. } => true,
            FetchError::Network(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            _ => false,
        }
    }
}
