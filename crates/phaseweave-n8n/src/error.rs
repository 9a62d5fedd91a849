use phaseweave_core::ValidationError;
use reqwest::StatusCode;
use thiserror::Error;

/// Structured failure from the n8n API boundary.
///
/// Transport errors never escape raw: every call maps them here, and the
/// category plus [`ApiError::suggestion`] is what the user sees.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Authentication failed: the API key is invalid or expired")]
    Unauthorized,

    #[error("Access denied: the API key lacks permission for this operation")]
    Forbidden,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Connection timeout: the server did not respond in time")]
    Timeout,

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("n8n API error {status}: {detail}")]
    Server { status: u16, detail: String },

    #[error("Invalid workflow: {0}")]
    InvalidDocument(#[from] ValidationError),

    #[error("Unexpected error: {0}")]
    Unexpected(String),
}

impl ApiError {
    /// Map a non-success HTTP status to its category. Shared by every
    /// endpoint so create/update/get cannot drift apart.
    pub fn from_status(status: StatusCode, detail: String) -> Self {
        match status {
            StatusCode::UNAUTHORIZED => ApiError::Unauthorized,
            StatusCode::FORBIDDEN => ApiError::Forbidden,
            StatusCode::NOT_FOUND => ApiError::NotFound(detail),
            StatusCode::CONFLICT => ApiError::Conflict(detail),
            StatusCode::BAD_REQUEST => ApiError::BadRequest(detail),
            _ => ApiError::Server {
                status: status.as_u16(),
                detail,
            },
        }
    }

    /// Map a reqwest transport failure (no HTTP status available).
    pub fn from_transport(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ApiError::Timeout
        } else if err.is_connect() {
            ApiError::Connection(err.to_string())
        } else {
            ApiError::Unexpected(err.to_string())
        }
    }

    /// Remediation hint, surfaced to the user next to the error itself.
    pub fn suggestion(&self) -> &'static str {
        match self {
            ApiError::Unauthorized => "Create a new API key in the n8n UI (Settings → API)",
            ApiError::Forbidden => "Check the API key permissions in n8n",
            ApiError::NotFound(_) => "Check N8N_BASE_URL and verify the workflow ID exists",
            ApiError::Conflict(_) => {
                "Check for duplicate node IDs or names in the merged workflow"
            }
            ApiError::BadRequest(_) | ApiError::InvalidDocument(_) => {
                "Validate the workflow JSON structure and required fields"
            }
            ApiError::Timeout => "Check if the n8n server is running and accessible",
            ApiError::Connection(_) => "Check network connectivity, DNS, and the server URL",
            ApiError::Server { .. } | ApiError::Unexpected(_) => {
                "Check the n8n logs for more details"
            }
        }
    }
}
