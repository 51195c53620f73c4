// Client error types
use thiserror::Error;

/// Errors raised while talking to the Elpix backend
#[derive(Debug, Error)]
pub enum ClientError {
    // Transport
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    // Authentication
    #[error("No authentication token found")]
    Unauthenticated,

    #[error("Session expired, please login again: {0}")]
    SessionExpired(String),

    // Server answered with an error status; message is the server's own text
    #[error("{message}")]
    Api { status: u16, message: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // Local files: session store, uploads, downloads
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ClientError {
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        ClientError::Api {
            status,
            message: message.into(),
        }
    }

    pub fn invalid_response(message: impl Into<String>) -> Self {
        ClientError::InvalidResponse(message.into())
    }

    /// HTTP status of the failed call, when the server produced one
    pub fn status_code(&self) -> Option<u16> {
        match self {
            ClientError::Api { status, .. } => Some(*status),
            ClientError::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Authentication failures send the user back to login
    pub fn is_auth_error(&self) -> bool {
        matches!(
            self,
            ClientError::Unauthenticated | ClientError::SessionExpired(_)
        ) || self.status_code() == Some(401)
    }

    /// The server refused the credentials themselves, as opposed to being
    /// unreachable or failing
    pub fn rejects_credentials(&self) -> bool {
        matches!(self, ClientError::Api { status: 400 | 401 | 403, .. })
    }

    /// Stable code for JSON output
    pub fn error_code(&self) -> &'static str {
        match self {
            ClientError::Http(_) => "HTTP_ERROR",
            ClientError::InvalidUrl(_) => "INVALID_URL",
            ClientError::Unauthenticated => "UNAUTHENTICATED",
            ClientError::SessionExpired(_) => "SESSION_EXPIRED",
            ClientError::Api { status, .. } => match status {
                400 => "BAD_REQUEST",
                401 => "UNAUTHORIZED",
                403 => "FORBIDDEN",
                404 => "NOT_FOUND",
                409 => "CONFLICT",
                422 => "UNPROCESSABLE_ENTITY",
                429 => "TOO_MANY_REQUESTS",
                500..=599 => "SERVER_ERROR",
                _ => "API_ERROR",
            },
            ClientError::InvalidResponse(_) => "INVALID_RESPONSE",
            ClientError::Serialization(_) => "SERIALIZATION_ERROR",
            ClientError::Io(_) => "IO_ERROR",
        }
    }
}

/// Result type for client operations
pub type ClientResult<T> = Result<T, ClientError>;
