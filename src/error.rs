use std::{fmt, io};

/// Failures surfaced by single-item blog operations. Batch listings never
/// return these for individual items; they log and skip instead.
#[derive(Debug)]
pub enum BlogError {
    NotFound,
    Validation(String),
    Conflict,
    Configuration(String),
    Upstream(String),
    Io(io::Error),
}

impl BlogError {
    pub fn status_code(&self) -> u16 {
        match self {
            BlogError::NotFound => 404,
            BlogError::Validation(_) => 400,
            BlogError::Conflict => 409,
            BlogError::Configuration(_) | BlogError::Upstream(_) | BlogError::Io(_) => 500,
        }
    }

    /// Message safe to hand to an HTTP client.
    pub fn client_message(&self) -> String {
        match self {
            BlogError::NotFound => "Post not found".to_string(),
            BlogError::Validation(msg) => msg.clone(),
            BlogError::Conflict => "A post with this slug and language already exists".to_string(),
            BlogError::Configuration(msg) => format!("Server configuration error: {}", msg),
            BlogError::Upstream(msg) => format!("Remote storage error: {}", msg),
            BlogError::Io(_) => "Internal server error".to_string(),
        }
    }
}

impl fmt::Display for BlogError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlogError::NotFound => write!(f, "Post not found"),
            BlogError::Validation(msg) => write!(f, "Validation error: {}", msg),
            BlogError::Conflict => write!(f, "Post already exists"),
            BlogError::Configuration(msg) => write!(f, "Configuration error: {}", msg),
            BlogError::Upstream(msg) => write!(f, "Remote storage error: {}", msg),
            BlogError::Io(err) => write!(f, "IO error: {}", err),
        }
    }
}

impl std::error::Error for BlogError {}

impl From<io::Error> for BlogError {
    fn from(err: io::Error) -> Self {
        BlogError::Io(err)
    }
}

impl From<reqwest::Error> for BlogError {
    fn from(err: reqwest::Error) -> Self {
        BlogError::Upstream(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, BlogError>;
