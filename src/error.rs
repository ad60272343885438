use thiserror::Error;

#[derive(Debug, Error)]
pub enum GradeError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),
}

pub type Result<T> = std::result::Result<T, GradeError>;

impl GradeError {
    /// Whether the caller, rather than the service, is at fault.
    pub fn is_client_error(&self) -> bool {
        matches!(self, GradeError::NotFound(_) | GradeError::InvalidInput(_))
    }

    /// HTTP-style status for request layers that need one.
    pub fn status_code(&self) -> u16 {
        match self {
            GradeError::NotFound(_) => 404,
            GradeError::InvalidInput(_) => 400,
            GradeError::StorageUnavailable(_) => 503,
        }
    }
}

impl From<sqlx::Error> for GradeError {
    fn from(e: sqlx::Error) -> Self {
        GradeError::StorageUnavailable(e.to_string())
    }
}
