use rpc::Reply;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, LookupError>;

/// Failures of a single `getUserContact` invocation.
///
/// "Nothing matched" is not in here: it is `Ok(None)`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LookupError {
    /// Denied, restricted or revoked. Only the user can change this, in the
    /// system settings.
    #[error("No access to contacts")]
    PermissionDenied { details: Option<String> },
    #[error("Error requesting contact access: {0}")]
    PermissionError(String),
    #[error("Failed during contact enumeration")]
    EnumerationError(String),
    #[error("Unknown contact authorization status")]
    UnknownAuthorizationStatus(i64),
}

impl LookupError {
    pub fn code(&self) -> &'static str {
        match self {
            LookupError::PermissionDenied { .. } => "PERMISSION_DENIED",
            LookupError::PermissionError(_) => "PERMISSION_ERROR",
            LookupError::EnumerationError(_) => "ENUMERATION_ERROR",
            LookupError::UnknownAuthorizationStatus(_) => "UNKNOWN_STATUS",
        }
    }

    pub fn details(&self) -> Option<String> {
        match self {
            LookupError::PermissionDenied { details } => details.clone(),
            LookupError::PermissionError(description)
            | LookupError::EnumerationError(description) => {
                Some(description.clone())
            }
            LookupError::UnknownAuthorizationStatus(raw) => {
                Some(format!("raw status {}", raw))
            }
        }
    }
}

impl From<LookupError> for Reply {
    fn from(error: LookupError) -> Self {
        Reply::error(error.code(), error.to_string(), error.details())
    }
}
