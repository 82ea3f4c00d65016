use service_core::error::AppError;
use thiserror::Error;

/// Error taxonomy for the identity core.
///
/// Security-sensitive outcomes (invalid credentials, locked accounts,
/// unknown identities) collapse into one generic caller-facing error so
/// account state cannot be enumerated. The rest carry no secret and are
/// reported precisely.
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Storage error: {0}")]
    Store(#[from] AppError),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),

    #[error("Not found")]
    NotFound,

    #[error("Expired")]
    Expired,

    #[error("Already used")]
    AlreadyConsumed,

    #[error("Email domain {domain} is not allowed")]
    DomainMismatch { domain: String },

    #[error("Account locked")]
    Locked,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Multiple matches for hint")]
    Ambiguous,

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Email error: {0}")]
    EmailError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Store(e) => e,
            ServiceError::Internal(e) => AppError::InternalError(e),
            ServiceError::NotFound => {
                AppError::NotFound(anyhow::anyhow!("The link is invalid or has already been used"))
            }
            ServiceError::Expired => AppError::BadRequest(anyhow::anyhow!("The link has expired")),
            ServiceError::AlreadyConsumed => {
                AppError::BadRequest(anyhow::anyhow!("The link has already been used"))
            }
            ServiceError::DomainMismatch { domain } => AppError::Forbidden(anyhow::anyhow!(
                "Email domain {} is not allowed to join this team",
                domain
            )),
            // Locked is indistinguishable from a bad password on purpose.
            ServiceError::Locked | ServiceError::InvalidCredentials => {
                AppError::AuthError(anyhow::anyhow!("Invalid email or password"))
            }
            ServiceError::Ambiguous => AppError::Conflict(anyhow::anyhow!(
                "Multiple teams match this email domain; retry with a team slug"
            )),
            ServiceError::Conflict(msg) => AppError::Conflict(anyhow::anyhow!(msg)),
            ServiceError::EmailError(msg) => AppError::EmailError(msg),
            ServiceError::ValidationError(msg) => AppError::BadRequest(anyhow::anyhow!(msg)),
        }
    }
}
