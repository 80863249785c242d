//! Request handlers for registration, login, profile, and payment
//! methods.
//!
//! Each handler is a stateless request/response function over a
//! `PortalContext`.  Failures are explicit `HandlerError` values with
//! an HTTP-class status — a rejected envelope becomes a 400 "invalid …
//! format" message, never an exception and never raw cipher detail.

pub mod auth;
pub mod payment;
pub mod profile;

use serde::Serialize;
use thiserror::Error;

use crate::backend::{BackendError, Directory, IdentityPlatform, UserRecord, UserType};
use crate::context::PortalContext;

/// A handler failure, carrying the user-facing message.
#[derive(Debug, Error)]
pub enum HandlerError {
    /// 400 — malformed or rejected input.
    #[error("{0}")]
    InvalidInput(String),

    /// 401 — missing/invalid token or credentials.
    #[error("{0}")]
    Unauthorized(String),

    /// 404 — the referenced record does not exist.
    #[error("{0}")]
    NotFound(String),

    /// 400 — the record already exists.
    #[error("{0}")]
    Conflict(String),

    /// 500 — the backend or crypto layer failed.
    #[error("{0}")]
    Internal(String),
}

impl HandlerError {
    /// The HTTP status class a transport adapter should respond with.
    pub fn status(&self) -> u16 {
        match self {
            Self::InvalidInput(_) | Self::Conflict(_) => 400,
            Self::Unauthorized(_) => 401,
            Self::NotFound(_) => 404,
            Self::Internal(_) => 500,
        }
    }

    fn unauthorized() -> Self {
        Self::Unauthorized("Unauthorized".to_string())
    }
}

impl From<BackendError> for HandlerError {
    fn from(err: BackendError) -> Self {
        match err {
            BackendError::InvalidCredentials => {
                Self::Unauthorized("Invalid email or password".to_string())
            }
            BackendError::InvalidRefreshToken => {
                Self::Unauthorized("Invalid or expired refresh token".to_string())
            }
            BackendError::DuplicateAccount => {
                Self::Conflict("User with this email already exists".to_string())
            }
            BackendError::NotFound => Self::NotFound("Record not found".to_string()),
            BackendError::Unavailable(detail) => {
                tracing::error!(%detail, "backend unavailable");
                Self::Internal("Server error".to_string())
            }
        }
    }
}

impl From<crate::errors::CarePortalError> for HandlerError {
    fn from(err: crate::errors::CarePortalError) -> Self {
        // Crypto-layer failures other than a rejected envelope are
        // deployment problems; the user never sees the detail.
        tracing::error!(error = %err, "crypto layer failure");
        Self::Internal("Server error".to_string())
    }
}

/// Convenience alias for handler results.
pub type HandlerResult<T> = std::result::Result<T, HandlerError>;

/// Profile shape returned to clients — the password hash never leaves
/// the directory.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: u64,
    pub name: String,
    pub email: String,
    pub user_type: UserType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_of_birth: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blood_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub emergency_contact: Option<crate::backend::EmergencyContact>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub medical_info: Option<crate::backend::MedicalInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub medical_license: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub facility: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hmo: Option<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

impl From<UserRecord> for UserProfile {
    fn from(record: UserRecord) -> Self {
        Self {
            id: record.id,
            name: record.name,
            email: record.email,
            user_type: record.user_type,
            phone: record.phone,
            address: record.address,
            date_of_birth: record.date_of_birth,
            gender: record.gender,
            blood_type: record.blood_type,
            emergency_contact: record.emergency_contact,
            medical_info: record.medical_info,
            medical_license: record.medical_license,
            facility: record.facility,
            hmo: record.hmo,
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }
}

/// Resolve a bearer token to the profile row it belongs to.
///
/// Accepts either the raw access token or an `Authorization` header
/// value with the `Bearer ` prefix.
pub(crate) fn authenticate<I, D>(
    ctx: &PortalContext<I, D>,
    bearer_token: &str,
) -> HandlerResult<UserRecord>
where
    I: IdentityPlatform,
    D: Directory,
{
    let token = bearer_token
        .strip_prefix("Bearer ")
        .unwrap_or(bearer_token)
        .trim();
    if token.is_empty() {
        return Err(HandlerError::unauthorized());
    }

    let auth_id = ctx
        .identity
        .user_for_token(token)?
        .ok_or_else(HandlerError::unauthorized)?;

    ctx.directory
        .find_user_by_auth_id(&auth_id)?
        .ok_or_else(HandlerError::unauthorized)
}
