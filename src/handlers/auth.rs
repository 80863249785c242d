//! Registration, login, session refresh, and license validation.
//!
//! Passwords arrive as sealed envelopes.  A handler opens the envelope,
//! hashes the recovered plaintext for at-rest storage, forwards the
//! plaintext to the identity platform exactly once, and drops it.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use zeroize::Zeroize;

use crate::backend::{Directory, EmergencyContact, IdentityPlatform, MedicalInfo, NewUser, UserType};
use crate::context::PortalContext;
use crate::crypto::{envelope, sha256_hex};

use super::{HandlerError, HandlerResult, UserProfile};

/// Registration request.  `password` is a sealed envelope.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub user_type: UserType,
    #[serde(default)]
    pub emergency_contact: Option<EmergencyContact>,
    #[serde(default)]
    pub medical_info: Option<MedicalInfo>,
    #[serde(default)]
    pub medical_license: Option<String>,
    #[serde(default)]
    pub facility: Option<String>,
    #[serde(default)]
    pub hmo: Option<String>,
}

/// Login request.  `password` is a sealed envelope.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// A successful register/login: the profile plus session tokens.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    pub user: UserProfile,
    pub token: String,
    pub refresh_token: String,
}

/// A refreshed token pair.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    pub token: String,
    pub refresh_token: String,
}

/// License validation request for practitioner accounts.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LicenseRequest {
    pub license_number: String,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
}

/// License validation outcome.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LicenseValidation {
    pub message: String,
    pub valid_until: DateTime<Utc>,
}

/// Register a new portal account.
///
/// Opens the password envelope, rejects duplicate emails, creates the
/// credential in the identity platform, and inserts the profile row
/// with the password digest.  If the profile insert fails, the auth
/// account is rolled back so registration stays atomic from the
/// caller's point of view.
pub fn register<I, D>(
    ctx: &PortalContext<I, D>,
    request: RegisterRequest,
) -> HandlerResult<SessionResponse>
where
    I: IdentityPlatform,
    D: Directory,
{
    let key = ctx.credentials_key()?;
    let mut password: String = envelope::open(&key, &request.password).map_err(|_| {
        tracing::warn!(email = %request.email, "register: password envelope rejected");
        HandlerError::InvalidInput("Invalid password format".to_string())
    })?;

    if ctx.directory.find_user_by_email(&request.email)?.is_some() {
        password.zeroize();
        return Err(HandlerError::Conflict(
            "User with this email already exists".to_string(),
        ));
    }

    let auth_user = match ctx.identity.sign_up(&request.email, &password) {
        Ok(user) => user,
        Err(e) => {
            password.zeroize();
            return Err(e.into());
        }
    };

    let new_user = NewUser {
        auth_id: auth_user.auth_id.clone(),
        name: request.name,
        email: request.email.clone(),
        password_hash: sha256_hex(&password),
        user_type: request.user_type,
        emergency_contact: request.emergency_contact,
        medical_info: request.medical_info,
        medical_license: request.medical_license,
        facility: request.facility,
        hmo: request.hmo,
    };

    let user = match ctx.directory.insert_user(new_user) {
        Ok(user) => user,
        Err(e) => {
            // Roll back the auth account so the email isn't stranded
            // without a profile.
            if let Err(rollback) = ctx.identity.delete_user(&auth_user.auth_id) {
                tracing::error!(error = %rollback, "register: auth rollback failed");
            }
            password.zeroize();
            return Err(e.into());
        }
    };

    let session = ctx.identity.sign_in(&request.email, &password);
    password.zeroize();
    let session = session?;

    ctx.record("auth.register", &request.email, None);

    Ok(SessionResponse {
        user: user.into(),
        token: session.access_token,
        refresh_token: session.refresh_token,
    })
}

/// Sign in to an existing account.
pub fn login<I, D>(ctx: &PortalContext<I, D>, request: LoginRequest) -> HandlerResult<SessionResponse>
where
    I: IdentityPlatform,
    D: Directory,
{
    let key = ctx.credentials_key()?;
    let mut password: String = envelope::open(&key, &request.password).map_err(|_| {
        tracing::warn!(email = %request.email, "login: password envelope rejected");
        HandlerError::InvalidInput("Invalid password format".to_string())
    })?;

    let session = ctx.identity.sign_in(&request.email, &password);
    password.zeroize();
    let session = match session {
        Ok(session) => session,
        Err(e) => {
            ctx.record("auth.login.failed", &request.email, None);
            return Err(e.into());
        }
    };

    let user = ctx
        .directory
        .find_user_by_auth_id(&session.auth_id)?
        .ok_or_else(|| HandlerError::NotFound("User profile not found".to_string()))?;

    ctx.record("auth.login", &request.email, None);

    Ok(SessionResponse {
        user: user.into(),
        token: session.access_token,
        refresh_token: session.refresh_token,
    })
}

/// Exchange a refresh token for a new session.
pub fn refresh_token<I, D>(ctx: &PortalContext<I, D>, refresh_token: &str) -> HandlerResult<TokenPair>
where
    I: IdentityPlatform,
    D: Directory,
{
    if refresh_token.is_empty() {
        return Err(HandlerError::InvalidInput(
            "Refresh token is required".to_string(),
        ));
    }

    let session = ctx.identity.refresh_session(refresh_token)?;

    Ok(TokenPair {
        token: session.access_token,
        refresh_token: session.refresh_token,
    })
}

/// Validate a practitioner license number.
///
/// Stand-in for an external license-registry call: accepts any number
/// longer than five characters and grants a one-year validity horizon.
pub fn validate_license<I, D>(
    ctx: &PortalContext<I, D>,
    request: LicenseRequest,
) -> HandlerResult<LicenseValidation>
where
    I: IdentityPlatform,
    D: Directory,
{
    if request.license_number.len() <= 5 {
        return Err(HandlerError::InvalidInput(
            "Invalid license number".to_string(),
        ));
    }

    ctx.record("auth.license.validated", &request.license_number, None);

    Ok(LicenseValidation {
        message: "License validated successfully".to_string(),
        valid_until: Utc::now() + Duration::days(365),
    })
}
