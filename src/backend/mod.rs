//! Seams to the hosted identity and database platform.
//!
//! The portal does not own its backend: credentials live in a hosted
//! auth service and profile/payment rows live in its database.  The
//! handlers talk to both through these traits so the hosted client is
//! injected at the edge instead of living in module-level globals.
//! `memory` provides the in-process implementations the tests run
//! against.

pub mod memory;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::card::CardBrand;

/// Errors surfaced by a backend implementation.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("invalid or expired refresh token")]
    InvalidRefreshToken,

    #[error("account already exists")]
    DuplicateAccount,

    #[error("record not found")]
    NotFound,

    #[error("backend unavailable: {0}")]
    Unavailable(String),
}

/// Convenience alias for backend results.
pub type BackendResult<T> = std::result::Result<T, BackendError>;

// ---------------------------------------------------------------------------
// Identity platform
// ---------------------------------------------------------------------------

/// An account handle in the hosted auth service.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub auth_id: String,
}

/// An authenticated session issued by the hosted auth service.
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub auth_id: String,
    pub access_token: String,
    pub refresh_token: String,
}

/// The hosted auth service: credential storage and token issuance.
///
/// Handlers forward the recovered plaintext password here exactly once
/// (sign-up / sign-in); everywhere else only tokens travel.
pub trait IdentityPlatform {
    /// Create a credential record; fails on a duplicate email.
    fn sign_up(&self, email: &str, password: &str) -> BackendResult<AuthUser>;

    /// Verify credentials and issue a session.
    fn sign_in(&self, email: &str, password: &str) -> BackendResult<AuthSession>;

    /// Resolve a bearer access token to the account it belongs to.
    fn user_for_token(&self, access_token: &str) -> BackendResult<Option<String>>;

    /// Exchange a refresh token for a new session.
    fn refresh_session(&self, refresh_token: &str) -> BackendResult<AuthSession>;

    /// Remove an account (rollback path during registration).
    fn delete_user(&self, auth_id: &str) -> BackendResult<()>;
}

// ---------------------------------------------------------------------------
// Directory records
// ---------------------------------------------------------------------------

/// Kind of portal account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserType {
    Patient,
    Doctor,
}

/// Emergency contact attached to a patient profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmergencyContact {
    pub name: String,
    pub phone: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relationship: Option<String>,
}

/// Medical background attached to a patient profile.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MedicalInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allergies: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conditions: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub medications: Option<String>,
}

/// A user profile row.
///
/// `password_hash` is the at-rest digest of the registration password;
/// it never crosses the handler boundary back to a client.
#[derive(Debug, Clone)]
pub struct UserRecord {
    pub id: u64,
    pub auth_id: String,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub user_type: UserType,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub date_of_birth: Option<String>,
    pub gender: Option<String>,
    pub blood_type: Option<String>,
    pub emergency_contact: Option<EmergencyContact>,
    pub medical_info: Option<MedicalInfo>,
    pub medical_license: Option<String>,
    pub facility: Option<String>,
    pub hmo: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields for a new profile row at registration.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub auth_id: String,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub user_type: UserType,
    pub emergency_contact: Option<EmergencyContact>,
    pub medical_info: Option<MedicalInfo>,
    pub medical_license: Option<String>,
    pub facility: Option<String>,
    pub hmo: Option<String>,
}

/// Profile fields a user may update after registration.
///
/// `None` leaves the stored value untouched.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub date_of_birth: Option<String>,
    pub gender: Option<String>,
    pub blood_type: Option<String>,
}

/// A stored payment method.  Only the masked card number is persisted.
#[derive(Debug, Clone)]
pub struct PaymentMethodRecord {
    pub id: u64,
    pub user_id: u64,
    pub cardholder_name: String,
    pub card_number_masked: String,
    pub expiry_date: String,
    pub brand: CardBrand,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields for a new payment method row.
#[derive(Debug, Clone)]
pub struct NewPaymentMethod {
    pub user_id: u64,
    pub cardholder_name: String,
    pub card_number_masked: String,
    pub expiry_date: String,
    pub brand: CardBrand,
}

/// Status of a recorded payment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Completed,
}

/// A recorded payment.
#[derive(Debug, Clone)]
pub struct PaymentRecord {
    pub id: u64,
    pub user_id: u64,
    pub payment_method_id: u64,
    pub amount_cents: i64,
    pub description: String,
    pub status: PaymentStatus,
    pub created_at: DateTime<Utc>,
}

/// Fields for a new payment row.
#[derive(Debug, Clone)]
pub struct NewPayment {
    pub user_id: u64,
    pub payment_method_id: u64,
    pub amount_cents: i64,
    pub description: String,
}

// ---------------------------------------------------------------------------
// Directory
// ---------------------------------------------------------------------------

/// The hosted database: profile, payment-method, and payment rows.
pub trait Directory {
    fn find_user_by_email(&self, email: &str) -> BackendResult<Option<UserRecord>>;
    fn find_user_by_auth_id(&self, auth_id: &str) -> BackendResult<Option<UserRecord>>;
    fn insert_user(&self, new_user: NewUser) -> BackendResult<UserRecord>;
    fn update_user(&self, user_id: u64, update: ProfileUpdate) -> BackendResult<UserRecord>;
    fn set_emergency_contact(
        &self,
        user_id: u64,
        contact: EmergencyContact,
    ) -> BackendResult<UserRecord>;
    fn set_medical_info(&self, user_id: u64, info: MedicalInfo) -> BackendResult<UserRecord>;

    fn insert_payment_method(
        &self,
        new_method: NewPaymentMethod,
    ) -> BackendResult<PaymentMethodRecord>;
    fn payment_methods_for_user(&self, user_id: u64) -> BackendResult<Vec<PaymentMethodRecord>>;
    fn find_payment_method(
        &self,
        method_id: u64,
        user_id: u64,
    ) -> BackendResult<Option<PaymentMethodRecord>>;
    /// Deleting an absent method is a no-op, matching the hosted API.
    fn delete_payment_method(&self, method_id: u64, user_id: u64) -> BackendResult<()>;

    fn insert_payment(&self, new_payment: NewPayment) -> BackendResult<PaymentRecord>;
    /// Payments for a user, newest first.
    fn payments_for_user(&self, user_id: u64) -> BackendResult<Vec<PaymentRecord>>;
}
