//! In-memory backend implementations.
//!
//! Stand-ins for the hosted platform, used by the test suites and by
//! local development.  Credential verification works the same way the
//! portal stores passwords: digest at rest, constant-time comparison.

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::Utc;

use crate::crypto::{secure_compare, sha256_hex};

use super::{
    AuthSession, AuthUser, BackendError, BackendResult, Directory, IdentityPlatform, NewPayment,
    NewPaymentMethod, NewUser, PaymentMethodRecord, PaymentRecord, PaymentStatus, ProfileUpdate,
    UserRecord,
};

// ---------------------------------------------------------------------------
// Identity platform
// ---------------------------------------------------------------------------

struct Account {
    auth_id: String,
    password_hash: String,
}

#[derive(Default)]
struct IdentityState {
    /// email -> account
    accounts: HashMap<String, Account>,
    /// access token -> auth_id
    sessions: HashMap<String, String>,
    /// refresh token -> auth_id
    refresh_tokens: HashMap<String, String>,
    next_id: u64,
}

/// In-memory stand-in for the hosted auth service.
#[derive(Default)]
pub struct MemoryIdentity {
    state: Mutex<IdentityState>,
}

impl MemoryIdentity {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> BackendResult<std::sync::MutexGuard<'_, IdentityState>> {
        self.state
            .lock()
            .map_err(|_| BackendError::Unavailable("identity state poisoned".into()))
    }

    fn issue_session(state: &mut IdentityState, auth_id: &str) -> AuthSession {
        state.next_id += 1;
        let access_token = format!("access-{}-{}", auth_id, state.next_id);
        state.next_id += 1;
        let refresh_token = format!("refresh-{}-{}", auth_id, state.next_id);

        state
            .sessions
            .insert(access_token.clone(), auth_id.to_string());
        state
            .refresh_tokens
            .insert(refresh_token.clone(), auth_id.to_string());

        AuthSession {
            auth_id: auth_id.to_string(),
            access_token,
            refresh_token,
        }
    }
}

impl IdentityPlatform for MemoryIdentity {
    fn sign_up(&self, email: &str, password: &str) -> BackendResult<AuthUser> {
        let mut state = self.lock()?;

        if state.accounts.contains_key(email) {
            return Err(BackendError::DuplicateAccount);
        }

        state.next_id += 1;
        let auth_id = format!("auth-{}", state.next_id);
        state.accounts.insert(
            email.to_string(),
            Account {
                auth_id: auth_id.clone(),
                password_hash: sha256_hex(password),
            },
        );

        Ok(AuthUser { auth_id })
    }

    fn sign_in(&self, email: &str, password: &str) -> BackendResult<AuthSession> {
        let mut state = self.lock()?;

        let auth_id = {
            let account = state
                .accounts
                .get(email)
                .ok_or(BackendError::InvalidCredentials)?;
            if !secure_compare(&account.password_hash, &sha256_hex(password)) {
                return Err(BackendError::InvalidCredentials);
            }
            account.auth_id.clone()
        };

        Ok(Self::issue_session(&mut state, &auth_id))
    }

    fn user_for_token(&self, access_token: &str) -> BackendResult<Option<String>> {
        let state = self.lock()?;
        Ok(state.sessions.get(access_token).cloned())
    }

    fn refresh_session(&self, refresh_token: &str) -> BackendResult<AuthSession> {
        let mut state = self.lock()?;

        // Rotate: the old refresh token is consumed.
        let auth_id = state
            .refresh_tokens
            .remove(refresh_token)
            .ok_or(BackendError::InvalidRefreshToken)?;

        Ok(Self::issue_session(&mut state, &auth_id))
    }

    fn delete_user(&self, auth_id: &str) -> BackendResult<()> {
        let mut state = self.lock()?;
        state.accounts.retain(|_, a| a.auth_id != auth_id);
        state.sessions.retain(|_, id| id.as_str() != auth_id);
        state.refresh_tokens.retain(|_, id| id.as_str() != auth_id);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Directory
// ---------------------------------------------------------------------------

#[derive(Default)]
struct DirectoryState {
    users: Vec<UserRecord>,
    payment_methods: Vec<PaymentMethodRecord>,
    payments: Vec<PaymentRecord>,
    next_user_id: u64,
    next_method_id: u64,
    next_payment_id: u64,
}

/// In-memory stand-in for the hosted database.
#[derive(Default)]
pub struct MemoryDirectory {
    state: Mutex<DirectoryState>,
}

impl MemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> BackendResult<std::sync::MutexGuard<'_, DirectoryState>> {
        self.state
            .lock()
            .map_err(|_| BackendError::Unavailable("directory state poisoned".into()))
    }
}

impl Directory for MemoryDirectory {
    fn find_user_by_email(&self, email: &str) -> BackendResult<Option<UserRecord>> {
        let state = self.lock()?;
        Ok(state.users.iter().find(|u| u.email == email).cloned())
    }

    fn find_user_by_auth_id(&self, auth_id: &str) -> BackendResult<Option<UserRecord>> {
        let state = self.lock()?;
        Ok(state.users.iter().find(|u| u.auth_id == auth_id).cloned())
    }

    fn insert_user(&self, new_user: NewUser) -> BackendResult<UserRecord> {
        let mut state = self.lock()?;

        if state.users.iter().any(|u| u.email == new_user.email) {
            return Err(BackendError::DuplicateAccount);
        }

        state.next_user_id += 1;
        let now = Utc::now();
        let record = UserRecord {
            id: state.next_user_id,
            auth_id: new_user.auth_id,
            name: new_user.name,
            email: new_user.email,
            password_hash: new_user.password_hash,
            user_type: new_user.user_type,
            phone: None,
            address: None,
            date_of_birth: None,
            gender: None,
            blood_type: None,
            emergency_contact: new_user.emergency_contact,
            medical_info: new_user.medical_info,
            medical_license: new_user.medical_license,
            facility: new_user.facility,
            hmo: new_user.hmo,
            created_at: now,
            updated_at: now,
        };
        state.users.push(record.clone());

        Ok(record)
    }

    fn update_user(&self, user_id: u64, update: ProfileUpdate) -> BackendResult<UserRecord> {
        let mut state = self.lock()?;
        let user = state
            .users
            .iter_mut()
            .find(|u| u.id == user_id)
            .ok_or(BackendError::NotFound)?;

        if let Some(name) = update.name {
            user.name = name;
        }
        if let Some(phone) = update.phone {
            user.phone = Some(phone);
        }
        if let Some(address) = update.address {
            user.address = Some(address);
        }
        if let Some(dob) = update.date_of_birth {
            user.date_of_birth = Some(dob);
        }
        if let Some(gender) = update.gender {
            user.gender = Some(gender);
        }
        if let Some(blood_type) = update.blood_type {
            user.blood_type = Some(blood_type);
        }
        user.updated_at = Utc::now();

        Ok(user.clone())
    }

    fn set_emergency_contact(
        &self,
        user_id: u64,
        contact: super::EmergencyContact,
    ) -> BackendResult<UserRecord> {
        let mut state = self.lock()?;
        let user = state
            .users
            .iter_mut()
            .find(|u| u.id == user_id)
            .ok_or(BackendError::NotFound)?;

        user.emergency_contact = Some(contact);
        user.updated_at = Utc::now();
        Ok(user.clone())
    }

    fn set_medical_info(
        &self,
        user_id: u64,
        info: super::MedicalInfo,
    ) -> BackendResult<UserRecord> {
        let mut state = self.lock()?;
        let user = state
            .users
            .iter_mut()
            .find(|u| u.id == user_id)
            .ok_or(BackendError::NotFound)?;

        user.medical_info = Some(info);
        user.updated_at = Utc::now();
        Ok(user.clone())
    }

    fn insert_payment_method(
        &self,
        new_method: NewPaymentMethod,
    ) -> BackendResult<PaymentMethodRecord> {
        let mut state = self.lock()?;

        state.next_method_id += 1;
        let now = Utc::now();
        let record = PaymentMethodRecord {
            id: state.next_method_id,
            user_id: new_method.user_id,
            cardholder_name: new_method.cardholder_name,
            card_number_masked: new_method.card_number_masked,
            expiry_date: new_method.expiry_date,
            brand: new_method.brand,
            created_at: now,
            updated_at: now,
        };
        state.payment_methods.push(record.clone());

        Ok(record)
    }

    fn payment_methods_for_user(&self, user_id: u64) -> BackendResult<Vec<PaymentMethodRecord>> {
        let state = self.lock()?;
        Ok(state
            .payment_methods
            .iter()
            .filter(|m| m.user_id == user_id)
            .cloned()
            .collect())
    }

    fn find_payment_method(
        &self,
        method_id: u64,
        user_id: u64,
    ) -> BackendResult<Option<PaymentMethodRecord>> {
        let state = self.lock()?;
        Ok(state
            .payment_methods
            .iter()
            .find(|m| m.id == method_id && m.user_id == user_id)
            .cloned())
    }

    fn delete_payment_method(&self, method_id: u64, user_id: u64) -> BackendResult<()> {
        let mut state = self.lock()?;
        state
            .payment_methods
            .retain(|m| !(m.id == method_id && m.user_id == user_id));
        Ok(())
    }

    fn insert_payment(&self, new_payment: NewPayment) -> BackendResult<PaymentRecord> {
        let mut state = self.lock()?;

        state.next_payment_id += 1;
        let record = PaymentRecord {
            id: state.next_payment_id,
            user_id: new_payment.user_id,
            payment_method_id: new_payment.payment_method_id,
            amount_cents: new_payment.amount_cents,
            description: new_payment.description,
            status: PaymentStatus::Completed,
            created_at: Utc::now(),
        };
        state.payments.push(record.clone());

        Ok(record)
    }

    fn payments_for_user(&self, user_id: u64) -> BackendResult<Vec<PaymentRecord>> {
        let state = self.lock()?;
        let mut payments: Vec<PaymentRecord> = state
            .payments
            .iter()
            .filter(|p| p.user_id == user_id)
            .cloned()
            .collect();
        payments.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(payments)
    }
}
