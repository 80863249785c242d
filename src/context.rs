//! The portal context — everything a request handler needs, built once
//! at process start and passed by reference into every call.
//!
//! The platform client and sealing key are explicit dependencies
//! instead of module-level globals, so tests can inject the in-memory
//! backends and a throwaway secret.

use crate::backend::{Directory, IdentityPlatform};
use crate::config::Settings;
use crate::crypto::keys::{SealingKey, FIELD_CREDENTIALS, FIELD_PAYMENT};
use crate::errors::Result;

#[cfg(feature = "audit-log")]
use crate::audit::AuditLog;

/// Shared, read-only state for the request handlers.
pub struct PortalContext<I, D>
where
    I: IdentityPlatform,
    D: Directory,
{
    pub settings: Settings,
    pub identity: I,
    pub directory: D,
    sealing: SealingKey,
    #[cfg(feature = "audit-log")]
    audit: Option<AuditLog>,
}

impl<I, D> PortalContext<I, D>
where
    I: IdentityPlatform,
    D: Directory,
{
    /// Build a context from settings and backend handles.
    ///
    /// Resolves the shared transport secret and stretches it into the
    /// sealing key up front, so a misconfigured deployment fails at
    /// startup instead of on the first request.
    pub fn new(settings: Settings, identity: I, directory: D) -> Result<Self> {
        let secret = settings.resolve_transport_secret()?;
        let sealing = SealingKey::from_secret_with_params(secret.as_bytes(), &settings.kdf_params())?;

        Ok(Self {
            settings,
            identity,
            directory,
            sealing,
            #[cfg(feature = "audit-log")]
            audit: None,
        })
    }

    /// Attach an audit log to the context.
    #[cfg(feature = "audit-log")]
    pub fn with_audit(mut self, audit: AuditLog) -> Self {
        self.audit = Some(audit);
        self
    }

    /// The sealing key derived from the transport secret.
    pub fn sealing_key(&self) -> &SealingKey {
        &self.sealing
    }

    /// Field key for credential envelopes.
    pub fn credentials_key(&self) -> Result<[u8; 32]> {
        self.sealing.derive_field_key(FIELD_CREDENTIALS)
    }

    /// Field key for payment envelopes.
    pub fn payment_key(&self) -> Result<[u8; 32]> {
        self.sealing.derive_field_key(FIELD_PAYMENT)
    }

    /// Record a security-relevant event in the audit trail, if one is
    /// attached.  Fire-and-forget; never fails the parent operation.
    pub fn record(&self, operation: &str, actor: &str, details: Option<&str>) {
        #[cfg(feature = "audit-log")]
        if let Some(audit) = &self.audit {
            audit.log(operation, actor, details);
        }
        #[cfg(not(feature = "audit-log"))]
        let _ = (operation, actor, details);
    }
}
