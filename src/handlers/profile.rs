//! Profile reads and updates for the signed-in user.

use crate::backend::{Directory, EmergencyContact, IdentityPlatform, MedicalInfo, ProfileUpdate};
use crate::context::PortalContext;

use super::{authenticate, HandlerResult, UserProfile};

/// Fetch the profile of the token's owner.
pub fn get_profile<I, D>(ctx: &PortalContext<I, D>, bearer_token: &str) -> HandlerResult<UserProfile>
where
    I: IdentityPlatform,
    D: Directory,
{
    let user = authenticate(ctx, bearer_token)?;
    Ok(user.into())
}

/// Apply a partial profile update; unset fields are left untouched.
pub fn update_profile<I, D>(
    ctx: &PortalContext<I, D>,
    bearer_token: &str,
    update: ProfileUpdate,
) -> HandlerResult<UserProfile>
where
    I: IdentityPlatform,
    D: Directory,
{
    let user = authenticate(ctx, bearer_token)?;
    let updated = ctx.directory.update_user(user.id, update)?;
    Ok(updated.into())
}

/// Replace the emergency contact.
pub fn update_emergency_contact<I, D>(
    ctx: &PortalContext<I, D>,
    bearer_token: &str,
    contact: EmergencyContact,
) -> HandlerResult<EmergencyContact>
where
    I: IdentityPlatform,
    D: Directory,
{
    let user = authenticate(ctx, bearer_token)?;
    let updated = ctx.directory.set_emergency_contact(user.id, contact)?;

    updated
        .emergency_contact
        .ok_or_else(|| super::HandlerError::Internal("Server error".to_string()))
}

/// Replace the medical background information.
pub fn update_medical_info<I, D>(
    ctx: &PortalContext<I, D>,
    bearer_token: &str,
    info: MedicalInfo,
) -> HandlerResult<MedicalInfo>
where
    I: IdentityPlatform,
    D: Directory,
{
    let user = authenticate(ctx, bearer_token)?;
    let updated = ctx.directory.set_medical_info(user.id, info)?;

    updated
        .medical_info
        .ok_or_else(|| super::HandlerError::Internal("Server error".to_string()))
}
