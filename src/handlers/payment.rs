//! Payment-method management and payment recording.
//!
//! Card number, CVV, and expiry arrive as sealed envelopes.  After the
//! envelopes are opened the fields are validated, the brand detected,
//! and only the masked card number is persisted.  The CVV is discarded
//! the moment validation passes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use zeroize::Zeroize;

use crate::backend::{
    Directory, IdentityPlatform, NewPayment, NewPaymentMethod, PaymentMethodRecord, PaymentStatus,
};
use crate::card::{self, CardBrand};
use crate::context::PortalContext;
use crate::crypto::envelope;

use super::{authenticate, HandlerError, HandlerResult};

/// Add-payment-method request.  `card_number`, `expiry_date`, and
/// `cvv` are sealed envelopes; the cardholder name travels in clear.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddPaymentMethodRequest {
    pub cardholder_name: String,
    pub card_number: String,
    pub expiry_date: String,
    pub cvv: String,
}

/// Client-facing view of a stored payment method.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentMethodView {
    pub id: u64,
    pub cardholder_name: String,
    /// Always the masked form: `**** **** **** 1111`.
    pub card_number: String,
    pub expiry_date: String,
    pub card_type: CardBrand,
}

impl From<PaymentMethodRecord> for PaymentMethodView {
    fn from(record: PaymentMethodRecord) -> Self {
        Self {
            id: record.id,
            cardholder_name: record.cardholder_name,
            card_number: record.card_number_masked,
            expiry_date: record.expiry_date,
            card_type: record.brand,
        }
    }
}

/// Process-payment request.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessPaymentRequest {
    pub amount_cents: i64,
    pub description: String,
    pub payment_method_id: u64,
}

/// Outcome of a processed payment.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentOutcome {
    pub payment_id: u64,
    pub status: PaymentStatus,
    pub message: String,
}

/// One row of the payment history, newest first.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentView {
    pub id: u64,
    pub amount_cents: i64,
    pub description: String,
    pub status: PaymentStatus,
    pub date: DateTime<Utc>,
}

/// Register a new payment method for the token's owner.
pub fn add_payment_method<I, D>(
    ctx: &PortalContext<I, D>,
    bearer_token: &str,
    request: AddPaymentMethodRequest,
) -> HandlerResult<PaymentMethodView>
where
    I: IdentityPlatform,
    D: Directory,
{
    let user = authenticate(ctx, bearer_token)?;
    let key = ctx.payment_key()?;

    let reject = |field: &str| {
        tracing::warn!(user_id = user.id, field, "payment envelope rejected");
        HandlerError::InvalidInput("Invalid card data format".to_string())
    };

    let mut card_number: String =
        envelope::open(&key, &request.card_number).map_err(|_| reject("card_number"))?;
    let mut cvv: String = envelope::open(&key, &request.cvv).map_err(|_| reject("cvv"))?;
    let expiry_date: String =
        envelope::open(&key, &request.expiry_date).map_err(|_| reject("expiry_date"))?;

    let normalized = card::normalize_card_number(&card_number);
    card_number.zeroize();

    if !card::is_valid_card_number(&normalized) {
        cvv.zeroize();
        return Err(HandlerError::InvalidInput(
            "Invalid card number".to_string(),
        ));
    }
    if !card::is_valid_expiry(&expiry_date) {
        cvv.zeroize();
        return Err(HandlerError::InvalidInput(
            "Invalid expiry date format (MM/YY)".to_string(),
        ));
    }
    let cvv_ok = card::is_valid_cvv(&cvv);
    // The CVV's job ends at validation — it is never stored or logged.
    cvv.zeroize();
    if !cvv_ok {
        return Err(HandlerError::InvalidInput("Invalid CVV".to_string()));
    }

    let brand = CardBrand::detect(&normalized);
    let masked = card::mask_card_number(&normalized);

    let record = ctx.directory.insert_payment_method(NewPaymentMethod {
        user_id: user.id,
        cardholder_name: request.cardholder_name,
        card_number_masked: masked.clone(),
        expiry_date,
        brand,
    })?;

    ctx.record(
        "payment.method.add",
        &user.email,
        Some(&format!("{brand} {masked}")),
    );

    Ok(record.into())
}

/// List the stored payment methods of the token's owner.
pub fn list_payment_methods<I, D>(
    ctx: &PortalContext<I, D>,
    bearer_token: &str,
) -> HandlerResult<Vec<PaymentMethodView>>
where
    I: IdentityPlatform,
    D: Directory,
{
    let user = authenticate(ctx, bearer_token)?;
    let methods = ctx.directory.payment_methods_for_user(user.id)?;
    Ok(methods.into_iter().map(Into::into).collect())
}

/// Delete a stored payment method.  Deleting an absent method is a
/// no-op, matching the hosted API.
pub fn delete_payment_method<I, D>(
    ctx: &PortalContext<I, D>,
    bearer_token: &str,
    method_id: u64,
) -> HandlerResult<()>
where
    I: IdentityPlatform,
    D: Directory,
{
    let user = authenticate(ctx, bearer_token)?;
    ctx.directory.delete_payment_method(method_id, user.id)?;
    ctx.record("payment.method.delete", &user.email, None);
    Ok(())
}

/// Record a payment against a stored method.
pub fn process_payment<I, D>(
    ctx: &PortalContext<I, D>,
    bearer_token: &str,
    request: ProcessPaymentRequest,
) -> HandlerResult<PaymentOutcome>
where
    I: IdentityPlatform,
    D: Directory,
{
    let user = authenticate(ctx, bearer_token)?;

    if request.amount_cents <= 0 || request.description.is_empty() {
        return Err(HandlerError::InvalidInput(
            "Missing required fields".to_string(),
        ));
    }

    let method = ctx
        .directory
        .find_payment_method(request.payment_method_id, user.id)?
        .ok_or_else(|| HandlerError::NotFound("Payment method not found".to_string()))?;

    let payment = ctx.directory.insert_payment(NewPayment {
        user_id: user.id,
        payment_method_id: method.id,
        amount_cents: request.amount_cents,
        description: request.description,
    })?;

    Ok(PaymentOutcome {
        payment_id: payment.id,
        status: payment.status,
        message: "Payment processed successfully".to_string(),
    })
}

/// Payment history of the token's owner, newest first.
pub fn payment_history<I, D>(
    ctx: &PortalContext<I, D>,
    bearer_token: &str,
) -> HandlerResult<Vec<PaymentView>>
where
    I: IdentityPlatform,
    D: Directory,
{
    let user = authenticate(ctx, bearer_token)?;
    let payments = ctx.directory.payments_for_user(user.id)?;

    Ok(payments
        .into_iter()
        .map(|p| PaymentView {
            id: p.id,
            amount_cents: p.amount_cents,
            description: p.description,
            status: p.status,
            date: p.created_at,
        })
        .collect())
}
