//! Card field validation, brand detection, and masking.
//!
//! These run on the handler side after the card envelopes are opened.
//! Only the masked form of a card number is ever persisted; the CVV is
//! validated and discarded.

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Card brand, detected from the leading digit of the PAN.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CardBrand {
    Visa,
    Mastercard,
    Amex,
    Discover,
    Unknown,
}

impl CardBrand {
    /// Detect the brand from a normalized card number.
    pub fn detect(card_number: &str) -> Self {
        match card_number.as_bytes().first() {
            Some(b'4') => Self::Visa,
            Some(b'5') => Self::Mastercard,
            Some(b'3') => Self::Amex,
            Some(b'6') => Self::Discover,
            _ => Self::Unknown,
        }
    }
}

impl fmt::Display for CardBrand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Visa => "visa",
            Self::Mastercard => "mastercard",
            Self::Amex => "amex",
            Self::Discover => "discover",
            Self::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

fn card_number_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\d{13,19}$").expect("valid pattern"))
}

fn expiry_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\d{2}/\d{2}$").expect("valid pattern"))
}

fn cvv_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\d{3,4}$").expect("valid pattern"))
}

/// Strip whitespace from a card number as entered ("4111 1111 ...").
pub fn normalize_card_number(raw: &str) -> String {
    raw.chars().filter(|c| !c.is_whitespace()).collect()
}

/// A normalized card number must be 13–19 digits.
pub fn is_valid_card_number(card_number: &str) -> bool {
    card_number_re().is_match(card_number)
}

/// Expiry must be `MM/YY`.
pub fn is_valid_expiry(expiry: &str) -> bool {
    expiry_re().is_match(expiry)
}

/// CVV must be 3 or 4 digits.
pub fn is_valid_cvv(cvv: &str) -> bool {
    cvv_re().is_match(cvv)
}

/// Mask a normalized card number down to its last four digits.
pub fn mask_card_number(card_number: &str) -> String {
    let last4 = if card_number.len() >= 4 {
        &card_number[card_number.len() - 4..]
    } else {
        card_number
    };
    format!("**** **** **** {last4}")
}
