//! Payment domain entity

use chrono::NaiveDateTime;

use crate::shared::time::format_timestamp;

/// Payment methods that reuse the card of the reservation's latest payment.
const STORED_CARD_METHODS: [&str; 3] = ["Stored", "StoredCard", "UseSaved"];

/// Card fields as they are persisted. Only the last four digits of the card
/// number survive; CVC and password are blanked out character for character.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CardDetails {
    pub number: String,
    pub cvc: String,
    pub expiry: String,
    pub password: String,
}

impl CardDetails {
    pub fn new(
        number: impl Into<String>,
        cvc: impl Into<String>,
        expiry: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            number: number.into(),
            cvc: cvc.into(),
            expiry: expiry.into(),
            password: password.into(),
        }
    }

    /// Masking is idempotent, so reusing a stored card keeps it unchanged.
    pub fn masked(&self) -> Self {
        let digits = self.number.chars().count();
        let keep = digits.min(4);
        let number = std::iter::repeat('*')
            .take(digits - keep)
            .chain(self.number.chars().skip(digits - keep))
            .collect();

        Self {
            number,
            cvc: "*".repeat(self.cvc.chars().count()),
            expiry: self.expiry.clone(),
            password: "*".repeat(self.password.chars().count()),
        }
    }
}

/// An append-only payment record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Payment {
    pub id: String,
    pub reservation_id: String,
    pub method: String,
    pub card: CardDetails,
    /// Authoritative confirmed price in currency units
    pub amount: i64,
    /// `yyyy-MM-dd HH:mm:ss`
    pub paid_at: String,
}

impl Payment {
    pub fn new(
        id: impl Into<String>,
        reservation_id: impl Into<String>,
        method: impl Into<String>,
        card: &CardDetails,
        amount: i64,
        paid_at: NaiveDateTime,
    ) -> Self {
        Self {
            id: id.into(),
            reservation_id: reservation_id.into(),
            method: method.into(),
            card: card.masked(),
            amount,
            paid_at: format_timestamp(paid_at),
        }
    }
}

/// Whether a payment method asks to reuse the stored card.
pub fn is_stored_card_method(method: &str) -> bool {
    let method = method.trim();
    STORED_CARD_METHODS
        .iter()
        .any(|m| m.eq_ignore_ascii_case(method))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn masks_all_but_last_four_digits() {
        let card = CardDetails::new("1234567812345678", "123", "12/27", "12").masked();
        assert_eq!(card.number, "************5678");
        assert_eq!(card.cvc, "***");
        assert_eq!(card.expiry, "12/27");
        assert_eq!(card.password, "**");
    }

    #[test]
    fn masking_twice_changes_nothing() {
        let once = CardDetails::new("1234567812345678", "123", "12/27", "12").masked();
        assert_eq!(once.masked(), once);
    }

    #[test]
    fn short_numbers_are_kept() {
        let card = CardDetails::new("987", "", "", "").masked();
        assert_eq!(card.number, "987");
        assert_eq!(card.cvc, "");
    }

    #[test]
    fn stored_card_methods_are_case_insensitive() {
        assert!(is_stored_card_method("stored"));
        assert!(is_stored_card_method("StoredCard"));
        assert!(is_stored_card_method(" USESAVED "));
        assert!(!is_stored_card_method("CreditCard"));
    }
}
