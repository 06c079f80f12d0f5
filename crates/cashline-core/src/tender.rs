//! # Tender Amounts
//!
//! The invariant-enforcing per-tender money map.
//!
//! ## The Missing-Key Problem
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  A partially-populated tender map is poison for reconciliation:         │
//! │                                                                         │
//! │    opening  = { cash: 10000 }              ← card missing               │
//! │    closing  = { cash: 14000, card: 3000 }                               │
//! │                                                                         │
//! │  Is card's opening balance zero, or unknown? The answer changes the     │
//! │  discrepancy. So a partial map must never reach the reconciliation      │
//! │  step.                                                                  │
//! │                                                                         │
//! │  [`TenderAmounts`] makes the question unaskable: every constructor      │
//! │  (and even deserialization) completes the map with zeros, so an entry   │
//! │  exists for every [`PaymentMethod`], always.                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;

use crate::error::ValidationError;
use crate::money::Money;
use crate::types::PaymentMethod;

// =============================================================================
// TenderAmounts
// =============================================================================

/// A complete `PaymentMethod -> Money` map.
///
/// ## Guarantees
/// - Contains an entry for EVERY payment method, always.
/// - Operator-entered counts go through [`TenderAmounts::from_counts`],
///   which rejects negative amounts.
/// - Computed values (expected balances, discrepancies) go through
///   [`TenderAmounts::filled`], which permits negatives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TenderAmounts(BTreeMap<PaymentMethod, Money>);

impl TenderAmounts {
    /// A map with every tender at zero.
    pub fn zeroed() -> Self {
        Self::filled(BTreeMap::new())
    }

    /// Completes a possibly-partial map with zeros.
    ///
    /// Use for computed values, which may legitimately be negative
    /// (a shortage discrepancy, a refund-heavy expected balance).
    pub fn filled(mut amounts: BTreeMap<PaymentMethod, Money>) -> Self {
        for method in PaymentMethod::ALL {
            amounts.entry(method).or_insert_with(Money::zero);
        }
        TenderAmounts(amounts)
    }

    /// Builds a map from operator-entered counts.
    ///
    /// Missing tenders default to zero; any negative amount is rejected.
    /// A physical count of a drawer cannot be negative.
    ///
    /// ## Example
    /// ```rust
    /// use std::collections::BTreeMap;
    /// use cashline_core::money::Money;
    /// use cashline_core::tender::TenderAmounts;
    /// use cashline_core::types::PaymentMethod;
    ///
    /// let mut counts = BTreeMap::new();
    /// counts.insert(PaymentMethod::Cash, Money::from_cents(10000));
    ///
    /// let opening = TenderAmounts::from_counts(counts).unwrap();
    /// assert_eq!(opening.get(PaymentMethod::Cash).cents(), 10000);
    /// assert_eq!(opening.get(PaymentMethod::Card).cents(), 0); // zero-filled
    /// ```
    pub fn from_counts(
        amounts: BTreeMap<PaymentMethod, Money>,
    ) -> Result<Self, ValidationError> {
        for (tender, amount) in &amounts {
            if amount.is_negative() {
                return Err(ValidationError::NegativeAmount { tender: *tender });
            }
        }
        Ok(Self::filled(amounts))
    }

    /// The amount recorded for a tender.
    ///
    /// Total map: this cannot miss.
    #[inline]
    pub fn get(&self, tender: PaymentMethod) -> Money {
        self.0.get(&tender).copied().unwrap_or_else(Money::zero)
    }

    /// Iterates tenders in canonical order.
    pub fn iter(&self) -> impl Iterator<Item = (PaymentMethod, Money)> + '_ {
        self.0.iter().map(|(t, m)| (*t, *m))
    }

    /// Tenders with a nonzero amount, in canonical order.
    pub fn nonzero(&self) -> impl Iterator<Item = (PaymentMethod, Money)> + '_ {
        self.iter().filter(|(_, m)| !m.is_zero())
    }

    /// Sum across all tenders.
    pub fn total(&self) -> Money {
        self.iter().map(|(_, m)| m).sum()
    }

    /// True when every tender is exactly zero.
    pub fn is_all_zero(&self) -> bool {
        self.iter().all(|(_, m)| m.is_zero())
    }

    /// Adds `amount` to a tender's entry. Crate-internal: only the
    /// reconciliation math accumulates.
    pub(crate) fn add_to(&mut self, tender: PaymentMethod, amount: Money) {
        let entry = self.0.entry(tender).or_insert_with(Money::zero);
        *entry += amount;
    }
}

impl Default for TenderAmounts {
    fn default() -> Self {
        TenderAmounts::zeroed()
    }
}

// =============================================================================
// Serde
// =============================================================================

/// Serializes as a plain JSON object: `{"cash": 10000, "card": 0, ...}`.
impl Serialize for TenderAmounts {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (tender, amount) in &self.0 {
            map.serialize_entry(tender, amount)?;
        }
        map.end()
    }
}

/// Deserialization completes missing tenders with zero, so a partial map
/// read from storage or a caller payload can never exist in memory.
impl<'de> Deserialize<'de> for TenderAmounts {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let amounts = BTreeMap::<PaymentMethod, Money>::deserialize(deserializer)?;
        Ok(TenderAmounts::filled(amounts))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn cents(map: &TenderAmounts, tender: PaymentMethod) -> i64 {
        map.get(tender).cents()
    }

    #[test]
    fn test_zeroed_covers_every_tender() {
        let amounts = TenderAmounts::zeroed();
        assert_eq!(amounts.iter().count(), PaymentMethod::ALL.len());
        assert!(amounts.is_all_zero());
    }

    #[test]
    fn test_from_counts_fills_missing_with_zero() {
        let mut counts = BTreeMap::new();
        counts.insert(PaymentMethod::Cash, Money::from_cents(10000));

        let amounts = TenderAmounts::from_counts(counts).unwrap();
        assert_eq!(cents(&amounts, PaymentMethod::Cash), 10000);
        assert_eq!(cents(&amounts, PaymentMethod::Card), 0);
        assert_eq!(cents(&amounts, PaymentMethod::Wave), 0);
        assert_eq!(amounts.iter().count(), PaymentMethod::ALL.len());
    }

    #[test]
    fn test_from_counts_rejects_negative() {
        let mut counts = BTreeMap::new();
        counts.insert(PaymentMethod::Card, Money::from_cents(-1));

        let err = TenderAmounts::from_counts(counts).unwrap_err();
        assert!(matches!(
            err,
            ValidationError::NegativeAmount {
                tender: PaymentMethod::Card
            }
        ));
    }

    #[test]
    fn test_filled_permits_negative() {
        let mut computed = BTreeMap::new();
        computed.insert(PaymentMethod::Cash, Money::from_cents(-500));

        let amounts = TenderAmounts::filled(computed);
        assert_eq!(cents(&amounts, PaymentMethod::Cash), -500);
    }

    #[test]
    fn test_total_and_nonzero() {
        let mut map = BTreeMap::new();
        map.insert(PaymentMethod::Cash, Money::from_cents(500));
        map.insert(PaymentMethod::Card, Money::from_cents(-500));
        let amounts = TenderAmounts::filled(map);

        assert_eq!(amounts.total().cents(), 0);
        // Net zero, but two tenders are off - exactly the case the
        // per-tender check exists for.
        assert!(!amounts.is_all_zero());
        assert_eq!(amounts.nonzero().count(), 2);
    }

    #[test]
    fn test_serde_round_trip_normalizes_partial_maps() {
        let json = r#"{"cash": 14000, "card": 3000}"#;
        let amounts: TenderAmounts = serde_json::from_str(json).unwrap();

        assert_eq!(cents(&amounts, PaymentMethod::Cash), 14000);
        assert_eq!(cents(&amounts, PaymentMethod::Card), 3000);
        assert_eq!(cents(&amounts, PaymentMethod::Bank), 0);
        assert_eq!(amounts.iter().count(), PaymentMethod::ALL.len());

        let round = serde_json::to_string(&amounts).unwrap();
        let back: TenderAmounts = serde_json::from_str(&round).unwrap();
        assert_eq!(back, amounts);
    }
}
