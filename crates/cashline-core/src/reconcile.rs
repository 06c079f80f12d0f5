//! # Reconciliation Math
//!
//! Pure functions that turn opening balances, ledger deltas, and counted
//! closing balances into expected balances and per-tender discrepancies.
//!
//! ## Data Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Close-Time Reconciliation                          │
//! │                                                                         │
//! │  opening_balances          ledger snapshot (TenderDelta list)           │
//! │        │                          │                                     │
//! │        └──────────┬───────────────┘                                     │
//! │                   ▼                                                     │
//! │          compute_expected()                                             │
//! │                   │                                                     │
//! │                   ▼                                                     │
//! │          expected_balances          counted closing_balances            │
//! │                   │                          │                          │
//! │                   └──────────┬───────────────┘                          │
//! │                              ▼                                          │
//! │                  compute_discrepancies()                                │
//! │                              │                                          │
//! │                              ▼                                          │
//! │            discrepancies (closing - expected, per tender)               │
//! │                              │                                          │
//! │               all zero?──────┴──────any nonzero?                        │
//! │                   │                      │                              │
//! │                   ▼                      ▼                              │
//! │            CLOSED_BALANCED      DISCREPANCY_PENDING                     │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Exactness
//! Amounts are integer cents, so no tolerance band is applied: a single
//! cent off on any tender is a discrepancy. The net sum across tenders is
//! computed for display only - a +500 cash / -500 card pair still leaves
//! the session pending, because each tender is off on its own.

use crate::money::Money;
use crate::tender::TenderAmounts;
use crate::types::TenderDelta;

// =============================================================================
// Expected Balances
// =============================================================================

/// Expected balance per tender: opening balance plus the sum of that
/// tender's ledger deltas.
///
/// Addition is associative and commutative, so any permutation of the same
/// snapshot yields the same result - the ledger is free to deliver the
/// deltas out of chronological order.
///
/// ## Example
/// ```rust
/// use std::collections::BTreeMap;
/// use chrono::Utc;
/// use cashline_core::money::Money;
/// use cashline_core::reconcile::compute_expected;
/// use cashline_core::tender::TenderAmounts;
/// use cashline_core::types::{PaymentMethod, TenderDelta};
///
/// let mut counts = BTreeMap::new();
/// counts.insert(PaymentMethod::Cash, Money::from_cents(10000));
/// let opening = TenderAmounts::from_counts(counts).unwrap();
///
/// let deltas = vec![
///     TenderDelta::new(PaymentMethod::Cash, Money::from_cents(5000), Utc::now()),
///     TenderDelta::new(PaymentMethod::Cash, Money::from_cents(-1000), Utc::now()),
/// ];
///
/// let expected = compute_expected(&opening, &deltas);
/// assert_eq!(expected.get(PaymentMethod::Cash).cents(), 14000);
/// ```
pub fn compute_expected(opening: &TenderAmounts, deltas: &[TenderDelta]) -> TenderAmounts {
    let mut expected = opening.clone();
    for delta in deltas {
        expected.add_to(delta.tender, delta.amount);
    }
    expected
}

// =============================================================================
// Discrepancies
// =============================================================================

/// Discrepancy per tender: counted closing amount minus expected amount.
///
/// Negative = shortage (drawer is light), positive = overage.
pub fn compute_discrepancies(
    closing: &TenderAmounts,
    expected: &TenderAmounts,
) -> TenderAmounts {
    let mut discrepancies = TenderAmounts::zeroed();
    for (tender, counted) in closing.iter() {
        discrepancies.add_to(tender, counted - expected.get(tender));
    }
    discrepancies
}

// =============================================================================
// Reconciliation Result
// =============================================================================

/// The frozen output of a close-time reconciliation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reconciliation {
    /// Opening balances plus ledger deltas, per tender.
    pub expected: TenderAmounts,
    /// Counted minus expected, per tender.
    pub discrepancies: TenderAmounts,
}

impl Reconciliation {
    /// True when EVERY tender's discrepancy is exactly zero.
    ///
    /// This is the per-tender check. The net sum is deliberately not
    /// consulted here.
    pub fn is_balanced(&self) -> bool {
        self.discrepancies.is_all_zero()
    }

    /// Net discrepancy across tenders. Display only.
    pub fn total_discrepancy(&self) -> Money {
        self.discrepancies.total()
    }
}

/// Runs the full close-time computation in one step.
pub fn reconcile(
    opening: &TenderAmounts,
    deltas: &[TenderDelta],
    closing: &TenderAmounts,
) -> Reconciliation {
    let expected = compute_expected(opening, deltas);
    let discrepancies = compute_discrepancies(closing, &expected);
    Reconciliation {
        expected,
        discrepancies,
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PaymentMethod;
    use chrono::Utc;
    use std::collections::BTreeMap;

    fn amounts(pairs: &[(PaymentMethod, i64)]) -> TenderAmounts {
        let mut map = BTreeMap::new();
        for (tender, cents) in pairs {
            map.insert(*tender, Money::from_cents(*cents));
        }
        TenderAmounts::filled(map)
    }

    fn delta(tender: PaymentMethod, cents: i64) -> TenderDelta {
        TenderDelta::new(tender, Money::from_cents(cents), Utc::now())
    }

    #[test]
    fn test_expected_sums_per_tender() {
        let opening = amounts(&[(PaymentMethod::Cash, 10000)]);
        let deltas = vec![
            delta(PaymentMethod::Cash, 5000),
            delta(PaymentMethod::Card, 3000),
            delta(PaymentMethod::Cash, -1000),
        ];

        let expected = compute_expected(&opening, &deltas);
        assert_eq!(expected.get(PaymentMethod::Cash).cents(), 14000);
        assert_eq!(expected.get(PaymentMethod::Card).cents(), 3000);
        assert_eq!(expected.get(PaymentMethod::Bank).cents(), 0);
    }

    /// Any permutation of the same snapshot yields identical balances.
    #[test]
    fn test_expected_is_order_independent() {
        let opening = amounts(&[(PaymentMethod::Cash, 2500)]);
        let forward = vec![
            delta(PaymentMethod::Cash, 700),
            delta(PaymentMethod::Card, 1200),
            delta(PaymentMethod::Cash, -300),
            delta(PaymentMethod::Wave, 50),
        ];
        let mut reversed = forward.clone();
        reversed.reverse();
        let mut interleaved = forward.clone();
        interleaved.swap(0, 2);
        interleaved.swap(1, 3);

        let a = compute_expected(&opening, &forward);
        let b = compute_expected(&opening, &reversed);
        let c = compute_expected(&opening, &interleaved);
        assert_eq!(a, b);
        assert_eq!(a, c);
    }

    /// Zero discrepancy on every tender means balanced.
    #[test]
    fn test_exact_count_is_balanced() {
        let opening = amounts(&[(PaymentMethod::Cash, 10000)]);
        let deltas = vec![
            delta(PaymentMethod::Cash, 5000),
            delta(PaymentMethod::Card, 3000),
            delta(PaymentMethod::Cash, -1000),
        ];
        let closing = amounts(&[(PaymentMethod::Cash, 14000), (PaymentMethod::Card, 3000)]);

        let result = reconcile(&opening, &deltas, &closing);
        assert!(result.is_balanced());
        assert!(result.discrepancies.is_all_zero());
        assert_eq!(result.total_discrepancy().cents(), 0);
    }

    /// One tender a single cent off trips the discrepancy path even when
    /// every other tender matches exactly.
    #[test]
    fn test_single_cent_mismatch_is_unbalanced() {
        let opening = amounts(&[(PaymentMethod::Cash, 10000)]);
        let deltas = vec![delta(PaymentMethod::Cash, 5000)];
        let closing = amounts(&[(PaymentMethod::Cash, 14999)]);

        let result = reconcile(&opening, &deltas, &closing);
        assert!(!result.is_balanced());
        assert_eq!(
            result.discrepancies.get(PaymentMethod::Cash).cents(),
            -1
        );
        assert!(result
            .discrepancies
            .iter()
            .filter(|(t, _)| *t != PaymentMethod::Cash)
            .all(|(_, m)| m.is_zero()));
    }

    /// Offsetting discrepancies that net to zero are still unbalanced:
    /// the decision is per tender, never the net sum.
    #[test]
    fn test_net_zero_offsetting_discrepancies_still_unbalanced() {
        let opening = amounts(&[]);
        let deltas = vec![
            delta(PaymentMethod::Cash, 1000),
            delta(PaymentMethod::Card, 1000),
        ];
        // Cashier mis-keyed a card sale as cash: +500 cash, -500 card.
        let closing = amounts(&[(PaymentMethod::Cash, 1500), (PaymentMethod::Card, 500)]);

        let result = reconcile(&opening, &deltas, &closing);
        assert_eq!(result.total_discrepancy().cents(), 0);
        assert!(!result.is_balanced());
        assert_eq!(result.discrepancies.get(PaymentMethod::Cash).cents(), 500);
        assert_eq!(result.discrepancies.get(PaymentMethod::Card).cents(), -500);
    }

    #[test]
    fn test_shortage_scenario() {
        let opening = amounts(&[(PaymentMethod::Cash, 10000)]);
        let deltas = vec![
            delta(PaymentMethod::Cash, 5000),
            delta(PaymentMethod::Card, 3000),
            delta(PaymentMethod::Cash, -1000),
        ];
        // Counted cash is 500 light.
        let closing = amounts(&[(PaymentMethod::Cash, 13500), (PaymentMethod::Card, 3000)]);

        let result = reconcile(&opening, &deltas, &closing);
        assert!(!result.is_balanced());
        assert_eq!(result.discrepancies.get(PaymentMethod::Cash).cents(), -500);
        assert_eq!(result.discrepancies.get(PaymentMethod::Card).cents(), 0);
        assert_eq!(result.total_discrepancy().cents(), -500);
    }

    /// Refund-heavy shifts can push an expected balance negative; the math
    /// does not clamp.
    #[test]
    fn test_negative_expected_balance() {
        let opening = amounts(&[]);
        let deltas = vec![delta(PaymentMethod::Card, -2500)];
        let closing = amounts(&[]);

        let result = reconcile(&opening, &deltas, &closing);
        assert_eq!(result.expected.get(PaymentMethod::Card).cents(), -2500);
        assert_eq!(result.discrepancies.get(PaymentMethod::Card).cents(), 2500);
    }
}
