//! Property-based tests for entry validation rules.

use proptest::prelude::*;
use rust_decimal::Decimal;

use super::error::ValidationError;
use super::types::EntryInput;
use super::validation::validate_entries;

/// Amounts from 0.01 to 1,000,000.00.
fn positive_amount() -> impl Strategy<Value = Decimal> {
    (1i64..100_000_000i64).prop_map(|cents| Decimal::new(cents, 2))
}

fn negative_amount() -> impl Strategy<Value = Decimal> {
    (1i64..100_000_000i64).prop_map(|cents| Decimal::new(-cents, 2))
}

/// A balanced set: several debits offset by a single credit of their sum.
fn balanced_entries() -> impl Strategy<Value = Vec<EntryInput>> {
    prop::collection::vec(positive_amount(), 1..8).prop_map(|amounts| {
        let total: Decimal = amounts.iter().copied().sum();
        let mut entries: Vec<EntryInput> = amounts
            .into_iter()
            .enumerate()
            .map(|(i, amount)| EntryInput::debit(format!("1{i:03}"), amount))
            .collect();
        entries.push(EntryInput::credit("4010", total));
        entries
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    // =========================================================================
    // Balanced sets always pass and report matching totals
    // =========================================================================

    #[test]
    fn prop_balanced_entries_accepted(entries in balanced_entries()) {
        let totals = validate_entries(&entries).unwrap();
        prop_assert!(totals.is_balanced);
        prop_assert_eq!(totals.debit, totals.credit);
    }

    // =========================================================================
    // Any drift between the sides is rejected
    // =========================================================================

    #[test]
    fn prop_unbalanced_entries_rejected(
        mut entries in balanced_entries(),
        drift in positive_amount(),
    ) {
        entries[0].debit += drift;
        let result = validate_entries(&entries);
        prop_assert!(
            matches!(result, Err(ValidationError::Unbalanced { .. })),
            "Unbalanced entries should be rejected, got: {:?}",
            result
        );
    }

    #[test]
    fn prop_negative_amount_rejected(
        neg in negative_amount(),
        other in positive_amount(),
    ) {
        let entries = vec![
            EntryInput::debit("1010", neg),
            EntryInput::credit("4010", other),
        ];
        let result = validate_entries(&entries);
        prop_assert!(
            matches!(result, Err(ValidationError::NegativeAmount { .. })),
            "Negative amounts should be rejected, got: {:?}",
            result
        );
    }

    #[test]
    fn prop_zero_line_rejected(other in positive_amount()) {
        let entries = vec![
            EntryInput::debit("1010", Decimal::ZERO),
            EntryInput::credit("4010", other),
        ];
        let result = validate_entries(&entries);
        prop_assert!(
            matches!(result, Err(ValidationError::AmbiguousEntry { .. })),
            "Zero lines should be rejected, got: {:?}",
            result
        );
    }

    #[test]
    fn prop_single_entry_rejected(amount in positive_amount()) {
        let entries = vec![EntryInput::debit("1010", amount)];
        prop_assert_eq!(
            validate_entries(&entries),
            Err(ValidationError::InsufficientEntries { count: 1 })
        );
    }
}
