//! Transfer counterpart matching engine
//!
//! When a triage item looks like one leg of a self-transfer, this engine
//! searches the confirmed ledger for the opposite leg: a transaction whose
//! amount mirrors the item's within a small tolerance, dated within a few
//! days of it, and not already claimed by another transfer pair.

use chrono::NaiveDateTime;

use crate::db::Database;
use crate::error::Result;
use crate::models::{MatchCandidate, Transaction};

/// How far (in days) either side of the item's date to search
pub const MATCH_WINDOW_DAYS: i64 = 3;

/// Mirrored-amount tolerance in currency units
///
/// Strictly less-than, so two legs exactly one unit apart do not match.
pub const AMOUNT_TOLERANCE: f64 = 1.0;

/// Transfer matching engine
pub struct TransferMatcher<'a> {
    db: &'a Database,
}

impl<'a> TransferMatcher<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Find potential transfer counterparts for a draft marked as a transfer
    ///
    /// Requires the destination account, amount, and date; any of them
    /// missing means the draft is not yet searchable and the result is an
    /// empty list, not an error.
    ///
    /// `self_id` is the ledger ID of the transaction being edited, if it is
    /// already confirmed; it is excluded from its own candidate list, and a
    /// candidate already linked back to it remains eligible (re-opening the
    /// editor must re-offer the currently linked leg).
    pub fn find_matches(
        &self,
        to_account_id: Option<i64>,
        amount: Option<f64>,
        date: Option<NaiveDateTime>,
        self_id: Option<i64>,
    ) -> Result<Vec<MatchCandidate>> {
        let (Some(account_id), Some(amount), Some(date)) = (to_account_id, amount, date) else {
            return Ok(Vec::new());
        };

        let window = self
            .db
            .transactions_in_window(Some(account_id), date, MATCH_WINDOW_DAYS)?;
        Ok(filter_counterparts(amount, self_id, &window))
    }

}

/// Apply the counterpart criteria to a pre-fetched date window
///
/// A transaction qualifies when:
/// - its amount is within `AMOUNT_TOLERANCE` of the mirrored amount
/// - it is not the transaction being edited itself
/// - it is unlinked, or linked to the transaction being edited
pub fn filter_counterparts(
    amount: f64,
    self_id: Option<i64>,
    window: &[Transaction],
) -> Vec<MatchCandidate> {
    let mirrored = -amount;
    window
        .iter()
        .filter(|t| (t.amount - mirrored).abs() < AMOUNT_TOLERANCE)
        .filter(|t| Some(t.id) != self_id)
        .filter(|t| t.linked_transaction_id.is_none() || t.linked_transaction_id == self_id)
        .map(MatchCandidate::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use crate::models::TransactionSource;

    fn txn(id: i64, amount: f64, day: u32, linked: Option<i64>) -> Transaction {
        Transaction {
            id,
            account_id: 1,
            date: NaiveDate::from_ymd_opt(2024, 6, day)
                .unwrap()
                .and_hms_opt(12, 0, 0)
                .unwrap(),
            description: format!("TXN {}", id),
            recipient: String::new(),
            amount,
            category: None,
            is_transfer: false,
            to_account_id: None,
            linked_transaction_id: linked,
            exclude_from_reports: false,
            ref_id: None,
            source: TransactionSource::Manual,
            created_at: chrono::Utc::now(),
        }
    }

    #[test]
    fn test_mirrored_amount_within_tolerance_matches() {
        // Debit of 500 looks for a credit near +500
        let window = vec![txn(1, 500.0, 10, None), txn(2, 500.5, 10, None)];
        let matches = filter_counterparts(-500.0, None, &window);
        assert_eq!(matches.len(), 2);
    }

    #[test]
    fn test_tolerance_is_strict() {
        // Exactly 1.0 off must not match
        let window = vec![txn(1, 501.0, 10, None), txn(2, 499.0, 10, None)];
        let matches = filter_counterparts(-500.0, None, &window);
        assert!(matches.is_empty());
    }

    #[test]
    fn test_wrong_sign_does_not_match() {
        // Another debit of the same magnitude is not a counterpart
        let window = vec![txn(1, -500.0, 10, None)];
        let matches = filter_counterparts(-500.0, None, &window);
        assert!(matches.is_empty());
    }

    #[test]
    fn test_self_is_excluded() {
        let window = vec![txn(7, 500.0, 10, None)];
        let matches = filter_counterparts(-500.0, Some(7), &window);
        assert!(matches.is_empty());
    }

    #[test]
    fn test_candidate_linked_elsewhere_is_excluded() {
        let window = vec![txn(1, 500.0, 10, Some(99))];
        let matches = filter_counterparts(-500.0, Some(7), &window);
        assert!(matches.is_empty());
    }

    #[test]
    fn test_candidate_linked_to_self_is_kept() {
        // Re-editing a linked transfer re-offers the current counterpart
        let window = vec![txn(1, 500.0, 10, Some(7))];
        let matches = filter_counterparts(-500.0, Some(7), &window);
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].id, 1);
    }

    #[test]
    fn test_find_matches_uses_date_window_and_account() {
        let db = Database::in_memory().unwrap();
        let savings = db.create_account("HDFC Savings").unwrap();
        let current = db.create_account("ICICI Current").unwrap();

        for (account_id, day, amount) in [
            (savings, 10u32, 500.0),
            (savings, 14, 500.0),
            (savings, 20, 500.0),
            (current, 11, 500.0),
        ] {
            db.insert_transaction(&crate::models::NewTransaction {
                account_id,
                date: NaiveDate::from_ymd_opt(2024, 6, day)
                    .unwrap()
                    .and_hms_opt(12, 0, 0)
                    .unwrap(),
                description: "NEFT CR".to_string(),
                recipient: String::new(),
                amount,
                category: None,
                is_transfer: false,
                to_account_id: None,
                linked_transaction_id: None,
                exclude_from_reports: false,
                ref_id: None,
                source: TransactionSource::Manual,
            })
            .unwrap();
        }

        let matcher = TransferMatcher::new(&db);
        let date = NaiveDate::from_ymd_opt(2024, 6, 12)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap();
        // June 10 and 14 on the target account are inside the ±3 day window;
        // June 20 is outside it and the ICICI leg is on the wrong account
        let matches = matcher
            .find_matches(Some(savings), Some(-500.0), Some(date), None)
            .unwrap();
        assert_eq!(matches.len(), 2);
    }

    #[test]
    fn test_missing_fields_yield_empty_not_error() {
        let db = Database::in_memory().unwrap();
        let matcher = TransferMatcher::new(&db);
        let date = NaiveDate::from_ymd_opt(2024, 6, 12)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();

        assert!(matcher
            .find_matches(None, Some(-500.0), Some(date), None)
            .unwrap()
            .is_empty());
        assert!(matcher
            .find_matches(Some(1), None, Some(date), None)
            .unwrap()
            .is_empty());
        assert!(matcher
            .find_matches(Some(1), Some(-500.0), None, None)
            .unwrap()
            .is_empty());
    }
}
