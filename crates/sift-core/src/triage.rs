//! Triage state machine
//!
//! A pending transaction has exactly one transition out of the queue:
//! approval promotes it into the confirmed ledger, rejection discards it
//! (optionally teaching the parser to suppress its kind). There is no way
//! back and no bulk approval; confirming money in bulk is how mistakes
//! compound.

use serde::Serialize;
use tracing::{info, warn};

use crate::db::Database;
use crate::error::{Error, Result};
use crate::models::{SmartCategorizationPrompt, TriageDecision};
use crate::rules::RuleEngine;

/// What an approval produced
#[derive(Debug, Serialize)]
pub struct ApprovalOutcome {
    /// ID of the newly confirmed transaction
    pub transaction_id: i64,
    /// Follow-up rule-creation prompt, when the decision warrants one
    pub prompt: Option<SmartCategorizationPrompt>,
}

/// Triage engine over the shared database
pub struct TriageEngine<'a> {
    db: &'a Database,
}

impl<'a> TriageEngine<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Approve a pending transaction
    ///
    /// Promotes it into `transactions` under the given account, applying the
    /// decision's edits, then raises the forward-looking rule prompt for a
    /// meaningful non-transfer category. Prompt construction failing never
    /// fails the approval.
    pub fn approve(
        &self,
        id: i64,
        account_id: i64,
        decision: &TriageDecision,
    ) -> Result<ApprovalOutcome> {
        let pending = self
            .db
            .get_pending(id)?
            .ok_or_else(|| Error::NotFound(format!("Pending transaction {} not found", id)))?;

        let transaction_id = self.db.promote_pending(id, account_id, decision)?;
        info!(pending_id = id, transaction_id, "Approved triage item");

        let prompt = RuleEngine::new(self.db).prompt_for_approval(&pending, decision, transaction_id);

        Ok(ApprovalOutcome {
            transaction_id,
            prompt,
        })
    }

    /// Reject a pending transaction
    ///
    /// Deletes the item; with `create_ignore_rule` it first records a
    /// suppression rule so future messages of its kind skip the queue.
    /// Returns the new rule's ID when one was created.
    pub fn reject(&self, id: i64, create_ignore_rule: bool) -> Result<Option<i64>> {
        let pending = self
            .db
            .get_pending(id)?
            .ok_or_else(|| Error::NotFound(format!("Pending transaction {} not found", id)))?;

        let rule_id = if create_ignore_rule {
            RuleEngine::new(self.db).create_ignore_rule(&pending)?
        } else {
            None
        };

        self.db.delete_pending(id)?;
        info!(pending_id = id, ignore_rule = ?rule_id, "Rejected triage item");
        Ok(rule_id)
    }

    /// Reject a batch of pending transactions, all-or-nothing
    ///
    /// The deletions run in one SQL transaction; a missing ID fails the
    /// whole batch so the caller's selection stays meaningful. Ignore-rule
    /// creation for the batch is best effort and happens only after the
    /// deletions committed.
    pub fn bulk_reject(&self, ids: &[i64], create_ignore_rules: bool) -> Result<i64> {
        // A selection can hand the same ID over twice; each row is
        // rejected once either way.
        let mut ids = ids.to_vec();
        ids.sort_unstable();
        ids.dedup();
        if ids.is_empty() {
            return Ok(0);
        }

        // Snapshot the rows first; the rules need them after deletion
        let mut items = Vec::with_capacity(ids.len());
        for id in &ids {
            let pending = self.db.get_pending(*id)?.ok_or_else(|| {
                Error::NotFound(format!("Pending transaction {} not found", id))
            })?;
            items.push(pending);
        }

        let deleted = self.db.delete_pending_bulk(&ids)?;
        if deleted != ids.len() as i64 {
            return Err(Error::Triage(format!(
                "Bulk reject removed {} of {} items",
                deleted,
                ids.len()
            )));
        }

        if create_ignore_rules {
            let engine = RuleEngine::new(self.db);
            for item in &items {
                if let Err(e) = engine.create_ignore_rule(item) {
                    warn!(pending_id = item.id, "Ignore rule creation failed: {}", e);
                }
            }
        }

        info!(count = deleted, "Bulk rejected triage items");
        Ok(deleted)
    }
}
