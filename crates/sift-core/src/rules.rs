//! Rule suggestion and application engine
//!
//! Watches transaction edits for moments worth automating: a category
//! change, an exclude toggle, or a description rename each raise a
//! transient prompt offering to generalize the edit into a durable rule
//! or a bulk update. Confirming a prompt runs the heavier operations
//! (`smart_categorize`, `bulk_rename`); declining costs nothing, the
//! single-row edit has already been saved.

use serde::Serialize;
use tracing::warn;

use crate::db::Database;
use crate::error::{Error, Result};
use crate::extract::suppression_keyword;
use crate::models::{
    BulkRenamePrompt, NewRule, PendingTransaction, Rule, RuleAction, SmartCategorizationPrompt,
    SmartCategorizeRequest, SmartCategorizeResult, Transaction, TriageDecision, UnparsedMessage,
    UNCATEGORIZED,
};

/// Prompts raised by a single edit; the two kinds are independent
#[derive(Debug, Default, Serialize)]
pub struct EditPrompts {
    pub categorize: Option<SmartCategorizationPrompt>,
    pub rename: Option<BulkRenamePrompt>,
}

/// Rule engine over the shared database
pub struct RuleEngine<'a> {
    db: &'a Database,
}

impl<'a> RuleEngine<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Inspect a saved edit and decide which prompts to raise
    ///
    /// Called after the single-row save has committed, so every failure
    /// here degrades to "no prompt" rather than undoing the edit.
    pub fn evaluate_edit(&self, original: &Transaction, edited: &Transaction) -> EditPrompts {
        let mut prompts = EditPrompts::default();

        let old_category = original.category.as_deref().unwrap_or("");
        let new_category = edited.category.as_deref().unwrap_or("");
        let category_changed = !new_category.is_empty() && new_category != old_category;
        let exclude_turned_on = !original.exclude_from_reports && edited.exclude_from_reports;

        if category_changed || exclude_turned_on {
            let pattern = rule_pattern(&edited.recipient, &edited.description);
            if !pattern.is_empty() {
                // Items still sitting in triage count too; confirming the
                // prompt should cover what the queue is about to add.
                match self.db.count_similar(&[&pattern], true) {
                    Ok(count) => {
                        // Turning exclusion on always asks about the rest of
                        // the group. A category change needs an audience: a
                        // zero count still prompts when the recipient is
                        // known, the rule is for messages that have not
                        // arrived yet.
                        if exclude_turned_on
                            || count > 0
                            || !edited.recipient.trim().is_empty()
                        {
                            let category = if category_changed {
                                new_category.to_string()
                            } else {
                                edited
                                    .category
                                    .clone()
                                    .filter(|c| !c.is_empty())
                                    .unwrap_or_else(|| UNCATEGORIZED.to_string())
                            };
                            prompts.categorize = Some(SmartCategorizationPrompt {
                                txn_id: edited.id,
                                category,
                                pattern,
                                similar_count: count,
                                create_rule: true,
                                apply_to_similar: count > 0,
                                exclude_from_reports: edited.exclude_from_reports,
                            });
                        }
                    }
                    Err(e) => warn!("Similar-count lookup failed, skipping prompt: {}", e),
                }
            }
        }

        let old_name = original.description.trim();
        let new_name = edited.description.trim();
        if !new_name.is_empty() && !old_name.is_empty() && !new_name.eq_ignore_ascii_case(old_name)
        {
            match self.db.count_similar(&[old_name], false) {
                Ok(count) if count > 0 => {
                    prompts.rename = Some(BulkRenamePrompt {
                        old_name: old_name.to_string(),
                        new_name: new_name.to_string(),
                        affected_count: count,
                        sync_to_parser: true,
                    });
                }
                Ok(_) => {}
                Err(e) => warn!("Rename-count lookup failed, skipping prompt: {}", e),
            }
        }

        prompts
    }

    /// Build the rule-creation prompt raised after approving a triage item
    ///
    /// Approval already placed the transaction, so the count of similar
    /// historical rows is irrelevant; the prompt is purely forward-looking
    /// and is only worth raising for a meaningful category on a non-transfer.
    pub fn prompt_for_approval(
        &self,
        pending: &PendingTransaction,
        decision: &TriageDecision,
        new_txn_id: i64,
    ) -> Option<SmartCategorizationPrompt> {
        let category = decision.category.trim();
        if category.is_empty() || category == UNCATEGORIZED || decision.is_transfer {
            return None;
        }

        let pattern = rule_pattern(&pending.recipient, &pending.description);
        if pattern.is_empty() {
            return None;
        }

        Some(SmartCategorizationPrompt {
            txn_id: new_txn_id,
            category: category.to_string(),
            pattern,
            similar_count: 0,
            create_rule: true,
            apply_to_similar: false,
            exclude_from_reports: decision.exclude_from_reports,
        })
    }

    /// Execute a confirmed smart-categorization prompt
    ///
    /// The originating transaction is updated first, then the optional bulk
    /// recategorization, then the optional rule. The toggles are independent;
    /// a failure partway leaves the earlier steps committed.
    pub fn smart_categorize(&self, req: &SmartCategorizeRequest) -> Result<SmartCategorizeResult> {
        let txn = self
            .db
            .get_transaction(req.transaction_id)?
            .ok_or_else(|| {
                Error::NotFound(format!("Transaction {} not found", req.transaction_id))
            })?;

        let category = req.category.trim();
        if category.is_empty() {
            return Err(Error::Rule("Category must not be empty".to_string()));
        }

        let pattern = rule_pattern(&txn.recipient, &txn.description);

        let affected = if req.apply_to_similar && !pattern.is_empty() {
            self.db
                .recategorize_similar(&pattern, category, req.exclude_from_reports)?
        } else {
            self.db.set_transaction_category(
                req.transaction_id,
                category,
                req.exclude_from_reports,
            )?;
            1
        };

        let rule_created = if req.create_rule && !pattern.is_empty() {
            self.db.insert_rule(&NewRule {
                name: pattern.clone(),
                category: category.to_string(),
                keywords: vec![pattern.clone()],
                exclude_from_reports: req.exclude_from_reports,
                action: RuleAction::Categorize,
            })?;
            true
        } else {
            false
        };

        Ok(SmartCategorizeResult {
            success: true,
            affected,
            rule_created,
            pattern,
        })
    }

    /// Create a suppression rule from a rejected or dismissed item
    ///
    /// Returns Ok(None) when the item carries no usable pattern; rejection
    /// still proceeds, it just cannot teach the parser anything.
    pub fn create_ignore_rule(&self, pending: &PendingTransaction) -> Result<Option<i64>> {
        let pattern = rule_pattern(&pending.recipient, &pending.description);
        if pattern.is_empty() {
            return Ok(None);
        }

        let id = self.db.insert_rule(&NewRule {
            name: format!("Ignore {}", pattern),
            category: UNCATEGORIZED.to_string(),
            keywords: vec![pattern],
            exclude_from_reports: true,
            action: RuleAction::Ignore,
        })?;
        Ok(Some(id))
    }

    /// Create a suppression rule from a dismissed raw message
    ///
    /// The keyword is the message template's stable text, so siblings with
    /// different amounts or references still match. Returns Ok(None) when
    /// the message has no stable text to key on; the dismissal proceeds
    /// without teaching anything.
    pub fn create_ignore_rule_for_message(
        &self,
        message: &UnparsedMessage,
    ) -> Result<Option<i64>> {
        let keyword = suppression_keyword(&message.raw_content);
        if keyword.is_empty() {
            return Ok(None);
        }

        let id = self.db.insert_rule(&NewRule {
            name: format!("Ignore {}", keyword),
            category: UNCATEGORIZED.to_string(),
            keywords: vec![keyword],
            exclude_from_reports: true,
            action: RuleAction::Ignore,
        })?;
        Ok(Some(id))
    }

    /// Find the ignore rule suppressing a message, if any
    ///
    /// Ingest consults this for every incoming message; a hit means the
    /// message never enters a queue.
    pub fn find_suppressing_rule(
        &self,
        recipient: &str,
        description: &str,
    ) -> Result<Option<Rule>> {
        Ok(self
            .db
            .list_rules()?
            .into_iter()
            .filter(|r| r.action == RuleAction::Ignore)
            .find(|r| rule_matches(r, recipient, description)))
    }

    /// Apply a rule to the historical ledger
    ///
    /// Recategorizes every transaction matching any keyword. Rows already in
    /// the rule's category are left alone, so re-applying is a no-op and the
    /// returned count reflects actual changes. Ignore rules act on incoming
    /// messages, not history, and apply as zero.
    pub fn apply_rule_retrospectively(&self, rule_id: i64) -> Result<i64> {
        let rule = self
            .db
            .get_rule(rule_id)?
            .ok_or_else(|| Error::NotFound(format!("Rule {} not found", rule_id)))?;

        if rule.action == RuleAction::Ignore {
            return Ok(0);
        }

        let conn = self.db.conn()?;

        let mut conditions = Vec::new();
        let mut params: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();
        for keyword in &rule.keywords {
            conditions.push(
                "(UPPER(recipient) LIKE ? OR UPPER(description) LIKE ?)".to_string(),
            );
            let like = format!("%{}%", keyword.to_uppercase());
            params.push(Box::new(like.clone()));
            params.push(Box::new(like));
        }
        if conditions.is_empty() {
            return Ok(0);
        }

        let sql = format!(
            "UPDATE transactions SET category = ?, exclude_from_reports = ?
             WHERE ({}) AND (category IS NULL OR category != ?)",
            conditions.join(" OR ")
        );

        let mut all_params: Vec<Box<dyn rusqlite::ToSql>> = vec![
            Box::new(rule.category.clone()),
            Box::new(rule.exclude_from_reports),
        ];
        all_params.extend(params);
        all_params.push(Box::new(rule.category.clone()));

        let params_refs: Vec<&dyn rusqlite::ToSql> =
            all_params.iter().map(|p| p.as_ref()).collect();
        let updated = conn.execute(&sql, params_refs.as_slice())?;

        Ok(updated as i64)
    }

    /// Execute a confirmed bulk rename
    ///
    /// Propagates the new description to every transaction carrying the old
    /// one. Keeping the message parser's vocabulary in sync is best effort:
    /// a pattern-store failure is logged and the rename still counts.
    pub fn bulk_rename(&self, old_name: &str, new_name: &str, sync_to_parser: bool) -> Result<i64> {
        let old_name = old_name.trim();
        let new_name = new_name.trim();
        if old_name.is_empty() || new_name.is_empty() {
            return Err(Error::Rule(
                "Both the old and new name are required for a rename".to_string(),
            ));
        }

        let renamed = self.db.rename_description(old_name, new_name)?;

        if sync_to_parser {
            if let Err(e) = self.db.rename_parser_merchant(old_name, new_name) {
                warn!("Parser merchant rename failed (rename kept): {}", e);
            }
        }

        Ok(renamed)
    }
}

/// The match pattern for an item: its recipient, or its description when
/// the parser never identified a counterparty
pub fn rule_pattern(recipient: &str, description: &str) -> String {
    let recipient = recipient.trim();
    if !recipient.is_empty() {
        recipient.to_string()
    } else {
        description.trim().to_string()
    }
}

/// Check whether a rule matches a recipient/description pair
///
/// Keywords are case-insensitive substrings, any one suffices.
pub fn rule_matches(rule: &Rule, recipient: &str, description: &str) -> bool {
    let recipient_upper = recipient.to_uppercase();
    let description_upper = description.to_uppercase();
    rule.keywords.iter().any(|k| {
        let k_upper = k.to_uppercase();
        recipient_upper.contains(&k_upper) || description_upper.contains(&k_upper)
    })
}
