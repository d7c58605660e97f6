//! Triage and training session state
//!
//! `TriageSession` is the stateful front half of the engine: the current
//! page of each queue, the active filters, the selection sets, and the
//! at-most-one-of-each transient prompts. It talks to the storage and
//! engine layers through the `FinanceApi` trait so the same session logic
//! drives the CLI (over `LocalApi`) and tests (over fakes).
//!
//! Failure discipline: any backend error leaves the session exactly as it
//! was, gets logged once, and is returned to the caller. A failed bulk
//! operation in particular must not clear the selection the user built up.

use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use tokio::task::JoinHandle;
use tracing::warn;

use crate::db::Database;
use crate::error::{Error, Result};
use crate::extract::derive_pattern;
use crate::matching::TransferMatcher;
use crate::models::{
    BulkRenamePrompt, Direction, LabelForm, MatchCandidate, MessageSource,
    NewPendingTransaction, Paginated, PendingTransaction, SmartCategorizationPrompt,
    SmartCategorizeRequest, SmartCategorizeResult, TriageDecision, UnparsedMessage,
};
use crate::rules::RuleEngine;
use crate::triage::{ApprovalOutcome, TriageEngine};

/// Quiet period between the last keystroke and the search refetch
pub const SEARCH_DEBOUNCE: Duration = Duration::from_millis(400);

/// Default page size for both queues
pub const DEFAULT_PAGE_SIZE: i64 = 25;

/// Triage queue query parameters
#[derive(Debug, Clone, Default)]
pub struct TriageQuery {
    pub search: Option<String>,
    pub source: Option<MessageSource>,
    pub sort_field: Option<String>,
    pub sort_order: Option<String>,
    pub limit: i64,
    pub skip: i64,
}

/// Training queue query parameters
#[derive(Debug, Clone, Default)]
pub struct TrainingQuery {
    pub search: Option<String>,
    pub limit: i64,
    pub skip: i64,
}

/// Backend operations the session depends on
#[async_trait]
pub trait FinanceApi: Send + Sync {
    async fn fetch_triage(&self, query: &TriageQuery) -> Result<Paginated<PendingTransaction>>;
    async fn fetch_training(&self, query: &TrainingQuery) -> Result<Paginated<UnparsedMessage>>;
    async fn approve_triage(
        &self,
        id: i64,
        account_id: i64,
        decision: &TriageDecision,
    ) -> Result<ApprovalOutcome>;
    async fn reject_triage(&self, id: i64, create_ignore_rule: bool) -> Result<()>;
    async fn bulk_reject_triage(&self, ids: &[i64], create_ignore_rules: bool) -> Result<i64>;
    async fn label_message(&self, id: i64, form: &LabelForm) -> Result<i64>;
    async fn dismiss_message(&self, id: i64, create_ignore_rule: bool) -> Result<()>;
    async fn bulk_dismiss_messages(&self, ids: &[i64], create_ignore_rules: bool) -> Result<i64>;
    async fn find_transfer_matches(
        &self,
        to_account_id: Option<i64>,
        amount: Option<f64>,
        date: Option<chrono::NaiveDateTime>,
        self_id: Option<i64>,
    ) -> Result<Vec<MatchCandidate>>;
    async fn smart_categorize(&self, req: &SmartCategorizeRequest)
        -> Result<SmartCategorizeResult>;
    async fn bulk_rename(
        &self,
        old_name: &str,
        new_name: &str,
        sync_to_parser: bool,
    ) -> Result<i64>;
}

/// `FinanceApi` implemented directly over the local database
#[derive(Clone)]
pub struct LocalApi {
    db: Database,
}

impl LocalApi {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub fn db(&self) -> &Database {
        &self.db
    }
}

#[async_trait]
impl FinanceApi for LocalApi {
    async fn fetch_triage(&self, query: &TriageQuery) -> Result<Paginated<PendingTransaction>> {
        self.db.list_pending(
            query.search.as_deref(),
            query.source,
            query.sort_field.as_deref(),
            query.sort_order.as_deref(),
            query.limit,
            query.skip,
        )
    }

    async fn fetch_training(&self, query: &TrainingQuery) -> Result<Paginated<UnparsedMessage>> {
        self.db
            .list_unparsed(query.search.as_deref(), query.limit, query.skip)
    }

    async fn approve_triage(
        &self,
        id: i64,
        account_id: i64,
        decision: &TriageDecision,
    ) -> Result<ApprovalOutcome> {
        TriageEngine::new(&self.db).approve(id, account_id, decision)
    }

    async fn reject_triage(&self, id: i64, create_ignore_rule: bool) -> Result<()> {
        TriageEngine::new(&self.db).reject(id, create_ignore_rule)?;
        Ok(())
    }

    async fn bulk_reject_triage(&self, ids: &[i64], create_ignore_rules: bool) -> Result<i64> {
        TriageEngine::new(&self.db).bulk_reject(ids, create_ignore_rules)
    }

    async fn label_message(&self, id: i64, form: &LabelForm) -> Result<i64> {
        let message = self
            .db
            .get_unparsed(id)?
            .ok_or_else(|| Error::NotFound(format!("Unparsed message {} not found", id)))?;

        let description = if form.description.trim().is_empty() {
            form.recipient.trim().to_string()
        } else {
            form.description.trim().to_string()
        };
        if description.is_empty() {
            return Err(Error::InvalidData(
                "A labeled message needs a description or recipient".to_string(),
            ));
        }

        let amount = match form.direction {
            Direction::Credit => form.amount.abs(),
            Direction::Debit => -form.amount.abs(),
        };

        let pending_id = self.db.label_unparsed(
            id,
            &NewPendingTransaction {
                source: MessageSource::Sms,
                date: form.date,
                amount,
                recipient: form.recipient.trim().to_string(),
                description: description.clone(),
                category: form.category.clone(),
                is_transfer: false,
                to_account_id: None,
                exclude_from_reports: form.exclude_from_reports,
            },
        )?;

        // Pattern derivation is opt-in and best effort
        if form.generate_pattern {
            let pattern = derive_pattern(&message.raw_content);
            if let Err(e) = self.db.upsert_parser_pattern(&description, &pattern) {
                warn!(message_id = id, "Failed to store derived pattern: {}", e);
            }
        }

        Ok(pending_id)
    }

    async fn dismiss_message(&self, id: i64, create_ignore_rule: bool) -> Result<()> {
        if !create_ignore_rule {
            return self.db.delete_unparsed(id);
        }

        // Snapshot before deleting; the rule needs the raw text
        let message = self
            .db
            .get_unparsed(id)?
            .ok_or_else(|| Error::NotFound(format!("Unparsed message {} not found", id)))?;
        self.db.delete_unparsed(id)?;
        if let Err(e) = RuleEngine::new(&self.db).create_ignore_rule_for_message(&message) {
            warn!(message_id = id, "Ignore rule creation failed: {}", e);
        }
        Ok(())
    }

    async fn bulk_dismiss_messages(&self, ids: &[i64], create_ignore_rules: bool) -> Result<i64> {
        if !create_ignore_rules {
            return self.db.delete_unparsed_bulk(ids);
        }

        let mut messages = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(message) = self.db.get_unparsed(*id)? {
                messages.push(message);
            }
        }

        let dismissed = self.db.delete_unparsed_bulk(ids)?;

        // Rule creation is best effort once the dismissals committed
        let engine = RuleEngine::new(&self.db);
        for message in &messages {
            if let Err(e) = engine.create_ignore_rule_for_message(message) {
                warn!(message_id = message.id, "Ignore rule creation failed: {}", e);
            }
        }

        Ok(dismissed)
    }

    async fn find_transfer_matches(
        &self,
        to_account_id: Option<i64>,
        amount: Option<f64>,
        date: Option<chrono::NaiveDateTime>,
        self_id: Option<i64>,
    ) -> Result<Vec<MatchCandidate>> {
        TransferMatcher::new(&self.db).find_matches(to_account_id, amount, date, self_id)
    }

    async fn smart_categorize(
        &self,
        req: &SmartCategorizeRequest,
    ) -> Result<SmartCategorizeResult> {
        RuleEngine::new(&self.db).smart_categorize(req)
    }

    async fn bulk_rename(
        &self,
        old_name: &str,
        new_name: &str,
        sync_to_parser: bool,
    ) -> Result<i64> {
        RuleEngine::new(&self.db).bulk_rename(old_name, new_name, sync_to_parser)
    }
}

/// Page position within a queue
#[derive(Debug, Clone, Copy)]
pub struct Pagination {
    pub limit: i64,
    pub skip: i64,
    pub total: i64,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            limit: DEFAULT_PAGE_SIZE,
            skip: 0,
            total: 0,
        }
    }
}

/// Source filter over the triage queue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SourceFilter {
    #[default]
    All,
    Sms,
    Email,
}

impl SourceFilter {
    fn as_source(self) -> Option<MessageSource> {
        match self {
            Self::All => None,
            Self::Sms => Some(MessageSource::Sms),
            Self::Email => Some(MessageSource::Email),
        }
    }
}

/// Item marked for discard, awaiting the second confirmation step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscardTarget {
    Triage(i64),
    Training(i64),
}

/// Stateful triage/training session over a `FinanceApi` backend
pub struct TriageSession<A: FinanceApi> {
    api: A,

    pub triage_items: Vec<PendingTransaction>,
    pub triage_page: Pagination,
    pub search_query: String,
    pub source_filter: SourceFilter,
    pub sort_field: String,
    pub sort_order: String,
    pub selected_triage: HashSet<i64>,

    pub training_items: Vec<UnparsedMessage>,
    pub training_page: Pagination,
    pub training_search: String,
    pub selected_training: HashSet<i64>,
    pub expanded_training: HashSet<i64>,

    pub categorize_prompt: Option<SmartCategorizationPrompt>,
    pub rename_prompt: Option<BulkRenamePrompt>,
    pub discard_target: Option<DiscardTarget>,
    pub is_processing_bulk: bool,
}

impl<A: FinanceApi> TriageSession<A> {
    pub fn new(api: A) -> Self {
        Self {
            api,
            triage_items: Vec::new(),
            triage_page: Pagination::default(),
            search_query: String::new(),
            source_filter: SourceFilter::default(),
            sort_field: "date".to_string(),
            sort_order: "desc".to_string(),
            selected_triage: HashSet::new(),
            training_items: Vec::new(),
            training_page: Pagination::default(),
            training_search: String::new(),
            selected_training: HashSet::new(),
            expanded_training: HashSet::new(),
            categorize_prompt: None,
            rename_prompt: None,
            discard_target: None,
            is_processing_bulk: false,
        }
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    fn triage_query(&self) -> TriageQuery {
        TriageQuery {
            search: if self.search_query.trim().is_empty() {
                None
            } else {
                Some(self.search_query.trim().to_string())
            },
            source: self.source_filter.as_source(),
            sort_field: Some(self.sort_field.clone()),
            sort_order: Some(self.sort_order.clone()),
            limit: self.triage_page.limit,
            skip: self.triage_page.skip,
        }
    }

    /// Fetch the current triage page
    ///
    /// Clears both selection sets (the visible rows are about to change out
    /// from under them) and clamps a now-out-of-range offset back to the
    /// first page, refetching once.
    pub async fn refresh_triage(&mut self) -> Result<()> {
        let page = match self.api.fetch_triage(&self.triage_query()).await {
            Ok(page) => page,
            Err(e) => {
                warn!("Triage fetch failed, state unchanged: {}", e);
                return Err(e);
            }
        };

        self.selected_triage.clear();
        self.selected_training.clear();

        if self.triage_page.skip >= page.total && page.total > 0 {
            // Filter narrowed the result set past our offset; restart at page 1
            self.triage_page.skip = 0;
            let page = self.api.fetch_triage(&self.triage_query()).await?;
            self.triage_page.total = page.total;
            self.triage_items = page.items;
        } else {
            self.triage_page.total = page.total;
            self.triage_items = page.items;
        }
        Ok(())
    }

    /// Fetch the current training page (same selection/clamp discipline)
    pub async fn refresh_training(&mut self) -> Result<()> {
        let query = TrainingQuery {
            search: if self.training_search.trim().is_empty() {
                None
            } else {
                Some(self.training_search.trim().to_string())
            },
            limit: self.training_page.limit,
            skip: self.training_page.skip,
        };

        let page = match self.api.fetch_training(&query).await {
            Ok(page) => page,
            Err(e) => {
                warn!("Training fetch failed, state unchanged: {}", e);
                return Err(e);
            }
        };

        self.selected_training.clear();

        if self.training_page.skip >= page.total && page.total > 0 {
            self.training_page.skip = 0;
            let query = TrainingQuery {
                skip: 0,
                ..query
            };
            let page = self.api.fetch_training(&query).await?;
            self.training_page.total = page.total;
            self.training_items = page.items;
        } else {
            self.training_page.total = page.total;
            self.training_items = page.items;
        }
        Ok(())
    }

    /// Apply a new search string (offset resets; caller debounces)
    pub async fn apply_search(&mut self, query: &str) -> Result<()> {
        self.search_query = query.to_string();
        self.triage_page.skip = 0;
        self.refresh_triage().await
    }

    /// Switch the source filter; takes effect immediately, no debounce
    pub async fn set_source_filter(&mut self, filter: SourceFilter) -> Result<()> {
        self.source_filter = filter;
        self.triage_page.skip = 0;
        self.refresh_triage().await
    }

    /// Change the sort and refetch from the first page
    pub async fn set_sort(&mut self, field: &str, order: &str) -> Result<()> {
        self.sort_field = field.to_string();
        self.sort_order = order.to_string();
        self.triage_page.skip = 0;
        self.refresh_triage().await
    }

    /// Move to the next triage page, if there is one
    pub async fn next_triage_page(&mut self) -> Result<()> {
        if self.triage_page.skip + self.triage_page.limit < self.triage_page.total {
            self.triage_page.skip += self.triage_page.limit;
            self.refresh_triage().await
        } else {
            Ok(())
        }
    }

    /// Move to the previous triage page, if there is one
    pub async fn prev_triage_page(&mut self) -> Result<()> {
        if self.triage_page.skip > 0 {
            self.triage_page.skip = (self.triage_page.skip - self.triage_page.limit).max(0);
            self.refresh_triage().await
        } else {
            Ok(())
        }
    }

    /// Toggle a triage row in or out of the selection
    pub fn toggle_triage_selection(&mut self, id: i64) {
        if !self.selected_triage.remove(&id) {
            self.selected_triage.insert(id);
        }
    }

    /// Toggle a training row in or out of the selection
    pub fn toggle_training_selection(&mut self, id: i64) {
        if !self.selected_training.remove(&id) {
            self.selected_training.insert(id);
        }
    }

    /// Toggle the expanded/collapsed state of a training row
    pub fn toggle_training_expanded(&mut self, id: i64) {
        if !self.expanded_training.remove(&id) {
            self.expanded_training.insert(id);
        }
    }

    /// Approve an item; a successful approval may raise the rule prompt
    ///
    /// A new prompt replaces any unconfirmed previous one wholesale.
    pub async fn approve(
        &mut self,
        id: i64,
        account_id: i64,
        decision: &TriageDecision,
    ) -> Result<i64> {
        let outcome = self.api.approve_triage(id, account_id, decision).await?;
        if let Some(prompt) = outcome.prompt {
            self.categorize_prompt = Some(prompt);
        }
        self.refresh_triage().await?;
        Ok(outcome.transaction_id)
    }

    /// First step of a reject: mark the target, nothing is deleted yet
    pub fn request_discard(&mut self, target: DiscardTarget) {
        self.discard_target = Some(target);
    }

    /// Abandon a pending discard
    pub fn cancel_discard(&mut self) {
        self.discard_target = None;
    }

    /// Second step: commit the marked discard
    pub async fn confirm_discard(&mut self, create_ignore_rule: bool) -> Result<()> {
        let target = self
            .discard_target
            .ok_or_else(|| Error::Triage("No discard pending confirmation".to_string()))?;

        match target {
            DiscardTarget::Triage(id) => {
                self.api.reject_triage(id, create_ignore_rule).await?;
                self.discard_target = None;
                self.refresh_triage().await
            }
            DiscardTarget::Training(id) => {
                self.api.dismiss_message(id, create_ignore_rule).await?;
                self.discard_target = None;
                self.refresh_training().await
            }
        }
    }

    /// Reject every selected triage item in one batch
    ///
    /// Guarded against double submission; on failure the selection is
    /// preserved so the user can retry or adjust it.
    pub async fn bulk_reject_selected(&mut self, create_ignore_rules: bool) -> Result<i64> {
        if self.is_processing_bulk {
            return Ok(0);
        }
        if self.selected_triage.is_empty() {
            return Ok(0);
        }

        self.is_processing_bulk = true;
        let mut ids: Vec<i64> = self.selected_triage.iter().copied().collect();
        ids.sort_unstable();

        let result = self.api.bulk_reject_triage(&ids, create_ignore_rules).await;
        self.is_processing_bulk = false;

        match result {
            Ok(count) => {
                self.refresh_triage().await?;
                Ok(count)
            }
            Err(e) => {
                warn!("Bulk reject failed, selection preserved: {}", e);
                Err(e)
            }
        }
    }

    /// Dismiss every selected training message in one batch
    pub async fn bulk_dismiss_selected(&mut self, create_ignore_rules: bool) -> Result<i64> {
        if self.is_processing_bulk || self.selected_training.is_empty() {
            return Ok(0);
        }

        self.is_processing_bulk = true;
        let mut ids: Vec<i64> = self.selected_training.iter().copied().collect();
        ids.sort_unstable();

        let result = self
            .api
            .bulk_dismiss_messages(&ids, create_ignore_rules)
            .await;
        self.is_processing_bulk = false;

        match result {
            Ok(count) => {
                self.refresh_training().await?;
                Ok(count)
            }
            Err(e) => {
                warn!("Bulk dismiss failed, selection preserved: {}", e);
                Err(e)
            }
        }
    }

    /// Label a training message into the triage queue
    pub async fn label_message(&mut self, id: i64, form: &LabelForm) -> Result<i64> {
        let pending_id = self.api.label_message(id, form).await?;
        self.refresh_training().await?;
        Ok(pending_id)
    }

    /// Confirm the active smart-categorization prompt
    pub async fn confirm_categorize_prompt(&mut self) -> Result<Option<SmartCategorizeResult>> {
        let Some(prompt) = self.categorize_prompt.take() else {
            return Ok(None);
        };

        let req = SmartCategorizeRequest {
            transaction_id: prompt.txn_id,
            category: prompt.category.clone(),
            create_rule: prompt.create_rule,
            apply_to_similar: prompt.apply_to_similar,
            exclude_from_reports: prompt.exclude_from_reports,
        };

        match self.api.smart_categorize(&req).await {
            Ok(result) => Ok(Some(result)),
            Err(e) => {
                // Put the prompt back; declining later is still possible
                self.categorize_prompt = Some(prompt);
                warn!("Smart categorize failed, prompt retained: {}", e);
                Err(e)
            }
        }
    }

    /// Decline the active smart-categorization prompt
    pub fn dismiss_categorize_prompt(&mut self) {
        self.categorize_prompt = None;
    }

    /// Confirm the active bulk-rename prompt
    pub async fn confirm_rename_prompt(&mut self) -> Result<i64> {
        let Some(prompt) = self.rename_prompt.take() else {
            return Ok(0);
        };

        match self
            .api
            .bulk_rename(&prompt.old_name, &prompt.new_name, prompt.sync_to_parser)
            .await
        {
            Ok(count) => Ok(count),
            Err(e) => {
                self.rename_prompt = Some(prompt);
                warn!("Bulk rename failed, prompt retained: {}", e);
                Err(e)
            }
        }
    }

    /// Decline the active bulk-rename prompt
    pub fn dismiss_rename_prompt(&mut self) {
        self.rename_prompt = None;
    }

    /// Toggle-select a transfer match candidate for a triage item
    ///
    /// Selecting the currently linked candidate clears the link.
    pub fn toggle_match_selection(
        item: &mut PendingTransaction,
        candidate_id: i64,
    ) -> Option<i64> {
        if item.linked_transaction_id == Some(candidate_id) {
            item.linked_transaction_id = None;
        } else {
            item.linked_transaction_id = Some(candidate_id);
        }
        item.linked_transaction_id
    }
}

/// Cancellable delayed dispatch for search-as-you-type
///
/// Each `schedule` aborts the previously scheduled task, so only the last
/// keystroke within the quiet period triggers work.
pub struct SearchDebouncer {
    delay: Duration,
    handle: Option<JoinHandle<()>>,
}

impl SearchDebouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            handle: None,
        }
    }

    /// Schedule `task` to run after the quiet period, superseding any
    /// previously scheduled task
    pub fn schedule<F>(&mut self, task: F)
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
        let delay = self.delay;
        self.handle = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            task.await;
        }));
    }

    /// Cancel whatever is scheduled
    pub fn cancel(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

impl Drop for SearchDebouncer {
    fn drop(&mut self) {
        self.cancel();
    }
}

impl Default for SearchDebouncer {
    fn default() -> Self {
        Self::new(SEARCH_DEBOUNCE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use crate::models::{RuleAction, UNCATEGORIZED};

    fn local_session() -> TriageSession<LocalApi> {
        let db = Database::in_memory().unwrap();
        TriageSession::new(LocalApi::new(db))
    }

    fn seed_pending(db: &Database, n: usize, source: MessageSource) {
        for i in 0..n {
            db.insert_pending(&NewPendingTransaction {
                source,
                date: NaiveDate::from_ymd_opt(2024, 7, 1)
                    .unwrap()
                    .and_hms_opt(9, 0, 0)
                    .unwrap(),
                amount: -(100.0 + i as f64),
                recipient: format!("MERCHANT{}", i),
                description: format!("UPI/MERCHANT{}/{}", i, i),
                category: UNCATEGORIZED.to_string(),
                is_transfer: false,
                to_account_id: None,
                exclude_from_reports: false,
            })
            .unwrap();
        }
    }

    #[tokio::test]
    async fn test_refresh_clears_selection() {
        let mut session = local_session();
        seed_pending(session.api().db(), 3, MessageSource::Sms);

        session.refresh_triage().await.unwrap();
        let id = session.triage_items[0].id;
        session.toggle_triage_selection(id);
        assert_eq!(session.selected_triage.len(), 1);

        session.refresh_triage().await.unwrap();
        assert!(session.selected_triage.is_empty());
    }

    #[tokio::test]
    async fn test_narrowed_filter_clamps_offset() {
        let mut session = local_session();
        session.triage_page.limit = 2;
        seed_pending(session.api().db(), 5, MessageSource::Sms);

        // Land on page 3
        session.refresh_triage().await.unwrap();
        session.next_triage_page().await.unwrap();
        session.next_triage_page().await.unwrap();
        assert_eq!(session.triage_page.skip, 4);

        // Search that matches a single item: offset snaps back to page 1
        session.apply_search("MERCHANT2").await.unwrap();
        assert_eq!(session.triage_page.skip, 0);
        assert_eq!(session.triage_page.total, 1);
        assert_eq!(session.triage_items.len(), 1);
    }

    #[tokio::test]
    async fn test_source_filter_resets_offset() {
        let mut session = local_session();
        session.triage_page.limit = 2;
        seed_pending(session.api().db(), 4, MessageSource::Sms);
        seed_pending(session.api().db(), 1, MessageSource::Email);

        session.refresh_triage().await.unwrap();
        session.next_triage_page().await.unwrap();
        assert_eq!(session.triage_page.skip, 2);

        session.set_source_filter(SourceFilter::Email).await.unwrap();
        assert_eq!(session.triage_page.skip, 0);
        assert_eq!(session.triage_page.total, 1);
    }

    #[tokio::test]
    async fn test_two_step_discard() {
        let mut session = local_session();
        seed_pending(session.api().db(), 1, MessageSource::Sms);
        session.refresh_triage().await.unwrap();
        let id = session.triage_items[0].id;

        // Step one marks, nothing is deleted
        session.request_discard(DiscardTarget::Triage(id));
        assert_eq!(session.api().db().count_pending().unwrap(), 1);

        // Cancel leaves the queue untouched
        session.cancel_discard();
        assert!(session.confirm_discard(false).await.is_err());
        assert_eq!(session.api().db().count_pending().unwrap(), 1);

        // Mark again and confirm
        session.request_discard(DiscardTarget::Triage(id));
        session.confirm_discard(false).await.unwrap();
        assert_eq!(session.api().db().count_pending().unwrap(), 0);
        assert!(session.discard_target.is_none());
    }

    #[tokio::test]
    async fn test_bulk_reject_failure_preserves_selection() {
        let mut session = local_session();
        seed_pending(session.api().db(), 2, MessageSource::Sms);
        session.refresh_triage().await.unwrap();

        let id = session.triage_items[0].id;
        session.toggle_triage_selection(id);
        session.toggle_triage_selection(999_999); // stale id, batch must fail

        assert!(session.bulk_reject_selected(false).await.is_err());
        assert_eq!(session.selected_triage.len(), 2);
        assert_eq!(session.api().db().count_pending().unwrap(), 2);
        assert!(!session.is_processing_bulk);
    }

    #[tokio::test]
    async fn test_training_dismiss_can_create_ignore_rule() {
        let mut session = local_session();
        let db = session.api().db().clone();
        let id = db
            .insert_unparsed(
                "INR 15,000 credited to your Acct 4471 by NEFT UTR: SBIN0THX8291044",
            )
            .unwrap();
        session.refresh_training().await.unwrap();

        session.request_discard(DiscardTarget::Training(id));
        session.confirm_discard(true).await.unwrap();

        assert_eq!(db.count_unparsed().unwrap(), 0);
        let rules = db.list_rules().unwrap();
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].action, RuleAction::Ignore);
    }

    #[tokio::test]
    async fn test_bulk_dismiss_selected_creates_ignore_rules() {
        let mut session = local_session();
        let db = session.api().db().clone();
        db.insert_unparsed("Dear customer your KYC is pending, click bit.ly/x1")
            .unwrap();
        db.insert_unparsed("Congratulations! You won a prize, call 99887")
            .unwrap();
        session.refresh_training().await.unwrap();

        for id in session
            .training_items
            .iter()
            .map(|m| m.id)
            .collect::<Vec<_>>()
        {
            session.toggle_training_selection(id);
        }

        assert_eq!(session.bulk_dismiss_selected(true).await.unwrap(), 2);
        assert_eq!(db.count_unparsed().unwrap(), 0);
        let rules = db.list_rules().unwrap();
        assert_eq!(rules.len(), 2);
        assert!(rules.iter().all(|r| r.action == RuleAction::Ignore));
    }

    #[tokio::test]
    async fn test_approve_sets_prompt_and_confirm_creates_rule() {
        let mut session = local_session();
        let account = session.api().db().create_account("HDFC").unwrap();
        seed_pending(session.api().db(), 1, MessageSource::Sms);
        session.refresh_triage().await.unwrap();
        let id = session.triage_items[0].id;

        session
            .approve(
                id,
                account,
                &TriageDecision {
                    category: "Food".to_string(),
                    is_transfer: false,
                    to_account_id: None,
                    exclude_from_reports: false,
                },
            )
            .await
            .unwrap();

        assert!(session.categorize_prompt.is_some());
        let result = session.confirm_categorize_prompt().await.unwrap().unwrap();
        assert!(result.rule_created);
        assert!(session.categorize_prompt.is_none());
        assert_eq!(session.api().db().list_rules().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_toggle_match_selection() {
        let mut item = PendingTransaction {
            id: 1,
            source: MessageSource::Sms,
            date: NaiveDate::from_ymd_opt(2024, 7, 1)
                .unwrap()
                .and_hms_opt(9, 0, 0)
                .unwrap(),
            amount: -100.0,
            recipient: String::new(),
            description: "IMPS DR".to_string(),
            category: UNCATEGORIZED.to_string(),
            is_transfer: true,
            to_account_id: Some(2),
            exclude_from_reports: false,
            linked_transaction_id: None,
            created_at: chrono::Utc::now(),
        };

        assert_eq!(
            TriageSession::<LocalApi>::toggle_match_selection(&mut item, 42),
            Some(42)
        );
        // Selecting the same candidate again clears the link
        assert_eq!(
            TriageSession::<LocalApi>::toggle_match_selection(&mut item, 42),
            None
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_debouncer_latest_keystroke_wins() {
        let fired = Arc::new(AtomicUsize::new(0));
        let mut debouncer = SearchDebouncer::new(Duration::from_millis(400));

        for _ in 0..3 {
            let fired = fired.clone();
            debouncer.schedule(async move {
                fired.fetch_add(1, Ordering::SeqCst);
            });
            tokio::time::advance(Duration::from_millis(100)).await;
        }

        // Only the last schedule survives its full quiet period
        tokio::time::advance(Duration::from_millis(500)).await;
        tokio::time::sleep(Duration::from_millis(1)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_debouncer_cancel() {
        let fired = Arc::new(AtomicUsize::new(0));
        let mut debouncer = SearchDebouncer::new(Duration::from_millis(400));

        let fired_clone = fired.clone();
        debouncer.schedule(async move {
            fired_clone.fetch_add(1, Ordering::SeqCst);
        });
        debouncer.cancel();

        tokio::time::advance(Duration::from_millis(500)).await;
        tokio::time::sleep(Duration::from_millis(1)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }
}
