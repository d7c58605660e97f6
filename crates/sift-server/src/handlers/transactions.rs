//! Confirmed-ledger handlers: listing, edits, transfer matching and the
//! smart-categorize / bulk-rename operations raised by edit prompts.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::{AppError, AppState, MAX_PAGE_LIMIT};
use sift_core::matching::TransferMatcher;
use sift_core::models::{
    MatchCandidate, Paginated, SmartCategorizeRequest, SmartCategorizeResult, Transaction,
};
use sift_core::rules::{EditPrompts, RuleEngine};

/// Query parameters for listing transactions
#[derive(Debug, Deserialize)]
pub struct TransactionQuery {
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub skip: i64,
    pub account_id: Option<i64>,
    /// Search query (filters by description or recipient)
    pub search: Option<String>,
}

fn default_limit() -> i64 {
    50
}

/// GET /api/transactions - List confirmed transactions
pub async fn list_transactions(
    State(state): State<Arc<AppState>>,
    Query(params): Query<TransactionQuery>,
) -> Result<Json<Paginated<Transaction>>, AppError> {
    // Input validation: clamp pagination parameters
    let limit = params.limit.max(1).min(MAX_PAGE_LIMIT);
    let skip = params.skip.max(0);

    let search = params.search.as_deref();
    let items = state
        .db
        .search_transactions(params.account_id, search, limit, skip)?;
    let total = state
        .db
        .count_transactions_search(params.account_id, search)?;

    Ok(Json(Paginated { items, total }))
}

/// Request body for editing a transaction
#[derive(Debug, Deserialize)]
pub struct UpdateTransactionRequest {
    pub description: String,
    #[serde(default)]
    pub recipient: String,
    pub category: Option<String>,
    #[serde(default)]
    pub is_transfer: bool,
    pub to_account_id: Option<i64>,
    #[serde(default)]
    pub exclude_from_reports: bool,
    /// Transfer counterpart picked in the editor; links both legs
    pub linked_transaction_id: Option<i64>,
}

/// Response for a transaction edit: the saved row plus any follow-up
/// prompts the edit raised
#[derive(Serialize)]
pub struct UpdateTransactionResponse {
    pub transaction: Transaction,
    pub prompts: EditPrompts,
}

/// PUT /api/transactions/:id - Edit a transaction
///
/// The single-row edit always commits; the returned prompts are offers to
/// generalize it (categorize similar rows, rename everywhere) that the
/// client confirms through separate endpoints.
pub async fn update_transaction(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(req): Json<UpdateTransactionRequest>,
) -> Result<Json<UpdateTransactionResponse>, AppError> {
    let original = state
        .db
        .get_transaction(id)?
        .ok_or_else(|| AppError::not_found("Transaction not found"))?;

    state.db.update_transaction(
        id,
        &req.description,
        &req.recipient,
        req.category.as_deref(),
        req.is_transfer,
        req.to_account_id,
        req.exclude_from_reports,
    )?;

    if let Some(counterpart_id) = req.linked_transaction_id {
        if original.linked_transaction_id != Some(counterpart_id) {
            state.db.link_transfer_pair(id, counterpart_id)?;
        }
    }

    let edited = state
        .db
        .get_transaction(id)?
        .ok_or_else(|| AppError::internal("Transaction missing after update"))?;

    let prompts = RuleEngine::new(&state.db).evaluate_edit(&original, &edited);

    Ok(Json(UpdateTransactionResponse {
        transaction: edited,
        prompts,
    }))
}

/// Request body for counting transfer counterpart candidates
#[derive(Debug, Deserialize)]
pub struct MatchCountRequest {
    pub to_account_id: Option<i64>,
    pub amount: Option<f64>,
    pub date: Option<NaiveDateTime>,
    /// Transaction being edited, excluded from its own candidates
    pub self_id: Option<i64>,
}

/// Response with the candidate count and the candidates themselves
#[derive(Serialize)]
pub struct MatchCountResponse {
    pub count: i64,
    pub candidates: Vec<MatchCandidate>,
}

/// POST /api/match-count - Find transfer counterpart candidates
///
/// Missing fields yield an empty result rather than an error; the editor
/// polls this as the form is filled in.
pub async fn match_count(
    State(state): State<Arc<AppState>>,
    Json(req): Json<MatchCountRequest>,
) -> Result<Json<MatchCountResponse>, AppError> {
    let candidates = TransferMatcher::new(&state.db).find_matches(
        req.to_account_id,
        req.amount,
        req.date,
        req.self_id,
    )?;

    Ok(Json(MatchCountResponse {
        count: candidates.len() as i64,
        candidates,
    }))
}

/// POST /api/transactions/smart-categorize - Confirm a categorize prompt
pub async fn smart_categorize(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SmartCategorizeRequest>,
) -> Result<Json<SmartCategorizeResult>, AppError> {
    let result = RuleEngine::new(&state.db).smart_categorize(&req)?;
    Ok(Json(result))
}

/// Request body for propagating a description rename
#[derive(Debug, Deserialize)]
pub struct BulkRenameRequest {
    pub old_name: String,
    pub new_name: String,
    /// Also rename the merchant in saved parser patterns
    #[serde(default)]
    pub sync_to_parser: bool,
}

/// Response for a bulk rename
#[derive(Serialize)]
pub struct BulkRenameResponse {
    pub success: bool,
    pub renamed: i64,
}

/// POST /api/transactions/bulk-rename - Confirm a rename prompt
pub async fn bulk_rename(
    State(state): State<Arc<AppState>>,
    Json(req): Json<BulkRenameRequest>,
) -> Result<Json<BulkRenameResponse>, AppError> {
    let renamed = RuleEngine::new(&state.db).bulk_rename(
        &req.old_name,
        &req.new_name,
        req.sync_to_parser,
    )?;
    Ok(Json(BulkRenameResponse {
        success: true,
        renamed,
    }))
}
