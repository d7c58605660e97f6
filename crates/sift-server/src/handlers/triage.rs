//! Triage queue handlers

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::{AppError, AppState, MAX_PAGE_LIMIT};
use sift_core::models::{Paginated, PendingTransaction, TriageDecision};
use sift_core::triage::{ApprovalOutcome, TriageEngine};

/// Query parameters for the triage queue
#[derive(Debug, Deserialize)]
pub struct TriageListQuery {
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub skip: i64,
    /// Search query (filters by recipient or description)
    pub search: Option<String>,
    /// Filter by message source (sms or email)
    pub source: Option<String>,
    /// Sort field (date, amount or recipient)
    pub sort: Option<String>,
    /// Sort direction (asc or desc)
    pub order: Option<String>,
}

fn default_limit() -> i64 {
    25
}

/// GET /api/triage - List pending transactions
pub async fn list_triage(
    State(state): State<Arc<AppState>>,
    Query(params): Query<TriageListQuery>,
) -> Result<Json<Paginated<PendingTransaction>>, AppError> {
    // Input validation: clamp pagination parameters
    let limit = params.limit.max(1).min(MAX_PAGE_LIMIT);
    let skip = params.skip.max(0);

    let source = match params.source.as_deref() {
        Some(s) if !s.trim().is_empty() => Some(
            s.parse()
                .map_err(|_| AppError::bad_request(&format!("Unknown message source: {}", s)))?,
        ),
        _ => None,
    };

    let page = state.db.list_pending(
        params.search.as_deref(),
        source,
        params.sort.as_deref(),
        params.order.as_deref(),
        limit,
        skip,
    )?;

    Ok(Json(page))
}

/// Request body for approving a pending transaction
#[derive(Debug, Deserialize)]
pub struct ApproveRequest {
    pub account_id: i64,
    pub category: String,
    #[serde(default)]
    pub is_transfer: bool,
    pub to_account_id: Option<i64>,
    #[serde(default)]
    pub exclude_from_reports: bool,
    /// Confirmed transfer counterpart, when one was picked in the editor
    pub linked_transaction_id: Option<i64>,
}

/// POST /api/triage/:id/approve - Promote a pending transaction to the ledger
pub async fn approve_triage(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(req): Json<ApproveRequest>,
) -> Result<Json<ApprovalOutcome>, AppError> {
    // A picked counterpart is recorded on the pending row first so the
    // promotion back-links it atomically.
    if req.linked_transaction_id.is_some() {
        state.db.set_pending_link(id, req.linked_transaction_id)?;
    }

    let decision = TriageDecision {
        category: req.category,
        is_transfer: req.is_transfer,
        to_account_id: req.to_account_id,
        exclude_from_reports: req.exclude_from_reports,
    };

    let outcome = TriageEngine::new(&state.db).approve(id, req.account_id, &decision)?;
    Ok(Json(outcome))
}

/// Request body for rejecting a pending transaction
#[derive(Debug, Default, Deserialize)]
pub struct RejectRequest {
    #[serde(default)]
    pub create_ignore_rule: bool,
}

/// Response for a single rejection
#[derive(Serialize)]
pub struct RejectResponse {
    pub success: bool,
    /// Suppression rule created alongside the rejection, if any
    pub rule_id: Option<i64>,
}

/// POST /api/triage/:id/reject - Discard a pending transaction
pub async fn reject_triage(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(req): Json<RejectRequest>,
) -> Result<Json<RejectResponse>, AppError> {
    let rule_id = TriageEngine::new(&state.db).reject(id, req.create_ignore_rule)?;
    Ok(Json(RejectResponse {
        success: true,
        rule_id,
    }))
}

/// Request body for bulk rejection
#[derive(Debug, Deserialize)]
pub struct BulkRejectRequest {
    pub ids: Vec<i64>,
    #[serde(default)]
    pub create_ignore_rules: bool,
}

/// Response for bulk rejection
#[derive(Serialize)]
pub struct BulkRejectResponse {
    pub success: bool,
    pub rejected: i64,
}

/// POST /api/triage/bulk-reject - Discard a batch of pending transactions
///
/// All-or-nothing: if any ID is unknown, nothing is deleted.
pub async fn bulk_reject_triage(
    State(state): State<Arc<AppState>>,
    Json(req): Json<BulkRejectRequest>,
) -> Result<Json<BulkRejectResponse>, AppError> {
    if req.ids.is_empty() {
        return Err(AppError::bad_request("No triage items selected"));
    }

    let rejected = TriageEngine::new(&state.db).bulk_reject(&req.ids, req.create_ignore_rules)?;
    Ok(Json(BulkRejectResponse {
        success: true,
        rejected,
    }))
}
