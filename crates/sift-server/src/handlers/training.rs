//! Training queue handlers
//!
//! Unparsed messages wait here until someone labels them into the triage
//! queue or dismisses them.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::{AppError, AppState, MAX_PAGE_LIMIT};
use sift_core::models::{LabelForm, Paginated, UnparsedMessage};
use sift_core::session::{FinanceApi, LocalApi};

/// Query parameters for the training queue
#[derive(Debug, Deserialize)]
pub struct TrainingListQuery {
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub skip: i64,
    /// Search query (filters by raw message content)
    pub search: Option<String>,
}

fn default_limit() -> i64 {
    25
}

/// GET /api/training - List unparsed messages
pub async fn list_training(
    State(state): State<Arc<AppState>>,
    Query(params): Query<TrainingListQuery>,
) -> Result<Json<Paginated<UnparsedMessage>>, AppError> {
    let limit = params.limit.max(1).min(MAX_PAGE_LIMIT);
    let skip = params.skip.max(0);

    let page = state
        .db
        .list_unparsed(params.search.as_deref(), limit, skip)?;
    Ok(Json(page))
}

/// Response for labeling a message
#[derive(Serialize)]
pub struct LabelResponse {
    pub success: bool,
    /// The pending transaction the label produced
    pub pending_id: i64,
}

/// POST /api/training/:id/label - Convert a message into a pending transaction
pub async fn label_message(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(form): Json<LabelForm>,
) -> Result<Json<LabelResponse>, AppError> {
    let api = LocalApi::new(state.db.clone());
    let pending_id = api.label_message(id, &form).await?;
    Ok(Json(LabelResponse {
        success: true,
        pending_id,
    }))
}

/// Request body for a single dismissal; the body is optional
#[derive(Debug, Default, Deserialize)]
pub struct DismissRequest {
    /// Record a suppression rule from the message before deleting it
    #[serde(default)]
    pub create_ignore_rule: bool,
}

/// POST /api/training/:id/dismiss - Delete a message without labeling it
pub async fn dismiss_message(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    body: Option<Json<DismissRequest>>,
) -> Result<Json<crate::SuccessResponse>, AppError> {
    let req = body.map(|Json(req)| req).unwrap_or_default();
    let api = LocalApi::new(state.db.clone());
    api.dismiss_message(id, req.create_ignore_rule).await?;
    Ok(Json(crate::SuccessResponse { success: true }))
}

/// Request body for bulk dismissal
#[derive(Debug, Deserialize)]
pub struct BulkDismissRequest {
    pub ids: Vec<i64>,
    #[serde(default)]
    pub create_ignore_rules: bool,
}

/// Response for bulk dismissal
#[derive(Serialize)]
pub struct BulkDismissResponse {
    pub success: bool,
    pub dismissed: i64,
}

/// POST /api/training/bulk-dismiss - Delete a batch of messages
pub async fn bulk_dismiss_messages(
    State(state): State<Arc<AppState>>,
    Json(req): Json<BulkDismissRequest>,
) -> Result<Json<BulkDismissResponse>, AppError> {
    if req.ids.is_empty() {
        return Err(AppError::bad_request("No messages selected"));
    }

    let api = LocalApi::new(state.db.clone());
    let dismissed = api
        .bulk_dismiss_messages(&req.ids, req.create_ignore_rules)
        .await?;
    Ok(Json(BulkDismissResponse {
        success: true,
        dismissed,
    }))
}
