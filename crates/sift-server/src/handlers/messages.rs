//! Message ingest seam for the SMS/email parsing collaborator
//!
//! The parser posts every bank message here. Messages it could structure
//! land in the triage queue; the rest keep their raw text in the training
//! queue for manual labeling. Messages matching an ignore rule enter
//! neither queue.

use std::sync::Arc;

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{AppError, AppState};
use sift_core::models::NewPendingTransaction;
use sift_core::rules::RuleEngine;

/// Request body for ingesting one message
#[derive(Debug, Deserialize)]
pub struct IngestMessageRequest {
    /// Raw message text, kept when parsing failed
    #[serde(default)]
    pub raw_content: String,
    /// Structured fields, when the parser succeeded
    pub parsed: Option<NewPendingTransaction>,
}

/// Which queue the message landed in; suppressed messages land in neither
#[derive(Serialize)]
pub struct IngestMessageResponse {
    pub queue: &'static str,
    pub id: Option<i64>,
}

/// POST /api/messages - Ingest a parsed or unparsed message
pub async fn ingest_message(
    State(state): State<Arc<AppState>>,
    Json(req): Json<IngestMessageRequest>,
) -> Result<Json<IngestMessageResponse>, AppError> {
    let engine = RuleEngine::new(&state.db);

    if let Some(parsed) = &req.parsed {
        if let Some(rule) = engine.find_suppressing_rule(&parsed.recipient, &parsed.description)? {
            info!(rule_id = rule.id, "Suppressed incoming parsed message");
            return Ok(Json(IngestMessageResponse {
                queue: "suppressed",
                id: None,
            }));
        }
        let id = state.db.insert_pending(parsed)?;
        return Ok(Json(IngestMessageResponse {
            queue: "triage",
            id: Some(id),
        }));
    }

    let raw = req.raw_content.trim();
    if raw.is_empty() {
        return Err(AppError::bad_request(
            "Message needs either parsed fields or raw content",
        ));
    }

    if let Some(rule) = engine.find_suppressing_rule("", raw)? {
        info!(rule_id = rule.id, "Suppressed incoming raw message");
        return Ok(Json(IngestMessageResponse {
            queue: "suppressed",
            id: None,
        }));
    }

    let id = state.db.insert_unparsed(&req.raw_content)?;
    Ok(Json(IngestMessageResponse {
        queue: "training",
        id: Some(id),
    }))
}
