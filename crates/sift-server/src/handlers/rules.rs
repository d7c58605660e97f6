//! Rule management handlers

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::{AppError, AppState, SuccessResponse};
use sift_core::models::{NewRule, Rule, RuleAction};
use sift_core::rules::RuleEngine;

/// GET /api/rules - List all rules
pub async fn list_rules(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Rule>>, AppError> {
    let rules = state.db.list_rules()?;
    Ok(Json(rules))
}

/// Request body for creating a rule
#[derive(Debug, Deserialize)]
pub struct CreateRuleRequest {
    pub name: String,
    pub category: String,
    pub keywords: Vec<String>,
    #[serde(default)]
    pub exclude_from_reports: bool,
    /// categorize (default) or ignore
    pub action: Option<String>,
}

/// POST /api/rules - Create a new rule
pub async fn create_rule(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateRuleRequest>,
) -> Result<Json<Rule>, AppError> {
    let action = match req.action.as_deref() {
        Some(s) if !s.trim().is_empty() => s
            .parse()
            .map_err(|_| AppError::bad_request(&format!("Unknown rule action: {}", s)))?,
        _ => RuleAction::Categorize,
    };

    let rule_id = state.db.insert_rule(&NewRule {
        name: req.name,
        category: req.category,
        keywords: req.keywords,
        exclude_from_reports: req.exclude_from_reports,
        action,
    })?;

    let rule = state
        .db
        .get_rule(rule_id)?
        .ok_or_else(|| AppError::internal("Rule not found after creation"))?;

    Ok(Json(rule))
}

/// DELETE /api/rules/:id - Delete a rule
pub async fn delete_rule(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<SuccessResponse>, AppError> {
    state.db.delete_rule(id)?;
    Ok(Json(SuccessResponse { success: true }))
}

/// Response for a retrospective rule application
#[derive(Serialize)]
pub struct ApplyRuleResponse {
    pub success: bool,
    /// Existing transactions the rule recategorized
    pub affected: i64,
}

/// POST /api/rules/:id/apply - Apply a rule to existing transactions
pub async fn apply_rule(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<ApplyRuleResponse>, AppError> {
    let affected = RuleEngine::new(&state.db).apply_rule_retrospectively(id)?;
    Ok(Json(ApplyRuleResponse {
        success: true,
        affected,
    }))
}
