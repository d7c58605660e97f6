//! Server API tests

use super::*;
use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use chrono::NaiveDate;
use http_body_util::BodyExt;
use sift_core::db::Database;
use sift_core::models::{MessageSource, NewPendingTransaction, NewTransaction, TransactionSource};
use tower::ServiceExt;

fn setup() -> (Database, Router) {
    let db = Database::in_memory().unwrap();
    let app = create_router(db.clone(), None, ServerConfig::default());
    (db, app)
}

async fn get_body_json(response: axum::response::Response) -> serde_json::Value {
    let body = response.into_body();
    let bytes = body.collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_vec(&body).unwrap()))
        .unwrap()
}

fn put_json(uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("PUT")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_vec(&body).unwrap()))
        .unwrap()
}

fn date(y: i32, m: u32, d: u32) -> chrono::NaiveDateTime {
    NaiveDate::from_ymd_opt(y, m, d)
        .unwrap()
        .and_hms_opt(10, 0, 0)
        .unwrap()
}

fn seed_pending(db: &Database, recipient: &str, amount: f64) -> i64 {
    db.insert_pending(&NewPendingTransaction {
        source: MessageSource::Sms,
        date: date(2026, 8, 1),
        amount,
        recipient: recipient.to_string(),
        description: recipient.to_string(),
        category: "Uncategorized".to_string(),
        is_transfer: false,
        to_account_id: None,
        exclude_from_reports: false,
    })
    .unwrap()
}

fn seed_transaction(db: &Database, account_id: i64, description: &str, amount: f64) -> i64 {
    db.insert_transaction(&NewTransaction {
        account_id,
        date: date(2026, 8, 1),
        description: description.to_string(),
        recipient: description.to_string(),
        amount,
        category: None,
        is_transfer: false,
        to_account_id: None,
        linked_transaction_id: None,
        exclude_from_reports: false,
        ref_id: None,
        source: TransactionSource::Manual,
    })
    .unwrap()
}

// ========== Accounts ==========

#[tokio::test]
async fn test_create_and_list_accounts() {
    let (_db, app) = setup();

    let response = app
        .clone()
        .oneshot(post_json("/api/accounts", serde_json::json!({"name": "HDFC"})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let account = get_body_json(response).await;
    assert_eq!(account["name"], "HDFC");

    let response = app.oneshot(get("/api/accounts")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let accounts = get_body_json(response).await;
    assert_eq!(accounts.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_create_account_rejects_blank_name() {
    let (_db, app) = setup();

    let response = app
        .oneshot(post_json("/api/accounts", serde_json::json!({"name": "  "})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

// ========== Message ingest ==========

#[tokio::test]
async fn test_ingest_parsed_message_lands_in_triage() {
    let (_db, app) = setup();

    let response = app
        .clone()
        .oneshot(post_json(
            "/api/messages",
            serde_json::json!({
                "parsed": {
                    "source": "SMS",
                    "date": "2026-08-01T10:00:00",
                    "amount": -450.0,
                    "recipient": "SWIGGY",
                    "description": "SWIGGY"
                }
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = get_body_json(response).await;
    assert_eq!(json["queue"], "triage");

    let response = app.oneshot(get("/api/triage")).await.unwrap();
    let page = get_body_json(response).await;
    assert_eq!(page["total"], 1);
    assert_eq!(page["items"][0]["recipient"], "SWIGGY");
}

#[tokio::test]
async fn test_ingest_raw_message_lands_in_training() {
    let (_db, app) = setup();

    let response = app
        .clone()
        .oneshot(post_json(
            "/api/messages",
            serde_json::json!({"raw_content": "Your OTP is 482910"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = get_body_json(response).await;
    assert_eq!(json["queue"], "training");

    let response = app.oneshot(get("/api/training")).await.unwrap();
    let page = get_body_json(response).await;
    assert_eq!(page["total"], 1);
}

#[tokio::test]
async fn test_ingest_drops_messages_matching_ignore_rule() {
    let (db, app) = setup();
    let pending_id = seed_pending(&db, "SPAMCO", -1.0);

    // Rejecting with an ignore rule teaches ingest to drop the kind
    let response = app
        .clone()
        .oneshot(post_json(
            &format!("/api/triage/{}/reject", pending_id),
            serde_json::json!({"create_ignore_rule": true}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .clone()
        .oneshot(post_json(
            "/api/messages",
            serde_json::json!({
                "parsed": {
                    "source": "SMS",
                    "date": "2026-08-02T10:00:00",
                    "amount": -2.0,
                    "recipient": "SPAMCO",
                    "description": "SPAMCO OFFER"
                }
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = get_body_json(response).await;
    assert_eq!(json["queue"], "suppressed");
    assert!(json["id"].is_null());
    assert_eq!(db.count_pending().unwrap(), 0);

    // A different merchant still queues
    let response = app
        .oneshot(post_json(
            "/api/messages",
            serde_json::json!({
                "parsed": {
                    "source": "SMS",
                    "date": "2026-08-02T11:00:00",
                    "amount": -450.0,
                    "recipient": "SWIGGY",
                    "description": "SWIGGY"
                }
            }),
        ))
        .await
        .unwrap();
    let json = get_body_json(response).await;
    assert_eq!(json["queue"], "triage");
    assert_eq!(db.count_pending().unwrap(), 1);
}

#[tokio::test]
async fn test_ingest_empty_message_is_rejected() {
    let (_db, app) = setup();

    let response = app
        .oneshot(post_json("/api/messages", serde_json::json!({"raw_content": ""})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

// ========== Triage ==========

#[tokio::test]
async fn test_triage_list_filters_by_search() {
    let (db, app) = setup();
    seed_pending(&db, "SWIGGY", -450.0);
    seed_pending(&db, "UBER", -230.0);

    let response = app.oneshot(get("/api/triage?search=swiggy")).await.unwrap();
    let page = get_body_json(response).await;
    assert_eq!(page["total"], 1);
    assert_eq!(page["items"][0]["recipient"], "SWIGGY");
}

#[tokio::test]
async fn test_triage_rejects_unknown_source() {
    let (_db, app) = setup();

    let response = app.oneshot(get("/api/triage?source=carrier")).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_approve_promotes_to_ledger() {
    let (db, app) = setup();
    let account_id = db.create_account("HDFC").unwrap();
    let pending_id = seed_pending(&db, "SWIGGY", -450.0);

    let response = app
        .clone()
        .oneshot(post_json(
            &format!("/api/triage/{}/approve", pending_id),
            serde_json::json!({"account_id": account_id, "category": "Food"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let outcome = get_body_json(response).await;
    let txn_id = outcome["transaction_id"].as_i64().unwrap();
    assert!(txn_id > 0);

    // Queue is empty, ledger has the row
    assert_eq!(db.count_pending().unwrap(), 0);
    let txn = db.get_transaction(txn_id).unwrap().unwrap();
    assert_eq!(txn.category.as_deref(), Some("Food"));
}

#[tokio::test]
async fn test_approve_unknown_item_is_404() {
    let (db, app) = setup();
    let account_id = db.create_account("HDFC").unwrap();

    let response = app
        .oneshot(post_json(
            "/api/triage/999/approve",
            serde_json::json!({"account_id": account_id, "category": "Food"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_reject_with_ignore_rule() {
    let (db, app) = setup();
    let pending_id = seed_pending(&db, "PROMO-SPAM", -1.0);

    let response = app
        .clone()
        .oneshot(post_json(
            &format!("/api/triage/{}/reject", pending_id),
            serde_json::json!({"create_ignore_rule": true}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = get_body_json(response).await;
    assert!(json["rule_id"].as_i64().is_some());

    let response = app.oneshot(get("/api/rules")).await.unwrap();
    let rules = get_body_json(response).await;
    assert_eq!(rules.as_array().unwrap().len(), 1);
    assert_eq!(rules[0]["action"], "ignore");
}

#[tokio::test]
async fn test_bulk_reject_unknown_id_deletes_nothing() {
    let (db, app) = setup();
    let a = seed_pending(&db, "A", -1.0);

    let response = app
        .oneshot(post_json(
            "/api/triage/bulk-reject",
            serde_json::json!({"ids": [a, 999]}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(db.count_pending().unwrap(), 1);
}

#[tokio::test]
async fn test_bulk_reject_empty_selection_is_rejected() {
    let (_db, app) = setup();

    let response = app
        .oneshot(post_json(
            "/api/triage/bulk-reject",
            serde_json::json!({"ids": []}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

// ========== Training ==========

#[tokio::test]
async fn test_label_message_moves_to_triage() {
    let (db, app) = setup();
    let msg_id = db
        .insert_unparsed("Rs. 450.00 debited from A/c XX1234 at SWIGGY Ref: AXIS12345678")
        .unwrap();

    let response = app
        .clone()
        .oneshot(post_json(
            &format!("/api/training/{}/label", msg_id),
            serde_json::json!({
                "amount": 450.0,
                "date": "2026-08-01T10:00:00",
                "account_mask": "1234",
                "recipient": "SWIGGY",
                "ref_id": "AXIS12345678",
                "category": "Food",
                "type": "DEBIT"
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    assert_eq!(db.count_unparsed().unwrap(), 0);
    assert_eq!(db.count_pending().unwrap(), 1);
    let page = db.list_pending(None, None, None, None, 10, 0).unwrap();
    // Debit labels store a negative amount
    assert_eq!(page.items[0].amount, -450.0);
}

#[tokio::test]
async fn test_dismiss_message() {
    let (db, app) = setup();
    let msg_id = db.insert_unparsed("junk").unwrap();

    let response = app
        .oneshot(post_json(
            &format!("/api/training/{}/dismiss", msg_id),
            serde_json::json!({}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(db.count_unparsed().unwrap(), 0);
}

#[tokio::test]
async fn test_dismiss_with_ignore_rule_suppresses_siblings() {
    let (db, app) = setup();
    let msg_id = db
        .insert_unparsed("INR 15,000 credited to your Acct 4471 by NEFT UTR: SBIN0THX8291044")
        .unwrap();

    let response = app
        .clone()
        .oneshot(post_json(
            &format!("/api/training/{}/dismiss", msg_id),
            serde_json::json!({"create_ignore_rule": true}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(db.count_unparsed().unwrap(), 0);

    let rules = db.list_rules().unwrap();
    assert_eq!(rules.len(), 1);
    assert_eq!(rules[0].action, sift_core::models::RuleAction::Ignore);

    // A sibling with different values skips the training queue entirely
    let response = app
        .oneshot(post_json(
            "/api/messages",
            serde_json::json!({
                "raw_content":
                    "INR 2,500 credited to your Acct 4471 by NEFT UTR: SBIN0ABC1102938"
            }),
        ))
        .await
        .unwrap();
    let json = get_body_json(response).await;
    assert_eq!(json["queue"], "suppressed");
    assert_eq!(db.count_unparsed().unwrap(), 0);
}

#[tokio::test]
async fn test_bulk_dismiss_messages() {
    let (db, app) = setup();
    let a = db.insert_unparsed("junk one").unwrap();
    let b = db.insert_unparsed("junk two").unwrap();

    let response = app
        .oneshot(post_json(
            "/api/training/bulk-dismiss",
            serde_json::json!({"ids": [a, b]}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = get_body_json(response).await;
    assert_eq!(json["dismissed"], 2);
    assert!(db.list_rules().unwrap().is_empty());
}

#[tokio::test]
async fn test_bulk_dismiss_can_create_ignore_rules() {
    let (db, app) = setup();
    let a = db
        .insert_unparsed("Dear customer your KYC is pending, click bit.ly/x1")
        .unwrap();
    let b = db
        .insert_unparsed("Congratulations! You won a prize, call 99887")
        .unwrap();

    let response = app
        .oneshot(post_json(
            "/api/training/bulk-dismiss",
            serde_json::json!({"ids": [a, b], "create_ignore_rules": true}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = get_body_json(response).await;
    assert_eq!(json["dismissed"], 2);

    let rules = db.list_rules().unwrap();
    assert_eq!(rules.len(), 2);
    assert!(rules
        .iter()
        .all(|r| r.action == sift_core::models::RuleAction::Ignore));
}

// ========== Transfer matching ==========

#[tokio::test]
async fn test_match_count_finds_mirrored_amount() {
    let (db, app) = setup();
    let savings = db.create_account("Savings").unwrap();
    seed_transaction(&db, savings, "NEFT IN", 5000.0);

    let response = app
        .clone()
        .oneshot(post_json(
            "/api/match-count",
            serde_json::json!({
                "to_account_id": savings,
                "amount": -5000.0,
                "date": "2026-08-01T10:00:00"
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = get_body_json(response).await;
    assert_eq!(json["count"], 1);
    assert_eq!(json["candidates"][0]["amount"], 5000.0);
}

#[tokio::test]
async fn test_match_count_with_missing_fields_is_empty() {
    let (_db, app) = setup();

    let response = app
        .oneshot(post_json(
            "/api/match-count",
            serde_json::json!({"amount": -5000.0}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = get_body_json(response).await;
    assert_eq!(json["count"], 0);
}

// ========== Transactions ==========

#[tokio::test]
async fn test_update_transaction_raises_categorize_prompt() {
    let (db, app) = setup();
    let account_id = db.create_account("HDFC").unwrap();
    let txn_id = seed_transaction(&db, account_id, "SWIGGY", -450.0);
    seed_transaction(&db, account_id, "SWIGGY", -320.0);

    let response = app
        .oneshot(put_json(
            &format!("/api/transactions/{}", txn_id),
            serde_json::json!({
                "description": "SWIGGY",
                "recipient": "SWIGGY",
                "category": "Food"
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = get_body_json(response).await;
    assert_eq!(json["transaction"]["category"], "Food");
    let prompt = &json["prompts"]["categorize"];
    assert_eq!(prompt["pattern"], "SWIGGY");
    // Exact-match count covers both SWIGGY rows
    assert_eq!(prompt["similar_count"], 2);
}

#[tokio::test]
async fn test_update_transaction_links_counterpart() {
    let (db, app) = setup();
    let current = db.create_account("Current").unwrap();
    let savings = db.create_account("Savings").unwrap();
    let txn_id = seed_transaction(&db, current, "NEFT OUT", -5000.0);
    let counterpart_id = seed_transaction(&db, savings, "NEFT IN", 5000.0);

    let response = app
        .oneshot(put_json(
            &format!("/api/transactions/{}", txn_id),
            serde_json::json!({
                "description": "NEFT OUT",
                "recipient": "NEFT OUT",
                "is_transfer": true,
                "to_account_id": savings,
                "linked_transaction_id": counterpart_id
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let counterpart = db.get_transaction(counterpart_id).unwrap().unwrap();
    assert_eq!(counterpart.linked_transaction_id, Some(txn_id));
    assert!(counterpart.is_transfer);
}

#[tokio::test]
async fn test_smart_categorize_applies_to_similar() {
    let (db, app) = setup();
    let account_id = db.create_account("HDFC").unwrap();
    let txn_id = seed_transaction(&db, account_id, "UBER", -230.0);
    let other_id = seed_transaction(&db, account_id, "UBER", -180.0);

    let response = app
        .oneshot(post_json(
            "/api/transactions/smart-categorize",
            serde_json::json!({
                "transaction_id": txn_id,
                "category": "Transport",
                "apply_to_similar": true,
                "create_rule": true
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = get_body_json(response).await;
    assert_eq!(json["affected"], 2);
    assert_eq!(json["rule_created"], true);

    let other = db.get_transaction(other_id).unwrap().unwrap();
    assert_eq!(other.category.as_deref(), Some("Transport"));
}

#[tokio::test]
async fn test_bulk_rename() {
    let (db, app) = setup();
    let account_id = db.create_account("HDFC").unwrap();
    seed_transaction(&db, account_id, "AMZN*MKTP", -999.0);
    seed_transaction(&db, account_id, "AMZN*MKTP", -499.0);

    let response = app
        .oneshot(post_json(
            "/api/transactions/bulk-rename",
            serde_json::json!({"old_name": "AMZN*MKTP", "new_name": "Amazon"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = get_body_json(response).await;
    assert_eq!(json["renamed"], 2);
}

// ========== Rules ==========

#[tokio::test]
async fn test_create_rule_and_apply() {
    let (db, app) = setup();
    let account_id = db.create_account("HDFC").unwrap();
    seed_transaction(&db, account_id, "NETFLIX", -649.0);

    let response = app
        .clone()
        .oneshot(post_json(
            "/api/rules",
            serde_json::json!({
                "name": "Netflix",
                "category": "Entertainment",
                "keywords": ["NETFLIX"]
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let rule = get_body_json(response).await;
    let rule_id = rule["id"].as_i64().unwrap();

    let response = app
        .oneshot(post_json(
            &format!("/api/rules/{}/apply", rule_id),
            serde_json::json!({}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = get_body_json(response).await;
    assert_eq!(json["affected"], 1);
}

#[tokio::test]
async fn test_create_rule_without_keywords_is_rejected() {
    let (_db, app) = setup();

    let response = app
        .oneshot(post_json(
            "/api/rules",
            serde_json::json!({"name": "Empty", "category": "Misc", "keywords": [" "]}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_delete_rule() {
    let (db, app) = setup();
    let rule_id = db
        .insert_rule(&sift_core::models::NewRule {
            name: "Netflix".to_string(),
            category: "Entertainment".to_string(),
            keywords: vec!["NETFLIX".to_string()],
            exclude_from_reports: false,
            action: sift_core::models::RuleAction::Categorize,
        })
        .unwrap();

    let response = app
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri(format!("/api/rules/{}", rule_id))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(db.list_rules().unwrap().is_empty());
}

// ========== Headers ==========

#[tokio::test]
async fn test_security_headers_present() {
    let (_db, app) = setup();

    let response = app.oneshot(get("/api/accounts")).await.unwrap();
    let headers = response.headers();
    assert_eq!(headers.get("x-content-type-options").unwrap(), "nosniff");
    assert_eq!(headers.get("x-frame-options").unwrap(), "DENY");
    assert!(headers.get("content-security-policy").is_some());
}
