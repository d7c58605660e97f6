//! Training queue command implementations
//!
//! Unparsed messages are listed, inspected with a heuristic label
//! suggestion, then labeled into the triage queue or dismissed.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use sift_core::db::Database;
use sift_core::extract;
use sift_core::models::{Direction, LabelForm};
use sift_core::session::{FinanceApi, LocalApi};

use super::truncate;

pub fn cmd_training_list(db: &Database, limit: i64, search: Option<&str>) -> Result<()> {
    let page = db.list_unparsed(search, limit, 0)?;

    if page.items.is_empty() {
        println!("Training queue is empty. 🎉");
        return Ok(());
    }

    println!();
    println!("🎓 Training Queue ({} total)", page.total);
    println!("   ─────────────────────────────────────────────────────────────");

    for msg in page.items {
        println!(
            "   [{}] {} │ {}",
            msg.id,
            msg.created_at.format("%Y-%m-%d"),
            truncate(&msg.raw_content, 55)
        );
    }

    println!();
    println!("   Use 'sift training show <id>' to see a suggested label.");

    Ok(())
}

pub fn cmd_training_show(db: &Database, id: i64) -> Result<()> {
    let msg = db
        .get_unparsed(id)?
        .ok_or_else(|| anyhow::anyhow!("Message {} not found", id))?;

    let suggestion = extract::suggest_label(&msg.raw_content, msg.created_at);

    println!();
    println!("📨 Message {}", msg.id);
    println!("   ─────────────────────────────────────────────────────────────");
    println!("   {}", msg.raw_content);
    println!();
    println!("   Suggested label:");
    println!("   Amount: ₹{:.2}", suggestion.amount);
    println!(
        "   Direction: {}",
        match suggestion.direction {
            Direction::Credit => "credit",
            Direction::Debit => "debit",
        }
    );
    if !suggestion.account_mask.is_empty() {
        println!("   Account: XX{}", suggestion.account_mask);
    }
    if !suggestion.ref_id.is_empty() {
        println!("   Ref: {}", suggestion.ref_id);
    }
    println!();
    println!(
        "   sift training label {} --amount {:.2} --date {} --recipient '...'",
        msg.id,
        suggestion.amount,
        suggestion.date.format("%Y-%m-%d")
    );

    Ok(())
}

pub async fn cmd_training_label(
    db: Database,
    id: i64,
    amount: f64,
    date: &str,
    recipient: &str,
    description: &str,
    category: &str,
    credit: bool,
    exclude: bool,
    pattern: bool,
) -> Result<()> {
    let date = NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .context("Invalid --date format (use YYYY-MM-DD)")?
        .and_hms_opt(0, 0, 0)
        .unwrap();

    let form = LabelForm {
        amount,
        date,
        account_mask: String::new(),
        recipient: recipient.to_string(),
        description: description.to_string(),
        ref_id: String::new(),
        category: category.to_string(),
        direction: if credit {
            Direction::Credit
        } else {
            Direction::Debit
        },
        exclude_from_reports: exclude,
        generate_pattern: pattern,
    };

    let pending_id = LocalApi::new(db).label_message(id, &form).await?;
    println!(
        "✅ Labeled message {} into triage as pending transaction {}",
        id, pending_id
    );

    Ok(())
}

pub async fn cmd_training_dismiss(db: Database, ids: &[i64], ignore_rules: bool) -> Result<()> {
    if ids.is_empty() {
        anyhow::bail!("No IDs given");
    }

    let rules_before = db.list_rules()?.len();
    let dismissed = LocalApi::new(db.clone())
        .bulk_dismiss_messages(ids, ignore_rules)
        .await?;
    println!("🗑️  Dismissed {} message(s)", dismissed);
    if ignore_rules {
        let created = db.list_rules()?.len() - rules_before;
        println!("🚫 Created {} suppression rule(s)", created);
    }
    Ok(())
}
