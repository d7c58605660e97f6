//! Triage queue command implementations

use anyhow::Result;
use sift_core::db::Database;
use sift_core::models::TriageDecision;
use sift_core::triage::TriageEngine;

use super::truncate;

pub fn cmd_triage_list(
    db: &Database,
    limit: i64,
    search: Option<&str>,
    source: Option<&str>,
) -> Result<()> {
    let source = source
        .map(|s| s.parse().map_err(|e: String| anyhow::anyhow!(e)))
        .transpose()?;

    let page = db.list_pending(search, source, None, None, limit, 0)?;

    if page.items.is_empty() {
        println!("Triage queue is empty. 🎉");
        return Ok(());
    }

    println!();
    println!("📥 Triage Queue ({} total)", page.total);
    println!("   ─────────────────────────────────────────────────────────────");

    for item in page.items {
        let amount_str = if item.amount < 0.0 {
            format!("\x1b[31m₹{:.2}\x1b[0m", item.amount.abs()) // Red for debits
        } else {
            format!("\x1b[32m+₹{:.2}\x1b[0m", item.amount) // Green for credits
        };

        println!(
            "   [{}] {} │ {:>12} │ {:5} │ {}",
            item.id,
            item.date.format("%Y-%m-%d"),
            amount_str,
            item.source.as_str(),
            truncate(&item.recipient, 35)
        );
    }

    println!();
    println!("   Use 'sift triage approve <id> --account NAME' to confirm an item.");

    Ok(())
}

pub fn cmd_triage_approve(
    db: &Database,
    id: i64,
    account: &str,
    category: &str,
    transfer: bool,
    to_account: Option<&str>,
    exclude: bool,
) -> Result<()> {
    let account_id = db.create_account(account)?;
    let to_account_id = to_account.map(|name| db.create_account(name)).transpose()?;

    let decision = TriageDecision {
        category: category.to_string(),
        is_transfer: transfer,
        to_account_id,
        exclude_from_reports: exclude,
    };

    let outcome = TriageEngine::new(db).approve(id, account_id, &decision)?;
    println!(
        "✅ Approved into ledger as transaction {}",
        outcome.transaction_id
    );

    if let Some(prompt) = outcome.prompt {
        println!();
        println!(
            "💡 Automate this? Future '{}' messages could get '{}' automatically:",
            prompt.pattern, prompt.category
        );
        println!(
            "   sift rules add '{}' --category '{}' --keyword '{}'",
            prompt.pattern, prompt.category, prompt.pattern
        );
    }

    Ok(())
}

pub fn cmd_triage_reject(db: &Database, id: i64, ignore_rule: bool) -> Result<()> {
    let rule_id = TriageEngine::new(db).reject(id, ignore_rule)?;
    println!("🗑️  Rejected pending transaction {}", id);
    if let Some(rule_id) = rule_id {
        println!("   Created ignore rule {} for future messages", rule_id);
    }
    Ok(())
}

pub fn cmd_triage_bulk_reject(db: &Database, ids: &[i64], ignore_rules: bool) -> Result<()> {
    if ids.is_empty() {
        anyhow::bail!("No IDs given");
    }

    let rejected = TriageEngine::new(db).bulk_reject(ids, ignore_rules)?;
    println!("🗑️  Rejected {} pending transaction(s)", rejected);
    Ok(())
}
