//! Rule management and bulk rename command implementations

use anyhow::Result;
use sift_core::db::Database;
use sift_core::models::{NewRule, RuleAction};
use sift_core::rules::RuleEngine;

use super::truncate;

pub fn cmd_rules_list(db: &Database) -> Result<()> {
    let rules = db.list_rules()?;

    if rules.is_empty() {
        println!("No rules defined. Add one with:");
        println!("  sift rules add 'Swiggy' --category Food --keyword SWIGGY");
        return Ok(());
    }

    println!();
    println!("📏 Rules ({} total)", rules.len());
    println!("   ─────────────────────────────────────────────────────────────");

    for rule in rules {
        let marker = match rule.action {
            RuleAction::Ignore => "🚫",
            RuleAction::Categorize => "🏷️ ",
        };
        println!(
            "   [{}] {} {} → {} ({})",
            rule.id,
            marker,
            truncate(&rule.name, 25),
            rule.category,
            rule.keywords.join("|")
        );
    }

    Ok(())
}

pub fn cmd_rules_add(
    db: &Database,
    name: &str,
    category: &str,
    keywords: Vec<String>,
    exclude: bool,
    ignore: bool,
) -> Result<()> {
    let action = if ignore {
        RuleAction::Ignore
    } else {
        RuleAction::Categorize
    };

    let rule_id = db.insert_rule(&NewRule {
        name: name.to_string(),
        category: category.to_string(),
        keywords,
        exclude_from_reports: exclude,
        action,
    })?;

    println!("✅ Created rule {} ({})", rule_id, name);
    println!("   Apply it to existing transactions: sift rules apply {}", rule_id);

    Ok(())
}

pub fn cmd_rules_delete(db: &Database, id: i64) -> Result<()> {
    db.delete_rule(id)?;
    println!("🗑️  Deleted rule {}", id);
    Ok(())
}

pub fn cmd_rules_apply(db: &Database, id: i64) -> Result<()> {
    let affected = RuleEngine::new(db).apply_rule_retrospectively(id)?;
    println!("✅ Rule {} recategorized {} transaction(s)", id, affected);
    Ok(())
}

pub fn cmd_rename(db: &Database, old_name: &str, new_name: &str, sync_parser: bool) -> Result<()> {
    let renamed = RuleEngine::new(db).bulk_rename(old_name, new_name, sync_parser)?;
    println!(
        "✅ Renamed '{}' to '{}' on {} transaction(s)",
        old_name, new_name, renamed
    );
    if sync_parser {
        println!("   Parser patterns updated as well");
    }
    Ok(())
}
