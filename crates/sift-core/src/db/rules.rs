//! Rule and parser-pattern storage

use rusqlite::{params, OptionalExtension};

use super::{parse_datetime, Database};
use crate::error::{Error, Result};
use crate::models::{NewRule, ParserPattern, Rule, RuleAction};

impl Database {
    /// Insert a rule, returns the new rule ID
    ///
    /// Keywords are stored pipe-separated; empty keywords are dropped and an
    /// all-empty list is rejected since such a rule could never match.
    pub fn insert_rule(&self, rule: &NewRule) -> Result<i64> {
        let keywords: Vec<&str> = rule
            .keywords
            .iter()
            .map(|k| k.trim())
            .filter(|k| !k.is_empty())
            .collect();
        if keywords.is_empty() {
            return Err(Error::Rule("Rule must have at least one keyword".to_string()));
        }

        let conn = self.conn()?;
        conn.execute(
            r#"
            INSERT INTO rules (name, category, keywords, exclude_from_reports, action)
            VALUES (?, ?, ?, ?, ?)
            "#,
            params![
                rule.name,
                rule.category,
                keywords.join("|"),
                rule.exclude_from_reports,
                rule.action.as_str(),
            ],
        )?;

        Ok(conn.last_insert_rowid())
    }

    /// Get a single rule by ID
    pub fn get_rule(&self, id: i64) -> Result<Option<Rule>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, name, category, keywords, exclude_from_reports, action, created_at
             FROM rules WHERE id = ?",
        )?;

        let rule = stmt.query_row(params![id], Self::row_to_rule).optional()?;
        Ok(rule)
    }

    /// List all rules, newest first
    pub fn list_rules(&self) -> Result<Vec<Rule>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, name, category, keywords, exclude_from_reports, action, created_at
             FROM rules ORDER BY created_at DESC, id DESC",
        )?;

        let rules = stmt
            .query_map([], Self::row_to_rule)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rules)
    }

    /// Delete a rule
    pub fn delete_rule(&self, id: i64) -> Result<()> {
        let conn = self.conn()?;
        let deleted = conn.execute("DELETE FROM rules WHERE id = ?", params![id])?;
        if deleted == 0 {
            return Err(Error::NotFound(format!("Rule {} not found", id)));
        }
        Ok(())
    }

    /// Save a derived extraction pattern, ignoring exact duplicates
    pub fn upsert_parser_pattern(&self, merchant_name: &str, pattern: &str) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT OR IGNORE INTO parser_patterns (merchant_name, pattern) VALUES (?, ?)",
            params![merchant_name, pattern],
        )?;
        Ok(())
    }

    /// List all saved extraction patterns
    pub fn list_parser_patterns(&self) -> Result<Vec<ParserPattern>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, merchant_name, pattern, source, created_at
             FROM parser_patterns ORDER BY merchant_name, id",
        )?;

        let patterns = stmt
            .query_map([], |row| {
                let created_at_str: String = row.get(4)?;
                Ok(ParserPattern {
                    id: row.get(0)?,
                    merchant_name: row.get(1)?,
                    pattern: row.get(2)?,
                    source: row.get(3)?,
                    created_at: parse_datetime(&created_at_str),
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(patterns)
    }

    /// Rename a merchant across saved extraction patterns
    ///
    /// Returns the number of patterns touched (zero is fine; the parser may
    /// simply not know this merchant yet).
    pub fn rename_parser_merchant(&self, old_name: &str, new_name: &str) -> Result<i64> {
        let conn = self.conn()?;
        let updated = conn.execute(
            "UPDATE parser_patterns SET merchant_name = ? WHERE merchant_name = ? COLLATE NOCASE",
            params![new_name, old_name.trim()],
        )?;
        Ok(updated as i64)
    }

    fn row_to_rule(row: &rusqlite::Row) -> rusqlite::Result<Rule> {
        let keywords_str: String = row.get(3)?;
        let exclude_int: i64 = row.get(4)?;
        let action_str: String = row.get(5)?;
        let created_at_str: String = row.get(6)?;
        Ok(Rule {
            id: row.get(0)?,
            name: row.get(1)?,
            category: row.get(2)?,
            keywords: keywords_str
                .split('|')
                .map(|k| k.trim().to_string())
                .filter(|k| !k.is_empty())
                .collect(),
            exclude_from_reports: exclude_int != 0,
            action: action_str.parse().unwrap_or(RuleAction::Categorize),
            created_at: parse_datetime(&created_at_str),
        })
    }
}
