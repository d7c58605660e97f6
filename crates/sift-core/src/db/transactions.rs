//! Confirmed transaction operations

use chrono::NaiveDateTime;
use rusqlite::{params, OptionalExtension};

use super::{parse_datetime, parse_naive_datetime, Database};
use crate::error::{Error, Result};
use crate::models::{NewTransaction, Transaction};

const TRANSACTION_COLUMNS: &str = "t.id, t.account_id, t.date, t.description, t.recipient, t.amount, t.category, \
     t.is_transfer, t.to_account_id, t.linked_transaction_id, t.exclude_from_reports, \
     t.ref_id, t.source, t.created_at";

impl Database {
    /// Insert a confirmed transaction, returns the new transaction ID
    pub fn insert_transaction(&self, tx: &NewTransaction) -> Result<i64> {
        let conn = self.conn()?;

        conn.execute(
            r#"
            INSERT INTO transactions (account_id, date, description, recipient, amount, category,
                                      is_transfer, to_account_id, linked_transaction_id,
                                      exclude_from_reports, ref_id, source)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
            params![
                tx.account_id,
                tx.date.format("%Y-%m-%d %H:%M:%S").to_string(),
                tx.description,
                tx.recipient,
                tx.amount,
                tx.category,
                tx.is_transfer,
                tx.to_account_id,
                tx.linked_transaction_id,
                tx.exclude_from_reports,
                tx.ref_id,
                tx.source.as_str(),
            ],
        )?;

        Ok(conn.last_insert_rowid())
    }

    /// Get a single transaction by ID
    pub fn get_transaction(&self, id: i64) -> Result<Option<Transaction>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM transactions t WHERE t.id = ?",
            TRANSACTION_COLUMNS
        ))?;

        let tx = stmt
            .query_row(params![id], Self::row_to_transaction)
            .optional()?;
        Ok(tx)
    }

    /// Search transactions with optional filters
    pub fn search_transactions(
        &self,
        account_id: Option<i64>,
        search: Option<&str>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Transaction>> {
        let conn = self.conn()?;

        // Build dynamic WHERE clause
        let mut conditions = Vec::new();
        let mut params: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        if let Some(aid) = account_id {
            conditions.push("t.account_id = ?".to_string());
            params.push(Box::new(aid));
        }

        if let Some(q) = search {
            if !q.trim().is_empty() {
                conditions.push(
                    "(t.description LIKE ? COLLATE NOCASE OR t.recipient LIKE ? COLLATE NOCASE)"
                        .to_string(),
                );
                let pattern = format!("%{}%", q.trim());
                params.push(Box::new(pattern.clone()));
                params.push(Box::new(pattern));
            }
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        let sql = format!(
            r#"
            SELECT {}
            FROM transactions t
            {}
            ORDER BY t.date DESC, t.id DESC
            LIMIT ? OFFSET ?
            "#,
            TRANSACTION_COLUMNS, where_clause
        );

        params.push(Box::new(limit));
        params.push(Box::new(offset));

        let mut stmt = conn.prepare(&sql)?;
        let params_refs: Vec<&dyn rusqlite::ToSql> = params.iter().map(|p| p.as_ref()).collect();

        let transactions = stmt
            .query_map(params_refs.as_slice(), Self::row_to_transaction)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(transactions)
    }

    /// Count transactions matching search criteria
    pub fn count_transactions_search(
        &self,
        account_id: Option<i64>,
        search: Option<&str>,
    ) -> Result<i64> {
        let conn = self.conn()?;

        let mut conditions = Vec::new();
        let mut params: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        if let Some(aid) = account_id {
            conditions.push("t.account_id = ?".to_string());
            params.push(Box::new(aid));
        }

        if let Some(q) = search {
            if !q.trim().is_empty() {
                conditions.push(
                    "(t.description LIKE ? COLLATE NOCASE OR t.recipient LIKE ? COLLATE NOCASE)"
                        .to_string(),
                );
                let pattern = format!("%{}%", q.trim());
                params.push(Box::new(pattern.clone()));
                params.push(Box::new(pattern));
            }
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        let sql = format!("SELECT COUNT(*) FROM transactions t {}", where_clause);
        let params_refs: Vec<&dyn rusqlite::ToSql> = params.iter().map(|p| p.as_ref()).collect();

        let count: i64 = conn.query_row(&sql, params_refs.as_slice(), |row| row.get(0))?;
        Ok(count)
    }

    /// Count total transactions
    pub fn count_transactions(&self) -> Result<i64> {
        let conn = self.conn()?;
        let count: i64 =
            conn.query_row("SELECT COUNT(*) FROM transactions", [], |row| row.get(0))?;
        Ok(count)
    }

    /// Update the editable fields of a transaction
    #[allow(clippy::too_many_arguments)]
    pub fn update_transaction(
        &self,
        id: i64,
        description: &str,
        recipient: &str,
        category: Option<&str>,
        is_transfer: bool,
        to_account_id: Option<i64>,
        exclude_from_reports: bool,
    ) -> Result<()> {
        let conn = self.conn()?;
        let updated = conn.execute(
            r#"
            UPDATE transactions
            SET description = ?, recipient = ?, category = ?, is_transfer = ?,
                to_account_id = ?, exclude_from_reports = ?
            WHERE id = ?
            "#,
            params![
                description,
                recipient,
                category,
                is_transfer,
                to_account_id,
                exclude_from_reports,
                id
            ],
        )?;

        if updated == 0 {
            return Err(Error::NotFound(format!("Transaction {} not found", id)));
        }
        Ok(())
    }

    /// Set just the category and exclude flag on one transaction
    pub fn set_transaction_category(
        &self,
        id: i64,
        category: &str,
        exclude_from_reports: bool,
    ) -> Result<()> {
        let conn = self.conn()?;
        let updated = conn.execute(
            "UPDATE transactions SET category = ?, exclude_from_reports = ? WHERE id = ?",
            params![category, exclude_from_reports, id],
        )?;
        if updated == 0 {
            return Err(Error::NotFound(format!("Transaction {} not found", id)));
        }
        Ok(())
    }

    /// Link two transactions as the two legs of a transfer
    ///
    /// Sets each side's `linked_transaction_id` to the other and marks both
    /// as transfers, in a single SQL transaction so a crash cannot leave a
    /// half-linked pair.
    pub fn link_transfer_pair(&self, id: i64, counterpart_id: i64) -> Result<()> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        let a = tx.execute(
            "UPDATE transactions SET linked_transaction_id = ?, is_transfer = 1 WHERE id = ?",
            params![counterpart_id, id],
        )?;
        let b = tx.execute(
            "UPDATE transactions SET linked_transaction_id = ?, is_transfer = 1 WHERE id = ?",
            params![id, counterpart_id],
        )?;

        if a == 0 || b == 0 {
            return Err(Error::NotFound(format!(
                "Transaction {} or {} not found",
                id, counterpart_id
            )));
        }

        tx.commit()?;
        Ok(())
    }

    /// Load transactions whose date falls within `days` of the given date
    ///
    /// Raw candidate pool for transfer matching; the amount and linkage
    /// checks are applied by the matching engine, not here.
    pub fn transactions_in_window(
        &self,
        account_id: Option<i64>,
        date: NaiveDateTime,
        days: i64,
    ) -> Result<Vec<Transaction>> {
        let conn = self.conn()?;
        let from = date - chrono::Duration::days(days);
        let to = date + chrono::Duration::days(days);

        let mut conditions = vec!["t.date >= ?".to_string(), "t.date <= ?".to_string()];
        let mut params: Vec<Box<dyn rusqlite::ToSql>> = vec![
            Box::new(from.format("%Y-%m-%d %H:%M:%S").to_string()),
            Box::new(to.format("%Y-%m-%d %H:%M:%S").to_string()),
        ];
        if let Some(aid) = account_id {
            conditions.push("t.account_id = ?".to_string());
            params.push(Box::new(aid));
        }

        let sql = format!(
            "SELECT {} FROM transactions t WHERE {} ORDER BY t.date DESC, t.id DESC",
            TRANSACTION_COLUMNS,
            conditions.join(" AND ")
        );

        let mut stmt = conn.prepare(&sql)?;
        let params_refs: Vec<&dyn rusqlite::ToSql> = params.iter().map(|p| p.as_ref()).collect();

        let transactions = stmt
            .query_map(params_refs.as_slice(), Self::row_to_transaction)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(transactions)
    }

    /// Count transactions whose recipient or description equals any pattern
    ///
    /// Equality is case-insensitive and exact, not substring. When
    /// `include_triage` is set, pending transactions are counted too.
    /// Empty patterns are dropped; an all-empty list counts nothing.
    pub fn count_similar(&self, patterns: &[&str], include_triage: bool) -> Result<i64> {
        let needles: Vec<&str> = patterns
            .iter()
            .map(|p| p.trim())
            .filter(|p| !p.is_empty())
            .collect();
        if needles.is_empty() {
            return Ok(0);
        }

        let conn = self.conn()?;

        let mut conditions = Vec::new();
        let mut params: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();
        for needle in &needles {
            conditions
                .push("(recipient = ? COLLATE NOCASE OR description = ? COLLATE NOCASE)".to_string());
            params.push(Box::new(needle.to_string()));
            params.push(Box::new(needle.to_string()));
        }
        let where_clause = conditions.join(" OR ");
        let params_refs: Vec<&dyn rusqlite::ToSql> = params.iter().map(|p| p.as_ref()).collect();

        let mut count: i64 = conn.query_row(
            &format!("SELECT COUNT(*) FROM transactions WHERE {}", where_clause),
            params_refs.as_slice(),
            |row| row.get(0),
        )?;

        if include_triage {
            let pending: i64 = conn.query_row(
                &format!(
                    "SELECT COUNT(*) FROM pending_transactions WHERE {}",
                    where_clause
                ),
                params_refs.as_slice(),
                |row| row.get(0),
            )?;
            count += pending;
        }

        Ok(count)
    }

    /// Recategorize every transaction matching the pattern
    ///
    /// Returns the number of rows updated.
    pub fn recategorize_similar(
        &self,
        pattern: &str,
        category: &str,
        exclude_from_reports: bool,
    ) -> Result<i64> {
        let needle = pattern.trim();
        if needle.is_empty() {
            return Ok(0);
        }

        let conn = self.conn()?;
        let updated = conn.execute(
            "UPDATE transactions SET category = ?, exclude_from_reports = ?
             WHERE recipient = ? COLLATE NOCASE OR description = ? COLLATE NOCASE",
            params![category, exclude_from_reports, needle, needle],
        )?;

        Ok(updated as i64)
    }

    /// Rename every transaction with the old description to the new one
    ///
    /// Returns the number of rows updated.
    pub fn rename_description(&self, old_name: &str, new_name: &str) -> Result<i64> {
        let conn = self.conn()?;
        let updated = conn.execute(
            "UPDATE transactions SET description = ? WHERE description = ? COLLATE NOCASE",
            params![new_name, old_name.trim()],
        )?;
        Ok(updated as i64)
    }

    /// Delete a transaction
    pub fn delete_transaction(&self, id: i64) -> Result<()> {
        let conn = self.conn()?;
        let deleted = conn.execute("DELETE FROM transactions WHERE id = ?", params![id])?;
        if deleted == 0 {
            return Err(Error::NotFound(format!("Transaction {} not found", id)));
        }
        Ok(())
    }

    pub(crate) fn row_to_transaction(row: &rusqlite::Row) -> rusqlite::Result<Transaction> {
        let date_str: String = row.get(2)?;
        let is_transfer_int: i64 = row.get(7)?;
        let exclude_int: i64 = row.get(10)?;
        let source_str: String = row.get(12)?;
        let created_at_str: String = row.get(13)?;
        Ok(Transaction {
            id: row.get(0)?,
            account_id: row.get(1)?,
            date: parse_naive_datetime(&date_str),
            description: row.get(3)?,
            recipient: row.get(4)?,
            amount: row.get(5)?,
            category: row.get(6)?,
            is_transfer: is_transfer_int != 0,
            to_account_id: row.get(8)?,
            linked_transaction_id: row.get(9)?,
            exclude_from_reports: exclude_int != 0,
            ref_id: row.get(11)?,
            source: source_str.parse().unwrap_or_default(),
            created_at: parse_datetime(&created_at_str),
        })
    }
}
