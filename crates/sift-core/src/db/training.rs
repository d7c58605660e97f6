//! Unparsed message (training queue) operations

use rusqlite::{params, OptionalExtension};

use super::{parse_datetime, Database};
use crate::error::{Error, Result};
use crate::models::{NewPendingTransaction, Paginated, UnparsedMessage};

impl Database {
    /// Queue a raw message that no extraction pattern matched
    pub fn insert_unparsed(&self, raw_content: &str) -> Result<i64> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO unparsed_messages (raw_content) VALUES (?)",
            params![raw_content],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Get a single unparsed message by ID
    pub fn get_unparsed(&self, id: i64) -> Result<Option<UnparsedMessage>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, raw_content, created_at FROM unparsed_messages WHERE id = ?",
        )?;

        let msg = stmt
            .query_row(params![id], Self::row_to_unparsed)
            .optional()?;
        Ok(msg)
    }

    /// List one page of the training queue with the filtered total
    ///
    /// Newest first; `search` matches anywhere in the raw message body.
    pub fn list_unparsed(
        &self,
        search: Option<&str>,
        limit: i64,
        offset: i64,
    ) -> Result<Paginated<UnparsedMessage>> {
        let conn = self.conn()?;

        let mut conditions = Vec::new();
        let mut params: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        if let Some(q) = search {
            if !q.trim().is_empty() {
                conditions.push("raw_content LIKE ? COLLATE NOCASE".to_string());
                params.push(Box::new(format!("%{}%", q.trim())));
            }
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        let params_refs: Vec<&dyn rusqlite::ToSql> = params.iter().map(|p| p.as_ref()).collect();
        let total: i64 = conn.query_row(
            &format!("SELECT COUNT(*) FROM unparsed_messages {}", where_clause),
            params_refs.as_slice(),
            |row| row.get(0),
        )?;

        let sql = format!(
            r#"
            SELECT id, raw_content, created_at
            FROM unparsed_messages
            {}
            ORDER BY created_at DESC, id DESC
            LIMIT ? OFFSET ?
            "#,
            where_clause
        );

        params.push(Box::new(limit));
        params.push(Box::new(offset));

        let mut stmt = conn.prepare(&sql)?;
        let params_refs: Vec<&dyn rusqlite::ToSql> = params.iter().map(|p| p.as_ref()).collect();

        let items = stmt
            .query_map(params_refs.as_slice(), Self::row_to_unparsed)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(Paginated { items, total })
    }

    /// Count the whole training queue
    pub fn count_unparsed(&self) -> Result<i64> {
        let conn = self.conn()?;
        let count: i64 =
            conn.query_row("SELECT COUNT(*) FROM unparsed_messages", [], |row| {
                row.get(0)
            })?;
        Ok(count)
    }

    /// Convert an unparsed message into a pending transaction (labeling)
    ///
    /// Inserts the new triage item and removes the message in one SQL
    /// transaction; the message cannot end up both labeled and still queued.
    /// Returns the new pending transaction ID.
    pub fn label_unparsed(&self, id: i64, item: &NewPendingTransaction) -> Result<i64> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        let deleted = tx.execute("DELETE FROM unparsed_messages WHERE id = ?", params![id])?;
        if deleted == 0 {
            return Err(Error::NotFound(format!(
                "Unparsed message {} not found",
                id
            )));
        }

        tx.execute(
            r#"
            INSERT INTO pending_transactions (source, date, amount, recipient, description,
                                              category, is_transfer, to_account_id, exclude_from_reports)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
            params![
                item.source.as_str(),
                item.date.format("%Y-%m-%d %H:%M:%S").to_string(),
                item.amount,
                item.recipient,
                item.description,
                item.category,
                item.is_transfer,
                item.to_account_id,
                item.exclude_from_reports,
            ],
        )?;
        let pending_id = tx.last_insert_rowid();

        tx.commit()?;
        Ok(pending_id)
    }

    /// Delete an unparsed message (dismissal or post-labeling cleanup)
    pub fn delete_unparsed(&self, id: i64) -> Result<()> {
        let conn = self.conn()?;
        let deleted = conn.execute("DELETE FROM unparsed_messages WHERE id = ?", params![id])?;
        if deleted == 0 {
            return Err(Error::NotFound(format!(
                "Unparsed message {} not found",
                id
            )));
        }
        Ok(())
    }

    /// Delete a batch of unparsed messages, returns how many existed
    pub fn delete_unparsed_bulk(&self, ids: &[i64]) -> Result<i64> {
        if ids.is_empty() {
            return Ok(0);
        }

        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        let mut deleted = 0i64;
        for id in ids {
            deleted += tx.execute("DELETE FROM unparsed_messages WHERE id = ?", params![id])? as i64;
        }

        tx.commit()?;
        Ok(deleted)
    }

    fn row_to_unparsed(row: &rusqlite::Row) -> rusqlite::Result<UnparsedMessage> {
        let created_at_str: String = row.get(2)?;
        Ok(UnparsedMessage {
            id: row.get(0)?,
            raw_content: row.get(1)?,
            created_at: parse_datetime(&created_at_str),
        })
    }
}
