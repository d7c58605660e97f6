//! Pending transaction (triage queue) operations

use rusqlite::{params, OptionalExtension};

use super::triage_filter::TriageFilter;
use super::{parse_datetime, parse_naive_datetime, Database};
use crate::error::{Error, Result};
use crate::models::{
    MessageSource, NewPendingTransaction, Paginated, PendingTransaction, TriageDecision,
};

const PENDING_COLUMNS: &str = "p.id, p.source, p.date, p.amount, p.recipient, p.description, p.category, \
     p.is_transfer, p.to_account_id, p.exclude_from_reports, p.linked_transaction_id, p.created_at";

impl Database {
    /// Insert a pending transaction into the triage queue
    pub fn insert_pending(&self, item: &NewPendingTransaction) -> Result<i64> {
        let conn = self.conn()?;

        conn.execute(
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

        Ok(conn.last_insert_rowid())
    }

    /// Get a single pending transaction by ID
    pub fn get_pending(&self, id: i64) -> Result<Option<PendingTransaction>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM pending_transactions p WHERE p.id = ?",
            PENDING_COLUMNS
        ))?;

        let item = stmt
            .query_row(params![id], Self::row_to_pending)
            .optional()?;
        Ok(item)
    }

    /// List one page of the triage queue with the filtered total
    pub fn list_pending(
        &self,
        search: Option<&str>,
        source: Option<MessageSource>,
        sort_field: Option<&str>,
        sort_order: Option<&str>,
        limit: i64,
        offset: i64,
    ) -> Result<Paginated<PendingTransaction>> {
        let conn = self.conn()?;

        let filter = TriageFilter::new()
            .search(search)
            .source(source)
            .sort_field(sort_field)
            .sort_order(sort_order)
            .build();

        let total: i64 = conn.query_row(
            &filter.build_count_query(),
            filter.params_refs().as_slice(),
            |row| row.get(0),
        )?;

        let sql = format!(
            r#"
            SELECT {}
            FROM pending_transactions p
            {}
            {}
            LIMIT ? OFFSET ?
            "#,
            PENDING_COLUMNS, filter.where_clause, filter.order_clause
        );

        let mut params = filter.into_params();
        params.push(Box::new(limit));
        params.push(Box::new(offset));

        let mut stmt = conn.prepare(&sql)?;
        let params_refs: Vec<&dyn rusqlite::ToSql> = params.iter().map(|p| p.as_ref()).collect();

        let items = stmt
            .query_map(params_refs.as_slice(), Self::row_to_pending)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(Paginated { items, total })
    }

    /// Count the whole triage queue
    pub fn count_pending(&self) -> Result<i64> {
        let conn = self.conn()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM pending_transactions", [], |row| {
            row.get(0)
        })?;
        Ok(count)
    }

    /// Update the editable fields of a pending transaction
    pub fn update_pending(
        &self,
        id: i64,
        recipient: &str,
        description: &str,
        category: &str,
        is_transfer: bool,
        to_account_id: Option<i64>,
        exclude_from_reports: bool,
    ) -> Result<()> {
        let conn = self.conn()?;
        let updated = conn.execute(
            r#"
            UPDATE pending_transactions
            SET recipient = ?, description = ?, category = ?, is_transfer = ?,
                to_account_id = ?, exclude_from_reports = ?
            WHERE id = ?
            "#,
            params![
                recipient,
                description,
                category,
                is_transfer,
                to_account_id,
                exclude_from_reports,
                id
            ],
        )?;

        if updated == 0 {
            return Err(Error::NotFound(format!(
                "Pending transaction {} not found",
                id
            )));
        }
        Ok(())
    }

    /// Set or clear the selected transfer counterpart on a pending transaction
    pub fn set_pending_link(&self, id: i64, linked_transaction_id: Option<i64>) -> Result<()> {
        let conn = self.conn()?;
        let updated = conn.execute(
            "UPDATE pending_transactions SET linked_transaction_id = ? WHERE id = ?",
            params![linked_transaction_id, id],
        )?;

        if updated == 0 {
            return Err(Error::NotFound(format!(
                "Pending transaction {} not found",
                id
            )));
        }
        Ok(())
    }

    /// Promote a pending transaction into the ledger (approval)
    ///
    /// Applies the triage decision, copies the row into `transactions`,
    /// back-links the selected transfer counterpart if one was chosen, and
    /// removes the pending row. All of it happens in one SQL transaction:
    /// either the item is fully promoted or the queue is untouched.
    ///
    /// Returns the new confirmed transaction ID.
    pub fn promote_pending(
        &self,
        id: i64,
        account_id: i64,
        decision: &TriageDecision,
    ) -> Result<i64> {
        let pending = self
            .get_pending(id)?
            .ok_or_else(|| Error::NotFound(format!("Pending transaction {} not found", id)))?;

        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        tx.execute(
            r#"
            INSERT INTO transactions (account_id, date, description, recipient, amount, category,
                                      is_transfer, to_account_id, linked_transaction_id,
                                      exclude_from_reports, source)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
            params![
                account_id,
                pending.date.format("%Y-%m-%d %H:%M:%S").to_string(),
                pending.description,
                pending.recipient,
                pending.amount,
                decision.category,
                decision.is_transfer,
                decision.to_account_id,
                pending.linked_transaction_id,
                decision.exclude_from_reports,
                pending.source.as_str(),
            ],
        )?;
        let new_id = tx.last_insert_rowid();

        // Back-link the chosen counterpart so both legs point at each other
        if let Some(counterpart_id) = pending.linked_transaction_id {
            tx.execute(
                "UPDATE transactions SET linked_transaction_id = ?, is_transfer = 1 WHERE id = ?",
                params![new_id, counterpart_id],
            )?;
        }

        tx.execute("DELETE FROM pending_transactions WHERE id = ?", params![id])?;

        tx.commit()?;
        Ok(new_id)
    }

    /// Delete a pending transaction (rejection)
    pub fn delete_pending(&self, id: i64) -> Result<()> {
        let conn = self.conn()?;
        let deleted = conn.execute(
            "DELETE FROM pending_transactions WHERE id = ?",
            params![id],
        )?;
        if deleted == 0 {
            return Err(Error::NotFound(format!(
                "Pending transaction {} not found",
                id
            )));
        }
        Ok(())
    }

    /// Delete a batch of pending transactions, returns how many existed
    pub fn delete_pending_bulk(&self, ids: &[i64]) -> Result<i64> {
        if ids.is_empty() {
            return Ok(0);
        }

        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        let mut deleted = 0i64;
        for id in ids {
            deleted += tx.execute(
                "DELETE FROM pending_transactions WHERE id = ?",
                params![id],
            )? as i64;
        }

        tx.commit()?;
        Ok(deleted)
    }

    pub(crate) fn row_to_pending(row: &rusqlite::Row) -> rusqlite::Result<PendingTransaction> {
        let source_str: String = row.get(1)?;
        let date_str: String = row.get(2)?;
        let is_transfer_int: i64 = row.get(7)?;
        let exclude_int: i64 = row.get(9)?;
        let created_at_str: String = row.get(11)?;
        Ok(PendingTransaction {
            id: row.get(0)?,
            source: source_str.parse().unwrap_or(MessageSource::Sms),
            date: parse_naive_datetime(&date_str),
            amount: row.get(3)?,
            recipient: row.get(4)?,
            description: row.get(5)?,
            category: row.get(6)?,
            is_transfer: is_transfer_int != 0,
            to_account_id: row.get(8)?,
            exclude_from_reports: exclude_int != 0,
            linked_transaction_id: row.get(10)?,
            created_at: parse_datetime(&created_at_str),
        })
    }
}
