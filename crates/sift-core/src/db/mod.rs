//! Database access layer with connection pooling and migrations
//!
//! This module is organized by domain:
//! - `accounts` - Bank account operations
//! - `transactions` - Confirmed ledger transaction CRUD
//! - `triage` - Pending transaction queue operations
//! - `training` - Unparsed message queue operations
//! - `rules` - Categorization/ignore rules and parser patterns

use chrono::{DateTime, Utc};
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use tracing::info;

use crate::error::{Error, Result};

mod accounts;
mod rules;
mod training;
mod transactions;
mod triage;
mod triage_filter;

pub use triage_filter::{FilterResult, TriageFilter};

pub type DbPool = Pool<SqliteConnectionManager>;
pub type DbConn = PooledConnection<SqliteConnectionManager>;

/// Environment variable for database encryption key
pub const DB_KEY_ENV: &str = "SIFT_DB_KEY";

/// Derive an encryption key from a passphrase using Argon2
///
/// Uses a fixed application salt so the same passphrase always produces the same key,
/// regardless of database path. This allows moving/renaming/restoring the database freely.
fn derive_key(passphrase: &str) -> Result<String> {
    use argon2::{password_hash::SaltString, Argon2, PasswordHasher};

    // Fixed application salt - changing this would invalidate all existing encrypted databases
    const APP_SALT: &[u8; 16] = b"sift-salt-v1-fix";

    let salt = SaltString::encode_b64(APP_SALT)
        .map_err(|e| Error::Encryption(format!("Failed to create salt: {}", e)))?;

    let argon2 = Argon2::default();
    let hash = argon2
        .hash_password(passphrase.as_bytes(), &salt)
        .map_err(|e| Error::Encryption(format!("Failed to derive key: {}", e)))?;

    // Extract the hash portion for use as SQLCipher key (hex encoded)
    let hash_str = hash
        .hash
        .ok_or_else(|| Error::Encryption("No hash output".to_string()))?;
    Ok(hex::encode(hash_str.as_bytes()))
}

/// Parse a SQLite datetime string into a DateTime<Utc>
pub(crate) fn parse_datetime(s: &str) -> DateTime<Utc> {
    // SQLite stores as "YYYY-MM-DD HH:MM:SS" format
    chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
        .map(|dt| dt.and_utc())
        .unwrap_or_else(|_| Utc::now())
}

/// Parse a SQLite datetime string into a NaiveDateTime, tolerating date-only values
pub(crate) fn parse_naive_datetime(s: &str) -> chrono::NaiveDateTime {
    chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
        .or_else(|_| {
            chrono::NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .map(|d| d.and_hms_opt(0, 0, 0).unwrap_or_default())
        })
        .unwrap_or_else(|_| Utc::now().naive_utc())
}

/// Database wrapper with connection pooling
#[derive(Clone)]
pub struct Database {
    pool: DbPool,
    /// Path to the database file
    db_path: String,
}

impl Database {
    /// Create a new database connection pool with encryption
    ///
    /// Requires `SIFT_DB_KEY` environment variable to be set.
    /// The database will be encrypted using SQLCipher with a key derived
    /// from the passphrase via Argon2.
    ///
    /// Returns an error if `SIFT_DB_KEY` is not set. Use `new_unencrypted()`
    /// for development/testing without encryption.
    pub fn new(path: &str) -> Result<Self> {
        let encryption_key = std::env::var(DB_KEY_ENV).ok();
        match encryption_key {
            Some(key) => Self::new_with_key(path, Some(&key)),
            None => Err(Error::Encryption(format!(
                "Database encryption required. Set {} environment variable with your passphrase, \
                or use --no-encrypt for unencrypted databases (not recommended for production).",
                DB_KEY_ENV
            ))),
        }
    }

    /// Create a new unencrypted database connection pool
    ///
    /// WARNING: This creates an unencrypted database. Only use for development
    /// or testing. For production, use `new()` with `SIFT_DB_KEY` set.
    pub fn new_unencrypted(path: &str) -> Result<Self> {
        Self::new_with_key(path, None)
    }

    /// Create a new database with an explicit encryption key
    pub fn new_with_key(path: &str, passphrase: Option<&str>) -> Result<Self> {
        let manager = SqliteConnectionManager::file(path);

        let pool = if let Some(pass) = passphrase {
            let key = derive_key(pass)?;
            let key_pragma = format!("PRAGMA key = 'x\"{}\"';", key);

            // Use with_init to set the key on every new connection
            let manager = manager.with_init(move |conn| {
                conn.execute_batch(&key_pragma)?;
                Ok(())
            });

            Pool::builder().max_size(10).build(manager)?
        } else {
            Pool::builder().max_size(10).build(manager)?
        };

        let db = Self {
            pool,
            db_path: path.to_string(),
        };
        db.run_migrations()?;

        Ok(db)
    }

    /// Get the path to the database file
    pub fn path(&self) -> &str {
        &self.db_path
    }

    /// Create an in-memory database (for testing)
    ///
    /// Note: Uses a temporary file rather than `:memory:` because SQLCipher
    /// has issues with in-memory databases in the connection pool.
    pub fn in_memory() -> Result<Self> {
        use std::sync::atomic::{AtomicU64, Ordering};
        static COUNTER: AtomicU64 = AtomicU64::new(0);

        let id = COUNTER.fetch_add(1, Ordering::SeqCst);
        let path = format!("/tmp/sift_test_{}.db", id);

        // Remove any existing file
        let _ = std::fs::remove_file(&path);

        Self::new_unencrypted(&path)
    }

    /// Check if the database is encrypted
    pub fn is_encrypted(&self) -> Result<bool> {
        let conn = self.conn()?;
        // SQLCipher sets cipher_version if encryption is active
        let result: rusqlite::Result<String> =
            conn.query_row("PRAGMA cipher_version;", [], |row| row.get(0));
        Ok(result.is_ok() && std::env::var(DB_KEY_ENV).is_ok())
    }

    /// Get a connection from the pool
    pub fn conn(&self) -> Result<DbConn> {
        Ok(self.pool.get()?)
    }

    /// Run database migrations
    fn run_migrations(&self) -> Result<()> {
        let conn = self.conn()?;

        conn.execute_batch(
            r#"
            -- Enable foreign keys
            PRAGMA foreign_keys = ON;

            -- Performance pragmas for local storage
            -- WAL mode: better concurrency, readers don't block writers
            -- Note: creates -wal and -shm sidecar files alongside the database
            PRAGMA journal_mode = WAL;

            -- Cache size: ~8MB (2000 pages * 4KB default page size)
            PRAGMA cache_size = 2000;

            -- Synchronous NORMAL: good balance of safety and performance
            PRAGMA synchronous = NORMAL;

            -- Store temp tables in memory (faster for complex queries)
            PRAGMA temp_store = MEMORY;

            -- Accounts (bank accounts)
            CREATE TABLE IF NOT EXISTS accounts (
                id INTEGER PRIMARY KEY,
                name TEXT NOT NULL UNIQUE,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            );

            -- Confirmed ledger transactions
            CREATE TABLE IF NOT EXISTS transactions (
                id INTEGER PRIMARY KEY,
                account_id INTEGER NOT NULL REFERENCES accounts(id),
                date DATETIME NOT NULL,
                description TEXT NOT NULL,
                recipient TEXT NOT NULL DEFAULT '',
                amount REAL NOT NULL,                     -- negative = debit, positive = credit
                category TEXT,
                is_transfer BOOLEAN NOT NULL DEFAULT 0,
                to_account_id INTEGER REFERENCES accounts(id),
                linked_transaction_id INTEGER REFERENCES transactions(id),
                exclude_from_reports BOOLEAN NOT NULL DEFAULT 0,
                ref_id TEXT,                              -- bank reference (UTR/TXN)
                source TEXT NOT NULL DEFAULT 'manual',    -- sms, email, manual
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            );

            CREATE INDEX IF NOT EXISTS idx_transactions_date ON transactions(date);
            CREATE INDEX IF NOT EXISTS idx_transactions_account ON transactions(account_id);
            CREATE INDEX IF NOT EXISTS idx_transactions_category ON transactions(category);
            CREATE INDEX IF NOT EXISTS idx_transactions_recipient ON transactions(recipient);
            CREATE INDEX IF NOT EXISTS idx_transactions_linked ON transactions(linked_transaction_id);

            -- Pending transactions (triage queue)
            -- Rows here were parsed from a message but not yet confirmed.
            -- Approval promotes the row into transactions; rejection deletes it.
            CREATE TABLE IF NOT EXISTS pending_transactions (
                id INTEGER PRIMARY KEY,
                source TEXT NOT NULL,                     -- sms, email
                date DATETIME NOT NULL,
                amount REAL NOT NULL,                     -- negative = debit, positive = credit
                recipient TEXT NOT NULL DEFAULT '',
                description TEXT NOT NULL,
                category TEXT NOT NULL DEFAULT 'Uncategorized',
                is_transfer BOOLEAN NOT NULL DEFAULT 0,
                to_account_id INTEGER REFERENCES accounts(id),
                exclude_from_reports BOOLEAN NOT NULL DEFAULT 0,
                linked_transaction_id INTEGER REFERENCES transactions(id),
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            );

            CREATE INDEX IF NOT EXISTS idx_pending_date ON pending_transactions(date);
            CREATE INDEX IF NOT EXISTS idx_pending_source ON pending_transactions(source);
            CREATE INDEX IF NOT EXISTS idx_pending_recipient ON pending_transactions(recipient);

            -- Unparsed messages (training queue)
            -- Raw messages no extraction pattern matched; resolved by manual
            -- labeling (which may also derive a new parser pattern) or dismissal.
            CREATE TABLE IF NOT EXISTS unparsed_messages (
                id INTEGER PRIMARY KEY,
                raw_content TEXT NOT NULL,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            );

            -- Categorization and ignore rules
            CREATE TABLE IF NOT EXISTS rules (
                id INTEGER PRIMARY KEY,
                name TEXT NOT NULL,
                category TEXT NOT NULL,
                keywords TEXT NOT NULL,                   -- pipe-separated match strings
                exclude_from_reports BOOLEAN NOT NULL DEFAULT 0,
                action TEXT NOT NULL DEFAULT 'categorize', -- categorize, ignore
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            );

            CREATE INDEX IF NOT EXISTS idx_rules_action ON rules(action);

            -- Parser patterns (derived extraction templates for the message parser)
            CREATE TABLE IF NOT EXISTS parser_patterns (
                id INTEGER PRIMARY KEY,
                merchant_name TEXT NOT NULL,
                pattern TEXT NOT NULL,
                source TEXT NOT NULL DEFAULT 'labeled',   -- labeled, builtin
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
                UNIQUE(merchant_name, pattern)
            );

            CREATE INDEX IF NOT EXISTS idx_parser_patterns_merchant ON parser_patterns(merchant_name);
            "#,
        )?;

        info!("Database schema initialized");
        Ok(())
    }
}
