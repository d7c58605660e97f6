//! CLI argument definitions using clap
//!
//! This module contains all the clap structs and enums for parsing CLI arguments.
//! The actual command implementations are in the `commands` module.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Sift - Transaction triage for parsed bank messages
#[derive(Parser)]
#[command(name = "sift")]
#[command(about = "Review, match and categorize parsed bank transactions", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Database path
    #[arg(long, default_value = "sift.db", global = true)]
    pub db: PathBuf,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable database encryption (not recommended for production)
    ///
    /// By default, the database is encrypted using SQLCipher.
    /// Set SIFT_DB_KEY environment variable with your passphrase.
    /// Use --no-encrypt only for development or testing.
    #[arg(long, global = true)]
    pub no_encrypt: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize the database
    Init,

    /// Start the web server
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "3000")]
        port: u16,

        /// Host to bind to
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Directory containing static files to serve (e.g., ui/dist)
        #[arg(long)]
        static_dir: Option<PathBuf>,

        /// Allowed CORS origin (repeatable; default is same-origin only)
        #[arg(long = "cors-origin")]
        cors_origins: Vec<String>,
    },

    /// Show database status (encryption, queue sizes, etc.)
    Status,

    /// Work the triage queue
    Triage {
        #[command(subcommand)]
        action: Option<TriageAction>,
    },

    /// Work the training queue of unparsed messages
    Training {
        #[command(subcommand)]
        action: Option<TrainingAction>,
    },

    /// Manage categorization rules
    Rules {
        #[command(subcommand)]
        action: Option<RulesAction>,
    },

    /// Rename a merchant across all transactions
    Rename {
        /// Current description
        old_name: String,

        /// New description
        new_name: String,

        /// Also rename the merchant in saved parser patterns
        #[arg(long)]
        sync_parser: bool,
    },
}

#[derive(Subcommand)]
pub enum TriageAction {
    /// List pending transactions
    List {
        /// Maximum number of items to show
        #[arg(short, long, default_value = "20")]
        limit: i64,

        /// Filter by recipient or description
        #[arg(short, long)]
        search: Option<String>,

        /// Filter by message source: sms or email
        #[arg(long)]
        source: Option<String>,
    },

    /// Approve a pending transaction into the ledger
    Approve {
        /// Pending transaction ID
        id: i64,

        /// Account the transaction belongs to (created if missing)
        #[arg(short, long)]
        account: String,

        /// Category to assign
        #[arg(short, long, default_value = "Uncategorized")]
        category: String,

        /// Mark as a transfer between own accounts
        #[arg(long)]
        transfer: bool,

        /// Destination account for transfers
        #[arg(long)]
        to_account: Option<String>,

        /// Exclude from spending reports
        #[arg(long)]
        exclude: bool,
    },

    /// Reject a pending transaction
    Reject {
        /// Pending transaction ID
        id: i64,

        /// Also create a rule suppressing future messages like this one
        #[arg(long)]
        ignore_rule: bool,
    },

    /// Reject a batch of pending transactions (all-or-nothing)
    BulkReject {
        /// Pending transaction IDs
        ids: Vec<i64>,

        /// Also create suppression rules
        #[arg(long)]
        ignore_rules: bool,
    },
}

#[derive(Subcommand)]
pub enum TrainingAction {
    /// List unparsed messages
    List {
        /// Maximum number of items to show
        #[arg(short, long, default_value = "20")]
        limit: i64,

        /// Filter by message content
        #[arg(short, long)]
        search: Option<String>,
    },

    /// Show a message with its suggested label
    Show {
        /// Message ID
        id: i64,
    },

    /// Label a message into the triage queue
    Label {
        /// Message ID
        id: i64,

        /// Transaction amount (positive; direction comes from --credit)
        #[arg(short, long)]
        amount: f64,

        /// Transaction date (YYYY-MM-DD)
        #[arg(short, long)]
        date: String,

        /// Counterparty name
        #[arg(short, long, default_value = "")]
        recipient: String,

        /// Ledger description (defaults to the recipient)
        #[arg(long, default_value = "")]
        description: String,

        /// Category to assign
        #[arg(short, long, default_value = "Uncategorized")]
        category: String,

        /// Money coming in rather than going out
        #[arg(long)]
        credit: bool,

        /// Exclude from spending reports
        #[arg(long)]
        exclude: bool,

        /// Derive a reusable parser pattern from this message
        #[arg(long)]
        pattern: bool,
    },

    /// Dismiss messages without labeling them
    Dismiss {
        /// Message IDs
        ids: Vec<i64>,
        /// Create suppression rules so matching messages skip the queue
        #[arg(long)]
        ignore_rules: bool,
    },
}

#[derive(Subcommand)]
pub enum RulesAction {
    /// Add a rule
    Add {
        /// Rule name
        name: String,

        /// Category the rule assigns
        #[arg(short, long)]
        category: String,

        /// Match keyword (repeatable; any keyword matches)
        #[arg(short, long = "keyword", required = true)]
        keywords: Vec<String>,

        /// Matched transactions are excluded from reports
        #[arg(long)]
        exclude: bool,

        /// Suppress matching messages instead of categorizing them
        #[arg(long)]
        ignore: bool,
    },

    /// Delete a rule
    Delete {
        /// Rule ID
        id: i64,
    },

    /// Apply a rule to existing uncategorized transactions
    Apply {
        /// Rule ID
        id: i64,
    },
}
