//! Sift Core Library
//!
//! Shared functionality for the Sift transaction triage tool:
//! - Database access and migrations (encrypted SQLite)
//! - Transfer counterpart matching engine
//! - Rule suggestion and application engine
//! - Triage state machine (pending → approved/rejected)
//! - Label extraction heuristics for unparsed bank messages
//! - Session layer for the triage and training queues

pub mod db;
pub mod error;
pub mod extract;
pub mod matching;
pub mod models;
pub mod rules;
pub mod session;
pub mod triage;

pub use db::Database;
pub use error::{Error, Result};
pub use matching::{TransferMatcher, AMOUNT_TOLERANCE, MATCH_WINDOW_DAYS};
pub use rules::{EditPrompts, RuleEngine};
pub use session::{
    FinanceApi, LocalApi, SearchDebouncer, SourceFilter, TriageQuery, TriageSession,
    SEARCH_DEBOUNCE,
};
pub use triage::{ApprovalOutcome, TriageEngine};
