//! HTTP request handlers organized by domain
//!
//! Each submodule contains handlers for a specific API area.

pub mod accounts;
pub mod messages;
pub mod rules;
pub mod training;
pub mod transactions;
pub mod triage;

// Re-export all handlers for use in router
pub use accounts::*;
pub use messages::*;
pub use rules::*;
pub use training::*;
pub use transactions::*;
pub use triage::*;
