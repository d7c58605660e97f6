//! CLI command implementations
//!
//! Commands are organized by domain:
//! - `core` - Init command and shared utilities (open_db)
//! - `rules` - Rule management and bulk rename commands
//! - `serve` - Web server command
//! - `status` - Status command
//! - `training` - Training queue commands (list, show, label, dismiss)
//! - `triage` - Triage queue commands (list, approve, reject)

pub mod core;
pub mod rules;
pub mod serve;
pub mod status;
pub mod training;
pub mod triage;

// Re-export command functions for main.rs
pub use core::*;
pub use rules::*;
pub use serve::*;
pub use status::*;
pub use training::*;
pub use triage::*;

/// Truncate a string to a maximum length, adding "..." if truncated
pub fn truncate(s: &str, max: usize) -> String {
    if s.len() <= max {
        s.to_string()
    } else {
        format!("{}...", &s[..max.saturating_sub(3)])
    }
}
