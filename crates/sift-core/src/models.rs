//! Domain models for Sift

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

/// Category assigned to items that have not been classified yet
pub const UNCATEGORIZED: &str = "Uncategorized";

/// A bank account
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub id: i64,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

/// Where a message-derived item originated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MessageSource {
    Sms,
    Email,
}

impl MessageSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sms => "sms",
            Self::Email => "email",
        }
    }
}

impl std::str::FromStr for MessageSource {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "sms" => Ok(Self::Sms),
            "email" => Ok(Self::Email),
            _ => Err(format!("Unknown message source: {}", s)),
        }
    }
}

impl std::fmt::Display for MessageSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Debit/credit direction of a message-derived amount
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum Direction {
    #[default]
    Debit,
    Credit,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Debit => "DEBIT",
            Self::Credit => "CREDIT",
        }
    }
}

impl std::str::FromStr for Direction {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "DEBIT" => Ok(Self::Debit),
            "CREDIT" => Ok(Self::Credit),
            _ => Err(format!("Unknown direction: {}", s)),
        }
    }
}

/// How a confirmed transaction entered the ledger
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TransactionSource {
    /// Promoted from a parsed SMS message
    Sms,
    /// Promoted from a parsed email
    Email,
    /// Manually entered
    #[default]
    Manual,
}

impl TransactionSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sms => "sms",
            Self::Email => "email",
            Self::Manual => "manual",
        }
    }
}

impl std::str::FromStr for TransactionSource {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "sms" => Ok(Self::Sms),
            "email" => Ok(Self::Email),
            "manual" => Ok(Self::Manual),
            _ => Err(format!("Unknown transaction source: {}", s)),
        }
    }
}

impl From<MessageSource> for TransactionSource {
    fn from(source: MessageSource) -> Self {
        match source {
            MessageSource::Sms => Self::Sms,
            MessageSource::Email => Self::Email,
        }
    }
}

/// A confirmed ledger transaction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub id: i64,
    pub account_id: i64,
    pub date: NaiveDateTime,
    pub description: String,
    /// Counterparty extracted by the message parser (empty when unknown)
    pub recipient: String,
    /// Negative = debit, positive = credit
    pub amount: f64,
    pub category: Option<String>,
    pub is_transfer: bool,
    /// Destination account for transfers
    pub to_account_id: Option<i64>,
    /// The counterpart transaction on the other account, for linked transfers
    pub linked_transaction_id: Option<i64>,
    pub exclude_from_reports: bool,
    /// Bank reference id (UTR/TXN) when the parser found one
    pub ref_id: Option<String>,
    pub source: TransactionSource,
    pub created_at: DateTime<Utc>,
}

/// A new transaction before DB insertion (manual entry or triage promotion)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewTransaction {
    pub account_id: i64,
    pub date: NaiveDateTime,
    pub description: String,
    #[serde(default)]
    pub recipient: String,
    pub amount: f64,
    pub category: Option<String>,
    #[serde(default)]
    pub is_transfer: bool,
    pub to_account_id: Option<i64>,
    pub linked_transaction_id: Option<i64>,
    #[serde(default)]
    pub exclude_from_reports: bool,
    pub ref_id: Option<String>,
    #[serde(default)]
    pub source: TransactionSource,
}

/// A parsed-but-unconfirmed transaction waiting in the triage queue
///
/// Created by the message parser when a raw SMS/email yields structured
/// fields, destroyed on approval (promoted to a `Transaction`) or rejection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingTransaction {
    pub id: i64,
    pub source: MessageSource,
    pub date: NaiveDateTime,
    /// Negative = debit, positive = credit
    pub amount: f64,
    pub recipient: String,
    pub description: String,
    pub category: String,
    pub is_transfer: bool,
    pub to_account_id: Option<i64>,
    pub exclude_from_reports: bool,
    pub linked_transaction_id: Option<i64>,
    pub created_at: DateTime<Utc>,
}

/// A new triage item (from the parser or from manual labeling)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPendingTransaction {
    pub source: MessageSource,
    pub date: NaiveDateTime,
    pub amount: f64,
    #[serde(default)]
    pub recipient: String,
    pub description: String,
    #[serde(default = "default_category")]
    pub category: String,
    #[serde(default)]
    pub is_transfer: bool,
    pub to_account_id: Option<i64>,
    #[serde(default)]
    pub exclude_from_reports: bool,
}

fn default_category() -> String {
    UNCATEGORIZED.to_string()
}

/// The user's edits posted when approving a triage item
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriageDecision {
    pub category: String,
    #[serde(default)]
    pub is_transfer: bool,
    pub to_account_id: Option<i64>,
    #[serde(default)]
    pub exclude_from_reports: bool,
}

/// A raw message that failed automatic structured extraction
///
/// Lives in the training queue until manually labeled (producing a new
/// `PendingTransaction`) or dismissed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnparsedMessage {
    pub id: i64,
    pub raw_content: String,
    pub created_at: DateTime<Utc>,
}

/// What a rule does when it matches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleAction {
    /// Assign the rule's category (and optionally the exclude flag)
    Categorize,
    /// Suppress matching messages before they reach triage
    Ignore,
}

impl RuleAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Categorize => "categorize",
            Self::Ignore => "ignore",
        }
    }
}

impl std::str::FromStr for RuleAction {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "categorize" => Ok(Self::Categorize),
            "ignore" => Ok(Self::Ignore),
            _ => Err(format!("Unknown rule action: {}", s)),
        }
    }
}

/// A durable categorization or suppression rule
///
/// The artifact of "smart categorization": it outlives the transaction
/// that spawned it. `keywords` is non-empty for an active rule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rule {
    pub id: i64,
    pub name: String,
    pub category: String,
    /// Ordered match strings; a rule matches when any keyword is contained
    /// in the recipient or description (case-insensitive)
    pub keywords: Vec<String>,
    pub exclude_from_reports: bool,
    pub action: RuleAction,
    pub created_at: DateTime<Utc>,
}

/// A new rule before DB insertion
#[derive(Debug, Clone)]
pub struct NewRule {
    pub name: String,
    pub category: String,
    pub keywords: Vec<String>,
    pub exclude_from_reports: bool,
    pub action: RuleAction,
}

/// A saved extraction template for the message parser
///
/// Derived from manual labeling when the user opts in; keyed by merchant so
/// a rename can keep the parser's vocabulary in sync.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParserPattern {
    pub id: i64,
    pub merchant_name: String,
    pub pattern: String,
    pub source: String,
    pub created_at: DateTime<Utc>,
}

/// Transient prompt offering to turn a category/exclude edit into a rule
///
/// Never persisted; at most one is active per session and creating a new
/// one replaces any unconfirmed previous one wholesale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SmartCategorizationPrompt {
    pub txn_id: i64,
    pub category: String,
    pub pattern: String,
    pub similar_count: i64,
    pub create_rule: bool,
    pub apply_to_similar: bool,
    pub exclude_from_reports: bool,
}

/// Transient prompt offering to propagate a description rename
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BulkRenamePrompt {
    pub old_name: String,
    pub new_name: String,
    pub affected_count: i64,
    pub sync_to_parser: bool,
}

/// Read-only projection of an existing transaction considered as a
/// transfer counterpart
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchCandidate {
    pub id: i64,
    pub amount: f64,
    pub date: NaiveDateTime,
    pub linked_transaction_id: Option<i64>,
}

impl From<&Transaction> for MatchCandidate {
    fn from(t: &Transaction) -> Self {
        Self {
            id: t.id,
            amount: t.amount,
            date: t.date,
            linked_transaction_id: t.linked_transaction_id,
        }
    }
}

/// Pre-filled manual labeling form for an unparsed message
///
/// Every field is a best-effort suggestion the labeler may override.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabelForm {
    pub amount: f64,
    pub date: NaiveDateTime,
    pub account_mask: String,
    #[serde(default)]
    pub recipient: String,
    /// Ledger description; falls back to the recipient when left blank
    #[serde(default)]
    pub description: String,
    pub ref_id: String,
    #[serde(default = "default_category")]
    pub category: String,
    #[serde(rename = "type")]
    pub direction: Direction,
    #[serde(default)]
    pub exclude_from_reports: bool,
    /// Derive a reusable extraction pattern from this message
    #[serde(default)]
    pub generate_pattern: bool,
}

/// Request body for the smart-categorize operation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmartCategorizeRequest {
    pub transaction_id: i64,
    pub category: String,
    #[serde(default)]
    pub create_rule: bool,
    #[serde(default)]
    pub apply_to_similar: bool,
    #[serde(default)]
    pub exclude_from_reports: bool,
}

/// Outcome of the smart-categorize operation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmartCategorizeResult {
    pub success: bool,
    /// Number of transactions recategorized (including the originating one)
    pub affected: i64,
    /// Whether a rule was actually persisted
    pub rule_created: bool,
    pub pattern: String,
}

/// One page of query results with the unfiltered total
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Paginated<T> {
    pub items: Vec<T>,
    pub total: i64,
}
