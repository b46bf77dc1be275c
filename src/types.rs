//! Core types and data structures for the reconciliation engine

use bigdecimal::BigDecimal;
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Placeholder label used when a statement record carries no usable name
pub const PLACEHOLDER_LABEL: &str = "Transaction";

/// Transaction record extracted from a parsed statement
///
/// Ephemeral output of the statement extractor; consumed by the preparer
/// and never persisted as-is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedTransaction {
    /// Statement-native transaction identifier
    pub external_id: String,
    /// Calendar date the transaction was posted
    pub posted_at: NaiveDate,
    /// Signed amount, ledger convention: positive = credit
    pub amount: BigDecimal,
    /// Label as it appears on the statement
    pub display_name: String,
    /// Optional free-text memo
    pub memo: Option<String>,
}

/// Sanitized, persist-ready transaction with its derived identity key
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreparedTransaction {
    /// Statement-native transaction identifier
    pub external_id: String,
    /// Calendar date (UTC midnight-normalized)
    pub value_date: NaiveDate,
    /// Signed amount canonicalized to 2 decimal places
    pub amount: BigDecimal,
    /// Cleaned label text
    pub raw_label: String,
    /// Optional free-text memo
    pub memo: Option<String>,
    /// Deduplication key: external id + amount (2dp) + ISO calendar date
    pub identity_key: String,
}

impl PreparedTransaction {
    /// Build a prepared transaction; the amount must already carry the
    /// canonical scale of 2
    pub fn new(
        external_id: String,
        value_date: NaiveDate,
        amount: BigDecimal,
        raw_label: String,
        memo: Option<String>,
    ) -> Self {
        let identity_key = Self::identity_key_for(&external_id, &amount, value_date);
        Self {
            external_id,
            value_date,
            amount,
            raw_label,
            memo,
            identity_key,
        }
    }

    /// Derive the identity key for a (external id, amount, date) triple
    pub fn identity_key_for(external_id: &str, amount: &BigDecimal, date: NaiveDate) -> String {
        format!("{}::{}::{}", external_id, amount, date.format("%Y-%m-%d"))
    }
}

/// Persisted bank transaction fact
///
/// Created once per unique identity key per bank account and never updated
/// by this crate. Reconciliation status lives with the ledger collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BankTransaction {
    /// Unique identifier for the transaction
    pub id: String,
    /// Owning organization
    pub organization_id: String,
    /// Owning bank account
    pub bank_account_id: String,
    /// Statement-native transaction identifier
    pub external_id: String,
    /// Calendar date the transaction was posted
    pub value_date: NaiveDate,
    /// Signed amount, 2 decimal places
    pub amount: BigDecimal,
    /// Label as received from the statement
    pub raw_label: String,
    /// Rule-normalized label, or the raw label if no rule matched
    pub normalized_label: String,
    /// When the row was created
    pub created_at: NaiveDateTime,
}

impl BankTransaction {
    /// Create a new bank transaction from a prepared record
    pub fn from_prepared(
        organization_id: String,
        bank_account_id: String,
        prepared: &PreparedTransaction,
        normalized_label: String,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            organization_id,
            bank_account_id,
            external_id: prepared.external_id.clone(),
            value_date: prepared.value_date,
            amount: prepared.amount.clone(),
            raw_label: prepared.raw_label.clone(),
            normalized_label,
            created_at: chrono::Utc::now().naive_utc(),
        }
    }

    /// Identity key of this transaction (external id + amount + date)
    pub fn identity_key(&self) -> String {
        PreparedTransaction::identity_key_for(&self.external_id, &self.amount, self.value_date)
    }
}

/// Bank account known to the importer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BankAccount {
    /// Unique identifier for the bank account
    pub id: String,
    /// Owning organization
    pub organization_id: String,
    /// Human-readable account name
    pub name: String,
    /// The single chart-of-accounts account this bank account posts against
    pub ledger_account_id: String,
}

/// Scope of a normalization rule
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RuleScope {
    /// Applies to every bank account of the organization
    Global,
    /// Applies to a single bank account
    Account(String),
}

impl RuleScope {
    /// Whether this rule applies to the given bank account
    pub fn applies_to(&self, bank_account_id: &str) -> bool {
        match self {
            RuleScope::Global => true,
            RuleScope::Account(id) => id == bank_account_id,
        }
    }
}

/// Pattern-based label normalization rule
///
/// Externally authored and read-only to this crate. Disabled rules are
/// never applied; evaluation order is priority desc, then creation time asc.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizationRule {
    /// Unique identifier for the rule
    pub id: String,
    /// Regular expression tested against label and memo
    pub pattern: String,
    /// Replacement label when the pattern matches
    pub normalized_label: String,
    /// Higher priority evaluates first
    pub priority: i32,
    /// Tie-break between equal priorities, earlier first
    pub created_at: NaiveDateTime,
    /// Bank account scope
    pub scope: RuleScope,
    /// Disabled rules are skipped entirely
    pub is_active: bool,
}

/// Single debit/credit line of a ledger entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntryLine {
    /// Ledger account the line posts to
    pub account_id: String,
    /// Debit amount
    pub debit: BigDecimal,
    /// Credit amount
    pub credit: BigDecimal,
}

impl EntryLine {
    /// Create a debit line
    pub fn debit(account_id: String, amount: BigDecimal) -> Self {
        Self {
            account_id,
            debit: amount,
            credit: BigDecimal::from(0),
        }
    }

    /// Create a credit line
    pub fn credit(account_id: String, amount: BigDecimal) -> Self {
        Self {
            account_id,
            debit: BigDecimal::from(0),
            credit: amount,
        }
    }
}

/// Ledger entry candidate as projected by the storage collaborator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntry {
    /// Unique identifier for the entry
    pub id: String,
    /// Entry date
    pub date: NaiveDate,
    /// Memo/reference text, the fuzzy-matching haystack
    pub reference: Option<String>,
    /// Debit/credit lines
    pub lines: Vec<EntryLine>,
}

impl LedgerEntry {
    /// Net cash effect of this entry on the given account:
    /// sum of (debit - credit) over lines touching the account
    pub fn net_amount(&self, account_id: &str) -> BigDecimal {
        self.lines
            .iter()
            .filter(|line| line.account_id == account_id)
            .map(|line| &line.debit - &line.credit)
            .sum()
    }
}

/// How a suggestion candidate matched the bank transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MatchType {
    /// Amount equality within a 3-day window
    Exact,
    /// Text similarity with small amount/date tolerance
    Fuzzy,
}

/// Ranked candidate ledger entry for an unmatched bank transaction
///
/// Produced fresh on each suggestion request and never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconciliationSuggestion {
    /// Candidate ledger entry identifier
    pub entry_id: String,
    /// Entry date
    pub entry_date: NaiveDate,
    /// Entry net amount on the linked ledger account
    pub amount: BigDecimal,
    /// Entry memo/reference text
    pub reference: Option<String>,
    /// Exact or fuzzy tier
    pub match_type: MatchType,
    /// Trigram similarity rounded to 4 decimal places, fuzzy tier only
    pub similarity: Option<f64>,
}

/// Outcome of one statement import
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportSummary {
    /// Number of newly persisted transactions
    pub imported: usize,
    /// Number of rows dropped as duplicates (in-batch + already persisted)
    pub duplicates: usize,
    /// The newly created transactions, in file order
    pub transactions: Vec<BankTransaction>,
}

/// Response of one suggestion request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuggestionResponse {
    /// The bank transaction the suggestions are for
    pub transaction_id: String,
    /// Ranked suggestions, exact tier first
    pub suggestions: Vec<ReconciliationSuggestion>,
}

/// Result of a single-row insert at the storage boundary
///
/// A uniqueness-constraint violation raced by a concurrent import is a
/// duplicate, not an error.
#[derive(Debug, Clone, PartialEq)]
pub enum InsertOutcome {
    /// The row was persisted
    Created(BankTransaction),
    /// A row with the same identity key already exists
    DuplicateKey,
}

/// Errors that can occur in the reconciliation engine
#[derive(Debug, thiserror::Error)]
pub enum ReconcileError {
    #[error("Storage error: {0}")]
    Storage(String),
    #[error("Malformed statement: {0}")]
    MalformedStatement(String),
    #[error("Bank account not found: {0}")]
    BankAccountNotFound(String),
    #[error("Bank transaction not found: {0}")]
    TransactionNotFound(String),
    #[error("Validation error: {0}")]
    Validation(String),
}

/// Result type for reconciliation operations
pub type ReconcileResult<T> = Result<T, ReconcileError>;
