//! Traits for storage abstraction and extensibility

use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::HashSet;

use crate::types::*;

/// Storage abstraction for the reconciliation engine
///
/// This trait allows the reconciliation core to work with any storage
/// backend (PostgreSQL, MySQL, SQLite, in-memory, etc.) by implementing
/// these methods. The backend owns the uniqueness constraint on
/// (organization, bank account, identity key); a violation must surface as
/// [`InsertOutcome::DuplicateKey`], never as an error.
#[async_trait]
pub trait ReconciliationStorage: Send + Sync {
    /// Get a bank account by ID within an organization
    async fn get_bank_account(
        &self,
        organization_id: &str,
        bank_account_id: &str,
    ) -> ReconcileResult<Option<BankAccount>>;

    /// Get a persisted bank transaction by ID within an organization
    async fn get_bank_transaction(
        &self,
        organization_id: &str,
        transaction_id: &str,
    ) -> ReconcileResult<Option<BankTransaction>>;

    /// Batched existence lookup: which of the given identity keys already
    /// have a persisted transaction for this bank account
    ///
    /// Called once per import with every key of the batch; per-row existence
    /// checks would defeat the purpose of bulk import.
    async fn existing_identity_keys(
        &self,
        organization_id: &str,
        bank_account_id: &str,
        identity_keys: &[String],
    ) -> ReconcileResult<HashSet<String>>;

    /// Insert a single bank transaction
    async fn insert_bank_transaction(
        &mut self,
        transaction: &BankTransaction,
    ) -> ReconcileResult<InsertOutcome>;

    /// Active normalization rules applicable to a bank account:
    /// account-specific rules plus global rules, disabled rules excluded
    ///
    /// Ordering is owned by the rule engine, not the backend.
    async fn active_rules(
        &self,
        organization_id: &str,
        bank_account_id: &str,
    ) -> ReconcileResult<Vec<NormalizationRule>>;

    /// Candidate ledger entries for a suggestion request: dated within the
    /// given range, posting at least one line to the ledger account, not
    /// already consumed by a confirmed bank match, capped at `limit` rows
    async fn candidate_entries(
        &self,
        organization_id: &str,
        ledger_account_id: &str,
        from: NaiveDate,
        to: NaiveDate,
        limit: usize,
    ) -> ReconcileResult<Vec<LedgerEntry>>;
}
