//! In-memory storage implementation for testing

use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};

use crate::traits::*;
use crate::types::*;

/// In-memory storage implementation for testing and development
///
/// Enforces the same (organization, bank account, identity key) uniqueness
/// constraint a relational backend would carry.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    bank_accounts: Arc<RwLock<HashMap<String, BankAccount>>>,
    bank_transactions: Arc<RwLock<HashMap<String, BankTransaction>>>,
    identity_index: Arc<RwLock<HashSet<(String, String, String)>>>,
    rules: Arc<RwLock<HashMap<String, Vec<NormalizationRule>>>>,
    ledger_entries: Arc<RwLock<HashMap<String, Vec<LedgerEntry>>>>,
    matched_entries: Arc<RwLock<HashSet<String>>>,
}

impl MemoryStorage {
    /// Create a new memory storage instance
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear all data (useful for testing)
    pub fn clear(&self) {
        self.bank_accounts.write().unwrap().clear();
        self.bank_transactions.write().unwrap().clear();
        self.identity_index.write().unwrap().clear();
        self.rules.write().unwrap().clear();
        self.ledger_entries.write().unwrap().clear();
        self.matched_entries.write().unwrap().clear();
    }

    /// Seed a bank account
    pub fn add_bank_account(&self, account: BankAccount) {
        self.bank_accounts
            .write()
            .unwrap()
            .insert(account.id.clone(), account);
    }

    /// Seed a normalization rule for an organization
    pub fn add_rule(&self, organization_id: &str, rule: NormalizationRule) {
        self.rules
            .write()
            .unwrap()
            .entry(organization_id.to_string())
            .or_default()
            .push(rule);
    }

    /// Seed a ledger entry for an organization
    pub fn add_ledger_entry(&self, organization_id: &str, entry: LedgerEntry) {
        self.ledger_entries
            .write()
            .unwrap()
            .entry(organization_id.to_string())
            .or_default()
            .push(entry);
    }

    /// Mark a ledger entry as consumed by a confirmed bank match
    pub fn mark_entry_matched(&self, entry_id: &str) {
        self.matched_entries
            .write()
            .unwrap()
            .insert(entry_id.to_string());
    }
}

#[async_trait]
impl ReconciliationStorage for MemoryStorage {
    async fn get_bank_account(
        &self,
        organization_id: &str,
        bank_account_id: &str,
    ) -> ReconcileResult<Option<BankAccount>> {
        Ok(self
            .bank_accounts
            .read()
            .unwrap()
            .get(bank_account_id)
            .filter(|account| account.organization_id == organization_id)
            .cloned())
    }

    async fn get_bank_transaction(
        &self,
        organization_id: &str,
        transaction_id: &str,
    ) -> ReconcileResult<Option<BankTransaction>> {
        Ok(self
            .bank_transactions
            .read()
            .unwrap()
            .get(transaction_id)
            .filter(|txn| txn.organization_id == organization_id)
            .cloned())
    }

    async fn existing_identity_keys(
        &self,
        organization_id: &str,
        bank_account_id: &str,
        identity_keys: &[String],
    ) -> ReconcileResult<HashSet<String>> {
        let index = self.identity_index.read().unwrap();
        Ok(identity_keys
            .iter()
            .filter(|key| {
                index.contains(&(
                    organization_id.to_string(),
                    bank_account_id.to_string(),
                    (*key).clone(),
                ))
            })
            .cloned()
            .collect())
    }

    async fn insert_bank_transaction(
        &mut self,
        transaction: &BankTransaction,
    ) -> ReconcileResult<InsertOutcome> {
        let key = (
            transaction.organization_id.clone(),
            transaction.bank_account_id.clone(),
            transaction.identity_key(),
        );

        // The uniqueness constraint: a violation is a duplicate, not an error.
        if !self.identity_index.write().unwrap().insert(key) {
            return Ok(InsertOutcome::DuplicateKey);
        }

        self.bank_transactions
            .write()
            .unwrap()
            .insert(transaction.id.clone(), transaction.clone());
        Ok(InsertOutcome::Created(transaction.clone()))
    }

    async fn active_rules(
        &self,
        organization_id: &str,
        bank_account_id: &str,
    ) -> ReconcileResult<Vec<NormalizationRule>> {
        Ok(self
            .rules
            .read()
            .unwrap()
            .get(organization_id)
            .map(|rules| {
                rules
                    .iter()
                    .filter(|rule| rule.is_active && rule.scope.applies_to(bank_account_id))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn candidate_entries(
        &self,
        organization_id: &str,
        ledger_account_id: &str,
        from: NaiveDate,
        to: NaiveDate,
        limit: usize,
    ) -> ReconcileResult<Vec<LedgerEntry>> {
        let matched = self.matched_entries.read().unwrap();
        let mut candidates: Vec<LedgerEntry> = self
            .ledger_entries
            .read()
            .unwrap()
            .get(organization_id)
            .map(|entries| {
                entries
                    .iter()
                    .filter(|entry| entry.date >= from && entry.date <= to)
                    .filter(|entry| {
                        entry
                            .lines
                            .iter()
                            .any(|line| line.account_id == ledger_account_id)
                    })
                    .filter(|entry| !matched.contains(&entry.id))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();

        // Deterministic order so the fetch cap truncates reproducibly.
        candidates.sort_by(|a, b| a.date.cmp(&b.date).then_with(|| a.id.cmp(&b.id)));
        candidates.truncate(limit);
        Ok(candidates)
    }
}
