//! Statement import: preparation, deduplication and persistence
//!
//! Turns extracted statement records into persisted bank-transaction facts.
//! Row-level problems (duplicate keys, already-imported rows, insert
//! conflicts raced by a concurrent import) are absorbed into the summary
//! counters; only an unusable request, an unknown bank account or a
//! statement without a root marker fails the import as a whole.

use bigdecimal::{BigDecimal, RoundingMode};
use std::collections::HashSet;

use crate::rules::LabelNormalizer;
use crate::statement;
use crate::traits::ReconciliationStorage;
use crate::types::*;
use crate::utils::validation;

/// Canonical number of decimal places for stored amounts and identity keys
pub const AMOUNT_SCALE: i64 = 2;

/// Importer for bank statement files
pub struct StatementImporter<S: ReconciliationStorage> {
    storage: S,
}

impl<S: ReconciliationStorage> StatementImporter<S> {
    /// Create a new importer over the given storage backend
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    /// Import a raw statement file for one bank account
    ///
    /// Re-importing the same file is safe: every row already persisted is
    /// reported as a duplicate instead of being created again.
    pub async fn import_statement(
        &mut self,
        organization_id: &str,
        bank_account_id: &str,
        statement_text: &str,
    ) -> ReconcileResult<ImportSummary> {
        validation::validate_organization_id(organization_id)?;
        validation::validate_bank_account_id(bank_account_id)?;
        validation::validate_statement_text(statement_text)?;

        let account = self
            .storage
            .get_bank_account(organization_id, bank_account_id)
            .await?
            .ok_or_else(|| ReconcileError::BankAccountNotFound(bank_account_id.to_string()))?;

        let tree = statement::parse(statement_text)?;
        let records = statement::extract_transactions(&tree);
        let (prepared, mut duplicates) = prepare_batch(records);

        // One batched existence check for the whole file, not one per row.
        let identity_keys: Vec<String> = prepared
            .iter()
            .map(|row| row.identity_key.clone())
            .collect();
        let already_persisted = self
            .storage
            .existing_identity_keys(organization_id, &account.id, &identity_keys)
            .await?;

        let rules = self
            .storage
            .active_rules(organization_id, &account.id)
            .await?;
        let normalizer = LabelNormalizer::new(rules);

        // Rows are inserted one at a time: a failure partway through must
        // not discard work already committed.
        let mut transactions = Vec::new();
        for row in prepared {
            if already_persisted.contains(&row.identity_key) {
                duplicates += 1;
                continue;
            }

            let normalized_label = normalizer.normalize(&row.raw_label, row.memo.as_deref());
            let transaction = BankTransaction::from_prepared(
                organization_id.to_string(),
                account.id.clone(),
                &row,
                normalized_label,
            );

            match self.storage.insert_bank_transaction(&transaction).await? {
                InsertOutcome::Created(saved) => transactions.push(saved),
                InsertOutcome::DuplicateKey => {
                    tracing::debug!(
                        "identity key {} raced by a concurrent import, counting as duplicate",
                        row.identity_key
                    );
                    duplicates += 1;
                }
            }
        }

        Ok(ImportSummary {
            imported: transactions.len(),
            duplicates,
            transactions,
        })
    }
}

/// Prepare extracted records for persistence and drop in-batch duplicates
///
/// Returns the deduplicated rows in file order plus the number dropped.
/// The first occurrence of an identity key wins regardless of what follows.
pub fn prepare_batch(records: Vec<ParsedTransaction>) -> (Vec<PreparedTransaction>, usize) {
    let mut seen: HashSet<String> = HashSet::new();
    let mut prepared = Vec::new();
    let mut duplicates = 0;

    for record in records {
        let row = prepare_record(record);
        if seen.insert(row.identity_key.clone()) {
            prepared.push(row);
        } else {
            duplicates += 1;
        }
    }

    (prepared, duplicates)
}

fn prepare_record(record: ParsedTransaction) -> PreparedTransaction {
    let amount = canonical_amount(&record.amount);
    let raw_label = sanitize_label(&record.display_name);
    PreparedTransaction::new(
        record.external_id,
        record.posted_at,
        amount,
        raw_label,
        record.memo,
    )
}

/// Canonicalize an amount to the fixed storage scale
pub fn canonical_amount(amount: &BigDecimal) -> BigDecimal {
    amount.with_scale_round(AMOUNT_SCALE, RoundingMode::HalfUp)
}

/// Collapse internal whitespace; blank labels become the placeholder
pub fn sanitize_label(raw: &str) -> String {
    let collapsed = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.is_empty() {
        PLACEHOLDER_LABEL.to_string()
    } else {
        collapsed
    }
}
