//! Main reconciliation engine that coordinates import and suggestions

use crate::engine::{StatementImporter, SuggestionEngine};
use crate::traits::ReconciliationStorage;
use crate::types::*;

/// Reconciliation engine orchestrating the two request boundaries:
/// statement import and match suggestions
pub struct ReconciliationEngine<S: ReconciliationStorage> {
    importer: StatementImporter<S>,
    suggestion_engine: SuggestionEngine<S>,
}

impl<S: ReconciliationStorage + Clone> ReconciliationEngine<S> {
    /// Create a new engine with the given storage backend
    pub fn new(storage: S) -> Self {
        Self {
            importer: StatementImporter::new(storage.clone()),
            suggestion_engine: SuggestionEngine::new(storage),
        }
    }

    /// Import a raw statement file for one bank account
    ///
    /// Returns how many rows were created, how many were dropped as
    /// duplicates, and the newly created transactions in file order.
    pub async fn import_statement(
        &mut self,
        organization_id: &str,
        bank_account_id: &str,
        statement_text: &str,
    ) -> ReconcileResult<ImportSummary> {
        self.importer
            .import_statement(organization_id, bank_account_id, statement_text)
            .await
    }

    /// Rank candidate ledger entries for an unmatched bank transaction
    pub async fn suggest(
        &self,
        organization_id: &str,
        transaction_id: &str,
        max_suggestions: usize,
    ) -> ReconcileResult<SuggestionResponse> {
        self.suggestion_engine
            .suggest(organization_id, transaction_id, max_suggestions)
            .await
    }

    /// [`suggest`](Self::suggest) with the default maximum of 5
    pub async fn suggest_default(
        &self,
        organization_id: &str,
        transaction_id: &str,
    ) -> ReconcileResult<SuggestionResponse> {
        self.suggestion_engine
            .suggest_default(organization_id, transaction_id)
            .await
    }
}
