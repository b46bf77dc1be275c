//! Request-boundary validation utilities

use crate::types::*;

/// Upper bound on suggestions per request
pub const MAX_SUGGESTIONS_LIMIT: usize = 20;

/// Validate that an organization identifier is usable
pub fn validate_organization_id(organization_id: &str) -> ReconcileResult<()> {
    if organization_id.trim().is_empty() {
        return Err(ReconcileError::Validation(
            "Organization ID cannot be empty".to_string(),
        ));
    }
    Ok(())
}

/// Validate that a bank account identifier is usable
pub fn validate_bank_account_id(bank_account_id: &str) -> ReconcileResult<()> {
    if bank_account_id.trim().is_empty() {
        return Err(ReconcileError::Validation(
            "Bank account ID cannot be empty".to_string(),
        ));
    }
    Ok(())
}

/// Validate that a bank transaction identifier is usable
pub fn validate_transaction_id(transaction_id: &str) -> ReconcileResult<()> {
    if transaction_id.trim().is_empty() {
        return Err(ReconcileError::Validation(
            "Transaction ID cannot be empty".to_string(),
        ));
    }
    Ok(())
}

/// Validate that a statement payload carries any content at all
pub fn validate_statement_text(statement_text: &str) -> ReconcileResult<()> {
    if statement_text.trim().is_empty() {
        return Err(ReconcileError::Validation(
            "Statement text cannot be empty".to_string(),
        ));
    }
    Ok(())
}

/// Validate the requested suggestion count (1 to 20)
pub fn validate_max_suggestions(max_suggestions: usize) -> ReconcileResult<()> {
    if max_suggestions == 0 || max_suggestions > MAX_SUGGESTIONS_LIMIT {
        return Err(ReconcileError::Validation(format!(
            "Max suggestions must be between 1 and {}, got {}",
            MAX_SUGGESTIONS_LIMIT, max_suggestions
        )));
    }
    Ok(())
}
