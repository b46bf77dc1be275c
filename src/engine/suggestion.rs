//! Reconciliation suggestion engine
//!
//! Given one persisted, unmatched bank transaction, finds and ranks
//! candidate ledger entries in two tiers: exact (amount equality within a
//! short date window) and fuzzy (trigram text similarity with small
//! amount/date tolerances). Read-only; safe for unlimited concurrent
//! invocation.

use bigdecimal::BigDecimal;
use chrono::Duration;
use std::collections::HashSet;

use crate::engine::importer::canonical_amount;
use crate::traits::ReconciliationStorage;
use crate::types::*;
use crate::utils::validation;

/// Default number of suggestions per request
pub const DEFAULT_MAX_SUGGESTIONS: usize = 5;
/// Calendar window around the transaction date for candidate fetching
pub const CANDIDATE_WINDOW_DAYS: i64 = 30;
/// Upper bound on candidate entries fetched per request
pub const MAX_CANDIDATE_ENTRIES: usize = 100;

const EXACT_WINDOW_DAYS: i64 = 3;
const FUZZY_WINDOW_DAYS: i64 = 10;
const SIMILARITY_THRESHOLD: f64 = 0.70;

/// Suggestion engine over a storage backend
pub struct SuggestionEngine<S: ReconciliationStorage> {
    storage: S,
}

impl<S: ReconciliationStorage> SuggestionEngine<S> {
    /// Create a new suggestion engine over the given storage backend
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    /// Rank candidate ledger entries for an unmatched bank transaction,
    /// capped at `max_suggestions` (1 to 20)
    pub async fn suggest(
        &self,
        organization_id: &str,
        transaction_id: &str,
        max_suggestions: usize,
    ) -> ReconcileResult<SuggestionResponse> {
        validation::validate_organization_id(organization_id)?;
        validation::validate_transaction_id(transaction_id)?;
        validation::validate_max_suggestions(max_suggestions)?;

        let transaction = self
            .storage
            .get_bank_transaction(organization_id, transaction_id)
            .await?
            .ok_or_else(|| ReconcileError::TransactionNotFound(transaction_id.to_string()))?;

        let account = self
            .storage
            .get_bank_account(organization_id, &transaction.bank_account_id)
            .await?
            .ok_or_else(|| {
                ReconcileError::BankAccountNotFound(transaction.bank_account_id.clone())
            })?;

        let from = transaction.value_date - Duration::days(CANDIDATE_WINDOW_DAYS);
        let to = transaction.value_date + Duration::days(CANDIDATE_WINDOW_DAYS);
        let candidates = self
            .storage
            .candidate_entries(
                organization_id,
                &account.ledger_account_id,
                from,
                to,
                MAX_CANDIDATE_ENTRIES,
            )
            .await?;

        let suggestions = rank_candidates(
            &transaction,
            &account.ledger_account_id,
            &candidates,
            max_suggestions,
        );

        Ok(SuggestionResponse {
            transaction_id: transaction.id,
            suggestions,
        })
    }

    /// [`suggest`](Self::suggest) with the default maximum of 5
    pub async fn suggest_default(
        &self,
        organization_id: &str,
        transaction_id: &str,
    ) -> ReconcileResult<SuggestionResponse> {
        self.suggest(organization_id, transaction_id, DEFAULT_MAX_SUGGESTIONS)
            .await
    }
}

struct Candidate<'a> {
    entry: &'a LedgerEntry,
    net_amount: BigDecimal,
    date_distance: i64,
}

/// Two-tier ranking over an already-fetched candidate window
fn rank_candidates(
    transaction: &BankTransaction,
    ledger_account_id: &str,
    entries: &[LedgerEntry],
    max_suggestions: usize,
) -> Vec<ReconciliationSuggestion> {
    let candidates: Vec<Candidate<'_>> = entries
        .iter()
        .map(|entry| Candidate {
            entry,
            net_amount: entry.net_amount(ledger_account_id),
            date_distance: (entry.date - transaction.value_date).num_days().abs(),
        })
        .collect();

    // Exact tier: amount equality within the short window.
    let mut exact: Vec<&Candidate<'_>> = candidates
        .iter()
        .filter(|c| c.net_amount == transaction.amount && c.date_distance <= EXACT_WINDOW_DAYS)
        .collect();
    exact.sort_by(|a, b| {
        a.date_distance
            .cmp(&b.date_distance)
            .then_with(|| a.entry.id.cmp(&b.entry.id))
    });
    exact.truncate(max_suggestions);

    let mut suggestions: Vec<ReconciliationSuggestion> = exact
        .iter()
        .map(|&c| suggestion(c, MatchType::Exact, None))
        .collect();

    // Fuzzy tier: only when the exact tier left quota unfilled, and only
    // when the transaction label leaves something to compare.
    if suggestions.len() < max_suggestions {
        let needle = comparison_form(&transaction.normalized_label);
        if !needle.is_empty() {
            let exact_ids: HashSet<&str> =
                exact.iter().map(|c| c.entry.id.as_str()).collect();
            let tolerance = BigDecimal::from(1) / BigDecimal::from(100);

            let mut fuzzy: Vec<(i64, &Candidate<'_>)> = candidates
                .iter()
                .filter(|c| !exact_ids.contains(c.entry.id.as_str()))
                .filter(|c| c.date_distance <= FUZZY_WINDOW_DAYS)
                .filter(|c| (&c.net_amount - &transaction.amount).abs() <= tolerance)
                .filter_map(|c| {
                    let haystack = comparison_form(c.entry.reference.as_deref().unwrap_or(""));
                    if haystack.is_empty() {
                        return None;
                    }
                    let similarity = trigram_similarity(&needle, &haystack);
                    if similarity >= SIMILARITY_THRESHOLD {
                        Some((similarity_basis_points(similarity), c))
                    } else {
                        None
                    }
                })
                .collect();

            fuzzy.sort_by(|(sim_a, a), (sim_b, b)| {
                sim_b
                    .cmp(sim_a)
                    .then_with(|| a.date_distance.cmp(&b.date_distance))
                    .then_with(|| a.entry.id.cmp(&b.entry.id))
            });

            for (sim, candidate) in fuzzy {
                if suggestions.len() >= max_suggestions {
                    break;
                }
                suggestions.push(suggestion(
                    candidate,
                    MatchType::Fuzzy,
                    Some(sim as f64 / 10_000.0),
                ));
            }
        }
    }

    suggestions
}

fn suggestion(
    candidate: &Candidate<'_>,
    match_type: MatchType,
    similarity: Option<f64>,
) -> ReconciliationSuggestion {
    ReconciliationSuggestion {
        entry_id: candidate.entry.id.clone(),
        entry_date: candidate.entry.date,
        amount: canonical_amount(&candidate.net_amount),
        reference: candidate.entry.reference.clone(),
        match_type,
        similarity,
    }
}

/// Similarity scaled to basis points; the integer ranking key and the
/// 4-decimal reported score agree by construction
fn similarity_basis_points(similarity: f64) -> i64 {
    (similarity * 10_000.0).round() as i64
}

/// Normalized comparison form of a label: diacritics folded to ASCII,
/// non-alphanumerics collapsed to single spaces, upper-cased
pub fn comparison_form(raw: &str) -> String {
    let mut folded = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match fold_diacritic(ch) {
            Some(base) => folded.push_str(base),
            None if ch.is_alphanumeric() => folded.push(ch),
            None => folded.push(' '),
        }
    }
    folded
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_uppercase()
}

/// Fold common Latin diacritics to their ASCII base letters
fn fold_diacritic(ch: char) -> Option<&'static str> {
    Some(match ch {
        'à' | 'á' | 'â' | 'ã' | 'ä' | 'å' | 'À' | 'Á' | 'Â' | 'Ã' | 'Ä' | 'Å' => "a",
        'è' | 'é' | 'ê' | 'ë' | 'È' | 'É' | 'Ê' | 'Ë' => "e",
        'ì' | 'í' | 'î' | 'ï' | 'Ì' | 'Í' | 'Î' | 'Ï' => "i",
        'ò' | 'ó' | 'ô' | 'õ' | 'ö' | 'Ò' | 'Ó' | 'Ô' | 'Õ' | 'Ö' => "o",
        'ù' | 'ú' | 'û' | 'ü' | 'Ù' | 'Ú' | 'Û' | 'Ü' => "u",
        'ý' | 'ÿ' | 'Ý' => "y",
        'ç' | 'Ç' => "c",
        'ñ' | 'Ñ' => "n",
        'œ' | 'Œ' => "oe",
        'æ' | 'Æ' => "ae",
        'ß' => "ss",
        _ => return None,
    })
}

/// Trigram similarity: Dice coefficient over the 3-character shingle sets
/// of both strings, each padded with two leading spaces and one trailing
pub fn trigram_similarity(a: &str, b: &str) -> f64 {
    let shingles_a = shingles(a);
    let shingles_b = shingles(b);
    if shingles_a.is_empty() || shingles_b.is_empty() {
        return 0.0;
    }
    let shared = shingles_a.intersection(&shingles_b).count();
    (2.0 * shared as f64) / (shingles_a.len() + shingles_b.len()) as f64
}

fn shingles(text: &str) -> HashSet<String> {
    if text.is_empty() {
        return HashSet::new();
    }
    let padded: Vec<char> = "  "
        .chars()
        .chain(text.chars())
        .chain(" ".chars())
        .collect();
    padded
        .windows(3)
        .map(|window| window.iter().collect())
        .collect()
}
