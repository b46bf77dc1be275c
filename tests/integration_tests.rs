//! Integration tests for reconciliation-core

use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use std::str::FromStr;

use reconciliation_core::{
    utils::MemoryStorage, BankAccount, EntryLine, LedgerEntry, MatchType, NormalizationRule,
    ReconcileError, ReconciliationEngine, RuleScope,
};

const ORG: &str = "org-1";
const BANK_ACCOUNT: &str = "ba-1";
const LEDGER_ACCOUNT: &str = "512";

const STATEMENT: &str = "OFXHEADER:100\n\
DATA:OFXSGML\n\
\n\
<OFX>\n\
<BANKMSGSRSV1><STMTTRNRS><STMTRS>\n\
<CURDEF>EUR\n\
<BANKTRANLIST>\n\
<STMTTRN>\n\
<TRNTYPE>CREDIT\n\
<DTPOSTED>20250305\n\
<TRNAMT>250.00\n\
<FITID>A1\n\
<NAME>COTISATIONS MEMBRES MARS\n\
</STMTTRN>\n\
<STMTTRN>\n\
<TRNTYPE>DEBIT\n\
<DTPOSTED>20250308\n\
<TRNAMT>-145.50\n\
<FITID>A2\n\
<NAME>FACTURE IMPRIMEUR AVRIL\n\
</STMTTRN>\n\
<STMTTRN>\n\
<TRNTYPE>DEBIT\n\
<DTPOSTED>20250316\n\
<TRNAMT>-32.80\n\
<FITID>A3\n\
<NAME>FRAIS BANCAIRES MARS\n\
</STMTTRN>\n\
</BANKTRANLIST>\n\
</STMTRS></STMTTRNRS></BANKMSGSRSV1>\n\
</OFX>\n";

fn storage_with_account() -> MemoryStorage {
    let storage = MemoryStorage::new();
    storage.add_bank_account(BankAccount {
        id: BANK_ACCOUNT.to_string(),
        organization_id: ORG.to_string(),
        name: "Compte courant".to_string(),
        ledger_account_id: LEDGER_ACCOUNT.to_string(),
    });
    storage
}

fn entry(id: &str, date: NaiveDate, net_amount: &str, reference: Option<&str>) -> LedgerEntry {
    let amount = BigDecimal::from_str(net_amount).unwrap();
    let bank_line = if amount >= BigDecimal::from(0) {
        EntryLine::debit(LEDGER_ACCOUNT.to_string(), amount.clone())
    } else {
        EntryLine::credit(LEDGER_ACCOUNT.to_string(), -amount.clone())
    };
    let balancing_line = if amount >= BigDecimal::from(0) {
        EntryLine::credit("706".to_string(), amount)
    } else {
        EntryLine::debit("606".to_string(), -amount)
    };
    LedgerEntry {
        id: id.to_string(),
        date,
        reference: reference.map(str::to_string),
        lines: vec![bank_line, balancing_line],
    }
}

#[tokio::test]
async fn test_idempotent_reimport() {
    let storage = storage_with_account();
    let mut engine = ReconciliationEngine::new(storage);

    let first = engine
        .import_statement(ORG, BANK_ACCOUNT, STATEMENT)
        .await
        .unwrap();
    assert_eq!(first.imported, 3);
    assert_eq!(first.duplicates, 0);
    assert_eq!(first.transactions.len(), 3);

    // File order survives preparation and persistence.
    let external_ids: Vec<&str> = first
        .transactions
        .iter()
        .map(|txn| txn.external_id.as_str())
        .collect();
    assert_eq!(external_ids, vec!["A1", "A2", "A3"]);
    assert_eq!(first.transactions[0].amount.to_string(), "250.00");
    assert_eq!(first.transactions[1].amount.to_string(), "-145.50");
    assert_eq!(
        first.transactions[2].value_date,
        NaiveDate::from_ymd_opt(2025, 3, 16).unwrap()
    );

    let second = engine
        .import_statement(ORG, BANK_ACCOUNT, STATEMENT)
        .await
        .unwrap();
    assert_eq!(second.imported, 0);
    assert_eq!(second.duplicates, 3);
    assert!(second.transactions.is_empty());
}

#[tokio::test]
async fn test_import_applies_normalization_rules() {
    let storage = storage_with_account();
    let created_at = NaiveDate::from_ymd_opt(2025, 1, 1)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap();

    storage.add_rule(
        ORG,
        NormalizationRule {
            id: "r-global".to_string(),
            pattern: "COTIS".to_string(),
            normalized_label: "Cotisations adherents".to_string(),
            priority: 1,
            created_at,
            scope: RuleScope::Global,
            is_active: true,
        },
    );
    storage.add_rule(
        ORG,
        NormalizationRule {
            id: "r-account".to_string(),
            pattern: "FACTURE".to_string(),
            normalized_label: "Fournisseur imprimerie".to_string(),
            priority: 10,
            created_at,
            scope: RuleScope::Account(BANK_ACCOUNT.to_string()),
            is_active: true,
        },
    );

    let mut engine = ReconciliationEngine::new(storage);
    let summary = engine
        .import_statement(ORG, BANK_ACCOUNT, STATEMENT)
        .await
        .unwrap();

    let labels: Vec<&str> = summary
        .transactions
        .iter()
        .map(|txn| txn.normalized_label.as_str())
        .collect();
    assert_eq!(
        labels,
        vec![
            "Cotisations adherents",
            "Fournisseur imprimerie",
            // No rule matched: the raw label flows through unchanged.
            "FRAIS BANCAIRES MARS",
        ]
    );
    assert_eq!(summary.transactions[2].raw_label, "FRAIS BANCAIRES MARS");
}

#[tokio::test]
async fn test_import_rejects_unknown_bank_account() {
    let mut engine = ReconciliationEngine::new(MemoryStorage::new());
    let result = engine.import_statement(ORG, "missing", STATEMENT).await;
    assert!(matches!(
        result,
        Err(ReconcileError::BankAccountNotFound(_))
    ));
}

#[tokio::test]
async fn test_import_rejects_blank_request_fields() {
    let mut engine = ReconciliationEngine::new(storage_with_account());
    assert!(matches!(
        engine.import_statement(" ", BANK_ACCOUNT, STATEMENT).await,
        Err(ReconcileError::Validation(_))
    ));
    assert!(matches!(
        engine.import_statement(ORG, BANK_ACCOUNT, "  ").await,
        Err(ReconcileError::Validation(_))
    ));
}

#[tokio::test]
async fn test_import_fails_without_root_marker() {
    let mut engine = ReconciliationEngine::new(storage_with_account());
    let result = engine
        .import_statement(ORG, BANK_ACCOUNT, "OFXHEADER:100\njust a text file")
        .await;
    assert!(matches!(
        result,
        Err(ReconcileError::MalformedStatement(_))
    ));
}

#[tokio::test]
async fn test_malformed_records_are_skipped_not_fatal() {
    let statement = "<OFX><BANKTRANLIST>\
        <STMTTRN><FITID>B1<DTPOSTED>20250305<TRNAMT>10.00<NAME>OK ONE</STMTTRN>\
        <STMTTRN><FITID>B2<DTPOSTED>not-a-date<TRNAMT>10.00<NAME>BAD DATE</STMTTRN>\
        <STMTTRN><DTPOSTED>20250306<TRNAMT>11.00<NAME>NO ID</STMTTRN>\
        <STMTTRN><FITID>B3<DTPOSTED>20250307<TRNAMT>12.00<NAME>OK TWO</STMTTRN>\
        </BANKTRANLIST></OFX>";

    let mut engine = ReconciliationEngine::new(storage_with_account());
    let summary = engine
        .import_statement(ORG, BANK_ACCOUNT, statement)
        .await
        .unwrap();
    assert_eq!(summary.imported, 2);
    assert_eq!(summary.duplicates, 0);
}

#[tokio::test]
async fn test_exact_suggestion_for_imported_transaction() {
    let storage = storage_with_account();
    storage.add_ledger_entry(
        ORG,
        entry(
            "entry-exact",
            NaiveDate::from_ymd_opt(2025, 3, 6).unwrap(),
            "250.00",
            Some("Cotisations mars"),
        ),
    );
    storage.add_ledger_entry(
        ORG,
        // Same amount, 4 days out: outside the exact window.
        entry(
            "entry-late",
            NaiveDate::from_ymd_opt(2025, 3, 9).unwrap(),
            "250.00",
            None,
        ),
    );

    let mut engine = ReconciliationEngine::new(storage);
    let summary = engine
        .import_statement(ORG, BANK_ACCOUNT, STATEMENT)
        .await
        .unwrap();
    let a1 = &summary.transactions[0];

    let response = engine.suggest_default(ORG, &a1.id).await.unwrap();
    assert_eq!(response.transaction_id, a1.id);
    assert_eq!(response.suggestions.len(), 1);

    let suggestion = &response.suggestions[0];
    assert_eq!(suggestion.entry_id, "entry-exact");
    assert_eq!(suggestion.match_type, MatchType::Exact);
    assert_eq!(suggestion.amount.to_string(), "250.00");
    assert_eq!(suggestion.similarity, None);
}

#[tokio::test]
async fn test_fuzzy_suggestion_at_amount_tolerance_boundary() {
    let storage = storage_with_account();
    // Net -145.51 against transaction amount -145.50: difference exactly
    // 0.01, included at the boundary.
    storage.add_ledger_entry(
        ORG,
        entry(
            "entry-fuzzy",
            NaiveDate::from_ymd_opt(2025, 3, 15).unwrap(),
            "-145.51",
            Some("Facture imprimeur"),
        ),
    );

    let mut engine = ReconciliationEngine::new(storage);
    let summary = engine
        .import_statement(ORG, BANK_ACCOUNT, STATEMENT)
        .await
        .unwrap();
    let a2 = &summary.transactions[1];
    assert_eq!(a2.external_id, "A2");

    let response = engine.suggest(ORG, &a2.id, 5).await.unwrap();
    assert_eq!(response.suggestions.len(), 1);

    let suggestion = &response.suggestions[0];
    assert_eq!(suggestion.entry_id, "entry-fuzzy");
    assert_eq!(suggestion.match_type, MatchType::Fuzzy);
    assert_eq!(suggestion.amount.to_string(), "-145.51");
    assert_eq!(suggestion.similarity, Some(0.8571));
}

#[tokio::test]
async fn test_already_matched_entries_are_never_suggested() {
    let storage = storage_with_account();
    storage.add_ledger_entry(
        ORG,
        entry(
            "entry-taken",
            NaiveDate::from_ymd_opt(2025, 3, 6).unwrap(),
            "250.00",
            None,
        ),
    );
    storage.mark_entry_matched("entry-taken");

    let mut engine = ReconciliationEngine::new(storage);
    let summary = engine
        .import_statement(ORG, BANK_ACCOUNT, STATEMENT)
        .await
        .unwrap();
    let a1 = &summary.transactions[0];

    let response = engine.suggest_default(ORG, &a1.id).await.unwrap();
    assert!(response.suggestions.is_empty());
}

#[tokio::test]
async fn test_suggestion_request_validation() {
    let storage = storage_with_account();
    let mut engine = ReconciliationEngine::new(storage);
    let summary = engine
        .import_statement(ORG, BANK_ACCOUNT, STATEMENT)
        .await
        .unwrap();
    let a1 = &summary.transactions[0];

    assert!(matches!(
        engine.suggest(ORG, &a1.id, 0).await,
        Err(ReconcileError::Validation(_))
    ));
    assert!(matches!(
        engine.suggest(ORG, &a1.id, 21).await,
        Err(ReconcileError::Validation(_))
    ));
    assert!(matches!(
        engine.suggest(ORG, "missing-txn", 5).await,
        Err(ReconcileError::TransactionNotFound(_))
    ));
}

#[tokio::test]
async fn test_suggestions_are_capped_and_exact_first() {
    let storage = storage_with_account();
    for day in [4, 5, 6] {
        storage.add_ledger_entry(
            ORG,
            entry(
                &format!("entry-exact-{day}"),
                NaiveDate::from_ymd_opt(2025, 3, day).unwrap(),
                "250.00",
                None,
            ),
        );
    }
    storage.add_ledger_entry(
        ORG,
        entry(
            "entry-fuzzy",
            NaiveDate::from_ymd_opt(2025, 3, 10).unwrap(),
            "250.01",
            Some("Cotisations membres mars"),
        ),
    );

    let mut engine = ReconciliationEngine::new(storage);
    let summary = engine
        .import_statement(ORG, BANK_ACCOUNT, STATEMENT)
        .await
        .unwrap();
    let a1 = &summary.transactions[0];

    // Quota of 2 is filled by the exact tier alone; the fuzzy candidate
    // never gets a slot.
    let capped = engine.suggest(ORG, &a1.id, 2).await.unwrap();
    assert_eq!(capped.suggestions.len(), 2);
    assert!(capped
        .suggestions
        .iter()
        .all(|s| s.match_type == MatchType::Exact));
    // Distance 0 ranks first.
    assert_eq!(capped.suggestions[0].entry_id, "entry-exact-5");

    let full = engine.suggest(ORG, &a1.id, 10).await.unwrap();
    assert_eq!(full.suggestions.len(), 4);
    assert_eq!(full.suggestions[3].entry_id, "entry-fuzzy");
    assert_eq!(full.suggestions[3].match_type, MatchType::Fuzzy);
}
