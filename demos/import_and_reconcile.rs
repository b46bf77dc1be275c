//! End-to-end statement import and reconciliation example

use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use std::str::FromStr;

use reconciliation_core::utils::MemoryStorage;
use reconciliation_core::{
    BankAccount, EntryLine, LedgerEntry, MatchType, NormalizationRule, ReconciliationEngine,
    RuleScope,
};

const STATEMENT: &str = "OFXHEADER:100\n\
DATA:OFXSGML\n\
\n\
<OFX>\n\
<BANKTRANLIST>\n\
<STMTTRN><TRNTYPE>CREDIT<DTPOSTED>20250305<TRNAMT>250.00<FITID>A1\
<NAME>COTISATIONS MEMBRES MARS</STMTTRN>\n\
<STMTTRN><TRNTYPE>DEBIT<DTPOSTED>20250308<TRNAMT>-145.50<FITID>A2\
<NAME>FACTURE IMPRIMEUR AVRIL</STMTTRN>\n\
<STMTTRN><TRNTYPE>DEBIT<DTPOSTED>20250316<TRNAMT>-32.80<FITID>A3\
<NAME>FRAIS BANCAIRES MARS</STMTTRN>\n\
</BANKTRANLIST>\n\
</OFX>\n";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("🏦 Reconciliation Core - Import & Reconcile Example\n");

    // Set up the in-memory backend with an account, a rule and some
    // ledger entries to match against.
    let storage = MemoryStorage::new();
    storage.add_bank_account(BankAccount {
        id: "ba-1".to_string(),
        organization_id: "org-1".to_string(),
        name: "Compte courant".to_string(),
        ledger_account_id: "512".to_string(),
    });
    storage.add_rule(
        "org-1",
        NormalizationRule {
            id: "r-1".to_string(),
            pattern: "COTIS".to_string(),
            normalized_label: "Cotisations adherents".to_string(),
            priority: 10,
            created_at: NaiveDate::from_ymd_opt(2025, 1, 1)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap(),
            scope: RuleScope::Global,
            is_active: true,
        },
    );
    storage.add_ledger_entry(
        "org-1",
        LedgerEntry {
            id: "entry-1".to_string(),
            date: NaiveDate::from_ymd_opt(2025, 3, 6).unwrap(),
            reference: Some("Cotisations mars".to_string()),
            lines: vec![
                EntryLine::debit("512".to_string(), BigDecimal::from_str("250.00")?),
                EntryLine::credit("756".to_string(), BigDecimal::from_str("250.00")?),
            ],
        },
    );
    storage.add_ledger_entry(
        "org-1",
        LedgerEntry {
            id: "entry-2".to_string(),
            date: NaiveDate::from_ymd_opt(2025, 3, 12).unwrap(),
            reference: Some("Facture imprimeur".to_string()),
            lines: vec![
                EntryLine::credit("512".to_string(), BigDecimal::from_str("145.51")?),
                EntryLine::debit("606".to_string(), BigDecimal::from_str("145.51")?),
            ],
        },
    );

    let mut engine = ReconciliationEngine::new(storage);

    // 1. Import the statement
    println!("📥 Importing statement...");
    let summary = engine.import_statement("org-1", "ba-1", STATEMENT).await?;
    println!(
        "  ✓ Imported {} transactions, {} duplicates",
        summary.imported, summary.duplicates
    );
    for txn in &summary.transactions {
        println!(
            "    {} {} {:>10}  {}",
            txn.external_id, txn.value_date, txn.amount, txn.normalized_label
        );
    }
    println!();

    // 2. Re-import the same file: everything is a duplicate
    println!("📥 Re-importing the same file...");
    let again = engine.import_statement("org-1", "ba-1", STATEMENT).await?;
    println!(
        "  ✓ Imported {} transactions, {} duplicates\n",
        again.imported, again.duplicates
    );

    // 3. Ask for match suggestions
    for txn in &summary.transactions {
        println!(
            "🔎 Suggestions for {} ({} {}):",
            txn.external_id, txn.normalized_label, txn.amount
        );
        let response = engine.suggest_default("org-1", &txn.id).await?;
        if response.suggestions.is_empty() {
            println!("  (none)");
        }
        for suggestion in &response.suggestions {
            match suggestion.match_type {
                MatchType::Exact => println!(
                    "  ✓ EXACT  entry {} dated {} for {}",
                    suggestion.entry_id, suggestion.entry_date, suggestion.amount
                ),
                MatchType::Fuzzy => println!(
                    "  ~ FUZZY  entry {} dated {} for {} (similarity {:.4})",
                    suggestion.entry_id,
                    suggestion.entry_date,
                    suggestion.amount,
                    suggestion.similarity.unwrap_or_default()
                ),
            }
        }
        println!();
    }

    Ok(())
}
