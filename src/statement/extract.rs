//! Transaction extraction from the parsed statement tree
//!
//! Walks the generic tag tree for transaction-record nodes and coerces
//! their leaf values into [`ParsedTransaction`]s. Partial or malformed
//! records are common in the wild, so a record missing its identifier,
//! date or amount is skipped silently rather than failing the import.

use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use std::str::FromStr;

use crate::statement::parser::StatementNode;
use crate::types::{ParsedTransaction, PLACEHOLDER_LABEL};

/// Tag marking one transaction record
pub const TRANSACTION_TAG: &str = "STMTTRN";

const ID_TAG: &str = "FITID";
const DATE_TAG: &str = "DTPOSTED";
const AMOUNT_TAG: &str = "TRNAMT";
const NAME_TAG: &str = "NAME";
const PAYEE_TAG: &str = "PAYEE";
const MEMO_TAG: &str = "MEMO";

/// Collect every transaction record in the tree, depth-first
///
/// Record order follows file order of first appearance; nesting depth of
/// the record nodes is irrelevant.
pub fn extract_transactions(root: &StatementNode) -> Vec<ParsedTransaction> {
    let mut records = Vec::new();
    collect(root, &mut records);
    records
}

fn collect(node: &StatementNode, records: &mut Vec<ParsedTransaction>) {
    if node.tag == TRANSACTION_TAG {
        match read_record(node) {
            Some(record) => records.push(record),
            None => {
                tracing::debug!("skipping statement record with missing or invalid fields");
            }
        }
    }
    for child in &node.children {
        collect(child, records);
    }
}

/// Read one record node; `None` means the record is skipped
fn read_record(node: &StatementNode) -> Option<ParsedTransaction> {
    let external_id = node.child_text(ID_TAG)?.to_string();
    let posted_at = parse_statement_date(node.child_text(DATE_TAG)?)?;
    let amount = parse_amount(node.child_text(AMOUNT_TAG)?)?;

    let memo = node.child_text(MEMO_TAG).map(str::to_string);
    let display_name = node
        .child_text(NAME_TAG)
        .or_else(|| node.child_text(PAYEE_TAG))
        .map(str::to_string)
        .or_else(|| memo.clone())
        .unwrap_or_else(|| PLACEHOLDER_LABEL.to_string());

    Some(ParsedTransaction {
        external_id,
        posted_at,
        amount,
        display_name,
        memo,
    })
}

/// Parse a compact numeric statement timestamp: `YYYYMMDD` optionally
/// followed by `HHMMSS`, possibly with trailing vendor noise
///
/// All time components default to zero; out-of-range components fail the
/// record. Only the calendar date survives.
pub fn parse_statement_date(raw: &str) -> Option<NaiveDate> {
    let digits: String = raw
        .trim()
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    if digits.len() < 8 {
        return None;
    }

    let year: i32 = digits[0..4].parse().ok()?;
    let month: u32 = digits[4..6].parse().ok()?;
    let day: u32 = digits[6..8].parse().ok()?;

    let (hour, minute, second): (u32, u32, u32) = if digits.len() >= 14 {
        (
            digits[8..10].parse().ok()?,
            digits[10..12].parse().ok()?,
            digits[12..14].parse().ok()?,
        )
    } else {
        (0, 0, 0)
    };
    if hour > 23 || minute > 59 || second > 59 {
        return None;
    }

    NaiveDate::from_ymd_opt(year, month, day)
}

/// Parse an optionally-signed decimal amount; `None` fails the record
pub fn parse_amount(raw: &str) -> Option<BigDecimal> {
    BigDecimal::from_str(raw.trim()).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::statement::parser;

    fn extract(doc: &str) -> Vec<ParsedTransaction> {
        extract_transactions(&parser::parse(doc).unwrap())
    }

    #[test]
    fn test_extracts_complete_records() {
        let records = extract(
            "<OFX><BANKTRANLIST>\
             <STMTTRN><FITID>A1<DTPOSTED>20250305<TRNAMT>250.00\
             <NAME>COTISATIONS MEMBRES MARS</STMTTRN>\
             <STMTTRN><FITID>A2<DTPOSTED>20250308120000<TRNAMT>-145.50\
             <NAME>FACTURE IMPRIMEUR AVRIL<MEMO>cheque 42</STMTTRN>\
             </BANKTRANLIST></OFX>",
        );

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].external_id, "A1");
        assert_eq!(
            records[0].posted_at,
            NaiveDate::from_ymd_opt(2025, 3, 5).unwrap()
        );
        assert_eq!(records[0].amount.to_string(), "250.00");
        assert_eq!(records[0].display_name, "COTISATIONS MEMBRES MARS");
        assert_eq!(records[0].memo, None);
        assert_eq!(records[1].amount.to_string(), "-145.50");
        assert_eq!(records[1].memo.as_deref(), Some("cheque 42"));
    }

    #[test]
    fn test_record_without_amount_is_skipped() {
        let records = extract(
            "<OFX><STMTTRN><FITID>A1<DTPOSTED>20250305</STMTTRN>\
             <STMTTRN><FITID>A2<DTPOSTED>20250306<TRNAMT>10.00</STMTTRN></OFX>",
        );
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].external_id, "A2");
    }

    #[test]
    fn test_record_with_bad_date_is_skipped() {
        let records = extract(
            "<OFX><STMTTRN><FITID>A1<DTPOSTED>20251305<TRNAMT>10.00</STMTTRN></OFX>",
        );
        assert!(records.is_empty());
    }

    #[test]
    fn test_record_with_out_of_range_time_is_skipped() {
        let records = extract(
            "<OFX><STMTTRN><FITID>A1<DTPOSTED>20250305990000<TRNAMT>10.00</STMTTRN></OFX>",
        );
        assert!(records.is_empty());
    }

    #[test]
    fn test_record_with_bad_amount_is_skipped() {
        let records = extract(
            "<OFX><STMTTRN><FITID>A1<DTPOSTED>20250305<TRNAMT>12,50</STMTTRN></OFX>",
        );
        assert!(records.is_empty());
    }

    #[test]
    fn test_name_falls_back_to_payee_then_memo_then_placeholder() {
        let records = extract(
            "<OFX>\
             <STMTTRN><FITID>A1<DTPOSTED>20250305<TRNAMT>1.00<PAYEE>ACME</STMTTRN>\
             <STMTTRN><FITID>A2<DTPOSTED>20250305<TRNAMT>1.00<MEMO>note</STMTTRN>\
             <STMTTRN><FITID>A3<DTPOSTED>20250305<TRNAMT>1.00</STMTTRN>\
             </OFX>",
        );
        assert_eq!(records[0].display_name, "ACME");
        assert_eq!(records[1].display_name, "note");
        assert_eq!(records[2].display_name, PLACEHOLDER_LABEL);
    }

    #[test]
    fn test_date_with_timezone_suffix() {
        assert_eq!(
            parse_statement_date("20250305120000[-5:EST]"),
            NaiveDate::from_ymd_opt(2025, 3, 5)
        );
    }

    #[test]
    fn test_short_date_is_rejected() {
        assert_eq!(parse_statement_date("2025030"), None);
    }
}
