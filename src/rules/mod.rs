//! Label normalization rule engine
//!
//! Applies an ordered set of externally-authored pattern rules to compute
//! a human-readable canonical label for a bank transaction. A rule with an
//! invalid pattern is a data-quality issue, not a caller-visible error: it
//! is logged and skipped so the import proceeds on the remaining rules.

use regex::{Regex, RegexBuilder};

use crate::types::NormalizationRule;

struct CompiledRule {
    regex: Regex,
    normalized_label: String,
}

/// Compiled, ordered rule set for one bank account
///
/// Rules are sorted once at construction (priority desc, creation time asc,
/// rule id asc) so repeated calls always evaluate in the same total order.
pub struct LabelNormalizer {
    rules: Vec<CompiledRule>,
}

impl LabelNormalizer {
    /// Compile the merged account-specific + global rules
    pub fn new(mut rules: Vec<NormalizationRule>) -> Self {
        rules.retain(|rule| rule.is_active);
        rules.sort_by(|a, b| {
            b.priority
                .cmp(&a.priority)
                .then_with(|| a.created_at.cmp(&b.created_at))
                .then_with(|| a.id.cmp(&b.id))
        });

        let compiled = rules
            .into_iter()
            .filter_map(|rule| {
                match RegexBuilder::new(&rule.pattern)
                    .case_insensitive(true)
                    .build()
                {
                    Ok(regex) => Some(CompiledRule {
                        regex,
                        normalized_label: rule.normalized_label,
                    }),
                    Err(err) => {
                        tracing::warn!(
                            "skipping normalization rule {} with invalid pattern: {}",
                            rule.id,
                            err
                        );
                        None
                    }
                }
            })
            .collect();

        Self { rules: compiled }
    }

    /// Number of usable rules after compilation
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Whether no usable rule survived compilation
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Compute the normalized label for a raw label and optional memo
    ///
    /// Each rule is tested against the raw label first, then the memo; the
    /// first rule/haystack combination that matches wins. With no match the
    /// raw label is returned unchanged.
    pub fn normalize(&self, raw_label: &str, memo: Option<&str>) -> String {
        for rule in &self.rules {
            if rule.regex.is_match(raw_label) {
                return rule.normalized_label.clone();
            }
            if let Some(memo) = memo {
                if rule.regex.is_match(memo) {
                    return rule.normalized_label.clone();
                }
            }
        }
        raw_label.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RuleScope;
    use chrono::NaiveDate;

    fn rule(id: &str, pattern: &str, label: &str, priority: i32, day: u32) -> NormalizationRule {
        NormalizationRule {
            id: id.to_string(),
            pattern: pattern.to_string(),
            normalized_label: label.to_string(),
            priority,
            created_at: NaiveDate::from_ymd_opt(2025, 1, day)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap(),
            scope: RuleScope::Global,
            is_active: true,
        }
    }

    #[test]
    fn test_higher_priority_rule_wins() {
        let normalizer = LabelNormalizer::new(vec![
            rule("r1", "COTIS", "Low priority", 1, 1),
            rule("r2", "COTIS", "High priority", 10, 2),
        ]);
        assert_eq!(
            normalizer.normalize("COTISATIONS MEMBRES", None),
            "High priority"
        );
    }

    #[test]
    fn test_equal_priority_earlier_creation_wins() {
        let normalizer = LabelNormalizer::new(vec![
            rule("r1", "COTIS", "Created later", 5, 20),
            rule("r2", "COTIS", "Created earlier", 5, 1),
        ]);
        assert_eq!(normalizer.normalize("COTISATIONS", None), "Created earlier");
    }

    #[test]
    fn test_patterns_match_case_insensitively() {
        let normalizer = LabelNormalizer::new(vec![rule("r1", "facture", "Invoice", 1, 1)]);
        assert_eq!(normalizer.normalize("FACTURE IMPRIMEUR", None), "Invoice");
    }

    #[test]
    fn test_label_tested_before_memo() {
        let normalizer = LabelNormalizer::new(vec![
            rule("r1", "LABELONLY", "From label", 5, 1),
            rule("r2", "MEMOONLY", "From memo", 1, 1),
        ]);
        assert_eq!(
            normalizer.normalize("LABELONLY", Some("MEMOONLY")),
            "From label"
        );
        assert_eq!(
            normalizer.normalize("something else", Some("MEMOONLY")),
            "From memo"
        );
    }

    #[test]
    fn test_no_match_returns_raw_label() {
        let normalizer = LabelNormalizer::new(vec![rule("r1", "XYZ", "Never", 1, 1)]);
        assert_eq!(normalizer.normalize("FRAIS BANCAIRES", None), "FRAIS BANCAIRES");
    }

    #[test]
    fn test_inactive_rule_is_never_applied() {
        let mut inactive = rule("r1", "FRAIS", "Fees", 10, 1);
        inactive.is_active = false;
        let normalizer = LabelNormalizer::new(vec![inactive]);
        assert!(normalizer.is_empty());
        assert_eq!(normalizer.normalize("FRAIS BANCAIRES", None), "FRAIS BANCAIRES");
    }

    #[test]
    fn test_invalid_pattern_is_skipped() {
        let normalizer = LabelNormalizer::new(vec![
            rule("r1", "FRAIS(", "Broken", 10, 1),
            rule("r2", "FRAIS", "Fees", 1, 1),
        ]);
        assert_eq!(normalizer.len(), 1);
        assert_eq!(normalizer.normalize("FRAIS BANCAIRES", None), "Fees");
    }

    #[test]
    fn test_repeated_calls_are_deterministic() {
        let normalizer = LabelNormalizer::new(vec![
            rule("r1", "MARS", "March", 5, 1),
            rule("r2", "FRAIS", "Fees", 5, 1),
        ]);
        let first = normalizer.normalize("FRAIS BANCAIRES MARS", None);
        for _ in 0..10 {
            assert_eq!(normalizer.normalize("FRAIS BANCAIRES MARS", None), first);
        }
    }
}
