// src/relevance.rs
//! HR relevance gate: positive keywords must hit, noise keywords veto.

use crate::config::KeywordSets;

/// Result of a relevance check, with the terms that decided it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Relevance {
    pub relevant: bool,
    pub matched: Vec<String>,
    pub blocked_by: Vec<String>,
}

/// Case-insensitive substring classifier. No scoring, no stemming.
#[derive(Debug, Clone)]
pub struct KeywordClassifier {
    // (as configured, lowercased) pairs
    positive: Vec<(String, String)>,
    negative: Vec<(String, String)>,
}

impl KeywordClassifier {
    pub fn new(positive: &[String], negative: &[String]) -> Self {
        Self {
            positive: lowered(positive),
            negative: lowered(negative),
        }
    }

    pub fn from_keywords(k: &KeywordSets) -> Self {
        Self::new(&k.positive, &k.negative)
    }

    /// True iff at least one positive term and no negative term occurs in `text`.
    pub fn is_relevant(&self, text: &str) -> bool {
        self.evaluate(text).relevant
    }

    /// The relevance decision plus every positive and negative term that occurred.
    pub fn evaluate(&self, text: &str) -> Relevance {
        let t = text.to_lowercase();
        let hits = |list: &[(String, String)]| -> Vec<String> {
            list.iter()
                .filter(|(_, k)| t.contains(k.as_str()))
                .map(|(orig, _)| orig.clone())
                .collect()
        };
        let matched = hits(&self.positive);
        let blocked_by = hits(&self.negative);
        Relevance {
            relevant: !matched.is_empty() && blocked_by.is_empty(),
            matched,
            blocked_by,
        }
    }
}

fn lowered(list: &[String]) -> Vec<(String, String)> {
    list.iter()
        .filter(|k| !k.trim().is_empty())
        .map(|k| (k.clone(), k.to_lowercase()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clf() -> KeywordClassifier {
        KeywordClassifier::from_keywords(&KeywordSets::default())
    }

    #[test]
    fn positive_hit_passes() {
        assert!(clf().is_relevant("Acme Corp appoints new CEO"));
        assert!(clf().is_relevant("DIC、新社長に山田氏が就任"));
    }

    #[test]
    fn match_is_case_insensitive() {
        assert!(clf().is_relevant("acme names new ceo"));
        assert!(clf().is_relevant("EXECUTIVE SHUFFLE AT ACME"));
    }

    #[test]
    fn no_positive_means_false_even_with_noise() {
        assert!(!clf().is_relevant("Acme launches new product"));
        assert!(!clf().is_relevant("Acme 決算 発表"));
    }

    #[test]
    fn single_noise_term_vetoes_many_positives() {
        let text = "Acme CEO and CFO appointed; board promotion announced amid hiring push";
        let r = clf().evaluate(text);
        assert!(!r.relevant);
        assert!(r.matched.len() >= 4);
        assert_eq!(r.blocked_by, vec!["hiring".to_string()]);
        assert!(!clf().is_relevant(text));
    }

    #[test]
    fn blank_keywords_are_ignored() {
        let c = KeywordClassifier::new(&["".into(), "CEO".into()], &[" ".into()]);
        assert!(c.is_relevant("new CEO"));
        assert!(!c.is_relevant("nothing here"));
    }
}
