//! Keyword extraction shared by the impact analyzer.

use regex::Regex;
use std::collections::BTreeSet;
use std::sync::OnceLock;

/// Words too common in change descriptions to say anything about a component.
const STOP_WORDS: &[&str] = &[
    "about", "add", "after", "all", "also", "and", "any", "are", "been", "before", "being",
    "but", "can", "change", "changes", "for", "from", "has", "have", "into", "its", "may",
    "must", "new", "not", "now", "our", "should", "such", "that", "the", "their", "them",
    "then", "there", "these", "this", "those", "under", "update", "use", "used", "via", "was",
    "were", "when", "where", "which", "will", "with", "within", "would",
];

fn word_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[A-Za-z0-9]+").expect("valid regex"))
}

/// Split a camelCase / PascalCase run into its words: `OrderValidator` →
/// `Order`, `Validator`; `LEIValidator` → `LEI`, `Validator`.
fn split_camel(word: &str) -> Vec<&str> {
    let chars: Vec<(usize, char)> = word.char_indices().collect();
    let mut parts = Vec::new();
    let mut start = 0;
    for i in 1..chars.len() {
        let (idx, c) = chars[i];
        let prev = chars[i - 1].1;
        let next_lower = chars.get(i + 1).is_some_and(|(_, n)| n.is_lowercase());
        let boundary = (c.is_uppercase() && prev.is_lowercase())
            || (c.is_uppercase() && prev.is_uppercase() && next_lower)
            || (c.is_ascii_digit() != prev.is_ascii_digit());
        if boundary {
            parts.push(&word[start..idx]);
            start = idx;
        }
    }
    parts.push(&word[start..]);
    parts
}

fn normalize(word: &str) -> String {
    let lower = word.to_lowercase();
    if lower.len() > 3 && lower.ends_with('s') && !lower.ends_with("ss") {
        lower[..lower.len() - 1].to_string()
    } else {
        lower
    }
}

/// Extracts normalized keywords from free text and identifiers.
#[derive(Debug, Clone, Default)]
pub struct Tokenizer {
    extra_stop_words: BTreeSet<String>,
}

impl Tokenizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_stop_words<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            extra_stop_words: words.into_iter().map(|w| normalize(w.as_ref())).collect(),
        }
    }

    fn is_stop_word(&self, word: &str) -> bool {
        STOP_WORDS.contains(&word) || self.extra_stop_words.contains(word)
    }

    /// Keywords of `text` as a sorted set. Words under three characters,
    /// stop words and pure numbers are dropped.
    pub fn keywords(&self, text: &str) -> BTreeSet<String> {
        let mut out = BTreeSet::new();
        for m in word_re().find_iter(text) {
            for part in split_camel(m.as_str()) {
                let word = normalize(part);
                if word.len() < 3 || word.chars().all(|c| c.is_ascii_digit()) {
                    continue;
                }
                if self.is_stop_word(&word) {
                    continue;
                }
                out.insert(word);
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(set: BTreeSet<String>) -> Vec<String> {
        set.into_iter().collect()
    }

    #[test]
    fn splits_identifiers() {
        assert_eq!(split_camel("OrderValidator"), vec!["Order", "Validator"]);
        assert_eq!(split_camel("LEIValidator"), vec!["LEI", "Validator"]);
        assert_eq!(split_camel("mifid2Report"), vec!["mifid", "2", "Report"]);
        assert_eq!(split_camel("trade"), vec!["trade"]);
    }

    #[test]
    fn keywords_from_qualified_class_names() {
        let t = Tokenizer::new();
        assert_eq!(
            words(t.keywords("com.acme.oms.OrderValidator")),
            vec!["acme", "com", "oms", "order", "validator"]
        );
        assert_eq!(
            words(t.keywords("trade_reporting_service")),
            vec!["reporting", "service", "trade"]
        );
    }

    #[test]
    fn drops_stop_words_short_words_and_plurals() {
        let t = Tokenizer::new();
        assert_eq!(
            words(t.keywords("Add the new LEI checks to all Orders in 2025")),
            vec!["check", "lei", "order"]
        );
        assert_eq!(words(t.keywords("Address class")), vec!["address", "class"]);
    }

    #[test]
    fn extra_stop_words_apply_after_normalization() {
        let t = Tokenizer::with_stop_words(["Regulations", "trade"]);
        assert_eq!(
            words(t.keywords("Trade regulation reporting")),
            vec!["reporting"]
        );
    }
}
