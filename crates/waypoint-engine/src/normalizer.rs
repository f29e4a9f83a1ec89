//! Intent canonicalization: synonym folding, tokenization and quoted-literal
//! extraction. Everything here is a pure function of the input text.

use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashSet;

/// Canonical term and the variants folded into it. Applied top to bottom, so a
/// later entry sees the output of earlier ones.
pub const SYNONYMS: &[(&str, &[&str])] = &[
    ("click", &["press", "tap", "select", "choose"]),
    ("open", &["navigate", "go to"]),
    ("create", &["new", "add", "+"]),
    ("delete", &["remove", "trash", "discard"]),
    ("settings", &["preferences", "options"]),
    ("name", &["title"]),
    ("project", &["projects"]),
];

pub const STOPWORDS: &[&str] = &[
    "the", "a", "an", "to", "on", "in", "of", "for", "with", "and", "or", "by", "is", "be",
    "button", "option", "menu", "item", "page", "view", "prompt", "dialog", "modal",
];

/// Folded terms that mean "activate something".
pub const ACTIVATION_TERMS: &[&str] = &["click", "open", "create", "delete", "submit"];

/// Folded terms that mean "type into something".
pub const FILL_TERMS: &[&str] = &["fill", "input", "type"];

/// Longest quoted literal recognised, in characters.
pub const MAX_LITERAL_CHARS: usize = 200;

lazy_static! {
    static ref QUOTED_RE: Regex = Regex::new(&format!(
        r#"'([^']{{1,{max}}})'|"([^"]{{1,{max}}})""#,
        max = MAX_LITERAL_CHARS
    ))
    .unwrap();
    static ref TOKEN_RE: Regex = Regex::new(r"[a-z0-9+]+").unwrap();
    static ref SYNONYM_RULES: Vec<(Regex, &'static str)> = SYNONYMS
        .iter()
        .flat_map(|(base, words)| {
            words.iter().map(move |w| {
                let re = Regex::new(&format!(r"\b{}\b", regex::escape(w))).unwrap();
                (re, *base)
            })
        })
        .collect();
    static ref STOPWORD_SET: HashSet<&'static str> = STOPWORDS.iter().copied().collect();
}

/// Lowercase and fold synonyms to their canonical term on word boundaries only.
pub fn normalize_intent(raw: &str) -> String {
    let mut s = raw.to_lowercase();
    for (re, base) in SYNONYM_RULES.iter() {
        if re.is_match(&s) {
            s = re.replace_all(&s, *base).into_owned();
        }
    }
    s
}

/// Alphanumeric-plus-`+` runs, lowercased, stopwords dropped. Order is kept.
pub fn tokenize(s: &str) -> Vec<String> {
    let lower = s.to_lowercase();
    TOKEN_RE
        .find_iter(&lower)
        .map(|m| m.as_str())
        .filter(|t| !STOPWORD_SET.contains(t))
        .map(str::to_string)
        .collect()
}

/// Quoted literals in order of appearance, trimmed. Blank literals are dropped.
pub fn extract_quoted(s: &str) -> Vec<String> {
    QUOTED_RE
        .captures_iter(s)
        .filter_map(|caps| caps.get(1).or_else(|| caps.get(2)))
        .map(|m| m.as_str().trim().to_string())
        .filter(|lit| !lit.is_empty())
        .collect()
}

/// An intent after canonicalization.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedIntent {
    pub raw: String,
    pub normalized: String,
    pub tokens: Vec<String>,
    pub literals: Vec<String>,
}

impl NormalizedIntent {
    pub fn new(raw: &str) -> Self {
        let normalized = normalize_intent(raw);
        let tokens = tokenize(&normalized);
        let literals = extract_quoted(raw);
        Self {
            raw: raw.to_string(),
            normalized,
            tokens,
            literals,
        }
    }

    /// The label to prefer when several targets are plausible.
    pub fn primary_literal(&self) -> Option<&str> {
        self.literals.first().map(String::as_str)
    }

    pub fn signals_activation(&self) -> bool {
        ACTIVATION_TERMS.iter().any(|t| self.normalized.contains(t))
    }

    pub fn signals_fill(&self) -> bool {
        FILL_TERMS.iter().any(|t| self.normalized.contains(t))
    }

    /// Fill intents that don't also ask to activate something may only target
    /// elements that accept text.
    pub fn requires_textbox(&self) -> bool {
        self.signals_fill() && !self.signals_activation()
    }
}
