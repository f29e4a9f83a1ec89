use super::dialog::DialogBounds;
use crate::normalizer::{NormalizedIntent, tokenize};
use serde::Serialize;
use std::collections::HashSet;
use waypoint_common::protocol::ElementRecord;

pub const FUZZY_WEIGHT: f64 = 0.55;
pub const OVERLAP_WEIGHT: f64 = 0.35;

pub const ROLE_BONUS: f64 = 0.06;
pub const TAG_BONUS: f64 = 0.03;
pub const FILL_BONUS: f64 = 0.10;

pub const DIALOG_INSIDE_BONUS: f64 = 0.12;
pub const DIALOG_OUTSIDE_PENALTY: f64 = 0.05;

/// Larger than every other term combined.
pub const LITERAL_BONUS: f64 = 1.50;

pub const LONG_BLOB_PENALTY: f64 = 0.05;
pub const LONG_TEXT_CHARS: usize = 120;
pub const LONG_JOINED_CHARS: usize = 160;

/// Score given to elements that may never be selected. Below any real score.
pub const EXCLUDED_SCORE: f64 = -1.0;

const ACTIVATION_ROLES: &[&str] = &["button", "menuitem", "link"];
const ACTIVATION_TAGS: &[&str] = &["button", "a"];

/// Independent scoring terms for one element against one intent. Penalties
/// are stored as negative values so that `score` is a plain sum.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Features {
    pub fuzzy: f64,
    pub overlap: f64,
    pub role_bonus: f64,
    pub dialog_adjustment: f64,
    pub literal_bonus: f64,
    pub length_penalty: f64,
}

impl Features {
    /// `None` when the element is not eligible for this intent at all.
    pub fn extract(
        intent: &NormalizedIntent,
        el: &ElementRecord,
        dialog: Option<&DialogBounds>,
    ) -> Option<Self> {
        if !el.has_label() {
            return None;
        }
        if intent.requires_textbox() && !el.is_textbox_like() {
            return None;
        }

        let fields = el.label_fields();
        Some(Self {
            fuzzy: fieldwise_fuzzy(&intent.normalized, &fields),
            overlap: token_overlap(&intent.tokens, &fields),
            role_bonus: role_bonus(intent, el),
            dialog_adjustment: dialog_adjustment(dialog, el),
            literal_bonus: literal_bonus(&intent.literals, &fields),
            length_penalty: length_penalty(&fields),
        })
    }

    pub fn score(&self) -> f64 {
        FUZZY_WEIGHT * self.fuzzy
            + OVERLAP_WEIGHT * self.overlap
            + self.role_bonus
            + self.dialog_adjustment
            + self.literal_bonus
            + self.length_penalty
    }
}

/// Similarity in `[0, 1]`; 0 when either side is empty.
pub fn fuzzy_ratio(a: &str, b: &str) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    strsim::normalized_levenshtein(a, b)
}

/// Best ratio between the normalized intent and any non-empty field.
pub fn fieldwise_fuzzy(normalized: &str, fields: &[&str]) -> f64 {
    fields
        .iter()
        .filter(|f| !f.is_empty())
        .map(|f| fuzzy_ratio(normalized, &f.to_lowercase()))
        .fold(0.0, f64::max)
}

/// Share of distinct intent tokens that also occur in the element's fields.
pub fn token_overlap(intent_tokens: &[String], fields: &[&str]) -> f64 {
    let wanted: HashSet<&str> = intent_tokens.iter().map(String::as_str).collect();
    if wanted.is_empty() {
        return 0.0;
    }
    let have = tokenize(&fields.join(" "));
    let have: HashSet<&str> = have.iter().map(String::as_str).collect();
    wanted.intersection(&have).count() as f64 / wanted.len() as f64
}

pub fn role_bonus(intent: &NormalizedIntent, el: &ElementRecord) -> f64 {
    let role = el.role_lower();
    let tag = el.tag_lower();
    let mut bonus = 0.0;

    if intent.signals_activation() {
        if ACTIVATION_ROLES.contains(&role.as_str()) {
            bonus += ROLE_BONUS;
        }
        if ACTIVATION_TAGS.contains(&tag.as_str()) {
            bonus += TAG_BONUS;
        }
    }
    if intent.signals_fill()
        && (matches!(role.as_str(), "textbox" | "combobox")
            || matches!(tag.as_str(), "input" | "textarea"))
    {
        bonus += FILL_BONUS;
    }
    bonus
}

pub fn dialog_adjustment(dialog: Option<&DialogBounds>, el: &ElementRecord) -> f64 {
    match dialog {
        Some(bounds) if bounds.contains(el) => DIALOG_INSIDE_BONUS,
        Some(_) => -DIALOG_OUTSIDE_PENALTY,
        None => 0.0,
    }
}

/// Exact, case-insensitive equality between any literal and any field.
pub fn literal_bonus(literals: &[String], fields: &[&str]) -> f64 {
    let hit = literals.iter().any(|lit| {
        let lit = lit.to_lowercase();
        fields.iter().any(|f| !f.is_empty() && f.to_lowercase() == lit)
    });
    if hit { LITERAL_BONUS } else { 0.0 }
}

pub fn length_penalty(fields: &[&str]) -> f64 {
    let text_len = fields.first().map(|t| t.chars().count()).unwrap_or(0);
    let joined_len = fields.join(" ").chars().count();
    if text_len > LONG_TEXT_CHARS || joined_len > LONG_JOINED_CHARS {
        -LONG_BLOB_PENALTY
    } else {
        0.0
    }
}
