//! Canonicalization of human-typed category values.
//!
//! Lookup is layered: exact membership, then case-insensitive membership,
//! then the best similarity score above a threshold. Input that matches
//! nothing is returned cleaned but otherwise unchanged; free text is never
//! rejected, only flagged.

use regex::{NoExpand, Regex};
use serde::Serialize;

use crate::similarity::{Similarity, TokenSortRatio};

/// Matching knobs. Defaults: threshold 90, suggestion floor 60, 3
/// suggestions, `MBS` rewritten to `MSB`.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchOptions {
    pub threshold: f64,
    pub suggestion_floor: f64,
    pub top_n: usize,
    /// `(abbreviation, canonical spelling)` pairs, matched case-insensitively.
    pub abbreviations: Vec<(String, String)>,
}

impl Default for MatchOptions {
    fn default() -> Self {
        Self {
            threshold: 90.0,
            suggestion_floor: 60.0,
            top_n: 3,
            abbreviations: vec![("MBS".into(), "MSB".into())],
        }
    }
}

/// A master-list entry offered as a possible correction.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Suggestion {
    pub value: String,
    pub score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchResult {
    /// Canonical entry when one was found, else the cleaned input.
    pub matched_value: String,
    pub is_valid: bool,
    /// Ranked best first. Only populated when `is_valid` is false.
    pub suggestions: Vec<Suggestion>,
}

impl MatchResult {
    pub fn suggestion_values(&self) -> Vec<String> {
        self.suggestions.iter().map(|s| s.value.clone()).collect()
    }
}

pub struct Mapper<S = TokenSortRatio> {
    options: MatchOptions,
    rewrites: Vec<(Regex, String)>,
    similarity: S,
}

impl Default for Mapper<TokenSortRatio> {
    fn default() -> Self {
        Self::new(MatchOptions::default())
    }
}

impl Mapper<TokenSortRatio> {
    pub fn new(options: MatchOptions) -> Self {
        Self::with_similarity(options, TokenSortRatio)
    }
}

impl<S: Similarity> Mapper<S> {
    pub fn with_similarity(options: MatchOptions, similarity: S) -> Self {
        let rewrites = options
            .abbreviations
            .iter()
            .filter(|(from, _)| !from.is_empty())
            .filter_map(|(from, to)| {
                // Escaped literal with a case-insensitive flag always compiles.
                Regex::new(&format!("(?i){}", regex::escape(from)))
                    .ok()
                    .map(|re| (re, to.clone()))
            })
            .collect();
        Self {
            options,
            rewrites,
            similarity,
        }
    }

    pub fn options(&self) -> &MatchOptions {
        &self.options
    }

    /// Rewrite known abbreviations to their canonical spelling, wherever
    /// they occur and whatever their case.
    pub fn standardize(&self, text: &str) -> String {
        let mut out = text.to_string();
        for (re, to) in &self.rewrites {
            out = re.replace_all(&out, NoExpand(to)).into_owned();
        }
        out
    }

    /// [`standardize`](Self::standardize) for loosely typed values: strings
    /// are rewritten, anything else is returned as-is.
    pub fn standardize_value(&self, value: &serde_json::Value) -> serde_json::Value {
        match value {
            serde_json::Value::String(s) => serde_json::Value::String(self.standardize(s)),
            other => other.clone(),
        }
    }

    /// Standardize, collapse whitespace runs (newlines included) to single
    /// spaces, trim.
    pub fn clean(&self, value: &str) -> String {
        self.standardize(value)
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Best canonical entry for `value` at the configured threshold.
    pub fn find_best_match(&self, value: &str, master: &[String]) -> String {
        self.find_best_match_at(value, master, self.options.threshold)
    }

    pub fn find_best_match_at(&self, value: &str, master: &[String], threshold: f64) -> String {
        let cleaned = self.clean(value);
        if master.is_empty() {
            return cleaned;
        }

        if master.iter().any(|m| *m == cleaned) {
            return cleaned;
        }

        let lowered = cleaned.to_lowercase();
        if let Some(canonical) = master.iter().find(|m| m.to_lowercase() == lowered) {
            return canonical.clone();
        }

        // Strictly greater: on equal scores the earliest entry is kept.
        let mut best: Option<&String> = None;
        let mut best_score = 0.0;
        for entry in master {
            let score = self.similarity.score(&lowered, &entry.to_lowercase());
            if score > best_score {
                best_score = score;
                best = Some(entry);
            }
        }

        match best {
            Some(entry) if best_score >= threshold => {
                tracing::debug!(input = %cleaned, matched = %entry, score = best_score, "fuzzy match");
                entry.clone()
            }
            _ => cleaned,
        }
    }

    /// Entries scoring at least the suggestion floor, best first, at most
    /// `top_n`. Equal scores keep master-list order.
    pub fn ranked_suggestions(&self, value: &str, master: &[String], top_n: usize) -> Vec<Suggestion> {
        let lowered = value.to_lowercase();
        let mut scored: Vec<Suggestion> = master
            .iter()
            .map(|entry| Suggestion {
                value: entry.clone(),
                score: self.similarity.score(&lowered, &entry.to_lowercase()),
            })
            .filter(|s| s.score >= self.options.suggestion_floor)
            .collect();
        scored.sort_by(|a, b| b.score.total_cmp(&a.score));
        scored.truncate(top_n);
        scored
    }

    /// Names of the [`ranked_suggestions`](Self::ranked_suggestions).
    pub fn get_fuzzy_suggestions(&self, value: &str, master: &[String], top_n: usize) -> Vec<String> {
        self.ranked_suggestions(value, master, top_n)
            .into_iter()
            .map(|s| s.value)
            .collect()
    }

    /// A value is valid when its best match is itself a master entry.
    /// With no master list there is nothing to validate against, so every
    /// value is valid.
    pub fn validate_and_suggest(&self, value: &str, master: &[String]) -> MatchResult {
        let matched_value = self.find_best_match(value, master);
        if master.is_empty() || master.contains(&matched_value) {
            return MatchResult {
                matched_value,
                is_valid: true,
                suggestions: Vec::new(),
            };
        }

        MatchResult {
            suggestions: self.ranked_suggestions(value, master, self.options.top_n),
            matched_value,
            is_valid: false,
        }
    }
}
