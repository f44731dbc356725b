// src/sentiment.rs
//! Sentiment tagging as a pluggable capability.
//!
//! The pipeline only needs `classify(text) -> SentimentTag`. The default is
//! [`NeutralClassifier`]; [`LexiconClassifier`] is a small word-list scorer that
//! can be wired in instead.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SentimentTag {
    Positive,
    #[default]
    Neutral,
    Negative,
}

impl fmt::Display for SentimentTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SentimentTag::Positive => "positive",
            SentimentTag::Neutral => "neutral",
            SentimentTag::Negative => "negative",
        };
        f.write_str(s)
    }
}

pub trait SentimentClassifier: Send + Sync {
    fn classify(&self, text: &str) -> SentimentTag;
    fn name(&self) -> &'static str;
}

/// Placeholder used when no analysis is wired in.
#[derive(Debug, Clone, Copy, Default)]
pub struct NeutralClassifier;

impl SentimentClassifier for NeutralClassifier {
    fn classify(&self, _text: &str) -> SentimentTag {
        SentimentTag::Neutral
    }

    fn name(&self) -> &'static str {
        "neutral"
    }
}

static DEFAULT_LEXICON: Lazy<HashMap<String, i32>> = Lazy::new(|| {
    [
        ("gain", 2),
        ("gains", 2),
        ("growth", 2),
        ("record", 1),
        ("win", 2),
        ("wins", 2),
        ("success", 2),
        ("improve", 1),
        ("improves", 1),
        ("rally", 2),
        ("breakthrough", 3),
        ("launch", 1),
        ("loss", -2),
        ("losses", -2),
        ("crash", -3),
        ("crisis", -3),
        ("fail", -2),
        ("fails", -2),
        ("war", -3),
        ("attack", -3),
        ("decline", -2),
        ("outage", -2),
        ("layoffs", -2),
        ("breach", -3),
    ]
    .into_iter()
    .map(|(w, s)| (w.to_string(), s))
    .collect()
});

/// Lexicon scorer with short-range negation.
#[derive(Debug, Clone)]
pub struct LexiconClassifier {
    lexicon: HashMap<String, i32>,
}

impl Default for LexiconClassifier {
    fn default() -> Self {
        Self {
            lexicon: DEFAULT_LEXICON.clone(),
        }
    }
}

impl LexiconClassifier {
    pub fn with_lexicon(lexicon: HashMap<String, i32>) -> Self {
        Self { lexicon }
    }

    #[inline]
    fn word_score(&self, w: &str) -> i32 {
        *self.lexicon.get(w).unwrap_or(&0)
    }

    /// Returns (score, token count).
    /// A negator within the previous 1..=3 tokens flips the sign of a word's score.
    pub fn score_text(&self, text: &str) -> (i32, usize) {
        let tokens: Vec<String> = tokenize(text).collect();
        let mut score: i32 = 0;

        for i in 0..tokens.len() {
            let base = self.word_score(tokens[i].as_str());
            if base == 0 {
                continue;
            }
            let negated = (1..=3).any(|k| i >= k && is_negator(tokens[i - k].as_str()));
            score += if negated { -base } else { base };
        }

        (score, tokens.len())
    }
}

impl SentimentClassifier for LexiconClassifier {
    fn classify(&self, text: &str) -> SentimentTag {
        match self.score_text(text).0 {
            s if s > 0 => SentimentTag::Positive,
            s if s < 0 => SentimentTag::Negative,
            _ => SentimentTag::Neutral,
        }
    }

    fn name(&self) -> &'static str {
        "lexicon"
    }
}

fn tokenize(s: &str) -> impl Iterator<Item = String> + '_ {
    s.split(|c: char| !c.is_alphanumeric() && c != '\'')
        .filter(|t| !t.is_empty())
        .map(|t| t.to_lowercase())
}

fn is_negator(tok: &str) -> bool {
    matches!(
        tok,
        "not" | "no" | "never" | "isn't" | "wasn't" | "aren't" | "won't" | "can't" | "cannot" | "without"
    )
}
