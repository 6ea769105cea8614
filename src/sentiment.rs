//! Sentiment scoring.
//!
//! The rest of the service treats scoring as an opaque function: text goes in,
//! an [`Analysis`] comes out.  The default [`LexiconScorer`] classifies each
//! token against small positive/negative word lists and flips the polarity of
//! a word that directly follows a negator.

use ahash::AHashSet;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Per-word sentiment contribution: -1 negative, 0 neutral, 1 positive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WordScore {
    pub word: String,
    pub score: i8,
}

/// Result of scoring one unit of text.  `score` is 1 for positive text and 0
/// otherwise; `words` preserves input order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Analysis {
    pub language: String,
    pub words: Vec<WordScore>,
    pub score: u8,
}

/// Anything able to score text.  Implementations must be stateless across
/// calls; the service shares one instance between all in-flight requests.
pub trait Scorer: Send + Sync {
    fn analyze(&self, text: &str) -> Analysis;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct LexiconScorer;

static TOKEN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[\p{L}\p{N}']+").unwrap());

static POSITIVE: Lazy<AHashSet<&'static str>> = Lazy::new(|| {
    [
        "good", "great", "excellent", "amazing", "awesome", "wonderful", "fantastic", "love",
        "loved", "loves", "like", "liked", "enjoy", "enjoyed", "happy", "glad", "pleased",
        "nice", "best", "better", "brilliant", "beautiful", "perfect", "easy", "easier",
        "helpful", "fast", "fun", "favorite", "favourite", "positive", "success", "successful",
        "win", "won", "truth", "thank", "thanks", "recommend", "impressive", "superb", "cool",
        "delight", "delighted", "exciting", "excited", "kind", "smart", "clean", "clear",
        "reliable", "safe", "strong", "calm", "hope", "hopeful", "agree", "right", "fine",
        "satisfied", "incredible", "outstanding",
    ]
    .into_iter()
    .collect()
});

static NEGATIVE: Lazy<AHashSet<&'static str>> = Lazy::new(|| {
    [
        "bad", "terrible", "awful", "horrible", "hate", "hated", "hates", "dislike", "worst",
        "worse", "poor", "sad", "angry", "annoying", "annoyed", "ugly", "boring", "slow",
        "broken", "bug", "buggy", "fail", "failed", "failure", "wrong", "problem", "problems",
        "difficult", "hard", "hurt", "pain", "painful", "fear", "afraid", "scared", "disgusting",
        "disappointed", "disappointing", "useless", "waste", "nasty", "stupid", "lose", "lost",
        "negative", "trouble", "crash", "crashed", "unfortunately", "sorry", "mess", "confusing",
        "weak", "dirty", "dangerous", "rude", "cheap", "expensive", "down",
    ]
    .into_iter()
    .collect()
});

static NEGATORS: Lazy<AHashSet<&'static str>> = Lazy::new(|| {
    [
        "not", "no", "never", "nobody", "nothing", "neither", "nor", "none", "cannot", "can't",
        "don't", "doesn't", "didn't", "isn't", "wasn't", "aren't", "weren't", "won't",
        "wouldn't", "shouldn't", "couldn't",
    ]
    .into_iter()
    .collect()
});

impl LexiconScorer {
    fn polarity(word: &str) -> i8 {
        if POSITIVE.contains(word) {
            1
        } else if NEGATIVE.contains(word) {
            -1
        } else {
            0
        }
    }
}

impl Scorer for LexiconScorer {
    fn analyze(&self, text: &str) -> Analysis {
        let mut words = Vec::new();
        let mut total: i64 = 0;
        let mut negate = false;
        for token in TOKEN_RE.find_iter(text) {
            let word = token.as_str().trim_matches('\'').to_lowercase();
            if word.is_empty() {
                continue;
            }
            let mut score = Self::polarity(&word);
            if negate {
                score = -score;
            }
            negate = NEGATORS.contains(word.as_str());
            total += i64::from(score);
            words.push(WordScore { word, score });
        }
        Analysis {
            language: "en".to_string(),
            words,
            score: u8::from(total > 0),
        }
    }
}
