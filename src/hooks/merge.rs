//! Reassembles scored output so it mirrors the shape of the hook's input.

use serde::{Deserialize, Serialize};

use super::interpret::{Content, TimeBucket};
use crate::sentiment::{Analysis, Scorer};

/// Coarse per-bucket score; per-word detail lives in `metadata`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimedScore {
    pub start: f64,
    pub end: f64,
    pub score: u8,
}

/// Time-bucket result: `timed[i]` and `metadata[i]` both describe bucket `i`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimedAnalysis {
    pub timed: Vec<TimedScore>,
    pub metadata: Vec<Analysis>,
}

/// Body of a successful `/task` response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TaskPayload {
    Timed(TimedAnalysis),
    Flat(Analysis),
}

pub fn merge(content: Content, scorer: &dyn Scorer) -> TaskPayload {
    match content {
        Content::PlainText(text) | Content::KeyedText(text) => {
            TaskPayload::Flat(scorer.analyze(&text))
        }
        Content::KeyedTimeBuckets(buckets) => TaskPayload::Timed(merge_buckets(&buckets, scorer)),
    }
}

/// Scores each bucket on its own, in source order.
pub fn merge_buckets(buckets: &[TimeBucket], scorer: &dyn Scorer) -> TimedAnalysis {
    let mut timed = Vec::with_capacity(buckets.len());
    let mut metadata = Vec::with_capacity(buckets.len());
    for bucket in buckets {
        let analysis = scorer.analyze(&bucket.text);
        timed.push(TimedScore {
            start: bucket.start,
            end: bucket.end,
            score: analysis.score,
        });
        metadata.push(analysis);
    }
    TimedAnalysis { timed, metadata }
}
