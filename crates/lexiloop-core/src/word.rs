//! Value types shared across the session engine and schedule store.
//!
//! [`Word`] records are immutable after catalog load; everything else
//! references them by id. Serde field names match the persisted JSON
//! blob shape, so state written by earlier builds restores cleanly.

use serde::{Deserialize, Serialize};

/// A vocabulary entry. Owned by the catalog, never mutated after load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Word {
    /// Stable, unique within a library.
    pub id: String,
    pub term: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phonetic: Option<String>,
    pub meaning: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub examples: Option<Vec<String>>,
}

/// One presentation event. Append-only, not deduplicated at write time.
/// `seen_at_sec` is elapsed visible-session seconds, not wall-clock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeenLog {
    pub word_id: String,
    pub seen_at_sec: u64,
}

/// Why a long-term review was scheduled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReviewReason {
    #[serde(rename = "2d")]
    TwoDay,
    #[serde(rename = "7d")]
    SevenDay,
}

/// A pending long-term review. A word may carry one entry per horizon.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduledReview {
    pub word_id: String,
    /// Epoch milliseconds.
    pub due_at: i64,
    pub reason: ReviewReason,
}

/// Per-word lifecycle stage. Progression is driven by engine events;
/// `Due2d` can follow any prior stage when a 2-day word resurfaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    New,
    Seen,
    Block,
    Session,
    Due2d,
}

/// Which queue the next word will come from, for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Review,
    Due,
    New,
    Done,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn review_reason_wire_format() {
        assert_eq!(
            serde_json::to_string(&ReviewReason::TwoDay).unwrap(),
            "\"2d\""
        );
        assert_eq!(
            serde_json::to_string(&ReviewReason::SevenDay).unwrap(),
            "\"7d\""
        );
    }

    #[test]
    fn scheduled_review_json_shape() {
        let r = ScheduledReview {
            word_id: "abate#0".into(),
            due_at: 1_700_000_000_000,
            reason: ReviewReason::TwoDay,
        };
        let json = serde_json::to_value(&r).unwrap();
        assert_eq!(json["wordId"], "abate#0");
        assert_eq!(json["dueAt"], 1_700_000_000_000_i64);
        assert_eq!(json["reason"], "2d");
    }

    #[test]
    fn word_optional_fields_omitted() {
        let w = Word {
            id: "w#0".into(),
            term: "abate".into(),
            phonetic: None,
            meaning: "to lessen".into(),
            examples: None,
        };
        let json = serde_json::to_value(&w).unwrap();
        assert!(json.get("phonetic").is_none());
        assert!(json.get("examples").is_none());
    }
}
