use std::fmt;

use chrono::{
    DateTime,
    Utc,
};
use serde::{
    Deserialize,
    Serialize,
};

pub type SequencePosition = u64;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub String);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(pub String);

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionInfo {
    pub id: SessionId,
    pub name: String,
    #[serde(default)]
    pub total_items: Option<u64>, // Not every session knows its length up front
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentSnapshot {
    pub name: String,
    #[serde(default)]
    pub description: String, // Markdown, rendered as plain text here
    #[serde(default)]
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Defeat,
    Miss,
    Hit,
    Kill,
    Complete,
}

impl Outcome {
    pub const ALL: [Outcome; 5] =
        [Outcome::Defeat, Outcome::Miss, Outcome::Hit, Outcome::Kill, Outcome::Complete];

    pub fn label(&self) -> &'static str {
        match self {
            Outcome::Defeat => "Defeat",
            Outcome::Miss => "Miss",
            Outcome::Hit => "Hit",
            Outcome::Kill => "Kill",
            Outcome::Complete => "Complete",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PracticeCount {
    Pending,
    Count(u32),
}

impl PracticeCount {
    pub fn value(&self) -> Option<u32> {
        match self {
            PracticeCount::Pending => None,
            PracticeCount::Count(count) => Some(*count),
        }
    }
}

impl fmt::Display for PracticeCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PracticeCount::Pending => f.write_str("…"),
            PracticeCount::Count(count) => write!(f, "{count}"),
        }
    }
}

/// Server-authoritative state recorded once an outcome is accepted.
#[derive(Debug, Clone, PartialEq)]
pub struct SubmissionResult {
    pub familiarity: u8,
    pub next_practice_at: DateTime<Utc>,
    pub practice_at: DateTime<Utc>,
    pub practice_count: PracticeCount,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PracticeItem {
    pub sequence_position: SequencePosition, // Session-global, starts at 0
    pub item_id: ItemId,
    pub content: ContentSnapshot,
    pub familiarity: u8,       // 0-100
    pub difficulty: u8,        // 1-5
    pub visibility: u8,        // 0-100
    submission_result: Option<SubmissionResult>,
}

impl PracticeItem {
    pub fn new(
        sequence_position: SequencePosition,
        item_id: ItemId,
        content: ContentSnapshot,
        familiarity: u8,
        difficulty: u8,
        visibility: u8,
    ) -> Self {
        Self {
            sequence_position,
            item_id,
            content,
            familiarity,
            difficulty,
            visibility,
            submission_result: None,
        }
    }

    pub fn submission_result(&self) -> Option<&SubmissionResult> {
        self.submission_result.as_ref()
    }

    pub fn is_resolved(&self) -> bool {
        self.submission_result.is_some()
    }

    /// Records the result exactly once. A second call hands the rejected result back.
    pub(crate) fn resolve(&mut self, result: SubmissionResult) -> Result<(), SubmissionResult> {
        if self.submission_result.is_some() {
            return Err(result);
        }
        self.submission_result = Some(result);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item() -> PracticeItem {
        PracticeItem::new(
            0,
            ItemId("slime".into()),
            ContentSnapshot { name: "Slime".into(), description: String::new(), image_url: None },
            20,
            1,
            100,
        )
    }

    #[test]
    fn test_resolve_only_once() {
        let mut item = item();
        let now = Utc::now();
        let first = SubmissionResult {
            familiarity: 40,
            next_practice_at: now,
            practice_at: now,
            practice_count: PracticeCount::Count(1),
        };
        let second = SubmissionResult { familiarity: 90, ..first.clone() };

        assert!(item.resolve(first.clone()).is_ok());
        assert_eq!(item.resolve(second), Err(SubmissionResult { familiarity: 90, ..first.clone() }));
        assert_eq!(item.submission_result(), Some(&first));
    }

    #[test]
    fn test_outcome_wire_names() {
        assert_eq!(serde_json::to_string(&Outcome::Kill).unwrap(), "\"kill\"");
        let parsed: Outcome = serde_json::from_str("\"complete\"").unwrap();
        assert_eq!(parsed, Outcome::Complete);
    }
}
