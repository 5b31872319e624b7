use chrono::{
    DateTime,
    Utc,
};
use serde::{
    Deserialize,
    Serialize,
};

use crate::core::models::{
    ItemId,
    Outcome,
    SequencePosition,
};

/// One monster as listed in a practice batch, before its detail is joined in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchEntry {
    pub sequence_position: SequencePosition,
    #[serde(rename = "monster_id")]
    pub item_id: ItemId,
    pub familiarity: u8,
    pub difficulty: u8,
    pub visibility: u8,
}

#[derive(Debug, Clone, Serialize)]
pub struct SubmitRequest<'a> {
    #[serde(rename = "monster_id")]
    pub item_id: &'a ItemId,
    pub outcome: Outcome,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmitResponse {
    pub points_update: i64,
    pub from: PreviousState,
    pub updates: UpdatedState,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreviousState {
    #[serde(default)]
    pub practice_count: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdatedState {
    pub familiarity: u8,
    pub next_practice_at: DateTime<Utc>,
    pub practice_at: DateTime<Utc>,
}
