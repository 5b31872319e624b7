use std::{
    collections::HashMap,
    sync::Arc,
};

use futures::future::{
    try_join_all,
    BoxFuture,
};
use tokio::sync::Mutex;
use tracing::{
    debug,
    warn,
};

use crate::core::{
    models::{
        ContentSnapshot,
        ItemId,
        Outcome,
        PracticeItem,
        SequencePosition,
        SessionId,
        SessionInfo,
    },
    tasks::Ticket,
    PracticeError,
};

pub mod client;
pub mod types;

pub use client::ApiClient;
pub use types::{
    BatchEntry,
    SubmitResponse,
};

/// Source of practice batches and the monster content shown on each card.
pub trait ItemSource: Send + Sync {
    fn fetch_session<'a>(
        &'a self,
        session_id: &'a SessionId,
    ) -> BoxFuture<'a, Result<SessionInfo, PracticeError>>;

    /// Items in stable forward order; fewer than `count` means the content is exhausted.
    fn fetch_batch<'a>(
        &'a self,
        session_id: &'a SessionId,
        count: usize,
    ) -> BoxFuture<'a, Result<Vec<BatchEntry>, PracticeError>>;

    fn fetch_detail<'a>(
        &'a self,
        item_id: &'a ItemId,
    ) -> BoxFuture<'a, Result<ContentSnapshot, PracticeError>>;
}

pub trait OutcomeSubmitter: Send + Sync {
    fn submit<'a>(
        &'a self,
        session_id: &'a SessionId,
        item_id: &'a ItemId,
        outcome: Outcome,
    ) -> BoxFuture<'a, Result<SubmitResponse, PracticeError>>;
}

/// Fetches a batch and joins each entry with its content snapshot.
pub async fn fetch_practice_items<S: ItemSource + ?Sized>(
    source: &S,
    session_id: &SessionId,
    count: usize,
) -> Result<Vec<PracticeItem>, PracticeError> {
    let entries = source.fetch_batch(session_id, count).await?;
    join_details(source, &entries).await
}

/// Joins batch entries with their content snapshots.
///
/// Details are requested once per distinct monster, concurrently. Range and ordering
/// checks are left to the sequence buffer.
pub async fn join_details<S: ItemSource + ?Sized>(
    source: &S,
    entries: &[BatchEntry],
) -> Result<Vec<PracticeItem>, PracticeError> {
    let mut unique_ids: Vec<&ItemId> = Vec::new();
    for entry in entries {
        if !unique_ids.contains(&&entry.item_id) {
            unique_ids.push(&entry.item_id);
        }
    }

    let details = try_join_all(unique_ids.iter().map(|id| async move {
        let content = source.fetch_detail(id).await?;
        Ok::<(ItemId, ContentSnapshot), PracticeError>(((*id).clone(), content))
    }))
    .await?;
    let details: HashMap<ItemId, ContentSnapshot> = details.into_iter().collect();

    debug!(received = entries.len(), details = details.len(), "batch joined");

    entries
        .iter()
        .map(|entry| {
            let content = details.get(&entry.item_id).cloned().ok_or_else(|| {
                PracticeError::Validation(format!("no content for monster {}", entry.item_id))
            })?;
            Ok(PracticeItem::new(
                entry.sequence_position,
                entry.item_id.clone(),
                content,
                entry.familiarity,
                entry.difficulty,
                entry.visibility,
            ))
        })
        .collect()
}

/// Batch loading for the task manager.
///
/// Listing a batch moves the server's forward cursor, so a batch whose details failed
/// is held and rejoined when the same session asks again from the same position.
pub struct BatchLoader {
    source: Arc<dyn ItemSource>,
    held: Mutex<Option<HeldBatch>>,
}

struct HeldBatch {
    session_id: SessionId,
    position: SequencePosition,
    entries: Vec<BatchEntry>,
}

impl BatchLoader {
    pub fn new(source: Arc<dyn ItemSource>) -> Self {
        Self { source, held: Mutex::new(None) }
    }

    pub fn source(&self) -> &dyn ItemSource {
        self.source.as_ref()
    }

    pub async fn load(
        &self,
        ticket: Ticket,
        session_id: &SessionId,
        count: usize,
    ) -> Result<Vec<PracticeItem>, PracticeError> {
        let held = match self.held.lock().await.take() {
            Some(held) if held.session_id == *session_id && held.position == ticket.position => {
                Some(held.entries)
            }
            Some(held) => {
                debug!(session = %held.session_id, position = held.position, "held batch discarded");
                None
            }
            None => None,
        };

        let entries = match held {
            Some(entries) => {
                debug!(
                    session = %session_id,
                    position = ticket.position,
                    entries = entries.len(),
                    "rejoining held batch"
                );
                entries
            }
            None => self.source.fetch_batch(session_id, count).await?,
        };

        match join_details(self.source.as_ref(), &entries).await {
            Ok(items) => Ok(items),
            Err(e) => {
                warn!(session = %session_id, position = ticket.position, "batch held after detail failure: {e}");
                *self.held.lock().await = Some(HeldBatch {
                    session_id: session_id.clone(),
                    position: ticket.position,
                    entries,
                });
                Err(e)
            }
        }
    }
}
