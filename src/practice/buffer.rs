use tracing::debug;

use crate::core::{
    models::{
        PracticeItem,
        SequencePosition,
        SubmissionResult,
    },
    PracticeError,
};

pub const WINDOW_RADIUS: i64 = 2;
pub const WINDOW_SIZE: usize = 5;

/// Which side of the cursor an empty slot sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotSide {
    Before,
    After,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SlotContent<'a> {
    Item(&'a PracticeItem),
    Placeholder(SlotSide),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindowSlot<'a> {
    pub position: i64,
    pub offset: i64, // Relative to the window centre, -2..=2
    pub content: SlotContent<'a>,
}

impl<'a> WindowSlot<'a> {
    pub fn item(&self) -> Option<&'a PracticeItem> {
        match self.content {
            SlotContent::Item(item) => Some(item),
            SlotContent::Placeholder(_) => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PrefetchState {
    Idle,
    InFlight { requested: usize },
    Exhausted,
}

/// Ordered practice items for one session plus the review cursor.
///
/// Positions start at 0 and grow by exactly one per item; batches only ever land at
/// the tail. The buffer also owns the prefetch policy: once the unread remainder
/// drops to the batch size, one fetch is started and no other until that one
/// settles and the buffer has grown.
#[derive(Debug)]
pub struct SequenceBuffer {
    items: Vec<PracticeItem>,
    cursor: SequencePosition,
    batch_size: usize,
    prefetch: PrefetchState,
    last_trigger_len: Option<usize>,
}

impl SequenceBuffer {
    pub fn new(batch_size: usize) -> Self {
        Self {
            items: Vec::new(),
            cursor: 0,
            batch_size: batch_size.max(1),
            prefetch: PrefetchState::Idle,
            last_trigger_len: None,
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn cursor(&self) -> SequencePosition {
        self.cursor
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn prefetch_threshold(&self) -> usize {
        self.batch_size
    }

    pub fn remaining(&self) -> usize {
        self.items.len().saturating_sub(self.cursor as usize)
    }

    pub fn is_exhausted(&self) -> bool {
        self.prefetch == PrefetchState::Exhausted
    }

    pub fn is_prefetching(&self) -> bool {
        matches!(self.prefetch, PrefetchState::InFlight { .. })
    }

    /// True once the cursor has walked past the last item of exhausted content.
    pub fn is_finished(&self) -> bool {
        self.is_exhausted() && self.remaining() == 0
    }

    pub fn item_at(&self, position: SequencePosition) -> Option<&PracticeItem> {
        self.items.get(usize::try_from(position).ok()?)
    }

    pub fn item_at_cursor(&self) -> Option<&PracticeItem> {
        self.item_at(self.cursor)
    }

    pub fn items(&self) -> &[PracticeItem] {
        &self.items
    }

    pub fn resolved_count(&self) -> usize {
        self.items.iter().filter(|item| item.is_resolved()).count()
    }

    /// Appends a fetched batch at the tail. The whole batch is rejected, leaving the
    /// buffer untouched, if any position is duplicated, out of order or skips ahead.
    pub fn append(&mut self, batch: Vec<PracticeItem>) -> Result<usize, PracticeError> {
        let start = self.items.len() as SequencePosition;

        for (offset, item) in batch.iter().enumerate() {
            let expected = start + offset as SequencePosition;
            if item.sequence_position < expected {
                return Err(PracticeError::Validation(format!(
                    "position {} is duplicated or out of order (expected {})",
                    item.sequence_position, expected
                )));
            }
            if item.sequence_position > expected {
                return Err(PracticeError::Validation(format!(
                    "gap before position {} (expected {})",
                    item.sequence_position, expected
                )));
            }
            validate_ranges(item)?;
        }

        let appended = batch.len();
        self.items.extend(batch);
        debug!(appended, len = self.items.len(), cursor = self.cursor, "batch appended");
        Ok(appended)
    }

    /// Moves the cursor forward one position. Returns whether the unread remainder is
    /// now at or below the prefetch threshold.
    pub fn advance_cursor(&mut self) -> bool {
        if (self.cursor as usize) < self.items.len() {
            self.cursor += 1;
        }
        self.remaining() <= self.prefetch_threshold()
    }

    /// Claims the prefetch guard and returns how many items to request, or `None` when
    /// a fetch is already running, the content is exhausted, the remainder is still
    /// above the threshold, or this buffer length already triggered one.
    pub fn begin_prefetch(&mut self) -> Option<usize> {
        if self.prefetch != PrefetchState::Idle
            || self.remaining() > self.prefetch_threshold()
            || self.last_trigger_len == Some(self.items.len())
        {
            return None;
        }

        self.prefetch = PrefetchState::InFlight { requested: self.batch_size };
        self.last_trigger_len = Some(self.items.len());
        debug!(len = self.items.len(), cursor = self.cursor, "prefetch started");
        Some(self.batch_size)
    }

    /// Releases the guard and appends the batch. A short batch marks the content as
    /// exhausted so no further fetches are issued.
    pub fn complete_prefetch(&mut self, batch: Vec<PracticeItem>) -> Result<usize, PracticeError> {
        let requested = match self.prefetch {
            PrefetchState::InFlight { requested } => requested,
            _ => self.batch_size,
        };
        let short = batch.len() < requested;

        let result = self.append(batch);
        self.prefetch = if result.is_ok() && short {
            debug!(len = self.items.len(), "content exhausted");
            PrefetchState::Exhausted
        } else {
            PrefetchState::Idle
        };
        result
    }

    /// Releases the guard after a failed fetch so the next advance retries.
    pub fn fail_prefetch(&mut self) {
        if self.is_prefetching() {
            self.prefetch = PrefetchState::Idle;
        }
        self.last_trigger_len = None;
    }

    pub fn record_result(
        &mut self,
        position: SequencePosition,
        result: SubmissionResult,
    ) -> Result<&PracticeItem, PracticeError> {
        let index = usize::try_from(position)
            .ok()
            .filter(|index| *index < self.items.len())
            .ok_or_else(|| PracticeError::Custom(format!("no item at position {position}")))?;

        let item = &mut self.items[index];
        item.resolve(result).map_err(|_| PracticeError::SubmissionConflict(position))?;
        Ok(item)
    }

    /// Five slots around `cursor`; anything outside the buffer is a placeholder.
    pub fn window(&self, cursor: i64) -> [WindowSlot<'_>; WINDOW_SIZE] {
        self.window_within(cursor, self.items.len())
    }

    /// Like [`Self::window`] but treats only the first `visible_len` items as loaded.
    pub fn window_within(&self, cursor: i64, visible_len: usize) -> [WindowSlot<'_>; WINDOW_SIZE] {
        let visible_len = visible_len.min(self.items.len()) as i64;

        std::array::from_fn(|slot| {
            let offset = slot as i64 - WINDOW_RADIUS;
            let position = cursor + offset;
            let content = if (0..visible_len).contains(&position) {
                SlotContent::Item(&self.items[position as usize])
            } else if offset < 0 {
                SlotContent::Placeholder(SlotSide::Before)
            } else {
                SlotContent::Placeholder(SlotSide::After)
            };
            WindowSlot { position, offset, content }
        })
    }
}

fn validate_ranges(item: &PracticeItem) -> Result<(), PracticeError> {
    if item.familiarity > 100 {
        return Err(PracticeError::Validation(format!(
            "familiarity {} out of range at position {}",
            item.familiarity, item.sequence_position
        )));
    }
    if !(1..=5).contains(&item.difficulty) {
        return Err(PracticeError::Validation(format!(
            "difficulty {} out of range at position {}",
            item.difficulty, item.sequence_position
        )));
    }
    if item.visibility > 100 {
        return Err(PracticeError::Validation(format!(
            "visibility {} out of range at position {}",
            item.visibility, item.sequence_position
        )));
    }
    Ok(())
}

#[cfg(test)]
pub(crate) mod test_items {
    use crate::core::models::{
        ContentSnapshot,
        ItemId,
        PracticeItem,
    };

    pub fn item(position: u64) -> PracticeItem {
        PracticeItem::new(
            position,
            ItemId(format!("m{position}")),
            ContentSnapshot {
                name: format!("Monster {position}"),
                description: "A monster.".to_string(),
                image_url: None,
            },
            20,
            3,
            100,
        )
    }

    pub fn batch(range: std::ops::Range<u64>) -> Vec<PracticeItem> {
        range.map(item).collect()
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::{
        test_items::{
            batch,
            item,
        },
        *,
    };
    use crate::core::models::PracticeCount;

    fn filled(batch_size: usize, count: u64) -> SequenceBuffer {
        let mut buffer = SequenceBuffer::new(batch_size);
        assert_eq!(buffer.begin_prefetch(), Some(batch_size));
        buffer.complete_prefetch(batch(0..count)).unwrap();
        buffer
    }

    fn result() -> SubmissionResult {
        let now = Utc::now();
        SubmissionResult {
            familiarity: 40,
            next_practice_at: now,
            practice_at: now,
            practice_count: PracticeCount::Count(1),
        }
    }

    #[test]
    fn test_positions_stay_contiguous_across_batches() {
        let mut buffer = SequenceBuffer::new(10);
        buffer.append(batch(0..10)).unwrap();
        buffer.append(batch(10..20)).unwrap();

        assert_eq!(buffer.len(), 20);
        assert!(buffer
            .items()
            .windows(2)
            .all(|pair| pair[1].sequence_position == pair[0].sequence_position + 1));
    }

    #[test]
    fn test_rejects_duplicate_positions() {
        let mut buffer = SequenceBuffer::new(10);
        buffer.append(batch(0..5)).unwrap();

        let result = buffer.append(batch(4..8));
        assert!(matches!(result, Err(PracticeError::Validation(_))));
        assert_eq!(buffer.len(), 5);
    }

    #[test]
    fn test_rejects_non_monotonic_batch() {
        let mut buffer = SequenceBuffer::new(10);
        let result = buffer.append(vec![item(0), item(2), item(1)]);

        assert!(matches!(result, Err(PracticeError::Validation(_))));
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_rejects_out_of_range_fields() {
        let mut buffer = SequenceBuffer::new(10);
        let mut bad = item(0);
        bad.difficulty = 0;
        assert!(matches!(buffer.append(vec![bad]), Err(PracticeError::Validation(_))));

        let mut bad = item(0);
        bad.familiarity = 101;
        assert!(matches!(buffer.append(vec![bad]), Err(PracticeError::Validation(_))));
    }

    #[test]
    fn test_advance_below_threshold_triggers_next_batch() {
        let mut buffer = filled(10, 10);
        assert_eq!(buffer.cursor(), 0);

        assert!(buffer.advance_cursor());
        assert_eq!(buffer.remaining(), 9);
        assert_eq!(buffer.begin_prefetch(), Some(10));

        buffer.complete_prefetch(batch(10..20)).unwrap();
        assert_eq!(buffer.item_at(19).map(|i| i.sequence_position), Some(19));
    }

    #[test]
    fn test_prefetch_fires_once_per_crossing() {
        let mut buffer = filled(10, 10);

        assert!(buffer.advance_cursor());
        assert_eq!(buffer.begin_prefetch(), Some(10));

        // Still below the threshold while the fetch runs: guarded.
        assert!(buffer.advance_cursor());
        assert_eq!(buffer.begin_prefetch(), None);
        assert_eq!(buffer.begin_prefetch(), None);

        buffer.complete_prefetch(batch(10..20)).unwrap();
        assert_eq!(buffer.remaining(), 18);

        for _ in 0..7 {
            assert!(!buffer.advance_cursor());
            assert_eq!(buffer.begin_prefetch(), None);
        }
        assert!(buffer.advance_cursor());
        assert_eq!(buffer.begin_prefetch(), Some(10));
    }

    #[test]
    fn test_failed_prefetch_retries_on_next_advance() {
        let mut buffer = filled(10, 10);
        buffer.advance_cursor();
        assert_eq!(buffer.begin_prefetch(), Some(10));

        buffer.fail_prefetch();
        assert!(!buffer.is_prefetching());

        buffer.advance_cursor();
        assert_eq!(buffer.begin_prefetch(), Some(10));
    }

    #[test]
    fn test_short_batch_exhausts_content() {
        let mut buffer = filled(10, 10);
        buffer.advance_cursor();
        buffer.begin_prefetch();
        buffer.complete_prefetch(batch(10..13)).unwrap();

        assert!(buffer.is_exhausted());
        buffer.advance_cursor();
        assert_eq!(buffer.begin_prefetch(), None);

        while buffer.remaining() > 0 {
            buffer.advance_cursor();
        }
        assert!(buffer.is_finished());
        assert_eq!(buffer.cursor(), 13);

        // The cursor never runs past the end.
        buffer.advance_cursor();
        assert_eq!(buffer.cursor(), 13);
    }

    #[test]
    fn test_window_beyond_end_of_content() {
        let mut buffer = SequenceBuffer::new(10);
        buffer.append(batch(0..3)).unwrap();

        let window = buffer.window(5);
        let positions: Vec<i64> = window.iter().map(|slot| slot.position).collect();
        assert_eq!(positions, vec![3, 4, 5, 6, 7]);
        assert_eq!(window[0].content, SlotContent::Placeholder(SlotSide::Before));
        assert_eq!(window[1].content, SlotContent::Placeholder(SlotSide::Before));
        for slot in &window[2..] {
            assert_eq!(slot.content, SlotContent::Placeholder(SlotSide::After));
        }
    }

    #[test]
    fn test_window_at_start() {
        let mut buffer = SequenceBuffer::new(10);
        buffer.append(batch(0..10)).unwrap();

        let window = buffer.window(0);
        assert_eq!(window[0].position, -2);
        assert_eq!(window[0].content, SlotContent::Placeholder(SlotSide::Before));
        assert_eq!(window[2].item().map(|i| i.sequence_position), Some(0));
        assert_eq!(window[4].item().map(|i| i.sequence_position), Some(2));
    }

    #[test]
    fn test_window_within_hides_unobserved_items() {
        let mut buffer = SequenceBuffer::new(10);
        buffer.append(batch(0..10)).unwrap();

        let window = buffer.window_within(8, 9);
        assert!(window[2].item().is_some());
        assert_eq!(window[3].content, SlotContent::Placeholder(SlotSide::After));
    }

    #[test]
    fn test_result_recorded_once() {
        let mut buffer = SequenceBuffer::new(10);
        buffer.append(batch(0..4)).unwrap();

        buffer.record_result(3, result()).unwrap();
        assert!(matches!(
            buffer.record_result(3, result()),
            Err(PracticeError::SubmissionConflict(3))
        ));
        assert!(buffer.record_result(9, result()).is_err());
        assert_eq!(buffer.resolved_count(), 1);
    }
}
