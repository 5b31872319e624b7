use std::{
    collections::HashSet,
    time::{
        Duration,
        Instant,
    },
};

use tracing::{
    debug,
    trace,
};

use super::buffer::{
    SequenceBuffer,
    WindowSlot,
    WINDOW_SIZE,
};
use crate::core::models::SequencePosition;

pub const DEFAULT_SLIDE_DURATION: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlideDirection {
    Forward,
    Backward,
}

impl SlideDirection {
    /// Horizontal sign of the slide: forward moves cards to the left.
    pub fn sign(&self) -> f32 {
        match self {
            SlideDirection::Forward => -1.0,
            SlideDirection::Backward => 1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CarouselState {
    Idle,
    Transitioning { direction: SlideDirection, target: SequencePosition, started_at: Instant },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TapOutcome {
    Ignored,
    Expanded,
    Collapsed,
    Locked, // Resolved cards stay open
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CardView<'a> {
    pub slot: WindowSlot<'a>,
    pub is_displayed: bool,
    pub expanded: bool,
    pub locked: bool,
}

/// Everything the renderer needs for one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct WindowView<'a> {
    pub displayed_index: SequencePosition,
    pub cards: [CardView<'a>; WINDOW_SIZE],
    pub direction: Option<SlideDirection>,
    pub progress: f32, // Eased 0.0..=1.0 while sliding
    pub input_locked: bool,
}

impl WindowView<'_> {
    /// Signed slide offset in card widths.
    pub fn slide_offset(&self) -> f32 {
        self.direction.map(|d| d.sign() * self.progress).unwrap_or(0.0)
    }
}

/// Five-card presentation state around the displayed position.
///
/// An advance request locks input and starts a fixed-length slide; the new index is
/// committed only when the slide finishes. Requests that arrive mid-slide are dropped.
/// Buffer growth is picked up only while idle so a running slide never re-lays out.
#[derive(Debug)]
pub struct CarouselWindow {
    displayed_index: SequencePosition,
    state: CarouselState,
    expanded: HashSet<SequencePosition>,
    observed_len: usize,
    duration: Duration,
}

impl CarouselWindow {
    pub fn new(duration: Duration) -> Self {
        Self {
            displayed_index: 0,
            state: CarouselState::Idle,
            expanded: HashSet::new(),
            observed_len: 0,
            duration,
        }
    }

    pub fn reset(&mut self) {
        self.displayed_index = 0;
        self.state = CarouselState::Idle;
        self.expanded.clear();
        self.observed_len = 0;
    }

    pub fn displayed_index(&self) -> SequencePosition {
        self.displayed_index
    }

    pub fn state(&self) -> CarouselState {
        self.state
    }

    pub fn is_transitioning(&self) -> bool {
        matches!(self.state, CarouselState::Transitioning { .. })
    }

    pub fn observed_len(&self) -> usize {
        self.observed_len
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    /// Starts sliding to the next card. Returns `false` when a slide is already running.
    pub fn request_advance(&mut self, now: Instant) -> bool {
        self.request_move_to(self.displayed_index + 1, now)
    }

    fn request_move_to(&mut self, target: SequencePosition, now: Instant) -> bool {
        if self.is_transitioning() {
            debug!(displayed = self.displayed_index, target, "advance dropped, slide in progress");
            return false;
        }
        if target == self.displayed_index {
            return false;
        }

        let direction = if target > self.displayed_index {
            SlideDirection::Forward
        } else {
            SlideDirection::Backward
        };
        self.state = CarouselState::Transitioning { direction, target, started_at: now };
        debug!(displayed = self.displayed_index, target, ?direction, "slide started");
        true
    }

    /// Advances the animation clock. Returns `true` on the frame a slide commits.
    pub fn tick(&mut self, now: Instant, buffer_len: usize) -> bool {
        match self.state {
            CarouselState::Transitioning { target, started_at, .. } => {
                if now.saturating_duration_since(started_at) < self.duration {
                    return false;
                }
                self.displayed_index = target;
                self.expanded.clear();
                self.state = CarouselState::Idle;
                self.observed_len = buffer_len;
                debug!(displayed = target, "slide committed");
                true
            }
            CarouselState::Idle => {
                self.observe_buffer(buffer_len);
                false
            }
        }
    }

    /// Records buffer growth. Ignored mid-slide; the commit picks it up.
    pub fn observe_buffer(&mut self, buffer_len: usize) {
        if !self.is_transitioning() && self.observed_len != buffer_len {
            trace!(from = self.observed_len, to = buffer_len, "buffer growth observed");
            self.observed_len = buffer_len;
        }
    }

    /// Handles a tap on the card at `position`. Only the displayed card reacts, and only
    /// while idle; a resolved card is forced open instead of toggled.
    pub fn tap(&mut self, position: SequencePosition, resolved: bool) -> TapOutcome {
        if self.is_transitioning() || position != self.displayed_index {
            return TapOutcome::Ignored;
        }

        if resolved {
            self.expanded.insert(position);
            return TapOutcome::Locked;
        }

        if self.expanded.remove(&position) {
            TapOutcome::Collapsed
        } else {
            self.expanded.insert(position);
            TapOutcome::Expanded
        }
    }

    pub fn is_expanded(&self, position: SequencePosition, resolved: bool) -> bool {
        resolved || self.expanded.contains(&position)
    }

    /// Linear slide progress in `0.0..=1.0`, or `None` while idle.
    pub fn progress(&self, now: Instant) -> Option<f32> {
        match self.state {
            CarouselState::Idle => None,
            CarouselState::Transitioning { started_at, .. } => {
                if self.duration.is_zero() {
                    return Some(1.0);
                }
                let elapsed = now.saturating_duration_since(started_at).as_secs_f32();
                Some((elapsed / self.duration.as_secs_f32()).clamp(0.0, 1.0))
            }
        }
    }

    pub fn view<'a>(&self, buffer: &'a SequenceBuffer, now: Instant) -> WindowView<'a> {
        let slots = buffer.window_within(self.displayed_index as i64, self.observed_len);
        let cards = slots.map(|slot| {
            let resolved = slot.item().is_some_and(|item| item.is_resolved());
            let is_displayed = slot.position == self.displayed_index as i64;
            let expanded = slot.item().is_some()
                && slot.position >= 0
                && self.is_expanded(slot.position as SequencePosition, resolved);
            CardView { slot, is_displayed, expanded, locked: resolved }
        });

        let direction = match self.state {
            CarouselState::Transitioning { direction, .. } => Some(direction),
            CarouselState::Idle => None,
        };

        WindowView {
            displayed_index: self.displayed_index,
            cards,
            direction,
            progress: self.progress(now).map(ease_out_cubic).unwrap_or(0.0),
            input_locked: self.is_transitioning(),
        }
    }
}

impl Default for CarouselWindow {
    fn default() -> Self {
        Self::new(DEFAULT_SLIDE_DURATION)
    }
}

fn ease_out_cubic(t: f32) -> f32 {
    1.0 - (1.0 - t).powi(3)
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::{
        core::models::{
            PracticeCount,
            SubmissionResult,
        },
        practice::buffer::{
            test_items::batch,
            SlotContent,
        },
    };

    const MS: Duration = Duration::from_millis(1);

    fn buffer(count: u64) -> SequenceBuffer {
        let mut buffer = SequenceBuffer::new(10);
        buffer.append(batch(0..count)).unwrap();
        buffer
    }

    #[test]
    fn test_advance_commits_after_duration() {
        let start = Instant::now();
        let mut carousel = CarouselWindow::default();

        assert!(carousel.request_advance(start));
        assert!(carousel.is_transitioning());
        assert_eq!(carousel.displayed_index(), 0);

        assert!(!carousel.tick(start + 499 * MS, 10));
        assert_eq!(carousel.displayed_index(), 0);

        assert!(carousel.tick(start + 500 * MS, 10));
        assert_eq!(carousel.displayed_index(), 1);
        assert_eq!(carousel.state(), CarouselState::Idle);
    }

    #[test]
    fn test_second_advance_within_window_is_dropped() {
        let start = Instant::now();
        let mut carousel = CarouselWindow::default();

        assert!(carousel.request_advance(start));
        assert!(!carousel.request_advance(start + 200 * MS));

        let mut commits = 0;
        for step in 0..20 {
            if carousel.tick(start + step * 100 * MS, 10) {
                commits += 1;
            }
        }
        assert_eq!(commits, 1);
        assert_eq!(carousel.displayed_index(), 1);
    }

    #[test]
    fn test_direction_captured() {
        let start = Instant::now();
        let mut carousel = CarouselWindow::default();
        carousel.request_advance(start);

        match carousel.state() {
            CarouselState::Transitioning { direction, target, .. } => {
                assert_eq!(direction, SlideDirection::Forward);
                assert_eq!(target, 1);
            }
            CarouselState::Idle => panic!("expected a running slide"),
        }
    }

    #[test]
    fn test_tap_only_displayed_card() {
        let mut carousel = CarouselWindow::default();

        assert_eq!(carousel.tap(1, false), TapOutcome::Ignored);
        assert!(!carousel.is_expanded(1, false));

        assert_eq!(carousel.tap(0, false), TapOutcome::Expanded);
        assert!(carousel.is_expanded(0, false));
        assert_eq!(carousel.tap(0, false), TapOutcome::Collapsed);
        assert!(!carousel.is_expanded(0, false));
    }

    #[test]
    fn test_resolved_card_locks_open() {
        let mut carousel = CarouselWindow::default();

        assert_eq!(carousel.tap(0, true), TapOutcome::Locked);
        assert_eq!(carousel.tap(0, true), TapOutcome::Locked);
        assert!(carousel.is_expanded(0, true));
    }

    #[test]
    fn test_taps_ignored_while_sliding_and_expansion_cleared() {
        let start = Instant::now();
        let mut carousel = CarouselWindow::default();
        carousel.tap(0, false);

        carousel.request_advance(start);
        assert_eq!(carousel.tap(0, false), TapOutcome::Ignored);

        carousel.tick(start + 600 * MS, 10);
        assert!(!carousel.is_expanded(0, false));
        assert_eq!(carousel.tap(1, false), TapOutcome::Expanded);
    }

    #[test]
    fn test_buffer_growth_waits_for_idle() {
        let start = Instant::now();
        let mut carousel = CarouselWindow::default();
        carousel.observe_buffer(3);

        carousel.request_advance(start);
        carousel.observe_buffer(13);
        assert_eq!(carousel.observed_len(), 3);

        carousel.tick(start + 500 * MS, 13);
        assert_eq!(carousel.observed_len(), 13);
    }

    #[test]
    fn test_view_always_has_five_slots() {
        let buffer = buffer(3);
        let mut carousel = CarouselWindow::default();
        carousel.observe_buffer(buffer.len());

        let view = carousel.view(&buffer, Instant::now());
        assert_eq!(view.cards.len(), WINDOW_SIZE);
        assert!(view.cards[2].is_displayed);
        assert_eq!(view.cards[2].slot.item().map(|i| i.sequence_position), Some(0));
        assert!(matches!(view.cards[0].slot.content, SlotContent::Placeholder(_)));
        assert_eq!(view.slide_offset(), 0.0);
        assert!(!view.input_locked);
    }

    #[test]
    fn test_view_hides_unobserved_growth_mid_slide() {
        let start = Instant::now();
        let mut buffer = buffer(2);
        let mut carousel = CarouselWindow::default();
        carousel.observe_buffer(buffer.len());

        carousel.request_advance(start);
        buffer.append(batch(2..10)).unwrap();
        carousel.observe_buffer(buffer.len());

        let view = carousel.view(&buffer, start + 250 * MS);
        assert!(view.input_locked);
        assert!(view.slide_offset() < 0.0);
        assert!(view.cards[4].slot.item().is_none());

        carousel.tick(start + 500 * MS, buffer.len());
        let view = carousel.view(&buffer, start + 500 * MS);
        assert_eq!(view.displayed_index, 1);
        assert!(view.cards[4].slot.item().is_some());
    }

    #[test]
    fn test_view_marks_resolved_card_expanded() {
        let mut buffer = buffer(3);
        let now = Utc::now();
        buffer
            .record_result(
                0,
                SubmissionResult {
                    familiarity: 50,
                    next_practice_at: now,
                    practice_at: now,
                    practice_count: PracticeCount::Count(2),
                },
            )
            .unwrap();

        let mut carousel = CarouselWindow::default();
        carousel.observe_buffer(buffer.len());
        let view = carousel.view(&buffer, Instant::now());

        assert!(view.cards[2].expanded);
        assert!(view.cards[2].locked);
        assert!(!view.cards[3].expanded);
    }

    #[test]
    fn test_progress_is_time_bounded() {
        let start = Instant::now();
        let mut carousel = CarouselWindow::default();
        assert_eq!(carousel.progress(start), None);

        carousel.request_advance(start);
        assert_eq!(carousel.progress(start), Some(0.0));
        assert_eq!(carousel.progress(start + 2_000 * MS), Some(1.0));
    }
}
