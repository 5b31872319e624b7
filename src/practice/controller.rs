use std::{
    collections::VecDeque,
    time::{
        Duration,
        Instant,
    },
};

use tracing::{
    debug,
    error,
    info,
    warn,
};

use super::{
    buffer::SequenceBuffer,
    carousel::{
        CarouselWindow,
        TapOutcome,
        WindowView,
    },
    rewards::RewardEmitter,
    submitter::SubmissionOutcome,
};
use crate::core::{
    models::{
        ItemId,
        Outcome,
        PracticeItem,
        SequencePosition,
        SessionId,
        SessionInfo,
    },
    tasks::{
        types::SessionLoadResult,
        TaskResult,
        Ticket,
    },
    PracticeError,
};

/// Commands the controller issues to whatever runs its network work.
pub trait PracticeTasks {
    fn load_session(&self, ticket: Ticket, session_id: SessionId, count: usize);
    fn fetch_batch(&self, ticket: Ticket, session_id: SessionId, count: usize);
    fn submit_outcome(&self, ticket: Ticket, session_id: SessionId, item_id: ItemId, outcome: Outcome);
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Screen {
    NotStarted,
    Loading,
    Ready,
    Finished,
    Aborted { reason: String },
    SignedOut,
}

/// User-facing error notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub title: String,
    pub message: String,
    pub details: Option<String>,
}

impl Notice {
    fn from_error(message: impl Into<String>, error: &PracticeError) -> Self {
        Self {
            title: error.title().to_string(),
            message: message.into(),
            details: Some(error.to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitDecision {
    Sent(Ticket),
    NotReady,
    InFlight,
    Sliding,
    NoItem,
    AlreadyResolved,
}

/// Orchestrates one practice session.
///
/// All state lives on the caller's thread. Network work goes out through
/// [`PracticeTasks`] and comes back through [`Self::handle_task_result`]; every
/// result carries the [`Ticket`] it was issued with and is dropped if the session
/// has moved on since.
pub struct PracticeController<T: PracticeTasks, R: RewardEmitter> {
    tasks: T,
    rewards: R,
    buffer: SequenceBuffer,
    carousel: CarouselWindow,
    batch_size: usize,
    session_id: Option<SessionId>,
    session: Option<SessionInfo>,
    generation: u64,
    screen: Screen,
    load_error: Option<String>,
    pending_submission: Option<Ticket>,
    points: i64,
    notices: VecDeque<Notice>,
}

impl<T: PracticeTasks, R: RewardEmitter> PracticeController<T, R> {
    pub fn new(tasks: T, rewards: R, batch_size: usize, slide_duration: Duration) -> Self {
        Self {
            tasks,
            rewards,
            buffer: SequenceBuffer::new(batch_size),
            carousel: CarouselWindow::new(slide_duration),
            batch_size: batch_size.max(1),
            session_id: None,
            session: None,
            generation: 0,
            screen: Screen::NotStarted,
            load_error: None,
            pending_submission: None,
            points: 0,
            notices: VecDeque::new(),
        }
    }

    /// Starts (or restarts) a session. Anything still in flight for an earlier
    /// session is ignored when it lands.
    pub fn initialize(&mut self, session_id: SessionId) {
        self.reset();
        self.session_id = Some(session_id.clone());
        self.screen = Screen::Loading;

        let count = self.buffer.begin_prefetch().unwrap_or(self.batch_size);
        info!(session = %session_id, generation = self.generation, count, "loading session");
        self.tasks.load_session(self.ticket(0), session_id, count);
    }

    /// Leaves the current session and returns to the not-started screen.
    pub fn reset(&mut self) {
        self.generation += 1;
        self.buffer = SequenceBuffer::new(self.batch_size);
        self.carousel.reset();
        self.session = None;
        self.session_id = None;
        self.screen = Screen::NotStarted;
        self.load_error = None;
        self.pending_submission = None;
        self.points = 0;
    }

    pub fn submit_outcome(&mut self, outcome: Outcome) -> SubmitDecision {
        if self.screen != Screen::Ready {
            return SubmitDecision::NotReady;
        }
        // One submission at a time, across all positions.
        if self.pending_submission.is_some() {
            debug!(?outcome, "submission ignored, another is in flight");
            return SubmitDecision::InFlight;
        }
        if self.carousel.is_transitioning() {
            return SubmitDecision::Sliding;
        }

        let position = self.buffer.cursor();
        let Some(item) = self.buffer.item_at(position) else {
            return SubmitDecision::NoItem;
        };
        if item.is_resolved() {
            debug!("{}", PracticeError::SubmissionConflict(position));
            return SubmitDecision::AlreadyResolved;
        }
        let Some(session_id) = self.session_id.clone() else {
            return SubmitDecision::NotReady;
        };

        let item_id = item.item_id.clone();
        let ticket = self.ticket(position);
        self.pending_submission = Some(ticket);
        info!(position, monster = %item_id, ?outcome, "submitting outcome");
        self.tasks.submit_outcome(ticket, session_id, item_id, outcome);
        SubmitDecision::Sent(ticket)
    }

    pub fn handle_task_result(&mut self, result: TaskResult, now: Instant) {
        let ticket = result.ticket();
        if ticket.generation != self.generation {
            debug!(
                task_type = result.task_type(),
                generation = ticket.generation,
                current = self.generation,
                "stale result dropped"
            );
            return;
        }

        match result {
            TaskResult::SessionLoaded { result, .. } => self.on_session_loaded(result),
            TaskResult::BatchFetched { result, .. } => self.on_batch_fetched(result),
            TaskResult::OutcomeSubmitted { ticket, result } => {
                self.on_outcome_submitted(ticket, result, now)
            }
        }
    }

    fn on_session_loaded(&mut self, result: SessionLoadResult) {
        if self.screen != Screen::Loading {
            debug!("session load result ignored, screen is {:?}", self.screen);
            return;
        }

        match result {
            Ok((info, items)) => {
                info!(session = %info.id, name = %info.name, items = items.len(), "session loaded");
                self.session = Some(info);
                match self.buffer.complete_prefetch(items) {
                    Ok(_) => {
                        self.screen = Screen::Ready;
                        self.carousel.observe_buffer(self.buffer.len());
                        self.check_finished();
                    }
                    Err(e) => self.abort(e),
                }
            }
            Err(e) => {
                self.buffer.fail_prefetch();
                if e.is_auth() {
                    self.sign_out(&e);
                    return;
                }
                error!("failed to load session: {e}");
                self.load_error = Some(e.to_string());
                self.notices.push_back(Notice::from_error("Unable to load this practice session", &e));
            }
        }
    }

    fn on_batch_fetched(&mut self, result: Result<Vec<PracticeItem>, PracticeError>) {
        if !self.buffer.is_prefetching() || self.screen != Screen::Ready {
            debug!("batch result ignored, no prefetch outstanding");
            return;
        }

        match result {
            Ok(items) => match self.buffer.complete_prefetch(items) {
                Ok(appended) => {
                    debug!(appended, len = self.buffer.len(), "prefetch merged");
                    self.carousel.observe_buffer(self.buffer.len());
                    self.check_finished();
                }
                Err(e) => self.abort(e),
            },
            Err(e) => {
                self.buffer.fail_prefetch();
                if e.is_auth() {
                    self.sign_out(&e);
                    return;
                }
                warn!("prefetch failed: {e}");
                self.notices.push_back(Notice::from_error("Unable to load more monsters", &e));
            }
        }
    }

    fn on_outcome_submitted(
        &mut self,
        ticket: Ticket,
        result: Result<SubmissionOutcome, PracticeError>,
        now: Instant,
    ) {
        if self.pending_submission != Some(ticket) {
            debug!(position = ticket.position, "submission result does not match pending request");
            return;
        }
        self.pending_submission = None;

        match result {
            Ok(outcome) => {
                if let Err(e) = self.buffer.record_result(ticket.position, outcome.result) {
                    // Conflicts are not user-visible.
                    debug!("merge skipped: {e}");
                    return;
                }
                self.points += outcome.points;
                self.rewards.show(outcome.points);
                self.advance(now);
            }
            Err(e) => {
                if e.is_auth() {
                    self.sign_out(&e);
                    return;
                }
                warn!(position = ticket.position, "submission failed: {e}");
                self.notices.push_back(Notice::from_error("Your answer was not saved, try again", &e));
            }
        }
    }

    fn advance(&mut self, now: Instant) {
        if !self.carousel.request_advance(now) {
            warn!(cursor = self.buffer.cursor(), "advance rejected by carousel");
            return;
        }
        if self.buffer.advance_cursor() {
            self.start_prefetch();
        }
    }

    fn start_prefetch(&mut self) {
        let Some(session_id) = self.session_id.clone() else {
            return;
        };
        if let Some(count) = self.buffer.begin_prefetch() {
            let ticket = self.ticket(self.buffer.len() as SequencePosition);
            debug!(from = ticket.position, count, "prefetching");
            self.tasks.fetch_batch(ticket, session_id, count);
        }
    }

    /// Retries a failed fetch when the cursor has caught up with the loaded items.
    pub fn retry_prefetch(&mut self) {
        if self.is_stalled() {
            self.start_prefetch();
        }
    }

    /// True when the learner has reached the end of loaded items, more content exists,
    /// and nothing is on its way.
    pub fn is_stalled(&self) -> bool {
        self.screen == Screen::Ready
            && self.buffer.remaining() == 0
            && !self.buffer.is_exhausted()
            && !self.buffer.is_prefetching()
    }

    /// Advances animation time. Call once per frame.
    pub fn tick(&mut self, now: Instant) {
        if self.carousel.tick(now, self.buffer.len()) {
            self.check_finished();
        }
    }

    pub fn tap(&mut self, position: SequencePosition) -> TapOutcome {
        let resolved = self.buffer.item_at(position).is_some_and(|item| item.is_resolved());
        self.carousel.tap(position, resolved)
    }

    /// Toggles the card currently on display.
    pub fn tap_displayed(&mut self) -> TapOutcome {
        self.tap(self.carousel.displayed_index())
    }

    pub fn view(&self, now: Instant) -> WindowView<'_> {
        self.carousel.view(&self.buffer, now)
    }

    fn check_finished(&mut self) {
        if self.screen == Screen::Ready
            && self.buffer.is_finished()
            && !self.carousel.is_transitioning()
        {
            info!(resolved = self.buffer.resolved_count(), points = self.points, "session finished");
            self.screen = Screen::Finished;
        }
    }

    fn abort(&mut self, e: PracticeError) {
        error!("session aborted: {e}");
        self.generation += 1;
        self.pending_submission = None;
        self.screen = Screen::Aborted { reason: e.to_string() };
        self.notices.push_back(Notice::from_error("This practice session had to stop", &e));
    }

    fn sign_out(&mut self, e: &PracticeError) {
        warn!("signed out: {e}");
        self.generation += 1;
        self.pending_submission = None;
        self.screen = Screen::SignedOut;
        self.notices.push_back(Notice::from_error("Please sign in again", e));
    }

    fn ticket(&self, position: SequencePosition) -> Ticket {
        Ticket { generation: self.generation, position }
    }

    pub fn take_notices(&mut self) -> Vec<Notice> {
        self.notices.drain(..).collect()
    }

    pub fn screen(&self) -> &Screen {
        &self.screen
    }

    pub fn load_error(&self) -> Option<&str> {
        self.load_error.as_deref()
    }

    pub fn session(&self) -> Option<&SessionInfo> {
        self.session.as_ref()
    }

    pub fn session_id(&self) -> Option<&SessionId> {
        self.session_id.as_ref()
    }

    pub fn tasks_mut(&mut self) -> &mut T {
        &mut self.tasks
    }

    pub fn buffer(&self) -> &SequenceBuffer {
        &self.buffer
    }

    pub fn carousel(&self) -> &CarouselWindow {
        &self.carousel
    }

    pub fn rewards(&self) -> &R {
        &self.rewards
    }

    pub fn rewards_mut(&mut self) -> &mut R {
        &mut self.rewards
    }

    pub fn points(&self) -> i64 {
        self.points
    }

    pub fn is_submitting(&self) -> bool {
        self.pending_submission.is_some()
    }

    pub fn can_submit(&self) -> bool {
        self.screen == Screen::Ready
            && self.pending_submission.is_none()
            && !self.carousel.is_transitioning()
            && self.buffer.item_at_cursor().is_some_and(|item| !item.is_resolved())
    }

    /// Whether the UI should keep repainting without input.
    pub fn is_busy(&self) -> bool {
        self.carousel.is_transitioning()
            || self.pending_submission.is_some()
            || self.buffer.is_prefetching()
            || self.screen == Screen::Loading
    }
}
