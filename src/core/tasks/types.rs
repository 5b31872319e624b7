use crate::{
    core::{
        models::{
            PracticeItem,
            SequencePosition,
            SessionInfo,
        },
        PracticeError,
    },
    practice::SubmissionOutcome,
};

/// Tags every background request with the state it was issued against, so a late
/// answer can be matched (or discarded) when it comes back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Ticket {
    pub generation: u64,
    pub position: SequencePosition,
}

pub type SessionLoadResult = Result<(SessionInfo, Vec<PracticeItem>), PracticeError>;

#[derive(Debug)]
pub enum TaskResult {
    SessionLoaded { ticket: Ticket, requested: usize, result: SessionLoadResult },
    BatchFetched { ticket: Ticket, requested: usize, result: Result<Vec<PracticeItem>, PracticeError> },
    OutcomeSubmitted { ticket: Ticket, result: Result<SubmissionOutcome, PracticeError> },
}

impl TaskResult {
    pub fn ticket(&self) -> Ticket {
        match self {
            TaskResult::SessionLoaded { ticket, .. }
            | TaskResult::BatchFetched { ticket, .. }
            | TaskResult::OutcomeSubmitted { ticket, .. } => *ticket,
        }
    }

    pub fn task_type(&self) -> &'static str {
        match self {
            TaskResult::SessionLoaded { .. } => "session_loaded",
            TaskResult::BatchFetched { .. } => "batch_fetched",
            TaskResult::OutcomeSubmitted { .. } => "outcome_submitted",
        }
    }
}
