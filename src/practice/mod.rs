//! Practice session engine: the item buffer, the five-card carousel, outcome
//! submission and the controller tying them to background tasks.

pub mod buffer;
pub mod carousel;
pub mod controller;
pub mod rewards;
pub mod submitter;

pub use buffer::SequenceBuffer;
pub use carousel::CarouselWindow;
pub use controller::{
    Notice,
    PracticeController,
    PracticeTasks,
    Screen,
    SubmitDecision,
};
pub use rewards::{
    RewardEmitter,
    RewardQueue,
};
pub use submitter::{
    ResultSubmitter,
    SubmissionOutcome,
};
