pub mod errors;
pub mod http;
pub mod models;
pub mod settings;
pub mod tasks;

pub use errors::PracticeError;
pub use models::{
    ContentSnapshot,
    ItemId,
    Outcome,
    PracticeItem,
    SessionId,
    SessionInfo,
};
pub use settings::Settings;
