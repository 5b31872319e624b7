pub mod app;
mod carousel_view;
pub mod error_modal;
pub mod message_overlay;
mod reward_overlay;
pub mod theme;
pub mod top_bar;

pub use app::PracticeApp;
