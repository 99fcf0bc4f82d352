//! Completion and status engine.
//!
//! Sits between the HTTP surface and the repos: validates input, derives
//! per-date playlist status, and orchestrates the date-scoped completion
//! operations.

pub mod engine;
pub mod error;
mod replace;
pub mod status;
pub mod views;

pub use engine::{CreatePlaylist, DesiredTask, PlaylistEngine, ResetOutcome, TaskSpec, UpdatePlaylist};
pub use error::EngineError;
pub use views::{PlaylistView, TaskView};
