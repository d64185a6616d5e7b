//! `playlog-store`: SQLite persistence for played tracks.

pub mod db;
pub mod error;
pub mod store;
pub mod types;

pub use error::{Result, StoreError};
pub use store::PlayedTracksStore;
pub use types::{DaySummary, LoadOutcome};
