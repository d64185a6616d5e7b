//! `playlog-core`: configuration, shared types and clock arithmetic used by
//! every stage of the recently-played ETL job.

pub mod clock;
pub mod config;
pub mod error;
pub mod types;

pub use config::PlaylogConfig;
pub use error::{PlaylogError, Result};
pub use types::{PlayRecord, RawItem};
