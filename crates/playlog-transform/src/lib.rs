//! `playlog-transform`: turns a fetched batch into validated
//! [`playlog_core::PlayRecord`]s for the target day.

pub mod error;
pub mod transform;

pub use error::{RecordField, TransformError};
pub use transform::{transform, transform_for_day, TransformOutcome};
