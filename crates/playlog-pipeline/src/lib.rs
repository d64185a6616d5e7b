//! `playlog-pipeline`: one ETL run (fetch, then transform, then load).

pub mod error;
pub mod outcome;
pub mod pipeline;

pub use error::{ErrorClass, PipelineError};
pub use outcome::RunOutcome;
pub use pipeline::Pipeline;
