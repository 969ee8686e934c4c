pub mod checkpoint;
pub mod clear_cache;
pub mod cli;
pub mod config;
pub mod error;
pub mod manifest;
pub mod network_config;
pub mod process;
pub mod target;
pub mod tools;
pub mod workflow;

pub use config::Config;
pub use error::{PatchError, Result};
pub use target::Target;
pub use workflow::{PatchOutcome, PatchPipeline, PatchReport, PipelineStage};
