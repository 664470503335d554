pub mod config;
pub mod errors;

pub use config::Settings;
pub use errors::PipelineError;
