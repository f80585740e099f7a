pub mod clock;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod record;
pub mod report;
pub mod resolver;
pub mod status;

pub use config::ReportConfig;
pub use error::{ReportError, Result};
pub use pipeline::{CallerState, ReportPipeline, ResolvedReport};
pub use record::RemoteRecord;
pub use report::{InterviewReport, ResumeReport};
pub use resolver::{CallResolver, Resolution, ResolutionRequest};
