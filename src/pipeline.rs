//! Report Pipeline
//!
//! Resolve the ended call, then fetch the report generated for it.

use crate::config::ReportConfig;
use crate::error::{ReportError, Result};
use crate::report::{HttpReportClient, InterviewReport, ReportSource};
use crate::resolver::{CallResolver, ResolutionRequest};
use crate::status::HttpStatusSource;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Identifiers the caller kept from the interview session
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CallerState {
    pub assistant_id: Option<String>,
    pub resume_id: Option<String>,
    pub call_id: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ResolvedReport {
    pub call_id: String,
    pub report: InterviewReport,
}

pub struct ReportPipeline {
    config: ReportConfig,
    resolver: CallResolver,
    reports: Arc<dyn ReportSource>,
}

impl ReportPipeline {
    pub fn new(config: ReportConfig, resolver: CallResolver, reports: Arc<dyn ReportSource>) -> Self {
        Self {
            config,
            resolver,
            reports,
        }
    }

    /// Pipeline wired to the HTTP status source and report backend named in `config`
    pub fn from_config(config: ReportConfig) -> Self {
        let resolver = CallResolver::new(Arc::new(HttpStatusSource::new(config.status_base_url.clone())));
        let reports = Arc::new(HttpReportClient::new(config.report_base_url.clone()));
        Self::new(config, resolver, reports)
    }

    pub fn resolver(&self) -> &CallResolver {
        &self.resolver
    }

    /// Build the resolution request for `caller`, failing on missing identifiers
    pub fn resolution_request(&self, caller: &CallerState) -> Result<ResolutionRequest> {
        let assistant_id = non_empty(&caller.assistant_id)
            .ok_or_else(|| ReportError::Input("Missing assistantId".to_string()))?;
        if self.config.auth_token.trim().is_empty() {
            return Err(ReportError::Input("Missing API token".to_string()));
        }

        Ok(ResolutionRequest::new(assistant_id, self.config.auth_token.clone())
            .with_target(caller.call_id.clone())
            .with_timings(self.config.timeout, self.config.poll_interval))
    }

    /// Wait for the interview call to end and fetch its report.
    ///
    /// Nothing is retried here; a failed run is retried by the caller.
    pub async fn run(&self, caller: &CallerState, cancel: &CancellationToken) -> Result<ResolvedReport> {
        let resume_id = non_empty(&caller.resume_id)
            .ok_or_else(|| ReportError::Input("Missing assistantId or resumeId".to_string()))?;
        if non_empty(&caller.assistant_id).is_none() {
            return Err(ReportError::Input("Missing assistantId or resumeId".to_string()));
        }
        let request = self.resolution_request(caller)?;

        let resolution = self.resolver.resolve(&request, cancel).await?;

        let report = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(ReportError::Cancelled),
            report = self.reports.fetch_interview_report(&resolution.call_id, resume_id, &self.config.auth_token) => report?,
        };
        info!(
            "Report ready for {} (call {})",
            report.candidate_name, resolution.call_id
        );

        Ok(ResolvedReport {
            call_id: resolution.call_id,
            report,
        })
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}
