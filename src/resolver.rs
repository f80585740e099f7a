//! Call Resolver
//!
//! Polls the status source until the call a report depends on has ended.
//! A caller that knows which call it started pins resolution to that id;
//! otherwise the most recently concluded call for the assistant is used.

use crate::clock::{Clock, TokioClock};
use crate::error::{ReportError, Result};
use crate::record::select_candidate;
use crate::status::StatusSource;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn, Instrument};

/// Inputs for one resolution
#[derive(Debug, Clone)]
pub struct ResolutionRequest {
    pub owner_id: String,
    pub target_id: Option<String>,
    pub auth_token: String,
    pub timeout: Duration,
    pub poll_interval: Duration,
}

impl ResolutionRequest {
    pub fn new(owner_id: impl Into<String>, auth_token: impl Into<String>) -> Self {
        Self {
            owner_id: owner_id.into(),
            target_id: None,
            auth_token: auth_token.into(),
            timeout: Duration::from_millis(crate::config::DEFAULT_TIMEOUT_MS),
            poll_interval: Duration::from_millis(crate::config::DEFAULT_POLL_INTERVAL_MS),
        }
    }

    /// Pin resolution to a known call. An empty id leaves it unpinned.
    pub fn with_target(mut self, target_id: Option<String>) -> Self {
        self.target_id = target_id.filter(|id| !id.trim().is_empty());
        self
    }

    pub fn with_timings(mut self, timeout: Duration, poll_interval: Duration) -> Self {
        self.timeout = timeout;
        self.poll_interval = poll_interval;
        self
    }

    fn validate(&self) -> Result<()> {
        if self.owner_id.trim().is_empty() {
            return Err(ReportError::Input("Missing assistant id".to_string()));
        }
        if self.auth_token.trim().is_empty() {
            return Err(ReportError::Input("Missing API token".to_string()));
        }
        if self.timeout.is_zero() {
            return Err(ReportError::Input("Timeout must be greater than zero".to_string()));
        }
        if self.poll_interval.is_zero() {
            return Err(ReportError::Input("Poll interval must be greater than zero".to_string()));
        }
        if self.poll_interval >= self.timeout {
            warn!(
                "Poll interval {:?} is not shorter than timeout {:?}; at most one poll will run",
                self.poll_interval, self.timeout
            );
        }
        Ok(())
    }
}

/// Successful resolution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub call_id: String,
    /// Number of status queries issued
    pub polls: u32,
    pub elapsed: Duration,
}

#[derive(Debug)]
enum PollState {
    Polling { cycle: u32 },
    Succeeded { call_id: String, polls: u32 },
    TimedOut { polls: u32 },
    Failed(ReportError),
}

pub struct CallResolver {
    source: Arc<dyn StatusSource>,
    clock: Arc<dyn Clock>,
}

impl CallResolver {
    pub fn new(source: Arc<dyn StatusSource>) -> Self {
        Self::with_clock(source, Arc::new(TokioClock))
    }

    pub fn with_clock(source: Arc<dyn StatusSource>, clock: Arc<dyn Clock>) -> Self {
        Self { source, clock }
    }

    /// Wait until the requested call has ended and return its id.
    ///
    /// The deadline is checked between cycles, not during a query, so a slow
    /// status response can carry the total past `request.timeout` by up to
    /// that response's latency. A failed query aborts immediately; only
    /// "nothing ended yet" is retried.
    pub async fn resolve(&self, request: &ResolutionRequest, cancel: &CancellationToken) -> Result<Resolution> {
        request.validate()?;

        let span = tracing::info_span!(
            "resolve_call",
            resolution_id = %uuid::Uuid::new_v4(),
            owner_id = %request.owner_id,
        );
        self.run(request, cancel).instrument(span).await
    }

    async fn run(&self, request: &ResolutionRequest, cancel: &CancellationToken) -> Result<Resolution> {
        let started = self.clock.now();
        let deadline = started + request.timeout;
        info!(
            "Waiting for ended call (target: {}, timeout: {:?}, interval: {:?})",
            request.target_id.as_deref().unwrap_or("most recent"),
            request.timeout,
            request.poll_interval
        );

        let mut state = PollState::Polling { cycle: 0 };
        loop {
            state = match state {
                PollState::Polling { cycle } => self.poll_cycle(request, cancel, deadline, cycle).await,
                PollState::Succeeded { call_id, polls } => {
                    let elapsed = self.clock.now() - started;
                    info!("✅ Call {} ended, resolved after {} polls", call_id, polls);
                    return Ok(Resolution { call_id, polls, elapsed });
                }
                PollState::TimedOut { polls } => {
                    let waited = self.clock.now() - started;
                    warn!("No ended call after {:?} ({} polls)", waited, polls);
                    return Err(ReportError::Timeout {
                        waited_ms: waited.as_millis() as u64,
                        polls,
                    });
                }
                PollState::Failed(e) => {
                    warn!("Call resolution failed: {}", e);
                    return Err(e);
                }
            };
        }
    }

    /// One query-select-wait cycle. `cycle` is the number of queries already issued.
    async fn poll_cycle(
        &self,
        request: &ResolutionRequest,
        cancel: &CancellationToken,
        deadline: Instant,
        cycle: u32,
    ) -> PollState {
        if cancel.is_cancelled() {
            return PollState::Failed(ReportError::Cancelled);
        }
        if self.clock.now() >= deadline {
            return PollState::TimedOut { polls: cycle };
        }

        let polls = cycle + 1;
        let listed = tokio::select! {
            biased;
            _ = cancel.cancelled() => return PollState::Failed(ReportError::Cancelled),
            listed = self.source.list_calls(&request.owner_id, &request.auth_token) => listed,
        };
        // A response that lands after cancellation is discarded.
        if cancel.is_cancelled() {
            return PollState::Failed(ReportError::Cancelled);
        }

        let records = match listed {
            Ok(records) => records,
            Err(e) => return PollState::Failed(e),
        };
        debug!("Poll {} returned {} calls", polls, records.len());

        if let Some(candidate) = select_candidate(&records, request.target_id.as_deref()) {
            if candidate.is_terminal() {
                if let Some(reason) = &candidate.ended_reason {
                    debug!("Call {} ended: {}", candidate.id, reason);
                }
                return PollState::Succeeded {
                    call_id: candidate.id.clone(),
                    polls,
                };
            }
            debug!("Call {} is still {}", candidate.id, candidate.status);
        }

        tokio::select! {
            biased;
            _ = cancel.cancelled() => PollState::Failed(ReportError::Cancelled),
            _ = self.clock.sleep(request.poll_interval) => PollState::Polling { cycle: polls },
        }
    }
}
