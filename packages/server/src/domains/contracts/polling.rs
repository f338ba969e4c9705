//! Bounded status polling for one extraction job.

use std::time::Duration;
use tracing::{debug, warn};

use super::error::LifecycleError;
use super::models::ContractId;
use super::orchestrator::{resolve_done, Resolution};
use crate::kernel::{BaseExtractionClient, JobState};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);
pub const DEFAULT_POLL_MAX_ATTEMPTS: u32 = 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollingConfig {
    /// Sleep before each status query
    pub interval: Duration,
    /// Status queries before giving up; `interval * max_attempts` is the effective timeout
    pub max_attempts: u32,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            max_attempts: DEFAULT_POLL_MAX_ATTEMPTS,
        }
    }
}

/// Poll `job_id` until the provider reports a terminal state or the attempt
/// budget runs out. Never touches the store: the caller applies the resolution.
///
/// Query errors are logged and count as an attempt.
pub async fn poll_job(
    client: &dyn BaseExtractionClient,
    contract_id: ContractId,
    job_id: &str,
    config: PollingConfig,
) -> Resolution {
    for attempt in 1..=config.max_attempts {
        tokio::time::sleep(config.interval).await;

        let report = match client.query_status(job_id).await {
            Ok(report) => report,
            Err(e) => {
                warn!(
                    contract_id = %contract_id,
                    job_id,
                    attempt,
                    error = %e,
                    "Status query failed, retrying"
                );
                continue;
            }
        };

        match report.state {
            JobState::Done => {
                debug!(contract_id = %contract_id, job_id, attempt, "Job done");
                return resolve_done(client, report.result_location.as_ref()).await;
            }
            JobState::Failed => {
                return Resolution::Failed(LifecycleError::provider(report.error_message));
            }
            JobState::Pending | JobState::Running => match report.progress {
                Some(progress) if progress.total_pages > 0 => debug!(
                    contract_id = %contract_id,
                    job_id,
                    attempt,
                    state = report.state.as_str(),
                    extracted_pages = progress.extracted_pages,
                    total_pages = progress.total_pages,
                    "Job in progress"
                ),
                _ => debug!(
                    contract_id = %contract_id,
                    job_id,
                    attempt,
                    state = report.state.as_str(),
                    "Job not finished"
                ),
            },
        }
    }

    warn!(
        contract_id = %contract_id,
        job_id,
        attempts = config.max_attempts,
        "Polling budget exhausted"
    );
    Resolution::Failed(LifecycleError::Timeout {
        attempts: config.max_attempts,
    })
}
