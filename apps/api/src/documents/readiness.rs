//! Readiness Poller — waits until the remote store reports a file as ACTIVE.
//!
//! Each check is a suspension point (`tokio::time::sleep`), never a busy wait.
//! The wait is bounded by `PollPolicy::max_attempts`.

use std::time::Duration;

use tracing::{debug, info};

use crate::errors::AppError;
use crate::llm_client::{CredentialScope, FileState, LlmClient, RemoteFile};

#[derive(Debug, Clone, Copy)]
pub struct PollPolicy {
    pub interval: Duration,
    /// Multiplier applied to the interval after every poll; values below 1.0 act as 1.0.
    pub backoff: f64,
    pub max_interval: Duration,
    pub max_attempts: u32,
}

impl PollPolicy {
    /// Never panics: an interval that cannot be represented saturates at the ceiling.
    fn next_interval(&self, current: Duration) -> Duration {
        let ceiling = self.max_interval.max(self.interval);
        Duration::try_from_secs_f64(current.as_secs_f64() * self.backoff.max(1.0))
            .map(|next| next.min(ceiling))
            .unwrap_or(ceiling)
    }
}

/// Polls `name` under `scope` until it is ACTIVE.
///
/// - unknown file → `NotFound`
/// - FAILED or unspecified state → `Upstream`
/// - still pending after `max_attempts` checks → `Upstream`
pub async fn wait_until_active(
    llm: &LlmClient,
    scope: CredentialScope,
    name: &str,
    policy: PollPolicy,
) -> Result<RemoteFile, AppError> {
    info!("Waiting for file {name} to become ACTIVE");

    let file = llm
        .get_file(scope, name)
        .await?
        .ok_or_else(|| not_found(name))?;
    poll_until_active(llm, file, policy).await
}

/// Like `wait_until_active`, for a name that may belong to either scope.
/// The primary scope is searched first, then the alternate one when configured.
pub async fn wait_until_active_in_any_scope(
    llm: &LlmClient,
    name: &str,
    policy: PollPolicy,
) -> Result<RemoteFile, AppError> {
    info!("Waiting for file {name} to become ACTIVE");

    for scope in [CredentialScope::Primary, CredentialScope::Alternate] {
        if !llm.supports_scope(scope) {
            continue;
        }
        match llm.get_file(scope, name).await? {
            Some(file) => return poll_until_active(llm, file, policy).await,
            None => debug!("File {name} is not known under the {scope} scope"),
        }
    }

    Err(not_found(name))
}

/// Continues from a first observation; later checks use the scope stamped on `file`.
async fn poll_until_active(
    llm: &LlmClient,
    mut file: RemoteFile,
    policy: PollPolicy,
) -> Result<RemoteFile, AppError> {
    let max_attempts = policy.max_attempts.max(1);
    let mut interval = policy.interval;
    let scope = file.scope;
    let name = file.name.clone();

    for attempt in 1..=max_attempts {
        if attempt > 1 {
            file = llm
                .get_file(scope, &name)
                .await?
                .ok_or_else(|| not_found(&name))?;
        }

        match file.state {
            FileState::Active => {
                info!("File {} is ACTIVE after {} check(s)", file.name, attempt);
                return Ok(file);
            }
            FileState::Pending | FileState::Processing => {
                debug!(
                    "File {} is {:?} (check {}/{}), next check in {}ms",
                    file.name,
                    file.state,
                    attempt,
                    max_attempts,
                    interval.as_millis()
                );
                if attempt < max_attempts {
                    tokio::time::sleep(interval).await;
                    interval = policy.next_interval(interval);
                }
            }
            FileState::Failed | FileState::StateUnspecified => {
                return Err(AppError::Upstream(format!(
                    "File {} failed to process",
                    file.name
                )));
            }
        }
    }

    Err(AppError::Upstream(format!(
        "File {name} was not ready after {max_attempts} checks"
    )))
}

fn not_found(name: &str) -> AppError {
    AppError::NotFound(format!("File {name} not found"))
}
