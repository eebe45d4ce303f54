//! Job polling: drives a submitted command to a terminal outcome.

use tonx_types::wire::{CommandGetRequest, CommandRecord};
use tracing::debug;

use crate::transport::{retry_with_backoff, sleep_millis, RelayTransport, RequestMeta, TransportError};

/// Terminal outcome of polling one submitted job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    Completed { result: String },
    Rejected,
    Expired,
}

/// Polls `command_get` until the job reaches a terminal state. There is no
/// client-side deadline: the job carries its own expiry and the relay
/// reports `expired` once it lapses. The retry budget bounds transport
/// failures only, never a legitimate `submitted` response.
///
/// An `empty` record means the relay dropped the job and reads as expired.
/// Any record carrying a job blob other than the one submitted belongs to a
/// different request and reads as rejected, even when reported completed.
pub async fn await_job_state<T: RelayTransport>(
    transport: &T,
    appk: &str,
    submitted_job: &str,
    meta: RequestMeta,
    poll_delay_ms: u64,
) -> Result<JobOutcome, TransportError> {
    loop {
        let record = retry_with_backoff(meta.clone(), || async {
            transport
                .command_get(CommandGetRequest {
                    appk: appk.to_string(),
                })
                .await
        })
        .await?;
        match record {
            CommandRecord::Empty => return Ok(JobOutcome::Expired),
            CommandRecord::Submitted { job } => {
                if job != submitted_job {
                    return Ok(JobOutcome::Rejected);
                }
                debug!(appk, "job still submitted");
                sleep_millis(poll_delay_ms).await;
            }
            CommandRecord::Completed { job, result } => {
                return Ok(if job == submitted_job {
                    JobOutcome::Completed { result }
                } else {
                    JobOutcome::Rejected
                });
            }
            CommandRecord::Rejected { .. } => return Ok(JobOutcome::Rejected),
            CommandRecord::Expired => return Ok(JobOutcome::Expired),
        }
    }
}
