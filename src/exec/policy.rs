// src/exec/policy.rs

//! Timeout and retry decoration of process activations.
//!
//! - The deadline is armed when an activation launches and is enforced by
//!   its driver, which owns the process and can force-kill it.
//! - Retries wrap whole activations: after a nonzero exit, wait, then
//!   re-resolve and launch a brand-new process. Nothing carries over from a
//!   failed attempt except the attempt counter.

use std::future;
use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use futures::stream::{self, BoxStream};
use tokio::time;
use tracing::{info, warn};

use crate::exec::executor::Executor;
use crate::exec::request::SpawnRequest;
use crate::exec::stream::{EventItem, ProcessStream, Subscription};

/// A decorated, single-consumer process event stream.
pub type EventStream = BoxStream<'static, EventItem>;

/// Resolves after `deadline`, or never.
pub(crate) async fn deadline_timer(deadline: Option<Duration>) {
    match deadline {
        Some(after) => time::sleep(after).await,
        None => future::pending().await,
    }
}

struct RetryState {
    executor: Executor,
    request: Arc<SpawnRequest>,
    attempt: u32,
    current: Option<Subscription>,
    done: bool,
}

impl RetryState {
    fn max_attempts(&self) -> u32 {
        self.request.options.retries.saturating_add(1)
    }
}

/// Run `request` with its retry policy applied.
///
/// Output of every attempt is passed through (tagged with its attempt
/// number); only the final failure is surfaced. Errors other than a nonzero
/// exit end the stream on first occurrence.
pub fn with_retry(executor: Executor, request: Arc<SpawnRequest>) -> EventStream {
    let state = RetryState {
        executor,
        request,
        attempt: 1,
        current: None,
        done: false,
    };

    stream::unfold(state, |mut st| async move {
        if st.done {
            return None;
        }
        loop {
            let subscription = st.current.get_or_insert_with(|| {
                ProcessStream::new(st.executor.clone(), Arc::clone(&st.request), st.attempt)
                    .subscribe()
            });

            match subscription.next().await {
                Some(Ok(event)) => return Some((Ok(event), st)),
                None => return None,
                Some(Err(err)) if err.is_retryable() && st.attempt < st.max_attempts() => {
                    let delay = st.request.options.effective_retry_delay();
                    warn!(
                        exe = %st.request.executable,
                        attempt = st.attempt,
                        exit_code = ?err.exit_code,
                        ?delay,
                        "process failed; retrying"
                    );
                    st.current = None;
                    time::sleep(delay).await;
                    st.attempt += 1;
                }
                Some(Err(err)) => {
                    if st.attempt > 1 {
                        info!(
                            exe = %st.request.executable,
                            attempts = st.attempt,
                            "giving up after final attempt"
                        );
                    }
                    st.done = true;
                    return Some((Err(err), st));
                }
            }
        }
    })
    .boxed()
}
