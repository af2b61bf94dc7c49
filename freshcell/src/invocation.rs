//! Execution of a single producer invocation.
//!
//! The producer runs on its own task. An invocation only listens to that
//! task: it races the task's [`JoinHandle`] against the cancellation token,
//! applies the cell's [`TimeoutPolicy`] and turns producer panics into a
//! terminal outcome, so that a generation always resolves. When the listener
//! gives up, the handle is dropped and the producer keeps running detached.

use std::any::Any;
use std::time::Instant;

use freshcell_core::CellError;
use tokio::task::{JoinError, JoinHandle};
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::config::TimeoutPolicy;
use crate::slot::Outcome;

/// Wait for the producer task behind `producer` to reach a terminal outcome.
///
/// Cancellation of `token` wins over a producer that is still running, even
/// if the producer never looks at the token.
pub(crate) async fn run<T, E>(
    producer: JoinHandle<Result<T, E>>,
    token: &CancellationToken,
    policy: &TimeoutPolicy,
) -> Outcome<T, E> {
    match policy {
        TimeoutPolicy::None => race(producer, token).await,
        TimeoutPolicy::Cancel(duration) => {
            match tokio::time::timeout(*duration, race(producer, token)).await {
                Ok(outcome) => outcome,
                Err(_) => {
                    warn!(
                        timeout_ms = duration.as_millis(),
                        "Producer invocation cancelled due to timeout"
                    );
                    token.cancel();
                    Err(CellError::Cancelled)
                }
            }
        }
        TimeoutPolicy::Warn(duration) => {
            let start = Instant::now();
            let outcome = race(producer, token).await;
            let elapsed = start.elapsed();
            if elapsed > *duration {
                warn!(
                    elapsed_ms = elapsed.as_millis(),
                    threshold_ms = duration.as_millis(),
                    "Producer invocation exceeded timeout threshold"
                );
            }
            outcome
        }
    }
}

async fn race<T, E>(
    producer: JoinHandle<Result<T, E>>,
    token: &CancellationToken,
) -> Outcome<T, E> {
    tokio::select! {
        biased;
        _ = token.cancelled() => Err(CellError::Cancelled),
        joined = producer => match joined {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(error)) => Err(CellError::producer(error)),
            Err(error) => Err(join_error(error)),
        },
    }
}

/// A panicking producer keeps its message; a task aborted by runtime
/// shutdown counts as cancelled.
fn join_error<E>(error: JoinError) -> CellError<E> {
    match error.try_into_panic() {
        Ok(payload) => CellError::Panicked(panic_message(payload.as_ref())),
        Err(_) => CellError::Cancelled,
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_owned()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_owned()
    }
}

/// Label of an outcome for logs and metrics.
pub(crate) fn outcome_label<T, E>(outcome: &Outcome<T, E>) -> &'static str {
    match outcome {
        Ok(_) => "success",
        Err(CellError::Disposed) => "disposed",
        Err(CellError::NoRuntime) => "no_runtime",
        Err(CellError::Cancelled) => "cancelled",
        Err(CellError::Producer(_)) => "producer_error",
        Err(CellError::Panicked(_)) => "panicked",
    }
}
