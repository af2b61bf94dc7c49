//! Deterministic producers for driving cells from tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use freshcell::{CancellationToken, Producer};
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TestError {
    #[error("producer failed")]
    Boom,
    #[error("test dropped the call without answering")]
    Abandoned,
}

/// A producer invocation waiting for the test to answer it.
#[derive(Debug)]
pub struct Call {
    /// 1-based order in which the producer was called.
    pub index: usize,
    /// The token the cell handed to this invocation.
    pub token: CancellationToken,
    reply: oneshot::Sender<Result<u32, TestError>>,
}

impl Call {
    pub fn succeed(self, value: u32) {
        // The invocation may already be gone after being cancelled.
        let _ = self.reply.send(Ok(value));
    }

    pub fn fail(self, error: TestError) {
        let _ = self.reply.send(Err(error));
    }
}

/// A producer that reports every call on the returned channel and returns
/// whatever the test answers.
pub fn controlled() -> (
    impl Producer<Value = u32, Error = TestError>,
    mpsc::UnboundedReceiver<Call>,
) {
    let (calls, receiver) = mpsc::unbounded_channel();
    let counter = Arc::new(AtomicUsize::new(0));

    let producer = move |token: CancellationToken| {
        let calls = calls.clone();
        let counter = Arc::clone(&counter);
        async move {
            let index = counter.fetch_add(1, Ordering::SeqCst) + 1;
            let (reply, answer) = oneshot::channel();
            let _ = calls.send(Call {
                index,
                token,
                reply,
            });
            answer.await.unwrap_or(Err(TestError::Abandoned))
        }
    };

    (producer, receiver)
}

/// A producer returning 1, 2, 3, ... after a short delay, honoring its token.
pub fn counting(
    delay: Duration,
) -> (
    impl Producer<Value = u32, Error = TestError>,
    Arc<AtomicUsize>,
) {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);

    let producer = move |token: CancellationToken| {
        let counter = Arc::clone(&counter);
        async move {
            let value = counter.fetch_add(1, Ordering::SeqCst) + 1;
            tokio::select! {
                _ = token.cancelled() => Err(TestError::Abandoned),
                _ = tokio::time::sleep(delay) => Ok(value as u32),
            }
        }
    };

    (producer, calls)
}

/// Receive the next producer call, failing the test if none arrives.
pub async fn next_call(calls: &mut mpsc::UnboundedReceiver<Call>) -> Call {
    tokio::time::timeout(Duration::from_secs(5), calls.recv())
        .await
        .expect("producer was not called in time")
        .expect("producer channel closed")
}

/// Assert that `slot` stays pending for a little while.
pub async fn assert_stays_pending<T, E>(slot: &freshcell::Slot<T, E>) {
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(slot.is_pending(), "slot resolved unexpectedly");
}
