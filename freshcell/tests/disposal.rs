//! Disposal semantics.

mod common;

use std::sync::Arc;

use common::{controlled, next_call};
use freshcell::{AsyncUpdatableCache, CellError};

#[tokio::test]
async fn test_operations_fail_after_dispose() {
    let (producer, _calls) = controlled();
    let cell = AsyncUpdatableCache::new(producer);

    assert!(!cell.is_disposed());
    cell.dispose();
    assert!(cell.is_disposed());

    assert!(matches!(cell.get_current(), Err(CellError::Disposed)));
    assert!(matches!(cell.force_refresh(), Err(CellError::Disposed)));
    assert!(matches!(cell.update_and_wait(None), Err(CellError::Disposed)));
    assert!(matches!(cell.get().await, Err(CellError::Disposed)));
    assert_eq!(cell.generation(), 0);

    // Idempotent.
    cell.dispose();
    assert!(cell.is_disposed());
}

#[tokio::test]
async fn test_in_flight_generation_resolves_disposed() {
    let (producer, mut calls) = controlled();
    let cell = AsyncUpdatableCache::new(producer);

    let slot = cell.get_current().unwrap();
    let waiter = cell.update_and_wait(None).unwrap();
    let call = next_call(&mut calls).await;

    cell.dispose();
    assert!(call.token.is_cancelled());

    // Even a producer that would have succeeded does not publish.
    call.succeed(1);
    assert!(matches!(slot.await, Err(CellError::Disposed)));
    assert!(matches!(waiter.await, Err(CellError::Disposed)));
    assert!(matches!(cell.peek(), Some(Err(CellError::Disposed))));
}

#[tokio::test]
async fn test_last_outcome_survives_dispose() {
    let (producer, mut calls) = controlled();
    let cell = AsyncUpdatableCache::new(producer);

    let slot = cell.get_current().unwrap();
    next_call(&mut calls).await.succeed(8);
    assert_eq!(slot.wait().await.unwrap(), 8);

    cell.dispose();
    assert_eq!(slot.await.unwrap(), 8);
    assert_eq!(cell.peek().unwrap().unwrap(), 8);
}

#[tokio::test]
async fn test_drop_disposes() {
    let (producer, mut calls) = controlled();
    let cell = AsyncUpdatableCache::new(producer);

    let slot = cell.get_current().unwrap();
    let call = next_call(&mut calls).await;

    drop(cell);
    assert!(call.token.is_cancelled());
    assert!(matches!(slot.await, Err(CellError::Disposed)));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_dispose() {
    let (producer, mut calls) = controlled();
    let cell = Arc::new(AsyncUpdatableCache::new(producer));

    let slot = cell.get_current().unwrap();
    let _call = next_call(&mut calls).await;

    let disposers: Vec<_> = (0..8)
        .map(|_| {
            let cell = Arc::clone(&cell);
            tokio::spawn(async move { cell.dispose() })
        })
        .collect();
    for disposer in disposers {
        disposer.await.unwrap();
    }

    assert!(cell.is_disposed());
    assert!(matches!(slot.await, Err(CellError::Disposed)));
}
