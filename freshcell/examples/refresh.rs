//! Shows superseding refreshes and caller-local cancellation with tracing
//! output enabled.
//!
//! Run with: `cargo run -p freshcell --example refresh`

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use freshcell::{AsyncUpdatableCache, CancellationToken, CellConfig, CellError};
use tracing::{Level, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, thiserror::Error)]
#[error("rates service unavailable")]
struct Unavailable;

#[tokio::main]
async fn main() -> Result<(), CellError<Unavailable>> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .with(
            tracing_subscriber::filter::Targets::new()
                .with_target("freshcell", Level::DEBUG)
                .with_target("refresh", Level::INFO),
        )
        .init();

    let version = Arc::new(AtomicU32::new(0));
    let producer = {
        let version = Arc::clone(&version);
        move |token: CancellationToken| {
            let version = Arc::clone(&version);
            async move {
                tokio::select! {
                    _ = token.cancelled() => Err(Unavailable),
                    _ = tokio::time::sleep(Duration::from_millis(200)) => {
                        Ok(version.fetch_add(1, Ordering::SeqCst) + 1)
                    }
                }
            }
        }
    };

    let config = CellConfig::builder()
        .name("rates")
        .timeout(Duration::from_secs(2))
        .build();
    let cell = AsyncUpdatableCache::with_config(producer, config);

    let rates = cell.get().await?;
    info!(rates, "first read");

    // The second refresh supersedes the first; both waiters get its result.
    let early = cell.update_and_wait(None)?;
    tokio::time::sleep(Duration::from_millis(50)).await;
    let late = cell.update_and_wait(None)?;
    let (early, late) = (early.await?, late.await?);
    info!(early, late, "coalesced refresh");

    // Abandon one wait without disturbing the invocation.
    let cancel = CancellationToken::new();
    let impatient = cell.update_and_wait(Some(cancel.clone()))?;
    cancel.cancel();
    let outcome = impatient.await;
    info!(?outcome, "impatient waiter");
    let rates = (&cell).await?;
    info!(rates, "patient reader");

    cell.dispose();
    let outcome = cell.get_current().map(|_| ());
    info!(?outcome, "after dispose");

    Ok(())
}
