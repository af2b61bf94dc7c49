#![doc = include_str!("../README.md")]
#![warn(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

/// The self-refreshing cache cell.
///
/// Provides [`AsyncUpdatableCache`](cell::AsyncUpdatableCache) with lazy
/// population, superseding refreshes and idempotent disposal.
pub mod cell;

/// Cell configuration types.
///
/// Provides [`CellConfig`](config::CellConfig), its builder and the
/// [`TimeoutPolicy`](config::TimeoutPolicy) applied to producer invocations.
pub mod config;

mod invocation;

/// Metrics collection for cell observability.
///
/// When the `metrics` feature is enabled, this module provides counters
/// and histograms for:
/// - Producer invocations started, superseded and discarded
/// - Published outcomes by kind
/// - Producer invocation duration
pub mod metrics;

/// Single-assignment promise handed to waiters.
///
/// A [`Slot`](slot::Slot) is resolved exactly once and shared by every waiter
/// of a refresh generation.
pub mod slot;

pub use cell::{AsyncUpdatableCache, WaitFuture};
pub use config::{CellConfig, CellConfigBuilder, TimeoutPolicy};
pub use freshcell_core::{CancellationToken, CellError, IgnoreCancellation, Producer, SlotError};
pub use slot::{Outcome, Slot};

/// The `freshcell` prelude.
///
/// ```rust
/// use freshcell::prelude::*;
/// ```
pub mod prelude {
    pub use crate::{AsyncUpdatableCache, CancellationToken, CellError, Producer};
}
