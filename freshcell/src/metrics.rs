//! Metrics declaration and recording helpers.
//!
//! With the `metrics` feature disabled every helper is an empty inline
//! function and is eliminated by the compiler.

use std::time::Duration;

use smol_str::SmolStr;

#[cfg(feature = "metrics")]
use lazy_static::lazy_static;

#[cfg(feature = "metrics")]
lazy_static! {
    /// Track number of producer invocations started.
    pub static ref INVOCATIONS_STARTED: &'static str = {
        metrics::describe_counter!(
            "freshcell_invocations_started_total",
            "Total number of producer invocations started."
        );
        "freshcell_invocations_started_total"
    };
    /// Track number of active invocations cancelled by a newer refresh.
    pub static ref INVOCATIONS_SUPERSEDED: &'static str = {
        metrics::describe_counter!(
            "freshcell_invocations_superseded_total",
            "Total number of producer invocations superseded by a newer refresh."
        );
        "freshcell_invocations_superseded_total"
    };
    /// Track number of invocation outcomes dropped because they were no longer current.
    pub static ref INVOCATIONS_DISCARDED: &'static str = {
        metrics::describe_counter!(
            "freshcell_invocations_discarded_total",
            "Total number of invocation outcomes discarded after being superseded."
        );
        "freshcell_invocations_discarded_total"
    };
    /// Track number of outcomes published to a slot, by outcome.
    pub static ref INVOCATIONS_COMPLETED: &'static str = {
        metrics::describe_counter!(
            "freshcell_invocations_completed_total",
            "Total number of invocation outcomes published to waiters."
        );
        "freshcell_invocations_completed_total"
    };
    /// Histogram of producer invocation duration.
    pub static ref INVOCATION_DURATION: &'static str = {
        metrics::describe_histogram!(
            "freshcell_invocation_duration_seconds",
            metrics::Unit::Seconds,
            "Duration of producer invocations in seconds."
        );
        "freshcell_invocation_duration_seconds"
    };
    /// Track number of disposed cells.
    pub static ref CELLS_DISPOSED: &'static str = {
        metrics::describe_counter!(
            "freshcell_disposed_total",
            "Total number of disposed cache cells."
        );
        "freshcell_disposed_total"
    };
}

#[cfg(feature = "metrics")]
#[inline]
pub(crate) fn record_started(cell: &SmolStr) {
    metrics::counter!(*INVOCATIONS_STARTED, "cell" => cell.to_string()).increment(1);
}

#[cfg(feature = "metrics")]
#[inline]
pub(crate) fn record_superseded(cell: &SmolStr) {
    metrics::counter!(*INVOCATIONS_SUPERSEDED, "cell" => cell.to_string()).increment(1);
}

#[cfg(feature = "metrics")]
#[inline]
pub(crate) fn record_discarded(cell: &SmolStr) {
    metrics::counter!(*INVOCATIONS_DISCARDED, "cell" => cell.to_string()).increment(1);
}

/// Record a published outcome. `outcome` is one of the labels returned by
/// `invocation::outcome_label`.
#[cfg(feature = "metrics")]
#[inline]
pub(crate) fn record_completed(cell: &SmolStr, outcome: &'static str) {
    metrics::counter!(
        *INVOCATIONS_COMPLETED,
        "cell" => cell.to_string(),
        "outcome" => outcome
    )
    .increment(1);
}

#[cfg(feature = "metrics")]
#[inline]
pub(crate) fn record_duration(cell: &SmolStr, duration: Duration) {
    metrics::histogram!(*INVOCATION_DURATION, "cell" => cell.to_string())
        .record(duration.as_secs_f64());
}

#[cfg(feature = "metrics")]
#[inline]
pub(crate) fn record_disposed(cell: &SmolStr) {
    metrics::counter!(*CELLS_DISPOSED, "cell" => cell.to_string()).increment(1);
}

#[cfg(not(feature = "metrics"))]
#[inline]
pub(crate) fn record_started(_cell: &SmolStr) {}

#[cfg(not(feature = "metrics"))]
#[inline]
pub(crate) fn record_superseded(_cell: &SmolStr) {}

#[cfg(not(feature = "metrics"))]
#[inline]
pub(crate) fn record_discarded(_cell: &SmolStr) {}

#[cfg(not(feature = "metrics"))]
#[inline]
pub(crate) fn record_completed(_cell: &SmolStr, _outcome: &'static str) {}

#[cfg(not(feature = "metrics"))]
#[inline]
pub(crate) fn record_duration(_cell: &SmolStr, _duration: Duration) {}

#[cfg(not(feature = "metrics"))]
#[inline]
pub(crate) fn record_disposed(_cell: &SmolStr) {}
