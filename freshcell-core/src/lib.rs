#![warn(missing_docs)]
//! # freshcell-core
//!
//! Core traits and types for the freshcell self-refreshing cache cell.
//!
//! This crate holds the runtime-agnostic vocabulary shared by the cell and
//! its users:
//!
//! - **Compute** the cached value ([`Producer`], [`IgnoreCancellation`])
//! - **Report** terminal failures ([`CellError`], [`SlotError`])
//!
//! Cancellation is expressed with [`tokio_util::sync::CancellationToken`],
//! re-exported here so producers do not need a direct dependency.

pub mod error;
pub mod producer;

pub use error::{CellError, SlotError};
pub use producer::{IgnoreCancellation, Producer};
pub use tokio_util::sync::CancellationToken;
