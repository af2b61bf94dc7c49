//! Error types delivered by a cache cell.

use std::sync::Arc;

use thiserror::Error;

/// Terminal failure of a cell operation or of a refresh generation.
///
/// The same value is observed by every waiter of a generation, so producer
/// errors are shared behind an [`Arc`] rather than cloned.
#[derive(Debug, Error)]
pub enum CellError<E> {
    /// The cell was disposed before or while the operation ran.
    #[error("cache cell has been disposed")]
    Disposed,

    /// A refresh had to start outside a tokio runtime and the cell has no
    /// runtime configured. The cell state is unchanged.
    #[error("no tokio runtime available to run the producer")]
    NoRuntime,

    /// The wait or the producer invocation was cancelled.
    ///
    /// Superseded invocations never surface this: their outcome is discarded.
    #[error("refresh was cancelled")]
    Cancelled,

    /// The producer returned an error. Every waiter of the generation gets
    /// the same instance.
    #[error(transparent)]
    Producer(Arc<E>),

    /// The producer panicked. The payload message is kept when it is a string.
    #[error("producer panicked: {0}")]
    Panicked(String),
}

impl<E> CellError<E> {
    /// Wraps a producer error.
    pub fn producer(error: E) -> Self {
        Self::Producer(Arc::new(error))
    }

    /// Returns `true` for [`CellError::Disposed`].
    pub fn is_disposed(&self) -> bool {
        matches!(self, Self::Disposed)
    }

    /// Returns `true` for [`CellError::Cancelled`].
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// Returns the producer error, if this is one.
    pub fn producer_error(&self) -> Option<&Arc<E>> {
        match self {
            Self::Producer(error) => Some(error),
            _ => None,
        }
    }
}

// Manual impl: `E` itself does not have to be `Clone`.
impl<E> Clone for CellError<E> {
    fn clone(&self) -> Self {
        match self {
            Self::Disposed => Self::Disposed,
            Self::NoRuntime => Self::NoRuntime,
            Self::Cancelled => Self::Cancelled,
            Self::Producer(error) => Self::Producer(Arc::clone(error)),
            Self::Panicked(message) => Self::Panicked(message.clone()),
        }
    }
}

/// Misuse of a single-assignment slot.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum SlotError {
    /// The slot already holds a terminal outcome; the new one was rejected.
    #[error("slot has already been resolved")]
    AlreadyResolved,
}
