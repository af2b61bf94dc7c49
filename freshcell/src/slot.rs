//! Single-assignment promise shared by every waiter of a refresh generation.

use std::fmt;
use std::future::IntoFuture;
use std::sync::Arc;

use freshcell_core::{CellError, SlotError};
use futures::future::BoxFuture;
use tokio::sync::watch;

/// Terminal outcome of a refresh generation.
pub type Outcome<T, E> = Result<T, CellError<E>>;

/// A settable, clonable future holding the outcome of one refresh generation.
///
/// A slot starts pending and is resolved at most once. Every clone observes
/// the same outcome; identity between clones is checked with [`Slot::ptr_eq`].
///
/// Awaiting a slot clones the stored outcome, so `T` must be `Clone`.
pub struct Slot<T, E> {
    state: Arc<watch::Sender<Option<Outcome<T, E>>>>,
}

impl<T, E> Slot<T, E> {
    /// Create a pending slot.
    pub fn new() -> Self {
        let (state, _) = watch::channel(None);
        Self {
            state: Arc::new(state),
        }
    }

    /// Returns `true` until the slot is resolved.
    pub fn is_pending(&self) -> bool {
        self.state.borrow().is_none()
    }

    /// Returns `true` if both handles refer to the same slot.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.state, &other.state)
    }

    /// Store the terminal outcome and wake every waiter.
    ///
    /// Fails with [`SlotError::AlreadyResolved`] if the slot already holds an
    /// outcome; the first outcome is kept.
    pub fn resolve(&self, outcome: Outcome<T, E>) -> Result<(), SlotError> {
        let resolved = self.state.send_if_modified(|state| {
            if state.is_some() {
                return false;
            }
            *state = Some(outcome);
            true
        });

        if resolved {
            Ok(())
        } else {
            Err(SlotError::AlreadyResolved)
        }
    }
}

impl<T: Clone, E> Slot<T, E> {
    /// The terminal outcome, or `None` while pending.
    pub fn outcome(&self) -> Option<Outcome<T, E>> {
        self.state.borrow().clone()
    }

    /// Wait for the slot to be resolved and return its outcome.
    pub async fn wait(&self) -> Outcome<T, E> {
        let mut receiver = self.state.subscribe();
        match receiver.wait_for(Option::is_some).await {
            Ok(state) => match &*state {
                Some(outcome) => outcome.clone(),
                None => Err(CellError::Disposed),
            },
            // The sender lives as long as `self`.
            Err(_) => Err(CellError::Disposed),
        }
    }
}

impl<T, E> Default for Slot<T, E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, E> Clone for Slot<T, E> {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
        }
    }
}

impl<T, E> fmt::Debug for Slot<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match &*self.state.borrow() {
            None => "pending",
            Some(Ok(_)) => "succeeded",
            Some(Err(CellError::Cancelled)) => "cancelled",
            Some(Err(_)) => "failed",
        };
        f.debug_struct("Slot").field("state", &state).finish()
    }
}

impl<T, E> IntoFuture for Slot<T, E>
where
    T: Clone + Send + Sync + 'static,
    E: Send + Sync + 'static,
{
    type Output = Outcome<T, E>;
    type IntoFuture = BoxFuture<'static, Outcome<T, E>>;

    fn into_future(self) -> Self::IntoFuture {
        Box::pin(async move { self.wait().await })
    }
}
