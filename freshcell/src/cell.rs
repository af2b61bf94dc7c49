//! The self-refreshing cache cell.
//!
//! All mutable state lives in one `State` behind a mutex. The critical
//! sections only swap handles and signal cancellation; the producer always
//! runs on a spawned task outside the lock.
//!
//! Each refresh bumps a generation counter. An invocation publishes its
//! outcome only if its generation is still the latest one when it completes,
//! which makes every superseded invocation silent no matter how long it keeps
//! running in the background.

use std::fmt;
use std::future::IntoFuture;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use freshcell_core::{CellError, IgnoreCancellation, Producer};
use futures::future::BoxFuture;
use tokio::runtime::Handle;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, info_span, warn};

use crate::config::CellConfig;
use crate::invocation;
use crate::metrics::{
    record_completed, record_discarded, record_disposed, record_duration, record_started,
    record_superseded,
};
use crate::slot::{Outcome, Slot};

/// Future returned by [`AsyncUpdatableCache::update_and_wait`].
pub type WaitFuture<T, E> = BoxFuture<'static, Outcome<T, E>>;

type CellOutcome<P> = Outcome<<P as Producer>::Value, <P as Producer>::Error>;
type CellSlot<P> = Slot<<P as Producer>::Value, <P as Producer>::Error>;

/// A cache cell holding the latest result of an asynchronous producer.
///
/// The first read lazily starts the producer. Refreshes supersede and cancel
/// the invocation in flight; waiters of a pending generation are carried over
/// to the newest one. Dropping the cell disposes it.
///
/// # Examples
///
/// ```rust,ignore
/// use freshcell::AsyncUpdatableCache;
///
/// let cell = AsyncUpdatableCache::from_fn(|| async { fetch_rates().await });
///
/// let rates = cell.get().await?;
/// cell.force_refresh()?;
/// let fresh = cell.update_and_wait(None)?.await?;
/// ```
pub struct AsyncUpdatableCache<P: Producer> {
    inner: Arc<Inner<P>>,
}

struct Inner<P: Producer> {
    producer: P,
    config: CellConfig,
    state: Mutex<State<P::Value, P::Error>>,
}

struct State<T, E> {
    /// Slot of the latest generation. `None` until the first refresh.
    slot: Option<Slot<T, E>>,
    active: Option<ActiveInvocation>,
    /// Latest generation started. Never advanced by dispose.
    generation: u64,
    /// Taken by the first dispose.
    dispose: Option<CancellationToken>,
}

impl<T, E> State<T, E> {
    fn is_disposed(&self) -> bool {
        self.dispose.is_none()
    }
}

/// The running invocation together with the token that cancels it.
struct ActiveInvocation {
    generation: u64,
    token: CancellationToken,
}

impl<P> AsyncUpdatableCache<P>
where
    P: Producer,
    P::Value: Clone + Sync,
{
    /// Create a cell with the default configuration.
    ///
    /// Nothing runs until the first read or refresh.
    pub fn new(producer: P) -> Self {
        Self::with_config(producer, CellConfig::default())
    }

    /// Create a cell with the given configuration.
    pub fn with_config(producer: P, config: CellConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                producer,
                config,
                state: Mutex::new(State {
                    slot: None,
                    active: None,
                    generation: 0,
                    dispose: Some(CancellationToken::new()),
                }),
            }),
        }
    }

    /// Returns the slot of the in-flight or most recent generation.
    ///
    /// The first call starts the producer. Later calls hand out the same slot
    /// until a refresh replaces it.
    ///
    /// # Errors
    ///
    /// [`CellError::NoRuntime`] when the producer has to be started, no
    /// runtime is configured and the caller is outside a tokio runtime. The
    /// cell is left untouched in that case.
    pub fn get_current(&self) -> Result<CellSlot<P>, CellError<P::Error>> {
        let mut state = self.inner.lock();
        if state.is_disposed() {
            return Err(CellError::Disposed);
        }
        if let Some(slot) = &state.slot {
            return Ok(slot.clone());
        }
        Inner::start_refresh(&self.inner, &mut state)
    }

    /// Start a new producer invocation, superseding the one in flight.
    pub fn force_refresh(&self) -> Result<(), CellError<P::Error>> {
        let mut state = self.inner.lock();
        Inner::start_refresh(&self.inner, &mut state).map(|_| ())
    }

    /// Start a new producer invocation and wait for its generation.
    ///
    /// `cancel` abandons only this wait: the invocation keeps running and
    /// other waiters still receive its outcome.
    pub fn update_and_wait(
        &self,
        cancel: Option<CancellationToken>,
    ) -> Result<WaitFuture<P::Value, P::Error>, CellError<P::Error>> {
        let slot = {
            let mut state = self.inner.lock();
            Inner::start_refresh(&self.inner, &mut state)?
        };

        Ok(match cancel {
            None => slot.into_future(),
            Some(cancel) => Box::pin(async move {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => Err(CellError::Cancelled),
                    outcome = slot.wait() => outcome,
                }
            }),
        })
    }

    /// Wait for the current value, starting the producer if needed.
    pub async fn get(&self) -> CellOutcome<P> {
        self.get_current()?.await
    }

    /// Returns the terminal outcome of the current slot without starting a
    /// refresh. `None` if nothing was produced yet or the generation is
    /// still pending.
    pub fn peek(&self) -> Option<CellOutcome<P>> {
        self.inner.lock().slot.as_ref().and_then(Slot::outcome)
    }
}

impl<F> AsyncUpdatableCache<IgnoreCancellation<F>>
where
    IgnoreCancellation<F>: Producer,
    <IgnoreCancellation<F> as Producer>::Value: Clone + Sync,
{
    /// Create a cell from a producer closure that takes no cancellation token.
    pub fn from_fn(f: F) -> Self {
        Self::new(IgnoreCancellation::new(f))
    }
}

impl<P: Producer> AsyncUpdatableCache<P> {
    /// Dispose the cell.
    ///
    /// Cancels the invocation in flight, whose generation then resolves as
    /// [`CellError::Disposed`]. Every later operation fails with the same
    /// error. Calling it again is a no-op.
    pub fn dispose(&self) {
        self.inner.dispose();
    }

    /// Returns `true` once the cell has been disposed.
    pub fn is_disposed(&self) -> bool {
        self.inner.lock().is_disposed()
    }

    /// Number of producer invocations started so far.
    pub fn generation(&self) -> u64 {
        self.inner.lock().generation
    }

    /// The configuration this cell was built with.
    pub fn config(&self) -> &CellConfig {
        &self.inner.config
    }
}

impl<P: Producer> Inner<P> {
    fn lock(&self) -> MutexGuard<'_, State<P::Value, P::Error>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn dispose(&self) {
        let mut state = self.lock();
        let Some(dispose) = state.dispose.take() else {
            return;
        };
        dispose.cancel();
        if let Some(active) = state.active.take() {
            active.token.cancel();
        }
        debug!(
            cell = %self.config.name,
            generation = state.generation,
            "Cache cell disposed"
        );
        record_disposed(&self.config.name);
    }
}

impl<P> Inner<P>
where
    P: Producer,
    P::Value: Clone + Sync,
{
    /// Supersede the active invocation and start a new generation.
    fn start_refresh(
        this: &Arc<Self>,
        state: &mut State<P::Value, P::Error>,
    ) -> Result<CellSlot<P>, CellError<P::Error>> {
        let Some(dispose) = &state.dispose else {
            return Err(CellError::Disposed);
        };
        // Resolved before any state changes so a missing runtime leaves
        // the cell as it was.
        let runtime = match &this.config.runtime {
            Some(runtime) => runtime.clone(),
            None => Handle::try_current().map_err(|_| CellError::NoRuntime)?,
        };
        let token = dispose.child_token();

        if let Some(previous) = state.active.take() {
            previous.token.cancel();
            debug!(
                cell = %this.config.name,
                generation = previous.generation,
                "Superseding active invocation"
            );
            record_superseded(&this.config.name);
        }

        // A pending slot carries its waiters over to the new generation.
        // A resolved one has been observed and is never handed out again.
        let slot = match &state.slot {
            Some(slot) if slot.is_pending() => slot.clone(),
            _ => {
                let slot = Slot::new();
                state.slot = Some(slot.clone());
                slot
            }
        };

        state.generation += 1;
        let generation = state.generation;

        let span = info_span!(
            "freshcell.invocation",
            cell = %this.config.name,
            generation,
        );
        // The producer owns its task and always runs to its own end. The
        // listener only decides whether its outcome still gets published.
        let producer = {
            let inner = Arc::clone(this);
            let token = token.clone();
            runtime.spawn(
                async move { inner.producer.produce(token).await }.instrument(span.clone()),
            )
        };
        let listener = {
            let inner = Arc::clone(this);
            let slot = slot.clone();
            let token = token.clone();
            async move {
                let start = Instant::now();
                let outcome =
                    invocation::run(producer, &token, &inner.config.timeout_policy).await;
                record_duration(&inner.config.name, start.elapsed());
                inner.complete(generation, &slot, outcome);
            }
            .instrument(span)
        };
        runtime.spawn(listener);

        state.active = Some(ActiveInvocation { generation, token });
        debug!(cell = %this.config.name, generation, "Started producer invocation");
        record_started(&this.config.name);

        Ok(slot)
    }

    /// Publish `outcome` if `generation` is still the latest one.
    fn complete(&self, generation: u64, slot: &CellSlot<P>, outcome: CellOutcome<P>) {
        let mut state = self.lock();

        if state.generation != generation {
            debug!(
                latest = state.generation,
                outcome = invocation::outcome_label(&outcome),
                "Discarding outcome of superseded invocation"
            );
            record_discarded(&self.config.name);
            return;
        }

        if state
            .active
            .as_ref()
            .is_some_and(|active| active.generation == generation)
        {
            state.active = None;
        }

        let outcome = if state.is_disposed() {
            Err(CellError::Disposed)
        } else {
            outcome
        };
        let label = invocation::outcome_label(&outcome);

        match slot.resolve(outcome) {
            Ok(()) => {
                debug!(outcome = label, "Published invocation outcome");
                record_completed(&self.config.name, label);
            }
            Err(error) => warn!(%error, outcome = label, "Invocation outcome rejected"),
        }
    }
}

impl<P: Producer> Drop for AsyncUpdatableCache<P> {
    fn drop(&mut self) {
        self.inner.dispose();
    }
}

impl<'a, P> IntoFuture for &'a AsyncUpdatableCache<P>
where
    P: Producer,
    P::Value: Clone + Sync,
{
    type Output = CellOutcome<P>;
    type IntoFuture = BoxFuture<'a, CellOutcome<P>>;

    fn into_future(self) -> Self::IntoFuture {
        Box::pin(self.get())
    }
}

impl<P: Producer> fmt::Debug for AsyncUpdatableCache<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.lock();
        f.debug_struct("AsyncUpdatableCache")
            .field("name", &self.inner.config.name)
            .field("generation", &state.generation)
            .field("active", &state.active.is_some())
            .field("disposed", &state.is_disposed())
            .finish()
    }
}
