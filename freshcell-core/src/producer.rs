//! Producer trait for computing the value held by a cache cell.

use std::future::Future;

use tokio_util::sync::CancellationToken;

/// Asynchronous computation that produces the value cached by a cell.
///
/// A producer is invoked once per refresh generation. The token it receives is
/// cancelled when a newer refresh supersedes the invocation, when the cell is
/// disposed, or when the configured timeout expires. Honoring the token is
/// optional: the cell stops listening to a cancelled invocation either way.
///
/// Any `Fn(CancellationToken) -> impl Future<Output = Result<T, E>>` closure is
/// a producer. Closures that take no token can be wrapped in
/// [`IgnoreCancellation`].
///
/// # Examples
///
/// ```rust,ignore
/// use freshcell_core::Producer;
/// use tokio_util::sync::CancellationToken;
///
/// struct Config;
///
/// impl Producer for Config {
///     type Value = String;
///     type Error = std::io::Error;
///     type Future = BoxFuture<'static, Result<String, std::io::Error>>;
///
///     fn produce(&self, token: CancellationToken) -> Self::Future {
///         Box::pin(async move {
///             tokio::select! {
///                 _ = token.cancelled() => Err(std::io::Error::other("cancelled")),
///                 text = tokio::fs::read_to_string("app.toml") => text,
///             }
///         })
///     }
/// }
/// ```
pub trait Producer: Send + Sync + 'static {
    /// The produced value.
    type Value: Send + 'static;

    /// The error a failed invocation returns.
    type Error: Send + Sync + 'static;

    /// The future driving one invocation.
    type Future: Future<Output = Result<Self::Value, Self::Error>> + Send + 'static;

    /// Start a new invocation observing `token`.
    fn produce(&self, token: CancellationToken) -> Self::Future;
}

impl<F, Fut, T, E> Producer for F
where
    F: Fn(CancellationToken) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, E>> + Send + 'static,
    T: Send + 'static,
    E: Send + Sync + 'static,
{
    type Value = T;
    type Error = E;
    type Future = Fut;

    fn produce(&self, token: CancellationToken) -> Self::Future {
        self(token)
    }
}

/// Adapts a no-argument async closure into a [`Producer`].
///
/// The invocation still races against its token inside the cell, so a
/// superseded call is abandoned even though the closure never sees the token.
#[derive(Debug, Clone)]
pub struct IgnoreCancellation<F>(F);

impl<F> IgnoreCancellation<F> {
    /// Wrap `f`.
    pub fn new(f: F) -> Self {
        Self(f)
    }

    /// Returns the wrapped closure.
    pub fn into_inner(self) -> F {
        self.0
    }
}

impl<F, Fut, T, E> Producer for IgnoreCancellation<F>
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, E>> + Send + 'static,
    T: Send + 'static,
    E: Send + Sync + 'static,
{
    type Value = T;
    type Error = E;
    type Future = Fut;

    fn produce(&self, _token: CancellationToken) -> Self::Future {
        (self.0)()
    }
}
