use log::trace;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use crate::state::{Shared, State, Status};
use crate::{Error, SharedError};

/// The eventual outcome of an operation: one value or one error, once.
///
/// `Promise` is a cheap, cloneable handle that can only be observed. Use
/// [`Resolver`] to settle it.
pub struct Promise<T, E = SharedError> {
    shared: Arc<Shared<T, E>>,
}

/// Settlement rights for a [`Promise`].
///
/// A resolver may be cloned and sent to another thread, but the promise
/// behind it accepts exactly one outcome. Settling twice is a bug in the
/// producer and panics; use [`Resolver::try_settle`] to probe instead.
pub struct Resolver<T, E = SharedError> {
    shared: Arc<Shared<T, E>>,
}

impl<T, E> Clone for Promise<T, E> {
    fn clone(&self) -> Self {
        Self { shared: self.shared.clone() }
    }
}

impl<T, E> Clone for Resolver<T, E> {
    fn clone(&self) -> Self {
        Self { shared: self.shared.clone() }
    }
}

impl<T, E> Promise<T, E>
where
    T: Clone + Send + 'static,
    E: Clone + Send + 'static,
{
    /// Creates a pending promise and runs `init` with its resolver right away.
    ///
    /// # Examples
    ///
    /// ```
    /// use promise_chain::Promise;
    /// use std::thread;
    /// let promise = Promise::<String, String>::new(|resolver| {
    ///     let resolver = resolver.clone();
    ///     thread::spawn(move || resolver.fulfill("🍓".into()));
    /// });
    /// assert_eq!(futures::executor::block_on(promise), Ok("🍓".to_string()));
    /// ```
    pub fn new(init: impl FnOnce(&Resolver<T, E>)) -> Self {
        let (promise, resolver) = Self::deferred();
        init(&resolver);
        promise
    }

    /// A pending promise together with the resolver that settles it.
    pub fn deferred() -> (Self, Resolver<T, E>) {
        let shared = Arc::new(Shared::new());
        (Self { shared: shared.clone() }, Resolver { shared })
    }

    pub fn fulfilled(value: T) -> Self {
        Self::from(Ok(value))
    }

    pub fn rejected(error: E) -> Self {
        Self::from(Err(error))
    }

    /// A new promise mirroring `source`, without exposing its resolver.
    pub fn resolved_with(source: &Promise<T, E>) -> Self {
        Self::new(|resolver| resolver.resolve(source))
    }

    /// Registers a pair of observers, exactly one of which will run.
    ///
    /// While pending both are queued behind earlier observers; once settled
    /// the matching one runs immediately on the calling thread.
    pub fn observe<F, R>(&self, on_fulfilled: F, on_rejected: R)
    where
        F: FnOnce(T) + Send + 'static,
        R: FnOnce(E) + Send + 'static,
    {
        self.subscribe(move |outcome| match outcome {
            Ok(value) => on_fulfilled(value),
            Err(error) => on_rejected(error),
        })
    }

    /// Like [`observe`](Self::observe), with a single observer for the whole outcome.
    pub fn subscribe<F>(&self, on_settled: F)
    where
        F: FnOnce(Result<T, E>) + Send + 'static,
    {
        self.shared.subscribe(Box::new(on_settled))
    }

    pub fn is_settled(&self) -> bool {
        self.status() != Status::Pending
    }

    pub fn status(&self) -> Status {
        self.shared.status()
    }

    /// A snapshot of the current state.
    pub fn state(&self) -> State<T, E> {
        self.shared.state()
    }
}

impl<T, E> From<Result<T, E>> for Promise<T, E>
where
    T: Clone,
    E: Clone,
{
    fn from(outcome: Result<T, E>) -> Self {
        Self { shared: Arc::new(Shared::settled(outcome)) }
    }
}

impl<T, E> Resolver<T, E>
where
    T: Clone + Send + 'static,
    E: Clone + Send + 'static,
{
    /// # Panics
    ///
    /// If the promise is already settled.
    pub fn fulfill(&self, value: T) {
        self.settle(Ok(value))
    }

    /// # Panics
    ///
    /// If the promise is already settled.
    pub fn reject(&self, error: E) {
        self.settle(Err(error))
    }

    /// # Panics
    ///
    /// If the promise is already settled.
    pub fn settle(&self, outcome: Result<T, E>) {
        if let Err(err) = self.try_settle(outcome) {
            panic!("{err}");
        }
    }

    pub fn try_fulfill(&self, value: T) -> Result<(), Error> {
        self.try_settle(Ok(value))
    }

    pub fn try_reject(&self, error: E) -> Result<(), Error> {
        self.try_settle(Err(error))
    }

    pub fn try_settle(&self, outcome: Result<T, E>) -> Result<(), Error> {
        self.shared.settle(outcome)
    }

    /// Adopts the outcome of `other` once it settles.
    ///
    /// If `other` never settles, neither does this promise. Resolving a
    /// promise with itself, directly or through a cycle, leaves it pending.
    pub fn resolve(&self, other: &Promise<T, E>) {
        if Arc::ptr_eq(&self.shared, &other.shared) {
            trace!("promise resolved with itself, it will never settle");
        }
        let this = self.clone();
        other.subscribe(move |outcome| this.settle(outcome));
    }

    /// An observe handle on the promise this resolver settles.
    pub fn promise(&self) -> Promise<T, E> {
        Promise { shared: self.shared.clone() }
    }
}

impl<T, E> Future for Promise<T, E>
where
    T: Clone,
    E: Clone,
{
    type Output = Result<T, E>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match self.shared.poll_outcome(cx.waker()) {
            Some(outcome) => Poll::Ready(outcome),
            None => Poll::Pending,
        }
    }
}

impl<T, E> fmt::Debug for Promise<T, E>
where
    T: Clone,
    E: Clone,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Promise").field("status", &self.shared.status()).finish()
    }
}

impl<T, E> fmt::Debug for Resolver<T, E>
where
    T: Clone,
    E: Clone,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resolver").field("status", &self.shared.status()).finish()
    }
}
