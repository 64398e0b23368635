//! `then`, `catch` and `finally`.
//!
//! Every combinator registers one observer on its source and returns a new
//! promise whose fate is decided by that observer: settled directly, or by
//! adopting whatever promise the handler hands back.
use crate::promise::{Promise, Resolver};

/// What an error or cleanup handler wants done with the chain.
pub enum Recovery<T, E> {
    /// Continue with the outcome of this promise instead.
    Recover(Promise<T, E>),
    /// Keep the original outcome.
    PassThrough,
}

impl<T, E> From<Promise<T, E>> for Recovery<T, E> {
    fn from(promise: Promise<T, E>) -> Self {
        Recovery::Recover(promise)
    }
}

impl<T, E> From<Option<Promise<T, E>>> for Recovery<T, E> {
    fn from(promise: Option<Promise<T, E>>) -> Self {
        promise.map_or(Recovery::PassThrough, Recovery::Recover)
    }
}

impl<T, E> Recovery<T, E>
where
    T: Clone + Send + 'static,
    E: Clone + Send + 'static,
{
    fn apply(self, resolver: &Resolver<T, E>, original: Result<T, E>) {
        match self {
            Recovery::Recover(promise) => resolver.resolve(&promise),
            Recovery::PassThrough => resolver.settle(original),
        }
    }
}

impl<T, E> Promise<T, E>
where
    T: Clone + Send + 'static,
    E: Clone + Send + 'static,
{
    /// Chains `on_fulfilled` onto the success path; errors pass through.
    ///
    /// The returned promise adopts the promise produced by `on_fulfilled`,
    /// so it stays pending until that one settles.
    ///
    /// ```
    /// use promise_chain::Promise;
    /// let next = Promise::<i32, String>::fulfilled(1).then(|v| Promise::fulfilled(v + 1));
    /// assert_eq!(futures::executor::block_on(next), Ok(2));
    /// ```
    pub fn then<U, F>(&self, on_fulfilled: F) -> Promise<U, E>
    where
        U: Clone + Send + 'static,
        F: FnOnce(T) -> Promise<U, E> + Send + 'static,
    {
        self.then_or(on_fulfilled, |_| Recovery::PassThrough)
    }

    /// [`then`](Self::then) with a handler for the failure path.
    ///
    /// `on_rejected` may recover into a new promise; returning
    /// [`Recovery::PassThrough`] rejects with the original error.
    pub fn then_or<U, F, R>(&self, on_fulfilled: F, on_rejected: R) -> Promise<U, E>
    where
        U: Clone + Send + 'static,
        F: FnOnce(T) -> Promise<U, E> + Send + 'static,
        R: FnOnce(&E) -> Recovery<U, E> + Send + 'static,
    {
        let (promise, resolver) = Promise::deferred();
        self.subscribe(move |outcome| match outcome {
            Ok(value) => resolver.resolve(&on_fulfilled(value)),
            Err(error) => on_rejected(&error).apply(&resolver, Err(error)),
        });
        promise
    }

    /// Runs a plain callback on success and fulfills with `()` afterwards.
    pub fn then_do<F>(&self, on_fulfilled: F) -> Promise<(), E>
    where
        F: FnOnce(T) + Send + 'static,
    {
        self.then_do_or(on_fulfilled, |_| Recovery::PassThrough)
    }

    pub fn then_do_or<F, R>(&self, on_fulfilled: F, on_rejected: R) -> Promise<(), E>
    where
        F: FnOnce(T) + Send + 'static,
        R: FnOnce(&E) -> Recovery<(), E> + Send + 'static,
    {
        self.then_or(
            move |value| {
                on_fulfilled(value);
                Promise::fulfilled(())
            },
            on_rejected,
        )
    }

    /// Handles the failure path; values pass through untouched.
    ///
    /// Returning [`Recovery::PassThrough`] keeps the original error, so
    /// several `catch` calls can inspect it in turn until one recovers.
    pub fn catch<R>(&self, on_rejected: R) -> Promise<T, E>
    where
        R: FnOnce(&E) -> Recovery<T, E> + Send + 'static,
    {
        let (promise, resolver) = Promise::deferred();
        self.subscribe(move |outcome| match outcome {
            Ok(value) => resolver.fulfill(value),
            Err(error) => on_rejected(&error).apply(&resolver, Err(error)),
        });
        promise
    }

    /// Observes the error without recovering from it.
    pub fn catch_do<R>(&self, on_rejected: R) -> Promise<T, E>
    where
        R: FnOnce(&E) + Send + 'static,
    {
        self.catch(move |error| {
            on_rejected(error);
            Recovery::PassThrough
        })
    }

    /// Runs `on_settled` on either path.
    ///
    /// A recovered promise replaces the outcome whatever it was, turning a
    /// success into a failure or the other way around.
    pub fn finally<F>(&self, on_settled: F) -> Promise<T, E>
    where
        F: FnOnce() -> Recovery<T, E> + Send + 'static,
    {
        let (promise, resolver) = Promise::deferred();
        self.subscribe(move |outcome| on_settled().apply(&resolver, outcome));
        promise
    }

    /// Cleanup that leaves the outcome alone.
    pub fn finally_do<F>(&self, on_settled: F) -> Promise<T, E>
    where
        F: FnOnce() + Send + 'static,
    {
        self.finally(move || {
            on_settled();
            Recovery::PassThrough
        })
    }
}
