//! The settlement cell shared by a [`Promise`](crate::Promise) and its
//! [`Resolver`](crate::Resolver).
//!
//! A cell starts `Pending`, moves to `Fulfilled` or `Rejected` exactly once,
//! and hands the outcome to every observer registered on it. Observers that
//! arrive after settlement are run on the spot with the stored outcome.
use log::{debug, trace};
use std::fmt;
use std::mem;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::task::Waker;

use crate::{dispatch, Error};

/// A callback waiting for the outcome of a promise.
pub(crate) type Reaction<T, E> = Box<dyn FnOnce(Result<T, E>) + Send>;

/// Lifecycle of a promise.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum State<T, E> {
    Pending,
    Fulfilled(T),
    Rejected(E),
}

impl<T, E> State<T, E> {
    pub fn is_pending(&self) -> bool {
        matches!(self, State::Pending)
    }

    pub fn status(&self) -> Status {
        match self {
            State::Pending => Status::Pending,
            State::Fulfilled(_) => Status::Fulfilled,
            State::Rejected(_) => Status::Rejected,
        }
    }

    /// The terminal outcome, or `None` while pending.
    pub fn outcome(&self) -> Option<Result<T, E>>
    where
        T: Clone,
        E: Clone,
    {
        match self {
            State::Pending => None,
            State::Fulfilled(value) => Some(Ok(value.clone())),
            State::Rejected(error) => Some(Err(error.clone())),
        }
    }
}

impl<T, E> From<Result<T, E>> for State<T, E> {
    fn from(outcome: Result<T, E>) -> Self {
        match outcome {
            Ok(value) => State::Fulfilled(value),
            Err(error) => State::Rejected(error),
        }
    }
}

/// [`State`] without its payload.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
pub enum Status {
    Pending,
    Fulfilled,
    Rejected,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Status::Pending => "pending",
            Status::Fulfilled => "fulfilled",
            Status::Rejected => "rejected",
        })
    }
}

pub(crate) struct Shared<T, E> {
    inner: Mutex<Inner<T, E>>,
}

struct Inner<T, E> {
    state: State<T, E>,
    reactions: Vec<Reaction<T, E>>,
    wakers: Vec<Waker>,
}

impl<T, E> Shared<T, E>
where
    T: Clone,
    E: Clone,
{
    pub(crate) fn new() -> Self {
        Shared {
            inner: Mutex::new(Inner {
                state: State::Pending,
                reactions: Vec::new(),
                wakers: Vec::new(),
            }),
        }
    }

    pub(crate) fn settled(outcome: Result<T, E>) -> Self {
        Shared {
            inner: Mutex::new(Inner {
                state: outcome.into(),
                reactions: Vec::new(),
                wakers: Vec::new(),
            }),
        }
    }

    // Observers never run under the lock, so a poisoned mutex still holds a
    // consistent state.
    fn lock(&self) -> MutexGuard<'_, Inner<T, E>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns the outcome if settled, otherwise remembers `waker`.
    pub(crate) fn poll_outcome(&self, waker: &Waker) -> Option<Result<T, E>> {
        let mut inner = self.lock();
        let outcome = inner.state.outcome();
        if outcome.is_none() && !inner.wakers.iter().any(|w| w.will_wake(waker)) {
            inner.wakers.push(waker.clone());
        }
        outcome
    }

    pub(crate) fn state(&self) -> State<T, E> {
        self.lock().state.clone()
    }

    pub(crate) fn status(&self) -> Status {
        self.lock().state.status()
    }

    #[cfg(test)]
    fn queued(&self) -> usize {
        self.lock().reactions.len()
    }
}

impl<T, E> Shared<T, E>
where
    T: Clone + 'static,
    E: Clone + 'static,
{
    /// Moves the cell out of `Pending`, wakes pending tasks and dispatches
    /// the outcome to every queued reaction in registration order.
    pub(crate) fn settle(&self, outcome: Result<T, E>) -> Result<(), Error> {
        let (reactions, wakers) = {
            let mut inner = self.lock();
            if !inner.state.is_pending() {
                return Err(Error::AlreadySettled(inner.state.status()));
            }
            inner.state = outcome.clone().into();
            (
                mem::take(&mut inner.reactions),
                mem::take(&mut inner.wakers),
            )
        };
        trace!(
            "settled as {}, dispatching to {} observer(s)",
            if outcome.is_ok() { Status::Fulfilled } else { Status::Rejected },
            reactions.len()
        );

        for waker in wakers {
            waker.wake();
        }
        for reaction in reactions {
            let outcome = outcome.clone();
            dispatch::run(move || reaction(outcome));
        }
        Ok(())
    }

    /// Queues `reaction` while pending; runs it immediately otherwise.
    ///
    /// From inside another observer, "immediately" means right after that
    /// observer returns.
    pub(crate) fn subscribe(&self, reaction: Reaction<T, E>) {
        let outcome = {
            let mut inner = self.lock();
            match inner.state.outcome() {
                Some(outcome) => outcome,
                None => {
                    inner.reactions.push(reaction);
                    return;
                }
            }
        };
        debug!("observer registered after settlement, replaying outcome");
        dispatch::run(move || reaction(outcome));
    }
}

#[cfg(test)]
mod tests {
    use super::{Shared, State, Status};
    use crate::Error;
    use futures::task::{self, ArcWake};
    use std::panic::{self, AssertUnwindSafe};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    struct CountingWaker(AtomicUsize);

    impl ArcWake for CountingWaker {
        fn wake_by_ref(arc_self: &Arc<Self>) {
            arc_self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn recorder() -> (Arc<Mutex<Vec<String>>>, impl Fn(&'static str) -> super::Reaction<i32, String>) {
        let log = Arc::new(Mutex::new(Vec::new()));
        let sink = log.clone();
        let make = move |name: &'static str| {
            let sink = sink.clone();
            Box::new(move |outcome: Result<i32, String>| {
                sink.lock().unwrap().push(format!("{name}:{outcome:?}"));
            }) as super::Reaction<i32, String>
        };
        (log, make)
    }

    #[test]
    fn test_dispatch_in_registration_order() {
        let cell = Shared::<i32, String>::new();
        let (log, make) = recorder();
        cell.subscribe(make("o1"));
        cell.subscribe(make("o2"));
        cell.subscribe(make("o3"));
        assert!(log.lock().unwrap().is_empty());

        cell.settle(Ok(7)).unwrap();
        assert_eq!(
            *log.lock().unwrap(),
            vec!["o1:Ok(7)", "o2:Ok(7)", "o3:Ok(7)"]
        );
        assert_eq!(cell.queued(), 0);
    }

    #[test]
    fn test_late_subscriber_runs_immediately() {
        let cell = Shared::<i32, String>::settled(Err("boom".into()));
        let (log, make) = recorder();
        cell.subscribe(make("late"));
        assert_eq!(*log.lock().unwrap(), vec![r#"late:Err("boom")"#]);
        assert_eq!(cell.queued(), 0);
    }

    #[test]
    fn test_second_settlement_is_refused() {
        let cell = Shared::<i32, String>::new();
        cell.settle(Ok(1)).unwrap();
        assert_eq!(
            cell.settle(Err("late".into())),
            Err(Error::AlreadySettled(Status::Fulfilled))
        );
        assert_eq!(cell.state(), State::Fulfilled(1));
    }

    #[test]
    fn test_reaction_may_reenter_the_cell() {
        let cell = Arc::new(Shared::<i32, String>::new());
        let (log, make) = recorder();
        let again = cell.clone();
        cell.subscribe(Box::new(move |_: Result<i32, String>| again.subscribe(make("nested"))));
        cell.settle(Ok(3)).unwrap();
        assert_eq!(*log.lock().unwrap(), vec!["nested:Ok(3)"]);
    }

    #[test]
    fn test_panicking_observer_does_not_starve_the_rest() {
        let cell = Shared::<i32, String>::new();
        let counter = Arc::new(CountingWaker(AtomicUsize::new(0)));
        let waker = task::waker(counter.clone());
        assert_eq!(cell.poll_outcome(&waker), None);

        let (log, make) = recorder();
        cell.subscribe(Box::new(|_: Result<i32, String>| panic!("observer failed")));
        cell.subscribe(make("after"));
        let result = panic::catch_unwind(AssertUnwindSafe(|| cell.settle(Ok(1))));

        assert!(result.is_err());
        assert_eq!(*log.lock().unwrap(), vec!["after:Ok(1)"]);
        assert_eq!(counter.0.load(Ordering::SeqCst), 1);
        assert_eq!(cell.poll_outcome(&waker), Some(Ok(1)));
    }

    #[test]
    fn test_status_display() {
        assert_eq!(Status::Pending.to_string(), "pending");
        assert_eq!(State::<(), ()>::Rejected(()).status().to_string(), "rejected");
    }
}
