//! Write-once promises with `then`/`catch`/`finally` chaining.
//!
//! A [`Promise`] is an observe-only handle on an eventual value or error.
//! The right to settle it lives in a separate [`Resolver`], handed to the
//! producer either through [`Promise::new`] or [`Promise::deferred`]. The
//! crate never schedules work: observers run on whichever thread settles
//! the promise, or immediately when registered on a settled one.
//!
//! # Examples
//!
//! ```
//! use promise_chain::{Promise, Recovery};
//! use futures::executor::block_on;
//! use std::thread;
//!
//! let (promise, resolver) = Promise::<i32, String>::deferred();
//! let doubled = promise
//!     .then(|v| Promise::fulfilled(v * 2))
//!     .catch(|_| Recovery::Recover(Promise::fulfilled(0)));
//!
//! let producer = thread::spawn(move || resolver.fulfill(21));
//! assert_eq!(block_on(doubled), Ok(42));
//! producer.join().expect("The producer thread has panicked.");
//! ```
use std::sync::Arc;
use thiserror::Error;

pub mod chain;
mod dispatch;
pub mod promise;
pub mod state;

pub use chain::Recovery;
pub use promise::{Promise, Resolver};
pub use state::{State, Status};

/// Opaque domain error, cheap to hand to every observer.
pub type SharedError = Arc<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Error, Debug, PartialEq, Eq, Clone, Copy)]
pub enum Error {
    #[error("promise is already {0}, it can only be settled once")]
    AlreadySettled(Status),
}
