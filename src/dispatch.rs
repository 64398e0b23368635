//! Per-thread run queue for observer dispatch.
//!
//! Settling the head of a chain settles every link behind it. Running each
//! link from inside the previous one would nest one stack frame group per
//! link, so observers are queued here instead and the outermost call on a
//! thread drains the queue in a loop. Everything still runs before that
//! outermost call returns.
use std::any::Any;
use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::panic::{self, AssertUnwindSafe};

type Job = Box<dyn FnOnce()>;

thread_local! {
    static QUEUE: RefCell<VecDeque<Job>> = const { RefCell::new(VecDeque::new()) };
    static DRAINING: Cell<bool> = const { Cell::new(false) };
}

/// Runs `job` on this thread, after any job already queued.
///
/// When called from inside a running job, `job` is queued and returns at
/// once; otherwise this call drains the queue, `job` included.
pub(crate) fn run(job: impl FnOnce() + 'static) {
    QUEUE.with(|queue| queue.borrow_mut().push_back(Box::new(job)));
    if DRAINING.with(|draining| draining.replace(true)) {
        return;
    }

    // A panicking observer must not starve the ones queued after it; the
    // first panic is raised again once the queue is empty.
    let mut panicked: Option<Box<dyn Any + Send>> = None;
    while let Some(job) = QUEUE.with(|queue| queue.borrow_mut().pop_front()) {
        if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(job)) {
            panicked.get_or_insert(payload);
        }
    }
    DRAINING.with(|draining| draining.set(false));

    if let Some(payload) = panicked {
        panic::resume_unwind(payload);
    }
}
