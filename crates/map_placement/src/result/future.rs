//! Single-assignment handle for a result that a worker publishes later.
//!
//! [`FutureResult`] is the consumer side returned by
//! [`crate::pipeline::PlacementPipeline::compute_placement`]; the worker owns the matching
//! [`ResultPromise`]. Polling is cheap and repeatable, [`FutureResult::read_result`]
//! consumes the handle so the buffer can be moved out exactly once.
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

use crate::error::{Error, Result};
use crate::result::buffer::ResultBuffer;
use crate::result::view::PlacementResult;

enum Slot {
    Pending,
    Ready(ResultBuffer),
    Abandoned,
    Consumed,
}

struct Shared {
    slot: Mutex<Slot>,
    resolved: Condvar,
}

/// Creates a connected promise/future pair.
pub(crate) fn channel() -> (ResultPromise, FutureResult) {
    let shared = Arc::new(Shared {
        slot: Mutex::new(Slot::Pending),
        resolved: Condvar::new(),
    });
    (
        ResultPromise {
            shared: Some(shared.clone()),
        },
        FutureResult { shared },
    )
}

/// Handle to a placement result that may still be computing.
pub struct FutureResult {
    shared: Arc<Shared>,
}

impl FutureResult {
    /// A handle that is already resolved with `buffer`.
    pub fn ready(buffer: ResultBuffer) -> Self {
        Self {
            shared: Arc::new(Shared {
                slot: Mutex::new(Slot::Ready(buffer)),
                resolved: Condvar::new(),
            }),
        }
    }

    /// Returns `true` once the result is published (or the request was abandoned).
    ///
    /// Never blocks on the computation.
    pub fn is_ready(&self) -> bool {
        !matches!(*self.shared.slot.lock(), Slot::Pending)
    }

    /// Blocks until the result is published.
    pub fn wait(&self) {
        let mut slot = self.shared.slot.lock();
        while matches!(*slot, Slot::Pending) {
            self.shared.resolved.wait(&mut slot);
        }
    }

    /// Blocks for at most `timeout`. Returns whether the result is ready.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let Some(deadline) = Instant::now().checked_add(timeout) else {
            self.wait();
            return true;
        };
        let mut slot = self.shared.slot.lock();
        while matches!(*slot, Slot::Pending) {
            if self
                .shared
                .resolved
                .wait_until(&mut slot, deadline)
                .timed_out()
            {
                return !matches!(*slot, Slot::Pending);
            }
        }
        true
    }

    /// Runs `f` on the published buffer without consuming the handle.
    ///
    /// Blocks until the worker publishes the result.
    pub fn inspect<R>(&self, f: impl FnOnce(&ResultBuffer) -> R) -> Result<R> {
        let mut slot = self.shared.slot.lock();
        while matches!(*slot, Slot::Pending) {
            self.shared.resolved.wait(&mut slot);
        }
        match &*slot {
            Slot::Ready(buffer) => Ok(f(buffer)),
            _ => Err(Error::Abandoned),
        }
    }

    /// Waits for the result and moves it out.
    pub fn read_result(self) -> Result<PlacementResult> {
        let mut slot = self.shared.slot.lock();
        while matches!(*slot, Slot::Pending) {
            self.shared.resolved.wait(&mut slot);
        }
        match std::mem::replace(&mut *slot, Slot::Consumed) {
            Slot::Ready(buffer) => Ok(PlacementResult::new(buffer)),
            _ => Err(Error::Abandoned),
        }
    }

    /// Moves the result out if it is ready, otherwise hands the future back.
    pub fn try_read_result(self) -> std::result::Result<Result<PlacementResult>, Self> {
        if self.is_ready() {
            Ok(self.read_result())
        } else {
            Err(self)
        }
    }
}

impl fmt::Debug for FutureResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FutureResult")
            .field("ready", &self.is_ready())
            .finish()
    }
}

/// Producer side of a [`FutureResult`]. Dropping it unfulfilled marks the request abandoned.
pub(crate) struct ResultPromise {
    shared: Option<Arc<Shared>>,
}

impl ResultPromise {
    /// Publishes `buffer` and wakes every waiter.
    pub(crate) fn fulfill(mut self, buffer: ResultBuffer) {
        if let Some(shared) = self.shared.take() {
            *shared.slot.lock() = Slot::Ready(buffer);
            shared.resolved.notify_all();
        }
    }
}

impl Drop for ResultPromise {
    fn drop(&mut self) {
        if let Some(shared) = self.shared.take() {
            let mut slot = shared.slot.lock();
            if matches!(*slot, Slot::Pending) {
                *slot = Slot::Abandoned;
            }
            drop(slot);
            shared.resolved.notify_all();
        }
    }
}
