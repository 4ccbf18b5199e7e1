//! Background worker servicing placement requests.
//!
//! A single named thread pops jobs from a mutex-guarded queue and runs them through the
//! stage chain. Submitting never blocks on a computation. Dropping the [`Worker`] lets it
//! drain the jobs still queued, then joins the thread.
use std::collections::VecDeque;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use parking_lot::{Condvar, Mutex};
use tracing::{debug, error, info};

use crate::data::PlacementRequest;
use crate::error::Result;
use crate::kernels::{StageChain, StageContext};
use crate::pipeline::config::QueueOrder;
use crate::result::future::ResultPromise;
use crate::sampling::PlacementPattern;

const THREAD_NAME: &str = "placement-worker";

/// A request together with the pattern it was submitted with.
pub(crate) struct Job {
    pub(crate) request: PlacementRequest,
    pub(crate) pattern: Arc<PlacementPattern>,
    pub(crate) promise: ResultPromise,
}

struct WorkerQueue {
    jobs: VecDeque<Job>,
    shutdown: bool,
}

impl WorkerQueue {
    fn pop(&mut self, order: QueueOrder) -> Option<Job> {
        match order {
            QueueOrder::Fifo => self.jobs.pop_front(),
            QueueOrder::Lifo => self.jobs.pop_back(),
        }
    }
}

struct Shared {
    queue: Mutex<WorkerQueue>,
    available: Condvar,
}

pub(crate) struct Worker {
    shared: Arc<Shared>,
    handle: Option<JoinHandle<()>>,
}

impl Worker {
    /// Starts the worker thread.
    pub(crate) fn spawn(chain: Arc<StageChain>, order: QueueOrder) -> Result<Self> {
        let shared = Arc::new(Shared {
            queue: Mutex::new(WorkerQueue {
                jobs: VecDeque::new(),
                shutdown: false,
            }),
            available: Condvar::new(),
        });

        let thread_shared = shared.clone();
        let handle = thread::Builder::new()
            .name(THREAD_NAME.to_owned())
            .spawn(move || worker_loop(&thread_shared, &chain, order))?;

        info!("Placement worker started | order: {:?}.", order);
        Ok(Self {
            shared,
            handle: Some(handle),
        })
    }

    /// Queues a job and wakes the worker.
    pub(crate) fn submit(&self, job: Job) {
        self.shared.queue.lock().jobs.push_back(job);
        self.shared.available.notify_one();
    }

    /// Number of jobs queued but not yet started.
    pub(crate) fn pending(&self) -> usize {
        self.shared.queue.lock().jobs.len()
    }
}

impl Drop for Worker {
    fn drop(&mut self) {
        self.shared.queue.lock().shutdown = true;
        self.shared.available.notify_all();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                error!("Placement worker terminated abnormally.");
            }
        }
    }
}

fn worker_loop(shared: &Shared, chain: &StageChain, order: QueueOrder) {
    loop {
        let job = {
            let mut queue = shared.queue.lock();
            loop {
                if let Some(job) = queue.pop(order) {
                    break Some(job);
                }
                if queue.shutdown {
                    break None;
                }
                shared.available.wait(&mut queue);
            }
        };
        match job {
            Some(job) => run_job(chain, job),
            None => break,
        }
    }
    info!("Placement worker stopped.");
}

/// Runs one job; a failing or panicking chain drops the promise, abandoning the request.
fn run_job(chain: &StageChain, job: Job) {
    let Job {
        request,
        pattern,
        promise,
    } = job;
    let ctx = StageContext {
        request: &request,
        pattern: &pattern,
    };

    match catch_unwind(AssertUnwindSafe(|| chain.run(&ctx))) {
        Ok(Ok(buffer)) => {
            debug!(
                "Placement request done | placed: {} of {} candidates.",
                buffer.len(),
                buffer.stats().candidates
            );
            promise.fulfill(buffer);
        }
        Ok(Err(err)) => {
            error!("Placement request failed: {}. Abandoning.", err);
        }
        Err(_) => {
            error!("Placement request panicked; abandoning.");
        }
    }
}
