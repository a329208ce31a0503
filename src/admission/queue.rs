use std::collections::VecDeque;
use std::sync::Arc;

use futures::future::BoxFuture;
use parking_lot::Mutex;
use tokio::sync::{Notify, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, trace};

use super::errors::AdmissionError;
use crate::supervisor::Supervisor;

/// What the queue needs to know about the pool it feeds
pub trait CapacitySource: Send + Sync + 'static {
    fn is_available(&self) -> bool;
    fn operational_workers(&self) -> usize;
}

impl CapacitySource for Supervisor {
    fn is_available(&self) -> bool {
        Supervisor::is_available(self)
    }

    fn operational_workers(&self) -> usize {
        Supervisor::operational_workers(self)
    }
}

type Job<T> = Box<dyn FnOnce() -> BoxFuture<'static, T> + Send>;

struct Queued<T> {
    job: Job<T>,
    reply: oneshot::Sender<T>,
}

struct Slots<T> {
    queue: VecDeque<Queued<T>>,
    running: usize,
}

struct Shared<T> {
    capacity: Arc<dyn CapacitySource>,
    slots: Mutex<Slots<T>>,
}

/// FIFO queue admitting jobs while `running <= operational_workers()` and
/// the pool has an idle worker
///
/// A job is a thunk: it is invoked synchronously at admission, so whatever
/// it dispatches before its first await is visible to the next admission
/// check. Its future then runs on its own task.
pub struct AdmissionQueue<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Clone for AdmissionQueue<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T: Send + 'static> AdmissionQueue<T> {
    pub fn new(capacity: Arc<dyn CapacitySource>) -> Self {
        Self {
            shared: Arc::new(Shared {
                capacity,
                slots: Mutex::new(Slots {
                    queue: VecDeque::new(),
                    running: 0,
                }),
            }),
        }
    }

    /// Queue `job` and wait for its result
    ///
    /// Dropping the returned future before admission removes the job from
    /// consideration; after admission the job runs to completion.
    pub async fn push<F>(&self, job: F) -> Result<T, AdmissionError>
    where
        F: FnOnce() -> BoxFuture<'static, T> + Send + 'static,
    {
        let (reply, result) = oneshot::channel();
        self.shared.slots.lock().queue.push_back(Queued {
            job: Box::new(job),
            reply,
        });
        Shared::pump(&self.shared);
        result.await.map_err(|_| AdmissionError::Abandoned)
    }

    /// Jobs waiting for admission
    pub fn pending(&self) -> usize {
        self.shared.slots.lock().queue.len()
    }

    /// Admitted jobs that have not completed
    pub fn running(&self) -> usize {
        self.shared.slots.lock().running
    }

    /// Re-evaluate admission whenever `notify` fires
    ///
    /// Used with the supervisor's idle notifier so capacity that frees up
    /// outside this queue (batch scans, cancellations) admits waiting jobs.
    pub fn watch(&self, notify: Arc<Notify>) -> JoinHandle<()> {
        let shared = Arc::clone(&self.shared);
        tokio::spawn(async move {
            loop {
                notify.notified().await;
                Shared::pump(&shared);
            }
        })
    }
}

impl<T: Send + 'static> Shared<T> {
    fn pump(this: &Arc<Self>) {
        loop {
            let next = {
                let mut slots = this.slots.lock();
                if slots.queue.is_empty() {
                    return;
                }
                let operational = this.capacity.operational_workers();
                if slots.running > operational || !this.capacity.is_available() {
                    trace!(
                        running = slots.running,
                        operational,
                        pending = slots.queue.len(),
                        "Admission deferred"
                    );
                    return;
                }
                let Some(next) = slots.queue.pop_front() else {
                    return;
                };
                if next.reply.is_closed() {
                    debug!("Skipping abandoned job");
                    continue;
                }
                slots.running += 1;
                next
            };

            let guard = RunningGuard {
                shared: Arc::clone(this),
            };
            let work = (next.job)();
            let reply = next.reply;
            tokio::spawn(async move {
                let output = work.await;
                let _ = reply.send(output);
                drop(guard);
            });
        }
    }
}

/// Releases a running slot and admits the next job, also on panic
struct RunningGuard<T: Send + 'static> {
    shared: Arc<Shared<T>>,
}

impl<T: Send + 'static> Drop for RunningGuard<T> {
    fn drop(&mut self) {
        {
            let mut slots = self.shared.slots.lock();
            slots.running = slots.running.saturating_sub(1);
        }
        Shared::pump(&self.shared);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::FutureExt;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    struct FixedCapacity {
        available: AtomicBool,
        workers: AtomicUsize,
    }

    impl CapacitySource for FixedCapacity {
        fn is_available(&self) -> bool {
            self.available.load(Ordering::SeqCst)
        }

        fn operational_workers(&self) -> usize {
            self.workers.load(Ordering::SeqCst)
        }
    }

    #[tokio::test]
    async fn unavailable_pool_holds_jobs_until_notified() {
        let capacity = Arc::new(FixedCapacity {
            available: AtomicBool::new(false),
            workers: AtomicUsize::new(1),
        });
        let queue: AdmissionQueue<u32> = AdmissionQueue::new(capacity.clone());
        let notify = Arc::new(Notify::new());
        let _watcher = queue.watch(Arc::clone(&notify));

        let pushed = {
            let queue = queue.clone();
            tokio::spawn(async move { queue.push(|| async { 7 }.boxed()).await })
        };
        tokio::task::yield_now().await;
        assert_eq!(queue.pending(), 1);

        capacity.available.store(true, Ordering::SeqCst);
        notify.notify_one();

        assert_eq!(pushed.await.unwrap(), Ok(7));
        assert_eq!(queue.pending(), 0);
        assert_eq!(queue.running(), 0);
    }
}
