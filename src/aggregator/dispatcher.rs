use super::aggregator::{Aggregator, AggregatorActor, WorkerMessage, Work};
use crate::metrics::Metric;
use futures::future::BoxFuture;
use futures::FutureExt;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};

/// Fixed seeds so a metric name always routes to the same worker
const ROUTING_SEEDS: [u64; 4] = [
    0x243f_6a88_85a3_08d3,
    0x1319_8a2e_0370_7344,
    0xa409_3822_299f_31d0,
    0x082e_fa98_ec4e_6c89,
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchError {
    /// The worker's queue is closed. The pool lives as long as the process,
    /// so this only happens when the runtime is shutting down.
    WorkerUnavailable(u16),
}

impl std::fmt::Display for DispatchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DispatchError::WorkerUnavailable(id) => write!(f, "aggregator {} is unavailable", id),
        }
    }
}

impl std::error::Error for DispatchError {}

#[derive(Clone)]
struct WorkerHandle {
    tx: mpsc::UnboundedSender<WorkerMessage>,
    worker_id: u16,
}

impl WorkerHandle {
    fn send(&self, msg: WorkerMessage) -> Result<(), DispatchError> {
        self.tx
            .send(msg)
            .map_err(|_| DispatchError::WorkerUnavailable(self.worker_id))
    }
}

/// Completion handle returned by [`Dispatcher::process`]
#[must_use = "work completion is only observable through wait()"]
pub struct ProcessHandle {
    pending: Vec<(u16, oneshot::Receiver<()>)>,
}

impl ProcessHandle {
    /// Resolves once every worker ran the work and finished its hand-off
    pub async fn wait(self) -> Result<(), DispatchError> {
        let (ids, receivers): (Vec<u16>, Vec<_>) = self.pending.into_iter().unzip();
        let results = futures::future::join_all(receivers).await;
        for (worker_id, result) in ids.into_iter().zip(results) {
            result.map_err(|_| DispatchError::WorkerUnavailable(worker_id))?;
        }
        Ok(())
    }
}

/// Pool of aggregators, each on its own task with a private FIFO queue.
/// Cheap to clone; all clones share the same workers.
#[derive(Clone)]
pub struct Dispatcher {
    workers: Arc<[WorkerHandle]>,
    routing: ahash::RandomState,
}

impl Dispatcher {
    /// Spawn `num_workers` aggregators (at least one) on the current runtime
    pub fn new(num_workers: u16) -> Self {
        let num_workers = num_workers.max(1);
        let workers: Vec<WorkerHandle> = (0..num_workers)
            .map(|worker_id| {
                let (tx, rx) = mpsc::unbounded_channel();
                tokio::spawn(AggregatorActor::new(worker_id, rx).run());
                WorkerHandle { tx, worker_id }
            })
            .collect();
        debug_assert_eq!(workers.len(), num_workers as usize);

        let [k0, k1, k2, k3] = ROUTING_SEEDS;
        Dispatcher {
            workers: workers.into(),
            routing: ahash::RandomState::with_seeds(k0, k1, k2, k3),
        }
    }

    pub fn num_workers(&self) -> usize {
        self.workers.len()
    }

    /// Submit `f` once to every worker and return a handle to wait on.
    ///
    /// `f` runs on each worker's task, behind whatever is already queued
    /// there. Submission never blocks and is not cancellable; work that should
    /// honor cancellation must carry its own token.
    pub fn process<F, Fut>(&self, f: F) -> Result<ProcessHandle, DispatchError>
    where
        F: Fn(u16, &mut Aggregator) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let work: Work = Arc::new(
            move |worker_id: u16, aggregator: &mut Aggregator| -> BoxFuture<'static, ()> {
                f(worker_id, aggregator).boxed()
            },
        );

        let mut pending = Vec::with_capacity(self.workers.len());
        for worker in self.workers.iter() {
            let (done_tx, done_rx) = oneshot::channel();
            worker.send(WorkerMessage::Process {
                work: work.clone(),
                done: done_tx,
            })?;
            pending.push((worker.worker_id, done_rx));
        }

        debug_assert_eq!(pending.len(), self.workers.len());
        Ok(ProcessHandle { pending })
    }

    /// Route a received metric to the worker owning its name
    pub fn dispatch(&self, metric: Metric) -> Result<(), DispatchError> {
        let idx = self.worker_for(&metric.name);
        self.workers[idx].send(WorkerMessage::Metric(metric))
    }

    /// Queue a metric on a specific worker, bypassing name routing
    pub fn dispatch_to(&self, worker_id: u16, metric: Metric) -> Result<(), DispatchError> {
        let worker = self
            .workers
            .get(worker_id as usize)
            .ok_or(DispatchError::WorkerUnavailable(worker_id))?;
        worker.send(WorkerMessage::Metric(metric))
    }

    /// Shard that owns every metric called `name`
    #[inline]
    pub fn worker_for(&self, name: &str) -> usize {
        let idx = (self.routing.hash_one(name) as usize) % self.workers.len();
        debug_assert!(idx < self.workers.len(), "Hash produced invalid worker index");
        idx
    }
}
