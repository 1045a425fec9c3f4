use crate::metrics::{Metric, MetricMap};
use futures::future::BoxFuture;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tracing::debug;

/// Work broadcast to every shard by [`Dispatcher::process`](super::Dispatcher::process).
///
/// The call itself has exclusive access to the shard. The returned future is
/// the hand-off phase: it may not touch the shard, and the worker awaits it
/// before taking its next message.
pub(crate) type Work = Arc<dyn Fn(u16, &mut Aggregator) -> BoxFuture<'static, ()> + Send + Sync>;

/// Owns one shard of metric state
#[derive(Debug)]
pub struct Aggregator {
    worker_id: u16,
    metrics: MetricMap,
}

impl Aggregator {
    pub fn new(worker_id: u16) -> Self {
        Aggregator {
            worker_id,
            metrics: MetricMap::new(),
        }
    }

    pub fn worker_id(&self) -> u16 {
        self.worker_id
    }

    /// Run `f` against this aggregator's shard
    pub fn process<F: FnOnce(&mut MetricMap)>(&mut self, f: F) {
        f(&mut self.metrics);
    }

    pub fn receive(&mut self, metric: Metric) {
        self.metrics.receive(metric);
    }

    pub fn metrics(&self) -> &MetricMap {
        &self.metrics
    }
}

pub(crate) enum WorkerMessage {
    /// Ingestion: merge one metric into the shard
    Metric(Metric),
    /// Fan-out work; `done` fires after the hand-off phase finished
    Process {
        work: Work,
        done: oneshot::Sender<()>,
    },
}

/// Long-lived task that owns an [`Aggregator`] and drains its private queue
pub(crate) struct AggregatorActor {
    aggregator: Aggregator,
    rx: mpsc::UnboundedReceiver<WorkerMessage>,
}

impl AggregatorActor {
    pub(crate) fn new(worker_id: u16, rx: mpsc::UnboundedReceiver<WorkerMessage>) -> Self {
        AggregatorActor {
            aggregator: Aggregator::new(worker_id),
            rx,
        }
    }

    pub(crate) async fn run(mut self) {
        let worker_id = self.aggregator.worker_id();
        debug!(worker_id, "aggregator started");

        while let Some(msg) = self.rx.recv().await {
            match msg {
                WorkerMessage::Metric(metric) => self.aggregator.receive(metric),
                WorkerMessage::Process { work, done } => {
                    let handoff = work(worker_id, &mut self.aggregator);
                    // Release the work before signalling so that anything it
                    // captured is gone once the caller observes completion.
                    drop(work);
                    handoff.await;
                    let _ = done.send(());
                }
            }
        }

        debug!(worker_id, "aggregator stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::{MetricKind, TagSet};

    #[test]
    fn test_process_runs_against_own_shard() {
        let mut aggr = Aggregator::new(3);
        aggr.receive(Metric::counter("hits", TagSet::empty(), 4));

        let mut seen = 0;
        aggr.process(|m| seen = m.collection(MetricKind::Counter).len());

        assert_eq!(seen, 1);
        assert_eq!(aggr.worker_id(), 3);
    }

    #[tokio::test]
    async fn test_actor_handles_messages_in_order() {
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(AggregatorActor::new(0, rx).run());

        assert!(tx
            .send(WorkerMessage::Metric(Metric::gauge("g", TagSet::empty(), 1.0)))
            .is_ok());
        assert!(tx
            .send(WorkerMessage::Metric(Metric::gauge("g", TagSet::empty(), 2.0)))
            .is_ok());

        let (seen_tx, seen_rx) = oneshot::channel();
        let seen_tx = parking_lot::Mutex::new(Some(seen_tx));
        let work: Work = Arc::new(move |_: u16, aggr: &mut Aggregator| -> BoxFuture<'static, ()> {
            let value = aggr.metrics().gauges.get("g", &TagSet::empty()).copied();
            if let Some(tx) = seen_tx.lock().take() {
                let _ = tx.send(value);
            }
            Box::pin(async {})
        });
        let (done_tx, done_rx) = oneshot::channel();
        assert!(tx.send(WorkerMessage::Process { work, done: done_tx }).is_ok());

        done_rx.await.unwrap();
        assert_eq!(seen_rx.await.unwrap(), Some(2.0));
    }
}
