//! Fan-out/fan-in operations over every shard
//!
//! ```text
//!              ┌──► aggregator 0 ──┐
//! caller ──────┼──► aggregator 1 ──┼──► bounded results ──► caller
//!              └──► aggregator N ──┘         ▲
//!                                   supervisor closes after wait()
//! ```

use super::dispatcher::{DispatchError, Dispatcher};
use crate::metrics::MetricKind;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Result slots between producing shards and the draining caller
pub const DEFAULT_RESULT_BUFFER: usize = 16;

/// Runs read and delete operations across all shards of a [`Dispatcher`]
#[derive(Clone)]
pub struct FanOutExecutor {
    dispatcher: Dispatcher,
    result_buffer: usize,
}

impl FanOutExecutor {
    pub fn new(dispatcher: Dispatcher) -> Self {
        Self::with_result_buffer(dispatcher, DEFAULT_RESULT_BUFFER)
    }

    pub fn with_result_buffer(dispatcher: Dispatcher, result_buffer: usize) -> Self {
        FanOutExecutor {
            dispatcher,
            result_buffer: result_buffer.max(1),
        }
    }

    /// Render the `kind` collection of every shard and concatenate the parts
    /// in arrival order.
    ///
    /// Best effort under cancellation: once `cancel` fires, producers drop
    /// their parts instead of enqueueing them and the caller returns whatever
    /// was drained so far.
    pub async fn collect_all(
        &self,
        cancel: &CancellationToken,
        kind: MetricKind,
    ) -> Result<String, DispatchError> {
        let (tx, mut rx) = mpsc::channel::<String>(self.result_buffer);

        let producer_tx = tx.clone();
        let producer_cancel = cancel.clone();
        let handle = self.dispatcher.process(move |_, aggregator| {
            // Every shard renders into its own buffer
            let mut part = String::new();
            aggregator.process(|metrics| metrics.collection(kind).render(&mut part));

            let tx = producer_tx.clone();
            let cancel = producer_cancel.clone();
            async move {
                if part.is_empty() {
                    return;
                }
                tokio::select! {
                    _ = cancel.cancelled() => {}
                    _ = tx.send(part) => {}
                }
            }
        })?;

        // Sole closer of the channel. Workers release their senders before
        // reporting completion, so after wait() this is the last one.
        tokio::spawn(async move {
            if let Err(e) = handle.wait().await {
                warn!("fan-out for {} did not complete: {}", kind, e);
            }
            drop(tx);
        });

        let mut output = String::new();
        loop {
            tokio::select! {
                part = rx.recv() => match part {
                    Some(part) => output.push_str(&part),
                    None => break,
                },
                _ = cancel.cancelled() => {
                    debug!("collection of {} cancelled after {} bytes", kind, output.len());
                    break;
                }
            }
        }

        Ok(output)
    }

    /// Remove `keys` from the `kind` collection of every shard and return how
    /// many entries were actually removed. Absent keys are ignored.
    ///
    /// The deletes are submitted to every shard regardless of `cancel`; a
    /// cancelled caller stops waiting and gets the count observed so far.
    pub async fn delete_all(
        &self,
        cancel: &CancellationToken,
        kind: MetricKind,
        keys: &[String],
    ) -> Result<u64, DispatchError> {
        let deleted = Arc::new(AtomicU64::new(0));
        let keys: Arc<[String]> = keys.into();

        let counter = deleted.clone();
        let handle = self.dispatcher.process(move |_, aggregator| {
            aggregator.process(|metrics| {
                let collection = metrics.collection_mut(kind);
                let mut removed = 0u64;
                for key in keys.iter() {
                    if collection.delete(key) {
                        removed += 1;
                    }
                }
                counter.fetch_add(removed, Ordering::Relaxed);
            });
            std::future::ready(())
        })?;

        tokio::select! {
            result = handle.wait() => result?,
            _ = cancel.cancelled() => {
                debug!("delete of {} cancelled before all shards reported", kind);
            }
        }

        // wait() orders every shard's increment before this load
        Ok(deleted.load(Ordering::Relaxed))
    }
}
