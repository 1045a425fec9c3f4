//! Read-only views of the receiving and flushing pipelines
//!
//! The console only ever takes snapshots through [`Receiver`] and
//! [`Flusher`]; the trackers here are the in-process implementations an
//! embedding server updates as it works.

mod flusher;
mod receiver;

pub use flusher::{FlushStatsTracker, Flusher, FlusherStats};
pub use receiver::{Receiver, ReceiverStats, ReceiverStatsTracker};
