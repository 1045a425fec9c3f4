//! Sharded aggregation
//!
//! Every shard is an [`Aggregator`] owned by its own task. Nothing outside
//! that task touches the shard; all cross-shard work is message passing
//! through the [`Dispatcher`], and [`FanOutExecutor`] builds whole-state
//! reads and deletes on top of it.

mod aggregator;
mod dispatcher;
mod executor;

pub use aggregator::Aggregator;
pub use dispatcher::{DispatchError, Dispatcher, ProcessHandle};
pub use executor::{FanOutExecutor, DEFAULT_RESULT_BUFFER};
