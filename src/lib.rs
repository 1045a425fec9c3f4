pub mod aggregator;
pub mod console;
pub mod metrics;
pub mod observability;
pub mod stats;

pub use aggregator::{Aggregator, DispatchError, Dispatcher, FanOutExecutor};
pub use console::{ConsoleConfig, ConsoleError, ConsoleServer};
pub use metrics::{Metric, MetricKind, MetricMap, TagSet};
