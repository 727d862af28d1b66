pub mod admission;
pub mod cache;
pub mod metrics;
pub mod queue;
pub mod tiers;

pub use admission::{Admission, ExecutionContext};
pub use cache::NonBlockingCache;
pub use metrics::{QueueMetrics, QueueMetricsCollector};
pub use queue::PassiveQueue;
pub use tiers::TieredQueue;
