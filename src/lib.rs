pub mod affinity;
pub mod config;
pub mod error;
pub mod harness;
pub mod queue;
pub mod report;
pub mod trace;
pub mod work;

pub use config::{QueueBackend, RunConfig};
pub use error::HarnessError;
pub use harness::{Harness, RunReport, Token};
pub use queue::{BoundedQueue, ChannelQueue};
pub use work::simulate_work;

/// Snapshot of the contention counters a blocking queue keeps.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueueMetrics {
   pub capacity: usize,
   /// Number of times a `push` had to park because the queue was full.
   pub waits_on_full: u64,
   /// Number of times a `pop` had to park because the queue was empty.
   pub waits_on_empty: u64,
   /// High-water mark of the occupied slot count.
   pub max_observed_size: usize,
}

/// Common interface for all bounded blocking queues.
pub trait BlockingQueue<T: Send>: Send + Sync {
   /// Blocks while the queue is full.
   fn push(&self, item: T);
   /// Blocks while the queue is empty.
   fn pop(&self) -> T;

   /// Hands the item back instead of blocking when the queue is full.
   fn try_push(&self, item: T) -> Result<(), T>;
   fn try_pop(&self) -> Option<T>;

   fn len(&self) -> usize;
   fn capacity(&self) -> usize;
   fn metrics(&self) -> QueueMetrics;

   fn is_empty(&self) -> bool {
      self.len() == 0
   }
}
