//! Producer/consumer driver.
//!
//! Spawns `P` producers and `C` consumers against one shared queue, shuts
//! the consumers down with stop tokens once every producer has returned,
//! and collects counters and queue metrics into a [`RunReport`].

use crate::affinity::pin_current_thread;
use crate::config::{QueueBackend, RunConfig};
use crate::error::HarnessError;
use crate::queue::{BoundedQueue, ChannelQueue};
use crate::work::simulate_work;
use crate::{BlockingQueue, QueueMetrics};

use crossbeam::utils::{Backoff, CachePadded};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle, Thread};
use std::time::{Duration, Instant};
use tracing::{debug, info, trace, warn};

/// Lower bound for the throughput denominator.
pub const MIN_ELAPSED_SECS: f64 = 1e-12;

/// How long the harness parks between checks while producers are running.
const PRODUCER_POLL: Duration = Duration::from_millis(1);

/// What travels through the queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Token {
   /// One unit of work carrying its claimed id.
   Item(u64),
   /// Tells the consumer that pops it to exit.
   Stop,
}

/// Counters shared by every unit of one run.
#[derive(Debug)]
pub struct SharedCounters {
   /// Next item id to claim. Ends at `items + P`: each producer's final
   /// failed claim still bumps it.
   pub produced: CachePadded<AtomicU64>,
   pub consumed: CachePadded<AtomicU64>,
   /// Wrapping sum of consumed item ids.
   pub checksum: CachePadded<AtomicU64>,
   live_producers: AtomicUsize,
   live_consumers: AtomicUsize,
   aborted: AtomicBool,
}

impl SharedCounters {
   /// Counters for a run with `producers` and `consumers` units. Every
   /// consumer thread that runs [`consume`] must be counted here before it
   /// starts; producer slots are released by the harness's thread wrapper.
   pub fn new(producers: usize, consumers: usize) -> Self {
      Self {
         produced: CachePadded::new(AtomicU64::new(0)),
         consumed: CachePadded::new(AtomicU64::new(0)),
         checksum: CachePadded::new(AtomicU64::new(0)),
         live_producers: AtomicUsize::new(producers),
         live_consumers: AtomicUsize::new(consumers),
         aborted: AtomicBool::new(false),
      }
   }

   pub fn live_producers(&self) -> usize {
      self.live_producers.load(Ordering::Acquire)
   }

   pub fn live_consumers(&self) -> usize {
      self.live_consumers.load(Ordering::Acquire)
   }

   /// Makes producers stop claiming new ids.
   pub fn abort(&self) {
      self.aborted.store(true, Ordering::Relaxed);
   }

   pub fn is_aborted(&self) -> bool {
      self.aborted.load(Ordering::Relaxed)
   }

   // Consumers that were counted but never started.
   fn forget_consumers(&self, n: usize) {
      saturating_release(&self.live_consumers, n);
   }
}

// Never wraps below zero, so an over-release cannot fake a live unit.
fn saturating_release(count: &AtomicUsize, n: usize) {
   let _ = count.fetch_update(Ordering::AcqRel, Ordering::Acquire, |v| Some(v.saturating_sub(n)));
}

// Releases one live-unit slot however the unit leaves.
struct LiveGuard<'a>(&'a AtomicUsize);

impl Drop for LiveGuard<'_> {
   fn drop(&mut self) {
      saturating_release(self.0, 1);
   }
}

// Owned by each producer thread. On exit it releases the producer's live
// slot and wakes the harness; on a panic it also stops the other producers.
struct ProducerExit {
   harness: Thread,
   counters: Arc<SharedCounters>,
}

impl Drop for ProducerExit {
   fn drop(&mut self) {
      if thread::panicking() {
         self.counters.abort();
      }
      saturating_release(&self.counters.live_producers, 1);
      self.harness.unpark();
   }
}

#[derive(Debug, Clone)]
pub struct RunReport {
   /// Configuration as run: producer and consumer counts are the clamped
   /// values, not the requested ones.
   pub config: RunConfig,
   pub elapsed: Duration,
   pub metrics: QueueMetrics,
   pub produced: u64,
   pub consumed: u64,
   pub checksum: u64,
   /// Stop tokens actually placed in the queue.
   pub sentinels: usize,
   /// Items pushed by each producer, indexed by producer.
   pub per_producer: Vec<u64>,
   /// Items consumed by each consumer, indexed by consumer.
   pub per_consumer: Vec<u64>,
}

impl RunReport {
   pub fn elapsed_secs(&self) -> f64 {
      self.elapsed.as_secs_f64()
   }

   /// Items per second over the whole run.
   pub fn throughput(&self) -> f64 {
      self.config.items as f64 / self.elapsed_secs().max(MIN_ELAPSED_SECS)
   }

   /// True when both sides reached the item target.
   pub fn validated(&self) -> bool {
      self.produced >= self.config.items && self.consumed >= self.config.items
   }
}

pub struct Harness {
   config: RunConfig,
}

impl Harness {
   pub fn new(config: RunConfig) -> Self {
      Self { config }
   }

   pub fn config(&self) -> &RunConfig {
      &self.config
   }

   /// Runs once on the queue the configured backend names.
   pub fn run(&self) -> Result<RunReport, HarnessError> {
      match self.config.backend {
         QueueBackend::Mutex => self.run_on(Arc::new(BoundedQueue::new(self.config.capacity))),
         QueueBackend::Channel => self.run_on(Arc::new(ChannelQueue::new(self.config.capacity))),
      }
   }

   /// Runs once on a caller-supplied queue.
   ///
   /// Every spawned thread has been joined by the time this returns, on the
   /// error path too. The first failure (spawn, then producer, then consumer
   /// panic) is reported.
   pub fn run_on<Q>(&self, queue: Arc<Q>) -> Result<RunReport, HarnessError>
   where
      Q: BlockingQueue<Token> + 'static,
   {
      let mut config = self.config.clone();
      config.producers = config.producers.max(1);
      config.consumers = config.consumers.max(1);
      let (producers, consumers) = (config.producers, config.consumers);

      let counters = Arc::new(SharedCounters::new(producers, consumers));
      let harness = thread::current();

      info!(
         items = config.items,
         capacity = queue.capacity(),
         producers,
         consumers,
         work_us = config.work_us,
         backend = config.backend.as_str(),
         "starting run"
      );

      let start = Instant::now();

      let (producer_handles, mut failure) = spawn_all("producer", producers, |i| {
         let queue = Arc::clone(&queue);
         let exit = ProducerExit { harness: harness.clone(), counters: Arc::clone(&counters) };
         let (items, pin) = (config.items, config.pin_threads);
         move || {
            let exit = exit;
            if pin {
               pin_current_thread(i);
            }
            produce(&*queue, &exit.counters, items)
         }
      });
      // A producer that failed to spawn released its slot when its closure,
      // and the `ProducerExit` inside it, was dropped.

      let consumer_handles = if failure.is_none() {
         let (handles, err) = spawn_all("consumer", consumers, |i| {
            let queue = Arc::clone(&queue);
            let counters = Arc::clone(&counters);
            let (items, work_us, pin) = (config.items, config.work_us, config.pin_threads);
            move || {
               if pin {
                  pin_current_thread(producers + i);
               }
               consume(&*queue, &counters, items, work_us)
            }
         });
         failure = err;
         handles
      } else {
         Vec::new()
      };
      counters.forget_consumers(consumers - consumer_handles.len());

      if let Some(err) = &failure {
         warn!(%err, "aborting run");
         counters.abort();
      }

      wait_for_producers(&*queue, &counters);
      let per_producer = join_all("producer", producer_handles);
      debug!("all producers finished");

      let sentinels = inject_stop_tokens(&*queue, &counters, consumer_handles.len());
      debug!(sentinels, "stop tokens injected");

      let per_consumer = join_all("consumer", consumer_handles);
      let elapsed = start.elapsed();

      if let Some(err) = failure {
         return Err(err);
      }
      let per_producer = per_producer?;
      let per_consumer = per_consumer?;

      let report = RunReport {
         config,
         elapsed,
         metrics: queue.metrics(),
         produced: counters.produced.load(Ordering::Relaxed),
         consumed: counters.consumed.load(Ordering::Relaxed),
         checksum: counters.checksum.load(Ordering::Relaxed),
         sentinels,
         per_producer,
         per_consumer,
      };

      if report.validated() {
         info!(elapsed_s = report.elapsed_secs(), checksum = report.checksum, "run finished");
      } else {
         warn!(
            produced = report.produced,
            consumed = report.consumed,
            target = report.config.items,
            "run finished short of the item target"
         );
      }
      Ok(report)
   }
}

/*──────────────────────────────────────────────────────────────────────────*/
/*  Unit bodies                                                             */
/*──────────────────────────────────────────────────────────────────────────*/

/// Claims ids from the shared counter and pushes them until the claim
/// reaches `items` or the run is aborted. Returns how many items this
/// producer pushed.
pub fn produce<Q>(queue: &Q, counters: &SharedCounters, items: u64) -> u64
where
   Q: BlockingQueue<Token> + ?Sized,
{
   let mut pushed = 0;
   while !counters.is_aborted() {
      let id = counters.produced.fetch_add(1, Ordering::Relaxed);
      if id >= items {
         break;
      }
      queue.push(Token::Item(id));
      pushed += 1;
   }
   trace!(pushed, "producer exiting");
   pushed
}

/// Pops and processes items until the shared consumed count reaches
/// `items` or a stop token arrives. Returns how many items it consumed.
pub fn consume<Q>(queue: &Q, counters: &SharedCounters, items: u64, work_us: u64) -> u64
where
   Q: BlockingQueue<Token> + ?Sized,
{
   let _live = LiveGuard(&counters.live_consumers);

   let mut handled = 0;
   while counters.consumed.load(Ordering::Relaxed) < items {
      match queue.pop() {
         Token::Stop => {
            trace!("consumer observed stop token");
            break;
         }
         Token::Item(id) => {
            simulate_work(work_us);
            counters.checksum.fetch_add(id, Ordering::Relaxed);
            counters.consumed.fetch_add(1, Ordering::Relaxed);
            handled += 1;
         }
      }
   }
   trace!(handled, "consumer exiting");
   handled
}

/// Places one stop token per consumer behind every item already queued.
///
/// A consumer may also leave through the item-count check without taking a
/// token, so a token that does not fit is only waited on while some
/// consumer is still alive to make room. Returns the number placed.
pub fn inject_stop_tokens<Q>(queue: &Q, counters: &SharedCounters, consumers: usize) -> usize
where
   Q: BlockingQueue<Token> + ?Sized,
{
   for placed in 0..consumers {
      let backoff = Backoff::new();
      let mut token = Token::Stop;
      loop {
         match queue.try_push(token) {
            Ok(()) => break,
            Err(back) => {
               if counters.live_consumers() == 0 {
                  return placed;
               }
               token = back;
               backoff.snooze();
            }
         }
      }
   }
   consumers
}

/*──────────────────────────────────────────────────────────────────────────*/
/*  Thread plumbing                                                         */
/*──────────────────────────────────────────────────────────────────────────*/

fn spawn_unit<F>(role: &'static str, index: usize, body: F) -> Result<JoinHandle<u64>, HarnessError>
where
   F: FnOnce() -> u64 + Send + 'static,
{
   thread::Builder::new()
      .name(format!("{role}-{index}"))
      .spawn(body)
      .map_err(|source| HarnessError::Spawn { role, index, source })
}

/// Spawns up to `count` units, stopping at the first spawn failure. The
/// handles of the units already running are returned alongside the error.
fn spawn_all<M, F>(
   role: &'static str,
   count: usize,
   mut make: M,
) -> (Vec<JoinHandle<u64>>, Option<HarnessError>)
where
   M: FnMut(usize) -> F,
   F: FnOnce() -> u64 + Send + 'static,
{
   let mut handles = Vec::with_capacity(count);
   for index in 0..count {
      match spawn_unit(role, index, make(index)) {
         Ok(h) => handles.push(h),
         Err(err) => return (handles, Some(err)),
      }
   }
   (handles, None)
}

/// Parks until every producer has left. With no consumer alive a producer
/// may be stuck on a full queue, so the harness frees slots itself.
fn wait_for_producers<Q>(queue: &Q, counters: &SharedCounters)
where
   Q: BlockingQueue<Token> + ?Sized,
{
   while counters.live_producers() > 0 {
      if counters.live_consumers() == 0 && queue.try_pop().is_some() {
         continue;
      }
      thread::park_timeout(PRODUCER_POLL);
   }
}

/// Joins every handle, even after a failure, and reports the first panic.
fn join_all(role: &'static str, handles: Vec<JoinHandle<u64>>) -> Result<Vec<u64>, HarnessError> {
   let mut counts = Vec::with_capacity(handles.len());
   let mut first_panic = None;
   for (index, h) in handles.into_iter().enumerate() {
      match h.join() {
         Ok(n) => counts.push(n),
         Err(_) => {
            warn!(role, index, "unit panicked");
            first_panic.get_or_insert(HarnessError::UnitPanicked { role, index });
         }
      }
   }
   match first_panic {
      Some(err) => Err(err),
      None => Ok(counts),
   }
}
