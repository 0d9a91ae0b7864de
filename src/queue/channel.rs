// Bounded queue on top of crossbeam's array channel
//
// The queue owns both channel ends, so disconnection cannot happen while it
// is alive. Waits are counted when the non-blocking attempt fails and the
// call falls back to the blocking path.

use crate::{BlockingQueue, QueueMetrics};
use crossbeam::channel::{self, Receiver, Sender, TryRecvError, TrySendError};
use crossbeam::utils::CachePadded;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

pub struct ChannelQueue<T> {
   cap: usize,
   tx : Sender<T>,
   rx : Receiver<T>,

   waits_on_full : CachePadded<AtomicU64>,
   waits_on_empty: CachePadded<AtomicU64>,
   max_observed  : CachePadded<AtomicUsize>,
}

impl<T: Send> ChannelQueue<T> {
   /// Capacity zero would turn the channel into a rendezvous point, so it is
   /// clamped to one like the ring-buffer queue.
   pub fn new(cap: usize) -> Self {
      let cap = cap.max(1);
      let (tx, rx) = channel::bounded(cap);
      Self {
         cap,
         tx,
         rx,
         waits_on_full: CachePadded::new(AtomicU64::new(0)),
         waits_on_empty: CachePadded::new(AtomicU64::new(0)),
         max_observed: CachePadded::new(AtomicUsize::new(0)),
      }
   }

   // Called right after a successful send: the channel held at least the
   // item just sent, even if a receiver already took it.
   #[inline]
   fn observe_len(&self) {
      self.max_observed.fetch_max(self.rx.len().max(1), Ordering::Relaxed);
   }
}

impl<T: Send> BlockingQueue<T> for ChannelQueue<T> {
   fn push(&self, item: T) {
      let item = match self.tx.try_send(item) {
         Ok(()) => return self.observe_len(),
         Err(TrySendError::Full(item)) => item,
         Err(TrySendError::Disconnected(_)) => unreachable!("queue owns its receiver"),
      };

      self.waits_on_full.fetch_add(1, Ordering::Relaxed);
      if self.tx.send(item).is_err() {
         unreachable!("queue owns its receiver");
      }
      self.observe_len();
   }

   fn pop(&self) -> T {
      match self.rx.try_recv() {
         Ok(item) => return item,
         Err(TryRecvError::Empty) => {}
         Err(TryRecvError::Disconnected) => unreachable!("queue owns its sender"),
      }

      self.waits_on_empty.fetch_add(1, Ordering::Relaxed);
      match self.rx.recv() {
         Ok(item) => item,
         Err(_) => unreachable!("queue owns its sender"),
      }
   }

   fn try_push(&self, item: T) -> Result<(), T> {
      match self.tx.try_send(item) {
         Ok(()) => {
            self.observe_len();
            Ok(())
         }
         Err(TrySendError::Full(item)) | Err(TrySendError::Disconnected(item)) => Err(item),
      }
   }

   fn try_pop(&self) -> Option<T> {
      self.rx.try_recv().ok()
   }

   fn len(&self) -> usize {
      self.rx.len()
   }

   fn capacity(&self) -> usize {
      self.cap
   }

   fn metrics(&self) -> QueueMetrics {
      QueueMetrics {
         capacity: self.cap,
         waits_on_full: self.waits_on_full.load(Ordering::Relaxed),
         waits_on_empty: self.waits_on_empty.load(Ordering::Relaxed),
         max_observed_size: self.max_observed.load(Ordering::Relaxed),
      }
   }
}
