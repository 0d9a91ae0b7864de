// Bounded multi-producer / multi-consumer ring buffer
//
// Classic monitor design: one mutex guards the ring and its counters, two
// condition variables park pushers on a full ring and poppers on an empty
// one. Notifications are issued after the guard is dropped.

use crate::{BlockingQueue, QueueMetrics};
use parking_lot::{Condvar, Mutex};

/*──────────────────────────────────────────────────────────────────────────*/
/*  Ring state (only ever touched under the lock)                           */
/*──────────────────────────────────────────────────────────────────────────*/

#[derive(Debug)]
struct Ring<T> {
   slots: Box<[Option<T>]>,
   head : usize,            // next slot to read
   tail : usize,            // next slot to write
   count: usize,            // occupied slots

   waits_on_full : u64,
   waits_on_empty: u64,
   max_observed  : usize,
}

impl<T> Ring<T> {
   fn with_capacity(cap: usize) -> Self {
      let slots = (0..cap)
         .map(|_| None)
         .collect::<Vec<_>>()
         .into_boxed_slice();

      Self {
         slots,
         head: 0,
         tail: 0,
         count: 0,
         waits_on_full: 0,
         waits_on_empty: 0,
         max_observed: 0,
      }
   }

   #[inline]
   fn cap(&self) -> usize {
      self.slots.len()
   }

   #[inline]
   fn is_full(&self) -> bool {
      self.count == self.cap()
   }

   #[inline]
   fn write(&mut self, item: T) {
      debug_assert!(self.slots[self.tail].is_none());
      self.slots[self.tail] = Some(item);
      self.tail = (self.tail + 1) % self.cap();
      self.count += 1;
      self.max_observed = self.max_observed.max(self.count);
   }

   #[inline]
   fn read(&mut self) -> T {
      // count > 0 guarantees the head slot is occupied
      let item = match self.slots[self.head].take() {
         Some(v) => v,
         None => unreachable!("occupied slot at head {} was empty", self.head),
      };
      self.head = (self.head + 1) % self.cap();
      self.count -= 1;
      item
   }
}

/*──────────────────────────────────────────────────────────────────────────*/
/*  Queue                                                                   */
/*──────────────────────────────────────────────────────────────────────────*/

#[derive(Debug)]
pub struct BoundedQueue<T> {
   cap      : usize,
   ring     : Mutex<Ring<T>>,
   not_full : Condvar,
   not_empty: Condvar,
}

impl<T: Send> BoundedQueue<T> {
   /// Builds a queue holding at most `cap` items. A capacity of zero is
   /// clamped to one.
   pub fn new(cap: usize) -> Self {
      let cap = cap.max(1);
      Self {
         cap,
         ring: Mutex::new(Ring::with_capacity(cap)),
         not_full: Condvar::new(),
         not_empty: Condvar::new(),
      }
   }

   pub fn waits_on_full(&self) -> u64 {
      self.ring.lock().waits_on_full
   }

   pub fn waits_on_empty(&self) -> u64 {
      self.ring.lock().waits_on_empty
   }

   pub fn max_observed_size(&self) -> usize {
      self.ring.lock().max_observed
   }
}

impl<T: Send> BlockingQueue<T> for BoundedQueue<T> {
   fn push(&self, item: T) {
      let mut ring = self.ring.lock();
      while ring.is_full() {
         ring.waits_on_full += 1;
         self.not_full.wait(&mut ring);
      }
      ring.write(item);
      drop(ring);

      self.not_empty.notify_one();
   }

   fn pop(&self) -> T {
      let mut ring = self.ring.lock();
      while ring.count == 0 {
         ring.waits_on_empty += 1;
         self.not_empty.wait(&mut ring);
      }
      let item = ring.read();
      drop(ring);

      self.not_full.notify_one();
      item
   }

   fn try_push(&self, item: T) -> Result<(), T> {
      let mut ring = self.ring.lock();
      if ring.is_full() {
         return Err(item);
      }
      ring.write(item);
      drop(ring);

      self.not_empty.notify_one();
      Ok(())
   }

   fn try_pop(&self) -> Option<T> {
      let mut ring = self.ring.lock();
      if ring.count == 0 {
         return None;
      }
      let item = ring.read();
      drop(ring);

      self.not_full.notify_one();
      Some(item)
   }

   fn len(&self) -> usize {
      self.ring.lock().count
   }

   fn capacity(&self) -> usize {
      self.cap
   }

   fn metrics(&self) -> QueueMetrics {
      let ring = self.ring.lock();
      QueueMetrics {
         capacity: self.cap,
         waits_on_full: ring.waits_on_full,
         waits_on_empty: ring.waits_on_empty,
         max_observed_size: ring.max_observed,
      }
   }
}
