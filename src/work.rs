use std::sync::atomic::{compiler_fence, Ordering};
use std::time::{Duration, Instant};

/// Burns CPU for at least `micros` microseconds.
///
/// Spins on the monotonic clock without sleeping or yielding, so the cost
/// does not depend on scheduler granularity. The compiler fence keeps the
/// loop from being optimised away.
#[inline]
pub fn simulate_work(micros: u64) {
   if micros == 0 {
      return;
   }

   let budget = Duration::from_micros(micros);
   let start = Instant::now();
   while start.elapsed() < budget {
      compiler_fence(Ordering::SeqCst);
      std::hint::spin_loop();
   }
}
