// Optional CPU pinning for producer/consumer threads.

/// Pins the calling thread to core `slot % cores`.
///
/// Pinning is best effort: on failure the thread keeps running unpinned and
/// a warning is logged.
#[cfg(target_os = "linux")]
pub fn pin_current_thread(slot: usize) {
   use nix::sched::{sched_setaffinity, CpuSet};
   use nix::unistd::Pid;

   let cores = std::thread::available_parallelism().map_or(1, |n| n.get());
   let core = slot % cores;

   let mut set = CpuSet::new();
   let res = set
      .set(core)
      .and_then(|()| sched_setaffinity(Pid::from_raw(0), &set));

   match res {
      Ok(()) => tracing::trace!(core, "pinned thread"),
      Err(err) => tracing::warn!(core, %err, "could not pin thread, running unpinned"),
   }
}

#[cfg(not(target_os = "linux"))]
pub fn pin_current_thread(slot: usize) {
   tracing::debug!(slot, "thread pinning is only supported on linux");
}
