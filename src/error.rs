use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HarnessError {
   #[error("failed to spawn {role} thread {index}")]
   Spawn {
      role: &'static str,
      index: usize,
      #[source]
      source: io::Error,
   },

   #[error("{role} thread {index} panicked")]
   UnitPanicked { role: &'static str, index: usize },
}
