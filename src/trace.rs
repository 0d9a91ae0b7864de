//! Logging setup for the binary.

/// Installs a `fmt` subscriber writing to stderr, filtered by `RUST_LOG`
/// (default `warn`). Stdout stays reserved for the CSV report.
pub fn init_tracing() {
   use tracing_subscriber::{fmt, prelude::*, EnvFilter};

   let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

   let _ = tracing_subscriber::registry()
      .with(
         fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_thread_names(true)
            .with_file(false)
            .with_line_number(false)
            .with_timer(fmt::time::uptime()),
      )
      .with(filter)
      .try_init();
}
