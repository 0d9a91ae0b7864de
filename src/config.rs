//! Run parameters and the command line that produces them.
//!
//! Numeric positionals are parsed leniently: a malformed value never
//! aborts a run, it degrades the same way C's `strtoull`/`atoi` would and
//! is then clamped into range.

use clap::{Parser, ValueEnum};

pub const DEFAULT_ITEMS: u64 = 1_000_000;
pub const DEFAULT_CAPACITY: usize = 1024;

/// Which `BlockingQueue` implementation backs a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum QueueBackend {
   /// Mutex + two condition variables over a ring buffer.
   #[default]
   Mutex,
   /// crossbeam bounded array channel.
   Channel,
}

impl QueueBackend {
   pub fn as_str(self) -> &'static str {
      match self {
         Self::Mutex => "mutex",
         Self::Channel => "channel",
      }
   }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunConfig {
   /// Total items produced and consumed.
   pub items: u64,
   /// Queue capacity as requested; the queue itself clamps 0 to 1.
   pub capacity: usize,
   pub producers: usize,
   pub consumers: usize,
   /// Simulated per-item consumer cost in microseconds.
   pub work_us: u64,
   pub backend: QueueBackend,
   pub pin_threads: bool,
}

impl Default for RunConfig {
   fn default() -> Self {
      Self {
         items: DEFAULT_ITEMS,
         capacity: DEFAULT_CAPACITY,
         producers: 1,
         consumers: 1,
         work_us: 0,
         backend: QueueBackend::Mutex,
         pin_threads: false,
      }
   }
}

impl RunConfig {
   pub fn new(items: u64, capacity: usize, producers: usize, consumers: usize) -> Self {
      Self {
         items,
         capacity,
         producers: producers.max(1),
         consumers: consumers.max(1),
         ..Self::default()
      }
   }

   pub fn with_work_us(mut self, work_us: u64) -> Self {
      self.work_us = work_us;
      self
   }

   pub fn with_backend(mut self, backend: QueueBackend) -> Self {
      self.backend = backend;
      self
   }

   pub fn with_pinning(mut self, pin: bool) -> Self {
      self.pin_threads = pin;
      self
   }
}

/// Bounded producer/consumer contention benchmark.
///
/// Prints one CSV header and one data line on stdout and a short summary
/// on stderr.
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
   /// Total items to produce and consume
   #[arg(value_name = "N", allow_hyphen_values = true)]
   pub items: Option<String>,

   /// Ring buffer capacity
   #[arg(value_name = "CAPACITY", allow_hyphen_values = true)]
   pub capacity: Option<String>,

   /// Producer threads (at least 1)
   #[arg(value_name = "P", allow_hyphen_values = true)]
   pub producers: Option<String>,

   /// Consumer threads (at least 1)
   #[arg(value_name = "C", allow_hyphen_values = true)]
   pub consumers: Option<String>,

   /// Busy-wait microseconds per consumed item
   #[arg(value_name = "WORK_US", allow_hyphen_values = true)]
   pub work_us: Option<String>,

   /// Queue implementation to measure
   #[arg(long, value_enum, default_value_t = QueueBackend::Mutex)]
   pub backend: QueueBackend,

   /// Pin each thread to a core (Linux only)
   #[arg(long)]
   pub pin: bool,

   /// Skip the CSV header line
   #[arg(long)]
   pub no_header: bool,
}

impl Cli {
   pub fn run_config(&self) -> RunConfig {
      let mut cfg = RunConfig::default();

      if let Some(s) = &self.items {
         cfg.items = parse_unsigned(s);
      }
      if let Some(s) = &self.capacity {
         cfg.capacity = usize::try_from(parse_unsigned(s)).unwrap_or(usize::MAX);
      }
      if let Some(s) = &self.producers {
         cfg.producers = clamp_count(parse_signed(s), 1);
      }
      if let Some(s) = &self.consumers {
         cfg.consumers = clamp_count(parse_signed(s), 1);
      }
      if let Some(s) = &self.work_us {
         cfg.work_us = parse_signed(s).max(0) as u64;
      }

      cfg.backend = self.backend;
      cfg.pin_threads = self.pin;
      cfg
   }
}

fn clamp_count(v: i64, min: i64) -> usize {
   usize::try_from(v.max(min)).unwrap_or(usize::MAX)
}

/// Leading-digits parse of an unsigned decimal, `strtoull` style.
/// Leading whitespace and a `+` are accepted; anything unparsable is 0 and
/// values past `u64::MAX` saturate.
pub fn parse_unsigned(s: &str) -> u64 {
   let s = s.trim_start();
   let s = s.strip_prefix('+').unwrap_or(s);
   s.bytes()
      .take_while(u8::is_ascii_digit)
      .fold(0u64, |acc, d| acc.saturating_mul(10).saturating_add(u64::from(d - b'0')))
}

/// Leading-digits parse of a signed decimal, `atoi` style.
/// Unparsable input is 0; out-of-range values saturate.
pub fn parse_signed(s: &str) -> i64 {
   let s = s.trim_start();
   let (neg, digits) = match s.as_bytes().first() {
      Some(b'-') => (true, &s[1..]),
      Some(b'+') => (false, &s[1..]),
      _ => (false, s),
   };
   let magnitude = digits
      .bytes()
      .take_while(u8::is_ascii_digit)
      .fold(0i64, |acc, d| acc.saturating_mul(10).saturating_add(i64::from(d - b'0')));
   if neg { -magnitude } else { magnitude }
}

#[cfg(test)]
mod tests {
   use super::*;

   fn cli(args: &[&str]) -> Cli {
      let argv = std::iter::once("bounded_pc").chain(args.iter().copied());
      Cli::try_parse_from(argv).unwrap()
   }

   #[test]
   fn defaults_when_no_arguments() {
      let cfg = cli(&[]).run_config();
      assert_eq!(cfg, RunConfig::default());
      assert_eq!(cfg.items, 1_000_000);
      assert_eq!(cfg.capacity, 1024);
      assert_eq!((cfg.producers, cfg.consumers, cfg.work_us), (1, 1, 0));
   }

   #[test]
   fn positionals_fill_in_order() {
      let cfg = cli(&["10", "4", "2", "3", "5"]).run_config();
      assert_eq!(cfg.items, 10);
      assert_eq!(cfg.capacity, 4);
      assert_eq!(cfg.producers, 2);
      assert_eq!(cfg.consumers, 3);
      assert_eq!(cfg.work_us, 5);
   }

   #[test]
   fn malformed_and_negative_values_are_clamped() {
      let cfg = cli(&["abc", "x", "-3", "0", "-7"]).run_config();
      assert_eq!(cfg.items, 0);
      assert_eq!(cfg.capacity, 0);
      assert_eq!(cfg.producers, 1);
      assert_eq!(cfg.consumers, 1);
      assert_eq!(cfg.work_us, 0);
   }

   #[test]
   fn flags_mix_with_positionals() {
      let c = cli(&["--backend", "channel", "--pin", "--no-header", "100"]);
      assert!(c.no_header);
      let cfg = c.run_config();
      assert_eq!(cfg.items, 100);
      assert_eq!(cfg.backend, QueueBackend::Channel);
      assert!(cfg.pin_threads);
   }

   #[test]
   fn lenient_number_parsing() {
      assert_eq!(parse_unsigned("42abc"), 42);
      assert_eq!(parse_unsigned("  +7"), 7);
      assert_eq!(parse_unsigned(""), 0);
      assert_eq!(parse_unsigned("99999999999999999999999"), u64::MAX);
      assert_eq!(parse_signed("-12x"), -12);
      assert_eq!(parse_signed("+3"), 3);
      assert_eq!(parse_signed("--1"), 0);
   }
}
