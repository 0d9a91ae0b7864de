//! Report output: a CSV record for machines, a short summary for people.

use crate::harness::RunReport;
use std::io::{self, Write};

pub const CSV_HEADER: &str = "N,capacity,P,C,work_us,time_seconds,throughput_items_per_sec,\
                              waits_full,waits_empty,max_queue_size,ok_count,checksum";

pub fn csv_record(r: &RunReport) -> String {
   format!(
      "{},{},{},{},{},{:.6},{:.6},{},{},{},{},{}",
      r.config.items,
      r.metrics.capacity,
      r.config.producers,
      r.config.consumers,
      r.config.work_us,
      r.elapsed_secs(),
      r.throughput(),
      r.metrics.waits_on_full,
      r.metrics.waits_on_empty,
      r.metrics.max_observed_size,
      r.validated(),
      r.checksum,
   )
}

pub fn write_csv<W: Write>(out: &mut W, r: &RunReport, header: bool) -> io::Result<()> {
   if header {
      writeln!(out, "{CSV_HEADER}")?;
   }
   writeln!(out, "{}", csv_record(r))?;
   out.flush()
}

pub fn write_summary<W: Write>(out: &mut W, r: &RunReport) -> io::Result<()> {
   writeln!(
      out,
      "Producer-consumer finished | N={} | cap={} | P={} | C={} | work_us={}us | backend={}",
      r.config.items,
      r.metrics.capacity,
      r.config.producers,
      r.config.consumers,
      r.config.work_us,
      r.config.backend.as_str(),
   )?;
   writeln!(
      out,
      "Time: {:.6} s | Throughput: {:.6} items/s",
      r.elapsed_secs(),
      r.throughput(),
   )?;
   writeln!(
      out,
      "Waits on full: {} | Waits on empty: {} | Max queue size: {}",
      r.metrics.waits_on_full, r.metrics.waits_on_empty, r.metrics.max_observed_size,
   )?;
   out.flush()
}
