use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::time::Duration;

use bounded_pc::{Harness, QueueBackend, RunConfig};

const ITEMS: u64 = 100_000;
const RING_CAP: usize = 1024;

// (producers, consumers)
const SHAPES: &[(usize, usize)] = &[(1, 1), (2, 2), (4, 4), (4, 1), (1, 4)];

fn run_once(cfg: &RunConfig) -> Duration {
   let report = Harness::new(cfg.clone()).run().expect("harness run failed");
   if !report.validated() {
      eprintln!(
         "Warning: run consumed {}/{} items. Backend: {}",
         report.consumed,
         cfg.items,
         cfg.backend.as_str()
      );
   }
   report.elapsed
}

fn bench_backends(c: &mut Criterion) {
   let mut group = c.benchmark_group("producer_consumer");
   group.throughput(Throughput::Elements(ITEMS));

   for backend in [QueueBackend::Mutex, QueueBackend::Channel] {
      for &(p, cons) in SHAPES {
         let cfg = RunConfig::new(ITEMS, RING_CAP, p, cons).with_backend(backend);
         let id = BenchmarkId::new(backend.as_str(), format!("{p}p{cons}c"));
         group.bench_with_input(id, &cfg, |b, cfg| {
            b.iter_custom(|iters| (0..iters).map(|_| run_once(cfg)).sum())
         });
      }
   }
   group.finish();
}

// Capacity sweep at fixed 2x2 shape: small rings force waits on both sides.
fn bench_capacity(c: &mut Criterion) {
   let mut group = c.benchmark_group("capacity_sweep");
   group.throughput(Throughput::Elements(ITEMS));

   for cap in [1usize, 16, 256, 4096] {
      let cfg = RunConfig::new(ITEMS, cap, 2, 2);
      group.bench_with_input(BenchmarkId::from_parameter(cap), &cfg, |b, cfg| {
         b.iter_custom(|iters| (0..iters).map(|_| run_once(cfg)).sum())
      });
   }
   group.finish();
}

fn custom_criterion() -> Criterion {
   Criterion::default()
      .warm_up_time(Duration::from_secs(2))
      .measurement_time(Duration::from_secs(10))
      .sample_size(20)
}

criterion_group! {
   name = benches;
   config = custom_criterion();
   targets = bench_backends, bench_capacity
}
criterion_main!(benches);
