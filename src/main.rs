use anyhow::Context;
use bounded_pc::config::Cli;
use bounded_pc::{report, trace, Harness};
use clap::Parser;
use std::io;

fn main() -> anyhow::Result<()> {
   trace::init_tracing();

   let cli = Cli::parse();
   let harness = Harness::new(cli.run_config());
   let run = harness.run().context("producer/consumer run failed")?;

   report::write_csv(&mut io::stdout().lock(), &run, !cli.no_header)
      .context("writing CSV report")?;
   report::write_summary(&mut io::stderr().lock(), &run)
      .context("writing summary")?;
   Ok(())
}
