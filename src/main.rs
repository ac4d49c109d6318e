use clap::Parser;
use fcodekit::cli::{self, Cli};
use fcodekit::init_logging;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose)?;

    let report = cli::run(&cli)?;
    for message in &report.errors {
        tracing::warn!("{}", message);
    }
    tracing::info!(
        lines = report.lines,
        traveled = report.traveled,
        time_cost = report.time_cost,
        "done"
    );
    if report.has_errors() {
        tracing::warn!("some lines could not be converted");
    }
    Ok(())
}
