//! Runs the quantile accuracy benchmark and reports the errors of every approximate histogram.

#![deny(warnings)]
#![deny(missing_docs)]

use anyhow::Context as _;
use clap::Parser as _;
use hdrbench::Driver;
use tracing::{error, info};
use tracing_subscriber::{filter::LevelFilter, EnvFilter};

mod cli;
use self::cli::{prepare_workdir, Cli};

mod plot;
use self::plot::Plotter;

mod report;
use self::report::TableReporter;

fn main() {
    tracing_subscriber::fmt()
        .compact()
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .from_env_lossy(),
        )
        .with_ansi(true)
        .with_target(true)
        .init();

    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => info!("histo stopped."),
        Err(e) => {
            error!("{:?}", e);
            std::process::exit(1);
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    info!("histo starting...");

    let config = cli.sweep_config()?;
    prepare_workdir(&cli.workdir)?;

    let mut driver = Driver::new(&config).context("Failed to create benchmark driver.")?;

    let mut reporter = TableReporter::new(std::io::stdout());
    if cli.draw_dataset || cli.draw_errors {
        reporter = reporter.with_plots(
            Plotter::new(&cli.workdir).with_command(&cli.gnuplot),
            cli.draw_dataset,
            cli.draw_errors,
            config.samples_per_iteration,
        );
    }

    driver.run(&mut reporter).context("Benchmark run failed.")?;

    Ok(())
}
