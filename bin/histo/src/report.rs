use std::io::{self, Write};

use bytesize::ByteSize;
use hdrbench::{driver::ERROR_PERCENTILES, Dataset, SweepReporter, SweepResult};
use tracing::{info, warn};

use crate::plot::Plotter;

const COLUMN_WIDTH: usize = 16;

/// Renders every sweep as a table of error percentiles per iteration, and optionally plots it.
pub struct TableReporter<W> {
    out: W,
    plotter: Option<Plotter>,
    draw_datasets: bool,
    draw_errors: bool,
    window: usize,
}

impl<W: Write> TableReporter<W> {
    /// Creates a new `TableReporter` writing tables to `out`.
    pub fn new(out: W) -> Self {
        Self {
            out,
            plotter: None,
            draw_datasets: false,
            draw_errors: false,
            window: 1,
        }
    }

    /// Plots with `plotter`: the generated signals, downsampled by `window`, if `draw_datasets` is set, and the error
    /// percentiles of every histogram if `draw_errors` is set.
    pub fn with_plots(mut self, plotter: Plotter, draw_datasets: bool, draw_errors: bool, window: usize) -> Self {
        self.plotter = Some(plotter);
        self.draw_datasets = draw_datasets;
        self.draw_errors = draw_errors;
        self.window = window.max(1);
        self
    }

    /// Writes the table of a single sweep.
    pub fn write_table(&mut self, result: &SweepResult) -> io::Result<()> {
        let matrix = &result.matrix;
        for (variant, name) in matrix.variants().iter().enumerate() {
            writeln!(self.out, "{}", name)?;

            let mut header = " ".repeat(COLUMN_WIDTH);
            for fraction in ERROR_PERCENTILES {
                header.push_str(&format!("{:<width$.2}", fraction, width = COLUMN_WIDTH));
            }
            writeln!(self.out, "{}", header.trim_end())?;

            for iteration in 0..matrix.iterations() {
                let mut row = format!("{:<width$}", iteration + 1, width = COLUMN_WIDTH);
                let percentiles = matrix
                    .error_percentiles(iteration, variant, &ERROR_PERCENTILES)
                    .unwrap_or_default();
                for error in percentiles {
                    row.push_str(&format!("{:<width$}", format!("{:.2}%", error * 100.0), width = COLUMN_WIDTH));
                }
                writeln!(self.out, "{}", row.trim_end())?;
            }
        }

        self.out.flush()
    }

    fn plot_errors(&self, plotter: &Plotter, result: &SweepResult) -> io::Result<()> {
        for (variant, name) in result.matrix.variants().iter().enumerate() {
            let series = result
                .matrix
                .error_series(variant, &ERROR_PERCENTILES)
                .unwrap_or_default();
            let script = plotter.write_errors(name, result.signals, &series)?;
            plotter.render(&script)?;
        }
        Ok(())
    }
}

impl<W: Write> SweepReporter for TableReporter<W> {
    fn signals_generated(&mut self, signals: usize, datasets: &[Dataset]) {
        let Some(plotter) = self.plotter.as_ref().filter(|_| self.draw_datasets) else {
            return;
        };

        let plotted = plotter
            .write_signals(signals, datasets, self.window)
            .and_then(|script| plotter.render(&script));
        if let Err(e) = plotted {
            warn!(signals, error = %e, "Failed to plot signals.");
        }
    }

    fn sweep_completed(&mut self, result: &SweepResult) {
        info!(signals = result.signals, "Generating report.");
        if let Err(e) = self.write_table(result) {
            warn!(signals = result.signals, error = %e, "Failed to write report.");
        }

        for (histogram, bytes) in &result.memory {
            info!(
                histogram,
                memory = %ByteSize(*bytes as u64),
                "Histogram memory usage after {} signals.",
                result.signals
            );
        }

        if let Some(plotter) = self.plotter.as_ref().filter(|_| self.draw_errors) {
            if let Err(e) = self.plot_errors(plotter, result) {
                warn!(signals = result.signals, error = %e, "Failed to plot errors.");
            }
        }
    }
}
