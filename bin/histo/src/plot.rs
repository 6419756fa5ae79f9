use std::{
    fmt::Write as _,
    io,
    path::{Path, PathBuf},
    process::Command,
};

use hdrbench::{Dataset, ErrorSeries};
use tracing::debug;

/// Writes gnuplot data and scripts into a working directory, and renders them.
pub struct Plotter {
    workdir: PathBuf,
    command: String,
}

impl Plotter {
    /// Creates a new `Plotter` writing into `workdir` and rendering with `gnuplot`.
    pub fn new<P: Into<PathBuf>>(workdir: P) -> Self {
        Self {
            workdir: workdir.into(),
            command: "gnuplot".to_string(),
        }
    }

    /// Overrides the command used to render scripts.
    pub fn with_command<S: Into<String>>(mut self, command: S) -> Self {
        self.command = command.into();
        self
    }

    /// Writes the per-window median, minimum, and maximum of every signal, and returns the path of the script.
    ///
    /// Files are named `signals<N>.dat` and `signals<N>.gp`, where `N` is the number of signals.
    pub fn write_signals(&self, signals: usize, datasets: &[Dataset], window: usize) -> io::Result<PathBuf> {
        let stem = format!("signals{}", signals);

        // One gnuplot data block per signal, separated by two blank lines.
        let mut data = String::new();
        for dataset in datasets {
            let envelope = dataset.envelope(window);
            let _ = writeln!(data, "# {}", envelope.name);
            for (idx, ((median, min), max)) in envelope
                .median
                .iter()
                .zip(&envelope.min)
                .zip(&envelope.max)
                .enumerate()
            {
                let _ = writeln!(data, "{} {} {} {}", idx * window, median, min, max);
            }
            data.push_str("\n\n");
        }

        let plots = datasets
            .iter()
            .enumerate()
            .map(|(idx, dataset)| {
                format!(
                    "'{}.dat' index {} using 1:2:3:4 with yerrorlines title '{}'",
                    stem,
                    idx,
                    dataset.name()
                )
            })
            .collect::<Vec<_>>();
        let title = format!("Signals: median, min and max per {} samples", window);

        self.write_files(&stem, &data, &title, &plots)
    }

    /// Writes the error percentile series of one histogram, and returns the path of the script.
    ///
    /// Files are named `<histogram><N>.dat` and `<histogram><N>.gp`, where `N` is the number of signals.
    pub fn write_errors(&self, histogram: &str, signals: usize, series: &[ErrorSeries]) -> io::Result<PathBuf> {
        let stem = format!("{}{}", histogram, signals);

        let mut data = String::from("# iteration");
        for s in series {
            data.push(' ');
            data.push_str(&s.label);
        }
        data.push('\n');

        let iterations = series.iter().map(|s| s.values.len()).max().unwrap_or(0);
        for iteration in 0..iterations {
            let _ = write!(data, "{}", iteration + 1);
            for s in series {
                match s.values.get(iteration) {
                    Some(value) => {
                        let _ = write!(data, " {}", value);
                    }
                    None => data.push_str(" NaN"),
                }
            }
            data.push('\n');
        }

        let plots = series
            .iter()
            .enumerate()
            .map(|(idx, s)| format!("'{}.dat' using 1:{} with lines title '{}'", stem, idx + 2, s.label))
            .collect::<Vec<_>>();
        let title = format!("{}: approximated quantile errors (%), {} signals", histogram, signals);

        self.write_files(&stem, &data, &title, &plots)
    }

    /// Renders a script written by this plotter.
    ///
    /// The command runs inside the workdir, since scripts refer to their data files by name.
    ///
    /// # Errors
    ///
    /// If the render command cannot be started, or exits unsuccessfully, an error is returned.
    pub fn render(&self, script: &Path) -> io::Result<()> {
        let script_name = script.file_name().unwrap_or(script.as_os_str());
        let status = Command::new(&self.command)
            .arg(script_name)
            .current_dir(&self.workdir)
            .status()?;
        if !status.success() {
            return Err(io::Error::other(format!(
                "{} exited with {} while rendering '{}'",
                self.command,
                status,
                script.display()
            )));
        }

        debug!(script = %script.display(), "Rendered plot.");
        Ok(())
    }

    fn write_files(&self, stem: &str, data: &str, title: &str, plots: &[String]) -> io::Result<PathBuf> {
        let data_path = self.workdir.join(format!("{}.dat", stem));
        std::fs::write(&data_path, data)?;

        let mut script = String::new();
        let _ = writeln!(script, "set terminal png size 1280,720");
        let _ = writeln!(script, "set output '{}.png'", stem);
        let _ = writeln!(script, "set title '{}'", title);
        let _ = writeln!(script, "set key outside");
        let _ = writeln!(script, "plot {}", plots.join(", \\\n     "));

        let script_path = self.workdir.join(format!("{}.gp", stem));
        std::fs::write(&script_path, script)?;

        debug!(data = %data_path.display(), script = %script_path.display(), "Wrote plot files.");
        Ok(script_path)
    }
}
