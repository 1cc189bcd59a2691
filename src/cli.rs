//! Helpers shared by the accompanying binaries: argument
//! declaration macros, logger setup and input loading.
//!
//! APIs here shouldn't be considered stable / used as a
//! library.

use std::path::Path;

use anyhow::{Context, Result};
pub use clap::{App, Arg};
use flexi_logger::{Logger, LoggerHandle};
use indicatif::{ParallelProgressIterator, ProgressBar, ProgressStyle};
pub use inflector::Inflector;
use rayon::prelude::*;

use crate::image::RadiometricFrame;

#[macro_export]
macro_rules! args_parser {
    ($name:expr) => {{
        $crate::cli::App::new($name)
            .version(clap::crate_version!())
            .arg(
                $crate::cli::Arg::with_name("verbose")
                    .short("v")
                    .multiple(true)
                    .help("Log more details (repeat for more)"),
            )
    }};
}

#[macro_export]
macro_rules! arg {
    ($name:expr) => {{
        use $crate::cli::Inflector;
        $crate::cli::Arg::with_name($name).value_name(&$name.to_screaming_snake_case())
    }};
}

#[macro_export]
macro_rules! opt {
    ($name:expr) => {{
        use $crate::cli::Inflector;
        $crate::cli::Arg::with_name($name)
            .long(&$name.to_kebab_case())
            .value_name(&$name.to_screaming_snake_case())
    }};
}

/// Start logging to stderr. `RUST_LOG` wins over the `-v`
/// count when set.
pub fn setup_logging(verbosity: u64) -> Result<LoggerHandle> {
    let level = match verbosity {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let handle = Logger::try_with_env_or_str(level)?
        .log_to_stderr()
        .start()
        .context("could not start logger")?;
    Ok(handle)
}

pub struct ThermalInput {
    pub filename: String,
    pub frame: RadiometricFrame,
}

impl ThermalInput {
    pub fn try_from_path(filename: String) -> Result<Self> {
        let frame = RadiometricFrame::from_path(Path::new(&filename))
            .with_context(|| format!("could not load radiometric frame `{}`", filename))?;
        Ok(ThermalInput { filename, frame })
    }
}

/// Decode all `paths` in parallel, in order. The first
/// missing or undecodable file fails the whole batch.
pub fn load_paths_par(paths: Vec<String>) -> Result<Vec<ThermalInput>> {
    let bar = ProgressBar::new(paths.len() as u64);
    bar.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {wide_bar:cyan/blue} {pos:>7}/{len:7}"),
    );

    paths
        .into_par_iter()
        .progress_with(bar)
        .map(ThermalInput::try_from_path)
        .collect()
}
