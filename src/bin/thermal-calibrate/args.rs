use std::path::PathBuf;

use anyhow::Result;
use thermal_regions::{arg, args_parser, opt};

pub struct Args {
    pub image: PathBuf,
    pub output: Option<PathBuf>,
    pub plot: Option<PathBuf>,
    pub marked: Option<PathBuf>,
    pub commands: Option<PathBuf>,
    pub verbosity: u64,
}

impl Args {
    pub fn from_cmd_line() -> Result<Args> {
        let matches = args_parser!("thermal-calibrate")
            .about("Fit a linear raw-to-temperature calibration from labelled points.")
            .after_help(
                "Commands, one per line:\n    \
                 X Y TEMP   label pixel (X, Y) with TEMP °C\n    \
                 X Y        label pixel (X, Y), asking for the temperature\n    \
                 undo       drop the last point\n    \
                 list       show the points so far\n    \
                 done       fit and exit (end of input does the same)",
            )
            .arg(
                opt!("output")
                    .short("o")
                    .help("Write the fitted model as json"),
            )
            .arg(opt!("plot").help("Write a scatter + fit line image"))
            .arg(
                opt!("marked")
                    .help("Write the frame with the labelled points drawn on it"),
            )
            .arg(
                opt!("commands")
                    .help("Read commands from this file instead of stdin"),
            )
            .arg(
                arg!("image")
                    .required(true)
                    .help("Radiometric image to label"),
            )
            .get_matches();

        Ok(Args {
            image: matches.value_of("image").map(PathBuf::from).unwrap_or_default(),
            output: matches.value_of("output").map(PathBuf::from),
            plot: matches.value_of("plot").map(PathBuf::from),
            marked: matches.value_of("marked").map(PathBuf::from),
            commands: matches.value_of("commands").map(PathBuf::from),
            verbosity: matches.occurrences_of("verbose"),
        })
    }
}
