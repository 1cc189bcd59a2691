use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::value_t_or_exit;
use thermal_regions::{
    arg, args_parser, opt, pipeline::AnalysisMode, AnalysisConfig, CalibrationModel,
};

pub struct Args {
    pub paths: Vec<String>,
    pub mode: AnalysisMode,
    pub config: AnalysisConfig,
    pub model: Option<CalibrationModel>,
    pub annotate: Option<PathBuf>,
    pub json: bool,
    pub verbosity: u64,
}

impl Args {
    pub fn from_cmd_line() -> Result<Args> {
        let matches = args_parser!("thermal-regions")
            .about("Compute per-region bottle temperatures from radiometric images.")
            .arg(
                opt!("split")
                    .short("s")
                    .takes_value(false)
                    .help("Analyse the left and right halves as two bottles"),
            )
            .arg(
                opt!("scale")
                    .allow_hyphen_values(true)
                    .requires("offset")
                    .help("Calibration: T = SCALE * raw + OFFSET"),
            )
            .arg(
                opt!("offset")
                    .allow_hyphen_values(true)
                    .requires("scale")
                    .help("Calibration: T = SCALE * raw + OFFSET"),
            )
            .arg(
                opt!("calibration")
                    .short("c")
                    .conflicts_with_all(&["scale", "reference calibration"])
                    .help("Calibration model json written by thermal-calibrate"),
            )
            .arg(
                opt!("reference calibration")
                    .takes_value(false)
                    .conflicts_with("scale")
                    .help("Use the reference calibration T = 0.1639 * raw + 14.9353"),
            )
            .arg(opt!("config").help("Analysis configuration json"))
            .arg(
                opt!("erosion kernel")
                    .short("k")
                    .help("Side of the square erosion element (odd, default 5)"),
            )
            .arg(
                opt!("min area")
                    .help("Contours enclosing at most this area are ignored (default 1000)"),
            )
            .arg(
                opt!("extrema")
                    .takes_value(false)
                    .conflicts_with("no extrema")
                    .help("Also report min / max (default: only without calibration)"),
            )
            .arg(
                opt!("no extrema")
                    .takes_value(false)
                    .help("Never report min / max"),
            )
            .arg(
                opt!("annotate")
                    .short("a")
                    .help("Directory to write annotated images to"),
            )
            .arg(
                opt!("json")
                    .short("j")
                    .takes_value(false)
                    .help("Print a json report instead of text"),
            )
            .arg(
                arg!("paths")
                    .required(true)
                    .multiple(true)
                    .help("Radiometric image paths"),
            )
            .get_matches();

        let paths = matches
            .values_of("paths")
            .map(|v| v.map(|f| f.into()).collect())
            .unwrap_or_default();

        let mut config = match matches.value_of("config") {
            Some(path) => AnalysisConfig::from_json_path(path.as_ref())
                .with_context(|| format!("could not read config `{}`", path))?,
            None => AnalysisConfig::default(),
        };
        if matches.is_present("erosion kernel") {
            config.erosion_kernel = value_t_or_exit!(matches, "erosion kernel", u32);
        }
        if matches.is_present("min area") {
            config.min_contour_area = value_t_or_exit!(matches, "min area", f64);
        }
        if matches.is_present("extrema") {
            config.report_extrema = Some(true);
        } else if matches.is_present("no extrema") {
            config.report_extrema = Some(false);
        }
        config.validate()?;

        let model = if matches.is_present("scale") {
            let scale = value_t_or_exit!(matches, "scale", f64);
            let offset = value_t_or_exit!(matches, "offset", f64);
            if !scale.is_finite() || !offset.is_finite() {
                bail!("calibration coefficients must be finite");
            }
            Some(CalibrationModel { scale, offset })
        } else if let Some(path) = matches.value_of("calibration") {
            Some(
                CalibrationModel::load(path.as_ref())
                    .with_context(|| format!("could not read calibration `{}`", path))?,
            )
        } else if matches.is_present("reference calibration") {
            Some(CalibrationModel::REFERENCE)
        } else {
            None
        };

        let mode = if matches.is_present("split") {
            AnalysisMode::Split
        } else {
            AnalysisMode::Whole
        };

        Ok(Args {
            paths,
            mode,
            config,
            model,
            annotate: matches.value_of("annotate").map(PathBuf::from),
            json: matches.is_present("json"),
            verbosity: matches.occurrences_of("verbose"),
        })
    }
}
