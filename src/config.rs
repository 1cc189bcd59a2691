//! Tunable thresholds of the analysis pipeline.

use std::{fs::File, io::BufReader, path::Path};

use serde_derive::*;

use crate::error::{Error, Result};

/// Contours enclosing this many pixels or fewer are treated
/// as sensor noise or background fragments.
pub const DEFAULT_MIN_CONTOUR_AREA: f64 = 1000.;

/// Below this white fraction the Otsu mask is assumed to have
/// picked the background as foreground, and is inverted.
pub const DEFAULT_MIN_FOREGROUND_FRACTION: f64 = 0.10;

/// Side of the square structuring element used to erode each
/// region mask, so that pixels mixing bottle and background
/// (or straddling two regions) are not sampled.
pub const DEFAULT_EROSION_KERNEL: u32 = 5;

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct AnalysisConfig {
    pub min_contour_area: f64,
    pub min_foreground_fraction: f64,
    /// Must be odd so the element is centred on the pixel.
    pub erosion_kernel: u32,
    /// Report min / max alongside mean / median. `None` keeps
    /// the historical behavior: only when no calibration model
    /// is supplied.
    pub report_extrema: Option<bool>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        AnalysisConfig {
            min_contour_area: DEFAULT_MIN_CONTOUR_AREA,
            min_foreground_fraction: DEFAULT_MIN_FOREGROUND_FRACTION,
            erosion_kernel: DEFAULT_EROSION_KERNEL,
            report_extrema: None,
        }
    }
}

impl AnalysisConfig {
    pub fn from_json_path(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(Error::InputNotFound(path.to_owned()));
        }
        let config: AnalysisConfig = serde_json::from_reader(BufReader::new(File::open(path)?))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.min_contour_area >= 0.) {
            return Err(Error::InvalidConfig(format!(
                "min_contour_area must be non-negative, got {}",
                self.min_contour_area
            )));
        }
        if !(0. ..=1.).contains(&self.min_foreground_fraction) {
            return Err(Error::InvalidConfig(format!(
                "min_foreground_fraction must lie in [0, 1], got {}",
                self.min_foreground_fraction
            )));
        }
        if self.erosion_kernel == 0 || self.erosion_kernel % 2 == 0 || self.erosion_kernel > 511 {
            return Err(Error::InvalidConfig(format!(
                "erosion_kernel must be an odd size in 1..=511, got {}",
                self.erosion_kernel
            )));
        }
        Ok(())
    }

    /// Chebyshev radius of the erosion element.
    pub fn erosion_radius(&self) -> u8 {
        (self.erosion_kernel / 2) as u8
    }

    pub fn extrema_enabled(&self, calibrated: bool) -> bool {
        self.report_extrema.unwrap_or(!calibrated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = AnalysisConfig::default();
        config.validate().unwrap();
        assert_eq!(config.erosion_radius(), 2);
        assert!(config.extrema_enabled(false));
        assert!(!config.extrema_enabled(true));
    }

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let config: AnalysisConfig =
            serde_json::from_str(r#"{ "erosion_kernel": 7, "report_extrema": true }"#).unwrap();
        assert_eq!(config.min_contour_area, DEFAULT_MIN_CONTOUR_AREA);
        assert_eq!(config.erosion_radius(), 3);
        assert!(config.extrema_enabled(true));
    }

    #[test]
    fn even_kernels_are_rejected() {
        let config = AnalysisConfig {
            erosion_kernel: 8,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn fraction_out_of_range_is_rejected() {
        let config = AnalysisConfig {
            min_foreground_fraction: 1.5,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));
    }
}
