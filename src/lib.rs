//! Library to extract calibrated per-region temperatures from
//! radiometric images of bottles.
//!
//! This crate provides two functionalities:
//!
//! 1. Fit a linear [calibration] from raw sensor counts to
//! temperature, from points labelled by the user on a frame.
//!
//! 2. [Analyse](pipeline::Analyzer) a frame: segment the
//! bottle, split it in three vertical bands (lip and neck,
//! body, base) and compute mean / median (and optionally min /
//! max) temperatures under each band.
//!
//! # Usage
//!
//! ## Calibrating
//!
//! Collect `(raw, temperature)` pairs through a
//! [`CalibrationSession`] over a frame, or fit directly:
//!
//! ```rust
//! use thermal_regions::{CalibrationModel, CalibrationPoint};
//!
//! let model = CalibrationModel::fit(&[
//!     CalibrationPoint::new(100, 20.0),
//!     CalibrationPoint::new(200, 40.0),
//! ])?;
//! assert!((model.scale - 0.2).abs() < 1e-12);
//! # Ok::<(), thermal_regions::Error>(())
//! ```
//!
//! ## Analysing frames
//!
//! ```rust
//! # fn test_compile() -> anyhow::Result<()> {
//! use thermal_regions::{
//!     AnalysisConfig, AnalysisMode, Analyzer, CalibrationModel, RadiometricFrame,
//! };
//!
//! let frame = RadiometricFrame::from_path("capture.png")?;
//! let analyzer = Analyzer::new(AnalysisConfig::default(), Some(CalibrationModel::REFERENCE))?;
//! for unit in analyzer.analyze(&frame, AnalysisMode::Split) {
//!     if let Ok(analysis) = unit.outcome {
//!         for region in analysis.regions {
//!             println!("{}: {:?}", region.region.name, region.statistics);
//!         }
//!     }
//! }
//! # Ok(())
//! # }
//! ```
//!
//! The 8-bit stretch of the frame is only used to find the
//! bottle; statistics are always computed over the raw counts.

pub mod calibration;
pub mod config;
pub mod contour;
pub mod error;
pub mod image;
pub mod pipeline;
pub mod region;
pub mod report;
pub mod segment;
pub mod stats;

pub mod cli;

#[cfg(test)]
pub(crate) mod test_utils;

pub use crate::calibration::{CalibrationModel, CalibrationPoint, CalibrationSession};
pub use crate::config::AnalysisConfig;
pub use crate::error::{Error, Result};
pub use crate::image::RadiometricFrame;
pub use crate::pipeline::{AnalysisMode, Analyzer};
