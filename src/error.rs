//! Error kinds raised by the calibration and analysis stages.
//!
//! Only [`Error::InputNotFound`], [`Error::Decode`] and
//! [`Error::Calibration`] are fatal to a run. The rest are
//! scoped to one unit of work (a frame half, a calibration
//! point) and are reported by the caller while the
//! remaining units proceed.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("input not found: {}", .0.display())]
    InputNotFound(PathBuf),

    #[error("could not decode {}: {source}", path.display())]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("unsupported sample format in {}: {format}", path.display())]
    UnsupportedFormat { path: PathBuf, format: String },

    #[error("calibration failed: {0}")]
    Calibration(String),

    #[error("no object detected in {unit}")]
    NoObjectDetected { unit: String },

    #[error("invalid input: {0}")]
    InvalidUserInput(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
