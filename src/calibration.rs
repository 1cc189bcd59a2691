//! Linear mapping from raw sensor counts to temperature.
//!
//! The mapping is fitted by ordinary least squares over points
//! labelled by the user: each point pairs the raw count read at
//! a pixel with the temperature measured there by a reference
//! instrument,
//!
//! ```text
//! T(°C) = scale * raw + offset
//! ```
//!
//! Points are collected through a [`CalibrationSession`], which
//! owns both the point list and the buffer the accepted points
//! are drawn into. The session ends through an explicit
//! [`finish`](CalibrationSession::finish) that hands back the
//! fitted model.

use std::{
    fmt,
    fs::File,
    io::{BufReader, BufWriter},
    path::Path,
};

use image::{buffer::ConvertBuffer, Rgb, RgbImage};
use imageproc::drawing::draw_filled_circle_mut;
use lazy_static::lazy_static;
use log::{debug, info};
use regex::Regex;
use serde_derive::*;

use crate::{
    error::{Error, Result},
    image::RadiometricFrame,
};

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
pub struct CalibrationPoint {
    pub raw_intensity: u16,
    pub temperature: f64,
}

impl CalibrationPoint {
    pub fn new(raw_intensity: u16, temperature: f64) -> Self {
        CalibrationPoint {
            raw_intensity,
            temperature,
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
pub struct CalibrationModel {
    pub scale: f64,
    pub offset: f64,
}

impl CalibrationModel {
    /// Fit used by the bottle line before per-session
    /// calibration was introduced.
    pub const REFERENCE: CalibrationModel = CalibrationModel {
        scale: 0.1639,
        offset: 14.9353,
    };

    /// Least-squares fit of `temperature = scale * raw + offset`.
    ///
    /// Needs at least two points spanning two distinct raw
    /// values; anything less leaves the line undetermined.
    pub fn fit(points: &[CalibrationPoint]) -> Result<Self> {
        if points.len() < 2 {
            return Err(Error::Calibration(format!(
                "at least 2 points are required, got {}",
                points.len()
            )));
        }

        let n = points.len() as f64;
        let mean_raw = points.iter().map(|p| p.raw_intensity as f64).sum::<f64>() / n;
        let mean_temp = points.iter().map(|p| p.temperature).sum::<f64>() / n;

        // centered sums keep the normal equations well conditioned
        // for 16-bit counts
        let (sxx, sxy) = points.iter().fold((0., 0.), |(sxx, sxy), p| {
            let dx = p.raw_intensity as f64 - mean_raw;
            let dy = p.temperature - mean_temp;
            (sxx + dx * dx, sxy + dx * dy)
        });
        if sxx == 0. {
            return Err(Error::Calibration(format!(
                "all {} points share raw intensity {}",
                points.len(),
                points[0].raw_intensity
            )));
        }

        let scale = sxy / sxx;
        let offset = mean_temp - scale * mean_raw;
        if !scale.is_finite() || !offset.is_finite() {
            return Err(Error::Calibration("fit is not finite".into()));
        }

        let model = CalibrationModel { scale, offset };
        info!("fitted {} over {} points", model, points.len());
        Ok(model)
    }

    #[inline]
    pub fn apply(&self, raw: f64) -> f64 {
        self.scale * raw + self.offset
    }

    /// `temperature - prediction` for each point.
    pub fn residuals(&self, points: &[CalibrationPoint]) -> Vec<f64> {
        points
            .iter()
            .map(|p| p.temperature - self.apply(p.raw_intensity as f64))
            .collect()
    }

    pub fn rms_residual(&self, points: &[CalibrationPoint]) -> f64 {
        if points.is_empty() {
            return 0.;
        }
        let ss: f64 = self.residuals(points).iter().map(|r| r * r).sum();
        (ss / points.len() as f64).sqrt()
    }

    pub fn load(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(Error::InputNotFound(path.to_owned()));
        }
        let reader = BufReader::new(File::open(path)?);
        Ok(serde_json::from_reader(reader)?)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }
}

impl fmt::Display for CalibrationModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "T(°C) = {:.4} * raw + {:.4}", self.scale, self.offset)
    }
}

/// One line of user input to a calibration session.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Label pixel `(x, y)`. The temperature is kept as typed;
    /// it is validated when the point is added.
    Add {
        x: u32,
        y: u32,
        temperature: Option<String>,
    },
    Undo,
    List,
    Finish,
}

impl Command {
    /// Parse one input line. Blank lines yield `Ok(None)`.
    pub fn parse(line: &str) -> Result<Option<Command>> {
        lazy_static! {
            static ref ADD: Regex =
                Regex::new(r"^(\d+)[\s,]+(\d+)(?:[\s,]+(\S+))?$").unwrap();
        }

        let line = line.trim();
        if line.is_empty() {
            return Ok(None);
        }
        let cmd = match line.to_lowercase().as_str() {
            "undo" => Command::Undo,
            "list" => Command::List,
            "done" | "finish" | "q" | "quit" => Command::Finish,
            _ => {
                let caps = ADD.captures(line).ok_or_else(|| {
                    Error::InvalidUserInput(format!("unrecognized command `{}`", line))
                })?;
                let coord = |i: usize| -> Result<u32> {
                    caps[i]
                        .parse()
                        .map_err(|_| Error::InvalidUserInput(format!("bad coordinate `{}`", &caps[i])))
                };
                Command::Add {
                    x: coord(1)?,
                    y: coord(2)?,
                    temperature: caps.get(3).map(|m| m.as_str().to_owned()),
                }
            }
        };
        Ok(Some(cmd))
    }
}

/// Parse a typed temperature, rejecting non-numeric and
/// non-finite values.
pub fn parse_temperature(input: &str) -> Result<f64> {
    let input = input.trim();
    let temp: f64 = input
        .replace(',', ".")
        .parse()
        .map_err(|_| Error::InvalidUserInput(format!("`{}` is not a temperature", input)))?;
    if !temp.is_finite() {
        return Err(Error::InvalidUserInput(format!(
            "`{}` is not a finite temperature",
            input
        )));
    }
    Ok(temp)
}

const MARK_RADIUS: i32 = 5;
const MARK_COLOR: Rgb<u8> = Rgb([255, 0, 0]);

/// Interactive point collection over one frame.
pub struct CalibrationSession<'a> {
    frame: &'a RadiometricFrame,
    points: Vec<CalibrationPoint>,
    marks: Vec<(u32, u32)>,
    base: RgbImage,
    canvas: RgbImage,
}

/// Terminal state of a finished session.
pub struct CalibrationOutcome {
    pub model: CalibrationModel,
    pub points: Vec<CalibrationPoint>,
    pub canvas: RgbImage,
}

impl<'a> CalibrationSession<'a> {
    pub fn new(frame: &'a RadiometricFrame) -> Self {
        let base: RgbImage = frame.normalized().convert();
        CalibrationSession {
            frame,
            points: vec![],
            marks: vec![],
            canvas: base.clone(),
            base,
        }
    }

    /// Label pixel `(x, y)` with a typed temperature.
    ///
    /// Fails with [`Error::InvalidUserInput`] when the pixel is
    /// outside the frame or the temperature does not parse; the
    /// session is left unchanged in that case.
    pub fn add_point(&mut self, x: u32, y: u32, temperature: &str) -> Result<CalibrationPoint> {
        let raw_intensity = self.frame.get(x as usize, y as usize).ok_or_else(|| {
            Error::InvalidUserInput(format!(
                "({}, {}) is outside the {}x{} frame",
                x,
                y,
                self.frame.width(),
                self.frame.height()
            ))
        })?;
        let temperature = parse_temperature(temperature)?;

        let point = CalibrationPoint::new(raw_intensity, temperature);
        debug!("point at ({}, {}): raw = {}, T = {}", x, y, raw_intensity, temperature);
        self.points.push(point);
        self.marks.push((x, y));
        draw_filled_circle_mut(&mut self.canvas, (x as i32, y as i32), MARK_RADIUS, MARK_COLOR);
        Ok(point)
    }

    /// Drop the most recent point.
    pub fn undo(&mut self) -> Option<CalibrationPoint> {
        let point = self.points.pop()?;
        self.marks.pop();
        self.canvas = self.base.clone();
        for &(x, y) in &self.marks {
            draw_filled_circle_mut(&mut self.canvas, (x as i32, y as i32), MARK_RADIUS, MARK_COLOR);
        }
        Some(point)
    }

    pub fn points(&self) -> &[CalibrationPoint] {
        &self.points
    }

    pub fn canvas(&self) -> &RgbImage {
        &self.canvas
    }

    /// End the session and fit over whatever was collected.
    pub fn finish(self) -> Result<CalibrationOutcome> {
        let model = CalibrationModel::fit(&self.points)?;
        Ok(CalibrationOutcome {
            model,
            points: self.points,
            canvas: self.canvas,
        })
    }
}
