//! Summary statistics of raw samples selected by a mask.

use std::ops::AddAssign;

use rayon::prelude::*;
use serde_derive::*;

use crate::{
    calibration::CalibrationModel, image::RadiometricFrame, region::RegionName,
    segment::BinaryMask,
};

/// Running count / sum / extrema of a stream of values.
#[derive(Serialize, Debug, Clone, Copy, PartialEq)]
pub struct Stats {
    pub count: usize,
    pub sum: f64,
    pub min: f64,
    pub max: f64,
}

impl Default for Stats {
    fn default() -> Self {
        Stats {
            count: 0,
            sum: 0.,
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
        }
    }
}

impl Stats {
    pub fn mean(&self) -> Option<f64> {
        if self.count == 0 {
            None
        } else {
            Some(self.sum / self.count as f64)
        }
    }
}

impl AddAssign<f64> for Stats {
    fn add_assign(&mut self, val: f64) {
        self.count += 1;
        self.sum += val;
        self.min = self.min.min(val);
        self.max = self.max.max(val);
    }
}

impl AddAssign<&Stats> for Stats {
    fn add_assign(&mut self, other: &Stats) {
        self.count += other.count;
        self.sum += other.sum;
        self.min = self.min.min(other.min);
        self.max = self.max.max(other.max);
    }
}

/// Statistics of one region, in temperature units when a
/// calibration model was applied and raw counts otherwise.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct RegionStatistics {
    pub region: RegionName,
    pub samples: usize,
    pub calibrated: bool,
    pub mean: f64,
    pub median: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
}

/// Median with the midpoint convention for even counts.
/// Reorders `values`.
pub fn median(values: &mut [u16]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let n = values.len();
    let (lower, &mut upper, _) = values.select_nth_unstable(n / 2);
    if n % 2 == 1 {
        return Some(upper as f64);
    }
    let below = lower.iter().copied().max().unwrap_or(upper);
    Some((below as f64 + upper as f64) / 2.)
}

/// Aggregate the raw counts of `frame` under `mask`.
///
/// Returns `None` when the mask selects nothing. The model, if
/// any, maps mean and median; min / max are only reported when
/// `extrema` is set, and are mapped the same way.
pub fn region_statistics(
    frame: &RadiometricFrame,
    mask: &BinaryMask,
    region: RegionName,
    model: Option<&CalibrationModel>,
    extrema: bool,
) -> Option<RegionStatistics> {
    let mut values: Vec<u16> = mask
        .set_pixels()
        .filter_map(|(x, y)| frame.get(x as usize, y as usize))
        .collect();

    let stats = values
        .par_iter()
        .fold(Stats::default, |mut acc, &v| {
            acc += v as f64;
            acc
        })
        .reduce(Stats::default, |mut acc, other| {
            acc += &other;
            acc
        });
    let mean = stats.mean()?;
    let median = median(&mut values)?;

    let map = |v: f64| model.map_or(v, |m| m.apply(v));
    let (min, max) = if extrema {
        // a negative scale swaps the ends
        let (a, b) = (map(stats.min), map(stats.max));
        (Some(a.min(b)), Some(a.max(b)))
    } else {
        (None, None)
    };

    Some(RegionStatistics {
        region,
        samples: stats.count,
        calibrated: model.is_some(),
        mean: map(mean),
        median: map(median),
        min,
        max,
    })
}
