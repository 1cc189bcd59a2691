//! Per-frame orchestration: segmentation, object selection,
//! partition and per-region statistics.
//!
//! A frame is analysed either whole, as one bottle, or split
//! at `width / 2` into two halves analysed independently. A
//! failure in one half, or an empty region, never prevents the
//! rest from being computed.

use std::fmt;

use log::{debug, warn};
use rayon::prelude::*;
use serde_derive::*;

use crate::{
    calibration::CalibrationModel,
    config::AnalysisConfig,
    contour::{select_object, BoundingBox, Contour},
    error::Result,
    image::RadiometricFrame,
    region::{partition, region_mask, Region},
    segment::segment,
    stats::{region_statistics, RegionStatistics},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AnalysisMode {
    /// One bottle in the whole frame.
    Whole,
    /// One bottle in each half of the frame.
    Split,
}

#[derive(Serialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Unit {
    Frame,
    Left,
    Right,
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Unit::Frame => "frame",
            Unit::Left => "left half",
            Unit::Right => "right half",
        })
    }
}

/// Outcome for one band. `statistics` is `None` when the eroded
/// mask selected no pixel.
#[derive(Serialize, Debug, Clone)]
pub struct RegionReport {
    pub region: Region,
    pub statistics: Option<RegionStatistics>,
}

#[derive(Debug, Clone)]
pub struct ObjectAnalysis {
    pub contour: Contour,
    pub bounding_box: BoundingBox,
    pub otsu_level: u8,
    pub inverted: bool,
    pub regions: Vec<RegionReport>,
}

/// Analysis of one unit. Coordinates inside `outcome` are
/// relative to the unit; `x_offset` places it in the frame.
#[derive(Debug)]
pub struct UnitReport {
    pub unit: Unit,
    pub x_offset: usize,
    pub width: usize,
    pub outcome: Result<ObjectAnalysis>,
}

pub struct Analyzer {
    config: AnalysisConfig,
    model: Option<CalibrationModel>,
}

impl Analyzer {
    pub fn new(config: AnalysisConfig, model: Option<CalibrationModel>) -> Result<Self> {
        config.validate()?;
        Ok(Analyzer { config, model })
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    pub fn model(&self) -> Option<&CalibrationModel> {
        self.model.as_ref()
    }

    /// Run `mode` over `frame`. Reports come back in left to
    /// right order.
    pub fn analyze(&self, frame: &RadiometricFrame, mode: AnalysisMode) -> Vec<UnitReport> {
        match mode {
            AnalysisMode::Whole => vec![self.analyze_unit(frame, Unit::Frame, 0)],
            AnalysisMode::Split => {
                let (left, right) = frame.split_halves();
                let mid = left.width();
                let (l, r) = rayon::join(
                    || self.analyze_unit(&left, Unit::Left, 0),
                    || self.analyze_unit(&right, Unit::Right, mid),
                );
                vec![l, r]
            }
        }
    }

    fn analyze_unit(&self, frame: &RadiometricFrame, unit: Unit, x_offset: usize) -> UnitReport {
        let outcome = self.analyze_object(frame, unit);
        if let Err(e) = &outcome {
            warn!("skipping {}: {}", unit, e);
        }
        UnitReport {
            unit,
            x_offset,
            width: frame.width(),
            outcome,
        }
    }

    /// Segment `frame`, pick the bottle and compute statistics
    /// for each of its three bands.
    pub fn analyze_object(&self, frame: &RadiometricFrame, unit: Unit) -> Result<ObjectAnalysis> {
        let seg = segment(frame, &self.config);
        let contour = select_object(&seg.mask, self.config.min_contour_area, &unit.to_string())?;
        let bounding_box = contour.bounding_box();
        debug!(
            "{}: object area {}, box {:?}",
            unit,
            contour.area(),
            bounding_box
        );

        let filled = contour.filled_mask(seg.mask.width(), seg.mask.height());
        let extrema = self.config.extrema_enabled(self.model.is_some());
        let radius = self.config.erosion_radius();

        let regions = partition(&bounding_box)
            .par_iter()
            .map(|region| {
                let mask = region_mask(&filled, region, radius);
                let statistics =
                    region_statistics(frame, &mask, region.name, self.model.as_ref(), extrema);
                if statistics.is_none() {
                    warn!("{}: no samples left in region {}", unit, region.name);
                }
                RegionReport {
                    region: *region,
                    statistics,
                }
            })
            .collect();

        Ok(ObjectAnalysis {
            contour,
            bounding_box,
            otsu_level: seg.level,
            inverted: seg.inverted,
            regions,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{error::Error, region::RegionName, test_utils::bottle_frame};
    use ndarray::Array2;

    #[test]
    fn whole_frame_yields_three_regions() {
        let frame = bottle_frame(120, 200, &[(40, 20, 40, 150)]);
        let analyzer = Analyzer::new(AnalysisConfig::default(), None).unwrap();
        let reports = analyzer.analyze(&frame, AnalysisMode::Whole);
        assert_eq!(reports.len(), 1);
        let analysis = reports[0].outcome.as_ref().unwrap();
        assert_eq!(analysis.bounding_box.height, 150);
        let names: Vec<_> = analysis.regions.iter().map(|r| r.region.name).collect();
        assert_eq!(names, RegionName::ALL.to_vec());
        for r in &analysis.regions {
            let stats = r.statistics.as_ref().unwrap();
            assert_eq!(stats.min, stats.max);
            assert!(stats.min.is_some());
        }
    }

    #[test]
    fn missing_half_does_not_block_the_other() {
        // left half: a grid of 20x20 specks, each below the area
        // threshold; right half: one bottle
        let mut rects: Vec<_> = (0..3)
            .flat_map(|i| (0..5).map(move |j| (5 + 30 * i, 5 + 30 * j, 20, 20)))
            .collect();
        rects.push((130, 20, 40, 120));
        let frame = bottle_frame(200, 160, &rects);
        let analyzer = Analyzer::new(AnalysisConfig::default(), Some(CalibrationModel::REFERENCE))
            .unwrap();
        let reports = analyzer.analyze(&frame, AnalysisMode::Split);
        assert_eq!(reports.len(), 2);
        assert_eq!(reports[1].x_offset, 100);
        assert!(reports[1].outcome.is_ok());
        match &reports[0].outcome {
            Err(Error::NoObjectDetected { unit }) => assert_eq!(unit, "left half"),
            other => panic!("unexpected {:?}", other.as_ref().map(|a| a.bounding_box)),
        }
    }

    #[test]
    fn empty_neck_leaves_body_and_base_measured() {
        // 3 px neck erodes away, the body below it does not
        let frame = bottle_frame(120, 200, &[(58, 10, 3, 100), (40, 110, 40, 60)]);
        let analyzer = Analyzer::new(AnalysisConfig::default(), None).unwrap();
        let reports = analyzer.analyze(&frame, AnalysisMode::Whole);
        let analysis = reports[0].outcome.as_ref().unwrap();
        assert_eq!(analysis.bounding_box.y, 10);
        assert_eq!(analysis.bounding_box.height, 160);

        let by_name = |name| {
            analysis
                .regions
                .iter()
                .find(|r| r.region.name == name)
                .unwrap()
        };
        assert!(by_name(RegionName::Neck).statistics.is_none());
        for name in [RegionName::Body, RegionName::Base] {
            let stats = by_name(name).statistics.as_ref().unwrap();
            assert!(stats.samples > 0);
            assert_eq!(stats.mean, 9000.);
        }
    }

    #[test]
    fn flat_frame_does_not_panic() {
        let frame = RadiometricFrame::new(Array2::from_elem((50, 50), 1234));
        let analyzer = Analyzer::new(AnalysisConfig::default(), None).unwrap();
        // a flat frame inverts into one frame-sized blob
        let reports = analyzer.analyze(&frame, AnalysisMode::Whole);
        assert_eq!(reports.len(), 1);
    }

    #[test]
    fn invalid_config_is_rejected_up_front() {
        let config = AnalysisConfig {
            erosion_kernel: 4,
            ..Default::default()
        };
        assert!(matches!(
            Analyzer::new(config, None),
            Err(Error::InvalidConfig(_))
        ));
    }
}
