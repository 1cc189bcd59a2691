//! Human-readable and JSON renderings of analysis results,
//! plus the annotated frame and calibration plot images.

use std::io::{self, Write};

use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_circle_mut, draw_hollow_rect_mut, draw_line_segment_mut};
use imageproc::rect::Rect;
use itertools::{Itertools, MinMaxResult};
use serde_derive::*;

use crate::{
    calibration::{CalibrationModel, CalibrationPoint},
    contour::BoundingBox,
    image::{Channels, RadiometricFrame},
    pipeline::{RegionReport, Unit, UnitReport},
};

const CONTOUR_COLOR: Rgb<u8> = Rgb([0, 255, 0]);
const DIVIDER_COLOR: Rgb<u8> = Rgb([0, 0, 255]);

fn unit_label(unit: Unit) -> &'static str {
    match unit {
        Unit::Frame => "la imagen completa",
        Unit::Left => "la mitad izquierda",
        Unit::Right => "la mitad derecha",
    }
}

/// Write the per-region report of one frame.
pub fn write_text<W: Write>(out: &mut W, path: &str, reports: &[UnitReport]) -> io::Result<()> {
    writeln!(out, "Imagen: {}", path)?;
    for report in reports {
        let analysis = match &report.outcome {
            Ok(analysis) => analysis,
            Err(e) => {
                writeln!(
                    out,
                    "\nNo se encontró ninguna botella en {} ({}).",
                    unit_label(report.unit),
                    e
                )?;
                continue;
            }
        };

        writeln!(
            out,
            "\nResultados para la botella detectada en {}:",
            unit_label(report.unit)
        )?;
        for region in &analysis.regions {
            write_region(out, region)?;
        }
    }
    Ok(())
}

fn write_region<W: Write>(out: &mut W, report: &RegionReport) -> io::Result<()> {
    let stats = match &report.statistics {
        Some(stats) => stats,
        None => {
            return writeln!(
                out,
                "\n  Región: {} - No se encontraron datos.",
                report.region.name
            )
        }
    };
    let unit = if stats.calibrated { "°C" } else { "raw" };

    writeln!(out, "\n  Región: {}", report.region.name)?;
    writeln!(out, "    Temperatura promedio: {:.2} {}", stats.mean, unit)?;
    writeln!(out, "    Temperatura mediana:  {:.2} {}", stats.median, unit)?;
    if let Some(max) = stats.max {
        writeln!(out, "    Temperatura máxima:   {:.2} {}", max, unit)?;
    }
    if let Some(min) = stats.min {
        writeln!(out, "    Temperatura mínima:   {:.2} {}", min, unit)?;
    }
    Ok(())
}

#[derive(Serialize, Debug)]
pub struct FrameReport<'a> {
    pub path: &'a str,
    pub width: usize,
    pub height: usize,
    pub channels: Channels,
    pub units: Vec<UnitSummary<'a>>,
}

#[derive(Serialize, Debug)]
pub struct UnitSummary<'a> {
    pub unit: Unit,
    pub x_offset: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bounding_box: Option<BoundingBox>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contour_area: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub otsu_level: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inverted: Option<bool>,
    pub regions: &'a [RegionReport],
}

impl<'a> FrameReport<'a> {
    pub fn new(path: &'a str, frame: &RadiometricFrame, reports: &'a [UnitReport]) -> Self {
        let units = reports
            .iter()
            .map(|r| match &r.outcome {
                Ok(a) => UnitSummary {
                    unit: r.unit,
                    x_offset: r.x_offset,
                    error: None,
                    bounding_box: Some(a.bounding_box),
                    contour_area: Some(a.contour.area()),
                    otsu_level: Some(a.otsu_level),
                    inverted: Some(a.inverted),
                    regions: &a.regions,
                },
                Err(e) => UnitSummary {
                    unit: r.unit,
                    x_offset: r.x_offset,
                    error: Some(e.to_string()),
                    bounding_box: None,
                    contour_area: None,
                    otsu_level: None,
                    inverted: None,
                    regions: &[],
                },
            })
            .collect();
        FrameReport {
            path,
            width: frame.width(),
            height: frame.height(),
            channels: frame.channels(),
            units,
        }
    }
}

/// Normalized frame with the selected contour and the region
/// dividers drawn over it. Each unit is stretched on its own,
/// the way it was segmented.
pub fn render_annotation(frame: &RadiometricFrame, reports: &[UnitReport]) -> RgbImage {
    let mut canvas = RgbImage::new(frame.width() as u32, frame.height() as u32);
    for report in reports {
        let off = report.x_offset as u32;
        let gray = frame.columns(report.x_offset, report.width).normalized();
        for (x, y, p) in gray.enumerate_pixels() {
            let v = p.0[0];
            canvas.put_pixel(x + off, y, Rgb([v, v, v]));
        }

        let analysis = match &report.outcome {
            Ok(analysis) => analysis,
            Err(_) => continue,
        };
        let off = off as f32;
        let points = analysis.contour.points();
        for (a, b) in points.iter().zip(points.iter().cycle().skip(1)) {
            draw_line_segment_mut(
                &mut canvas,
                (a.x as f32 + off, a.y as f32),
                (b.x as f32 + off, b.y as f32),
                CONTOUR_COLOR,
            );
        }

        let bbox = analysis.bounding_box;
        let (x0, x1) = (bbox.x as f32 + off, (bbox.x + bbox.width) as f32 + off);
        for region in &analysis.regions {
            let y = region.region.y_end as f32;
            draw_line_segment_mut(&mut canvas, (x0, y), (x1, y), DIVIDER_COLOR);
        }
    }
    canvas
}

const PLOT_MARGIN: u32 = 40;

/// Scatter of the calibration points with the fitted line
/// across their raw range.
pub fn render_calibration_plot(
    points: &[CalibrationPoint],
    model: &CalibrationModel,
    width: u32,
    height: u32,
) -> RgbImage {
    let mut canvas = RgbImage::from_pixel(width, height, Rgb([255, 255, 255]));
    if width <= 2 * PLOT_MARGIN || height <= 2 * PLOT_MARGIN {
        return canvas;
    }
    let plot_w = width - 2 * PLOT_MARGIN;
    let plot_h = height - 2 * PLOT_MARGIN;
    draw_hollow_rect_mut(
        &mut canvas,
        Rect::at(PLOT_MARGIN as i32, PLOT_MARGIN as i32).of_size(plot_w, plot_h),
        Rgb([128, 128, 128]),
    );
    let (raw_lo, raw_hi) = match points.iter().map(|p| p.raw_intensity).minmax() {
        MinMaxResult::NoElements => return canvas,
        MinMaxResult::OneElement(v) => (v as f64, v as f64),
        MinMaxResult::MinMax(lo, hi) => (lo as f64, hi as f64),
    };
    let (t_lo, t_hi) = points
        .iter()
        .map(|p| p.temperature)
        .chain([model.apply(raw_lo), model.apply(raw_hi)])
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), t| {
            (lo.min(t), hi.max(t))
        });

    let span = |lo: f64, hi: f64| if hi > lo { hi - lo } else { 1. };
    let to_px = |raw: f64, temp: f64| -> (f32, f32) {
        let u = (raw - raw_lo) / span(raw_lo, raw_hi);
        let v = (temp - t_lo) / span(t_lo, t_hi);
        (
            (PLOT_MARGIN as f64 + u * plot_w as f64) as f32,
            (PLOT_MARGIN as f64 + (1. - v) * plot_h as f64) as f32,
        )
    };

    draw_line_segment_mut(
        &mut canvas,
        to_px(raw_lo, model.apply(raw_lo)),
        to_px(raw_hi, model.apply(raw_hi)),
        Rgb([255, 0, 0]),
    );
    for p in points {
        let (x, y) = to_px(p.raw_intensity as f64, p.temperature);
        draw_filled_circle_mut(&mut canvas, (x as i32, y as i32), 4, Rgb([0, 0, 255]));
    }
    canvas
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::AnalysisConfig,
        pipeline::{AnalysisMode, Analyzer},
        test_utils::bottle_frame,
    };

    fn reports(model: Option<CalibrationModel>) -> (RadiometricFrame, Vec<UnitReport>) {
        let frame = bottle_frame(120, 200, &[(40, 20, 40, 150)]);
        let analyzer = Analyzer::new(AnalysisConfig::default(), model).unwrap();
        let reports = analyzer.analyze(&frame, AnalysisMode::Whole);
        (frame, reports)
    }

    #[test]
    fn calibrated_report_lists_each_region() {
        let model = CalibrationModel {
            scale: 0.01,
            offset: 0.,
        };
        let (_, reports) = reports(Some(model));
        let mut out = vec![];
        write_text(&mut out, "bottle.png", &reports).unwrap();
        let text = String::from_utf8(out).unwrap();
        for name in ["Pico y Cuello", "Cuerpo", "Base"] {
            assert!(text.contains(&format!("  Región: {}\n", name)), "{}", text);
        }
        assert!(text.contains("    Temperatura promedio: 90.00 °C"));
        assert!(text.contains("    Temperatura mediana:  90.00 °C"));
        assert!(!text.contains("máxima"));
    }

    #[test]
    fn raw_report_includes_extrema() {
        let (_, reports) = reports(None);
        let mut out = vec![];
        write_text(&mut out, "bottle.png", &reports).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("    Temperatura máxima:   9000.00 raw"));
        assert!(text.contains("    Temperatura mínima:   9000.00 raw"));
    }

    #[test]
    fn json_report_has_regions() {
        let (frame, reports) = reports(None);
        let json = serde_json::to_value(FrameReport::new("bottle.png", &frame, &reports)).unwrap();
        assert_eq!(json["units"][0]["unit"], "frame");
        assert_eq!(json["units"][0]["regions"][1]["region"]["name"], "Cuerpo");
        assert_eq!(json["units"][0]["regions"][2]["statistics"]["max"], 9000.);
        assert_eq!(json["channels"], "gray");
        assert_eq!(json["units"][0]["inverted"], false);
        assert!(json["units"][0]["otsu_level"].is_u64());
    }

    #[test]
    fn annotation_marks_contour_and_dividers() {
        let (frame, reports) = reports(None);
        let img = render_annotation(&frame, &reports);
        assert_eq!(img.dimensions(), (120, 200));
        assert_eq!(img.get_pixel(5, 5), &Rgb([0, 0, 0]));
        assert_eq!(img.get_pixel(60, 20), &CONTOUR_COLOR);
        // first divider at y = 20 + 150 / 3
        assert_eq!(img.get_pixel(60, 70), &DIVIDER_COLOR);
    }

    #[test]
    fn plot_draws_fit_line() {
        let points = vec![
            CalibrationPoint::new(100, 20.),
            CalibrationPoint::new(200, 40.),
        ];
        let model = CalibrationModel::fit(&points).unwrap();
        let img = render_calibration_plot(&points, &model, 400, 300);
        assert!(img.pixels().any(|p| *p == Rgb([255, 0, 0])));
        assert!(img.pixels().any(|p| *p == Rgb([0, 0, 255])));
    }
}
