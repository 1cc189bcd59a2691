//! Outer boundaries of foreground components and selection of
//! the target object among them.

use imageproc::{
    contours::{find_contours, BorderType},
    drawing::draw_polygon_mut,
    point::Point,
};
use image::Luma;
use log::debug;
use serde_derive::*;

use crate::{
    error::{Error, Result},
    segment::BinaryMask,
};

#[derive(Serialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct BoundingBox {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Closed boundary of one foreground component, traced through
/// the centres of its border pixels.
#[derive(Clone, Debug)]
pub struct Contour {
    points: Vec<Point<i32>>,
    area: f64,
}

impl Contour {
    pub fn new(points: Vec<Point<i32>>) -> Self {
        let area = polygon_area(&points);
        Contour { points, area }
    }

    pub fn points(&self) -> &[Point<i32>] {
        &self.points
    }

    /// Area enclosed by the boundary polygon. A solid `w x h`
    /// rectangle of pixels encloses `(w - 1) * (h - 1)`.
    pub fn area(&self) -> f64 {
        self.area
    }

    pub fn bounding_box(&self) -> BoundingBox {
        let (mut x0, mut y0) = (i32::MAX, i32::MAX);
        let (mut x1, mut y1) = (i32::MIN, i32::MIN);
        for p in &self.points {
            x0 = x0.min(p.x);
            y0 = y0.min(p.y);
            x1 = x1.max(p.x);
            y1 = y1.max(p.y);
        }
        if self.points.is_empty() {
            return BoundingBox {
                x: 0,
                y: 0,
                width: 0,
                height: 0,
            };
        }
        BoundingBox {
            x: x0.max(0) as u32,
            y: y0.max(0) as u32,
            width: (x1 - x0 + 1) as u32,
            height: (y1 - y0 + 1) as u32,
        }
    }

    /// Solid mask of the contour interior, boundary included.
    /// Holes of the component are filled too.
    pub fn filled_mask(&self, width: u32, height: u32) -> BinaryMask {
        let mut canvas = image::GrayImage::new(width, height);
        let mut poly = self.points.clone();
        while poly.len() > 1 && poly.first() == poly.last() {
            poly.pop();
        }
        if poly.len() > 1 {
            draw_polygon_mut(&mut canvas, &poly, Luma([255]));
        }
        for p in &self.points {
            if p.x >= 0 && p.y >= 0 && (p.x as u32) < width && (p.y as u32) < height {
                canvas.put_pixel(p.x as u32, p.y as u32, Luma([255]));
            }
        }
        BinaryMask::from_image(canvas)
    }
}

/// Shoelace area of a closed polygon.
fn polygon_area(points: &[Point<i32>]) -> f64 {
    if points.len() < 3 {
        return 0.;
    }
    let twice: i64 = points
        .iter()
        .zip(points.iter().cycle().skip(1))
        .map(|(a, b)| a.x as i64 * b.y as i64 - b.x as i64 * a.y as i64)
        .sum();
    twice.abs() as f64 / 2.
}

/// Outermost boundaries only; borders of holes and of
/// components nested inside holes are skipped.
pub fn external_contours(mask: &BinaryMask) -> Vec<Contour> {
    find_contours::<i32>(mask.as_image())
        .into_iter()
        .filter(|c| c.border_type == BorderType::Outer && c.parent.is_none())
        .map(|c| Contour::new(c.points))
        .collect()
}

/// Largest contour strictly above `min_area`. Ties keep the
/// first contour in scan order.
pub fn select_largest(contours: Vec<Contour>, min_area: f64) -> Option<Contour> {
    let total = contours.len();
    let kept: Vec<_> = contours.into_iter().filter(|c| c.area > min_area).collect();
    debug!("{} of {} contours above area {}", kept.len(), total, min_area);

    kept.into_iter().fold(None, |best: Option<Contour>, c| match best {
        Some(b) if b.area >= c.area => Some(b),
        _ => Some(c),
    })
}

/// Pick the target object in `mask`. `unit` names the frame or
/// half being processed, for the diagnostic.
pub fn select_object(mask: &BinaryMask, min_area: f64, unit: &str) -> Result<Contour> {
    select_largest(external_contours(mask), min_area).ok_or_else(|| Error::NoObjectDetected {
        unit: unit.to_owned(),
    })
}
