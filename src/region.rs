//! Vertical partition of the bottle into three anatomical
//! bands, and the per-band sampling masks.

use std::fmt;

use imageproc::{distance_transform::Norm, morphology::erode};
use serde_derive::*;

use crate::{contour::BoundingBox, segment::BinaryMask};

#[derive(Serialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RegionName {
    /// Lip and neck, the top band.
    #[serde(rename = "Pico y Cuello")]
    Neck,
    #[serde(rename = "Cuerpo")]
    Body,
    #[serde(rename = "Base")]
    Base,
}

impl RegionName {
    pub const ALL: [RegionName; 3] = [RegionName::Neck, RegionName::Body, RegionName::Base];

    pub fn label(&self) -> &'static str {
        match self {
            RegionName::Neck => "Pico y Cuello",
            RegionName::Body => "Cuerpo",
            RegionName::Base => "Base",
        }
    }
}

impl fmt::Display for RegionName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Rows `[y_start, y_end)` of the frame.
#[derive(Serialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct Region {
    pub name: RegionName,
    pub y_start: u32,
    pub y_end: u32,
}

impl Region {
    pub fn height(&self) -> u32 {
        self.y_end - self.y_start
    }

    #[inline]
    pub fn contains_row(&self, y: u32) -> bool {
        self.y_start <= y && y < self.y_end
    }
}

/// Split the box height in three `height / 3` bands, top to
/// bottom. The base band takes the remainder.
pub fn partition(bbox: &BoundingBox) -> [Region; 3] {
    let band = bbox.height / 3;
    let y = bbox.y;
    [
        Region {
            name: RegionName::Neck,
            y_start: y,
            y_end: y + band,
        },
        Region {
            name: RegionName::Body,
            y_start: y + band,
            y_end: y + 2 * band,
        },
        Region {
            name: RegionName::Base,
            y_start: y + 2 * band,
            y_end: y + bbox.height,
        },
    ]
}

/// Sampling mask of one band: the filled object restricted to
/// the band rows, eroded by a square of side
/// `2 * erosion_radius + 1`. Always a subset of both.
pub fn region_mask(filled: &BinaryMask, region: &Region, erosion_radius: u8) -> BinaryMask {
    let banded = BinaryMask::from_fn(filled.width(), filled.height(), |x, y| {
        region.contains_row(y) && filled.is_set(x, y)
    });
    if erosion_radius == 0 {
        return banded;
    }
    BinaryMask::from_image(erode(banded.as_image(), Norm::LInf, erosion_radius))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contour::Contour;
    use imageproc::point::Point;
    use proptest::prelude::*;

    fn bbox(y: u32, height: u32) -> BoundingBox {
        BoundingBox {
            x: 0,
            y,
            width: 300,
            height,
        }
    }

    #[test]
    fn ninety_rows_split_in_thirty() {
        let regions = partition(&bbox(12, 90));
        let starts: Vec<_> = regions.iter().map(|r| r.y_start).collect();
        assert_eq!(starts, vec![12, 42, 72]);
        assert!(regions.iter().all(|r| r.height() == 30));
        assert_eq!(regions[0].name, RegionName::Neck);
        assert_eq!(regions[2].name.to_string(), "Base");
    }

    #[test]
    fn base_absorbs_remainder() {
        let regions = partition(&bbox(0, 92));
        assert_eq!(regions[0].height(), 30);
        assert_eq!(regions[1].height(), 30);
        assert_eq!(regions[2].height(), 32);
    }

    #[test]
    fn erosion_trims_the_border_of_each_band() {
        let filled = BinaryMask::from_fn(60, 60, |x, y| (10..50).contains(&x) && (10..50).contains(&y));
        let region = Region {
            name: RegionName::Body,
            y_start: 20,
            y_end: 35,
        };
        let mask = region_mask(&filled, &region, 2);
        let rows: Vec<_> = mask.set_pixels().map(|(_, y)| y).collect();
        let cols: Vec<_> = mask.set_pixels().map(|(x, _)| x).collect();
        assert_eq!(rows.iter().min(), Some(&22));
        assert_eq!(rows.iter().max(), Some(&32));
        assert_eq!(cols.iter().min(), Some(&12));
        assert_eq!(cols.iter().max(), Some(&47));
        assert_eq!(mask.count(), 11 * 36);
    }

    #[test]
    fn thin_band_erodes_to_nothing() {
        let filled = BinaryMask::from_fn(40, 40, |_, _| true);
        let region = Region {
            name: RegionName::Neck,
            y_start: 10,
            y_end: 13,
        };
        assert_eq!(region_mask(&filled, &region, 2).count(), 0);
    }

    proptest! {
        #[test]
        fn bands_tile_the_box(y in 0u32..500, height in 0u32..2000) {
            let regions = partition(&bbox(y, height));
            prop_assert_eq!(regions[0].y_start, y);
            prop_assert_eq!(regions[0].y_end, regions[1].y_start);
            prop_assert_eq!(regions[1].y_end, regions[2].y_start);
            prop_assert_eq!(regions[2].y_end, y + height);
            prop_assert!(regions.iter().all(|r| r.y_start <= r.y_end));
            prop_assert_eq!(regions[0].height(), regions[1].height());
            prop_assert!(regions[2].height() - regions[0].height() <= 2);
        }

        #[test]
        fn region_masks_stay_inside_object_and_band(
            cx in 30i32..70,
            cy in 30i32..70,
            rx in 8i32..30,
            ry in 8i32..30,
            radius in 0u8..4,
        ) {
            // a diamond contour around (cx, cy)
            let contour = Contour::new(vec![
                Point::new(cx, cy - ry),
                Point::new(cx + rx, cy),
                Point::new(cx, cy + ry),
                Point::new(cx - rx, cy),
            ]);
            let filled = contour.filled_mask(100, 100);
            for region in partition(&contour.bounding_box()).iter() {
                let mask = region_mask(&filled, region, radius);
                for (x, y) in mask.set_pixels() {
                    prop_assert!(filled.is_set(x, y));
                    prop_assert!(region.contains_row(y));
                }
            }
        }
    }
}
