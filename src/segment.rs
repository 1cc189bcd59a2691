//! Foreground / background separation of a radiometric frame.
//!
//! Thresholding runs on the 8-bit min-max stretch of the frame,
//! smoothed with the 5x5 binomial kernel (the fixed kernel a
//! Gaussian of that size reduces to when no sigma is given).
//! The level is chosen by Otsu's method.

use image::{GrayImage, Luma};
use imageproc::contrast::otsu_level;
use log::debug;

use crate::{config::AnalysisConfig, image::RadiometricFrame};

const FOREGROUND: u8 = 255;

/// Two-level mask: set pixels are stored as 255, unset as 0.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BinaryMask(GrayImage);

impl BinaryMask {
    pub fn new(width: u32, height: u32) -> Self {
        BinaryMask(GrayImage::new(width, height))
    }

    pub fn from_fn<F>(width: u32, height: u32, mut f: F) -> Self
    where
        F: FnMut(u32, u32) -> bool,
    {
        BinaryMask(GrayImage::from_fn(width, height, |x, y| {
            Luma([if f(x, y) { FOREGROUND } else { 0 }])
        }))
    }

    /// Any non-zero pixel is taken as set.
    pub fn from_image(mut image: GrayImage) -> Self {
        for p in image.pixels_mut() {
            if p.0[0] != 0 {
                p.0[0] = FOREGROUND;
            }
        }
        BinaryMask(image)
    }

    pub fn width(&self) -> u32 {
        self.0.width()
    }

    pub fn height(&self) -> u32 {
        self.0.height()
    }

    #[inline]
    pub fn is_set(&self, x: u32, y: u32) -> bool {
        self.0.get_pixel(x, y).0[0] != 0
    }

    pub fn set(&mut self, x: u32, y: u32, value: bool) {
        self.0
            .put_pixel(x, y, Luma([if value { FOREGROUND } else { 0 }]));
    }

    pub fn count(&self) -> usize {
        self.0.pixels().filter(|p| p.0[0] != 0).count()
    }

    /// Fraction of set pixels; zero for an empty mask.
    pub fn fraction(&self) -> f64 {
        let total = self.0.width() as usize * self.0.height() as usize;
        if total == 0 {
            return 0.;
        }
        self.count() as f64 / total as f64
    }

    pub fn inverted(&self) -> BinaryMask {
        let mut image = self.0.clone();
        for p in image.pixels_mut() {
            p.0[0] = FOREGROUND - p.0[0];
        }
        BinaryMask(image)
    }

    /// `(x, y)` of every set pixel, in row-major order.
    pub fn set_pixels(&self) -> impl Iterator<Item = (u32, u32)> + '_ {
        self.0
            .enumerate_pixels()
            .filter(|(_, _, p)| p.0[0] != 0)
            .map(|(x, y, _)| (x, y))
    }

    pub fn as_image(&self) -> &GrayImage {
        &self.0
    }

}

/// Result of segmenting one frame.
#[derive(Debug)]
pub struct Segmentation {
    pub mask: BinaryMask,
    pub level: u8,
    pub inverted: bool,
}

/// Segment `frame` into a binary foreground mask.
pub fn segment(frame: &RadiometricFrame, config: &AnalysisConfig) -> Segmentation {
    let normalized = frame.normalized();
    let (wid, ht) = normalized.dimensions();
    if wid == 0 || ht == 0 {
        return Segmentation {
            mask: BinaryMask::new(wid, ht),
            level: 0,
            inverted: false,
        };
    }

    let smoothed = binomial_blur_5x5(&normalized);
    let level = otsu_level(&smoothed);
    let mask = BinaryMask::from_fn(wid, ht, |x, y| smoothed.get_pixel(x, y).0[0] > level);

    let fraction = mask.fraction();
    let inverted = fraction < config.min_foreground_fraction;
    debug!(
        "otsu level {}, foreground fraction {:.3}{}",
        level,
        fraction,
        if inverted { ", inverting" } else { "" }
    );

    Segmentation {
        mask: if inverted { mask.inverted() } else { mask },
        level,
        inverted,
    }
}

const BINOMIAL_5: [u32; 5] = [1, 4, 6, 4, 1];

/// Separable 5x5 binomial smoothing with mirrored borders
/// (`dcb|abcd|cba` style, edge pixel not repeated).
///
/// `imageproc::filter::separable_filter_equal` clamps at the
/// border instead, which shifts the Otsu level for objects
/// touching the frame edge.
pub fn binomial_blur_5x5(image: &GrayImage) -> GrayImage {
    let (wid, ht) = image.dimensions();
    let (w, h) = (wid as isize, ht as isize);

    // horizontal pass, kept at 16x scale
    let mut rows = vec![0u32; (wid * ht) as usize];
    for y in 0..h {
        for x in 0..w {
            let acc: u32 = BINOMIAL_5
                .iter()
                .enumerate()
                .map(|(k, &c)| {
                    let sx = reflect_101(x + k as isize - 2, w);
                    c * image.get_pixel(sx as u32, y as u32).0[0] as u32
                })
                .sum();
            rows[(y * w + x) as usize] = acc;
        }
    }

    // vertical pass, 256x scale, rounded back to 8 bits
    GrayImage::from_fn(wid, ht, |x, y| {
        let acc: u32 = BINOMIAL_5
            .iter()
            .enumerate()
            .map(|(k, &c)| {
                let sy = reflect_101(y as isize + k as isize - 2, h);
                c * rows[(sy * w + x as isize) as usize]
            })
            .sum();
        Luma([((acc + 128) >> 8) as u8])
    })
}

fn reflect_101(mut i: isize, n: isize) -> isize {
    if n == 1 {
        return 0;
    }
    while i < 0 || i >= n {
        i = if i < 0 { -i } else { 2 * n - 2 - i };
    }
    i
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::bottle_frame;
    use ndarray::Array2;
    use proptest::prelude::*;

    #[test]
    fn blur_preserves_flat_regions() {
        let image = GrayImage::from_pixel(9, 7, Luma([77]));
        assert_eq!(binomial_blur_5x5(&image), image);
    }

    #[test]
    fn blur_spreads_an_impulse_with_binomial_weights() {
        let mut image = GrayImage::new(9, 9);
        image.put_pixel(4, 4, Luma([255]));
        let blurred = binomial_blur_5x5(&image);
        // 255 * 36 / 256
        assert_eq!(blurred.get_pixel(4, 4).0[0], 36);
        // 255 * 1 / 256
        assert_eq!(blurred.get_pixel(2, 2).0[0], 1);
        assert_eq!(blurred.get_pixel(1, 4).0[0], 0);
    }

    #[test]
    fn reflection_skips_the_edge_pixel() {
        assert_eq!(reflect_101(-1, 5), 1);
        assert_eq!(reflect_101(-2, 5), 2);
        assert_eq!(reflect_101(5, 5), 3);
        assert_eq!(reflect_101(6, 5), 2);
        assert_eq!(reflect_101(-2, 2), 0);
        assert_eq!(reflect_101(3, 1), 0);
    }

    #[test]
    fn bright_majority_object_is_foreground() {
        let frame = bottle_frame(60, 60, &[(10, 10, 30, 40)]);
        let seg = segment(&frame, &AnalysisConfig::default());
        assert!(!seg.inverted);
        assert!(seg.mask.is_set(25, 30));
        assert!(!seg.mask.is_set(2, 2));
        let count = seg.mask.count();
        assert!((1100..=1300).contains(&count), "count = {}", count);
    }

    #[test]
    fn minority_foreground_is_inverted() {
        // 10x10 hot spot: ~2.8% of the frame
        let frame = bottle_frame(60, 60, &[(20, 20, 10, 10)]);
        let seg = segment(&frame, &AnalysisConfig::default());
        assert!(seg.inverted);
        assert!(seg.mask.is_set(0, 0));
        assert!(!seg.mask.is_set(25, 25));
    }

    #[test]
    fn empty_frame_yields_empty_mask() {
        let frame = RadiometricFrame::new(Array2::zeros((0, 5)));
        let seg = segment(&frame, &AnalysisConfig::default());
        assert_eq!(seg.mask.count(), 0);
    }

    proptest! {
        #[test]
        fn inverting_twice_is_identity(
            bits in prop::collection::vec(any::<bool>(), 1..400),
            wid in 1u32..20,
        ) {
            let ht = (bits.len() as u32 / wid).max(1);
            let mask = BinaryMask::from_fn(wid, ht, |x, y| {
                bits[((y * wid + x) as usize) % bits.len()]
            });
            prop_assert_eq!(mask.inverted().inverted(), mask.clone());
            prop_assert_eq!(mask.inverted().count() + mask.count(), (wid * ht) as usize);
        }
    }
}
