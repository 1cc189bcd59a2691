//! Synthetic frames for tests.

use ndarray::Array2;

use crate::image::RadiometricFrame;

pub const BACKGROUND: u16 = 3000;
pub const OBJECT: u16 = 9000;

/// `width x height` frame at [`BACKGROUND`] with each
/// `(x, y, w, h)` rectangle raised to [`OBJECT`].
pub fn bottle_frame(
    width: usize,
    height: usize,
    rects: &[(usize, usize, usize, usize)],
) -> RadiometricFrame {
    RadiometricFrame::new(Array2::from_shape_fn((height, width), |(r, c)| {
        let inside = rects
            .iter()
            .any(|&(x, y, w, h)| c >= x && c < x + w && r >= y && r < y + h);
        if inside {
            OBJECT
        } else {
            BACKGROUND
        }
    }))
}
