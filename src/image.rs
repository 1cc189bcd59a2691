use std::path::Path;

use image::{DynamicImage, GrayImage, ImageBuffer, Luma, Primitive};
use log::debug;
use ndarray::{s, Array2, ArrayView2};
use serde_derive::*;

use crate::error::{Error, Result};

/// Channel layout of the decoded file, before reduction.
#[derive(Serialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Channels {
    Gray,
    Color,
}

/// Raw sensor counts, reduced to a single intensity channel at
/// ingestion. Rows index `y`, columns index `x`.
#[derive(Clone, Debug)]
pub struct RadiometricFrame {
    raw: Array2<u16>,
    channels: Channels,
}

impl RadiometricFrame {
    pub fn new(raw: Array2<u16>) -> Self {
        RadiometricFrame {
            raw,
            channels: Channels::Gray,
        }
    }

    /// Decode a frame from a raster file (PNG, TIFF, ...).
    ///
    /// 8 and 16-bit grayscale files keep their counts as is.
    /// Color files are reduced to luma at their own bit depth,
    /// so pseudo-color captures still yield one intensity per
    /// pixel. Floating point rasters are rejected.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(Error::InputNotFound(path.to_owned()));
        }
        let image = image::open(path).map_err(|source| Error::Decode {
            path: path.to_owned(),
            source,
        })?;
        Self::from_dynamic(&image).ok_or_else(|| Error::UnsupportedFormat {
            path: path.to_owned(),
            format: format!("{:?}", image.color()),
        })
    }

    /// Reduce a decoded image to a single-channel frame. Returns
    /// `None` for sample formats with no integral counts.
    pub fn from_dynamic(image: &DynamicImage) -> Option<Self> {
        let raw = match image {
            DynamicImage::ImageLuma8(buf) => luma_to_array(buf),
            DynamicImage::ImageLuma16(buf) => luma_to_array(buf),
            DynamicImage::ImageLumaA8(_)
            | DynamicImage::ImageRgb8(_)
            | DynamicImage::ImageRgba8(_) => luma_to_array(&image.to_luma8()),
            DynamicImage::ImageLumaA16(_)
            | DynamicImage::ImageRgb16(_)
            | DynamicImage::ImageRgba16(_) => luma_to_array(&image.to_luma16()),
            _ => return None,
        };
        let channels = if image.color().has_color() {
            Channels::Color
        } else {
            Channels::Gray
        };
        debug!(
            "decoded {:?} frame: {}x{}",
            image.color(),
            raw.ncols(),
            raw.nrows()
        );
        Some(RadiometricFrame { raw, channels })
    }

    pub fn raw(&self) -> ArrayView2<'_, u16> {
        self.raw.view()
    }

    pub fn channels(&self) -> Channels {
        self.channels
    }

    pub fn width(&self) -> usize {
        self.raw.ncols()
    }

    pub fn height(&self) -> usize {
        self.raw.nrows()
    }

    /// Raw count at pixel `(x, y)`, if inside the frame.
    pub fn get(&self, x: usize, y: usize) -> Option<u16> {
        self.raw.get((y, x)).copied()
    }

    /// Sub-frame of `width` columns starting at column `x`.
    pub fn columns(&self, x: usize, width: usize) -> RadiometricFrame {
        let end = (x + width).min(self.width());
        let start = x.min(end);
        RadiometricFrame {
            raw: self.raw.slice(s![.., start..end]).to_owned(),
            channels: self.channels,
        }
    }

    /// Bisect along the width at `width / 2`. The right half
    /// takes the odd column, if any.
    pub fn split_halves(&self) -> (RadiometricFrame, RadiometricFrame) {
        let mid = self.width() / 2;
        (
            self.columns(0, mid),
            self.columns(mid, self.width() - mid),
        )
    }

    /// Min-max stretch to the full 8-bit range. Only meant for
    /// segmentation and display; temperatures are always read
    /// from [`raw`](Self::raw). A flat frame maps to all zeros.
    pub fn normalized(&self) -> GrayImage {
        let (min, max) = self
            .raw
            .iter()
            .fold((u16::MAX, u16::MIN), |(lo, hi), &v| (lo.min(v), hi.max(v)));
        let scale = if max > min {
            255. / (max - min) as f64
        } else {
            0.
        };
        let (ht, wid) = self.raw.dim();
        GrayImage::from_fn(wid as u32, ht as u32, |x, y| {
            let v = self.raw[(y as usize, x as usize)];
            let scaled = (v.saturating_sub(min) as f64 * scale).round();
            Luma([scaled.min(255.) as u8])
        })
    }
}

fn luma_to_array<T>(buf: &ImageBuffer<Luma<T>, Vec<T>>) -> Array2<u16>
where
    T: Primitive + Into<u16>,
{
    let (wid, ht) = buf.dimensions();
    Array2::from_shape_fn((ht as usize, wid as usize), |(row, col)| {
        buf.get_pixel(col as u32, row as u32).0[0].into()
    })
}
