//! Grey and color image views over dense matrices.

use crate::{Array2d, Array3d};

/// Read access to a rectified intensity image.
///
/// `value` returns the luma used by the matching cost; `has_value` exposes
/// an optional per-pixel validity mask (always true for plain images).
pub trait IntensityImage: Sync {
    fn rows(&self) -> usize;
    fn cols(&self) -> usize;

    fn channels(&self) -> usize {
        1
    }

    fn value(&self, y: usize, x: usize) -> f64;

    fn has_value(&self, _y: usize, _x: usize) -> bool {
        true
    }
}

/// Single-channel floating-point image.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct GreyImage {
    matrix: Array2d<f64>,
}

impl GreyImage {
    pub fn new(rows: usize, cols: usize) -> Self {
        Self {
            matrix: Array2d::new(rows, cols),
        }
    }

    /// Wrap a row-major intensity vector. Returns `None` on length mismatch.
    pub fn from_vec(rows: usize, cols: usize, data: Vec<f64>) -> Option<Self> {
        Array2d::from_vec(rows, cols, data).map(|matrix| Self { matrix })
    }

    #[inline]
    pub fn set(&mut self, y: usize, x: usize, value: f64) {
        self.matrix[(y, x)] = value;
    }

    pub fn matrix(&self) -> &Array2d<f64> {
        &self.matrix
    }

    pub fn matrix_mut(&mut self) -> &mut Array2d<f64> {
        &mut self.matrix
    }
}

impl IntensityImage for GreyImage {
    fn rows(&self) -> usize {
        self.matrix.rows()
    }

    fn cols(&self) -> usize {
        self.matrix.cols()
    }

    #[inline]
    fn value(&self, y: usize, x: usize) -> f64 {
        self.matrix[(y, x)]
    }
}

/// Three-channel image; the matching cost reads channel 0 as luma.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ColorImage {
    matrix: Array3d<f64>,
}

impl ColorImage {
    pub fn new(rows: usize, cols: usize) -> Self {
        Self {
            matrix: Array3d::new(rows, cols, 3),
        }
    }

    pub fn from_vec(rows: usize, cols: usize, data: Vec<f64>) -> Option<Self> {
        Array3d::from_vec(rows, cols, 3, data).map(|matrix| Self { matrix })
    }

    #[inline]
    pub fn set(&mut self, y: usize, x: usize, channel: usize, value: f64) {
        self.matrix[(y, x, channel)] = value;
    }

    pub fn matrix(&self) -> &Array3d<f64> {
        &self.matrix
    }
}

impl IntensityImage for ColorImage {
    fn rows(&self) -> usize {
        self.matrix.rows()
    }

    fn cols(&self) -> usize {
        self.matrix.cols()
    }

    fn channels(&self) -> usize {
        3
    }

    #[inline]
    fn value(&self, y: usize, x: usize) -> f64 {
        self.matrix[(y, x, 0)]
    }
}

/// An image paired with a boolean validity mask.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MaskedImage<I> {
    image: I,
    mask: Array2d<bool>,
}

impl<I: IntensityImage> MaskedImage<I> {
    /// Wrap `image` with an all-false mask.
    pub fn new(image: I) -> Self {
        let mask = Array2d::new(image.rows(), image.cols());
        Self { image, mask }
    }

    /// Wrap `image` with an explicit mask. Returns `None` on size mismatch.
    pub fn with_mask(image: I, mask: Array2d<bool>) -> Option<Self> {
        if mask.rows() != image.rows() || mask.cols() != image.cols() {
            return None;
        }
        Some(Self { image, mask })
    }

    #[inline]
    pub fn set_mask_at(&mut self, y: usize, x: usize, valid: bool) {
        self.mask[(y, x)] = valid;
    }

    pub fn image(&self) -> &I {
        &self.image
    }

    pub fn mask(&self) -> &Array2d<bool> {
        &self.mask
    }
}

impl<I: IntensityImage> IntensityImage for MaskedImage<I> {
    fn rows(&self) -> usize {
        self.image.rows()
    }

    fn cols(&self) -> usize {
        self.image.cols()
    }

    fn channels(&self) -> usize {
        self.image.channels()
    }

    #[inline]
    fn value(&self, y: usize, x: usize) -> f64 {
        self.image.value(y, x)
    }

    #[inline]
    fn has_value(&self, y: usize, x: usize) -> bool {
        self.mask[(y, x)]
    }
}

pub type MaskedGreyImage = MaskedImage<GreyImage>;
pub type MaskedColorImage = MaskedImage<ColorImage>;
