//! Host-facing control surface: process, terminate, poll status.

use std::sync::Arc;

use log::info;
use stereo_sgm_core::{ColorImage, DisparityMap, GreyImage, IntensityImage, MaskedColorImage, MaskedGreyImage};

#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::error::SgmError;
use crate::params::{ImageType, SgmParameters};
use crate::runner::create_runner;
use crate::status::{CancelFlag, StatusSlot};

/// Image payload handed to [`SgmStereoMatcher::process`].
///
/// The variant must agree with `SgmParameters::image_type`; the color
/// variants are part of the contract but rejected at creation.
#[derive(Clone, Debug)]
pub enum ImageInput {
    Grey(GreyImage),
    MaskedGrey(MaskedGreyImage),
    Color(ColorImage),
    MaskedColor(MaskedColorImage),
}

impl ImageInput {
    pub fn rows(&self) -> usize {
        match self {
            ImageInput::Grey(img) => img.rows(),
            ImageInput::MaskedGrey(img) => img.rows(),
            ImageInput::Color(img) => img.rows(),
            ImageInput::MaskedColor(img) => img.rows(),
        }
    }

    pub fn cols(&self) -> usize {
        match self {
            ImageInput::Grey(img) => img.cols(),
            ImageInput::MaskedGrey(img) => img.cols(),
            ImageInput::Color(img) => img.cols(),
            ImageInput::MaskedColor(img) => img.cols(),
        }
    }

    pub fn image_type(&self) -> ImageType {
        match self {
            ImageInput::Grey(_) => ImageType::Grey,
            ImageInput::MaskedGrey(_) => ImageType::MaskedGrey,
            ImageInput::Color(_) => ImageType::Color,
            ImageInput::MaskedColor(_) => ImageType::MaskedColor,
        }
    }
}

fn render_status(left: &StatusSlot, right: &StatusSlot) -> String {
    format!("left: {} | right: {}", left.render(), right.render())
}

/// Cloneable handle for observing and cancelling a run from another
/// thread while `process` is in flight.
#[derive(Clone, Debug)]
pub struct SgmControl {
    cancel: CancelFlag,
    status_left: Arc<StatusSlot>,
    status_right: Arc<StatusSlot>,
}

impl SgmControl {
    /// Request cooperative termination. The in-flight `process` call
    /// returns promptly with partially filled maps; this is not an error.
    pub fn terminate(&self) {
        self.cancel.set();
    }

    /// Current phase (and pixel, when relevant) of both passes.
    pub fn status(&self) -> String {
        render_status(&self.status_left, &self.status_right)
    }
}

/// Dense stereo matcher producing left→right and right→left disparity
/// maps from a rectified pair.
///
/// `process` is synchronous; grab a [`SgmControl`] via [`Self::control`]
/// beforehand to terminate or poll status from another thread.
#[derive(Debug, Default)]
pub struct SgmStereoMatcher {
    cancel: CancelFlag,
    status_left: Arc<StatusSlot>,
    status_right: Arc<StatusSlot>,
    map_left: Option<DisparityMap>,
    map_right: Option<DisparityMap>,
}

impl SgmStereoMatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn control(&self) -> SgmControl {
        SgmControl {
            cancel: self.cancel.clone(),
            status_left: Arc::clone(&self.status_left),
            status_right: Arc::clone(&self.status_right),
        }
    }

    /// Validate the configuration, run both matching passes and store the
    /// resulting maps.
    ///
    /// Images are borrowed for the duration of the call. Configuration
    /// errors leave no partial state; termination leaves partially filled
    /// maps.
    #[cfg_attr(feature = "tracing", instrument(level = "info", skip_all, fields(rows = params.rows, cols = params.cols)))]
    pub fn process(
        &mut self,
        params: &SgmParameters,
        left: &ImageInput,
        right: &ImageInput,
    ) -> Result<(), SgmError> {
        params.validate()?;
        for (side, image) in [("left", left), ("right", right)] {
            if image.rows() != params.rows || image.cols() != params.cols {
                return Err(SgmError::DimensionMismatch {
                    side,
                    got_rows: image.rows(),
                    got_cols: image.cols(),
                    rows: params.rows,
                    cols: params.cols,
                });
            }
        }

        self.map_left = None;
        self.map_right = None;
        self.cancel.clear();
        self.status_left.reset();
        self.status_right.reset();

        info!(
            "sgm: {}x{} {:?}, max disparity {}, census radius {}, {} parallel tasks",
            params.rows,
            params.cols,
            params.image_type,
            params.max_disparity,
            params.effective_mask_radius(),
            params.max_parallel_tasks
        );

        let mut runner = create_runner(
            params,
            left,
            right,
            self.cancel.clone(),
            Arc::clone(&self.status_left),
            Arc::clone(&self.status_right),
        )?;
        runner.compute_matching_costs()?;

        let (map_left, map_right) = runner.take_maps();
        self.map_left = Some(map_left);
        self.map_right = Some(map_right);
        Ok(())
    }

    /// See [`SgmControl::terminate`].
    pub fn terminate(&self) {
        self.cancel.set();
    }

    /// See [`SgmControl::status`].
    pub fn status(&self) -> String {
        render_status(&self.status_left, &self.status_right)
    }

    /// Left→right disparity map of the last completed `process` call.
    pub fn map_left(&self) -> Option<&DisparityMap> {
        self.map_left.as_ref()
    }

    /// Right→left disparity map of the last completed `process` call.
    pub fn map_right(&self) -> Option<&DisparityMap> {
        self.map_right.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stereo_sgm_core::DisparityFlag;

    fn grey(rows: usize, cols: usize) -> ImageInput {
        ImageInput::Grey(GreyImage::new(rows, cols))
    }

    fn params(rows: usize, cols: usize) -> SgmParameters {
        SgmParameters {
            rows,
            cols,
            max_disparity: 3,
            census_mask_radius: 1,
            ..Default::default()
        }
    }

    #[test]
    fn initial_status_is_not_run() {
        let matcher = SgmStereoMatcher::new();
        assert_eq!(matcher.status(), "left: not run | right: not run");
        assert!(matcher.map_left().is_none());
    }

    #[test]
    fn rejects_dimension_mismatch() {
        let mut matcher = SgmStereoMatcher::new();
        let err = matcher
            .process(&params(8, 8), &grey(8, 8), &grey(8, 6))
            .unwrap_err();
        assert!(matches!(err, SgmError::DimensionMismatch { side: "right", .. }));
        assert!(matcher.map_left().is_none());
    }

    #[test]
    fn rejects_color_configuration() {
        let mut matcher = SgmStereoMatcher::new();
        let mut p = params(4, 4);
        p.image_type = ImageType::MaskedColor;
        let input = ImageInput::Color(ColorImage::new(4, 4));
        let err = matcher.process(&p, &input, &input).unwrap_err();
        assert!(matches!(err, SgmError::UnsupportedImageType(ImageType::MaskedColor)));
    }

    #[test]
    fn process_fills_both_maps_and_finishes() {
        let mut matcher = SgmStereoMatcher::new();
        matcher.process(&params(8, 8), &grey(8, 8), &grey(8, 8)).unwrap();

        assert_eq!(matcher.status(), "left: done | right: done");
        let left = matcher.map_left().unwrap();
        let right = matcher.map_right().unwrap();
        assert_eq!((left.rows(), left.cols()), (8, 8));
        assert_eq!((right.rows(), right.cols()), (8, 8));
        assert!(left.iter().all(|d| d.flag == DisparityFlag::Valid));
    }

    #[test]
    fn masked_grey_pair_is_supported() {
        let mut matcher = SgmStereoMatcher::new();
        let mut p = params(6, 6);
        p.image_type = ImageType::MaskedGrey;
        let input = ImageInput::MaskedGrey(MaskedGreyImage::new(GreyImage::new(6, 6)));
        matcher.process(&p, &input, &input).unwrap();
        assert!(matcher.map_left().is_some());
    }
}
