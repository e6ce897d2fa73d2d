//! Semi-Global Matching dense stereo engine.
//!
//! Computes per-pixel disparity maps from a rectified image pair using
//! Census-transform local costs, eight-direction path-wise cost
//! aggregation and trimmed-mean disparity selection. Both passes
//! (left→right and right→left) run concurrently on a static task graph,
//! ready for downstream cross-check filtering.
//!
//! ## Quickstart
//!
//! ```
//! use stereo_sgm::{GreyImage, ImageInput, SgmParameters, SgmStereoMatcher};
//!
//! let params = SgmParameters {
//!     rows: 8,
//!     cols: 8,
//!     max_disparity: 3,
//!     census_mask_radius: 1,
//!     ..Default::default()
//! };
//! let left = ImageInput::Grey(GreyImage::new(8, 8));
//! let right = ImageInput::Grey(GreyImage::new(8, 8));
//!
//! let mut matcher = SgmStereoMatcher::new();
//! matcher.process(&params, &left, &right)?;
//!
//! let map = matcher.map_left().expect("map available after process");
//! assert_eq!(map[(4, 4)].dx, 0);
//! # Ok::<(), stereo_sgm::SgmError>(())
//! ```

mod aggregator;
mod census;
mod disparity_computer;
mod error;
mod matcher;
mod params;
mod path;
mod paths_manager;
mod runner;
mod status;

pub use aggregator::SgmCostAggregator;
pub use census::CensusTransform;
pub use disparity_computer::{DisparityForPixel, SgmDisparityComputer};
pub use error::SgmError;
pub use matcher::{ImageInput, SgmControl, SgmStereoMatcher};
pub use params::{
    CostMethod, ImageType, MeanMethod, SgmParameters, MAX_MASK_RADIUS, MIN_MASK_RADIUS,
};
pub use path::{PathDirection, RunDirection, SgmPath, PATHS_COUNT, PATHS_PER_RUN};
pub use paths_manager::{DirectionPaths, PathCost, RunPaths, SgmPathsManager};
pub use status::{CancelFlag, SgmPhase, StatusSlot};

pub use stereo_sgm_core::{
    Array2d, Array3d, BitWord, ColorImage, Disparity, DisparityFlag, DisparityMap, GreyImage,
    IntensityImage, MaskedColorImage, MaskedGreyImage, MaskedImage, Point2, StaticTaskQueue,
    TaskId,
};
