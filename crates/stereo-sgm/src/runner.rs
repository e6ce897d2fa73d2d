//! Task-graph execution of the two aggregation passes and the runtime
//! dispatch onto concrete aggregator instantiations.

use std::sync::Arc;

use stereo_sgm_core::{DisparityMap, IntensityImage, StaticTaskQueue, TaskId};

use crate::aggregator::SgmCostAggregator;
use crate::error::SgmError;
use crate::matcher::ImageInput;
use crate::params::{ImageType, SgmParameters};
use crate::path::RunDirection;
use crate::status::{CancelFlag, StatusSlot};

/// A constructed matching run, ready to execute once.
pub(crate) trait SgmRunner {
    fn compute_matching_costs(&mut self) -> Result<(), SgmError>;
    /// The left→right and right→left maps, in that order.
    fn take_maps(&mut self) -> (DisparityMap, DisparityMap);
}

const LEFT_CENSUS: TaskId = 0;
const LEFT_PATHS: TaskId = 1;
const LEFT_TOP_DOWN: TaskId = 2;
const LEFT_BOTTOM_UP: TaskId = 3;
const LEFT_DISPARITIES: TaskId = 4;
const RIGHT_CENSUS: TaskId = 5;
const RIGHT_PATHS: TaskId = 6;
const RIGHT_TOP_DOWN: TaskId = 7;
const RIGHT_BOTTOM_UP: TaskId = 8;
const RIGHT_DISPARITIES: TaskId = 9;

/// Runs the left-base and right-base aggregators as two independent task
/// chains whose sweeps fork and join:
///
/// ```text
/// census -> paths -> { top-down || bottom-up } -> disparities
/// ```
pub(crate) struct ParallelSgmAlgorithm<'a, I: IntensityImage, const W: usize> {
    max_parallel: usize,
    left: SgmCostAggregator<'a, I, W>,
    right: SgmCostAggregator<'a, I, W>,
}

impl<'a, I: IntensityImage, const W: usize> ParallelSgmAlgorithm<'a, I, W> {
    pub fn new(
        params: &SgmParameters,
        left_image: &'a I,
        right_image: &'a I,
        cancel: CancelFlag,
        status_left: Arc<StatusSlot>,
        status_right: Arc<StatusSlot>,
    ) -> Self {
        Self {
            max_parallel: params.max_parallel_tasks,
            left: SgmCostAggregator::new(params, true, left_image, right_image, cancel.clone(), status_left),
            right: SgmCostAggregator::new(params, false, right_image, left_image, cancel, status_right),
        }
    }
}

impl<I: IntensityImage, const W: usize> SgmRunner for ParallelSgmAlgorithm<'_, I, W> {
    fn compute_matching_costs(&mut self) -> Result<(), SgmError> {
        let mut queue: StaticTaskQueue<'_, SgmError> = StaticTaskQueue::new(self.max_parallel);
        let left = &self.left;
        let right = &self.right;

        queue.add_task(LEFT_CENSUS, &[], move || {
            left.init_local_costs();
            Ok(())
        });
        queue.add_task(LEFT_PATHS, &[LEFT_CENSUS], move || {
            left.init_paths();
            Ok(())
        });
        queue.add_task(LEFT_TOP_DOWN, &[LEFT_PATHS], move || {
            left.find_costs(RunDirection::TopDown);
            Ok(())
        });
        queue.add_task(LEFT_BOTTOM_UP, &[LEFT_PATHS], move || {
            left.find_costs(RunDirection::BottomUp);
            Ok(())
        });
        queue.add_task(LEFT_DISPARITIES, &[LEFT_TOP_DOWN, LEFT_BOTTOM_UP], move || {
            left.find_disparities();
            left.done();
            Ok(())
        });

        queue.add_task(RIGHT_CENSUS, &[], move || {
            right.init_local_costs();
            Ok(())
        });
        queue.add_task(RIGHT_PATHS, &[RIGHT_CENSUS], move || {
            right.init_paths();
            Ok(())
        });
        queue.add_task(RIGHT_TOP_DOWN, &[RIGHT_PATHS], move || {
            right.find_costs(RunDirection::TopDown);
            Ok(())
        });
        queue.add_task(RIGHT_BOTTOM_UP, &[RIGHT_PATHS], move || {
            right.find_costs(RunDirection::BottomUp);
            Ok(())
        });
        queue.add_task(RIGHT_DISPARITIES, &[RIGHT_TOP_DOWN, RIGHT_BOTTOM_UP], move || {
            right.find_disparities();
            right.done();
            Ok(())
        });

        queue.run()
    }

    fn take_maps(&mut self) -> (DisparityMap, DisparityMap) {
        (self.left.take_map(), self.right.take_map())
    }
}

/// Pick a concrete aggregator instantiation for the configured image type
/// and census mask radius.
///
/// Radii above 7 were already clamped by `effective_mask_radius`; radii
/// below 1 and the color image types are rejected.
pub(crate) fn create_runner<'a>(
    params: &SgmParameters,
    left: &'a ImageInput,
    right: &'a ImageInput,
    cancel: CancelFlag,
    status_left: Arc<StatusSlot>,
    status_right: Arc<StatusSlot>,
) -> Result<Box<dyn SgmRunner + 'a>, SgmError> {
    match params.image_type {
        ImageType::Grey => match (left, right) {
            (ImageInput::Grey(l), ImageInput::Grey(r)) => {
                for_radius(params, l, r, cancel, status_left, status_right)
            }
            _ => Err(SgmError::ImageTypeMismatch {
                expected: ImageType::Grey,
            }),
        },
        ImageType::MaskedGrey => match (left, right) {
            (ImageInput::MaskedGrey(l), ImageInput::MaskedGrey(r)) => {
                for_radius(params, l, r, cancel, status_left, status_right)
            }
            _ => Err(SgmError::ImageTypeMismatch {
                expected: ImageType::MaskedGrey,
            }),
        },
        unsupported @ (ImageType::Color | ImageType::MaskedColor) => {
            Err(SgmError::UnsupportedImageType(unsupported))
        }
    }
}

fn for_radius<'a, I: IntensityImage>(
    params: &SgmParameters,
    left: &'a I,
    right: &'a I,
    cancel: CancelFlag,
    status_left: Arc<StatusSlot>,
    status_right: Arc<StatusSlot>,
) -> Result<Box<dyn SgmRunner + 'a>, SgmError> {
    // Word counts cover (2r+1)^2 signature bits.
    match params.effective_mask_radius() {
        1 | 2 => Ok(Box::new(ParallelSgmAlgorithm::<'a, I, 1>::new(
            params, left, right, cancel, status_left, status_right,
        ))),
        3 => Ok(Box::new(ParallelSgmAlgorithm::<'a, I, 2>::new(
            params, left, right, cancel, status_left, status_right,
        ))),
        4 => Ok(Box::new(ParallelSgmAlgorithm::<'a, I, 3>::new(
            params, left, right, cancel, status_left, status_right,
        ))),
        5 => Ok(Box::new(ParallelSgmAlgorithm::<'a, I, 4>::new(
            params, left, right, cancel, status_left, status_right,
        ))),
        6 => Ok(Box::new(ParallelSgmAlgorithm::<'a, I, 6>::new(
            params, left, right, cancel, status_left, status_right,
        ))),
        7 => Ok(Box::new(ParallelSgmAlgorithm::<'a, I, 8>::new(
            params, left, right, cancel, status_left, status_right,
        ))),
        out_of_range => Err(SgmError::MaskRadius(out_of_range)),
    }
}
