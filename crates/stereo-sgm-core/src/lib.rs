//! Common building blocks for the `stereo-sgm` matcher.
//!
//! This crate is intentionally small and algorithm-agnostic: dense
//! containers, bit vectors, the disparity model, the image model and a
//! static-DAG task queue. It does *not* depend on any concrete matching
//! cost or aggregation scheme.

mod array2d;
mod array3d;
mod bitword;
mod disparity;
mod image;
mod point;
mod task_queue;

pub use array2d::Array2d;
pub use array3d::Array3d;
pub use bitword::{census_words, ones_count, BitWord, WORD_BITS};
pub use disparity::{Disparity, DisparityFlag, DisparityMap};
pub use image::{ColorImage, GreyImage, IntensityImage, MaskedColorImage, MaskedGreyImage, MaskedImage};
pub use point::Point2;
pub use task_queue::{QueueStop, StaticTaskQueue, TaskId};
