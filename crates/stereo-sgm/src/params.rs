use serde::{Deserialize, Serialize};

use crate::error::SgmError;

/// Supported mask radius bounds; larger requests clamp to the upper bound.
pub const MIN_MASK_RADIUS: usize = 1;
pub const MAX_MASK_RADIUS: usize = 7;

/// Kind of image payload the matcher operates on.
///
/// `Color` and `MaskedColor` are part of the host contract but rejected at
/// creation; only grey variants are implemented.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImageType {
    Grey,
    MaskedGrey,
    Color,
    MaskedColor,
}

/// How the per-pixel disparity candidates are averaged.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum MeanMethod {
    SimpleAverage,
    WeightedAverageWithPathLength,
}

/// Outlier pressure used while trimming disparity candidates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CostMethod {
    DistanceToMean,
    DistanceSquaredToMean,
}

/// Host-facing matcher configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SgmParameters {
    /// Image height; must match both input images.
    pub rows: usize,
    /// Image width; must match both input images.
    pub cols: usize,
    /// Kind of image payload supplied to `process`.
    pub image_type: ImageType,
    /// Hard cap on concurrently running pipeline tasks.
    pub max_parallel_tasks: usize,
    /// Upper bound of the disparity search range (shrunk near edges).
    pub max_disparity: i32,
    /// Census mask half-width; clamped into `[1, 7]`.
    pub census_mask_radius: usize,
    /// P1 = `low_penalty_coeff * max_cost` penalises one-step disparity change.
    pub low_penalty_coeff: f64,
    /// P2 = `high_penalty_coeff * max_cost` penalises larger jumps.
    pub high_penalty_coeff: f64,
    /// Above this absolute luma difference P2 applies with factor 1.0,
    /// otherwise 2.0.
    pub intensity_threshold: f64,
    pub disparity_mean_method: MeanMethod,
    pub disparity_cost_method: CostMethod,
    /// Path-length weighting pivot for `WeightedAverageWithPathLength`.
    pub disparity_path_length_threshold: f64,
    /// Exponent of the count denominator in the trimming cost.
    pub cost_method_power: f64,
}

impl Default for SgmParameters {
    fn default() -> Self {
        Self {
            rows: 0,
            cols: 0,
            image_type: ImageType::Grey,
            max_parallel_tasks: 2,
            max_disparity: 64,
            census_mask_radius: 3,
            low_penalty_coeff: 0.02,
            high_penalty_coeff: 0.06,
            intensity_threshold: 0.1,
            disparity_mean_method: MeanMethod::SimpleAverage,
            disparity_cost_method: CostMethod::DistanceToMean,
            disparity_path_length_threshold: 10.0,
            cost_method_power: 2.0,
        }
    }
}

impl SgmParameters {
    /// Mask radius after clamping oversized requests.
    pub fn effective_mask_radius(&self) -> usize {
        self.census_mask_radius.min(MAX_MASK_RADIUS)
    }

    /// Check everything that does not require the images themselves.
    pub(crate) fn validate(&self) -> Result<(), SgmError> {
        if self.census_mask_radius < MIN_MASK_RADIUS {
            return Err(SgmError::MaskRadius(self.census_mask_radius));
        }
        if self.rows == 0 || self.cols == 0 {
            return Err(SgmError::InvalidParameter {
                name: "rows/cols",
                reason: "must be positive",
            });
        }
        let radius = self.effective_mask_radius();
        if self.rows <= radius || self.cols <= radius {
            return Err(SgmError::InvalidParameter {
                name: "census_mask_radius",
                reason: "mirrored mask must fit inside the image",
            });
        }
        if self.max_parallel_tasks == 0 {
            return Err(SgmError::InvalidParameter {
                name: "max_parallel_tasks",
                reason: "must be at least 1",
            });
        }
        if self.max_disparity < 1 {
            return Err(SgmError::InvalidParameter {
                name: "max_disparity",
                reason: "must be at least 1",
            });
        }
        if self.low_penalty_coeff < 0.0 || self.high_penalty_coeff < 0.0 {
            return Err(SgmError::InvalidParameter {
                name: "penalty coefficients",
                reason: "must be non-negative",
            });
        }
        if !(self.disparity_path_length_threshold > 0.0) {
            return Err(SgmError::InvalidParameter {
                name: "disparity_path_length_threshold",
                reason: "must be positive",
            });
        }
        if !(self.cost_method_power > 0.0) {
            return Err(SgmError::InvalidParameter {
                name: "cost_method_power",
                reason: "must be positive",
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> SgmParameters {
        SgmParameters {
            rows: 8,
            cols: 8,
            ..Default::default()
        }
    }

    #[test]
    fn default_passes_once_sized() {
        assert!(valid().validate().is_ok());
    }

    #[test]
    fn zero_radius_is_rejected() {
        let params = SgmParameters {
            census_mask_radius: 0,
            ..valid()
        };
        assert!(matches!(params.validate(), Err(SgmError::MaskRadius(0))));
    }

    #[test]
    fn oversized_radius_clamps() {
        let params = SgmParameters {
            census_mask_radius: 9,
            ..valid()
        };
        assert!(params.validate().is_ok());
        assert_eq!(params.effective_mask_radius(), MAX_MASK_RADIUS);
    }

    #[test]
    fn mask_wider_than_image_is_rejected() {
        let params = SgmParameters {
            rows: 6,
            cols: 6,
            census_mask_radius: 6,
            ..Default::default()
        };
        assert!(matches!(
            params.validate(),
            Err(SgmError::InvalidParameter { name: "census_mask_radius", .. })
        ));
    }

    #[test]
    fn non_positive_scalars_are_rejected() {
        for mutate in [
            (|p: &mut SgmParameters| p.max_parallel_tasks = 0) as fn(&mut SgmParameters),
            |p| p.max_disparity = 0,
            |p| p.low_penalty_coeff = -0.1,
            |p| p.disparity_path_length_threshold = 0.0,
            |p| p.cost_method_power = 0.0,
        ] {
            let mut params = valid();
            mutate(&mut params);
            assert!(params.validate().is_err());
        }
    }
}
