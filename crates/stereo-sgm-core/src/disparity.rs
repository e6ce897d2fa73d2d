use serde::{Deserialize, Serialize};

use crate::Array2d;

/// Validity state of a computed disparity.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum DisparityFlag {
    #[default]
    Invalid,
    Valid,
    Occluded,
}

/// Per-pixel stereo matching result.
///
/// `dx` is signed: negative when the left image is the base, positive
/// otherwise. `sub_dx` keeps the un-rounded mean the selector converged to.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Disparity {
    pub dx: i32,
    pub flag: DisparityFlag,
    pub sub_dx: f64,
    pub cost: f64,
    pub confidence: f64,
}

impl Default for Disparity {
    fn default() -> Self {
        Self {
            dx: 0,
            flag: DisparityFlag::Invalid,
            sub_dx: 0.0,
            cost: f64::INFINITY,
            confidence: 0.0,
        }
    }
}

impl Disparity {
    pub fn valid(dx: i32, sub_dx: f64, cost: f64, confidence: f64) -> Self {
        Self {
            dx,
            flag: DisparityFlag::Valid,
            sub_dx,
            cost,
            confidence,
        }
    }

    #[inline]
    pub fn is_valid(&self) -> bool {
        self.flag == DisparityFlag::Valid
    }
}

/// Dense per-pixel disparity output, `rows × cols`.
pub type DisparityMap = Array2d<Disparity>;
