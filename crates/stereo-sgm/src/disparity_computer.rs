//! Trimmed-mean disparity selection.

use stereo_sgm_core::{Disparity, DisparityMap, Point2};

use crate::params::{CostMethod, MeanMethod};
use crate::path::PATHS_COUNT;

/// One path's vote for a pixel's disparity.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct DisparityForPixel {
    /// Signed disparity (negative for a left-base pass).
    pub disparity: i32,
    /// Steps walked on the contributing path when the best cost was seen.
    pub path_length: i32,
    /// Best aggregated cost along the path.
    pub path_cost: f64,
    /// Local matching cost at the voted disparity.
    pub match_cost: f64,
}

/// Collects the eight per-path votes of a pixel and selects a disparity by
/// iteratively trimming the worse end of the sorted candidates while the
/// windowed cost keeps improving.
#[derive(Clone, Debug)]
pub struct SgmDisparityComputer {
    entries: [DisparityForPixel; PATHS_COUNT],
    count: usize,
    mean_method: MeanMethod,
    cost_method: CostMethod,
    path_length_threshold: f64,
    cost_method_power: f64,
}

impl SgmDisparityComputer {
    pub fn new(
        mean_method: MeanMethod,
        cost_method: CostMethod,
        path_length_threshold: f64,
        cost_method_power: f64,
    ) -> Self {
        Self {
            entries: [DisparityForPixel::default(); PATHS_COUNT],
            count: 0,
            mean_method,
            cost_method,
            path_length_threshold,
            cost_method_power,
        }
    }

    /// Record one path's vote. At most one per direction between
    /// finalizations.
    pub fn store(&mut self, vote: DisparityForPixel) {
        debug_assert!(self.count < PATHS_COUNT, "disparity buffer overflow");
        self.entries[self.count] = vote;
        self.count += 1;
    }

    /// Select and write the final disparity for `pixel`, then reset the
    /// vote buffer. `match_cost` evaluates the local cost between a base
    /// pixel and a matched pixel.
    pub fn finalize_for_pixel<F>(&mut self, pixel: Point2, map: &mut DisparityMap, match_cost: F)
    where
        F: Fn(Point2, Point2) -> f64,
    {
        if self.count == 0 {
            map[pixel] = Disparity::default();
            return;
        }

        let initial = self.count;
        self.entries[..initial].sort_unstable_by_key(|entry| entry.disparity);

        let mut start = 0usize;
        let mut count = initial;
        let mut mean = self.mean(start, count);
        let mut cost = self.window_cost(mean, start, count);

        while count > 2 {
            let mean1 = self.mean(start + 1, count - 1);
            let cost1 = self.window_cost(mean1, start + 1, count - 1);
            let mean2 = self.mean(start, count - 1);
            let cost2 = self.window_cost(mean2, start, count - 1);

            if cost > cost1 || cost > cost2 {
                if cost1 < cost2 {
                    start += 1;
                    mean = mean1;
                    cost = cost1;
                } else {
                    mean = mean2;
                    cost = cost2;
                }
                count -= 1;
            } else {
                break;
            }
        }

        let dx = mean.round() as i32;
        let matched = Point2::new(pixel.y, pixel.x + dx);
        let final_cost = match_cost(pixel, matched);
        let confidence = count as f64 / initial as f64;
        map[pixel] = Disparity::valid(dx, mean, final_cost, confidence);

        self.count = 0;
    }

    fn mean(&self, start: usize, count: usize) -> f64 {
        let window = &self.entries[start..start + count];
        match self.mean_method {
            MeanMethod::SimpleAverage => {
                let sum: f64 = window.iter().map(|e| f64::from(e.disparity)).sum();
                sum / count as f64
            }
            MeanMethod::WeightedAverageWithPathLength => {
                let threshold = self.path_length_threshold;
                let mut weighted = 0.0;
                let mut weight_sum = 0.0;
                for entry in window {
                    let w = ((f64::from(entry.path_length) - threshold) / threshold).clamp(0.0, 1.0);
                    weight_sum += w;
                    weighted += w * f64::from(entry.disparity);
                }
                if weight_sum > 0.0 {
                    weighted / weight_sum
                } else {
                    // All contributing paths were too short to weight.
                    let sum: f64 = window.iter().map(|e| f64::from(e.disparity)).sum();
                    sum / count as f64
                }
            }
        }
    }

    fn window_cost(&self, mean: f64, start: usize, count: usize) -> f64 {
        let window = &self.entries[start..start + count];
        match self.cost_method {
            CostMethod::DistanceToMean => {
                let sum: f64 = window.iter().map(|e| (mean - f64::from(e.disparity)).abs()).sum();
                sum / (count as f64).powf(self.cost_method_power * 0.5)
            }
            CostMethod::DistanceSquaredToMean => {
                let sum: f64 = window
                    .iter()
                    .map(|e| {
                        let d = mean - f64::from(e.disparity);
                        d * d
                    })
                    .sum();
                sum / (count as f64).powf(self.cost_method_power)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use stereo_sgm_core::DisparityFlag;

    fn vote(disparity: i32, path_length: i32) -> DisparityForPixel {
        DisparityForPixel {
            disparity,
            path_length,
            path_cost: 1.0,
            match_cost: 0.5,
        }
    }

    fn computer(mean: MeanMethod, cost: CostMethod, power: f64) -> SgmDisparityComputer {
        SgmDisparityComputer::new(mean, cost, 4.0, power)
    }

    #[test]
    fn empty_buffer_writes_invalid() {
        let mut computer = computer(MeanMethod::SimpleAverage, CostMethod::DistanceToMean, 2.0);
        let mut map = DisparityMap::new(2, 2);
        computer.finalize_for_pixel(Point2::new(1, 1), &mut map, |_, _| 0.0);
        let out = map[Point2::new(1, 1)];
        assert_eq!(out.flag, DisparityFlag::Invalid);
        assert!(out.cost.is_infinite());
    }

    #[test]
    fn converges_by_trimming_far_outliers() {
        // Votes {0,0,1,1,2,2,10,10}: the two 10s are trimmed, the window
        // settles on six entries around 1.
        let mut computer = computer(MeanMethod::SimpleAverage, CostMethod::DistanceToMean, 3.0);
        let mut map = DisparityMap::new(1, 16);
        for d in [10, 0, 2, 1, 10, 0, 1, 2] {
            computer.store(vote(d, 8));
        }
        computer.finalize_for_pixel(Point2::new(0, 5), &mut map, |p, m| {
            f64::from((m.x - p.x).abs())
        });

        let out = map[Point2::new(0, 5)];
        assert_eq!(out.flag, DisparityFlag::Valid);
        assert_eq!(out.dx, 1);
        assert_relative_eq!(out.sub_dx, 1.0);
        assert_relative_eq!(out.confidence, 6.0 / 8.0);
        // Final cost re-evaluates the local cost at the rounded mean.
        assert_relative_eq!(out.cost, 1.0);
    }

    #[test]
    fn drops_single_high_end_outlier() {
        let mut computer = computer(MeanMethod::SimpleAverage, CostMethod::DistanceToMean, 2.0);
        let mut map = DisparityMap::new(1, 8);
        for d in [4, 2, 2, 2] {
            computer.store(vote(d, 8));
        }
        computer.finalize_for_pixel(Point2::new(0, 3), &mut map, |_, _| 0.0);

        let out = map[Point2::new(0, 3)];
        assert_eq!(out.dx, 2);
        assert_relative_eq!(out.confidence, 0.75);
    }

    #[test]
    fn weighted_mean_ignores_short_paths() {
        let mut computer = computer(
            MeanMethod::WeightedAverageWithPathLength,
            CostMethod::DistanceSquaredToMean,
            2.0,
        );
        let mut map = DisparityMap::new(1, 8);
        computer.store(vote(2, 8)); // weight 1
        computer.store(vote(6, 2)); // weight 0
        computer.finalize_for_pixel(Point2::new(0, 1), &mut map, |_, _| 0.0);

        let out = map[Point2::new(0, 1)];
        assert_eq!(out.dx, 2);
        assert_relative_eq!(out.sub_dx, 2.0);
    }

    #[test]
    fn zero_weight_sum_falls_back_to_simple_average() {
        let mut computer = computer(
            MeanMethod::WeightedAverageWithPathLength,
            CostMethod::DistanceToMean,
            2.0,
        );
        let mut map = DisparityMap::new(1, 8);
        computer.store(vote(2, 1));
        computer.store(vote(4, 1));
        computer.finalize_for_pixel(Point2::new(0, 1), &mut map, |_, _| 0.0);

        let out = map[Point2::new(0, 1)];
        assert_eq!(out.dx, 3);
        assert_relative_eq!(out.sub_dx, 3.0);
    }

    #[test]
    fn buffer_resets_between_pixels() {
        let mut computer = computer(MeanMethod::SimpleAverage, CostMethod::DistanceToMean, 2.0);
        let mut map = DisparityMap::new(1, 8);
        for _ in 0..PATHS_COUNT {
            computer.store(vote(-3, 8));
        }
        computer.finalize_for_pixel(Point2::new(0, 4), &mut map, |_, _| 0.0);
        assert_eq!(map[Point2::new(0, 4)].dx, -3);

        computer.store(vote(-1, 8));
        computer.finalize_for_pixel(Point2::new(0, 5), &mut map, |_, _| 0.0);
        let out = map[Point2::new(0, 5)];
        assert_eq!(out.dx, -1);
        assert_relative_eq!(out.confidence, 1.0);
    }
}
