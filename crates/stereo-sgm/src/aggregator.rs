//! Eight-path Semi-Global Matching cost aggregation for one base image.

use std::mem;
use std::sync::{Arc, Mutex, RwLock};

use log::debug;
use stereo_sgm_core::{DisparityMap, IntensityImage, Point2};

#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::census::CensusTransform;
use crate::disparity_computer::{DisparityForPixel, SgmDisparityComputer};
use crate::params::SgmParameters;
use crate::path::RunDirection;
use crate::paths_manager::{DirectionPaths, PathCost, RunPaths, SgmPathsManager};
use crate::status::{CancelFlag, SgmPhase, StatusSlot};

const LOCK: &str = "aggregator lock poisoned";

struct OutputState {
    computer: SgmDisparityComputer,
    map: DisparityMap,
}

/// Path-wise cost aggregation and disparity extraction for one base image
/// (left or right) of a rectified pair.
///
/// The five pipeline stages are `&self` methods with interior locking so
/// the task queue can run them (in particular the two sweeps) as separate
/// tasks. Census signatures sit behind a `RwLock` (written once,
/// then read by both sweeps); the path state is partitioned into the two
/// run halves, each behind its own mutex, matching the disjoint direction
/// subsets the sweeps touch.
pub struct SgmCostAggregator<'a, I: IntensityImage, const W: usize> {
    rows: usize,
    cols: usize,
    max_disparity: i32,
    low_penalty_coeff: f64,
    high_penalty_coeff: f64,
    intensity_threshold: f64,
    is_left_base: bool,
    base: &'a I,
    matched: &'a I,
    census: RwLock<CensusTransform<W>>,
    paths: SgmPathsManager,
    output: Mutex<OutputState>,
    cancel: CancelFlag,
    status: Arc<StatusSlot>,
}

impl<'a, I: IntensityImage, const W: usize> SgmCostAggregator<'a, I, W> {
    pub fn new(
        params: &SgmParameters,
        is_left_base: bool,
        base: &'a I,
        matched: &'a I,
        cancel: CancelFlag,
        status: Arc<StatusSlot>,
    ) -> Self {
        let rows = params.rows;
        let cols = params.cols;
        debug_assert_eq!((base.rows(), base.cols()), (rows, cols));
        debug_assert_eq!((matched.rows(), matched.cols()), (rows, cols));

        Self {
            rows,
            cols,
            max_disparity: params.max_disparity,
            low_penalty_coeff: params.low_penalty_coeff,
            high_penalty_coeff: params.high_penalty_coeff,
            intensity_threshold: params.intensity_threshold,
            is_left_base,
            base,
            matched,
            census: RwLock::new(CensusTransform::new(rows, cols, params.effective_mask_radius())),
            paths: SgmPathsManager::new(rows, cols),
            output: Mutex::new(OutputState {
                computer: SgmDisparityComputer::new(
                    params.disparity_mean_method,
                    params.disparity_cost_method,
                    params.disparity_path_length_threshold,
                    params.cost_method_power,
                ),
                map: DisparityMap::new(rows, cols),
            }),
            cancel,
            status,
        }
    }

    #[inline]
    pub fn is_left_base(&self) -> bool {
        self.is_left_base
    }

    /// Disparity search bound at column `x`, shrunk near the relevant edge.
    #[inline]
    pub fn disp_range(&self, x: i32) -> i32 {
        if self.is_left_base {
            x.min(self.max_disparity)
        } else {
            (self.cols as i32 - 1 - x).min(self.max_disparity)
        }
    }

    /// Run the whole pipeline sequentially on the calling thread.
    #[cfg_attr(feature = "tracing", instrument(level = "debug", skip_all))]
    pub fn compute_matching_costs(&self) {
        self.init_local_costs();
        self.init_paths();
        self.find_costs(RunDirection::TopDown);
        self.find_costs(RunDirection::BottomUp);
        self.find_disparities();
        self.done();
    }

    /// Census-transform both images.
    #[cfg_attr(feature = "tracing", instrument(level = "debug", skip_all))]
    pub fn init_local_costs(&self) {
        let mut census = self.census.write().expect(LOCK);
        census.compute(self.base, self.matched, &self.cancel, &self.status);
        debug!(
            "census done ({} base, {} bits, max cost {})",
            if self.is_left_base { "left" } else { "right" },
            census.mask_length(),
            census.max_cost()
        );
    }

    /// Create and seed the border paths of all eight directions.
    #[cfg_attr(feature = "tracing", instrument(level = "debug", skip_all))]
    pub fn init_paths(&self) {
        self.status.set_phase(SgmPhase::PathsInit);
        let census = self.census.read().expect(LOCK);
        self.paths
            .init(self.is_left_base, |p, q| census.cost(p, q), |x| self.disp_range(x));
    }

    /// One aggregation sweep over the four directions of `run`.
    #[cfg_attr(feature = "tracing", instrument(level = "debug", skip(self)))]
    pub fn find_costs(&self, run: RunDirection) {
        let bottom_up = run == RunDirection::BottomUp;
        self.status.set_phase(if bottom_up {
            SgmPhase::SweepBottomUp
        } else {
            SgmPhase::SweepTopDown
        });

        let census = self.census.read().expect(LOCK);
        let p1 = self.low_penalty_coeff * census.max_cost();
        let p2 = self.high_penalty_coeff * census.max_cost();
        let mut guard = self.paths.run_lock(run);
        let mut scratch = vec![0.0f64; self.cols + 1];

        let rows = self.rows as i32;
        let cols = self.cols as i32;
        if bottom_up {
            for y in (0..rows).rev() {
                self.status.set_pixel(Point2::new(y, cols - 1));
                for x in (0..cols).rev() {
                    if !self.sweep_pixel(&mut guard, &census, Point2::new(y, x), true, p1, p2, &mut scratch) {
                        return;
                    }
                }
            }
        } else {
            for y in 0..rows {
                self.status.set_pixel(Point2::new(y, 0));
                for x in 0..cols {
                    if !self.sweep_pixel(&mut guard, &census, Point2::new(y, x), false, p1, p2, &mut scratch) {
                        return;
                    }
                }
            }
        }
    }

    /// Returns false when cancellation was requested.
    fn sweep_pixel(
        &self,
        run: &mut RunPaths,
        census: &CensusTransform<W>,
        p: Point2,
        bottom_up: bool,
        p1: f64,
        p2: f64,
        scratch: &mut [f64],
    ) -> bool {
        if self.cancel.is_set() {
            return false;
        }
        let max_disp = self.disp_range(p.x);
        for dir in run.dirs.iter_mut() {
            self.aggregate_path_step(dir, census, p, max_disp, bottom_up, p1, p2, scratch);
        }
        true
    }

    #[allow(clippy::too_many_arguments)]
    fn aggregate_path_step(
        &self,
        dir: &mut DirectionPaths,
        census: &CensusTransform<W>,
        p: Point2,
        max_disp: i32,
        bottom_up: bool,
        p1: f64,
        p2: f64,
        scratch: &mut [f64],
    ) {
        let anchor = dir.direction.border_pixel(p, self.rows, self.cols);
        let (path, best) = dir.step_view(anchor).expect("path anchored at border pixel");
        debug_assert!(path.length > 0, "empty path at {anchor}");
        debug_assert!(path.current_index < path.length, "path walked past its end");
        debug_assert_eq!(path.current, p, "path out of sync with sweep");

        let prev_best = best[path.previous];
        let mut best_cost = f64::INFINITY;
        let mut best_disp = 0i32;
        let mut best_length = 0i32;

        for d in 0..max_disp {
            let matched = Point2::new(p.y, if self.is_left_base { p.x - d } else { p.x + d });
            debug_assert!((0..self.cols as i32).contains(&matched.x));

            let local = census.cost(p, matched);
            let pen_keep = path.last_step_costs[d as usize];
            let pen_near = if d == 0 {
                path.last_step_costs[1]
            } else {
                path.last_step_costs[(d - 1) as usize].min(path.last_step_costs[(d + 1) as usize])
            };
            // Deliberate simplification inherited from the reference
            // algorithm: the far penalty uses the unrestricted best
            // previous cost, not min over |d' - d| > 1.
            let pen_far = prev_best.cost;

            let img_diff = (self.base.value(p.y as usize, p.x as usize)
                - self.matched.value(matched.y as usize, matched.x as usize))
                .abs();
            let factor = if img_diff > self.intensity_threshold { 1.0 } else { 2.0 };

            let cost = local + pen_keep.min(pen_near + p1).min(pen_far + p2 * factor);
            scratch[d as usize] = cost;
            if best_cost > cost {
                best_cost = cost;
                best_disp = d;
                best_length = path.current_index + 1;
            }
        }

        best[p] = PathCost {
            cost: best_cost,
            disparity: best_disp,
            path_length: best_length,
        };

        let width = max_disp as usize;
        path.last_step_costs[..width].copy_from_slice(&scratch[..width]);

        if bottom_up && max_disp > 0 {
            // The next step may enlarge the search range by one; give index
            // `max_disp` a valid value built from the edge-most match.
            let edge_x = if self.is_left_base { 0 } else { self.cols as i32 - 1 };
            path.last_step_costs[width] =
                census.cost(p, Point2::new(p.y, edge_x)) + path.last_step_costs[width - 1];
        }

        path.advance();
    }

    /// Gather the eight per-path bests of every pixel and finalize the map.
    #[cfg_attr(feature = "tracing", instrument(level = "debug", skip_all))]
    pub fn find_disparities(&self) {
        self.status.set_phase(SgmPhase::Disparities);
        let census = self.census.read().expect(LOCK);
        let (top, bottom) = self.paths.lock_both();
        let mut output = self.output.lock().expect(LOCK);
        let OutputState { computer, map } = &mut *output;

        let sign = if self.is_left_base { -1 } else { 1 };
        for y in 0..self.rows as i32 {
            self.status.set_pixel(Point2::new(y, 0));
            for x in 0..self.cols as i32 {
                if self.cancel.is_set() {
                    return;
                }
                let p = Point2::new(y, x);
                for run in [&top, &bottom] {
                    for dir in &run.dirs {
                        let best = dir.best[p];
                        let dx = best.disparity * sign;
                        let match_cost = census.cost(p, Point2::new(p.y, p.x + dx));
                        computer.store(DisparityForPixel {
                            disparity: dx,
                            path_length: best.path_length,
                            path_cost: best.cost,
                            match_cost,
                        });
                    }
                }
                computer.finalize_for_pixel(p, map, |a, b| census.cost(a, b));
            }
        }
    }

    pub fn done(&self) {
        self.status.set_phase(SgmPhase::Done);
    }

    /// Hand the disparity map out, leaving an empty one behind.
    pub fn take_map(&self) -> DisparityMap {
        mem::take(&mut self.output.lock().expect(LOCK).map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use stereo_sgm_core::{DisparityFlag, GreyImage};

    fn params(rows: usize, cols: usize, max_disparity: i32) -> SgmParameters {
        SgmParameters {
            rows,
            cols,
            max_disparity,
            census_mask_radius: 1,
            max_parallel_tasks: 1,
            ..Default::default()
        }
    }

    fn random_image(rng: &mut StdRng, rows: usize, cols: usize) -> GreyImage {
        let data = (0..rows * cols).map(|_| rng.gen_range(0.0..255.0)).collect();
        GreyImage::from_vec(rows, cols, data).unwrap()
    }

    fn aggregator<'a>(
        params: &SgmParameters,
        left_base: bool,
        base: &'a GreyImage,
        matched: &'a GreyImage,
    ) -> SgmCostAggregator<'a, GreyImage, 1> {
        SgmCostAggregator::new(params, left_base, base, matched, CancelFlag::new(), StatusSlot::new())
    }

    #[test]
    fn disp_range_clamps_at_edges() {
        let img = GreyImage::new(6, 10);
        let p = params(6, 10, 4);

        let left = aggregator(&p, true, &img, &img);
        assert_eq!(left.disp_range(0), 0);
        assert_eq!(left.disp_range(2), 2);
        assert_eq!(left.disp_range(7), 4);

        let right = aggregator(&p, false, &img, &img);
        assert_eq!(right.disp_range(9), 0);
        assert_eq!(right.disp_range(8), 1);
        assert_eq!(right.disp_range(2), 4);
    }

    #[test]
    fn constant_pair_selects_zero_disparity() {
        let img = GreyImage::new(8, 8);
        let p = params(8, 8, 3);
        let agg = aggregator(&p, true, &img, &img);
        agg.compute_matching_costs();

        let map = agg.take_map();
        for y in 0..8 {
            for x in 0..8 {
                let d = map[(y, x)];
                assert_eq!(d.flag, DisparityFlag::Valid, "at ({y}, {x})");
                assert_eq!(d.dx, 0);
                assert_eq!(d.sub_dx, 0.0);
                assert_eq!(d.cost, 0.0);
                assert_eq!(d.confidence, 1.0);
            }
        }
    }

    #[test]
    fn aggregated_cost_dominates_local_cost() {
        let mut rng = StdRng::seed_from_u64(5);
        let base = random_image(&mut rng, 7, 9);
        let matched = random_image(&mut rng, 7, 9);
        let p = params(7, 9, 3);
        let agg = aggregator(&p, true, &base, &matched);
        agg.compute_matching_costs();

        let census = agg.census.read().unwrap();
        let (top, bottom) = agg.paths.lock_both();
        for run in [&top, &bottom] {
            for dir in &run.dirs {
                for y in 0..7i32 {
                    for x in 0..9i32 {
                        let p = Point2::new(y, x);
                        let best = dir.best[p];
                        if agg.disp_range(x) == 0 {
                            assert!(best.cost.is_infinite());
                            continue;
                        }
                        assert!(best.cost.is_finite(), "{:?} at {p}", dir.direction);
                        assert!(best.disparity < agg.disp_range(x));
                        // Penalty terms are non-negative, so L >= C.
                        let matched_px = Point2::new(y, x - best.disparity);
                        assert!(best.cost >= census.cost(p, matched_px) - 1e-9);
                    }
                }
            }
        }
    }

    #[test]
    fn preset_cancellation_leaves_map_invalid() {
        let mut rng = StdRng::seed_from_u64(9);
        let base = random_image(&mut rng, 8, 8);
        let matched = random_image(&mut rng, 8, 8);
        let p = params(8, 8, 3);

        let cancel = CancelFlag::new();
        cancel.set();
        let agg = SgmCostAggregator::<'_, _, 1>::new(&p, true, &base, &matched, cancel, StatusSlot::new());
        agg.compute_matching_costs();

        let map = agg.take_map();
        assert!(map.iter().all(|d| d.flag == DisparityFlag::Invalid));
    }

    #[test]
    fn output_disparities_stay_in_bounds() {
        let mut rng = StdRng::seed_from_u64(13);
        let base = random_image(&mut rng, 10, 12);
        let matched = random_image(&mut rng, 10, 12);
        let p = params(10, 12, 5);
        let agg = aggregator(&p, true, &base, &matched);
        agg.compute_matching_costs();

        let map = agg.take_map();
        for y in 0..10 {
            for x in 0..12 {
                let d = map[(y, x)];
                assert!(d.dx.abs() <= 5);
                assert!(d.dx <= 0, "left base stores non-positive dx");
                assert!(x as i32 + d.dx >= 0);
                assert!(d.confidence >= 0.0 && d.confidence <= 1.0);
            }
        }
    }
}
