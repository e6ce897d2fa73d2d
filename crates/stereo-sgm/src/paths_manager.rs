//! Ownership of per-direction path state and best-cost caches.

use std::sync::{Mutex, MutexGuard};

use stereo_sgm_core::{Array2d, Point2};

use crate::path::{PathDirection, RunDirection, SgmPath, PATHS_PER_RUN};

/// Best aggregated cost seen so far for one `(pixel, direction)` slot.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PathCost {
    pub cost: f64,
    pub disparity: i32,
    pub path_length: i32,
}

impl Default for PathCost {
    fn default() -> Self {
        Self {
            cost: f64::INFINITY,
            disparity: 0,
            path_length: 0,
        }
    }
}

/// Path arena and best-cost cache of a single direction.
///
/// Paths live in one owned arena; the anchor grid maps a border pixel to
/// its path handle (`None` everywhere else).
#[derive(Debug)]
pub struct DirectionPaths {
    pub direction: PathDirection,
    arena: Vec<SgmPath>,
    anchors: Array2d<Option<u32>>,
    pub best: Array2d<PathCost>,
}

impl DirectionPaths {
    fn new(direction: PathDirection, rows: usize, cols: usize) -> Self {
        Self {
            direction,
            arena: Vec::new(),
            anchors: Array2d::new(rows, cols),
            best: Array2d::new(rows, cols),
        }
    }

    fn insert(&mut self, path: SgmPath) {
        debug_assert!(self.anchors[path.start].is_none(), "duplicate path anchor");
        self.anchors[path.start] = Some(self.arena.len() as u32);
        self.arena.push(path);
    }

    pub fn path_at(&self, anchor: Point2) -> Option<&SgmPath> {
        self.anchors[anchor].map(|idx| &self.arena[idx as usize])
    }

    pub fn path_at_mut(&mut self, anchor: Point2) -> Option<&mut SgmPath> {
        match self.anchors[anchor] {
            Some(idx) => Some(&mut self.arena[idx as usize]),
            None => None,
        }
    }

    /// The anchored path together with this direction's best-cost cache,
    /// borrowed disjointly for one aggregation step.
    pub fn step_view(&mut self, anchor: Point2) -> Option<(&mut SgmPath, &mut Array2d<PathCost>)> {
        match self.anchors[anchor] {
            Some(idx) => Some((&mut self.arena[idx as usize], &mut self.best)),
            None => None,
        }
    }

    pub fn path_count(&self) -> usize {
        self.arena.len()
    }
}

/// The four direction states touched by one sweep.
#[derive(Debug)]
pub struct RunPaths {
    pub dirs: [DirectionPaths; PATHS_PER_RUN],
}

/// Owns all eight direction states, partitioned into two mutex-protected
/// run halves so the concurrently running sweeps lock disjoint state.
#[derive(Debug)]
pub struct SgmPathsManager {
    rows: usize,
    cols: usize,
    runs: [Mutex<RunPaths>; 2],
}

fn run_slot(run: RunDirection) -> usize {
    match run {
        RunDirection::TopDown => 0,
        RunDirection::BottomUp => 1,
    }
}

/// Frame pixels of a `rows × cols` image, each exactly once.
pub(crate) fn frame_pixels(rows: usize, cols: usize) -> Vec<Point2> {
    let mut frame = Vec::with_capacity(2 * cols + 2 * rows.saturating_sub(2));
    let last_row = rows as i32 - 1;
    let last_col = cols as i32 - 1;
    for x in 0..cols as i32 {
        frame.push(Point2::new(0, x));
        if last_row > 0 {
            frame.push(Point2::new(last_row, x));
        }
    }
    for y in 1..last_row {
        frame.push(Point2::new(y, 0));
        if last_col > 0 {
            frame.push(Point2::new(y, last_col));
        }
    }
    frame
}

impl SgmPathsManager {
    pub fn new(rows: usize, cols: usize) -> Self {
        let build = |run| RunPaths {
            dirs: PathDirection::for_run(run).map(|dir| DirectionPaths::new(dir, rows, cols)),
        };
        Self {
            rows,
            cols,
            runs: [
                Mutex::new(build(RunDirection::TopDown)),
                Mutex::new(build(RunDirection::BottomUp)),
            ],
        }
    }

    pub fn run_lock(&self, run: RunDirection) -> MutexGuard<'_, RunPaths> {
        self.runs[run_slot(run)].lock().expect("paths lock poisoned")
    }

    /// Both run halves, for the stages that need all eight directions.
    pub fn lock_both(&self) -> (MutexGuard<'_, RunPaths>, MutexGuard<'_, RunPaths>) {
        (
            self.run_lock(RunDirection::TopDown),
            self.run_lock(RunDirection::BottomUp),
        )
    }

    /// Create every path that legally originates on the image frame and
    /// seed its start pixel: per-disparity costs into `last_step_costs`,
    /// their minimum into the best-cost cache.
    pub fn init<C, D>(&self, is_left_base: bool, cost: C, disp_range: D)
    where
        C: Fn(Point2, Point2) -> f64,
        D: Fn(i32) -> i32,
    {
        let frame = frame_pixels(self.rows, self.cols);
        for run in [RunDirection::TopDown, RunDirection::BottomUp] {
            let mut guard = self.run_lock(run);
            for dir in guard.dirs.iter_mut() {
                for &pixel in &frame {
                    if dir.direction.starts_at(pixel, self.rows, self.cols) {
                        Self::seed_path(dir, pixel, self.rows, self.cols, is_left_base, &cost, &disp_range);
                    }
                }
            }
        }
    }

    fn seed_path<C, D>(
        dir: &mut DirectionPaths,
        start: Point2,
        rows: usize,
        cols: usize,
        is_left_base: bool,
        cost: &C,
        disp_range: &D,
    ) where
        C: Fn(Point2, Point2) -> f64,
        D: Fn(i32) -> i32,
    {
        let mut path = SgmPath::new(dir.direction, start, rows, cols);
        let range = disp_range(start.x);
        let mut best = PathCost::default();
        for d in 0..range {
            let matched = Point2::new(start.y, if is_left_base { start.x - d } else { start.x + d });
            let local = cost(start, matched);
            path.last_step_costs[d as usize] = local;
            if best.cost > local {
                best = PathCost {
                    cost: local,
                    disparity: d,
                    path_length: 0,
                };
            }
        }
        dir.best[start] = best;
        dir.insert(path);
    }
}
