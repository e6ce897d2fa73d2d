//! Directional aggregation paths.
//!
//! A path is a 1-D trajectory along one of eight unit directions. The
//! direction is plain data (a step vector); anchoring, lengths and
//! advancement are functions of that vector.

use stereo_sgm_core::Point2;

/// Number of aggregation directions.
pub const PATHS_COUNT: usize = 8;
/// Directions processed by one sweep.
pub const PATHS_PER_RUN: usize = PATHS_COUNT / 2;

/// Which image sweep a direction belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunDirection {
    TopDown,
    BottomUp,
}

/// One of the eight unit walk directions.
///
/// Ordered so the four top-down directions come first and their bottom-up
/// complements last; the two run halves are contiguous and disjoint.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PathDirection {
    PosX,
    PosY,
    PosXPosY,
    NegXPosY,
    NegX,
    NegY,
    PosXNegY,
    NegXNegY,
}

impl PathDirection {
    pub const ALL: [PathDirection; PATHS_COUNT] = [
        PathDirection::PosX,
        PathDirection::PosY,
        PathDirection::PosXPosY,
        PathDirection::NegXPosY,
        PathDirection::NegX,
        PathDirection::NegY,
        PathDirection::PosXNegY,
        PathDirection::NegXNegY,
    ];

    /// Unit step `(dy, dx)` taken by `advance`.
    #[inline]
    pub fn step(self) -> Point2 {
        match self {
            PathDirection::PosX => Point2::new(0, 1),
            PathDirection::PosY => Point2::new(1, 0),
            PathDirection::PosXPosY => Point2::new(1, 1),
            PathDirection::NegXPosY => Point2::new(1, -1),
            PathDirection::NegX => Point2::new(0, -1),
            PathDirection::NegY => Point2::new(-1, 0),
            PathDirection::PosXNegY => Point2::new(-1, 1),
            PathDirection::NegXNegY => Point2::new(-1, -1),
        }
    }

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    #[inline]
    pub fn run(self) -> RunDirection {
        if self.index() < PATHS_PER_RUN {
            RunDirection::TopDown
        } else {
            RunDirection::BottomUp
        }
    }

    /// The four directions processed by the given sweep.
    ///
    /// The selection does not depend on which image is the base; the base
    /// flag lives with the aggregator.
    pub fn for_run(run: RunDirection) -> [PathDirection; PATHS_PER_RUN] {
        match run {
            RunDirection::TopDown => [
                PathDirection::PosX,
                PathDirection::PosY,
                PathDirection::PosXPosY,
                PathDirection::NegXPosY,
            ],
            RunDirection::BottomUp => [
                PathDirection::NegX,
                PathDirection::NegY,
                PathDirection::PosXNegY,
                PathDirection::NegXNegY,
            ],
        }
    }

    /// Whether a path of this direction legally originates at frame pixel
    /// `p` (the step vector points into the image from there).
    pub fn starts_at(self, p: Point2, rows: usize, cols: usize) -> bool {
        let s = self.step();
        (s.x > 0 && p.x == 0)
            || (s.x < 0 && p.x == cols as i32 - 1)
            || (s.y > 0 && p.y == 0)
            || (s.y < 0 && p.y == rows as i32 - 1)
    }

    /// The border pixel reached by stepping `-step` from `p` until a
    /// border is hit, i.e. the anchor of the path that passes through `p`.
    pub fn border_pixel(self, p: Point2, rows: usize, cols: usize) -> Point2 {
        let s = self.step();
        let limit_x = match s.x {
            1 => p.x,
            -1 => cols as i32 - 1 - p.x,
            _ => i32::MAX,
        };
        let limit_y = match s.y {
            1 => p.y,
            -1 => rows as i32 - 1 - p.y,
            _ => i32::MAX,
        };
        let d = limit_x.min(limit_y);
        Point2::new(p.y - d * s.y, p.x - d * s.x)
    }
}

/// Walk state of one aggregation path, anchored at a border pixel.
#[derive(Clone, Debug)]
pub struct SgmPath {
    pub direction: PathDirection,
    pub start: Point2,
    pub current: Point2,
    pub previous: Point2,
    pub current_index: i32,
    /// Number of pixels on the path, start included.
    pub length: i32,
    /// Per-disparity costs written at the previous step. Sized `cols + 1`
    /// so index `disp_range` stays writable for the bottom-up sentinel.
    pub last_step_costs: Vec<f64>,
}

impl SgmPath {
    pub fn new(direction: PathDirection, start: Point2, rows: usize, cols: usize) -> Self {
        Self {
            direction,
            start,
            current: start,
            previous: start,
            current_index: 0,
            length: Self::walk_length(direction, start, rows, cols),
            last_step_costs: vec![0.0; cols + 1],
        }
    }

    /// Pixels walkable from `start`, the minimum over active axes of the
    /// pixels remaining in that axis.
    fn walk_length(direction: PathDirection, start: Point2, rows: usize, cols: usize) -> i32 {
        let s = direction.step();
        let along_x = match s.x {
            1 => cols as i32 - start.x,
            -1 => start.x + 1,
            _ => i32::MAX,
        };
        let along_y = match s.y {
            1 => rows as i32 - start.y,
            -1 => start.y + 1,
            _ => i32::MAX,
        };
        along_x.min(along_y)
    }

    #[inline]
    pub fn has_next(&self) -> bool {
        self.current_index < self.length - 1
    }

    /// Step one pixel along the direction.
    #[inline]
    pub fn advance(&mut self) {
        self.previous = self.current;
        self.current += self.direction.step();
        self.current_index += 1;
    }
}
