use std::fmt;
use std::ops::{Add, AddAssign, Neg, Sub, SubAssign};

use serde::{Deserialize, Serialize};

/// Integer pixel coordinate in `(row, col)` order.
///
/// `y` is the row index, `x` the column index. Coordinates are signed so
/// that border arithmetic (mirroring, backward path walks) stays in one
/// type.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Point2 {
    pub y: i32,
    pub x: i32,
}

impl Point2 {
    #[inline]
    pub const fn new(y: i32, x: i32) -> Self {
        Self { y, x }
    }
}

impl Add for Point2 {
    type Output = Point2;

    #[inline]
    fn add(self, rhs: Point2) -> Point2 {
        Point2::new(self.y + rhs.y, self.x + rhs.x)
    }
}

impl Sub for Point2 {
    type Output = Point2;

    #[inline]
    fn sub(self, rhs: Point2) -> Point2 {
        Point2::new(self.y - rhs.y, self.x - rhs.x)
    }
}

impl AddAssign for Point2 {
    #[inline]
    fn add_assign(&mut self, rhs: Point2) {
        self.y += rhs.y;
        self.x += rhs.x;
    }
}

impl SubAssign for Point2 {
    #[inline]
    fn sub_assign(&mut self, rhs: Point2) {
        self.y -= rhs.y;
        self.x -= rhs.x;
    }
}

impl Neg for Point2 {
    type Output = Point2;

    #[inline]
    fn neg(self) -> Point2 {
        Point2::new(-self.y, -self.x)
    }
}

impl fmt::Display for Point2 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.y, self.x)
    }
}
