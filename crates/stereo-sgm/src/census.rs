//! Census transform and Hamming matching cost.

use stereo_sgm_core::{Array2d, BitWord, IntensityImage, Point2};

use crate::status::{CancelFlag, SgmPhase, StatusSlot};

/// Reflect an out-of-range coordinate back into `[0, limit)` by edge
/// mirroring (no wrap): `p' = 2*limit - p - 2` past the far edge,
/// `p' = -p` past the near edge.
#[inline]
fn reflect(p: i32, limit: usize) -> usize {
    let last = limit as i32 - 1;
    let p = if p > last { 2 * last - p } else { p };
    let p = if p < 0 { -p } else { p };
    p as usize
}

/// Census signatures of a base/matched image pair plus their Hamming cost.
///
/// `W` is the signature word count; callers pick it so `W * 32` covers the
/// `(2r+1)^2` mask bits. Both images are transformed in one pass: bit `k`
/// of a signature is set iff the `k`-th mask neighbour (row-major `(dy,
/// dx)` enumeration) is darker than the centre pixel, so corresponding
/// bits of the two matrices describe the same offset and the Hamming
/// distance is a well-defined matching cost.
#[derive(Debug)]
pub struct CensusTransform<const W: usize> {
    rows: usize,
    cols: usize,
    mask_radius: usize,
    mask_length: usize,
    base: Array2d<BitWord<W>>,
    matched: Array2d<BitWord<W>>,
}

impl<const W: usize> CensusTransform<W> {
    pub fn new(rows: usize, cols: usize, mask_radius: usize) -> Self {
        debug_assert!((1..=7).contains(&mask_radius));
        let side = 2 * mask_radius + 1;
        let mask_length = side * side;
        debug_assert!(mask_length <= W * stereo_sgm_core::WORD_BITS);
        Self {
            rows,
            cols,
            mask_radius,
            mask_length,
            base: Array2d::new(rows, cols),
            matched: Array2d::new(rows, cols),
        }
    }

    /// Signature bit count, `(2r+1)^2`.
    #[inline]
    pub fn mask_length(&self) -> usize {
        self.mask_length
    }

    /// Largest possible matching cost, published for penalty scaling.
    ///
    /// The centre bit never differs, hence `mask_length - 1`.
    #[inline]
    pub fn max_cost(&self) -> f64 {
        (self.mask_length - 1) as f64
    }

    #[inline]
    pub fn mask_radius(&self) -> usize {
        self.mask_radius
    }

    pub fn base_signatures(&self) -> &Array2d<BitWord<W>> {
        &self.base
    }

    pub fn matched_signatures(&self) -> &Array2d<BitWord<W>> {
        &self.matched
    }

    /// Hamming distance between the base signature at `p` and the matched
    /// signature at `q`.
    #[inline]
    pub fn cost(&self, p: Point2, q: Point2) -> f64 {
        f64::from(self.base[p].hamming_distance(&self.matched[q]))
    }

    /// Transform both images. The cancellation flag is polled between
    /// pixels; on set, the matrices are left partially filled.
    pub fn compute<I: IntensityImage>(
        &mut self,
        base: &I,
        matched: &I,
        cancel: &CancelFlag,
        status: &StatusSlot,
    ) {
        status.set_phase(SgmPhase::Census);
        let r = self.mask_radius as i32;
        let rows = self.rows as i32;
        let cols = self.cols as i32;

        // Interior rectangle: direct neighbours, no reflection.
        for y in r..rows - r {
            status.set_pixel(Point2::new(y, r));
            for x in r..cols - r {
                if cancel.is_set() {
                    return;
                }
                self.transform_pixel(base, matched, y, x, false);
            }
        }

        // Border strips, mirrored neighbours: top, bottom, then the side
        // columns of the interior rows.
        for y in (0..r.min(rows)).chain((rows - r).max(r)..rows) {
            status.set_pixel(Point2::new(y, 0));
            for x in 0..cols {
                if cancel.is_set() {
                    return;
                }
                self.transform_pixel(base, matched, y, x, true);
            }
        }
        for y in r..rows - r {
            status.set_pixel(Point2::new(y, 0));
            for x in (0..r.min(cols)).chain((cols - r).max(r)..cols) {
                if cancel.is_set() {
                    return;
                }
                self.transform_pixel(base, matched, y, x, true);
            }
        }
    }

    fn transform_pixel<I: IntensityImage>(
        &mut self,
        base: &I,
        matched: &I,
        y: i32,
        x: i32,
        mirror: bool,
    ) {
        let r = self.mask_radius as i32;
        let centre_base = base.value(y as usize, x as usize);
        let centre_matched = matched.value(y as usize, x as usize);
        let mut sig_base = BitWord::<W>::zeroed();
        let mut sig_matched = BitWord::<W>::zeroed();

        let mut bit = 0usize;
        for dy in -r..=r {
            for dx in -r..=r {
                let (py, px) = if mirror {
                    (reflect(y + dy, self.rows), reflect(x + dx, self.cols))
                } else {
                    ((y + dy) as usize, (x + dx) as usize)
                };
                if base.value(py, px) < centre_base {
                    sig_base.set_bit(bit);
                }
                if matched.value(py, px) < centre_matched {
                    sig_matched.set_bit(bit);
                }
                bit += 1;
            }
        }

        let p = Point2::new(y, x);
        self.base[p] = sig_base;
        self.matched[p] = sig_matched;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use stereo_sgm_core::GreyImage;

    fn random_image(rng: &mut StdRng, rows: usize, cols: usize) -> GreyImage {
        let data: Vec<f64> = (0..rows * cols).map(|_| rng.gen_range(0.0..255.0)).collect();
        GreyImage::from_vec(rows, cols, data).unwrap()
    }

    fn computed(rows: usize, cols: usize, r: usize, a: &GreyImage, b: &GreyImage) -> CensusTransform<2> {
        let mut census = CensusTransform::<2>::new(rows, cols, r);
        census.compute(a, b, &CancelFlag::new(), &StatusSlot::new());
        census
    }

    #[test]
    fn reflect_mirrors_both_edges() {
        assert_eq!(reflect(-1, 10), 1);
        assert_eq!(reflect(-3, 10), 3);
        assert_eq!(reflect(0, 10), 0);
        assert_eq!(reflect(9, 10), 9);
        assert_eq!(reflect(10, 10), 8);
        assert_eq!(reflect(12, 10), 6);
    }

    #[test]
    fn max_cost_is_mask_length_minus_one() {
        for r in 1..=3usize {
            let census = CensusTransform::<2>::new(10, 10, r);
            let side = 2 * r + 1;
            assert_eq!(census.mask_length(), side * side);
            assert_eq!(census.max_cost(), (side * side - 1) as f64);
        }
    }

    #[test]
    fn centre_bit_is_always_zero() {
        let mut rng = StdRng::seed_from_u64(7);
        let img = random_image(&mut rng, 9, 9);
        let census = computed(9, 9, 2, &img, &img);
        let centre = 2 * 5 + 2; // row-major index of (dy, dx) = (0, 0), r = 2
        for sig in census.base_signatures().iter() {
            assert!(!sig.bit(centre));
        }
    }

    #[test]
    fn identical_images_have_zero_self_cost() {
        let mut rng = StdRng::seed_from_u64(21);
        let img = random_image(&mut rng, 12, 10);
        let census = computed(12, 10, 1, &img, &img);
        for y in 0..12 {
            for x in 0..10 {
                assert_eq!(census.cost(Point2::new(y, x), Point2::new(y, x)), 0.0);
            }
        }
    }

    #[test]
    fn hamming_matches_pairwise_comparison_counts() {
        let mut rng = StdRng::seed_from_u64(42);
        let rows = 11;
        let cols = 13;
        let a = random_image(&mut rng, rows, cols);
        let b = random_image(&mut rng, rows, cols);
        let r = 2i32;
        let census = computed(rows, cols, r as usize, &a, &b);

        for (py, px, qy, qx) in [(5, 6, 5, 3), (0, 0, 10, 12), (2, 11, 7, 1), (9, 4, 1, 8)] {
            let mut expected = 0u32;
            for dy in -r..=r {
                for dx in -r..=r {
                    let bp = a.value(reflect(py + dy, rows), reflect(px + dx, cols))
                        < a.value(py as usize, px as usize);
                    let bq = b.value(reflect(qy + dy, rows), reflect(qx + dx, cols))
                        < b.value(qy as usize, qx as usize);
                    if bp != bq {
                        expected += 1;
                    }
                }
            }
            let got = census.cost(Point2::new(py, px), Point2::new(qy, qx));
            assert_eq!(got, f64::from(expected), "pair ({py},{px}) -> ({qy},{qx})");
        }
    }

    #[test]
    fn shifted_copy_matches_at_true_offset() {
        let mut rng = StdRng::seed_from_u64(3);
        let rows = 10;
        let cols = 14;
        let shift = 2usize;
        let wide = random_image(&mut rng, rows, cols + shift);

        let mut left = GreyImage::new(rows, cols);
        let mut right = GreyImage::new(rows, cols);
        for y in 0..rows {
            for x in 0..cols {
                left.set(y, x, wide.value(y, x));
                right.set(y, x, wide.value(y, x + shift));
            }
        }

        let census = computed(rows, cols, 1, &left, &right);
        // Interior windows of both images see identical neighbourhoods at
        // the true disparity.
        for y in 1..rows - 1 {
            for x in 1 + shift..cols - 1 {
                let p = Point2::new(y as i32, x as i32);
                let q = Point2::new(y as i32, (x - shift) as i32);
                assert_eq!(census.cost(p, q), 0.0, "at {p}");
            }
        }
    }

    #[test]
    fn cancellation_stops_mid_transform() {
        let mut rng = StdRng::seed_from_u64(11);
        let img = random_image(&mut rng, 8, 8);
        let mut census = CensusTransform::<2>::new(8, 8, 1);
        let cancel = CancelFlag::new();
        cancel.set();
        census.compute(&img, &img, &cancel, &StatusSlot::new());
        // Nothing was written: all signatures stay zeroed.
        let zero = BitWord::<2>::zeroed();
        assert!(census.base_signatures().iter().all(|sig| *sig == zero));
    }
}
