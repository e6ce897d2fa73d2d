use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use stereo_sgm::{GreyImage, ImageInput, SgmParameters, SgmStereoMatcher};

fn shifted_pair(rows: usize, cols: usize, shift: usize) -> (ImageInput, ImageInput) {
    let mut rng = StdRng::seed_from_u64(9);
    let wide: Vec<f64> = (0..rows * (cols + shift))
        .map(|_| rng.gen_range(0.0..255.0))
        .collect();

    let mut left = GreyImage::new(rows, cols);
    let mut right = GreyImage::new(rows, cols);
    for y in 0..rows {
        for x in 0..cols {
            left.set(y, x, wide[y * (cols + shift) + x]);
            right.set(y, x, wide[y * (cols + shift) + x + shift]);
        }
    }
    (ImageInput::Grey(left), ImageInput::Grey(right))
}

fn bench_pipeline(c: &mut Criterion) {
    let (rows, cols) = (48usize, 48usize);
    let (left, right) = shifted_pair(rows, cols, 3);

    let mut group = c.benchmark_group("sgm_pipeline_48x48");
    for radius in [1usize, 3, 5] {
        let params = SgmParameters {
            rows,
            cols,
            max_disparity: 8,
            census_mask_radius: radius,
            max_parallel_tasks: 2,
            ..Default::default()
        };
        group.bench_with_input(BenchmarkId::from_parameter(radius), &params, |b, params| {
            b.iter(|| {
                let mut matcher = SgmStereoMatcher::new();
                matcher.process(params, &left, &right).unwrap();
                matcher.map_left().unwrap().len()
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_pipeline);
criterion_main!(benches);
