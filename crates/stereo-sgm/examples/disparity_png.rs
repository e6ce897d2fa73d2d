//! Compute a disparity map from two rectified PNG/JPEG images and write it
//! out as a normalized grey PNG.
//!
//! ```sh
//! cargo run --release --example disparity_png -- left.png right.png out.png 64
//! ```

use std::env;
use std::process::ExitCode;

use stereo_sgm::{GreyImage, ImageInput, IntensityImage, SgmParameters, SgmStereoMatcher};

fn load_grey(path: &str) -> Result<GreyImage, String> {
    let img = image::open(path).map_err(|e| format!("{path}: {e}"))?.to_luma8();
    let (width, height) = (img.width() as usize, img.height() as usize);
    let data = img.pixels().map(|p| f64::from(p.0[0])).collect();
    GreyImage::from_vec(height, width, data).ok_or_else(|| format!("{path}: size mismatch"))
}

fn main() -> ExitCode {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    if args.len() < 4 {
        eprintln!("usage: {} <left> <right> <out.png> [max_disparity]", args[0]);
        return ExitCode::FAILURE;
    }
    let max_disparity: i32 = args.get(4).map_or(64, |s| s.parse().unwrap_or(64));

    let (left, right) = match (load_grey(&args[1]), load_grey(&args[2])) {
        (Ok(l), Ok(r)) => (l, r),
        (Err(e), _) | (_, Err(e)) => {
            eprintln!("{e}");
            return ExitCode::FAILURE;
        }
    };

    let (rows, cols) = (left.rows(), left.cols());
    let params = SgmParameters {
        rows,
        cols,
        max_disparity,
        census_mask_radius: 3,
        max_parallel_tasks: 4,
        ..Default::default()
    };

    let mut matcher = SgmStereoMatcher::new();
    if let Err(e) = matcher.process(
        &params,
        &ImageInput::Grey(left),
        &ImageInput::Grey(right),
    ) {
        eprintln!("matching failed: {e}");
        return ExitCode::FAILURE;
    }

    let map = matcher.map_left().expect("map available after process");
    let scale = 255.0 / f64::from(max_disparity.max(1));
    let pixels: Vec<u8> = map
        .iter()
        .map(|d| {
            if d.is_valid() {
                (f64::from(d.dx.abs()) * scale).min(255.0) as u8
            } else {
                0
            }
        })
        .collect();

    let out = image::GrayImage::from_raw(cols as u32, rows as u32, pixels)
        .expect("buffer sized rows*cols");
    if let Err(e) = out.save(&args[3]) {
        eprintln!("{}: {e}", args[3]);
        return ExitCode::FAILURE;
    }
    println!("wrote {} ({}x{})", args[3], cols, rows);
    ExitCode::SUCCESS
}
