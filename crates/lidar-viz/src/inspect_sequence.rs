use std::{path::PathBuf, process::ExitCode};

use argh::FromArgs;
use lidar_frame_renderer::sequence::{DEFAULT_FPS, ImageSequence};
use lidar_viz::init_logging;
use log::{error, info};

#[derive(FromArgs)]
/// Checks that rendered frames form a sequence a video encoder can consume.
struct Args {
    /// directory holding the rendered images
    #[argh(positional)]
    image_dir: PathBuf,

    /// first frame number to include
    #[argh(option)]
    start: Option<u64>,

    /// last frame number to include
    #[argh(option)]
    end: Option<u64>,

    /// frame rate of the video
    #[argh(option, default = "DEFAULT_FPS")]
    fps: f64,

    /// print the ordered image paths, one per line
    #[argh(switch)]
    list: bool,
}

fn main() -> ExitCode {
    init_logging();
    let args: Args = argh::from_env();

    if !(args.fps.is_finite() && args.fps > 0.0) {
        error!("Frame rate must be positive, got {}", args.fps);
        return ExitCode::FAILURE;
    }

    let range = match (args.start, args.end) {
        (None, None) => None,
        (start, end) => Some(start.unwrap_or(0)..=end.unwrap_or(u64::MAX)),
    };

    let sequence = match ImageSequence::collect(&args.image_dir, range) {
        Ok(sequence) => sequence,
        Err(err) => {
            error!("{err}");
            return ExitCode::FAILURE;
        }
    };

    info!(
        "{} frames of {}x{}, {:.1}s at {} fps",
        sequence.len(),
        sequence.dimensions.0,
        sequence.dimensions.1,
        sequence.duration(args.fps).as_secs_f64(),
        args.fps
    );
    if args.list {
        sequence
            .frames
            .iter()
            .for_each(|frame| println!("{}", frame.display()));
    }

    ExitCode::SUCCESS
}
