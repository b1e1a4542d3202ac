use std::{path::PathBuf, process::ExitCode};

use argh::FromArgs;
use lidar_frame_renderer::{
    VizError,
    camera::CameraConfig,
    frames::{RunOptions, RunSummary, discover_frames, render_sequence},
    palette::Palette,
    render::{FrameRenderer, RenderConfig},
};
use lidar_viz::{frame_progress_bar, init_logging, parse_resolution, parse_vector};
use log::{error, info};

#[derive(FromArgs)]
/// Renders labelled LiDAR frames into PNG images, one image per frame.
struct Args {
    /// directory holding the point cloud files (.npy or .e57)
    #[argh(option)]
    points_dir: PathBuf,

    /// directory holding the label files (.txt)
    #[argh(option)]
    labels_dir: PathBuf,

    /// directory the images are written to, created if missing
    #[argh(option)]
    output_dir: PathBuf,

    /// first frame to render, as a file name or a stem
    #[argh(option)]
    start_frame: Option<String>,

    /// logical resolution of the images, e.g. 800x600
    #[argh(option, default = "(800, 600)", from_str_fn(parse_resolution))]
    resolution: (u32, u32),

    /// supersampling factor
    #[argh(option, default = "2")]
    supersample: u32,

    /// filter the images back to the logical resolution
    #[argh(switch)]
    downsample: bool,

    /// camera offset from the point cloud centroid, as x,y,z
    #[argh(option, default = "[0.0, -200.0, 200.0]", from_str_fn(parse_vector))]
    camera_offset: [f64; 3],

    /// vertical field of view in degrees
    #[argh(option, default = "30.0")]
    fov: f64,

    /// size of the points in pixels
    #[argh(option, default = "1")]
    point_size: u32,

    /// stop at the first frame that fails to render
    #[argh(switch)]
    fail_fast: bool,
}

fn main() -> ExitCode {
    init_logging();
    let args: Args = argh::from_env();

    match run(args) {
        Ok(summary) if summary.failed == 0 => ExitCode::SUCCESS,
        Ok(_) => ExitCode::FAILURE,
        Err(err) => {
            error!("{err}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> Result<RunSummary, VizError> {
    let (width, height) = args.resolution;
    let config = RenderConfig::default()
        .with_resolution(width, height)
        .with_supersample(args.supersample, args.downsample)
        .with_camera_offset(args.camera_offset)
        .with_camera(CameraConfig::default().with_fov(args.fov))
        .with_point_size(args.point_size);
    let output_size = config.output_size()?;
    let renderer = FrameRenderer::new(Palette::default(), config);

    let frames = discover_frames(
        &args.points_dir,
        &args.labels_dir,
        args.start_frame.as_deref(),
    )?;
    info!(
        "Rendering {} frames from {} at {}x{}",
        frames.len(),
        args.points_dir.display(),
        output_size.0,
        output_size.1
    );

    let bar = frame_progress_bar(frames.len());
    let summary = render_sequence(
        &frames,
        &renderer,
        &args.output_dir,
        RunOptions {
            fail_fast: args.fail_fast,
        },
        |frame, _| {
            bar.set_message(frame.id.clone());
            bar.inc(1);
        },
    );
    bar.finish_and_clear();
    let summary = summary?;

    info!(
        "Rendered {} frames into {} ({} skipped, {} failed)",
        summary.rendered,
        args.output_dir.display(),
        summary.skipped,
        summary.failed
    );
    Ok(summary)
}
