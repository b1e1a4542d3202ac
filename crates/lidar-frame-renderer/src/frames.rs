use std::{
    fs,
    path::{Path, PathBuf},
};

use log::{error, info, warn};

use crate::{
    error::VizError,
    loader::{POINT_CLOUD_EXTENSIONS, read_labels, read_point_cloud},
    render::FrameRenderer,
};

/// One point cloud file paired with its label file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameFiles {
    /// The file stem shared by the point cloud, labels and image of the frame.
    pub id: String,
    pub points_path: PathBuf,
    pub labels_path: PathBuf,
}

impl FrameFiles {
    /// The image written for this frame inside `output_dir`.
    pub fn output_path(&self, output_dir: impl AsRef<Path>) -> PathBuf {
        output_dir.as_ref().join(format!("{}.png", self.id))
    }
}

/// Lists the point cloud files of `points_dir` sorted by name and pairs each with
/// `labels_dir/<stem>.txt`.
///
/// When `start_frame` is given (as a file name or a stem), the frames sorted before it are
/// left out.
pub fn discover_frames(
    points_dir: impl AsRef<Path>,
    labels_dir: impl AsRef<Path>,
    start_frame: Option<&str>,
) -> Result<Vec<FrameFiles>, VizError> {
    let labels_dir = labels_dir.as_ref();

    let mut points_paths = fs::read_dir(points_dir)?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<Result<Vec<_>, _>>()?;
    points_paths.retain(|path| {
        path.is_file()
            && path
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| POINT_CLOUD_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
    });
    points_paths.sort_by(|a, b| a.file_name().cmp(&b.file_name()));

    let mut frames = points_paths
        .into_iter()
        .filter_map(|points_path| {
            let id = points_path.file_stem()?.to_string_lossy().into_owned();
            let labels_path = labels_dir.join(format!("{id}.txt"));
            Some(FrameFiles {
                id,
                points_path,
                labels_path,
            })
        })
        .collect::<Vec<_>>();

    if let Some(start) = start_frame {
        let start_id = Path::new(start)
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| start.to_string());
        match frames.iter().position(|frame| frame.id == start_id) {
            Some(index) => {
                frames.drain(..index);
            }
            None => {
                warn!("Start frame {start} not found, no frame will be rendered");
                frames.clear();
            }
        }
    }

    Ok(frames)
}

/// How a frame ended up.
#[derive(Debug)]
pub enum FrameOutcome {
    Rendered(PathBuf),
    Skipped(VizError),
    Failed(VizError),
}

/// Options of a rendering run.
#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    /// Stop at the first failed frame instead of moving on to the next one.
    pub fail_fast: bool,
}

/// Counts of a rendering run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub rendered: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// Loads, renders and saves a single frame.
pub fn render_frame(
    frame: &FrameFiles,
    renderer: &FrameRenderer,
    output_dir: impl AsRef<Path>,
) -> Result<PathBuf, VizError> {
    let labels = read_labels(&frame.labels_path)?;
    let cloud = read_point_cloud(&frame.points_path)?;
    let output_path = frame.output_path(output_dir);
    renderer.render_to_file(&cloud, &labels, &output_path)?;
    Ok(output_path)
}

/// Renders every frame in order, one at a time.
///
/// Frames without a label file are skipped. Frames that fail to load or render are
/// reported and counted, previously written images are never touched. `on_frame` is
/// called after each frame.
pub fn render_sequence(
    frames: &[FrameFiles],
    renderer: &FrameRenderer,
    output_dir: impl AsRef<Path>,
    options: RunOptions,
    mut on_frame: impl FnMut(&FrameFiles, &FrameOutcome),
) -> Result<RunSummary, VizError> {
    let output_dir = output_dir.as_ref();
    fs::create_dir_all(output_dir)?;

    let mut summary = RunSummary::default();
    for frame in frames {
        let outcome = match render_frame(frame, renderer, output_dir) {
            Ok(path) => {
                info!("Saved image: {}", path.display());
                summary.rendered += 1;
                FrameOutcome::Rendered(path)
            }
            Err(err @ VizError::MissingCollaboratorFile(_)) => {
                warn!("Skipping frame {}: {err}", frame.id);
                summary.skipped += 1;
                FrameOutcome::Skipped(err)
            }
            Err(err) => {
                error!("Failed to render frame {}: {err}", frame.id);
                summary.failed += 1;
                FrameOutcome::Failed(err)
            }
        };
        on_frame(frame, &outcome);

        if let FrameOutcome::Failed(err) = outcome {
            if options.fail_fast {
                return Err(err);
            }
        }
    }

    Ok(summary)
}
