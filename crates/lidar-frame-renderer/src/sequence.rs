use std::{
    fs,
    ops::RangeInclusive,
    path::{Path, PathBuf},
    time::Duration,
};

use log::debug;

use crate::error::VizError;

/// The frame rate used when encoding a sequence unless told otherwise.
pub const DEFAULT_FPS: f64 = 10.0;

/// An ordered sequence of rendered frames, ready to be encoded into a video.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageSequence {
    /// The images sorted by file name.
    pub frames: Vec<PathBuf>,
    /// The dimensions shared by every image.
    pub dimensions: (u32, u32),
}

impl ImageSequence {
    /// Collects the PNG images of `dir`, sorted by file name.
    ///
    /// With a `range`, only the images whose numeric file stem falls in it are kept.
    /// Every image must have the same dimensions.
    pub fn collect(
        dir: impl AsRef<Path>,
        range: Option<RangeInclusive<u64>>,
    ) -> Result<Self, VizError> {
        let dir = dir.as_ref();
        let mut frames = fs::read_dir(dir)?
            .map(|entry| entry.map(|e| e.path()))
            .collect::<Result<Vec<_>, _>>()?;

        frames.retain(|path| {
            let is_png = path
                .extension()
                .is_some_and(|e| e.eq_ignore_ascii_case("png"));
            let in_range = match &range {
                Some(range) => path
                    .file_stem()
                    .and_then(|s| s.to_str())
                    .and_then(|s| s.parse::<u64>().ok())
                    .is_some_and(|n| range.contains(&n)),
                None => true,
            };
            is_png && in_range && path.is_file()
        });
        frames.sort_by(|a, b| a.file_name().cmp(&b.file_name()));

        let Some(first) = frames.first() else {
            return Err(VizError::InvalidSequence(format!(
                "no images found in {}",
                dir.display()
            )));
        };

        let dimensions = image::image_dimensions(first)?;
        for frame in &frames[1..] {
            let frame_dimensions = image::image_dimensions(frame)?;
            if frame_dimensions != dimensions {
                return Err(VizError::InvalidSequence(format!(
                    "{} is {}x{}, expected {}x{}",
                    frame.display(),
                    frame_dimensions.0,
                    frame_dimensions.1,
                    dimensions.0,
                    dimensions.1
                )));
            }
        }
        debug!("Collected {} images of {:?}", frames.len(), dimensions);

        Ok(Self { frames, dimensions })
    }

    /// The number of frames.
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    /// Checks if the sequence is empty.
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// The playback duration of the sequence at the given frame rate.
    pub fn duration(&self, fps: f64) -> Duration {
        Duration::from_secs_f64(self.frames.len() as f64 / fps)
    }
}
