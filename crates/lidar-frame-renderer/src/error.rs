use std::path::PathBuf;

/// Errors raised while loading, transforming or rendering a frame.
#[derive(thiserror::Error, Debug)]
pub enum VizError {
    /// The label file paired with a point cloud does not exist.
    #[error("Label file not found: {0}")]
    MissingCollaboratorFile(PathBuf),

    /// A label line could not be turned into a label.
    #[error("Malformed label line {line}: {reason}")]
    MalformedLabelLine { line: usize, reason: String },

    /// The frame has no valid label, so there is no ego vehicle to center on.
    #[error("Frame has no valid labels, cannot select the ego vehicle")]
    EmptyLabelSet,

    /// The off-screen raster or its camera could not be set up.
    #[error("Render backend failure. {0}")]
    RenderBackend(String),

    /// The point cloud file is not in a supported layout.
    #[error("Invalid point cloud. {0}")]
    InvalidPointCloud(String),

    /// The rendered image sequence cannot be handed to a video encoder.
    #[error("Invalid image sequence. {0}")]
    InvalidSequence(String),

    #[error("Failed to manipulate the file. {0}")]
    FileError(#[from] std::io::Error),

    #[error("Failed to encode or decode the image. {0}")]
    ImageError(#[from] image::ImageError),

    #[error("Failed to read the E57 file. {0}")]
    E57Error(#[from] e57::Error),
}
