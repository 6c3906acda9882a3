use std::path::PathBuf;

use posesynth_core::ClipRangeError;
use thiserror::Error;

/// Structural faults that abort a whole build or conversion.
///
/// Per-joint and per-sequence problems never surface here: they are
/// recovered as invalid keypoints or recorded as skipped units.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("subject '{subject}': {intrinsics} intrinsics entries but {extrinsics} extrinsics entries")]
    CameraCountMismatch {
        subject: String,
        intrinsics: usize,
        extrinsics: usize,
    },
    #[error("subject '{subject}', camera {index}: extrinsics id '{extrinsics}' does not match intrinsics id '{intrinsics}'")]
    CameraIdMismatch {
        subject: String,
        index: usize,
        intrinsics: String,
        extrinsics: String,
    },
    #[error("duplicate camera id '{0}'")]
    DuplicateCamera(String),
    #[error("invalid configuration: {0}")]
    InvalidClipRange(#[from] ClipRangeError),
    #[error("duplicate sequence id '{0}'")]
    DuplicateSequence(String),
    #[error("subject '{subject}': {count_3d} 3D sources but {count_2d} 2D sources")]
    SourceCountMismatch {
        subject: String,
        count_3d: usize,
        count_2d: usize,
    },
    #[error("source '{name}': {reason}")]
    MalformedSource { name: String, reason: String },
    #[error("refusing to overwrite existing output {}", .0.display())]
    OutputExists(PathBuf),
    #[error("{}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{}: {source}", .path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl PipelineError {
    pub(crate) fn io(path: impl Into<PathBuf>) -> impl FnOnce(std::io::Error) -> Self {
        let path = path.into();
        move |source| PipelineError::Io { path, source }
    }

    pub(crate) fn json(path: impl Into<PathBuf>) -> impl FnOnce(serde_json::Error) -> Self {
        let path = path.into();
        move |source| PipelineError::Json { path, source }
    }
}
