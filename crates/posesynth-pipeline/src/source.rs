//! Pull-based access to animated bone positions.
//!
//! The animation host is an external collaborator. The core asks it for the
//! world-space bones of one frame as seen for one camera placement and
//! treats the answer as a pure function of `(frame, camera)`.

use posesynth_core::BoneFrame;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SourceError {
    #[error("frame {frame} out of range ({len} frames)")]
    FrameOutOfRange { frame: usize, len: usize },
    #[error("{0}")]
    Host(String),
}

/// One animation sequence exposed by the host.
pub trait MotionSource {
    /// Sequence (subject/scene) identifier; keys the dataset.
    fn sequence_id(&self) -> &str;

    fn frame_count(&self) -> usize;

    /// World-space bones at `frame` for camera placement `camera`.
    fn bone_frame(&self, frame: usize, camera: usize) -> Result<BoneFrame, SourceError>;
}

/// A sequence captured ahead of time: the same bones for every camera.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecordedSequence {
    #[serde(default)]
    pub id: String,
    pub frames: Vec<BoneFrame>,
}

impl RecordedSequence {
    pub fn new(id: impl Into<String>, frames: Vec<BoneFrame>) -> Self {
        Self {
            id: id.into(),
            frames,
        }
    }
}

impl MotionSource for RecordedSequence {
    fn sequence_id(&self) -> &str {
        &self.id
    }

    fn frame_count(&self) -> usize {
        self.frames.len()
    }

    fn bone_frame(&self, frame: usize, _camera: usize) -> Result<BoneFrame, SourceError> {
        self.frames
            .get(frame)
            .cloned()
            .ok_or(SourceError::FrameOutOfRange {
                frame,
                len: self.frames.len(),
            })
    }
}

/// Pick `amount` of `len` sequence indices with a seeded RNG.
///
/// Indices come back in ascending order. `amount >= len` selects all.
pub fn subsample_indices(len: usize, amount: usize, seed: u64) -> Vec<usize> {
    if amount >= len {
        return (0..len).collect();
    }
    let mut rng = StdRng::seed_from_u64(seed);
    let mut picked = rand::seq::index::sample(&mut rng, len, amount).into_vec();
    picked.sort_unstable();
    picked
}
