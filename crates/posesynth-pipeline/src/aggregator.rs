//! Dataset aggregator: drives the sampler over every (sequence, camera)
//! unit and folds the results into a [`Dataset`].
//!
//! A unit only reads the shared configuration, one camera record, and one
//! motion source, and writes its own frame list, so units are independent.
//! Results are merged in sequence-id then camera order.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use log::{debug, info, warn};
use posesynth_core::{CameraRecord, KeypointFrame, RemapError};
use serde::{Deserialize, Serialize};

use crate::cameras::CameraSet;
use crate::config::PipelineConfig;
use crate::error::PipelineError;
use crate::sampler::{assemble_frame, keep_frame};
use crate::source::{MotionSource, SourceError};

/// Sequence id → camera id → kept frames.
pub type SequenceFrames = BTreeMap<String, BTreeMap<String, Vec<KeypointFrame>>>;

/// Assembled keypoints plus the cameras that produced them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    pub sequences: SequenceFrames,
    pub cameras: CameraSet,
}

impl Dataset {
    pub fn frames(&self, sequence: &str, camera: &str) -> Option<&[KeypointFrame]> {
        self.sequences
            .get(sequence)
            .and_then(|cams| cams.get(camera))
            .map(Vec::as_slice)
    }

    pub fn sequence_ids(&self) -> impl Iterator<Item = &str> {
        self.sequences.keys().map(String::as_str)
    }

    pub fn total_frames(&self) -> usize {
        self.sequences
            .values()
            .flat_map(BTreeMap::values)
            .map(Vec::len)
            .sum()
    }
}

/// Why a unit contributed nothing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// A bone did not resolve through the mapping table.
    UnmappedJoint(String),
    /// Every frame was dropped, or the sequence has no frames.
    EmptySequence { dropped: usize },
    /// The motion source failed to deliver a frame.
    Source(String),
    /// No camera is configured for the sequence.
    NoCameras,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::UnmappedJoint(msg) => write!(f, "{msg}"),
            SkipReason::EmptySequence { dropped } => {
                write!(f, "no valid frames ({dropped} dropped)")
            }
            SkipReason::Source(msg) => write!(f, "motion source: {msg}"),
            SkipReason::NoCameras => write!(f, "no cameras"),
        }
    }
}

impl From<RemapError> for SkipReason {
    fn from(err: RemapError) -> Self {
        SkipReason::UnmappedJoint(err.to_string())
    }
}

impl From<SourceError> for SkipReason {
    fn from(err: SourceError) -> Self {
        SkipReason::Source(err.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedUnit {
    pub sequence: String,
    /// `None` when the whole sequence was skipped before any camera.
    pub camera: Option<String>,
    pub reason: SkipReason,
}

/// Counters and skip diagnostics of one build.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildReport {
    pub units_total: usize,
    pub units_built: usize,
    pub frames_kept: usize,
    pub frames_dropped: usize,
    pub skipped: Vec<SkippedUnit>,
}

/// Frames produced by one (sequence, camera) unit.
#[derive(Debug, Clone, PartialEq)]
pub struct UnitFrames {
    pub frames: Vec<KeypointFrame>,
    pub dropped: usize,
}

/// Run the sampler over every frame of `source` for one camera.
///
/// This is the unit of work of a build.
pub fn build_unit<S: MotionSource + ?Sized>(
    source: &S,
    camera_index: usize,
    camera: &CameraRecord,
    config: &PipelineConfig,
) -> Result<UnitFrames, SkipReason> {
    let projector = camera.projector(config.clip);
    let mut frames = Vec::with_capacity(source.frame_count());
    let mut dropped = 0;
    for frame_index in 0..source.frame_count() {
        let bones = source.bone_frame(frame_index, camera_index)?;
        let frame = assemble_frame(&projector, &bones, &config.rig, frame_index)?;
        if keep_frame(&frame, config.frame_policy) {
            frames.push(frame);
        } else {
            dropped += 1;
        }
    }
    if frames.is_empty() {
        return Err(SkipReason::EmptySequence { dropped });
    }
    Ok(UnitFrames { frames, dropped })
}

/// Build the dataset for every sequence and every camera that applies to
/// it.
///
/// Sequence-local failures are logged and reported as skipped units. Two
/// sequences with the same id are fatal, as is an unusable clip range.
pub fn build<S: MotionSource>(
    sequences: &[S],
    cameras: &CameraSet,
    config: &PipelineConfig,
) -> Result<(Dataset, BuildReport), PipelineError> {
    config.clip.validate()?;

    let mut ids = BTreeSet::new();
    for seq in sequences {
        if !ids.insert(seq.sequence_id()) {
            return Err(PipelineError::DuplicateSequence(seq.sequence_id().to_owned()));
        }
    }

    info!(
        "building dataset: {} sequences, rig '{}', policy {:?}",
        sequences.len(),
        config.rig.name,
        config.frame_policy
    );

    let shared_slots = config.rig.mapping.duplicate_targets();
    if !shared_slots.is_empty() {
        warn!(
            "rig '{}': several bones map to {:?}; the last bone in each frame wins",
            config.rig.name, shared_slots
        );
    }

    let mut dataset = Dataset {
        sequences: BTreeMap::new(),
        cameras: cameras.clone(),
    };
    let mut report = BuildReport::default();

    for seq in sequences {
        let id = seq.sequence_id();
        if cameras.for_sequence(id).is_empty() {
            warn!("sequence '{id}': no cameras, skipped");
            report.skipped.push(SkippedUnit {
                sequence: id.to_owned(),
                camera: None,
                reason: SkipReason::NoCameras,
            });
            continue;
        }

        for (camera_index, camera) in cameras.placements(id) {
            report.units_total += 1;
            match build_unit(seq, camera_index, camera, config) {
                Ok(unit) => {
                    debug!(
                        "sequence '{}' camera '{}': {} frames kept, {} dropped",
                        id,
                        camera.id(),
                        unit.frames.len(),
                        unit.dropped
                    );
                    report.units_built += 1;
                    report.frames_kept += unit.frames.len();
                    report.frames_dropped += unit.dropped;
                    dataset
                        .sequences
                        .entry(id.to_owned())
                        .or_default()
                        .insert(camera.id().to_owned(), unit.frames);
                }
                Err(reason) => {
                    if let SkipReason::EmptySequence { dropped } = &reason {
                        report.frames_dropped += *dropped;
                    }
                    warn!("sequence '{}' camera '{}' skipped: {}", id, camera.id(), reason);
                    report.skipped.push(SkippedUnit {
                        sequence: id.to_owned(),
                        camera: Some(camera.id().to_owned()),
                        reason,
                    });
                }
            }
        }
    }

    info!(
        "built {}/{} units: {} frames kept, {} dropped, {} skipped",
        report.units_built,
        report.units_total,
        report.frames_kept,
        report.frames_dropped,
        report.skipped.len()
    );
    Ok((dataset, report))
}
