//! Run configuration.
//!
//! A [`PipelineConfig`] is built once per run (usually from JSON) and passed
//! by shared reference into every build step.

use posesynth_core::{ClipRange, LengthUnit, RigProfile};
use serde::{Deserialize, Serialize};

/// What the aggregator does with a frame that has invalid keypoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FrameKeepPolicy {
    /// Keep only frames whose 17 slots are all valid in both 3D and 2D.
    #[default]
    DropFrame,
    /// Keep every assembled frame; invalid slots stay empty.
    KeepInvalid,
}

fn default_fps() -> u32 {
    60
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Bone mapping table and head/tail conventions of the source rig.
    #[serde(default)]
    pub rig: RigProfile,
    #[serde(default)]
    pub frame_policy: FrameKeepPolicy,
    /// Unit of extrinsics translations in camera tables.
    #[serde(default)]
    pub translation_unit: LengthUnit,
    /// Frame rate of the motion sequences, recorded in dataset metadata.
    #[serde(default = "default_fps")]
    pub fps: u32,
    /// Clip planes of the projection matrix built from each camera record.
    #[serde(default)]
    pub clip: ClipRange,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            rig: RigProfile::default(),
            frame_policy: FrameKeepPolicy::default(),
            translation_unit: LengthUnit::default(),
            fps: default_fps(),
            clip: ClipRange::default(),
        }
    }
}
