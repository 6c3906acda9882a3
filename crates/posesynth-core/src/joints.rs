//! Canonical joint index and rig bone-name remapping.
//!
//! Every rig convention maps its native bone names onto the same fixed
//! 17-slot canonical order. The order is part of the dataset contract.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Number of canonical joints.
pub const NUM_JOINTS: usize = 17;

/// Semantic joints in canonical slot order (H3.6M-style).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum CanonicalJoint {
    Hip,
    RHip,
    RKnee,
    RFoot,
    LHip,
    LKnee,
    LFoot,
    Spine,
    Thorax,
    Neck,
    Head,
    LShoulder,
    LElbow,
    LWrist,
    RShoulder,
    RElbow,
    RWrist,
}

impl CanonicalJoint {
    /// All joints, indexed by slot.
    pub const ALL: [CanonicalJoint; NUM_JOINTS] = [
        CanonicalJoint::Hip,
        CanonicalJoint::RHip,
        CanonicalJoint::RKnee,
        CanonicalJoint::RFoot,
        CanonicalJoint::LHip,
        CanonicalJoint::LKnee,
        CanonicalJoint::LFoot,
        CanonicalJoint::Spine,
        CanonicalJoint::Thorax,
        CanonicalJoint::Neck,
        CanonicalJoint::Head,
        CanonicalJoint::LShoulder,
        CanonicalJoint::LElbow,
        CanonicalJoint::LWrist,
        CanonicalJoint::RShoulder,
        CanonicalJoint::RElbow,
        CanonicalJoint::RWrist,
    ];

    /// Fixed slot of this joint in every keypoint vector.
    #[inline]
    pub fn slot(self) -> usize {
        self as usize
    }

    /// Joint stored at `slot`, or `None` past the last slot.
    pub fn from_slot(slot: usize) -> Option<Self> {
        Self::ALL.get(slot).copied()
    }

    /// Name used in mapping tables and by [`FromStr`].
    pub fn name(self) -> &'static str {
        match self {
            CanonicalJoint::Hip => "Hip",
            CanonicalJoint::RHip => "RHip",
            CanonicalJoint::RKnee => "RKnee",
            CanonicalJoint::RFoot => "RFoot",
            CanonicalJoint::LHip => "LHip",
            CanonicalJoint::LKnee => "LKnee",
            CanonicalJoint::LFoot => "LFoot",
            CanonicalJoint::Spine => "Spine",
            CanonicalJoint::Thorax => "Thorax",
            CanonicalJoint::Neck => "Neck",
            CanonicalJoint::Head => "Head",
            CanonicalJoint::LShoulder => "LShoulder",
            CanonicalJoint::LElbow => "LElbow",
            CanonicalJoint::LWrist => "LWrist",
            CanonicalJoint::RShoulder => "RShoulder",
            CanonicalJoint::RElbow => "RElbow",
            CanonicalJoint::RWrist => "RWrist",
        }
    }
}

impl fmt::Display for CanonicalJoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for CanonicalJoint {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL.iter().copied().find(|j| j.name() == s).ok_or(())
    }
}

/// Failures of [`BoneMapping::canonical_slot`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RemapError {
    /// The rig bone has no entry in the active mapping table.
    #[error("bone '{0}' is not in the active mapping table")]
    UnmappedJoint(String),
    /// The mapping table points at a name outside the canonical joint index.
    #[error("bone '{bone}' maps to '{joint}', which is not a canonical joint")]
    UnknownCanonicalJoint { bone: String, joint: String },
}

/// Rig bone name → canonical joint name table.
///
/// Target names are kept as strings so that a hand-authored table with a
/// typo is still loadable and fails at lookup with
/// [`RemapError::UnknownCanonicalJoint`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BoneMapping {
    entries: BTreeMap<String, String>,
}

impl BoneMapping {
    /// Empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a table from `(bone, canonical name)` pairs.
    pub fn from_pairs<I, B, J>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (B, J)>,
        B: Into<String>,
        J: Into<String>,
    {
        Self {
            entries: pairs
                .into_iter()
                .map(|(b, j)| (b.into(), j.into()))
                .collect(),
        }
    }

    /// Map `bone` to the canonical name `joint`, replacing any previous entry.
    pub fn insert(&mut self, bone: impl Into<String>, joint: impl Into<String>) {
        self.entries.insert(bone.into(), joint.into());
    }

    /// Drop the entry for `bone`, returning its target name.
    pub fn remove(&mut self, bone: &str) -> Option<String> {
        self.entries.remove(bone)
    }

    /// Number of mapped bones.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// `true` when no bone is mapped.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether `bone` has an entry, valid target or not.
    pub fn contains_bone(&self, bone: &str) -> bool {
        self.entries.contains_key(bone)
    }

    /// `(bone, canonical name)` entries in bone-name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(b, j)| (b.as_str(), j.as_str()))
    }

    /// Resolve a rig bone to its canonical joint.
    pub fn resolve(&self, bone: &str) -> Result<CanonicalJoint, RemapError> {
        let joint = self
            .entries
            .get(bone)
            .ok_or_else(|| RemapError::UnmappedJoint(bone.to_owned()))?;
        joint
            .parse::<CanonicalJoint>()
            .map_err(|_| RemapError::UnknownCanonicalJoint {
                bone: bone.to_owned(),
                joint: joint.clone(),
            })
    }

    /// Resolve a rig bone to its canonical slot index.
    pub fn canonical_slot(&self, bone: &str) -> Result<usize, RemapError> {
        self.resolve(bone).map(CanonicalJoint::slot)
    }

    /// Canonical joints that more than one bone maps to.
    ///
    /// A frame carrying both bones fills the slot twice and only the last
    /// write survives.
    pub fn duplicate_targets(&self) -> Vec<CanonicalJoint> {
        let mut counts: BTreeMap<CanonicalJoint, usize> = BTreeMap::new();
        for joint in self.entries.values().filter_map(|j| j.parse().ok()) {
            *counts.entry(joint).or_default() += 1;
        }
        counts
            .into_iter()
            .filter(|&(_, n)| n > 1)
            .map(|(joint, _)| joint)
            .collect()
    }

    /// Canonical joints that no bone in this table maps to.
    pub fn uncovered_joints(&self) -> Vec<CanonicalJoint> {
        let covered: Vec<CanonicalJoint> = self
            .entries
            .values()
            .filter_map(|j| j.parse().ok())
            .collect();
        CanonicalJoint::ALL
            .iter()
            .copied()
            .filter(|j| !covered.contains(j))
            .collect()
    }
}

/// Free-function form of [`BoneMapping::canonical_slot`].
pub fn canonical_slot(bone: &str, mapping: &BoneMapping) -> Result<usize, RemapError> {
    mapping.canonical_slot(bone)
}
