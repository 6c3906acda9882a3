//! Bone samples and fixed-order keypoint frames.

use serde::{Deserialize, Serialize};

use crate::joints::{CanonicalJoint, NUM_JOINTS};
use crate::{Pt2, Pt3};

/// World-space head and tail of one bone at one instant.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoneSample {
    pub head: Pt3,
    pub tail: Pt3,
}

impl BoneSample {
    /// A zero-length bone, for rigs that only provide joint positions.
    pub fn point(p: Pt3) -> Self {
        Self { head: p, tail: p }
    }
}

/// One named bone sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedBone {
    pub name: String,
    #[serde(flatten)]
    pub sample: BoneSample,
}

/// All bones of a rig at one animation frame, in host order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BoneFrame {
    pub bones: Vec<NamedBone>,
}

impl BoneFrame {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a bone; iteration keeps push order.
    pub fn push(&mut self, name: impl Into<String>, sample: BoneSample) {
        self.bones.push(NamedBone {
            name: name.into(),
            sample,
        });
    }

    /// First bone named `name`.
    pub fn get(&self, name: &str) -> Option<&BoneSample> {
        self.bones.iter().find(|b| b.name == name).map(|b| &b.sample)
    }

    pub fn len(&self) -> usize {
        self.bones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bones.is_empty()
    }

    /// Bones in push order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &BoneSample)> {
        self.bones.iter().map(|b| (b.name.as_str(), &b.sample))
    }
}

impl<S: Into<String>> FromIterator<(S, BoneSample)> for BoneFrame {
    fn from_iter<I: IntoIterator<Item = (S, BoneSample)>>(iter: I) -> Self {
        let mut frame = BoneFrame::new();
        for (name, sample) in iter {
            frame.push(name, sample);
        }
        frame
    }
}

/// 2D slots in canonical order. `None` marks a joint that is invalid or
/// outside the frame; no coordinate value doubles as a sentinel.
pub type Keypoints2d = [Option<Pt2>; NUM_JOINTS];
/// 3D world-space slots (meters) in canonical order.
pub type Keypoints3d = [Option<Pt3>; NUM_JOINTS];

/// Paired 3D/2D keypoints for one (camera, animation frame).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeypointFrame {
    /// Animation frame index in the source sequence.
    pub frame_index: usize,
    pub positions_3d: Keypoints3d,
    pub positions_2d: Keypoints2d,
}

impl KeypointFrame {
    /// A frame with every slot invalid.
    pub fn empty(frame_index: usize) -> Self {
        Self {
            frame_index,
            positions_3d: [None; NUM_JOINTS],
            positions_2d: [None; NUM_JOINTS],
        }
    }

    /// Pixel position of `joint`, if valid.
    pub fn joint_2d(&self, joint: CanonicalJoint) -> Option<Pt2> {
        self.positions_2d[joint.slot()]
    }

    /// World position of `joint`, if provided.
    pub fn joint_3d(&self, joint: CanonicalJoint) -> Option<Pt3> {
        self.positions_3d[joint.slot()]
    }

    /// Number of slots with a valid 2D projection.
    pub fn valid_2d_count(&self) -> usize {
        self.positions_2d.iter().filter(|p| p.is_some()).count()
    }

    /// True when every slot has both a 3D position and a valid 2D projection.
    pub fn is_complete(&self) -> bool {
        self.positions_2d.iter().all(Option::is_some) && self.positions_3d.iter().all(Option::is_some)
    }

    /// Slot-wise 3D positions as `f32` triples; invalid slots are `None`.
    pub fn to_f32_3d(&self) -> [Option<[f32; 3]>; NUM_JOINTS] {
        self.positions_3d
            .map(|p| p.map(|p| [p.x as f32, p.y as f32, p.z as f32]))
    }

    /// Slot-wise 2D pixels as `f32` pairs; invalid slots are `None`.
    pub fn to_f32_2d(&self) -> [Option<[f32; 2]>; NUM_JOINTS] {
        self.positions_2d.map(|p| p.map(|p| [p.x as f32, p.y as f32]))
    }
}
