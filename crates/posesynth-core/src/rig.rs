//! Rig conventions: bone mapping plus head/tail selection rules.
//!
//! Rig bones do not always point toward the joint the canonical layout
//! expects, so each profile names the bones whose *head* marks the joint.
//! All other bones contribute their *tail*.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::joints::{BoneMapping, CanonicalJoint, RemapError};
use crate::keypoints::BoneSample;
use crate::Pt3;

/// Which end of a bone marks its joint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoneEnd {
    Head,
    Tail,
}

/// A rig convention: mapping table, head-joint set, and ignored bones.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RigProfile {
    /// Human-readable convention name, recorded in logs.
    pub name: String,
    /// Native bone name → canonical joint name.
    pub mapping: BoneMapping,
    /// Bones whose head position is the joint.
    #[serde(default)]
    pub use_head: BTreeSet<String>,
    /// Bones the host exposes that are not keypoints (root, hands, toes).
    /// They are skipped before remapping.
    #[serde(default)]
    pub ignored_bones: BTreeSet<String>,
}

impl RigProfile {
    /// Bandai-Namco research motion rig.
    pub fn bandai() -> Self {
        Self {
            name: "bandai".into(),
            mapping: BoneMapping::from_pairs([
                ("Hips", "Hip"),
                ("UpperLeg_R", "RHip"),
                ("LowerLeg_R", "RKnee"),
                ("Foot_R", "RFoot"),
                ("UpperLeg_L", "LHip"),
                ("LowerLeg_L", "LKnee"),
                ("Foot_L", "LFoot"),
                ("Spine", "Spine"),
                ("Chest", "Thorax"),
                ("Neck", "Neck"),
                ("Head", "Head"),
                ("Shoulder_R", "RShoulder"),
                ("UpperArm_R", "RElbow"),
                ("LowerArm_R", "RWrist"),
                ("Shoulder_L", "LShoulder"),
                ("UpperArm_L", "LElbow"),
                ("LowerArm_L", "LWrist"),
            ]),
            use_head: set([
                "UpperLeg_R",
                "UpperLeg_L",
                "LowerLeg_R",
                "LowerLeg_L",
                "Foot_R",
                "Foot_L",
                "Hips",
                "Spine",
            ]),
            ignored_bones: set(["joint_Root", "Hand_R", "Hand_L", "Toes_R", "Toes_L"]),
        }
    }

    /// CMU-style BVH naming (`LeftUpLeg`, `RightForeArm`, ...).
    pub fn cmu() -> Self {
        Self {
            name: "cmu".into(),
            mapping: BoneMapping::from_pairs([
                ("Hips", "Hip"),
                ("RightUpLeg", "RHip"),
                ("RightLeg", "RKnee"),
                ("RightFoot", "RFoot"),
                ("LeftUpLeg", "LHip"),
                ("LeftLeg", "LKnee"),
                ("LeftFoot", "LFoot"),
                ("Spine", "Spine"),
                ("Spine1", "Thorax"),
                ("Neck", "Neck"),
                ("Head", "Head"),
                ("LeftArm", "LShoulder"),
                ("LeftForeArm", "LElbow"),
                ("LeftHand", "LWrist"),
                ("RightArm", "RShoulder"),
                ("RightForeArm", "RElbow"),
                ("RightHand", "RWrist"),
            ]),
            use_head: set([
                "Hips",
                "RightUpLeg",
                "RightLeg",
                "RightFoot",
                "LeftUpLeg",
                "LeftLeg",
                "LeftFoot",
                "Spine",
                "LeftArm",
                "LeftForeArm",
                "LeftHand",
                "RightArm",
                "RightForeArm",
                "RightHand",
            ]),
            ignored_bones: set([
                "LHipJoint",
                "RHipJoint",
                "LowerBack",
                "Neck1",
                "LeftToeBase",
                "RightToeBase",
                "LeftShoulder",
                "RightShoulder",
                "LeftFingerBase",
                "LeftHandIndex1",
                "LThumb",
                "RightFingerBase",
                "RightHandIndex1",
                "RThumb",
            ]),
        }
    }

    /// Rigs whose bones already carry canonical joint names; every joint
    /// is read at the bone head.
    pub fn h36m() -> Self {
        let names = CanonicalJoint::ALL.iter().map(|j| j.name());
        Self {
            name: "h36m".into(),
            mapping: BoneMapping::from_pairs(names.clone().map(|n| (n, n))),
            use_head: names.map(str::to_owned).collect(),
            ignored_bones: BTreeSet::new(),
        }
    }

    /// Whether `bone` is dropped before remapping.
    pub fn is_ignored(&self, bone: &str) -> bool {
        self.ignored_bones.contains(bone)
    }

    /// End of `bone` that marks its joint; tail unless listed in `use_head`.
    pub fn bone_end(&self, bone: &str) -> BoneEnd {
        if self.use_head.contains(bone) {
            BoneEnd::Head
        } else {
            BoneEnd::Tail
        }
    }

    /// World position that marks the joint for `bone`.
    pub fn joint_position(&self, bone: &str, sample: &BoneSample) -> Pt3 {
        match self.bone_end(bone) {
            BoneEnd::Head => sample.head,
            BoneEnd::Tail => sample.tail,
        }
    }

    /// Canonical slot for `bone` through this profile's mapping table.
    pub fn canonical_slot(&self, bone: &str) -> Result<usize, RemapError> {
        self.mapping.canonical_slot(bone)
    }
}

impl Default for RigProfile {
    fn default() -> Self {
        Self::bandai()
    }
}

fn set<const N: usize>(names: [&str; N]) -> BTreeSet<String> {
    names.iter().map(|s| (*s).to_owned()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::joints::NUM_JOINTS;

    #[test]
    fn presets_cover_every_canonical_slot() {
        for profile in [RigProfile::bandai(), RigProfile::cmu(), RigProfile::h36m()] {
            assert_eq!(profile.mapping.len(), NUM_JOINTS, "{}", profile.name);
            assert!(
                profile.mapping.uncovered_joints().is_empty(),
                "{} leaves joints uncovered",
                profile.name
            );
            let mut slots: Vec<usize> = profile
                .mapping
                .iter()
                .map(|(bone, _)| profile.canonical_slot(bone).unwrap())
                .collect();
            slots.sort_unstable();
            assert_eq!(slots, (0..NUM_JOINTS).collect::<Vec<_>>());
            assert!(profile.mapping.duplicate_targets().is_empty(), "{}", profile.name);
        }
    }

    #[test]
    fn ignored_bones_are_not_mapped() {
        for profile in [RigProfile::bandai(), RigProfile::cmu()] {
            for bone in &profile.ignored_bones {
                assert!(!profile.mapping.contains_bone(bone), "{bone}");
            }
        }
    }

    #[test]
    fn bandai_head_tail_selection() {
        let rig = RigProfile::bandai();
        let sample = BoneSample {
            head: Pt3::new(0.0, 0.0, 1.0),
            tail: Pt3::new(0.0, 0.0, 0.5),
        };
        assert_eq!(rig.bone_end("LowerLeg_L"), BoneEnd::Head);
        assert_eq!(rig.joint_position("LowerLeg_L", &sample), sample.head);
        assert_eq!(rig.bone_end("UpperArm_R"), BoneEnd::Tail);
        assert_eq!(rig.joint_position("UpperArm_R", &sample), sample.tail);
        assert!(rig.is_ignored("Toes_R"));
    }
}
