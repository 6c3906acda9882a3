//! Simple articulated poses expressed in any rig's bone naming.

use nalgebra::Rotation3;

use crate::joints::{CanonicalJoint, NUM_JOINTS};
use crate::keypoints::{BoneFrame, BoneSample};
use crate::rig::{BoneEnd, RigProfile};
use crate::skeleton::Skeleton;
use crate::{Pt3, Real, Vec3};

/// A T-pose standing at the origin, Z up, facing −Y, in meters.
pub fn rest_pose() -> [Pt3; NUM_JOINTS] {
    use CanonicalJoint::*;
    let mut joints = [Pt3::origin(); NUM_JOINTS];
    let table = [
        (Hip, [0.0, 0.0, 1.0]),
        (RHip, [-0.12, 0.0, 0.95]),
        (RKnee, [-0.12, 0.0, 0.52]),
        (RFoot, [-0.12, 0.0, 0.08]),
        (LHip, [0.12, 0.0, 0.95]),
        (LKnee, [0.12, 0.0, 0.52]),
        (LFoot, [0.12, 0.0, 0.08]),
        (Spine, [0.0, 0.0, 1.2]),
        (Thorax, [0.0, 0.0, 1.45]),
        (Neck, [0.0, 0.0, 1.55]),
        (Head, [0.0, 0.0, 1.72]),
        (LShoulder, [0.18, 0.0, 1.45]),
        (LElbow, [0.42, 0.0, 1.45]),
        (LWrist, [0.65, 0.0, 1.45]),
        (RShoulder, [-0.18, 0.0, 1.45]),
        (RElbow, [-0.42, 0.0, 1.45]),
        (RWrist, [-0.65, 0.0, 1.45]),
    ];
    for (joint, [x, y, z]) in table {
        joints[joint.slot()] = Pt3::new(x, y, z);
    }
    joints
}

/// Express canonical joint positions as bones of `rig`.
///
/// Bones read at the head get `head = joint` and a short tail along +Z;
/// bones read at the tail get `tail = joint` and `head` at the parent
/// joint. Ignored bones are emitted at the hip so hosts that export them
/// are mimicked.
pub fn rig_frame(rig: &RigProfile, joints: &[Pt3; NUM_JOINTS]) -> BoneFrame {
    let skeleton = Skeleton::h36m();
    let mut frame = BoneFrame::new();
    for (bone, joint_name) in rig.mapping.iter() {
        let Ok(joint) = joint_name.parse::<CanonicalJoint>() else {
            continue;
        };
        let p = joints[joint.slot()];
        let sample = match rig.bone_end(bone) {
            BoneEnd::Head => BoneSample {
                head: p,
                tail: p + Vec3::new(0.0, 0.0, 0.05),
            },
            BoneEnd::Tail => {
                let parent = skeleton
                    .parent_of(joint.slot())
                    .ok()
                    .flatten()
                    .map_or(p, |parent| joints[parent]);
                BoneSample { head: parent, tail: p }
            }
        };
        frame.push(bone, sample);
    }
    let hip = joints[CanonicalJoint::Hip.slot()];
    for bone in &rig.ignored_bones {
        frame.push(bone.as_str(), BoneSample::point(hip));
    }
    frame
}

/// `frames` poses of the rest pose turning about the vertical axis through
/// the hip by `yaw_step_deg` per frame.
pub fn turning_sequence(rig: &RigProfile, frames: usize, yaw_step_deg: Real) -> Vec<BoneFrame> {
    let rest = rest_pose();
    let pivot = rest[CanonicalJoint::Hip.slot()];
    (0..frames)
        .map(|i| {
            let rot = Rotation3::from_axis_angle(&Vec3::z_axis(), (yaw_step_deg * i as Real).to_radians());
            let joints = rest.map(|p| pivot + rot * (p - pivot));
            rig_frame(rig, &joints)
        })
        .collect()
}
