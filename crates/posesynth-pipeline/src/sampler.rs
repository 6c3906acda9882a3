//! Frame sampler: bones of one frame → canonical 3D/2D keypoints.

use log::{debug, trace};
use posesynth_core::{BoneFrame, CameraProjector, KeypointFrame, RemapError, RigProfile};

use crate::config::FrameKeepPolicy;

/// Assemble the keypoint frame for one camera and one animation frame.
///
/// Each bone not listed in the rig's ignored set contributes its head or
/// tail (per the rig's use-head set) to its canonical slot: the world
/// position fills the 3D slot, its projection fills the 2D slot when
/// visible. Joints the rig does not provide stay empty. When two bones map
/// to the same joint, the one later in `bones` wins.
///
/// Fails on the first bone that does not resolve through the mapping; the
/// caller abandons the whole sequence for this camera in that case.
pub fn assemble_frame(
    projector: &CameraProjector,
    bones: &BoneFrame,
    rig: &RigProfile,
    frame_index: usize,
) -> Result<KeypointFrame, RemapError> {
    let mut frame = KeypointFrame::empty(frame_index);
    for (name, sample) in bones.iter() {
        if rig.is_ignored(name) {
            continue;
        }
        let slot = rig.canonical_slot(name)?;
        if frame.positions_3d[slot].is_some() {
            debug!("frame {frame_index}: bone '{name}' overwrites canonical slot {slot}");
        }
        let world = rig.joint_position(name, sample);
        let outcome = projector.project(&world);
        if !outcome.is_valid() {
            trace!("frame {frame_index}: bone '{name}' -> {outcome:?}");
        }
        frame.positions_3d[slot] = Some(world);
        frame.positions_2d[slot] = outcome.pixel();
    }
    Ok(frame)
}

/// Whether `frame` survives `policy`.
pub fn keep_frame(frame: &KeypointFrame, policy: FrameKeepPolicy) -> bool {
    match policy {
        FrameKeepPolicy::DropFrame => frame.is_complete(),
        FrameKeepPolicy::KeepInvalid => true,
    }
}
