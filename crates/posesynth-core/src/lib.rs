//! Core types for `posesynth`: skeleton topology, joint remapping, camera
//! normalization, and projection.
//!
//! This crate contains:
//! - linear algebra type aliases (`Real`, `Vec2`, `Pt3`, ...),
//! - the 17-joint canonical layout and per-rig bone mapping tables,
//! - camera records normalized from raw camera tables,
//! - world → pixel projection with explicit invalid outcomes,
//! - deterministic synthetic camera rigs and poses for tests and demos.
//!
//! Pixel pipeline:
//! `pixel = viewport ∘ perspective_divide ∘ P(intrinsics) ∘ camera_from_world`

/// Camera tables and normalized camera records.
pub mod camera;
/// Canonical joint layout and bone → joint remapping.
pub mod joints;
/// Bone samples and keypoint frames.
pub mod keypoints;
/// Linear algebra type aliases and helpers.
pub mod math;
/// World point → pixel projection.
pub mod projection;
/// Rig profiles (mapping + head/tail conventions).
pub mod rig;
/// Skeleton topology and left/right symmetry.
pub mod skeleton;
/// Deterministic synthetic cameras and poses.
pub mod synthetic;

pub use camera::*;
pub use joints::*;
pub use keypoints::*;
pub use math::*;
pub use projection::*;
pub use rig::*;
pub use skeleton::*;
