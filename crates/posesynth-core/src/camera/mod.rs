//! Camera tables and normalized camera records.
//!
//! Raw tables are loosely typed (every field optional) because they are
//! authored by hand or exported by a host application. They are converted
//! exactly once into a [`CameraRecord`], which is fully specified and
//! immutable. Normalization is not idempotent, so a record never exposes a
//! way to normalize again.
//!
//! Conventions:
//! - intrinsics are normalized by half the image width on both axes,
//!   preserving aspect ratio;
//! - the orientation quaternion is camera→world, `[w, x, y, z]`;
//! - the translation is the camera position in world space, in meters;
//! - the camera looks down its local −Z axis with +Y up.

mod raw;
mod record;

pub use raw::*;
pub use record::*;
