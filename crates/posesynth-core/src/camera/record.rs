use log::debug;
use nalgebra::{Quaternion, Translation3};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::{LengthUnit, RawCamera, RawExtrinsics, RawIntrinsics};
use crate::projection::{CameraProjector, Resolution};
use crate::{Iso3, Mat4, Real, UnitQuat, Vec2, Vec3};

/// Length of [`CameraRecord::intrinsic_vector`].
pub const INTRINSIC_VECTOR_LEN: usize = 9;

/// A camera table entry that cannot be turned into a [`CameraRecord`].
#[derive(Debug, Error, Clone, PartialEq)]
pub enum CameraRecordError {
    #[error("camera '{camera}': missing required field '{field}'")]
    MissingField { camera: String, field: &'static str },
    #[error("camera '{camera}': field '{field}' has {got} values, expected {expected}")]
    Arity {
        camera: String,
        field: &'static str,
        expected: usize,
        got: usize,
    },
    #[error("camera '{camera}': field '{field}' contains a non-finite value")]
    NonFinite { camera: String, field: &'static str },
    #[error("camera '{camera}': resolution must be positive, got {width}x{height}")]
    Resolution {
        camera: String,
        width: i64,
        height: i64,
    },
    #[error("camera '{camera}': orientation quaternion has zero norm")]
    DegenerateOrientation { camera: String },
}

/// Clip distances that cannot produce a usable projection matrix.
#[derive(Debug, Error, Clone, Copy, PartialEq)]
#[error("clip range must satisfy 0 < near < far with finite values, got near={near}, far={far}")]
pub struct ClipRangeError {
    pub near: Real,
    pub far: Real,
}

/// Near and far clip distances used to build a projection matrix.
///
/// Deserialization rejects ranges that [`ClipRange::validate`] rejects.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ClipPlanes")]
pub struct ClipRange {
    pub near: Real,
    pub far: Real,
}

#[derive(Deserialize)]
struct ClipPlanes {
    near: Real,
    far: Real,
}

impl TryFrom<ClipPlanes> for ClipRange {
    type Error = ClipRangeError;

    fn try_from(planes: ClipPlanes) -> Result<Self, Self::Error> {
        Self::new(planes.near, planes.far)
    }
}

impl ClipRange {
    /// Checked constructor: both distances finite and `0 < near < far`.
    pub fn new(near: Real, far: Real) -> Result<Self, ClipRangeError> {
        let clip = Self { near, far };
        clip.validate()?;
        Ok(clip)
    }

    /// Check a range built through its public fields.
    pub fn validate(&self) -> Result<(), ClipRangeError> {
        let ok = self.near.is_finite()
            && self.far.is_finite()
            && 0.0 < self.near
            && self.near < self.far;
        if ok {
            Ok(())
        } else {
            Err(ClipRangeError {
                near: self.near,
                far: self.far,
            })
        }
    }
}

impl Default for ClipRange {
    fn default() -> Self {
        Self {
            near: 0.1,
            far: 1000.0,
        }
    }
}

/// Focal length normalized by half the image width: `f / (w / 2)`.
///
/// Applying this twice scales twice; callers normalize exactly once through
/// [`CameraRecord::normalize`].
pub fn normalize_focal_length(focal_px: Vec2, width: Real) -> Vec2 {
    focal_px / (width / 2.0)
}

/// Principal point re-centred and scaled by half the width on both axes:
/// `(p - res / 2) / (w / 2)`.
pub fn normalize_principal_point(center_px: Vec2, width: Real, height: Real) -> Vec2 {
    let half_w = width / 2.0;
    Vec2::new(
        (center_px.x - half_w) / half_w,
        (center_px.y - height / 2.0) / half_w,
    )
}

/// Fully specified, normalized camera.
///
/// Built only by [`CameraRecord::normalize`], which consumes the raw entry.
#[derive(Debug, Clone, PartialEq)]
pub struct CameraRecord {
    id: String,
    resolution: Resolution,
    focal_length_px: Vec2,
    principal_point_px: Vec2,
    focal_length: Vec2,
    principal_point: Vec2,
    radial_distortion: [Real; 3],
    tangential_distortion: [Real; 2],
    orientation: UnitQuat,
    translation: Vec3,
    azimuth_degrees: i32,
    intrinsic_vector: [Real; INTRINSIC_VECTOR_LEN],
}

impl CameraRecord {
    /// Validate a raw camera and convert it to normalized units.
    ///
    /// - focal length: `f / (w / 2)`;
    /// - principal point: `(p - res / 2) / (w / 2)`;
    /// - translation: scaled to meters according to `translation_unit`;
    /// - intrinsic vector: `[fx, fy, cx, cy, k1, k2, k3, p1, p2]` in
    ///   normalized units.
    pub fn normalize(raw: RawCamera, translation_unit: LengthUnit) -> Result<Self, CameraRecordError> {
        let RawCamera {
            intrinsics,
            extrinsics,
        } = raw;
        let RawIntrinsics {
            id,
            center,
            focal_length,
            radial_distortion,
            tangential_distortion,
            res_w,
            res_h,
        } = intrinsics;

        let id = id.ok_or_else(|| CameraRecordError::MissingField {
            camera: "<unnamed>".into(),
            field: "id",
        })?;
        let width = res_w.ok_or_else(|| missing(&id, "res_w"))?;
        let height = res_h.ok_or_else(|| missing(&id, "res_h"))?;
        if width <= 0 || height <= 0 || width > u32::MAX as i64 || height > u32::MAX as i64 {
            return Err(CameraRecordError::Resolution {
                camera: id,
                width,
                height,
            });
        }
        let resolution = Resolution::new(width as u32, height as u32);

        let focal_px = fixed::<2>(&id, "focal_length", focal_length)?;
        let center_px = fixed::<2>(&id, "center", center)?;
        let radial = optional_fixed::<3>(&id, "radial_distortion", radial_distortion)?;
        let tangential = optional_fixed::<2>(&id, "tangential_distortion", tangential_distortion)?;

        let RawExtrinsics {
            id: _,
            orientation,
            translation,
            azimuth_degrees,
        } = extrinsics;
        let q = fixed::<4>(&id, "orientation", orientation)?;
        let t = fixed::<3>(&id, "translation", translation)?;

        let quat = Quaternion::new(q[0], q[1], q[2], q[3]);
        if quat.norm() < 1e-12 {
            return Err(CameraRecordError::DegenerateOrientation { camera: id });
        }
        let orientation = UnitQuat::from_quaternion(quat);
        let translation = Vec3::from(t.map(|v| translation_unit.to_meters(v)));
        let azimuth_degrees = azimuth_degrees.unwrap_or_else(|| azimuth_from_orientation(&orientation));

        let focal_px = Vec2::new(focal_px[0], focal_px[1]);
        let center_px = Vec2::new(center_px[0], center_px[1]);
        let w = resolution.width as Real;
        let h = resolution.height as Real;
        let focal_length = normalize_focal_length(focal_px, w);
        let principal_point = normalize_principal_point(center_px, w, h);

        let intrinsic_vector = [
            focal_length.x,
            focal_length.y,
            principal_point.x,
            principal_point.y,
            radial[0],
            radial[1],
            radial[2],
            tangential[0],
            tangential[1],
        ];

        debug!(
            "normalized camera '{}' ({}x{}): f=({:.4}, {:.4}) c=({:.4}, {:.4})",
            id, resolution.width, resolution.height, focal_length.x, focal_length.y,
            principal_point.x, principal_point.y
        );

        Ok(Self {
            id,
            resolution,
            focal_length_px: focal_px,
            principal_point_px: center_px,
            focal_length,
            principal_point,
            radial_distortion: radial,
            tangential_distortion: tangential,
            orientation,
            translation,
            azimuth_degrees,
            intrinsic_vector,
        })
    }

    /// Camera identifier shared by the intrinsics and extrinsics tables.
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn resolution(&self) -> Resolution {
        self.resolution
    }

    /// Focal length in pixels, as authored.
    pub fn focal_length_px(&self) -> Vec2 {
        self.focal_length_px
    }

    /// Principal point in pixels, as authored.
    pub fn principal_point_px(&self) -> Vec2 {
        self.principal_point_px
    }

    /// Normalized focal length.
    pub fn focal_length(&self) -> Vec2 {
        self.focal_length
    }

    /// Normalized principal point.
    pub fn principal_point(&self) -> Vec2 {
        self.principal_point
    }

    /// `[k1, k2, k3]`, carried through but not applied by projection.
    pub fn radial_distortion(&self) -> [Real; 3] {
        self.radial_distortion
    }

    /// `[p1, p2]`, carried through but not applied by projection.
    pub fn tangential_distortion(&self) -> [Real; 2] {
        self.tangential_distortion
    }

    /// Camera→world rotation.
    pub fn orientation(&self) -> UnitQuat {
        self.orientation
    }

    /// Camera position in world space, meters.
    pub fn translation(&self) -> Vec3 {
        self.translation
    }

    pub fn azimuth_degrees(&self) -> i32 {
        self.azimuth_degrees
    }

    /// `[fx, fy, cx, cy, k1, k2, k3, p1, p2]`, normalized. The field order is
    /// part of the dataset format.
    pub fn intrinsic_vector(&self) -> &[Real; INTRINSIC_VECTOR_LEN] {
        &self.intrinsic_vector
    }

    /// Camera pose as a camera→world isometry.
    pub fn world_from_camera(&self) -> Iso3 {
        Iso3::from_parts(Translation3::from(self.translation), self.orientation)
    }

    /// OpenGL-style perspective matrix equivalent to this camera's pixel
    /// intrinsics, built from the intrinsic vector and resolution.
    ///
    /// Projecting with this matrix and mapping NDC to pixels reproduces
    /// `u = fx·x/d + cx`, `v = cy − fy·y/d` for a view-space point at depth
    /// `d = −z`.
    pub fn projection_matrix(&self, clip: ClipRange) -> Mat4 {
        let aspect = self.resolution.width as Real / self.resolution.height as Real;
        let [fx, fy, cx, cy, ..] = self.intrinsic_vector;
        let (n, f) = (clip.near, clip.far);
        #[rustfmt::skip]
        let m = Mat4::new(
            fx, 0.0, -cx, 0.0,
            0.0, fy * aspect, cy * aspect, 0.0,
            0.0, 0.0, -(f + n) / (f - n), -2.0 * f * n / (f - n),
            0.0, 0.0, -1.0, 0.0,
        );
        m
    }

    /// Projector bound to this camera's pose and intrinsics.
    pub fn projector(&self, clip: ClipRange) -> CameraProjector {
        CameraProjector::new(&self.world_from_camera(), self.projection_matrix(clip), self.resolution)
    }

    /// Intrinsics entry for writing back to a camera table (pixel units).
    pub fn to_raw_intrinsics(&self) -> RawIntrinsics {
        RawIntrinsics {
            id: Some(self.id.clone()),
            center: Some(vec![self.principal_point_px.x, self.principal_point_px.y]),
            focal_length: Some(vec![self.focal_length_px.x, self.focal_length_px.y]),
            radial_distortion: Some(self.radial_distortion.to_vec()),
            tangential_distortion: Some(self.tangential_distortion.to_vec()),
            res_w: Some(self.resolution.width as i64),
            res_h: Some(self.resolution.height as i64),
        }
    }

    /// Extrinsics entry for writing back to a camera table, translation in
    /// meters.
    pub fn to_raw_extrinsics(&self) -> RawExtrinsics {
        let q = self.orientation.quaternion();
        RawExtrinsics {
            id: Some(self.id.clone()),
            orientation: Some(vec![q.w, q.i, q.j, q.k]),
            translation: Some(self.translation.iter().copied().collect()),
            azimuth_degrees: Some(self.azimuth_degrees),
        }
    }
}

/// Z component of the XYZ Euler decomposition of a camera→world rotation,
/// rounded to whole degrees (half to even).
pub fn azimuth_from_orientation(orientation: &UnitQuat) -> i32 {
    let (_, _, yaw) = orientation.euler_angles();
    yaw.to_degrees().round_ties_even() as i32
}

fn missing(camera: &str, field: &'static str) -> CameraRecordError {
    CameraRecordError::MissingField {
        camera: camera.to_owned(),
        field,
    }
}

fn fixed<const N: usize>(
    camera: &str,
    field: &'static str,
    values: Option<Vec<f64>>,
) -> Result<[f64; N], CameraRecordError> {
    let values = values.ok_or_else(|| missing(camera, field))?;
    let arr: [f64; N] = values
        .as_slice()
        .try_into()
        .map_err(|_| CameraRecordError::Arity {
            camera: camera.to_owned(),
            field,
            expected: N,
            got: values.len(),
        })?;
    if arr.iter().any(|v| !v.is_finite()) {
        return Err(CameraRecordError::NonFinite {
            camera: camera.to_owned(),
            field,
        });
    }
    Ok(arr)
}

fn optional_fixed<const N: usize>(
    camera: &str,
    field: &'static str,
    values: Option<Vec<f64>>,
) -> Result<[f64; N], CameraRecordError> {
    match values {
        None => Ok([0.0; N]),
        some => fixed(camera, field, some),
    }
}
