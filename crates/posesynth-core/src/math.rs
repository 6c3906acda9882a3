//! Linear algebra type aliases and homogeneous helpers.

use nalgebra::{
    Isometry3, Matrix4, Point2, Point3, UnitQuaternion, Vector2, Vector3, Vector4,
};

/// Scalar type used throughout the library (currently `f64`).
pub type Real = f64;

/// 2D vector with [`Real`] components.
pub type Vec2 = Vector2<Real>;
/// 3D vector with [`Real`] components.
pub type Vec3 = Vector3<Real>;
/// 4D (homogeneous) vector with [`Real`] components.
pub type Vec4 = Vector4<Real>;
/// 2D point with [`Real`] coordinates.
pub type Pt2 = Point2<Real>;
/// 3D point with [`Real`] coordinates.
pub type Pt3 = Point3<Real>;
/// 4×4 matrix with [`Real`] entries.
pub type Mat4 = Matrix4<Real>;
/// 3D rigid transform (SE(3)) using [`Real`].
pub type Iso3 = Isometry3<Real>;
/// Unit quaternion using [`Real`].
pub type UnitQuat = UnitQuaternion<Real>;

/// Promote a 3D point to homogeneous coordinates `(x, y, z, 1)`.
pub fn to_homogeneous(p: &Pt3) -> Vec4 {
    Vec4::new(p.x, p.y, p.z, 1.0)
}

/// Returns true when every entry of the matrix is finite.
pub fn mat4_is_finite(m: &Mat4) -> bool {
    m.iter().all(|v| v.is_finite())
}

/// Returns true when rotation and translation of the isometry are finite.
pub fn iso3_is_finite(iso: &Iso3) -> bool {
    iso.translation.vector.iter().all(|v| v.is_finite())
        && iso.rotation.coords.iter().all(|v| v.is_finite())
}

/// Returns true when all coordinates of the point are finite.
pub fn pt3_is_finite(p: &Pt3) -> bool {
    p.coords.iter().all(|v| v.is_finite())
}
