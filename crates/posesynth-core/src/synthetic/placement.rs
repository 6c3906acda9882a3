//! Camera placement around a subject.
//!
//! Two layouts are provided: the vertices of the upper half of a UV sphere
//! (a fixed, reproducible dome of cameras) and a seeded random shell. Both
//! aim every camera at a common target with world +Z as the up direction.

use nalgebra::Quaternion;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::camera::{LengthUnit, RawCamera, RawExtrinsics, RawIntrinsics};
use crate::projection::Resolution;
use crate::{Iso3, Pt3, Real, Vec3};

#[derive(Debug, Error, PartialEq)]
pub enum PlacementError {
    #[error("invalid {field}: {value}")]
    InvalidParameter { field: &'static str, value: Real },
    #[error("camera at {eye:?} cannot look at {target:?} with +Z up")]
    DegenerateLookAt { eye: [Real; 3], target: [Real; 3] },
}

/// Pose of a camera at `eye` looking at `target`, camera→world.
///
/// The camera looks down its local −Z with local +Y as close to `up` as
/// possible. Fails when `eye == target` or the view direction is parallel
/// to `up`.
pub fn look_at(eye: &Pt3, target: &Pt3, up: &Vec3) -> Result<Iso3, PlacementError> {
    let dir = target - eye;
    if dir.norm() <= 1e-12 || dir.cross(up).norm() <= 1e-12 * dir.norm() {
        return Err(PlacementError::DegenerateLookAt {
            eye: [eye.x, eye.y, eye.z],
            target: [target.x, target.y, target.z],
        });
    }
    Ok(Iso3::look_at_rh(eye, target, up).inverse())
}

fn default_radius() -> Real {
    5.0
}

fn default_segments() -> usize {
    8
}

fn default_rings() -> usize {
    10
}

fn default_center() -> Pt3 {
    Pt3::new(0.0, 0.0, 0.5)
}

fn default_target() -> Pt3 {
    Pt3::new(0.0, 0.0, 1.0)
}

/// Cameras on the vertices of a UV sphere, keeping the equator and the
/// rings above it. Poles are not camera positions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HemispherePlacement {
    #[serde(default = "default_radius")]
    pub radius: Real,
    /// Vertices per ring.
    #[serde(default = "default_segments")]
    pub segments: usize,
    /// Number of latitude bands from pole to pole.
    #[serde(default = "default_rings")]
    pub rings: usize,
    #[serde(default = "default_center")]
    pub center: Pt3,
    #[serde(default = "default_target")]
    pub target: Pt3,
}

impl Default for HemispherePlacement {
    fn default() -> Self {
        Self {
            radius: default_radius(),
            segments: default_segments(),
            rings: default_rings(),
            center: default_center(),
            target: default_target(),
        }
    }
}

impl HemispherePlacement {
    /// Camera positions, ring by ring from the top, then by longitude.
    pub fn positions(&self) -> Vec<Pt3> {
        let mut out = Vec::new();
        if self.rings < 2 || self.segments == 0 {
            return out;
        }
        for ring in 1..self.rings {
            let polar = std::f64::consts::PI * ring as Real / self.rings as Real;
            let z = polar.cos();
            if z < -1e-9 {
                break;
            }
            let r_xy = polar.sin();
            for seg in 0..self.segments {
                let azimuth = std::f64::consts::TAU * seg as Real / self.segments as Real;
                let dir = Vec3::new(r_xy * azimuth.cos(), r_xy * azimuth.sin(), z.max(0.0));
                out.push(self.center + dir * self.radius);
            }
        }
        out
    }

    /// Camera→world poses for [`Self::positions`].
    pub fn poses(&self) -> Result<Vec<Iso3>, PlacementError> {
        if !(self.radius.is_finite() && self.radius > 0.0) {
            return Err(PlacementError::InvalidParameter {
                field: "radius",
                value: self.radius,
            });
        }
        self.positions()
            .iter()
            .map(|eye| look_at(eye, &self.target, &Vec3::z()))
            .collect()
    }
}

/// Cameras at random positions on a spherical shell around `target`.
///
/// Elevation is sampled uniformly in `sin(elevation)` so positions are
/// uniform in area over the band. The same seed always yields the same rig.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomShellPlacement {
    pub count: usize,
    pub radius_min: Real,
    pub radius_max: Real,
    pub min_elevation_deg: Real,
    pub max_elevation_deg: Real,
    #[serde(default = "default_target")]
    pub target: Pt3,
    #[serde(default)]
    pub seed: u64,
}

impl Default for RandomShellPlacement {
    fn default() -> Self {
        Self {
            count: 16,
            radius_min: 4.0,
            radius_max: 6.0,
            min_elevation_deg: 0.0,
            max_elevation_deg: 60.0,
            target: default_target(),
            seed: 0,
        }
    }
}

impl RandomShellPlacement {
    fn validate(&self) -> Result<(), PlacementError> {
        let checks = [
            ("radius_min", self.radius_min, self.radius_min > 0.0),
            ("radius_max", self.radius_max, self.radius_max >= self.radius_min),
            (
                "min_elevation_deg",
                self.min_elevation_deg,
                self.min_elevation_deg >= -90.0,
            ),
            (
                "max_elevation_deg",
                self.max_elevation_deg,
                // Straight overhead has no defined +Z-up orientation.
                self.max_elevation_deg < 90.0 && self.max_elevation_deg >= self.min_elevation_deg,
            ),
        ];
        for (field, value, ok) in checks {
            if !value.is_finite() || !ok {
                return Err(PlacementError::InvalidParameter { field, value });
            }
        }
        Ok(())
    }

    pub fn positions(&self) -> Result<Vec<Pt3>, PlacementError> {
        self.validate()?;
        let mut rng = StdRng::seed_from_u64(self.seed);
        let sin_lo = self.min_elevation_deg.to_radians().sin();
        let sin_hi = self.max_elevation_deg.to_radians().sin();

        let mut out = Vec::with_capacity(self.count);
        for _ in 0..self.count {
            let r = rng.random_range(self.radius_min..=self.radius_max);
            let s = rng.random_range(sin_lo..=sin_hi);
            let azimuth = rng.random_range(0.0..std::f64::consts::TAU);
            let c = (1.0 - s * s).max(0.0).sqrt();
            out.push(self.target + Vec3::new(c * azimuth.cos(), c * azimuth.sin(), s) * r);
        }
        Ok(out)
    }

    pub fn poses(&self) -> Result<Vec<Iso3>, PlacementError> {
        self.positions()?
            .iter()
            .map(|eye| look_at(eye, &self.target, &Vec3::z()))
            .collect()
    }
}

fn default_lens_mm() -> Real {
    35.0
}

fn default_sensor_width_mm() -> Real {
    36.0
}

/// Ideal pinhole camera described by lens and sensor size.
///
/// The sensor width is fitted to the larger image dimension, so
/// `f_px = lens / sensor · max(w, h)` on both axes, principal point at the
/// image centre, no distortion.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LensCamera {
    #[serde(default)]
    pub resolution: Resolution,
    #[serde(default = "default_lens_mm")]
    pub lens_mm: Real,
    #[serde(default = "default_sensor_width_mm")]
    pub sensor_width_mm: Real,
}

impl Default for LensCamera {
    fn default() -> Self {
        Self {
            resolution: Resolution::default(),
            lens_mm: default_lens_mm(),
            sensor_width_mm: default_sensor_width_mm(),
        }
    }
}

impl LensCamera {
    pub fn focal_length_px(&self) -> Real {
        let fit = self.resolution.width.max(self.resolution.height) as Real;
        self.lens_mm / self.sensor_width_mm * fit
    }

    pub fn raw_intrinsics(&self, id: &str) -> RawIntrinsics {
        let f = self.focal_length_px();
        let c = self.resolution.center();
        RawIntrinsics {
            id: Some(id.to_owned()),
            center: Some(vec![c.x, c.y]),
            focal_length: Some(vec![f, f]),
            radial_distortion: Some(vec![0.0; 3]),
            tangential_distortion: Some(vec![0.0; 2]),
            res_w: Some(self.resolution.width as i64),
            res_h: Some(self.resolution.height as i64),
        }
    }

    /// Raw camera for a pose, with the translation written in `unit`.
    pub fn raw_camera(&self, id: &str, world_from_camera: &Iso3, unit: LengthUnit) -> RawCamera {
        RawCamera {
            intrinsics: self.raw_intrinsics(id),
            extrinsics: raw_extrinsics(id, world_from_camera, unit),
        }
    }
}

/// Extrinsics entry for a camera→world pose.
pub fn raw_extrinsics(id: &str, world_from_camera: &Iso3, unit: LengthUnit) -> RawExtrinsics {
    let q: &Quaternion<Real> = world_from_camera.rotation.quaternion();
    let t = world_from_camera.translation.vector;
    RawExtrinsics {
        id: Some(id.to_owned()),
        orientation: Some(vec![q.w, q.i, q.j, q.k]),
        translation: Some(t.iter().map(|v| unit.from_meters(*v)).collect()),
        azimuth_degrees: None,
    }
}

/// Raw cameras for a set of poses, ids `cam_000`, `cam_001`, ...
pub fn camera_rig(lens: &LensCamera, poses: &[Iso3], unit: LengthUnit) -> Vec<RawCamera> {
    poses
        .iter()
        .enumerate()
        .map(|(i, pose)| lens.raw_camera(&format!("cam_{i:03}"), pose, unit))
        .collect()
}
