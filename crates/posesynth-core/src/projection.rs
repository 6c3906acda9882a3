//! World point → pixel projection through a view and projection matrix.
//!
//! Pipeline for a point `p_w`:
//! 1. `p_v = camera_from_world · p_w` (inverse of the camera world pose);
//! 2. `clip = P · [p_v, 1]`;
//! 3. `clip.w <= 0` → behind the camera, no division;
//! 4. `ndc = clip.xy / clip.w`, then
//!    `u = (ndc.x + 1)·w/2`, `v = (1 − ndc.y)·h/2` (rows grow downward);
//! 5. pixels outside `[0, w] × [0, h]` are out of frame;
//! 6. visible pixels are rounded to the nearest integer (half to even).
//!
//! Projection never fails: non-finite inputs yield
//! [`ProjectionOutcome::Degenerate`].

use serde::{Deserialize, Serialize};

use crate::math::{iso3_is_finite, mat4_is_finite, pt3_is_finite, to_homogeneous};
use crate::{Iso3, Mat4, Pt2, Pt3, Real};

/// Image size in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Width over height.
    pub fn aspect(&self) -> Real {
        self.width as Real / self.height as Real
    }

    /// Pixel centre of the image.
    pub fn center(&self) -> Pt2 {
        Pt2::new(self.width as Real / 2.0, self.height as Real / 2.0)
    }

    /// True when `(x, y)` lies in the closed rectangle `[0, w] × [0, h]`.
    pub fn contains(&self, x: Real, y: Real) -> bool {
        (0.0..=self.width as Real).contains(&x) && (0.0..=self.height as Real).contains(&y)
    }
}

impl Default for Resolution {
    fn default() -> Self {
        Self::new(1920, 1080)
    }
}

/// Result of projecting one point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ProjectionOutcome {
    /// Inside the image; rounded pixel coordinates.
    Visible(Pt2),
    /// In front of the camera but outside the image; unrounded pixel.
    OutOfFrame(Pt2),
    /// `clip.w <= 0`: behind the camera or on its focal plane.
    BehindCamera,
    /// Non-finite input or intermediate value.
    Degenerate,
}

impl ProjectionOutcome {
    /// Only [`ProjectionOutcome::Visible`] counts as a valid keypoint.
    pub fn is_valid(&self) -> bool {
        matches!(self, ProjectionOutcome::Visible(_))
    }

    /// The rounded pixel for visible points, `None` otherwise.
    pub fn pixel(&self) -> Option<Pt2> {
        match self {
            ProjectionOutcome::Visible(px) => Some(*px),
            _ => None,
        }
    }
}

/// Project `world_point` for a camera posed at `world_from_camera`.
pub fn project(
    world_point: &Pt3,
    world_from_camera: &Iso3,
    projection: &Mat4,
    resolution: Resolution,
) -> ProjectionOutcome {
    if !iso3_is_finite(world_from_camera) {
        return ProjectionOutcome::Degenerate;
    }
    project_view(
        world_point,
        &world_from_camera.inverse(),
        projection,
        resolution,
    )
}

/// Same as [`project`] with the camera pose already inverted.
pub fn project_view(
    world_point: &Pt3,
    camera_from_world: &Iso3,
    projection: &Mat4,
    resolution: Resolution,
) -> ProjectionOutcome {
    if !pt3_is_finite(world_point) || !iso3_is_finite(camera_from_world) || !mat4_is_finite(projection) {
        return ProjectionOutcome::Degenerate;
    }

    let view = camera_from_world.transform_point(world_point);
    let clip = projection * to_homogeneous(&view);
    if !clip.iter().all(|v| v.is_finite()) {
        return ProjectionOutcome::Degenerate;
    }
    if clip.w <= 0.0 {
        return ProjectionOutcome::BehindCamera;
    }

    let ndc_x = clip.x / clip.w;
    let ndc_y = clip.y / clip.w;
    let w = resolution.width as Real;
    let h = resolution.height as Real;
    let x = (ndc_x + 1.0) * w / 2.0;
    let y = (1.0 - ndc_y) * h / 2.0;
    if !x.is_finite() || !y.is_finite() {
        return ProjectionOutcome::Degenerate;
    }
    if !resolution.contains(x, y) {
        return ProjectionOutcome::OutOfFrame(Pt2::new(x, y));
    }

    ProjectionOutcome::Visible(Pt2::new(x.round_ties_even(), y.round_ties_even()))
}

/// A camera pose and projection matrix bound together, with the view
/// transform inverted once.
#[derive(Debug, Clone, PartialEq)]
pub struct CameraProjector {
    camera_from_world: Iso3,
    projection: Mat4,
    resolution: Resolution,
}

impl CameraProjector {
    /// Precompute the world→view transform of a camera placed at `world_from_camera`.
    pub fn new(world_from_camera: &Iso3, projection: Mat4, resolution: Resolution) -> Self {
        Self {
            camera_from_world: world_from_camera.inverse(),
            projection,
            resolution,
        }
    }

    pub fn resolution(&self) -> Resolution {
        self.resolution
    }

    /// Project a world-space point; see [`project_view`].
    pub fn project(&self, world_point: &Pt3) -> ProjectionOutcome {
        project_view(
            world_point,
            &self.camera_from_world,
            &self.projection,
            self.resolution,
        )
    }
}
