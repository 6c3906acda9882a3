use serde::{Deserialize, Serialize};

/// Unit in which a source expresses lengths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LengthUnit {
    Meters,
    #[default]
    Millimeters,
}

impl LengthUnit {
    /// Convert a length in this unit to meters.
    pub fn to_meters(self, value: f64) -> f64 {
        match self {
            LengthUnit::Meters => value,
            LengthUnit::Millimeters => value / 1000.0,
        }
    }

    /// Convert a length in meters to this unit.
    pub fn from_meters(self, meters: f64) -> f64 {
        match self {
            LengthUnit::Meters => meters,
            LengthUnit::Millimeters => meters * 1000.0,
        }
    }
}

/// Per-camera intrinsics as authored in a camera table.
///
/// Every field is optional here; presence and arity are checked once by
/// [`super::CameraRecord::normalize`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawIntrinsics {
    #[serde(default)]
    pub id: Option<String>,
    /// Principal point `[cx, cy]` in pixels.
    #[serde(default, alias = "principal_point")]
    pub center: Option<Vec<f64>>,
    /// Focal length `[fx, fy]` in pixels.
    #[serde(default)]
    pub focal_length: Option<Vec<f64>>,
    /// `[k1, k2, k3]`; absent means zero.
    #[serde(default)]
    pub radial_distortion: Option<Vec<f64>>,
    /// `[p1, p2]`; absent means zero.
    #[serde(default)]
    pub tangential_distortion: Option<Vec<f64>>,
    #[serde(default)]
    pub res_w: Option<i64>,
    #[serde(default)]
    pub res_h: Option<i64>,
}

/// Per-camera extrinsics as authored in a camera table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawExtrinsics {
    /// Optional camera id; when present it must match the paired intrinsics.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Camera→world rotation as `[w, x, y, z]`.
    #[serde(default)]
    pub orientation: Option<Vec<f64>>,
    /// Camera position in world space, in the table's length unit.
    #[serde(default)]
    pub translation: Option<Vec<f64>>,
    /// Azimuth in whole degrees; derived from the orientation when absent.
    #[serde(default, alias = "azimuth", skip_serializing_if = "Option::is_none")]
    pub azimuth_degrees: Option<i32>,
}

/// A raw camera: one intrinsics entry paired with one extrinsics entry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawCamera {
    pub intrinsics: RawIntrinsics,
    pub extrinsics: RawExtrinsics,
}
