//! Camera tables: an intrinsics list combined with per-subject extrinsics.
//!
//! Entry `i` of every extrinsics list belongs to entry `i` of the
//! intrinsics list. The binding is positional, so list lengths are checked
//! and any `id` an extrinsics entry carries must match its partner.

use std::collections::{BTreeMap, BTreeSet};

use log::{debug, warn};
use posesynth_core::{CameraRecord, LengthUnit, RawCamera, RawExtrinsics, RawIntrinsics};
use serde::{Deserialize, Serialize};

use crate::error::PipelineError;

/// On-disk camera tables (`cameras.json`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CameraTables {
    /// Unit of the translations below; falls back to the run configuration.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub translation_unit: Option<LengthUnit>,
    pub intrinsics: Vec<RawIntrinsics>,
    /// Subject/sequence id → extrinsics aligned with `intrinsics`.
    #[serde(default)]
    pub extrinsics: BTreeMap<String, Vec<RawExtrinsics>>,
}

impl CameraTables {
    /// Check alignment and normalize every camera.
    ///
    /// Misaligned tables are fatal. A camera whose record is malformed for
    /// any subject is dropped for all subjects so the remaining lists stay
    /// aligned.
    pub fn resolve(self, default_unit: LengthUnit) -> Result<CameraSet, PipelineError> {
        let unit = self.translation_unit.unwrap_or(default_unit);
        let n = self.intrinsics.len();

        let mut seen = BTreeSet::new();
        for id in self.intrinsics.iter().filter_map(|i| i.id.as_deref()) {
            if !seen.insert(id) {
                return Err(PipelineError::DuplicateCamera(id.to_owned()));
            }
        }

        for (subject, list) in &self.extrinsics {
            if list.len() != n {
                return Err(PipelineError::CameraCountMismatch {
                    subject: subject.clone(),
                    intrinsics: n,
                    extrinsics: list.len(),
                });
            }
            for (index, (intr, extr)) in self.intrinsics.iter().zip(list).enumerate() {
                if let (Some(a), Some(b)) = (intr.id.as_deref(), extr.id.as_deref()) {
                    if a != b {
                        return Err(PipelineError::CameraIdMismatch {
                            subject: subject.clone(),
                            index,
                            intrinsics: a.to_owned(),
                            extrinsics: b.to_owned(),
                        });
                    }
                }
            }
        }
        debug!(
            "camera tables aligned: {} cameras x {} subjects",
            n,
            self.extrinsics.len()
        );

        let mut subjects: BTreeMap<String, Vec<Option<CameraRecord>>> = BTreeMap::new();
        let mut dropped = vec![false; n];
        for (subject, list) in self.extrinsics {
            let mut records = Vec::with_capacity(n);
            for (index, extrinsics) in list.into_iter().enumerate() {
                let raw = RawCamera {
                    intrinsics: self.intrinsics[index].clone(),
                    extrinsics,
                };
                match CameraRecord::normalize(raw, unit) {
                    Ok(record) => records.push(Some(record)),
                    Err(err) => {
                        warn!("dropping camera {index} (subject '{subject}'): {err}");
                        dropped[index] = true;
                        records.push(None);
                    }
                }
            }
            subjects.insert(subject, records);
        }

        let table_indices = (0..n).filter(|&index| !dropped[index]).collect();
        let subjects = subjects
            .into_iter()
            .map(|(subject, records)| {
                let kept = records
                    .into_iter()
                    .zip(&dropped)
                    .filter(|(_, dropped)| !**dropped)
                    .filter_map(|(record, _)| record)
                    .collect();
                (subject, kept)
            })
            .collect();
        Ok(CameraSet {
            shared: Vec::new(),
            subjects,
            table_indices,
        })
    }

    /// Tables describing `set` for the given sequences, translations in
    /// meters.
    pub fn from_camera_set<'a>(set: &CameraSet, sequence_ids: impl IntoIterator<Item = &'a str>) -> Self {
        let intrinsics = set
            .reference_records()
            .iter()
            .map(CameraRecord::to_raw_intrinsics)
            .collect();
        let extrinsics = sequence_ids
            .into_iter()
            .filter_map(|id| {
                let records = set.for_sequence(id);
                (!records.is_empty()).then(|| {
                    (
                        id.to_owned(),
                        records.iter().map(CameraRecord::to_raw_extrinsics).collect(),
                    )
                })
            })
            .collect();
        Self {
            translation_unit: Some(LengthUnit::Meters),
            intrinsics,
            extrinsics,
        }
    }
}

/// Normalized cameras, either shared by every sequence or listed per
/// subject. All lists carry the same camera ids in the same order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CameraSet {
    shared: Vec<CameraRecord>,
    subjects: BTreeMap<String, Vec<CameraRecord>>,
    /// Position of each kept camera in the tables it was loaded from.
    table_indices: Vec<usize>,
}

impl CameraSet {
    /// One rig used for every sequence.
    pub fn shared(records: Vec<CameraRecord>) -> Result<Self, PipelineError> {
        let mut seen = BTreeSet::new();
        for record in &records {
            if !seen.insert(record.id()) {
                return Err(PipelineError::DuplicateCamera(record.id().to_owned()));
            }
        }
        Ok(Self {
            table_indices: (0..records.len()).collect(),
            shared: records,
            subjects: BTreeMap::new(),
        })
    }

    /// Cameras for `sequence_id`: its own list when the tables name it,
    /// otherwise the shared rig (possibly empty).
    pub fn for_sequence(&self, sequence_id: &str) -> &[CameraRecord] {
        self.subjects
            .get(sequence_id)
            .map_or(self.shared.as_slice(), Vec::as_slice)
    }

    /// Cameras for `sequence_id` paired with their table index.
    ///
    /// The index is the camera's position in the source tables, which is
    /// stable when malformed cameras were dropped during [`CameraTables::resolve`].
    pub fn placements(&self, sequence_id: &str) -> impl Iterator<Item = (usize, &CameraRecord)> {
        self.table_indices
            .iter()
            .copied()
            .zip(self.for_sequence(sequence_id))
    }

    /// Subject ids that carry their own camera list.
    pub fn subjects(&self) -> impl Iterator<Item = &str> {
        self.subjects.keys().map(String::as_str)
    }

    /// Camera ids in rig order.
    pub fn camera_ids(&self) -> Vec<&str> {
        self.reference_records().iter().map(CameraRecord::id).collect()
    }

    /// `true` when no camera survived loading.
    pub fn is_empty(&self) -> bool {
        self.reference_records().is_empty()
    }

    fn reference_records(&self) -> &[CameraRecord] {
        if !self.shared.is_empty() {
            return &self.shared;
        }
        self.subjects.values().next().map(Vec::as_slice).unwrap_or(&[])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn intrinsics(id: &str) -> RawIntrinsics {
        RawIntrinsics {
            id: Some(id.into()),
            center: Some(vec![960.0, 540.0]),
            focal_length: Some(vec![1280.0, 1080.0]),
            radial_distortion: None,
            tangential_distortion: None,
            res_w: Some(1920),
            res_h: Some(1080),
        }
    }

    fn extrinsics(x_mm: f64) -> RawExtrinsics {
        RawExtrinsics {
            id: None,
            orientation: Some(vec![1.0, 0.0, 0.0, 0.0]),
            translation: Some(vec![x_mm, 0.0, 5000.0]),
            azimuth_degrees: None,
        }
    }

    fn tables() -> CameraTables {
        CameraTables {
            translation_unit: None,
            intrinsics: vec![intrinsics("a"), intrinsics("b")],
            extrinsics: [
                ("S1".to_owned(), vec![extrinsics(0.0), extrinsics(1000.0)]),
                ("S2".to_owned(), vec![extrinsics(-1000.0), extrinsics(2000.0)]),
            ]
            .into(),
        }
    }

    #[test]
    fn lists_combine_positionally() {
        let set = tables().resolve(LengthUnit::Millimeters).unwrap();
        assert_eq!(set.camera_ids(), vec!["a", "b"]);
        let s2 = set.for_sequence("S2");
        assert_eq!(s2[0].id(), "a");
        assert!((s2[0].translation().x + 1.0).abs() < 1e-12);
        assert!((s2[1].translation().x - 2.0).abs() < 1e-12);
        assert!(set.for_sequence("S3").is_empty());
    }

    #[test]
    fn reordering_intrinsics_changes_camera_identity() {
        let mut t = tables();
        t.intrinsics.reverse();
        let set = t.resolve(LengthUnit::Millimeters).unwrap();
        assert_eq!(set.for_sequence("S1")[0].id(), "b");
        assert!(set.for_sequence("S1")[0].translation().x.abs() < 1e-12);
    }

    #[test]
    fn unequal_lengths_are_fatal() {
        let mut t = tables();
        t.extrinsics.get_mut("S2").unwrap().pop();
        let err = t.resolve(LengthUnit::Millimeters).unwrap_err();
        assert!(matches!(
            err,
            PipelineError::CameraCountMismatch { ref subject, intrinsics: 2, extrinsics: 1 } if subject == "S2"
        ));
    }

    #[test]
    fn mismatched_extrinsics_id_is_fatal() {
        let mut t = tables();
        t.extrinsics.get_mut("S1").unwrap()[1].id = Some("a".into());
        let err = t.resolve(LengthUnit::Millimeters).unwrap_err();
        assert!(matches!(err, PipelineError::CameraIdMismatch { index: 1, .. }));

        let mut t = tables();
        t.extrinsics.get_mut("S1").unwrap()[1].id = Some("b".into());
        assert!(t.resolve(LengthUnit::Millimeters).is_ok());
    }

    #[test]
    fn malformed_camera_is_dropped_everywhere() {
        let mut t = tables();
        t.extrinsics.get_mut("S1").unwrap()[0].orientation = None;
        let set = t.resolve(LengthUnit::Millimeters).unwrap();
        assert_eq!(set.camera_ids(), vec!["b"]);
        assert_eq!(set.for_sequence("S1").len(), 1);
        assert_eq!(set.for_sequence("S2").len(), 1);
        assert_eq!(set.for_sequence("S2")[0].id(), "b");

        let placed: Vec<(usize, &str)> = set
            .placements("S2")
            .map(|(index, record)| (index, record.id()))
            .collect();
        assert_eq!(placed, vec![(1, "b")]);
    }

    #[test]
    fn duplicate_ids_are_fatal() {
        let mut t = tables();
        t.intrinsics[1].id = Some("a".into());
        assert!(matches!(
            t.resolve(LengthUnit::Millimeters),
            Err(PipelineError::DuplicateCamera(id)) if id == "a"
        ));
    }

    #[test]
    fn written_tables_resolve_to_the_same_cameras() {
        let set = tables().resolve(LengthUnit::Millimeters).unwrap();
        let written = CameraTables::from_camera_set(&set, ["S1", "S2"]);
        assert_eq!(written.translation_unit, Some(LengthUnit::Meters));
        assert_eq!(written.extrinsics["S1"][1].azimuth_degrees, Some(0));

        let json = serde_json::to_string(&written).unwrap();
        let back: CameraTables = serde_json::from_str(&json).unwrap();
        // the recorded unit wins over the caller's default
        let reread = back.resolve(LengthUnit::Millimeters).unwrap();
        assert!((reread.for_sequence("S1")[1].translation().x - 1.0).abs() < 1e-12);
        assert_eq!(reread.camera_ids(), set.camera_ids());
    }

    #[test]
    fn shared_rig_serves_every_sequence() {
        let record = CameraRecord::normalize(
            RawCamera {
                intrinsics: intrinsics("a"),
                extrinsics: extrinsics(0.0),
            },
            LengthUnit::Millimeters,
        )
        .unwrap();
        let set = CameraSet::shared(vec![record.clone()]).unwrap();
        assert_eq!(set.for_sequence("anything").len(), 1);
        assert!(CameraSet::shared(vec![record.clone(), record]).is_err());
    }
}
