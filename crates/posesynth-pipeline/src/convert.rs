//! Converter from per-scene 3D/2D keypoint sources to dataset archives.
//!
//! Input layout: `<root>/<subject>/3D_positions/<scene>.json` and
//! `<root>/<subject>/2D_positions/<scene>.json`, each holding the scene's
//! keypoints as a flat or nested number array of `frames × 17 × D`.
//! 3D sources are in millimeters and are written in meters.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use log::{debug, info};
use posesynth_core::NUM_JOINTS;
use serde::Deserialize;

use crate::archive::{read_json, write_json, Archive2d, Archive3d, DatasetMetadata, Tensors};
use crate::error::PipelineError;

pub const SUBJECTS: [&str; 2] = ["Train", "Validate"];

const MILLIMETERS_PER_METER: f64 = 1000.0;

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum NumberTree {
    Number(f64),
    List(Vec<NumberTree>),
}

impl NumberTree {
    fn flatten_into(self, out: &mut Vec<f64>) {
        match self {
            NumberTree::Number(v) => out.push(v),
            NumberTree::List(items) => items.into_iter().for_each(|item| item.flatten_into(out)),
        }
    }
}

/// Keypoint values of one scene, flattened in frame, joint, axis order.
#[derive(Debug, Clone, PartialEq)]
pub struct SceneSource {
    pub name: String,
    pub values: Vec<f64>,
}

impl SceneSource {
    pub fn load(path: &Path) -> Result<Self, PipelineError> {
        let name = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_owned();
        let tree: NumberTree = read_json(path)?;
        let mut values = Vec::new();
        tree.flatten_into(&mut values);
        Ok(Self { name, values })
    }

    /// Split into frames of 17 `D`-vectors, dividing every value by
    /// `divisor`.
    pub fn reshape<const D: usize>(
        &self,
        divisor: f64,
    ) -> Result<Vec<[Option<[f32; D]>; NUM_JOINTS]>, PipelineError> {
        let stride = NUM_JOINTS * D;
        if self.values.len() % stride != 0 {
            return Err(PipelineError::MalformedSource {
                name: self.name.clone(),
                reason: format!("{} values is not a multiple of 17 x {D}", self.values.len()),
            });
        }
        Ok(self
            .values
            .chunks_exact(stride)
            .map(|frame| {
                let mut joints = [None; NUM_JOINTS];
                for (slot, joint) in frame.chunks_exact(D).enumerate() {
                    let mut p = [0f32; D];
                    for (dst, src) in p.iter_mut().zip(joint) {
                        *dst = (src / divisor) as f32;
                    }
                    joints[slot] = Some(p);
                }
                joints
            })
            .collect())
    }
}

/// 3D and 2D scene sources of one subject.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SubjectSources {
    pub scenes_3d: Vec<SceneSource>,
    pub scenes_2d: Vec<SceneSource>,
}

impl SubjectSources {
    /// Load `<dir>/3D_positions/*.json` and `<dir>/2D_positions/*.json`.
    /// A missing directory contributes no scenes.
    pub fn load(dir: &Path) -> Result<Self, PipelineError> {
        Ok(Self {
            scenes_3d: load_scenes(&dir.join("3D_positions"))?,
            scenes_2d: load_scenes(&dir.join("2D_positions"))?,
        })
    }
}

fn load_scenes(dir: &Path) -> Result<Vec<SceneSource>, PipelineError> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }
    let mut paths = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(PipelineError::io(dir))? {
        let path = entry.map_err(PipelineError::io(dir))?.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == "json") {
            paths.push(path);
        }
    }
    paths.sort();
    paths.iter().map(|p| SceneSource::load(p)).collect()
}

/// Build both archives. Unequal 3D/2D source counts for a subject abort
/// the conversion.
pub fn convert(
    subjects: &BTreeMap<String, SubjectSources>,
) -> Result<(Archive3d, Archive2d), PipelineError> {
    let mut positions_3d: Tensors<_> = BTreeMap::new();
    let mut positions_2d: Tensors<_> = BTreeMap::new();

    for (subject, sources) in subjects {
        if sources.scenes_3d.len() != sources.scenes_2d.len() {
            return Err(PipelineError::SourceCountMismatch {
                subject: subject.clone(),
                count_3d: sources.scenes_3d.len(),
                count_2d: sources.scenes_2d.len(),
            });
        }
        let out_3d = positions_3d.entry(subject.clone()).or_default();
        for scene in &sources.scenes_3d {
            out_3d.insert(scene.name.clone(), scene.reshape::<3>(MILLIMETERS_PER_METER)?);
        }
        let out_2d = positions_2d.entry(subject.clone()).or_default();
        for scene in &sources.scenes_2d {
            out_2d.insert(scene.name.clone(), scene.reshape::<2>(1.0)?);
        }
        debug!(
            "subject '{}': {} scenes converted",
            subject,
            sources.scenes_3d.len()
        );
    }

    Ok((
        Archive3d { positions_3d },
        Archive2d {
            positions_2d,
            metadata: DatasetMetadata::default(),
        },
    ))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConvertSummary {
    pub subjects: usize,
    pub scenes: usize,
}

/// Convert every subject in [`SUBJECTS`] under `input` and write the
/// archives. Existing outputs are never overwritten.
pub fn convert_dir(input: &Path, out_3d: &Path, out_2d: &Path) -> Result<ConvertSummary, PipelineError> {
    for out in [out_3d, out_2d] {
        if out.exists() {
            return Err(PipelineError::OutputExists(PathBuf::from(out)));
        }
    }

    let mut subjects = BTreeMap::new();
    for subject in SUBJECTS {
        subjects.insert(subject.to_owned(), SubjectSources::load(&input.join(subject))?);
    }
    let (archive_3d, archive_2d) = convert(&subjects)?;

    write_json(out_3d, &archive_3d, false)?;
    write_json(out_2d, &archive_2d, false)?;

    let summary = ConvertSummary {
        subjects: subjects.len(),
        scenes: subjects.values().map(|s| s.scenes_3d.len()).sum(),
    };
    info!(
        "converted {} scenes from {} subjects",
        summary.scenes, summary.subjects
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scene(name: &str, values: Vec<f64>) -> SceneSource {
        SceneSource {
            name: name.into(),
            values,
        }
    }

    #[test]
    fn reshape_scales_3d_to_meters() {
        let values: Vec<f64> = (0..2 * 17 * 3).map(|i| i as f64 * 10.0).collect();
        let frames = scene("s", values).reshape::<3>(1000.0).unwrap();
        assert_eq!(frames.len(), 2);
        let p = frames[1][1].unwrap();
        // frame 1, joint 1 starts at flat index 54
        assert!((p[0] - 0.54).abs() < 1e-6);
        assert!((p[2] - 0.56).abs() < 1e-6);
    }

    #[test]
    fn reshape_rejects_partial_frames() {
        let err = scene("bad", vec![0.0; 17 * 2 + 1]).reshape::<2>(1.0).unwrap_err();
        assert!(matches!(err, PipelineError::MalformedSource { ref name, .. } if name == "bad"));
    }

    #[test]
    fn count_mismatch_is_fatal() {
        let subjects = BTreeMap::from([(
            "Train".to_owned(),
            SubjectSources {
                scenes_3d: vec![scene("a", vec![0.0; 51]), scene("b", vec![0.0; 51])],
                scenes_2d: vec![scene("a", vec![0.0; 34])],
            },
        )]);
        let err = convert(&subjects).unwrap_err();
        assert!(matches!(
            err,
            PipelineError::SourceCountMismatch { count_3d: 2, count_2d: 1, .. }
        ));
    }

    #[test]
    fn nested_arrays_flatten_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scene_01.json");
        let frame: Vec<Vec<f64>> = (0..17).map(|j| vec![j as f64, -(j as f64)]).collect();
        std::fs::write(&path, serde_json::to_string(&vec![frame]).unwrap()).unwrap();

        let source = SceneSource::load(&path).unwrap();
        assert_eq!(source.name, "scene_01");
        assert_eq!(source.values.len(), 34);
        let frames = source.reshape::<2>(1.0).unwrap();
        assert_eq!(frames[0][16], Some([16.0, -16.0]));
    }
}
