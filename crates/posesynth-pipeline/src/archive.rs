//! On-disk dataset schema.
//!
//! - 3D archive: `{ "positions_3d": { seq: { camera: [frames][17][3] } } }`,
//!   meters;
//! - 2D archive: `{ "positions_2d": { seq: { camera: [frames][17][2] } },
//!   "metadata": { "num_joints": 17, "keypoints_symmetry": [[..], [..]] } }`,
//!   pixels;
//! - invalid keypoints are `null`;
//! - annotations: one JSON object per line and per (sequence, camera, frame).

use std::collections::BTreeMap;
use std::fs::{File, OpenOptions};
use std::io::{BufReader, BufWriter, ErrorKind, Write};
use std::path::Path;

use posesynth_core::{KeypointFrame, Skeleton, NUM_JOINTS};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::aggregator::Dataset;
use crate::error::PipelineError;

pub type Joints3d = [Option<[f32; 3]>; NUM_JOINTS];
pub type Joints2d = [Option<[f32; 2]>; NUM_JOINTS];

/// Sequence id → camera/scene id → per-frame joints.
pub type Tensors<T> = BTreeMap<String, BTreeMap<String, Vec<T>>>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetMetadata {
    pub num_joints: usize,
    pub keypoints_symmetry: [Vec<usize>; 2],
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fps: Option<u32>,
}

impl DatasetMetadata {
    pub fn for_skeleton(skeleton: &Skeleton, fps: Option<u32>) -> Self {
        Self {
            num_joints: skeleton.num_joints(),
            keypoints_symmetry: skeleton.keypoints_symmetry(),
            fps,
        }
    }
}

impl Default for DatasetMetadata {
    fn default() -> Self {
        Self::for_skeleton(&Skeleton::h36m(), None)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Archive3d {
    pub positions_3d: Tensors<Joints3d>,
}

impl Archive3d {
    pub fn from_dataset(dataset: &Dataset) -> Self {
        Self {
            positions_3d: tensors(dataset, KeypointFrame::to_f32_3d),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Archive2d {
    pub positions_2d: Tensors<Joints2d>,
    pub metadata: DatasetMetadata,
}

impl Archive2d {
    pub fn from_dataset(dataset: &Dataset, metadata: DatasetMetadata) -> Self {
        Self {
            positions_2d: tensors(dataset, KeypointFrame::to_f32_2d),
            metadata,
        }
    }
}

fn tensors<T>(dataset: &Dataset, f: impl Fn(&KeypointFrame) -> T) -> Tensors<T> {
    dataset
        .sequences
        .iter()
        .map(|(seq, cams)| {
            let cams = cams
                .iter()
                .map(|(cam, frames)| (cam.clone(), frames.iter().map(&f).collect()))
                .collect();
            (seq.clone(), cams)
        })
        .collect()
}

/// One line of the annotation file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    pub sequence: String,
    pub camera: String,
    pub frame: usize,
    pub keypoints_2d: Joints2d,
    pub keypoints_3d: Joints3d,
}

/// Create `path` for writing; an existing file is an error unless
/// `overwrite` is set.
fn create(path: &Path, overwrite: bool) -> Result<File, PipelineError> {
    let mut options = OpenOptions::new();
    options.write(true);
    if overwrite {
        options.create(true).truncate(true);
    } else {
        options.create_new(true);
    }
    options.open(path).map_err(|err| match err.kind() {
        ErrorKind::AlreadyExists => PipelineError::OutputExists(path.to_path_buf()),
        _ => PipelineError::Io {
            path: path.to_path_buf(),
            source: err,
        },
    })
}

pub fn write_json<T: Serialize>(path: &Path, value: &T, overwrite: bool) -> Result<(), PipelineError> {
    let mut writer = BufWriter::new(create(path, overwrite)?);
    serde_json::to_writer(&mut writer, value).map_err(PipelineError::json(path))?;
    writer.flush().map_err(PipelineError::io(path))
}

pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, PipelineError> {
    let file = File::open(path).map_err(PipelineError::io(path))?;
    serde_json::from_reader(BufReader::new(file)).map_err(PipelineError::json(path))
}

/// Write every kept frame as one JSON line; returns the number of lines.
pub fn write_annotations(path: &Path, dataset: &Dataset, overwrite: bool) -> Result<usize, PipelineError> {
    let mut writer = BufWriter::new(create(path, overwrite)?);
    let mut count = 0;
    for (sequence, cams) in &dataset.sequences {
        for (camera, frames) in cams {
            for frame in frames {
                let line = Annotation {
                    sequence: sequence.clone(),
                    camera: camera.clone(),
                    frame: frame.frame_index,
                    keypoints_2d: frame.to_f32_2d(),
                    keypoints_3d: frame.to_f32_3d(),
                };
                serde_json::to_writer(&mut writer, &line).map_err(PipelineError::json(path))?;
                writer.write_all(b"\n").map_err(PipelineError::io(path))?;
                count += 1;
            }
        }
    }
    writer.flush().map_err(PipelineError::io(path))?;
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use posesynth_core::{Pt2, Pt3};

    fn dataset() -> Dataset {
        let mut frame = KeypointFrame::empty(7);
        frame.positions_3d[0] = Some(Pt3::new(0.25, -0.5, 1.0));
        frame.positions_2d[0] = Some(Pt2::new(960.0, 540.0));
        let mut ds = Dataset::default();
        ds.sequences
            .entry("walk".into())
            .or_default()
            .insert("cam_000".into(), vec![frame]);
        ds
    }

    #[test]
    fn metadata_matches_canonical_symmetry() {
        let meta = DatasetMetadata::default();
        assert_eq!(meta.num_joints, 17);
        assert_eq!(
            serde_json::to_value(&meta).unwrap(),
            serde_json::json!({
                "num_joints": 17,
                "keypoints_symmetry": [[4, 5, 6, 11, 12, 13], [1, 2, 3, 14, 15, 16]]
            })
        );
    }

    #[test]
    fn archives_nest_sequence_then_camera() {
        let ds = dataset();
        let a3 = serde_json::to_value(Archive3d::from_dataset(&ds)).unwrap();
        assert_eq!(a3["positions_3d"]["walk"]["cam_000"][0][0], serde_json::json!([0.25, -0.5, 1.0]));
        assert!(a3["positions_3d"]["walk"]["cam_000"][0][1].is_null());

        let a2 = Archive2d::from_dataset(&ds, DatasetMetadata::default());
        let v = serde_json::to_value(&a2).unwrap();
        assert_eq!(v["positions_2d"]["walk"]["cam_000"][0][0], serde_json::json!([960.0, 540.0]));
        assert_eq!(v["metadata"]["num_joints"], 17);
    }

    #[test]
    fn existing_outputs_are_not_overwritten() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data_3d.json");
        write_json(&path, &Archive3d::from_dataset(&dataset()), false).unwrap();
        let err = write_json(&path, &Archive3d::default(), false).unwrap_err();
        assert!(matches!(err, PipelineError::OutputExists(p) if p == path));

        let back: Archive3d = read_json(&path).unwrap();
        assert_eq!(back.positions_3d["walk"]["cam_000"].len(), 1);

        write_json(&path, &Archive3d::default(), true).unwrap();
        let back: Archive3d = read_json(&path).unwrap();
        assert!(back.positions_3d.is_empty());
    }

    #[test]
    fn annotations_are_one_object_per_line() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pose.jsonl");
        assert_eq!(write_annotations(&path, &dataset(), false).unwrap(), 1);
        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines.len(), 1);
        let record: Annotation = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(record.sequence, "walk");
        assert_eq!(record.frame, 7);
        assert_eq!(record.keypoints_2d[0], Some([960.0, 540.0]));
    }
}
