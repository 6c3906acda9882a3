use std::cell::RefCell;

use posesynth_core::synthetic::{camera_rig, turning_sequence, HemispherePlacement, LensCamera};
use posesynth_core::{
    BoneFrame, BoneMapping, BoneSample, CameraRecord, ClipRange, LengthUnit, Pt2, Pt3, RawCamera,
    RawExtrinsics, RawIntrinsics, RigProfile,
};
use posesynth_pipeline::archive::{write_annotations, write_json};
use posesynth_pipeline::{
    build, Archive2d, Archive3d, CameraSet, CameraTables, DatasetMetadata, FrameKeepPolicy,
    MotionSource, PipelineConfig, PipelineError, RecordedSequence, SkipReason, SourceError,
};

/// 1920x1080 camera at (0, 0, 5) m looking down −Z at the origin.
fn overhead_camera(id: &str) -> RawCamera {
    RawCamera {
        intrinsics: RawIntrinsics {
            id: Some(id.into()),
            center: Some(vec![960.0, 540.0]),
            focal_length: Some(vec![1280.0, 1280.0]),
            radial_distortion: None,
            tangential_distortion: None,
            res_w: Some(1920),
            res_h: Some(1080),
        },
        extrinsics: RawExtrinsics {
            id: None,
            orientation: Some(vec![1.0, 0.0, 0.0, 0.0]),
            translation: Some(vec![0.0, 0.0, 5000.0]),
            azimuth_degrees: None,
        },
    }
}

fn hip_rig() -> RigProfile {
    RigProfile {
        name: "hip-only".into(),
        mapping: BoneMapping::from_pairs([("pelvis", "Hip")]),
        use_head: ["pelvis".to_owned()].into(),
        ignored_bones: Default::default(),
    }
}

fn single_bone_sequence(id: &str, at: Pt3, frames: usize) -> RecordedSequence {
    let frame = [("pelvis", BoneSample::point(at))].into_iter().collect();
    RecordedSequence::new(id, vec![frame; frames])
}

#[test]
fn single_hip_bone_lands_at_image_centre() {
    let record = CameraRecord::normalize(overhead_camera("top"), LengthUnit::Millimeters).unwrap();
    let cameras = CameraSet::shared(vec![record]).unwrap();
    let config = PipelineConfig {
        rig: hip_rig(),
        frame_policy: FrameKeepPolicy::KeepInvalid,
        ..Default::default()
    };
    let sequences = [single_bone_sequence("S1", Pt3::origin(), 1)];

    let (dataset, report) = build(&sequences, &cameras, &config).unwrap();
    assert_eq!(report.units_built, 1);
    let frames = dataset.frames("S1", "top").unwrap();
    assert_eq!(frames.len(), 1);
    let frame = &frames[0];
    assert_eq!(frame.positions_3d[0], Some(Pt3::origin()));
    assert_eq!(frame.positions_2d[0], Some(Pt2::new(960.0, 540.0)));
    for slot in 1..17 {
        assert_eq!(frame.positions_2d[slot], None);
        assert_eq!(frame.positions_3d[slot], None);
    }
}

#[test]
fn drop_policy_skips_incomplete_frames_and_reports_empty_sequence() {
    let record = CameraRecord::normalize(overhead_camera("top"), LengthUnit::Millimeters).unwrap();
    let cameras = CameraSet::shared(vec![record]).unwrap();
    let config = PipelineConfig {
        rig: hip_rig(),
        ..Default::default()
    };
    let sequences = [single_bone_sequence("S1", Pt3::origin(), 3)];

    let (dataset, report) = build(&sequences, &cameras, &config).unwrap();
    assert!(dataset.sequences.is_empty());
    assert_eq!(report.units_total, 1);
    assert_eq!(report.units_built, 0);
    assert_eq!(report.skipped.len(), 1);
    assert_eq!(report.skipped[0].reason, SkipReason::EmptySequence { dropped: 3 });
    assert_eq!(report.frames_kept, 0);
    assert_eq!(report.frames_dropped, 3);
}

/// Serves one pelvis bone and records which camera placements were asked for.
struct PlacementLog {
    inner: RecordedSequence,
    cameras_asked: RefCell<Vec<usize>>,
}

impl MotionSource for PlacementLog {
    fn sequence_id(&self) -> &str {
        self.inner.sequence_id()
    }

    fn frame_count(&self) -> usize {
        self.inner.frame_count()
    }

    fn bone_frame(&self, frame: usize, camera: usize) -> Result<BoneFrame, SourceError> {
        self.cameras_asked.borrow_mut().push(camera);
        self.inner.bone_frame(frame, camera)
    }
}

#[test]
fn host_is_asked_for_table_index_after_a_camera_is_dropped() {
    let mut broken = overhead_camera("a");
    broken.extrinsics.orientation = None;
    let kept = overhead_camera("b");
    let tables = CameraTables {
        translation_unit: None,
        intrinsics: vec![broken.intrinsics, kept.intrinsics],
        extrinsics: [("S1".to_owned(), vec![broken.extrinsics, kept.extrinsics])].into(),
    };
    let cameras = tables.resolve(LengthUnit::Millimeters).unwrap();
    assert_eq!(cameras.camera_ids(), vec!["b"]);

    let config = PipelineConfig {
        rig: hip_rig(),
        frame_policy: FrameKeepPolicy::KeepInvalid,
        ..Default::default()
    };
    let sequences = [PlacementLog {
        inner: single_bone_sequence("S1", Pt3::origin(), 2),
        cameras_asked: RefCell::new(Vec::new()),
    }];

    let (dataset, report) = build(&sequences, &cameras, &config).unwrap();
    assert_eq!(report.units_built, 1);
    assert_eq!(dataset.frames("S1", "b").map(<[_]>::len), Some(2));
    assert_eq!(*sequences[0].cameras_asked.borrow(), vec![1, 1]);
}

#[test]
fn unusable_clip_range_fails_the_build() {
    let record = CameraRecord::normalize(overhead_camera("top"), LengthUnit::Millimeters).unwrap();
    let cameras = CameraSet::shared(vec![record]).unwrap();
    let config = PipelineConfig {
        rig: hip_rig(),
        frame_policy: FrameKeepPolicy::KeepInvalid,
        clip: ClipRange { near: 1.0, far: 1.0 },
        ..Default::default()
    };
    let sequences = [single_bone_sequence("S1", Pt3::origin(), 1)];

    let err = build(&sequences, &cameras, &config).unwrap_err();
    assert!(matches!(
        err,
        PipelineError::InvalidClipRange(clip) if clip.near == 1.0 && clip.far == 1.0
    ));

    let parsed: Result<PipelineConfig, _> =
        serde_json::from_str(r#"{ "clip": { "near": 1.0, "far": 1.0 } }"#);
    assert!(parsed.is_err());
}

#[test]
fn unmapped_bone_skips_the_sequence_but_not_the_batch() {
    let record = CameraRecord::normalize(overhead_camera("top"), LengthUnit::Millimeters).unwrap();
    let cameras = CameraSet::shared(vec![record]).unwrap();
    let config = PipelineConfig {
        rig: hip_rig(),
        frame_policy: FrameKeepPolicy::KeepInvalid,
        ..Default::default()
    };
    let bad_frame = [
        ("pelvis", BoneSample::point(Pt3::origin())),
        ("tail", BoneSample::point(Pt3::origin())),
    ]
    .into_iter()
    .collect();
    let sequences = [
        RecordedSequence::new("A_bad", vec![bad_frame]),
        single_bone_sequence("B_good", Pt3::origin(), 2),
    ];

    let (dataset, report) = build(&sequences, &cameras, &config).unwrap();
    assert_eq!(dataset.sequence_ids().collect::<Vec<_>>(), vec!["B_good"]);
    assert_eq!(dataset.total_frames(), 2);
    assert_eq!(report.skipped.len(), 1);
    assert_eq!(report.skipped[0].sequence, "A_bad");
    assert!(matches!(report.skipped[0].reason, SkipReason::UnmappedJoint(ref msg) if msg.contains("tail")));
}

#[test]
fn duplicate_sequence_ids_are_fatal() {
    let cameras = CameraSet::default();
    let sequences = [
        single_bone_sequence("S1", Pt3::origin(), 1),
        single_bone_sequence("S1", Pt3::origin(), 1),
    ];
    let err = build(&sequences, &cameras, &PipelineConfig::default()).unwrap_err();
    assert!(matches!(err, PipelineError::DuplicateSequence(id) if id == "S1"));
}

#[test]
fn sequence_without_cameras_is_reported() {
    let sequences = [single_bone_sequence("S1", Pt3::origin(), 1)];
    let (dataset, report) = build(&sequences, &CameraSet::default(), &PipelineConfig::default()).unwrap();
    assert!(dataset.sequences.is_empty());
    assert_eq!(report.units_total, 0);
    assert_eq!(report.skipped[0].reason, SkipReason::NoCameras);
    assert_eq!(report.skipped[0].camera, None);
}

#[test]
fn unequal_camera_tables_fail_the_build() {
    let mut tables = CameraTables {
        translation_unit: None,
        intrinsics: vec![
            overhead_camera("a").intrinsics,
            overhead_camera("b").intrinsics,
        ],
        extrinsics: Default::default(),
    };
    tables.extrinsics.insert(
        "S1".into(),
        vec![overhead_camera("a").extrinsics],
    );
    let err = tables.resolve(LengthUnit::Millimeters).unwrap_err();
    assert!(matches!(
        err,
        PipelineError::CameraCountMismatch { intrinsics: 2, extrinsics: 1, .. }
    ));
}

#[test]
fn dome_rig_sees_the_whole_turning_subject() {
    let rig = RigProfile::bandai();
    let placement = HemispherePlacement::default();
    let poses = placement.poses().unwrap();
    let raw = camera_rig(&LensCamera::default(), &poses, LengthUnit::Millimeters);
    let records = raw
        .into_iter()
        .map(|r| CameraRecord::normalize(r, LengthUnit::Millimeters).unwrap())
        .collect();
    let cameras = CameraSet::shared(records).unwrap();
    let config = PipelineConfig::default();
    let sequences = [RecordedSequence::new("turn", turning_sequence(&rig, 4, 30.0))];

    let (dataset, report) = build(&sequences, &cameras, &config).unwrap();
    assert_eq!(report.units_total, 40);
    assert_eq!(report.units_built, 40);
    assert_eq!(report.frames_dropped, 0);
    assert_eq!(dataset.total_frames(), 40 * 4);
    for (_, frames) in &dataset.sequences["turn"] {
        assert!(frames.iter().all(|f| f.is_complete()));
    }

    let dir = tempfile::tempdir().unwrap();
    let meta = DatasetMetadata::for_skeleton(&Default::default(), Some(config.fps));
    write_json(&dir.path().join("data_3d.json"), &Archive3d::from_dataset(&dataset), false).unwrap();
    write_json(
        &dir.path().join("data_2d.json"),
        &Archive2d::from_dataset(&dataset, meta),
        false,
    )
    .unwrap();
    let tables = CameraTables::from_camera_set(&dataset.cameras, dataset.sequence_ids());
    assert_eq!(tables.intrinsics.len(), 40);
    assert_eq!(tables.extrinsics["turn"].len(), 40);
    let lines = write_annotations(&dir.path().join("pose.jsonl"), &dataset, false).unwrap();
    assert_eq!(lines, 160);
    assert_eq!(sequences[0].frame_count(), 4);
}
