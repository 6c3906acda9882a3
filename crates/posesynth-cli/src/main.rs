//! posesynth CLI: build synthetic 3D/2D pose datasets and convert
//! per-scene keypoint sources into dataset archives.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, ensure, Context, Result};
use clap::{Args, Parser, Subcommand};
use log::{info, warn};
use posesynth_core::synthetic::{camera_rig, HemispherePlacement, LensCamera, RandomShellPlacement};
use posesynth_core::{CameraRecord, Iso3, LengthUnit, Skeleton};
use posesynth_pipeline::archive::{write_annotations, write_json};
use posesynth_pipeline::convert::convert_dir;
use posesynth_pipeline::source::subsample_indices;
use posesynth_pipeline::{
    build, Archive2d, Archive3d, BuildReport, CameraSet, CameraTables, DatasetMetadata,
    PipelineConfig, RecordedSequence,
};
use serde::{Deserialize, Serialize};

const DATA_3D: &str = "data_3d.json";
const DATA_2D: &str = "data_2d.json";
const CAMERAS: &str = "cameras.json";
const ANNOTATIONS: &str = "pose.jsonl";

#[derive(Debug, Parser)]
#[command(name = "posesynth", version, about = "Synthetic 3D/2D human pose dataset generator")]
struct Cli {
    /// Log at debug level (RUST_LOG overrides).
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Project motion sequences through a camera rig and write the dataset.
    Generate(GenerateArgs),

    /// Convert Train/Validate 3D and 2D scene sources into archives.
    Convert(ConvertArgs),
}

#[derive(Debug, Clone, Args)]
struct GenerateArgs {
    /// Directory of motion sequences (`*.json`, one sequence per file).
    #[arg(long)]
    motion: PathBuf,

    /// Output directory; existing dataset files are never overwritten.
    #[arg(long)]
    out: PathBuf,

    /// Optional JSON generation config. Defaults are used if omitted.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Camera tables to use instead of the configured placement.
    #[arg(long)]
    cameras: Option<PathBuf>,

    /// Use only this many sequences, drawn with `--seed`.
    #[arg(long)]
    sequences: Option<usize>,

    #[arg(long, default_value_t = 0)]
    seed: u64,

    /// Also write per-frame annotations as JSON lines.
    #[arg(long)]
    annotations: bool,
}

#[derive(Debug, Clone, Args)]
struct ConvertArgs {
    /// Root containing `Train/` and `Validate/` source directories.
    #[arg(long)]
    input: PathBuf,

    #[arg(long)]
    out_3d: PathBuf,

    #[arg(long)]
    out_2d: PathBuf,
}

/// Camera layout used when no camera tables are given.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum Placement {
    Hemisphere(HemispherePlacement),
    RandomShell(RandomShellPlacement),
}

impl Default for Placement {
    fn default() -> Self {
        Placement::Hemisphere(HemispherePlacement::default())
    }
}

impl Placement {
    fn poses(&self) -> Result<Vec<Iso3>> {
        let poses = match self {
            Placement::Hemisphere(p) => p.poses(),
            Placement::RandomShell(p) => p.poses(),
        };
        poses.context("invalid camera placement")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
struct GenerateConfig {
    #[serde(flatten)]
    pipeline: PipelineConfig,
    #[serde(default)]
    placement: Placement,
    #[serde(default)]
    lens: LensCamera,
}

fn load_json_file<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let data =
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&data).with_context(|| format!("failed to parse {}", path.display()))
}

/// Every `*.json` sequence in `dir`, sorted by file name. A sequence
/// without an id takes its file stem.
fn load_sequences(dir: &Path) -> Result<Vec<RecordedSequence>> {
    let mut paths = Vec::new();
    for entry in fs::read_dir(dir).with_context(|| format!("failed to list {}", dir.display()))? {
        let path = entry?.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == "json") {
            paths.push(path);
        }
    }
    paths.sort();

    let mut sequences = Vec::with_capacity(paths.len());
    for path in paths {
        let mut seq: RecordedSequence = load_json_file(&path)?;
        if seq.id.is_empty() {
            seq.id = path
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or_default()
                .to_owned();
        }
        sequences.push(seq);
    }
    Ok(sequences)
}

fn placement_cameras(config: &GenerateConfig) -> Result<CameraSet> {
    let poses = config.placement.poses()?;
    let mut records = Vec::with_capacity(poses.len());
    for raw in camera_rig(&config.lens, &poses, LengthUnit::Meters) {
        match CameraRecord::normalize(raw, LengthUnit::Meters) {
            Ok(record) => records.push(record),
            Err(err) => warn!("dropping generated camera: {err}"),
        }
    }
    Ok(CameraSet::shared(records)?)
}

fn run_generate(args: &GenerateArgs) -> Result<BuildReport> {
    let config = match &args.config {
        Some(path) => load_json_file::<GenerateConfig>(path)?,
        None => GenerateConfig::default(),
    };

    let mut outputs = vec![DATA_3D, DATA_2D, CAMERAS];
    if args.annotations {
        outputs.push(ANNOTATIONS);
    }
    for name in &outputs {
        let path = args.out.join(name);
        if path.exists() {
            bail!("{} already exists", path.display());
        }
    }

    let mut sequences = load_sequences(&args.motion)?;
    ensure!(
        !sequences.is_empty(),
        "no motion sequences in {}",
        args.motion.display()
    );
    if let Some(amount) = args.sequences {
        let keep = subsample_indices(sequences.len(), amount, args.seed);
        sequences = keep.into_iter().map(|i| sequences[i].clone()).collect();
    }
    info!("{} motion sequences loaded", sequences.len());

    let cameras = match &args.cameras {
        Some(path) => load_json_file::<CameraTables>(path)?.resolve(config.pipeline.translation_unit)?,
        None => placement_cameras(&config)?,
    };
    ensure!(!cameras.is_empty(), "no usable cameras");

    let (dataset, report) = build(&sequences, &cameras, &config.pipeline)?;

    fs::create_dir_all(&args.out)
        .with_context(|| format!("failed to create {}", args.out.display()))?;
    let metadata = DatasetMetadata::for_skeleton(&Skeleton::h36m(), Some(config.pipeline.fps));
    write_json(&args.out.join(DATA_3D), &Archive3d::from_dataset(&dataset), false)?;
    write_json(
        &args.out.join(DATA_2D),
        &Archive2d::from_dataset(&dataset, metadata),
        false,
    )?;
    let tables = CameraTables::from_camera_set(&dataset.cameras, sequences.iter().map(|s| s.id.as_str()));
    write_json(&args.out.join(CAMERAS), &tables, false)?;
    if args.annotations {
        let lines = write_annotations(&args.out.join(ANNOTATIONS), &dataset, false)?;
        info!("{lines} annotations written");
    }
    Ok(report)
}

fn run_convert(args: &ConvertArgs) -> Result<()> {
    let summary = convert_dir(&args.input, &args.out_3d, &args.out_2d)?;
    info!(
        "wrote {} and {} ({} scenes)",
        args.out_3d.display(),
        args.out_2d.display(),
        summary.scenes
    );
    Ok(())
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default)).init();
}

fn main() {
    if let Err(err) = try_main() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

fn try_main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    match &cli.command {
        Commands::Generate(args) => {
            let report = run_generate(args)?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Commands::Convert(args) => run_convert(args)?,
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use posesynth_core::synthetic::turning_sequence;
    use posesynth_core::RigProfile;
    use posesynth_pipeline::archive::read_json;

    fn write_json_file<T: Serialize>(value: &T, path: &Path) {
        serde_json::to_writer_pretty(fs::File::create(path).unwrap(), value).unwrap();
    }

    fn motion_dir(dir: &Path, count: usize) -> PathBuf {
        let motion = dir.join("motion");
        fs::create_dir_all(&motion).unwrap();
        let rig = RigProfile::bandai();
        for i in 0..count {
            let seq = RecordedSequence::new("", turning_sequence(&rig, 3, 20.0 * i as f64));
            write_json_file(&seq, &motion.join(format!("clip_{i}.json")));
        }
        motion
    }

    fn generate_args(dir: &Path, motion: PathBuf) -> GenerateArgs {
        GenerateArgs {
            motion,
            out: dir.join("out"),
            config: None,
            cameras: None,
            sequences: None,
            seed: 0,
            annotations: true,
        }
    }

    #[test]
    fn generate_writes_every_output() {
        let dir = tempfile::tempdir().unwrap();
        let motion = motion_dir(dir.path(), 2);
        let args = generate_args(dir.path(), motion);

        let report = run_generate(&args).expect("generate should succeed");
        assert_eq!(report.units_total, 80);
        assert!(report.skipped.is_empty());

        let a3: Archive3d = read_json(&args.out.join(DATA_3D)).unwrap();
        assert_eq!(a3.positions_3d.len(), 2);
        assert_eq!(a3.positions_3d["clip_0"]["cam_000"].len(), 3);
        let a2: Archive2d = read_json(&args.out.join(DATA_2D)).unwrap();
        assert_eq!(a2.metadata.fps, Some(60));
        let cams: CameraTables = read_json(&args.out.join(CAMERAS)).unwrap();
        assert_eq!(cams.intrinsics.len(), 40);
        assert_eq!(cams.extrinsics["clip_1"].len(), 40);
        let lines = fs::read_to_string(args.out.join(ANNOTATIONS)).unwrap();
        assert_eq!(lines.lines().count(), 2 * 40 * 3);

        // second run refuses to overwrite
        let err = run_generate(&args).unwrap_err();
        assert!(err.to_string().contains("already exists"));
    }

    #[test]
    fn generate_with_config_and_subsampling() {
        let dir = tempfile::tempdir().unwrap();
        let motion = motion_dir(dir.path(), 4);
        let config_path = dir.path().join("config.json");
        fs::write(
            &config_path,
            r#"{
                "frame_policy": "keep_invalid",
                "placement": { "kind": "random_shell", "count": 5, "radius_min": 4.0,
                               "radius_max": 5.0, "min_elevation_deg": 5.0,
                               "max_elevation_deg": 30.0, "seed": 11 },
                "lens": { "resolution": { "width": 640, "height": 480 } }
            }"#,
        )
        .unwrap();
        let mut args = generate_args(dir.path(), motion);
        args.config = Some(config_path);
        args.sequences = Some(2);
        args.annotations = false;

        let report = run_generate(&args).unwrap();
        assert_eq!(report.units_total, 2 * 5);
        let cams: CameraTables = read_json(&args.out.join(CAMERAS)).unwrap();
        assert_eq!(cams.intrinsics.len(), 5);
        assert_eq!(cams.intrinsics[0].res_w, Some(640));
        assert!(!args.out.join(ANNOTATIONS).exists());
    }

    #[test]
    fn generated_cameras_can_drive_another_run() {
        let dir = tempfile::tempdir().unwrap();
        let motion = motion_dir(dir.path(), 1);
        let first = generate_args(dir.path(), motion.clone());
        run_generate(&first).unwrap();

        let mut second = generate_args(dir.path(), motion);
        second.out = dir.path().join("out2");
        second.cameras = Some(first.out.join(CAMERAS));
        let report = run_generate(&second).unwrap();
        assert_eq!(report.units_built, 40);

        let a: Archive2d = read_json(&first.out.join(DATA_2D)).unwrap();
        let b: Archive2d = read_json(&second.out.join(DATA_2D)).unwrap();
        assert_eq!(a.positions_2d, b.positions_2d);
    }

    #[test]
    fn convert_refuses_existing_output() {
        let dir = tempfile::tempdir().unwrap();
        let train = dir.path().join("Train");
        fs::create_dir_all(train.join("3D_positions")).unwrap();
        fs::create_dir_all(train.join("2D_positions")).unwrap();
        fs::write(train.join("3D_positions/s.json"), serde_json::to_string(&vec![1000.0; 51]).unwrap()).unwrap();
        fs::write(train.join("2D_positions/s.json"), serde_json::to_string(&vec![5.0; 34]).unwrap()).unwrap();

        let args = ConvertArgs {
            input: dir.path().to_path_buf(),
            out_3d: dir.path().join("d3.json"),
            out_2d: dir.path().join("d2.json"),
        };
        run_convert(&args).unwrap();
        let a3: Archive3d = read_json(&args.out_3d).unwrap();
        assert_eq!(a3.positions_3d["Train"]["s"][0][0], Some([1.0, 1.0, 1.0]));
        assert!(a3.positions_3d["Validate"].is_empty());

        assert!(run_convert(&args).is_err());
    }
}
