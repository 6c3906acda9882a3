//! Dataset building for `posesynth`.
//!
//! This crate turns animated rigs and camera tables into paired 3D/2D
//! keypoint datasets:
//! - [`config`]: the immutable per-run [`PipelineConfig`],
//! - [`source`]: the pull-based motion source interface,
//! - [`sampler`]: bones of one frame → 17 canonical keypoints,
//! - [`cameras`]: positional camera tables → normalized camera sets,
//! - [`aggregator`]: (sequence, camera) units folded into a [`Dataset`],
//! - [`archive`]: the on-disk schema and annotation export,
//! - [`convert`]: per-scene 3D/2D sources → archives.
//!
//! ```ignore
//! use posesynth_pipeline::{build, CameraTables, PipelineConfig, RecordedSequence};
//!
//! let config = PipelineConfig::default();
//! let cameras = tables.resolve(config.translation_unit)?;
//! let (dataset, report) = build(&sequences, &cameras, &config)?;
//! ```

pub mod aggregator;
pub mod archive;
pub mod cameras;
pub mod config;
pub mod convert;
mod error;
pub mod sampler;
pub mod source;

pub use aggregator::{build, build_unit, BuildReport, Dataset, SkipReason, SkippedUnit, UnitFrames};
pub use archive::{Annotation, Archive2d, Archive3d, DatasetMetadata};
pub use cameras::{CameraSet, CameraTables};
pub use config::{FrameKeepPolicy, PipelineConfig};
pub use error::PipelineError;
pub use sampler::{assemble_frame, keep_frame};
pub use source::{MotionSource, RecordedSequence, SourceError};
