//! Bob build executor
//!
//! This crate runs a parsed command sequence against the docker CLI:
//! preparing a workdir per unit, staging the build context, and
//! propagating the built image id into tag commands.

pub mod builder;
pub mod context;
pub mod engine;
pub mod error;
pub mod output;
pub mod workdir;

pub use builder::{Builder, BuilderConfig, BuiltImage};
pub use context::ContextStager;
pub use engine::{ContainerEngine, DockerEngine};
pub use error::{BuildError, Result};
pub use output::{ConsoleSink, OutputSink, OutputStream};
pub use workdir::{WORKDIR_PREFIX, WorkdirMode};
