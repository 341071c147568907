//! Bob jobs
//!
//! A job wraps one build trigger: it validates the request, fetches the
//! source tree, runs the parser and builder, and keeps its status and log
//! in memory for later queries. Webhook adapters translate GitHub and
//! Travis CI payloads into job specs.

pub mod error;
pub mod fetch;
pub mod job;
pub mod registry;
pub mod runner;
pub mod spec;
pub mod webhook;

pub use error::{JobError, Result};
pub use fetch::{GitFetcher, SourceFetcher};
pub use job::{Job, JobContext, JobSnapshot, JobStatus, Transition};
pub use registry::JobRegistry;
pub use runner::{ExecutionMode, JOB_WORKDIR_PREFIX, JobRunner, Submission};
pub use spec::{DEFAULT_BOBFILE, JobSpec, normalize_git_ref};
pub use webhook::WebhookError;
