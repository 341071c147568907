use bob_build::BuildError;
use bob_core::ManifestError;
use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum JobError {
    #[error("invalid job spec: {0}")]
    InvalidSpec(String),

    #[error("job not found: {0}")]
    NotFound(Uuid),

    #[error("failed to allocate job workdir: {0}")]
    Workdir(#[source] std::io::Error),

    #[error("failed to fetch source: {0}")]
    Fetch(String),

    #[error(transparent)]
    Parse(#[from] ManifestError),

    #[error(transparent)]
    Build(#[from] BuildError),

    #[error("job aborted: {0}")]
    Aborted(String),
}

pub type Result<T> = std::result::Result<T, JobError>;
