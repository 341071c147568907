use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ManifestError {
    #[error("{path} is not openable: {source}")]
    NotOpenable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Bobfile decode error: {0}")]
    Decode(String),

    #[error("unsupported Bobfile version: {0} (supported: 0, 1)")]
    UnsupportedVersion(i64),

    #[error("unable to resolve tag '{tag}': {message}")]
    TagResolution { tag: String, message: String },

    #[error("container section #{index} has neither a project nor a name")]
    MissingProject { index: usize },
}

impl From<toml::de::Error> for ManifestError {
    fn from(err: toml::de::Error) -> Self {
        ManifestError::Decode(err.to_string())
    }
}

impl ManifestError {
    /// ファイルを開けなかったことによるエラーかどうか
    pub fn is_not_openable(&self) -> bool {
        matches!(self, ManifestError::NotOpenable { .. })
    }
}

pub type Result<T> = std::result::Result<T, ManifestError>;
