use bob_core::EngineCommand;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BuildError {
    #[error("no command sub sequence set, cannot stage files")]
    NoSubSequenceBound,

    #[error("workdir has not been prepared")]
    WorkdirNotPrepared,

    #[error("improperly formed command: {0}")]
    MalformedCommand(String),

    #[error("failed to stage {path}: {source}")]
    Staging {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("command `{command}` failed with {status}")]
    CommandFailed {
        command: EngineCommand,
        status: String,
    },

    #[error("no image tagged with build id {0}")]
    ImageNotFound(String),

    #[error("`{0}` executable not found in PATH")]
    EngineNotFound(String),

    #[error("Docker connection error: {0}")]
    DockerConnection(#[from] bollard::errors::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl BuildError {
    /// ユーザー向けの分かりやすいエラーメッセージ
    pub fn user_message(&self) -> String {
        match self {
            BuildError::EngineNotFound(program) => format!(
                "{} が見つかりません\n\
                 \n\
                 PATH に docker CLI がインストールされているか確認してください。",
                program
            ),
            BuildError::DockerConnection(e) => format!(
                "Docker デーモンに接続できません: {}\n\
                 \n\
                 Docker が起動しているか確認してください。",
                e
            ),
            BuildError::Staging { path, .. } => format!(
                "ビルドコンテキストの準備に失敗しました: {}\n\
                 \n\
                 Bobfile の included / Dockerfile のパスを確認してください。",
                path.display()
            ),
            _ => self.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, BuildError>;
