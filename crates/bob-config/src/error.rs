use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error(
        "Bobfile が見つかりません。以下の場所を確認してください:\n\
        - カレントディレクトリ: Bobfile, Bobfile.toml, bob.toml\n\
        - ./.bob/ ディレクトリ\n\
        または BOBFILE_PATH 環境変数で直接指定できます"
    )]
    BobfileNotFound,

    #[error("invalid log level '{0}' (expected debug, info, warn or error)")]
    InvalidLogLevel(String),

    #[error("invalid log format '{0}' (expected text or json)")]
    InvalidLogFormat(String),

    #[error("IO エラー: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ConfigError>;
