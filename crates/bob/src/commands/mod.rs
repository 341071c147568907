pub mod build;
pub mod enqueue;
pub mod init;
pub mod lint;
pub mod serve;

use bob_config::ConfigError;
use colored::Colorize;
use std::path::PathBuf;

/// 終了コード
pub mod exit_code {
    /// Bobfile を開けずパーサーを構築できない
    pub const PARSER_CONSTRUCT: i32 = 73;
    /// Bobfile の解析に失敗
    pub const PARSE: i32 = 23;
    /// ビルドに失敗
    pub const BUILD: i32 = 29;
    /// lint 対象のファイルが開けない
    pub const LINT_NOT_OPENABLE: i32 = 17;
    /// lint 対象の内容が不正
    pub const LINT_INVALID: i32 = 5;
}

/// エラーを表示して終了
pub fn fail(code: i32, message: impl std::fmt::Display, quiet: bool) -> ! {
    if !quiet {
        eprintln!("{} {}", "✗".red().bold(), message);
    }
    tracing::debug!(code, "Exiting");
    std::process::exit(code)
}

/// 引数で指定されたパス、なければカレントディレクトリから Bobfile を探す
pub fn locate_bobfile(file: Option<PathBuf>) -> Result<PathBuf, ConfigError> {
    match file {
        Some(path) => Ok(path),
        None => bob_config::find_bobfile(),
    }
}
