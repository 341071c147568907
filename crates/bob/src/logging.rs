use bob_config::{LogFormat, LogLevel};
use tracing_subscriber::EnvFilter;

/// ログ出力を初期化（stderr）
///
/// `RUST_LOG` が設定されている場合はそちらを優先します。
pub fn init(level: LogLevel, format: LogFormat, quiet: bool) {
    let level = if quiet { LogLevel::Error } else { level };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.as_filter()));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}
