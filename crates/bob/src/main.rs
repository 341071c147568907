mod commands;
mod logging;

use bob_config::{DEFAULT_PORT, LogFormat, LogLevel};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "bob")]
#[command(
    about = "Bobfile から Docker イメージをビルドする (a.k.a. docker-builder)",
    long_about = None
)]
struct Cli {
    /// ログレベル (debug/d, info/i, warn/w, error/e)
    #[arg(
        short = 'l',
        long,
        global = true,
        env = "DOCKER_BUILDER_LOGLEVEL",
        default_value = "info"
    )]
    log_level: LogLevel,
    /// ログ形式 (text/t, json/j)
    #[arg(
        short = 'f',
        long,
        global = true,
        env = "DOCKER_BUILDER_LOGFORMAT",
        default_value = "text"
    )]
    log_format: LogFormat,
    /// 出力を抑制し、終了コードのみ返す
    #[arg(short, long, global = true)]
    quiet: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Bobfile からイメージをビルド
    Build {
        /// Bobfile のパス（省略時は自動検出）
        file: Option<PathBuf>,
        /// Bobfile の設定に関わらず push しない
        #[arg(long, env = "DOCKER_BUILDER_SKIPPUSH")]
        skip_push: bool,
    },
    /// Bobfile が解析可能か検証
    Lint {
        /// Bobfile のパス（省略時は自動検出）
        file: Option<PathBuf>,
    },
    /// ディレクトリに Bobfile を作成
    Init {
        /// 対象ディレクトリ
        #[arg(default_value = ".")]
        dir: PathBuf,
    },
    /// 現在のリポジトリのビルドをサーバーに投入
    Enqueue {
        /// Bobfile のパス（リポジトリルートからの相対パス）
        file: Option<String>,
        /// ビルドサーバーのURL
        #[arg(long, env = "DOCKER_BUILDER_HOST", default_value = "http://localhost:5000")]
        host: String,
    },
    /// ビルドリクエストを受け付けるHTTPサーバーを起動
    Serve(ServeArgs),
    /// バージョン情報を表示
    Version,
}

#[derive(clap::Args)]
pub struct ServeArgs {
    /// 待ち受けポート
    #[arg(short, long, env = "DOCKER_BUILDER_PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,
    /// Basic 認証のユーザー名
    #[arg(long, env = "DOCKER_BUILDER_USERNAME")]
    pub username: Option<String>,
    /// Basic 認証のパスワード
    #[arg(long, env = "DOCKER_BUILDER_PASSWORD")]
    pub password: Option<String>,
    /// GitHub API トークン（clone に使用）
    #[arg(short = 't', long, env = "DOCKER_BUILDER_APITOKEN")]
    pub api_token: Option<String>,
    /// Bobfile の設定に関わらず push しない
    #[arg(long, env = "DOCKER_BUILDER_SKIPPUSH")]
    pub skip_push: bool,
    /// sync 未指定のリクエストを同期実行する
    #[arg(long, env = "DOCKER_BUILDER_SYNC")]
    pub sync: bool,
    /// Travis CI webhook のトークン
    #[arg(long, env = "TRAVIS_TOKEN")]
    pub travis_token: Option<String>,
    /// GitHub webhook の署名（HMAC）検証シークレット
    #[arg(long, env = "GITHUB_SECRET")]
    pub github_secret: Option<String>,
    /// Travis CI webhook のルートを無効化
    #[arg(long)]
    pub no_travis: bool,
    /// GitHub webhook のルートを無効化
    #[arg(long)]
    pub no_github: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::init(cli.log_level, cli.log_format, cli.quiet);

    match cli.command {
        Commands::Build { file, skip_push } => {
            commands::build::handle(file, skip_push, cli.quiet).await?;
        }
        Commands::Lint { file } => {
            commands::lint::handle(file, cli.quiet)?;
        }
        Commands::Init { dir } => {
            commands::init::handle(&dir, cli.quiet)?;
        }
        Commands::Enqueue { file, host } => {
            commands::enqueue::handle(file, &host, cli.quiet).await?;
        }
        Commands::Serve(args) => {
            commands::serve::handle(args).await?;
        }
        Commands::Version => {
            println!("bob {}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}
