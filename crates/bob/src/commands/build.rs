use super::{exit_code, fail, locate_bobfile};
use bob_build::{
    Builder, BuilderConfig, BuiltImage, ConsoleSink, ContainerEngine, DockerEngine, OutputSink,
    OutputStream, WorkdirMode,
};
use bob_core::{CommandSequence, ParseOptions, Parser};
use colored::Colorize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// `--quiet` 時の出力先
struct Silent;

impl OutputSink for Silent {
    fn line(&self, _stream: OutputStream, _line: &str) {}
}

/// 一時 workdir でシーケンスを実行（戻る時点で workdir は削除済み）
async fn execute(
    repo_dir: &Path,
    sequence: &CommandSequence,
    engine: Arc<dyn ContainerEngine>,
    sink: Arc<dyn OutputSink>,
) -> bob_build::Result<Vec<BuiltImage>> {
    let mut builder = Builder::new(
        BuilderConfig {
            repo_dir: repo_dir.to_path_buf(),
            workdir: WorkdirMode::Temporary,
        },
        engine,
        sink,
    );
    builder.execute(sequence).await
}

pub async fn handle(file: Option<PathBuf>, skip_push: bool, quiet: bool) -> anyhow::Result<()> {
    let path = match locate_bobfile(file) {
        Ok(path) => path,
        Err(e) => fail(exit_code::PARSER_CONSTRUCT, e, quiet),
    };

    let parser = match Parser::new(&path) {
        Ok(parser) => parser.with_options(ParseOptions { skip_push }),
        Err(e) => fail(exit_code::PARSER_CONSTRUCT, e, quiet),
    };

    let sequence = match parser.parse() {
        Ok(sequence) => sequence,
        Err(e) => fail(exit_code::PARSE, e, quiet),
    };

    let engine = match DockerEngine::connect() {
        Ok(engine) => engine,
        Err(e) => fail(exit_code::BUILD, e.user_message(), quiet),
    };
    let sink: Arc<dyn OutputSink> = if quiet {
        Arc::new(Silent)
    } else {
        Arc::new(ConsoleSink)
    };

    let images = match execute(parser.top(), &sequence, Arc::new(engine), sink).await {
        Ok(images) => images,
        Err(e) => fail(exit_code::BUILD, e.user_message(), quiet),
    };

    if !quiet {
        println!();
        println!("{}", "✓ ビルドが完了しました".green().bold());
        for image in &images {
            println!("  {} {}", image.name.cyan(), image.image_id);
            for tag in &image.tags {
                let pushed = if image.pushed.contains(tag) {
                    " (pushed)".green().to_string()
                } else {
                    String::new()
                };
                println!("    - {}{}", tag, pushed);
            }
        }
    }

    Ok(())
}
