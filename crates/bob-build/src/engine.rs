//! コンテナエンジン
//!
//! build / tag / push は docker CLI で実行し、ビルドIDからのイメージ検索は
//! Docker API で行います。

use crate::error::{BuildError, Result};
use crate::output::{OutputSink, OutputStream};
use async_trait::async_trait;
use bob_core::{ENGINE_PROGRAM, EngineCommand};
use bollard::Docker;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;

#[async_trait]
pub trait ContainerEngine: Send + Sync {
    /// コマンドを workdir で実行し、出力を1行ずつ sink に流す
    async fn run(
        &self,
        command: &EngineCommand,
        workdir: &Path,
        sink: &dyn OutputSink,
    ) -> Result<()>;

    /// `*:<build_id>` タグを持つ最新イメージのID
    async fn latest_image_tagged_with(&self, build_id: &str) -> Result<String>;
}

/// docker CLI と Docker API を使うエンジン
pub struct DockerEngine {
    program: PathBuf,
    docker: Docker,
}

impl DockerEngine {
    /// PATH 上の docker を探し、ローカルの Docker デーモン設定で接続
    pub fn connect() -> Result<Self> {
        let program = which::which(ENGINE_PROGRAM)
            .map_err(|_| BuildError::EngineNotFound(ENGINE_PROGRAM.to_string()))?;
        let docker = Docker::connect_with_local_defaults()?;
        tracing::debug!(program = %program.display(), "Using docker executable");
        Ok(Self { program, docker })
    }

    fn resolve_program(&self, program: &str) -> Result<PathBuf> {
        if program == ENGINE_PROGRAM {
            return Ok(self.program.clone());
        }
        which::which(program).map_err(|_| BuildError::EngineNotFound(program.to_string()))
    }
}

async fn forward_lines<R>(reader: Option<R>, stream: OutputStream, sink: &dyn OutputSink)
where
    R: AsyncRead + Unpin,
{
    let Some(reader) = reader else {
        return;
    };
    // UTF-8 でない行も置換して EOF まで読み切る
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => break,
            Ok(_) => {
                let line = buf.strip_suffix(b"\n").unwrap_or(&buf[..]);
                let line = line.strip_suffix(b"\r").unwrap_or(line);
                sink.line(stream, &String::from_utf8_lossy(line));
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read command output");
                break;
            }
        }
    }
}

#[async_trait]
impl ContainerEngine for DockerEngine {
    async fn run(
        &self,
        command: &EngineCommand,
        workdir: &Path,
        sink: &dyn OutputSink,
    ) -> Result<()> {
        let program = self.resolve_program(&command.program)?;
        tracing::debug!(command = %command, workdir = %workdir.display(), "Spawning command");

        let mut child = Command::new(program)
            .args(&command.args)
            .current_dir(workdir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();

        let (_, _, status) = tokio::join!(
            forward_lines(stdout, OutputStream::Stdout, sink),
            forward_lines(stderr, OutputStream::Stderr, sink),
            child.wait()
        );
        let status = status?;

        if !status.success() {
            return Err(BuildError::CommandFailed {
                command: command.clone(),
                status: status.to_string(),
            });
        }
        Ok(())
    }

    async fn latest_image_tagged_with(&self, build_id: &str) -> Result<String> {
        let suffix = format!(":{}", build_id);
        let images = self
            .docker
            .list_images(Some(bollard::query_parameters::ListImagesOptions {
                all: false,
                ..Default::default()
            }))
            .await?;

        images
            .into_iter()
            .filter(|image| image.repo_tags.iter().any(|tag| tag.ends_with(&suffix)))
            .max_by_key(|image| image.created)
            .map(|image| image.id)
            .ok_or_else(|| BuildError::ImageNotFound(build_id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Lines(Mutex<Vec<(OutputStream, String)>>);

    impl OutputSink for Lines {
        fn line(&self, stream: OutputStream, line: &str) {
            self.0.lock().unwrap().push((stream, line.to_string()));
        }
    }

    #[tokio::test]
    async fn test_forward_lines_splits_output() {
        let sink = Lines::default();
        let input: &[u8] = b"step 1\nstep 2\n";
        forward_lines(Some(input), OutputStream::Stderr, &sink).await;

        let lines = sink.0.lock().unwrap();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], (OutputStream::Stderr, "step 1".to_string()));
        assert_eq!(lines[1].1, "step 2");
    }

    #[tokio::test]
    async fn test_forward_lines_keeps_reading_after_invalid_utf8() {
        let sink = Lines::default();
        let input: &[u8] = b"Step 1\n\xff\xfe binary\r\nStep 2\nSuccessfully built";
        forward_lines(Some(input), OutputStream::Stdout, &sink).await;

        let lines: Vec<String> = sink.0.lock().unwrap().iter().map(|(_, l)| l.clone()).collect();
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0], "Step 1");
        assert_eq!(lines[1], "\u{FFFD}\u{FFFD} binary");
        assert_eq!(lines[2], "Step 2");
        assert_eq!(lines[3], "Successfully built");
    }

    #[tokio::test]
    #[ignore] // Docker接続が必要なため、通常のテストではスキップ
    async fn test_latest_image_unknown_build_id() {
        let engine = DockerEngine::connect().unwrap();
        let err = engine
            .latest_image_tagged_with("00000000-0000-0000-0000-000000000000")
            .await
            .unwrap_err();
        assert!(matches!(err, BuildError::ImageNotFound(_)));
    }
}
