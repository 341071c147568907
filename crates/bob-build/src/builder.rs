//! コマンドシーケンスの実行

use crate::context::ContextStager;
use crate::engine::ContainerEngine;
use crate::error::{BuildError, Result};
use crate::output::OutputSink;
use crate::workdir::{Workdir, WorkdirMode};
use bob_core::{CommandKind, CommandSequence, SubSequence, SubSequenceMetadata};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct BuilderConfig {
    /// Bobfile のあるディレクトリ（ステージング元）
    pub repo_dir: PathBuf,
    pub workdir: WorkdirMode,
}

/// ビルドされたイメージ
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuiltImage {
    pub name: String,
    pub image: String,
    pub image_id: String,
    pub build_id: Uuid,
    /// 付与したタグ（`image:tag` 形式）
    pub tags: Vec<String>,
    /// push したタグ
    pub pushed: Vec<String>,
}

pub struct Builder {
    config: BuilderConfig,
    workdir: Workdir,
    engine: Arc<dyn ContainerEngine>,
    sink: Arc<dyn OutputSink>,
    next: Option<SubSequenceMetadata>,
}

impl Builder {
    pub fn new(
        config: BuilderConfig,
        engine: Arc<dyn ContainerEngine>,
        sink: Arc<dyn OutputSink>,
    ) -> Self {
        let workdir = Workdir::new(config.workdir.clone());
        Self {
            config,
            workdir,
            engine,
            sink,
            next: None,
        }
    }

    pub fn repo_dir(&self) -> &Path {
        &self.config.repo_dir
    }

    /// 現在の workdir（未準備なら None）
    pub fn workdir(&self) -> Option<&Path> {
        self.workdir.path()
    }

    /// 空の workdir を用意
    pub fn prepare_workdir(&mut self) -> Result<PathBuf> {
        Ok(self.workdir.prepare()?.to_path_buf())
    }

    /// 次にステージングするユニットを設定
    pub fn set_next_sub_sequence(&mut self, sub_sequence: &SubSequence) {
        self.next = Some(sub_sequence.metadata.clone());
    }

    /// 設定されたユニットのファイルを workdir にコピー
    pub fn stage_files(&self) -> Result<Vec<PathBuf>> {
        let metadata = self.next.as_ref().ok_or(BuildError::NoSubSequenceBound)?;
        let workdir = self.workdir.path().ok_or(BuildError::WorkdirNotPrepared)?;
        ContextStager::stage(&self.config.repo_dir, workdir, metadata)
    }

    /// シーケンスを先頭から順に実行
    ///
    /// いずれかのコマンドが失敗した時点で中断します（リトライなし）。
    #[tracing::instrument(skip_all, fields(units = sequence.len()))]
    pub async fn execute(&mut self, sequence: &CommandSequence) -> Result<Vec<BuiltImage>> {
        let mut built = Vec::with_capacity(sequence.len());

        for sub_sequence in &sequence.sub_sequences {
            let workdir = self.prepare_workdir()?;
            self.set_next_sub_sequence(sub_sequence);
            self.stage_files()?;

            if let Some(image) = self.run_sub_sequence(sub_sequence, &workdir).await? {
                built.push(image);
            }
        }

        tracing::info!(images = built.len(), "Build sequence completed");
        Ok(built)
    }

    async fn run_sub_sequence(
        &self,
        sub_sequence: &SubSequence,
        workdir: &Path,
    ) -> Result<Option<BuiltImage>> {
        let metadata = &sub_sequence.metadata;
        self.sink
            .status(&format!("Running commands for \"{}\"", metadata.name));

        let mut image_id: Option<String> = None;
        let mut tags = Vec::new();
        let mut pushed = Vec::new();

        for command in &sub_sequence.commands {
            match command.kind() {
                Some(CommandKind::Build) => {
                    self.run(command, workdir).await?;
                    let id = self
                        .engine
                        .latest_image_tagged_with(&metadata.build_id.to_string())
                        .await?;
                    tracing::info!(unit = %metadata.name, image_id = %id, "Image built");
                    image_id = Some(id);
                }
                Some(CommandKind::Tag) => {
                    let id = image_id
                        .as_deref()
                        .ok_or_else(|| BuildError::MalformedCommand(command.to_string()))?;
                    let resolved = command.with_image(id);
                    self.run(&resolved, workdir).await?;
                    tags.extend(resolved.args.last().cloned());
                }
                Some(CommandKind::Push) => {
                    self.run(command, workdir).await?;
                    pushed.extend(command.args.last().cloned());
                }
                None => return Err(BuildError::MalformedCommand(command.to_string())),
            }
        }

        Ok(image_id.map(|image_id| BuiltImage {
            name: metadata.name.clone(),
            image: metadata.image.clone(),
            image_id,
            build_id: metadata.build_id,
            tags,
            pushed,
        }))
    }

    async fn run(&self, command: &bob_core::EngineCommand, workdir: &Path) -> Result<()> {
        self.sink.status(&format!("running command {}", command));
        tracing::debug!(command = %command, "Running command");
        self.engine.run(command, workdir, self.sink.as_ref()).await
    }
}
