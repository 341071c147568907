//! Bobfile パーサーパイプライン
//!
//! Load → Decode → Migrate → Normalize + Sequence の順に処理します。
//! 各ステージは失敗した時点で中断し、部分的な結果は返しません。

use crate::error::{ManifestError, Result};
use crate::model::{
    BuildUnitSection, CommandSequence, DEFAULT_DOCKERFILE, EngineCommand, InstructionSet,
    ManifestDocument, SubSequence, SubSequenceMetadata, migrate,
};
use crate::tag::TagContext;
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument};
use uuid::Uuid;

/// 実行時オプション
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParseOptions {
    /// push コマンドを生成しない（Bobfile の skip_push と OR）
    pub skip_push: bool,
}

/// Bobfile パーサー
#[derive(Debug, Clone)]
pub struct Parser {
    path: PathBuf,
    top: PathBuf,
    options: ParseOptions,
}

impl Parser {
    /// パーサーを作成
    ///
    /// ファイルが開けない場合は `NotOpenable` を返します。
    pub fn new(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        File::open(&path).map_err(|source| ManifestError::NotOpenable {
            path: path.clone(),
            source,
        })?;

        let top = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };

        Ok(Self {
            path,
            top,
            options: ParseOptions::default(),
        })
    }

    pub fn with_options(mut self, options: ParseOptions) -> Self {
        self.options = options;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Bobfile のあるディレクトリ（git タグ解決とビルドコンテキストの基点）
    pub fn top(&self) -> &Path {
        &self.top
    }

    /// Stage 1: Load
    ///
    /// 読み込めないファイルは `NotOpenable`、UTF-8 でない内容は `Decode`。
    fn load(&self) -> Result<String> {
        let bytes = std::fs::read(&self.path).map_err(|source| ManifestError::NotOpenable {
            path: self.path.clone(),
            source,
        })?;
        String::from_utf8(bytes).map_err(|e| {
            ManifestError::Decode(format!("{} is not valid UTF-8: {}", self.path.display(), e))
        })
    }

    /// Stage 1-2 のみ実行（構文と型の検証）
    #[instrument(skip(self), fields(path = %self.path.display()))]
    pub fn lint(&self) -> Result<()> {
        let content = self.load()?;
        decode(&content)?;
        info!("Bobfile is valid");
        Ok(())
    }

    /// Stage 1-3 を実行し、マージ済みのビルド指示を返す
    #[instrument(skip(self), fields(path = %self.path.display()))]
    pub fn instruction_set(&self) -> Result<InstructionSet> {
        debug!("Step 1: Loading");
        let content = self.load()?;

        debug!("Step 2: Decoding");
        let doc = decode(&content)?;

        debug!(version = doc.version, "Step 3: Migrating");
        let doc = migrate(doc)?;

        Ok(normalize(doc))
    }

    /// パイプライン全体を実行し、コマンドシーケンスを返す
    #[instrument(skip(self), fields(path = %self.path.display(), skip_push = self.options.skip_push))]
    pub fn parse(&self) -> Result<CommandSequence> {
        let instructions = self.instruction_set()?;

        debug!("Step 4: Generating command sequence");
        let ctx = TagContext::new(&self.top);
        let sequence = sequence(&instructions, &ctx, self.options)?;

        info!(
            units = sequence.len(),
            commands = sequence
                .sub_sequences
                .iter()
                .map(|s| s.commands.len())
                .sum::<usize>(),
            "Bobfile parsed successfully"
        );
        Ok(sequence)
    }
}

/// TOML 文字列をデコードしてクリーンアップ
pub fn decode(content: &str) -> Result<ManifestDocument> {
    let mut doc: ManifestDocument = toml::from_str(content)?;
    doc.clean();
    Ok(doc)
}

/// グローバル設定をマージしてビルド指示を作成
pub fn normalize(doc: ManifestDocument) -> InstructionSet {
    let globals = doc.globals();
    let units = doc
        .containers
        .into_iter()
        .map(|mut unit| {
            unit.merge_globals(&globals);
            if unit.dockerfile.is_none() {
                unit.dockerfile = Some(DEFAULT_DOCKERFILE.to_string());
            }
            unit
        })
        .collect();

    InstructionSet {
        docker_build_opts: doc.docker.build_opts,
        docker_tag_opts: doc.docker.tag_opts,
        units,
    }
}

/// ビルド指示からコマンドシーケンスを生成
///
/// ユニットごとに新しいビルドIDを割り当て、タグを解決します。
pub fn sequence(
    instructions: &InstructionSet,
    ctx: &TagContext,
    options: ParseOptions,
) -> Result<CommandSequence> {
    let sub_sequences = instructions
        .units
        .iter()
        .enumerate()
        .map(|(index, unit)| sub_sequence(index, unit, instructions, ctx, options))
        .collect::<Result<Vec<_>>>()?;

    Ok(CommandSequence { sub_sequences })
}

fn sub_sequence(
    index: usize,
    unit: &BuildUnitSection,
    instructions: &InstructionSet,
    ctx: &TagContext,
    options: ParseOptions,
) -> Result<SubSequence> {
    let image = unit
        .repository()
        .ok_or(ManifestError::MissingProject { index })?;
    let build_id = Uuid::new_v4();

    let tags = unit
        .tags
        .iter()
        .map(|tag| tag.resolve(ctx))
        .collect::<Result<Vec<_>>>()?;

    let mut commands = Vec::with_capacity(1 + tags.len() * 2);
    commands.push(EngineCommand::build(
        &image,
        &build_id,
        &instructions.docker_build_opts,
    ));
    for tag in &tags {
        commands.push(EngineCommand::tag(
            &image,
            tag,
            &instructions.docker_tag_opts,
        ));
    }

    let skip_push = unit.skip_push || options.skip_push;
    if skip_push {
        debug!(image = %image, "Skipping push commands");
    } else {
        for tag in &tags {
            commands.push(EngineCommand::push(&image, tag));
        }
    }

    let metadata = SubSequenceMetadata {
        name: unit.name.clone().unwrap_or_else(|| image.clone()),
        dockerfile: unit
            .dockerfile
            .clone()
            .unwrap_or_else(|| DEFAULT_DOCKERFILE.to_string()),
        included: unit.included.clone(),
        excluded: unit.excluded.clone(),
        build_id,
        image,
    };

    Ok(SubSequence { metadata, commands })
}
