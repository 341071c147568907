//! 実行可能なコマンドシーケンス

use super::manifest::BuildUnitSection;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// マージ後に Dockerfile が未設定の場合の既定値
pub const DEFAULT_DOCKERFILE: &str = "Dockerfile";

/// タグコマンド内でビルド済みイメージIDに置き換えられるプレースホルダ
pub const IMAGE_PLACEHOLDER: &str = "<IMG>";

/// コンテナエンジンのコマンド名
pub const ENGINE_PROGRAM: &str = "docker";

/// グローバル設定をマージ済みのビルド指示
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstructionSet {
    pub docker_build_opts: Vec<String>,
    pub docker_tag_opts: Vec<String>,
    pub units: Vec<BuildUnitSection>,
}

/// Bobfile 全体のコマンド列
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandSequence {
    pub sub_sequences: Vec<SubSequence>,
}

/// 1イメージ分のコマンド列
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubSequence {
    pub metadata: SubSequenceMetadata,
    pub commands: Vec<EngineCommand>,
}

/// ファイルステージングに必要な情報とビルドID
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubSequenceMetadata {
    pub name: String,
    pub dockerfile: String,
    pub included: Vec<String>,
    pub excluded: Vec<String>,
    pub build_id: Uuid,
    /// `registry/project` 形式のリポジトリ名
    pub image: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    Build,
    Tag,
    Push,
}

/// コンテナエンジンに渡す1コマンド
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineCommand {
    pub program: String,
    pub args: Vec<String>,
}

impl EngineCommand {
    pub fn new(args: Vec<String>) -> Self {
        Self {
            program: ENGINE_PROGRAM.to_string(),
            args,
        }
    }

    /// `docker build -t <image>:<build_id> <opts...> .`
    pub fn build(image: &str, build_id: &Uuid, opts: &[String]) -> Self {
        let mut args = vec![
            "build".to_string(),
            "-t".to_string(),
            format!("{}:{}", image, build_id),
        ];
        args.extend(opts.iter().cloned());
        args.push(".".to_string());
        Self::new(args)
    }

    /// `docker tag <opts...> <IMG> <image>:<tag>`
    pub fn tag(image: &str, tag: &str, opts: &[String]) -> Self {
        let mut args = vec!["tag".to_string()];
        args.extend(opts.iter().cloned());
        args.push(IMAGE_PLACEHOLDER.to_string());
        args.push(format!("{}:{}", image, tag));
        Self::new(args)
    }

    /// `docker push <image>:<tag>`
    pub fn push(image: &str, tag: &str) -> Self {
        Self::new(vec!["push".to_string(), format!("{}:{}", image, tag)])
    }

    /// サブコマンドから種別を判定（docker 以外や未知のサブコマンドは None）
    pub fn kind(&self) -> Option<CommandKind> {
        if self.program != ENGINE_PROGRAM {
            return None;
        }
        match self.args.first().map(String::as_str) {
            Some("build") => Some(CommandKind::Build),
            Some("tag") => Some(CommandKind::Tag),
            Some("push") => Some(CommandKind::Push),
            _ => None,
        }
    }

    /// プレースホルダをイメージIDに置き換えたコマンドを返す
    pub fn with_image(&self, image_id: &str) -> Self {
        Self {
            program: self.program.clone(),
            args: self
                .args
                .iter()
                .map(|arg| {
                    if arg == IMAGE_PLACEHOLDER {
                        image_id.to_string()
                    } else {
                        arg.clone()
                    }
                })
                .collect(),
        }
    }
}

impl fmt::Display for EngineCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

impl CommandSequence {
    pub fn len(&self) -> usize {
        self.sub_sequences.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sub_sequences.is_empty()
    }
}
