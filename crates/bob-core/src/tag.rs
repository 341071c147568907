//! タグ解決
//!
//! Bobfile の `tags` エントリは、そのまま使うリテラルタグか、
//! `git:` プレフィックス付きのリポジトリ由来タグのどちらかです。
//! 種別はデコード時に一度だけ決定し、解決はコマンドシーケンス生成時に行います。

use crate::error::{ManifestError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::str::FromStr;

/// リポジトリ由来タグのプレフィックス
pub const GIT_TAG_PREFIX: &str = "git:";

/// Bobfile に記述されたタグ指定
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum TagSpec {
    /// 文字列をそのままタグとして使う
    Literal(String),
    /// git リポジトリの状態から算出する
    Git(GitRef),
}

/// `git:` タグが参照するリポジトリ情報
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GitRef {
    /// 現在のブランチ名 (`git:branch`)
    Branch,
    /// HEAD のコミットID (`git:sha`, `git:rev`)
    Sha,
    /// HEAD の短縮コミットID (`git:short`)
    ShortSha,
    /// `git describe --always --dirty --tags` の結果 (`git:tag`)
    Describe,
}

impl GitRef {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "branch" => Some(GitRef::Branch),
            "sha" | "rev" => Some(GitRef::Sha),
            "short" => Some(GitRef::ShortSha),
            "tag" => Some(GitRef::Describe),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            GitRef::Branch => "branch",
            GitRef::Sha => "sha",
            GitRef::ShortSha => "short",
            GitRef::Describe => "tag",
        }
    }

    fn git_args(&self) -> &'static [&'static str] {
        match self {
            GitRef::Branch => &["rev-parse", "--abbrev-ref", "HEAD"],
            GitRef::Sha => &["rev-parse", "HEAD"],
            GitRef::ShortSha => &["rev-parse", "--short", "HEAD"],
            GitRef::Describe => &["describe", "--always", "--dirty", "--tags"],
        }
    }
}

/// タグ解決時のコンテキスト
#[derive(Debug, Clone)]
pub struct TagContext {
    /// Bobfile が置かれているディレクトリ
    pub top: PathBuf,
}

impl TagContext {
    pub fn new(top: impl Into<PathBuf>) -> Self {
        Self { top: top.into() }
    }
}

impl FromStr for TagSpec {
    type Err = ManifestError;

    fn from_str(s: &str) -> Result<Self> {
        // "git:" 単体はリテラル扱い
        match s.strip_prefix(GIT_TAG_PREFIX) {
            Some(reference) if !reference.is_empty() => GitRef::parse(reference)
                .map(TagSpec::Git)
                .ok_or_else(|| {
                    ManifestError::Decode(format!(
                        "unknown git tag '{}' (expected git:branch, git:sha, git:rev, git:short or git:tag)",
                        s
                    ))
                }),
            _ => Ok(TagSpec::Literal(s.to_string())),
        }
    }
}

impl TryFrom<String> for TagSpec {
    type Error = ManifestError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<TagSpec> for String {
    fn from(tag: TagSpec) -> Self {
        tag.to_string()
    }
}

impl fmt::Display for TagSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TagSpec::Literal(s) => f.write_str(s),
            TagSpec::Git(r) => write!(f, "{}{}", GIT_TAG_PREFIX, r.as_str()),
        }
    }
}

impl TagSpec {
    /// タグ文字列を解決
    pub fn resolve(&self, ctx: &TagContext) -> Result<String> {
        match self {
            TagSpec::Literal(s) => Ok(s.clone()),
            TagSpec::Git(r) => resolve_git(*r, &ctx.top).map_err(|message| {
                ManifestError::TagResolution {
                    tag: self.to_string(),
                    message,
                }
            }),
        }
    }
}

fn resolve_git(reference: GitRef, top: &Path) -> std::result::Result<String, String> {
    if !top.is_dir() {
        return Err(format!("{} is not a directory", top.display()));
    }

    let output = Command::new("git")
        .arg("-C")
        .arg(top)
        .args(reference.git_args())
        .output()
        .map_err(|e| format!("failed to run git: {}", e))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(stderr.trim().to_string());
    }

    let value = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if value.is_empty() {
        return Err("git produced no output".to_string());
    }

    tracing::debug!(tag = reference.as_str(), value = %value, "Resolved git tag");
    Ok(value)
}
