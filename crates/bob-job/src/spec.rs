use crate::error::{JobError, Result};
use serde::{Deserialize, Serialize};

/// ブランチ参照のプレフィックス
pub const BRANCH_REF_PREFIX: &str = "refs/heads/";

/// Bobfile の既定パス（リポジトリルートからの相対）
pub const DEFAULT_BOBFILE: &str = "Bobfile";

/// `refs/heads/main` → `main`
pub fn normalize_git_ref(git_ref: &str) -> &str {
    git_ref.strip_prefix(BRANCH_REF_PREFIX).unwrap_or(git_ref)
}

/// ビルドリクエスト
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobSpec {
    /// リポジトリのオーナー
    #[serde(default)]
    pub account: String,
    /// リポジトリ名
    #[serde(default)]
    pub repo: String,
    /// ブランチ名またはコミットSHA
    #[serde(default, rename = "ref")]
    pub git_ref: String,
    /// 未指定の場合はサーバーの既定値
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sync: Option<bool>,
    /// リポジトリ内の Bobfile パス
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bobfile: Option<String>,
}

impl JobSpec {
    pub fn new(
        account: impl Into<String>,
        repo: impl Into<String>,
        git_ref: impl Into<String>,
    ) -> Self {
        Self {
            account: account.into(),
            repo: repo.into(),
            git_ref: git_ref.into(),
            ..Default::default()
        }
    }

    /// 必須項目の検証
    pub fn validate(&self) -> Result<()> {
        let missing: Vec<&str> = [
            ("account", &self.account),
            ("repo", &self.repo),
            ("ref", &self.git_ref),
        ]
        .into_iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| name)
        .collect();

        if !missing.is_empty() {
            return Err(JobError::InvalidSpec(format!(
                "missing required field(s): {}",
                missing.join(", ")
            )));
        }

        // git のオプションとして解釈される ref は拒否
        if self.git_ref.trim().starts_with('-') {
            return Err(JobError::InvalidSpec(format!(
                "ref must not start with '-': {}",
                self.git_ref.trim()
            )));
        }

        if let Some(bobfile) = &self.bobfile
            && (bobfile.starts_with('/') || bobfile.split('/').any(|part| part == ".."))
        {
            return Err(JobError::InvalidSpec(format!(
                "bobfile must be a path inside the repository: {}",
                bobfile
            )));
        }

        Ok(())
    }

    /// ref を正規化したコピー
    pub fn normalized(mut self) -> Self {
        self.git_ref = normalize_git_ref(self.git_ref.trim()).to_string();
        self
    }

    pub fn bobfile_path(&self) -> &str {
        self.bobfile
            .as_deref()
            .filter(|s| !s.is_empty())
            .unwrap_or(DEFAULT_BOBFILE)
    }

    /// `account/repo`
    pub fn slug(&self) -> String {
        format!("{}/{}", self.account, self.repo)
    }
}
