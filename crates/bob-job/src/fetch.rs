//! ソースツリーの取得

use crate::error::{JobError, Result};
use crate::spec::JobSpec;
use async_trait::async_trait;
use std::path::Path;
use tokio::process::Command;

#[async_trait]
pub trait SourceFetcher: Send + Sync {
    /// `spec` が指すリビジョンを `dest` に展開
    async fn fetch(&self, spec: &JobSpec, dest: &Path) -> Result<()>;
}

/// `git clone` + `git checkout` による取得
#[derive(Debug, Clone)]
pub struct GitFetcher {
    base_url: String,
    api_token: Option<String>,
}

impl Default for GitFetcher {
    fn default() -> Self {
        Self::new(None)
    }
}

impl GitFetcher {
    pub const GITHUB_URL: &'static str = "https://github.com";

    pub fn new(api_token: Option<String>) -> Self {
        Self {
            base_url: Self::GITHUB_URL.to_string(),
            api_token: api_token.filter(|t| !t.is_empty()),
        }
    }

    /// GitHub 以外のホスト（テストやミラー用）
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// clone URL（トークンを含む場合がある）
    pub fn clone_url(&self, spec: &JobSpec) -> String {
        let base = match (&self.api_token, self.base_url.split_once("://")) {
            (Some(token), Some((scheme, host))) => format!("{}://{}@{}", scheme, token, host),
            _ => self.base_url.clone(),
        };
        format!("{}/{}/{}.git", base, spec.account, spec.repo)
    }

    fn redact(&self, message: &str) -> String {
        match &self.api_token {
            Some(token) => message.replace(token.as_str(), "<redacted>"),
            None => message.to_string(),
        }
    }

    async fn git(&self, args: &[&str], cwd: Option<&Path>) -> Result<()> {
        let mut command = Command::new("git");
        if let Some(cwd) = cwd {
            command.arg("-C").arg(cwd);
        }
        let output = command
            .args(args)
            .env("GIT_TERMINAL_PROMPT", "0")
            .output()
            .await
            .map_err(|e| JobError::Fetch(format!("failed to run git: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(JobError::Fetch(self.redact(stderr.trim())));
        }
        Ok(())
    }
}

#[async_trait]
impl SourceFetcher for GitFetcher {
    async fn fetch(&self, spec: &JobSpec, dest: &Path) -> Result<()> {
        let url = self.clone_url(spec);
        let dest_str = dest.to_string_lossy();
        tracing::info!(repo = %spec.slug(), git_ref = %spec.git_ref, dest = %dest.display(), "Cloning repository");

        self.git(&["clone", "--quiet", &url, &dest_str], None).await?;
        self.git(&["checkout", "--quiet", &spec.git_ref], Some(dest))
            .await?;

        tracing::debug!(repo = %spec.slug(), "Repository ready");
        Ok(())
    }
}
