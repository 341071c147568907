//! ジョブの受付と実行
//!
//! 同期/非同期は同じ実行契約のモード違いです。非同期はタスクを起動して
//! すぐに返し、同期は同じタスクの完了を待ちます。

use crate::error::{JobError, Result};
use crate::job::{Job, JobContext, JobSnapshot, JobStatus};
use crate::registry::JobRegistry;
use crate::spec::JobSpec;
use std::path::PathBuf;
use std::sync::Arc;

/// ジョブ用一時ディレクトリのプレフィックス
pub const JOB_WORKDIR_PREFIX: &str = "docker-build-worker";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionMode {
    Sync,
    Async,
}

impl ExecutionMode {
    /// リクエストの指定がなければサーバーの既定値
    pub fn resolve(requested: Option<bool>, sync_by_default: bool) -> Self {
        if requested.unwrap_or(sync_by_default) {
            ExecutionMode::Sync
        } else {
            ExecutionMode::Async
        }
    }
}

#[derive(Debug, Clone)]
pub enum Submission {
    /// 非同期: 受付済み（実行は継続中）
    Accepted(JobSnapshot),
    /// 同期: 成功して完了
    Completed(JobSnapshot),
}

impl Submission {
    pub fn snapshot(&self) -> &JobSnapshot {
        match self {
            Submission::Accepted(s) | Submission::Completed(s) => s,
        }
    }
}

#[derive(Clone)]
pub struct JobRunner {
    registry: JobRegistry,
    context: Arc<JobContext>,
    temp_root: Option<PathBuf>,
}

impl JobRunner {
    pub fn new(registry: JobRegistry, context: JobContext) -> Self {
        Self {
            registry,
            context: Arc::new(context),
            temp_root: None,
        }
    }

    /// ジョブディレクトリの作成先（未指定はシステムの一時ディレクトリ）
    pub fn with_temp_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.temp_root = Some(root.into());
        self
    }

    pub fn registry(&self) -> &JobRegistry {
        &self.registry
    }

    fn allocate_workdir(&self) -> Result<tempfile::TempDir> {
        let mut builder = tempfile::Builder::new();
        builder.prefix(JOB_WORKDIR_PREFIX);
        match &self.temp_root {
            Some(root) => builder.tempdir_in(root),
            None => builder.tempdir(),
        }
        .map_err(JobError::Workdir)
    }

    /// 検証 → 作業ディレクトリ確保 → 登録 → 実行
    #[tracing::instrument(skip(self, spec), fields(repo = %spec.slug(), mode = ?mode))]
    pub async fn submit(&self, spec: JobSpec, mode: ExecutionMode) -> Result<Submission> {
        let job = Arc::new(Job::new(spec.normalized()));

        job.transition(JobStatus::Validating);
        if let Err(e) = job.spec.validate() {
            tracing::warn!(error = %e, "Job rejected");
            job.reject(&e);
            return Err(e);
        }

        let workdir = self.allocate_workdir()?;
        job.transition(JobStatus::Accepted);
        self.registry.insert(job.clone());
        tracing::info!(job_id = %job.id, workdir = %workdir.path().display(), "Job accepted");

        let context = self.context.clone();
        let task_job = job.clone();
        let handle = tokio::spawn(async move {
            let job_dir = workdir.path().to_path_buf();
            let result = task_job.process(context, job_dir).await;
            // ジョブ終了時に作業ディレクトリを削除
            drop(workdir);
            result
        });

        match mode {
            ExecutionMode::Async => Ok(Submission::Accepted(job.snapshot())),
            ExecutionMode::Sync => match handle.await {
                Ok(Ok(_)) => Ok(Submission::Completed(job.snapshot())),
                Ok(Err(e)) => Err(e),
                Err(e) => Err(JobError::Aborted(e.to_string())),
            },
        }
    }
}
