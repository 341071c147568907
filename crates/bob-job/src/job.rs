//! ビルドジョブ
//!
//! ジョブの状態とログはジョブ自身のタスクだけが書き込み、
//! ステータス/ログ取得は読み取りロックで並行に行えます。

use crate::error::{JobError, Result};
use crate::fetch::SourceFetcher;
use crate::spec::JobSpec;
use bob_build::{
    Builder, BuilderConfig, BuiltImage, ContainerEngine, OutputSink, OutputStream, WorkdirMode,
};
use bob_core::{ParseOptions, Parser};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use uuid::Uuid;

/// ソースの取得先（ジョブディレクトリ内）
const SOURCE_DIR: &str = "src";

/// ビルドコンテキストのステージング先（ジョブディレクトリ内）
const BUILD_DIR: &str = "build";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Created,
    Validating,
    Rejected,
    Accepted,
    Running,
    Succeeded,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobStatus::Rejected | JobStatus::Succeeded | JobStatus::Failed
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Transition {
    pub status: JobStatus,
    pub at: DateTime<Utc>,
}

/// ジョブ実行に必要な共有リソース
pub struct JobContext {
    pub fetcher: Arc<dyn SourceFetcher>,
    pub engine: Arc<dyn ContainerEngine>,
    /// 全ジョブで push を行わない
    pub skip_push: bool,
}

struct JobState {
    status: JobStatus,
    transitions: Vec<Transition>,
    started_at: Option<DateTime<Utc>>,
    completed_at: Option<DateTime<Utc>>,
    error: Option<String>,
    images: Vec<BuiltImage>,
    logs: Vec<String>,
}

pub struct Job {
    pub id: Uuid,
    pub spec: JobSpec,
    pub created_at: DateTime<Utc>,
    state: RwLock<JobState>,
}

/// JSON で返すジョブの状態
#[derive(Debug, Clone, Serialize)]
pub struct JobSnapshot {
    pub id: Uuid,
    pub account: String,
    pub repo: String,
    #[serde(rename = "ref")]
    pub git_ref: String,
    pub status: JobStatus,
    pub transitions: Vec<Transition>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub error: Option<String>,
    pub images: Vec<BuiltImage>,
    pub log_lines: usize,
    pub logs_route: String,
}

impl Job {
    pub fn new(spec: JobSpec) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            spec,
            created_at: now,
            state: RwLock::new(JobState {
                status: JobStatus::Created,
                transitions: vec![Transition {
                    status: JobStatus::Created,
                    at: now,
                }],
                started_at: None,
                completed_at: None,
                error: None,
                images: Vec::new(),
                logs: Vec::new(),
            }),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, JobState> {
        self.state.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, JobState> {
        self.state.write().unwrap_or_else(|e| e.into_inner())
    }

    pub fn status(&self) -> JobStatus {
        self.read().status
    }

    pub(crate) fn transition(&self, status: JobStatus) {
        let now = Utc::now();
        let mut state = self.write();
        tracing::debug!(job_id = %self.id, from = ?state.status, to = ?status, "Job status changed");
        state.status = status;
        state.transitions.push(Transition { status, at: now });
        match status {
            JobStatus::Running => state.started_at = Some(now),
            s if s.is_terminal() => state.completed_at = Some(now),
            _ => {}
        }
    }

    pub(crate) fn reject(&self, error: &JobError) {
        self.write().error = Some(error.to_string());
        self.transition(JobStatus::Rejected);
    }

    pub fn append_log(&self, line: impl Into<String>) {
        self.write().logs.push(line.into());
    }

    /// 最新 n 行のログ（n 行未満なら全行）
    pub fn tail_log(&self, n: usize) -> Vec<String> {
        let state = self.read();
        let start = state.logs.len().saturating_sub(n);
        state.logs[start..].to_vec()
    }

    pub fn snapshot(&self) -> JobSnapshot {
        let state = self.read();
        JobSnapshot {
            id: self.id,
            account: self.spec.account.clone(),
            repo: self.spec.repo.clone(),
            git_ref: self.spec.git_ref.clone(),
            status: state.status,
            transitions: state.transitions.clone(),
            created_at: self.created_at,
            started_at: state.started_at,
            completed_at: state.completed_at,
            error: state.error.clone(),
            images: state.images.clone(),
            log_lines: state.logs.len(),
            logs_route: format!("/jobs/{}/tail", self.id),
        }
    }

    /// ソース取得 → パース → ビルドを実行し、結果を記録
    ///
    /// `job_dir` はこのジョブ専用のディレクトリ。
    #[tracing::instrument(skip_all, fields(job_id = %self.id, repo = %self.spec.slug(), git_ref = %self.spec.git_ref))]
    pub async fn process(
        self: Arc<Self>,
        context: Arc<JobContext>,
        job_dir: PathBuf,
    ) -> Result<Vec<BuiltImage>> {
        self.transition(JobStatus::Running);
        tracing::info!("Job started");

        match self.run(&context, &job_dir).await {
            Ok(images) => {
                {
                    let mut state = self.write();
                    state.images = images.clone();
                }
                self.transition(JobStatus::Succeeded);
                tracing::info!(images = images.len(), "Job succeeded");
                Ok(images)
            }
            Err(e) => {
                self.append_log(format!("error: {}", e));
                self.write().error = Some(e.to_string());
                self.transition(JobStatus::Failed);
                tracing::error!(error = %e, "Job failed");
                Err(e)
            }
        }
    }

    async fn run(self: &Arc<Self>, context: &JobContext, job_dir: &Path) -> Result<Vec<BuiltImage>> {
        let source_dir = job_dir.join(SOURCE_DIR);
        self.append_log(format!("fetching {}@{}", self.spec.slug(), self.spec.git_ref));
        context.fetcher.fetch(&self.spec, &source_dir).await?;

        let bobfile = source_dir.join(self.spec.bobfile_path());
        let options = ParseOptions {
            skip_push: context.skip_push,
        };
        self.append_log(format!("parsing {}", self.spec.bobfile_path()));
        let (sequence, repo_dir) = tokio::task::spawn_blocking(move || {
            let parser = Parser::new(bobfile)?.with_options(options);
            let sequence = parser.parse()?;
            Ok::<_, JobError>((sequence, parser.top().to_path_buf()))
        })
        .await
        .map_err(|e| JobError::Aborted(e.to_string()))??;

        let mut builder = Builder::new(
            BuilderConfig {
                repo_dir,
                workdir: WorkdirMode::Fixed(job_dir.join(BUILD_DIR)),
            },
            context.engine.clone(),
            self.clone(),
        );
        Ok(builder.execute(&sequence).await?)
    }
}

impl OutputSink for Job {
    fn line(&self, stream: OutputStream, line: &str) {
        match stream {
            OutputStream::Stdout => tracing::debug!(job_id = %self.id, "{}", line),
            OutputStream::Stderr => tracing::debug!(job_id = %self.id, stream = "stderr", "{}", line),
        }
        self.append_log(line);
    }
}
