use crate::error::Result;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// 一時ディレクトリのプレフィックス
pub const WORKDIR_PREFIX: &str = "bob";

/// workdir の割り当て方法
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkdirMode {
    /// 固定パス（準備のたびに削除して再作成）
    Fixed(PathBuf),
    /// 準備のたびに新しい一時ディレクトリ（前回分は削除）
    Temporary,
}

enum Prepared {
    Fixed(PathBuf),
    Temporary(TempDir),
}

/// 準備済みの workdir（一時ディレクトリは drop 時に削除）
pub(crate) struct Workdir {
    mode: WorkdirMode,
    current: Option<Prepared>,
}

impl Workdir {
    pub(crate) fn new(mode: WorkdirMode) -> Self {
        Self {
            mode,
            current: None,
        }
    }

    /// 空の workdir を用意
    pub(crate) fn prepare(&mut self) -> Result<&Path> {
        // 前回の一時ディレクトリはここで削除される
        self.current = None;

        let prepared = match &self.mode {
            WorkdirMode::Fixed(path) => {
                match fs::remove_dir_all(path) {
                    Ok(()) => {}
                    Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                    Err(e) => return Err(e.into()),
                }
                fs::create_dir_all(path)?;
                Prepared::Fixed(path.clone())
            }
            WorkdirMode::Temporary => Prepared::Temporary(
                tempfile::Builder::new()
                    .prefix(WORKDIR_PREFIX)
                    .tempdir()?,
            ),
        };

        let path = match self.current.insert(prepared) {
            Prepared::Fixed(path) => path.as_path(),
            Prepared::Temporary(dir) => dir.path(),
        };
        tracing::debug!(workdir = %path.display(), "Workdir prepared");
        Ok(path)
    }

    pub(crate) fn path(&self) -> Option<&Path> {
        self.current.as_ref().map(|prepared| match prepared {
            Prepared::Fixed(path) => path.as_path(),
            Prepared::Temporary(dir) => dir.path(),
        })
    }
}
