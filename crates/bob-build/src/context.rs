//! ビルドコンテキストのステージング
//!
//! リポジトリから workdir へ、ユニットごとのファイルセットをコピーします。

use crate::error::{BuildError, Result};
use bob_core::{DEFAULT_DOCKERFILE, SubSequenceMetadata};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

pub struct ContextStager;

impl ContextStager {
    /// コピー対象のエントリ名を決定
    ///
    /// 1. included（空ならリポジトリ直下の全エントリ）
    /// 2. excluded を除外
    /// 3. "Dockerfile" を除外
    /// 4. 設定された Dockerfile を追加
    pub fn entries(repo_dir: &Path, metadata: &SubSequenceMetadata) -> Result<BTreeSet<String>> {
        let mut entries: BTreeSet<String> = if metadata.included.is_empty() {
            Self::list_repo(repo_dir)?
        } else {
            metadata.included.iter().cloned().collect()
        };

        for excluded in &metadata.excluded {
            entries.remove(excluded);
        }
        entries.remove(DEFAULT_DOCKERFILE);
        entries.insert(metadata.dockerfile.clone());

        Ok(entries)
    }

    fn list_repo(repo_dir: &Path) -> Result<BTreeSet<String>> {
        let read_dir = fs::read_dir(repo_dir).map_err(|source| BuildError::Staging {
            path: repo_dir.to_path_buf(),
            source,
        })?;

        let mut names = BTreeSet::new();
        for entry in read_dir {
            let entry = entry.map_err(|source| BuildError::Staging {
                path: repo_dir.to_path_buf(),
                source,
            })?;
            match entry.file_name().into_string() {
                Ok(name) => {
                    names.insert(name);
                }
                Err(name) => {
                    tracing::warn!(name = ?name, "Skipping non UTF-8 entry");
                }
            }
        }
        Ok(names)
    }

    /// ファイルセットを workdir にコピー
    ///
    /// 設定された Dockerfile は `Dockerfile` という名前でコピーされます。
    /// 最初のコピー失敗でステージングを中断します。
    pub fn stage(
        repo_dir: &Path,
        workdir: &Path,
        metadata: &SubSequenceMetadata,
    ) -> Result<Vec<PathBuf>> {
        let entries = Self::entries(repo_dir, metadata)?;
        let mut staged = Vec::with_capacity(entries.len());

        for entry in &entries {
            let src = repo_dir.join(entry);
            let dest = if *entry == metadata.dockerfile {
                workdir.join(DEFAULT_DOCKERFILE)
            } else {
                workdir.join(entry)
            };

            copy_entry(&src, &dest).map_err(|source| BuildError::Staging {
                path: src.clone(),
                source,
            })?;
            staged.push(dest);
        }

        tracing::debug!(
            unit = %metadata.name,
            entries = staged.len(),
            workdir = %workdir.display(),
            "Build context staged"
        );
        Ok(staged)
    }
}

fn copy_entry(src: &Path, dest: &Path) -> std::io::Result<()> {
    let meta = fs::metadata(src)?;
    if !meta.is_dir() {
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::copy(src, dest)?;
        return Ok(());
    }

    for entry in WalkDir::new(src) {
        let entry = entry.map_err(std::io::Error::other)?;
        let relative = entry
            .path()
            .strip_prefix(src)
            .map_err(std::io::Error::other)?;
        let target = dest.join(relative);

        if entry.file_type().is_dir() {
            fs::create_dir_all(&target)?;
        } else {
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}
