//! Bobfile 定義
//!
//! TOML形式：
//! ```toml
//! version = 1
//!
//! [docker]
//! build_opts = ["--rm", "--no-cache"]
//! tag_opts = ["--force"]
//!
//! [container_globals]
//! registry = "quay.io/modcloth"
//! tags = ["git:branch", "git:sha", "latest"]
//!
//! [[container]]
//! name = "app"
//! Dockerfile = "Dockerfile.app"
//! project = "style-gallery"
//! excluded = ["spec", "tmp"]
//! ```

use crate::tag::TagSpec;
use serde::{Deserialize, Deserializer, Serialize};

/// Bobfile のルート
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ManifestDocument {
    /// スキーマバージョン（未指定は 0 = レガシー形式）
    #[serde(default)]
    pub version: i64,
    /// docker コマンドに渡すグローバルオプション
    #[serde(default)]
    pub docker: DockerOptions,
    /// 全コンテナ共通のデフォルト値
    #[serde(default)]
    pub container_globals: Option<BuildUnitSection>,
    /// ビルド対象のコンテナ（記述順）
    #[serde(default, rename = "container")]
    pub containers: Vec<BuildUnitSection>,
    /// version 0 の `[containers.<name>]` テーブル（記述順）
    #[serde(
        default,
        rename = "containers",
        deserialize_with = "deserialize_named_sections"
    )]
    pub legacy_containers: Vec<(String, BuildUnitSection)>,
}

/// `[docker]` セクション
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DockerOptions {
    #[serde(default)]
    pub build_opts: Vec<String>,
    #[serde(default)]
    pub tag_opts: Vec<String>,
}

/// 1つのイメージに対応するコンテナセクション
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildUnitSection {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, rename = "Dockerfile", alias = "dockerfile")]
    pub dockerfile: Option<String>,
    #[serde(default)]
    pub included: Vec<String>,
    #[serde(default)]
    pub excluded: Vec<String>,
    #[serde(default)]
    pub registry: Option<String>,
    #[serde(default)]
    pub project: Option<String>,
    #[serde(default)]
    pub tags: Vec<TagSpec>,
    #[serde(default)]
    pub skip_push: bool,
}

fn deserialize_named_sections<'de, D>(
    deserializer: D,
) -> std::result::Result<Vec<(String, BuildUnitSection)>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;

    // preserve_order により記述順が保たれる
    let table = toml::Table::deserialize(deserializer)?;
    table
        .into_iter()
        .map(|(name, value)| {
            value
                .try_into::<BuildUnitSection>()
                .map(|section| (name.clone(), section))
                .map_err(|e| D::Error::custom(format!("containers.{}: {}", name, e)))
        })
        .collect()
}

fn clean_string(value: &mut Option<String>) {
    if value.as_deref().is_some_and(|s| s.trim().is_empty()) {
        *value = None;
    }
}

impl ManifestDocument {
    /// デコード直後の構造整理
    ///
    /// 空文字列は未設定として扱い、`container_globals` が無い場合は空のセクションを補う。
    pub fn clean(&mut self) {
        self.container_globals
            .get_or_insert_with(BuildUnitSection::default)
            .clean();

        for container in &mut self.containers {
            container.clean();
        }

        for (_, container) in &mut self.legacy_containers {
            container.clean();
        }
    }

    /// `container_globals`（クリーン後は常に Some）
    pub fn globals(&self) -> BuildUnitSection {
        self.container_globals.clone().unwrap_or_default()
    }
}

impl BuildUnitSection {
    pub fn clean(&mut self) {
        clean_string(&mut self.name);
        clean_string(&mut self.dockerfile);
        clean_string(&mut self.registry);
        clean_string(&mut self.project);
    }

    /// グローバル設定をマージ
    ///
    /// - 未設定の値はグローバルから継承
    /// - リストは空の場合のみ継承
    /// - skip_push は OR（一度立つとマージでは戻らない）
    /// - name は継承しない
    pub fn merge_globals(&mut self, globals: &BuildUnitSection) {
        if self.dockerfile.is_none() {
            self.dockerfile = globals.dockerfile.clone();
        }
        if self.registry.is_none() {
            self.registry = globals.registry.clone();
        }
        if self.project.is_none() {
            self.project = globals.project.clone();
        }
        if self.included.is_empty() {
            self.included = globals.included.clone();
        }
        if self.excluded.is_empty() {
            self.excluded = globals.excluded.clone();
        }
        if self.tags.is_empty() {
            self.tags = globals.tags.clone();
        }
        self.skip_push = self.skip_push || globals.skip_push;
    }

    /// イメージのリポジトリ名（`registry/project` または `project`）
    ///
    /// project が無い場合は name を使う。
    pub fn repository(&self) -> Option<String> {
        let project = self.project.as_deref().or(self.name.as_deref())?;
        Some(match self.registry.as_deref() {
            Some(registry) => format!("{}/{}", registry.trim_end_matches('/'), project),
            None => project.to_string(),
        })
    }
}
