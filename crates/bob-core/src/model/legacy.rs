//! Bobfile バージョン移行
//!
//! version 0 は `[containers.global]` と `[containers.<name>]` で構成される。
//! version 1 への移行はフィールドの再配置のみで、ビルド内容は変えない。

use super::manifest::{BuildUnitSection, ManifestDocument};
use crate::error::{ManifestError, Result};

/// 現行のスキーマバージョン
const CURRENT_VERSION: i64 = 1;

/// 移行可能なレガシーバージョン
const LEGACY_VERSION: i64 = 0;

/// version 0 でグローバル設定を表すキー
const LEGACY_GLOBALS_KEY: &str = "global";

/// ドキュメントを現行スキーマに移行
pub fn migrate(mut doc: ManifestDocument) -> Result<ManifestDocument> {
    match doc.version {
        CURRENT_VERSION => {
            if !doc.legacy_containers.is_empty() {
                return Err(ManifestError::Decode(
                    "[containers.*] tables are only valid in version 0 Bobfiles; use [[container]]"
                        .to_string(),
                ));
            }
            Ok(doc)
        }
        LEGACY_VERSION => {
            tracing::info!(
                containers = doc.legacy_containers.len(),
                "Converting Bobfile from version 0 to version 1"
            );

            let legacy = std::mem::take(&mut doc.legacy_containers);
            let mut globals = doc.container_globals.take();

            for (key, mut section) in legacy {
                if key == LEGACY_GLOBALS_KEY {
                    if globals
                        .as_ref()
                        .is_some_and(|g| *g != BuildUnitSection::default())
                    {
                        return Err(ManifestError::Decode(
                            "both [container_globals] and [containers.global] are set".to_string(),
                        ));
                    }
                    globals = Some(section);
                    continue;
                }

                if section.name.is_none() {
                    section.name = Some(key);
                }
                doc.containers.push(section);
            }

            doc.container_globals = Some(globals.unwrap_or_default());
            doc.version = CURRENT_VERSION;
            Ok(doc)
        }
        other => Err(ManifestError::UnsupportedVersion(other)),
    }
}
