use anyhow::{Context, bail};
use colored::Colorize;
use std::path::Path;

const BOBFILE_NAME: &str = "Bobfile";

/// 初期 Bobfile の内容
pub fn template(name: &str) -> String {
    format!(
        r#"version = 1

[docker]
build_opts = ["--rm", "--no-cache"]
tag_opts = ["--force"]

[container_globals]
registry = "quay.io/{name}"
skip_push = true
tags = [
  "git:branch",
  "git:sha",
  "git:tag",
  "latest",
]

[[container]]
name = "app"
Dockerfile = "Dockerfile"
project = "{name}"
"#
    )
}

pub fn handle(dir: &Path, quiet: bool) -> anyhow::Result<()> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("ディレクトリを作成できません: {}", dir.display()))?;

    let path = dir.join(BOBFILE_NAME);
    if path.exists() {
        bail!("{} は既に存在します", path.display());
    }

    let absolute = dir.canonicalize()?;
    let name = absolute
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("app");

    std::fs::write(&path, template(name))
        .with_context(|| format!("書き込みに失敗しました: {}", path.display()))?;

    if !quiet {
        println!("{}", "✓ Bobfile を作成しました".green());
        println!("  {}", path.display().to_string().cyan());
    }
    Ok(())
}
