use anyhow::{Context, anyhow, bail};
use bob_job::{DEFAULT_BOBFILE, JobSpec};
use colored::Colorize;
use std::process::Command;

/// `git remote get-url origin` の結果から (owner, repo) を取り出す
///
/// `git@github.com:owner/repo.git` と `https://github.com/owner/repo(.git)` に対応。
pub fn parse_remote(url: &str) -> Option<(String, String)> {
    let url = url.trim();
    let path = if let Some(rest) = url.strip_prefix("git@") {
        rest.split_once(':')?.1
    } else if let Some((_, rest)) = url.split_once("://") {
        rest.split_once('/')?.1
    } else {
        return None;
    };

    let path = path.trim_end_matches('/').trim_end_matches(".git");
    let (owner, repo) = path.split_once('/')?;
    if owner.is_empty() || repo.is_empty() || repo.contains('/') {
        return None;
    }
    Some((owner.to_string(), repo.to_string()))
}

fn git(args: &[&str]) -> anyhow::Result<String> {
    let output = Command::new("git")
        .args(args)
        .output()
        .context("git を実行できません")?;
    if !output.status.success() {
        bail!(
            "git {} failed: {}",
            args.join(" "),
            String::from_utf8_lossy(&output.stderr).trim()
        );
    }
    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

pub async fn handle(file: Option<String>, host: &str, quiet: bool) -> anyhow::Result<()> {
    let remote = git(&["remote", "get-url", "origin"])?;
    let (account, repo) =
        parse_remote(&remote).ok_or_else(|| anyhow!("unsupported remote url: {}", remote))?;
    let git_ref = git(&["rev-parse", "--abbrev-ref", "HEAD"])?;

    let mut spec = JobSpec::new(account, repo, git_ref);
    spec.bobfile = file.filter(|f| f != DEFAULT_BOBFILE);
    spec.validate()?;

    let url = format!("{}/docker-build", host.trim_end_matches('/'));
    tracing::info!(url = %url, account = %spec.account, repo = %spec.repo, git_ref = %spec.git_ref, "Enqueueing build");

    let response = reqwest::Client::new()
        .post(&url)
        .json(&spec)
        .send()
        .await
        .with_context(|| format!("{} に接続できません", url))?;

    let status = response.status();
    let body: serde_json::Value = response.json().await.unwrap_or_default();
    if !status.is_success() {
        let message = body["error"].as_str().unwrap_or("unknown error");
        bail!("build request rejected ({}): {}", status, message);
    }

    if !quiet {
        println!("{}", "✓ ビルドを投入しました".green());
        if let Some(id) = body["id"].as_str() {
            println!("  job: {}", id.cyan());
        }
        if let Some(route) = body["logs_route"].as_str() {
            println!("  logs: {}{}", host.trim_end_matches('/'), route);
        }
    }
    Ok(())
}
