use crate::ServeArgs;
use anyhow::Context;
use bob_build::DockerEngine;
use bob_config::{BasicAuth, ServerConfig};
use bob_job::{GitFetcher, JobContext, JobRegistry, JobRunner};
use bob_server::AppState;
use std::sync::Arc;

impl From<ServeArgs> for ServerConfig {
    fn from(args: ServeArgs) -> Self {
        ServerConfig {
            port: args.port,
            basic_auth: BasicAuth::from_parts(args.username, args.password),
            api_token: args.api_token.filter(|t| !t.is_empty()),
            skip_push: args.skip_push,
            sync_by_default: args.sync,
            travis_enabled: !args.no_travis,
            travis_token: args.travis_token.filter(|t| !t.is_empty()),
            github_enabled: !args.no_github,
            github_secret: args.github_secret.filter(|s| !s.is_empty()),
        }
    }
}

pub async fn handle(args: ServeArgs) -> anyhow::Result<()> {
    let config = ServerConfig::from(args);

    let engine = DockerEngine::connect().map_err(|e| anyhow::anyhow!(e.user_message()))?;
    let context = JobContext {
        fetcher: Arc::new(GitFetcher::new(config.api_token.clone())),
        engine: Arc::new(engine),
        skip_push: config.skip_push,
    };
    let runner = JobRunner::new(JobRegistry::new(), context);

    bob_server::serve(AppState::new(runner, config))
        .await
        .context("HTTPサーバーの起動に失敗しました")
}
