use bob_config::ServerConfig;
use bob_job::JobRunner;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub runner: JobRunner,
    pub config: Arc<ServerConfig>,
}

impl AppState {
    pub fn new(runner: JobRunner, config: ServerConfig) -> Self {
        Self {
            runner,
            config: Arc::new(config),
        }
    }
}
