//! Application state.

use hookpipe_core::TriggerAuthenticator;
use hookpipe_core::pipeline::PipelineConfig;
use hookpipe_executor::PipelineExecutor;
use std::sync::Arc;

/// Shared application state. Constructed once at startup and passed to
/// the router; there is no ambient singleton.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<PipelineConfig>,
    pub authenticator: Arc<TriggerAuthenticator>,
    pub executor: Arc<PipelineExecutor>,
}

impl AppState {
    pub fn new(config: PipelineConfig, executor: PipelineExecutor) -> Self {
        let authenticator = Arc::new(TriggerAuthenticator::new(config.secret.clone()));
        Self {
            config: Arc::new(config),
            authenticator,
            executor: Arc::new(executor),
        }
    }
}
