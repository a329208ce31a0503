use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SupervisorError {
    #[error("Pool size must be at least 1")]
    EmptyPool,

    #[error("Workers did not become ready within {0:?}")]
    StartupTimeout(Duration),

    #[error("Worker pool failed to start: {0}")]
    StartupFailed(String),

    #[error("Supervisor is shut down")]
    ShutDown,
}
