#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {var}: '{value}' ({reason})")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },

    #[error("At least one worker is required")]
    ZeroWorkers,

    #[error("At least one fetch attempt is required")]
    ZeroFetchAttempts,

    #[error("Fetch timeout must be greater than zero")]
    ZeroFetchTimeout,

    #[error("Skipped page limit must be greater than zero when set")]
    ZeroSkippedPages,

    #[error("Server host must not be empty")]
    EmptyServerHost,

    #[error("Proxy password given without a proxy user")]
    ProxyPasswordWithoutUser,
}
