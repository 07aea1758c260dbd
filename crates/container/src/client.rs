use std::collections::HashMap;

use async_trait::async_trait;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerStatus {
    Running,
    Terminated { exit_code: i32 },
    Unknown,
}

#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// Retryable: the provider is rate-limiting `Create` calls.
    #[error("provider throttled the request")]
    Throttled,
    #[error("provider call failed: {0}")]
    Fatal(String),
}

/// The provider capability contract, implemented by one group per
/// worker. `group_name` doubles as the idempotency key the Docker
/// backend uses for container naming.
#[async_trait]
pub trait ContainerClient: Send + Sync {
    async fn create(
        &self,
        group_name: &str,
        image: &str,
        env: &HashMap<String, String>,
        cpu_cores: f64,
        memory_gib: f64,
    ) -> Result<String, ProviderError>;

    async fn status(&self, provider_id: &str) -> Result<ContainerStatus, ProviderError>;

    async fn delete(&self, provider_id: &str) -> Result<(), ProviderError>;

    /// Best-effort; callers must not treat a `Fatal` here as worker failure.
    async fn logs(&self, provider_id: &str) -> Result<Vec<u8>, ProviderError>;
}
