use std::collections::HashMap;

use async_trait::async_trait;
use bollard::{
    Docker,
    container::{
        Config, CreateContainerOptions, LogsOptions, RemoveContainerOptions,
    },
    models::HostConfig,
};
use futures::StreamExt as _;
use tracing::{debug, warn};

use crate::client::{ContainerClient, ContainerStatus, ProviderError};

/// Docker-Engine-backed [`ContainerClient`], standing in for a cloud
/// container service's "container group" API — the operations (Create,
/// Status, Delete, Logs) map directly onto Docker's
/// create/inspect/remove/logs container calls, and `group_name` maps onto
/// the container name.
pub struct DockerContainerClient {
    docker: Docker,
}

impl DockerContainerClient {
    /// Connects via the local Docker socket, matching
    /// `Docker::connect_with_local_defaults()` used elsewhere for
    /// container-group-shaped workloads.
    pub fn connect_local() -> Result<Self, ProviderError> {
        let docker = Docker::connect_with_local_defaults()
            .map_err(|err| ProviderError::Fatal(err.to_string()))?;
        Ok(Self { docker })
    }

    #[must_use]
    pub fn from_docker(docker: Docker) -> Self {
        Self { docker }
    }
}

fn classify(err: bollard::errors::Error) -> ProviderError {
    let message = err.to_string();
    if message.contains("429") || message.to_lowercase().contains("too many requests") {
        ProviderError::Throttled
    } else {
        ProviderError::Fatal(message)
    }
}

#[async_trait]
impl ContainerClient for DockerContainerClient {
    async fn create(
        &self,
        group_name: &str,
        image: &str,
        env: &HashMap<String, String>,
        cpu_cores: f64,
        memory_gib: f64,
    ) -> Result<String, ProviderError> {
        let env_vars: Vec<String> = env.iter().map(|(k, v)| format!("{k}={v}")).collect();
        #[allow(clippy::cast_possible_truncation)]
        let nano_cpus = (cpu_cores * 1_000_000_000.0) as i64;
        #[allow(clippy::cast_possible_truncation)]
        let memory_bytes = (memory_gib * 1024.0 * 1024.0 * 1024.0) as i64;

        let response = self
            .docker
            .create_container(
                Some(CreateContainerOptions {
                    name: group_name.to_owned(),
                    platform: None,
                }),
                Config {
                    image: Some(image.to_owned()),
                    env: Some(env_vars),
                    host_config: Some(HostConfig {
                        nano_cpus: Some(nano_cpus),
                        memory: Some(memory_bytes),
                        ..Default::default()
                    }),
                    ..Default::default()
                },
            )
            .await
            .map_err(classify)?;

        debug!(group_name, container_id = %response.id, "created container");

        self.docker
            .start_container::<String>(&response.id, None)
            .await
            .map_err(classify)?;

        Ok(response.id)
    }

    async fn status(&self, provider_id: &str) -> Result<ContainerStatus, ProviderError> {
        let inspect = match self.docker.inspect_container(provider_id, None).await {
            Ok(inspect) => inspect,
            Err(bollard::errors::Error::DockerResponseServerError { status_code: 404, .. }) => {
                return Ok(ContainerStatus::Unknown);
            }
            Err(err) => return Err(classify(err)),
        };

        let Some(state) = inspect.state else {
            return Ok(ContainerStatus::Unknown);
        };

        match state.status {
            Some(bollard::models::ContainerStateStatusEnum::RUNNING) => Ok(ContainerStatus::Running),
            Some(bollard::models::ContainerStateStatusEnum::EXITED) => Ok(ContainerStatus::Terminated {
                exit_code: state.exit_code.unwrap_or(-1) as i32,
            }),
            _ => Ok(ContainerStatus::Unknown),
        }
    }

    async fn delete(&self, provider_id: &str) -> Result<(), ProviderError> {
        match self
            .docker
            .remove_container(
                provider_id,
                Some(RemoveContainerOptions {
                    force: true,
                    ..Default::default()
                }),
            )
            .await
        {
            Ok(()) => Ok(()),
            Err(bollard::errors::Error::DockerResponseServerError { status_code: 404, .. }) => Ok(()),
            Err(err) => Err(classify(err)),
        }
    }

    async fn logs(&self, provider_id: &str) -> Result<Vec<u8>, ProviderError> {
        let mut stream = self.docker.logs::<String>(
            provider_id,
            Some(LogsOptions {
                stdout: true,
                stderr: true,
                ..Default::default()
            }),
        );

        let mut collected = Vec::new();
        while let Some(chunk) = stream.next().await {
            match chunk {
                Ok(output) => collected.extend_from_slice(&output.into_bytes()),
                Err(err) => {
                    warn!(provider_id, error = %err, "log stream ended early");
                    break;
                }
            }
        }
        Ok(collected)
    }
}
