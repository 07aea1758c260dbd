//! A deterministic, in-memory [`ContainerClient`] used by the Container
//! Manager's own test suite and by higher-level orchestrator tests: no
//! real provider, a state machine driven entirely by a script the test
//! author supplies up front.

use std::collections::HashMap;

use async_trait::async_trait;
use loadtest_container::{ContainerClient, ContainerStatus, ProviderError};
use tokio::sync::Mutex;

/// What the fake should do the Nth time `create` is called for a given
/// group name.
#[derive(Debug, Clone)]
pub enum ScriptedCreate {
    /// Accept immediately.
    Accept,
    /// Reject with a retryable throttle error.
    Throttled,
    /// Reject fatally (never reaches `running`).
    Fatal,
}

/// What status the fake should report once a group has been created.
#[derive(Debug, Clone, Copy)]
pub enum ScriptedLifecycle {
    /// Reports `Running` forever (the test drives completion via the blob
    /// marker instead).
    RunsForever,
    /// Never reports `Running` (drives the provisioning timeout).
    NeverStarts,
    /// Reports `Running` then `Terminated { exit_code }`.
    RunsThenExits { exit_code: i32 },
}

#[derive(Debug, Clone)]
pub struct WorkerScript {
    pub create: Vec<ScriptedCreate>,
    pub lifecycle: ScriptedLifecycle,
}

impl WorkerScript {
    #[must_use]
    pub fn succeeds() -> Self {
        Self {
            create: vec![ScriptedCreate::Accept],
            lifecycle: ScriptedLifecycle::RunsThenExits { exit_code: 0 },
        }
    }

    #[must_use]
    pub fn fails(exit_code: i32) -> Self {
        Self {
            create: vec![ScriptedCreate::Accept],
            lifecycle: ScriptedLifecycle::RunsThenExits { exit_code },
        }
    }

    #[must_use]
    pub fn never_starts() -> Self {
        Self {
            create: vec![ScriptedCreate::Accept],
            lifecycle: ScriptedLifecycle::NeverStarts,
        }
    }

    #[must_use]
    pub fn throttled_then_succeeds() -> Self {
        Self {
            create: vec![ScriptedCreate::Throttled, ScriptedCreate::Accept],
            lifecycle: ScriptedLifecycle::RunsThenExits { exit_code: 0 },
        }
    }

    #[must_use]
    pub fn runs_forever() -> Self {
        Self {
            create: vec![ScriptedCreate::Accept],
            lifecycle: ScriptedLifecycle::RunsForever,
        }
    }
}

struct Group {
    lifecycle: ScriptedLifecycle,
    /// How many times `status` has been polled; `RunsThenExits` flips to
    /// terminal after the first poll so tests don't need real time to pass.
    polls: u32,
    deleted: bool,
}

/// In-memory [`ContainerClient`] driven by a per-group-name [`WorkerScript`].
#[derive(Default)]
pub struct FakeContainerClient {
    scripts: Mutex<HashMap<String, (WorkerScript, usize)>>,
    groups: Mutex<HashMap<String, Group>>,
}

impl FakeContainerClient {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn script(&self, group_name: impl Into<String>, script: WorkerScript) {
        self.scripts.lock().await.insert(group_name.into(), (script, 0));
    }

    pub async fn was_deleted(&self, provider_id: &str) -> bool {
        self.groups
            .lock()
            .await
            .get(provider_id)
            .is_some_and(|group| group.deleted)
    }
}

#[async_trait]
impl ContainerClient for FakeContainerClient {
    async fn create(
        &self,
        group_name: &str,
        _image: &str,
        _env: &HashMap<String, String>,
        _cpu_cores: f64,
        _memory_gib: f64,
    ) -> Result<String, ProviderError> {
        let mut scripts = self.scripts.lock().await;
        let (script, step) = scripts
            .get_mut(group_name)
            .expect("test must script every group it creates");

        let action = script
            .create
            .get(*step)
            .or_else(|| script.create.last())
            .cloned()
            .unwrap_or(ScriptedCreate::Accept);
        *step += 1;

        match action {
            ScriptedCreate::Throttled => Err(ProviderError::Throttled),
            ScriptedCreate::Fatal => Err(ProviderError::Fatal("scripted fatal create".to_owned())),
            ScriptedCreate::Accept => {
                let lifecycle = script.lifecycle;
                self.groups.lock().await.insert(
                    group_name.to_owned(),
                    Group {
                        lifecycle,
                        polls: 0,
                        deleted: false,
                    },
                );
                Ok(group_name.to_owned())
            }
        }
    }

    async fn status(&self, provider_id: &str) -> Result<ContainerStatus, ProviderError> {
        let mut groups = self.groups.lock().await;
        let Some(group) = groups.get_mut(provider_id) else {
            return Ok(ContainerStatus::Unknown);
        };
        group.polls += 1;

        Ok(match group.lifecycle {
            ScriptedLifecycle::NeverStarts => ContainerStatus::Unknown,
            ScriptedLifecycle::RunsForever => ContainerStatus::Running,
            ScriptedLifecycle::RunsThenExits { exit_code } => {
                if group.polls == 1 {
                    ContainerStatus::Running
                } else {
                    ContainerStatus::Terminated { exit_code }
                }
            }
        })
    }

    async fn delete(&self, provider_id: &str) -> Result<(), ProviderError> {
        if let Some(group) = self.groups.lock().await.get_mut(provider_id) {
            group.deleted = true;
        }
        Ok(())
    }

    async fn logs(&self, _provider_id: &str) -> Result<Vec<u8>, ProviderError> {
        Ok(Vec::new())
    }
}
