use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use kiln_build::{Image, bundle, package, sandbox};
use kiln_core::{DeployConfig, KilnConfig, SandboxConfig, StatusLabels};
use secrecy::SecretString;
use tokio::time::Instant;

use crate::control_plane::{ControlPlane, HttpControlPlane};
use crate::error::{ControlPlaneError, DeployError};
use crate::resource::{RemoteResource, SandboxResource};
use crate::status::{DeploymentStatus, PollOutcome, PollState};

/// Callback invoked with each newly observed remote status.
pub type StatusObserver = Box<dyn Fn(&str) + Send + Sync>;

/// Parameters for one build-and-deploy call.
pub struct DeployOptions {
    pub name: String,
    /// Memory limit in MB
    pub memory: u32,
    pub timeout: Duration,
    pub runtime_version: String,
    pub poll_interval: Duration,
    on_status_change: Option<StatusObserver>,
}

impl DeployOptions {
    pub fn new(name: impl Into<String>) -> Self {
        Self::from_config(name, &DeployConfig::default())
    }

    pub fn from_config(name: impl Into<String>, config: &DeployConfig) -> Self {
        Self {
            name: name.into(),
            memory: config.memory,
            timeout: Duration::from_millis(config.timeout_ms),
            runtime_version: config.runtime_version.clone(),
            poll_interval: Duration::from_millis(config.poll_interval_ms),
            on_status_change: None,
        }
    }

    pub fn memory(mut self, memory: u32) -> Self {
        self.memory = memory;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn runtime_version(mut self, version: impl Into<String>) -> Self {
        self.runtime_version = version.into();
        self
    }

    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn on_status_change(mut self, observer: impl Fn(&str) + Send + Sync + 'static) -> Self {
        self.on_status_change = Some(Box::new(observer));
        self
    }
}

impl fmt::Debug for DeployOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeployOptions")
            .field("name", &self.name)
            .field("memory", &self.memory)
            .field("timeout", &self.timeout)
            .field("runtime_version", &self.runtime_version)
            .field("poll_interval", &self.poll_interval)
            .field("on_status_change", &self.on_status_change.is_some())
            .finish()
    }
}

/// Builds an image's context and deploys it as a sandbox,
/// parameterized over the control plane for testability.
pub struct Deployer<C: ControlPlane = HttpControlPlane> {
    control_plane: C,
    statuses: StatusLabels,
    sandbox: SandboxConfig,
    /// Parent of the temporary build root (system temp dir when unset)
    temp_dir: Option<PathBuf>,
}

impl Deployer<HttpControlPlane> {
    pub fn from_config(config: &KilnConfig, token: Option<SecretString>) -> Self {
        let mut control_plane = HttpControlPlane::new(&config.control_plane);
        if let Some(token) = token {
            control_plane = control_plane.with_token(token);
        }
        Self {
            control_plane,
            statuses: config.control_plane.statuses.clone(),
            sandbox: config.sandbox.clone(),
            temp_dir: None,
        }
    }
}

impl<C: ControlPlane> Deployer<C> {
    pub fn with_control_plane(control_plane: C) -> Self {
        Self {
            control_plane,
            statuses: StatusLabels::default(),
            sandbox: SandboxConfig::default(),
            temp_dir: None,
        }
    }

    pub fn statuses(mut self, statuses: StatusLabels) -> Self {
        self.statuses = statuses;
        self
    }

    pub fn sandbox(mut self, sandbox: SandboxConfig) -> Self {
        self.sandbox = sandbox;
        self
    }

    /// Create temporary build roots inside `dir`.
    pub fn temp_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.temp_dir = Some(dir.into());
        self
    }

    /// Prepare, materialize, package, upload and wait for the deployment.
    ///
    /// The temporary build root lives exactly as long as this call: it is
    /// removed on every outcome, including when the future is dropped.
    pub async fn build(
        &self,
        image: &Image,
        options: DeployOptions,
    ) -> Result<RemoteResource, DeployError> {
        let prepared = sandbox::prepare_with(&self.sandbox, image, &options.runtime_version);
        let context = match &self.temp_dir {
            Some(dir) => bundle::write_temp_in(&prepared, dir, None)?,
            None => bundle::write_temp(&prepared, None)?,
        };

        let result = self.deploy_context(context.path(), &options).await;

        let root = context.root().to_path_buf();
        if let Err(e) = context.close() {
            tracing::warn!(path = %root.display(), error = %e, "failed to remove temporary build directory");
        }

        result
    }

    async fn deploy_context(
        &self,
        build_dir: &Path,
        options: &DeployOptions,
    ) -> Result<RemoteResource, DeployError> {
        let name = options.name.as_str();
        let archive = package::package(build_dir)?;

        let resource = SandboxResource::new(name, options.memory);
        let ticket = match self.control_plane.update(name, &resource).await {
            Ok(ticket) => ticket,
            Err(ControlPlaneError::NotFound { .. }) => {
                tracing::info!(name, "sandbox not found, creating");
                self.control_plane
                    .create(&resource)
                    .await
                    .map_err(|e| DeployError::Creation {
                        name: name.to_owned(),
                        source: e,
                    })?
            }
            Err(e) => {
                return Err(DeployError::Creation {
                    name: name.to_owned(),
                    source: e,
                });
            }
        };

        let upload_url = ticket
            .upload_url
            .ok_or_else(|| DeployError::MissingUploadUrl {
                name: name.to_owned(),
            })?;

        tracing::info!(name, bytes = archive.len(), "uploading build context");
        self.control_plane
            .upload(&upload_url, archive)
            .await
            .map_err(|e| DeployError::Upload {
                name: name.to_owned(),
                source: e,
            })?;

        self.wait_for_deployment(options).await?;

        self.control_plane
            .get(name)
            .await
            .map_err(|e| DeployError::FinalFetch {
                name: name.to_owned(),
                source: e,
            })
    }

    async fn wait_for_deployment(&self, options: &DeployOptions) -> Result<(), DeployError> {
        let name = options.name.as_str();
        let started = Instant::now();
        let mut state = PollState::default();

        loop {
            let remote = self
                .control_plane
                .get(name)
                .await
                .map_err(|e| DeployError::StatusPoll {
                    name: name.to_owned(),
                    source: e,
                })?;

            match remote.status.as_deref() {
                Some(raw) => {
                    let status = DeploymentStatus::classify(&self.statuses, raw);
                    let observation = state.observe(&status);

                    if observation.changed {
                        tracing::info!(name, status = raw, "deployment status changed");
                        if let Some(observer) = &options.on_status_change {
                            observer(raw);
                        }
                    }

                    match observation.outcome {
                        PollOutcome::Succeeded => {
                            tracing::info!(
                                name,
                                elapsed_secs = started.elapsed().as_secs(),
                                "deployment succeeded"
                            );
                            return Ok(());
                        }
                        PollOutcome::Failed(status) => {
                            return Err(DeployError::Failed {
                                name: name.to_owned(),
                                status,
                            });
                        }
                        PollOutcome::Destroyed(status) => {
                            return Err(DeployError::Terminated {
                                name: name.to_owned(),
                                status,
                            });
                        }
                        PollOutcome::Continue => {}
                    }
                }
                None => tracing::debug!(name, "sandbox reported no status yet"),
            }

            tokio::time::sleep(options.poll_interval).await;

            let elapsed = started.elapsed();
            if elapsed >= options.timeout {
                return Err(DeployError::Timeout {
                    name: name.to_owned(),
                    elapsed_secs: elapsed.as_secs(),
                });
            }
        }
    }
}
