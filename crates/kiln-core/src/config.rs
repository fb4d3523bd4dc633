use std::path::Path;

use serde::{Deserialize, Serialize};

/// kiln.toml configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KilnConfig {
    #[serde(default)]
    pub image: ImageConfig,
    #[serde(default)]
    pub deploy: DeployConfig,
    #[serde(default)]
    pub sandbox: SandboxConfig,
    #[serde(default)]
    pub control_plane: ControlPlaneConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageConfig {
    /// Base image reference for the `FROM` line
    #[serde(default = "default_base_image")]
    pub base: String,
    /// Build steps, applied in order
    #[serde(default)]
    pub steps: Vec<Step>,
}

/// One build step as written in `[[image.steps]]`.
///
/// Each table carries exactly one key naming the step, e.g.
/// `run = ["apt-get update"]` or `copy = { src = "a", dest = "/b" }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    Run(Vec<String>),
    Workdir(String),
    /// `KEY=VALUE` entries
    Env(Vec<String>),
    Copy {
        src: String,
        dest: String,
    },
    LocalFile {
        path: String,
        dest: String,
        #[serde(default)]
        name: Option<String>,
    },
    LocalDir {
        path: String,
        dest: String,
        #[serde(default)]
        name: Option<String>,
    },
    Expose(Vec<u16>),
    Entrypoint(Vec<String>),
    User(String),
    /// `KEY=VALUE` entries
    Label(Vec<String>),
    Arg {
        name: String,
        #[serde(default)]
        default: Option<String>,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeployConfig {
    /// Remote resource name (required for deploy, may come from the CLI)
    pub name: Option<String>,
    /// Memory limit in MB
    #[serde(default = "default_memory")]
    pub memory: u32,
    /// Overall deadline for the status poll
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// Sandbox runtime version tag
    #[serde(default = "default_runtime_version")]
    pub runtime_version: String,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

/// Where the sandbox runtime binary comes from and where it is installed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SandboxConfig {
    /// Registry repository publishing the runtime, tagged by version
    #[serde(default = "default_sandbox_image")]
    pub image: String,
    /// Binary file name at the root of the runtime image
    #[serde(default = "default_sandbox_binary")]
    pub binary: String,
    #[serde(default = "default_install_path")]
    pub install_path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControlPlaneConfig {
    #[serde(default = "default_control_plane_url")]
    pub url: String,
    /// Response header carrying the pre-signed upload destination
    #[serde(default = "default_upload_url_header")]
    pub upload_url_header: String,
    #[serde(default)]
    pub statuses: StatusLabels,
}

/// Remote status labels that end a deployment poll.
///
/// Any label not listed here is treated as in progress.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusLabels {
    #[serde(default = "default_success_labels")]
    pub success: Vec<String>,
    #[serde(default = "default_failure_labels")]
    pub failure: Vec<String>,
    #[serde(default = "default_destroyed_labels")]
    pub destroyed: Vec<String>,
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            base: default_base_image(),
            steps: Vec::new(),
        }
    }
}

impl Default for DeployConfig {
    fn default() -> Self {
        Self {
            name: None,
            memory: default_memory(),
            timeout_ms: default_timeout_ms(),
            runtime_version: default_runtime_version(),
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            image: default_sandbox_image(),
            binary: default_sandbox_binary(),
            install_path: default_install_path(),
        }
    }
}

impl Default for ControlPlaneConfig {
    fn default() -> Self {
        Self {
            url: default_control_plane_url(),
            upload_url_header: default_upload_url_header(),
            statuses: StatusLabels::default(),
        }
    }
}

impl Default for StatusLabels {
    fn default() -> Self {
        Self {
            success: default_success_labels(),
            failure: default_failure_labels(),
            destroyed: default_destroyed_labels(),
        }
    }
}

impl KilnConfig {
    /// Load from kiln.toml in the given directory, or return defaults if not found.
    pub fn load(project_dir: &Path) -> crate::Result<Self> {
        let config_path = project_dir.join("kiln.toml");
        if config_path.exists() {
            let content =
                std::fs::read_to_string(&config_path).map_err(|e| crate::Error::ConfigLoad {
                    path: config_path.clone(),
                    source: e,
                })?;
            toml::from_str(&content).map_err(|e| crate::Error::ConfigParse {
                path: config_path,
                source: e,
            })
        } else {
            tracing::debug!(path = %config_path.display(), "no kiln.toml found, using defaults");
            Ok(Self::default())
        }
    }
}

/// Split a `KEY=VALUE` entry at the first `=`.
pub fn parse_key_value(field: &'static str, entry: &str) -> crate::Result<(String, String)> {
    match entry.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_owned(), value.to_owned()))
        }
        _ => Err(crate::Error::InvalidKeyValue {
            field,
            entry: entry.to_owned(),
        }),
    }
}

fn default_base_image() -> String {
    "debian:bookworm-slim".to_owned()
}

fn default_memory() -> u32 {
    4096
}

fn default_timeout_ms() -> u64 {
    900_000
}

fn default_runtime_version() -> String {
    "latest".to_owned()
}

fn default_poll_interval_ms() -> u64 {
    3_000
}

fn default_sandbox_image() -> String {
    "ghcr.io/kiln-rs/sandbox-runtime".to_owned()
}

fn default_sandbox_binary() -> String {
    "sandbox-api".to_owned()
}

fn default_install_path() -> String {
    "/usr/local/bin/sandbox-api".to_owned()
}

fn default_control_plane_url() -> String {
    "https://api.kiln.run/v1".to_owned()
}

fn default_upload_url_header() -> String {
    "x-kiln-upload-url".to_owned()
}

fn default_success_labels() -> Vec<String> {
    vec!["DEPLOYED".to_owned()]
}

fn default_failure_labels() -> Vec<String> {
    vec!["FAILED".to_owned()]
}

fn default_destroyed_labels() -> Vec<String> {
    vec!["TERMINATED".to_owned()]
}
