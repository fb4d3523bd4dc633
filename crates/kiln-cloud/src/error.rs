use kiln_build::BuildError;

#[derive(Debug, thiserror::Error)]
pub enum ControlPlaneError {
    #[error("sandbox '{name}' not found")]
    NotFound { name: String },

    #[error("control plane returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("control plane request failed")]
    Request { source: reqwest::Error },

    #[error("failed to decode control plane response")]
    Decode { source: reqwest::Error },
}

#[derive(Debug, thiserror::Error)]
pub enum DeployError {
    #[error("failed to prepare build context")]
    Build(#[from] BuildError),

    #[error("failed to create or update sandbox '{name}': {source}")]
    Creation {
        name: String,
        source: ControlPlaneError,
    },

    #[error("control plane returned no upload URL for sandbox '{name}'")]
    MissingUploadUrl { name: String },

    #[error("failed to upload build context for sandbox '{name}': {source}")]
    Upload {
        name: String,
        source: ControlPlaneError,
    },

    #[error("failed to read status of sandbox '{name}'")]
    StatusPoll {
        name: String,
        source: ControlPlaneError,
    },

    #[error("deployment of sandbox '{name}' failed with status {status}")]
    Failed { name: String, status: String },

    #[error("sandbox '{name}' was terminated during deployment (status {status})")]
    Terminated { name: String, status: String },

    #[error("deployment of sandbox '{name}' timed out after {elapsed_secs}s")]
    Timeout { name: String, elapsed_secs: u64 },

    #[error("failed to fetch deployed sandbox '{name}'")]
    FinalFetch {
        name: String,
        source: ControlPlaneError,
    },
}
