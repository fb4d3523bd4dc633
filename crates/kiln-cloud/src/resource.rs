use serde::{Deserialize, Serialize};

/// Sandbox definition sent on create and update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SandboxResource {
    pub metadata: Metadata,
    pub spec: SandboxSpec,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SandboxSpec {
    pub runtime: Runtime,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Runtime {
    /// Memory limit in MB
    pub memory: u32,
}

impl SandboxResource {
    pub fn new(name: &str, memory: u32) -> Self {
        Self {
            metadata: Metadata {
                name: name.to_owned(),
            },
            spec: SandboxSpec {
                runtime: Runtime { memory },
            },
        }
    }
}

/// A sandbox as reported by the control plane.
///
/// Fields kiln does not interpret are kept in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RemoteResource {
    #[serde(default)]
    pub metadata: Metadata,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Response to a create or update that requested an upload destination.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UploadTicket {
    pub upload_url: Option<String>,
}
