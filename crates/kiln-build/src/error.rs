use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, BuildError>;

#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    // ── Dockerfile ──
    #[error("invalid Dockerfile: {reason}")]
    Syntax { reason: String },

    // ── Local files ──
    #[error("local file not found: {path}")]
    LocalFileNotFound { path: PathBuf },

    #[error("failed to resolve local path {path}")]
    ResolvePath {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to read metadata for {path}")]
    Metadata {
        path: PathBuf,
        source: std::io::Error,
    },

    // ── Materialization ──
    #[error("failed to create directory {path}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to clean up existing directory {path}")]
    Cleanup {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to read directory {path}")]
    ReadDir {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to copy {path}")]
    CopyFile {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to write {path}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to read manifest at {path}")]
    ReadManifest {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to encode or decode manifest")]
    Manifest { source: serde_json::Error },

    // ── Packaging ──
    #[error("failed to archive {path}")]
    Archive {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error(transparent)]
    Config(#[from] kiln_core::Error),
}
