use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tempfile::TempDir;

use crate::error::{BuildError, Result};
use crate::image::Image;

pub const DOCKERFILE_NAME: &str = "Dockerfile";
pub const MANIFEST_NAME: &str = "manifest.json";

/// Summary written next to the Dockerfile in every build directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    pub base_image: String,
    pub hash: String,
    pub instructions_count: usize,
    pub local_files_count: usize,
}

impl Manifest {
    /// Read the manifest of a materialized build directory.
    pub fn read(build_dir: &Path) -> Result<Self> {
        let path = build_dir.join(MANIFEST_NAME);
        let content = std::fs::read_to_string(&path)
            .map_err(|e| BuildError::ReadManifest { path, source: e })?;
        serde_json::from_str(&content).map_err(|e| BuildError::Manifest { source: e })
    }
}

/// Materialize an image's build context as `destination_root/name`.
///
/// `name` defaults to `image-{hash}`. The content hash is computed before
/// anything touches the filesystem, so a missing local file fails without
/// leaving a partial directory behind. Returns the build directory.
pub fn write(image: &Image, destination_root: &Path, name: Option<&str>) -> Result<PathBuf> {
    let hash = image.hash()?;
    let dockerfile = image.dockerfile()?;
    let spec = image.instruction_set();

    let name = match name {
        Some(name) => name.to_owned(),
        None => format!("image-{hash}"),
    };
    let build_dir = destination_root.join(&name);

    std::fs::create_dir_all(&build_dir).map_err(|e| BuildError::CreateDir {
        path: build_dir.clone(),
        source: e,
    })?;

    let dockerfile_path = build_dir.join(DOCKERFILE_NAME);
    std::fs::write(&dockerfile_path, dockerfile).map_err(|e| BuildError::Write {
        path: dockerfile_path,
        source: e,
    })?;

    let manifest = Manifest {
        base_image: spec.base_image().to_owned(),
        hash,
        instructions_count: spec.instructions().len(),
        local_files_count: spec.local_files().len(),
    };
    let manifest_json =
        serde_json::to_string_pretty(&manifest).map_err(|e| BuildError::Manifest { source: e })?;
    let manifest_path = build_dir.join(MANIFEST_NAME);
    std::fs::write(&manifest_path, manifest_json).map_err(|e| BuildError::Write {
        path: manifest_path,
        source: e,
    })?;

    for file in spec.local_files() {
        let dst = build_dir.join(&file.context_name);
        copy_local(&file.source, &dst)?;
    }

    tracing::info!(
        path = %build_dir.display(),
        hash = %manifest.hash,
        local_files = manifest.local_files_count,
        "build context written"
    );

    Ok(build_dir)
}

/// A build context written under a temporary root.
///
/// The root, and everything under it, is deleted when this value is dropped
/// or [`close`](TempBuild::close)d.
#[derive(Debug)]
pub struct TempBuild {
    root: TempDir,
    build_dir: PathBuf,
}

impl TempBuild {
    /// The build directory (`{root}/image-{hash}` unless named).
    pub fn path(&self) -> &Path {
        &self.build_dir
    }

    pub fn root(&self) -> &Path {
        self.root.path()
    }

    /// Delete the temporary root now, reporting failures.
    pub fn close(self) -> std::io::Result<()> {
        self.root.close()
    }
}

/// Like [`write`], under a fresh root in the system temp directory.
pub fn write_temp(image: &Image, name: Option<&str>) -> Result<TempBuild> {
    write_temp_in(image, &std::env::temp_dir(), name)
}

/// Like [`write_temp`], with the temporary root created inside `parent`.
pub fn write_temp_in(image: &Image, parent: &Path, name: Option<&str>) -> Result<TempBuild> {
    let root = tempfile::Builder::new()
        .prefix("kiln-build-")
        .tempdir_in(parent)
        .map_err(|e| BuildError::CreateDir {
            path: parent.to_path_buf(),
            source: e,
        })?;
    let build_dir = write(image, root.path(), name)?;
    Ok(TempBuild { root, build_dir })
}

/// Copy a bound file or directory into the build directory.
fn copy_local(src: &Path, dst: &Path) -> Result<()> {
    let metadata = match std::fs::metadata(src) {
        Ok(m) => m,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(BuildError::LocalFileNotFound {
                path: src.to_path_buf(),
            });
        }
        Err(e) => {
            return Err(BuildError::Metadata {
                path: src.to_path_buf(),
                source: e,
            });
        }
    };

    // Replace whatever a previous write left behind
    if dst.is_dir() {
        std::fs::remove_dir_all(dst).map_err(|e| BuildError::Cleanup {
            path: dst.to_path_buf(),
            source: e,
        })?;
    }

    if metadata.is_dir() {
        copy_dir_recursive(src, dst)
    } else {
        std::fs::copy(src, dst).map_err(|e| BuildError::CopyFile {
            path: src.to_path_buf(),
            source: e,
        })?;
        Ok(())
    }
}

fn copy_dir_recursive(src: &Path, dst: &Path) -> Result<()> {
    std::fs::create_dir_all(dst).map_err(|e| BuildError::CreateDir {
        path: dst.to_path_buf(),
        source: e,
    })?;

    let entries = std::fs::read_dir(src).map_err(|e| BuildError::ReadDir {
        path: src.to_path_buf(),
        source: e,
    })?;

    for entry in entries {
        let entry = entry.map_err(|e| BuildError::ReadDir {
            path: src.to_path_buf(),
            source: e,
        })?;
        let from = entry.path();
        let to = dst.join(entry.file_name());

        if from.is_dir() {
            copy_dir_recursive(&from, &to)?;
        } else {
            std::fs::copy(&from, &to).map_err(|e| BuildError::CopyFile {
                path: from.clone(),
                source: e,
            })?;
        }
    }

    Ok(())
}
