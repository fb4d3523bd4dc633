use std::path::Path;

use flate2::Compression;
use flate2::write::GzEncoder;

use crate::error::{BuildError, Result};

/// Archive a build directory into an in-memory `.tar.gz`.
///
/// Entry paths are relative to `build_dir` itself and added in sorted
/// order. The gzip stream is finished before the bytes are returned.
pub fn package(build_dir: &Path) -> Result<Vec<u8>> {
    let archive_err = |e: std::io::Error| BuildError::Archive {
        path: build_dir.to_path_buf(),
        source: e,
    };

    let encoder = GzEncoder::new(Vec::new(), Compression::best());
    let mut builder = tar::Builder::new(encoder);

    append_dir_contents(&mut builder, build_dir, Path::new(""))?;

    let encoder = builder.into_inner().map_err(archive_err)?;
    let bytes = encoder.finish().map_err(archive_err)?;

    tracing::debug!(path = %build_dir.display(), bytes = bytes.len(), "build context packaged");
    Ok(bytes)
}

/// Recursively add the contents of `dir` under the archive path `prefix`.
fn append_dir_contents<W: std::io::Write>(
    builder: &mut tar::Builder<W>,
    dir: &Path,
    prefix: &Path,
) -> Result<()> {
    let read_dir = std::fs::read_dir(dir).map_err(|e| BuildError::ReadDir {
        path: dir.to_path_buf(),
        source: e,
    })?;

    let mut entries = Vec::new();
    for entry in read_dir {
        let entry = entry.map_err(|e| BuildError::ReadDir {
            path: dir.to_path_buf(),
            source: e,
        })?;
        entries.push(entry);
    }
    entries.sort_by_key(|entry| entry.file_name());

    for entry in entries {
        let path = entry.path();
        let archive_path = prefix.join(entry.file_name());
        let archive_err = |e: std::io::Error| BuildError::Archive {
            path: path.clone(),
            source: e,
        };

        if path.is_dir() {
            builder
                .append_dir(&archive_path, &path)
                .map_err(archive_err)?;
            append_dir_contents(builder, &path, &archive_path)?;
        } else {
            builder
                .append_path_with_name(&path, &archive_path)
                .map_err(archive_err)?;
        }
    }

    Ok(())
}
