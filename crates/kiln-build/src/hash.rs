use std::path::Path;
use std::time::UNIX_EPOCH;

use sha2::{Digest, Sha256};

use crate::dockerfile::DockerfileGenerator;
use crate::error::{BuildError, Result};
use crate::instructions::InstructionSet;

/// Length of the hex content address.
pub const HASH_LEN: usize = 12;

/// Compute the content address of an instruction set.
///
/// The digest covers the rendered Dockerfile plus one
/// `\n{context_name}:{mtime_millis}` line per bound local file, in binding
/// order. Fails on the first bound file that no longer exists.
pub fn content_hash(spec: &InstructionSet) -> Result<String> {
    let mut material = DockerfileGenerator::new(spec).render();

    for file in spec.local_files() {
        let mtime = modified_millis(&file.source)?;
        material.push_str(&format!("\n{}:{}", file.context_name, mtime));
    }

    let digest = Sha256::digest(material.as_bytes());
    let mut address = hex::encode(digest);
    address.truncate(HASH_LEN);
    Ok(address)
}

/// Modification time in milliseconds relative to the Unix epoch.
fn modified_millis(path: &Path) -> Result<i128> {
    let metadata = match std::fs::metadata(path) {
        Ok(m) => m,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(BuildError::LocalFileNotFound {
                path: path.to_path_buf(),
            });
        }
        Err(e) => {
            return Err(BuildError::Metadata {
                path: path.to_path_buf(),
                source: e,
            });
        }
    };

    let modified = metadata.modified().map_err(|e| BuildError::Metadata {
        path: path.to_path_buf(),
        source: e,
    })?;

    let millis = match modified.duration_since(UNIX_EPOCH) {
        Ok(after) => after.as_millis() as i128,
        Err(before) => -(before.duration().as_millis() as i128),
    };
    Ok(millis)
}
