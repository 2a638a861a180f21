//! SHA-256 digests of produced images.

use std::path::Path;

use debimg_common::error::{DebimgError, Result};
use debimg_common::types::Sha256Hash;
use sha2::{Digest, Sha256};

/// Computes the SHA-256 hash of a file.
///
/// # Errors
///
/// Returns an error if the file cannot be read.
pub fn hash_file(path: &Path) -> Result<Sha256Hash> {
    tracing::debug!(path = %path.display(), "computing SHA-256 hash");
    let io_err = |e| DebimgError::Io {
        path: path.to_path_buf(),
        source: e,
    };

    let mut file = std::fs::File::open(path).map_err(io_err)?;
    let mut hasher = Sha256::new();
    let _ = std::io::copy(&mut file, &mut hasher).map_err(io_err)?;
    Sha256Hash::from_hex(format!("{:x}", hasher.finalize()))
}
