//! Scratch destinations for transfers that were not given one

use fetchr_errors::{Error, StorageError};
use std::path::{Path, PathBuf};

/// File name prefix of every resolved destination
pub const DESTINATION_PREFIX: &str = "dl-";

/// Create a new, empty, uniquely named file in `scratch_dir`
///
/// The name is `dl-` followed by a random suffix and the file is created
/// with create-exclusive semantics, so concurrent callers can never be handed
/// the same path. The file outlives this call; the caller owns deleting it.
///
/// # Errors
///
/// Returns a storage error if the directory is missing, not writable, or the
/// exclusive create is rejected.
pub fn resolve(scratch_dir: &Path) -> Result<PathBuf, Error> {
    let file = tempfile::Builder::new()
        .prefix(DESTINATION_PREFIX)
        .tempfile_in(scratch_dir)
        .map_err(|e| StorageError::from_io_with_path(&e, scratch_dir))?;

    let (_file, path) = file
        .keep()
        .map_err(|e| StorageError::from_io_with_path(&e.error, scratch_dir))?;

    tracing::trace!(path = %path.display(), "resolved scratch destination");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use fetchr_errors::FailureKind;

    #[test]
    fn resolved_files_are_empty_and_prefixed() {
        let dir = tempfile::tempdir().unwrap();
        let path = resolve(dir.path()).unwrap();

        assert_eq!(path.parent(), Some(dir.path()));
        let name = path.file_name().unwrap().to_string_lossy();
        assert!(name.starts_with(DESTINATION_PREFIX));
        assert!(name.len() > DESTINATION_PREFIX.len());
        assert_eq!(std::fs::metadata(&path).unwrap().len(), 0);
    }

    #[test]
    fn missing_directory_is_an_io_failure() {
        let dir = tempfile::tempdir().unwrap();
        let err = resolve(&dir.path().join("missing")).unwrap_err();
        assert_eq!(err.failure_kind(), FailureKind::IoFailure);
    }
}
