//! Partial destination handling for resumable transfers

use fetchr_errors::Error;
use std::path::Path;
use tokio::fs as tokio_fs;
use tokio::io::AsyncReadExt;

const HASH_BUFFER_SIZE: usize = 64 * 1024;

/// Length of what is already in the destination; zero when it does not exist
///
/// # Errors
///
/// Returns an error if the metadata lookup fails for any reason other than
/// the file being absent.
pub(crate) async fn existing_len(dest_path: &Path) -> Result<u64, Error> {
    match tokio_fs::metadata(dest_path).await {
        Ok(metadata) => Ok(metadata.len()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(0),
        Err(e) => Err(Error::io_with_path(&e, dest_path)),
    }
}

/// Hash the first `bytes` of the destination so a resumed body extends it
pub(crate) async fn hash_prefix(dest_path: &Path, bytes: u64) -> Result<blake3::Hasher, Error> {
    let mut file = tokio_fs::File::open(dest_path)
        .await
        .map_err(|e| Error::io_with_path(&e, dest_path))?;
    let mut hasher = blake3::Hasher::new();
    let mut buffer = vec![0; HASH_BUFFER_SIZE];
    let mut remaining = bytes;

    while remaining > 0 {
        let to_read =
            usize::try_from(std::cmp::min(buffer.len() as u64, remaining)).unwrap_or(buffer.len());
        let bytes_read = file.read(&mut buffer[..to_read]).await?;

        if bytes_read == 0 {
            break;
        }

        hasher.update(&buffer[..bytes_read]);
        remaining -= bytes_read as u64;
    }

    Ok(hasher)
}

/// Parse `Content-Range: bytes <start>-<end>/<total>` into start and total
///
/// The total is `None` when the server sends `*`.
pub(crate) fn parse_content_range(value: &str) -> Option<(u64, Option<u64>)> {
    let spec = value.trim().strip_prefix("bytes")?.trim_start();
    let (range, total) = spec.split_once('/')?;
    let (start, _end) = range.split_once('-')?;
    let start = start.trim().parse().ok()?;
    let total = match total.trim() {
        "*" => None,
        total => Some(total.parse().ok()?),
    };
    Some((start, total))
}
