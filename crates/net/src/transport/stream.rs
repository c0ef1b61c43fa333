//! Body streaming shared by every transport

use crate::session::{Progress, TransferSession};
use bytes::Bytes;
use fetchr_errors::{Error, NetworkError};
use futures::{Stream, StreamExt};
use std::fmt::Display;
use std::time::Duration;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;

/// Knobs for one body copy
pub(crate) struct CopyParams<'a> {
    /// Longest wait for the next chunk before the transfer times out
    pub chunk_timeout: Duration,
    /// Body length the peer declared, checked once the stream ends
    pub expected_len: Option<u64>,
    /// Running digest of the destination contents
    pub hasher: Option<&'a mut blake3::Hasher>,
}

/// Copy `stream` into `file`, reporting progress through the session
///
/// Cancellation is checked before every chunk and while waiting for one.
/// Returns the number of body bytes written.
pub(crate) async fn copy_body<S, E>(
    session: &mut TransferSession,
    stream: S,
    file: &mut File,
    mut params: CopyParams<'_>,
    on_progress: &mut (dyn FnMut(Progress) + Send),
) -> Result<u64, Error>
where
    S: Stream<Item = Result<Bytes, E>>,
    E: Display,
{
    let cancel = session.cancellation_token();
    let mut stream = std::pin::pin!(stream);
    let mut received = 0u64;
    let mut reported = None;

    loop {
        session.check_cancelled()?;

        let next = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(Error::Cancelled),
            next = tokio::time::timeout(params.chunk_timeout, stream.next()) => next,
        };

        let chunk = match next {
            Ok(Some(chunk)) => chunk.map_err(|e| NetworkError::DownloadFailed(e.to_string()))?,
            Ok(None) => break,
            Err(_) => {
                return Err(NetworkError::Timeout {
                    url: session.url().to_string(),
                }
                .into());
            }
        };

        file.write_all(&chunk)
            .await
            .map_err(|e| Error::io_with_path(&e, session.destination()))?;
        if let Some(hasher) = params.hasher.as_deref_mut() {
            hasher.update(&chunk);
        }

        received += chunk.len() as u64;
        let progress = session.advance(chunk.len() as u64);

        if session.should_report() {
            session.report(on_progress);
            reported = Some(progress.bytes_so_far);
        }
    }

    file.flush()
        .await
        .map_err(|e| Error::io_with_path(&e, session.destination()))?;

    if let Some(expected) = params.expected_len {
        if received != expected {
            return Err(NetworkError::LengthMismatch {
                expected,
                actual: received,
            }
            .into());
        }
    }

    if reported != Some(session.progress().bytes_so_far) {
        session.report(on_progress);
    }

    Ok(received)
}
