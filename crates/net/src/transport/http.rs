//! Direct HTTP/HTTPS transport with range resume and cache tags

use super::cancellable;
use super::resume::{existing_len, hash_prefix, parse_content_range};
use super::stream::{copy_body, CopyParams};
use crate::client::NetClient;
use crate::session::{FetchReport, Progress, TransferSession};
use fetchr_errors::{Error, NetworkError};
use fetchr_events::{AppEvent, EventEmitter, GeneralEvent};
use reqwest::header::{CONTENT_RANGE, ETAG, IF_NONE_MATCH, RANGE};
use reqwest::{Response, StatusCode};
use std::path::Path;
use std::time::Duration;
use tokio::fs::{File, OpenOptions};

/// Result of one request against the origin
enum Attempt {
    Done(FetchReport),
    /// `416` for a ranged request; the partial file cannot be continued
    RangeRejected,
}

/// Transfers over plain HTTP/HTTPS
#[derive(Debug)]
pub struct HttpTransport {
    client: NetClient,
    session: TransferSession,
    chunk_timeout: Duration,
    cache_tag: Option<String>,
    expected_hash: Option<String>,
}

impl HttpTransport {
    #[must_use]
    pub fn new(client: NetClient, session: TransferSession, chunk_timeout: Duration) -> Self {
        Self {
            client,
            session,
            chunk_timeout,
            cache_tag: None,
            expected_hash: None,
        }
    }

    /// Send `If-None-Match` with this tag on full transfers
    #[must_use]
    pub fn with_cache_tag(mut self, tag: impl Into<String>) -> Self {
        self.cache_tag = Some(tag.into());
        self
    }

    /// Fail the transfer unless the finished file has this BLAKE3 hex digest
    #[must_use]
    pub fn with_expected_hash(mut self, hex: impl Into<String>) -> Self {
        self.expected_hash = Some(hex.into().to_ascii_lowercase());
        self
    }

    #[must_use]
    pub fn session(&self) -> &TransferSession {
        &self.session
    }

    /// Fetch the URL into the destination
    ///
    /// A non-empty destination is continued with a `Range` request. A `200`
    /// answer replaces it, a `206` extends it and a `416` restarts the
    /// transfer once from scratch.
    ///
    /// # Errors
    ///
    /// Returns an error for non-success statuses, network and file failures,
    /// length or checksum mismatches, and cancellation.
    pub async fn fetch(
        &mut self,
        on_progress: &mut (dyn FnMut(Progress) + Send),
    ) -> Result<FetchReport, Error> {
        self.session.check_cancelled()?;
        let offset = existing_len(self.session.destination()).await?;

        match self.attempt(offset, on_progress).await? {
            Attempt::Done(report) => Ok(report),
            Attempt::RangeRejected => {
                tracing::debug!(
                    url = %self.session.url(),
                    offset,
                    "range not satisfiable, restarting transfer"
                );
                self.session.emit(AppEvent::General(GeneralEvent::warning_with_context(
                    "server rejected the resume range; downloading from the start",
                    format!("discarding {offset} bytes"),
                )));
                match self.attempt(0, on_progress).await? {
                    Attempt::Done(report) => Ok(report),
                    Attempt::RangeRejected => Err(NetworkError::HttpError {
                        status: StatusCode::RANGE_NOT_SATISFIABLE.as_u16(),
                        message: StatusCode::RANGE_NOT_SATISFIABLE.to_string(),
                    }
                    .into()),
                }
            }
        }
    }

    async fn attempt(
        &mut self,
        offset: u64,
        on_progress: &mut (dyn FnMut(Progress) + Send),
    ) -> Result<Attempt, Error> {
        let url = self.session.url().as_str().to_string();
        let range = format!("bytes={offset}-");
        let mut headers = Vec::new();
        if offset > 0 {
            headers.push((RANGE.as_str(), range.as_str()));
        } else if let Some(tag) = &self.cache_tag {
            headers.push((IF_NONE_MATCH.as_str(), tag.as_str()));
        }

        tracing::debug!(url = %url, offset, "requesting");
        let response = cancellable(
            &self.session.cancellation_token(),
            self.client.get_with_headers(&url, &headers),
        )
        .await?;

        let status = response.status();
        let cache_tag = header_value(&response, ETAG.as_str());

        if status == StatusCode::NOT_MODIFIED {
            let size = existing_len(self.session.destination()).await?;
            return Ok(Attempt::Done(FetchReport {
                url: self.session.url().clone(),
                destination: self.session.destination().to_path_buf(),
                kind: self.session.kind(),
                bytes_transferred: 0,
                size,
                resumed_from: 0,
                not_modified: true,
                cache_tag: cache_tag.or_else(|| self.cache_tag.clone()),
                hash: None,
            }));
        }

        if status == StatusCode::RANGE_NOT_SATISFIABLE && offset > 0 {
            return Ok(Attempt::RangeRejected);
        }

        if !status.is_success() {
            return Err(NetworkError::HttpError {
                status: status.as_u16(),
                message: status.to_string(),
            }
            .into());
        }

        let body_len = response.content_length();
        let (resumed_from, total) = if status == StatusCode::PARTIAL_CONTENT && offset > 0 {
            let content_range = header_value(&response, CONTENT_RANGE.as_str())
                .and_then(|value| parse_content_range(&value));
            match content_range {
                Some((start, total)) if start == offset => {
                    (offset, total.or(body_len.map(|len| len + offset)))
                }
                _ => {
                    return Err(NetworkError::ProtocolViolation {
                        message: format!("partial response does not start at byte {offset}"),
                    }
                    .into());
                }
            }
        } else {
            (0, body_len)
        };

        let mut file = open_destination(self.session.destination(), resumed_from > 0).await?;
        let mut hasher = if resumed_from > 0 {
            hash_prefix(self.session.destination(), resumed_from).await?
        } else {
            blake3::Hasher::new()
        };

        self.session.begin(total, resumed_from);
        let received = copy_body(
            &mut self.session,
            response.bytes_stream(),
            &mut file,
            CopyParams {
                chunk_timeout: self.chunk_timeout,
                expected_len: body_len,
                hasher: Some(&mut hasher),
            },
            on_progress,
        )
        .await?;

        let hash = hasher.finalize().to_hex().to_string();
        if let Some(expected) = &self.expected_hash {
            if *expected != hash {
                // Never resume from a corrupt prefix
                file.set_len(0)
                    .await
                    .map_err(|e| Error::io_with_path(&e, self.session.destination()))?;
                return Err(NetworkError::ChecksumMismatch {
                    expected: expected.clone(),
                    actual: hash,
                }
                .into());
            }
        }

        Ok(Attempt::Done(FetchReport {
            url: self.session.url().clone(),
            destination: self.session.destination().to_path_buf(),
            kind: self.session.kind(),
            bytes_transferred: received,
            size: resumed_from + received,
            resumed_from,
            not_modified: false,
            cache_tag,
            hash: Some(hash),
        }))
    }
}

fn header_value(response: &Response, name: &str) -> Option<String> {
    response
        .headers()
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
}

/// Open for append when continuing, otherwise truncate
async fn open_destination(path: &Path, append: bool) -> Result<File, Error> {
    let mut options = OpenOptions::new();
    options.create(true).write(true);
    if append {
        options.append(true);
    } else {
        options.truncate(true);
    }
    options
        .open(path)
        .await
        .map_err(|e| Error::io_with_path(&e, path))
}
