//! Per-transfer session state, progress and outcomes

use crate::selector::TransportKind;
use crate::source::SourceUrl;
use fetchr_errors::{Error, FailureKind};
use fetchr_events::{AppEvent, DownloadEvent, EventEmitter, EventSender};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

/// Minimum gap between two throttled progress reports
const PROGRESS_INTERVAL: Duration = Duration::from_millis(50);

/// Bytes written so far and the expected total, when known
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub bytes_so_far: u64,
    pub total_bytes: Option<u64>,
}

/// What a completed transfer produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchReport {
    pub url: SourceUrl,
    pub destination: PathBuf,
    pub kind: TransportKind,
    /// Bytes received during this session
    pub bytes_transferred: u64,
    /// Length of the destination file afterwards
    pub size: u64,
    /// Offset the transfer continued from; zero for a full transfer
    pub resumed_from: u64,
    /// The server confirmed the cache tag and the destination was left alone
    pub not_modified: bool,
    /// Cache tag (`ETag`) the server sent with the response
    pub cache_tag: Option<String>,
    /// BLAKE3 hex digest of the destination, when the body was received
    pub hash: Option<String>,
}

/// The single final result of a session
#[derive(Debug, Clone)]
pub enum TerminalOutcome {
    Success(FetchReport),
    Failure(Error),
    Cancelled,
}

impl TerminalOutcome {
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// Failure classification; `None` for a success
    #[must_use]
    pub fn failure_kind(&self) -> Option<FailureKind> {
        match self {
            Self::Success(_) => None,
            Self::Failure(err) => Some(err.failure_kind()),
            Self::Cancelled => Some(FailureKind::Cancelled),
        }
    }
}

impl From<Result<FetchReport, Error>> for TerminalOutcome {
    fn from(result: Result<FetchReport, Error>) -> Self {
        match result {
            Ok(report) => Self::Success(report),
            Err(Error::Cancelled) => Self::Cancelled,
            Err(err) => Self::Failure(err),
        }
    }
}

/// Mutable state of one transfer, owned by its transport
#[derive(Debug)]
pub struct TransferSession {
    url: SourceUrl,
    destination: PathBuf,
    kind: TransportKind,
    bytes_so_far: u64,
    total_bytes: Option<u64>,
    cancel: CancellationToken,
    events: Option<EventSender>,
    correlation_id: Option<String>,
    last_report: Option<Instant>,
}

impl TransferSession {
    #[must_use]
    pub fn new(url: SourceUrl, destination: PathBuf, kind: TransportKind) -> Self {
        Self {
            url,
            destination,
            kind,
            bytes_so_far: 0,
            total_bytes: None,
            cancel: CancellationToken::new(),
            events: None,
            correlation_id: None,
            last_report: None,
        }
    }

    /// Emit lifecycle events for this session on `events`
    #[must_use]
    pub fn with_events(mut self, events: EventSender, correlation_id: Option<String>) -> Self {
        self.events = Some(events);
        self.correlation_id = correlation_id;
        self
    }

    #[must_use]
    pub fn url(&self) -> &SourceUrl {
        &self.url
    }

    #[must_use]
    pub fn destination(&self) -> &Path {
        &self.destination
    }

    #[must_use]
    pub fn kind(&self) -> TransportKind {
        self.kind
    }

    #[must_use]
    pub fn progress(&self) -> Progress {
        Progress {
            bytes_so_far: self.bytes_so_far,
            total_bytes: self.total_bytes,
        }
    }

    /// Token that stops this session when cancelled
    #[must_use]
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Fail with `Error::Cancelled` once a stop was requested
    ///
    /// # Errors
    ///
    /// Returns `Error::Cancelled` if the token has been cancelled.
    pub fn check_cancelled(&self) -> Result<(), Error> {
        if self.cancel.is_cancelled() {
            Err(Error::Cancelled)
        } else {
            Ok(())
        }
    }

    /// Reset counters for a new body, starting at `offset`
    pub fn begin(&mut self, total_bytes: Option<u64>, offset: u64) {
        self.bytes_so_far = offset;
        self.total_bytes = total_bytes;
        self.last_report = None;

        self.emit_download_started(self.url.as_str(), self.kind.as_str(), total_bytes);
        if offset > 0 {
            self.emit(AppEvent::Download(DownloadEvent::Resuming {
                url: self.url.to_string(),
                resume_offset: offset,
                total_bytes,
            }));
        }
    }

    /// Record `len` more bytes written to the destination
    pub fn advance(&mut self, len: u64) -> Progress {
        self.bytes_so_far += len;
        self.progress()
    }

    /// Whether a progress report is due: always for the first chunk, then
    /// at most every 50ms
    pub fn should_report(&mut self) -> bool {
        let due = self
            .last_report
            .is_none_or(|last| last.elapsed() >= PROGRESS_INTERVAL);
        if due {
            self.last_report = Some(Instant::now());
        }
        due
    }

    /// Hand progress to the caller and the event stream
    pub fn report(&self, on_progress: &mut (dyn FnMut(Progress) + Send)) {
        let progress = self.progress();
        self.emit_download_progress(self.url.as_str(), progress.bytes_so_far, progress.total_bytes);
        on_progress(progress);
    }

    /// Fold a failure that raced with a cancel request into `Error::Cancelled`
    ///
    /// Once cancel is requested the caller asked for a stop, so whatever
    /// error the interrupted I/O produced is not reported as its own failure.
    /// A success that completed first stands.
    #[must_use]
    pub fn settle(&self, result: Result<FetchReport, Error>) -> Result<FetchReport, Error> {
        match result {
            Err(err) if !err.is_cancelled() && self.cancel.is_cancelled() => {
                tracing::debug!(url = %self.url, error = %err, "failure after cancel request");
                Err(Error::Cancelled)
            }
            result => result,
        }
    }

    /// Emit the terminal event matching `result`
    pub fn emit_outcome(&self, result: &Result<FetchReport, Error>) {
        match result {
            Ok(report) if report.not_modified => {
                self.emit(AppEvent::Download(DownloadEvent::NotModified {
                    url: self.url.to_string(),
                    cache_tag: report.cache_tag.clone().unwrap_or_default(),
                }));
            }
            Ok(report) => self.emit_download_completed(self.url.as_str(), report.bytes_transferred),
            Err(Error::Cancelled) => {
                self.emit(AppEvent::Download(DownloadEvent::Cancelled {
                    url: self.url.to_string(),
                    bytes_downloaded: self.bytes_so_far,
                }));
            }
            Err(err) => self.emit_download_failed(self.url.as_str(), err),
        }
    }
}

impl EventEmitter for TransferSession {
    fn event_sender(&self) -> Option<&EventSender> {
        self.events.as_ref()
    }

    fn correlation_id(&self) -> Option<&str> {
        self.correlation_id.as_deref()
    }
}
