//! Structured logging integration for events
//!
//! Converts transfer events into tracing records with structured fields so
//! `--json --debug` runs produce machine-readable logs.

use fetchr_events::{AppEvent, DownloadEvent, EventMessage, GeneralEvent};
use tracing::{debug, error, info, trace, warn};

/// Log an `AppEvent` using the tracing infrastructure with structured fields
pub fn log_event_with_tracing(message: &EventMessage) {
    let meta = &message.meta;
    match &message.event {
        AppEvent::Download(download_event) => match download_event {
            DownloadEvent::Started {
                url,
                transport,
                total_bytes,
            } => {
                info!(
                    source = meta.source.as_str(),
                    event_id = %meta.event_id,
                    correlation = ?meta.correlation_id,
                    url = %url,
                    transport = %transport,
                    total_bytes = ?total_bytes,
                    "Download started"
                );
            }
            DownloadEvent::Resuming {
                url,
                resume_offset,
                total_bytes,
            } => {
                info!(
                    source = meta.source.as_str(),
                    event_id = %meta.event_id,
                    correlation = ?meta.correlation_id,
                    url = %url,
                    resume_offset = resume_offset,
                    total_bytes = ?total_bytes,
                    "Download resuming"
                );
            }
            DownloadEvent::Progress {
                url,
                bytes_downloaded,
                total_bytes,
            } => {
                trace!(
                    source = meta.source.as_str(),
                    correlation = ?meta.correlation_id,
                    url = %url,
                    bytes_downloaded = bytes_downloaded,
                    total_bytes = ?total_bytes,
                    "Download progress"
                );
            }
            DownloadEvent::Completed {
                url,
                bytes_downloaded,
            } => {
                info!(
                    source = meta.source.as_str(),
                    event_id = %meta.event_id,
                    correlation = ?meta.correlation_id,
                    url = %url,
                    bytes_downloaded = bytes_downloaded,
                    "Download completed"
                );
            }
            DownloadEvent::NotModified { url, cache_tag } => {
                info!(
                    source = meta.source.as_str(),
                    event_id = %meta.event_id,
                    correlation = ?meta.correlation_id,
                    url = %url,
                    cache_tag = %cache_tag,
                    "Download not modified"
                );
            }
            DownloadEvent::Failed { url, failure } => {
                error!(
                    source = meta.source.as_str(),
                    event_id = %meta.event_id,
                    correlation = ?meta.correlation_id,
                    url = %url,
                    kind = %failure.kind,
                    retryable = failure.retryable,
                    code = ?failure.code,
                    message = %failure.message,
                    hint = ?failure.hint,
                    "Download failed"
                );
            }
            DownloadEvent::Cancelled {
                url,
                bytes_downloaded,
            } => {
                warn!(
                    source = meta.source.as_str(),
                    event_id = %meta.event_id,
                    correlation = ?meta.correlation_id,
                    url = %url,
                    bytes_downloaded = bytes_downloaded,
                    "Download cancelled"
                );
            }
            DownloadEvent::DelegatedToNative { url, native_id } => {
                info!(
                    source = meta.source.as_str(),
                    event_id = %meta.event_id,
                    correlation = ?meta.correlation_id,
                    url = %url,
                    native_id = native_id,
                    "Download delegated to native facility"
                );
            }
        },

        AppEvent::General(general_event) => match general_event {
            GeneralEvent::Warning { message, context } => {
                warn!(source = meta.source.as_str(), context = ?context, "{message}");
            }
            GeneralEvent::Error { message, details } => {
                error!(source = meta.source.as_str(), details = ?details, "{message}");
            }
            GeneralEvent::DebugLog { message } => {
                debug!(source = meta.source.as_str(), "{message}");
            }
        },
    }
}
