//! Native-delegate strategy: the platform download facility does the work

use super::{Dispatcher, DownloadListener, HandleCore};
use crate::session::{FetchReport, Progress, TerminalOutcome, TransferSession};
use fetchr_errors::{Error, NetworkError};
use fetchr_events::{AppEvent, DownloadEvent, EventEmitter};
use fetchr_platform::{
    NativeDownloadId, NativeDownloadRequest, NativeDownloadService, NativeDownloadState,
};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Handle to a transfer queued with the native download facility
#[derive(Debug, Clone)]
pub struct NativeDelegateHandle {
    core: HandleCore,
}

impl NativeDelegateHandle {
    pub(crate) fn core(&self) -> &HandleCore {
        &self.core
    }
}

/// Submit `request` and poll the facility until it reaches a terminal state
pub(crate) fn spawn(
    service: Arc<dyn NativeDownloadService>,
    request: NativeDownloadRequest,
    session: TransferSession,
    listener: Arc<dyn DownloadListener>,
    poll_interval: Duration,
) -> NativeDelegateHandle {
    let cancel = session.cancellation_token();
    let destination = session.destination().to_path_buf();
    let (mut dispatcher, state) = Dispatcher::new(listener, cancel.clone());
    let cancel_handle = cancel.clone();

    tokio::spawn(async move {
        dispatcher.running();
        let result = delegate(
            service.as_ref(),
            request,
            &session,
            &cancel,
            &mut dispatcher,
            poll_interval,
        )
        .await;
        let result = session.settle(result);
        session.emit_outcome(&result);
        dispatcher.finish(TerminalOutcome::from(result));
    });

    NativeDelegateHandle {
        core: HandleCore {
            cancel: cancel_handle,
            state,
            destination,
        },
    }
}

async fn delegate(
    service: &dyn NativeDownloadService,
    request: NativeDownloadRequest,
    session: &TransferSession,
    cancel: &CancellationToken,
    dispatcher: &mut Dispatcher,
    poll_interval: Duration,
) -> Result<FetchReport, Error> {
    let id = tokio::select! {
        biased;
        () = cancel.cancelled() => return Err(Error::Cancelled),
        id = service.submit(request) => id?,
    };

    tracing::debug!(url = %session.url(), native_id = id.0, "delegated to native download facility");
    session.emit(AppEvent::Download(DownloadEvent::DelegatedToNative {
        url: session.url().to_string(),
        native_id: id.0,
    }));

    let mut started = false;
    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => {
                withdraw(service, id).await;
                return Err(Error::Cancelled);
            }
            () = tokio::time::sleep(poll_interval) => {}
        }

        let queried = tokio::select! {
            biased;
            () = cancel.cancelled() => {
                withdraw(service, id).await;
                return Err(Error::Cancelled);
            }
            queried = service.query(id) => queried,
        };
        let status = match queried {
            Ok(status) => status,
            Err(err) => {
                // The facility may still be writing the destination
                withdraw(service, id).await;
                return Err(err.into());
            }
        };
        let progress = Progress {
            bytes_so_far: status.bytes_so_far,
            total_bytes: status.total_bytes,
        };

        match status.state {
            NativeDownloadState::Pending | NativeDownloadState::Paused => {}
            NativeDownloadState::Running => {
                if !started {
                    session.emit_download_started(
                        session.url().as_str(),
                        session.kind().as_str(),
                        status.total_bytes,
                    );
                    started = true;
                }
                session.emit_download_progress(
                    session.url().as_str(),
                    status.bytes_so_far,
                    status.total_bytes,
                );
                dispatcher.progress(progress);
            }
            NativeDownloadState::Successful => {
                dispatcher.progress(progress);
                return Ok(FetchReport {
                    url: session.url().clone(),
                    destination: session.destination().to_path_buf(),
                    kind: session.kind(),
                    bytes_transferred: status.bytes_so_far,
                    size: status.bytes_so_far,
                    resumed_from: 0,
                    not_modified: false,
                    cache_tag: None,
                    hash: None,
                });
            }
            NativeDownloadState::Failed { reason } => return Err(failure_from_reason(reason)),
        }
    }
}

/// Remove a download from the facility so it stops writing the destination
async fn withdraw(service: &dyn NativeDownloadService, id: NativeDownloadId) {
    if let Err(err) = service.cancel(id).await {
        tracing::warn!(native_id = id.0, error = %err, "native facility refused cancellation");
    }
}

/// Map a facility failure code onto the transfer taxonomy
///
/// Codes in the HTTP status range are statuses the facility passed through.
pub(crate) fn failure_from_reason(reason: i32) -> Error {
    if let Ok(status) = u16::try_from(reason) {
        if (100..600).contains(&status) {
            return NetworkError::HttpError {
                status,
                message: format!("native download failed with HTTP {status}"),
            }
            .into();
        }
    }

    let description = match reason {
        1001 => "file error",
        1002 => "unhandled HTTP code",
        1004 => "HTTP data error",
        1005 => "too many redirects",
        1006 => "insufficient space",
        1007 => "no storage device",
        1008 => "cannot resume",
        1009 => "file already exists",
        _ => "unknown error",
    };
    NetworkError::NativeDownloadFailed {
        reason: description.to_string(),
        code: Some(reason),
    }
    .into()
}
