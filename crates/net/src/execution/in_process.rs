//! In-process strategy: the transport runs on a spawned task

use super::{Dispatcher, DownloadListener, HandleCore};
use crate::session::TerminalOutcome;
use crate::transport::Transport;
use fetchr_errors::Error;
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Handle to a transfer running on its own tokio task
#[derive(Debug, Clone)]
pub struct InProcessHandle {
    core: HandleCore,
}

impl InProcessHandle {
    pub(crate) fn core(&self) -> &HandleCore {
        &self.core
    }
}

/// Spawn `transport` and report to `listener`
///
/// The transfer and the listener share one task: progress travels over a
/// channel that closes when `fetch` returns, so every progress callback is
/// delivered before the terminal one.
pub(crate) fn spawn(mut transport: Transport, listener: Arc<dyn DownloadListener>) -> InProcessHandle {
    let cancel = transport.cancellation_token();
    let destination = transport.destination().to_path_buf();
    let (mut dispatcher, state) = Dispatcher::new(listener, cancel.clone());

    tokio::spawn(async move {
        dispatcher.running();
        let (tx, mut rx) = mpsc::unbounded_channel();

        let work = async move {
            let url = transport.url().to_string();
            let fetch = transport.fetch(move |progress| {
                let _ = tx.send(progress);
            });
            match AssertUnwindSafe(fetch).catch_unwind().await {
                Ok(result) => TerminalOutcome::from(result),
                Err(_) => {
                    tracing::error!(url = %url, "transfer task panicked");
                    TerminalOutcome::Failure(Error::internal("transfer task panicked"))
                }
            }
        };
        let deliver = async {
            while let Some(progress) = rx.recv().await {
                dispatcher.progress(progress);
            }
        };

        let (outcome, ()) = tokio::join!(work, deliver);
        dispatcher.finish(outcome);
    });

    InProcessHandle {
        core: HandleCore {
            cancel,
            state,
            destination,
        },
    }
}
