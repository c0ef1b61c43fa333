//! Background execution of transfers with listener callbacks
//!
//! Every async session has one dispatcher that owns the listener. Callbacks
//! are therefore strictly ordered and never concurrent; progress is dropped
//! once cancellation is requested and exactly one terminal outcome is
//! delivered.

pub(crate) mod in_process;
pub(crate) mod native;

pub use in_process::InProcessHandle;
pub use native::NativeDelegateHandle;

use crate::session::{Progress, TerminalOutcome};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;

/// Receives the callbacks of one async session
pub trait DownloadListener: Send + Sync + 'static {
    /// Bytes written so far; never called after `on_result` or cancellation
    fn on_progress(&self, progress: Progress);

    /// Called exactly once, last
    fn on_result(&self, outcome: TerminalOutcome);
}

/// Callback forwarded by a [`ChannelListener`]
#[derive(Debug, Clone)]
pub enum ListenerEvent {
    Progress(Progress),
    Result(TerminalOutcome),
}

/// Listener that forwards every callback to an unbounded channel
#[derive(Debug)]
pub struct ChannelListener {
    tx: mpsc::UnboundedSender<ListenerEvent>,
}

impl ChannelListener {
    #[must_use]
    pub fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<ListenerEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Arc::new(Self { tx }), rx)
    }
}

impl DownloadListener for ChannelListener {
    fn on_progress(&self, progress: Progress) {
        let _ = self.tx.send(ListenerEvent::Progress(progress));
    }

    fn on_result(&self, outcome: TerminalOutcome) {
        let _ = self.tx.send(ListenerEvent::Result(outcome));
    }
}

/// Lifecycle of an async session; the last three states are absorbing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Created,
    Running,
    Succeeded,
    Failed,
    Cancelled,
}

impl SessionState {
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed | Self::Cancelled)
    }
}

/// Sole caller of a session's listener
pub(crate) struct Dispatcher {
    listener: Arc<dyn DownloadListener>,
    state: watch::Sender<SessionState>,
    cancel: CancellationToken,
    last_bytes: u64,
}

impl Dispatcher {
    fn new(
        listener: Arc<dyn DownloadListener>,
        cancel: CancellationToken,
    ) -> (Self, watch::Receiver<SessionState>) {
        let (state, state_rx) = watch::channel(SessionState::Created);
        let dispatcher = Self {
            listener,
            state,
            cancel,
            last_bytes: 0,
        };
        (dispatcher, state_rx)
    }

    fn running(&self) {
        self.state.send_if_modified(|state| {
            if *state == SessionState::Created {
                *state = SessionState::Running;
                true
            } else {
                false
            }
        });
    }

    /// Forward progress unless cancelled; regressions are dropped
    fn progress(&mut self, progress: Progress) {
        if self.cancel.is_cancelled() || progress.bytes_so_far < self.last_bytes {
            return;
        }
        self.last_bytes = progress.bytes_so_far;
        self.listener.on_progress(progress);
    }

    /// Deliver the terminal outcome; consuming `self` makes it single-shot
    fn finish(self, outcome: TerminalOutcome) {
        let outcome = match outcome {
            TerminalOutcome::Failure(_) if self.cancel.is_cancelled() => TerminalOutcome::Cancelled,
            outcome => outcome,
        };
        let state = match &outcome {
            TerminalOutcome::Success(_) => SessionState::Succeeded,
            TerminalOutcome::Failure(_) => SessionState::Failed,
            TerminalOutcome::Cancelled => SessionState::Cancelled,
        };

        self.listener.on_result(outcome);
        self.state.send_replace(state);
    }
}

/// State shared by both handle kinds
#[derive(Debug, Clone)]
pub(crate) struct HandleCore {
    cancel: CancellationToken,
    state: watch::Receiver<SessionState>,
    destination: std::path::PathBuf,
}

impl HandleCore {
    fn cancel(&self) {
        self.cancel.cancel();
    }

    fn state(&self) -> SessionState {
        *self.state.borrow()
    }

    async fn wait(&self) -> SessionState {
        let mut state = self.state.clone();
        let terminal = state
            .wait_for(|state| state.is_terminal())
            .await
            .map(|state| *state);
        terminal.unwrap_or_else(|_| *state.borrow())
    }
}

/// A running async transfer
#[derive(Debug, Clone)]
pub enum AsyncHandle {
    /// Carried out by the platform's native download facility
    NativeDelegate(NativeDelegateHandle),
    /// Carried out by a transport on a spawned task
    InProcess(InProcessHandle),
}

impl AsyncHandle {
    fn core(&self) -> &HandleCore {
        match self {
            Self::NativeDelegate(handle) => handle.core(),
            Self::InProcess(handle) => handle.core(),
        }
    }

    /// Request cancellation; the listener then receives `Cancelled` unless
    /// the session already finished
    pub fn cancel(&self) {
        self.core().cancel();
    }

    #[must_use]
    pub fn state(&self) -> SessionState {
        self.core().state()
    }

    /// Wait until the terminal outcome has been delivered
    pub async fn wait(&self) -> SessionState {
        self.core().wait().await
    }

    #[must_use]
    pub fn is_native(&self) -> bool {
        matches!(self, Self::NativeDelegate(_))
    }

    #[must_use]
    pub fn destination(&self) -> &Path {
        &self.core().destination
    }
}
