//! Event handling and progress display

use crate::display::format_bytes;
use console::{style, Term};
use fetchr_events::{AppEvent, DownloadEvent, EventMessage, GeneralEvent};

/// Renders transfer events on stderr
pub struct EventHandler {
    term: Term,
    /// Draw status lines and progress; off in JSON mode
    interactive: bool,
    debug_enabled: bool,
    progress_drawn: bool,
}

impl EventHandler {
    /// Create new event handler
    pub fn new(interactive: bool, debug_enabled: bool) -> Self {
        Self {
            term: Term::stderr(),
            interactive,
            debug_enabled,
            progress_drawn: false,
        }
    }

    /// Handle incoming event
    pub fn handle_event(&mut self, message: EventMessage) {
        crate::logging::log_event_with_tracing(&message);
        if !self.interactive {
            return;
        }

        match message.event {
            AppEvent::Download(event) => self.handle_download_event(event),
            AppEvent::General(GeneralEvent::Warning { message, .. }) => {
                self.show_status(&format!("{} {message}", style("warning:").yellow()));
            }
            AppEvent::General(GeneralEvent::Error { message, .. }) => {
                self.show_error(&message);
            }
            AppEvent::General(GeneralEvent::DebugLog { message, .. }) if self.debug_enabled => {
                self.show_status(&format!("{} {message}", style("debug:").dim()));
            }
            AppEvent::General(_) => {}
        }
    }

    fn handle_download_event(&mut self, event: DownloadEvent) {
        match event {
            DownloadEvent::Started {
                url,
                transport,
                total_bytes,
            } => {
                let size = total_bytes.map(format_bytes).unwrap_or_else(|| "unknown size".into());
                self.show_status(&format!("Fetching {url} via {transport} ({size})"));
            }
            DownloadEvent::Resuming { resume_offset, .. } => {
                self.show_status(&format!("Resuming at {}", format_bytes(resume_offset)));
            }
            DownloadEvent::Progress {
                bytes_downloaded,
                total_bytes,
                ..
            } => self.draw_progress(bytes_downloaded, total_bytes),
            DownloadEvent::Completed {
                bytes_downloaded, ..
            } => {
                self.show_status(&format!(
                    "{} {} received",
                    style("done:").green(),
                    format_bytes(bytes_downloaded)
                ));
            }
            DownloadEvent::NotModified { .. } => {
                self.show_status(&format!("{} not modified", style("done:").green()));
            }
            DownloadEvent::Failed { failure, .. } => self.show_error(&failure.message),
            DownloadEvent::Cancelled {
                bytes_downloaded, ..
            } => {
                self.show_status(&format!(
                    "{} after {}",
                    style("cancelled").yellow(),
                    format_bytes(bytes_downloaded)
                ));
            }
            DownloadEvent::DelegatedToNative { native_id, .. } => {
                self.show_status(&format!("Handed to the native download facility (#{native_id})"));
            }
        }
    }

    fn draw_progress(&mut self, bytes: u64, total: Option<u64>) {
        let line = match total {
            Some(total) if total > 0 => {
                let percent = bytes.saturating_mul(100) / total;
                format!("  {} / {} ({percent}%)", format_bytes(bytes), format_bytes(total))
            }
            _ => format!("  {}", format_bytes(bytes)),
        };
        if self.progress_drawn {
            let _ = self.term.clear_line();
        }
        let _ = self.term.write_str(&line);
        self.progress_drawn = true;
    }

    fn show_status(&mut self, message: &str) {
        self.finish_progress();
        let _ = self.term.write_line(message);
    }

    fn show_error(&mut self, message: &str) {
        self.finish_progress();
        let _ = self
            .term
            .write_line(&format!("{} {message}", style("error:").red().bold()));
    }

    fn finish_progress(&mut self) {
        if self.progress_drawn {
            let _ = self.term.clear_line();
            self.progress_drawn = false;
        }
    }
}
