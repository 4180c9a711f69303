//! Progress reporting while an analysis runs.
//!
//! Progress is a side channel: sinks are fire-and-forget and a sink that
//! can no longer deliver (closed channel, disconnected browser) never fails
//! the analysis.

use tokio::sync::mpsc::UnboundedSender;
use tracing::debug;

use jewel_ops_core::ProgressEvent;

/// Receiver of progress notifications.
pub trait ProgressSink: Send + Sync {
    /// Notify that `event.current` of `event.total` items are processed.
    fn report(&self, event: ProgressEvent);
}

/// Sink that drops every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn report(&self, _event: ProgressEvent) {}
}

/// Sink that writes events to the log, for the CLI.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogProgress;

impl ProgressSink for LogProgress {
    fn report(&self, event: ProgressEvent) {
        tracing::info!(
            current = event.current,
            total = event.total,
            "Analysis progress"
        );
    }
}

impl ProgressSink for UnboundedSender<ProgressEvent> {
    fn report(&self, event: ProgressEvent) {
        if self.send(event).is_err() {
            debug!("Progress receiver closed, dropping event");
        }
    }
}

/// Throttles progress into a sink.
///
/// Emits every `interval` processed items, always emits a final
/// `(total, total)`, and never reports a smaller `current` than before.
pub struct ProgressReporter<'a> {
    sink: &'a dyn ProgressSink,
    total: usize,
    interval: usize,
    processed: usize,
    last_reported: Option<usize>,
}

impl<'a> ProgressReporter<'a> {
    /// Create a reporter for `total` items.
    #[must_use]
    pub fn new(sink: &'a dyn ProgressSink, total: usize, interval: usize) -> Self {
        Self {
            sink,
            total,
            interval: interval.max(1),
            processed: 0,
            last_reported: None,
        }
    }

    /// Announce the start of processing.
    pub fn start(&mut self) {
        self.emit();
    }

    /// Record `count` more processed items.
    pub fn advance(&mut self, count: usize) {
        let before = self.processed / self.interval;
        self.processed = self.processed.saturating_add(count).min(self.total);
        if self.processed / self.interval > before {
            self.emit();
        }
    }

    /// Report completion.
    pub fn finish(&mut self) {
        self.processed = self.total;
        self.emit();
    }

    fn emit(&mut self) {
        if self.last_reported == Some(self.processed) {
            return;
        }
        self.last_reported = Some(self.processed);
        self.sink.report(ProgressEvent {
            current: self.processed,
            total: self.total,
        });
    }
}
