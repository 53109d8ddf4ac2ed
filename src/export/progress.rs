//! Progress tracking for export operations
//!
//! The export procedure only talks to a [`ProgressSink`]: it announces the
//! expected row count, steps once per written row, polls for cancellation
//! and closes the sink when it ends. [`ProgressTracker`] is the terminal
//! implementation, backed by an indicatif bar and a cancellation token that
//! can be triggered from another task.

use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use indicatif::{ProgressBar, ProgressStyle};
use tokio_util::sync::CancellationToken;

/// Receiver of export progress
pub trait ProgressSink: Send {
    /// Set the number of rows expected
    fn set_maximum(&mut self, maximum: u64);

    /// Record one written row
    fn step(&mut self);

    /// Whether the export should stop
    ///
    /// Must reflect cancellation requested concurrently, not a cached value.
    fn was_canceled(&self) -> bool;

    /// Release the sink; called once when the export ends
    fn close(&mut self);
}

/// Progress tracker for export operations
///
/// Tracks rows written and displays a progress bar with throughput.
pub struct ProgressTracker {
    /// Number of rows processed so far
    processed: AtomicU64,
    /// Start time of the operation
    start_time: Instant,
    /// Whether to draw a bar once the maximum is known
    enable_bar: bool,
    /// Progress bar, created on `set_maximum`
    bar: Option<ProgressBar>,
    /// Cancellation token for aborting export
    cancel_token: CancellationToken,
    /// Whether `close` already ran
    closed: bool,
}

impl ProgressTracker {
    /// Create a new progress tracker
    ///
    /// # Arguments
    /// * `enable_bar` - Whether to display a progress bar
    pub fn new(enable_bar: bool) -> Self {
        Self {
            processed: AtomicU64::new(0),
            start_time: Instant::now(),
            enable_bar,
            bar: None,
            cancel_token: CancellationToken::new(),
            closed: false,
        }
    }

    /// Use an externally owned cancellation token
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel_token = token;
        self
    }

    /// Number of rows processed so far
    pub fn processed(&self) -> u64 {
        self.processed.load(Ordering::Relaxed)
    }

    /// Whether the tracker has been closed
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    fn create_bar(maximum: u64) -> ProgressBar {
        let bar = ProgressBar::new(maximum);
        let style = ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .map(|style| style.progress_chars("#>-"))
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        bar.set_style(style);
        bar.set_message("Exporting data...");
        bar
    }
}

impl ProgressSink for ProgressTracker {
    fn set_maximum(&mut self, maximum: u64) {
        if !self.enable_bar || self.closed {
            return;
        }
        match self.bar {
            Some(ref bar) => bar.set_length(maximum),
            None => self.bar = Some(Self::create_bar(maximum)),
        }
    }

    fn step(&mut self) {
        let count = self.processed.fetch_add(1, Ordering::Relaxed) + 1;

        if let Some(ref bar) = self.bar {
            bar.set_position(count);

            if count % 1000 == 0 {
                let elapsed = self.start_time.elapsed().as_secs_f64();
                if elapsed > 0.0 {
                    let speed = count as f64 / elapsed;
                    bar.set_message(format!("({:.0} rows/sec)", speed));
                }
            }
        }
    }

    fn was_canceled(&self) -> bool {
        self.cancel_token.is_cancelled()
    }

    fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        if let Some(bar) = self.bar.take() {
            bar.finish_and_clear();
        }
    }
}

/// Scoped handle that closes a [`ProgressSink`] when dropped
///
/// Holding one for the duration of an export guarantees the sink is closed
/// on success, cancellation and every error path.
pub struct ProgressGuard<'a> {
    sink: &'a mut dyn ProgressSink,
}

impl<'a> ProgressGuard<'a> {
    /// Take responsibility for closing `sink`
    pub fn new(sink: &'a mut dyn ProgressSink) -> Self {
        Self { sink }
    }
}

impl<'a> Deref for ProgressGuard<'a> {
    type Target = dyn ProgressSink + 'a;

    fn deref(&self) -> &Self::Target {
        &*self.sink
    }
}

impl DerefMut for ProgressGuard<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut *self.sink
    }
}

impl Drop for ProgressGuard<'_> {
    fn drop(&mut self) {
        self.sink.close();
    }
}
