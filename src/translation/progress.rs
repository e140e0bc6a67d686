/*!
 * Shared progress tracking.
 *
 * Counters and console output share one lock: every completion and every
 * diagnostic line routed through the tracker is printed while the lock is
 * held, with the progress bar suspended, so the two never interleave.
 */

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use log::Level;
use parking_lot::Mutex;
use std::time::{Duration, Instant};

/// Width of the rendered bar in characters
const BAR_WIDTH: usize = 30;

/// Counters behind the progress line
#[derive(Debug, Clone)]
pub struct ProgressState {
    /// Jobs queued at start
    pub total: usize,
    /// Jobs that reached a terminal outcome
    pub completed: usize,
    /// Monotonic start time
    pub started: Instant,
}

impl ProgressState {
    pub fn new(total: usize) -> Self {
        Self {
            total,
            completed: 0,
            started: Instant::now(),
        }
    }

    /// Render the progress line as of `now`
    pub fn render_at(&self, now: Instant) -> String {
        let total = self.total.max(1);
        let done = self.completed.min(total);
        let fraction = done as f64 / total as f64;
        let filled = (fraction * BAR_WIDTH as f64) as usize;

        let elapsed = now.saturating_duration_since(self.started).as_secs_f64().max(1e-6);
        let rate = done as f64 / elapsed;
        let eta = if done > 0 {
            elapsed * (total - done) as f64 / done as f64
        } else {
            0.0
        };

        format!(
            "[{}{}] {}/{} ({:.1}%)  {:.2} files/min  elapsed {}  ETA {}",
            "#".repeat(filled),
            "-".repeat(BAR_WIDTH - filled),
            self.completed,
            self.total,
            fraction * 100.0,
            rate * 60.0,
            format_clock(elapsed),
            format_clock(eta)
        )
    }
}

/// Format seconds as `HH:MM:SS`; non-finite or negative values print as zero
pub fn format_clock(seconds: f64) -> String {
    if !seconds.is_finite() || seconds <= 0.0 {
        return "00:00:00".to_string();
    }
    let secs = Duration::from_secs_f64(seconds).as_secs();
    format!("{:02}:{:02}:{:02}", secs / 3600, (secs % 3600) / 60, secs % 60)
}

/// Progress counters plus the console line, behind one lock
pub struct ProgressTracker {
    state: Mutex<ProgressState>,
    bar: ProgressBar,
}

impl std::fmt::Debug for ProgressTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressTracker")
            .field("state", &*self.state.lock())
            .finish()
    }
}

impl ProgressTracker {
    /// Tracker drawing its line on stderr
    pub fn new(total: usize) -> Self {
        let bar = ProgressBar::with_draw_target(Some(total as u64), ProgressDrawTarget::stderr());
        Self::with_bar(total, bar)
    }

    /// Tracker that keeps counts but draws nothing
    pub fn hidden(total: usize) -> Self {
        Self::with_bar(total, ProgressBar::hidden())
    }

    fn with_bar(total: usize, bar: ProgressBar) -> Self {
        let style = ProgressStyle::default_bar()
            .template("{msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        bar.set_style(style);

        let state = ProgressState::new(total);
        bar.set_message(state.render_at(Instant::now()));

        Self {
            state: Mutex::new(state),
            bar,
        }
    }

    /// Print a diagnostic line without tearing the progress line
    pub fn log(&self, level: Level, message: &str) {
        let _state = self.state.lock();
        self.bar.suspend(|| log::log!(level, "{}", message));
    }

    /// Count one terminal job outcome and report it; returns the new count
    pub fn record_completion(&self, level: Level, message: &str) -> usize {
        let mut state = self.state.lock();
        state.completed += 1;
        self.bar.suspend(|| log::log!(level, "{}", message));
        self.bar.set_position(state.completed as u64);
        self.bar.set_message(state.render_at(Instant::now()));
        state.completed
    }

    /// Current progress line
    pub fn render(&self) -> String {
        self.state.lock().render_at(Instant::now())
    }

    pub fn completed(&self) -> usize {
        self.state.lock().completed
    }

    pub fn total(&self) -> usize {
        self.state.lock().total
    }

    /// Leave the final line on screen
    pub fn finish(&self) {
        let state = self.state.lock();
        self.bar.finish_with_message(state.render_at(Instant::now()));
    }
}
