//! Animated progress indicator that collapses into one terminal notification.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::warn;

use super::notifier::{Level, NotificationId, Notifier, NotifyOptions};

pub const TITLE: &str = "gitscribe";
pub const SPINNER_LABEL: &str = "Generating commit message...";

/// How often the spinner line is redrawn.
pub const TICK_INTERVAL: Duration = Duration::from_millis(100);

/// How long each frame is shown.
pub const FRAME_DURATION_MS: u128 = 80;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressState {
    Idle,
    Spinning,
    Terminal,
}

/// Outcome shown by the terminal notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinishKind {
    Success,
    Warning,
    Error,
}

impl FinishKind {
    pub fn icon(&self) -> &'static str {
        match self {
            FinishKind::Success => "✓",
            FinishKind::Warning => "⚠",
            FinishKind::Error => "✗",
        }
    }

    pub fn level(&self) -> Level {
        match self {
            FinishKind::Success => Level::Success,
            FinishKind::Warning => Level::Warning,
            FinishKind::Error => Level::Error,
        }
    }

    /// Auto-dismiss timeout; errors linger longest.
    pub fn timeout_ms(&self) -> u64 {
        match self {
            FinishKind::Success => 3_000,
            FinishKind::Warning => 5_000,
            FinishKind::Error => 10_000,
        }
    }
}

/// Frame to show after `elapsed`. `frames` must not be empty.
pub fn frame_at(frames: &[String], elapsed: Duration) -> &str {
    let index = (elapsed.as_millis() / FRAME_DURATION_MS) as usize % frames.len();
    &frames[index]
}

type LastId = Arc<Mutex<Option<NotificationId>>>;

fn lock(last: &LastId) -> std::sync::MutexGuard<'_, Option<NotificationId>> {
    last.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Spinner lifecycle for a single generation: Idle, Spinning, then Terminal.
///
/// Every notification after the first replaces the one before it, so the
/// presenter shows a single updating line that ends in the terminal result.
pub struct ProgressIndicator {
    notifier: Arc<dyn Notifier>,
    enabled: bool,
    state: ProgressState,
    last_id: LastId,
    ticker: Option<JoinHandle<()>>,
}

impl ProgressIndicator {
    /// With `enabled == false` nothing is ever sent to `notifier`, but the
    /// state machine still runs.
    pub fn new(notifier: Arc<dyn Notifier>, enabled: bool) -> Self {
        Self {
            notifier,
            enabled,
            state: ProgressState::Idle,
            last_id: Arc::new(Mutex::new(None)),
            ticker: None,
        }
    }

    pub fn state(&self) -> ProgressState {
        self.state
    }

    /// Start animating. Returns `false` (and does nothing) when disabled, when
    /// `frames` is empty, or when not idle.
    pub fn start(&mut self, frames: &[String], enabled: bool) -> bool {
        if !self.enabled || !enabled || frames.is_empty() || self.state != ProgressState::Idle {
            return false;
        }

        let notifier = self.notifier.clone();
        let last_id = self.last_id.clone();
        let frames = frames.to_vec();

        self.ticker = Some(tokio::spawn(async move {
            let started = Instant::now();
            let mut interval = tokio::time::interval(TICK_INTERVAL);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                interval.tick().await;
                let text = format!("{} {}", frame_at(&frames, started.elapsed()), SPINNER_LABEL);
                let replace = *lock(&last_id);
                let id = notifier.notify(
                    &text,
                    Level::Info,
                    NotifyOptions {
                        title: Some(TITLE.to_string()),
                        timeout_ms: None,
                        replace,
                        hide_from_history: true,
                    },
                );
                *lock(&last_id) = Some(id);
            }
        }));
        self.state = ProgressState::Spinning;
        true
    }

    /// Single static notification used when the spinner is off.
    pub fn announce(&mut self, text: &str) {
        if !self.enabled || self.state != ProgressState::Idle {
            return;
        }
        let id = self.notifier.notify(
            text,
            Level::Info,
            NotifyOptions {
                title: Some(TITLE.to_string()),
                timeout_ms: None,
                replace: None,
                hide_from_history: true,
            },
        );
        *lock(&self.last_id) = Some(id);
    }

    /// Cancel the tick. Safe to call repeatedly or without `start`.
    pub async fn stop(&mut self) {
        if let Some(ticker) = self.ticker.take() {
            ticker.abort();
            // Wait for the task to unwind so no tick lands after this returns.
            let _ = ticker.await;
        }
    }

    /// Issue the terminal notification, replacing the last transient one.
    ///
    /// Only the first call per indicator has any effect.
    pub fn finish(&mut self, kind: FinishKind, message: &str) -> Option<NotificationId> {
        if self.state == ProgressState::Terminal {
            warn!("Progress indicator finished twice; ignoring {:?}", kind);
            return None;
        }
        if let Some(ticker) = self.ticker.take() {
            ticker.abort();
        }
        self.state = ProgressState::Terminal;

        let replace = lock(&self.last_id).take();
        if !self.enabled {
            return None;
        }

        Some(self.notifier.notify(
            &format!("{} {}", kind.icon(), message),
            kind.level(),
            NotifyOptions {
                title: Some(TITLE.to_string()),
                timeout_ms: Some(kind.timeout_ms()),
                replace,
                hide_from_history: false,
            },
        ))
    }
}

impl Drop for ProgressIndicator {
    fn drop(&mut self) {
        if let Some(ticker) = self.ticker.take() {
            ticker.abort();
        }
    }
}
