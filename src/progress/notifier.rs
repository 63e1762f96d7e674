//! Notification seam and its terminal implementation.

use std::io::{self, Write};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};

use tracing::debug;

/// Carriage return plus erase-line, used to redraw a transient line in place.
const REDRAW_LINE: &str = "\r\x1b[2K";

/// Opaque handle to an issued notification, usable as a later replace-target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NotificationId(pub u64);

/// Severity of a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Info,
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NotifyOptions {
    pub title: Option<String>,
    /// Auto-dismiss after this many milliseconds, when the presenter supports it.
    pub timeout_ms: Option<u64>,
    /// Replace this earlier notification instead of adding a new one.
    pub replace: Option<NotificationId>,
    /// Transient notifications are not kept in history.
    pub hide_from_history: bool,
}

/// Presentation layer for progress and results.
#[cfg_attr(test, mockall::automock)]
pub trait Notifier: Send + Sync {
    fn notify(&self, text: &str, level: Level, options: NotifyOptions) -> NotificationId;
}

#[derive(Debug, Default)]
struct LineState {
    /// The notification currently occupying an unterminated line.
    open: Option<NotificationId>,
}

/// Writes notifications to a terminal stream (stderr by default).
///
/// Transient notifications (`hide_from_history`) stay on an open line so the
/// next notification that replaces them can redraw it. Everything else is
/// terminated with a newline.
#[derive(Debug)]
pub struct TerminalNotifier<W: Write + Send = io::Stderr> {
    out: Mutex<W>,
    line: Mutex<LineState>,
    next_id: AtomicU64,
}

impl Default for TerminalNotifier<io::Stderr> {
    fn default() -> Self {
        Self::new()
    }
}

impl TerminalNotifier<io::Stderr> {
    pub fn new() -> Self {
        Self::with_writer(io::stderr())
    }
}

impl<W: Write + Send> TerminalNotifier<W> {
    pub fn with_writer(out: W) -> Self {
        Self {
            out: Mutex::new(out),
            line: Mutex::new(LineState::default()),
            next_id: AtomicU64::new(1),
        }
    }

    pub fn into_inner(self) -> W {
        self.out.into_inner().unwrap_or_else(PoisonError::into_inner)
    }

    fn render(&self, id: NotificationId, text: &str, options: &NotifyOptions) -> String {
        let mut line = self.line.lock().unwrap_or_else(PoisonError::into_inner);

        let mut rendered = String::new();
        match (line.open, options.replace) {
            (Some(open), Some(replace)) if open == replace => rendered.push_str(REDRAW_LINE),
            (Some(_), _) => rendered.push('\n'),
            (None, _) => {}
        }

        if let Some(title) = &options.title {
            rendered.push_str(title);
            rendered.push_str(": ");
        }
        rendered.push_str(text);

        if options.hide_from_history {
            line.open = Some(id);
        } else {
            rendered.push('\n');
            line.open = None;
        }
        rendered
    }
}

impl<W: Write + Send> Notifier for TerminalNotifier<W> {
    fn notify(&self, text: &str, _level: Level, options: NotifyOptions) -> NotificationId {
        let id = NotificationId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let rendered = self.render(id, text, &options);

        let mut out = self.out.lock().unwrap_or_else(PoisonError::into_inner);
        if let Err(e) = out.write_all(rendered.as_bytes()).and_then(|()| out.flush()) {
            debug!("Failed to write notification: {}", e);
        }
        id
    }
}
