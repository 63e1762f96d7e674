//! Progress reporting: the notification seam and the spinner built on it.

pub mod indicator;
pub mod notifier;

pub use indicator::{FinishKind, ProgressIndicator, ProgressState, SPINNER_LABEL, frame_at};
pub use notifier::{Level, NotificationId, Notifier, NotifyOptions, TerminalNotifier};

#[cfg(test)]
pub use notifier::MockNotifier;
