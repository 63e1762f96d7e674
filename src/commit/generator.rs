//! The generation pipeline: staged diff, provider call, reported result.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::git::DiffSource;
use crate::llm::pricing::{estimate_cost, format_stats};
use crate::llm::{MessageProvider, Usage};
use crate::progress::{FinishKind, Notifier, ProgressIndicator, SPINNER_LABEL};

pub const NO_STAGED_CHANGES: &str = "No staged changes to commit";

/// Outcome of one generation. Exactly one of `message` and `error` is set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationResult {
    pub kind: FinishKind,
    pub message: Option<String>,
    pub error: Option<String>,
    pub usage: Option<Usage>,
    /// Duration and cost summary, present on success.
    pub stats: Option<String>,
}

impl GenerationResult {
    fn failure(kind: FinishKind, error: impl Into<String>) -> Self {
        Self {
            kind,
            message: None,
            error: Some(error.into()),
            usage: None,
            stats: None,
        }
    }

    pub fn success(&self) -> bool {
        self.kind == FinishKind::Success
    }

    /// The commit message, or the reason there is none.
    pub fn text(&self) -> &str {
        self.message
            .as_deref()
            .or(self.error.as_deref())
            .unwrap_or_default()
    }

    pub fn into_text(self) -> String {
        self.message.or(self.error).unwrap_or_default()
    }

    /// Text of the terminal notification for this outcome.
    pub fn summary(&self) -> String {
        match (&self.kind, &self.stats) {
            (FinishKind::Success, Some(stats)) => format!("Commit message generated ({stats})"),
            (FinishKind::Success, None) => "Commit message generated".to_string(),
            _ => self.text().to_string(),
        }
    }
}

/// Drives one generation per call against injected collaborators.
///
/// Generations may run concurrently; they share nothing except what the
/// collaborators share (e.g. the provider's credential cache).
#[derive(Clone)]
pub struct Generator {
    diff_source: Arc<dyn DiffSource>,
    provider: Arc<dyn MessageProvider>,
    notifier: Arc<dyn Notifier>,
}

impl Generator {
    pub fn new(
        diff_source: Arc<dyn DiffSource>,
        provider: Arc<dyn MessageProvider>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            diff_source,
            provider,
            notifier,
        }
    }

    /// Generate a commit message for the staged changes.
    ///
    /// Every path ends in exactly one terminal notification (when
    /// notifications are enabled) that replaces the progress line.
    pub async fn generate(&self, config: &Config) -> GenerationResult {
        let mut progress = ProgressIndicator::new(self.notifier.clone(), config.notifications);
        let frames = config.spinner_frames.as_deref().unwrap_or_default();
        if !progress.start(frames, config.spinner_enabled()) {
            progress.announce(SPINNER_LABEL);
        }

        let result = self.run(config).await;

        progress.stop().await;
        progress.finish(result.kind, &result.summary());
        result
    }

    /// Run [`generate`](Self::generate) on a task and hand the outcome to
    /// `callback` exactly once.
    pub fn spawn<F>(&self, config: Config, callback: F) -> JoinHandle<()>
    where
        F: FnOnce(bool, String) + Send + 'static,
    {
        let generator = self.clone();
        tokio::spawn(async move {
            let result = generator.generate(&config).await;
            let success = result.success();
            callback(success, result.into_text());
        })
    }

    async fn run(&self, config: &Config) -> GenerationResult {
        let diff = match self.diff_source.staged_diff(config.context_lines).await {
            Ok(diff) => diff,
            Err(e) => {
                warn!("Diff collection failed: {}", e);
                return GenerationResult::failure(FinishKind::Error, e.to_string());
            }
        };

        if diff.trim().is_empty() {
            info!("Nothing staged");
            return GenerationResult::failure(FinishKind::Warning, NO_STAGED_CHANGES);
        }

        debug!(
            "Calling {} ({}) with {} bytes of diff",
            config.provider,
            config.model,
            diff.len()
        );
        let started = Instant::now();

        let completion = match self.provider.call(config, &diff).await {
            Ok(completion) => completion,
            Err(e) => {
                warn!("Provider call failed: {}", e);
                return GenerationResult::failure(FinishKind::Error, e.to_string());
            }
        };

        let elapsed = started.elapsed();
        let cost = estimate_cost(&config.model, completion.usage);
        let stats = format_stats(elapsed, cost, completion.usage, config.cost_display);
        info!("Generated commit message in {}", stats);

        GenerationResult {
            kind: FinishKind::Success,
            message: Some(completion.message),
            error: None,
            usage: completion.usage,
            stats: Some(stats),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{DiffError, ProviderError};
    use crate::git::MockDiffSource;
    use crate::llm::{Completion, MockMessageProvider};
    use crate::progress::{Level, MockNotifier, NotificationId};

    fn diff_returning(result: Result<&'static str, i32>) -> MockDiffSource {
        let mut mock = MockDiffSource::new();
        mock.expect_staged_diff().times(1).returning(move |_| match result {
            Ok(diff) => Ok(diff.to_string()),
            Err(code) => Err(DiffError::NonZeroExit {
                code,
                stderr: "fatal: not a git repository".to_string(),
            }),
        });
        mock
    }

    fn quiet_config() -> Config {
        Config {
            notifications: false,
            ..Config::default()
        }
    }

    fn silent_notifier() -> MockNotifier {
        let mut notifier = MockNotifier::new();
        notifier.expect_notify().times(0);
        notifier
    }

    #[tokio::test]
    async fn test_diff_failure_skips_provider() {
        let mut provider = MockMessageProvider::new();
        provider.expect_call().times(0);

        let generator = Generator::new(
            Arc::new(diff_returning(Err(128))),
            Arc::new(provider),
            Arc::new(silent_notifier()),
        );
        let result = generator.generate(&quiet_config()).await;

        assert!(!result.success());
        assert_eq!(result.kind, FinishKind::Error);
        assert!(result.message.is_none());
        assert_eq!(
            result.error.as_deref(),
            Some("Failed to get git diff: fatal: not a git repository")
        );
    }

    #[tokio::test]
    async fn test_empty_diff_is_a_warning() {
        let mut provider = MockMessageProvider::new();
        provider.expect_call().times(0);

        let generator = Generator::new(
            Arc::new(diff_returning(Ok("  \n"))),
            Arc::new(provider),
            Arc::new(silent_notifier()),
        );
        let result = generator.generate(&quiet_config()).await;

        assert_eq!(result.kind, FinishKind::Warning);
        assert_eq!(result.error.as_deref(), Some(NO_STAGED_CHANGES));
    }

    #[tokio::test]
    async fn test_context_lines_are_forwarded() {
        let mut diff = MockDiffSource::new();
        diff.expect_staged_diff()
            .withf(|lines| *lines == Some(5))
            .times(1)
            .returning(|_| Ok(String::new()));

        let generator = Generator::new(
            Arc::new(diff),
            Arc::new(MockMessageProvider::new()),
            Arc::new(silent_notifier()),
        );
        let config = Config {
            context_lines: Some(5),
            ..quiet_config()
        };
        generator.generate(&config).await;
    }

    #[tokio::test]
    async fn test_provider_error_is_reported() {
        let mut provider = MockMessageProvider::new();
        provider
            .expect_call()
            .times(1)
            .returning(|_, _| Err(ProviderError::UnexpectedFormat));

        let generator = Generator::new(
            Arc::new(diff_returning(Ok("diff --git a/x b/x\n"))),
            Arc::new(provider),
            Arc::new(silent_notifier()),
        );
        let result = generator.generate(&quiet_config()).await;

        assert_eq!(result.kind, FinishKind::Error);
        assert_eq!(result.text(), "unexpected response format");
        assert!(result.stats.is_none());
    }

    #[tokio::test]
    async fn test_static_notification_when_spinner_disabled() {
        let mut provider = MockMessageProvider::new();
        provider.expect_call().times(1).returning(|_, _| {
            Ok(Completion {
                message: "feat: add x".to_string(),
                usage: None,
            })
        });

        let mut notifier = MockNotifier::new();
        let mut seq = mockall::Sequence::new();
        notifier
            .expect_notify()
            .withf(|text, level, options| {
                text == SPINNER_LABEL && *level == Level::Info && options.replace.is_none()
            })
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _, _| NotificationId(7));
        notifier
            .expect_notify()
            .withf(|text, level, options| {
                text.starts_with("✓ Commit message generated")
                    && *level == Level::Success
                    && options.replace == Some(NotificationId(7))
            })
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _, _| NotificationId(8));

        let generator = Generator::new(
            Arc::new(diff_returning(Ok("diff --git a/x b/x\n"))),
            Arc::new(provider),
            Arc::new(notifier),
        );
        let config = Config {
            spinner_frames: None,
            ..Config::default()
        };
        let result = generator.generate(&config).await;

        assert!(result.success());
        assert_eq!(result.message.as_deref(), Some("feat: add x"));
        assert!(result.error.is_none());
    }

    #[tokio::test]
    async fn test_spawn_invokes_callback_once() {
        let mut provider = MockMessageProvider::new();
        provider.expect_call().times(1).returning(|_, _| {
            Ok(Completion {
                message: "fix: y".to_string(),
                usage: None,
            })
        });

        let generator = Generator::new(
            Arc::new(diff_returning(Ok("diff --git a/y b/y\n"))),
            Arc::new(provider),
            Arc::new(silent_notifier()),
        );

        let (tx, rx) = tokio::sync::oneshot::channel();
        generator
            .spawn(quiet_config(), move |success, message| {
                let _ = tx.send((success, message));
            })
            .await
            .unwrap();

        assert_eq!(rx.await.unwrap(), (true, "fix: y".to_string()));
    }
}
