//! Shared test utilities for integration tests.
//!
//! Not all functions are used by every test file, but they're shared across tests.
#![allow(dead_code)]

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use gitscribe::config::Config;
use gitscribe::error::{DiffError, ProviderError, TransportError};
use gitscribe::git::DiffSource;
use gitscribe::http::{HttpRequest, HttpResponse, HttpTransport, Method};
use gitscribe::llm::{Completion, MessageProvider, Usage};
use gitscribe::progress::{Level, NotificationId, Notifier, NotifyOptions};

pub const SAMPLE_DIFF: &str = "diff --git a/src/lib.rs b/src/lib.rs
index 1111111..2222222 100644
--- a/src/lib.rs
+++ b/src/lib.rs
@@ -1,3 +1,4 @@
 pub mod auth;
+pub mod cache;
 pub mod config;
";

/// Seconds since the epoch, for building token responses.
pub fn unix_now() -> i64 {
    chrono::Utc::now().timestamp()
}

/// Body of a successful token exchange that stays valid for half an hour.
pub fn token_body(token: &str) -> String {
    format!(
        r#"{{"token": "{}", "expires_at": {}, "refresh_in": 1500, "endpoints": {{"api": "https://api.individual.githubcopilot.com"}}}}"#,
        token,
        unix_now() + 1_800
    )
}

pub fn chat_body(message: &str) -> String {
    serde_json::json!({
        "choices": [{"message": {"role": "assistant", "content": message}}],
        "usage": {"prompt_tokens": 100, "completion_tokens": 20}
    })
    .to_string()
}

pub fn ok_response(body: impl Into<String>) -> HttpResponse {
    HttpResponse {
        exit_code: 0,
        stdout: body.into(),
        stderr: String::new(),
    }
}

// ============================================
// Notifier
// ============================================

#[derive(Debug, Clone, PartialEq)]
pub struct Sent {
    pub id: NotificationId,
    pub text: String,
    pub level: Level,
    pub options: NotifyOptions,
}

/// Records every notification it is asked to show.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<Sent>>,
}

impl RecordingNotifier {
    pub fn sent(&self) -> Vec<Sent> {
        self.sent.lock().unwrap().clone()
    }

    /// Notifications that are not progress ticks.
    pub fn terminal(&self) -> Vec<Sent> {
        self.sent()
            .into_iter()
            .filter(|sent| sent.level != Level::Info)
            .collect()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, text: &str, level: Level, options: NotifyOptions) -> NotificationId {
        let mut sent = self.sent.lock().unwrap();
        let id = NotificationId(sent.len() as u64 + 1);
        sent.push(Sent {
            id,
            text: text.to_string(),
            level,
            options,
        });
        id
    }
}

// ============================================
// Diff source
// ============================================

pub enum FakeDiff {
    Staged(String),
    Fails(String),
}

impl FakeDiff {
    pub fn staged(diff: &str) -> Self {
        FakeDiff::Staged(diff.to_string())
    }

    pub fn failing(stderr: &str) -> Self {
        FakeDiff::Fails(stderr.to_string())
    }
}

#[async_trait]
impl DiffSource for FakeDiff {
    async fn staged_diff(&self, _context_lines: Option<u32>) -> Result<String, DiffError> {
        match self {
            FakeDiff::Staged(diff) => Ok(diff.clone()),
            FakeDiff::Fails(stderr) => Err(DiffError::NonZeroExit {
                code: 128,
                stderr: stderr.clone(),
            }),
        }
    }
}

// ============================================
// Provider
// ============================================

/// Answers after `delay` with a fixed message and usage.
pub struct FakeProvider {
    pub message: String,
    pub usage: Option<Usage>,
    pub delay: Duration,
    pub calls: AtomicUsize,
}

impl FakeProvider {
    pub fn new(message: &str) -> Self {
        Self {
            message: message.to_string(),
            usage: Some(Usage {
                input_tokens: 100,
                output_tokens: 20,
            }),
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn without_usage(mut self) -> Self {
        self.usage = None;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MessageProvider for FakeProvider {
    async fn call(&self, _config: &Config, _diff: &str) -> Result<Completion, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        Ok(Completion {
            message: self.message.clone(),
            usage: self.usage,
        })
    }
}

// ============================================
// Transport
// ============================================

/// Serves token exchanges (`GET`) and chat completions (`POST`).
///
/// Exchanges take `exchange_delay` and fail for the first `failing_exchanges`
/// calls, which lets tests hold an exchange in flight.
pub struct FakeCopilotServer {
    pub exchange_delay: Duration,
    pub failing_exchanges: usize,
    pub exchanges: AtomicUsize,
    pub completions: AtomicUsize,
    pub requests: Mutex<Vec<HttpRequest>>,
}

impl FakeCopilotServer {
    pub fn new(exchange_delay: Duration) -> Self {
        Self {
            exchange_delay,
            failing_exchanges: 0,
            exchanges: AtomicUsize::new(0),
            completions: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn failing_first(mut self, count: usize) -> Self {
        self.failing_exchanges = count;
        self
    }

    pub fn exchanges(&self) -> usize {
        self.exchanges.load(Ordering::SeqCst)
    }

    pub fn completions(&self) -> usize {
        self.completions.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl HttpTransport for FakeCopilotServer {
    async fn send(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        self.requests.lock().unwrap().push(request.clone());

        match request.method {
            Method::Get => {
                let n = self.exchanges.fetch_add(1, Ordering::SeqCst) + 1;
                tokio::time::sleep(self.exchange_delay).await;
                if n <= self.failing_exchanges {
                    return Err(TransportError::NonZeroExit {
                        code: 7,
                        stderr: "Failed to connect to api.github.com".to_string(),
                    });
                }
                Ok(ok_response(token_body(&format!("tid=token-{n}"))))
            }
            Method::Post => {
                self.completions.fetch_add(1, Ordering::SeqCst);
                Ok(ok_response(chat_body("feat: add credential cache")))
            }
        }
    }
}
