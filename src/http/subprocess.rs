//! curl spawning.

use std::env;
use std::io::Write;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tempfile::NamedTempFile;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::config::DEFAULT_HTTP_TIMEOUT_SECS;
use crate::error::TransportError;

use super::{HttpRequest, HttpResponse, HttpTransport};

/// Environment variable to override the configured timeout.
const TIMEOUT_ENV_VAR: &str = "GITSCRIBE_HTTP_TIMEOUT";

/// Resolve the request timeout.
///
/// `GITSCRIBE_HTTP_TIMEOUT` wins over the configured value. Logs a warning if
/// the variable is set but is not a number of seconds.
fn get_timeout(configured_secs: u64) -> Duration {
    match env::var(TIMEOUT_ENV_VAR) {
        Ok(v) if !v.is_empty() => match v.parse::<u64>() {
            Ok(secs) => Duration::from_secs(secs),
            Err(_) => {
                warn!(
                    "Invalid {} value '{}', using {}s",
                    TIMEOUT_ENV_VAR, v, configured_secs
                );
                Duration::from_secs(configured_secs)
            }
        },
        _ => Duration::from_secs(configured_secs),
    }
}

/// Check if curl is installed and accessible.
pub fn check_curl_installed() -> Result<(), TransportError> {
    which::which("curl")
        .map(|_| ())
        .map_err(|_| TransportError::NotInstalled)
}

/// Write the request headers to a temp file readable only by the owner.
///
/// Headers carry bearer tokens and must not appear on curl's command line,
/// where any local user can read them.
fn header_file(request: &HttpRequest) -> std::io::Result<NamedTempFile> {
    let mut file = tempfile::Builder::new().prefix("gitscribe-headers").tempfile()?;
    for (name, value) in &request.headers {
        writeln!(file, "{name}: {value}")?;
    }
    file.flush()?;
    Ok(file)
}

/// Translate a request into curl arguments. Headers are read from
/// `headers`; the body, if any, is streamed on stdin so large diffs never hit
/// the argument length limit.
fn curl_args(request: &HttpRequest, headers: Option<&Path>) -> Vec<String> {
    let mut args = vec![
        "--silent".to_string(),
        "--show-error".to_string(),
        "--request".to_string(),
        request.method.as_str().to_string(),
        request.url.clone(),
    ];
    if let Some(path) = headers {
        args.push("--header".to_string());
        args.push(format!("@{}", path.display()));
    }
    if request.body.is_some() {
        args.push("--data-binary".to_string());
        args.push("@-".to_string());
    }
    args
}

/// Transport that runs the system `curl` binary.
#[derive(Debug, Clone)]
pub struct CurlTransport {
    program: String,
    timeout: Duration,
}

impl Default for CurlTransport {
    fn default() -> Self {
        Self::new(DEFAULT_HTTP_TIMEOUT_SECS)
    }
}

impl CurlTransport {
    pub fn new(timeout_secs: u64) -> Self {
        Self {
            program: "curl".to_string(),
            timeout: get_timeout(timeout_secs),
        }
    }

    /// Use a different executable with curl's command line.
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    async fn run(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        // Kept alive until curl exits; removed on drop.
        let headers = if request.headers.is_empty() {
            None
        } else {
            Some(header_file(request).map_err(TransportError::SpawnFailed)?)
        };

        let mut child = Command::new(&self.program)
            .args(curl_args(request, headers.as_ref().map(NamedTempFile::path)))
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(TransportError::SpawnFailed)?;

        // Dropping stdin closes it so curl sees the end of the body.
        if let Some(mut stdin) = child.stdin.take()
            && let Some(body) = &request.body
        {
            stdin
                .write_all(body.as_bytes())
                .await
                .map_err(TransportError::SpawnFailed)?;
        }

        let output = child
            .wait_with_output()
            .await
            .map_err(TransportError::SpawnFailed)?;

        Ok(HttpResponse {
            exit_code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        })
    }
}

#[async_trait]
impl HttpTransport for CurlTransport {
    async fn send(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        debug!(
            "{} {} ({} bytes)",
            request.method,
            request.url,
            request.body.as_ref().map_or(0, String::len)
        );

        timeout(self.timeout, self.run(request))
            .await
            .map_err(|_| TransportError::Timeout(self.timeout.as_secs()))?
    }
}
