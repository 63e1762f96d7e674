//! Process-wide credential cache and long-lived secret resolution.

use std::collections::BTreeMap;
use std::env;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio::sync::Notify;
use tracing::debug;

/// Direct access token; bypasses the exchange entirely.
pub const ACCESS_TOKEN_ENV: &str = "GITHUB_COPILOT_TOKEN";

/// Long-lived secret, trusted only inside a hosted environment.
pub const SECRET_ENV: &str = "GITHUB_TOKEN";

/// Marker set by hosted development environments.
pub const HOSTED_ENV: &str = "CODESPACES";

/// Files searched, in order, inside each candidate directory.
const CREDENTIAL_FILES: [&str; 2] = ["hosts.json", "apps.json"];

/// Substring identifying the host entry that carries the secret.
const HOST_MARKER: &str = "github.com";

/// Provider endpoints returned by the exchange, keyed by role (`api`, ...).
pub type Endpoints = BTreeMap<String, String>;

/// A long-lived secret and the access token derived from it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credential {
    pub secret: String,
    pub derived_token: Option<String>,
    /// Unix timestamp (seconds).
    pub expires_at: Option<i64>,
    pub endpoints: Option<Endpoints>,
}

impl Credential {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            derived_token: None,
            expires_at: None,
            endpoints: None,
        }
    }

    /// The derived token if it is still valid at `now`.
    ///
    /// A token without an expiry is treated as expired: the exchange always
    /// reports one, so its absence means the cache entry is incomplete.
    pub fn valid_token(&self, now: i64) -> Option<AccessToken> {
        let token = self.derived_token.as_ref()?;
        let expires_at = self.expires_at?;
        (expires_at > now).then(|| AccessToken {
            token: token.clone(),
            expires_at,
            endpoints: self.endpoints.clone(),
        })
    }
}

/// A short-lived access token ready to authenticate API calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessToken {
    pub token: String,
    pub expires_at: i64,
    pub endpoints: Option<Endpoints>,
}

impl AccessToken {
    /// The `api` endpoint, if the provider supplied one.
    pub fn api_endpoint(&self) -> Option<&str> {
        self.endpoints
            .as_ref()
            .and_then(|endpoints| endpoints.get("api"))
            .map(String::as_str)
    }
}

#[derive(Debug, Default)]
struct CacheState {
    credential: Option<Credential>,
    exchange_in_progress: bool,
}

/// Shared credential state for every generation in the process.
///
/// Written only by secret resolution and the token exchange; readers check
/// expiry on every read. Waiters for an in-flight exchange park on
/// [`CredentialCache::exchange_done`].
#[derive(Debug, Default)]
pub struct CredentialCache {
    state: Mutex<CacheState>,
    exchange_done: Notify,
}

impl CredentialCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, CacheState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Snapshot of the cached credential.
    pub fn credential(&self) -> Option<Credential> {
        self.lock().credential.clone()
    }

    pub fn secret(&self) -> Option<String> {
        self.lock().credential.as_ref().map(|c| c.secret.clone())
    }

    /// Remember a resolved secret. The first secret wins for the lifetime of
    /// the cache.
    pub fn set_secret(&self, secret: impl Into<String>) {
        let mut state = self.lock();
        if state.credential.is_none() {
            state.credential = Some(Credential::new(secret));
        }
    }

    pub fn valid_token(&self, now: i64) -> Option<AccessToken> {
        self.lock()
            .credential
            .as_ref()
            .and_then(|credential| credential.valid_token(now))
    }

    pub fn exchange_in_progress(&self) -> bool {
        self.lock().exchange_in_progress
    }

    /// Claim the exchange. Returns `false` if another caller holds it.
    pub fn try_begin_exchange(&self) -> bool {
        let mut state = self.lock();
        if state.exchange_in_progress {
            return false;
        }
        state.exchange_in_progress = true;
        true
    }

    /// Mark the exchange as running even though another caller may hold it.
    pub(crate) fn force_begin_exchange(&self) {
        self.lock().exchange_in_progress = true;
    }

    /// Release the exchange, cache a fresh token if there is one, and wake
    /// every waiter.
    pub fn finish_exchange(&self, secret: &str, token: Option<&AccessToken>) {
        {
            let mut state = self.lock();
            state.exchange_in_progress = false;
            if let Some(token) = token {
                state.credential = Some(Credential {
                    secret: secret.to_string(),
                    derived_token: Some(token.token.clone()),
                    expires_at: Some(token.expires_at),
                    endpoints: token.endpoints.clone(),
                });
            }
        }
        self.exchange_done.notify_waiters();
    }

    /// Signalled whenever an exchange finishes, successfully or not.
    pub(crate) fn exchange_done(&self) -> &Notify {
        &self.exchange_done
    }
}

/// Resolves the long-lived secret from the environment or credential files.
#[derive(Debug, Clone)]
pub struct SecretResolver {
    search_dirs: Vec<PathBuf>,
}

impl Default for SecretResolver {
    fn default() -> Self {
        Self {
            search_dirs: default_search_dirs(),
        }
    }
}

impl SecretResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Search these directories instead of the platform defaults.
    pub fn with_search_dirs(search_dirs: Vec<PathBuf>) -> Self {
        Self { search_dirs }
    }

    pub fn search_dirs(&self) -> &[PathBuf] {
        &self.search_dirs
    }

    /// Resolve the secret, caching the first one found.
    ///
    /// Checks in order:
    /// 1. The cache (a secret is never re-resolved once found)
    /// 2. `GITHUB_TOKEN`, only when `CODESPACES` is set
    /// 3. `hosts.json` then `apps.json` in each search directory
    ///
    /// Returns `None` when no source yields a secret.
    pub fn resolve_secret(&self, cache: &CredentialCache) -> Option<String> {
        if let Some(secret) = cache.secret() {
            return Some(secret);
        }

        let secret = secret_from_env().or_else(|| self.secret_from_files())?;
        cache.set_secret(secret.clone());
        cache.secret()
    }

    fn secret_from_files(&self) -> Option<String> {
        self.search_dirs.iter().find_map(|dir| {
            CREDENTIAL_FILES
                .iter()
                .find_map(|name| secret_from_file(&dir.join(name)))
        })
    }
}

/// Read a non-empty environment variable.
pub(crate) fn non_empty_env(name: &str) -> Option<String> {
    env::var(name).ok().filter(|value| !value.trim().is_empty())
}

fn secret_from_env() -> Option<String> {
    non_empty_env(HOSTED_ENV)?;
    let secret = non_empty_env(SECRET_ENV)?;
    debug!("Using {} from hosted environment", SECRET_ENV);
    Some(secret)
}

/// Extract the `oauth_token` of the first host entry matching github.com.
fn secret_from_file(path: &Path) -> Option<String> {
    let content = std::fs::read_to_string(path).ok()?;
    let value: serde_json::Value = match serde_json::from_str(&content) {
        Ok(value) => value,
        Err(e) => {
            debug!("Ignoring unparseable credential file {}: {}", path.display(), e);
            return None;
        }
    };

    let secret = value
        .as_object()?
        .iter()
        .filter(|(host, _)| host.contains(HOST_MARKER))
        .find_map(|(_, entry)| entry.get("oauth_token")?.as_str())
        .filter(|token| !token.is_empty())?
        .to_string();

    debug!("Found secret in {}", path.display());
    Some(secret)
}

/// Platform-specific directories holding `github-copilot` credential files.
fn default_search_dirs() -> Vec<PathBuf> {
    let mut candidates = Vec::new();

    if let Some(xdg) = non_empty_env("XDG_CONFIG_HOME") {
        candidates.push(PathBuf::from(xdg).join("github-copilot"));
    }

    if cfg!(windows) {
        if let Some(local) = dirs::data_local_dir() {
            candidates.push(local.join("github-copilot"));
        }
    } else if let Some(home) = dirs::home_dir() {
        candidates.push(home.join(".config").join("github-copilot"));
    }

    candidates.dedup();
    candidates
}

/// Mask a token for log output, keeping only a short prefix.
pub fn mask_token(token: &str) -> String {
    let prefix: String = token.chars().take(4).collect();
    format!("{prefix}…({} chars)", token.chars().count())
}
