use std::collections::BTreeMap;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The three guarded navigation primitives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NavigationKind {
    /// Push a new page onto the stack.
    Forward,
    /// Replace the current page.
    Replace,
    /// Jump to a tab page.
    SwitchTab,
}

impl NavigationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NavigationKind::Forward => "forward",
            NavigationKind::Replace => "replace",
            NavigationKind::SwitchTab => "switchTab",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NavigateOptions {
    pub target_id: String,
    /// Provider-specific options passed through untouched.
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl NavigateOptions {
    pub fn new(target_id: impl Into<String>) -> Self {
        Self {
            target_id: target_id.into(),
            extra: BTreeMap::new(),
        }
    }

    pub fn with_option(mut self, key: impl Into<String>, value: Value) -> Self {
        self.extra.insert(key.into(), value);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackOptions {
    /// Number of pages to pop.
    pub delta: u32,
}

impl Default for BackOptions {
    fn default() -> Self {
        Self { delta: 1 }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NavigationOutcome {
    pub message: String,
    /// Set when back-navigation failed and the landing target was used instead.
    #[serde(default)]
    pub fell_back: bool,
}

impl NavigationOutcome {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            fell_back: false,
        }
    }
}

/// Failure reported by the navigation provider. Surfaced unmodified.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct ProviderError {
    pub message: String,
}

impl ProviderError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

pub type ProviderResult = Result<NavigationOutcome, ProviderError>;

/// Platform navigation backend the gate dispatches to.
#[async_trait]
pub trait NavigationProvider: Send + Sync {
    async fn forward(&self, options: NavigateOptions) -> ProviderResult;

    async fn replace(&self, options: NavigateOptions) -> ProviderResult;

    async fn switch_tab(&self, options: NavigateOptions) -> ProviderResult;

    async fn back(&self, options: BackOptions) -> ProviderResult;

    /// Where to send the user when back-navigation fails.
    async fn fallback(&self, target: &str) -> ProviderResult {
        self.switch_tab(NavigateOptions::new(target)).await
    }

    async fn dispatch(&self, kind: NavigationKind, options: NavigateOptions) -> ProviderResult {
        match kind {
            NavigationKind::Forward => self.forward(options).await,
            NavigationKind::Replace => self.replace(options).await,
            NavigationKind::SwitchTab => self.switch_tab(options).await,
        }
    }
}

/// One dispatched navigation, as seen by [`LoggingProvider`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NavigationRecord {
    pub operation: &'static str,
    pub target: Option<String>,
}

/// Provider that accepts every navigation, logging and recording it.
#[derive(Debug, Default)]
pub struct LoggingProvider {
    history: Mutex<Vec<NavigationRecord>>,
}

impl LoggingProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn history(&self) -> Vec<NavigationRecord> {
        self.history.lock().clone()
    }

    fn record(&self, operation: &'static str, target: Option<String>) -> ProviderResult {
        tracing::info!(operation, target = ?target, "navigation dispatched");
        self.history.lock().push(NavigationRecord { operation, target });
        Ok(NavigationOutcome::ok(format!("{operation}:ok")))
    }
}

#[async_trait]
impl NavigationProvider for LoggingProvider {
    async fn forward(&self, options: NavigateOptions) -> ProviderResult {
        self.record("forward", Some(options.target_id))
    }

    async fn replace(&self, options: NavigateOptions) -> ProviderResult {
        self.record("replace", Some(options.target_id))
    }

    async fn switch_tab(&self, options: NavigateOptions) -> ProviderResult {
        self.record("switchTab", Some(options.target_id))
    }

    async fn back(&self, _options: BackOptions) -> ProviderResult {
        self.record("back", None)
    }
}
