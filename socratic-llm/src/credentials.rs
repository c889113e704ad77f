//! Provider credentials
//!
//! The gateway asks for the key on every call, so a key set at runtime is
//! picked up by the next request without rebuilding anything.

use socratic_core::is_placeholder_credential;
use std::sync::RwLock;

/// Source of the provider API key.
pub trait CredentialProvider: Send + Sync {
    /// Current key, if any has been set.
    fn credential(&self) -> Option<String>;

    /// True when a usable (non-blank, non-placeholder) key is available.
    fn is_configured(&self) -> bool {
        self.credential()
            .map(|key| !is_placeholder_credential(&key))
            .unwrap_or(false)
    }
}

/// Process-wide key holder with explicit set/get.
/// Thread-safe via RwLock.
#[derive(Default)]
pub struct CredentialStore {
    key: RwLock<Option<String>>,
}

impl CredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_key(key: impl Into<String>) -> Self {
        Self {
            key: RwLock::new(Some(key.into())),
        }
    }

    /// Read the key from the first of `vars` that is set and non-empty.
    pub fn from_env(vars: &[&str]) -> Self {
        let key = vars
            .iter()
            .filter_map(|var| std::env::var(var).ok())
            .find(|value| !value.trim().is_empty());
        Self {
            key: RwLock::new(key),
        }
    }

    pub fn set(&self, key: impl Into<String>) {
        if let Ok(mut guard) = self.key.write() {
            *guard = Some(key.into());
        }
    }

    pub fn clear(&self) {
        if let Ok(mut guard) = self.key.write() {
            *guard = None;
        }
    }

    pub fn get(&self) -> Option<String> {
        self.key.read().ok().and_then(|guard| guard.clone())
    }
}

impl CredentialProvider for CredentialStore {
    fn credential(&self) -> Option<String> {
        self.get()
    }
}

impl std::fmt::Debug for CredentialStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialStore")
            .field("key", &self.get().map(|_| "[REDACTED]"))
            .finish()
    }
}
