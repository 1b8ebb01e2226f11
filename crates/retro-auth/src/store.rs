//! The read-through token seam and its in-memory implementation.

use parking_lot::RwLock;

/// Source of the bearer credential, consulted fresh on every call.
///
/// Implementations must return the token current *now* — the realtime client
/// deliberately never snapshots it at construction or connect time.
pub trait TokenStore: Send + Sync {
    /// The raw token, if one is present.
    fn token(&self) -> Option<String>;

    /// The token formatted as an `Authorization` header value.
    fn bearer(&self) -> Option<String> {
        self.token().map(|t| format!("Bearer {t}"))
    }
}

/// Shared in-memory token slot.
#[derive(Default)]
pub struct MemoryTokenStore {
    token: RwLock<Option<String>>,
}

impl MemoryTokenStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store holding the given token.
    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            token: RwLock::new(Some(token.into())),
        }
    }

    /// Replace the stored token.
    pub fn set(&self, token: impl Into<String>) {
        *self.token.write() = Some(token.into());
    }

    /// Drop the stored token.
    pub fn clear(&self) {
        *self.token.write() = None;
    }
}

impl TokenStore for MemoryTokenStore {
    fn token(&self) -> Option<String> {
        self.token.read().clone()
    }
}
