//! # retro-auth
//!
//! Bearer credential storage for the RetroQuest realtime client.
//!
//! The realtime session never caches a token: every subscribe frame carries
//! the credential current at the moment of the call, because the store may be
//! refreshed externally (a login flow, a token rotation). [`TokenStore`] is
//! that read-through seam; the client takes an `Arc<dyn TokenStore>` and asks
//! it again on each call.
//!
//! Two implementations ship here:
//! - [`MemoryTokenStore`] — shared in-memory slot, the composition-root and
//!   test default.
//! - [`FileTokenStore`] — re-reads a versioned JSON credential file on every
//!   lookup, so external refreshes are always observed.

#![deny(unsafe_code)]

pub mod errors;
pub mod storage;
pub mod store;

pub use errors::CredentialError;
pub use storage::{
    CredentialFile, FileTokenStore, clear_credential_file, credential_file_path,
    load_credential_file, save_credential_file,
};
pub use store::{MemoryTokenStore, TokenStore};

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn re_exports_work() {
        let store = MemoryTokenStore::new();
        store.set("tok");
        assert_eq!(store.bearer().as_deref(), Some("Bearer tok"));
        let _file = CredentialFile::new("tok");
    }
}
