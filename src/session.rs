//! Token persistence for the two login realms.
//!
//! Mirrors the console's storage model: one opaque bearer token per realm,
//! and "is a token present" as the only client-side authentication check.
//! The token is never verified, refreshed, or expired locally.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::debug;

use crate::models::Realm;

/// An opaque bearer token as issued by the login endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthToken(String);

impl AuthToken {
    pub fn new(token: impl Into<String>) -> Self {
        AuthToken(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

// Keep tokens out of logs; show only a short prefix.
impl std::fmt::Display for AuthToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let shown = self.0.chars().take(8).collect::<String>();
        write!(f, "{}…", shown)
    }
}

/// File-backed session store, one token file per realm.
#[derive(Debug, Clone)]
pub struct SessionStore {
    dir: PathBuf,
}

impl SessionStore {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        SessionStore {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    fn token_path(&self, realm: Realm) -> PathBuf {
        self.dir.join(realm.token_file())
    }

    pub fn save(&self, realm: Realm, token: &AuthToken) -> Result<()> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("Cannot create token directory: {}", self.dir.display()))?;
        let path = self.token_path(realm);
        fs::write(&path, token.as_str())
            .with_context(|| format!("Cannot write token file: {}", path.display()))?;
        debug!("Saved {} token to {}", realm.as_str(), path.display());
        Ok(())
    }

    pub fn load(&self, realm: Realm) -> Option<AuthToken> {
        let path = self.token_path(realm);
        let raw = fs::read_to_string(path).ok()?;
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(AuthToken::new(trimmed))
        }
    }

    pub fn clear(&self, realm: Realm) -> Result<()> {
        let path = self.token_path(realm);
        if path.exists() {
            fs::remove_file(&path)
                .with_context(|| format!("Cannot remove token file: {}", path.display()))?;
        }
        Ok(())
    }

    /// Presence of a stored token is the whole auth check.
    pub fn is_authenticated(&self, realm: Realm) -> bool {
        self.load(realm).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_save_load_clear_roundtrip() {
        let dir = TempDir::new().unwrap();
        let store = SessionStore::new(dir.path());

        assert!(!store.is_authenticated(Realm::Admin));

        let token = AuthToken::new("abc123token");
        store.save(Realm::Admin, &token).unwrap();
        assert!(store.is_authenticated(Realm::Admin));
        assert_eq!(store.load(Realm::Admin), Some(token));

        store.clear(Realm::Admin).unwrap();
        assert!(!store.is_authenticated(Realm::Admin));
        // clearing an absent token is fine
        store.clear(Realm::Admin).unwrap();
    }

    #[test]
    fn test_realms_are_independent() {
        let dir = TempDir::new().unwrap();
        let store = SessionStore::new(dir.path());

        store.save(Realm::University, &AuthToken::new("uni")).unwrap();
        assert!(store.is_authenticated(Realm::University));
        assert!(!store.is_authenticated(Realm::Admin));
    }

    #[test]
    fn test_blank_token_file_is_not_authenticated() {
        let dir = TempDir::new().unwrap();
        let store = SessionStore::new(dir.path());
        std::fs::write(dir.path().join(Realm::Admin.token_file()), "  \n").unwrap();
        assert!(!store.is_authenticated(Realm::Admin));
    }

    #[test]
    fn test_token_display_is_redacted() {
        let token = AuthToken::new("secret-token-value");
        assert_eq!(format!("{}", token), "secret-t…");
    }
}
