//! Session persistence across process invocations
//!
//! Two files live in the state directory: `cookies.json` (the cookie jar)
//! and `csrf` (the plaintext anti-forgery token). The jar records a digest
//! of the token it was saved with, so a crash between the two writes can
//! never pair a new jar with a stale token.

use super::state::{Session, StoredCookie};
use crate::error::OlResult;
use crate::storage;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

const COOKIES_FILE: &str = "cookies.json";
const TOKEN_FILE: &str = "csrf";

/// On-disk cookie jar
#[derive(Debug, Serialize, Deserialize)]
struct CookieJarFile {
    token_digest: String,
    cookies: BTreeMap<String, StoredCookie>,
}

/// Loads, saves and clears the persisted session
#[derive(Debug, Clone)]
pub struct SessionStore {
    cookies_path: PathBuf,
    token_path: PathBuf,
}

impl SessionStore {
    /// Create a store rooted at the state directory
    pub fn new(state_dir: &Path) -> Self {
        Self {
            cookies_path: state_dir.join(COOKIES_FILE),
            token_path: state_dir.join(TOKEN_FILE),
        }
    }

    /// Load the persisted session.
    ///
    /// Returns `Ok(None)` when nothing is stored or the stored files are
    /// truncated, unparseable or inconsistent. Expired cookies are dropped.
    pub fn load(&self) -> OlResult<Option<Session>> {
        let Some(token) = storage::read_optional(&self.token_path)? else {
            debug!("No stored token at {}", self.token_path.display());
            return Ok(None);
        };
        let Some(jar) = storage::read_optional(&self.cookies_path)? else {
            debug!("No stored cookie jar at {}", self.cookies_path.display());
            return Ok(None);
        };

        let jar: CookieJarFile = match serde_json::from_str(&jar) {
            Ok(jar) => jar,
            Err(e) => {
                warn!(
                    "Ignoring corrupt cookie jar {}: {}",
                    self.cookies_path.display(),
                    e
                );
                return Ok(None);
            }
        };

        if jar.token_digest != token_digest(&token) {
            warn!("Stored cookie jar does not match stored token, ignoring session");
            return Ok(None);
        }

        let mut session = Session::from_parts(jar.cookies, token);
        let dropped = session.drop_expired(Utc::now());
        if dropped > 0 {
            debug!("Dropped {} expired cookie(s)", dropped);
        }

        Ok(Some(session))
    }

    /// Persist a session, token first then the jar that references it
    pub fn save(&self, session: &Session) -> OlResult<()> {
        let jar = CookieJarFile {
            token_digest: token_digest(session.csrf_token()),
            cookies: session.cookies().clone(),
        };
        let content = serde_json::to_string_pretty(&jar)?;

        storage::write_atomic(&self.token_path, session.csrf_token().as_bytes())?;
        storage::write_atomic(&self.cookies_path, content.as_bytes())?;

        debug!("Saved session with {} cookie(s)", session.cookies().len());
        Ok(())
    }

    /// Remove persisted state; succeeds when nothing is stored
    pub fn clear(&self) -> OlResult<bool> {
        let removed_jar = storage::remove_if_exists(&self.cookies_path)?;
        let removed_token = storage::remove_if_exists(&self.token_path)?;
        let removed = removed_jar || removed_token;
        if removed {
            info!("Cleared stored session");
        }
        Ok(removed)
    }
}

fn token_digest(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn test_store() -> (SessionStore, TempDir) {
        let temp = TempDir::new().unwrap();
        (SessionStore::new(temp.path()), temp)
    }

    fn logged_in() -> Session {
        let mut session = Session::new("csrf-abc");
        session.merge_set_cookies(
            [
                "overleaf_session2=s%3Aabc.def; Domain=.overleaf.com; Path=/; HttpOnly",
                "GCLB=xyz; Max-Age=3600",
            ],
            "www.overleaf.com",
            Utc::now(),
        );
        session
    }

    #[test]
    fn save_and_load_roundtrip() {
        let (store, _temp) = test_store();
        let session = logged_in();

        store.save(&session).unwrap();
        let loaded = store.load().unwrap().unwrap();

        assert_eq!(loaded.csrf_token(), "csrf-abc");
        assert_eq!(
            loaded.cookie("overleaf_session2"),
            session.cookie("overleaf_session2")
        );
        assert!(loaded.is_valid("overleaf_session2"));
    }

    #[test]
    fn missing_files_mean_no_session() {
        let (store, _temp) = test_store();
        assert!(store.load().unwrap().is_none());
    }

    #[test]
    fn truncated_jar_means_no_session() {
        let (store, temp) = test_store();
        store.save(&logged_in()).unwrap();

        let path = temp.path().join(COOKIES_FILE);
        let content = fs::read_to_string(&path).unwrap();
        fs::write(&path, &content[..content.len() / 2]).unwrap();

        assert!(store.load().unwrap().is_none());
    }

    #[test]
    fn jar_from_other_token_is_rejected() {
        let (store, temp) = test_store();
        store.save(&logged_in()).unwrap();

        // Simulate a crash after the token of a newer login was written
        fs::write(temp.path().join(TOKEN_FILE), "newer-token").unwrap();

        assert!(store.load().unwrap().is_none());
    }

    #[test]
    fn expired_cookies_dropped_on_load() {
        let (store, _temp) = test_store();
        let mut session = logged_in();
        session.merge_set_cookie(
            "stale=1; Expires=Thu, 01 Jan 1970 00:00:01 GMT",
            "www.overleaf.com",
            chrono::DateTime::from_timestamp(0, 0).unwrap(),
        );
        assert!(session.cookie("stale").is_some());

        store.save(&session).unwrap();
        let loaded = store.load().unwrap().unwrap();

        assert!(loaded.cookie("stale").is_none());
        assert!(loaded.cookie("overleaf_session2").is_some());
    }

    #[test]
    fn clear_removes_files_and_is_idempotent() {
        let (store, temp) = test_store();
        store.save(&logged_in()).unwrap();

        assert!(store.clear().unwrap());
        assert!(!temp.path().join(COOKIES_FILE).exists());
        assert!(!temp.path().join(TOKEN_FILE).exists());
        assert!(!store.clear().unwrap());
        assert!(store.load().unwrap().is_none());
    }
}
