//! Session lifecycle: reuse a stored session or log in

use crate::auth::{Authenticator, Credentials};
use crate::client::ServiceClient;
use crate::config::Config;
use crate::error::OlResult;
use crate::session::state::Session;
use crate::session::store::SessionStore;
use std::path::Path;
use tracing::{debug, info};

/// Session manager ties the store to the authenticator
pub struct SessionManager<'a> {
    store: SessionStore,
    client: &'a ServiceClient,
    config: &'a Config,
}

impl<'a> SessionManager<'a> {
    /// Create a session manager over the given state directory
    pub fn new(config: &'a Config, client: &'a ServiceClient, state_dir: &Path) -> Self {
        Self {
            store: SessionStore::new(state_dir),
            client,
            config,
        }
    }

    /// The stored session, if one exists and is still usable
    pub fn current(&self) -> OlResult<Option<Session>> {
        let session = self.store.load()?;
        Ok(session.filter(|s| {
            let valid = s.is_valid(&self.config.service.session_cookie);
            if !valid {
                debug!("Stored session lacks the session cookie or token");
            }
            valid
        }))
    }

    /// Log in with fresh credentials and persist the new session
    pub fn login(&self, credentials: &Credentials) -> OlResult<Session> {
        let session = Authenticator::new(self.client, self.config).login(credentials)?;
        self.store.save(&session)?;
        Ok(session)
    }

    /// Return the stored session, or obtain credentials and log in
    pub fn ensure<F>(&self, credentials: F) -> OlResult<Session>
    where
        F: FnOnce() -> OlResult<Credentials>,
    {
        if let Some(session) = self.current()? {
            debug!("Reusing stored session");
            return Ok(session);
        }

        info!("No valid session stored, logging in");
        let credentials = credentials()?;
        self.login(&credentials)
    }

    /// Clear the stored session
    pub fn logout(&self) -> OlResult<bool> {
        self.store.clear()
    }
}
