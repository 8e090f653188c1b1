//! Login handshake against the service

use crate::client::{scrape, Body, Request, ServiceClient};
use crate::config::Config;
use crate::error::{OlError, OlResult};
use crate::session::Session;
use chrono::Utc;
use serde::Deserialize;
use std::fmt;
use std::time::Duration;
use tracing::{debug, info};

/// Login credentials. The password never appears in `Debug` output.
#[derive(Clone)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Body returned by the login form submission
#[derive(Debug, Deserialize)]
struct LoginReply {
    message: Option<LoginMessage>,
}

#[derive(Debug, Deserialize)]
struct LoginMessage {
    #[serde(rename = "type")]
    kind: Option<String>,
    text: Option<String>,
}

/// Performs the login handshake and produces a fresh session
pub struct Authenticator<'a> {
    client: &'a ServiceClient,
    session_cookie: String,
    submit_timeout: Duration,
}

impl<'a> Authenticator<'a> {
    pub fn new(client: &'a ServiceClient, config: &Config) -> Self {
        Self {
            client,
            session_cookie: config.service.session_cookie.clone(),
            submit_timeout: config.http.submit_timeout(),
        }
    }

    /// Log in and return the resulting session for the caller to persist
    pub fn login(&self, credentials: &Credentials) -> OlResult<Session> {
        let login_url = self.client.url("/login");

        let page = self
            .client
            .get(&login_url, None)
            .map_err(|e| OlError::Auth(format!("could not load login page: {}", e)))?;
        if !page.is_success() {
            return Err(OlError::Auth(format!(
                "status {} when loading {}",
                page.status(),
                login_url
            )));
        }

        let page_cookies: Vec<String> = page.set_cookies().map(str::to_string).collect();
        let html = page
            .into_text()
            .map_err(|e| OlError::Auth(format!("reading login page: {}", e)))?;
        let csrf = extract_csrf_token(&html)
            .ok_or_else(|| OlError::Auth("anti-forgery token not found on login page".into()))?;
        debug!("Found anti-forgery token on login page");

        let mut session = Session::new(csrf.clone());
        session.merge_set_cookies(
            page_cookies.iter().map(String::as_str),
            self.client.host(),
            Utc::now(),
        );

        let form = Body::Form(vec![
            ("_csrf".to_string(), csrf),
            ("email".to_string(), credentials.email.clone()),
            ("password".to_string(), credentials.password.clone()),
        ]);
        let request = Request::post(&login_url, form).timeout(self.submit_timeout);

        let reply = self
            .client
            .send(request, Some(&session))
            .map_err(|e| OlError::Auth(format!("submitting credentials: {}", e)))?;
        if !reply.is_success() {
            return Err(OlError::Auth(format!(
                "status {} when signing in to {} as {}",
                reply.status(),
                login_url,
                credentials.email
            )));
        }

        let reply_cookies: Vec<String> = reply.set_cookies().map(str::to_string).collect();
        let body = reply
            .into_text()
            .map_err(|e| OlError::Auth(format!("reading login reply: {}", e)))?;
        if let Some(message) = rejection_message(&body) {
            return Err(OlError::Auth(message));
        }

        session.merge_set_cookies(
            reply_cookies.iter().map(String::as_str),
            self.client.host(),
            Utc::now(),
        );

        if !session.is_valid(&self.session_cookie) {
            return Err(OlError::Auth(format!(
                "service did not issue the {} cookie",
                self.session_cookie
            )));
        }

        info!("Logged in as {}", credentials.email);
        Ok(session)
    }
}

/// Locate the anti-forgery token in a login page
fn extract_csrf_token(html: &str) -> Option<String> {
    scrape::input_value(html, "_csrf")
        .or_else(|| scrape::meta_content(html, "ol-csrfToken"))
        .filter(|token| !token.is_empty())
}

/// Error text when the reply reports rejected credentials.
///
/// A successful login answers with a redirect hint or a non-JSON page, so
/// anything that isn't an explicit error message counts as accepted.
fn rejection_message(body: &str) -> Option<String> {
    let reply: LoginReply = serde_json::from_str(body).ok()?;
    let message = reply.message?;
    if message.kind.as_deref() != Some("error") {
        return None;
    }
    Some(
        message
            .text
            .unwrap_or_else(|| "credentials rejected".to_string()),
    )
}
