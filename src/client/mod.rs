//! HTTP access to the service
//!
//! Components talk to the service through [`ServiceClient`], which owns the
//! base URL and user agent and attaches a session's cookies. The actual I/O
//! sits behind the [`Transport`] trait so tests can script responses.

mod http;
pub mod scrape;

pub use http::UreqTransport;

use crate::config::Config;
use crate::error::{OlError, OlResult};
use crate::session::Session;
use chrono::Utc;
use std::io::{self, Read};
use std::time::Duration;
use tracing::debug;

/// HTTP method
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

/// Request payload
#[derive(Debug, Clone, PartialEq)]
pub enum Body {
    Empty,
    Form(Vec<(String, String)>),
    Json(serde_json::Value),
}

/// An outgoing request
#[derive(Debug, Clone)]
pub struct Request {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Body,
    pub timeout: Option<Duration>,
}

impl Request {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: Method::Get,
            url: url.into(),
            headers: vec![],
            body: Body::Empty,
            timeout: None,
        }
    }

    pub fn post(url: impl Into<String>, body: Body) -> Self {
        Self {
            method: Method::Post,
            url: url.into(),
            headers: vec![],
            body,
            timeout: None,
        }
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Look up a header value (case-insensitive)
    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Look up a form field value
    pub fn form_value(&self, name: &str) -> Option<&str> {
        match &self.body {
            Body::Form(fields) => fields
                .iter()
                .find(|(k, _)| k == name)
                .map(|(_, v)| v.as_str()),
            _ => None,
        }
    }
}

/// A received response with a streaming body
pub struct Response {
    status: u16,
    headers: Vec<(String, String)>,
    body: Box<dyn Read>,
}

impl Response {
    pub fn new(status: u16, headers: Vec<(String, String)>, body: Box<dyn Read>) -> Self {
        Self {
            status,
            headers,
            body,
        }
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Whether the service refused the session. Redirects are not followed,
    /// so a bounce to the login page shows up as a 3xx here.
    pub fn is_auth_failure(&self) -> bool {
        matches!(self.status, 401 | 403) || (300..400).contains(&self.status)
    }

    /// First value of a header (case-insensitive)
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// All `Set-Cookie` header values
    pub fn set_cookies(&self) -> impl Iterator<Item = &str> {
        self.headers
            .iter()
            .filter(|(k, _)| k.eq_ignore_ascii_case("set-cookie"))
            .map(|(_, v)| v.as_str())
    }

    /// Declared body length, if any
    pub fn content_length(&self) -> Option<u64> {
        self.header("content-length")?.trim().parse().ok()
    }

    pub fn into_reader(self) -> Box<dyn Read> {
        self.body
    }

    pub fn into_text(mut self) -> io::Result<String> {
        let mut text = String::new();
        self.body.read_to_string(&mut text)?;
        Ok(text)
    }
}

/// Performs HTTP requests
pub trait Transport {
    /// Send a request. Non-2xx statuses are returned as responses, not
    /// errors; only transport failures produce `Err`.
    fn send(&self, request: Request) -> OlResult<Response>;
}

/// Service-aware HTTP client
pub struct ServiceClient {
    transport: Box<dyn Transport>,
    base_url: String,
    host: String,
    user_agent: String,
    request_timeout: Option<Duration>,
}

impl ServiceClient {
    /// Create a client backed by the ureq transport
    pub fn new(config: &Config) -> OlResult<Self> {
        Self::with_transport(config, Box::new(UreqTransport::new()))
    }

    /// Create a client with a custom transport
    pub fn with_transport(config: &Config, transport: Box<dyn Transport>) -> OlResult<Self> {
        let base_url = config.service.base_url.trim_end_matches('/').to_string();
        let host = host_of(&base_url)
            .ok_or_else(|| OlError::User(format!("Invalid service URL: {}", base_url)))?
            .to_string();

        Ok(Self {
            transport,
            base_url,
            host,
            user_agent: config.service.user_agent.clone(),
            request_timeout: config.http.request_timeout(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Host the session cookies belong to
    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    /// Resolve a path or locator against the base URL
    pub fn url(&self, path: &str) -> String {
        if is_absolute_url(path) {
            path.to_string()
        } else if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }

    /// GET a URL, attaching session cookies when given
    pub fn get(&self, url: &str, session: Option<&Session>) -> OlResult<Response> {
        self.send(Request::get(url), session)
    }

    /// Send a request with the user agent, session cookies and default timeout
    pub fn send(&self, mut request: Request, session: Option<&Session>) -> OlResult<Response> {
        request = request.header("User-Agent", self.user_agent.as_str());

        if let Some(session) = session {
            if let Some(cookies) = session.cookie_header(&request.url, Utc::now()) {
                request = request.header("Cookie", cookies);
            }
        }

        if request.timeout.is_none() {
            request.timeout = self.request_timeout;
        }

        debug!("{:?} {}", request.method, request.url);
        self.transport.send(request)
    }
}

/// Whether a string is an absolute http(s) URL
pub fn is_absolute_url(s: &str) -> bool {
    s.starts_with("https://") || s.starts_with("http://")
}

/// Extract the host (without port or credentials) from an absolute URL
pub fn host_of(url: &str) -> Option<&str> {
    let rest = url.split_once("://")?.1;
    let authority = rest.split(['/', '?', '#']).next()?;
    let authority = authority.rsplit('@').next()?;
    let host = if authority.starts_with('[') {
        authority.split(']').next().map(|h| h.trim_start_matches('['))?
    } else {
        authority.split(':').next()?
    };
    (!host.is_empty()).then_some(host)
}


#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;

    #[test]
    fn host_of_variants() {
        assert_eq!(host_of("https://www.overleaf.com"), Some("www.overleaf.com"));
        assert_eq!(host_of("https://www.overleaf.com:8443/project"), Some("www.overleaf.com"));
        assert_eq!(host_of("http://user:pw@ol.test/x?y"), Some("ol.test"));
        assert_eq!(host_of("http://[::1]:3000/"), Some("::1"));
        assert_eq!(host_of("/project"), None);
        assert_eq!(host_of("https:///nohost"), None);
    }

    #[test]
    fn url_joins_paths() {
        let (client, _log) = scripted_client(vec![]);
        assert_eq!(client.url("/project"), "https://ol.test/project");
        assert_eq!(client.url("login"), "https://ol.test/login");
        assert_eq!(
            client.url("https://cdn.example.org/a.pdf"),
            "https://cdn.example.org/a.pdf"
        );
    }

    #[test]
    fn send_attaches_cookies_and_user_agent() {
        let (client, log) = scripted_client(vec![Reply::ok("")]);
        let session = valid_session();

        client.get("https://ol.test/project", Some(&session)).unwrap();

        let log = log.borrow();
        assert_eq!(log[0].header_value("cookie"), Some("overleaf_session2=s%3Aabc"));
        assert!(log[0].header_value("user-agent").unwrap().contains("Mozilla"));
    }

    #[test]
    fn cookies_are_not_sent_to_other_hosts() {
        let (client, log) = scripted_client(vec![Reply::ok("")]);
        let session = valid_session();

        client
            .get("https://files.elsewhere.example/out.pdf", Some(&session))
            .unwrap();

        assert!(log.borrow()[0].header_value("cookie").is_none());
    }

    #[test]
    fn secure_cookies_stay_off_plain_http() {
        let (client, log) = scripted_client(vec![Reply::ok(""), Reply::ok("")]);
        let mut session = valid_session();
        session.merge_set_cookie("gclb=lb; Secure", "ol.test", Utc::now());

        client.get("http://ol.test/project", Some(&session)).unwrap();
        client.get("https://ol.test/project", Some(&session)).unwrap();

        let log = log.borrow();
        assert_eq!(log[0].header_value("cookie"), Some("overleaf_session2=s%3Aabc"));
        assert_eq!(
            log[1].header_value("cookie"),
            Some("gclb=lb; overleaf_session2=s%3Aabc")
        );
    }

    #[test]
    fn response_helpers() {
        let response = Response::new(
            302,
            vec![
                ("Set-Cookie".into(), "a=1".into()),
                ("set-cookie".into(), "b=2".into()),
                ("Content-Length".into(), "42".into()),
            ],
            Box::new(std::io::empty()),
        );
        assert!(response.is_auth_failure());
        assert!(!response.is_success());
        assert_eq!(response.set_cookies().collect::<Vec<_>>(), vec!["a=1", "b=2"]);
        assert_eq!(response.content_length(), Some(42));
    }
}
