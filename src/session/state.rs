//! Authenticated session state

use crate::client::host_of;
use chrono::{DateTime, Duration, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A cookie as kept in the session jar
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredCookie {
    /// Cookie value, stored verbatim
    pub value: String,

    /// Domain the cookie applies to (leading dot means subdomains too)
    pub domain: String,

    /// Path prefix the cookie is scoped to
    #[serde(default = "root_path")]
    pub path: String,

    /// Only sent over https/wss
    #[serde(default)]
    pub secure: bool,

    /// Absolute expiry; `None` for session cookies
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires: Option<DateTime<Utc>>,
}

impl StoredCookie {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires.is_some_and(|expires| expires <= now)
    }

    /// Whether the cookie should be sent to `host`
    pub fn matches_host(&self, host: &str) -> bool {
        let domain = self.domain.trim_start_matches('.');
        if domain.is_empty() {
            return false;
        }
        host.eq_ignore_ascii_case(domain)
            || host
                .to_ascii_lowercase()
                .ends_with(&format!(".{}", domain.to_ascii_lowercase()))
    }

    /// Whether the cookie's path scope covers `request_path`
    pub fn matches_path(&self, request_path: &str) -> bool {
        match request_path.strip_prefix(self.path.as_str()) {
            Some(rest) => self.path.ends_with('/') || rest.is_empty() || rest.starts_with('/'),
            None => false,
        }
    }

    /// Whether the cookie should accompany a request to `url`
    pub fn matches_url(&self, url: &str) -> bool {
        let Some(target) = RequestTarget::parse(url) else {
            return false;
        };
        (target.secure || !self.secure)
            && self.matches_host(target.host)
            && self.matches_path(target.path)
    }
}

fn root_path() -> String {
    "/".to_string()
}

/// The parts of a request URL that decide which cookies are sent
struct RequestTarget<'a> {
    secure: bool,
    host: &'a str,
    path: &'a str,
}

impl<'a> RequestTarget<'a> {
    fn parse(url: &'a str) -> Option<Self> {
        let (scheme, rest) = url.split_once("://")?;
        let host = host_of(url)?;
        let path = rest
            .find('/')
            .map(|start| &rest[start..])
            .unwrap_or("/");
        let path = path.split(['?', '#']).next().unwrap_or("/");
        Some(Self {
            secure: scheme.eq_ignore_ascii_case("https") || scheme.eq_ignore_ascii_case("wss"),
            host,
            path: if path.is_empty() { "/" } else { path },
        })
    }
}

/// Authentication state: cookie jar plus anti-forgery token
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    cookies: BTreeMap<String, StoredCookie>,
    csrf_token: String,
}

impl Session {
    /// Create a session holding only a token
    pub fn new(csrf_token: impl Into<String>) -> Self {
        Self {
            cookies: BTreeMap::new(),
            csrf_token: csrf_token.into(),
        }
    }

    /// Rebuild a session from persisted parts
    pub fn from_parts(cookies: BTreeMap<String, StoredCookie>, csrf_token: String) -> Self {
        Self {
            cookies,
            csrf_token,
        }
    }

    pub fn csrf_token(&self) -> &str {
        &self.csrf_token
    }

    pub fn cookies(&self) -> &BTreeMap<String, StoredCookie> {
        &self.cookies
    }

    pub fn cookie(&self, name: &str) -> Option<&StoredCookie> {
        self.cookies.get(name)
    }

    /// A session is usable only with the required cookie and a token
    pub fn is_valid(&self, required_cookie: &str) -> bool {
        self.cookies.contains_key(required_cookie) && !self.csrf_token.is_empty()
    }

    /// Apply one `Set-Cookie` header received from `request_host`.
    ///
    /// A cookie whose expiry is already in the past removes any stored
    /// cookie of the same name. Returns false if the header is malformed.
    pub fn merge_set_cookie(&mut self, header: &str, request_host: &str, now: DateTime<Utc>) -> bool {
        let Some((name, cookie)) = parse_set_cookie(header, request_host, now) else {
            return false;
        };

        if cookie.is_expired(now) {
            self.cookies.remove(&name);
        } else {
            self.cookies.insert(name, cookie);
        }
        true
    }

    /// Apply every `Set-Cookie` header of a response
    pub fn merge_set_cookies<'a>(
        &mut self,
        headers: impl IntoIterator<Item = &'a str>,
        request_host: &str,
        now: DateTime<Utc>,
    ) -> usize {
        headers
            .into_iter()
            .filter(|header| self.merge_set_cookie(header, request_host, now))
            .count()
    }

    /// Drop cookies that have expired, returning how many were removed
    pub fn drop_expired(&mut self, now: DateTime<Utc>) -> usize {
        let before = self.cookies.len();
        self.cookies.retain(|_, cookie| !cookie.is_expired(now));
        before - self.cookies.len()
    }

    /// `Cookie` header value for a request to `url`, honoring domain,
    /// path and the secure flag
    pub fn cookie_header(&self, url: &str, now: DateTime<Utc>) -> Option<String> {
        let pairs: Vec<String> = self
            .cookies
            .iter()
            .filter(|(_, cookie)| !cookie.is_expired(now) && cookie.matches_url(url))
            .map(|(name, cookie)| format!("{}={}", name, cookie.value))
            .collect();

        (!pairs.is_empty()).then(|| pairs.join("; "))
    }
}

/// Parse a `Set-Cookie` header into a name and stored cookie
fn parse_set_cookie(
    header: &str,
    request_host: &str,
    now: DateTime<Utc>,
) -> Option<(String, StoredCookie)> {
    let mut parts = header.split(';');
    let (name, value) = parts.next()?.split_once('=')?;
    let name = name.trim();
    if name.is_empty() {
        return None;
    }

    let mut domain = request_host.to_string();
    let mut path = root_path();
    let mut secure = false;
    let mut expires = None;
    let mut max_age = None;

    for attribute in parts {
        let (key, val) = attribute
            .split_once('=')
            .map(|(k, v)| (k.trim(), v.trim()))
            .unwrap_or((attribute.trim(), ""));

        if key.eq_ignore_ascii_case("domain") && !val.is_empty() {
            domain = val.to_ascii_lowercase();
        } else if key.eq_ignore_ascii_case("path") && val.starts_with('/') {
            path = val.to_string();
        } else if key.eq_ignore_ascii_case("secure") {
            secure = true;
        } else if key.eq_ignore_ascii_case("expires") {
            expires = parse_cookie_date(val);
        } else if key.eq_ignore_ascii_case("max-age") {
            max_age = val.parse::<i64>().ok();
        }
    }

    // Max-Age wins over Expires
    if let Some(seconds) = max_age {
        expires = Duration::try_seconds(seconds).and_then(|age| now.checked_add_signed(age));
    }

    Some((
        name.to_string(),
        StoredCookie {
            value: value.trim().to_string(),
            domain,
            path,
            secure,
            expires,
        },
    ))
}

fn parse_cookie_date(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(date) = DateTime::parse_from_rfc2822(value) {
        return Some(date.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(value, "%a, %d-%b-%Y %H:%M:%S GMT")
        .ok()
        .map(|naive| naive.and_utc())
}
