//! Minimal extraction of values embedded in the service's HTML pages

use regex_lite::Regex;
use std::sync::OnceLock;

fn input_tag() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?is)<input\b[^>]*>").expect("valid input regex"))
}

fn meta_tag() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?is)<meta\b[^>]*>").expect("valid meta regex"))
}

fn script_block() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?is)<script\b([^>]*)>(.*?)</script>").expect("valid script regex")
    })
}

fn attribute() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"([A-Za-z_:][-A-Za-z0-9_:.]*)\s*=\s*(?:"([^"]*)"|'([^']*)')"#)
            .expect("valid attribute regex")
    })
}

/// Parse the quoted attributes of a single tag
fn attributes(tag: &str) -> Vec<(String, String)> {
    attribute()
        .captures_iter(tag)
        .filter_map(|caps| {
            let name = caps.get(1)?.as_str().to_ascii_lowercase();
            let value = caps.get(2).or_else(|| caps.get(3))?.as_str();
            Some((name, decode_entities(value)))
        })
        .collect()
}

fn attr<'a>(attrs: &'a [(String, String)], name: &str) -> Option<&'a str> {
    attrs
        .iter()
        .find(|(k, _)| k == name)
        .map(|(_, v)| v.as_str())
}

/// Value of the first `<input name="...">` with the given name
pub fn input_value(html: &str, name: &str) -> Option<String> {
    input_tag().find_iter(html).find_map(|m| {
        let attrs = attributes(m.as_str());
        (attr(&attrs, "name") == Some(name))
            .then(|| attr(&attrs, "value").map(str::to_string))
            .flatten()
    })
}

/// Content of the first `<meta name="...">` with the given name
pub fn meta_content(html: &str, name: &str) -> Option<String> {
    meta_tag().find_iter(html).find_map(|m| {
        let attrs = attributes(m.as_str());
        (attr(&attrs, "name") == Some(name))
            .then(|| attr(&attrs, "content").map(str::to_string))
            .flatten()
    })
}

/// Body of the first `<script id="...">` block with the given id
pub fn script_body(html: &str, id: &str) -> Option<String> {
    script_block().captures_iter(html).find_map(|caps| {
        let attrs = attributes(caps.get(1)?.as_str());
        (attr(&attrs, "id") == Some(id)).then(|| caps.get(2).map(|b| b.as_str().trim().to_string()))?
    })
}

/// Whether the page is a login form rather than the requested content
pub fn looks_like_login_page(html: &str) -> bool {
    input_value(html, "_csrf").is_some()
        && input_tag().find_iter(html).any(|m| {
            let attrs = attributes(m.as_str());
            attr(&attrs, "name") == Some("password")
        })
}

/// Decode the HTML character references that appear in attribute values
pub fn decode_entities(s: &str) -> String {
    if !s.contains('&') {
        return s.to_string();
    }

    let mut out = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(pos) = rest.find('&') {
        out.push_str(&rest[..pos]);
        rest = &rest[pos..];

        let decoded = rest.find(';').and_then(|end| {
            let entity = &rest[1..end];
            let ch = match entity {
                "quot" => Some('"'),
                "amp" => Some('&'),
                "apos" => Some('\''),
                "lt" => Some('<'),
                "gt" => Some('>'),
                "nbsp" => Some('\u{a0}'),
                _ => entity
                    .strip_prefix("#x")
                    .or_else(|| entity.strip_prefix("#X"))
                    .and_then(|hex| u32::from_str_radix(hex, 16).ok())
                    .or_else(|| entity.strip_prefix('#').and_then(|d| d.parse().ok()))
                    .and_then(char::from_u32),
            };
            ch.map(|c| (c, end))
        });

        match decoded {
            Some((c, end)) => {
                out.push(c);
                rest = &rest[end + 1..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    out
}
