//! Link extraction.
//!
//! Turns one fetched message into zero or more [`UnsubscribeAction`]
//! candidates. Header targets are preferred over body links; all URLs are
//! normalized before deduplication so trailing slashes and query order do
//! not produce duplicate candidates.
//!
//! Extraction never fails a scan: malformed headers or HTML degrade to "no
//! action found" for that message.

use std::collections::HashSet;

use mailparse::MailHeaderMap;
use url::Url;

use crate::domain::{ActionKind, Confidence, MessageSummary, UnsubscribeAction};

/// Tokens that mark a body link as an unsubscribe mechanism.
const BODY_LINK_TOKENS: &[&str] = &["unsubscribe", "opt-out", "preferences", "email-settings"];

/// Result of extracting one message.
#[derive(Debug, Clone, Default)]
pub struct Extraction {
    /// Candidate actions, header targets first, deduplicated by normalized URL.
    pub actions: Vec<UnsubscribeAction>,
    /// Whether the body mentions "unsubscribe" at all.
    pub mentions_unsubscribe: bool,
}

impl Extraction {
    /// True when no automatable action was found but the message still talks
    /// about unsubscribing, so the user should be pointed at it manually.
    pub fn needs_manual_followup(&self) -> bool {
        self.actions.is_empty() && self.mentions_unsubscribe
    }
}

/// Extracts unsubscribe candidates from one message.
pub fn extract_actions(message: &MessageSummary) -> Extraction {
    let mut actions = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();

    for target in header_targets(&message.raw_headers) {
        if let Some(url) = normalize_url(&target) {
            if seen.insert(url.clone()) {
                actions.push(UnsubscribeAction {
                    kind: ActionKind::HeaderLink,
                    confidence: Confidence::High,
                    url,
                    message_id: message.id.clone(),
                });
            }
        }
    }

    for target in body_targets(&message.body) {
        if let Some(url) = normalize_url(&target) {
            if seen.insert(url.clone()) {
                actions.push(UnsubscribeAction {
                    kind: ActionKind::BodyLink,
                    confidence: Confidence::Medium,
                    url,
                    message_id: message.id.clone(),
                });
            }
        }
    }

    Extraction {
        actions,
        mentions_unsubscribe: message.body.to_ascii_lowercase().contains("unsubscribe"),
    }
}

/// HTTP(S) targets from the List-Unsubscribe header, in header order.
///
/// `mailto:` targets are skipped; automating them is a send, not a browse.
fn header_targets(raw_headers: &str) -> Vec<String> {
    let value = match mailparse::parse_headers(raw_headers.as_bytes()) {
        Ok((headers, _)) => headers.get_first_value("List-Unsubscribe"),
        Err(_) => fallback_header_value(raw_headers),
    };

    let Some(value) = value else {
        return Vec::new();
    };

    angle_bracket_targets(&value)
        .into_iter()
        .filter(|t| {
            let lower = t.to_ascii_lowercase();
            lower.starts_with("http://") || lower.starts_with("https://")
        })
        .collect()
}

/// Last-resort header scan for blocks mailparse rejects outright.
fn fallback_header_value(raw_headers: &str) -> Option<String> {
    let mut value: Option<String> = None;
    for line in raw_headers.lines() {
        if let Some(current) = value.as_mut() {
            // Folded continuation lines belong to the header we found.
            if line.starts_with(' ') || line.starts_with('\t') {
                current.push_str(line.trim());
                continue;
            }
            break;
        }
        let lower = line.to_ascii_lowercase();
        if let Some(rest) = lower.strip_prefix("list-unsubscribe:") {
            let start = line.len() - rest.len();
            value = Some(line[start..].trim().to_string());
        }
    }
    value
}

/// Extracts `<...>` delimited targets from a header value.
fn angle_bracket_targets(value: &str) -> Vec<String> {
    let mut targets = Vec::new();
    let mut rest = value;
    while let Some(start) = rest.find('<') {
        let after = &rest[start + 1..];
        let Some(end) = after.find('>') else { break };
        targets.push(after[..end].trim().to_string());
        rest = &after[end + 1..];
    }
    targets
}

/// Hyperlinks from the body whose URL or visible text matches an
/// unsubscribe token, in document order.
fn body_targets(body: &str) -> Vec<String> {
    let lower = body.to_ascii_lowercase();
    let mut targets = Vec::new();

    // Anchor tags: match on href or on the link's visible text.
    let mut pos = 0;
    while let Some(offset) = lower[pos..].find("<a") {
        let tag_start = pos + offset;
        let Some(attrs_end) = lower[tag_start..].find('>') else {
            break;
        };
        let attrs = &body[tag_start..tag_start + attrs_end];
        let after_tag = tag_start + attrs_end + 1;
        let inner_end = lower[after_tag..]
            .find("</a")
            .map(|i| after_tag + i)
            .unwrap_or(body.len());
        let text = strip_tags(&body[after_tag..inner_end]).to_ascii_lowercase();
        pos = inner_end;

        let Some(href) = attribute_value(attrs, "href") else {
            continue;
        };
        let href_lower = href.to_ascii_lowercase();
        if BODY_LINK_TOKENS
            .iter()
            .any(|t| href_lower.contains(t) || text.contains(t))
        {
            targets.push(href);
        }
    }

    // Any other href whose URL itself matches (image maps, link elements).
    let mut pos = 0;
    while let Some(offset) = lower[pos..].find("href=") {
        let value_start = pos + offset + "href=".len();
        pos = value_start;
        let Some(href) = quoted_value(&body[value_start..]) else {
            continue;
        };
        let href_lower = href.to_ascii_lowercase();
        if BODY_LINK_TOKENS.iter().any(|t| href_lower.contains(t)) {
            targets.push(href);
        }
    }

    targets
}

/// Reads `name="value"` (or single-quoted) out of a tag's attribute text.
fn attribute_value(attrs: &str, name: &str) -> Option<String> {
    let lower = attrs.to_ascii_lowercase();
    let key = format!("{}=", name);
    let start = lower.find(&key)? + key.len();
    quoted_value(&attrs[start..])
}

/// Reads a quoted (or bare, whitespace-delimited) attribute value.
fn quoted_value(s: &str) -> Option<String> {
    let mut chars = s.chars();
    match chars.next()? {
        quote @ ('"' | '\'') => {
            let rest = &s[1..];
            let end = rest.find(quote)?;
            Some(rest[..end].to_string())
        }
        _ => {
            let end = s
                .find(|c: char| c.is_whitespace() || c == '>')
                .unwrap_or(s.len());
            Some(s[..end].to_string())
        }
    }
}

/// Removes tag spans, leaving visible text.
fn strip_tags(html: &str) -> String {
    let mut out = String::with_capacity(html.len());
    let mut in_tag = false;
    for c in html.chars() {
        match c {
            '<' => in_tag = true,
            '>' => in_tag = false,
            c if !in_tag => out.push(c),
            _ => {}
        }
    }
    out.trim().to_string()
}

/// Normalizes a raw link target into the canonical dedup form.
///
/// Lowercase scheme and host, default ports and fragments dropped, trailing
/// path slash trimmed, query pairs sorted. Returns `None` for anything that
/// is not an absolute HTTP(S) URL.
pub fn normalize_url(raw: &str) -> Option<String> {
    let cleaned = raw.trim().replace("&amp;", "&");
    let url = Url::parse(&cleaned).ok()?;
    if url.scheme() != "http" && url.scheme() != "https" {
        return None;
    }

    let host = url.host_str()?;
    let mut out = format!("{}://{}", url.scheme(), host);
    if let Some(port) = url.port() {
        out.push(':');
        out.push_str(&port.to_string());
    }
    out.push_str(url.path().trim_end_matches('/'));

    let mut pairs: Vec<(String, String)> = url
        .query_pairs()
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    if !pairs.is_empty() {
        pairs.sort();
        let query = url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(pairs.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .finish();
        out.push('?');
        out.push_str(&query);
    }

    Some(out)
}
