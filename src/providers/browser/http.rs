//! HTTP-level browser implementation.
//!
//! Drives unsubscribe flows over plain HTTP: pages are fetched with reqwest,
//! controls are located by scanning the returned markup, and clicks become
//! follow-up requests (GET for links, form submission for buttons). This
//! covers the large class of static unsubscribe pages; flows that require a
//! JavaScript engine need a real driver behind the same traits.

use std::time::Duration;

use async_trait::async_trait;
use url::Url;

use super::traits::{
    BrowserError, BrowserProvider, BrowserSession, Control, ControlPattern, ControlTarget,
    FormMethod, Result,
};

const USER_AGENT: &str =
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 mailsweep/0.1";

/// Timeout for requests issued by clicks, which carry no caller timeout.
const CLICK_TIMEOUT: Duration = Duration::from_secs(15);

/// Browser provider backed by a shared reqwest client.
pub struct HttpBrowser {
    client: reqwest::Client,
}

impl HttpBrowser {
    /// Creates the provider with a redirect-following client.
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()
            .map_err(|e| BrowserError::Driver(e.to_string()))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl BrowserProvider for HttpBrowser {
    async fn open_context(&self, headless: bool) -> Result<Box<dyn BrowserSession>> {
        // There is no window to show either way; flag kept for parity with
        // real drivers.
        tracing::debug!(headless, "opening http session");
        Ok(Box::new(HttpSession {
            client: self.client.clone(),
            page: None,
        }))
    }
}

struct Page {
    url: Url,
    html: String,
    text: String,
}

struct HttpSession {
    client: reqwest::Client,
    page: Option<Page>,
}

impl HttpSession {
    async fn fetch(
        &mut self,
        request: reqwest::RequestBuilder,
        timeout: Duration,
    ) -> Result<()> {
        let response = request.timeout(timeout).send().await.map_err(|e| {
            if e.is_timeout() {
                BrowserError::Timeout
            } else {
                BrowserError::Navigation(e.to_string())
            }
        })?;

        let status = response.status();
        if status.is_client_error() || status.is_server_error() {
            return Err(BrowserError::Navigation(format!("status {}", status)));
        }

        let url = response.url().clone();
        let html = response.text().await.map_err(|e| {
            if e.is_timeout() {
                BrowserError::Timeout
            } else {
                BrowserError::Navigation(e.to_string())
            }
        })?;

        let text = visible_text(&html);
        self.page = Some(Page { url, html, text });
        Ok(())
    }

    fn page(&self) -> Result<&Page> {
        self.page
            .as_ref()
            .ok_or_else(|| BrowserError::Driver("no page loaded".to_string()))
    }

    fn resolve(&self, href: &str) -> Result<Url> {
        let page = self.page()?;
        page.url
            .join(href)
            .map_err(|e| BrowserError::Navigation(format!("bad target {}: {}", href, e)))
    }
}

#[async_trait]
impl BrowserSession for HttpSession {
    async fn navigate(&mut self, url: &str, timeout: Duration) -> Result<()> {
        let request = self.client.get(url);
        self.fetch(request, timeout).await
    }

    async fn find_control(&mut self, patterns: &[ControlPattern]) -> Result<Option<Control>> {
        let page = self.page()?;
        let forms = parse_forms(&page.html);
        let anchors = parse_anchors(&page.html);

        for pattern in patterns {
            if let Some(control) = match_pattern(pattern, &forms, &anchors) {
                return Ok(Some(control));
            }
        }
        Ok(None)
    }

    async fn click(&mut self, control: &Control) -> Result<()> {
        match &control.target {
            ControlTarget::Link { href } => {
                let url = self.resolve(href)?;
                let request = self.client.get(url);
                self.fetch(request, CLICK_TIMEOUT).await
            }
            ControlTarget::Form {
                action,
                method,
                fields,
            } => {
                let target = if action.is_empty() {
                    self.page()?.url.clone()
                } else {
                    self.resolve(action)?
                };
                let request = match method {
                    FormMethod::Get => self.client.get(target).query(fields),
                    FormMethod::Post => self.client.post(target).form(fields),
                };
                self.fetch(request, CLICK_TIMEOUT).await
            }
        }
    }

    async fn wait_for_text(&mut self, phrases: &[&str], _timeout: Duration) -> Result<bool> {
        // Static content: whatever will ever be on the page already is.
        let page = self.page()?;
        Ok(phrases
            .iter()
            .any(|phrase| page.text.contains(&normalize_phrase(phrase))))
    }

    async fn close(&mut self) {
        self.page = None;
    }
}

fn match_pattern(
    pattern: &ControlPattern,
    forms: &[ParsedForm],
    anchors: &[ParsedAnchor],
) -> Option<Control> {
    match pattern {
        ControlPattern::ExactText(token) => {
            let token = token.to_ascii_lowercase();
            if let Some(form) = forms
                .iter()
                .find(|f| f.submit_label.to_ascii_lowercase().contains(&token))
            {
                return Some(form.to_control());
            }
            anchors
                .iter()
                .find(|a| a.text.to_ascii_lowercase().contains(&token))
                .map(ParsedAnchor::to_control)
        }
        ControlPattern::RoleButton(token) => {
            let token = token.to_ascii_lowercase();
            if let Some(form) = forms.iter().find(|f| {
                f.attrs.to_ascii_lowercase().contains(&token)
                    || f.action.to_ascii_lowercase().contains(&token)
            }) {
                return Some(form.to_control());
            }
            anchors
                .iter()
                .find(|a| {
                    a.attrs.to_ascii_lowercase().contains(&token)
                        || a.href.to_ascii_lowercase().contains(&token)
                })
                .map(ParsedAnchor::to_control)
        }
        ControlPattern::GenericSubmit => forms
            .iter()
            .find(|f| f.has_submit)
            .map(ParsedForm::to_control),
    }
}

struct ParsedForm {
    action: String,
    method: FormMethod,
    fields: Vec<(String, String)>,
    submit_label: String,
    has_submit: bool,
    attrs: String,
}

impl ParsedForm {
    fn to_control(&self) -> Control {
        Control {
            label: self.submit_label.clone(),
            target: ControlTarget::Form {
                action: self.action.clone(),
                method: self.method,
                fields: self.fields.clone(),
            },
        }
    }
}

struct ParsedAnchor {
    href: String,
    text: String,
    attrs: String,
}

impl ParsedAnchor {
    fn to_control(&self) -> Control {
        Control {
            label: self.text.clone(),
            target: ControlTarget::Link {
                href: self.href.clone(),
            },
        }
    }
}

fn parse_forms(html: &str) -> Vec<ParsedForm> {
    let lower = html.to_ascii_lowercase();
    let mut forms = Vec::new();
    let mut pos = 0;

    while let Some(offset) = lower[pos..].find("<form") {
        let tag_start = pos + offset;
        let Some(attrs_end) = lower[tag_start..].find('>') else {
            break;
        };
        let attrs = html[tag_start..tag_start + attrs_end].to_string();
        let body_start = tag_start + attrs_end + 1;
        let body_end = lower[body_start..]
            .find("</form")
            .map(|i| body_start + i)
            .unwrap_or(html.len());
        let body = &html[body_start..body_end];
        pos = body_end;

        let action = attribute_value(&attrs, "action").unwrap_or_default();
        let method = match attribute_value(&attrs, "method") {
            Some(m) if m.eq_ignore_ascii_case("post") => FormMethod::Post,
            _ => FormMethod::Get,
        };

        let mut fields = Vec::new();
        let mut submit_label = String::new();
        let mut has_submit = false;
        for input in tag_spans(body, "<input") {
            let input_type = attribute_value(&input, "type").unwrap_or_default();
            if input_type.eq_ignore_ascii_case("submit") {
                has_submit = true;
                if let Some(value) = attribute_value(&input, "value") {
                    submit_label = value;
                }
                continue;
            }
            // Carry hidden fields and prefilled values; many flows embed the
            // subscriber token this way.
            if let (Some(name), Some(value)) = (
                attribute_value(&input, "name"),
                attribute_value(&input, "value"),
            ) {
                fields.push((name, value));
            }
        }
        if let Some(label) = button_label(body) {
            has_submit = true;
            if submit_label.is_empty() {
                submit_label = label;
            }
        }

        forms.push(ParsedForm {
            action,
            method,
            fields,
            submit_label,
            has_submit,
            attrs,
        });
    }

    forms
}

fn parse_anchors(html: &str) -> Vec<ParsedAnchor> {
    let lower = html.to_ascii_lowercase();
    let mut anchors = Vec::new();
    let mut pos = 0;

    while let Some(offset) = lower[pos..].find("<a") {
        let tag_start = pos + offset;
        let Some(attrs_end) = lower[tag_start..].find('>') else {
            break;
        };
        let attrs = html[tag_start..tag_start + attrs_end].to_string();
        let inner_start = tag_start + attrs_end + 1;
        let inner_end = lower[inner_start..]
            .find("</a")
            .map(|i| inner_start + i)
            .unwrap_or(html.len());
        let text = visible_text(&html[inner_start..inner_end]);
        pos = inner_end;

        if let Some(href) = attribute_value(&attrs, "href") {
            anchors.push(ParsedAnchor { href, text, attrs });
        }
    }

    anchors
}

/// Raw text of the first `<button ...>label</button>` in a form body.
fn button_label(body: &str) -> Option<String> {
    let lower = body.to_ascii_lowercase();
    let start = lower.find("<button")?;
    let attrs_end = lower[start..].find('>')? + start;
    let end = lower[attrs_end..]
        .find("</button")
        .map(|i| attrs_end + i)
        .unwrap_or(body.len());
    Some(visible_text(&body[attrs_end + 1..end]))
}

/// Collects full `<tag ...>` spans (attribute text) for a void tag.
fn tag_spans(html: &str, open: &str) -> Vec<String> {
    let lower = html.to_ascii_lowercase();
    let mut spans = Vec::new();
    let mut pos = 0;
    while let Some(offset) = lower[pos..].find(open) {
        let start = pos + offset;
        let Some(end) = lower[start..].find('>') else {
            break;
        };
        spans.push(html[start..start + end].to_string());
        pos = start + end;
    }
    spans
}

/// Reads `name="value"` (or single-quoted/bare) out of a tag's attributes.
fn attribute_value(attrs: &str, name: &str) -> Option<String> {
    let lower = attrs.to_ascii_lowercase();
    let key = format!("{}=", name);
    let mut search = 0;
    loop {
        let found = lower[search..].find(&key)? + search;
        // Reject longer attribute names ending with ours (formaction, etc.).
        if found > 0 {
            let prev = lower.as_bytes()[found - 1];
            if !(prev as char).is_whitespace() {
                search = found + key.len();
                continue;
            }
        }
        let value_start = found + key.len();
        let rest = &attrs[value_start..];
        let mut chars = rest.chars();
        return match chars.next()? {
            quote @ ('"' | '\'') => {
                let inner = &rest[1..];
                let end = inner.find(quote)?;
                Some(inner[..end].to_string())
            }
            _ => {
                let end = rest
                    .find(|c: char| c.is_whitespace() || c == '>')
                    .unwrap_or(rest.len());
                Some(rest[..end].to_string())
            }
        };
    }
}

/// Lowercased, whitespace-collapsed visible text of a markup fragment.
fn visible_text(html: &str) -> String {
    let mut cleaned = html.to_string();
    for block in ["script", "style"] {
        cleaned = remove_blocks(&cleaned, block);
    }

    let mut out = String::with_capacity(cleaned.len());
    let mut in_tag = false;
    for c in cleaned.chars() {
        match c {
            '<' => in_tag = true,
            '>' => {
                in_tag = false;
                out.push(' ');
            }
            c if !in_tag => out.push(c),
            _ => {}
        }
    }

    let decoded = out
        .replace("&amp;", "&")
        .replace("&nbsp;", " ")
        .replace("&#39;", "'")
        .replace("&quot;", "\"")
        .replace("&lt;", "<")
        .replace("&gt;", ">");

    normalize_phrase(&decoded)
}

fn remove_blocks(html: &str, tag: &str) -> String {
    let open = format!("<{}", tag);
    let close = format!("</{}>", tag);
    let lower = html.to_ascii_lowercase();
    let mut out = String::with_capacity(html.len());
    let mut pos = 0;
    while let Some(offset) = lower[pos..].find(&open) {
        let start = pos + offset;
        out.push_str(&html[pos..start]);
        match lower[start..].find(&close) {
            Some(end) => pos = start + end + close.len(),
            None => return out,
        }
    }
    out.push_str(&html[pos..]);
    out
}

/// Lowercases and collapses runs of whitespace to single spaces.
fn normalize_phrase(s: &str) -> String {
    s.to_ascii_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}
