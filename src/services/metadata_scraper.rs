//! Metadata scraper.
//!
//! Fetches a submitted URL and extracts page metadata (title, description,
//! favicon) by scanning the returned HTML. Extraction is best-effort:
//! fields that cannot be found come back empty, never as errors.

use std::time::Duration;
use url::Url;

use crate::types::bookmark::PageMetadata;
use crate::types::errors::ScrapeError;

/// Trait defining metadata scraping operations.
pub trait MetadataScraperTrait {
    /// Extracts metadata from already-fetched HTML. Pure; `base_url` is
    /// used to absolutize a relative favicon reference.
    fn extract(&self, html: &str, base_url: &str) -> PageMetadata;
    /// Fetches `url` and extracts its metadata.
    fn fetch_metadata(&self, url: &str) -> Result<PageMetadata, ScrapeError>;
}

/// Scraper using heuristic string-scanning extraction.
pub struct MetadataScraper;

impl MetadataScraper {
    pub fn new() -> Self {
        Self
    }

    /// Decodes HTML entities and trims surrounding whitespace.
    fn decode_trim(raw: &str) -> String {
        html_escape::decode_html_entities(raw).trim().to_string()
    }

    /// Returns the text between `<tag ...>` and `</tag>`.
    ///
    /// `lower` must be the ASCII-lowercased copy of `html`; lowercasing is
    /// ASCII-only so byte offsets line up between the two.
    fn tag_text(html: &str, lower: &str, tag: &str) -> Option<String> {
        let open = format!("<{}", tag);
        let close = format!("</{}>", tag);
        let start = lower.find(&open)?;
        let body_start = start + lower[start..].find('>')? + 1;
        let end = lower[body_start..].find(&close)?;
        Some(html[body_start..body_start + end].to_string())
    }

    /// Collects the attribute text of every `<name ...>` tag in document
    /// order.
    fn scan_tags<'h>(html: &'h str, lower: &str, name: &str) -> Vec<&'h str> {
        let open = format!("<{}", name);
        let mut out = Vec::new();
        let mut from = 0;
        while let Some(rel) = lower[from..].find(&open) {
            let after = from + rel + open.len();
            let boundary_ok = lower[after..]
                .chars()
                .next()
                .map_or(false, |c| c.is_ascii_whitespace() || c == '>' || c == '/');
            match lower[after..].find('>') {
                Some(end_rel) => {
                    let end = after + end_rel;
                    if boundary_ok {
                        out.push(&html[after..end]);
                    }
                    from = end + 1;
                }
                None => break,
            }
        }
        out
    }

    /// Returns the value of `attr` inside one tag's attribute text.
    /// Handles double quotes, single quotes, and bare values.
    fn attr_value(tag: &str, attr: &str) -> Option<String> {
        let lower = tag.to_ascii_lowercase();
        let needle = format!("{}=", attr);
        let mut from = 0;
        while let Some(rel) = lower[from..].find(&needle) {
            let pos = from + rel;
            let value_start = pos + needle.len();
            // the match must be a whole attribute name, not a suffix
            if pos > 0 && !lower.as_bytes()[pos - 1].is_ascii_whitespace() {
                from = value_start;
                continue;
            }
            let rest = &tag[value_start..];
            return match rest.chars().next() {
                Some(quote @ ('"' | '\'')) => {
                    let inner = &rest[1..];
                    inner.find(quote).map(|end| inner[..end].to_string())
                }
                _ => {
                    let end = rest
                        .find(|c: char| c.is_ascii_whitespace() || c == '>' || c == '/')
                        .unwrap_or(rest.len());
                    Some(rest[..end].to_string())
                }
            };
        }
        None
    }

    /// Finds `<meta {key}="{value}" content="...">` and returns the content.
    fn meta_content(html: &str, lower: &str, key: &str, value: &str) -> Option<String> {
        for tag in Self::scan_tags(html, lower, "meta") {
            let matches = Self::attr_value(tag, key)
                .map(|v| v.to_ascii_lowercase() == value)
                .unwrap_or(false);
            if matches {
                if let Some(content) = Self::attr_value(tag, "content") {
                    return Some(content);
                }
            }
        }
        None
    }

    /// Finds the first `<link rel="icon">` (or `"shortcut icon"`) href.
    fn link_icon_href(html: &str, lower: &str) -> Option<String> {
        for tag in Self::scan_tags(html, lower, "link") {
            let is_icon = Self::attr_value(tag, "rel")
                .map(|rel| {
                    rel.to_ascii_lowercase()
                        .split_whitespace()
                        .any(|token| token == "icon")
                })
                .unwrap_or(false);
            if is_icon {
                if let Some(href) = Self::attr_value(tag, "href") {
                    if !href.is_empty() {
                        return Some(href);
                    }
                }
            }
        }
        None
    }

    /// Makes a favicon reference absolute against the page URL.
    fn absolutize(base: &str, href: &str) -> String {
        if href.starts_with("http://") || href.starts_with("https://") {
            return href.to_string();
        }
        match Url::parse(base).and_then(|b| b.join(href)) {
            Ok(joined) => joined.to_string(),
            Err(_) => href.to_string(),
        }
    }
}

impl Default for MetadataScraper {
    fn default() -> Self {
        Self::new()
    }
}

impl MetadataScraperTrait for MetadataScraper {
    fn extract(&self, html: &str, base_url: &str) -> PageMetadata {
        let lower = html.to_ascii_lowercase();

        let mut title = Self::tag_text(html, &lower, "title")
            .map(|t| Self::decode_trim(&t))
            .unwrap_or_default();
        if title.is_empty() {
            title = Self::meta_content(html, &lower, "property", "og:title")
                .map(|t| Self::decode_trim(&t))
                .unwrap_or_default();
        }

        let mut description = Self::meta_content(html, &lower, "name", "description")
            .map(|d| Self::decode_trim(&d))
            .unwrap_or_default();
        if description.is_empty() {
            description = Self::meta_content(html, &lower, "property", "og:description")
                .map(|d| Self::decode_trim(&d))
                .unwrap_or_default();
        }

        let favicon = Self::link_icon_href(html, &lower)
            .map(|href| Self::absolutize(base_url, &href))
            .unwrap_or_default();

        PageMetadata {
            title,
            description,
            favicon,
            url: base_url.to_string(),
        }
    }

    fn fetch_metadata(&self, url: &str) -> Result<PageMetadata, ScrapeError> {
        Url::parse(url).map_err(|_| ScrapeError::InvalidUrl(url.to_string()))?;

        // Blocking client: the server loop is synchronous
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(10))
            .user_agent("Mozilla/5.0 (compatible; Markbox/1.0)")
            .build()
            .map_err(|e| ScrapeError::FetchFailed(e.to_string()))?;

        let response = client
            .get(url)
            .send()
            .map_err(|e| ScrapeError::FetchFailed(e.to_string()))?;
        let html = response
            .text()
            .map_err(|e| ScrapeError::FetchFailed(e.to_string()))?;

        Ok(self.extract(&html, url))
    }
}
