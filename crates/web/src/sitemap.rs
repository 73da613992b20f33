//! # Sitemap Resolution
//!
//! Turns the site's sitemap into a short, keyword-filtered list of candidate URLs.
//!
//! Parsing tries a fixed sequence of strategies and stops at the first that yields URLs:
//! 1. Well-formed XML: `<url><loc>` under the sitemaps.org namespace, then under no
//!    namespace, then any `<loc>` in the document.
//! 2. Malformed XML: a `<loc>…</loc>` pattern over the raw body.
//! 3. Nothing found: any absolute URL on the configured domain.
//!
//! Resolution never fails. Every problem is logged and answered with the configured
//! fallback list.

use std::collections::HashSet;

use async_trait::async_trait;
use quick_xml::events::Event;
use quick_xml::name::{Namespace, ResolveResult};
use quick_xml::reader::NsReader;
use regex::Regex;
use sitekb::constants::SITEMAP_NAMESPACE;
use sitekb::{SiteConfig, UrlSource};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::fetch::Fetcher;

#[derive(Error, Debug)]
pub enum XmlError {
    #[error("{0}")]
    Syntax(#[from] quick_xml::Error),
    #[error("Unreadable text: {0}")]
    Text(String),
    #[error("Document ended with {0} unclosed element(s)")]
    Unclosed(usize),
    #[error("Document has no root element")]
    NoRoot,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum Scope {
    Sitemap,
    Unqualified,
    Other,
}

fn scope_of(ns: &ResolveResult) -> Scope {
    match ns {
        ResolveResult::Bound(Namespace(uri)) if *uri == SITEMAP_NAMESPACE.as_bytes() => {
            Scope::Sitemap
        }
        ResolveResult::Unbound => Scope::Unqualified,
        _ => Scope::Other,
    }
}

/// Strictly parses a sitemap document and returns its `<loc>` values, preferring
/// `<url><loc>` in the sitemaps.org namespace, then without a namespace, then any `<loc>`.
pub fn parse_sitemap_xml(xml: &str) -> Result<Vec<String>, XmlError> {
    let mut reader = NsReader::from_str(xml);
    // (scope, is a <url> element) for each open element.
    let mut open: Vec<(Scope, bool)> = Vec::new();
    // The <loc> being read: the scope of its <url> parent, if it has one, and its text.
    let mut current: Option<(Option<Scope>, String)> = None;
    let mut saw_root = false;

    let mut namespaced = Vec::new();
    let mut unqualified = Vec::new();
    let mut anywhere = Vec::new();

    loop {
        let (ns, event) = reader.read_resolved_event()?;
        let scope = scope_of(&ns);
        match event {
            Event::Start(e) => {
                saw_root = true;
                let is_url = e.local_name().as_ref() == b"url";
                if e.local_name().as_ref() == b"loc" {
                    let parent = open
                        .last()
                        .filter(|(parent_scope, parent_is_url)| *parent_is_url && *parent_scope == scope)
                        .map(|(parent_scope, _)| *parent_scope);
                    current = Some((parent, String::new()));
                }
                open.push((scope, is_url));
            }
            Event::Empty(_) => saw_root = true,
            Event::Text(t) => {
                if let Some((_, text)) = current.as_mut() {
                    let unescaped = t.unescape().map_err(|e| XmlError::Text(e.to_string()))?;
                    text.push_str(&unescaped);
                }
            }
            Event::CData(c) => {
                if let Some((_, text)) = current.as_mut() {
                    text.push_str(&String::from_utf8_lossy(&c.into_inner()));
                }
            }
            Event::End(e) => {
                open.pop();
                if e.local_name().as_ref() == b"loc" {
                    if let Some((parent, text)) = current.take() {
                        let url = text.trim().to_string();
                        if !url.is_empty() {
                            match parent {
                                Some(Scope::Sitemap) => namespaced.push(url.clone()),
                                Some(Scope::Unqualified) => unqualified.push(url.clone()),
                                _ => {}
                            }
                            anywhere.push(url);
                        }
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !saw_root {
        return Err(XmlError::NoRoot);
    }
    if !open.is_empty() {
        return Err(XmlError::Unclosed(open.len()));
    }

    Ok([namespaced, unqualified, anywhere]
        .into_iter()
        .find(|urls| !urls.is_empty())
        .unwrap_or_default())
}

/// Keeps URLs containing at least one keyword, case-insensitively. Keywords are
/// expected in lowercase.
pub fn filter_by_keywords(urls: Vec<String>, keywords: &[String]) -> Vec<String> {
    urls.into_iter()
        .filter(|url| {
            let lower = url.to_lowercase();
            keywords.iter().any(|k| lower.contains(k.as_str()))
        })
        .collect()
}

/// Discovers candidate URLs from the configured sitemap.
#[derive(Debug, Clone)]
pub struct SitemapResolver {
    fetcher: Fetcher,
    config: SiteConfig,
    loc_pattern: Regex,
    domain_pattern: Regex,
}

impl SitemapResolver {
    pub fn new(fetcher: Fetcher, config: SiteConfig) -> Result<Self, regex::Error> {
        let loc_pattern = Regex::new(r"<loc>\s*(https?://[^<\s]+)\s*</loc>")?;
        // The host must end right after the domain, so `example.org.evil.com` and
        // `example.orgx` do not count as the site.
        let domain_pattern = Regex::new(&format!(
            r#"(https?://{}(?:[/:?#][^\s<>"']*)?)(?:[\s<>"']|$)"#,
            regex::escape(&config.base_domain)
        ))?;
        Ok(Self {
            fetcher,
            config,
            loc_pattern,
            domain_pattern,
        })
    }

    pub fn config(&self) -> &SiteConfig {
        &self.config
    }

    /// Returns up to `max_urls` sitemap URLs matching `keywords` (or the configured
    /// keywords when empty), in sitemap order. Falls back to the configured list when
    /// the sitemap is unavailable or nothing matches.
    pub async fn resolve(&self, keywords: &[String]) -> Vec<String> {
        let keywords = self.config.effective_keywords(keywords);
        let sitemap_url = &self.config.sitemap_url;

        let body = match self
            .fetcher
            .get(sitemap_url, self.config.sitemap_timeout())
            .await
        {
            Ok(body) => body,
            Err(e) => {
                warn!("Sitemap unavailable, using fallback URLs: {e}");
                return self.config.capped_fallback_urls();
            }
        };

        let body = String::from_utf8_lossy(&body);
        let urls = self.extract_urls(&body);
        let total = urls.len();

        let mut seen = HashSet::new();
        let matched: Vec<String> = filter_by_keywords(urls, &keywords)
            .into_iter()
            .filter(|url| seen.insert(url.clone()))
            .take(self.config.max_urls)
            .collect();

        if matched.is_empty() {
            info!(
                sitemap_url = %sitemap_url,
                total,
                "No sitemap URL matched the keywords; using fallback URLs."
            );
            return self.config.capped_fallback_urls();
        }
        info!(
            sitemap_url = %sitemap_url,
            total,
            selected = matched.len(),
            "Resolved candidate URLs from sitemap."
        );
        matched
    }

    fn extract_urls(&self, body: &str) -> Vec<String> {
        let urls = match parse_sitemap_xml(body) {
            Ok(urls) => {
                debug!(count = urls.len(), "Parsed sitemap as XML.");
                urls
            }
            Err(e) => {
                warn!("Sitemap is not well-formed XML ({e}); scanning for <loc> entries.");
                let urls = self.scan_loc_entries(body);
                debug!(count = urls.len(), "Scanned <loc> entries.");
                urls
            }
        };
        if !urls.is_empty() {
            return urls;
        }

        let urls = self.scan_domain_urls(body);
        info!(
            count = urls.len(),
            base_domain = %self.config.base_domain,
            "No <loc> entries in sitemap; scanned for site URLs."
        );
        urls
    }

    fn scan_loc_entries(&self, body: &str) -> Vec<String> {
        self.loc_pattern
            .captures_iter(body)
            .filter_map(|c| c.get(1))
            .map(|m| m.as_str().to_string())
            .collect()
    }

    fn scan_domain_urls(&self, body: &str) -> Vec<String> {
        self.domain_pattern
            .captures_iter(body)
            .filter_map(|c| c.get(1))
            .map(|m| m.as_str().to_string())
            .collect()
    }
}

#[async_trait]
impl UrlSource for SitemapResolver {
    async fn discover(&self, keywords: &[String]) -> Vec<String> {
        self.resolve(keywords).await
    }

    fn fallback_urls(&self) -> Vec<String> {
        self.config.capped_fallback_urls()
    }
}
