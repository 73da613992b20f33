//! # sitekb-html: Page Text Extraction
//!
//! Turns the raw HTML of a single page into a title and a block of normalized body text
//! suitable for storing in the knowledge base.

use regex::Regex;
use scraper::{Html, Selector};
use thiserror::Error;
use tracing::debug;

/// Title used when a page has no usable `<title>`.
pub const DEFAULT_PAGE_TITLE: &str = "Untitled Page";

/// Subtrees removed before any text is read.
const NOISE_SELECTOR: &str = "script, style, nav, footer, header";

/// Candidate content roots, first match wins.
const ROOT_SELECTORS: &[&str] = &["main", ".content", "#content", "body"];

/// Elements whose text is collected from the content root.
const BLOCK_SELECTOR: &str = "h1, h2, h3, h4, p, li, div";

/// Fragments this short or shorter are labels and navigation, not content.
const MIN_FRAGMENT_CHARS: usize = 20;

#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("Invalid CSS selector '{selector}': {message}")]
    Selector { selector: String, message: String },
    #[error("Invalid pattern: {0}")]
    Pattern(#[from] regex::Error),
}

/// Result of extracting one page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedPage {
    pub title: String,
    pub content: String,
    /// `false` only when the bytes could not be read as text at all. Empty content
    /// is still a success.
    pub success: bool,
}

/// Reusable HTML extractor holding its compiled selectors and patterns.
#[derive(Debug)]
pub struct PageExtractor {
    noise: Selector,
    title: Selector,
    roots: Vec<Selector>,
    blocks: Selector,
    disallowed: Regex,
}

fn selector(css: &str) -> Result<Selector, ExtractError> {
    Selector::parse(css).map_err(|e| ExtractError::Selector {
        selector: css.to_string(),
        message: e.to_string(),
    })
}

impl PageExtractor {
    pub fn new() -> Result<Self, ExtractError> {
        Ok(Self {
            noise: selector(NOISE_SELECTOR)?,
            title: selector("title")?,
            roots: ROOT_SELECTORS
                .iter()
                .map(|css| selector(css))
                .collect::<Result<_, _>>()?,
            blocks: selector(BLOCK_SELECTOR)?,
            disallowed: Regex::new(r"[^\w\s\-.,!?():$%&]")?,
        })
    }

    /// Extracts the title and body text from raw page bytes.
    pub fn extract(&self, page: &[u8]) -> ExtractedPage {
        match std::str::from_utf8(page) {
            Ok(html) => self.extract_html(html),
            Err(e) => {
                debug!("Page is not valid UTF-8: {e}");
                ExtractedPage {
                    title: DEFAULT_PAGE_TITLE.to_string(),
                    content: String::new(),
                    success: false,
                }
            }
        }
    }

    pub fn extract_html(&self, html: &str) -> ExtractedPage {
        let mut document = Html::parse_document(html);
        self.strip_noise(&mut document);
        // `Html::select` still reaches detached nodes; searching from the root element
        // only walks what is left in the tree.
        let page = document.root_element();

        let title = page
            .select(&self.title)
            .next()
            .map(|t| t.text().collect::<String>().trim().to_string())
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| DEFAULT_PAGE_TITLE.to_string());

        let mut raw = String::new();
        let root = self
            .roots
            .iter()
            .find_map(|sel| page.select(sel).next());
        if let Some(root) = root {
            for element in root.select(&self.blocks) {
                if element.id() == root.id() {
                    continue;
                }
                let text = element
                    .text()
                    .map(str::trim)
                    .filter(|t| !t.is_empty())
                    .collect::<Vec<_>>()
                    .join(" ");
                if text.chars().count() > MIN_FRAGMENT_CHARS {
                    raw.push_str(&text);
                    raw.push('\n');
                }
            }
        }

        ExtractedPage {
            title,
            content: self.clean(&raw),
            success: true,
        }
    }

    /// Collapses whitespace runs, then drops characters outside the allow-list.
    fn clean(&self, raw: &str) -> String {
        let collapsed = raw.split_whitespace().collect::<Vec<_>>().join(" ");
        self.disallowed.replace_all(&collapsed, "").into_owned()
    }

    fn strip_noise(&self, document: &mut Html) {
        let ids: Vec<_> = document.select(&self.noise).map(|el| el.id()).collect();
        for id in ids {
            if let Some(mut node) = document.tree.get_mut(id) {
                node.detach();
            }
        }
    }
}
