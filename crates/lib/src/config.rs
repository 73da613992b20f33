//! # Pipeline Configuration
//!
//! Typed settings for the refresh pipeline. Every field has a default so a partial
//! `config.yml` (or none at all) still produces a usable configuration. The defaults
//! describe the RMIT University website, the site this pipeline was first built for.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Describes the website being mirrored and how to reach it.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct SiteConfig {
    /// Location of the sitemap XML document.
    #[serde(default = "default_sitemap_url")]
    pub sitemap_url: String,
    /// Host used to recognise site URLs in unstructured sitemap bodies.
    #[serde(default = "default_base_domain")]
    pub base_domain: String,
    /// URL substrings that mark a page as relevant. Matched case-insensitively.
    #[serde(default = "default_keywords")]
    pub keywords: Vec<String>,
    /// Known-good pages used whenever sitemap discovery comes up empty.
    #[serde(default = "default_fallback_urls")]
    pub fallback_urls: Vec<String>,
    /// User-Agent header sent with every request.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// Maximum number of candidate URLs per run.
    #[serde(default = "default_max_urls")]
    pub max_urls: usize,
    #[serde(default = "default_sitemap_timeout_secs")]
    pub sitemap_timeout_secs: u64,
    #[serde(default = "default_page_timeout_secs")]
    pub page_timeout_secs: u64,
}

fn default_sitemap_url() -> String {
    "https://www.rmit.edu.au/sitemap.xml".to_string()
}

fn default_base_domain() -> String {
    "www.rmit.edu.au".to_string()
}

pub fn default_keywords() -> Vec<String> {
    [
        "student",
        "enrol",
        "course",
        "program",
        "study",
        "academic",
        "fee",
        "deadline",
        "campus",
        "international",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_fallback_urls() -> Vec<String> {
    [
        "https://www.rmit.edu.au/study-with-us",
        "https://www.rmit.edu.au/enrolment",
        "https://www.rmit.edu.au/students/my-course/important-dates",
        "https://www.rmit.edu.au/students/support-services/study-support",
        "https://www.rmit.edu.au/students/support-services/academic-support",
        "https://www.rmit.edu.au/study-with-us/levels-of-study/undergraduate-study",
        "https://www.rmit.edu.au/study-with-us/levels-of-study/postgraduate-study",
        "https://www.rmit.edu.au/students/student-essentials/fees-and-payments",
        "https://www.rmit.edu.au/students/student-essentials/important-dates",
        "https://www.rmit.edu.au/about/schools-colleges",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36".to_string()
}

fn default_max_urls() -> usize {
    10
}

fn default_sitemap_timeout_secs() -> u64 {
    10
}

fn default_page_timeout_secs() -> u64 {
    15
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            sitemap_url: default_sitemap_url(),
            base_domain: default_base_domain(),
            keywords: default_keywords(),
            fallback_urls: default_fallback_urls(),
            user_agent: default_user_agent(),
            max_urls: default_max_urls(),
            sitemap_timeout_secs: default_sitemap_timeout_secs(),
            page_timeout_secs: default_page_timeout_secs(),
        }
    }
}

impl SiteConfig {
    pub fn sitemap_timeout(&self) -> Duration {
        Duration::from_secs(self.sitemap_timeout_secs)
    }

    pub fn page_timeout(&self) -> Duration {
        Duration::from_secs(self.page_timeout_secs)
    }

    /// Returns the keywords to filter with: the given ones, or the configured set when
    /// none are given. All keywords are lowercased.
    pub fn effective_keywords(&self, keywords: &[String]) -> Vec<String> {
        let source = if keywords.iter().all(|k| k.trim().is_empty()) {
            &self.keywords
        } else {
            keywords
        };
        source
            .iter()
            .map(|k| k.trim().to_lowercase())
            .filter(|k| !k.is_empty())
            .collect()
    }

    /// The fallback list, capped at `max_urls`.
    pub fn capped_fallback_urls(&self) -> Vec<String> {
        self.fallback_urls
            .iter()
            .take(self.max_urls)
            .cloned()
            .collect()
    }
}

/// Controls how often and how gently the scheduler refreshes.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct RefreshSettings {
    /// Pause before each page fetch.
    #[serde(default = "default_page_delay_ms")]
    pub page_delay_ms: u64,
    /// The knowledge base is stale once its newest entry is older than this.
    #[serde(default = "default_staleness_hours")]
    pub staleness_hours: u64,
    /// Pages with this many characters or fewer are skipped.
    #[serde(default = "default_min_content_chars")]
    pub min_content_chars: usize,
}

fn default_page_delay_ms() -> u64 {
    500
}

fn default_staleness_hours() -> u64 {
    6
}

fn default_min_content_chars() -> usize {
    100
}

impl Default for RefreshSettings {
    fn default() -> Self {
        Self {
            page_delay_ms: default_page_delay_ms(),
            staleness_hours: default_staleness_hours(),
            min_content_chars: default_min_content_chars(),
        }
    }
}

impl RefreshSettings {
    pub fn page_delay(&self) -> Duration {
        Duration::from_millis(self.page_delay_ms)
    }

    /// Saturates at the largest representable duration for out-of-range values.
    pub fn staleness_threshold(&self) -> chrono::Duration {
        i64::try_from(self.staleness_hours)
            .ok()
            .and_then(chrono::Duration::try_hours)
            .unwrap_or(chrono::Duration::MAX)
    }
}
