#![allow(dead_code)]
//! # Common Test Utilities

use sitekb::SiteConfig;
use std::sync::Once;
use wiremock::MockServer;

static INIT: Once = Once::new();

/// Initializes tracing for tests.
pub fn setup_tracing() {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// A site configuration pointing at the mock server.
pub fn site_config(server: &MockServer) -> SiteConfig {
    let base_domain = server
        .uri()
        .trim_start_matches("http://")
        .trim_end_matches('/')
        .to_string();
    SiteConfig {
        sitemap_url: format!("{}/sitemap.xml", server.uri()),
        base_domain,
        keywords: vec!["student".to_string(), "fee".to_string()],
        fallback_urls: vec![
            format!("{}/fallback/one", server.uri()),
            format!("{}/fallback/two", server.uri()),
        ],
        sitemap_timeout_secs: 1,
        page_timeout_secs: 1,
        ..Default::default()
    }
}
