//! # Sitemap Resolver Tests
//!
//! Serves sitemaps of varying quality from a mock server and checks the strategy chain,
//! the keyword filter, the result cap, and the fallback behaviour.

mod common;

use common::{setup_tracing, site_config};
use sitekb::UrlSource;
use sitekb_test_utils::fixtures::sitemap_xml;
use sitekb_web::{Fetcher, SitemapResolver};
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn serve_sitemap(server: &MockServer, template: ResponseTemplate) {
    Mock::given(method("GET"))
        .and(path("/sitemap.xml"))
        .respond_with(template)
        .mount(server)
        .await;
}

fn resolver(server: &MockServer) -> SitemapResolver {
    SitemapResolver::new(Fetcher::new("sitekb-test").unwrap(), site_config(server)).unwrap()
}

#[tokio::test]
async fn test_resolve_filters_namespaced_sitemap_by_keyword() {
    // --- 1. Arrange ---
    setup_tracing();
    let server = MockServer::start().await;
    let base = server.uri();
    let urls = vec![
        format!("{base}/students/enrolment"),
        format!("{base}/news/campus-update"),
        format!("{base}/Students/FEES-and-payments"),
        format!("{base}/students/enrolment"),
        format!("{base}/about"),
    ];
    serve_sitemap(&server, ResponseTemplate::new(200).set_body_string(sitemap_xml(&urls))).await;

    // --- 2. Act ---
    let resolved = resolver(&server).resolve(&[]).await;

    // --- 3. Assert ---
    assert_eq!(
        resolved,
        vec![
            format!("{base}/students/enrolment"),
            format!("{base}/Students/FEES-and-payments"),
        ]
    );
}

#[tokio::test]
async fn test_resolve_with_explicit_keywords() {
    setup_tracing();
    let server = MockServer::start().await;
    let base = server.uri();
    let urls = vec![format!("{base}/library/hours"), format!("{base}/students")];
    serve_sitemap(&server, ResponseTemplate::new(200).set_body_string(sitemap_xml(&urls))).await;

    let resolved = resolver(&server).resolve(&["LIBRARY".to_string()]).await;

    assert_eq!(resolved, vec![format!("{base}/library/hours")]);
}

#[tokio::test]
async fn test_server_error_returns_fallback_list() {
    // --- 1. Arrange ---
    setup_tracing();
    let server = MockServer::start().await;
    serve_sitemap(&server, ResponseTemplate::new(500)).await;
    let resolver = resolver(&server);

    // --- 2. Act ---
    let resolved = resolver.resolve(&[]).await;

    // --- 3. Assert ---
    assert!(!resolved.is_empty());
    assert_eq!(resolved, resolver.config().fallback_urls);
    assert_eq!(resolved, resolver.fallback_urls());
}

#[tokio::test]
async fn test_slow_sitemap_returns_fallback_list() {
    setup_tracing();
    let server = MockServer::start().await;
    serve_sitemap(
        &server,
        ResponseTemplate::new(200)
            .set_body_string(sitemap_xml(&[format!("{}/students", server.uri())]))
            .set_delay(Duration::from_secs(3)),
    )
    .await;

    let resolved = resolver(&server).resolve(&[]).await;

    assert_eq!(resolved, site_config(&server).fallback_urls);
}

#[tokio::test]
async fn test_malformed_xml_is_recovered_by_loc_pattern() {
    // --- 1. Arrange ---
    setup_tracing();
    let server = MockServer::start().await;
    let base = server.uri();
    let body = format!(
        "<urlset><url><loc>{base}/students/support</loc></url>\
         <url><loc> {base}/fees </loc></url><broken"
    );
    serve_sitemap(&server, ResponseTemplate::new(200).set_body_string(body)).await;

    // --- 2. Act ---
    let resolved = resolver(&server).resolve(&[]).await;

    // --- 3. Assert ---
    assert_eq!(
        resolved,
        vec![format!("{base}/students/support"), format!("{base}/fees")]
    );
}

#[tokio::test]
async fn test_plain_text_body_is_scanned_for_site_urls() {
    // --- 1. Arrange ---
    setup_tracing();
    let server = MockServer::start().await;
    let base = server.uri();
    let body = format!(
        "Pages:\n{base}/students/timetable\nhttps://elsewhere.example/students\n\"{base}/fees\""
    );
    serve_sitemap(&server, ResponseTemplate::new(200).set_body_string(body)).await;

    // --- 2. Act ---
    let resolved = resolver(&server).resolve(&[]).await;

    // --- 3. Assert ---
    assert_eq!(
        resolved,
        vec![format!("{base}/students/timetable"), format!("{base}/fees")]
    );
}

#[tokio::test]
async fn test_no_keyword_match_returns_fallback_list() {
    setup_tracing();
    let server = MockServer::start().await;
    let urls = vec![format!("{}/news", server.uri()), format!("{}/events", server.uri())];
    serve_sitemap(&server, ResponseTemplate::new(200).set_body_string(sitemap_xml(&urls))).await;

    let resolved = resolver(&server).resolve(&[]).await;

    assert_eq!(resolved, site_config(&server).fallback_urls);
}

#[tokio::test]
async fn test_result_is_capped_at_max_urls() {
    // --- 1. Arrange ---
    setup_tracing();
    let server = MockServer::start().await;
    let urls: Vec<String> = (0..25)
        .map(|i| format!("{}/students/page-{i}", server.uri()))
        .collect();
    serve_sitemap(&server, ResponseTemplate::new(200).set_body_string(sitemap_xml(&urls))).await;

    // --- 2. Act ---
    let resolved = resolver(&server).discover(&[]).await;

    // --- 3. Assert ---
    assert_eq!(resolved.len(), 10);
    assert_eq!(resolved[..], urls[..10]);
}
