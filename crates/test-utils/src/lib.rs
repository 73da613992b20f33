use anyhow::Result;
use async_trait::async_trait;
use sitekb::{KnowledgeStore, LoadError, PageContent, PageLoader, UrlSource};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio_util::sync::CancellationToken;
use turso::Database;

// --- Test Setup ---

/// A helper struct to manage database creation for each test.
pub struct TestSetup {
    pub db: Database,
    pub store: KnowledgeStore,
}

impl TestSetup {
    /// Creates a new, isolated in-memory database and initializes the schema.
    pub async fn new() -> Result<Self> {
        let db = turso::Builder::new_local(":memory:").build().await?;
        let conn = db.connect()?;

        // Initialize the schema using the shared SQL constants.
        for statement in sitekb::store::sql::ALL_TABLE_CREATION_SQL {
            conn.execute(statement, ()).await?;
        }

        let store = KnowledgeStore::from_database(db.clone());
        Ok(Self { db, store })
    }
}

// --- Mock URL Source ---

#[derive(Clone, Debug, Default)]
pub struct MockUrlSource {
    discovered: Vec<String>,
    fallback: Vec<String>,
    calls: Arc<Mutex<Vec<Vec<String>>>>,
}

impl MockUrlSource {
    /// A source whose discovery always returns `discovered`.
    pub fn new(discovered: &[&str]) -> Self {
        Self {
            discovered: discovered.iter().map(|s| s.to_string()).collect(),
            ..Default::default()
        }
    }

    pub fn with_fallback(mut self, fallback: &[&str]) -> Self {
        self.fallback = fallback.iter().map(|s| s.to_string()).collect();
        self
    }

    /// The keyword slices `discover` was called with.
    pub fn get_calls(&self) -> Vec<Vec<String>> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl UrlSource for MockUrlSource {
    async fn discover(&self, keywords: &[String]) -> Vec<String> {
        self.calls.lock().unwrap().push(keywords.to_vec());
        self.discovered.clone()
    }

    fn fallback_urls(&self) -> Vec<String> {
        self.fallback.clone()
    }
}

// --- Mock Page Loader ---

/// A page loader with pre-programmed results per URL.
///
/// Unknown URLs load as `LoadError::Unreachable`.
#[derive(Clone, Debug, Default)]
pub struct MockPageLoader {
    pages: Arc<Mutex<HashMap<String, Result<PageContent, LoadError>>>>,
    cancel_on: Arc<Mutex<HashMap<String, CancellationToken>>>,
    calls: Arc<Mutex<Vec<String>>>,
}

impl MockPageLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_page(&self, url: &str, title: &str, content: &str) {
        self.pages.lock().unwrap().insert(
            url.to_string(),
            Ok(PageContent {
                title: title.to_string(),
                content: content.to_string(),
            }),
        );
    }

    pub fn add_failure(&self, url: &str, error: LoadError) {
        self.pages
            .lock()
            .unwrap()
            .insert(url.to_string(), Err(error));
    }

    /// Cancels `token` while `url` is being loaded, simulating a shutdown mid-run.
    pub fn cancel_when_loading(&self, url: &str, token: CancellationToken) {
        self.cancel_on
            .lock()
            .unwrap()
            .insert(url.to_string(), token);
    }

    /// The URLs that were loaded, in order.
    pub fn get_calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl PageLoader for MockPageLoader {
    async fn load(&self, url: &str) -> Result<PageContent, LoadError> {
        self.calls.lock().unwrap().push(url.to_string());
        if let Some(token) = self.cancel_on.lock().unwrap().get(url) {
            token.cancel();
        }
        self.pages
            .lock()
            .unwrap()
            .get(url)
            .cloned()
            .unwrap_or_else(|| Err(LoadError::Unreachable(url.to_string())))
    }
}

// --- Fixtures ---

pub mod fixtures {
    /// Text of exactly `chars` characters made of readable words.
    pub fn text_of_len(chars: usize) -> String {
        let base = "Students can enrol in courses before the census date each semester. ";
        base.chars().cycle().take(chars).collect()
    }

    /// A minimal HTML document with a `<main>` holding one paragraph.
    pub fn html_page(title: &str, paragraph: &str) -> String {
        format!(
            "<!DOCTYPE html><html><head><title>{title}</title></head>\
             <body><nav>Home | About | Contact us today please</nav>\
             <main><p>{paragraph}</p></main>\
             <footer>Copyright and disclaimer information here</footer></body></html>"
        )
    }

    /// A sitemaps.org urlset listing `urls`.
    pub fn sitemap_xml(urls: &[String]) -> String {
        let entries: String = urls
            .iter()
            .map(|u| format!("<url><loc>{u}</loc></url>"))
            .collect();
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?><urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">{entries}</urlset>"#
        )
    }
}
