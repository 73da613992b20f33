//! # HTML Extraction Tests
//!
//! Verifies noise removal, content-root selection, and text normalization of
//! `PageExtractor` against small hand-written pages.

use sitekb_html::{PageExtractor, DEFAULT_PAGE_TITLE};

const FULL_PAGE: &str = r#"
<!DOCTYPE html>
<html>
<head>
    <title>  Important Dates | Example University  </title>
    <style>.hero { color: red; }</style>
    <script>window.analytics = "tracking code that must not leak";</script>
</head>
<body>
    <header>Site header with a long search box label</header>
    <nav><ul><li>Home page link with a long label text</li></ul></nav>
    <div class="content">This sidebar content should be ignored because main wins.</div>
    <main>
        <h1>Important dates for 2025 students</h1>
        <p>Semester 1 classes begin on 3 March.
           Census date is 31 March.</p>
        <ul>
            <li>Short item</li>
            <li>Results are released on 27 June at 9:00am.</li>
        </ul>
        <script>console.log("inline script inside main is removed too");</script>
    </main>
    <footer>Copyright notice and legal disclaimer text</footer>
</body>
</html>
"#;

#[test]
fn test_extract_prefers_main_and_strips_noise() {
    // --- Arrange ---
    let extractor = PageExtractor::new().unwrap();

    // --- Act ---
    let page = extractor.extract(FULL_PAGE.as_bytes());

    // --- Assert ---
    assert!(page.success);
    assert_eq!(page.title, "Important Dates | Example University");
    assert_eq!(
        page.content,
        "Important dates for 2025 students \
         Semester 1 classes begin on 3 March. Census date is 31 March. \
         Results are released on 27 June at 9:00am."
    );
    for noise in ["tracking", "header", "Home page", "sidebar", "Copyright", "inline"] {
        assert!(
            !page.content.contains(noise),
            "'{noise}' leaked into content: {}",
            page.content
        );
    }
}

#[test]
fn test_extract_falls_back_through_content_roots() {
    let extractor = PageExtractor::new().unwrap();

    let by_id = extractor.extract_html(
        r#"<html><body><p>Outside the content root but long enough.</p>
           <section id="content"><p>Inside the element with the content id.</p></section>
           </body></html>"#,
    );
    assert_eq!(by_id.content, "Inside the element with the content id.");

    let by_body = extractor.extract_html(
        "<html><body><div><p>Body is the last resort for content.</p></div></body></html>",
    );
    // The div and its paragraph both qualify, so the text appears twice.
    assert_eq!(
        by_body.content,
        "Body is the last resort for content. Body is the last resort for content."
    );
}

#[test]
fn test_content_root_inside_removed_subtree_is_skipped() {
    // --- Arrange ---
    let extractor = PageExtractor::new().unwrap();

    // --- Act ---
    let nav_wrapped = extractor.extract_html(
        r#"<html><body>
           <nav><div class="content"><p>Navigation menu entry that is long enough.</p></div></nav>
           <div id="content"><p>This is the real body content of the page.</p></div>
           </body></html>"#,
    );
    let header_wrapped = extractor.extract_html(
        r#"<html><body>
           <header><main><p>Header banner text long enough to count.</p></main></header>
           <p>The article text lives directly in the body.</p>
           </body></html>"#,
    );

    // --- Assert ---
    assert_eq!(nav_wrapped.content, "This is the real body content of the page.");
    assert_eq!(
        header_wrapped.content,
        "The article text lives directly in the body."
    );
}

#[test]
fn test_extract_uses_placeholder_title() {
    let extractor = PageExtractor::new().unwrap();

    let missing = extractor.extract_html("<html><body><p>x</p></body></html>");
    let blank = extractor.extract_html("<html><head><title>  </title></head></html>");

    assert_eq!(missing.title, DEFAULT_PAGE_TITLE);
    assert_eq!(blank.title, DEFAULT_PAGE_TITLE);
}

#[test]
fn test_empty_content_is_still_a_success() {
    let extractor = PageExtractor::new().unwrap();

    let page = extractor.extract(b"<html><body><nav>Only navigation here at all</nav></body></html>");

    assert!(page.success);
    assert!(page.content.is_empty());
}

#[test]
fn test_non_utf8_bytes_fail_extraction() {
    let extractor = PageExtractor::new().unwrap();

    let page = extractor.extract(&[0xff, 0xfe, 0x00, 0x3c]);

    assert!(!page.success);
    assert!(page.content.is_empty());
}
