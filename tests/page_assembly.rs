mod common;

use insta::assert_snapshot;
use sniphook::{
    application::{page::PageKind, safe_mode::SAFE_MODE_BANNER},
    domain::types::SnippetKind,
};

use common::{Harness, anonymous, privileged, record, safe_mode, with_priority};

fn site() -> Harness {
    Harness::with_content(
        vec![
            record(1, SnippetKind::Css, "head", "body{margin:0}"),
            record(2, SnippetKind::Html, "body_open", "<nav>menu</nav>"),
            record(3, SnippetKind::Html, "", "<b>embedded</b>"),
            with_priority(record(4, SnippetKind::Html, "page_footer", "<footer>late</footer>"), 20),
            with_priority(record(5, SnippetKind::Code, "page_footer", "<p>early</p>"), 1),
            record(6, SnippetKind::Html, "admin_footer", "<p>admin</p>"),
        ],
        "Hello [snippet id=3]!",
    )
}

#[tokio::test]
async fn public_page_places_snippets_at_their_hooks() {
    let html = site()
        .pages
        .assemble(PageKind::Public, &anonymous())
        .await
        .expect("page");

    assert_snapshot!(html, @r#"
    <!DOCTYPE html>
    <html>
    <head>
    <style id="sniphook-snippet-1">body{margin:0}</style>
    </head>
    <body>
    <nav>menu</nav>
    <main>Hello <b>embedded</b>!</main>
    <p>early</p><footer>late</footer>
    </body>
    </html>
    "#);
}

#[tokio::test]
async fn admin_page_fires_only_admin_hooks() {
    let html = site()
        .pages
        .assemble(PageKind::Admin, &privileged())
        .await
        .expect("page");

    assert!(html.contains("<body class=\"admin\">"));
    assert!(html.contains("<p>admin</p>"));
    assert!(!html.contains("<nav>menu</nav>"));
    assert!(!html.contains("sniphook-snippet-1"));
}

#[tokio::test]
async fn safe_mode_page_shows_banner_and_no_snippets() {
    let harness = site();

    let privileged_html = harness
        .pages
        .assemble(PageKind::Public, &safe_mode(privileged()))
        .await
        .expect("page");
    assert!(privileged_html.contains(SAFE_MODE_BANNER));
    assert!(privileged_html.contains("<main>Hello !</main>"));
    assert!(!privileged_html.contains("<nav>"));

    let anonymous_html = harness
        .pages
        .assemble(PageKind::Public, &safe_mode(anonymous()))
        .await
        .expect("page");
    assert!(!anonymous_html.contains(SAFE_MODE_BANNER));
    assert!(!anonymous_html.contains("<footer>"));
}
