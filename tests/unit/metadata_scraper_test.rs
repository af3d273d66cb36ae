//! Unit tests for the metadata scraper's extraction step.
//!
//! Extraction is pure (fetched HTML in, metadata out), so everything here
//! runs against fixture documents without touching the network.

use markbox::services::metadata_scraper::{MetadataScraper, MetadataScraperTrait};
use markbox::types::errors::ScrapeError;

const PAGE: &str = r#"<!DOCTYPE html>
<html>
<head>
    <title>Example Domain &amp; Friends</title>
    <meta name="description" content="A page for examples.">
    <meta property="og:title" content="OG Example">
    <link rel="stylesheet" href="/style.css">
    <link rel="icon" href="/favicon.ico">
</head>
<body><p>Hello</p></body>
</html>"#;

#[test]
fn test_extracts_title_with_entities_decoded() {
    let scraper = MetadataScraper::new();
    let meta = scraper.extract(PAGE, "https://example.com/page");
    assert_eq!(meta.title, "Example Domain & Friends");
}

#[test]
fn test_extracts_description() {
    let scraper = MetadataScraper::new();
    let meta = scraper.extract(PAGE, "https://example.com/page");
    assert_eq!(meta.description, "A page for examples.");
}

#[test]
fn test_relative_favicon_is_absolutized() {
    let scraper = MetadataScraper::new();
    let meta = scraper.extract(PAGE, "https://example.com/deep/page");
    assert_eq!(meta.favicon, "https://example.com/favicon.ico");
}

#[test]
fn test_absolute_favicon_is_left_alone() {
    let html = r#"<head><link rel="icon" href="https://cdn.example.net/i.png"></head>"#;
    let scraper = MetadataScraper::new();
    let meta = scraper.extract(html, "https://example.com/");
    assert_eq!(meta.favicon, "https://cdn.example.net/i.png");
}

#[test]
fn test_shortcut_icon_rel_is_recognized() {
    let html = r#"<head><link rel="shortcut icon" href="/fav.ico"></head>"#;
    let scraper = MetadataScraper::new();
    let meta = scraper.extract(html, "https://example.com/");
    assert_eq!(meta.favicon, "https://example.com/fav.ico");
}

#[test]
fn test_title_falls_back_to_og_title() {
    let html = r#"<head><meta property="og:title" content="Only OG"></head>"#;
    let scraper = MetadataScraper::new();
    let meta = scraper.extract(html, "https://example.com/");
    assert_eq!(meta.title, "Only OG");
}

#[test]
fn test_empty_title_tag_falls_back_to_og_title() {
    let html = r#"<head><title>  </title><meta property="og:title" content="OG Wins"></head>"#;
    let scraper = MetadataScraper::new();
    let meta = scraper.extract(html, "https://example.com/");
    assert_eq!(meta.title, "OG Wins");
}

#[test]
fn test_description_falls_back_to_og_description() {
    let html = r#"<head><meta property="og:description" content="From OG"></head>"#;
    let scraper = MetadataScraper::new();
    let meta = scraper.extract(html, "https://example.com/");
    assert_eq!(meta.description, "From OG");
}

#[test]
fn test_missing_fields_come_back_empty() {
    let scraper = MetadataScraper::new();
    let meta = scraper.extract("<html><body>bare</body></html>", "https://example.com/");
    assert_eq!(meta.title, "");
    assert_eq!(meta.description, "");
    assert_eq!(meta.favicon, "");
    assert_eq!(meta.url, "https://example.com/");
}

#[test]
fn test_attribute_order_and_quote_style_do_not_matter() {
    let html = r#"<head>
        <meta content='Reversed attrs' name='description'>
        <link href='/alt.ico' rel='icon'>
    </head>"#;
    let scraper = MetadataScraper::new();
    let meta = scraper.extract(html, "https://example.com/");
    assert_eq!(meta.description, "Reversed attrs");
    assert_eq!(meta.favicon, "https://example.com/alt.ico");
}

#[test]
fn test_uppercase_markup_is_handled() {
    let html = r#"<HEAD><TITLE>Shouty</TITLE><LINK REL="ICON" HREF="/up.ico"></HEAD>"#;
    let scraper = MetadataScraper::new();
    let meta = scraper.extract(html, "https://example.com/");
    assert_eq!(meta.title, "Shouty");
    assert_eq!(meta.favicon, "https://example.com/up.ico");
}

#[test]
fn test_fetch_metadata_rejects_invalid_url_without_network() {
    let scraper = MetadataScraper::new();
    let err = scraper.fetch_metadata("definitely not a url").unwrap_err();
    assert!(matches!(err, ScrapeError::InvalidUrl(_)), "got {:?}", err);
}
