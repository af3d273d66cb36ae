//! Property-based tests for bookmark search.
//!
//! For any valid URL, title, and tag name, a created bookmark is found by
//! searching its full title, its host, or its tag name.

use markbox::database::Database;
use markbox::managers::bookmark_manager::{BookmarkManager, BookmarkManagerTrait};
use proptest::prelude::*;

/// Strategy for valid URL strings: http/https scheme, alphanumeric host,
/// optional path.
fn arb_url() -> impl Strategy<Value = (String, String)> {
    (
        prop_oneof![Just("https"), Just("http")],
        "[a-z][a-z0-9]{2,15}",
        prop_oneof![Just(".com"), Just(".org"), Just(".net"), Just(".io")],
        proptest::option::of("/[a-z0-9]{1,10}"),
    )
        .prop_map(|(scheme, host, tld, path)| {
            let full_host = format!("{}{}", host, tld);
            (
                format!("{}://{}{}", scheme, full_host, path.unwrap_or_default()),
                full_host,
            )
        })
}

/// Strategy for non-empty titles over printable ASCII, avoiding SQL LIKE
/// wildcard characters so the substring semantics stay literal.
fn arb_title() -> impl Strategy<Value = String> {
    "[a-zA-Z][a-zA-Z0-9 ]{1,30}"
}

/// Strategy for tag names.
fn arb_tag() -> impl Strategy<Value = String> {
    "[a-z]{3,10}"
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(20))]

    #[test]
    fn bookmark_is_found_by_title_host_and_tag(
        (url, host) in arb_url(),
        title in arb_title(),
        tag in arb_tag(),
    ) {
        let db = Database::open_in_memory().expect("Failed to open in-memory database");
        let mut manager = BookmarkManager::new(db.connection());

        let created = manager
            .create_bookmark(&url, &title, None, &[tag.clone()])
            .expect("create_bookmark should succeed for valid inputs");

        // By full title
        let results = manager.search_bookmarks(&title).expect("search should succeed");
        prop_assert!(
            results.iter().any(|v| v.id == created.id),
            "searching for title '{}' should find the bookmark, got {:?}",
            title,
            results.iter().map(|v| (&v.id, &v.title)).collect::<Vec<_>>()
        );

        // By host substring of the URL
        let results = manager.search_bookmarks(&host).expect("search should succeed");
        prop_assert!(
            results.iter().any(|v| v.id == created.id),
            "searching for host '{}' should find the bookmark",
            host
        );

        // By tag name alone
        let results = manager.search_bookmarks(&tag).expect("search should succeed");
        let found = results.iter().find(|v| v.id == created.id);
        prop_assert!(found.is_some(), "searching for tag '{}' should find the bookmark", tag);

        // The found view carries the matching tag
        let view = found.expect("present by the assertion above");
        prop_assert!(view.tags.iter().any(|t| t.name == tag));
    }
}
