//! Unit tests for the REST dispatch layer.
//!
//! `handle_request` is transport-independent, so the full route surface
//! (including status-code mapping) is exercised here against an in-memory
//! database, without sockets.

use markbox::api_handler::{handle_request, ApiResponse};
use markbox::database::Database;
use rstest::rstest;
use serde_json::Value;

fn setup() -> Database {
    Database::open_in_memory().expect("Failed to open in-memory database")
}

fn get(db: &Database, url: &str) -> ApiResponse {
    handle_request(db, "GET", url, None)
}

fn post(db: &Database, url: &str, body: &str) -> ApiResponse {
    handle_request(db, "POST", url, Some(body))
}

fn put(db: &Database, url: &str, body: &str) -> ApiResponse {
    handle_request(db, "PUT", url, Some(body))
}

fn delete(db: &Database, url: &str) -> ApiResponse {
    handle_request(db, "DELETE", url, None)
}

#[test]
fn test_health_endpoint() {
    let db = setup();
    let resp = get(&db, "/api/health");
    assert_eq!(resp.status, 200);
    assert_eq!(resp.body["status"], "ok");
}

#[test]
fn test_root_endpoint_lists_the_surface() {
    let db = setup();
    let resp = get(&db, "/");
    assert_eq!(resp.status, 200);
    assert_eq!(resp.body["endpoints"]["bookmarks"], "/api/bookmarks");
    assert!(resp.body["version"].is_string());
}

#[test]
fn test_unknown_route_is_404() {
    let db = setup();
    assert_eq!(get(&db, "/api/nope").status, 404);
    assert_eq!(handle_request(&db, "PATCH", "/api/folders/1", None).status, 404);
}

// ─── Folders ───

#[test]
fn test_folder_create_and_get() {
    let db = setup();

    let created = post(&db, "/api/folders", r#"{"name":"Work"}"#);
    assert_eq!(created.status, 201);
    let id = created.body["id"].as_i64().unwrap();
    assert_eq!(created.body["name"], "Work");
    assert_eq!(created.body["parent_id"], Value::Null);

    let fetched = get(&db, &format!("/api/folders/{}", id));
    assert_eq!(fetched.status, 200);
    assert_eq!(fetched.body["name"], "Work");
}

#[test]
fn test_folder_create_without_name_is_400() {
    let db = setup();
    let resp = post(&db, "/api/folders", r#"{}"#);
    assert_eq!(resp.status, 400);
}

#[test]
fn test_folder_create_with_missing_parent_is_404() {
    let db = setup();
    let resp = post(&db, "/api/folders", r#"{"name":"Child","parent_id":99}"#);
    assert_eq!(resp.status, 404);
}

#[test]
fn test_folder_update_rename_and_reparent() {
    let db = setup();
    let root = post(&db, "/api/folders", r#"{"name":"Root"}"#);
    let root_id = root.body["id"].as_i64().unwrap();
    let child = post(
        &db,
        "/api/folders",
        &format!(r#"{{"name":"Child","parent_id":{}}}"#, root_id),
    );
    let child_id = child.body["id"].as_i64().unwrap();

    let renamed = put(&db, &format!("/api/folders/{}", child_id), r#"{"name":"Kid"}"#);
    assert_eq!(renamed.status, 200);
    assert_eq!(renamed.body["name"], "Kid");
    assert_eq!(renamed.body["parent_id"], root_id);

    // Explicit null detaches
    let detached = put(
        &db,
        &format!("/api/folders/{}", child_id),
        r#"{"parent_id":null}"#,
    );
    assert_eq!(detached.status, 200);
    assert_eq!(detached.body["parent_id"], Value::Null);
}

#[test]
fn test_folder_self_parent_is_400() {
    let db = setup();
    let folder = post(&db, "/api/folders", r#"{"name":"Selfie"}"#);
    let id = folder.body["id"].as_i64().unwrap();

    let resp = put(
        &db,
        &format!("/api/folders/{}", id),
        &format!(r#"{{"parent_id":{}}}"#, id),
    );
    assert_eq!(resp.status, 400);
}

#[test]
fn test_folder_delete_and_listing() {
    let db = setup();
    let folder = post(&db, "/api/folders", r#"{"name":"Doomed"}"#);
    let id = folder.body["id"].as_i64().unwrap();

    let resp = delete(&db, &format!("/api/folders/{}", id));
    assert_eq!(resp.status, 200);
    assert_eq!(get(&db, &format!("/api/folders/{}", id)).status, 404);

    let listed = get(&db, "/api/folders");
    assert_eq!(listed.status, 200);
    assert_eq!(listed.body.as_array().unwrap().len(), 0);
}

#[rstest]
#[case("GET", "/api/folders/abc")]
#[case("PUT", "/api/folders/abc")]
#[case("DELETE", "/api/folders/abc")]
#[case("GET", "/api/bookmarks/abc")]
#[case("GET", "/api/tags/abc")]
fn test_non_integer_ids_are_400(#[case] method: &str, #[case] url: &str) {
    let db = setup();
    let body = if method == "PUT" { Some(r#"{"name":"x"}"#) } else { None };
    let resp = handle_request(&db, method, url, body);
    assert_eq!(resp.status, 400);
}

// ─── Bookmarks ───

#[test]
fn test_bookmark_create_with_tags_and_get() {
    let db = setup();

    let created = post(
        &db,
        "/api/bookmarks",
        r#"{"url":"https://example.com","title":"Example","tags":["ref","reading"]}"#,
    );
    assert_eq!(created.status, 201);
    let id = created.body["id"].as_i64().unwrap();
    assert_eq!(created.body["tags"].as_array().unwrap().len(), 2);

    let fetched = get(&db, &format!("/api/bookmarks/{}", id));
    assert_eq!(fetched.status, 200);
    assert_eq!(fetched.body["url"], "https://example.com");
}

#[test]
fn test_bookmark_create_with_invalid_url_is_400() {
    let db = setup();
    let resp = post(
        &db,
        "/api/bookmarks",
        r#"{"url":"not a url","title":"Broken"}"#,
    );
    assert_eq!(resp.status, 400);
}

#[test]
fn test_bookmark_create_with_malformed_body_is_400() {
    let db = setup();
    assert_eq!(post(&db, "/api/bookmarks", "{not json").status, 400);
    assert_eq!(handle_request(&db, "POST", "/api/bookmarks", None).status, 400);
}

#[test]
fn test_bookmark_list_scoped_by_folder_query_param() {
    let db = setup();
    let folder = post(&db, "/api/folders", r#"{"name":"Work"}"#);
    let folder_id = folder.body["id"].as_i64().unwrap();

    post(
        &db,
        "/api/bookmarks",
        &format!(
            r#"{{"url":"https://in.example.com","title":"In","folder_id":{}}}"#,
            folder_id
        ),
    );
    post(
        &db,
        "/api/bookmarks",
        r#"{"url":"https://out.example.com","title":"Out"}"#,
    );

    let all = get(&db, "/api/bookmarks");
    assert_eq!(all.body.as_array().unwrap().len(), 2);

    let scoped = get(&db, &format!("/api/bookmarks?folder_id={}", folder_id));
    let items = scoped.body.as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["title"], "In");

    // Scoping by a missing folder is a 404, matching the manager contract
    assert_eq!(get(&db, "/api/bookmarks?folder_id=999").status, 404);
}

#[test]
fn test_bookmark_search_route() {
    let db = setup();
    post(
        &db,
        "/api/bookmarks",
        r#"{"url":"https://example.com","title":"Example Site","tags":["rustacean"]}"#,
    );

    let by_title = get(&db, "/api/bookmarks/search?q=exam");
    assert_eq!(by_title.status, 200);
    assert_eq!(by_title.body.as_array().unwrap().len(), 1);

    let by_tag = get(&db, "/api/bookmarks/search?q=rustacean");
    assert_eq!(by_tag.body.as_array().unwrap().len(), 1);

    let no_match = get(&db, "/api/bookmarks/search?q=zzz");
    assert_eq!(no_match.status, 200);
    assert_eq!(no_match.body.as_array().unwrap().len(), 0);

    // Missing q parameter is a request error
    assert_eq!(get(&db, "/api/bookmarks/search").status, 400);
}

#[test]
fn test_bookmark_update_and_delete_routes() {
    let db = setup();
    let created = post(
        &db,
        "/api/bookmarks",
        r#"{"url":"https://example.com","title":"Before","tags":["a"]}"#,
    );
    let id = created.body["id"].as_i64().unwrap();

    let updated = put(
        &db,
        &format!("/api/bookmarks/{}", id),
        r#"{"title":"After","tags":["b","c"]}"#,
    );
    assert_eq!(updated.status, 200);
    assert_eq!(updated.body["title"], "After");
    assert_eq!(updated.body["tags"].as_array().unwrap().len(), 2);

    assert_eq!(delete(&db, &format!("/api/bookmarks/{}", id)).status, 200);
    assert_eq!(get(&db, &format!("/api/bookmarks/{}", id)).status, 404);
}

#[test]
fn test_fetch_metadata_route_validates_input() {
    let db = setup();
    assert_eq!(post(&db, "/api/bookmarks/fetch-metadata", r#"{}"#).status, 400);
    assert_eq!(
        post(&db, "/api/bookmarks/fetch-metadata", r#"{"url":"not a url"}"#).status,
        400
    );
}

// ─── Tags ───

#[test]
fn test_tag_create_conflict_is_409() {
    let db = setup();
    assert_eq!(post(&db, "/api/tags", r#"{"name":"news"}"#).status, 201);
    assert_eq!(post(&db, "/api/tags", r#"{"name":"news"}"#).status, 409);
}

#[test]
fn test_tag_listing_reports_counts() {
    let db = setup();
    post(
        &db,
        "/api/bookmarks",
        r#"{"url":"https://example.com","title":"Example","tags":["used"]}"#,
    );

    let listed = get(&db, "/api/tags");
    assert_eq!(listed.status, 200);
    let items = listed.body.as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["name"], "used");
    assert_eq!(items[0]["bookmark_count"], 1);
}

#[test]
fn test_tag_bookmarks_subresource() {
    let db = setup();
    post(
        &db,
        "/api/bookmarks",
        r#"{"url":"https://example.com","title":"Tagged","tags":["pin"]}"#,
    );
    let tags = get(&db, "/api/tags");
    let tag_id = tags.body.as_array().unwrap()[0]["id"].as_i64().unwrap();

    let scoped = get(&db, &format!("/api/tags/{}/bookmarks", tag_id));
    assert_eq!(scoped.status, 200);
    assert_eq!(scoped.body.as_array().unwrap().len(), 1);

    assert_eq!(get(&db, "/api/tags/999/bookmarks").status, 404);
}

#[test]
fn test_tag_rename_and_delete_routes() {
    let db = setup();
    let created = post(&db, "/api/tags", r#"{"name":"old"}"#);
    let id = created.body["id"].as_i64().unwrap();

    let renamed = put(&db, &format!("/api/tags/{}", id), r#"{"name":"new"}"#);
    assert_eq!(renamed.status, 200);
    assert_eq!(renamed.body["name"], "new");

    assert_eq!(delete(&db, &format!("/api/tags/{}", id)).status, 200);
    assert_eq!(get(&db, &format!("/api/tags/{}", id)).status, 404);
}

#[test]
fn test_folder_bookmarks_subresource() {
    let db = setup();
    let folder = post(&db, "/api/folders", r#"{"name":"Work"}"#);
    let folder_id = folder.body["id"].as_i64().unwrap();
    post(
        &db,
        "/api/bookmarks",
        &format!(
            r#"{{"url":"https://example.com","title":"In","folder_id":{}}}"#,
            folder_id
        ),
    );

    let scoped = get(&db, &format!("/api/folders/{}/bookmarks", folder_id));
    assert_eq!(scoped.status, 200);
    assert_eq!(scoped.body.as_array().unwrap().len(), 1);

    assert_eq!(get(&db, "/api/folders/999/bookmarks").status, 404);
}

#[test]
fn test_database_errors_hide_internal_detail() {
    let db = setup();
    // Dropping a table under the handler forces a database failure
    db.connection().execute("DROP TABLE bookmark_tags", []).unwrap();

    let resp = get(&db, "/api/bookmarks");
    assert_eq!(resp.status, 500);
    assert_eq!(resp.body["message"], "An unexpected error occurred");
}
