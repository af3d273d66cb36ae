//! REST dispatch for the markbox API.
//!
//! Kept separate from `http_server.rs` so the full route surface can be
//! unit-tested without sockets. `handle_request` takes the raw method,
//! URL, and body and returns a status code plus JSON value; the server
//! loop only shuttles bytes. Error mapping: Validation → 400,
//! NotFound → 404, Conflict → 409, Database → 500 (detail withheld).

use serde_json::{json, Value};

use crate::database::Database;
use crate::managers::bookmark_manager::{BookmarkManager, BookmarkManagerTrait};
use crate::managers::folder_manager::{FolderManager, FolderManagerTrait};
use crate::managers::tag_manager::{TagManager, TagManagerTrait};
use crate::services::metadata_scraper::{MetadataScraper, MetadataScraperTrait};
use crate::types::errors::{ApiError, ScrapeError};

/// Transport-independent response: a status code and a JSON body.
#[derive(Debug)]
pub struct ApiResponse {
    pub status: u16,
    pub body: Value,
}

/// Dispatches one request against the database.
///
/// `url` is the raw request URL including any query string; `body` is the
/// request body for POST/PUT, if any.
pub fn handle_request(db: &Database, method: &str, url: &str, body: Option<&str>) -> ApiResponse {
    let path = url.split('?').next().unwrap_or("");
    match dispatch(db, method, path, url, body) {
        Ok(response) => response,
        Err(e) => error_response(&e),
    }
}

fn error_response(err: &ApiError) -> ApiResponse {
    match err {
        ApiError::Validation(_) => ApiResponse {
            status: 400,
            body: json!({"message": err.to_string()}),
        },
        ApiError::NotFound(_) => ApiResponse {
            status: 404,
            body: json!({"message": err.to_string()}),
        },
        ApiError::Conflict(_) => ApiResponse {
            status: 409,
            body: json!({"message": err.to_string()}),
        },
        ApiError::Database(_) => {
            // Internal detail stays on the server side
            eprintln!("[markbox] {}", err);
            ApiResponse {
                status: 500,
                body: json!({"message": "An unexpected error occurred"}),
            }
        }
    }
}

fn respond<T: serde::Serialize>(status: u16, payload: &T) -> Result<ApiResponse, ApiError> {
    let body = serde_json::to_value(payload).map_err(|e| ApiError::Database(e.to_string()))?;
    Ok(ApiResponse { status, body })
}

fn message(status: u16, text: &str) -> ApiResponse {
    ApiResponse {
        status,
        body: json!({"message": text}),
    }
}

/// Parses a path segment as an id; non-integer segments are a 400.
fn parse_id(segment: &str) -> Result<i64, ApiError> {
    segment
        .parse::<i64>()
        .map_err(|_| ApiError::Validation(format!("'{}' is not a valid id", segment)))
}

/// Extracts a decoded query-string parameter from the raw URL.
fn query_param(url: &str, param: &str) -> Option<String> {
    let query = &url[url.find('?')? + 1..];
    for pair in query.split('&') {
        let mut parts = pair.splitn(2, '=');
        if let (Some(key), Some(value)) = (parts.next(), parts.next()) {
            if key == param {
                return Some(urlencoding::decode(value).unwrap_or_default().to_string());
            }
        }
    }
    None
}

fn parse_body(body: Option<&str>) -> Result<Value, ApiError> {
    let raw = body.ok_or_else(|| ApiError::Validation("missing request body".to_string()))?;
    serde_json::from_str(raw).map_err(|e| ApiError::Validation(format!("invalid JSON body: {}", e)))
}

fn required_str<'v>(body: &'v Value, key: &str) -> Result<&'v str, ApiError> {
    body.get(key)
        .and_then(|v| v.as_str())
        .ok_or_else(|| ApiError::Validation(format!("missing {}", key)))
}

fn optional_str<'v>(body: &'v Value, key: &str) -> Result<Option<&'v str>, ApiError> {
    match body.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(v) => v
            .as_str()
            .map(Some)
            .ok_or_else(|| ApiError::Validation(format!("{} must be a string", key))),
    }
}

/// Distinguishes "key absent" (`None`), "key null" (`Some(None)`), and
/// "key set" (`Some(Some(id))`): the tri-state folder reference.
fn tri_state_id(body: &Value, key: &str) -> Result<Option<Option<i64>>, ApiError> {
    match body.get(key) {
        None => Ok(None),
        Some(Value::Null) => Ok(Some(None)),
        Some(v) => match v.as_i64() {
            Some(id) => Ok(Some(Some(id))),
            None => Err(ApiError::Validation(format!(
                "{} must be an integer or null",
                key
            ))),
        },
    }
}

fn optional_string_array(body: &Value, key: &str) -> Result<Option<Vec<String>>, ApiError> {
    match body.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Array(items)) => {
            let mut out = Vec::with_capacity(items.len());
            for item in items {
                match item.as_str() {
                    Some(s) => out.push(s.to_string()),
                    None => {
                        return Err(ApiError::Validation(format!(
                            "{} must be an array of strings",
                            key
                        )))
                    }
                }
            }
            Ok(Some(out))
        }
        Some(_) => Err(ApiError::Validation(format!(
            "{} must be an array of strings",
            key
        ))),
    }
}

fn dispatch(
    db: &Database,
    method: &str,
    path: &str,
    url: &str,
    body: Option<&str>,
) -> Result<ApiResponse, ApiError> {
    let conn = db.connection();

    match (method, path) {
        ("GET", "/") => Ok(ApiResponse {
            status: 200,
            body: json!({
                "message": "Markbox API Server",
                "version": env!("CARGO_PKG_VERSION"),
                "endpoints": {
                    "bookmarks": "/api/bookmarks",
                    "folders": "/api/folders",
                    "tags": "/api/tags",
                    "health": "/api/health"
                }
            }),
        }),
        ("GET", "/api/health") => Ok(ApiResponse {
            status: 200,
            body: json!({"status": "ok"}),
        }),

        // ─── Bookmarks ───
        ("GET", "/api/bookmarks") => {
            let folder_id = match query_param(url, "folder_id") {
                Some(raw) => Some(parse_id(&raw)?),
                None => None,
            };
            let views = BookmarkManager::new(conn).list_bookmarks(folder_id)?;
            respond(200, &views)
        }
        ("GET", "/api/bookmarks/search") => {
            let query = query_param(url, "q")
                .ok_or_else(|| ApiError::Validation("missing query parameter q".to_string()))?;
            let views = BookmarkManager::new(conn).search_bookmarks(&query)?;
            respond(200, &views)
        }
        ("POST", "/api/bookmarks") => {
            let body = parse_body(body)?;
            let url_field = required_str(&body, "url")?;
            let title = required_str(&body, "title")?;
            let folder_id = tri_state_id(&body, "folder_id")?.flatten();
            let tags = optional_string_array(&body, "tags")?.unwrap_or_default();
            let view =
                BookmarkManager::new(conn).create_bookmark(url_field, title, folder_id, &tags)?;
            respond(201, &view)
        }
        ("POST", "/api/bookmarks/fetch-metadata") => {
            let body = parse_body(body)?;
            let target = required_str(&body, "url")?;
            match MetadataScraper::new().fetch_metadata(target) {
                Ok(meta) => respond(200, &meta),
                Err(ScrapeError::InvalidUrl(u)) => {
                    Err(ApiError::Validation(format!("'{}' is not a valid URL", u)))
                }
                Err(e) => {
                    eprintln!("[markbox] {}", e);
                    Ok(message(500, "Failed to fetch URL metadata"))
                }
            }
        }

        // ─── Folders ───
        ("GET", "/api/folders") => {
            let folders = FolderManager::new(conn).list_folders()?;
            respond(200, &folders)
        }
        ("POST", "/api/folders") => {
            let body = parse_body(body)?;
            let name = required_str(&body, "name")?;
            let parent_id = tri_state_id(&body, "parent_id")?.flatten();
            let folder = FolderManager::new(conn).create_folder(name, parent_id)?;
            respond(201, &folder)
        }

        // ─── Tags ───
        ("GET", "/api/tags") => {
            let tags = TagManager::new(conn).list_tags()?;
            respond(200, &tags)
        }
        ("POST", "/api/tags") => {
            let body = parse_body(body)?;
            let name = required_str(&body, "name")?;
            let tag = TagManager::new(conn).create_tag(name)?;
            respond(201, &tag)
        }

        _ => dispatch_item(db, method, path, body),
    }
}

/// Id-bearing routes: `/api/{bookmarks,folders,tags}/{id}` and the
/// `/bookmarks` sub-resources of folders and tags.
fn dispatch_item(
    db: &Database,
    method: &str,
    path: &str,
    body: Option<&str>,
) -> Result<ApiResponse, ApiError> {
    let conn = db.connection();

    if let Some(rest) = path.strip_prefix("/api/bookmarks/") {
        let id = parse_id(rest)?;
        return match method {
            "GET" => respond(200, &BookmarkManager::new(conn).get_bookmark(id)?),
            "PUT" => {
                let body = parse_body(body)?;
                let url_field = optional_str(&body, "url")?;
                let title = optional_str(&body, "title")?;
                let folder_id = tri_state_id(&body, "folder_id")?;
                let tags = optional_string_array(&body, "tags")?;
                let view = BookmarkManager::new(conn).update_bookmark(
                    id,
                    url_field,
                    title,
                    folder_id,
                    tags.as_deref(),
                )?;
                respond(200, &view)
            }
            "DELETE" => {
                BookmarkManager::new(conn).delete_bookmark(id)?;
                Ok(message(200, "Bookmark deleted successfully"))
            }
            _ => Ok(message(404, "Not found")),
        };
    }

    if let Some(rest) = path.strip_prefix("/api/folders/") {
        if let Some(id_part) = rest.strip_suffix("/bookmarks") {
            if method == "GET" {
                let id = parse_id(id_part)?;
                let views = BookmarkManager::new(conn).list_bookmarks(Some(id))?;
                return respond(200, &views);
            }
            return Ok(message(404, "Not found"));
        }
        let id = parse_id(rest)?;
        return match method {
            "GET" => respond(200, &FolderManager::new(conn).get_folder(id)?),
            "PUT" => {
                let body = parse_body(body)?;
                let name = optional_str(&body, "name")?;
                let parent_id = tri_state_id(&body, "parent_id")?;
                let folder = FolderManager::new(conn).update_folder(id, name, parent_id)?;
                respond(200, &folder)
            }
            "DELETE" => {
                FolderManager::new(conn).delete_folder(id)?;
                Ok(message(200, "Folder deleted successfully"))
            }
            _ => Ok(message(404, "Not found")),
        };
    }

    if let Some(rest) = path.strip_prefix("/api/tags/") {
        if let Some(id_part) = rest.strip_suffix("/bookmarks") {
            if method == "GET" {
                let id = parse_id(id_part)?;
                let views = BookmarkManager::new(conn).list_bookmarks_by_tag(id)?;
                return respond(200, &views);
            }
            return Ok(message(404, "Not found"));
        }
        let id = parse_id(rest)?;
        return match method {
            "GET" => respond(200, &TagManager::new(conn).get_tag(id)?),
            "PUT" => {
                let body = parse_body(body)?;
                let name = required_str(&body, "name")?;
                let tag = TagManager::new(conn).rename_tag(id, name)?;
                respond(200, &tag)
            }
            "DELETE" => {
                TagManager::new(conn).delete_tag(id)?;
                Ok(message(200, "Tag deleted successfully"))
            }
            _ => Ok(message(404, "Not found")),
        };
    }

    Ok(message(404, "Not found"))
}
