use serde::{Deserialize, Serialize};

use crate::types::tag::Tag;

/// A saved URL with optional folder placement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bookmark {
    pub id: i64,
    pub title: String,
    pub url: String,
    pub folder_id: Option<i64>,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Denormalized read view: a bookmark together with its tag set.
///
/// Tag order follows the underlying join, stable within one query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookmarkView {
    pub id: i64,
    pub title: String,
    pub url: String,
    pub folder_id: Option<i64>,
    pub created_at: i64,
    pub updated_at: i64,
    pub tags: Vec<Tag>,
}

/// Page metadata scraped for a submitted URL. Absent fields come back empty.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageMetadata {
    pub title: String,
    pub description: String,
    pub favicon: String,
    pub url: String,
}
