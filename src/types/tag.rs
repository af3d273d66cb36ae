use serde::{Deserialize, Serialize};

/// A named label, many-to-many with bookmarks. Names are unique store-wide,
/// case-sensitive as stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tag {
    pub id: i64,
    pub name: String,
}

/// A tag together with the number of bookmarks carrying it, as returned
/// by the tag listing endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TagWithCount {
    pub id: i64,
    pub name: String,
    pub bookmark_count: i64,
}
