use serde::{Deserialize, Serialize};

/// A named node in the folder tree, optionally parented to another folder.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Folder {
    pub id: i64,
    pub name: String,
    pub parent_id: Option<i64>,
    pub created_at: i64,
    pub updated_at: i64,
}
