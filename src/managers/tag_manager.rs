//! Tag manager and reconciler.
//!
//! Implements `TagManagerTrait` — explicit tag CRUD plus the reconciliation
//! step that replaces a bookmark's tag set in one logical operation. Tag
//! rows are never garbage-collected: a tag outlives its last association.

use rusqlite::{params, Connection};
use std::collections::BTreeSet;

use crate::types::errors::ApiError;
use crate::types::tag::{Tag, TagWithCount};

/// Computes the association diff between a bookmark's current tag ids and
/// the desired set: `(to_add, to_remove)`.
///
/// Pure; the transactional apply step lives in
/// [`TagManagerTrait::reconcile_and_assign`].
pub fn reconcile(existing: &BTreeSet<i64>, desired: &BTreeSet<i64>) -> (Vec<i64>, Vec<i64>) {
    let to_add = desired.difference(existing).copied().collect();
    let to_remove = existing.difference(desired).copied().collect();
    (to_add, to_remove)
}

/// Trait defining tag operations.
pub trait TagManagerTrait {
    fn list_tags(&self) -> Result<Vec<TagWithCount>, ApiError>;
    fn get_tag(&self, id: i64) -> Result<TagWithCount, ApiError>;
    fn create_tag(&mut self, name: &str) -> Result<Tag, ApiError>;
    fn rename_tag(&mut self, id: i64, name: &str) -> Result<TagWithCount, ApiError>;
    fn delete_tag(&mut self, id: i64) -> Result<(), ApiError>;
    /// Replaces the bookmark's tag set with the resolved `names`.
    ///
    /// Each name is trimmed; empty names are discarded and duplicates
    /// collapse. Missing tags are created. Must run inside the caller's
    /// bookmark-write transaction so the bookmark row and its associations
    /// commit together.
    fn reconcile_and_assign(&mut self, bookmark_id: i64, names: &[String]) -> Result<(), ApiError>;
}

/// Tag manager backed by a SQLite connection.
pub struct TagManager<'a> {
    conn: &'a Connection,
}

impl<'a> TagManager<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Looks up a tag id by exact name, creating the tag if absent.
    fn get_or_create_tag_id(&self, name: &str) -> Result<i64, ApiError> {
        match self.conn.query_row(
            "SELECT id FROM tags WHERE name = ?1",
            params![name],
            |row| row.get(0),
        ) {
            Ok(id) => Ok(id),
            Err(rusqlite::Error::QueryReturnedNoRows) => {
                self.conn
                    .execute("INSERT INTO tags (name) VALUES (?1)", params![name])
                    .map_err(|e| ApiError::Database(e.to_string()))?;
                Ok(self.conn.last_insert_rowid())
            }
            Err(e) => Err(ApiError::Database(e.to_string())),
        }
    }

    /// Resolves a raw name list to a deduplicated id set, creating missing
    /// tags along the way.
    fn resolve_tag_ids(&self, names: &[String]) -> Result<BTreeSet<i64>, ApiError> {
        let mut ids = BTreeSet::new();
        for raw in names {
            let name = raw.trim();
            if name.is_empty() {
                continue;
            }
            ids.insert(self.get_or_create_tag_id(name)?);
        }
        Ok(ids)
    }

    /// Reads the bookmark's current association set.
    fn current_tag_ids(&self, bookmark_id: i64) -> Result<BTreeSet<i64>, ApiError> {
        let mut stmt = self
            .conn
            .prepare("SELECT tag_id FROM bookmark_tags WHERE bookmark_id = ?1")
            .map_err(|e| ApiError::Database(e.to_string()))?;
        let rows = stmt
            .query_map(params![bookmark_id], |row| row.get::<_, i64>(0))
            .map_err(|e| ApiError::Database(e.to_string()))?;

        let mut ids = BTreeSet::new();
        for row in rows {
            ids.insert(row.map_err(|e| ApiError::Database(e.to_string()))?);
        }
        Ok(ids)
    }

    /// Checks whether another tag already holds `name`.
    fn name_taken(&self, name: &str, excluding: Option<i64>) -> Result<bool, ApiError> {
        let count: i64 = match excluding {
            Some(id) => self.conn.query_row(
                "SELECT COUNT(*) FROM tags WHERE name = ?1 AND id != ?2",
                params![name, id],
                |row| row.get(0),
            ),
            None => self.conn.query_row(
                "SELECT COUNT(*) FROM tags WHERE name = ?1",
                params![name],
                |row| row.get(0),
            ),
        }
        .map_err(|e| ApiError::Database(e.to_string()))?;
        Ok(count > 0)
    }

    /// Fetches a tag with its bookmark count, mapping a missing row to
    /// `NotFound`.
    fn fetch_tag_with_count(&self, id: i64) -> Result<TagWithCount, ApiError> {
        match self.conn.query_row(
            "SELECT t.id, t.name, COUNT(bt.bookmark_id) \
             FROM tags t \
             LEFT JOIN bookmark_tags bt ON bt.tag_id = t.id \
             WHERE t.id = ?1 \
             GROUP BY t.id",
            params![id],
            |row| {
                Ok(TagWithCount {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    bookmark_count: row.get(2)?,
                })
            },
        ) {
            Ok(tag) => Ok(tag),
            Err(rusqlite::Error::QueryReturnedNoRows) => {
                Err(ApiError::NotFound(format!("tag {}", id)))
            }
            Err(e) => Err(ApiError::Database(e.to_string())),
        }
    }
}

impl<'a> TagManagerTrait for TagManager<'a> {
    /// Lists all tags ordered by name, each with its bookmark count.
    fn list_tags(&self) -> Result<Vec<TagWithCount>, ApiError> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT t.id, t.name, COUNT(bt.bookmark_id) \
                 FROM tags t \
                 LEFT JOIN bookmark_tags bt ON bt.tag_id = t.id \
                 GROUP BY t.id \
                 ORDER BY t.name",
            )
            .map_err(|e| ApiError::Database(e.to_string()))?;

        let rows = stmt
            .query_map([], |row| {
                Ok(TagWithCount {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    bookmark_count: row.get(2)?,
                })
            })
            .map_err(|e| ApiError::Database(e.to_string()))?;

        let mut results = Vec::new();
        for row in rows {
            results.push(row.map_err(|e| ApiError::Database(e.to_string()))?);
        }
        Ok(results)
    }

    fn get_tag(&self, id: i64) -> Result<TagWithCount, ApiError> {
        self.fetch_tag_with_count(id)
    }

    /// Creates a tag explicitly. Names are unique store-wide.
    fn create_tag(&mut self, name: &str) -> Result<Tag, ApiError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ApiError::Validation("tag name must not be empty".to_string()));
        }
        if self.name_taken(name, None)? {
            return Err(ApiError::Conflict(format!("tag '{}' already exists", name)));
        }

        self.conn
            .execute("INSERT INTO tags (name) VALUES (?1)", params![name])
            .map_err(|e| ApiError::Database(e.to_string()))?;

        Ok(Tag {
            id: self.conn.last_insert_rowid(),
            name: name.to_string(),
        })
    }

    fn rename_tag(&mut self, id: i64, name: &str) -> Result<TagWithCount, ApiError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ApiError::Validation("tag name must not be empty".to_string()));
        }
        // Existence first so a rename of a missing tag is a 404, not a 409
        self.fetch_tag_with_count(id)?;
        if self.name_taken(name, Some(id))? {
            return Err(ApiError::Conflict(format!("tag '{}' already exists", name)));
        }

        self.conn
            .execute("UPDATE tags SET name = ?1 WHERE id = ?2", params![name, id])
            .map_err(|e| ApiError::Database(e.to_string()))?;

        self.fetch_tag_with_count(id)
    }

    /// Deletes a tag and its associations. Bookmarks survive.
    fn delete_tag(&mut self, id: i64) -> Result<(), ApiError> {
        self.fetch_tag_with_count(id)?;

        let tx = self
            .conn
            .unchecked_transaction()
            .map_err(|e| ApiError::Database(e.to_string()))?;

        tx.execute("DELETE FROM bookmark_tags WHERE tag_id = ?1", params![id])
            .map_err(|e| ApiError::Database(e.to_string()))?;
        tx.execute("DELETE FROM tags WHERE id = ?1", params![id])
            .map_err(|e| ApiError::Database(e.to_string()))?;

        tx.commit().map_err(|e| ApiError::Database(e.to_string()))?;
        Ok(())
    }

    fn reconcile_and_assign(&mut self, bookmark_id: i64, names: &[String]) -> Result<(), ApiError> {
        let desired = self.resolve_tag_ids(names)?;
        let existing = self.current_tag_ids(bookmark_id)?;
        let (to_add, to_remove) = reconcile(&existing, &desired);

        for tag_id in to_remove {
            self.conn
                .execute(
                    "DELETE FROM bookmark_tags WHERE bookmark_id = ?1 AND tag_id = ?2",
                    params![bookmark_id, tag_id],
                )
                .map_err(|e| ApiError::Database(e.to_string()))?;
        }
        for tag_id in to_add {
            self.conn
                .execute(
                    "INSERT INTO bookmark_tags (bookmark_id, tag_id) VALUES (?1, ?2)",
                    params![bookmark_id, tag_id],
                )
                .map_err(|e| ApiError::Database(e.to_string()))?;
        }
        Ok(())
    }
}
