//! Folder hierarchy manager.
//!
//! Implements `FolderManagerTrait` — CRUD over the folder tree, backed by
//! SQLite via `rusqlite`. Enforces the tree invariants: parents must exist,
//! a folder is never its own ancestor, and deletion flattens one level
//! (children re-point to the deleted folder's parent, bookmarks detach).

use rusqlite::{params, Connection};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::types::errors::ApiError;
use crate::types::folder::Folder;

/// Trait defining folder tree operations.
pub trait FolderManagerTrait {
    fn create_folder(&mut self, name: &str, parent_id: Option<i64>) -> Result<Folder, ApiError>;
    /// Rename and/or reparent. `parent_id` is tri-state: `None` leaves the
    /// parent untouched, `Some(None)` detaches to root, `Some(Some(id))`
    /// moves under `id`.
    fn update_folder(
        &mut self,
        id: i64,
        name: Option<&str>,
        parent_id: Option<Option<i64>>,
    ) -> Result<Folder, ApiError>;
    fn delete_folder(&mut self, id: i64) -> Result<(), ApiError>;
    fn get_folder(&self, id: i64) -> Result<Folder, ApiError>;
    fn list_folders(&self) -> Result<Vec<Folder>, ApiError>;
}

/// Folder manager backed by a SQLite connection.
pub struct FolderManager<'a> {
    conn: &'a Connection,
}

impl<'a> FolderManager<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Returns the current UNIX timestamp in seconds.
    fn now() -> i64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs() as i64
    }

    /// Checks whether a folder with the given id exists.
    fn folder_exists(&self, id: i64) -> Result<bool, ApiError> {
        let count: i64 = self
            .conn
            .query_row(
                "SELECT COUNT(*) FROM folders WHERE id = ?1",
                params![id],
                |row| row.get(0),
            )
            .map_err(|e| ApiError::Database(e.to_string()))?;
        Ok(count > 0)
    }

    /// Walks the parent chain upward from `start`, returning true if
    /// `needle` appears anywhere in it (including `start` itself).
    ///
    /// Iterative, bounded by the total folder count, so a corrupted parent
    /// chain cannot spin forever or overflow the stack.
    fn chain_contains(&self, needle: i64, start: i64) -> Result<bool, ApiError> {
        let bound: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM folders", [], |row| row.get(0))
            .map_err(|e| ApiError::Database(e.to_string()))?;

        let mut current = Some(start);
        let mut hops: i64 = 0;
        while let Some(id) = current {
            if id == needle {
                return Ok(true);
            }
            hops += 1;
            if hops > bound {
                break;
            }
            current = self
                .conn
                .query_row(
                    "SELECT parent_id FROM folders WHERE id = ?1",
                    params![id],
                    |row| row.get(0),
                )
                .map_err(|e| ApiError::Database(e.to_string()))?;
        }
        Ok(false)
    }

    /// Reads a single `Folder` row into a struct.
    fn row_to_folder(row: &rusqlite::Row) -> rusqlite::Result<Folder> {
        Ok(Folder {
            id: row.get(0)?,
            name: row.get(1)?,
            parent_id: row.get(2)?,
            created_at: row.get(3)?,
            updated_at: row.get(4)?,
        })
    }

    /// Fetches a folder row, mapping a missing row to `NotFound`.
    fn fetch_folder(&self, id: i64) -> Result<Folder, ApiError> {
        match self.conn.query_row(
            "SELECT id, name, parent_id, created_at, updated_at FROM folders WHERE id = ?1",
            params![id],
            Self::row_to_folder,
        ) {
            Ok(folder) => Ok(folder),
            Err(rusqlite::Error::QueryReturnedNoRows) => {
                Err(ApiError::NotFound(format!("folder {}", id)))
            }
            Err(e) => Err(ApiError::Database(e.to_string())),
        }
    }

    /// Validates a proposed new parent for `id`: it must not be the folder
    /// itself or any of its descendants, and it must exist.
    fn check_reparent(&self, id: i64, new_parent: i64) -> Result<(), ApiError> {
        if new_parent == id {
            return Err(ApiError::Validation(
                "a folder cannot be its own parent".to_string(),
            ));
        }
        if !self.folder_exists(new_parent)? {
            return Err(ApiError::NotFound(format!("parent folder {}", new_parent)));
        }
        // Reject if the proposed parent sits anywhere inside this folder's
        // subtree: walking its ancestor chain must never reach `id`.
        if self.chain_contains(id, new_parent)? {
            return Err(ApiError::Validation(
                "a folder cannot be moved under its own descendant".to_string(),
            ));
        }
        Ok(())
    }
}

impl<'a> FolderManagerTrait for FolderManager<'a> {
    /// Creates a new folder, optionally under `parent_id`.
    fn create_folder(&mut self, name: &str, parent_id: Option<i64>) -> Result<Folder, ApiError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ApiError::Validation("folder name must not be empty".to_string()));
        }
        if let Some(pid) = parent_id {
            if !self.folder_exists(pid)? {
                return Err(ApiError::NotFound(format!("parent folder {}", pid)));
            }
        }

        let now = Self::now();
        self.conn
            .execute(
                "INSERT INTO folders (name, parent_id, created_at, updated_at) VALUES (?1, ?2, ?3, ?4)",
                params![name, parent_id, now, now],
            )
            .map_err(|e| ApiError::Database(e.to_string()))?;

        self.fetch_folder(self.conn.last_insert_rowid())
    }

    /// Renames and/or reparents an existing folder.
    ///
    /// Only supplied fields change; `updated_at` is refreshed on any
    /// successful update.
    fn update_folder(
        &mut self,
        id: i64,
        name: Option<&str>,
        parent_id: Option<Option<i64>>,
    ) -> Result<Folder, ApiError> {
        let existing = self.fetch_folder(id)?;

        let new_name = match name {
            Some(n) => {
                let n = n.trim();
                if n.is_empty() {
                    return Err(ApiError::Validation(
                        "folder name must not be empty".to_string(),
                    ));
                }
                n.to_string()
            }
            None => existing.name,
        };

        let new_parent = match parent_id {
            Some(Some(pid)) => {
                self.check_reparent(id, pid)?;
                Some(pid)
            }
            Some(None) => None,
            None => existing.parent_id,
        };

        self.conn
            .execute(
                "UPDATE folders SET name = ?1, parent_id = ?2, updated_at = ?3 WHERE id = ?4",
                params![new_name, new_parent, Self::now(), id],
            )
            .map_err(|e| ApiError::Database(e.to_string()))?;

        self.fetch_folder(id)
    }

    /// Deletes a folder, flattening one tree level.
    ///
    /// In one atomic transaction: bookmarks in the folder are detached
    /// (`folder_id = NULL`), child folders are re-linked to the deleted
    /// folder's own parent, then the folder row is removed. Any failure
    /// rolls the whole transaction back.
    fn delete_folder(&mut self, id: i64) -> Result<(), ApiError> {
        let folder = self.fetch_folder(id)?;

        let tx = self
            .conn
            .unchecked_transaction()
            .map_err(|e| ApiError::Database(e.to_string()))?;

        tx.execute(
            "UPDATE bookmarks SET folder_id = NULL WHERE folder_id = ?1",
            params![id],
        )
        .map_err(|e| ApiError::Database(e.to_string()))?;

        tx.execute(
            "UPDATE folders SET parent_id = ?1 WHERE parent_id = ?2",
            params![folder.parent_id, id],
        )
        .map_err(|e| ApiError::Database(e.to_string()))?;

        tx.execute("DELETE FROM folders WHERE id = ?1", params![id])
            .map_err(|e| ApiError::Database(e.to_string()))?;

        tx.commit().map_err(|e| ApiError::Database(e.to_string()))?;
        Ok(())
    }

    /// Fetches a single folder by id.
    fn get_folder(&self, id: i64) -> Result<Folder, ApiError> {
        self.fetch_folder(id)
    }

    /// Lists all folders: parentless folders first, then by name.
    ///
    /// The sidebar tree on the client renders in this order, so it is part
    /// of the contract.
    fn list_folders(&self) -> Result<Vec<Folder>, ApiError> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT id, name, parent_id, created_at, updated_at \
                 FROM folders ORDER BY (parent_id IS NULL) DESC, name",
            )
            .map_err(|e| ApiError::Database(e.to_string()))?;

        let rows = stmt
            .query_map([], Self::row_to_folder)
            .map_err(|e| ApiError::Database(e.to_string()))?;

        let mut results = Vec::new();
        for row in rows {
            results.push(row.map_err(|e| ApiError::Database(e.to_string()))?);
        }
        Ok(results)
    }
}
