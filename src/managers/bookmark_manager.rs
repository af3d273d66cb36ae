//! Bookmark manager and query assembler.
//!
//! Implements `BookmarkManagerTrait` — bookmark CRUD plus the denormalized
//! read paths (list all / by folder / by tag / free-text search). Views are
//! assembled with an explicit join over (bookmark, tag) rows grouped by
//! bookmark id; no string-concatenation aggregation.

use rusqlite::{params, Connection};
use std::time::{SystemTime, UNIX_EPOCH};
use url::Url;

use crate::managers::tag_manager::{TagManager, TagManagerTrait};
use crate::types::bookmark::{Bookmark, BookmarkView};
use crate::types::errors::ApiError;
use crate::types::tag::Tag;

/// Trait defining bookmark operations.
pub trait BookmarkManagerTrait {
    fn create_bookmark(
        &mut self,
        url: &str,
        title: &str,
        folder_id: Option<i64>,
        tags: &[String],
    ) -> Result<BookmarkView, ApiError>;
    /// Partial update. Unset fields are unchanged; `folder_id` is tri-state
    /// (`Some(None)` detaches); a supplied `tags` list fully replaces the
    /// tag set.
    fn update_bookmark(
        &mut self,
        id: i64,
        url: Option<&str>,
        title: Option<&str>,
        folder_id: Option<Option<i64>>,
        tags: Option<&[String]>,
    ) -> Result<BookmarkView, ApiError>;
    fn delete_bookmark(&mut self, id: i64) -> Result<(), ApiError>;
    fn get_bookmark(&self, id: i64) -> Result<BookmarkView, ApiError>;
    fn list_bookmarks(&self, folder_id: Option<i64>) -> Result<Vec<BookmarkView>, ApiError>;
    fn list_bookmarks_by_tag(&self, tag_id: i64) -> Result<Vec<BookmarkView>, ApiError>;
    fn search_bookmarks(&self, query: &str) -> Result<Vec<BookmarkView>, ApiError>;
}

/// Read-path filter for view assembly.
enum ViewFilter<'q> {
    All,
    One(i64),
    Folder(i64),
    Tag(i64),
    Text(&'q str),
}

/// One row of the view join: bookmark columns plus an optional tag pair.
type ViewRow = (i64, String, String, Option<i64>, i64, i64, Option<i64>, Option<String>);

const VIEW_SELECT: &str = "SELECT b.id, b.title, b.url, b.folder_id, b.created_at, b.updated_at, \
     t.id, t.name \
     FROM bookmarks b \
     LEFT JOIN bookmark_tags bt ON bt.bookmark_id = b.id \
     LEFT JOIN tags t ON t.id = bt.tag_id";

// Ordering by id as well keeps all join rows of one bookmark adjacent,
// which the grouping step below relies on.
const VIEW_ORDER: &str = "ORDER BY b.created_at DESC, b.id DESC";

/// Bookmark manager backed by a SQLite connection.
pub struct BookmarkManager<'a> {
    conn: &'a Connection,
}

impl<'a> BookmarkManager<'a> {
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

    /// Rejects URLs that do not parse.
    fn validate_url(url: &str) -> Result<(), ApiError> {
        Url::parse(url)
            .map(|_| ())
            .map_err(|_| ApiError::Validation(format!("'{}' is not a valid URL", url)))
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

    /// Checks whether a tag with the given id exists.
    fn tag_exists(&self, id: i64) -> Result<bool, ApiError> {
        let count: i64 = self
            .conn
            .query_row(
                "SELECT COUNT(*) FROM tags WHERE id = ?1",
                params![id],
                |row| row.get(0),
            )
            .map_err(|e| ApiError::Database(e.to_string()))?;
        Ok(count > 0)
    }

    /// Reads one join row.
    fn row_to_view_row(row: &rusqlite::Row) -> rusqlite::Result<ViewRow> {
        Ok((
            row.get(0)?,
            row.get(1)?,
            row.get(2)?,
            row.get(3)?,
            row.get(4)?,
            row.get(5)?,
            row.get(6)?,
            row.get(7)?,
        ))
    }

    /// Fetches the bare bookmark row, mapping a missing row to `NotFound`.
    fn fetch_bookmark_row(&self, id: i64) -> Result<Bookmark, ApiError> {
        match self.conn.query_row(
            "SELECT id, title, url, folder_id, created_at, updated_at FROM bookmarks WHERE id = ?1",
            params![id],
            |row| {
                Ok(Bookmark {
                    id: row.get(0)?,
                    title: row.get(1)?,
                    url: row.get(2)?,
                    folder_id: row.get(3)?,
                    created_at: row.get(4)?,
                    updated_at: row.get(5)?,
                })
            },
        ) {
            Ok(bookmark) => Ok(bookmark),
            Err(rusqlite::Error::QueryReturnedNoRows) => {
                Err(ApiError::NotFound(format!("bookmark {}", id)))
            }
            Err(e) => Err(ApiError::Database(e.to_string())),
        }
    }

    /// Runs the view join for the given filter and groups consecutive rows
    /// into `BookmarkView`s, newest first.
    ///
    /// A bookmark matched by one tag in a text search still carries its
    /// complete tag set, because the filter is applied in a subquery over
    /// ids rather than on the outer join.
    fn assemble(&self, filter: &ViewFilter) -> Result<Vec<BookmarkView>, ApiError> {
        let where_clause = match filter {
            ViewFilter::All => "",
            ViewFilter::One(_) => "WHERE b.id = ?1",
            ViewFilter::Folder(_) => "WHERE b.folder_id = ?1",
            ViewFilter::Tag(_) => {
                "WHERE b.id IN (SELECT bookmark_id FROM bookmark_tags WHERE tag_id = ?1)"
            }
            ViewFilter::Text(_) => {
                "WHERE b.id IN (SELECT b2.id FROM bookmarks b2 \
                 LEFT JOIN bookmark_tags bt2 ON bt2.bookmark_id = b2.id \
                 LEFT JOIN tags t2 ON t2.id = bt2.tag_id \
                 WHERE b2.title LIKE ?1 OR b2.url LIKE ?1 OR t2.name LIKE ?1)"
            }
        };
        let sql = format!("{} {} {}", VIEW_SELECT, where_clause, VIEW_ORDER);

        let mut stmt = self
            .conn
            .prepare(&sql)
            .map_err(|e| ApiError::Database(e.to_string()))?;

        let rows = match filter {
            ViewFilter::All => stmt.query_map([], Self::row_to_view_row),
            ViewFilter::One(id) | ViewFilter::Folder(id) | ViewFilter::Tag(id) => {
                stmt.query_map(params![id], Self::row_to_view_row)
            }
            ViewFilter::Text(query) => {
                let pattern = format!("%{}%", query);
                stmt.query_map(params![pattern], Self::row_to_view_row)
            }
        }
        .map_err(|e| ApiError::Database(e.to_string()))?;

        let mut views: Vec<BookmarkView> = Vec::new();
        for row in rows {
            let (id, title, url, folder_id, created_at, updated_at, tag_id, tag_name) =
                row.map_err(|e| ApiError::Database(e.to_string()))?;

            if views.last().map(|v| v.id) != Some(id) {
                views.push(BookmarkView {
                    id,
                    title,
                    url,
                    folder_id,
                    created_at,
                    updated_at,
                    tags: Vec::new(),
                });
            }
            if let (Some(tid), Some(tname)) = (tag_id, tag_name) {
                if let Some(view) = views.last_mut() {
                    view.tags.push(Tag { id: tid, name: tname });
                }
            }
        }
        Ok(views)
    }
}

impl<'a> BookmarkManagerTrait for BookmarkManager<'a> {
    /// Creates a bookmark with an initial tag set.
    ///
    /// The insert and the tag reconciliation commit in one transaction.
    fn create_bookmark(
        &mut self,
        url: &str,
        title: &str,
        folder_id: Option<i64>,
        tags: &[String],
    ) -> Result<BookmarkView, ApiError> {
        Self::validate_url(url)?;
        if let Some(fid) = folder_id {
            if !self.folder_exists(fid)? {
                return Err(ApiError::NotFound(format!("folder {}", fid)));
            }
        }

        let tx = self
            .conn
            .unchecked_transaction()
            .map_err(|e| ApiError::Database(e.to_string()))?;

        let now = Self::now();
        tx.execute(
            "INSERT INTO bookmarks (title, url, folder_id, created_at, updated_at) \
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![title, url, folder_id, now, now],
        )
        .map_err(|e| ApiError::Database(e.to_string()))?;
        let id = tx.last_insert_rowid();

        TagManager::new(&tx).reconcile_and_assign(id, tags)?;

        tx.commit().map_err(|e| ApiError::Database(e.to_string()))?;
        self.get_bookmark(id)
    }

    /// Applies a partial update; `updated_at` refreshes on any success.
    fn update_bookmark(
        &mut self,
        id: i64,
        url: Option<&str>,
        title: Option<&str>,
        folder_id: Option<Option<i64>>,
        tags: Option<&[String]>,
    ) -> Result<BookmarkView, ApiError> {
        let existing = self.fetch_bookmark_row(id)?;

        if let Some(u) = url {
            Self::validate_url(u)?;
        }
        if let Some(Some(fid)) = folder_id {
            if !self.folder_exists(fid)? {
                return Err(ApiError::NotFound(format!("folder {}", fid)));
            }
        }

        let new_url = url.unwrap_or(&existing.url);
        let new_title = title.unwrap_or(&existing.title);
        let new_folder = match folder_id {
            Some(f) => f,
            None => existing.folder_id,
        };

        let tx = self
            .conn
            .unchecked_transaction()
            .map_err(|e| ApiError::Database(e.to_string()))?;

        tx.execute(
            "UPDATE bookmarks SET title = ?1, url = ?2, folder_id = ?3, updated_at = ?4 WHERE id = ?5",
            params![new_title, new_url, new_folder, Self::now(), id],
        )
        .map_err(|e| ApiError::Database(e.to_string()))?;

        if let Some(names) = tags {
            TagManager::new(&tx).reconcile_and_assign(id, names)?;
        }

        tx.commit().map_err(|e| ApiError::Database(e.to_string()))?;
        self.get_bookmark(id)
    }

    /// Deletes a bookmark and its tag associations. Folders and tags
    /// survive.
    fn delete_bookmark(&mut self, id: i64) -> Result<(), ApiError> {
        self.fetch_bookmark_row(id)?;

        let tx = self
            .conn
            .unchecked_transaction()
            .map_err(|e| ApiError::Database(e.to_string()))?;

        tx.execute(
            "DELETE FROM bookmark_tags WHERE bookmark_id = ?1",
            params![id],
        )
        .map_err(|e| ApiError::Database(e.to_string()))?;
        tx.execute("DELETE FROM bookmarks WHERE id = ?1", params![id])
            .map_err(|e| ApiError::Database(e.to_string()))?;

        tx.commit().map_err(|e| ApiError::Database(e.to_string()))?;
        Ok(())
    }

    fn get_bookmark(&self, id: i64) -> Result<BookmarkView, ApiError> {
        let mut views = self.assemble(&ViewFilter::One(id))?;
        match views.pop() {
            Some(view) => Ok(view),
            None => Err(ApiError::NotFound(format!("bookmark {}", id))),
        }
    }

    /// Lists all bookmarks, or those in one folder, newest first.
    fn list_bookmarks(&self, folder_id: Option<i64>) -> Result<Vec<BookmarkView>, ApiError> {
        match folder_id {
            Some(fid) => {
                if !self.folder_exists(fid)? {
                    return Err(ApiError::NotFound(format!("folder {}", fid)));
                }
                self.assemble(&ViewFilter::Folder(fid))
            }
            None => self.assemble(&ViewFilter::All),
        }
    }

    /// Lists bookmarks carrying the tag; each view still has its complete
    /// tag set.
    fn list_bookmarks_by_tag(&self, tag_id: i64) -> Result<Vec<BookmarkView>, ApiError> {
        if !self.tag_exists(tag_id)? {
            return Err(ApiError::NotFound(format!("tag {}", tag_id)));
        }
        self.assemble(&ViewFilter::Tag(tag_id))
    }

    /// Case-insensitive substring search over title, url, and tag names.
    ///
    /// Never fails on absence; empty input returns an empty sequence.
    fn search_bookmarks(&self, query: &str) -> Result<Vec<BookmarkView>, ApiError> {
        if query.is_empty() {
            return Ok(Vec::new());
        }
        self.assemble(&ViewFilter::Text(query))
    }
}
