use std::fmt;

// === ApiError ===

/// Errors surfaced by the store managers and services.
///
/// The transport layer maps each variant to an HTTP status:
/// `Validation` → 400, `NotFound` → 404, `Conflict` → 409, `Database` → 500.
#[derive(Debug)]
pub enum ApiError {
    /// Malformed or missing input (empty folder name, self-parent, bad URL).
    Validation(String),
    /// A referenced id does not exist.
    NotFound(String),
    /// A unique field collided (duplicate tag name).
    Conflict(String),
    /// Database or transaction failure not otherwise classified.
    Database(String),
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::Validation(msg) => write!(f, "Validation error: {}", msg),
            ApiError::NotFound(msg) => write!(f, "Not found: {}", msg),
            ApiError::Conflict(msg) => write!(f, "Conflict: {}", msg),
            ApiError::Database(msg) => write!(f, "Database error: {}", msg),
        }
    }
}

impl std::error::Error for ApiError {}

// === ScrapeError ===

/// Errors from the metadata scraping service.
#[derive(Debug)]
pub enum ScrapeError {
    /// The submitted URL does not parse.
    InvalidUrl(String),
    /// The page could not be fetched.
    FetchFailed(String),
}

impl fmt::Display for ScrapeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScrapeError::InvalidUrl(url) => write!(f, "Invalid URL: {}", url),
            ScrapeError::FetchFailed(msg) => write!(f, "Metadata fetch failed: {}", msg),
        }
    }
}

impl std::error::Error for ScrapeError {}
