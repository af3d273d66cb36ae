//! Markbox database layer.
//!
//! SQLite connection management and versioned schema migrations.
//!
//! # Usage
//!
//! ```no_run
//! use markbox::database::Database;
//!
//! // Open a persistent database
//! let db = Database::open("markbox.db").expect("failed to open database");
//!
//! // Or use an in-memory database for testing
//! let db = Database::open_in_memory().expect("failed to open in-memory database");
//!
//! // Access the underlying connection for queries
//! let conn = db.connection();
//! ```

pub mod connection;
pub mod migrations;

pub use connection::Database;
