//! Markbox API server entry point.
//!
//! Configuration comes from the environment: `MARKBOX_DATA_DIR` locates the
//! database file (falling back to the executable's directory), and
//! `MARKBOX_PORT` selects the listen port (default 3001).

use markbox::database::Database;
use markbox::http_server;

fn main() {
    let db_path = if let Ok(dir) = std::env::var("MARKBOX_DATA_DIR") {
        std::path::PathBuf::from(dir).join("markbox.db")
    } else if let Ok(exe) = std::env::current_exe() {
        exe.parent()
            .unwrap_or(std::path::Path::new("."))
            .join("markbox.db")
    } else {
        std::path::PathBuf::from("markbox.db")
    };

    let port = std::env::var("MARKBOX_PORT")
        .ok()
        .and_then(|raw| raw.parse::<u16>().ok())
        .unwrap_or(3001);

    let db = Database::open(&db_path).expect("Failed to open markbox database");
    println!(
        "[markbox] v{} serving database at {}",
        env!("CARGO_PKG_VERSION"),
        db_path.display()
    );

    http_server::run(db, port);
}
