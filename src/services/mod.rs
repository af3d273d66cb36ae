// Services sitting beside the store managers.

pub mod metadata_scraper;
