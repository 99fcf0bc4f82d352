pub mod completions;
pub mod database;
pub mod error;
pub mod playlists;
pub mod row_helpers;
pub mod schema;
pub mod stats;
pub mod tasks;

pub use database::Database;
pub use error::StoreError;
