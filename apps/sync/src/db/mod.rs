//! Local SQLite note store.

pub mod error;
pub mod repository;
pub mod schema;

pub use error::DbError;
pub use repository::{Note, NoteFields, NoteRepository, SqliteRepository};
