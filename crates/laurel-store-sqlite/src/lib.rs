//! SQLite backends for the Laurel content and reference stores.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! without blocking the async runtime. The two stores are independent: each
//! owns its own database file and connection handle.

mod content;
mod encode;
mod reference;
mod schema;

pub mod error;

pub use content::SqliteContentStore;
pub use error::{Error, Result};
pub use reference::SqliteReferenceStore;

#[cfg(test)]
mod tests;
