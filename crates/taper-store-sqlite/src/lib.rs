//! SQLite backend for the Taper measurement store.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! pool without blocking the async runtime. Backend failures are surfaced as
//! [`taper_core::Error::Storage`]; the domain taxonomy (not-found, forbidden,
//! conflict) is produced here so callers never have to inspect SQLite errors.

mod encode;
mod schema;
mod store;

pub use store::SqliteStore;

#[cfg(test)]
mod tests;
