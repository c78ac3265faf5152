//! SQLite backend for the Tripshare store.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! without blocking the async runtime. Every protocol operation is a single
//! `IMMEDIATE` transaction; proposal and user rows carry a version that each
//! write compares and bumps, and conflicting transactions are retried.

mod encode;
mod records;
mod schema;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use store::{SqliteStore, StoreOptions};

#[cfg(test)]
mod tests;
