//! Core types and trait definitions for the Tripshare capacity ledger.
//!
//! This crate is deliberately free of HTTP and database dependencies. The
//! state transitions of the application lifecycle live in [`ledger`] as pure
//! functions; storage backends run them inside their own transactions.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod application;
pub mod error;
pub mod ledger;
pub mod notification;
pub mod proposal;
pub mod review;
pub mod store;
pub mod user;

pub use error::{Classify, Error, ErrorKind, Result};
