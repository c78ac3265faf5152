//! JSON REST API for Tripshare.
//!
//! Exposes an axum [`Router`] backed by any [`tripshare_core::store::TripStore`].
//! Auth, TLS, and transport concerns are the caller's responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", tripshare_api::api_router(store.clone()))
//! ```

pub mod applications;
pub mod error;
pub mod proposals;
pub mod reviews;
pub mod users;

use std::sync::Arc;

use axum::{
  Router,
  routing::{get, post},
};
use tripshare_core::store::TripStore;

pub use error::ApiError;

/// Build a fully-materialised API router for `store`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S>(store: Arc<S>) -> Router<()>
where
  S: TripStore + 'static,
{
  Router::new()
    // Users
    .route("/users", post(users::create::<S>))
    .route("/users/{id}", get(users::get_one::<S>))
    .route("/users/{id}/applications", get(users::applications::<S>))
    .route("/users/{id}/reviews", get(users::reviews::<S>))
    .route("/users/{id}/notifications", get(users::notifications::<S>))
    // Proposals
    .route("/proposals", post(proposals::create::<S>))
    .route(
      "/proposals/{id}",
      get(proposals::get_one::<S>).delete(proposals::delete_one::<S>),
    )
    .route("/proposals/{id}/conclude", post(proposals::conclude::<S>))
    .route("/proposals/{id}/applications", get(proposals::applications::<S>))
    // Applications
    .route("/applications", post(applications::create::<S>))
    .route(
      "/applications/{id}",
      get(applications::get_one::<S>).delete(applications::withdraw::<S>),
    )
    .route("/applications/{id}/accept", post(applications::accept::<S>))
    .route("/applications/{id}/reject", post(applications::reject::<S>))
    // Reviews
    .route("/reviews", post(reviews::create::<S>))
    .route(
      "/reviews/{id}",
      get(reviews::get_one::<S>)
        .put(reviews::update::<S>)
        .delete(reviews::delete_one::<S>),
    )
    .with_state(store)
}
