//! Handlers for `/users` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/users` | Body: `{"display_name":"..."}`; returns 201 |
//! | `GET`  | `/users/:id` | Profile with rating aggregate |
//! | `GET`  | `/users/:id/applications` | Applications the user submitted |
//! | `GET`  | `/users/:id/reviews` | Reviews the user received |
//! | `GET`  | `/users/:id/notifications` | Outbox entries for the user |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use tripshare_core::{
  application::Application,
  notification::Notification,
  review::Review,
  store::TripStore,
  user::{NewUser, UserProfile},
};
use uuid::Uuid;

use crate::error::ApiError;

async fn load<S: TripStore>(store: &S, id: Uuid) -> Result<UserProfile, ApiError> {
  store
    .get_user(id)
    .await
    .map_err(ApiError::from_store)?
    .ok_or_else(|| ApiError::NotFound(format!("user {id} not found")))
}

/// `POST /users`
pub async fn create<S: TripStore>(
  State(store): State<Arc<S>>,
  Json(body): Json<NewUser>,
) -> Result<impl IntoResponse, ApiError> {
  let user = store.add_user(body).await.map_err(ApiError::from_store)?;
  Ok((StatusCode::CREATED, Json(user)))
}

/// `GET /users/:id`
pub async fn get_one<S: TripStore>(
  State(store): State<Arc<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<UserProfile>, ApiError> {
  Ok(Json(load(store.as_ref(), id).await?))
}

/// `GET /users/:id/applications`
pub async fn applications<S: TripStore>(
  State(store): State<Arc<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Vec<Application>>, ApiError> {
  load(store.as_ref(), id).await?;
  let applications = store
    .list_user_applications(id)
    .await
    .map_err(ApiError::from_store)?;
  Ok(Json(applications))
}

/// `GET /users/:id/reviews`
pub async fn reviews<S: TripStore>(
  State(store): State<Arc<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Vec<Review>>, ApiError> {
  load(store.as_ref(), id).await?;
  let reviews = store.list_reviews(id).await.map_err(ApiError::from_store)?;
  Ok(Json(reviews))
}

/// `GET /users/:id/notifications`
pub async fn notifications<S: TripStore>(
  State(store): State<Arc<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Vec<Notification>>, ApiError> {
  load(store.as_ref(), id).await?;
  let notifications = store
    .list_notifications(id)
    .await
    .map_err(ApiError::from_store)?;
  Ok(Json(notifications))
}
