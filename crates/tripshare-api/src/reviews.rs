//! Handlers for `/reviews` endpoints.

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use tripshare_core::{
  review::{NewReview, Review, ReviewUpdate},
  store::TripStore,
};
use uuid::Uuid;

use crate::error::ApiError;

/// `POST /reviews`
pub async fn create<S: TripStore>(
  State(store): State<Arc<S>>,
  Json(body): Json<NewReview>,
) -> Result<impl IntoResponse, ApiError> {
  let review = store.add_review(body).await.map_err(ApiError::from_store)?;
  Ok((StatusCode::CREATED, Json(review)))
}

/// `GET /reviews/:id`
pub async fn get_one<S: TripStore>(
  State(store): State<Arc<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Review>, ApiError> {
  let review = store
    .get_review(id)
    .await
    .map_err(ApiError::from_store)?
    .ok_or_else(|| ApiError::NotFound(format!("review {id} not found")))?;
  Ok(Json(review))
}

/// `PUT /reviews/:id`: body: `{"rating":4.5,"comment":"..."}`
pub async fn update<S: TripStore>(
  State(store): State<Arc<S>>,
  Path(id): Path<Uuid>,
  Json(body): Json<ReviewUpdate>,
) -> Result<Json<Review>, ApiError> {
  let review = store
    .update_review(id, body)
    .await
    .map_err(ApiError::from_store)?;
  Ok(Json(review))
}

/// `DELETE /reviews/:id`
pub async fn delete_one<S: TripStore>(
  State(store): State<Arc<S>>,
  Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
  store.delete_review(id).await.map_err(ApiError::from_store)?;
  Ok(StatusCode::NO_CONTENT)
}
