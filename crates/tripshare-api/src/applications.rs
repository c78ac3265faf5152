//! Handlers for `/applications` endpoints.
//!
//! The transitions return a [`Transition`]: the proposal after the change, the
//! application, and any siblings cancelled because the proposal filled up.
//! An acceptance that loses the race for the last seats answers `409`.

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use tripshare_core::{
  application::{Application, NewApplication},
  store::{Transition, TripStore},
};
use uuid::Uuid;

use crate::error::ApiError;

/// `POST /applications`
pub async fn create<S: TripStore>(
  State(store): State<Arc<S>>,
  Json(body): Json<NewApplication>,
) -> Result<impl IntoResponse, ApiError> {
  let application = store
    .add_application(body)
    .await
    .map_err(ApiError::from_store)?;
  Ok((StatusCode::CREATED, Json(application)))
}

/// `GET /applications/:id`
pub async fn get_one<S: TripStore>(
  State(store): State<Arc<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Application>, ApiError> {
  let application = store
    .get_application(id)
    .await
    .map_err(ApiError::from_store)?
    .ok_or_else(|| ApiError::NotFound(format!("application {id} not found")))?;
  Ok(Json(application))
}

/// `DELETE /applications/:id`: the applicant withdraws.
pub async fn withdraw<S: TripStore>(
  State(store): State<Arc<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Transition>, ApiError> {
  let transition = store
    .withdraw_application(id)
    .await
    .map_err(ApiError::from_store)?;
  Ok(Json(transition))
}

/// `POST /applications/:id/accept`
pub async fn accept<S: TripStore>(
  State(store): State<Arc<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Transition>, ApiError> {
  let transition = store
    .accept_application(id)
    .await
    .map_err(ApiError::from_store)?;
  Ok(Json(transition))
}

/// `POST /applications/:id/reject`
pub async fn reject<S: TripStore>(
  State(store): State<Arc<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Transition>, ApiError> {
  let transition = store
    .reject_application(id)
    .await
    .map_err(ApiError::from_store)?;
  Ok(Json(transition))
}
