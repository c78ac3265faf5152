//! Handlers for `/proposals` endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `POST`   | `/proposals` | Body: [`NewProposal`]; returns 201 |
//! | `GET`    | `/proposals/:id` | 404 if not found |
//! | `DELETE` | `/proposals/:id` | Removes the proposal and its applications; 204 |
//! | `POST`   | `/proposals/:id/conclude` | Idempotent |
//! | `GET`    | `/proposals/:id/applications` | Optional `?status=pending\|accepted\|...` |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use serde::Deserialize;
use tripshare_core::{
  application::{Application, ApplicationStatus},
  proposal::{NewProposal, Proposal},
  store::TripStore,
};
use uuid::Uuid;

use crate::error::ApiError;

// ─── Create ───────────────────────────────────────────────────────────────────

/// `POST /proposals`
pub async fn create<S: TripStore>(
  State(store): State<Arc<S>>,
  Json(body): Json<NewProposal>,
) -> Result<impl IntoResponse, ApiError> {
  let proposal = store
    .create_proposal(body)
    .await
    .map_err(ApiError::from_store)?;
  Ok((StatusCode::CREATED, Json(proposal)))
}

// ─── Get / delete ─────────────────────────────────────────────────────────────

/// `GET /proposals/:id`
pub async fn get_one<S: TripStore>(
  State(store): State<Arc<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Proposal>, ApiError> {
  let proposal = store
    .get_proposal(id)
    .await
    .map_err(ApiError::from_store)?
    .ok_or_else(|| ApiError::NotFound(format!("proposal {id} not found")))?;
  Ok(Json(proposal))
}

/// `DELETE /proposals/:id`
pub async fn delete_one<S: TripStore>(
  State(store): State<Arc<S>>,
  Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
  store.delete_proposal(id).await.map_err(ApiError::from_store)?;
  Ok(StatusCode::NO_CONTENT)
}

// ─── Conclude ─────────────────────────────────────────────────────────────────

/// `POST /proposals/:id/conclude`
pub async fn conclude<S: TripStore>(
  State(store): State<Arc<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Proposal>, ApiError> {
  let proposal = store
    .conclude_proposal(id)
    .await
    .map_err(ApiError::from_store)?;
  Ok(Json(proposal))
}

// ─── Applications ─────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ApplicationParams {
  pub status: Option<ApplicationStatus>,
}

/// `GET /proposals/:id/applications[?status=<status>]`
pub async fn applications<S: TripStore>(
  State(store): State<Arc<S>>,
  Path(id): Path<Uuid>,
  Query(params): Query<ApplicationParams>,
) -> Result<Json<Vec<Application>>, ApiError> {
  let applications = store
    .list_applications(id, params.status)
    .await
    .map_err(ApiError::from_store)?;
  Ok(Json(applications))
}
