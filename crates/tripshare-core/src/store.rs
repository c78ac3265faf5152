//! The `TripStore` trait.
//!
//! The trait is implemented by storage backends (e.g.
//! `tripshare-store-sqlite`). The HTTP layer depends on this abstraction, not
//! on any concrete backend.

use std::future::Future;

use serde::Serialize;
use uuid::Uuid;

use crate::{
  Classify,
  application::{Application, ApplicationStatus, NewApplication},
  notification::Notification,
  proposal::{NewProposal, Proposal},
  review::{NewReview, Review, ReviewUpdate},
  user::{NewUser, UserProfile},
};

/// The committed result of a capacity-protocol operation.
#[derive(Debug, Clone, Serialize)]
pub struct Transition {
  /// The proposal as written by the transaction.
  pub proposal:    Proposal,
  /// The target application after the change. For a withdrawal this is the
  /// record as it was just before deletion.
  pub application: Application,
  /// Siblings cancelled because an acceptance filled the proposal.
  pub cancelled:   Vec<Uuid>,
  /// `false` when the application was already in the requested state and
  /// nothing was written.
  pub changed:     bool,
}

/// Abstraction over a Tripshare store backend.
///
/// Every method that changes a proposal's counters, an application's status,
/// or a user's rating runs as one atomic transaction that re-reads the rows
/// it depends on. A transaction either commits all of its writes (including
/// outbox notifications) or none of them.
pub trait TripStore: Send + Sync {
  type Error: std::error::Error + Classify + Send + Sync + 'static;

  // ── Users ─────────────────────────────────────────────────────────────

  fn add_user(
    &self,
    input: NewUser,
  ) -> impl Future<Output = Result<UserProfile, Self::Error>> + Send + '_;

  /// Retrieve a user by UUID. Returns `None` if not found.
  fn get_user(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<UserProfile>, Self::Error>> + Send + '_;

  // ── Proposals ─────────────────────────────────────────────────────────

  /// Create a proposal. Fails if the organizer does not exist or the
  /// capacity is invalid.
  fn create_proposal(
    &self,
    input: NewProposal,
  ) -> impl Future<Output = Result<Proposal, Self::Error>> + Send + '_;

  fn get_proposal(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Proposal>, Self::Error>> + Send + '_;

  /// Mark a proposal as concluded. Idempotent.
  fn conclude_proposal(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Proposal, Self::Error>> + Send + '_;

  /// Delete a proposal together with all of its applications, unlinking
  /// them from their applicants.
  fn delete_proposal(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  // ── Applications: capacity protocol ──────────────────────────────────

  /// Submit a pending application and link it to its proposal and
  /// applicant. Capacity is not checked.
  fn add_application(
    &self,
    input: NewApplication,
  ) -> impl Future<Output = Result<Application, Self::Error>> + Send + '_;

  /// Delete an application, releasing its seats if it was accepted.
  fn withdraw_application(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Transition, Self::Error>> + Send + '_;

  /// Accept an application. If the proposal fills up, the remaining pending
  /// applications are cancelled in the same transaction.
  ///
  /// Fails with a [`crate::ErrorKind::CapacityConflict`] error if the seats
  /// are no longer available.
  fn accept_application(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Transition, Self::Error>> + Send + '_;

  /// Reject an application, releasing its seats if it was accepted.
  fn reject_application(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Transition, Self::Error>> + Send + '_;

  // ── Applications: reads ──────────────────────────────────────────────

  fn get_application(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Application>, Self::Error>> + Send + '_;

  /// List a proposal's applications, optionally restricted to one status.
  fn list_applications(
    &self,
    proposal_id: Uuid,
    status: Option<ApplicationStatus>,
  ) -> impl Future<Output = Result<Vec<Application>, Self::Error>> + Send + '_;

  fn list_user_applications(
    &self,
    user_id: Uuid,
  ) -> impl Future<Output = Result<Vec<Application>, Self::Error>> + Send + '_;

  // ── Reviews: rating aggregation ──────────────────────────────────────

  fn add_review(
    &self,
    input: NewReview,
  ) -> impl Future<Output = Result<Review, Self::Error>> + Send + '_;

  /// Change a review's rating and/or comment; the reviewee's mean is
  /// recomputed against the stored previous rating.
  fn update_review(
    &self,
    id: Uuid,
    update: ReviewUpdate,
  ) -> impl Future<Output = Result<Review, Self::Error>> + Send + '_;

  fn delete_review(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  fn get_review(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Review>, Self::Error>> + Send + '_;

  /// All reviews of a user, oldest first.
  fn list_reviews(
    &self,
    reviewed_user_id: Uuid,
  ) -> impl Future<Output = Result<Vec<Review>, Self::Error>> + Send + '_;

  // ── Outbox ────────────────────────────────────────────────────────────

  /// Notifications queued for a recipient, oldest first.
  fn list_notifications(
    &self,
    recipient_id: Uuid,
  ) -> impl Future<Output = Result<Vec<Notification>, Self::Error>> + Send + '_;
}
