//! Error types for `tripshare-core`.

use thiserror::Error;
use uuid::Uuid;

use crate::application::ApplicationStatus;

#[derive(Debug, Error)]
pub enum Error {
  #[error("proposal not found: {0}")]
  ProposalNotFound(Uuid),

  #[error("application not found: {0}")]
  ApplicationNotFound(Uuid),

  #[error("user not found: {0}")]
  UserNotFound(Uuid),

  #[error("review not found: {0}")]
  ReviewNotFound(Uuid),

  /// The proposal no longer has room for the application. Raised by both the
  /// pre-check and the in-transaction re-check of an acceptance.
  #[error(
    "proposal {proposal_id} cannot seat {requested} more participant(s); \
     {available} seat(s) left"
  )]
  CapacityConflict {
    proposal_id: Uuid,
    requested:   u32,
    available:   u32,
  },

  #[error("application {application_id} does not belong to proposal {proposal_id}")]
  ApplicationMismatch {
    application_id: Uuid,
    proposal_id:    Uuid,
  },

  #[error("application {application_id} cannot move from {from} to {to}")]
  InvalidTransition {
    application_id: Uuid,
    from:           ApplicationStatus,
    to:             ApplicationStatus,
  },

  #[error("proposal {0} is concluded")]
  ProposalConcluded(Uuid),

  #[error("application {application_id} has unknown status {value:?}")]
  UnknownApplicationStatus {
    application_id: Uuid,
    value:          String,
  },

  #[error("proposal {proposal_id} has unknown status {value:?}")]
  UnknownProposalStatus {
    proposal_id: Uuid,
    value:       String,
  },

  #[error("unknown notification kind: {0:?}")]
  UnknownNotificationKind(String),

  #[error(
    "invalid capacity: {participants_count} participant(s) for {max_participants} seat(s)"
  )]
  InvalidCapacity {
    max_participants:   u32,
    participants_count: u32,
  },

  #[error("rating must be a finite number between 0 and 5, got {0}")]
  InvalidRating(f64),

  #[error("user {0} cannot review themselves")]
  SelfReview(Uuid),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

// ─── Classification ──────────────────────────────────────────────────────────

/// Coarse error categories that callers act on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
  /// A referenced proposal, application, user, or review does not exist.
  NotFound,
  /// A concurrent acceptance filled the proposal first.
  CapacityConflict,
  /// The store kept seeing conflicting writes and gave up retrying.
  TransientConflict,
  /// A stored record could not be interpreted.
  DataIntegrity,
  /// The request itself is invalid for the current state.
  InvalidInput,
  Internal,
}

/// Implemented by every error type a [`crate::store::TripStore`] can return,
/// so higher layers can react to the kind without knowing the backend.
pub trait Classify {
  fn kind(&self) -> ErrorKind;
}

impl Classify for Error {
  fn kind(&self) -> ErrorKind {
    match self {
      Self::ProposalNotFound(_)
      | Self::ApplicationNotFound(_)
      | Self::UserNotFound(_)
      | Self::ReviewNotFound(_) => ErrorKind::NotFound,
      Self::CapacityConflict { .. } => ErrorKind::CapacityConflict,
      Self::ApplicationMismatch { .. }
      | Self::UnknownApplicationStatus { .. }
      | Self::UnknownProposalStatus { .. }
      | Self::UnknownNotificationKind(_) => ErrorKind::DataIntegrity,
      Self::InvalidTransition { .. }
      | Self::ProposalConcluded(_)
      | Self::InvalidCapacity { .. }
      | Self::InvalidRating(_)
      | Self::SelfReview(_) => ErrorKind::InvalidInput,
    }
  }
}
