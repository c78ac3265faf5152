//! Applications: a user's request (plus accompanying guests) to join a
//! proposal.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ─── Status ──────────────────────────────────────────────────────────────────

/// Where an application sits in its lifecycle.
///
/// `Pending` is the only initial state and is never re-entered. Values that
/// fail to parse are kept as [`ApplicationStatus::Unknown`] so that the
/// ledger can refuse to act on them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ApplicationStatus {
  Pending,
  Accepted,
  Rejected,
  /// Closed automatically when a sibling's acceptance filled the proposal.
  Cancelled,
  Unknown(String),
}

impl ApplicationStatus {
  /// The string stored in the `status` column.
  pub fn as_str(&self) -> &str {
    match self {
      Self::Pending => "pending",
      Self::Accepted => "accepted",
      Self::Rejected => "rejected",
      Self::Cancelled => "cancelled",
      Self::Unknown(raw) => raw,
    }
  }

  pub fn parse(s: &str) -> Self {
    match s.to_ascii_lowercase().as_str() {
      "pending" => Self::Pending,
      "accepted" => Self::Accepted,
      "rejected" => Self::Rejected,
      "cancelled" | "canceled" => Self::Cancelled,
      _ => Self::Unknown(s.to_owned()),
    }
  }
}

impl fmt::Display for ApplicationStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl From<String> for ApplicationStatus {
  fn from(s: String) -> Self { Self::parse(&s) }
}

impl From<ApplicationStatus> for String {
  fn from(status: ApplicationStatus) -> Self { status.as_str().to_owned() }
}

// ─── Guests ──────────────────────────────────────────────────────────────────

/// Someone travelling with the applicant. Each guest takes one seat.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Guest {
  pub name:  String,
  pub email: String,
}

// ─── Application ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Application {
  pub application_id: Uuid,
  pub proposal_id:    Uuid,
  /// The applicant.
  pub user_id:        Uuid,
  pub guests:         Vec<Guest>,
  pub motivation:     String,
  pub status:         ApplicationStatus,
  pub created_at:     DateTime<Utc>,
  pub updated_at:     DateTime<Utc>,
}

impl Application {
  /// Seats this application occupies once accepted: the applicant plus one
  /// per guest.
  pub fn seats(&self) -> u32 {
    u32::try_from(self.guests.len())
      .unwrap_or(u32::MAX)
      .saturating_add(1)
  }
}

/// Input to [`crate::store::TripStore::add_application`].
#[derive(Debug, Clone, Deserialize)]
pub struct NewApplication {
  pub proposal_id: Uuid,
  pub user_id:     Uuid,
  #[serde(default)]
  pub guests:      Vec<Guest>,
  #[serde(default)]
  pub motivation:  String,
}

impl NewApplication {
  pub fn new(proposal_id: Uuid, user_id: Uuid) -> Self {
    Self {
      proposal_id,
      user_id,
      guests: Vec::new(),
      motivation: String::new(),
    }
  }

  /// Build the persisted record. Every application starts out pending.
  pub fn into_application(self, now: DateTime<Utc>) -> Application {
    Application {
      application_id: Uuid::new_v4(),
      proposal_id:    self.proposal_id,
      user_id:        self.user_id,
      guests:         self.guests,
      motivation:     self.motivation,
      status:         ApplicationStatus::Pending,
      created_at:     now,
      updated_at:     now,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn status_parses_case_insensitively() {
    assert_eq!(ApplicationStatus::parse("Accepted"), ApplicationStatus::Accepted);
    assert_eq!(ApplicationStatus::parse("CANCELED"), ApplicationStatus::Cancelled);
  }

  #[test]
  fn unparseable_status_is_kept_verbatim() {
    let status = ApplicationStatus::parse("on_hold");
    assert_eq!(status, ApplicationStatus::Unknown("on_hold".into()));
    assert_eq!(status.as_str(), "on_hold");
  }

  #[test]
  fn status_serializes_as_plain_string() {
    let json = serde_json::to_string(&ApplicationStatus::Pending).unwrap();
    assert_eq!(json, "\"pending\"");
    let back: ApplicationStatus = serde_json::from_str("\"rejected\"").unwrap();
    assert_eq!(back, ApplicationStatus::Rejected);
  }

  #[test]
  fn seats_count_applicant_and_guests() {
    let mut app = NewApplication::new(Uuid::new_v4(), Uuid::new_v4())
      .into_application(Utc::now());
    assert_eq!(app.seats(), 1);
    app.guests = vec![
      Guest { name: "Ada".into(), email: "ada@example.com".into() },
      Guest { name: "Bo".into(), email: "bo@example.com".into() },
    ];
    assert_eq!(app.seats(), 3);
  }
}
