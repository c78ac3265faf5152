//! Proposals: published trip offers with a finite number of seats.
//!
//! The counters on a proposal form its capacity ledger. They are derived from
//! the outcomes of its applications and are only ever changed by the
//! functions in [`crate::ledger`].

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Status ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ProposalStatus {
  /// Open for applications with at least one free seat.
  Published,
  /// Every seat is taken.
  Full,
  /// The trip is over. Terminal; never re-derived from the counters.
  Concluded,
  Unknown(String),
}

impl ProposalStatus {
  pub fn as_str(&self) -> &str {
    match self {
      Self::Published => "published",
      Self::Full => "full",
      Self::Concluded => "concluded",
      Self::Unknown(raw) => raw,
    }
  }

  pub fn parse(s: &str) -> Self {
    match s.to_ascii_lowercase().as_str() {
      "published" => Self::Published,
      "full" => Self::Full,
      "concluded" => Self::Concluded,
      _ => Self::Unknown(s.to_owned()),
    }
  }
}

impl fmt::Display for ProposalStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl From<String> for ProposalStatus {
  fn from(s: String) -> Self { Self::parse(&s) }
}

impl From<ProposalStatus> for String {
  fn from(status: ProposalStatus) -> Self { status.as_str().to_owned() }
}

// ─── Proposal ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Proposal {
  pub proposal_id:                Uuid,
  pub organizer_id:               Uuid,
  pub title:                      String,
  pub max_participants:           u32,
  /// Accepted occupants, organizer included.
  pub participants_count:         u32,
  pub pending_applications_count: u32,
  pub status:                     ProposalStatus,
  pub application_ids:            Vec<Uuid>,
  pub created_at:                 DateTime<Utc>,
}

impl Proposal {
  pub fn available_seats(&self) -> u32 {
    self.max_participants.saturating_sub(self.participants_count)
  }

  pub fn is_full(&self) -> bool {
    self.participants_count >= self.max_participants
  }

  /// Re-derive `Published` / `Full` from the counters. A concluded (or
  /// unreadable) status is left alone.
  pub fn settle_status(&mut self) {
    match self.status {
      ProposalStatus::Published | ProposalStatus::Full => {
        self.status = if self.is_full() {
          ProposalStatus::Full
        } else {
          ProposalStatus::Published
        };
      }
      ProposalStatus::Concluded | ProposalStatus::Unknown(_) => {}
    }
  }

  /// Whether the capacity ledger is internally consistent.
  pub fn is_consistent(&self) -> bool {
    let status_ok = match self.status {
      ProposalStatus::Full => self.is_full(),
      ProposalStatus::Published => !self.is_full(),
      ProposalStatus::Concluded => true,
      ProposalStatus::Unknown(_) => false,
    };
    self.participants_count <= self.max_participants && status_ok
  }
}

// ─── NewProposal ─────────────────────────────────────────────────────────────

/// Input to [`crate::store::TripStore::create_proposal`].
#[derive(Debug, Clone, Deserialize)]
pub struct NewProposal {
  pub organizer_id:       Uuid,
  pub title:              String,
  pub max_participants:   u32,
  /// Seats taken at creation time; the organizer counts as one.
  #[serde(default = "organizer_only")]
  pub participants_count: u32,
}

fn organizer_only() -> u32 { 1 }

impl NewProposal {
  /// A proposal whose only participant is the organizer.
  pub fn new(
    organizer_id: Uuid,
    title: impl Into<String>,
    max_participants: u32,
  ) -> Self {
    Self {
      organizer_id,
      title: title.into(),
      max_participants,
      participants_count: organizer_only(),
    }
  }

  /// Validate the capacity and build the persisted record.
  pub fn into_proposal(self, now: DateTime<Utc>) -> Result<Proposal> {
    if self.max_participants == 0
      || self.participants_count > self.max_participants
    {
      return Err(Error::InvalidCapacity {
        max_participants:   self.max_participants,
        participants_count: self.participants_count,
      });
    }

    let mut proposal = Proposal {
      proposal_id:                Uuid::new_v4(),
      organizer_id:               self.organizer_id,
      title:                      self.title,
      max_participants:           self.max_participants,
      participants_count:         self.participants_count,
      pending_applications_count: 0,
      status:                     ProposalStatus::Published,
      application_ids:            Vec::new(),
      created_at:                 now,
    };
    proposal.settle_status();
    Ok(proposal)
  }
}
