//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are RFC 3339 strings, UUIDs are hyphenated lowercase strings,
//! and list-valued fields (id lists, guests, notification data) are compact
//! JSON. Statuses are stored as their lowercase names; unrecognised values
//! decode to the `Unknown` variant rather than failing.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use tripshare_core::{
  application::{Application, ApplicationStatus, Guest},
  notification::{Notification, NotificationKind},
  proposal::{Proposal, ProposalStatus},
  review::Review,
  user::UserProfile,
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Scalars ─────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── JSON columns ────────────────────────────────────────────────────────────

pub fn encode_ids(ids: &[Uuid]) -> Result<String> {
  Ok(serde_json::to_string(ids)?)
}

pub fn decode_ids(s: &str) -> Result<Vec<Uuid>> { Ok(serde_json::from_str(s)?) }

pub fn encode_guests(guests: &[Guest]) -> Result<String> {
  Ok(serde_json::to_string(guests)?)
}

pub fn decode_guests(s: &str) -> Result<Vec<Guest>> {
  Ok(serde_json::from_str(s)?)
}

pub fn encode_data(data: &BTreeMap<String, String>) -> Result<String> {
  Ok(serde_json::to_string(data)?)
}

pub fn decode_data(s: &str) -> Result<BTreeMap<String, String>> {
  Ok(serde_json::from_str(s)?)
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// A decoded row together with the optimistic-concurrency version it was
/// read at.
#[derive(Debug, Clone)]
pub struct Versioned<T> {
  pub record:  T,
  pub version: i64,
}

pub const USER_COLUMNS: &str = "user_id, display_name, rating, number_of_reviews, \
   application_ids, version, created_at";

/// Raw values read directly from a `users` row.
pub struct RawUser {
  pub user_id:           String,
  pub display_name:      String,
  pub rating:            f64,
  pub number_of_reviews: u32,
  pub application_ids:   String,
  pub version:           i64,
  pub created_at:        String,
}

impl RawUser {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      user_id:           row.get(0)?,
      display_name:      row.get(1)?,
      rating:            row.get(2)?,
      number_of_reviews: row.get(3)?,
      application_ids:   row.get(4)?,
      version:           row.get(5)?,
      created_at:        row.get(6)?,
    })
  }

  pub fn into_user(self) -> Result<Versioned<UserProfile>> {
    Ok(Versioned {
      record:  UserProfile {
        user_id:           decode_uuid(&self.user_id)?,
        display_name:      self.display_name,
        rating:            self.rating,
        number_of_reviews: self.number_of_reviews,
        application_ids:   decode_ids(&self.application_ids)?,
        created_at:        decode_dt(&self.created_at)?,
      },
      version: self.version,
    })
  }
}

pub const PROPOSAL_COLUMNS: &str = "proposal_id, organizer_id, title, max_participants, \
   participants_count, pending_applications_count, status, application_ids, \
   version, created_at";

/// Raw values read directly from a `proposals` row.
pub struct RawProposal {
  pub proposal_id:                String,
  pub organizer_id:               String,
  pub title:                      String,
  pub max_participants:           u32,
  pub participants_count:         u32,
  pub pending_applications_count: u32,
  pub status:                     String,
  pub application_ids:            String,
  pub version:                    i64,
  pub created_at:                 String,
}

impl RawProposal {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      proposal_id:                row.get(0)?,
      organizer_id:               row.get(1)?,
      title:                      row.get(2)?,
      max_participants:           row.get(3)?,
      participants_count:         row.get(4)?,
      pending_applications_count: row.get(5)?,
      status:                     row.get(6)?,
      application_ids:            row.get(7)?,
      version:                    row.get(8)?,
      created_at:                 row.get(9)?,
    })
  }

  pub fn into_proposal(self) -> Result<Versioned<Proposal>> {
    Ok(Versioned {
      record:  Proposal {
        proposal_id:                decode_uuid(&self.proposal_id)?,
        organizer_id:               decode_uuid(&self.organizer_id)?,
        title:                      self.title,
        max_participants:           self.max_participants,
        participants_count:         self.participants_count,
        pending_applications_count: self.pending_applications_count,
        status:                     ProposalStatus::parse(&self.status),
        application_ids:            decode_ids(&self.application_ids)?,
        created_at:                 decode_dt(&self.created_at)?,
      },
      version: self.version,
    })
  }
}

pub const APPLICATION_COLUMNS: &str = "application_id, proposal_id, user_id, status, \
   guests, motivation, created_at, updated_at";

/// Raw values read directly from an `applications` row.
pub struct RawApplication {
  pub application_id: String,
  pub proposal_id:    String,
  pub user_id:        String,
  pub status:         String,
  pub guests:         String,
  pub motivation:     String,
  pub created_at:     String,
  pub updated_at:     String,
}

impl RawApplication {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      application_id: row.get(0)?,
      proposal_id:    row.get(1)?,
      user_id:        row.get(2)?,
      status:         row.get(3)?,
      guests:         row.get(4)?,
      motivation:     row.get(5)?,
      created_at:     row.get(6)?,
      updated_at:     row.get(7)?,
    })
  }

  pub fn into_application(self) -> Result<Application> {
    Ok(Application {
      application_id: decode_uuid(&self.application_id)?,
      proposal_id:    decode_uuid(&self.proposal_id)?,
      user_id:        decode_uuid(&self.user_id)?,
      guests:         decode_guests(&self.guests)?,
      motivation:     self.motivation,
      status:         ApplicationStatus::parse(&self.status),
      created_at:     decode_dt(&self.created_at)?,
      updated_at:     decode_dt(&self.updated_at)?,
    })
  }
}

pub const REVIEW_COLUMNS: &str = "review_id, reviewed_user_id, reviewer_id, proposal_id, \
   rating, comment, created_at, updated_at";

/// Raw values read directly from a `reviews` row.
pub struct RawReview {
  pub review_id:        String,
  pub reviewed_user_id: String,
  pub reviewer_id:      String,
  pub proposal_id:      Option<String>,
  pub rating:           f64,
  pub comment:          String,
  pub created_at:       String,
  pub updated_at:       String,
}

impl RawReview {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      review_id:        row.get(0)?,
      reviewed_user_id: row.get(1)?,
      reviewer_id:      row.get(2)?,
      proposal_id:      row.get(3)?,
      rating:           row.get(4)?,
      comment:          row.get(5)?,
      created_at:       row.get(6)?,
      updated_at:       row.get(7)?,
    })
  }

  pub fn into_review(self) -> Result<Review> {
    Ok(Review {
      review_id:        decode_uuid(&self.review_id)?,
      reviewed_user_id: decode_uuid(&self.reviewed_user_id)?,
      reviewer_id:      decode_uuid(&self.reviewer_id)?,
      proposal_id:      self.proposal_id.as_deref().map(decode_uuid).transpose()?,
      rating:           self.rating,
      comment:          self.comment,
      created_at:       decode_dt(&self.created_at)?,
      updated_at:       decode_dt(&self.updated_at)?,
    })
  }
}

pub const NOTIFICATION_COLUMNS: &str =
  "notification_id, recipient_id, kind, title, body, data_json, created_at";

/// Raw values read directly from a `notifications` row.
pub struct RawNotification {
  pub notification_id: String,
  pub recipient_id:    String,
  pub kind:            String,
  pub title:           String,
  pub body:            String,
  pub data_json:       String,
  pub created_at:      String,
}

impl RawNotification {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      notification_id: row.get(0)?,
      recipient_id:    row.get(1)?,
      kind:            row.get(2)?,
      title:           row.get(3)?,
      body:            row.get(4)?,
      data_json:       row.get(5)?,
      created_at:      row.get(6)?,
    })
  }

  pub fn into_notification(self) -> Result<Notification> {
    Ok(Notification {
      notification_id: decode_uuid(&self.notification_id)?,
      recipient_id:    decode_uuid(&self.recipient_id)?,
      kind:            NotificationKind::parse(&self.kind)?,
      title:           self.title,
      body:            self.body,
      data:            decode_data(&self.data_json)?,
      created_at:      decode_dt(&self.created_at)?,
    })
  }
}
