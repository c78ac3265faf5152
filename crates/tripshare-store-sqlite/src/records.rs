//! Row-level reads and writes used inside store transactions.
//!
//! Everything here is synchronous and takes a plain [`Connection`]; callers
//! pass the open [`rusqlite::Transaction`] (which derefs to one). Writes to
//! `proposals` and `users` are compare-and-swap on the `version` column read
//! earlier in the same transaction.

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension as _, params};
use tripshare_core::{
  Error as CoreError,
  application::{Application, ApplicationStatus},
  notification::Notification,
  proposal::Proposal,
  review::Review,
  user::UserProfile,
};
use uuid::Uuid;

use crate::{
  Error, Result,
  encode::{
    APPLICATION_COLUMNS, NOTIFICATION_COLUMNS, PROPOSAL_COLUMNS, RawApplication,
    RawNotification, RawProposal, RawReview, RawUser, REVIEW_COLUMNS, USER_COLUMNS,
    Versioned, encode_data, encode_dt, encode_guests, encode_ids, encode_uuid,
  },
};

/// Fail with [`Error::VersionConflict`] unless exactly one row was updated.
fn expect_one(
  updated: usize,
  table: &'static str,
  id: Uuid,
) -> Result<()> {
  if updated == 1 {
    Ok(())
  } else {
    Err(Error::VersionConflict { table, id })
  }
}

// ─── Users ───────────────────────────────────────────────────────────────────

pub fn find_user(conn: &Connection, id: Uuid) -> Result<Option<Versioned<UserProfile>>> {
  let raw = conn
    .query_row(
      &format!("SELECT {USER_COLUMNS} FROM users WHERE user_id = ?1"),
      params![encode_uuid(id)],
      RawUser::from_row,
    )
    .optional()?;
  raw.map(RawUser::into_user).transpose()
}

pub fn load_user(conn: &Connection, id: Uuid) -> Result<Versioned<UserProfile>> {
  find_user(conn, id)?.ok_or(Error::Core(CoreError::UserNotFound(id)))
}

pub fn insert_user(conn: &Connection, user: &UserProfile) -> Result<()> {
  conn.execute(
    "INSERT INTO users (user_id, display_name, rating, number_of_reviews,
                        application_ids, version, created_at)
     VALUES (?1, ?2, ?3, ?4, ?5, 0, ?6)",
    params![
      encode_uuid(user.user_id),
      user.display_name,
      user.rating,
      user.number_of_reviews,
      encode_ids(&user.application_ids)?,
      encode_dt(user.created_at),
    ],
  )?;
  Ok(())
}

/// Write back the mutable parts of a profile: its rating aggregate and its
/// application list.
pub fn write_user(conn: &Connection, user: &UserProfile, version: i64) -> Result<()> {
  let updated = conn.execute(
    "UPDATE users
        SET rating = ?2, number_of_reviews = ?3, application_ids = ?4,
            version = version + 1
      WHERE user_id = ?1 AND version = ?5",
    params![
      encode_uuid(user.user_id),
      user.rating,
      user.number_of_reviews,
      encode_ids(&user.application_ids)?,
      version,
    ],
  )?;
  expect_one(updated, "users", user.user_id)
}

/// Remove an application from its applicant's list. A missing applicant is
/// not an error: there is nothing left to unlink.
pub fn unlink_user_application(
  conn: &Connection,
  user_id: Uuid,
  application_id: Uuid,
) -> Result<()> {
  if let Some(Versioned { mut record, version }) = find_user(conn, user_id)? {
    record.application_ids.retain(|id| *id != application_id);
    write_user(conn, &record, version)?;
  }
  Ok(())
}

// ─── Proposals ───────────────────────────────────────────────────────────────

pub fn find_proposal(conn: &Connection, id: Uuid) -> Result<Option<Versioned<Proposal>>> {
  let raw = conn
    .query_row(
      &format!("SELECT {PROPOSAL_COLUMNS} FROM proposals WHERE proposal_id = ?1"),
      params![encode_uuid(id)],
      RawProposal::from_row,
    )
    .optional()?;
  raw.map(RawProposal::into_proposal).transpose()
}

pub fn load_proposal(conn: &Connection, id: Uuid) -> Result<Versioned<Proposal>> {
  find_proposal(conn, id)?.ok_or(Error::Core(CoreError::ProposalNotFound(id)))
}

pub fn insert_proposal(conn: &Connection, proposal: &Proposal) -> Result<()> {
  conn.execute(
    "INSERT INTO proposals (
       proposal_id, organizer_id, title, max_participants, participants_count,
       pending_applications_count, status, application_ids, version, created_at
     ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, 0, ?9)",
    params![
      encode_uuid(proposal.proposal_id),
      encode_uuid(proposal.organizer_id),
      proposal.title,
      proposal.max_participants,
      proposal.participants_count,
      proposal.pending_applications_count,
      proposal.status.as_str(),
      encode_ids(&proposal.application_ids)?,
      encode_dt(proposal.created_at),
    ],
  )?;
  Ok(())
}

/// Write back the capacity ledger of a proposal read at `version`.
pub fn write_proposal(conn: &Connection, proposal: &Proposal, version: i64) -> Result<()> {
  let updated = conn.execute(
    "UPDATE proposals
        SET participants_count = ?2, pending_applications_count = ?3,
            status = ?4, application_ids = ?5, version = version + 1
      WHERE proposal_id = ?1 AND version = ?6",
    params![
      encode_uuid(proposal.proposal_id),
      proposal.participants_count,
      proposal.pending_applications_count,
      proposal.status.as_str(),
      encode_ids(&proposal.application_ids)?,
      version,
    ],
  )?;
  expect_one(updated, "proposals", proposal.proposal_id)
}

pub fn delete_proposal(conn: &Connection, id: Uuid) -> Result<()> {
  conn.execute(
    "DELETE FROM proposals WHERE proposal_id = ?1",
    params![encode_uuid(id)],
  )?;
  Ok(())
}

// ─── Applications ────────────────────────────────────────────────────────────

pub fn find_application(conn: &Connection, id: Uuid) -> Result<Option<Application>> {
  let raw = conn
    .query_row(
      &format!("SELECT {APPLICATION_COLUMNS} FROM applications WHERE application_id = ?1"),
      params![encode_uuid(id)],
      RawApplication::from_row,
    )
    .optional()?;
  raw.map(RawApplication::into_application).transpose()
}

pub fn load_application(conn: &Connection, id: Uuid) -> Result<Application> {
  find_application(conn, id)?.ok_or(Error::Core(CoreError::ApplicationNotFound(id)))
}

/// Applications of one proposal in submission order, optionally filtered by
/// status.
pub fn list_applications(
  conn: &Connection,
  proposal_id: Uuid,
  status: Option<&ApplicationStatus>,
) -> Result<Vec<Application>> {
  let mut stmt = conn.prepare(&format!(
    "SELECT {APPLICATION_COLUMNS} FROM applications
      WHERE proposal_id = ?1 AND (?2 IS NULL OR status = ?2)
      ORDER BY rowid"
  ))?;
  let raws = stmt
    .query_map(
      params![encode_uuid(proposal_id), status.map(ApplicationStatus::as_str)],
      RawApplication::from_row,
    )?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  raws.into_iter().map(RawApplication::into_application).collect()
}

pub fn list_user_applications(conn: &Connection, user_id: Uuid) -> Result<Vec<Application>> {
  let mut stmt = conn.prepare(&format!(
    "SELECT {APPLICATION_COLUMNS} FROM applications WHERE user_id = ?1 ORDER BY rowid"
  ))?;
  let raws = stmt
    .query_map(params![encode_uuid(user_id)], RawApplication::from_row)?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  raws.into_iter().map(RawApplication::into_application).collect()
}

pub fn insert_application(conn: &Connection, application: &Application) -> Result<()> {
  conn.execute(
    "INSERT INTO applications (
       application_id, proposal_id, user_id, status, guests, motivation,
       created_at, updated_at
     ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
    params![
      encode_uuid(application.application_id),
      encode_uuid(application.proposal_id),
      encode_uuid(application.user_id),
      application.status.as_str(),
      encode_guests(&application.guests)?,
      application.motivation,
      encode_dt(application.created_at),
      encode_dt(application.updated_at),
    ],
  )?;
  Ok(())
}

pub fn set_application_status(
  conn: &Connection,
  id: Uuid,
  status: &ApplicationStatus,
  at: DateTime<Utc>,
) -> Result<()> {
  conn.execute(
    "UPDATE applications SET status = ?2, updated_at = ?3 WHERE application_id = ?1",
    params![encode_uuid(id), status.as_str(), encode_dt(at)],
  )?;
  Ok(())
}

pub fn delete_application(conn: &Connection, id: Uuid) -> Result<()> {
  conn.execute(
    "DELETE FROM applications WHERE application_id = ?1",
    params![encode_uuid(id)],
  )?;
  Ok(())
}

// ─── Reviews ─────────────────────────────────────────────────────────────────

pub fn find_review(conn: &Connection, id: Uuid) -> Result<Option<Review>> {
  let raw = conn
    .query_row(
      &format!("SELECT {REVIEW_COLUMNS} FROM reviews WHERE review_id = ?1"),
      params![encode_uuid(id)],
      RawReview::from_row,
    )
    .optional()?;
  raw.map(RawReview::into_review).transpose()
}

pub fn load_review(conn: &Connection, id: Uuid) -> Result<Review> {
  find_review(conn, id)?.ok_or(Error::Core(CoreError::ReviewNotFound(id)))
}

pub fn list_reviews(conn: &Connection, reviewed_user_id: Uuid) -> Result<Vec<Review>> {
  let mut stmt = conn.prepare(&format!(
    "SELECT {REVIEW_COLUMNS} FROM reviews WHERE reviewed_user_id = ?1 ORDER BY rowid"
  ))?;
  let raws = stmt
    .query_map(params![encode_uuid(reviewed_user_id)], RawReview::from_row)?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  raws.into_iter().map(RawReview::into_review).collect()
}

pub fn insert_review(conn: &Connection, review: &Review) -> Result<()> {
  conn.execute(
    "INSERT INTO reviews (
       review_id, reviewed_user_id, reviewer_id, proposal_id, rating, comment,
       created_at, updated_at
     ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
    params![
      encode_uuid(review.review_id),
      encode_uuid(review.reviewed_user_id),
      encode_uuid(review.reviewer_id),
      review.proposal_id.map(encode_uuid),
      review.rating,
      review.comment,
      encode_dt(review.created_at),
      encode_dt(review.updated_at),
    ],
  )?;
  Ok(())
}

pub fn update_review(conn: &Connection, review: &Review) -> Result<()> {
  conn.execute(
    "UPDATE reviews SET rating = ?2, comment = ?3, updated_at = ?4 WHERE review_id = ?1",
    params![
      encode_uuid(review.review_id),
      review.rating,
      review.comment,
      encode_dt(review.updated_at),
    ],
  )?;
  Ok(())
}

pub fn delete_review(conn: &Connection, id: Uuid) -> Result<()> {
  conn.execute("DELETE FROM reviews WHERE review_id = ?1", params![encode_uuid(id)])?;
  Ok(())
}

// ─── Outbox ──────────────────────────────────────────────────────────────────

pub fn insert_notification(conn: &Connection, n: &Notification) -> Result<()> {
  conn.execute(
    "INSERT INTO notifications (
       notification_id, recipient_id, kind, title, body, data_json, created_at
     ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
    params![
      encode_uuid(n.notification_id),
      encode_uuid(n.recipient_id),
      n.kind.as_str(),
      n.title,
      n.body,
      encode_data(&n.data)?,
      encode_dt(n.created_at),
    ],
  )?;
  Ok(())
}

pub fn list_notifications(conn: &Connection, recipient_id: Uuid) -> Result<Vec<Notification>> {
  let mut stmt = conn.prepare(&format!(
    "SELECT {NOTIFICATION_COLUMNS} FROM notifications WHERE recipient_id = ?1 ORDER BY rowid"
  ))?;
  let raws = stmt
    .query_map(params![encode_uuid(recipient_id)], RawNotification::from_row)?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  raws.into_iter().map(RawNotification::into_notification).collect()
}
