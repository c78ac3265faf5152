//! Notifications written to the outbox alongside protocol changes.
//!
//! Delivery is someone else's job: a dispatcher reads the outbox and pushes
//! each record to the recipient. This module only defines the payload and
//! how each protocol event phrases it.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  Error, Result,
  application::Application,
  proposal::Proposal,
  review::Review,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
  ApplicationSubmitted,
  ApplicationAccepted,
  ApplicationRejected,
  ApplicationCancelled,
  ApplicationWithdrawn,
  ReviewReceived,
}

impl NotificationKind {
  /// The type tag stored in the outbox. Matches the serde names above.
  pub fn as_str(self) -> &'static str {
    match self {
      Self::ApplicationSubmitted => "application_submitted",
      Self::ApplicationAccepted => "application_accepted",
      Self::ApplicationRejected => "application_rejected",
      Self::ApplicationCancelled => "application_cancelled",
      Self::ApplicationWithdrawn => "application_withdrawn",
      Self::ReviewReceived => "review_received",
    }
  }

  pub fn parse(s: &str) -> Result<Self> {
    match s {
      "application_submitted" => Ok(Self::ApplicationSubmitted),
      "application_accepted" => Ok(Self::ApplicationAccepted),
      "application_rejected" => Ok(Self::ApplicationRejected),
      "application_cancelled" => Ok(Self::ApplicationCancelled),
      "application_withdrawn" => Ok(Self::ApplicationWithdrawn),
      "review_received" => Ok(Self::ReviewReceived),
      other => Err(Error::UnknownNotificationKind(other.to_owned())),
    }
  }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
  pub notification_id: Uuid,
  pub recipient_id:    Uuid,
  pub kind:            NotificationKind,
  pub title:           String,
  pub body:            String,
  /// Ids of the records the notification is about, keyed by role.
  pub data:            BTreeMap<String, String>,
  pub created_at:      DateTime<Utc>,
}

fn application_data(
  proposal: &Proposal,
  application_id: Uuid,
) -> BTreeMap<String, String> {
  BTreeMap::from([
    ("proposal_id".to_owned(), proposal.proposal_id.to_string()),
    ("application_id".to_owned(), application_id.to_string()),
  ])
}

impl Notification {
  fn new(
    recipient_id: Uuid,
    kind: NotificationKind,
    title: String,
    body: String,
    data: BTreeMap<String, String>,
  ) -> Self {
    Self {
      notification_id: Uuid::new_v4(),
      recipient_id,
      kind,
      title,
      body,
      data,
      created_at: Utc::now(),
    }
  }

  /// Tell the organizer someone applied.
  pub fn application_submitted(proposal: &Proposal, application: &Application) -> Self {
    let mut data = application_data(proposal, application.application_id);
    data.insert("applicant_id".to_owned(), application.user_id.to_string());
    Self::new(
      proposal.organizer_id,
      NotificationKind::ApplicationSubmitted,
      "New application".to_owned(),
      format!(
        "Someone asked to join \"{}\" with {} seat(s).",
        proposal.title,
        application.seats()
      ),
      data,
    )
  }

  pub fn application_accepted(proposal: &Proposal, application: &Application) -> Self {
    Self::new(
      application.user_id,
      NotificationKind::ApplicationAccepted,
      "Application accepted".to_owned(),
      format!("You're in! Your application to \"{}\" was accepted.", proposal.title),
      application_data(proposal, application.application_id),
    )
  }

  pub fn application_rejected(proposal: &Proposal, application: &Application) -> Self {
    Self::new(
      application.user_id,
      NotificationKind::ApplicationRejected,
      "Application rejected".to_owned(),
      format!("Your application to \"{}\" was not accepted.", proposal.title),
      application_data(proposal, application.application_id),
    )
  }

  /// Tell an applicant the trip filled up before their turn.
  pub fn application_cancelled(proposal: &Proposal, application: &Application) -> Self {
    Self::new(
      application.user_id,
      NotificationKind::ApplicationCancelled,
      "Trip is full".to_owned(),
      format!("\"{}\" filled up, so your application was closed.", proposal.title),
      application_data(proposal, application.application_id),
    )
  }

  pub fn application_withdrawn(proposal: &Proposal, application: &Application) -> Self {
    let mut data = application_data(proposal, application.application_id);
    data.insert("applicant_id".to_owned(), application.user_id.to_string());
    Self::new(
      proposal.organizer_id,
      NotificationKind::ApplicationWithdrawn,
      "Application withdrawn".to_owned(),
      format!("An applicant withdrew from \"{}\".", proposal.title),
      data,
    )
  }

  pub fn review_received(review: &Review) -> Self {
    let mut data = BTreeMap::from([
      ("review_id".to_owned(), review.review_id.to_string()),
      ("reviewer_id".to_owned(), review.reviewer_id.to_string()),
    ]);
    if let Some(proposal_id) = review.proposal_id {
      data.insert("proposal_id".to_owned(), proposal_id.to_string());
    }
    Self::new(
      review.reviewed_user_id,
      NotificationKind::ReviewReceived,
      "New review".to_owned(),
      format!("You received a {:.1}-star review.", review.rating),
      data,
    )
  }
}
