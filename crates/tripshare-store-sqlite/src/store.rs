//! [`SqliteStore`]: the SQLite implementation of [`TripStore`].

use std::{path::Path, sync::Arc, time::Duration};

use chrono::Utc;
use rusqlite::{Transaction, TransactionBehavior};
use tracing::{debug, info, warn};
use uuid::Uuid;

use tripshare_core::{
  application::{Application, ApplicationStatus, NewApplication},
  ledger::{self, Acceptance, Decision},
  notification::Notification,
  proposal::{NewProposal, Proposal},
  review::{NewReview, Review, ReviewUpdate, validate_rating},
  store::{Transition, TripStore},
  user::{NewUser, UserProfile},
};

use crate::{Error, Result, records, schema::SCHEMA};

// ─── Options ─────────────────────────────────────────────────────────────────

/// Tuning for transaction retries.
#[derive(Debug, Clone)]
pub struct StoreOptions {
  /// How many times a transaction is attempted before giving up on
  /// conflicting writers.
  pub max_attempts:  u32,
  /// Sleep between attempts, multiplied by the attempt number.
  pub retry_backoff: Duration,
  /// How long SQLite waits on a locked database before reporting busy.
  pub busy_timeout:  Duration,
}

impl Default for StoreOptions {
  fn default() -> Self {
    Self {
      max_attempts:  5,
      retry_backoff: Duration::from_millis(20),
      busy_timeout:  Duration::from_secs(5),
    }
  }
}

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Tripshare store backed by a single SQLite file.
///
/// Cloning is cheap: the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  pub(crate) conn: tokio_rusqlite::Connection,
  options:         Arc<StoreOptions>,
}

impl SqliteStore {
  /// Open (or create) a store at `path` with default options.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    Self::open_with(path, StoreOptions::default()).await
  }

  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open_with(path: impl AsRef<Path>, options: StoreOptions) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn, options: Arc::new(options) };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, for tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn, options: Arc::new(StoreOptions::default()) };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    let busy_timeout = self.options.busy_timeout;
    self
      .conn
      .call(move |conn| {
        conn.busy_timeout(busy_timeout)?;
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Run `work` inside an `IMMEDIATE` transaction, retrying the whole closure
  /// when it fails with a transient error (a version conflict or a busy
  /// database). Any other error rolls back and is returned as-is.
  pub(crate) async fn transact<T, F>(&self, operation: &'static str, work: F) -> Result<T>
  where
    T: Send + 'static,
    F: Fn(&Transaction<'_>) -> Result<T> + Send + Sync + 'static,
  {
    let work = Arc::new(work);
    let attempts = self.options.max_attempts.max(1);

    for attempt in 1..=attempts {
      let work = Arc::clone(&work);
      let outcome = self
        .conn
        .call(move |conn| Ok(run_in_transaction(conn, work.as_ref())))
        .await?;

      match outcome {
        Err(e) if e.is_transient() => {
          warn!(operation, attempt, error = %e, "transaction conflict");
          if attempt < attempts {
            tokio::time::sleep(self.options.retry_backoff * attempt).await;
          }
        }
        other => return other,
      }
    }

    Err(Error::RetriesExhausted { operation, attempts })
  }

  /// Run a single statement or query on the connection thread, outside any
  /// explicit transaction.
  async fn run<T, F>(&self, query: F) -> Result<T>
  where
    T: Send + 'static,
    F: FnOnce(&rusqlite::Connection) -> Result<T> + Send + 'static,
  {
    self.conn.call(move |conn| Ok(query(&*conn))).await?
  }
}

fn run_in_transaction<T, F>(conn: &mut rusqlite::Connection, work: &F) -> Result<T>
where
  F: Fn(&Transaction<'_>) -> Result<T>,
{
  let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
  let value = work(&tx)?;
  tx.commit()?;
  Ok(value)
}

fn unchanged(proposal: Proposal, application: Application) -> Transition {
  Transition { proposal, application, cancelled: Vec::new(), changed: false }
}

// ─── TripStore impl ──────────────────────────────────────────────────────────

impl TripStore for SqliteStore {
  type Error = Error;

  // ── Users ─────────────────────────────────────────────────────────────────

  async fn add_user(&self, input: NewUser) -> Result<UserProfile> {
    let user = input.into_profile(Utc::now());
    let row = user.clone();
    self.run(move |conn| records::insert_user(conn, &row)).await?;
    debug!(user_id = %user.user_id, "user created");
    Ok(user)
  }

  async fn get_user(&self, id: Uuid) -> Result<Option<UserProfile>> {
    let found = self.run(move |conn| records::find_user(conn, id)).await?;
    Ok(found.map(|v| v.record))
  }

  // ── Proposals ─────────────────────────────────────────────────────────────

  async fn create_proposal(&self, input: NewProposal) -> Result<Proposal> {
    let proposal = self
      .transact("create_proposal", move |tx| {
        records::load_user(tx, input.organizer_id)?;
        let proposal = input.clone().into_proposal(Utc::now())?;
        records::insert_proposal(tx, &proposal)?;
        Ok(proposal)
      })
      .await?;
    info!(
      proposal_id = %proposal.proposal_id,
      max_participants = proposal.max_participants,
      "proposal published"
    );
    Ok(proposal)
  }

  async fn get_proposal(&self, id: Uuid) -> Result<Option<Proposal>> {
    let found = self.run(move |conn| records::find_proposal(conn, id)).await?;
    Ok(found.map(|v| v.record))
  }

  async fn conclude_proposal(&self, id: Uuid) -> Result<Proposal> {
    self
      .transact("conclude_proposal", move |tx| {
        let current = records::load_proposal(tx, id)?;
        let next = match ledger::conclude(&current.record)? {
          Decision::Apply(next) => next,
          Decision::NoOp => return Ok(current.record),
        };
        records::write_proposal(tx, &next, current.version)?;
        info!(proposal_id = %id, "proposal concluded");
        Ok(next)
      })
      .await
  }

  async fn delete_proposal(&self, id: Uuid) -> Result<()> {
    self
      .transact("delete_proposal", move |tx| {
        records::load_proposal(tx, id)?;
        let applications = records::list_applications(tx, id, None)?;
        for application in &applications {
          records::unlink_user_application(tx, application.user_id, application.application_id)?;
          records::delete_application(tx, application.application_id)?;
        }
        records::delete_proposal(tx, id)?;
        info!(proposal_id = %id, applications = applications.len(), "proposal deleted");
        Ok(())
      })
      .await
  }

  // ── Applications: capacity protocol ──────────────────────────────────────

  async fn add_application(&self, input: NewApplication) -> Result<Application> {
    self
      .transact("add_application", move |tx| {
        let proposal = records::load_proposal(tx, input.proposal_id)?;
        let mut user = records::load_user(tx, input.user_id)?;
        let application = input.clone().into_application(Utc::now());

        let next = ledger::submit(&proposal.record, application.application_id)?;
        records::insert_application(tx, &application)?;
        records::write_proposal(tx, &next, proposal.version)?;

        user.record.application_ids.push(application.application_id);
        records::write_user(tx, &user.record, user.version)?;

        records::insert_notification(
          tx,
          &Notification::application_submitted(&next, &application),
        )?;
        debug!(
          application_id = %application.application_id,
          proposal_id = %next.proposal_id,
          pending = next.pending_applications_count,
          "application submitted"
        );
        Ok(application)
      })
      .await
  }

  async fn withdraw_application(&self, id: Uuid) -> Result<Transition> {
    self
      .transact("withdraw_application", move |tx| {
        let application = records::load_application(tx, id)?;
        let proposal = records::load_proposal(tx, application.proposal_id)?;

        let next = ledger::withdraw(&proposal.record, &application)?;
        records::write_proposal(tx, &next, proposal.version)?;
        records::delete_application(tx, id)?;
        records::unlink_user_application(tx, application.user_id, id)?;
        records::insert_notification(
          tx,
          &Notification::application_withdrawn(&next, &application),
        )?;

        debug!(
          application_id = %id,
          status = %application.status,
          participants = next.participants_count,
          "application withdrawn"
        );
        Ok(Transition { proposal: next, application, cancelled: Vec::new(), changed: true })
      })
      .await
  }

  async fn accept_application(&self, id: Uuid) -> Result<Transition> {
    // Phase one, outside the transaction: snapshot the proposal, gather the
    // pending siblings, and pre-check capacity.
    let (snapshot, application, candidate_ids) = self
      .run(move |conn| {
        let application = records::load_application(conn, id)?;
        let proposal = records::load_proposal(conn, application.proposal_id)?;
        let pending = records::list_applications(
          conn,
          application.proposal_id,
          Some(&ApplicationStatus::Pending),
        )?;
        let ids: Vec<Uuid> = pending.iter().map(|a| a.application_id).collect();
        Ok((proposal.record, application, ids))
      })
      .await?;

    match ledger::precheck_accept(&snapshot, &application) {
      Ok(Decision::NoOp) => return Ok(unchanged(snapshot, application)),
      Ok(Decision::Apply(fills)) => {
        debug!(application_id = %id, fills, "acceptance pre-check passed");
      }
      Err(e) => {
        debug!(application_id = %id, error = %e, "acceptance pre-check failed");
        return Err(e.into());
      }
    }

    // Phase two: the authoritative decision against fresh state.
    let transition = self
      .transact("accept_application", move |tx| {
        let application = records::load_application(tx, id)?;
        let proposal = records::load_proposal(tx, application.proposal_id)?;

        // Candidates are re-read by id so that any whose status changed since
        // phase one are judged on their current state. Ids linked to the
        // proposal after phase one are included too.
        let mut ids = candidate_ids.clone();
        for linked in &proposal.record.application_ids {
          if !ids.contains(linked) {
            ids.push(*linked);
          }
        }
        let mut candidates = Vec::with_capacity(ids.len());
        for candidate_id in ids {
          if let Some(candidate) = records::find_application(tx, candidate_id)? {
            candidates.push(candidate);
          }
        }

        let Acceptance { proposal: next, cancelled } =
          match ledger::accept(&proposal.record, &application, &candidates) {
            Ok(Decision::Apply(acceptance)) => acceptance,
            Ok(Decision::NoOp) => return Ok(unchanged(proposal.record, application)),
            Err(e) => {
              warn!(application_id = %id, error = %e, "acceptance refused in transaction");
              return Err(e.into());
            }
          };

        let now = Utc::now();
        records::write_proposal(tx, &next, proposal.version)?;
        records::set_application_status(tx, id, &ApplicationStatus::Accepted, now)?;

        let mut accepted = application;
        accepted.status = ApplicationStatus::Accepted;
        accepted.updated_at = now;
        records::insert_notification(tx, &Notification::application_accepted(&next, &accepted))?;

        for candidate in candidates.iter().filter(|c| cancelled.contains(&c.application_id)) {
          records::set_application_status(
            tx,
            candidate.application_id,
            &ApplicationStatus::Cancelled,
            now,
          )?;
          records::insert_notification(
            tx,
            &Notification::application_cancelled(&next, candidate),
          )?;
        }

        Ok(Transition { proposal: next, application: accepted, cancelled, changed: true })
      })
      .await?;

    if transition.changed {
      info!(
        application_id = %id,
        proposal_id = %transition.proposal.proposal_id,
        participants = transition.proposal.participants_count,
        status = %transition.proposal.status,
        cancelled = transition.cancelled.len(),
        "application accepted"
      );
    }
    Ok(transition)
  }

  async fn reject_application(&self, id: Uuid) -> Result<Transition> {
    self
      .transact("reject_application", move |tx| {
        let application = records::load_application(tx, id)?;
        let proposal = records::load_proposal(tx, application.proposal_id)?;

        let next = match ledger::reject(&proposal.record, &application)? {
          Decision::Apply(next) => next,
          Decision::NoOp => return Ok(unchanged(proposal.record, application)),
        };
        if application.status == ApplicationStatus::Accepted {
          // Revoking an acceptance frees its seats.
          info!(application_id = %id, "accepted application is being rejected");
        }

        let now = Utc::now();
        records::write_proposal(tx, &next, proposal.version)?;
        records::set_application_status(tx, id, &ApplicationStatus::Rejected, now)?;

        let mut rejected = application;
        rejected.status = ApplicationStatus::Rejected;
        rejected.updated_at = now;
        records::insert_notification(tx, &Notification::application_rejected(&next, &rejected))?;

        debug!(application_id = %id, participants = next.participants_count, "application rejected");
        Ok(Transition { proposal: next, application: rejected, cancelled: Vec::new(), changed: true })
      })
      .await
  }

  // ── Applications: reads ──────────────────────────────────────────────────

  async fn get_application(&self, id: Uuid) -> Result<Option<Application>> {
    self.run(move |conn| records::find_application(conn, id)).await
  }

  async fn list_applications(
    &self,
    proposal_id: Uuid,
    status: Option<ApplicationStatus>,
  ) -> Result<Vec<Application>> {
    self
      .run(move |conn| records::list_applications(conn, proposal_id, status.as_ref()))
      .await
  }

  async fn list_user_applications(&self, user_id: Uuid) -> Result<Vec<Application>> {
    self.run(move |conn| records::list_user_applications(conn, user_id)).await
  }

  // ── Reviews: rating aggregation ──────────────────────────────────────────

  async fn add_review(&self, input: NewReview) -> Result<Review> {
    self
      .transact("add_review", move |tx| {
        let review = input.clone().into_review(Utc::now())?;
        records::load_user(tx, review.reviewer_id)?;
        let mut profile = records::load_user(tx, review.reviewed_user_id)?;

        let aggregate = profile.record.aggregate().with_review(review.rating);
        profile.record.set_aggregate(aggregate);
        records::write_user(tx, &profile.record, profile.version)?;
        records::insert_review(tx, &review)?;
        records::insert_notification(tx, &Notification::review_received(&review))?;

        debug!(
          user_id = %review.reviewed_user_id,
          rating = aggregate.rating,
          reviews = aggregate.number_of_reviews,
          "review added"
        );
        Ok(review)
      })
      .await
  }

  async fn update_review(&self, id: Uuid, update: ReviewUpdate) -> Result<Review> {
    self
      .transact("update_review", move |tx| {
        let mut review = records::load_review(tx, id)?;
        let new_rating = validate_rating(update.rating)?;
        let mut profile = records::load_user(tx, review.reviewed_user_id)?;

        let aggregate = profile.record.aggregate().with_revision(review.rating, new_rating);
        profile.record.set_aggregate(aggregate);
        records::write_user(tx, &profile.record, profile.version)?;

        review.rating = new_rating;
        if let Some(comment) = &update.comment {
          review.comment = comment.clone();
        }
        review.updated_at = Utc::now();
        records::update_review(tx, &review)?;

        debug!(review_id = %id, rating = aggregate.rating, "review updated");
        Ok(review)
      })
      .await
  }

  async fn delete_review(&self, id: Uuid) -> Result<()> {
    self
      .transact("delete_review", move |tx| {
        let review = records::load_review(tx, id)?;
        let mut profile = records::load_user(tx, review.reviewed_user_id)?;

        let aggregate = profile.record.aggregate().without_review(review.rating);
        profile.record.set_aggregate(aggregate);
        records::write_user(tx, &profile.record, profile.version)?;
        records::delete_review(tx, id)?;

        debug!(
          review_id = %id,
          rating = aggregate.rating,
          reviews = aggregate.number_of_reviews,
          "review deleted"
        );
        Ok(())
      })
      .await
  }

  async fn get_review(&self, id: Uuid) -> Result<Option<Review>> {
    self.run(move |conn| records::find_review(conn, id)).await
  }

  async fn list_reviews(&self, reviewed_user_id: Uuid) -> Result<Vec<Review>> {
    self.run(move |conn| records::list_reviews(conn, reviewed_user_id)).await
  }

  // ── Outbox ────────────────────────────────────────────────────────────────

  async fn list_notifications(&self, recipient_id: Uuid) -> Result<Vec<Notification>> {
    self
      .run(move |conn| records::list_notifications(conn, recipient_id))
      .await
  }
}
