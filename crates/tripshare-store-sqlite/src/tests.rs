//! Integration tests for `SqliteStore` against an in-memory database.

use tripshare_core::{
  Classify, ErrorKind,
  application::{ApplicationStatus, Guest, NewApplication},
  notification::NotificationKind,
  proposal::{NewProposal, Proposal, ProposalStatus},
  review::{NewReview, ReviewUpdate},
  store::TripStore,
  user::{NewUser, UserProfile},
};
use uuid::Uuid;

use crate::{Error, SqliteStore, records};

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

async fn user(s: &SqliteStore, name: &str) -> UserProfile {
  s.add_user(NewUser::new(name)).await.unwrap()
}

/// A proposal organised by a fresh user with `count` seats already taken.
async fn proposal(s: &SqliteStore, max: u32, count: u32) -> Proposal {
  let organizer = user(s, "organizer").await;
  let mut input = NewProposal::new(organizer.user_id, "Cinque Terre", max);
  input.participants_count = count;
  s.create_proposal(input).await.unwrap()
}

/// A fresh applicant applies to `p` with `guests` guests.
async fn apply(s: &SqliteStore, p: &Proposal, guests: usize) -> Uuid {
  let applicant = user(s, "applicant").await;
  let mut input = NewApplication::new(p.proposal_id, applicant.user_id);
  input.guests = (0..guests)
    .map(|i| Guest { name: format!("guest {i}"), email: format!("g{i}@example.com") })
    .collect();
  s.add_application(input).await.unwrap().application_id
}

async fn reload(s: &SqliteStore, p: &Proposal) -> Proposal {
  s.get_proposal(p.proposal_id).await.unwrap().unwrap()
}

async fn status_of(s: &SqliteStore, id: Uuid) -> ApplicationStatus {
  s.get_application(id).await.unwrap().unwrap().status
}

// ─── Users & proposals ───────────────────────────────────────────────────────

#[tokio::test]
async fn add_and_get_user() {
  let s = store().await;
  let u = user(&s, "Ines").await;

  let fetched = s.get_user(u.user_id).await.unwrap().unwrap();
  assert_eq!(fetched.display_name, "Ines");
  assert_eq!(fetched.rating, 0.0);
  assert_eq!(fetched.number_of_reviews, 0);
  assert!(s.get_user(Uuid::new_v4()).await.unwrap().is_none());
}

#[tokio::test]
async fn create_proposal_requires_organizer() {
  let s = store().await;
  let err = s
    .create_proposal(NewProposal::new(Uuid::new_v4(), "Ghost trip", 3))
    .await
    .unwrap_err();
  assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn create_proposal_roundtrip() {
  let s = store().await;
  let p = proposal(&s, 4, 1).await;
  let fetched = reload(&s, &p).await;
  assert_eq!(fetched.title, "Cinque Terre");
  assert_eq!(fetched.max_participants, 4);
  assert_eq!(fetched.participants_count, 1);
  assert_eq!(fetched.pending_applications_count, 0);
  assert_eq!(fetched.status, ProposalStatus::Published);
}

#[tokio::test]
async fn invalid_capacity_is_rejected() {
  let s = store().await;
  let organizer = user(&s, "organizer").await;
  let mut input = NewProposal::new(organizer.user_id, "Overbooked", 2);
  input.participants_count = 3;
  let err = s.create_proposal(input).await.unwrap_err();
  assert_eq!(err.kind(), ErrorKind::InvalidInput);
}

// ─── Add application ─────────────────────────────────────────────────────────

#[tokio::test]
async fn add_application_links_and_counts() {
  let s = store().await;
  let p = proposal(&s, 4, 1).await;
  let applicant = user(&s, "Jo").await;

  let app = s
    .add_application(NewApplication::new(p.proposal_id, applicant.user_id))
    .await
    .unwrap();
  assert_eq!(app.status, ApplicationStatus::Pending);

  let p = reload(&s, &p).await;
  assert_eq!(p.pending_applications_count, 1);
  assert_eq!(p.application_ids, vec![app.application_id]);

  let applicant = s.get_user(applicant.user_id).await.unwrap().unwrap();
  assert_eq!(applicant.application_ids, vec![app.application_id]);

  let inbox = s.list_notifications(p.organizer_id).await.unwrap();
  assert_eq!(inbox.len(), 1);
  assert_eq!(inbox[0].kind, NotificationKind::ApplicationSubmitted);
}

#[tokio::test]
async fn add_application_to_missing_proposal_fails() {
  let s = store().await;
  let applicant = user(&s, "Jo").await;
  let err = s
    .add_application(NewApplication::new(Uuid::new_v4(), applicant.user_id))
    .await
    .unwrap_err();
  assert!(matches!(err, Error::Core(tripshare_core::Error::ProposalNotFound(_))));
  assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn add_application_does_not_check_capacity() {
  let s = store().await;
  let p = proposal(&s, 1, 1).await;
  assert_eq!(p.status, ProposalStatus::Full);
  apply(&s, &p, 3).await;
  assert_eq!(reload(&s, &p).await.pending_applications_count, 1);
}

// ─── Accept ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn accepting_to_capacity_cancels_the_rest() {
  let s = store().await;
  let p = proposal(&s, 3, 0).await;
  let a = apply(&s, &p, 0).await;
  let b = apply(&s, &p, 0).await;
  let c = apply(&s, &p, 0).await;
  let d = apply(&s, &p, 0).await;

  let t = s.accept_application(a).await.unwrap();
  assert!(t.changed);
  assert_eq!(t.proposal.participants_count, 1);
  assert_eq!(t.proposal.status, ProposalStatus::Published);

  let t = s.accept_application(b).await.unwrap();
  assert_eq!(t.proposal.participants_count, 2);
  assert_eq!(t.proposal.pending_applications_count, 2);

  let t = s.accept_application(c).await.unwrap();
  assert_eq!(t.proposal.participants_count, 3);
  assert_eq!(t.proposal.status, ProposalStatus::Full);
  assert_eq!(t.proposal.pending_applications_count, 0);
  assert_eq!(t.cancelled, vec![d]);

  let stored = reload(&s, &p).await;
  assert!(stored.is_consistent());
  assert_eq!(stored.status, ProposalStatus::Full);
  assert_eq!(status_of(&s, c).await, ApplicationStatus::Accepted);
  assert_eq!(status_of(&s, d).await, ApplicationStatus::Cancelled);

  let d_owner = s.get_application(d).await.unwrap().unwrap().user_id;
  let inbox = s.list_notifications(d_owner).await.unwrap();
  assert_eq!(inbox.last().unwrap().kind, NotificationKind::ApplicationCancelled);
}

#[tokio::test]
async fn accept_twice_changes_nothing() {
  let s = store().await;
  let p = proposal(&s, 5, 1).await;
  let a = apply(&s, &p, 1).await;

  let first = s.accept_application(a).await.unwrap();
  let second = s.accept_application(a).await.unwrap();
  assert!(first.changed);
  assert!(!second.changed);
  assert_eq!(reload(&s, &p).await.participants_count, 3);
}

#[tokio::test]
async fn accept_beyond_capacity_conflicts() {
  let s = store().await;
  let p = proposal(&s, 3, 2).await;
  let a = apply(&s, &p, 1).await;

  let err = s.accept_application(a).await.unwrap_err();
  assert_eq!(err.kind(), ErrorKind::CapacityConflict);
  assert_eq!(status_of(&s, a).await, ApplicationStatus::Pending);
  assert_eq!(reload(&s, &p).await.participants_count, 2);
}

#[tokio::test]
async fn concurrent_accepts_for_last_seat() {
  let s = store().await;
  let p = proposal(&s, 3, 2).await;
  let x = apply(&s, &p, 0).await;
  let y = apply(&s, &p, 0).await;

  // Both phase-one reads are expected to finish before either transaction
  // runs, so the loser is refused by the in-transaction re-check.
  let (rx, ry) = tokio::join!(s.accept_application(x), s.accept_application(y));

  let outcomes = [rx, ry];
  let won = outcomes.iter().filter(|r| r.is_ok()).count();
  let lost: Vec<_> = outcomes.iter().filter_map(|r| r.as_ref().err()).collect();
  assert_eq!(won, 1);
  assert_eq!(lost.len(), 1);
  assert_eq!(lost[0].kind(), ErrorKind::CapacityConflict);

  let stored = reload(&s, &p).await;
  assert_eq!(stored.participants_count, 3);
  assert!(stored.is_consistent());
}

#[tokio::test]
async fn accept_on_concluded_proposal_is_refused() {
  let s = store().await;
  let p = proposal(&s, 4, 1).await;
  let a = apply(&s, &p, 0).await;
  s.conclude_proposal(p.proposal_id).await.unwrap();

  let err = s.accept_application(a).await.unwrap_err();
  assert_eq!(err.kind(), ErrorKind::InvalidInput);
}

// ─── Withdraw ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn accept_then_withdraw_is_reversible() {
  let s = store().await;
  let p = proposal(&s, 4, 1).await;
  let a = apply(&s, &p, 2).await;

  let t = s.accept_application(a).await.unwrap();
  assert_eq!(t.proposal.participants_count, 4);
  assert_eq!(t.proposal.status, ProposalStatus::Full);

  let t = s.withdraw_application(a).await.unwrap();
  assert_eq!(t.application.status, ApplicationStatus::Accepted);
  assert_eq!(t.proposal.participants_count, 1);
  assert_eq!(t.proposal.status, ProposalStatus::Published);

  let stored = reload(&s, &p).await;
  assert!(stored.application_ids.is_empty());
  assert!(s.get_application(a).await.unwrap().is_none());
}

#[tokio::test]
async fn withdraw_pending_unlinks_applicant() {
  let s = store().await;
  let p = proposal(&s, 4, 1).await;
  let a = apply(&s, &p, 0).await;
  let owner = s.get_application(a).await.unwrap().unwrap().user_id;

  s.withdraw_application(a).await.unwrap();

  assert_eq!(reload(&s, &p).await.pending_applications_count, 0);
  let owner = s.get_user(owner).await.unwrap().unwrap();
  assert!(owner.application_ids.is_empty());

  let inbox = s.list_notifications(p.organizer_id).await.unwrap();
  assert_eq!(inbox.last().unwrap().kind, NotificationKind::ApplicationWithdrawn);
}

#[tokio::test]
async fn withdraw_rejected_leaves_counters() {
  let s = store().await;
  let p = proposal(&s, 4, 1).await;
  let a = apply(&s, &p, 0).await;
  s.reject_application(a).await.unwrap();
  let before = reload(&s, &p).await;

  let t = s.withdraw_application(a).await.unwrap();
  assert_eq!(t.proposal.participants_count, before.participants_count);
  assert_eq!(t.proposal.pending_applications_count, before.pending_applications_count);
}

#[tokio::test]
async fn withdraw_missing_application_fails() {
  let s = store().await;
  let err = s.withdraw_application(Uuid::new_v4()).await.unwrap_err();
  assert_eq!(err.kind(), ErrorKind::NotFound);
}

// ─── Reject ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn reject_pending_and_again() {
  let s = store().await;
  let p = proposal(&s, 4, 1).await;
  let a = apply(&s, &p, 0).await;

  let t = s.reject_application(a).await.unwrap();
  assert!(t.changed);
  assert_eq!(t.application.status, ApplicationStatus::Rejected);
  assert_eq!(t.proposal.pending_applications_count, 0);

  let again = s.reject_application(a).await.unwrap();
  assert!(!again.changed);

  let owner = t.application.user_id;
  let inbox = s.list_notifications(owner).await.unwrap();
  assert_eq!(inbox.len(), 1);
  assert_eq!(inbox[0].kind, NotificationKind::ApplicationRejected);
}

#[tokio::test]
async fn reject_accepted_reopens_full_proposal() {
  let s = store().await;
  let p = proposal(&s, 2, 1).await;
  let a = apply(&s, &p, 0).await;
  s.accept_application(a).await.unwrap();
  assert_eq!(reload(&s, &p).await.status, ProposalStatus::Full);

  let t = s.reject_application(a).await.unwrap();
  assert_eq!(t.proposal.participants_count, 1);
  assert_eq!(t.proposal.status, ProposalStatus::Published);
}

#[tokio::test]
async fn cancelled_application_cannot_be_rejected() {
  let s = store().await;
  let p = proposal(&s, 2, 1).await;
  let a = apply(&s, &p, 0).await;
  let b = apply(&s, &p, 0).await;
  s.accept_application(a).await.unwrap();
  assert_eq!(status_of(&s, b).await, ApplicationStatus::Cancelled);

  let err = s.reject_application(b).await.unwrap_err();
  assert_eq!(err.kind(), ErrorKind::InvalidInput);
}

#[tokio::test]
async fn unknown_stored_status_is_an_integrity_error() {
  let s = store().await;
  let p = proposal(&s, 3, 1).await;
  let a = apply(&s, &p, 0).await;

  let id = a.hyphenated().to_string();
  s.conn
    .call(move |conn| {
      conn.execute(
        "UPDATE applications SET status = 'on_hold' WHERE application_id = ?1",
        [id],
      )?;
      Ok(())
    })
    .await
    .unwrap();

  assert_eq!(
    status_of(&s, a).await,
    ApplicationStatus::Unknown("on_hold".into())
  );
  let err = s.reject_application(a).await.unwrap_err();
  assert_eq!(err.kind(), ErrorKind::DataIntegrity);
}

#[tokio::test]
async fn unknown_proposal_status_is_not_concluded_over() {
  let s = store().await;
  let p = proposal(&s, 3, 1).await;

  let id = p.proposal_id.hyphenated().to_string();
  s.conn
    .call(move |conn| {
      conn.execute(
        "UPDATE proposals SET status = 'draft' WHERE proposal_id = ?1",
        [id],
      )?;
      Ok(())
    })
    .await
    .unwrap();

  let err = s.conclude_proposal(p.proposal_id).await.unwrap_err();
  assert_eq!(err.kind(), ErrorKind::DataIntegrity);
  assert_eq!(
    reload(&s, &p).await.status,
    ProposalStatus::Unknown("draft".into())
  );
}

// ─── Proposal lifecycle ──────────────────────────────────────────────────────

#[tokio::test]
async fn concluded_proposal_takes_no_applications() {
  let s = store().await;
  let p = proposal(&s, 3, 1).await;
  let concluded = s.conclude_proposal(p.proposal_id).await.unwrap();
  assert_eq!(concluded.status, ProposalStatus::Concluded);
  let again = s.conclude_proposal(p.proposal_id).await.unwrap();
  assert_eq!(again.status, ProposalStatus::Concluded);

  let applicant = user(&s, "late").await;
  let err = s
    .add_application(NewApplication::new(p.proposal_id, applicant.user_id))
    .await
    .unwrap_err();
  assert!(matches!(err, Error::Core(tripshare_core::Error::ProposalConcluded(_))));
}

#[tokio::test]
async fn delete_proposal_cascades() {
  let s = store().await;
  let p = proposal(&s, 4, 1).await;
  let a = apply(&s, &p, 0).await;
  let b = apply(&s, &p, 1).await;
  s.accept_application(b).await.unwrap();
  let owner = s.get_application(a).await.unwrap().unwrap().user_id;

  s.delete_proposal(p.proposal_id).await.unwrap();

  assert!(s.get_proposal(p.proposal_id).await.unwrap().is_none());
  assert!(s.get_application(a).await.unwrap().is_none());
  assert!(s.get_application(b).await.unwrap().is_none());
  let owner = s.get_user(owner).await.unwrap().unwrap();
  assert!(owner.application_ids.is_empty());

  let err = s.delete_proposal(p.proposal_id).await.unwrap_err();
  assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn list_applications_by_status() {
  let s = store().await;
  let p = proposal(&s, 5, 1).await;
  let a = apply(&s, &p, 0).await;
  let b = apply(&s, &p, 0).await;
  s.accept_application(a).await.unwrap();

  let all = s.list_applications(p.proposal_id, None).await.unwrap();
  assert_eq!(all.len(), 2);

  let pending = s
    .list_applications(p.proposal_id, Some(ApplicationStatus::Pending))
    .await
    .unwrap();
  assert_eq!(pending.len(), 1);
  assert_eq!(pending[0].application_id, b);

  let owner = pending[0].user_id;
  let mine = s.list_user_applications(owner).await.unwrap();
  assert_eq!(mine.len(), 1);
}

// ─── Reviews ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn review_aggregate_round_trip() {
  let s = store().await;
  let reviewee = user(&s, "reviewee").await;
  let reviewer = user(&s, "reviewer").await;

  let four = s
    .add_review(NewReview::new(reviewee.user_id, reviewer.user_id, 4.0))
    .await
    .unwrap();
  let profile = s.get_user(reviewee.user_id).await.unwrap().unwrap();
  assert_eq!((profile.rating, profile.number_of_reviews), (4.0, 1));

  let two = s
    .add_review(NewReview::new(reviewee.user_id, reviewer.user_id, 2.0))
    .await
    .unwrap();
  let profile = s.get_user(reviewee.user_id).await.unwrap().unwrap();
  assert_eq!((profile.rating, profile.number_of_reviews), (3.0, 2));

  s.delete_review(four.review_id).await.unwrap();
  let profile = s.get_user(reviewee.user_id).await.unwrap().unwrap();
  assert_eq!((profile.rating, profile.number_of_reviews), (2.0, 1));

  s.delete_review(two.review_id).await.unwrap();
  let profile = s.get_user(reviewee.user_id).await.unwrap().unwrap();
  assert_eq!((profile.rating, profile.number_of_reviews), (0.0, 0));
  assert!(s.list_reviews(reviewee.user_id).await.unwrap().is_empty());
}

#[tokio::test]
async fn update_review_uses_stored_rating() {
  let s = store().await;
  let reviewee = user(&s, "reviewee").await;
  let reviewer = user(&s, "reviewer").await;

  s.add_review(NewReview::new(reviewee.user_id, reviewer.user_id, 1.0))
    .await
    .unwrap();
  let r = s
    .add_review(NewReview::new(reviewee.user_id, reviewer.user_id, 3.0))
    .await
    .unwrap();

  let updated = s
    .update_review(r.review_id, ReviewUpdate { rating: 5.0, comment: Some("great".into()) })
    .await
    .unwrap();
  assert_eq!(updated.rating, 5.0);
  assert_eq!(updated.comment, "great");

  let profile = s.get_user(reviewee.user_id).await.unwrap().unwrap();
  assert_eq!((profile.rating, profile.number_of_reviews), (3.0, 2));

  let stored = s.get_review(r.review_id).await.unwrap().unwrap();
  assert_eq!(stored.rating, 5.0);
}

#[tokio::test]
async fn review_notifies_reviewee() {
  let s = store().await;
  let reviewee = user(&s, "reviewee").await;
  let reviewer = user(&s, "reviewer").await;
  s.add_review(NewReview::new(reviewee.user_id, reviewer.user_id, 4.5))
    .await
    .unwrap();

  let inbox = s.list_notifications(reviewee.user_id).await.unwrap();
  assert_eq!(inbox.len(), 1);
  assert_eq!(inbox[0].kind, NotificationKind::ReviewReceived);
}

#[tokio::test]
async fn review_errors() {
  let s = store().await;
  let reviewee = user(&s, "reviewee").await;

  let err = s
    .add_review(NewReview::new(reviewee.user_id, Uuid::new_v4(), 4.0))
    .await
    .unwrap_err();
  assert_eq!(err.kind(), ErrorKind::NotFound);

  let err = s
    .add_review(NewReview::new(reviewee.user_id, reviewee.user_id, 4.0))
    .await
    .unwrap_err();
  assert_eq!(err.kind(), ErrorKind::InvalidInput);

  let err = s.delete_review(Uuid::new_v4()).await.unwrap_err();
  assert_eq!(err.kind(), ErrorKind::NotFound);

  let profile = s.get_user(reviewee.user_id).await.unwrap().unwrap();
  assert_eq!(profile.number_of_reviews, 0);
}

// ─── Optimistic concurrency ──────────────────────────────────────────────────

#[tokio::test]
async fn stale_version_write_conflicts() {
  let s = store().await;
  let p = proposal(&s, 3, 1).await;
  // Bump the version once so that version 0 is stale.
  apply(&s, &p, 0).await;

  let stale = p.clone();
  let outcome = s
    .conn
    .call(move |conn| Ok(records::write_proposal(conn, &stale, 0)))
    .await
    .unwrap();
  assert!(matches!(outcome, Err(Error::VersionConflict { table: "proposals", .. })));
}

#[tokio::test]
async fn persistent_conflicts_exhaust_retries() {
  let s = store().await;
  let id = Uuid::new_v4();
  let err = s
    .transact("always_conflicts", move |_tx| -> crate::Result<()> {
      Err(Error::VersionConflict { table: "proposals", id })
    })
    .await
    .unwrap_err();
  assert!(matches!(err, Error::RetriesExhausted { attempts: 5, .. }));
  assert_eq!(err.kind(), ErrorKind::TransientConflict);
}

async fn stored_version(s: &SqliteStore, id: Uuid) -> i64 {
  s.conn
    .call(move |conn| Ok(records::load_proposal(conn, id)))
    .await
    .unwrap()
    .unwrap()
    .version
}

#[tokio::test]
async fn failed_transaction_rolls_back() {
  let s = store().await;
  let p = proposal(&s, 3, 1).await;
  apply(&s, &p, 0).await;
  let before = reload(&s, &p).await;
  let version = stored_version(&s, p.proposal_id).await;
  let id = p.proposal_id;

  let err = s
    .transact("write_then_fail", move |tx| -> crate::Result<()> {
      let current = records::load_proposal(tx, id)?;
      let mut next = current.record.clone();
      next.participants_count = next.max_participants;
      next.pending_applications_count = 0;
      next.settle_status();
      records::write_proposal(tx, &next, current.version)?;
      Err(tripshare_core::Error::ProposalConcluded(id).into())
    })
    .await
    .unwrap_err();
  assert!(matches!(err, Error::Core(tripshare_core::Error::ProposalConcluded(_))));

  let after = reload(&s, &p).await;
  assert_eq!(after.participants_count, before.participants_count);
  assert_eq!(after.pending_applications_count, before.pending_applications_count);
  assert_eq!(after.status, ProposalStatus::Published);
  assert_eq!(stored_version(&s, id).await, version);
}

#[tokio::test]
async fn refused_acceptance_writes_nothing() {
  let s = store().await;
  let p = proposal(&s, 3, 2).await;
  let a = apply(&s, &p, 1).await;
  let before = s.list_notifications(p.organizer_id).await.unwrap().len();

  s.accept_application(a).await.unwrap_err();

  let after = reload(&s, &p).await;
  assert_eq!(after.participants_count, 2);
  assert_eq!(after.pending_applications_count, 1);
  assert_eq!(s.list_notifications(p.organizer_id).await.unwrap().len(), before);
}
