//! Capacity ledger transitions.
//!
//! Each function takes the current proposal and application, exactly as read
//! inside a store transaction, and returns the new proposal state. Nothing
//! here performs I/O; a backend reads, calls one of these functions, and
//! writes the result back within the same transaction. No other code path
//! may touch `participants_count`, `pending_applications_count`, or
//! `status`.
//!
//! Acceptance is two-phase. [`precheck_accept`] runs against a snapshot read
//! outside the transaction, while the backend gathers the candidate set of
//! pending siblings (arbitrary queries are not allowed inside the
//! transaction). [`accept`] then repeats the capacity check against fresh
//! state and is the authoritative decision.

use uuid::Uuid;

use crate::{
  Error, Result,
  application::{Application, ApplicationStatus},
  proposal::{Proposal, ProposalStatus},
};

/// The result of a transition that may turn out to have nothing to do.
#[derive(Debug, Clone, PartialEq)]
pub enum Decision<T> {
  Apply(T),
  /// The application is already in the requested state.
  NoOp,
}

/// The outcome of an acceptance.
#[derive(Debug, Clone)]
pub struct Acceptance {
  pub proposal:  Proposal,
  /// Sibling applications to mark cancelled because the proposal filled up.
  pub cancelled: Vec<Uuid>,
}

// ─── Guards ──────────────────────────────────────────────────────────────────

fn ensure_linked(proposal: &Proposal, application: &Application) -> Result<()> {
  if application.proposal_id != proposal.proposal_id {
    return Err(Error::ApplicationMismatch {
      application_id: application.application_id,
      proposal_id:    proposal.proposal_id,
    });
  }
  Ok(())
}

/// Refuse to reason about a ledger whose status could not be read. Returns
/// whether the proposal is concluded.
fn ensure_readable(proposal: &Proposal) -> Result<bool> {
  match &proposal.status {
    ProposalStatus::Published | ProposalStatus::Full => Ok(false),
    ProposalStatus::Concluded => Ok(true),
    ProposalStatus::Unknown(value) => Err(Error::UnknownProposalStatus {
      proposal_id: proposal.proposal_id,
      value:       value.clone(),
    }),
  }
}

fn unknown_status(application: &Application, value: &str) -> Error {
  Error::UnknownApplicationStatus {
    application_id: application.application_id,
    value:          value.to_owned(),
  }
}

fn invalid(application: &Application, to: ApplicationStatus) -> Error {
  Error::InvalidTransition {
    application_id: application.application_id,
    from: application.status.clone(),
    to,
  }
}

/// Give back the seats held by an accepted application.
fn release_seats(proposal: &mut Proposal, application: &Application) {
  proposal.participants_count = proposal
    .participants_count
    .saturating_sub(application.seats());
  proposal.settle_status();
}

fn drop_pending(proposal: &mut Proposal) {
  proposal.pending_applications_count =
    proposal.pending_applications_count.saturating_sub(1);
}

// ─── Submit ──────────────────────────────────────────────────────────────────

/// Link a freshly created pending application to its proposal. Capacity is
/// not checked here; it is enforced on acceptance.
pub fn submit(proposal: &Proposal, application_id: Uuid) -> Result<Proposal> {
  if ensure_readable(proposal)? {
    return Err(Error::ProposalConcluded(proposal.proposal_id));
  }

  let mut next = proposal.clone();
  if !next.application_ids.contains(&application_id) {
    next.application_ids.push(application_id);
  }
  next.pending_applications_count =
    next.pending_applications_count.saturating_add(1);
  Ok(next)
}

// ─── Withdraw ────────────────────────────────────────────────────────────────

/// Unlink an application that its applicant is withdrawing. The caller
/// deletes the application record itself.
pub fn withdraw(proposal: &Proposal, application: &Application) -> Result<Proposal> {
  ensure_linked(proposal, application)?;
  ensure_readable(proposal)?;

  let mut next = proposal.clone();
  next
    .application_ids
    .retain(|id| *id != application.application_id);

  match &application.status {
    ApplicationStatus::Accepted => release_seats(&mut next, application),
    ApplicationStatus::Pending => drop_pending(&mut next),
    ApplicationStatus::Rejected | ApplicationStatus::Cancelled => {}
    ApplicationStatus::Unknown(value) => {
      return Err(unknown_status(application, value));
    }
  }

  Ok(next)
}

// ─── Accept ──────────────────────────────────────────────────────────────────

/// Phase one of an acceptance, against a snapshot read outside the
/// transaction. Yields whether accepting would fill the proposal.
pub fn precheck_accept(
  proposal: &Proposal,
  application: &Application,
) -> Result<Decision<bool>> {
  ensure_linked(proposal, application)?;
  let concluded = ensure_readable(proposal)?;

  let requested = application.seats();
  let available = proposal.available_seats();
  let conflict = Error::CapacityConflict {
    proposal_id: proposal.proposal_id,
    requested,
    available,
  };

  match &application.status {
    ApplicationStatus::Accepted => return Ok(Decision::NoOp),
    ApplicationStatus::Pending => {}
    // Cancelled by a sibling filling the proposal, possibly while this
    // acceptance was in flight.
    ApplicationStatus::Cancelled if requested > available => return Err(conflict),
    ApplicationStatus::Rejected | ApplicationStatus::Cancelled => {
      return Err(invalid(application, ApplicationStatus::Accepted));
    }
    ApplicationStatus::Unknown(value) => {
      return Err(unknown_status(application, value));
    }
  }

  if concluded {
    return Err(Error::ProposalConcluded(proposal.proposal_id));
  }
  if requested > available {
    return Err(conflict);
  }

  Ok(Decision::Apply(requested == available))
}

/// Phase two of an acceptance, inside the transaction.
///
/// `candidates` are the sibling applications gathered before the transaction
/// and re-read within it. If the acceptance fills the proposal, every
/// candidate that is still pending is cancelled.
pub fn accept(
  proposal: &Proposal,
  application: &Application,
  candidates: &[Application],
) -> Result<Decision<Acceptance>> {
  if precheck_accept(proposal, application)? == Decision::NoOp {
    return Ok(Decision::NoOp);
  }

  let mut next = proposal.clone();
  next.participants_count += application.seats();

  let cancelled = if next.is_full() {
    next.pending_applications_count = 0;
    candidates
      .iter()
      .filter(|c| {
        c.application_id != application.application_id
          && c.proposal_id == proposal.proposal_id
          && c.status == ApplicationStatus::Pending
      })
      .map(|c| c.application_id)
      .collect()
  } else {
    drop_pending(&mut next);
    Vec::new()
  };
  next.settle_status();

  Ok(Decision::Apply(Acceptance { proposal: next, cancelled }))
}

// ─── Reject ──────────────────────────────────────────────────────────────────

/// Reject an application. Rejecting an accepted application revokes its
/// seats and reopens the proposal if it was full.
pub fn reject(
  proposal: &Proposal,
  application: &Application,
) -> Result<Decision<Proposal>> {
  ensure_linked(proposal, application)?;
  ensure_readable(proposal)?;

  let mut next = proposal.clone();
  match &application.status {
    ApplicationStatus::Rejected => return Ok(Decision::NoOp),
    ApplicationStatus::Accepted => release_seats(&mut next, application),
    ApplicationStatus::Pending => drop_pending(&mut next),
    ApplicationStatus::Cancelled => {
      return Err(invalid(application, ApplicationStatus::Rejected));
    }
    ApplicationStatus::Unknown(value) => {
      return Err(unknown_status(application, value));
    }
  }

  Ok(Decision::Apply(next))
}

// ─── Conclude ────────────────────────────────────────────────────────────────

/// Close a proposal for good. Counters are kept as they are.
pub fn conclude(proposal: &Proposal) -> Result<Decision<Proposal>> {
  if ensure_readable(proposal)? {
    return Ok(Decision::NoOp);
  }
  let mut next = proposal.clone();
  next.status = ProposalStatus::Concluded;
  Ok(Decision::Apply(next))
}
