//! Error type for `tripshare-store-sqlite`.

use rusqlite::ErrorCode;
use thiserror::Error;
use tripshare_core::{Classify, ErrorKind};

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] tripshare_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("sqlite error: {0}")]
  Sqlite(#[from] rusqlite::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("uuid parse error: {0}")]
  Uuid(#[from] uuid::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  /// The row was written by someone else between our read and our write.
  #[error("{table} row {id} changed concurrently")]
  VersionConflict {
    table: &'static str,
    id:    uuid::Uuid,
  },

  #[error("{operation} gave up after {attempts} conflicting attempt(s)")]
  RetriesExhausted {
    operation: &'static str,
    attempts:  u32,
  },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

fn is_busy(e: &rusqlite::Error) -> bool {
  matches!(
    e.sqlite_error_code(),
    Some(ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked)
  )
}

impl Error {
  /// Whether re-running the whole transaction might succeed.
  pub fn is_transient(&self) -> bool {
    match self {
      Self::VersionConflict { .. } => true,
      Self::Sqlite(e) => is_busy(e),
      Self::Database(tokio_rusqlite::Error::Rusqlite(e)) => is_busy(e),
      _ => false,
    }
  }
}

impl Classify for Error {
  fn kind(&self) -> ErrorKind {
    match self {
      Self::Core(e) => e.kind(),
      Self::VersionConflict { .. } | Self::RetriesExhausted { .. } => {
        ErrorKind::TransientConflict
      }
      Self::Json(_) | Self::Uuid(_) | Self::DateParse(_) => {
        ErrorKind::DataIntegrity
      }
      Self::Database(_) | Self::Sqlite(_) => ErrorKind::Internal,
    }
  }
}
