//! Error type for `parish-store-sqlite`.

use parish_core::store::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error(transparent)]
  Core(#[from] parish_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("sqlite error: {0}")]
  Sqlite(#[from] rusqlite::Error),

  #[error("uuid parse error: {0}")]
  Uuid(#[from] uuid::Error),

  /// A stored column could not be decoded back into a domain value.
  #[error("decode error: {0}")]
  Decode(String),
}

impl Error {
  pub(crate) fn decode(what: &str, raw: &str, err: impl std::fmt::Display) -> Self {
    Self::Decode(format!("{what} {raw:?}: {err}"))
  }

  /// Whether this is a UNIQUE constraint failure on `target`
  /// (`table.column`).
  pub(crate) fn is_unique_violation(&self, target: &str) -> bool {
    let inner = match self {
      Self::Sqlite(e) | Self::Database(tokio_rusqlite::Error::Rusqlite(e)) => e,
      _ => return false,
    };
    matches!(
      inner,
      rusqlite::Error::SqliteFailure(e, Some(msg))
        if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE && msg.contains(target)
    )
  }
}

impl StoreError for Error {
  fn domain(&self) -> Option<&parish_core::Error> {
    match self {
      Self::Core(e) => Some(e),
      _ => None,
    }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
