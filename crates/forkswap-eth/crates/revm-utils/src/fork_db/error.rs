use std::time::Duration;

use futures::channel::mpsc::TrySendError;
use revm::database_interface::DBErrorMarker;
use revm::primitives::B256;
use thiserror::Error;

use super::backend::BackendFetchRequest;

pub type DatabaseResult<T> = Result<T, DatabaseError>;

/// Errors raised while materializing forked state
#[derive(Debug, Error)]
pub enum DatabaseError {
   /// The backend thread is gone or refused the request
   #[error("Fork backend unavailable: {0}")]
   BackendGone(String),

   /// The state source returned an error
   #[error("Failed to fetch {what}: {reason}")]
   Fetch { what: String, reason: String },

   /// The state source did not answer in time
   #[error("Timed out after {0:?} while fetching {1}")]
   Timeout(Duration, String),

   /// The pinned block is not known to the state source
   #[error("Block {0} is not available on the remote source")]
   MissingBlock(u64),

   #[error("Missing code for hash {0}")]
   MissingCode(B256),
}

impl DBErrorMarker for DatabaseError {}

impl From<TrySendError<BackendFetchRequest>> for DatabaseError {
   fn from(e: TrySendError<BackendFetchRequest>) -> Self {
      if e.is_disconnected() {
         DatabaseError::BackendGone("backend channel closed".to_string())
      } else {
         DatabaseError::BackendGone("backend channel is full".to_string())
      }
   }
}
