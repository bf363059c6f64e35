//! One in-flight mutation per commitment.
//!
//! A second mutation on the same commitment is rejected, not queued.
//! Different commitments never contend.

use std::{
  collections::HashMap,
  sync::{Arc, Mutex},
};

use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use uuid::Uuid;

use crate::{Error, Result};

type LockMap = Arc<Mutex<HashMap<Uuid, Arc<Semaphore>>>>;

#[derive(Debug, Default)]
pub struct CommitmentLocks {
  locks: LockMap,
}

/// Held for the duration of a mutation; releases on drop.
#[must_use = "the lock is released as soon as the permit is dropped"]
#[derive(Debug)]
pub struct CommitmentPermit {
  commitment_id: Uuid,
  semaphore:     Arc<Semaphore>,
  permit:        Option<OwnedSemaphorePermit>,
  locks:         LockMap,
}

impl CommitmentLocks {
  pub fn try_acquire(&self, commitment_id: Uuid) -> Result<CommitmentPermit> {
    let semaphore = {
      let mut locks = self.locks.lock().unwrap_or_else(|err| err.into_inner());
      locks
        .entry(commitment_id)
        .or_insert_with(|| Arc::new(Semaphore::new(1)))
        .clone()
    };

    let permit = semaphore
      .clone()
      .try_acquire_owned()
      .map_err(|_| Error::MutationInProgress(commitment_id))?;
    Ok(CommitmentPermit {
      commitment_id,
      semaphore,
      permit: Some(permit),
      locks: self.locks.clone(),
    })
  }

  #[cfg(test)]
  fn len(&self) -> usize {
    self.locks.lock().unwrap_or_else(|err| err.into_inner()).len()
  }
}

impl Drop for CommitmentPermit {
  fn drop(&mut self) {
    let mut locks = self.locks.lock().unwrap_or_else(|err| err.into_inner());
    self.permit.take();
    // Clones are only taken under the map lock. Anything beyond the map's and
    // ours belongs to a caller still racing for this entry.
    if let Some(existing) = locks.get(&self.commitment_id)
      && Arc::ptr_eq(existing, &self.semaphore)
      && Arc::strong_count(&self.semaphore) == 2
    {
      locks.remove(&self.commitment_id);
    }
  }
}
