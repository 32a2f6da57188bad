//! Memoization slots with cross-thread cycle detection.
//!
//! The thread-local resolution stack only sees one thread. When two threads
//! each initialize one slot and then ask for the other's, both would block
//! forever. Every slot therefore records the thread initializing it, and a
//! thread about to wait first follows the chain of waiting threads. If the
//! chain leads back to itself the wait is refused with `CircularResolution`.

use crate::error::{ResolveError, Result};
use crate::key::{Instance, Key};
use once_cell::sync::{Lazy, OnceCell};
use parking_lot::{Condvar, Mutex};
use std::collections::HashMap;
use std::thread::{self, ThreadId};

/// Which thread waits on which, and for which key.
struct WaitTable {
  waits: Mutex<HashMap<ThreadId, (ThreadId, Key)>>,
  released: Condvar,
}

static WAIT_TABLE: Lazy<WaitTable> = Lazy::new(|| WaitTable {
  waits: Mutex::new(HashMap::new()),
  released: Condvar::new(),
});

/// One cached value of a scope.
#[derive(Default)]
pub(crate) struct Slot {
  value: OnceCell<Instance>,
  // Written only while the wait table lock is held.
  owner: Mutex<Option<ThreadId>>,
}

impl Slot {
  /// The cached value, if initialization already finished.
  pub(crate) fn get(&self) -> Option<&Instance> {
    self.value.get()
  }

  /// Returns the cached value or runs `init` exactly once per success.
  ///
  /// Concurrent callers wait for the thread that claimed the slot. A failed
  /// `init` leaves the slot empty and the next caller claims it.
  pub(crate) fn get_or_try_init(&self, key: &Key, init: impl FnOnce() -> Result<Instance>) -> Result<Instance> {
    if let Some(instance) = self.value.get() {
      return Ok(instance.clone());
    }
    let me = thread::current().id();
    let table = &*WAIT_TABLE;

    let mut waits = table.waits.lock();
    loop {
      if let Some(instance) = self.value.get() {
        return Ok(instance.clone());
      }
      let owner = *self.owner.lock();
      match owner {
        None => {
          *self.owner.lock() = Some(me);
          break;
        }
        Some(owner) if owner == me => {
          return Err(ResolveError::CircularResolution {
            path: vec![key.clone(), key.clone()],
          });
        }
        Some(owner) => {
          if let Some(path) = wait_cycle(&waits, key, owner, me) {
            tracing::debug!(key = %key, "Refusing to wait on a cross-thread cycle");
            return Err(ResolveError::CircularResolution { path });
          }
          waits.insert(me, (owner, key.clone()));
          table.released.wait(&mut waits);
          waits.remove(&me);
        }
      }
    }
    drop(waits);

    let _claim = Claim { slot: self, table };
    let instance = init()?;
    // Only the owner sets the value, so this cannot race.
    let _ = self.value.set(instance.clone());
    Ok(instance)
  }
}

/// Releases a claimed slot and wakes waiters, also when `init` panics.
struct Claim<'a> {
  slot: &'a Slot,
  table: &'a WaitTable,
}

impl Drop for Claim<'_> {
  fn drop(&mut self) {
    let _waits = self.table.waits.lock();
    *self.slot.owner.lock() = None;
    self.table.released.notify_all();
  }
}

/// Follows the wait chain starting at `owner`. Returns the awaited keys when
/// it leads back to `me`.
fn wait_cycle(
  waits: &HashMap<ThreadId, (ThreadId, Key)>,
  key: &Key,
  owner: ThreadId,
  me: ThreadId,
) -> Option<Vec<Key>> {
  let mut path = vec![key.clone()];
  let mut current = owner;
  // A chain can not be longer than the number of waiting threads.
  for _ in 0..=waits.len() {
    if current == me {
      path.push(key.clone());
      return Some(path);
    }
    let (next, awaited) = waits.get(&current)?;
    path.push(awaited.clone());
    current = *next;
  }
  None
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::sync::Arc;

  #[test]
  fn failed_init_leaves_the_slot_empty() {
    let slot = Slot::default();
    let key = Key::new("Flaky", None);

    let first = slot.get_or_try_init(&key, || Err(ResolveError::factory(key.clone(), "boom")));
    assert!(first.is_err());
    assert!(slot.get().is_none());

    let second = slot.get_or_try_init(&key, || Ok(Arc::new(Arc::new(1u8)) as Instance));
    assert!(second.is_ok());
    assert!(slot.get().is_some());
  }

  #[test]
  fn wait_cycle_follows_the_chain() {
    let t1 = thread::current().id();
    let t2 = thread::spawn(|| thread::current().id()).join().unwrap();
    let a = Key::new("A", None);
    let b = Key::new("B", None);

    let mut waits = HashMap::new();
    assert!(wait_cycle(&waits, &a, t2, t1).is_none());

    waits.insert(t2, (t1, b.clone()));
    assert_eq!(wait_cycle(&waits, &a, t2, t1), Some(vec![a.clone(), b, a]));
  }
}
