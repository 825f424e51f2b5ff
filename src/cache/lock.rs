//! Poison-tolerant access to the in-memory store's entry map.
//!
//! A panic while the map is held cannot leave a half-written entry behind
//! (inserts and removals are single map operations), so the store keeps
//! serving from the recovered map and says so in the logs.

use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::warn;

fn recover<G>(
    poisoned: PoisonError<G>,
    store: &'static str,
    op: &'static str,
    access: &'static str,
) -> G {
    warn!(
        store,
        op,
        access,
        "Entry map lock was poisoned by a panicking request; serving cached entries as-is"
    );
    poisoned.into_inner()
}

pub(crate) fn rw_read<'a, T>(
    lock: &'a RwLock<T>,
    store: &'static str,
    op: &'static str,
) -> RwLockReadGuard<'a, T> {
    lock.read()
        .unwrap_or_else(|poisoned| recover(poisoned, store, op, "read"))
}

pub(crate) fn rw_write<'a, T>(
    lock: &'a RwLock<T>,
    store: &'static str,
    op: &'static str,
) -> RwLockWriteGuard<'a, T> {
    lock.write()
        .unwrap_or_else(|poisoned| recover(poisoned, store, op, "write"))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::panic::{AssertUnwindSafe, catch_unwind};

    use super::*;

    #[test]
    fn entries_written_before_a_panic_stay_readable() {
        let lock = RwLock::new(HashMap::new());

        let _ = catch_unwind(AssertUnwindSafe(|| {
            let mut entries = lock.write().expect("fresh lock");
            entries.insert("k", 1);
            panic!("request handler panicked");
        }));
        assert!(lock.is_poisoned());

        assert_eq!(rw_read(&lock, "test", "get").get("k"), Some(&1));
        rw_write(&lock, "test", "set").insert("k2", 2);
        assert_eq!(rw_read(&lock, "test", "len").len(), 2);
    }
}
