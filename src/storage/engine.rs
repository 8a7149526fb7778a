//! Thread-Safe Storage Engine with Lazy Expiry
//!
//! This module implements the core storage engine for lazykv: one `HashMap`
//! behind one `RwLock`, with a per-entry absolute expiry.
//!
//! ## Design Decisions
//!
//! 1. **Single RwLock**: Reads (`get`, the scan half of `keys`) share the lock;
//!    writes (`set`, `delete`, evictions) take it exclusively.
//! 2. **Lazy Expiry Only**: An expired entry stays in the map until something
//!    touches it. There is no background sweeper.
//! 3. **Unix Seconds**: Expiry is an absolute `i64` timestamp so callers can
//!    pass deadlines they computed themselves, not just durations.
//!
//! ## Eviction on Read
//!
//! ```text
//!   get(key)
//!     │
//!     ├─ read lock ── absent ─────────────────────────────> None
//!     │            ── live ───────────────────────────────> Some(value)
//!     │            ── expired
//!     │                 │
//!     │                 ▼
//!     └─ write lock ── still expired? ── yes: remove ─────> None
//!                                     ── no (refreshed) ──> None
//! ```
//!
//! The second check matters: between dropping the read lock and taking the
//! write lock another thread may have overwritten the key with a fresh
//! entry, which must survive.

use crate::storage::glob::{GlobError, GlobPattern};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::trace;

/// Expiry sentinel for entries that never expire.
pub const NEVER_EXPIRES: i64 = i64::MAX;

/// Current wall-clock time in unix seconds.
#[inline]
pub fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

/// Converts a relative TTL in seconds into an absolute expiry.
///
/// Negative TTLs produce a timestamp in the past; the entry is then stored
/// already expired. Saturates instead of overflowing, so a huge TTL ends up
/// at [`NEVER_EXPIRES`].
pub fn expiry_from_ttl(ttl_secs: i64) -> i64 {
    unix_now().saturating_add(ttl_secs)
}

/// A stored value with its absolute expiry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    /// The stored value
    pub value: String,
    /// Unix seconds after which the entry is gone ([`NEVER_EXPIRES`] = never)
    pub expires_at: i64,
}

impl Entry {
    /// Creates an entry expiring at `expires_at`.
    pub fn new(value: impl Into<String>, expires_at: i64) -> Self {
        Self {
            value: value.into(),
            expires_at,
        }
    }

    /// Creates an entry that never expires.
    pub fn persistent(value: impl Into<String>) -> Self {
        Self::new(value, NEVER_EXPIRES)
    }

    /// Checks whether this entry had expired at `now`.
    ///
    /// The boundary second itself is still live: an entry with
    /// `expires_at == now` is returned.
    #[inline]
    pub fn is_expired_at(&self, now: i64) -> bool {
        self.expires_at < now
    }

    /// Checks whether this entry has expired.
    #[inline]
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(unix_now())
    }

    fn into_live_value(self, now: i64) -> Option<String> {
        if self.is_expired_at(now) {
            None
        } else {
            Some(self.value)
        }
    }
}

/// Storage statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StorageStats {
    /// Entries physically in the map, including not-yet-evicted ones
    pub keys: u64,
    pub get_ops: u64,
    pub set_ops: u64,
    pub del_ops: u64,
    pub keys_ops: u64,
    /// Entries removed because they were found expired
    pub expired: u64,
}

/// The key-value store.
///
/// Wrap it in an `Arc` and hand clones to every task that needs it; all
/// operations take `&self`.
///
/// # Example
///
/// ```
/// use lazykv::storage::{Store, NEVER_EXPIRES, expiry_from_ttl};
///
/// let store = Store::new();
///
/// assert_eq!(store.set("name", "alice", NEVER_EXPIRES), None);
/// assert_eq!(store.get("name"), Some("alice".to_string()));
///
/// // Overwriting hands back the previous value
/// let old = store.set("name", "Zira", expiry_from_ttl(60));
/// assert_eq!(old, Some("alice".to_string()));
///
/// assert_eq!(store.keys("n*").unwrap(), vec!["name".to_string()]);
/// assert!(store.keys("[").is_err());
/// ```
pub struct Store {
    data: RwLock<HashMap<String, Entry>>,

    get_count: AtomicU64,
    set_count: AtomicU64,
    del_count: AtomicU64,
    keys_count: AtomicU64,
    expired_count: AtomicU64,
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field("keys", &self.len())
            .field("get_count", &self.get_count.load(Ordering::Relaxed))
            .field("set_count", &self.set_count.load(Ordering::Relaxed))
            .finish()
    }
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}

impl Store {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self {
            data: RwLock::new(HashMap::new()),
            get_count: AtomicU64::new(0),
            set_count: AtomicU64::new(0),
            del_count: AtomicU64::new(0),
            keys_count: AtomicU64::new(0),
            expired_count: AtomicU64::new(0),
        }
    }

    // Every mutation is a single HashMap call, so a writer that panicked
    // cannot have left the map half-updated and the poison flag is ignored.
    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, Entry>> {
        self.data.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, Entry>> {
        self.data.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Gets the live value for `key`.
    ///
    /// Returns `None` if the key is absent or expired. An expired entry is
    /// removed on the way out.
    pub fn get(&self, key: &str) -> Option<String> {
        self.get_count.fetch_add(1, Ordering::Relaxed);
        let now = unix_now();

        // Fast path: shared lock only
        {
            let data = self.read();
            match data.get(key) {
                None => return None,
                Some(entry) if !entry.is_expired_at(now) => return Some(entry.value.clone()),
                Some(_) => {}
            }
        }

        if self.evict_if_expired(key, now) {
            trace!(key, "evicted expired key on read");
        }

        None
    }

    /// Removes `key` if it is still expired at `now`. A writer may have
    /// refreshed it since the caller looked.
    fn evict_if_expired(&self, key: &str, now: i64) -> bool {
        let removed = remove_if_expired(&mut self.write(), key, now);
        if removed {
            self.expired_count.fetch_add(1, Ordering::Relaxed);
        }
        removed
    }

    /// Stores `value` under `key` until `expires_at` (unix seconds).
    ///
    /// Overwrites unconditionally. Returns the previous value if the entry
    /// being replaced was still live. An `expires_at` already in the past is
    /// accepted; the entry is simply dead on arrival.
    pub fn set(
        &self,
        key: impl Into<String>,
        value: impl Into<String>,
        expires_at: i64,
    ) -> Option<String> {
        self.set_count.fetch_add(1, Ordering::Relaxed);
        let now = unix_now();

        let previous = self
            .write()
            .insert(key.into(), Entry::new(value, expires_at));

        previous.and_then(|entry| entry.into_live_value(now))
    }

    /// Removes `key`.
    ///
    /// Returns the removed value if it was still live.
    pub fn delete(&self, key: &str) -> Option<String> {
        self.del_count.fetch_add(1, Ordering::Relaxed);
        let now = unix_now();

        let removed = self.write().remove(key);

        removed.and_then(|entry| entry.into_live_value(now))
    }

    /// Returns all live keys matching `pattern`, in no particular order.
    ///
    /// An empty pattern returns every live key without running the matcher.
    /// A malformed pattern fails the whole call. Expired keys seen during the
    /// scan are evicted once the scan has released its shared lock.
    ///
    /// **Warning**: This scans the whole map.
    pub fn keys(&self, pattern: &str) -> Result<Vec<String>, GlobError> {
        self.keys_count.fetch_add(1, Ordering::Relaxed);

        let pattern = if pattern.is_empty() {
            None
        } else {
            Some(GlobPattern::compile(pattern)?)
        };

        let now = unix_now();
        let mut result = Vec::new();
        let mut expired = Vec::new();

        {
            let data = self.read();
            for (key, entry) in data.iter() {
                if entry.is_expired_at(now) {
                    expired.push(key.clone());
                    continue;
                }
                if pattern.as_ref().map_or(true, |p| p.matches(key)) {
                    result.push(key.clone());
                }
            }
        }

        if !expired.is_empty() {
            self.evict(&expired, now);
        }

        Ok(result)
    }

    /// Removes the listed keys if they are still expired at `now`.
    fn evict(&self, keys: &[String], now: i64) {
        let mut data = self.write();
        let mut evicted = 0u64;

        for key in keys {
            if remove_if_expired(&mut data, key, now) {
                evicted += 1;
            }
        }

        if evicted > 0 {
            self.expired_count.fetch_add(evicted, Ordering::Relaxed);
            trace!(evicted, "evicted expired keys during scan");
        }
    }

    /// Returns the number of entries in the map.
    ///
    /// Expired entries that nothing has touched yet are still counted.
    pub fn len(&self) -> usize {
        self.read().len()
    }

    /// Returns true if the map holds no entries at all.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns store statistics.
    pub fn stats(&self) -> StorageStats {
        StorageStats {
            keys: self.len() as u64,
            get_ops: self.get_count.load(Ordering::Relaxed),
            set_ops: self.set_count.load(Ordering::Relaxed),
            del_ops: self.del_count.load(Ordering::Relaxed),
            keys_ops: self.keys_count.load(Ordering::Relaxed),
            expired: self.expired_count.load(Ordering::Relaxed),
        }
    }
}

fn remove_if_expired(data: &mut HashMap<String, Entry>, key: &str, now: i64) -> bool {
    if data.get(key).is_some_and(|entry| entry.is_expired_at(now)) {
        data.remove(key);
        true
    } else {
        false
    }
}
