//! The store handle: mutation gateway plus change notification.
//!
//! A single [`Store`] is constructed at application start and passed by
//! reference to whatever needs it; there are no module-level singletons.
//! All domain operations (products, cart, orders, chat, wallet) are
//! implemented on this handle in their own modules and funnel every write
//! through [`Store::mutate_slot`].

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;

use localroots_shared::constants::{
    CART_SLOT_PREFIX, SLOT_CHAT_MESSAGES, SLOT_CHAT_THREADS, SLOT_ORDERS, SLOT_PRODUCTS,
    WALLET_SLOT_PREFIX, WISHLIST_SLOT_PREFIX,
};

use crate::backing::{KvBacking, MemoryBacking, SqliteBacking};
use crate::bus::{ChangeBus, Domain, Subscription};
use crate::error::Result;

/// Behavioural switches.  Everything has a sensible default.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Deduplicate chat threads by (buyer, seller, product) on open.
    /// Uniqueness is the default; turn this off to allow duplicate
    /// conversations for the same triple.
    pub enforce_unique_threads: bool,
    /// Compare-and-set attempts per mutation before falling back to a
    /// last-writer-wins write.  A budget of `n` tolerates `n - 1` competing
    /// writers landing between a read and its write.
    pub write_retries: u32,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            enforce_unique_threads: true,
            write_retries: 4,
        }
    }
}

/// Handle to the reactive store.  Cheap to share behind an `Arc`; all
/// methods take `&self`.
pub struct Store {
    backing: Box<dyn KvBacking>,
    bus: ChangeBus,
    config: StoreConfig,
    /// Slot versions this instance has already observed, used by
    /// [`Store::refresh`] to avoid re-announcing our own writes.
    seen: Mutex<HashMap<String, u64>>,
}

impl Store {
    /// Wrap an existing backing.  This is the dependency-injection seam; the
    /// `open_*` constructors below are conveniences over it.
    pub fn new(backing: Box<dyn KvBacking>, config: StoreConfig) -> Result<Self> {
        let seen = backing.versions()?.into_iter().collect();
        Ok(Self {
            backing,
            bus: ChangeBus::new(),
            config,
            seen: Mutex::new(seen),
        })
    }

    /// Open the default on-disk store in the platform data directory.
    pub fn open() -> Result<Self> {
        Self::new(Box::new(SqliteBacking::open_default()?), StoreConfig::default())
    }

    /// Open an on-disk store at an explicit path.
    pub fn open_at(path: &Path) -> Result<Self> {
        Self::new(Box::new(SqliteBacking::open_at(path)?), StoreConfig::default())
    }

    /// Open a throwaway in-memory store.
    pub fn open_in_memory() -> Result<Self> {
        Self::new(Box::new(MemoryBacking::new()), StoreConfig::default())
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Register a change listener for one domain.  See
    /// [`ChangeBus::subscribe`].
    pub fn subscribe(
        &self,
        domain: Domain,
        listener: impl Fn() + Send + Sync + 'static,
    ) -> Subscription {
        self.bus.subscribe(domain, listener)
    }

    // ------------------------------------------------------------------
    // Mutation gateway
    // ------------------------------------------------------------------

    /// Load a slot's collection.  Missing slots, corrupt payloads, and
    /// backing failures all decode to `[]`; the store never fails a read.
    pub(crate) fn load_slot<T: DeserializeOwned>(&self, key: &str) -> Vec<T> {
        let (raw, _) = self.raw_slot(key);
        decode(key, raw.as_deref())
    }

    /// Read-modify-write a slot, then notify `domain` subscribers.
    ///
    /// The closure may run more than once: when a competing writer lands
    /// between the read and the write, the slot is reloaded and the closure
    /// re-applied, which also keeps generated ids unique across writers.
    /// Once the retry budget is spent the write degrades to an
    /// unconditional last-writer-wins write, with a warning.
    ///
    /// Every completed mutation notifies each current subscriber exactly
    /// once, before this function returns.  A closure that leaves the
    /// encoded collection byte-identical skips the write but still
    /// notifies; subscribers hear every mutation, not just effective ones.
    pub(crate) fn mutate_slot<T, F>(&self, domain: Domain, key: &str, mut f: F) -> Vec<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnMut(Vec<T>) -> Vec<T>,
    {
        for _ in 0..self.config.write_retries {
            let (raw, version) = self.raw_slot(key);
            let next = f(decode(key, raw.as_deref()));

            let encoded = match serde_json::to_string(&next) {
                Ok(encoded) => encoded,
                Err(e) => {
                    tracing::error!(key, error = %e, "slot encode failed; dropping write");
                    return next;
                }
            };

            if raw.as_deref() == Some(encoded.as_str()) {
                self.bus.publish(domain);
                return next;
            }

            match self.backing.compare_and_set(key, &encoded, version) {
                Ok(true) => {
                    self.record_seen(key, version + 1);
                    self.bus.publish(domain);
                    return next;
                }
                Ok(false) => continue,
                Err(e) => {
                    tracing::error!(key, error = %e, "slot write failed; dropping write");
                    return next;
                }
            }
        }

        tracing::warn!(key, "slot contended past retry budget; last writer wins");
        let (raw, _) = self.raw_slot(key);
        let next = f(decode(key, raw.as_deref()));
        match serde_json::to_string(&next) {
            Ok(encoded) => {
                if let Err(e) = self.backing.set(key, &encoded) {
                    tracing::error!(key, error = %e, "slot write failed; dropping write");
                    return next;
                }
                if let Ok(Some(slot)) = self.backing.get(key) {
                    self.record_seen(key, slot.version);
                }
                self.bus.publish(domain);
            }
            Err(e) => tracing::error!(key, error = %e, "slot encode failed; dropping write"),
        }
        next
    }

    fn raw_slot(&self, key: &str) -> (Option<String>, u64) {
        match self.backing.get(key) {
            Ok(Some(slot)) => (Some(slot.value), slot.version),
            Ok(None) => (None, 0),
            Err(e) => {
                tracing::warn!(key, error = %e, "slot read failed; treating as empty");
                (None, 0)
            }
        }
    }

    fn record_seen(&self, key: &str, version: u64) {
        self.seen_lock().insert(key.to_string(), version);
    }

    fn seen_lock(&self) -> MutexGuard<'_, HashMap<String, u64>> {
        self.seen.lock().unwrap_or_else(|p| p.into_inner())
    }

    // ------------------------------------------------------------------
    // Cross-instance sync
    // ------------------------------------------------------------------

    /// Detect slots written by sibling instances of the same backing and
    /// publish their domains on the local bus.  Our own writes are never
    /// re-announced.  Returns the number of domains published.
    pub fn refresh(&self) -> usize {
        let versions = match self.backing.versions() {
            Ok(versions) => versions,
            Err(e) => {
                tracing::warn!(error = %e, "refresh failed to read slot versions");
                return 0;
            }
        };

        let mut changed = Vec::new();
        {
            let mut seen = self.seen_lock();
            for (key, version) in versions {
                if seen.get(&key) == Some(&version) {
                    continue;
                }
                seen.insert(key.clone(), version);
                match domain_for_key(&key) {
                    Some(domain) if !changed.contains(&domain) => changed.push(domain),
                    Some(_) => {}
                    // Foreign keys in a shared backing are none of our
                    // business.
                    None => tracing::debug!(key, "ignoring unknown slot key"),
                }
            }
        }

        for domain in &changed {
            self.bus.publish(*domain);
        }
        changed.len()
    }
}

/// Poll [`Store::refresh`] on a fixed period.  Abort the returned handle to
/// stop.  This is the background transport that makes sibling instances look
/// live; in-process subscribers already hear their own writes synchronously.
pub fn spawn_refresh(store: Arc<Store>, period: Duration) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            store.refresh();
        }
    })
}

/// Map a slot key back to its notification domain.
fn domain_for_key(key: &str) -> Option<Domain> {
    match key {
        SLOT_PRODUCTS => Some(Domain::Products),
        SLOT_ORDERS => Some(Domain::Orders),
        SLOT_CHAT_THREADS | SLOT_CHAT_MESSAGES => Some(Domain::Chat),
        _ if key.starts_with(CART_SLOT_PREFIX) => Some(Domain::Cart),
        _ if key.starts_with(WISHLIST_SLOT_PREFIX) => Some(Domain::Wishlist),
        _ if key.starts_with(WALLET_SLOT_PREFIX) => Some(Domain::Wallet),
        _ => None,
    }
}

pub(crate) fn cart_slot(user_id: &str) -> String {
    format!("{CART_SLOT_PREFIX}{user_id}")
}

pub(crate) fn wishlist_slot(user_id: &str) -> String {
    format!("{WISHLIST_SLOT_PREFIX}{user_id}")
}

pub(crate) fn wallet_slot(user_id: &str) -> String {
    format!("{WALLET_SLOT_PREFIX}{user_id}")
}

/// Next generator-assigned id: `max(existing) + 1`.
pub(crate) fn next_id(ids: impl Iterator<Item = i64>) -> i64 {
    ids.max().unwrap_or(0) + 1
}

fn decode<T: DeserializeOwned>(key: &str, raw: Option<&str>) -> Vec<T> {
    match raw {
        None => Vec::new(),
        Some(raw) => serde_json::from_str(raw).unwrap_or_else(|e| {
            tracing::warn!(key, error = %e, "corrupt slot payload; treating as empty");
            Vec::new()
        }),
    }
}
