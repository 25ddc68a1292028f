//! In-process change-notification bus.
//!
//! Subscribers register a callback for one domain and are invoked
//! synchronously, in registration order, after every completed mutation of
//! that domain.  Notifications carry no payload; consumers re-fetch the
//! current state instead of receiving diffs.

use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Mutex, Weak};

/// Notification topic.  Granularity is the domain entity, nothing finer:
/// per-user slots (cart, wishlist, wallet) share their domain's topic and
/// consumers re-fetch their own user's state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Domain {
    Products,
    Orders,
    Chat,
    Cart,
    Wishlist,
    Wallet,
}

type Listener = Arc<dyn Fn() + Send + Sync + 'static>;

#[derive(Default)]
struct BusInner {
    next_id: u64,
    listeners: HashMap<Domain, Vec<(u64, Listener)>>,
}

/// The bus itself.  [`crate::Store`] owns one and exposes it through
/// [`crate::Store::subscribe`].
#[derive(Default)]
pub struct ChangeBus {
    inner: Arc<Mutex<BusInner>>,
}

impl ChangeBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `listener` for `domain`.  The returned [`Subscription`] is
    /// the disposer: cancel it explicitly or let it drop.
    pub fn subscribe(
        &self,
        domain: Domain,
        listener: impl Fn() + Send + Sync + 'static,
    ) -> Subscription {
        let mut inner = lock(&self.inner);
        let id = inner.next_id;
        inner.next_id += 1;
        inner
            .listeners
            .entry(domain)
            .or_default()
            .push((id, Arc::new(listener)));

        Subscription {
            registry: Arc::downgrade(&self.inner),
            domain,
            id,
        }
    }

    /// Invoke every listener registered for `domain`, in registration order.
    ///
    /// A panicking listener is isolated and logged; the remaining listeners
    /// still run.
    pub fn publish(&self, domain: Domain) {
        // Snapshot under the lock so listeners may subscribe or cancel
        // without deadlocking.
        let snapshot: Vec<Listener> = {
            let inner = lock(&self.inner);
            inner
                .listeners
                .get(&domain)
                .map(|ls| ls.iter().map(|(_, l)| l.clone()).collect())
                .unwrap_or_default()
        };

        for listener in snapshot {
            if catch_unwind(AssertUnwindSafe(|| listener())).is_err() {
                tracing::error!(?domain, "change listener panicked; continuing");
            }
        }
    }
}

fn lock(inner: &Mutex<BusInner>) -> std::sync::MutexGuard<'_, BusInner> {
    // Keep the registry usable even if a thread panicked mid-update.
    inner.lock().unwrap_or_else(|p| p.into_inner())
}

/// Disposer for one registered listener.
///
/// `cancel` is idempotent and safe to call any number of times; dropping the
/// subscription cancels it as well.
pub struct Subscription {
    registry: Weak<Mutex<BusInner>>,
    domain: Domain,
    id: u64,
}

impl Subscription {
    pub fn cancel(&self) {
        if let Some(registry) = self.registry.upgrade() {
            let mut inner = lock(&registry);
            if let Some(listeners) = inner.listeners.get_mut(&self.domain) {
                listeners.retain(|(id, _)| *id != self.id);
            }
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn listeners_run_in_registration_order() {
        let bus = Arc::new(ChangeBus::new());
        let log = Arc::new(Mutex::new(Vec::new()));

        let l1 = log.clone();
        let _s1 = bus.subscribe(Domain::Products, move || l1.lock().unwrap().push("first"));
        let l2 = log.clone();
        let _s2 = bus.subscribe(Domain::Products, move || l2.lock().unwrap().push("second"));

        bus.publish(Domain::Products);
        assert_eq!(*log.lock().unwrap(), vec!["first", "second"]);
    }

    #[test]
    fn publish_is_scoped_to_the_domain() {
        let bus = Arc::new(ChangeBus::new());
        let hits = Arc::new(AtomicUsize::new(0));

        let h = hits.clone();
        let _sub = bus.subscribe(Domain::Orders, move || {
            h.fetch_add(1, Ordering::SeqCst);
        });

        bus.publish(Domain::Products);
        assert_eq!(hits.load(Ordering::SeqCst), 0);
        bus.publish(Domain::Orders);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn cancel_is_idempotent() {
        let bus = Arc::new(ChangeBus::new());
        let hits = Arc::new(AtomicUsize::new(0));

        let h = hits.clone();
        let sub = bus.subscribe(Domain::Cart, move || {
            h.fetch_add(1, Ordering::SeqCst);
        });

        sub.cancel();
        sub.cancel();
        bus.publish(Domain::Cart);
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn drop_cancels_the_subscription() {
        let bus = Arc::new(ChangeBus::new());
        let hits = Arc::new(AtomicUsize::new(0));

        let h = hits.clone();
        let sub = bus.subscribe(Domain::Wallet, move || {
            h.fetch_add(1, Ordering::SeqCst);
        });
        drop(sub);

        bus.publish(Domain::Wallet);
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn a_panicking_listener_does_not_stop_the_others() {
        let bus = Arc::new(ChangeBus::new());
        let hits = Arc::new(AtomicUsize::new(0));

        let _bad = bus.subscribe(Domain::Chat, || panic!("listener bug"));
        let h = hits.clone();
        let _good = bus.subscribe(Domain::Chat, move || {
            h.fetch_add(1, Ordering::SeqCst);
        });

        bus.publish(Domain::Chat);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }
}
