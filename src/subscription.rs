//! Event subscription table and handler dispatch.
//!
//! Handlers are kept per [`EventCategory`] in registration order and
//! addressed by [`SubscriptionId`].  Dispatch works on a *copy* of the
//! handler list, so handlers are never invoked while the session lock is
//! held and may freely subscribe, unsubscribe or issue commands.

use futures::future::BoxFuture;
use futures::FutureExt;
use log::warn;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use crate::events::{EventCategory, WorldEvent};

/// Handle returned by `subscribe*`; pass it back to `unsubscribe`.
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq)]
pub struct SubscriptionId {
    category: EventCategory,
    seq: u64,
}

impl SubscriptionId {
    pub fn category(&self) -> EventCategory {
        self.category
    }
}

pub(crate) type SyncHandler = Arc<dyn Fn(&WorldEvent) + Send + Sync>;
pub(crate) type AsyncHandler = Arc<dyn Fn(WorldEvent) -> BoxFuture<'static, ()> + Send + Sync>;

#[derive(Clone)]
pub(crate) enum Handler {
    Sync(SyncHandler),
    Async(AsyncHandler),
}

// ---------------------------------------------------------------------------
// Table
// ---------------------------------------------------------------------------

#[derive(Default)]
pub(crate) struct Subscribers {
    by_category: [Vec<(u64, Handler)>; 3],
    next_seq: u64,
}

impl Subscribers {
    /// Allocate an id without storing a handler (used once the session is
    /// closed, so late subscribers get a valid but inert id).
    pub fn reserve(&mut self, category: EventCategory) -> SubscriptionId {
        self.next_seq += 1;
        SubscriptionId {
            category,
            seq: self.next_seq,
        }
    }

    pub fn insert(&mut self, category: EventCategory, handler: Handler) -> SubscriptionId {
        let id = self.reserve(category);
        self.by_category[category.index()].push((id.seq, handler));
        id
    }

    /// Returns `false` if `id` was not registered.
    pub fn remove(&mut self, id: SubscriptionId) -> bool {
        let list = &mut self.by_category[id.category.index()];
        let before = list.len();
        list.retain(|(seq, _)| *seq != id.seq);
        list.len() != before
    }

    pub fn snapshot(&self, category: EventCategory) -> Vec<Handler> {
        self.by_category[category.index()]
            .iter()
            .map(|(_, h)| h.clone())
            .collect()
    }

    pub fn len(&self, category: EventCategory) -> usize {
        self.by_category[category.index()].len()
    }

    /// Empty the table and hand back the removed handlers, so the caller can
    /// drop them outside its lock.
    pub fn clear(&mut self) -> Vec<Handler> {
        self.by_category
            .iter_mut()
            .flat_map(|list| list.drain(..).map(|(_, h)| h))
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

/// Run `handlers` in order.  A panicking handler is logged and skipped.
pub(crate) async fn dispatch(event: &WorldEvent, handlers: Vec<Handler>) {
    let category = event.category();
    for handler in handlers {
        match handler {
            Handler::Sync(f) => {
                if std::panic::catch_unwind(AssertUnwindSafe(|| f(event))).is_err() {
                    warn!("A {} handler panicked; continuing with the next one", category);
                }
            }
            Handler::Async(f) => {
                let fut = match std::panic::catch_unwind(AssertUnwindSafe(|| f(event.clone()))) {
                    Ok(fut) => fut,
                    Err(_) => {
                        warn!("A {} handler panicked; continuing with the next one", category);
                        continue;
                    }
                };
                if AssertUnwindSafe(fut).catch_unwind().await.is_err() {
                    warn!("A {} handler panicked; continuing with the next one", category);
                }
            }
        }
    }
}
