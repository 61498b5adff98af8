//! # Typed, Cancelable Event Bus
//!
//! [`EventBus`] is the publish/subscribe primitive every Naja component owns.
//! Listeners subscribe to a detail type `D` (see [`EventDetail`]) and receive
//! a mutable [`Event<D>`] so they can amend the detail, cancel the default
//! action or stop propagation to the remaining listeners.
//!
//! # Ordering
//!
//! Listeners for one event type are kept in a singly-linked chain in
//! registration order. Capture-phase listeners run before bubble-phase ones.
//!
//! # Re-entrancy
//!
//! The chain is snapshotted before listeners run and the lock is released, so
//! a listener may subscribe, unsubscribe or dispatch on the same bus. Changes
//! made during a dispatch take effect from the next dispatch on.

use std::{
    any::{Any, TypeId},
    collections::HashMap,
    fmt,
    sync::{
        Arc, Mutex, MutexGuard, PoisonError,
        atomic::{AtomicU64, Ordering},
    },
};

/// Describes the payload carried by one kind of event.
#[diagnostic::on_unimplemented(
    message = "`{Self}` is not an event detail",
    label = "missing `EventDetail` implementation",
    note = "Event details must name their event type and cancelability."
)]
pub trait EventDetail: Send + Sync + 'static {
    /// Public name of the event, e.g. `"before"`.
    const TYPE: &'static str;

    /// Whether listeners may veto the default action.
    const CANCELABLE: bool = false;
}

/// A single dispatch of an event.
///
/// Created per dispatch, handed to every listener in order and discarded (or
/// unpacked with [`Event::into_detail`]) once the dispatch returns.
pub struct Event<D> {
    /// Event-specific fields.
    pub detail: D,
    default_prevented: bool,
    propagation_stopped: bool,
}

impl<D: EventDetail> Event<D> {
    /// Wrap a detail into a fresh event.
    pub fn new(detail: D) -> Self {
        Self {
            detail,
            default_prevented: false,
            propagation_stopped: false,
        }
    }

    /// Public name of the event.
    pub fn event_type(&self) -> &'static str {
        D::TYPE
    }

    /// Whether [`prevent_default`](Self::prevent_default) has any effect.
    pub fn cancelable(&self) -> bool {
        D::CANCELABLE
    }

    /// Cancel the default action. No-op on non-cancelable events.
    pub fn prevent_default(&mut self) {
        if D::CANCELABLE {
            self.default_prevented = true;
        }
    }

    /// Whether a listener canceled the default action.
    pub fn default_prevented(&self) -> bool {
        self.default_prevented
    }

    /// Skip every listener that has not run yet.
    pub fn stop_immediate_propagation(&mut self) {
        self.propagation_stopped = true;
    }

    /// Whether a listener stopped propagation.
    pub fn propagation_stopped(&self) -> bool {
        self.propagation_stopped
    }

    /// Unpack the (possibly amended) detail.
    pub fn into_detail(self) -> D {
        self.detail
    }
}

impl<D: fmt::Debug> fmt::Debug for Event<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Event")
            .field("detail", &self.detail)
            .field("default_prevented", &self.default_prevented)
            .field("propagation_stopped", &self.propagation_stopped)
            .finish()
    }
}

/// Handle returned by [`EventBus::add_listener`], used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// Registration flags.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ListenerOptions {
    /// Remove the listener after its first invocation.
    pub once: bool,
    /// Run in the capture phase, ahead of bubble-phase listeners.
    pub capture: bool,
}

impl ListenerOptions {
    /// Options for a listener that fires at most once.
    pub const fn once() -> Self {
        Self {
            once: true,
            capture: false,
        }
    }

    /// Options for a capture-phase listener.
    pub const fn capture() -> Self {
        Self {
            once: false,
            capture: true,
        }
    }
}

type ListenerFn<D> = Arc<dyn Fn(&mut Event<D>) + Send + Sync>;

struct Node<D> {
    id: ListenerId,
    options: ListenerOptions,
    listener: ListenerFn<D>,
    next: Option<Box<Node<D>>>,
}

struct ListenerChain<D> {
    head: Option<Box<Node<D>>>,
}

impl<D> ListenerChain<D> {
    fn new() -> Self {
        Self { head: None }
    }

    fn append(slot: &mut Option<Box<Node<D>>>, node: Box<Node<D>>) {
        match slot {
            Some(current) => Self::append(&mut current.next, node),
            None => *slot = Some(node),
        }
    }

    fn remove(slot: &mut Option<Box<Node<D>>>, id: ListenerId) -> bool {
        match slot {
            Some(current) if current.id == id => {
                let next = current.next.take();
                *slot = next;
                true
            }
            Some(current) => Self::remove(&mut current.next, id),
            None => false,
        }
    }

    fn is_empty(&self) -> bool {
        self.head.is_none()
    }

    /// Ordered snapshot: capture phase first, then bubble phase.
    fn snapshot(&self) -> Vec<(ListenerId, ListenerOptions, ListenerFn<D>)> {
        let mut capture = Vec::new();
        let mut bubble = Vec::new();
        let mut cursor = self.head.as_deref();
        while let Some(node) = cursor {
            let entry = (node.id, node.options, node.listener.clone());
            if node.options.capture {
                capture.push(entry);
            } else {
                bubble.push(entry);
            }
            cursor = node.next.as_deref();
        }
        capture.extend(bubble);
        capture
    }
}

/// Typed publish/subscribe primitive.
pub struct EventBus {
    chains: Mutex<HashMap<TypeId, Box<dyn Any + Send + Sync>>>,
    next_id: AtomicU64,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("event_types", &self.lock().len())
            .finish()
    }
}

impl EventBus {
    /// Create a bus with no listeners.
    pub fn new() -> Self {
        Self {
            chains: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<TypeId, Box<dyn Any + Send + Sync>>> {
        self.chains.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Subscribe to events carrying `D`.
    pub fn add_listener<D, F>(&self, listener: F, options: ListenerOptions) -> ListenerId
    where
        D: EventDetail,
        F: Fn(&mut Event<D>) + Send + Sync + 'static,
    {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let node = Box::new(Node {
            id,
            options,
            listener: Arc::new(listener) as ListenerFn<D>,
            next: None,
        });

        let mut chains = self.lock();
        let entry = chains
            .entry(TypeId::of::<D>())
            .or_insert_with(|| Box::new(ListenerChain::<D>::new()) as Box<dyn Any + Send + Sync>);
        if let Some(chain) = entry.downcast_mut::<ListenerChain<D>>() {
            ListenerChain::append(&mut chain.head, node);
        }
        tracing::trace!(event = D::TYPE, listener = id.0, "listener added");
        id
    }

    /// Subscribe a bubble-phase listener.
    pub fn on<D, F>(&self, listener: F) -> ListenerId
    where
        D: EventDetail,
        F: Fn(&mut Event<D>) + Send + Sync + 'static,
    {
        self.add_listener(listener, ListenerOptions::default())
    }

    /// Subscribe a listener that is removed after its first invocation.
    pub fn once<D, F>(&self, listener: F) -> ListenerId
    where
        D: EventDetail,
        F: Fn(&mut Event<D>) + Send + Sync + 'static,
    {
        self.add_listener(listener, ListenerOptions::once())
    }

    /// Unsubscribe. Returns `false` if the listener was not registered for `D`.
    pub fn remove_listener<D: EventDetail>(&self, id: ListenerId) -> bool {
        let mut chains = self.lock();
        let Some(entry) = chains.get_mut(&TypeId::of::<D>()) else {
            return false;
        };
        let Some(chain) = entry.downcast_mut::<ListenerChain<D>>() else {
            return false;
        };
        let removed = ListenerChain::remove(&mut chain.head, id);
        if chain.is_empty() {
            chains.remove(&TypeId::of::<D>());
        }
        removed
    }

    /// Alias of [`remove_listener`](Self::remove_listener).
    pub fn off<D: EventDetail>(&self, id: ListenerId) -> bool {
        self.remove_listener::<D>(id)
    }

    /// Number of listeners subscribed to `D`.
    pub fn listener_count<D: EventDetail>(&self) -> usize {
        self.lock()
            .get(&TypeId::of::<D>())
            .and_then(|entry| entry.downcast_ref::<ListenerChain<D>>())
            .map_or(0, |chain| chain.snapshot().len())
    }

    /// Run every listener for `D` in order.
    ///
    /// Returns `false` if the event is cancelable and a listener called
    /// [`Event::prevent_default`].
    pub fn dispatch<D: EventDetail>(&self, event: &mut Event<D>) -> bool {
        let listeners = {
            let chains = self.lock();
            let Some(chain) = chains
                .get(&TypeId::of::<D>())
                .and_then(|entry| entry.downcast_ref::<ListenerChain<D>>())
            else {
                return !event.default_prevented();
            };
            chain.snapshot()
        };

        for (id, options, listener) in listeners {
            if event.propagation_stopped() {
                break;
            }
            // A once listener is consumed when it runs; a nested dispatch may have run it already.
            if options.once && !self.remove_listener::<D>(id) {
                continue;
            }
            listener(event);
        }

        !event.default_prevented()
    }

    /// Wrap `detail` into an event, dispatch it and hand the event back.
    pub fn emit<D: EventDetail>(&self, detail: D) -> Event<D> {
        let mut event = Event::new(detail);
        self.dispatch(&mut event);
        event
    }
}
