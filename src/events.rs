//! Typed notifications
//!
//! Three event kinds, each with its own subscriber list. A subscriber may
//! carry a predicate (typically "only this document") and is called with the
//! event and a mutable handle on the context that owns the bus, so it can
//! trigger further mutations from inside a handler.
//!
//! Delivery is queued: events raised while another event is being delivered
//! are appended to the queue and delivered afterwards, in order. An event
//! reaches every subscriber before the next one is delivered.

use crate::id::DocumentId;
use crate::types::PipelineRecord;
use crossbeam_channel::{Receiver, Sender};
use std::collections::{HashSet, VecDeque};
use std::fmt;

/// A variable was registered, or is the new name of a renamed variable
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariableAdded {
    pub document: DocumentId,
    pub name: String,
    pub renamed_from: Option<String>,
}

/// A variable was removed, or is the old name of a renamed variable
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariableRemoved {
    pub document: DocumentId,
    pub name: String,
    pub renamed_to: Option<String>,
    /// Pipeline records deleted because their recipe used the variable.
    /// Always empty for a rename.
    pub dropped: Vec<PipelineRecord>,
}

/// A document became the active one
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentActivated {
    pub document: DocumentId,
    /// Whether the document's state was created by this activation
    pub is_new: bool,
}

/// Any store event, as queued and as sent to channel subscribers
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreEvent {
    VariableAdded(VariableAdded),
    VariableRemoved(VariableRemoved),
    DocumentActivated(DocumentActivated),
}

impl StoreEvent {
    pub fn document(&self) -> DocumentId {
        match self {
            StoreEvent::VariableAdded(e) => e.document,
            StoreEvent::VariableRemoved(e) => e.document,
            StoreEvent::DocumentActivated(e) => e.document,
        }
    }
}

impl From<VariableAdded> for StoreEvent {
    fn from(e: VariableAdded) -> Self {
        StoreEvent::VariableAdded(e)
    }
}

impl From<VariableRemoved> for StoreEvent {
    fn from(e: VariableRemoved) -> Self {
        StoreEvent::VariableRemoved(e)
    }
}

impl From<DocumentActivated> for StoreEvent {
    fn from(e: DocumentActivated) -> Self {
        StoreEvent::DocumentActivated(e)
    }
}

/// Handle returned by a subscription, used to unsubscribe
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

impl fmt::Debug for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SubscriptionId({})", self.0)
    }
}

type Handler<E, C> = Box<dyn FnMut(&E, &mut C)>;
type Predicate<E> = Box<dyn Fn(&E) -> bool>;

struct Subscriber<E, C> {
    id: SubscriptionId,
    predicate: Option<Predicate<E>>,
    handler: Handler<E, C>,
}

/// Subscriber list of one event kind
pub struct Subscribers<E, C> {
    entries: Vec<Subscriber<E, C>>,
}

impl<E, C> Default for Subscribers<E, C> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<E, C> Subscribers<E, C> {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn remove(&mut self, id: SubscriptionId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|s| s.id != id);
        self.entries.len() != before
    }
}

/// One of the three event kinds
pub trait Event: fmt::Debug + Clone + Into<StoreEvent> + 'static {
    /// The bus list holding subscribers of this kind
    fn subscribers<C>(bus: &mut EventBus<C>) -> &mut Subscribers<Self, C>;

    /// Document the event is about
    fn document(&self) -> DocumentId;
}

impl Event for VariableAdded {
    fn subscribers<C>(bus: &mut EventBus<C>) -> &mut Subscribers<Self, C> {
        &mut bus.variable_added
    }

    fn document(&self) -> DocumentId {
        self.document
    }
}

impl Event for VariableRemoved {
    fn subscribers<C>(bus: &mut EventBus<C>) -> &mut Subscribers<Self, C> {
        &mut bus.variable_removed
    }

    fn document(&self) -> DocumentId {
        self.document
    }
}

impl Event for DocumentActivated {
    fn subscribers<C>(bus: &mut EventBus<C>) -> &mut Subscribers<Self, C> {
        &mut bus.document_activated
    }

    fn document(&self) -> DocumentId {
        self.document
    }
}

/// Owner of an [`EventBus`], handed to handlers during delivery.
pub trait EventContext: Sized + 'static {
    fn bus(&mut self) -> &mut EventBus<Self>;

    /// Move events raised outside the bus (outboxes) into its queue.
    /// Called before every event is taken off the queue.
    fn collect_pending(&mut self) {}
}

/// Subscriber lists, the pending queue and channel senders
pub struct EventBus<C> {
    next_id: u64,
    variable_added: Subscribers<VariableAdded, C>,
    variable_removed: Subscribers<VariableRemoved, C>,
    document_activated: Subscribers<DocumentActivated, C>,
    channels: Vec<Sender<StoreEvent>>,
    queue: VecDeque<StoreEvent>,
    dispatching: bool,
    /// Subscribers of the list currently taken out for delivery
    delivering: HashSet<SubscriptionId>,
    /// Unsubscribed while their list was taken out for delivery
    cancelled: HashSet<SubscriptionId>,
}

impl<C> Default for EventBus<C> {
    fn default() -> Self {
        Self {
            next_id: 1,
            variable_added: Subscribers::default(),
            variable_removed: Subscribers::default(),
            document_activated: Subscribers::default(),
            channels: Vec::new(),
            queue: VecDeque::new(),
            dispatching: false,
            delivering: HashSet::new(),
            cancelled: HashSet::new(),
        }
    }
}

impl<C> fmt::Debug for EventBus<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("variable_added", &self.variable_added.len())
            .field("variable_removed", &self.variable_removed.len())
            .field("document_activated", &self.document_activated.len())
            .field("channels", &self.channels.len())
            .field("queued", &self.queue.len())
            .field("dispatching", &self.dispatching)
            .finish()
    }
}

impl<C> EventBus<C> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a subscriber for events of kind `E`
    pub fn subscribe<E, F>(&mut self, handler: F) -> SubscriptionId
    where
        E: Event,
        F: FnMut(&E, &mut C) + 'static,
    {
        self.add_subscriber(None, Box::new(handler))
    }

    /// Add a subscriber called only for events accepted by `predicate`
    pub fn subscribe_filtered<E, P, F>(&mut self, predicate: P, handler: F) -> SubscriptionId
    where
        E: Event,
        P: Fn(&E) -> bool + 'static,
        F: FnMut(&E, &mut C) + 'static,
    {
        self.add_subscriber(Some(Box::new(predicate)), Box::new(handler))
    }

    fn add_subscriber<E: Event>(
        &mut self,
        predicate: Option<Predicate<E>>,
        handler: Handler<E, C>,
    ) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        E::subscribers(self).entries.push(Subscriber {
            id,
            predicate,
            handler,
        });
        id
    }

    /// Remove a subscriber. Safe to call from inside a handler, including
    /// the subscriber's own. Returns false if `id` is unknown.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        if self.variable_added.remove(id)
            || self.variable_removed.remove(id)
            || self.document_activated.remove(id)
        {
            return true;
        }
        // Its list is out for delivery; drop it when the list comes back
        self.delivering.contains(&id) && self.cancelled.insert(id)
    }

    /// A receiver getting a clone of every delivered event
    pub fn channel(&mut self) -> Receiver<StoreEvent> {
        let (tx, rx) = crossbeam_channel::unbounded();
        self.channels.push(tx);
        rx
    }

    /// Queue an event for the next [`EventBus::dispatch`]
    pub fn enqueue(&mut self, event: impl Into<StoreEvent>) {
        self.queue.push_back(event.into());
    }

    pub fn is_dispatching(&self) -> bool {
        self.dispatching
    }

    /// Number of events waiting for delivery
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    fn broadcast(&mut self, event: &StoreEvent) {
        self.channels.retain(|tx| tx.send(event.clone()).is_ok());
    }
}

impl<C: EventContext> EventBus<C> {
    /// Deliver queued events until the queue is empty.
    ///
    /// A no-op when called from inside a handler; whatever the handler
    /// raised is delivered by the outer call once the current event is done.
    pub fn dispatch(ctx: &mut C) {
        if ctx.bus().dispatching {
            return;
        }
        ctx.bus().dispatching = true;

        loop {
            ctx.collect_pending();
            let Some(event) = ctx.bus().queue.pop_front() else {
                break;
            };
            tracing::trace!("Delivering {:?}", event);
            ctx.bus().broadcast(&event);
            match &event {
                StoreEvent::VariableAdded(e) => deliver(ctx, e),
                StoreEvent::VariableRemoved(e) => deliver(ctx, e),
                StoreEvent::DocumentActivated(e) => deliver(ctx, e),
            }
        }

        let bus = ctx.bus();
        bus.dispatching = false;
        bus.cancelled.clear();
    }
}

fn deliver<C: EventContext, E: Event>(ctx: &mut C, event: &E) {
    let mut taken = std::mem::take(E::subscribers(ctx.bus()));
    ctx.bus().delivering = taken.entries.iter().map(|s| s.id).collect();

    for sub in taken.entries.iter_mut() {
        if ctx.bus().cancelled.contains(&sub.id) {
            continue;
        }
        if sub.predicate.as_ref().map_or(true, |p| p(event)) {
            (sub.handler)(event, ctx);
        }
    }

    let bus = ctx.bus();
    bus.delivering.clear();
    let cancelled = bus.cancelled.clone();
    let added_meanwhile = std::mem::replace(E::subscribers(bus), taken);
    let list = E::subscribers(bus);
    list.entries.extend(added_meanwhile.entries);
    list.entries.retain(|s| !cancelled.contains(&s.id));
}
