use serde::{Deserialize, Serialize};
use std::fmt;

/// Semantic lifecycle events emitted by a modal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModalEvent {
    /// Presentation finished and the dialog is interactive
    Shown,
    /// Dismissal finished and the dialog surface is gone
    Hidden,
    /// The user asked to dismiss without confirming
    Cancel,
    /// The user confirmed the dialog
    Ok,
}

impl ModalEvent {
    pub(crate) const COUNT: usize = 4;

    pub(crate) fn lane(self) -> usize {
        match self {
            ModalEvent::Shown => 0,
            ModalEvent::Hidden => 1,
            ModalEvent::Cancel => 2,
            ModalEvent::Ok => 3,
        }
    }

    /// Event name as a lowercase string
    pub fn as_str(self) -> &'static str {
        match self {
            ModalEvent::Shown => "shown",
            ModalEvent::Hidden => "hidden",
            ModalEvent::Cancel => "cancel",
            ModalEvent::Ok => "ok",
        }
    }
}

impl fmt::Display for ModalEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Token identifying a registered handler, used to unsubscribe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Subscription(u64);

type Handler<T> = Box<dyn FnMut(&mut T) + Send + Sync>;

struct Entry<T> {
    id: u64,
    once: bool,
    handler: Handler<T>,
}

/// Per-event handler registry for a target of type `T`.
///
/// Handlers receive `&mut T`, so emission detaches the handler list from the
/// registry first ([`dispatch`](Emitter::dispatch)), runs it against the
/// target, and reattaches it ([`finish`](Emitter::finish)). Handlers
/// registered while an emission is running take effect from the next
/// emission of that event; unsubscribing a handler that is part of the
/// running emission takes effect after it completes.
pub struct Emitter<T> {
    lanes: [Vec<Entry<T>>; ModalEvent::COUNT],
    /// Ids currently out on a [`Dispatch`], per lane
    detached: [Vec<u64>; ModalEvent::COUNT],
    /// Ids unsubscribed while detached, dropped on reattach
    removals: [Vec<u64>; ModalEvent::COUNT],
    next_id: u64,
}

impl<T> Emitter<T> {
    pub fn new() -> Self {
        Self {
            lanes: std::array::from_fn(|_| Vec::new()),
            detached: std::array::from_fn(|_| Vec::new()),
            removals: std::array::from_fn(|_| Vec::new()),
            next_id: 0,
        }
    }

    /// Register a handler for `event`
    pub fn on(
        &mut self,
        event: ModalEvent,
        handler: impl FnMut(&mut T) + Send + Sync + 'static,
    ) -> Subscription {
        self.subscribe(event, Box::new(handler), false)
    }

    /// Register a handler that runs at most once
    pub fn once(
        &mut self,
        event: ModalEvent,
        handler: impl FnMut(&mut T) + Send + Sync + 'static,
    ) -> Subscription {
        self.subscribe(event, Box::new(handler), true)
    }

    fn subscribe(&mut self, event: ModalEvent, handler: Handler<T>, once: bool) -> Subscription {
        let id = self.next_id;
        self.next_id += 1;
        self.lanes[event.lane()].push(Entry { id, once, handler });
        Subscription(id)
    }

    /// Remove a handler; returns whether it was still registered.
    ///
    /// A handler that is part of a running emission still finishes that
    /// emission; the entry is dropped when the dispatch is handed back.
    pub fn off(&mut self, event: ModalEvent, subscription: Subscription) -> bool {
        let lane = event.lane();
        let before = self.lanes[lane].len();
        self.lanes[lane].retain(|entry| entry.id != subscription.0);
        if self.lanes[lane].len() != before {
            return true;
        }
        if self.removals[lane].contains(&subscription.0) {
            return false;
        }
        if self.detached[lane].contains(&subscription.0) {
            self.removals[lane].push(subscription.0);
            return true;
        }
        false
    }

    /// Number of handlers currently registered for `event`
    pub fn handler_count(&self, event: ModalEvent) -> usize {
        self.lanes[event.lane()].len()
    }

    /// Detach the handler list for `event` so it can run against the target
    pub fn dispatch(&mut self, event: ModalEvent) -> Dispatch<T> {
        let entries = std::mem::take(&mut self.lanes[event.lane()]);
        let ids: Vec<u64> = entries.iter().map(|entry| entry.id).collect();
        self.detached[event.lane()].extend(ids.iter().copied());
        Dispatch { event, entries, ids }
    }

    /// Reattach a dispatched handler list, keeping handlers added meanwhile
    /// and dropping handlers unsubscribed meanwhile
    pub fn finish(&mut self, dispatch: Dispatch<T>) {
        let lane = dispatch.event.lane();
        self.detached[lane].retain(|id| !dispatch.ids.contains(id));
        let mut entries = dispatch.entries;
        if !self.removals[lane].is_empty() {
            let pending = &mut self.removals[lane];
            entries.retain(|entry| !pending.contains(&entry.id));
            pending.retain(|id| !dispatch.ids.contains(id));
        }
        let added = std::mem::take(&mut self.lanes[lane]);
        self.lanes[lane] = entries;
        self.lanes[lane].extend(added);
    }
}

impl<T> Default for Emitter<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Handler list detached from an [`Emitter`] for one emission
#[must_use = "dispatched handlers must be run and handed back via Emitter::finish"]
pub struct Dispatch<T> {
    event: ModalEvent,
    entries: Vec<Entry<T>>,
    /// Ids taken from the lane, including one-shot entries `run` consumes
    ids: Vec<u64>,
}

impl<T> Dispatch<T> {
    /// Run every handler in registration order, then drop one-shot entries
    pub fn run(&mut self, target: &mut T) {
        for entry in &mut self.entries {
            (entry.handler)(target);
        }
        self.entries.retain(|entry| !entry.once);
    }
}
