//! Synchronous publish/subscribe for Playdeck.
//!
//! Every component that has lifecycle news to share (a connection finding
//! its player, a player going away, the roster changing) owns one
//! [`EventBus`] per kind of event. Interested parties subscribe a
//! [`Handler`]; the owner calls [`EventBus::publish`] and every handler
//! runs immediately, in subscription order, on the caller's stack.
//!
//! # Stopping propagation
//!
//! A handler returns [`ControlFlow`]. Returning `ControlFlow::Break(())`
//! stops the dispatch: no later handler sees the event, and `publish`
//! reports that it was interrupted.
//!
//! # Re-entrancy
//!
//! Handlers may subscribe, unsubscribe, or publish on any bus (including
//! the one currently dispatching). `publish` iterates over a snapshot
//! taken before the first handler runs, so such changes apply to the
//! next dispatch and never disturb the current one.
//!
//! The bus is single-threaded (`Rc`, `RefCell`), matching the rest of the
//! core: all state transitions happen on one task.

use std::cell::RefCell;
use std::fmt;
use std::ops::ControlFlow;
use std::rc::Rc;

/// A subscriber callback.
///
/// Handlers are compared by identity (`Rc::ptr_eq`), so keep the `Rc`
/// around if you want to unsubscribe later. Any state the handler needs
/// (its "receiver") is captured by the closure, usually as a `Weak`
/// pointer to its owner so the subscription doesn't keep the owner alive.
pub type Handler<A> = Rc<dyn Fn(&A) -> ControlFlow<()>>;

/// An ordered list of handlers for one kind of event.
pub struct EventBus<A> {
    /// Label used in trace output, e.g. `"connection.on_player_found"`.
    name: &'static str,
    handlers: RefCell<Vec<Handler<A>>>,
}

impl<A> EventBus<A> {
    /// Creates an empty bus.
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            handlers: RefCell::new(Vec::new()),
        }
    }

    /// Adds a handler. Subscribing a handler that is already present is a
    /// no-op, so a handler runs at most once per dispatch.
    pub fn subscribe(&self, handler: Handler<A>) {
        let mut handlers = self.handlers.borrow_mut();
        if !handlers.iter().any(|h| Rc::ptr_eq(h, &handler)) {
            handlers.push(handler);
        }
    }

    /// Wraps `f` in a [`Handler`], subscribes it, and returns the handle
    /// needed to unsubscribe it later.
    pub fn subscribe_fn<F>(&self, f: F) -> Handler<A>
    where
        F: Fn(&A) -> ControlFlow<()> + 'static,
    {
        let handler: Handler<A> = Rc::new(f);
        self.subscribe(Rc::clone(&handler));
        handler
    }

    /// Removes a handler. Unknown handlers are ignored.
    pub fn unsubscribe(&self, handler: &Handler<A>) {
        self.handlers.borrow_mut().retain(|h| !Rc::ptr_eq(h, handler));
    }

    /// Runs every handler with `args`, in subscription order.
    ///
    /// Returns `true` if a handler broke out of the dispatch (later
    /// handlers were skipped), `false` if every handler ran.
    pub fn publish(&self, args: &A) -> bool {
        // Snapshot so handlers can mutate the list while we iterate.
        let snapshot: Vec<Handler<A>> = self.handlers.borrow().clone();
        tracing::trace!(bus = self.name, handlers = snapshot.len(), "publish");

        for handler in snapshot {
            if handler(args).is_break() {
                tracing::trace!(bus = self.name, "dispatch interrupted");
                return true;
            }
        }
        false
    }

    /// Number of subscribed handlers.
    pub fn len(&self) -> usize {
        self.handlers.borrow().len()
    }

    /// Returns `true` if nobody is subscribed.
    pub fn is_empty(&self) -> bool {
        self.handlers.borrow().is_empty()
    }

    /// The label this bus was created with.
    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl<A> fmt::Debug for EventBus<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("name", &self.name)
            .field("handlers", &self.len())
            .finish()
    }
}
