//! Refresh broadcast between views.
//!
//! A [`RefreshBus`] is a payload-free publish/subscribe channel. Buses form a
//! tree of scopes: a page creates a scope under the application bus, and the views
//! it owns subscribe to that scope.
//!
//! ```text
//! app bus ── emit() reaches every listener below
//! ├── users scope ── users table, user detail form
//! └── groups scope ── groups table
//! ```
//!
//! [`RefreshBus::emit`] broadcasts down the tree (a global "reload everything"),
//! [`RefreshBus::bubble`] notifies a scope and its ancestors (a form inside a page
//! telling the page's tables that something changed).

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use crossbeam::channel::{unbounded, Receiver, Sender};
use tracing::trace;

#[derive(Debug, Default)]
struct Scope {
    name: String,
    subscribers: Vec<Sender<()>>,
    children: Vec<Weak<Mutex<Scope>>>,
    parent: Option<Arc<Mutex<Scope>>>,
}

impl Scope {
    /// Notifies live subscribers and forgets disconnected ones.
    fn notify(&mut self) -> usize {
        self.subscribers.retain(|tx| tx.send(()).is_ok());
        self.subscribers.len()
    }
}

fn lock(scope: &Mutex<Scope>) -> MutexGuard<'_, Scope> {
    scope.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Handle to one scope of the refresh tree. Cloning shares the scope.
#[derive(Debug, Clone)]
pub struct RefreshBus {
    scope: Arc<Mutex<Scope>>,
}

impl Default for RefreshBus {
    fn default() -> Self {
        Self::new()
    }
}

impl RefreshBus {
    /// Creates a root scope.
    pub fn new() -> Self {
        Self::named("root")
    }

    fn named(name: &str) -> Self {
        Self {
            scope: Arc::new(Mutex::new(Scope {
                name: name.to_string(),
                ..Default::default()
            })),
        }
    }

    /// Creates a child scope. Broadcasts on `self` reach it; bubbles from it reach
    /// `self`.
    pub fn scope(&self, name: &str) -> RefreshBus {
        let child = Self::named(name);
        lock(&child.scope).parent = Some(Arc::clone(&self.scope));
        lock(&self.scope).children.push(Arc::downgrade(&child.scope));
        child
    }

    /// Registers a listener on this scope.
    pub fn subscribe(&self) -> RefreshListener {
        let (sender, receiver) = unbounded();
        lock(&self.scope).subscribers.push(sender);
        RefreshListener {
            receiver,
            bus: self.clone(),
        }
    }

    /// Signals this scope and every descendant scope.
    ///
    /// Returns the number of listeners notified.
    pub fn emit(&self) -> usize {
        let mut notified = 0;
        let mut stack = vec![Arc::clone(&self.scope)];
        while let Some(scope) = stack.pop() {
            let mut guard = lock(&scope);
            notified += guard.notify();
            guard.children.retain(|child| child.strong_count() > 0);
            stack.extend(guard.children.iter().filter_map(Weak::upgrade));
        }
        trace!(scope = %self.name(), notified, "refresh broadcast");
        notified
    }

    /// Signals this scope and every ancestor scope.
    ///
    /// Returns the number of listeners notified.
    pub fn bubble(&self) -> usize {
        let mut notified = 0;
        let mut current = Some(Arc::clone(&self.scope));
        while let Some(scope) = current {
            let mut guard = lock(&scope);
            notified += guard.notify();
            current = guard.parent.clone();
        }
        trace!(scope = %self.name(), notified, "refresh bubbled");
        notified
    }

    /// Name given when the scope was created.
    pub fn name(&self) -> String {
        lock(&self.scope).name.clone()
    }
}

/// Receiving end of a subscription.
///
/// Signals that arrive between two [`RefreshListener::take`] calls are coalesced.
#[derive(Debug)]
pub struct RefreshListener {
    receiver: Receiver<()>,
    bus: RefreshBus,
}

impl RefreshListener {
    /// Consumes pending signals. Returns `true` if at least one arrived.
    pub fn take(&self) -> bool {
        self.receiver.try_iter().count() > 0
    }

    /// The scope this listener is subscribed to.
    pub fn bus(&self) -> &RefreshBus {
        &self.bus
    }
}
