//! Activity monitoring: user input pushes the inactivity deadline back.
//!
//! [`ActivityHub`] stands in for the document: input sources call
//! [`ActivityHub::emit`] for every pointer, key, scroll or touch event.
//! An [`ActivityMonitor`] registers one listener per
//! [`ActivitySignal`] for as long as it is mounted and forwards each
//! signal to [`SessionHandle::reset_inactivity_timer`].
//!
//! Listeners are passive: `emit` never awaits and never fails, whether or
//! not anyone is listening and however busy the session actor is.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::SessionHandle;

/// The interaction events that count as activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActivitySignal {
    PointerDown,
    PointerMove,
    KeyPress,
    Scroll,
    TouchStart,
}

impl ActivitySignal {
    /// Every signal a monitor listens for.
    pub const ALL: [ActivitySignal; 5] = [
        Self::PointerDown,
        Self::PointerMove,
        Self::KeyPress,
        Self::Scroll,
        Self::TouchStart,
    ];

    /// DOM event name.
    pub fn event_name(&self) -> &'static str {
        match self {
            Self::PointerDown => "mousedown",
            Self::PointerMove => "mousemove",
            Self::KeyPress => "keypress",
            Self::Scroll => "scroll",
            Self::TouchStart => "touchstart",
        }
    }
}

impl fmt::Display for ActivitySignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.event_name())
    }
}

// ---------------------------------------------------------------------------
// ActivityHub
// ---------------------------------------------------------------------------

/// Identifies one registered listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct ListenerId(u64);

struct Listener {
    signal: ActivitySignal,
    session: SessionHandle,
}

#[derive(Default)]
struct HubInner {
    next_id: AtomicU64,
    listeners: Mutex<HashMap<ListenerId, Listener>>,
}

/// Document-level dispatcher for activity signals.
///
/// Cheap to clone; clones share the same listener table.
#[derive(Clone, Default)]
pub struct ActivityHub {
    inner: Arc<HubInner>,
}

impl ActivityHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delivers `signal` to every listener registered for it.
    pub fn emit(&self, signal: ActivitySignal) {
        for listener in self.lock().values() {
            if listener.signal == signal {
                listener.session.reset_inactivity_timer();
            }
        }
    }

    /// Number of listeners currently registered for `signal`.
    pub fn listener_count(&self, signal: ActivitySignal) -> usize {
        self.lock()
            .values()
            .filter(|l| l.signal == signal)
            .count()
    }

    /// Number of listeners across all signals.
    pub fn total_listeners(&self) -> usize {
        self.lock().len()
    }

    fn add_listener(&self, signal: ActivitySignal, session: SessionHandle) -> ListenerId {
        let id = ListenerId(self.inner.next_id.fetch_add(1, Ordering::Relaxed));
        self.lock().insert(id, Listener { signal, session });
        id
    }

    fn remove_listener(&self, id: ListenerId) {
        self.lock().remove(&id);
    }

    // A panic while holding the lock cannot leave the table half-updated
    // (every mutation is a single insert or remove), so poisoning is ignored.
    fn lock(&self) -> MutexGuard<'_, HashMap<ListenerId, Listener>> {
        self.inner
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for ActivityHub {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActivityHub")
            .field("listeners", &self.total_listeners())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// ActivityMonitor
// ---------------------------------------------------------------------------

/// Keeps activity listeners registered while it is alive.
///
/// Mount it alongside the component that owns the session; unmounting
/// (or dropping) removes every listener it added before returning.
#[must_use = "dropping the monitor removes its listeners"]
pub struct ActivityMonitor {
    hub: ActivityHub,
    listeners: Vec<ListenerId>,
}

impl ActivityMonitor {
    /// Registers a listener for each [`ActivitySignal`].
    pub fn mount(hub: &ActivityHub, session: SessionHandle) -> Self {
        let listeners = ActivitySignal::ALL
            .iter()
            .map(|&signal| hub.add_listener(signal, session.clone()))
            .collect();
        tracing::debug!("activity monitor mounted");
        Self {
            hub: hub.clone(),
            listeners,
        }
    }

    /// Removes every listener this monitor registered.
    pub fn unmount(mut self) {
        self.remove_all();
    }

    pub fn is_mounted(&self) -> bool {
        !self.listeners.is_empty()
    }

    fn remove_all(&mut self) {
        if self.listeners.is_empty() {
            return;
        }
        for id in self.listeners.drain(..) {
            self.hub.remove_listener(id);
        }
        tracing::debug!("activity monitor unmounted");
    }
}

impl Drop for ActivityMonitor {
    fn drop(&mut self) {
        self.remove_all();
    }
}

impl fmt::Debug for ActivityMonitor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActivityMonitor")
            .field("listeners", &self.listeners.len())
            .finish()
    }
}
