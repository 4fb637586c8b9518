//! Connection lifecycle state machine
//!
//! Every data operation is gated on the client being connected, and the
//! connect/close transitions are serialized: a second caller arriving while a
//! transition is in flight joins the existing transition instead of starting
//! another one. State lives in a `tokio::sync::watch` channel, which doubles
//! as the mechanism joiners use to wait for the transition to settle.
//!
//! Each transition is published to subscribed listeners as a
//! [`LifecycleEvent`]; reaching [`ConnectionState::Closed`] releases all
//! listeners so nothing leaks after the client is done.

use chrono::{DateTime, Utc};
use std::fmt;
use std::sync::Mutex;
use tokio::sync::{mpsc, watch};
use tracing::debug;

use crate::error::{Error, Result};

/// Lifecycle states of a client instance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Constructed, never connected
    Created,
    /// connect() in flight
    Connecting,
    /// Ready for data operations
    Connected,
    /// close() in flight
    Closing,
    /// Closed; the instance is not reusable
    Closed,
    /// A connect or close transition failed; the instance is not reusable
    Failed,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ConnectionState::Created => "created",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
            ConnectionState::Closing => "closing",
            ConnectionState::Closed => "closed",
            ConnectionState::Failed => "failed",
        };
        write!(f, "{s}")
    }
}

/// Notification emitted on every state change
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LifecycleEvent {
    /// State before the transition
    pub from: ConnectionState,
    /// State after the transition
    pub to: ConnectionState,
    /// When the transition happened
    pub at: DateTime<Utc>,
}

/// Outcome of attempting to begin a transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BeginOutcome {
    /// This caller owns the transition
    Started,
    /// Another caller already owns it; join and wait
    AlreadyPending,
    /// The transition is not legal from the current state
    Illegal(ConnectionState),
}

/// State machine plus lifecycle-event observer list
pub(crate) struct Lifecycle {
    state: watch::Sender<ConnectionState>,
    listeners: Mutex<Vec<mpsc::UnboundedSender<LifecycleEvent>>>,
}

impl Lifecycle {
    pub(crate) fn new() -> Self {
        let (state, _) = watch::channel(ConnectionState::Created);
        Self {
            state,
            listeners: Mutex::new(Vec::new()),
        }
    }

    /// Current state
    pub(crate) fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    /// Register a lifecycle-event listener.
    pub(crate) fn subscribe(&self) -> mpsc::UnboundedReceiver<LifecycleEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.listeners.lock().expect("listener lock poisoned").push(tx);
        rx
    }

    /// Atomically enter `pending` if the current state is `from`. A caller
    /// finding the machine already in `pending` joins instead.
    pub(crate) fn begin(
        &self,
        from: ConnectionState,
        pending: ConnectionState,
    ) -> BeginOutcome {
        let mut outcome = BeginOutcome::Illegal(self.state());
        self.state.send_if_modified(|current| {
            if *current == from {
                outcome = BeginOutcome::Started;
                *current = pending;
                true
            } else if *current == pending {
                outcome = BeginOutcome::AlreadyPending;
                false
            } else {
                outcome = BeginOutcome::Illegal(*current);
                false
            }
        });

        if outcome == BeginOutcome::Started {
            self.publish(from, pending);
        }
        outcome
    }

    /// Complete an in-flight transition.
    pub(crate) fn settle(&self, to: ConnectionState) {
        let mut from = to;
        self.state.send_modify(|current| {
            from = *current;
            *current = to;
        });
        self.publish(from, to);

        // Reaching the terminal closed state releases every listener.
        if to == ConnectionState::Closed {
            self.listeners.lock().expect("listener lock poisoned").clear();
        }
    }

    /// Wait until the machine leaves `pending`, returning the settled state.
    pub(crate) async fn wait_settled(&self, pending: ConnectionState) -> ConnectionState {
        let mut rx = self.state.subscribe();
        // wait_for inspects the current value first, so a transition that
        // settled before this call is observed immediately.
        let settled = rx.wait_for(|state| *state != pending).await.map(|s| *s);
        match settled {
            Ok(state) => state,
            // Sender dropped: the client itself is gone
            Err(_) => self.state(),
        }
    }

    /// Gate for data operations.
    pub(crate) fn require_connected(&self) -> Result<()> {
        let state = self.state();
        if state == ConnectionState::Connected {
            Ok(())
        } else {
            Err(Error::NotConnected(state))
        }
    }

    fn publish(&self, from: ConnectionState, to: ConnectionState) {
        debug!("lifecycle transition: {} -> {}", from, to);
        let event = LifecycleEvent {
            from,
            to,
            at: Utc::now(),
        };
        let mut listeners = self.listeners.lock().expect("listener lock poisoned");
        // Drop listeners whose receiver side has gone away.
        listeners.retain(|tx| tx.send(event.clone()).is_ok());
    }
}
