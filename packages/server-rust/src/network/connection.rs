//! Relay connection tracking and fan-out for the Aviary server.
//!
//! Every relay connection gets a bounded mpsc channel drained by its
//! WebSocket write loop. The [`RelayHub`] owns the Connection Set: a
//! mutex-guarded `Vec` of handles. A broadcast walks the whole set under
//! the lock, enqueues the frame for each open peer and evicts peers that
//! are no longer open. Nothing else removes entries.

use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Instant;

use axum::extract::ws::Utf8Bytes;
use bytes::Bytes;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::debug;

use super::config::ConnectionConfig;

/// Unique identifier for a relay connection, assigned by the hub.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(pub u64);

/// Lifecycle of a relay connection: `Connecting -> Open -> Closed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ConnectionState {
    /// Handshake in progress; not yet in the Connection Set.
    Connecting = 0,
    /// Handshake complete; member of the Connection Set.
    Open = 1,
    /// Closed by the peer, by a failed send, or by shutdown.
    Closed = 2,
}

impl ConnectionState {
    const fn from_u8(raw: u8) -> Self {
        match raw {
            0 => Self::Connecting,
            1 => Self::Open,
            _ => Self::Closed,
        }
    }
}

/// A relayed message. Forwarded verbatim: text stays text, binary stays binary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayFrame {
    Text(Utf8Bytes),
    Binary(Bytes),
}

impl RelayFrame {
    /// Payload size in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Text(text) => text.as_str().len(),
            Self::Binary(bytes) => bytes.len(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Message queued for a connection's write loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboundMessage {
    /// A relayed frame.
    Frame(RelayFrame),
    /// A close frame with an optional reason.
    Close(Option<String>),
}

/// Error returned when enqueueing a message for a connection fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SendError {
    /// The write loop has exited; the receiver was dropped.
    #[error("connection is closed")]
    Disconnected,
    /// The outbound channel is full.
    #[error("outbound channel is full")]
    Full,
}

/// Handle to a single relay connection.
#[derive(Debug)]
pub struct ConnectionHandle {
    /// Unique connection identifier assigned by the hub.
    pub id: ConnectionId,
    /// Sender end of the bounded outbound channel.
    tx: mpsc::Sender<OutboundMessage>,
    state: AtomicU8,
    /// When the handshake started.
    pub connected_at: Instant,
}

impl ConnectionHandle {
    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        ConnectionState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Whether a broadcast should deliver to this connection. `false` once
    /// the connection is marked closed or its write loop has gone away.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.state() == ConnectionState::Open && !self.tx.is_closed()
    }

    /// Moves the connection to `Closed`. Does not remove it from the hub.
    pub fn mark_closed(&self) {
        self.state
            .store(ConnectionState::Closed as u8, Ordering::Release);
    }

    /// Moves `Connecting -> Open`. Returns `false` if the connection was not
    /// in `Connecting`.
    fn mark_open(&self) -> bool {
        self.state
            .compare_exchange(
                ConnectionState::Connecting as u8,
                ConnectionState::Open as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok()
    }

    /// Enqueues a message without blocking.
    ///
    /// # Errors
    ///
    /// Returns `SendError::Full` if the channel is at capacity and
    /// `SendError::Disconnected` if the write loop has exited.
    pub fn try_send(&self, msg: OutboundMessage) -> Result<(), SendError> {
        self.tx.try_send(msg).map_err(|err| match err {
            TrySendError::Full(_) => SendError::Full,
            TrySendError::Closed(_) => SendError::Disconnected,
        })
    }
}

/// Outcome of one broadcast pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    /// Peers the frame was enqueued for.
    pub delivered: usize,
    /// Open peers whose channel was full; they keep their place in the set.
    pub dropped: usize,
    /// Peers found not open and removed from the set.
    pub evicted: usize,
}

/// The relay's Connection Set.
///
/// All reads and writes of the set go through one mutex, so a broadcast
/// iterating the set and the evictions it performs are serialized with
/// registrations and with other broadcasts.
#[derive(Debug)]
pub struct RelayHub {
    connections: Mutex<Vec<Arc<ConnectionHandle>>>,
    next_id: AtomicU64,
}

impl RelayHub {
    /// Creates an empty hub. Connection IDs start at 1.
    #[must_use]
    pub fn new() -> Self {
        Self {
            connections: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Allocates a handle in `Connecting` state together with the receiver
    /// its write loop drains. The handle is not yet in the set.
    pub fn connect(
        &self,
        config: &ConnectionConfig,
    ) -> (Arc<ConnectionHandle>, mpsc::Receiver<OutboundMessage>) {
        let id = ConnectionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let (tx, rx) = mpsc::channel(config.outbound_channel_capacity);
        let handle = Arc::new(ConnectionHandle {
            id,
            tx,
            state: AtomicU8::new(ConnectionState::Connecting as u8),
            connected_at: Instant::now(),
        });
        (handle, rx)
    }

    /// Completes the handshake: `Connecting -> Open` and joins the set.
    ///
    /// Returns `false`, leaving the set untouched, if the handle was not in
    /// `Connecting` state.
    pub fn open(&self, handle: &Arc<ConnectionHandle>) -> bool {
        if !handle.mark_open() {
            return false;
        }
        self.connections.lock().push(Arc::clone(handle));
        true
    }

    /// Fans `frame` out to every open member of the set except `skip`.
    ///
    /// Members found not open, including `skip`, are marked closed and
    /// removed. A member whose send fails because its write loop has gone
    /// is removed the same way. Delivery order is the set's order.
    pub fn broadcast(&self, frame: &RelayFrame, skip: Option<ConnectionId>) -> BroadcastReport {
        let mut report = BroadcastReport::default();
        let mut connections = self.connections.lock();

        connections.retain(|handle| {
            if !handle.is_open() {
                handle.mark_closed();
                report.evicted += 1;
                return false;
            }
            if skip == Some(handle.id) {
                return true;
            }
            match handle.try_send(OutboundMessage::Frame(frame.clone())) {
                Ok(()) => {
                    report.delivered += 1;
                    true
                }
                Err(SendError::Full) => {
                    report.dropped += 1;
                    true
                }
                Err(SendError::Disconnected) => {
                    handle.mark_closed();
                    report.evicted += 1;
                    false
                }
            }
        });
        drop(connections);

        if report.evicted > 0 || report.dropped > 0 {
            debug!(
                delivered = report.delivered,
                dropped = report.dropped,
                evicted = report.evicted,
                "relay broadcast pruned or skipped peers"
            );
        }
        report
    }

    /// Number of tracked connections, including ones that have closed but
    /// have not been evicted yet.
    #[must_use]
    pub fn len(&self) -> usize {
        self.connections.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.connections.lock().is_empty()
    }

    /// Number of tracked connections that are currently open.
    #[must_use]
    pub fn open_count(&self) -> usize {
        self.connections
            .lock()
            .iter()
            .filter(|handle| handle.is_open())
            .count()
    }

    /// Whether `id` is still a member of the set.
    #[must_use]
    pub fn contains(&self, id: ConnectionId) -> bool {
        self.connections.lock().iter().any(|handle| handle.id == id)
    }

    /// Removes every connection, asks each write loop to send a close frame
    /// and marks it closed. Used during shutdown.
    pub fn close_all(&self, reason: &str) -> usize {
        let handles = std::mem::take(&mut *self.connections.lock());
        for handle in &handles {
            // Best-effort: a full or closed channel just skips the close frame.
            let _ = handle.try_send(OutboundMessage::Close(Some(reason.to_string())));
            handle.mark_closed();
        }
        handles.len()
    }
}

impl Default for RelayHub {
    fn default() -> Self {
        Self::new()
    }
}
