//! Outbound queue, outstanding-request gate and sent-message ledger.
//!
//! The server answers one request at a time. While the gate holds a
//! response kind, new requests wait in the queue; the queue is read through
//! a cursor that only moves forward.

// ============================================================================
// Imports
// ============================================================================

use std::collections::VecDeque;

use crate::protocol::{Request, ResponseKind};

// ============================================================================
// OutboundQueue
// ============================================================================

/// FIFO of requests waiting for the gate, read through a cursor.
///
/// The cursor and length are logical positions: consumed entries are
/// dropped from memory, but [`cursor`](Self::cursor) keeps counting so it
/// never moves backwards and never passes [`len`](Self::len).
#[derive(Debug, Default)]
pub struct OutboundQueue {
    /// Entries not yet read.
    entries: VecDeque<Request>,
    /// Number of entries already read.
    cursor: usize,
}

impl OutboundQueue {
    /// Appends a request.
    pub fn push(&mut self, request: Request) {
        self.entries.push_back(request);
    }

    /// Reads the next request and advances the cursor.
    pub fn next(&mut self) -> Option<Request> {
        let request = self.entries.pop_front()?;
        self.cursor += 1;
        Some(request)
    }

    /// Returns the number of entries read so far.
    #[inline]
    #[must_use]
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Returns the number of entries ever enqueued.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.cursor + self.entries.len()
    }

    /// Returns `true` if no unread entry remains.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the number of unread entries.
    #[inline]
    #[must_use]
    pub fn unread(&self) -> usize {
        self.entries.len()
    }

    /// Iterates over unread entries in transmission order.
    pub fn iter(&self) -> impl Iterator<Item = &Request> {
        self.entries.iter()
    }
}

// ============================================================================
// Outbound
// ============================================================================

/// Single-flight state shared by every send path.
#[derive(Debug, Default)]
pub struct Outbound {
    /// Response kind currently awaited.
    gate: Option<ResponseKind>,
    /// Requests waiting for the gate.
    pub(crate) queue: OutboundQueue,
    /// Last transmitted request, kept until a reconnect decides on replay.
    ledger: Option<Request>,
}

impl Outbound {
    /// Returns the awaited response kind.
    #[inline]
    #[must_use]
    pub fn gate(&self) -> Option<ResponseKind> {
        self.gate
    }

    /// Returns `true` if no response is awaited.
    #[inline]
    #[must_use]
    pub fn is_clear(&self) -> bool {
        self.gate.is_none()
    }

    /// Records a transmission: arms the gate and replaces the ledger entry.
    pub fn record_sent(&mut self, request: &Request) {
        self.gate = request.expected_response();
        self.ledger = Some(request.clone());
    }

    /// Clears the gate if `kind` is the awaited response.
    ///
    /// Returns `true` if the gate was cleared.
    pub fn acknowledge(&mut self, kind: ResponseKind) -> bool {
        if self.gate == Some(kind) {
            self.gate = None;
            true
        } else {
            false
        }
    }

    /// Returns the ledger entry if the gate still waits for its response.
    #[must_use]
    pub fn unacknowledged(&self) -> Option<&Request> {
        let gate = self.gate?;
        self.ledger
            .as_ref()
            .filter(|request| request.expected_response() == Some(gate))
    }

    /// Returns the last transmitted request.
    #[inline]
    #[must_use]
    pub fn last_sent(&self) -> Option<&Request> {
        self.ledger.as_ref()
    }
}

// ============================================================================
// Tests
// ============================================================================
