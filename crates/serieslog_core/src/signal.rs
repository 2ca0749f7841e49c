//! Reader notifications.
//!
//! Writers call [`SignalHub::notify`] after a record, a clear or a region
//! retirement when the caller asked for a signal. Subscribers receive the
//! events on a `std::sync::mpsc` channel. Signals carry no data a reader
//! could not find by polling the file; they only save the poll.
//!
//! # Usage
//!
//! ```rust
//! use serieslog_core::{EventKind, LogFile};
//!
//! let file = LogFile::open_in_memory().unwrap();
//! let events = file.subscribe();
//!
//! file.signals().notify("ticks", EventKind::Appended);
//! assert_eq!(events.recv().unwrap().series, "ticks");
//! ```

use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};

/// What happened to a series.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    /// A record was written.
    Appended,
    /// The series was cleared and now starts a fresh chain.
    Cleared,
    /// A compressed region retired and its bytes are final.
    RegionRetired {
        /// Id of the retired region.
        region_id: u64,
        /// Records encoded into it.
        records: u64,
    },
}

/// A single notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeriesEvent {
    /// Hub-wide sequence number, starting at 1.
    pub sequence: u64,
    /// Series the event is about.
    pub series: String,
    /// What happened.
    pub kind: EventKind,
}

/// Distributes series events to subscribers.
///
/// One hub exists per open log file. Disconnected subscribers are dropped
/// on the next notification.
pub struct SignalHub {
    subscribers: RwLock<Vec<Sender<SeriesEvent>>>,
    sequence: AtomicU64,
}

impl SignalHub {
    /// Creates a hub with no subscribers.
    pub fn new() -> Self {
        Self {
            subscribers: RwLock::new(Vec::new()),
            sequence: AtomicU64::new(0),
        }
    }

    /// Subscribes to all future events.
    pub fn subscribe(&self) -> Receiver<SeriesEvent> {
        let (tx, rx) = mpsc::channel();
        self.subscribers.write().push(tx);
        rx
    }

    /// Sends an event to every subscriber and returns its sequence number.
    pub fn notify(&self, series: &str, kind: EventKind) -> u64 {
        let sequence = self.sequence.fetch_add(1, Ordering::SeqCst) + 1;

        let mut subscribers = self.subscribers.write();
        if subscribers.is_empty() {
            return sequence;
        }

        let event = SeriesEvent {
            sequence,
            series: series.to_string(),
            kind,
        };
        subscribers.retain(|tx| tx.send(event.clone()).is_ok());
        sequence
    }

    /// Returns the sequence number of the latest event, or 0.
    pub fn latest_sequence(&self) -> u64 {
        self.sequence.load(Ordering::SeqCst)
    }

    /// Returns the number of live subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.read().len()
    }
}

impl Default for SignalHub {
    fn default() -> Self {
        Self::new()
    }
}
