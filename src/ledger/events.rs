// Audit trail - one record per successful mutating call

use crate::identity::Address;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A recorded event with its position in the log
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EventRecord<E> {
    sequence: u64,
    recorded_at: DateTime<Utc>,
    event: E,
}

impl<E> EventRecord<E> {
    /// Position in the log, starting at 0
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    pub fn recorded_at(&self) -> DateTime<Utc> {
        self.recorded_at
    }

    pub fn event(&self) -> &E {
        &self.event
    }
}

/// Append-only event log that can be cut back to an earlier length on revert
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EventLog<E> {
    records: Vec<EventRecord<E>>,
}

impl<E> Default for EventLog<E> {
    fn default() -> Self {
        Self { records: Vec::new() }
    }
}

impl<E: Clone> EventLog<E> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, event: E) {
        let sequence = self.records.len() as u64;
        self.records.push(EventRecord {
            sequence,
            recorded_at: Utc::now(),
            event,
        });
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub(crate) fn truncate(&mut self, len: usize) {
        self.records.truncate(len);
    }

    pub fn records(&self) -> &[EventRecord<E>] {
        &self.records
    }

    /// Events only, in order
    pub fn events(&self) -> Vec<E> {
        self.records.iter().map(|r| r.event.clone()).collect()
    }
}

/// Events emitted by the native and reference ledgers
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum LedgerEvent {
    Issued {
        to: Address,
        amount: u64,
    },
    Transfer {
        from: Address,
        to: Address,
        amount: u64,
    },
    Approval {
        owner: Address,
        spender: Address,
        amount: u64,
    },
    PauseChanged {
        paused: bool,
    },
    DistributionChannelUpdated {
        previous: Option<Address>,
        channel: Address,
    },
    AdministrationTransferred {
        previous: Address,
        administrator: Address,
    },
}
