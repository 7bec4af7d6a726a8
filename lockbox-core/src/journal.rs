//! Fixed-capacity diagnostics ring.
//!
//! The core does not log. Instead it appends [`Record`]s to a [`Journal`]
//! backed by [`heapless::HistoryBuf`]; the oldest records are overwritten
//! once the ring is full. Consumers (the firmware's defmt bridge, the
//! emulator's console) remember the last id they printed and ask for
//! everything newer.

use core::fmt;

use heapless::HistoryBuf;

use crate::machine::BoxMode;
use crate::scheduler::{EventLabel, RegisterError};
use crate::time::Millis;

pub const JOURNAL_CAPACITY: usize = 32;

/// How loudly a record should be surfaced.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd)]
pub enum Severity {
    Info,
    Warn,
    Error,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum RecordKind {
    /// Power-up cleanup finished and the initial state was entered.
    Started(BoxMode),
    Transition { from: BoxMode, to: BoxMode },
    /// A registration made on behalf of `label` was refused.
    RegisterRejected {
        label: EventLabel,
        error: RegisterError,
    },
    /// A forced transition named a state index that does not exist.
    UnrecognizedState(u8),
    /// A phone scan finished.
    PhoneScan { present: bool },
}

impl RecordKind {
    #[must_use]
    pub const fn severity(&self) -> Severity {
        match self {
            RecordKind::Started(_) | RecordKind::Transition { .. } | RecordKind::PhoneScan { .. } => {
                Severity::Info
            }
            RecordKind::RegisterRejected {
                error: RegisterError::QueueFull | RegisterError::ReservedLabel,
                ..
            } => Severity::Warn,
            RecordKind::RegisterRejected {
                error: RegisterError::InvalidMode,
                ..
            }
            | RecordKind::UnrecognizedState(_) => Severity::Error,
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordKind::Started(mode) => write!(f, "started in {mode}"),
            RecordKind::Transition { from, to } => write!(f, "{from} -> {to}"),
            RecordKind::RegisterRejected { label, error } => {
                write!(f, "register {label} rejected: {error}")
            }
            RecordKind::UnrecognizedState(raw) => write!(f, "unrecognized state {raw}, staying put"),
            RecordKind::PhoneScan { present: true } => f.write_str("phone detected"),
            RecordKind::PhoneScan { present: false } => f.write_str("no phone"),
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Record {
    pub id: u32,
    pub at: Millis,
    pub kind: RecordKind,
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{} @{} {}", self.id, self.at, self.kind)
    }
}

/// Ring of the most recent [`JOURNAL_CAPACITY`] records.
pub struct Journal {
    ring: HistoryBuf<Record, JOURNAL_CAPACITY>,
    next_id: u32,
}

impl Journal {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            ring: HistoryBuf::new(),
            next_id: 1,
        }
    }

    /// Appends a record and returns its id.
    pub fn record(&mut self, at: Millis, kind: RecordKind) -> u32 {
        let id = self.next_id;
        self.next_id = self.next_id.wrapping_add(1);
        self.ring.write(Record { id, at, kind });
        id
    }

    #[must_use]
    pub fn latest(&self) -> Option<&Record> {
        self.ring.recent()
    }

    /// Id of the newest record, or 0 before anything was written.
    #[must_use]
    pub fn last_id(&self) -> u32 {
        self.latest().map_or(0, |record| record.id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.ring.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ring.is_empty()
    }

    /// Retained records, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &Record> + '_ {
        self.ring.oldest_ordered()
    }

    /// Retained records written after `last_seen`, oldest first.
    #[allow(clippy::cast_possible_wrap)]
    pub fn since(&self, last_seen: u32) -> impl Iterator<Item = &Record> + '_ {
        self.iter()
            .filter(move |record| (record.id.wrapping_sub(last_seen) as i32) > 0)
    }
}

impl Default for Journal {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ring_keeps_newest_records() {
        let mut journal = Journal::new();
        for raw in 0..40u8 {
            journal.record(Millis::new(u32::from(raw)), RecordKind::UnrecognizedState(raw));
        }

        assert_eq!(journal.len(), JOURNAL_CAPACITY);
        let first = journal.iter().next().unwrap();
        assert_eq!(first.id, 9);
        assert_eq!(journal.last_id(), 40);
    }

    #[test]
    fn since_returns_only_unseen_records() {
        let mut journal = Journal::new();
        let first = journal.record(Millis::ZERO, RecordKind::Started(BoxMode::UnlockedEmptyAsleep));
        journal.record(
            Millis::new(5),
            RecordKind::Transition {
                from: BoxMode::UnlockedEmptyAsleep,
                to: BoxMode::UnlockedAsleepToAwake,
            },
        );

        let unseen: heapless::Vec<u32, 4> = journal.since(first).map(|record| record.id).collect();
        assert_eq!(unseen.as_slice(), &[2]);
        assert_eq!(journal.since(journal.last_id()).count(), 0);
        assert_eq!(journal.since(0).count(), 2);
    }

    #[test]
    fn severity_follows_kind() {
        assert_eq!(
            RecordKind::RegisterRejected {
                label: EventLabel::NfcPoll,
                error: RegisterError::QueueFull,
            }
            .severity(),
            Severity::Warn
        );
        assert_eq!(
            RecordKind::RegisterRejected {
                label: EventLabel::Timer,
                error: RegisterError::InvalidMode,
            }
            .severity(),
            Severity::Error
        );
        assert_eq!(
            RecordKind::RegisterRejected {
                label: EventLabel::Timer,
                error: RegisterError::ReservedLabel,
            }
            .severity(),
            Severity::Warn
        );
        assert_eq!(RecordKind::UnrecognizedState(99).severity(), Severity::Error);
    }
}
