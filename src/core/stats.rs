//! Error statistics
//!
//! Anomalies inside a creature tick are never propagated. They are logged
//! and counted here so that tests and tools can notice them afterwards.

use std::sync::atomic::{AtomicU32, Ordering};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ErrorStatKind {
    /// A state id outside the table was looked up
    StateOutOfRange = 0,
    /// A job has no callback for the requested pipeline
    MissingJobCallback = 1,
    /// A linked list walk exceeded its iteration cap
    ListWalkCorrupted = 2,
    /// The digger stack refused an entry because it was full
    DiggerStackOverflow = 3,
    /// A non-digger found itself in a digger-only state
    WrongCreatureClass = 4,
    /// A reference to a missing creature, room or thing was dropped
    DanglingReference = 5,
}

const KIND_COUNT: usize = 6;

/// Counters for each anomaly kind
#[derive(Debug, Default)]
pub struct ErrorStats {
    counts: [AtomicU32; KIND_COUNT],
}

impl ErrorStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inc(&self, kind: ErrorStatKind) {
        self.counts[kind as usize].fetch_add(1, Ordering::Relaxed);
    }

    pub fn get(&self, kind: ErrorStatKind) -> u32 {
        self.counts[kind as usize].load(Ordering::Relaxed)
    }

    pub fn total(&self) -> u32 {
        self.counts.iter().map(|c| c.load(Ordering::Relaxed)).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_are_independent() {
        let stats = ErrorStats::new();
        stats.inc(ErrorStatKind::StateOutOfRange);
        stats.inc(ErrorStatKind::StateOutOfRange);
        stats.inc(ErrorStatKind::ListWalkCorrupted);
        assert_eq!(stats.get(ErrorStatKind::StateOutOfRange), 2);
        assert_eq!(stats.get(ErrorStatKind::ListWalkCorrupted), 1);
        assert_eq!(stats.get(ErrorStatKind::DiggerStackOverflow), 0);
        assert_eq!(stats.total(), 3);
    }
}
