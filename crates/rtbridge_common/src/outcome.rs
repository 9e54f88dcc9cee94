//! Outcome types for the single-ticket and batch surfaces.

use serde::{Deserialize, Serialize};

/// What `ensure_ticket` did with the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TicketAction {
    Created,
    Commented,
}

/// Response of the single-ticket command surface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketOutcome {
    pub ticket_id: u64,
    pub ticket_url: String,
    pub action: TicketAction,
}

/// How one device's reconciliation ended, on the success path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncDisposition {
    /// Asset created or updated remotely.
    Synced,
    /// Non-physical entry, deliberately not mirrored.
    Skipped,
}

/// Aggregate counters for one batch pass. Monotonic: counters are only
/// ever incremented while a pass runs, never decremented.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncOutcome {
    pub synced: u32,
    pub failed: u32,
    pub skipped: u32,
    /// Orphaned assets marked deleted during cleanup.
    pub retired: u32,
}

impl SyncOutcome {
    /// Outcome of a single-device sync expressed in batch terms.
    pub fn single(disposition: Option<SyncDisposition>) -> Self {
        let mut out = Self::default();
        match disposition {
            Some(SyncDisposition::Synced) => out.synced = 1,
            Some(SyncDisposition::Skipped) => out.skipped = 1,
            None => out.failed = 1,
        }
        out
    }

    pub fn record(&mut self, disposition: Option<SyncDisposition>) {
        match disposition {
            Some(SyncDisposition::Synced) => self.synced += 1,
            Some(SyncDisposition::Skipped) => self.skipped += 1,
            None => self.failed += 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_outcome_mapping() {
        assert_eq!(SyncOutcome::single(Some(SyncDisposition::Synced)).synced, 1);
        assert_eq!(
            SyncOutcome::single(Some(SyncDisposition::Skipped)).skipped,
            1
        );
        assert_eq!(SyncOutcome::single(None).failed, 1);
    }

    #[test]
    fn test_record_accumulates() {
        let mut out = SyncOutcome::default();
        out.record(Some(SyncDisposition::Synced));
        out.record(Some(SyncDisposition::Synced));
        out.record(None);
        out.record(Some(SyncDisposition::Skipped));
        assert_eq!(out.synced, 2);
        assert_eq!(out.failed, 1);
        assert_eq!(out.skipped, 1);
        assert_eq!(out.retired, 0);
    }
}
