//! ============================================================================
//! Access Log - Append-only decision audit trail
//! ============================================================================

use std::sync::Arc;

use chrono::Utc;

use crate::error::Result;
use crate::store::{AccessLogEntry, GateStore};
use crate::types::{Outcome, RequestVariant};

/// Append-only record of every completed decision.
pub struct AccessLog {
    store: Arc<GateStore>,
}

impl AccessLog {
    pub fn new(store: Arc<GateStore>) -> Self {
        Self { store }
    }

    /// Append a decision. Entries are never mutated afterwards.
    pub fn append(
        &self,
        variant: RequestVariant,
        identity_ref: i64,
        outcome: Outcome,
    ) -> Result<AccessLogEntry> {
        self.store
            .append_log(variant, identity_ref, outcome, Utc::now().timestamp())
    }

    /// Last `n` entries in insertion order, oldest first within the window.
    pub fn recent(&self, n: usize) -> Result<Vec<AccessLogEntry>> {
        self.store.recent_logs(n)
    }

    /// Admin bulk reset.
    pub fn truncate(&self) -> Result<()> {
        self.store.truncate_log()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testkit;

    #[test]
    fn test_recent_after_fifteen_appends() {
        let (store, _dir) = testkit::temp_store();
        let log = AccessLog::new(store);

        for i in 0..15 {
            log.append(RequestVariant::Member, i, Outcome::Granted).unwrap();
        }

        let window = log.recent(10).unwrap();
        assert_eq!(window.len(), 10);
        assert!(window.windows(2).all(|w| w[0].seq < w[1].seq));
        assert_eq!(window[0].identity_ref, 5);
        assert_eq!(window[9].identity_ref, 14);
    }

    #[test]
    fn test_recent_on_short_log() {
        let (store, _dir) = testkit::temp_store();
        let log = AccessLog::new(store);

        log.append(RequestVariant::Guest, 42, Outcome::Denied).unwrap();
        let window = log.recent(10).unwrap();
        assert_eq!(window.len(), 1);
        assert_eq!(window[0].outcome, Outcome::Denied);
    }
}
