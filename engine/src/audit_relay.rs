//! Audit delivery with retry.
//!
//! A failed audit write never rolls back the change it accompanies. The entry
//! is queued here, logged at `error`, counted, and written again by
//! [`AuditRelay::flush`]. The queue is bounded; when it is full the oldest
//! entry is evicted and logged in full so it survives in the log stream.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};

use samaritan_store::AuditSink;
use samaritan_types::{AuditReceipt, SecurityAuditEntry};

use crate::EngineMetrics;

/// Outcome of a [`AuditRelay::flush`] pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlushReport {
    pub delivered: usize,
    pub remaining: usize,
}

pub struct AuditRelay {
    sink: Arc<dyn AuditSink>,
    pending: Mutex<VecDeque<SecurityAuditEntry>>,
    capacity: usize,
    metrics: Arc<EngineMetrics>,
}

impl AuditRelay {
    pub fn new(sink: Arc<dyn AuditSink>, metrics: Arc<EngineMetrics>, capacity: usize) -> Self {
        Self {
            sink,
            pending: Mutex::new(VecDeque::new()),
            capacity: capacity.max(1),
            metrics,
        }
    }

    fn queue(&self) -> MutexGuard<'_, VecDeque<SecurityAuditEntry>> {
        // The queue holds plain data; a panic elsewhere cannot leave it torn.
        self.pending.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Write `entry`, or queue it for retry if the sink fails.
    pub fn record(&self, entry: SecurityAuditEntry) -> AuditReceipt {
        match self.sink.append(&entry) {
            Ok(id) => {
                debug!(%id, event = entry.event_type(), "audit entry recorded");
                AuditReceipt::Recorded(id)
            }
            Err(e) => {
                error!(
                    error = %e,
                    event = entry.event_type(),
                    account = ?entry.account_id,
                    "audit sink write failed, queued for retry"
                );
                self.metrics.audit_failures.inc();
                let mut queue = self.queue();
                if queue.len() >= self.capacity {
                    if let Some(evicted) = queue.pop_front() {
                        error!(
                            event = evicted.event_type(),
                            account = ?evicted.account_id,
                            created_at = %evicted.created_at,
                            severity = evicted.severity.as_str(),
                            detail = %evicted.description,
                            capacity = self.capacity,
                            "audit retry queue full, oldest entry dropped"
                        );
                        self.metrics.audits_dropped.inc();
                    }
                }
                queue.push_back(entry);
                self.metrics.pending_audits.set(queue.len() as i64);
                AuditReceipt::Deferred
            }
        }
    }

    /// Retry queued entries in order, stopping at the first failure.
    pub fn flush(&self) -> FlushReport {
        let mut queue = self.queue();
        let mut delivered = 0;
        while let Some(entry) = queue.front() {
            match self.sink.append(entry) {
                Ok(_) => {
                    queue.pop_front();
                    delivered += 1;
                }
                Err(e) => {
                    warn!(error = %e, remaining = queue.len(), "audit flush stopped");
                    break;
                }
            }
        }
        self.metrics.pending_audits.set(queue.len() as i64);
        FlushReport {
            delivered,
            remaining: queue.len(),
        }
    }

    pub fn pending(&self) -> usize {
        self.queue().len()
    }
}
