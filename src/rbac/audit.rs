//! Access-evaluation audit trail.
//!
//! Every evaluation produces an [`AuditRecord`] capturing the endpoint, the
//! caller, the required permissions, and the full result. Records are held
//! in a bounded in-memory ring buffer and mirrored to structured logging;
//! hosts that need durable audit storage subscribe by draining
//! [`AuditTrail::recent`] or shipping the serialized records elsewhere.

use super::core::AccessDecision;
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::SystemTime;
use tracing::info;
use ulid::Ulid;

/// One recorded access evaluation.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditRecord {
    /// ULID identifying this record
    pub id: String,
    pub timestamp: SystemTime,
    pub endpoint_id: String,
    pub method: String,
    pub path: String,
    pub user_id: Option<String>,
    pub user_roles: Vec<String>,
    pub required_permissions: Vec<String>,
    pub decision: AccessDecision,
    pub allowed: bool,
    pub reason: String,
    pub cache_hit: bool,
    pub evaluation_time_ms: f64,
}

impl AuditRecord {
    pub(crate) fn stamp(mut self) -> Self {
        self.id = Ulid::new().to_string();
        self.timestamp = SystemTime::now();
        self
    }
}

/// Bounded ring buffer of audit records.
pub struct AuditTrail {
    records: Mutex<VecDeque<AuditRecord>>,
    capacity: usize,
}

impl AuditTrail {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            records: Mutex::new(VecDeque::with_capacity(capacity.min(256))),
            capacity: capacity.max(1),
        }
    }

    /// Store a record, evicting the oldest when full, and log it.
    pub fn record(&self, record: AuditRecord) {
        info!(
            audit_id = %record.id,
            endpoint_id = %record.endpoint_id,
            user_id = record.user_id.as_deref().unwrap_or("<anonymous>"),
            decision = ?record.decision,
            allowed = record.allowed,
            reason = %record.reason,
            cache_hit = record.cache_hit,
            "Access evaluated"
        );
        let Ok(mut records) = self.records.lock() else {
            return;
        };
        records.push_back(record);
        while records.len() > self.capacity {
            records.pop_front();
        }
    }

    /// The most recent `limit` records, newest last.
    #[must_use]
    pub fn recent(&self, limit: usize) -> Vec<AuditRecord> {
        let Ok(records) = self.records.lock() else {
            return Vec::new();
        };
        let skip = records.len().saturating_sub(limit);
        records.iter().skip(skip).cloned().collect()
    }

    /// Number of records currently retained.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.lock().map(|r| r.len()).unwrap_or(0)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop all records.
    pub fn clear(&self) {
        if let Ok(mut records) = self.records.lock() {
            records.clear();
        }
    }
}
