use crate::logging::{LogEvent, LogFields, LogLevel};
use crate::sync::SyncReport;
use serde_json::json;

/// Counters accumulated by a viewer across synchronizations and activation
/// cascades.
#[derive(Debug, Default, Clone)]
pub struct SyncMetrics {
    synchronizations: u64,
    parts_created: u64,
    parts_reused: u64,
    parts_reordered: u64,
    parts_removed: u64,
    parts_disposed: u64,
    activations: u64,
    deactivations: u64,
}

impl SyncMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_sync(&mut self, report: &SyncReport) {
        self.synchronizations = self.synchronizations.saturating_add(1);
        self.parts_created = self.parts_created.saturating_add(report.created as u64);
        self.parts_reused = self.parts_reused.saturating_add(report.reused as u64);
        self.parts_reordered = self.parts_reordered.saturating_add(report.reordered as u64);
        self.parts_removed = self.parts_removed.saturating_add(report.removed as u64);
        self.parts_disposed = self.parts_disposed.saturating_add(report.disposed as u64);
    }

    pub fn record_activation(&mut self) {
        self.activations = self.activations.saturating_add(1);
    }

    pub fn record_deactivation(&mut self) {
        self.deactivations = self.deactivations.saturating_add(1);
    }

    pub fn snapshot(&self) -> MetricSnapshot {
        MetricSnapshot {
            synchronizations: self.synchronizations,
            parts_created: self.parts_created,
            parts_reused: self.parts_reused,
            parts_reordered: self.parts_reordered,
            parts_removed: self.parts_removed,
            parts_disposed: self.parts_disposed,
            activations: self.activations,
            deactivations: self.deactivations,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricSnapshot {
    pub synchronizations: u64,
    pub parts_created: u64,
    pub parts_reused: u64,
    pub parts_reordered: u64,
    pub parts_removed: u64,
    pub parts_disposed: u64,
    pub activations: u64,
    pub deactivations: u64,
}

impl MetricSnapshot {
    pub fn as_fields(&self) -> LogFields {
        let mut map = LogFields::new();
        map.insert("synchronizations".to_string(), json!(self.synchronizations));
        map.insert("parts_created".to_string(), json!(self.parts_created));
        map.insert("parts_reused".to_string(), json!(self.parts_reused));
        map.insert("parts_reordered".to_string(), json!(self.parts_reordered));
        map.insert("parts_removed".to_string(), json!(self.parts_removed));
        map.insert("parts_disposed".to_string(), json!(self.parts_disposed));
        map.insert("activations".to_string(), json!(self.activations));
        map.insert("deactivations".to_string(), json!(self.deactivations));
        map
    }

    pub fn to_log_event(&self, target: &str) -> LogEvent {
        LogEvent::with_fields(LogLevel::Info, target, "sync_metrics", self.as_fields())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sync_reports_accumulate() {
        let mut metrics = SyncMetrics::new();
        let report = SyncReport {
            kept: 1,
            reordered: 1,
            reused: 0,
            created: 2,
            removed: 1,
            disposed: 1,
        };
        metrics.record_sync(&report);
        metrics.record_sync(&report);
        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.synchronizations, 2);
        assert_eq!(snapshot.parts_created, 4);
        assert_eq!(snapshot.parts_disposed, 2);
    }

    #[test]
    fn snapshot_event_carries_counters() {
        let mut metrics = SyncMetrics::new();
        metrics.record_activation();
        let event = metrics.snapshot().to_log_event("mvc::metrics");
        assert_eq!(event.message, "sync_metrics");
        assert_eq!(event.field("activations"), Some(&json!(1)));
    }
}
