//! Part lifecycle audit hooks.
//!
//! Every structural change the viewer makes to its part tree is reported as
//! a [`ViewerAuditEvent`], so callers can buffer, log or assert on the exact
//! sequence of mutations without instrumenting the engine itself.

use std::sync::Mutex;
use std::time::SystemTime;

use serde_json::Value;

use crate::parts::PartId;

/// Distinct checkpoints emitted by a viewer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewerAuditStage {
    PartRegistered,
    PartUnregistered,
    PartActivated,
    PartDeactivated,
    ChildAdded,
    ChildRemoved,
    ChildReordered,
    AnchoredAdded,
    AnchoredRemoved,
    AnchoredReordered,
    ContentSet,
    ContentCleared,
    AdapterSet,
    AdapterUnset,
    PartPurged,
}

impl ViewerAuditStage {
    /// Changes to parent/child or anchorage/anchored links.
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            Self::ChildAdded
                | Self::ChildRemoved
                | Self::ChildReordered
                | Self::AnchoredAdded
                | Self::AnchoredRemoved
                | Self::AnchoredReordered
        )
    }
}

#[derive(Debug, Clone)]
pub struct ViewerAuditEvent {
    pub timestamp: SystemTime,
    pub stage: ViewerAuditStage,
    pub part: PartId,
    pub details: Vec<(String, Value)>,
}

impl ViewerAuditEvent {
    pub fn detail(&self, key: &str) -> Option<&Value> {
        self.details
            .iter()
            .find(|(name, _)| name == key)
            .map(|(_, value)| value)
    }
}

pub struct ViewerAuditEventBuilder {
    event: ViewerAuditEvent,
}

impl ViewerAuditEventBuilder {
    pub fn new(stage: ViewerAuditStage, part: PartId) -> Self {
        Self {
            event: ViewerAuditEvent {
                timestamp: SystemTime::now(),
                stage,
                part,
                details: Vec::new(),
            },
        }
    }

    pub fn detail(mut self, key: impl Into<String>, value: Value) -> Self {
        self.event.details.push((key.into(), value));
        self
    }

    pub fn finish(self) -> ViewerAuditEvent {
        self.event
    }
}

pub trait ViewerAudit: Send + Sync {
    fn record(&self, event: ViewerAuditEvent);

    /// Lets the viewer skip building events nobody reads.
    fn enabled(&self) -> bool {
        true
    }
}

#[derive(Debug, Default)]
pub struct NullViewerAudit;

impl ViewerAudit for NullViewerAudit {
    fn record(&self, _event: ViewerAuditEvent) {}

    fn enabled(&self) -> bool {
        false
    }
}

/// Keeps every event in memory.
#[derive(Debug, Default)]
pub struct RecordingAudit {
    events: Mutex<Vec<ViewerAuditEvent>>,
}

impl RecordingAudit {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<ViewerAuditEvent> {
        self.events
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }

    pub fn stages(&self) -> Vec<(ViewerAuditStage, PartId)> {
        self.events()
            .into_iter()
            .map(|event| (event.stage, event.part))
            .collect()
    }

    pub fn count(&self, stage: ViewerAuditStage) -> usize {
        self.events()
            .iter()
            .filter(|event| event.stage == stage)
            .count()
    }

    pub fn structural_count(&self) -> usize {
        self.events()
            .iter()
            .filter(|event| event.stage.is_structural())
            .count()
    }

    pub fn clear(&self) {
        if let Ok(mut guard) = self.events.lock() {
            guard.clear();
        }
    }
}

impl ViewerAudit for RecordingAudit {
    fn record(&self, event: ViewerAuditEvent) {
        if let Ok(mut guard) = self.events.lock() {
            guard.push(event);
        }
    }
}
