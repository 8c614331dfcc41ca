use std::sync::{Arc, Mutex};

use crate::logging::Logger;
use crate::metrics::SyncMetrics;
use crate::parts::FactoryParams;

use super::audit::{NullViewerAudit, ViewerAudit};

/// Configuration knobs for a viewer.
#[derive(Clone)]
pub struct ViewerConfig {
    /// Optional structured logger used by the viewer and its synchronizer.
    pub logger: Option<Logger>,
    /// Counters updated on every synchronization and activation.
    pub metrics: Option<Arc<Mutex<SyncMetrics>>>,
    /// Receives every structural change made to the part tree.
    pub audit: Arc<dyn ViewerAudit>,
    /// Synchronize content children and anchoreds when a content part (or
    /// the root) activates, and again whenever its content changes while
    /// active.
    pub auto_sync: bool,
    /// Passed to the content part factory on every creation.
    pub factory_params: FactoryParams,
    /// Target used when emitting metrics snapshots.
    pub metrics_target: String,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            logger: None,
            metrics: None,
            audit: Arc::new(NullViewerAudit),
            auto_sync: true,
            factory_params: FactoryParams::new(),
            metrics_target: "mvc::metrics".to_string(),
        }
    }
}

impl ViewerConfig {
    pub fn with_logger(mut self, logger: Logger) -> Self {
        self.logger = Some(logger);
        self
    }

    pub fn with_audit(mut self, audit: Arc<dyn ViewerAudit>) -> Self {
        self.audit = audit;
        self
    }

    pub fn with_auto_sync(mut self, enabled: bool) -> Self {
        self.auto_sync = enabled;
        self
    }

    /// Enable metrics collection if it has not already been configured.
    pub fn enable_metrics(&mut self) {
        if self.metrics.is_none() {
            self.metrics = Some(Arc::new(Mutex::new(SyncMetrics::new())));
        }
    }

    pub fn disable_metrics(&mut self) {
        self.metrics = None;
    }

    pub fn metrics_handle(&self) -> Option<Arc<Mutex<SyncMetrics>>> {
        self.metrics.as_ref().map(Arc::clone)
    }
}
