//! The viewer owns a part tree and everything needed to keep it in step with
//! the application model: the part arena, the content→part and visual→part
//! lookups, the toolkit binding, the content part factory and the connection
//! layer.
//!
//! All mutation is synchronous. When a call returns, the tree, both lookups
//! and the toolkit's visuals are consistent with each other.

mod activation;
pub mod audit;
mod config;
mod tree;

use std::collections::HashMap;

use serde_json::{Value, json};

use crate::connection::{ConnectionId, ConnectionLayer};
use crate::error::{MvcError, Result};
use crate::geometry::Bounds;
use crate::logging::{LogLevel, TARGET_ROUTING, TARGET_VIEWER, event_with_fields, json_kv};
use crate::metrics::{MetricSnapshot, SyncMetrics};
use crate::parts::{Content, ContentPartFactory, PartArena, PartId, PartKind, PartNode};
use crate::toolkit::Toolkit;

pub use audit::{
    NullViewerAudit, RecordingAudit, ViewerAudit, ViewerAuditEvent, ViewerAuditEventBuilder,
    ViewerAuditStage,
};
pub use config::ViewerConfig;

pub struct Viewer<C: 'static, T: Toolkit> {
    pub(crate) parts: PartArena<PartNode<C, T>>,
    pub(crate) root: PartId,
    pub(crate) toolkit: T,
    pub(crate) factory: Box<dyn ContentPartFactory<C, T>>,
    pub(crate) contents: Vec<C>,
    pub(crate) content_part_map: HashMap<C, PartId>,
    pub(crate) visual_part_map: HashMap<T::Visual, PartId>,
    pub(crate) connections: ConnectionLayer,
    pub(crate) config: ViewerConfig,
}

impl<C: Content, T: Toolkit> Viewer<C, T> {
    pub fn new<F>(toolkit: T, factory: F) -> Self
    where
        F: ContentPartFactory<C, T> + 'static,
    {
        Self::with_config(toolkit, factory, ViewerConfig::default())
    }

    pub fn with_config<F>(mut toolkit: T, factory: F, config: ViewerConfig) -> Self
    where
        F: ContentPartFactory<C, T> + 'static,
    {
        let visual = toolkit.create_visual(PartKind::Root);
        let mut node = PartNode::new(PartKind::Root, visual.clone());
        node.registered = true;
        let mut parts = PartArena::new();
        let root = parts.insert(node);

        let viewer = Self {
            parts,
            root,
            toolkit,
            factory: Box::new(factory),
            contents: Vec::new(),
            content_part_map: HashMap::new(),
            visual_part_map: HashMap::from([(visual, root)]),
            connections: ConnectionLayer::new(),
            config,
        };
        viewer.audit(ViewerAuditStage::PartRegistered, root, |event| event);
        viewer.log(
            LogLevel::Info,
            TARGET_VIEWER,
            "viewer_created",
            [json_kv("root", json!(root.to_string()))],
        );
        viewer
    }

    pub fn root(&self) -> PartId {
        self.root
    }

    pub fn toolkit(&self) -> &T {
        &self.toolkit
    }

    pub fn toolkit_mut(&mut self) -> &mut T {
        &mut self.toolkit
    }

    pub fn config(&self) -> &ViewerConfig {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut ViewerConfig {
        &mut self.config
    }

    /// Root content list of the content model.
    pub fn contents(&self) -> &[C] {
        &self.contents
    }

    pub fn connections(&self) -> &ConnectionLayer {
        &self.connections
    }

    pub fn connections_mut(&mut self) -> &mut ConnectionLayer {
        &mut self.connections
    }

    pub fn part_count(&self) -> usize {
        self.parts.len()
    }

    pub fn contains(&self, part: PartId) -> bool {
        self.parts.contains(part)
    }

    /// Create a part that does not represent content, such as a handle or a
    /// feedback part.
    pub fn create_part(&mut self, kind: PartKind) -> Result<PartId> {
        let visual = self.toolkit.create_visual(kind);
        self.create_part_with_visual(kind, visual)
    }

    pub fn create_part_with_visual(&mut self, kind: PartKind, visual: T::Visual) -> Result<PartId> {
        if !matches!(kind, PartKind::Feedback | PartKind::Handle) {
            return Err(MvcError::invalid(format!(
                "{} parts are created by the viewer itself",
                kind.as_str()
            )));
        }
        Ok(self.parts.insert(PartNode::new(kind, visual)))
    }

    pub fn kind(&self, part: PartId) -> Result<PartKind> {
        Ok(self.node(part)?.kind)
    }

    pub fn visual(&self, part: PartId) -> Result<&T::Visual> {
        Ok(&self.node(part)?.visual)
    }

    pub fn content(&self, part: PartId) -> Result<Option<&C>> {
        Ok(self.node(part)?.content.as_ref())
    }

    pub fn parent(&self, part: PartId) -> Result<Option<PartId>> {
        Ok(self.node(part)?.parent)
    }

    pub fn children(&self, part: PartId) -> Result<&[PartId]> {
        Ok(&self.node(part)?.children)
    }

    pub fn anchorages(&self, part: PartId) -> Result<&[PartId]> {
        Ok(&self.node(part)?.anchorages)
    }

    pub fn anchoreds(&self, part: PartId) -> Result<&[PartId]> {
        Ok(&self.node(part)?.anchoreds)
    }

    pub fn is_active(&self, part: PartId) -> Result<bool> {
        Ok(self.node(part)?.active)
    }

    pub fn is_registered(&self, part: PartId) -> bool {
        self.parts
            .get(part)
            .map(|node| node.registered)
            .unwrap_or(false)
    }

    /// Content was cleared after the part lost its last parent/anchorage.
    pub fn is_disposable(&self, part: PartId) -> Result<bool> {
        Ok(self.node(part)?.disposable)
    }

    pub fn part_for_visual(&self, visual: &T::Visual) -> Option<PartId> {
        self.visual_part_map.get(visual).copied()
    }

    pub fn part_for_content(&self, content: &C) -> Option<PartId> {
        self.content_part_map.get(content).copied()
    }

    /// Root reached through the parent chain, or through the first anchorage
    /// for parts that only hang off an anchorage.
    pub fn root_of(&self, part: PartId) -> Option<PartId> {
        let mut current = part;
        for _ in 0..=self.parts.len() {
            let node = self.parts.get(current)?;
            if node.kind == PartKind::Root {
                return Some(current);
            }
            current = node.parent.or_else(|| node.anchorages.first().copied())?;
        }
        None
    }

    pub fn set_refresh_visual(&mut self, part: PartId, enabled: bool) -> Result<()> {
        self.node_mut(part)?.refresh_visual = enabled;
        Ok(())
    }

    /// Ask the toolkit to refresh the part's visual, unless the part opted
    /// out of refreshes.
    pub fn refresh_visual(&mut self, part: PartId) -> Result<()> {
        let node = self.node(part)?;
        if node.refresh_visual {
            let visual = node.visual.clone();
            self.toolkit.refresh_visual(&visual);
        }
        Ok(())
    }

    /// Entry point for toolkit geometry notifications. Dynamic anchors bound
    /// to `part` are recomputed, the connections using them re-routed and the
    /// visuals of the connections' owners refreshed.
    pub fn notify_geometry_changed(
        &mut self,
        part: PartId,
        bounds: Bounds,
    ) -> Result<Vec<ConnectionId>> {
        self.node(part)?;
        let affected = self.connections.anchorage_geometry_changed(part, bounds)?;
        for connection in &affected {
            let owner = self.connections.connection(*connection)?.owner();
            if self.parts.contains(owner) {
                self.refresh_visual(owner)?;
            }
        }
        self.log(
            LogLevel::Trace,
            TARGET_ROUTING,
            "geometry_changed",
            [
                json_kv("anchorage", json!(part.to_string())),
                json_kv("bounds", json!(bounds)),
                json_kv("rerouted", json!(affected.len())),
            ],
        );
        Ok(affected)
    }

    /// Free every disposable part that is still detached, together with the
    /// subtree it owns. Returns the number of parts freed.
    pub fn purge_disposed(&mut self) -> Result<usize> {
        let candidates: Vec<PartId> = self
            .parts
            .ids()
            .into_iter()
            .filter(|id| {
                self.parts
                    .get(*id)
                    .map(|node| {
                        node.disposable && node.parent.is_none() && node.anchorages.is_empty()
                    })
                    .unwrap_or(false)
            })
            .collect();

        let mut purged = 0;
        for part in candidates {
            if self.parts.contains(part) {
                purged += self.purge_subtree(part)?;
            }
        }

        if purged > 0 {
            self.log(
                LogLevel::Debug,
                TARGET_VIEWER,
                "parts_purged",
                [json_kv("count", json!(purged))],
            );
        }
        Ok(purged)
    }

    fn purge_subtree(&mut self, part: PartId) -> Result<usize> {
        let mut purged = 0;

        let children = self.node(part)?.children.clone();
        for child in children {
            self.remove_child(part, child)?;
            purged += self.purge_subtree(child)?;
        }

        let anchoreds = self.node(part)?.anchoreds.clone();
        for anchored in anchoreds {
            if self.parts.contains(anchored) {
                self.remove_anchored(part, anchored)?;
            }
        }

        let anchorages = self.node(part)?.anchorages.clone();
        for anchorage in anchorages {
            if self.parts.contains(anchorage) {
                self.remove_anchored(anchorage, part)?;
            }
        }

        if self.node(part)?.registered {
            self.unregister(part)?;
        }

        self.connections.remove_connections_of(part)?;
        let node = self.parts.remove(part).ok_or(MvcError::StalePart(part))?;
        self.toolkit.destroy_visual(&node.visual);
        self.audit(ViewerAuditStage::PartPurged, part, |event| event);
        Ok(purged + 1)
    }

    pub fn metrics_snapshot(&self) -> Option<MetricSnapshot> {
        let metrics = self.config.metrics.as_ref()?;
        metrics.lock().ok().map(|guard| guard.snapshot())
    }

    /// Emit the current metrics snapshot through the configured logger.
    pub fn log_metrics(&self) {
        if let (Some(logger), Some(snapshot)) =
            (self.config.logger.as_ref(), self.metrics_snapshot())
        {
            let _ = logger.log_event(snapshot.to_log_event(&self.config.metrics_target));
        }
    }

    pub(crate) fn node(&self, part: PartId) -> Result<&PartNode<C, T>> {
        self.parts.get(part).ok_or(MvcError::StalePart(part))
    }

    pub(crate) fn node_mut(&mut self, part: PartId) -> Result<&mut PartNode<C, T>> {
        self.parts.get_mut(part).ok_or(MvcError::StalePart(part))
    }

    /// Register or unregister so that lookups hold exactly the reachable
    /// parts.
    pub(crate) fn update_registration(&mut self, part: PartId) -> Result<()> {
        let node = self.node(part)?;
        match (node.is_reachable(), node.registered) {
            (true, false) => self.register(part),
            (false, true) => self.unregister(part),
            _ => Ok(()),
        }
    }

    fn register(&mut self, part: PartId) -> Result<()> {
        let node = self.node_mut(part)?;
        node.registered = true;
        let visual = node.visual.clone();
        let content = node.content.clone();

        self.visual_part_map.insert(visual, part);
        if let Some(content) = content {
            self.map_content(content, part);
        }
        self.audit(ViewerAuditStage::PartRegistered, part, |event| event);
        Ok(())
    }

    fn unregister(&mut self, part: PartId) -> Result<()> {
        let node = self.node_mut(part)?;
        node.registered = false;
        let visual = node.visual.clone();
        let content = node.content.clone();

        if self.visual_part_map.get(&visual) == Some(&part) {
            self.visual_part_map.remove(&visual);
        }
        if let Some(content) = content {
            self.unmap_content(&content, part);
        }
        self.audit(ViewerAuditStage::PartUnregistered, part, |event| event);
        Ok(())
    }

    fn map_content(&mut self, content: C, part: PartId) {
        let described = format!("{content:?}");
        if let Some(previous) = self.content_part_map.insert(content, part) {
            if previous != part {
                self.log(
                    LogLevel::Warn,
                    TARGET_VIEWER,
                    "content_part_replaced",
                    [
                        json_kv("content", json!(described)),
                        json_kv("previous", json!(previous.to_string())),
                        json_kv("part", json!(part.to_string())),
                    ],
                );
            }
        }
    }

    fn unmap_content(&mut self, content: &C, part: PartId) {
        if self.content_part_map.get(content) == Some(&part) {
            self.content_part_map.remove(content);
        }
    }

    /// Swap the content reference, keeping the content lookup in step for
    /// registered parts.
    pub(crate) fn assign_content(&mut self, part: PartId, content: Option<C>) -> Result<()> {
        let node = self.node_mut(part)?;
        let previous = std::mem::replace(&mut node.content, content.clone());
        let registered = node.registered;
        if content.is_some() {
            node.disposable = false;
        }

        if registered {
            if let Some(previous) = previous.as_ref() {
                self.unmap_content(previous, part);
            }
            if let Some(content) = content.clone() {
                self.map_content(content, part);
            }
        }

        let stage = if content.is_some() {
            ViewerAuditStage::ContentSet
        } else {
            ViewerAuditStage::ContentCleared
        };
        self.audit(stage, part, |event| {
            event.detail("content", json!(format!("{content:?}")))
        });
        Ok(())
    }

    pub(crate) fn audit<F>(&self, stage: ViewerAuditStage, part: PartId, details: F)
    where
        F: FnOnce(ViewerAuditEventBuilder) -> ViewerAuditEventBuilder,
    {
        if !self.config.audit.enabled() {
            return;
        }
        let event = details(ViewerAuditEventBuilder::new(stage, part)).finish();
        self.config.audit.record(event);
    }

    pub(crate) fn log<I>(&self, level: LogLevel, target: &str, message: &str, fields: I)
    where
        I: IntoIterator<Item = (String, Value)>,
    {
        if let Some(logger) = self.config.logger.as_ref() {
            if logger.enabled(level) {
                let _ = logger.log_event(event_with_fields(level, target, message, fields));
            }
        }
    }

    pub(crate) fn with_metrics<F>(&self, update: F)
    where
        F: FnOnce(&mut SyncMetrics),
    {
        if let Some(metrics) = self.config.metrics.as_ref() {
            if let Ok(mut guard) = metrics.lock() {
                update(&mut guard);
            }
        }
    }
}
