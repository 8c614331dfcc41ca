use std::collections::{HashMap, HashSet};

use serde_json::json;

use crate::error::{MvcError, Result};
use crate::logging::{LogLevel, TARGET_SYNC, json_kv};
use crate::parts::{Content, CreationContext, PartBlueprint, PartId, PartKind, PartNode};
use crate::toolkit::Toolkit;
use crate::viewer::Viewer;

use super::{SyncReport, SyncRole};

impl<C: Content, T: Toolkit> Viewer<C, T> {
    /// Replace the root content list. When the root is active and
    /// `auto_sync` is on, the root's content children follow immediately.
    pub fn set_contents(&mut self, contents: Vec<C>) -> Result<SyncReport> {
        self.contents = contents;
        let root = self.root;
        if self.config.auto_sync && self.node(root)?.active {
            self.refresh_content(root)
        } else {
            Ok(SyncReport::default())
        }
    }

    /// Point a content part at different content, or clear it.
    pub fn set_content(&mut self, part: PartId, content: Option<C>) -> Result<SyncReport> {
        let node = self.node(part)?;
        if node.kind != PartKind::Content {
            return Err(MvcError::invalid(format!(
                "{part} is a {} part and carries no content",
                node.kind.as_str()
            )));
        }
        if node.content == content {
            return Ok(SyncReport::default());
        }
        let active = node.active;

        self.assign_content(part, content)?;
        if self.config.auto_sync && active {
            self.refresh_content(part)
        } else {
            Ok(SyncReport::default())
        }
    }

    /// Synchronize the part's content children and content anchoreds with
    /// what its content currently declares. The root follows the viewer's
    /// content list.
    pub fn refresh_content(&mut self, part: PartId) -> Result<SyncReport> {
        let node = self.node(part)?;
        match node.kind {
            PartKind::Root => {
                let contents = self.contents.clone();
                self.synchronize_content_children(part, &contents)
            }
            PartKind::Content => {
                let (children, anchored) = match (node.content.as_ref(), node.delegate.as_ref()) {
                    (Some(content), Some(delegate)) => (
                        delegate.content_children(content),
                        delegate.content_anchored(content),
                    ),
                    _ => (Vec::new(), Vec::new()),
                };
                let mut report = self.synchronize_content_children(part, &children)?;
                report.merge(&self.synchronize_content_anchored(part, &anchored)?);
                Ok(report)
            }
            PartKind::Feedback | PartKind::Handle => Ok(SyncReport::default()),
        }
    }

    /// Make the content children of `host` match `targets` in order.
    ///
    /// Parts already representing a target are kept (and moved if out of
    /// place); parts registered for a target elsewhere are moved under
    /// `host`; only genuinely new content reaches the factory. Content
    /// children matched by no target are removed and disposed if nothing
    /// else holds them. A repeated target keeps its first placement.
    pub fn synchronize_content_children(
        &mut self,
        host: PartId,
        targets: &[C],
    ) -> Result<SyncReport> {
        self.reconcile(host, targets, SyncRole::Children)
    }

    /// Counterpart of [`Viewer::synchronize_content_children`] for the
    /// anchoreds list. Reused parts keep their parent.
    pub fn synchronize_content_anchored(
        &mut self,
        host: PartId,
        targets: &[C],
    ) -> Result<SyncReport> {
        self.reconcile(host, targets, SyncRole::Anchored)
    }

    fn reconcile(&mut self, host: PartId, targets: &[C], role: SyncRole) -> Result<SyncReport> {
        self.node(host)?;
        self.warn_on_duplicates(host, targets, role);
        let mut report = SyncReport::default();

        // Content parts of `host` in order; the first `slot` entries are
        // the parts matched so far.
        let mut current = self.content_parts_in(self.linked(host, role)?);
        let mut by_content: HashMap<C, PartId> = current
            .iter()
            .filter_map(|id| {
                let content = self.parts.get(*id)?.content.clone()?;
                Some((content, *id))
            })
            .collect();
        let mut matched: HashSet<PartId> = HashSet::with_capacity(targets.len());
        let mut slot = 0;

        for content in targets {
            if let Some(existing) = by_content.get(content).copied() {
                if !matched.insert(existing) {
                    continue;
                }
                if current.get(slot) == Some(&existing) {
                    report.kept += 1;
                } else {
                    let index = self.raw_index(self.linked(host, role)?, slot, Some(existing));
                    match role {
                        SyncRole::Children => self.reorder_child(host, existing, index)?,
                        SyncRole::Anchored => self.move_anchored(host, existing, index)?,
                    }
                    if let Some(from) = current.iter().position(|id| *id == existing) {
                        current.remove(from);
                    }
                    current.insert(slot, existing);
                    report.reordered += 1;
                }
                slot += 1;
                continue;
            }

            let part = match self.registered_part_for(content) {
                Some(part) if matched.contains(&part) => continue,
                Some(part) if self.closes_cycle(host, part, role) => {
                    self.log(
                        LogLevel::Warn,
                        TARGET_SYNC,
                        "content_cycle_skipped",
                        [
                            json_kv("host", json!(host.to_string())),
                            json_kv("part", json!(part.to_string())),
                            json_kv("role", role.as_str()),
                            json_kv("content", format!("{content:?}")),
                        ],
                    );
                    continue;
                }
                Some(part) => {
                    report.reused += 1;
                    part
                }
                None => {
                    let part = self.create_content_part(host, content, role)?;
                    report.created += 1;
                    part
                }
            };

            if role == SyncRole::Children {
                if let Some(previous) = self.node(part)?.parent {
                    self.remove_child(previous, part)?;
                }
            }
            let linked = self.linked(host, role)?;
            let expected_len = linked.len() + 1;
            let index = self.raw_index(linked, slot, None);
            match role {
                SyncRole::Children => self.add_child(host, part, index)?,
                SyncRole::Anchored => self.insert_anchored(host, part, index)?,
            }
            current.insert(slot, part);
            by_content.insert(content.clone(), part);
            matched.insert(part);
            slot += 1;

            // Activating the new part may synchronize its subtree, which can
            // move parts out of `host`.
            if self.linked(host, role)?.len() != expected_len {
                current = self.content_parts_in(self.linked(host, role)?);
                let remaining: HashSet<PartId> = current.iter().copied().collect();
                by_content.retain(|_, part| remaining.contains(part));
                slot = current
                    .iter()
                    .take_while(|part| matched.contains(*part))
                    .count();
            }
        }

        let leftovers: Vec<PartId> = current
            .into_iter()
            .filter(|part| !matched.contains(part))
            .collect();
        for part in leftovers {
            match role {
                SyncRole::Children => self.remove_child(host, part)?,
                SyncRole::Anchored => self.remove_anchored(host, part)?,
            }
            report.removed += 1;
            if self.dispose_if_obsolete(part)? {
                report.disposed += 1;
            }
        }

        self.finish_sync(host, role, &report);
        Ok(report)
    }

    /// Content children of `host` in order, skipping non-content parts.
    pub fn content_children_of(&self, host: PartId) -> Result<Vec<PartId>> {
        Ok(self.content_parts_in(&self.node(host)?.children))
    }

    pub fn content_anchoreds_of(&self, host: PartId) -> Result<Vec<PartId>> {
        Ok(self.content_parts_in(&self.node(host)?.anchoreds))
    }

    fn content_parts_in(&self, list: &[PartId]) -> Vec<PartId> {
        list.iter()
            .copied()
            .filter(|id| self.is_content_part(*id))
            .collect()
    }

    fn is_content_part(&self, part: PartId) -> bool {
        self.parts
            .get(part)
            .map(|node| node.kind.is_content())
            .unwrap_or(false)
    }

    fn linked(&self, host: PartId, role: SyncRole) -> Result<&[PartId]> {
        let node = self.node(host)?;
        Ok(match role {
            SyncRole::Children => &node.children,
            SyncRole::Anchored => &node.anchoreds,
        })
    }

    /// Whether linking `part` under `host` would make a part its own
    /// ancestor (or anchorage).
    fn closes_cycle(&self, host: PartId, part: PartId, role: SyncRole) -> bool {
        match role {
            SyncRole::Children => part == host || self.is_ancestor(part, host),
            SyncRole::Anchored => part == host,
        }
    }

    /// Translate a slot among content parts into a position in the raw list.
    /// `moving` is left out of the count so the result is valid after it is
    /// taken out of the list.
    fn raw_index(&self, list: &[PartId], slot: usize, moving: Option<PartId>) -> usize {
        let mut seen = 0;
        let mut after_last_content = 0;
        for (raw, id) in list.iter().filter(|id| Some(**id) != moving).enumerate() {
            if self.is_content_part(*id) {
                if seen == slot {
                    return raw;
                }
                seen += 1;
                after_last_content = raw + 1;
            }
        }
        after_last_content
    }

    fn registered_part_for(&self, content: &C) -> Option<PartId> {
        self.content_part_map
            .get(content)
            .copied()
            .filter(|part| self.parts.contains(*part))
    }

    fn create_content_part(&mut self, host: PartId, content: &C, role: SyncRole) -> Result<PartId> {
        let context = CreationContext {
            host,
            role,
            params: &self.config.factory_params,
        };
        let blueprint = self
            .factory
            .create_content_part(content, &context, &mut self.toolkit)?;
        let PartBlueprint {
            visual,
            delegate,
            adapters,
            refresh_visual,
        } = blueprint;

        let visual = match visual {
            Some(visual) => visual,
            None => self.toolkit.create_visual(PartKind::Content),
        };
        let mut node = PartNode::new(PartKind::Content, visual);
        node.content = Some(content.clone());
        node.delegate = Some(delegate);
        node.refresh_visual = refresh_visual;
        let part = self.parts.insert(node);

        for (key, adapter) in adapters {
            self.bind_adapter(part, key, adapter)?;
        }

        self.log(
            LogLevel::Trace,
            TARGET_SYNC,
            "part_created",
            [
                json_kv("part", json!(part.to_string())),
                json_kv("host", json!(host.to_string())),
                json_kv("role", role.as_str()),
                json_kv("content", format!("{content:?}")),
            ],
        );
        Ok(part)
    }

    /// Clear the content of a part nothing links to anymore. Returns whether
    /// the part was disposed.
    fn dispose_if_obsolete(&mut self, part: PartId) -> Result<bool> {
        let node = self.node(part)?;
        if node.kind != PartKind::Content || node.parent.is_some() || !node.anchorages.is_empty()
        {
            return Ok(false);
        }
        self.assign_content(part, None)?;
        self.node_mut(part)?.disposable = true;
        Ok(true)
    }

    fn warn_on_duplicates(&self, host: PartId, targets: &[C], role: SyncRole) {
        let mut seen = HashSet::with_capacity(targets.len());
        let duplicates = targets.iter().filter(|content| !seen.insert(*content)).count();
        if duplicates > 0 {
            self.log(
                LogLevel::Warn,
                TARGET_SYNC,
                "duplicate_content",
                [
                    json_kv("host", json!(host.to_string())),
                    json_kv("role", role.as_str()),
                    json_kv("duplicates", json!(duplicates)),
                ],
            );
        }
    }

    fn finish_sync(&self, host: PartId, role: SyncRole, report: &SyncReport) {
        self.with_metrics(|metrics| metrics.record_sync(report));
        let (level, message) = if report.is_noop() {
            (LogLevel::Trace, "content_in_sync")
        } else {
            (LogLevel::Debug, "content_synchronized")
        };
        self.log(
            level,
            TARGET_SYNC,
            message,
            [
                json_kv("host", json!(host.to_string())),
                json_kv("role", role.as_str()),
                json_kv("report", json!(report)),
            ],
        );
    }
}
