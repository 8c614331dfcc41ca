//! In-memory toolkit binding.
//!
//! Keeps a plain visual hierarchy so tests, benches and tools can drive a
//! viewer and inspect what a rendering binding would have been told. The
//! root visual keeps separate content, feedback and handle layers.

use std::fmt;

use serde::Serialize;

use crate::parts::PartKind;
use crate::toolkit::Toolkit;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct VisualId(u32);

impl fmt::Display for VisualId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "visual#{}", self.0)
    }
}

#[derive(Debug)]
struct VisualRecord {
    kind: PartKind,
    parent: Option<VisualId>,
    children: Vec<VisualId>,
    layers: [Vec<VisualId>; 3],
    anchoreds: Vec<VisualId>,
    refreshes: usize,
    alive: bool,
}

impl VisualRecord {
    fn new(kind: PartKind) -> Self {
        Self {
            kind,
            parent: None,
            children: Vec::new(),
            layers: Default::default(),
            anchoreds: Vec::new(),
            refreshes: 0,
            alive: true,
        }
    }

    fn child_list(&mut self, child_kind: PartKind) -> &mut Vec<VisualId> {
        if self.kind == PartKind::Root {
            &mut self.layers[layer_slot(child_kind)]
        } else {
            &mut self.children
        }
    }
}

fn layer_slot(kind: PartKind) -> usize {
    match kind {
        PartKind::Feedback => 1,
        PartKind::Handle => 2,
        PartKind::Root | PartKind::Content => 0,
    }
}

#[derive(Debug, Default)]
pub struct HeadlessToolkit {
    visuals: Vec<VisualRecord>,
    mutations: usize,
}

impl HeadlessToolkit {
    pub fn new() -> Self {
        Self::default()
    }

    fn record(&self, visual: &VisualId) -> Option<&VisualRecord> {
        self.visuals.get(visual.0 as usize)
    }

    fn record_mut(&mut self, visual: &VisualId) -> Option<&mut VisualRecord> {
        self.visuals.get_mut(visual.0 as usize)
    }

    pub fn kind_of(&self, visual: &VisualId) -> Option<PartKind> {
        self.record(visual).map(|record| record.kind)
    }

    pub fn parent_of(&self, visual: &VisualId) -> Option<VisualId> {
        self.record(visual).and_then(|record| record.parent)
    }

    /// Child visuals in paint order. For the root, the content layer comes
    /// first, then feedback, then handles.
    pub fn children_of(&self, visual: &VisualId) -> Vec<VisualId> {
        match self.record(visual) {
            Some(record) if record.kind == PartKind::Root => {
                record.layers.iter().flatten().copied().collect()
            }
            Some(record) => record.children.clone(),
            None => Vec::new(),
        }
    }

    pub fn layer_children(&self, root: &VisualId, layer: PartKind) -> Vec<VisualId> {
        self.record(root)
            .filter(|record| record.kind == PartKind::Root)
            .map(|record| record.layers[layer_slot(layer)].clone())
            .unwrap_or_default()
    }

    pub fn anchoreds_of(&self, visual: &VisualId) -> Vec<VisualId> {
        self.record(visual)
            .map(|record| record.anchoreds.clone())
            .unwrap_or_default()
    }

    pub fn refresh_count(&self, visual: &VisualId) -> usize {
        self.record(visual).map(|record| record.refreshes).unwrap_or(0)
    }

    /// Attach, detach and anchorage calls received so far.
    pub fn mutation_count(&self) -> usize {
        self.mutations
    }

    pub fn is_alive(&self, visual: &VisualId) -> bool {
        self.record(visual).map(|record| record.alive).unwrap_or(false)
    }
}

impl Toolkit for HeadlessToolkit {
    type Visual = VisualId;

    fn create_visual(&mut self, kind: PartKind) -> VisualId {
        let id = VisualId(self.visuals.len() as u32);
        self.visuals.push(VisualRecord::new(kind));
        id
    }

    fn attach_child_visual(&mut self, parent: &VisualId, child: &VisualId, index: usize) {
        let Some(child_kind) = self.kind_of(child) else {
            return;
        };
        if let Some(record) = self.record_mut(parent) {
            let list = record.child_list(child_kind);
            let index = index.min(list.len());
            list.insert(index, *child);
        }
        if let Some(record) = self.record_mut(child) {
            record.parent = Some(*parent);
        }
        self.mutations += 1;
    }

    fn detach_child_visual(&mut self, parent: &VisualId, child: &VisualId) {
        let Some(child_kind) = self.kind_of(child) else {
            return;
        };
        if let Some(record) = self.record_mut(parent) {
            record.child_list(child_kind).retain(|id| id != child);
        }
        if let Some(record) = self.record_mut(child) {
            record.parent = None;
        }
        self.mutations += 1;
    }

    fn attach_to_anchorage_visual(&mut self, anchorage: &VisualId, anchored: &VisualId) {
        if let Some(record) = self.record_mut(anchorage) {
            record.anchoreds.push(*anchored);
        }
        self.mutations += 1;
    }

    fn detach_from_anchorage_visual(&mut self, anchorage: &VisualId, anchored: &VisualId) {
        if let Some(record) = self.record_mut(anchorage) {
            if let Some(position) = record.anchoreds.iter().position(|id| id == anchored) {
                record.anchoreds.remove(position);
            }
        }
        self.mutations += 1;
    }

    fn refresh_visual(&mut self, visual: &VisualId) {
        if let Some(record) = self.record_mut(visual) {
            record.refreshes += 1;
        }
    }

    fn destroy_visual(&mut self, visual: &VisualId) {
        if let Some(record) = self.record_mut(visual) {
            record.alive = false;
            record.children.clear();
            record.anchoreds.clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_keeps_one_layer_per_kind() {
        let mut toolkit = HeadlessToolkit::new();
        let root = toolkit.create_visual(PartKind::Root);
        let content = toolkit.create_visual(PartKind::Content);
        let handle = toolkit.create_visual(PartKind::Handle);
        let feedback = toolkit.create_visual(PartKind::Feedback);

        toolkit.attach_child_visual(&root, &handle, 0);
        toolkit.attach_child_visual(&root, &content, 0);
        toolkit.attach_child_visual(&root, &feedback, 0);

        assert_eq!(toolkit.children_of(&root), vec![content, feedback, handle]);
        assert_eq!(toolkit.layer_children(&root, PartKind::Handle), vec![handle]);
        assert_eq!(toolkit.parent_of(&handle), Some(root));

        toolkit.detach_child_visual(&root, &handle);
        assert!(toolkit.layer_children(&root, PartKind::Handle).is_empty());
        assert_eq!(toolkit.mutation_count(), 4);
    }

    #[test]
    fn destroyed_visual_is_not_alive() {
        let mut toolkit = HeadlessToolkit::new();
        let visual = toolkit.create_visual(PartKind::Content);
        toolkit.refresh_visual(&visual);
        assert_eq!(toolkit.refresh_count(&visual), 1);
        toolkit.destroy_visual(&visual);
        assert!(!toolkit.is_alive(&visual));
    }
}
