//! Parent/child and anchorage/anchored links.
//!
//! Each mutation keeps both ends of a link, the registration lookups and the
//! toolkit's visual hierarchy in step, then follows the new parent's
//! activation state.

use serde_json::json;

use crate::error::{MvcError, Result};
use crate::parts::{Content, PartId, PartKind};
use crate::toolkit::Toolkit;

use super::{Viewer, ViewerAuditStage};

impl<C: Content, T: Toolkit> Viewer<C, T> {
    /// Insert `child` at `index` among `parent`'s children.
    pub fn add_child(&mut self, parent: PartId, child: PartId, index: usize) -> Result<()> {
        let parent_node = self.node(parent)?;
        let child_node = self.node(child)?;

        if parent == child {
            return Err(MvcError::invalid(format!("{child} cannot be its own child")));
        }
        if child_node.kind == PartKind::Root {
            return Err(MvcError::invalid("the root part cannot become a child"));
        }
        if let Some(existing) = child_node.parent {
            return Err(MvcError::invalid(format!(
                "{child} is already a child of {existing}"
            )));
        }
        if index > parent_node.children.len() {
            return Err(MvcError::invalid(format!(
                "child index {index} out of range 0..={}",
                parent_node.children.len()
            )));
        }
        if self.is_ancestor(child, parent) {
            return Err(MvcError::invalid(format!(
                "{child} is an ancestor of {parent}"
            )));
        }
        let parent_active = parent_node.active;

        self.node_mut(parent)?.children.insert(index, child);
        self.set_parent(child, Some(parent))?;
        self.attach_child_visual(parent, child, index)?;
        self.refresh_visual(child)?;
        self.audit(ViewerAuditStage::ChildAdded, child, |event| {
            event
                .detail("parent", json!(parent.to_string()))
                .detail("index", json!(index))
        });

        if parent_active {
            self.activate_part(child)?;
        } else if self.node(child)?.active {
            self.deactivate_part(child)?;
        }
        Ok(())
    }

    pub fn add_child_last(&mut self, parent: PartId, child: PartId) -> Result<()> {
        let index = self.node(parent)?.children.len();
        self.add_child(parent, child, index)
    }

    pub fn add_children(&mut self, parent: PartId, children: &[PartId]) -> Result<()> {
        for child in children {
            self.add_child_last(parent, *child)?;
        }
        Ok(())
    }

    /// Detach `child` from `parent`. Does nothing when `child` is not a
    /// current child of a live `parent`.
    pub fn remove_child(&mut self, parent: PartId, child: PartId) -> Result<()> {
        let Some(parent_node) = self.parts.get(parent) else {
            return Ok(());
        };
        let Some(position) = parent_node.children.iter().position(|id| *id == child) else {
            return Ok(());
        };
        if parent_node.active {
            self.deactivate_part(child)?;
        }

        self.set_parent(child, None)?;
        let parent_visual = self.node(parent)?.visual.clone();
        let child_visual = self.node(child)?.visual.clone();
        self.toolkit.detach_child_visual(&parent_visual, &child_visual);
        self.node_mut(parent)?.children.remove(position);
        self.audit(ViewerAuditStage::ChildRemoved, child, |event| {
            event
                .detail("parent", json!(parent.to_string()))
                .detail("index", json!(position))
        });
        Ok(())
    }

    pub fn remove_children(&mut self, parent: PartId, children: &[PartId]) -> Result<()> {
        for child in children {
            self.remove_child(parent, *child)?;
        }
        Ok(())
    }

    /// Move an existing child to `index`. The child stays registered and
    /// active throughout.
    pub fn reorder_child(&mut self, parent: PartId, child: PartId, index: usize) -> Result<()> {
        let parent_node = self.node(parent)?;
        let position = parent_node
            .children
            .iter()
            .position(|id| *id == child)
            .ok_or_else(|| MvcError::invalid(format!("{child} is not a child of {parent}")))?;
        if index >= parent_node.children.len() {
            return Err(MvcError::invalid(format!(
                "child index {index} out of range 0..{}",
                parent_node.children.len()
            )));
        }
        if position == index {
            return Ok(());
        }

        let parent_visual = parent_node.visual.clone();
        let child_visual = self.node(child)?.visual.clone();
        self.toolkit.detach_child_visual(&parent_visual, &child_visual);

        let children = &mut self.node_mut(parent)?.children;
        children.remove(position);
        children.insert(index, child);
        self.attach_child_visual(parent, child, index)?;
        self.audit(ViewerAuditStage::ChildReordered, child, |event| {
            event
                .detail("parent", json!(parent.to_string()))
                .detail("from", json!(position))
                .detail("to", json!(index))
        });
        Ok(())
    }

    pub fn add_anchored(&mut self, anchorage: PartId, anchored: PartId) -> Result<()> {
        let index = self.node(anchorage)?.anchoreds.len();
        self.insert_anchored(anchorage, anchored, index)
    }

    /// Drop one anchorage/anchored link between the two parts.
    pub fn remove_anchored(&mut self, anchorage: PartId, anchored: PartId) -> Result<()> {
        let position = self
            .node(anchorage)?
            .anchoreds
            .iter()
            .position(|id| *id == anchored)
            .ok_or_else(|| {
                MvcError::invalid(format!("{anchored} is not anchored on {anchorage}"))
            })?;

        self.remove_anchorage(anchored, anchorage)?;
        let anchorage_visual = self.node(anchorage)?.visual.clone();
        let anchored_visual = self.node(anchored)?.visual.clone();
        self.toolkit
            .detach_from_anchorage_visual(&anchorage_visual, &anchored_visual);
        self.node_mut(anchorage)?.anchoreds.remove(position);
        self.audit(ViewerAuditStage::AnchoredRemoved, anchored, |event| {
            event.detail("anchorage", json!(anchorage.to_string()))
        });
        Ok(())
    }

    pub fn add_anchoreds(&mut self, anchorage: PartId, anchoreds: &[PartId]) -> Result<()> {
        for anchored in anchoreds {
            self.add_anchored(anchorage, *anchored)?;
        }
        Ok(())
    }

    pub fn remove_anchoreds(&mut self, anchorage: PartId, anchoreds: &[PartId]) -> Result<()> {
        for anchored in anchoreds {
            self.remove_anchored(anchorage, *anchored)?;
        }
        Ok(())
    }

    /// Low-level half of a link: records `anchorage` on `part` without
    /// touching the anchorage's anchoreds.
    pub fn add_anchorage(&mut self, part: PartId, anchorage: PartId) -> Result<()> {
        self.node(anchorage)?;
        self.node_mut(part)?.anchorages.push(anchorage);
        self.update_registration(part)
    }

    pub fn remove_anchorage(&mut self, part: PartId, anchorage: PartId) -> Result<()> {
        let node = self.node_mut(part)?;
        let position = node
            .anchorages
            .iter()
            .position(|id| *id == anchorage)
            .ok_or_else(|| {
                MvcError::invalid(format!("{anchorage} is not an anchorage of {part}"))
            })?;
        node.anchorages.remove(position);
        self.update_registration(part)
    }

    pub(crate) fn insert_anchored(
        &mut self,
        anchorage: PartId,
        anchored: PartId,
        index: usize,
    ) -> Result<()> {
        let count = self.node(anchorage)?.anchoreds.len();
        self.node(anchored)?;
        if anchorage == anchored {
            return Err(MvcError::invalid(format!("{anchored} cannot anchor itself")));
        }
        if index > count {
            return Err(MvcError::invalid(format!(
                "anchored index {index} out of range 0..={count}"
            )));
        }

        self.node_mut(anchorage)?.anchoreds.insert(index, anchored);
        self.add_anchorage(anchored, anchorage)?;
        let anchorage_visual = self.node(anchorage)?.visual.clone();
        let anchored_visual = self.node(anchored)?.visual.clone();
        self.toolkit
            .attach_to_anchorage_visual(&anchorage_visual, &anchored_visual);
        self.refresh_visual(anchored)?;
        self.audit(ViewerAuditStage::AnchoredAdded, anchored, |event| {
            event
                .detail("anchorage", json!(anchorage.to_string()))
                .detail("index", json!(index))
        });
        Ok(())
    }

    pub(crate) fn move_anchored(
        &mut self,
        anchorage: PartId,
        anchored: PartId,
        index: usize,
    ) -> Result<()> {
        let anchoreds = &mut self.node_mut(anchorage)?.anchoreds;
        let position = anchoreds
            .iter()
            .position(|id| *id == anchored)
            .ok_or_else(|| {
                MvcError::invalid(format!("{anchored} is not anchored on {anchorage}"))
            })?;
        if position == index {
            return Ok(());
        }
        anchoreds.remove(position);
        let index = index.min(anchoreds.len());
        anchoreds.insert(index, anchored);
        self.audit(ViewerAuditStage::AnchoredReordered, anchored, |event| {
            event
                .detail("anchorage", json!(anchorage.to_string()))
                .detail("from", json!(position))
                .detail("to", json!(index))
        });
        Ok(())
    }

    fn set_parent(&mut self, child: PartId, parent: Option<PartId>) -> Result<()> {
        self.node_mut(child)?.parent = parent;
        self.update_registration(child)
    }

    /// Walks up from `part` looking for `candidate`.
    pub(crate) fn is_ancestor(&self, candidate: PartId, part: PartId) -> bool {
        let mut current = self.parts.get(part).and_then(|node| node.parent);
        while let Some(id) = current {
            if id == candidate {
                return true;
            }
            current = self.parts.get(id).and_then(|node| node.parent);
        }
        false
    }

    /// Hand the child visual to the toolkit. Children of the root are placed
    /// inside the layer of their kind, so the index is counted among earlier
    /// siblings of the same kind.
    fn attach_child_visual(&mut self, parent: PartId, child: PartId, index: usize) -> Result<()> {
        let parent_node = self.node(parent)?;
        let child_node = self.node(child)?;
        let visual_index = if parent_node.kind == PartKind::Root {
            parent_node.children[..index]
                .iter()
                .filter(|id| {
                    self.parts
                        .get(**id)
                        .map(|sibling| sibling.kind == child_node.kind)
                        .unwrap_or(false)
                })
                .count()
        } else {
            index
        };

        let parent_visual = parent_node.visual.clone();
        let child_visual = child_node.visual.clone();
        self.toolkit
            .attach_child_visual(&parent_visual, &child_visual, visual_index);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use proptest::prelude::*;

    use crate::headless::HeadlessToolkit;
    use crate::parts::LeafPartFactory;
    use crate::viewer::{RecordingAudit, ViewerConfig};

    use super::*;

    type TestViewer = Viewer<&'static str, HeadlessToolkit>;

    fn viewer() -> TestViewer {
        Viewer::new(HeadlessToolkit::new(), LeafPartFactory)
    }

    #[test]
    fn add_child_links_both_ends_and_registers() {
        let mut viewer = viewer();
        let root = viewer.root();
        let handle = viewer.create_part(PartKind::Handle).unwrap();
        assert!(!viewer.is_registered(handle));

        viewer.add_child_last(root, handle).unwrap();

        assert_eq!(viewer.parent(handle).unwrap(), Some(root));
        assert_eq!(viewer.children(root).unwrap(), &[handle]);
        assert!(viewer.is_registered(handle));
        let visual = viewer.visual(handle).unwrap().clone();
        assert_eq!(viewer.part_for_visual(&visual), Some(handle));
    }

    #[test]
    fn add_child_rejects_misuse() {
        let mut viewer = viewer();
        let root = viewer.root();
        let a = viewer.create_part(PartKind::Feedback).unwrap();
        let b = viewer.create_part(PartKind::Feedback).unwrap();

        assert!(viewer.add_child(root, a, 3).unwrap_err().is_invalid_argument());
        viewer.add_child_last(root, a).unwrap();
        assert!(viewer.add_child_last(root, a).unwrap_err().is_invalid_argument());
        assert!(viewer.add_child_last(a, a).unwrap_err().is_invalid_argument());
        assert!(viewer.add_child_last(a, root).unwrap_err().is_invalid_argument());

        viewer.add_child_last(a, b).unwrap();
        viewer.remove_child(root, a).unwrap();
        assert!(viewer.add_child_last(b, a).unwrap_err().is_invalid_argument());
    }

    #[test]
    fn remove_child_is_noop_for_strangers() {
        let mut viewer = viewer();
        let root = viewer.root();
        let stranger = viewer.create_part(PartKind::Handle).unwrap();
        viewer.remove_child(root, stranger).unwrap();
        assert!(viewer.children(root).unwrap().is_empty());
    }

    #[test]
    fn removed_child_unregisters_and_deactivates() {
        let mut viewer = viewer();
        let root = viewer.root();
        viewer.activate().unwrap();
        let handle = viewer.create_part(PartKind::Handle).unwrap();
        viewer.add_child_last(root, handle).unwrap();
        assert!(viewer.is_active(handle).unwrap());

        viewer.remove_child(root, handle).unwrap();

        assert!(!viewer.is_active(handle).unwrap());
        assert!(!viewer.is_registered(handle));
        assert_eq!(viewer.parent(handle).unwrap(), None);
        let visual = viewer.visual(handle).unwrap().clone();
        assert!(viewer.part_for_visual(&visual).is_none());
    }

    #[test]
    fn reorder_keeps_registration_and_moves_visual() {
        let mut viewer = viewer();
        let root = viewer.root();
        let parent = viewer.create_part(PartKind::Feedback).unwrap();
        viewer.add_child_last(root, parent).unwrap();
        let a = viewer.create_part(PartKind::Feedback).unwrap();
        let b = viewer.create_part(PartKind::Feedback).unwrap();
        let c = viewer.create_part(PartKind::Feedback).unwrap();
        viewer.add_children(parent, &[a, b, c]).unwrap();

        viewer.reorder_child(parent, c, 0).unwrap();

        assert_eq!(viewer.children(parent).unwrap(), &[c, a, b]);
        assert!(viewer.is_registered(c));
        let parent_visual = viewer.visual(parent).unwrap().clone();
        let expected: Vec<_> = [c, a, b]
            .iter()
            .map(|id| viewer.visual(*id).unwrap().clone())
            .collect();
        assert_eq!(viewer.toolkit().children_of(&parent_visual), expected);
        assert!(viewer.reorder_child(parent, root, 0).is_err());
        assert!(viewer.reorder_child(parent, a, 3).is_err());
    }

    #[test]
    fn root_children_use_layer_local_visual_indices() {
        let mut viewer = viewer();
        let root = viewer.root();
        let feedback = viewer.create_part(PartKind::Feedback).unwrap();
        let handle = viewer.create_part(PartKind::Handle).unwrap();
        let second_handle = viewer.create_part(PartKind::Handle).unwrap();
        viewer.add_child_last(root, feedback).unwrap();
        viewer.add_child_last(root, handle).unwrap();
        viewer.add_child(root, second_handle, 1).unwrap();

        let toolkit = viewer.toolkit();
        let root_visual = viewer.visual(root).unwrap().clone();
        assert_eq!(
            toolkit.layer_children(&root_visual, PartKind::Handle),
            vec![
                viewer.visual(second_handle).unwrap().clone(),
                viewer.visual(handle).unwrap().clone()
            ]
        );
        assert_eq!(
            toolkit.layer_children(&root_visual, PartKind::Feedback),
            vec![viewer.visual(feedback).unwrap().clone()]
        );
    }

    #[test]
    fn anchored_links_keep_parts_registered() {
        let audit = Arc::new(RecordingAudit::new());
        let mut viewer: TestViewer = Viewer::with_config(
            HeadlessToolkit::new(),
            LeafPartFactory,
            ViewerConfig::default().with_audit(audit.clone()),
        );
        let root = viewer.root();
        let anchorage = viewer.create_part(PartKind::Feedback).unwrap();
        let anchored = viewer.create_part(PartKind::Handle).unwrap();
        viewer.add_child_last(root, anchorage).unwrap();

        viewer.add_anchored(anchorage, anchored).unwrap();
        assert!(viewer.is_registered(anchored));
        assert_eq!(viewer.anchorages(anchored).unwrap(), &[anchorage]);
        assert_eq!(viewer.root_of(anchored), Some(root));

        viewer.remove_anchored(anchorage, anchored).unwrap();
        assert!(!viewer.is_registered(anchored));
        assert!(viewer.anchoreds(anchorage).unwrap().is_empty());
        assert_eq!(audit.count(ViewerAuditStage::AnchoredAdded), 1);
        assert_eq!(audit.count(ViewerAuditStage::AnchoredRemoved), 1);

        assert!(
            viewer
                .remove_anchored(anchorage, anchored)
                .unwrap_err()
                .is_invalid_argument()
        );
        assert!(
            viewer
                .remove_anchorage(anchored, anchorage)
                .unwrap_err()
                .is_invalid_argument()
        );
    }

    #[test]
    fn root_is_registered_on_construction() {
        let audit = Arc::new(RecordingAudit::new());
        let viewer: TestViewer = Viewer::with_config(
            HeadlessToolkit::new(),
            LeafPartFactory,
            ViewerConfig::default().with_audit(audit.clone()),
        );
        let root = viewer.root();
        let visual = viewer.visual(root).unwrap().clone();

        assert!(viewer.is_registered(root));
        assert_eq!(viewer.part_for_visual(&visual), Some(root));
        assert_eq!(viewer.root_of(root), Some(root));
        assert_eq!(
            audit.stages(),
            vec![(ViewerAuditStage::PartRegistered, root)]
        );
    }

    #[test]
    fn anchoreds_are_linked_and_unlinked_in_batches() {
        let mut viewer = viewer();
        let root = viewer.root();
        let anchorage = viewer.create_part(PartKind::Feedback).unwrap();
        viewer.add_child_last(root, anchorage).unwrap();
        let first = viewer.create_part(PartKind::Handle).unwrap();
        let second = viewer.create_part(PartKind::Handle).unwrap();
        let third = viewer.create_part(PartKind::Handle).unwrap();

        viewer
            .add_anchoreds(anchorage, &[first, second, third])
            .unwrap();
        assert_eq!(viewer.anchoreds(anchorage).unwrap(), &[first, second, third]);
        assert!(viewer.is_registered(third));

        viewer.remove_anchoreds(anchorage, &[third, first]).unwrap();
        assert_eq!(viewer.anchoreds(anchorage).unwrap(), &[second]);
        assert!(!viewer.is_registered(first));
        assert!(viewer.anchorages(first).unwrap().is_empty());
        assert!(
            viewer
                .remove_anchoreds(anchorage, &[second, first])
                .unwrap_err()
                .is_invalid_argument()
        );
        assert!(viewer.anchoreds(anchorage).unwrap().is_empty());
    }

    #[derive(Debug, Clone)]
    enum Edit {
        Add(usize, usize),
        Remove(usize),
        Reorder(usize, usize),
        ToggleActive,
    }

    const POOL: usize = 6;

    fn edit() -> impl Strategy<Value = Edit> {
        prop_oneof![
            (0..POOL, 0usize..16).prop_map(|(part, at)| Edit::Add(part, at)),
            (0..POOL).prop_map(Edit::Remove),
            (0..POOL, 0usize..16).prop_map(|(part, at)| Edit::Reorder(part, at)),
            Just(Edit::ToggleActive),
        ]
    }

    proptest! {
        #[test]
        fn child_list_tracks_every_edit(edits in prop::collection::vec(edit(), 1..40)) {
            let mut viewer = viewer();
            let root = viewer.root();
            let parent = viewer.create_part(PartKind::Feedback).unwrap();
            viewer.add_child_last(root, parent).unwrap();
            let pool: Vec<PartId> = (0..POOL)
                .map(|_| viewer.create_part(PartKind::Handle).unwrap())
                .collect();
            let mut expected: Vec<usize> = Vec::new();

            for edit in edits {
                match edit {
                    Edit::Add(part, at) => {
                        if !expected.contains(&part) {
                            let at = at % (expected.len() + 1);
                            viewer.add_child(parent, pool[part], at).unwrap();
                            expected.insert(at, part);
                        }
                    }
                    Edit::Remove(part) => {
                        viewer.remove_child(parent, pool[part]).unwrap();
                        expected.retain(|held| *held != part);
                    }
                    Edit::Reorder(part, at) => {
                        if let Some(from) = expected.iter().position(|held| *held == part) {
                            let at = at % expected.len();
                            viewer.reorder_child(parent, pool[part], at).unwrap();
                            expected.remove(from);
                            expected.insert(at, part);
                        }
                    }
                    Edit::ToggleActive => {
                        if viewer.is_active(root).unwrap() {
                            viewer.deactivate().unwrap();
                        } else {
                            viewer.activate().unwrap();
                        }
                    }
                }

                let children: Vec<PartId> = expected.iter().map(|index| pool[*index]).collect();
                prop_assert_eq!(viewer.children(parent).unwrap(), children.as_slice());

                let visuals: Vec<_> = children
                    .iter()
                    .map(|id| viewer.visual(*id).unwrap().clone())
                    .collect();
                let parent_visual = viewer.visual(parent).unwrap().clone();
                prop_assert_eq!(viewer.toolkit().children_of(&parent_visual), visuals);

                let parent_active = viewer.is_active(parent).unwrap();
                prop_assert_eq!(parent_active, viewer.is_active(root).unwrap());
                for (index, part) in pool.iter().enumerate() {
                    if expected.contains(&index) {
                        prop_assert_eq!(viewer.parent(*part).unwrap(), Some(parent));
                        prop_assert!(viewer.is_registered(*part));
                        prop_assert_eq!(viewer.is_active(*part).unwrap(), parent_active);
                    } else {
                        prop_assert_eq!(viewer.parent(*part).unwrap(), None);
                        prop_assert!(!viewer.is_registered(*part));
                        prop_assert!(!viewer.is_active(*part).unwrap());
                    }
                }
            }
        }
    }
}
