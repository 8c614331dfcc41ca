//! Activation cascade and adapter bindings.

use std::borrow::Cow;

use serde_json::json;

use crate::adapt::{Adapter, AdapterContext, AdapterKey, into_typed};
use crate::error::Result;
use crate::parts::{Content, PartId, PartKind};
use crate::toolkit::Toolkit;

use super::{Viewer, ViewerAuditStage};

#[derive(Clone, Copy)]
enum Hook {
    Activate,
    Deactivate,
}

impl<C: Content, T: Toolkit> Viewer<C, T> {
    /// Activate the root and, through it, the whole attached tree.
    pub fn activate(&mut self) -> Result<()> {
        self.activate_part(self.root)
    }

    pub fn deactivate(&mut self) -> Result<()> {
        self.deactivate_part(self.root)
    }

    /// Parent first, then its adapters in binding order, then the children.
    /// Content parts synchronize their content before their children
    /// activate when `auto_sync` is on.
    pub fn activate_part(&mut self, part: PartId) -> Result<()> {
        let node = self.node_mut(part)?;
        if node.active {
            return Ok(());
        }
        node.active = true;
        let kind = node.kind;
        self.with_metrics(|metrics| metrics.record_activation());
        self.audit(ViewerAuditStage::PartActivated, part, |event| event);

        for key in self.node(part)?.adapters.keys() {
            self.run_adapter_hook(part, &key, Hook::Activate)?;
        }

        if self.config.auto_sync && matches!(kind, PartKind::Root | PartKind::Content) {
            self.refresh_content(part)?;
        }

        let children = self.node(part)?.children.clone();
        for child in children {
            if self.parts.get(child).and_then(|node| node.parent) == Some(part) {
                self.activate_part(child)?;
            }
        }
        Ok(())
    }

    /// Mirror image of [`Viewer::activate_part`]: children in reverse, then
    /// adapters in reverse, then the part itself.
    pub fn deactivate_part(&mut self, part: PartId) -> Result<()> {
        if !self.node(part)?.active {
            return Ok(());
        }

        let children = self.node(part)?.children.clone();
        for child in children.into_iter().rev() {
            if self.parts.contains(child) {
                self.deactivate_part(child)?;
            }
        }

        for key in self.node(part)?.adapters.keys().into_iter().rev() {
            self.run_adapter_hook(part, &key, Hook::Deactivate)?;
        }

        self.node_mut(part)?.active = false;
        self.with_metrics(|metrics| metrics.record_deactivation());
        self.audit(ViewerAuditStage::PartDeactivated, part, |event| event);
        Ok(())
    }

    /// Bind `adapter` under `(A, role)`. A previous binding under the same
    /// key is unset first. The owner is injected before the adapter is
    /// activated, which happens right away when the part is active.
    pub fn set_adapter<A>(
        &mut self,
        part: PartId,
        role: impl Into<Cow<'static, str>>,
        adapter: A,
    ) -> Result<()>
    where
        A: Adapter<C, T>,
    {
        self.bind_adapter(part, AdapterKey::with_role::<A>(role), Box::new(adapter))
    }

    /// Remove the `(A, role)` binding, deactivating the adapter and clearing
    /// its owner first.
    pub fn unset_adapter<A>(&mut self, part: PartId, role: &str) -> Result<Option<A>>
    where
        A: Adapter<C, T>,
    {
        let key = AdapterKey::with_role::<A>(role.to_string());
        Ok(self
            .unbind_adapter(part, &key)?
            .and_then(into_typed::<C, T, A>))
    }

    pub fn adapter<A: Adapter<C, T>>(&self, part: PartId, role: &str) -> Option<&A> {
        self.parts.get(part)?.adapters.get::<A>(role)
    }

    pub fn adapter_mut<A: Adapter<C, T>>(&mut self, part: PartId, role: &str) -> Option<&mut A> {
        self.parts.get_mut(part)?.adapters.get_mut::<A>(role)
    }

    /// Every binding of type `A` on the part with its role.
    pub fn adapters_of_type<A: Adapter<C, T>>(&self, part: PartId) -> Vec<(&str, &A)> {
        self.parts
            .get(part)
            .map(|node| node.adapters.of_type::<A>())
            .unwrap_or_default()
    }

    pub fn adapter_keys(&self, part: PartId) -> Result<Vec<AdapterKey>> {
        Ok(self.node(part)?.adapters.keys())
    }

    pub(crate) fn bind_adapter(
        &mut self,
        part: PartId,
        key: AdapterKey,
        mut adapter: Box<dyn Adapter<C, T>>,
    ) -> Result<()> {
        if self.node(part)?.adapters.contains(&key) {
            self.unbind_adapter(part, &key)?;
        }

        if let Some(bound) = adapter.as_owner_bound() {
            bound.set_owner(Some(part));
        }
        if self.node(part)?.active {
            if let Some(activatable) = adapter.as_activatable() {
                let ctx = AdapterContext {
                    owner: part,
                    viewer: &*self,
                };
                activatable.activate(&ctx);
            }
        }

        let described = key.to_string();
        self.node_mut(part)?.adapters.insert(key, adapter);
        self.audit(ViewerAuditStage::AdapterSet, part, |event| {
            event.detail("key", json!(described))
        });
        Ok(())
    }

    fn unbind_adapter(
        &mut self,
        part: PartId,
        key: &AdapterKey,
    ) -> Result<Option<Box<dyn Adapter<C, T>>>> {
        let active = self.node(part)?.active;
        let Some(mut adapter) = self.node_mut(part)?.adapters.remove(key) else {
            return Ok(None);
        };

        if active {
            if let Some(activatable) = adapter.as_activatable() {
                let ctx = AdapterContext {
                    owner: part,
                    viewer: &*self,
                };
                activatable.deactivate(&ctx);
            }
        }
        if let Some(bound) = adapter.as_owner_bound() {
            bound.set_owner(None);
        }

        self.audit(ViewerAuditStage::AdapterUnset, part, |event| {
            event.detail("key", json!(key.to_string()))
        });
        Ok(Some(adapter))
    }

    fn run_adapter_hook(&mut self, part: PartId, key: &AdapterKey, hook: Hook) -> Result<()> {
        let Some(mut adapter) = self.node_mut(part)?.adapters.take(key) else {
            return Ok(());
        };

        if let Some(activatable) = adapter.as_activatable() {
            let ctx = AdapterContext {
                owner: part,
                viewer: &*self,
            };
            match hook {
                Hook::Activate => activatable.activate(&ctx),
                Hook::Deactivate => activatable.deactivate(&ctx),
            }
        }

        self.node_mut(part)?.adapters.restore(key.clone(), adapter);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use crate::adapt::{Activatable, OwnerBound};
    use crate::headless::HeadlessToolkit;
    use crate::parts::LeafPartFactory;

    use super::*;

    type Journal = Arc<Mutex<Vec<String>>>;

    struct Tracker {
        name: &'static str,
        journal: Journal,
        active: bool,
        owner: Option<PartId>,
        saw_owner_active: Option<bool>,
    }

    impl Tracker {
        fn new(name: &'static str, journal: &Journal) -> Self {
            Self {
                name,
                journal: Arc::clone(journal),
                active: false,
                owner: None,
                saw_owner_active: None,
            }
        }
    }

    impl Adapter<&'static str, HeadlessToolkit> for Tracker {
        fn as_activatable(
            &mut self,
        ) -> Option<&mut dyn Activatable<&'static str, HeadlessToolkit>> {
            Some(self)
        }

        fn as_owner_bound(&mut self) -> Option<&mut dyn OwnerBound> {
            Some(self)
        }
    }

    impl Activatable<&'static str, HeadlessToolkit> for Tracker {
        fn activate(&mut self, ctx: &AdapterContext<'_, &'static str, HeadlessToolkit>) {
            self.active = true;
            self.saw_owner_active = ctx.viewer.is_active(ctx.owner).ok();
            self.journal
                .lock()
                .unwrap()
                .push(format!("activate {}", self.name));
        }

        fn deactivate(&mut self, _ctx: &AdapterContext<'_, &'static str, HeadlessToolkit>) {
            self.active = false;
            self.journal
                .lock()
                .unwrap()
                .push(format!("deactivate {}", self.name));
        }

        fn is_active(&self) -> bool {
            self.active
        }
    }

    impl OwnerBound for Tracker {
        fn set_owner(&mut self, owner: Option<PartId>) {
            self.owner = owner;
        }

        fn owner(&self) -> Option<PartId> {
            self.owner
        }
    }

    struct Marker(u8);

    impl Adapter<&'static str, HeadlessToolkit> for Marker {}

    fn viewer() -> Viewer<&'static str, HeadlessToolkit> {
        Viewer::new(HeadlessToolkit::new(), LeafPartFactory)
    }

    #[test]
    fn activation_cascades_parent_first() {
        let journal = Journal::default();
        let mut viewer = viewer();
        let root = viewer.root();
        let child = viewer.create_part(PartKind::Feedback).unwrap();
        viewer.add_child_last(root, child).unwrap();
        viewer
            .set_adapter(root, "default", Tracker::new("root", &journal))
            .unwrap();
        viewer
            .set_adapter(child, "default", Tracker::new("child", &journal))
            .unwrap();

        viewer.activate().unwrap();
        viewer.deactivate().unwrap();

        assert_eq!(
            *journal.lock().unwrap(),
            vec![
                "activate root",
                "activate child",
                "deactivate child",
                "deactivate root"
            ]
        );
        assert!(!viewer.is_active(child).unwrap());
    }

    #[test]
    fn adapter_sees_owner_active_during_activation() {
        let journal = Journal::default();
        let mut viewer = viewer();
        let root = viewer.root();
        viewer
            .set_adapter(root, "default", Tracker::new("root", &journal))
            .unwrap();
        viewer.activate().unwrap();

        let tracker = viewer.adapter::<Tracker>(root, "default").unwrap();
        assert_eq!(tracker.saw_owner_active, Some(true));
        assert_eq!(tracker.owner(), Some(root));
        assert!(tracker.is_active());
    }

    #[test]
    fn binding_on_active_part_activates_immediately() {
        let journal = Journal::default();
        let mut viewer = viewer();
        let root = viewer.root();
        viewer.activate().unwrap();

        viewer
            .set_adapter(root, "hover", Tracker::new("late", &journal))
            .unwrap();
        assert!(viewer.adapter::<Tracker>(root, "hover").unwrap().is_active());

        let removed = viewer
            .unset_adapter::<Tracker>(root, "hover")
            .unwrap()
            .unwrap();
        assert!(!removed.is_active());
        assert_eq!(removed.owner(), None);
        assert_eq!(
            *journal.lock().unwrap(),
            vec!["activate late", "deactivate late"]
        );
    }

    #[test]
    fn rebinding_same_key_unsets_previous() {
        let journal = Journal::default();
        let mut viewer = viewer();
        let root = viewer.root();
        viewer.activate().unwrap();
        viewer
            .set_adapter(root, "default", Tracker::new("first", &journal))
            .unwrap();
        viewer
            .set_adapter(root, "default", Tracker::new("second", &journal))
            .unwrap();

        assert_eq!(viewer.adapters_of_type::<Tracker>(root).len(), 1);
        assert_eq!(
            *journal.lock().unwrap(),
            vec!["activate first", "deactivate first", "activate second"]
        );
    }

    #[test]
    fn same_type_under_distinct_roles() {
        let mut viewer = viewer();
        let root = viewer.root();
        viewer.set_adapter(root, "a", Marker(1)).unwrap();
        viewer.set_adapter(root, "b", Marker(2)).unwrap();

        let bound: Vec<_> = viewer
            .adapters_of_type::<Marker>(root)
            .into_iter()
            .map(|(role, marker)| (role.to_string(), marker.0))
            .collect();
        assert_eq!(bound, vec![("a".to_string(), 1), ("b".to_string(), 2)]);

        viewer.adapter_mut::<Marker>(root, "b").unwrap().0 = 5;
        assert_eq!(viewer.adapter::<Marker>(root, "b").unwrap().0, 5);
        assert!(viewer.unset_adapter::<Marker>(root, "c").unwrap().is_none());
    }

    #[test]
    fn attaching_to_inactive_parent_deactivates_child() {
        let mut viewer = viewer();
        let root = viewer.root();
        let orphan_parent = viewer.create_part(PartKind::Feedback).unwrap();
        let child = viewer.create_part(PartKind::Feedback).unwrap();
        viewer.activate().unwrap();
        viewer.add_child_last(root, child).unwrap();
        viewer.remove_child(root, child).unwrap();
        viewer.activate_part(child).unwrap();
        assert!(viewer.is_active(child).unwrap());

        viewer.add_child_last(orphan_parent, child).unwrap();
        assert!(!viewer.is_active(child).unwrap());
    }
}
