use indexmap::IndexMap;

use crate::error::{MvcError, Result};
use crate::geometry::{Bounds, Point};
use crate::parts::PartId;

use super::{Anchor, AnchorId, AnchorKey, PositionStrategy};

struct Entry {
    anchor: Anchor,
    refs: usize,
}

/// Reference-counted anchor storage. Connections retain the anchors they
/// list; an anchor is dropped when its last reference is released.
#[derive(Default)]
pub struct AnchorStore {
    entries: IndexMap<AnchorId, Entry>,
    next_id: u64,
}

impl AnchorStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn static_anchor(&mut self, location: Point) -> AnchorId {
        self.insert(Anchor::new_static(location))
    }

    pub fn dynamic_anchor(
        &mut self,
        anchorage: PartId,
        geometry: Bounds,
        strategy: PositionStrategy,
    ) -> AnchorId {
        self.insert(Anchor::new_dynamic(anchorage, geometry, strategy))
    }

    /// Store an anchor with no references yet.
    pub fn insert(&mut self, anchor: Anchor) -> AnchorId {
        let id = AnchorId(self.next_id);
        self.next_id += 1;
        self.entries.insert(id, Entry { anchor, refs: 0 });
        id
    }

    pub fn contains(&self, id: AnchorId) -> bool {
        self.entries.contains_key(&id)
    }

    pub fn get(&self, id: AnchorId) -> Result<&Anchor> {
        self.entries
            .get(&id)
            .map(|entry| &entry.anchor)
            .ok_or(MvcError::UnknownAnchor(id))
    }

    pub fn get_mut(&mut self, id: AnchorId) -> Result<&mut Anchor> {
        self.entries
            .get_mut(&id)
            .map(|entry| &mut entry.anchor)
            .ok_or(MvcError::UnknownAnchor(id))
    }

    pub fn position(&self, id: AnchorId, key: &AnchorKey) -> Result<Point> {
        self.get(id)?.position(key)
    }

    pub fn ref_count(&self, id: AnchorId) -> usize {
        self.entries.get(&id).map(|entry| entry.refs).unwrap_or(0)
    }

    pub fn retain(&mut self, id: AnchorId) -> Result<()> {
        let entry = self
            .entries
            .get_mut(&id)
            .ok_or(MvcError::UnknownAnchor(id))?;
        entry.refs += 1;
        Ok(())
    }

    /// Drop one reference. Returns `true` when that was the last one and the
    /// anchor is gone.
    pub fn release(&mut self, id: AnchorId) -> Result<bool> {
        let entry = self
            .entries
            .get_mut(&id)
            .ok_or(MvcError::UnknownAnchor(id))?;
        entry.refs = entry.refs.saturating_sub(1);
        if entry.refs == 0 {
            self.entries.shift_remove(&id);
            return Ok(true);
        }
        Ok(false)
    }

    /// Dynamic anchors driven by `part`, in creation order.
    pub fn anchors_bound_to(&self, part: PartId) -> Vec<AnchorId> {
        self.entries
            .iter()
            .filter(|(_, entry)| entry.anchor.anchorage() == Some(part))
            .map(|(id, _)| *id)
            .collect()
    }

    /// Push new bounds of `part` into every dynamic anchor bound to it and
    /// return the anchors that were recomputed.
    pub fn geometry_changed(&mut self, part: PartId, bounds: Bounds) -> Result<Vec<AnchorId>> {
        let bound = self.anchors_bound_to(part);
        for id in &bound {
            self.get_mut(*id)?.set_geometry(bounds)?;
        }
        Ok(bound)
    }

    /// Drop anchors that were created but never retained.
    pub fn collect_unreferenced(&mut self) -> Vec<AnchorId> {
        let unreferenced: Vec<AnchorId> = self
            .entries
            .iter()
            .filter(|(_, entry)| entry.refs == 0)
            .map(|(id, _)| *id)
            .collect();
        for id in &unreferenced {
            self.entries.shift_remove(id);
        }
        unreferenced
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parts::PartArena;

    #[test]
    fn last_release_drops_anchor() {
        let mut store = AnchorStore::new();
        let id = store.static_anchor(Point::new(1.0, 2.0));
        store.retain(id).unwrap();
        store.retain(id).unwrap();
        assert_eq!(store.ref_count(id), 2);

        assert!(!store.release(id).unwrap());
        assert!(store.release(id).unwrap());
        assert!(!store.contains(id));
        assert!(matches!(store.release(id), Err(MvcError::UnknownAnchor(_))));
    }

    #[test]
    fn geometry_change_reaches_bound_anchors_only() {
        let mut parts = PartArena::new();
        let (owner, node, other) = (parts.insert(()), parts.insert(()), parts.insert(()));
        let mut store = AnchorStore::new();
        let bounds = Bounds::new(0.0, 0.0, 10.0, 10.0);
        let bound = store.dynamic_anchor(node, bounds, PositionStrategy::Center);
        let elsewhere = store.dynamic_anchor(other, bounds, PositionStrategy::Center);
        let fixed = store.static_anchor(Point::default());
        let key = AnchorKey::new(owner, "start");
        store.get_mut(bound).unwrap().attach(key.clone());

        let updated = store
            .geometry_changed(node, Bounds::new(10.0, 10.0, 10.0, 10.0))
            .unwrap();

        assert_eq!(updated, vec![bound]);
        assert_eq!(store.position(bound, &key).unwrap(), Point::new(15.0, 15.0));
        assert_eq!(store.anchors_bound_to(other), vec![elsewhere]);
        assert!(store.anchors_bound_to(owner).is_empty());
        assert_eq!(store.collect_unreferenced(), vec![bound, elsewhere, fixed]);
        assert!(store.is_empty());
    }
}
