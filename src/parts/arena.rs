use std::fmt;
use std::hash::Hash;

use serde::Serialize;

use crate::adapt::AdapterStore;
use crate::toolkit::Toolkit;

use super::factory::ContentPart;

/// Application model object a content part represents.
///
/// Equality and hashing define content identity: two equal values map to the
/// same part within one viewer.
pub trait Content: Clone + Eq + Hash + fmt::Debug + 'static {}

impl<T> Content for T where T: Clone + Eq + Hash + fmt::Debug + 'static {}

/// Generational handle to a part stored in a viewer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct PartId {
    index: u32,
    generation: u32,
}

impl PartId {
    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }
}

impl fmt::Display for PartId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "part#{}v{}", self.index, self.generation)
    }
}

/// Category of a part. Only `Content` parts take part in content
/// synchronization; the root visual keeps one layer per other category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PartKind {
    Root,
    Content,
    Feedback,
    Handle,
}

impl PartKind {
    pub fn is_content(&self) -> bool {
        matches!(self, PartKind::Content)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PartKind::Root => "root",
            PartKind::Content => "content",
            PartKind::Feedback => "feedback",
            PartKind::Handle => "handle",
        }
    }
}

pub(crate) struct PartNode<C: 'static, T: Toolkit> {
    pub(crate) kind: PartKind,
    pub(crate) visual: T::Visual,
    pub(crate) content: Option<C>,
    pub(crate) parent: Option<PartId>,
    pub(crate) children: Vec<PartId>,
    pub(crate) anchorages: Vec<PartId>,
    pub(crate) anchoreds: Vec<PartId>,
    pub(crate) active: bool,
    pub(crate) registered: bool,
    pub(crate) disposable: bool,
    pub(crate) refresh_visual: bool,
    pub(crate) delegate: Option<Box<dyn ContentPart<C>>>,
    pub(crate) adapters: AdapterStore<C, T>,
}

impl<C: 'static, T: Toolkit> PartNode<C, T> {
    pub(crate) fn new(kind: PartKind, visual: T::Visual) -> Self {
        Self {
            kind,
            visual,
            content: None,
            parent: None,
            children: Vec::new(),
            anchorages: Vec::new(),
            anchoreds: Vec::new(),
            active: false,
            registered: false,
            disposable: false,
            refresh_visual: true,
            delegate: None,
            adapters: AdapterStore::new(),
        }
    }

    /// Linked to the root either through a parent or an anchorage.
    pub(crate) fn is_reachable(&self) -> bool {
        self.kind == PartKind::Root || self.parent.is_some() || !self.anchorages.is_empty()
    }
}

struct Slot<N> {
    generation: u32,
    value: Option<N>,
}

/// Slot storage with generation checks so stale handles never alias a
/// recycled part.
pub(crate) struct PartArena<N> {
    slots: Vec<Slot<N>>,
    free: Vec<u32>,
    len: usize,
}

impl<N> Default for PartArena<N> {
    fn default() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            len: 0,
        }
    }
}

impl<N> PartArena<N> {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn insert(&mut self, value: N) -> PartId {
        self.len += 1;
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.value = Some(value);
            return PartId {
                index,
                generation: slot.generation,
            };
        }

        let index = self.slots.len() as u32;
        self.slots.push(Slot {
            generation: 0,
            value: Some(value),
        });
        PartId {
            index,
            generation: 0,
        }
    }

    pub(crate) fn get(&self, id: PartId) -> Option<&N> {
        self.slots
            .get(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.value.as_ref())
    }

    pub(crate) fn get_mut(&mut self, id: PartId) -> Option<&mut N> {
        self.slots
            .get_mut(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.value.as_mut())
    }

    pub(crate) fn contains(&self, id: PartId) -> bool {
        self.get(id).is_some()
    }

    pub(crate) fn remove(&mut self, id: PartId) -> Option<N> {
        let slot = self
            .slots
            .get_mut(id.index as usize)
            .filter(|slot| slot.generation == id.generation)?;
        let value = slot.value.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(id.index);
        self.len -= 1;
        Some(value)
    }

    pub(crate) fn ids(&self) -> Vec<PartId> {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.value.is_some())
            .map(|(index, slot)| PartId {
                index: index as u32,
                generation: slot.generation,
            })
            .collect()
    }

    pub(crate) fn len(&self) -> usize {
        self.len
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn removed_slot_rejects_stale_handle() {
        let mut arena = PartArena::new();
        let first = arena.insert("a");
        assert_eq!(arena.remove(first), Some("a"));
        let second = arena.insert("b");

        assert_eq!(first.index(), second.index());
        assert_ne!(first, second);
        assert!(arena.get(first).is_none());
        assert_eq!(arena.get(second), Some(&"b"));
    }

    #[test]
    fn ids_lists_live_parts_only() {
        let mut arena = PartArena::new();
        let a = arena.insert(1);
        let b = arena.insert(2);
        arena.remove(a);
        assert_eq!(arena.ids(), vec![b]);
        assert_eq!(arena.len(), 1);
    }
}
