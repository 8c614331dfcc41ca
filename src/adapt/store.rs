use std::any::Any;

use indexmap::IndexMap;

use crate::parts::PartId;
use crate::toolkit::Toolkit;
use crate::viewer::Viewer;

use super::AdapterKey;

/// A behaviour or policy that can be bound to a part.
///
/// The two hooks declare which lifecycle contracts the adapter takes part in;
/// returning `None` opts out.
pub trait Adapter<C: 'static, T: Toolkit>: Any {
    fn as_activatable(&mut self) -> Option<&mut dyn Activatable<C, T>> {
        None
    }

    fn as_owner_bound(&mut self) -> Option<&mut dyn OwnerBound> {
        None
    }
}

/// Adapter that follows its owner's activation.
pub trait Activatable<C: 'static, T: Toolkit> {
    fn activate(&mut self, ctx: &AdapterContext<'_, C, T>);
    fn deactivate(&mut self, ctx: &AdapterContext<'_, C, T>);
    fn is_active(&self) -> bool;
}

/// Adapter that is told which part it is bound to.
pub trait OwnerBound {
    fn set_owner(&mut self, owner: Option<PartId>);
    fn owner(&self) -> Option<PartId>;
}

/// Read access handed to adapters during activation hooks. The adapter being
/// called is not visible through the viewer while its hook runs.
pub struct AdapterContext<'a, C: 'static, T: Toolkit> {
    pub owner: PartId,
    pub viewer: &'a Viewer<C, T>,
}

/// Insertion-ordered `(type, role)` map of adapters.
pub struct AdapterStore<C: 'static, T: Toolkit> {
    entries: IndexMap<AdapterKey, Option<Box<dyn Adapter<C, T>>>>,
}

impl<C: 'static, T: Toolkit> Default for AdapterStore<C, T> {
    fn default() -> Self {
        Self {
            entries: IndexMap::new(),
        }
    }
}

impl<C: 'static, T: Toolkit> AdapterStore<C, T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, key: &AdapterKey) -> bool {
        self.entries.contains_key(key)
    }

    /// Keys in binding order.
    pub fn keys(&self) -> Vec<AdapterKey> {
        self.entries.keys().cloned().collect()
    }

    /// Bind under `key`, returning the adapter previously bound there.
    pub(crate) fn insert(
        &mut self,
        key: AdapterKey,
        adapter: Box<dyn Adapter<C, T>>,
    ) -> Option<Box<dyn Adapter<C, T>>> {
        self.entries.insert(key, Some(adapter)).flatten()
    }

    pub(crate) fn remove(&mut self, key: &AdapterKey) -> Option<Box<dyn Adapter<C, T>>> {
        self.entries.shift_remove(key).flatten()
    }

    /// Lend the adapter out while keeping its slot and position.
    pub(crate) fn take(&mut self, key: &AdapterKey) -> Option<Box<dyn Adapter<C, T>>> {
        self.entries.get_mut(key).and_then(Option::take)
    }

    pub(crate) fn restore(&mut self, key: AdapterKey, adapter: Box<dyn Adapter<C, T>>) {
        match self.entries.get_mut(&key) {
            Some(slot) => *slot = Some(adapter),
            None => {
                self.entries.insert(key, Some(adapter));
            }
        }
    }

    pub fn get_dyn(&self, key: &AdapterKey) -> Option<&dyn Adapter<C, T>> {
        self.entries.get(key).and_then(|slot| slot.as_deref())
    }

    pub fn get<A: Adapter<C, T>>(&self, role: &str) -> Option<&A> {
        let key = AdapterKey::with_role::<A>(role.to_string());
        let adapter = self.get_dyn(&key)?;
        let any: &dyn Any = adapter;
        any.downcast_ref::<A>()
    }

    pub fn get_mut<A: Adapter<C, T>>(&mut self, role: &str) -> Option<&mut A> {
        let key = AdapterKey::with_role::<A>(role.to_string());
        let adapter = self.entries.get_mut(&key)?.as_deref_mut()?;
        let any: &mut dyn Any = adapter;
        any.downcast_mut::<A>()
    }

    /// Every binding of type `A` with its role, in binding order.
    pub fn of_type<A: Adapter<C, T>>(&self) -> Vec<(&str, &A)> {
        self.entries
            .iter()
            .filter(|(key, _)| key.is::<A>())
            .filter_map(|(key, slot)| {
                let adapter = slot.as_deref()?;
                let any: &dyn Any = adapter;
                any.downcast_ref::<A>().map(|typed| (key.role(), typed))
            })
            .collect()
    }
}

pub(crate) fn into_typed<C: 'static, T: Toolkit, A: Adapter<C, T>>(
    adapter: Box<dyn Adapter<C, T>>,
) -> Option<A> {
    let any: Box<dyn Any> = adapter;
    any.downcast::<A>().ok().map(|typed| *typed)
}
