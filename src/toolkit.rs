//! Contract between the part engine and a rendering binding.
//!
//! The engine never draws anything. It tells the toolkit when a part's visual
//! joins or leaves its parent visual, when it is hooked up to an anchorage
//! visual, and when it should be refreshed from its part.

use std::fmt::Debug;
use std::hash::Hash;

use crate::parts::PartKind;

pub trait Toolkit: 'static {
    /// Opaque visual handle. Must be unique per part.
    type Visual: Clone + Eq + Hash + Debug + 'static;

    fn create_visual(&mut self, kind: PartKind) -> Self::Visual;

    /// `index` is the position among the parent's child visuals. For the root
    /// visual it is the position inside the layer of the child's kind.
    fn attach_child_visual(&mut self, parent: &Self::Visual, child: &Self::Visual, index: usize);

    fn detach_child_visual(&mut self, parent: &Self::Visual, child: &Self::Visual);

    fn attach_to_anchorage_visual(&mut self, _anchorage: &Self::Visual, _anchored: &Self::Visual) {}

    fn detach_from_anchorage_visual(
        &mut self,
        _anchorage: &Self::Visual,
        _anchored: &Self::Visual,
    ) {
    }

    fn refresh_visual(&mut self, _visual: &Self::Visual) {}

    /// Called once a part is purged from the viewer.
    fn destroy_visual(&mut self, _visual: &Self::Visual) {}
}
