//! Visual part storage.
//!
//! Parts live in a generational arena owned by the viewer; every link
//! between parts (parent, children, anchorages, anchoreds) is a [`PartId`]
//! handle. Ownership runs strictly parent to child.

mod arena;
pub mod factory;

pub use arena::{Content, PartId, PartKind};
pub(crate) use arena::{PartArena, PartNode};
pub use factory::{
    ContentPart, ContentPartFactory, CreationContext, FactoryParams, LeafContentPart,
    LeafPartFactory, PartBlueprint,
};
