//! Capability registry attached to every part.
//!
//! Adapters are pluggable behaviours and policies bound to a part under an
//! [`AdapterKey`], the pair of the adapter's concrete type and a role string.
//! Each adapter declares through the [`Adapter`] trait whether it follows the
//! part's activation ([`Activatable`]) and whether it wants to know its owner
//! ([`OwnerBound`]).

mod key;
mod store;

pub use key::{AdapterKey, DEFAULT_ROLE};
pub use store::{Activatable, Adapter, AdapterContext, AdapterStore, OwnerBound};
pub(crate) use store::into_typed;
