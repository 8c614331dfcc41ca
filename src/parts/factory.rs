use std::borrow::Cow;

use serde_json::{Map, Value};

use crate::adapt::{Adapter, AdapterKey};
use crate::error::Result;
use crate::sync::SyncRole;
use crate::toolkit::Toolkit;

use super::PartId;

/// Free-form parameters handed to the factory on every creation.
pub type FactoryParams = Map<String, Value>;

/// Per-part view of the application model: which content objects a content
/// part declares as children and as anchoreds.
pub trait ContentPart<C>: 'static {
    fn content_children(&self, _content: &C) -> Vec<C> {
        Vec::new()
    }

    fn content_anchored(&self, _content: &C) -> Vec<C> {
        Vec::new()
    }
}

/// Content part without children or anchoreds.
#[derive(Debug, Default, Clone, Copy)]
pub struct LeafContentPart;

impl<C> ContentPart<C> for LeafContentPart {}

/// Why the synchronizer asked for a new part.
#[derive(Debug, Clone, Copy)]
pub struct CreationContext<'a> {
    pub host: PartId,
    pub role: SyncRole,
    pub params: &'a FactoryParams,
}

/// Everything the viewer needs to materialize a content part.
pub struct PartBlueprint<C: 'static, T: Toolkit> {
    pub(crate) visual: Option<T::Visual>,
    pub(crate) delegate: Box<dyn ContentPart<C>>,
    pub(crate) adapters: Vec<(AdapterKey, Box<dyn Adapter<C, T>>)>,
    pub(crate) refresh_visual: bool,
}

impl<C: 'static, T: Toolkit> PartBlueprint<C, T> {
    pub fn new<D>(delegate: D) -> Self
    where
        D: ContentPart<C>,
    {
        Self {
            visual: None,
            delegate: Box::new(delegate),
            adapters: Vec::new(),
            refresh_visual: true,
        }
    }

    pub fn leaf() -> Self {
        Self::new(LeafContentPart)
    }

    /// Use a visual the factory built itself instead of asking the toolkit.
    pub fn with_visual(mut self, visual: T::Visual) -> Self {
        self.visual = Some(visual);
        self
    }

    pub fn with_adapter<A>(mut self, role: impl Into<Cow<'static, str>>, adapter: A) -> Self
    where
        A: Adapter<C, T>,
    {
        self.adapters
            .push((AdapterKey::with_role::<A>(role), Box::new(adapter)));
        self
    }

    pub fn refresh_visual(mut self, enabled: bool) -> Self {
        self.refresh_visual = enabled;
        self
    }
}

/// Creates parts for content objects the viewer has not seen yet.
pub trait ContentPartFactory<C: 'static, T: Toolkit> {
    fn create_content_part(
        &mut self,
        content: &C,
        context: &CreationContext<'_>,
        toolkit: &mut T,
    ) -> Result<PartBlueprint<C, T>>;
}

/// Factory that gives every content object a childless part.
#[derive(Debug, Default, Clone, Copy)]
pub struct LeafPartFactory;

impl<C: 'static, T: Toolkit> ContentPartFactory<C, T> for LeafPartFactory {
    fn create_content_part(
        &mut self,
        _content: &C,
        _context: &CreationContext<'_>,
        _toolkit: &mut T,
    ) -> Result<PartBlueprint<C, T>> {
        Ok(PartBlueprint::leaf())
    }
}

impl<C, T, F> ContentPartFactory<C, T> for F
where
    C: 'static,
    T: Toolkit,
    F: FnMut(&C, &CreationContext<'_>, &mut T) -> Result<PartBlueprint<C, T>>,
{
    fn create_content_part(
        &mut self,
        content: &C,
        context: &CreationContext<'_>,
        toolkit: &mut T,
    ) -> Result<PartBlueprint<C, T>> {
        self(content, context, toolkit)
    }
}
