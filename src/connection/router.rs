use indexmap::IndexMap;

use crate::anchors::{AnchorId, AnchorKey, AnchorStore};
use crate::error::{MvcError, Result};
use crate::geometry::Point;
use crate::parts::PartId;

use super::{ConnectionId, anchor_key, rebind};

/// Reference points suggested for dynamic start/end anchors, by key.
pub type PositionHints = IndexMap<AnchorKey, Point>;

/// Mutable view of one connection handed to its router.
pub struct RouteRequest<'a> {
    pub(crate) connection: ConnectionId,
    pub(crate) owner: PartId,
    pub(crate) anchors: &'a mut Vec<AnchorId>,
    pub(crate) points: &'a mut Vec<Point>,
    pub(crate) store: &'a mut AnchorStore,
}

impl RouteRequest<'_> {
    pub fn connection(&self) -> ConnectionId {
        self.connection
    }

    pub fn owner(&self) -> PartId {
        self.owner
    }

    pub fn anchors(&self) -> &[AnchorId] {
        self.anchors
    }

    pub fn store(&self) -> &AnchorStore {
        self.store
    }

    pub fn store_mut(&mut self) -> &mut AnchorStore {
        self.store
    }

    pub fn key(&self, index: usize) -> AnchorKey {
        anchor_key(self.owner, self.connection, index, self.anchors.len())
    }

    pub fn position(&self, index: usize) -> Result<Point> {
        let anchor = self.anchors.get(index).copied().ok_or_else(|| {
            MvcError::invalid(format!("anchor index {index} out of range"))
        })?;
        self.store.position(anchor, &self.key(index))
    }

    /// Replace the anchor list, re-keying every anchor.
    pub fn set_anchors(&mut self, anchors: Vec<AnchorId>) -> Result<()> {
        rebind(self.store, self.owner, self.connection, self.anchors, &anchors)?;
        *self.anchors = anchors;
        Ok(())
    }

    /// Read every anchor's position into the connection's points.
    pub fn update_points(&mut self) -> Result<()> {
        let points = (0..self.anchors.len())
            .map(|index| self.position(index))
            .collect::<Result<Vec<_>>>()?;
        *self.points = points;
        Ok(())
    }
}

pub trait Router {
    fn name(&self) -> &'static str;

    fn route(&mut self, request: &mut RouteRequest<'_>) -> Result<()>;

    /// Whether `anchor` was inserted by this router rather than by the
    /// model.
    fn is_implicit_anchor(&self, _anchor: AnchorId) -> bool {
        false
    }

    fn position_hints(&self) -> &PositionHints;

    fn position_hints_mut(&mut self) -> &mut PositionHints;
}

/// Give dynamic start/end anchors a reference point: the hint for their key
/// if there is one, otherwise the neighbouring anchor.
fn apply_endpoint_references(hints: &PositionHints, request: &mut RouteRequest<'_>) -> Result<()> {
    let count = request.anchors().len();
    if count < 2 {
        return Ok(());
    }
    apply_reference(hints, request, 0, 1)?;
    apply_reference(hints, request, count - 1, count - 2)
}

fn apply_reference(
    hints: &PositionHints,
    request: &mut RouteRequest<'_>,
    index: usize,
    neighbour: usize,
) -> Result<()> {
    let id = request.anchors()[index];
    if !request.store().get(id)?.is_dynamic() {
        return Ok(());
    }
    let key = request.key(index);
    let reference = match hints.get(&key) {
        Some(hint) => *hint,
        None => neighbour_reference(request, neighbour)?,
    };
    request.store_mut().get_mut(id)?.set_reference_point(key, reference);
    Ok(())
}

/// A dynamic neighbour is referenced by its center so two dynamic ends do
/// not chase each other.
fn neighbour_reference(request: &RouteRequest<'_>, index: usize) -> Result<Point> {
    let anchor = request.store().get(request.anchors()[index])?;
    match anchor.geometry() {
        Some(bounds) => Ok(bounds.center()),
        None => anchor.position(&request.key(index)),
    }
}

/// Straight segments between consecutive anchors.
#[derive(Debug, Default)]
pub struct StraightRouter {
    hints: PositionHints,
}

impl StraightRouter {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Router for StraightRouter {
    fn name(&self) -> &'static str {
        "straight"
    }

    fn route(&mut self, request: &mut RouteRequest<'_>) -> Result<()> {
        apply_endpoint_references(&self.hints, request)?;
        request.update_points()
    }

    fn position_hints(&self) -> &PositionHints {
        &self.hints
    }

    fn position_hints_mut(&mut self) -> &mut PositionHints {
        &mut self.hints
    }
}

/// Axis-aligned routing: a bend point is inserted between every pair of
/// consecutive anchors that do not share a row or column. Bend points are
/// implicit static anchors owned by the router and rebuilt on every pass.
#[derive(Debug, Default)]
pub struct OrthogonalRouter {
    hints: PositionHints,
    implicit: Vec<AnchorId>,
}

impl OrthogonalRouter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn implicit_anchors(&self) -> &[AnchorId] {
        &self.implicit
    }
}

impl Router for OrthogonalRouter {
    fn name(&self) -> &'static str {
        "orthogonal"
    }

    fn route(&mut self, request: &mut RouteRequest<'_>) -> Result<()> {
        let explicit: Vec<AnchorId> = request
            .anchors()
            .iter()
            .copied()
            .filter(|id| !self.implicit.contains(id))
            .collect();
        self.implicit.clear();
        if explicit.len() != request.anchors().len() {
            request.set_anchors(explicit.clone())?;
        }

        apply_endpoint_references(&self.hints, request)?;
        let positions = (0..explicit.len())
            .map(|index| request.position(index))
            .collect::<Result<Vec<_>>>()?;

        let mut routed = Vec::with_capacity(explicit.len() * 2);
        for (index, id) in explicit.iter().enumerate() {
            if index > 0 {
                let (from, to) = (positions[index - 1], positions[index]);
                if !from.is_axis_aligned_with(&to) {
                    let bend = request.store_mut().static_anchor(Point::new(to.x, from.y));
                    self.implicit.push(bend);
                    routed.push(bend);
                }
            }
            routed.push(*id);
        }

        if !self.implicit.is_empty() {
            request.set_anchors(routed)?;
        }
        request.update_points()
    }

    fn is_implicit_anchor(&self, anchor: AnchorId) -> bool {
        self.implicit.contains(&anchor)
    }

    fn position_hints(&self) -> &PositionHints {
        &self.hints
    }

    fn position_hints_mut(&mut self) -> &mut PositionHints {
        &mut self.hints
    }
}
