//! Named position providers.
//!
//! An [`Anchor`] hands out one position per attached [`AnchorKey`]. Static
//! anchors report stored positions; dynamic anchors derive them from the
//! bounds of the part they are bound to and a per-key reference point, and
//! recompute every attached key when those bounds change.

mod store;

use std::collections::HashMap;
use std::fmt;

use indexmap::IndexMap;
use serde::Serialize;

use crate::connection::ConnectionId;
use crate::error::{MvcError, Result};
use crate::geometry::{Bounds, Point};
use crate::parts::PartId;

pub use store::AnchorStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct AnchorId(pub(crate) u64);

impl fmt::Display for AnchorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "anchor#{}", self.0)
    }
}

/// Consumer of an anchor position: the anchored part, the connection it
/// reads the position for (if any) and a semantic id such as `"start"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct AnchorKey {
    pub anchored: PartId,
    pub connection: Option<ConnectionId>,
    pub id: String,
}

impl AnchorKey {
    pub fn new(anchored: PartId, id: impl Into<String>) -> Self {
        Self {
            anchored,
            connection: None,
            id: id.into(),
        }
    }

    /// Key of one connection of `anchored`. Connections of the same part
    /// never share keys.
    pub fn for_connection(
        anchored: PartId,
        connection: ConnectionId,
        id: impl Into<String>,
    ) -> Self {
        Self {
            anchored,
            connection: Some(connection),
            id: id.into(),
        }
    }
}

impl fmt::Display for AnchorKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.connection {
            Some(connection) => write!(f, "{}/{}:{}", self.anchored, connection, self.id),
            None => write!(f, "{}:{}", self.anchored, self.id),
        }
    }
}

/// How a dynamic anchor turns bounds and a reference point into a position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PositionStrategy {
    /// Where the line from the center to the reference point leaves the
    /// bounds. The center when no reference point is known.
    #[default]
    ChopBox,
    Center,
}

impl PositionStrategy {
    fn compute(&self, bounds: &Bounds, reference: Option<&Point>) -> Point {
        match (self, reference) {
            (PositionStrategy::ChopBox, Some(reference)) => bounds.chop(reference),
            _ => bounds.center(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum AnchorKind {
    Static {
        location: Point,
    },
    Dynamic {
        anchorage: PartId,
        strategy: PositionStrategy,
        geometry: Bounds,
    },
}

#[derive(Debug, Clone)]
pub struct Anchor {
    kind: AnchorKind,
    positions: IndexMap<AnchorKey, Point>,
    /// Kept across detach so a key re-attached during an edit lands where
    /// it was.
    references: HashMap<AnchorKey, Point>,
}

impl Anchor {
    pub fn new_static(location: Point) -> Self {
        Self::with_kind(AnchorKind::Static { location })
    }

    pub fn new_dynamic(anchorage: PartId, geometry: Bounds, strategy: PositionStrategy) -> Self {
        Self::with_kind(AnchorKind::Dynamic {
            anchorage,
            strategy,
            geometry,
        })
    }

    fn with_kind(kind: AnchorKind) -> Self {
        Self {
            kind,
            positions: IndexMap::new(),
            references: HashMap::new(),
        }
    }

    pub fn kind(&self) -> &AnchorKind {
        &self.kind
    }

    pub fn is_dynamic(&self) -> bool {
        matches!(self.kind, AnchorKind::Dynamic { .. })
    }

    /// The part whose geometry drives this anchor.
    pub fn anchorage(&self) -> Option<PartId> {
        match self.kind {
            AnchorKind::Dynamic { anchorage, .. } => Some(anchorage),
            AnchorKind::Static { .. } => None,
        }
    }

    pub fn geometry(&self) -> Option<Bounds> {
        match self.kind {
            AnchorKind::Dynamic { geometry, .. } => Some(geometry),
            AnchorKind::Static { .. } => None,
        }
    }

    pub fn keys(&self) -> impl Iterator<Item = &AnchorKey> {
        self.positions.keys()
    }

    pub fn is_attached(&self, key: &AnchorKey) -> bool {
        self.positions.contains_key(key)
    }

    /// Start providing a position for `key`. Attaching twice is harmless.
    pub fn attach(&mut self, key: AnchorKey) {
        if self.positions.contains_key(&key) {
            return;
        }
        let position = self.compute(&key);
        self.positions.insert(key, position);
    }

    pub fn detach(&mut self, key: &AnchorKey) -> Result<()> {
        self.positions
            .shift_remove(key)
            .map(|_| ())
            .ok_or_else(|| MvcError::precondition(format!("{key} is not attached")))
    }

    pub fn position(&self, key: &AnchorKey) -> Result<Point> {
        self.positions
            .get(key)
            .copied()
            .ok_or_else(|| MvcError::precondition(format!("{key} is not attached")))
    }

    /// Override the position of one attached key of a static anchor.
    pub fn set_position(&mut self, key: &AnchorKey, position: Point) -> Result<()> {
        if self.is_dynamic() {
            return Err(MvcError::precondition(
                "positions of a dynamic anchor are computed",
            ));
        }
        let slot = self
            .positions
            .get_mut(key)
            .ok_or_else(|| MvcError::precondition(format!("{key} is not attached")))?;
        *slot = position;
        Ok(())
    }

    /// Move a static anchor; every attached key follows.
    pub fn set_location(&mut self, location: Point) -> Result<()> {
        match &mut self.kind {
            AnchorKind::Static { location: current } => *current = location,
            AnchorKind::Dynamic { .. } => {
                return Err(MvcError::precondition(
                    "a dynamic anchor follows its anchorage",
                ));
            }
        }
        for position in self.positions.values_mut() {
            *position = location;
        }
        Ok(())
    }

    pub fn set_geometry(&mut self, bounds: Bounds) -> Result<()> {
        match &mut self.kind {
            AnchorKind::Dynamic { geometry, .. } => *geometry = bounds,
            AnchorKind::Static { .. } => {
                return Err(MvcError::precondition("a static anchor has no geometry"));
            }
        }
        self.recompute_all();
        Ok(())
    }

    /// Reference point used by dynamic strategies for `key`. Recomputes the
    /// key when it is attached.
    pub fn set_reference_point(&mut self, key: AnchorKey, reference: Point) {
        self.references.insert(key.clone(), reference);
        if self.is_dynamic() && self.positions.contains_key(&key) {
            let position = self.compute(&key);
            self.positions.insert(key, position);
        }
    }

    pub fn reference_point(&self, key: &AnchorKey) -> Option<Point> {
        self.references.get(key).copied()
    }

    fn recompute_all(&mut self) {
        let keys: Vec<AnchorKey> = self.positions.keys().cloned().collect();
        for key in keys {
            let position = self.compute(&key);
            self.positions.insert(key, position);
        }
    }

    fn compute(&self, key: &AnchorKey) -> Point {
        match &self.kind {
            AnchorKind::Static { location } => *location,
            AnchorKind::Dynamic {
                strategy, geometry, ..
            } => strategy.compute(geometry, self.references.get(key)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parts::PartArena;

    fn part_ids() -> (PartId, PartId) {
        let mut arena = PartArena::new();
        (arena.insert(()), arena.insert(()))
    }

    #[test]
    fn position_requires_attached_key() {
        let (owner, _) = part_ids();
        let mut anchor = Anchor::new_static(Point::new(3.0, 4.0));
        let key = AnchorKey::new(owner, "start");

        assert!(matches!(
            anchor.position(&key),
            Err(MvcError::PreconditionViolation(_))
        ));
        anchor.attach(key.clone());
        assert_eq!(anchor.position(&key).unwrap(), Point::new(3.0, 4.0));

        anchor.detach(&key).unwrap();
        assert!(anchor.position(&key).is_err());
        assert!(anchor.detach(&key).is_err());
    }

    #[test]
    fn static_anchor_moves_all_keys_together() {
        let (owner, _) = part_ids();
        let mut anchor = Anchor::new_static(Point::new(0.0, 0.0));
        let start = AnchorKey::new(owner, "start");
        let end = AnchorKey::new(owner, "end");
        anchor.attach(start.clone());
        anchor.attach(end.clone());

        anchor.set_position(&start, Point::new(1.0, 1.0)).unwrap();
        assert_eq!(anchor.position(&start).unwrap(), Point::new(1.0, 1.0));
        assert_eq!(anchor.position(&end).unwrap(), Point::new(0.0, 0.0));

        anchor.set_location(Point::new(5.0, 5.0)).unwrap();
        assert_eq!(anchor.position(&start).unwrap(), Point::new(5.0, 5.0));
        assert!(anchor.set_geometry(Bounds::default()).is_err());
    }

    #[test]
    fn dynamic_anchor_chops_towards_reference() {
        let (owner, anchorage) = part_ids();
        let bounds = Bounds::new(0.0, 0.0, 10.0, 10.0);
        let mut anchor = Anchor::new_dynamic(anchorage, bounds, PositionStrategy::ChopBox);
        let key = AnchorKey::new(owner, "start");
        anchor.attach(key.clone());
        assert_eq!(anchor.position(&key).unwrap(), Point::new(5.0, 5.0));

        anchor.set_reference_point(key.clone(), Point::new(25.0, 5.0));
        assert_eq!(anchor.position(&key).unwrap(), Point::new(10.0, 5.0));

        anchor
            .set_geometry(Bounds::new(10.0, 0.0, 10.0, 10.0))
            .unwrap();
        assert_eq!(anchor.position(&key).unwrap(), Point::new(20.0, 5.0));
        assert_eq!(anchor.anchorage(), Some(anchorage));
    }

    #[test]
    fn reference_survives_detach() {
        let (owner, anchorage) = part_ids();
        let bounds = Bounds::new(0.0, 0.0, 10.0, 10.0);
        let mut anchor = Anchor::new_dynamic(anchorage, bounds, PositionStrategy::ChopBox);
        let key = AnchorKey::new(owner, "end");
        anchor.set_reference_point(key.clone(), Point::new(5.0, -15.0));

        anchor.attach(key.clone());
        anchor.detach(&key).unwrap();
        anchor.attach(key.clone());

        assert_eq!(anchor.position(&key).unwrap(), Point::new(5.0, 0.0));
        assert!(anchor.set_location(Point::default()).is_err());
    }

    #[test]
    fn center_strategy_ignores_reference() {
        let (owner, anchorage) = part_ids();
        let mut anchor = Anchor::new_dynamic(
            anchorage,
            Bounds::new(0.0, 0.0, 4.0, 8.0),
            PositionStrategy::Center,
        );
        let key = AnchorKey::new(owner, "start");
        anchor.attach(key.clone());
        anchor.set_reference_point(key.clone(), Point::new(100.0, 100.0));
        assert_eq!(anchor.position(&key).unwrap(), Point::new(2.0, 4.0));
    }
}
