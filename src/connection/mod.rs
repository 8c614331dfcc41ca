//! Connections and routing.
//!
//! A [`Connection`] is an ordered anchor list owned by a part. The anchors
//! are attached under keys derived from the connection and the anchor's
//! index (`start`, `waypoint-n`, `end`), so the connection's points are the
//! anchors' live positions. A
//! [`Router`] turns the list into points and may synthesize implicit
//! anchors of its own.

mod layer;
mod router;

use std::fmt;

use serde::Serialize;

use crate::anchors::{AnchorId, AnchorKey, AnchorStore};
use crate::error::{MvcError, Result};
use crate::geometry::Point;
use crate::parts::PartId;

pub use layer::ConnectionLayer;
pub use router::{OrthogonalRouter, PositionHints, RouteRequest, Router, StraightRouter};

pub const START_KEY: &str = "start";
pub const END_KEY: &str = "end";
pub const WAYPOINT_KEY_PREFIX: &str = "waypoint-";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ConnectionId(pub(crate) u64);

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "connection#{}", self.0)
    }
}

/// Key under which connection `connection` of `owner` reads the anchor at
/// `index` of its `count` anchors.
pub fn anchor_key(
    owner: PartId,
    connection: ConnectionId,
    index: usize,
    count: usize,
) -> AnchorKey {
    AnchorKey::for_connection(owner, connection, anchor_key_id(index, count))
}

/// Key id of the anchor at `index` in a list of `count` anchors.
pub fn anchor_key_id(index: usize, count: usize) -> String {
    if index == 0 {
        START_KEY.to_string()
    } else if index + 1 == count {
        END_KEY.to_string()
    } else {
        format!("{WAYPOINT_KEY_PREFIX}{}", index - 1)
    }
}

pub struct Connection {
    pub(crate) id: ConnectionId,
    pub(crate) owner: PartId,
    pub(crate) anchors: Vec<AnchorId>,
    pub(crate) points: Vec<Point>,
    pub(crate) router: Box<dyn Router>,
}

impl Connection {
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Part whose keys the anchors are attached under.
    pub fn owner(&self) -> PartId {
        self.owner
    }

    pub fn anchors(&self) -> &[AnchorId] {
        &self.anchors
    }

    pub fn anchor(&self, index: usize) -> Option<AnchorId> {
        self.anchors.get(index).copied()
    }

    pub fn start_anchor(&self) -> Option<AnchorId> {
        self.anchors.first().copied()
    }

    pub fn end_anchor(&self) -> Option<AnchorId> {
        self.anchors.last().copied()
    }

    /// Points computed by the last routing pass.
    pub fn points(&self) -> &[Point] {
        &self.points
    }

    pub fn router(&self) -> &dyn Router {
        self.router.as_ref()
    }

    pub fn router_mut(&mut self) -> &mut dyn Router {
        self.router.as_mut()
    }

    pub fn key_for(&self, index: usize) -> AnchorKey {
        anchor_key(self.owner, self.id, index, self.anchors.len())
    }

    pub fn start_key(&self) -> AnchorKey {
        AnchorKey::for_connection(self.owner, self.id, START_KEY)
    }

    pub fn end_key(&self) -> AnchorKey {
        AnchorKey::for_connection(self.owner, self.id, END_KEY)
    }

    pub fn is_implicit(&self, anchor: AnchorId) -> bool {
        self.router.is_implicit_anchor(anchor)
    }
}

/// Move the keys of `connection` from the `old` anchor list to the `new`
/// one. New anchors are retained before old ones are released so anchors
/// present in both lists survive.
pub(crate) fn rebind(
    store: &mut AnchorStore,
    owner: PartId,
    connection: ConnectionId,
    old: &[AnchorId],
    new: &[AnchorId],
) -> Result<()> {
    if let Some(missing) = new.iter().find(|id| !store.contains(**id)) {
        return Err(MvcError::UnknownAnchor(*missing));
    }
    for id in new {
        store.retain(*id)?;
    }

    for (index, id) in old.iter().enumerate() {
        let key = anchor_key(owner, connection, index, old.len());
        if let Ok(anchor) = store.get_mut(*id) {
            if anchor.is_attached(&key) {
                anchor.detach(&key)?;
            }
        }
    }
    for (index, id) in new.iter().enumerate() {
        let key = anchor_key(owner, connection, index, new.len());
        store.get_mut(*id)?.attach(key);
    }

    for id in old {
        if store.contains(*id) {
            store.release(*id)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_follow_position_in_list() {
        assert_eq!(anchor_key_id(0, 4), "start");
        assert_eq!(anchor_key_id(1, 4), "waypoint-0");
        assert_eq!(anchor_key_id(2, 4), "waypoint-1");
        assert_eq!(anchor_key_id(3, 4), "end");
        assert_eq!(anchor_key_id(1, 2), "end");
    }
}
