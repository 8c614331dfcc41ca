use indexmap::IndexMap;

use crate::anchors::{AnchorId, AnchorKey, AnchorStore};
use crate::error::{MvcError, Result};
use crate::geometry::{Bounds, Point};
use crate::parts::PartId;

use super::{Connection, ConnectionId, RouteRequest, Router, rebind};

/// Owns the anchor store and every connection of a viewer.
#[derive(Default)]
pub struct ConnectionLayer {
    anchors: AnchorStore,
    connections: IndexMap<ConnectionId, Connection>,
    next_id: u64,
}

impl ConnectionLayer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn anchors(&self) -> &AnchorStore {
        &self.anchors
    }

    pub fn anchors_mut(&mut self) -> &mut AnchorStore {
        &mut self.anchors
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    /// Create a connection over at least two anchors and route it.
    pub fn add_connection<R>(
        &mut self,
        owner: PartId,
        anchors: Vec<AnchorId>,
        router: R,
    ) -> Result<ConnectionId>
    where
        R: Router + 'static,
    {
        ensure_endpoints(&anchors)?;
        let id = ConnectionId(self.next_id);
        rebind(&mut self.anchors, owner, id, &[], &anchors)?;

        self.next_id += 1;
        self.connections.insert(
            id,
            Connection {
                id,
                owner,
                anchors,
                points: Vec::new(),
                router: Box::new(router),
            },
        );
        self.route(id)?;
        Ok(id)
    }

    pub fn connection(&self, id: ConnectionId) -> Result<&Connection> {
        self.connections
            .get(&id)
            .ok_or(MvcError::UnknownConnection(id))
    }

    pub fn connection_mut(&mut self, id: ConnectionId) -> Result<&mut Connection> {
        self.connections
            .get_mut(&id)
            .ok_or(MvcError::UnknownConnection(id))
    }

    pub fn connection_ids(&self) -> Vec<ConnectionId> {
        self.connections.keys().copied().collect()
    }

    pub fn connections_of(&self, owner: PartId) -> Vec<ConnectionId> {
        self.connections
            .iter()
            .filter(|(_, connection)| connection.owner == owner)
            .map(|(id, _)| *id)
            .collect()
    }

    /// Detach and release every anchor of the connection, then drop it.
    pub fn remove_connection(&mut self, id: ConnectionId) -> Result<Connection> {
        let mut connection = self
            .connections
            .shift_remove(&id)
            .ok_or(MvcError::UnknownConnection(id))?;
        rebind(&mut self.anchors, connection.owner, id, &connection.anchors, &[])?;
        connection.anchors.clear();
        connection.points.clear();
        Ok(connection)
    }

    pub fn remove_connections_of(&mut self, owner: PartId) -> Result<usize> {
        let owned = self.connections_of(owner);
        for id in &owned {
            self.remove_connection(*id)?;
        }
        Ok(owned.len())
    }

    /// Replace the full anchor list without routing.
    pub fn set_anchors(&mut self, id: ConnectionId, anchors: Vec<AnchorId>) -> Result<()> {
        ensure_endpoints(&anchors)?;
        let connection = self
            .connections
            .get_mut(&id)
            .ok_or(MvcError::UnknownConnection(id))?;
        rebind(&mut self.anchors, connection.owner, id, &connection.anchors, &anchors)?;
        connection.anchors = anchors;
        Ok(())
    }

    /// Anchors of the connection the router did not insert itself.
    pub fn explicit_anchors(&self, id: ConnectionId) -> Result<Vec<AnchorId>> {
        self.only_explicit(id, self.connection(id)?.anchors())
    }

    /// Filter `anchors` down to those the connection's router treats as
    /// explicit.
    pub fn only_explicit(&self, id: ConnectionId, anchors: &[AnchorId]) -> Result<Vec<AnchorId>> {
        let connection = self.connection(id)?;
        Ok(anchors
            .iter()
            .copied()
            .filter(|anchor| !connection.is_implicit(*anchor))
            .collect())
    }

    pub fn is_implicit(&self, id: ConnectionId, anchor: AnchorId) -> Result<bool> {
        Ok(self.connection(id)?.is_implicit(anchor))
    }

    pub fn route(&mut self, id: ConnectionId) -> Result<()> {
        let connection = self
            .connections
            .get_mut(&id)
            .ok_or(MvcError::UnknownConnection(id))?;
        let Connection {
            id: connection_id,
            owner,
            anchors,
            points,
            router,
        } = connection;
        let mut request = RouteRequest {
            connection: *connection_id,
            owner: *owner,
            anchors,
            points,
            store: &mut self.anchors,
        };
        router.route(&mut request)
    }

    /// Live position of the anchor at `index`.
    pub fn point(&self, id: ConnectionId, index: usize) -> Result<Point> {
        let connection = self.connection(id)?;
        let anchor = connection.anchor(index).ok_or_else(|| {
            MvcError::invalid(format!("{id} has no anchor at index {index}"))
        })?;
        self.anchors.position(anchor, &connection.key_for(index))
    }

    pub fn set_position_hint(&mut self, id: ConnectionId, key_id: &str, hint: Point) -> Result<()> {
        let connection = self.connection_mut(id)?;
        let key = AnchorKey::for_connection(connection.owner, id, key_id);
        connection.router.position_hints_mut().insert(key, hint);
        Ok(())
    }

    pub fn position_hint(&self, id: ConnectionId, key_id: &str) -> Result<Option<Point>> {
        let connection = self.connection(id)?;
        let key = AnchorKey::for_connection(connection.owner, id, key_id);
        Ok(connection.router.position_hints().get(&key).copied())
    }

    /// Recompute the dynamic anchors bound to `part` and re-route every
    /// connection using one of them. Returns the re-routed connections.
    pub fn anchorage_geometry_changed(
        &mut self,
        part: PartId,
        bounds: Bounds,
    ) -> Result<Vec<ConnectionId>> {
        let updated = self.anchors.geometry_changed(part, bounds)?;
        if updated.is_empty() {
            return Ok(Vec::new());
        }

        let affected: Vec<ConnectionId> = self
            .connections
            .iter()
            .filter(|(_, connection)| connection.anchors.iter().any(|a| updated.contains(a)))
            .map(|(id, _)| *id)
            .collect();
        for id in &affected {
            self.route(*id)?;
        }
        Ok(affected)
    }
}

fn ensure_endpoints(anchors: &[AnchorId]) -> Result<()> {
    if anchors.len() < 2 {
        return Err(MvcError::invalid(format!(
            "a connection needs a start and an end anchor, got {}",
            anchors.len()
        )));
    }
    Ok(())
}
