use crate::anchors::AnchorId;
use crate::connection::{ConnectionId, ConnectionLayer, END_KEY, START_KEY};
use crate::error::{MvcError, Result};
use crate::parts::Content;
use crate::toolkit::Toolkit;
use crate::viewer::Viewer;

use super::Operation;

/// Replaces the explicit anchors of one connection.
///
/// The operation snapshots the connection's explicit anchors when it is
/// created and holds a reference on every anchor it lists, so anchors the
/// bend removes from the connection stay alive for undo.
#[derive(Debug)]
pub struct BendConnectionOperation {
    connection: ConnectionId,
    initial_anchors: Vec<AnchorId>,
    new_anchors: Vec<AnchorId>,
    disposed: bool,
}

impl BendConnectionOperation {
    pub fn new(layer: &mut ConnectionLayer, connection: ConnectionId) -> Result<Self> {
        let initial_anchors = layer.explicit_anchors(connection)?;
        for id in initial_anchors.iter().chain(initial_anchors.iter()) {
            layer.anchors_mut().retain(*id)?;
        }
        Ok(Self {
            connection,
            new_anchors: initial_anchors.clone(),
            initial_anchors,
            disposed: false,
        })
    }

    pub fn connection(&self) -> ConnectionId {
        self.connection
    }

    pub fn initial_anchors(&self) -> &[AnchorId] {
        &self.initial_anchors
    }

    pub fn new_anchors(&self) -> &[AnchorId] {
        &self.new_anchors
    }

    /// Anchors the connection gets on execute. Implicit anchors are dropped.
    pub fn set_new_anchors(&mut self, layer: &mut ConnectionLayer, anchors: &[AnchorId]) -> Result<()> {
        let anchors = layer.only_explicit(self.connection, anchors)?;
        for id in &anchors {
            layer.anchors_mut().retain(*id)?;
        }
        let previous = std::mem::replace(&mut self.new_anchors, anchors);
        release_all(layer, &previous);
        Ok(())
    }

    /// Position in the connection's full anchor list of the explicit anchor
    /// at `explicit_index`.
    pub fn connection_index(&self, layer: &ConnectionLayer, explicit_index: usize) -> Result<usize> {
        let connection = layer.connection(self.connection)?;
        connection
            .anchors()
            .iter()
            .enumerate()
            .filter(|(_, anchor)| !connection.is_implicit(**anchor))
            .nth(explicit_index)
            .map(|(index, _)| index)
            .ok_or_else(|| {
                MvcError::invalid(format!(
                    "{} has no explicit anchor at index {explicit_index}",
                    self.connection
                ))
            })
    }

    pub fn is_unchanged(&self) -> bool {
        self.initial_anchors == self.new_anchors
    }

    pub fn execute_on(&mut self, layer: &mut ConnectionLayer) -> Result<()> {
        let target = self.new_anchors.clone();
        self.apply(layer, target)
    }

    pub fn undo_on(&mut self, layer: &mut ConnectionLayer) -> Result<()> {
        let target = self.initial_anchors.clone();
        self.apply(layer, target)
    }

    /// Drop the operation's references. Safe to call more than once.
    pub fn release(&mut self, layer: &mut ConnectionLayer) {
        if self.disposed {
            return;
        }
        self.disposed = true;
        release_all(layer, &self.initial_anchors);
        release_all(layer, &self.new_anchors);
    }

    fn apply(&self, layer: &mut ConnectionLayer, target: Vec<AnchorId>) -> Result<()> {
        if self.disposed {
            return Err(MvcError::precondition(format!(
                "bend of {} was already disposed",
                self.connection
            )));
        }
        if layer.explicit_anchors(self.connection)? != target {
            layer.set_anchors(self.connection, target)?;
        }
        self.hint_anchor_positions(layer)?;
        layer.route(self.connection)
    }

    /// Point dynamic endpoints at their nearest explicit neighbour so the
    /// router chops them towards it.
    fn hint_anchor_positions(&self, layer: &mut ConnectionLayer) -> Result<()> {
        let id = self.connection;
        let anchors = layer.connection(id)?.anchors().to_vec();
        let explicit = layer.only_explicit(id, &anchors)?;
        let (Some(start), Some(end)) = (anchors.first().copied(), anchors.last().copied()) else {
            return Ok(());
        };

        if layer.anchors().get(start)?.is_dynamic() && explicit.first() == Some(&start) {
            if let Some(index) = (1..anchors.len()).find(|i| explicit_at(&explicit, anchors[*i])) {
                let hint = layer.point(id, index)?;
                layer.set_position_hint(id, START_KEY, hint)?;
            }
        }

        if layer.anchors().get(end)?.is_dynamic() && explicit.last() == Some(&end) {
            if let Some(index) = (0..anchors.len() - 1)
                .rev()
                .find(|i| explicit_at(&explicit, anchors[*i]))
            {
                let hint = layer.point(id, index)?;
                layer.set_position_hint(id, END_KEY, hint)?;
            }
        }
        Ok(())
    }
}

fn explicit_at(explicit: &[AnchorId], anchor: AnchorId) -> bool {
    explicit.contains(&anchor)
}

fn release_all(layer: &mut ConnectionLayer, anchors: &[AnchorId]) {
    for id in anchors {
        if layer.anchors().contains(*id) {
            let _ = layer.anchors_mut().release(*id);
        }
    }
}

impl Operation<ConnectionLayer> for BendConnectionOperation {
    fn label(&self) -> &str {
        "Bend"
    }

    fn execute(&mut self, layer: &mut ConnectionLayer) -> Result<()> {
        self.execute_on(layer)
    }

    fn undo(&mut self, layer: &mut ConnectionLayer) -> Result<()> {
        self.undo_on(layer)
    }

    fn is_no_op(&self) -> bool {
        self.is_unchanged()
    }

    fn dispose(&mut self, layer: &mut ConnectionLayer) {
        self.release(layer);
    }
}

impl<C: Content, T: Toolkit> Operation<Viewer<C, T>> for BendConnectionOperation {
    fn label(&self) -> &str {
        "Bend"
    }

    fn execute(&mut self, viewer: &mut Viewer<C, T>) -> Result<()> {
        self.execute_on(viewer.connections_mut())?;
        refresh_owner(viewer, self.connection)
    }

    fn undo(&mut self, viewer: &mut Viewer<C, T>) -> Result<()> {
        self.undo_on(viewer.connections_mut())?;
        refresh_owner(viewer, self.connection)
    }

    fn is_no_op(&self) -> bool {
        self.is_unchanged()
    }

    fn dispose(&mut self, viewer: &mut Viewer<C, T>) {
        self.release(viewer.connections_mut());
    }
}

fn refresh_owner<C: Content, T: Toolkit>(viewer: &mut Viewer<C, T>, id: ConnectionId) -> Result<()> {
    let owner = viewer.connections().connection(id)?.owner();
    if viewer.contains(owner) {
        viewer.refresh_visual(owner)?;
    }
    Ok(())
}
