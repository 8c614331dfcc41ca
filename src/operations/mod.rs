//! Reversible edits and the history that hosts them.

mod bend;
mod history;

use crate::error::Result;

pub use bend::BendConnectionOperation;
pub use history::{DEFAULT_MAX_HISTORY, OperationHistory, OperationStatus};

/// A reversible edit applied to a context `Ctx`.
pub trait Operation<Ctx> {
    fn label(&self) -> &str;

    fn execute(&mut self, ctx: &mut Ctx) -> Result<()>;

    fn undo(&mut self, ctx: &mut Ctx) -> Result<()>;

    fn redo(&mut self, ctx: &mut Ctx) -> Result<()> {
        self.execute(ctx)
    }

    /// Executing would change nothing; hosts skip such operations instead of
    /// recording an empty undo entry.
    fn is_no_op(&self) -> bool {
        false
    }

    fn is_content_relevant(&self) -> bool {
        true
    }

    /// Called once the host will never run the operation again.
    fn dispose(&mut self, _ctx: &mut Ctx) {}
}
