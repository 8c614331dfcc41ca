use serde_json::json;

use crate::error::Result;
use crate::logging::{LogLevel, Logger, TARGET_HISTORY, event_with_fields, json_kv};

use super::Operation;

pub const DEFAULT_MAX_HISTORY: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationStatus {
    Executed,
    /// The operation reported itself as a no-op and was dropped.
    Skipped,
}

/// Undo/redo stacks of executed operations.
pub struct OperationHistory<Ctx> {
    undo_stack: Vec<Box<dyn Operation<Ctx>>>,
    redo_stack: Vec<Box<dyn Operation<Ctx>>>,
    max_history: usize,
    logger: Option<Logger>,
}

impl<Ctx> Default for OperationHistory<Ctx> {
    fn default() -> Self {
        Self {
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            max_history: DEFAULT_MAX_HISTORY,
            logger: None,
        }
    }
}

impl<Ctx> OperationHistory<Ctx> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_history(mut self, max_history: usize) -> Self {
        self.max_history = max_history.max(1);
        self
    }

    pub fn with_logger(mut self, logger: Logger) -> Self {
        self.logger = Some(logger);
        self
    }

    /// Run `operation` and record it for undo. No-ops are disposed without
    /// running; a failed operation is disposed and its error returned.
    pub fn execute<O>(&mut self, operation: O, ctx: &mut Ctx) -> Result<OperationStatus>
    where
        O: Operation<Ctx> + 'static,
    {
        let mut operation: Box<dyn Operation<Ctx>> = Box::new(operation);
        if operation.is_no_op() {
            self.log(LogLevel::Debug, "operation_skipped", operation.label());
            operation.dispose(ctx);
            return Ok(OperationStatus::Skipped);
        }

        if let Err(err) = operation.execute(ctx) {
            self.log(LogLevel::Warn, "operation_failed", operation.label());
            operation.dispose(ctx);
            return Err(err);
        }
        self.log(LogLevel::Debug, "operation_executed", operation.label());

        for mut stale in self.redo_stack.drain(..) {
            stale.dispose(ctx);
        }
        self.undo_stack.push(operation);
        while self.undo_stack.len() > self.max_history {
            let mut oldest = self.undo_stack.remove(0);
            oldest.dispose(ctx);
        }
        Ok(OperationStatus::Executed)
    }

    /// Undo the most recent operation. Returns `false` when there is nothing
    /// to undo. A failing undo leaves the operation on the undo stack.
    pub fn undo(&mut self, ctx: &mut Ctx) -> Result<bool> {
        let Some(mut operation) = self.undo_stack.pop() else {
            return Ok(false);
        };
        match operation.undo(ctx) {
            Ok(()) => {
                self.log(LogLevel::Debug, "operation_undone", operation.label());
                self.redo_stack.push(operation);
                Ok(true)
            }
            Err(err) => {
                self.undo_stack.push(operation);
                Err(err)
            }
        }
    }

    pub fn redo(&mut self, ctx: &mut Ctx) -> Result<bool> {
        let Some(mut operation) = self.redo_stack.pop() else {
            return Ok(false);
        };
        match operation.redo(ctx) {
            Ok(()) => {
                self.log(LogLevel::Debug, "operation_redone", operation.label());
                self.undo_stack.push(operation);
                Ok(true)
            }
            Err(err) => {
                self.redo_stack.push(operation);
                Err(err)
            }
        }
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn undo_label(&self) -> Option<&str> {
        self.undo_stack.last().map(|operation| operation.label())
    }

    pub fn redo_label(&self) -> Option<&str> {
        self.redo_stack.last().map(|operation| operation.label())
    }

    pub fn undo_len(&self) -> usize {
        self.undo_stack.len()
    }

    /// Dispose every recorded operation.
    pub fn clear(&mut self, ctx: &mut Ctx) {
        for mut operation in self.undo_stack.drain(..).chain(self.redo_stack.drain(..)) {
            operation.dispose(ctx);
        }
    }

    fn log(&self, level: LogLevel, message: &str, label: &str) {
        if let Some(logger) = self.logger.as_ref() {
            if logger.enabled(level) {
                let event = event_with_fields(
                    level,
                    TARGET_HISTORY,
                    message,
                    [json_kv("operation", json!(label))],
                );
                let _ = logger.log_event(event);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MvcError;
    use crate::logging::MemorySink;

    #[derive(Default)]
    struct Counter {
        value: i32,
        disposed: Vec<i32>,
    }

    struct Add(i32);

    impl Operation<Counter> for Add {
        fn label(&self) -> &str {
            "add"
        }

        fn execute(&mut self, ctx: &mut Counter) -> Result<()> {
            if self.0 < 0 {
                return Err(MvcError::invalid("negative step"));
            }
            ctx.value += self.0;
            Ok(())
        }

        fn undo(&mut self, ctx: &mut Counter) -> Result<()> {
            ctx.value -= self.0;
            Ok(())
        }

        fn is_no_op(&self) -> bool {
            self.0 == 0
        }

        fn dispose(&mut self, ctx: &mut Counter) {
            ctx.disposed.push(self.0);
        }
    }

    #[test]
    fn undo_redo_walks_the_stacks() {
        let mut counter = Counter::default();
        let mut history = OperationHistory::new();
        history.execute(Add(2), &mut counter).unwrap();
        history.execute(Add(3), &mut counter).unwrap();
        assert_eq!(counter.value, 5);

        assert!(history.undo(&mut counter).unwrap());
        assert_eq!(counter.value, 2);
        assert!(history.can_redo());
        assert_eq!(history.redo_label(), Some("add"));

        assert!(history.redo(&mut counter).unwrap());
        assert_eq!(counter.value, 5);
        assert!(!history.redo(&mut counter).unwrap());
    }

    #[test]
    fn no_op_is_skipped_and_disposed() {
        let sink = MemorySink::new();
        let mut counter = Counter::default();
        let mut history = OperationHistory::new().with_logger(Logger::new(sink.clone()));

        let status = history.execute(Add(0), &mut counter).unwrap();

        assert_eq!(status, OperationStatus::Skipped);
        assert!(!history.can_undo());
        assert_eq!(counter.disposed, vec![0]);
        assert_eq!(sink.messages(TARGET_HISTORY), vec!["operation_skipped"]);
    }

    #[test]
    fn new_operation_discards_redo_entries() {
        let mut counter = Counter::default();
        let mut history = OperationHistory::new();
        history.execute(Add(1), &mut counter).unwrap();
        history.undo(&mut counter).unwrap();

        history.execute(Add(4), &mut counter).unwrap();

        assert!(!history.can_redo());
        assert_eq!(counter.disposed, vec![1]);
        assert_eq!(counter.value, 4);
    }

    #[test]
    fn oldest_entries_fall_off() {
        let mut counter = Counter::default();
        let mut history = OperationHistory::new().with_max_history(2);
        for step in 1..=3 {
            history.execute(Add(step), &mut counter).unwrap();
        }

        assert_eq!(history.undo_len(), 2);
        assert_eq!(counter.disposed, vec![1]);
        history.clear(&mut counter);
        assert_eq!(counter.disposed, vec![1, 2, 3]);
    }

    #[test]
    fn failed_execute_is_not_recorded() {
        let mut counter = Counter::default();
        let mut history = OperationHistory::new();
        assert!(history.execute(Add(-1), &mut counter).is_err());
        assert!(!history.can_undo());
        assert_eq!(counter.disposed, vec![-1]);
    }
}
