//! The operation queue that drives executions through a process model.
//!
//! Behaviours never call each other directly: they plan follow-up
//! operations, and the owning command drains the agenda before its session
//! is flushed.

use std::collections::VecDeque;

use super::behavior;
use crate::core::Result;
use crate::interceptor::CommandContext;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    /// Enter the execution's current activity.
    Continue { execution_id: String, skip_async: bool },
    /// Leave the execution's current activity through its outgoing flows,
    /// or only through `only_flow` when set.
    TakeOutgoing {
        execution_id: String,
        only_flow: Option<String>,
    },
}

#[derive(Debug, Default)]
pub struct Agenda {
    operations: VecDeque<Operation>,
    executed: usize,
}

impl Agenda {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn plan(&mut self, operation: Operation) {
        self.operations.push_back(operation);
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    /// Operations run so far.
    pub fn executed(&self) -> usize {
        self.executed
    }

    /// Runs planned operations in FIFO order until none are left.
    pub async fn run(&mut self, ctx: &mut CommandContext) -> Result<()> {
        while let Some(operation) = self.operations.pop_front() {
            log::trace!("Agenda operation: {:?}", operation);
            self.executed += 1;
            match operation {
                Operation::Continue {
                    execution_id,
                    skip_async,
                } => behavior::continue_execution(ctx, self, &execution_id, skip_async).await?,
                Operation::TakeOutgoing {
                    execution_id,
                    only_flow,
                } => behavior::take_outgoing(ctx, self, &execution_id, only_flow).await?,
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operations_are_fifo() {
        let mut agenda = Agenda::new();
        agenda.plan(Operation::Continue {
            execution_id: "a".into(),
            skip_async: false,
        });
        agenda.plan(Operation::TakeOutgoing {
            execution_id: "b".into(),
            only_flow: None,
        });
        assert_eq!(agenda.len(), 2);
        assert!(matches!(
            agenda.operations.pop_front(),
            Some(Operation::Continue { execution_id, .. }) if execution_id == "a"
        ));
    }
}
