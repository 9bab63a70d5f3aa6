use std::any::Any;

use async_trait::async_trait;

use super::CommandContext;
use crate::core::Result;

/// One unit of work, executed inside a command context.
#[async_trait]
pub trait Command: Send + Sync {
    type Output: Send + 'static;

    /// Fully qualified command name, used as the profiling key.
    fn name(&self) -> &'static str;

    async fn execute(&self, ctx: &mut CommandContext) -> Result<Self::Output>;
}

pub type CommandOutput = Box<dyn Any + Send>;

/// Object-safe view of a [`Command`] used by interceptors.
#[async_trait]
pub trait DynCommand: Send + Sync {
    fn command_name(&self) -> &'static str;

    async fn execute_erased(&self, ctx: &mut CommandContext) -> Result<CommandOutput>;
}

#[async_trait]
impl<C: Command> DynCommand for C {
    fn command_name(&self) -> &'static str {
        self.name()
    }

    async fn execute_erased(&self, ctx: &mut CommandContext) -> Result<CommandOutput> {
        let output = self.execute(ctx).await?;
        Ok(Box::new(output))
    }
}
