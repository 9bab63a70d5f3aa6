use async_trait::async_trait;

use super::{CommandInterceptor, CommandOutput, Invocation, Next};
use crate::core::Result;

/// Last link of the chain: runs the command itself.
pub struct CommandInvoker;

impl CommandInvoker {
    pub const NAME: &'static str = "CommandInvoker";
}

#[async_trait]
impl CommandInterceptor for CommandInvoker {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    async fn execute(&self, invocation: &mut Invocation<'_>, _next: Next<'_>) -> Result<CommandOutput> {
        let command = invocation.command();
        let ctx = invocation.context_mut()?;
        command.execute_erased(ctx).await
    }
}
