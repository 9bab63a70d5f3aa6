use async_trait::async_trait;
use log::debug;

use super::{CommandInterceptor, CommandOutput, Invocation, Next};
use crate::core::Result;

/// Logs the start and end of every command at debug level.
pub struct LogInterceptor;

#[async_trait]
impl CommandInterceptor for LogInterceptor {
    fn name(&self) -> &'static str {
        "LogInterceptor"
    }

    async fn execute(&self, invocation: &mut Invocation<'_>, next: Next<'_>) -> Result<CommandOutput> {
        let name = invocation.command_name();
        debug!("--- starting {} --------------------------------------------------------", name);
        let result = next.run(invocation).await;
        debug!("--- {} finished --------------------------------------------------------", name);
        result
    }
}
