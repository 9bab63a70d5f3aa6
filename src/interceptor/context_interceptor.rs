use std::sync::Arc;

use async_trait::async_trait;
use tracing::{Instrument, Level, event, info_span};

use super::{CommandContext, CommandInterceptor, CommandOutput, Invocation, Next};
use crate::core::Result;
use crate::engine::EngineCore;
use crate::session::DbSession;

/// Opens the command context and its session for the rest of the chain.
pub struct CommandContextInterceptor {
    core: Arc<EngineCore>,
}

impl CommandContextInterceptor {
    pub fn new(core: Arc<EngineCore>) -> Self {
        Self { core }
    }
}

#[async_trait]
impl CommandInterceptor for CommandContextInterceptor {
    fn name(&self) -> &'static str {
        "CommandContextInterceptor"
    }

    async fn execute(&self, invocation: &mut Invocation<'_>, next: Next<'_>) -> Result<CommandOutput> {
        let name = invocation.command_name();
        let session = DbSession::new(
            self.core.storage().clone(),
            self.core.session_settings().clone(),
            invocation.statement_listener.clone(),
        );
        invocation.context = Some(CommandContext::new(self.core.clone(), session));

        let span = info_span!("command", name = name, engine = %self.core.config().engine_name);
        let result = next.run(invocation).instrument(span).await;
        invocation.context = None;

        if let Err(err) = &result {
            event!(Level::ERROR, command = name, error = %err, "command failed");
        }
        result
    }
}
