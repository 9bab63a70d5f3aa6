use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;

use super::{CommandExecutionRecorder, Profiler, qualified_command_name};
use crate::core::Result;
use crate::interceptor::{CommandInterceptor, CommandOutput, Invocation, Next};
use crate::session::StatementListener;

/// Times each command and records its statements into the profiler's
/// current session. Must run in front of the context interceptor.
pub struct TotalExecutionTimeInterceptor {
    profiler: Arc<Profiler>,
}

impl TotalExecutionTimeInterceptor {
    pub fn new(profiler: Arc<Profiler>) -> Self {
        Self { profiler }
    }
}

#[async_trait]
impl CommandInterceptor for TotalExecutionTimeInterceptor {
    fn name(&self) -> &'static str {
        "TotalExecutionTimeInterceptor"
    }

    async fn execute(&self, invocation: &mut Invocation<'_>, next: Next<'_>) -> Result<CommandOutput> {
        let Some(session) = self.profiler.current_profile_session() else {
            return next.run(invocation).await;
        };

        let recorder = Arc::new(CommandExecutionRecorder::new(qualified_command_name(
            invocation.command_name(),
        )));
        let previous = invocation
            .statement_listener
            .replace(recorder.clone() as Arc<dyn StatementListener>);

        let started = Instant::now();
        let result = next.run(invocation).await;
        invocation.statement_listener = previous;

        session.add_command_execution(recorder.finish(started.elapsed(), result.is_err()));
        result
    }
}
