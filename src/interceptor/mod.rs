//! Command interceptor chain: ordered middleware around every command.

pub mod command;
pub mod context;
pub mod context_interceptor;
pub mod invoker;
pub mod log_interceptor;
pub mod transaction_interceptor;

use std::sync::Arc;

use async_trait::async_trait;

pub use command::{Command, CommandOutput, DynCommand};
pub use context::CommandContext;
pub use context_interceptor::CommandContextInterceptor;
pub use invoker::CommandInvoker;
pub use log_interceptor::LogInterceptor;
pub use transaction_interceptor::TransactionContextInterceptor;

use crate::core::{EngineError, Result};
use crate::engine::EngineCore;
use crate::session::StatementListener;

/// A command travelling down the chain.
pub struct Invocation<'a> {
    command: &'a dyn DynCommand,
    /// Set by the context interceptor for the rest of the chain.
    pub context: Option<CommandContext>,
    /// Receives every statement of the command's session.
    pub statement_listener: Option<Arc<dyn StatementListener>>,
}

impl<'a> Invocation<'a> {
    pub fn new(command: &'a dyn DynCommand) -> Self {
        Self {
            command,
            context: None,
            statement_listener: None,
        }
    }

    pub fn command(&self) -> &'a dyn DynCommand {
        self.command
    }

    pub fn command_name(&self) -> &'static str {
        self.command.command_name()
    }

    pub fn context_mut(&mut self) -> Result<&mut CommandContext> {
        self.context.as_mut().ok_or_else(|| {
            EngineError::IllegalState(format!(
                "no command context for {}; is CommandContextInterceptor in the chain?",
                self.command.command_name()
            ))
        })
    }
}

#[async_trait]
pub trait CommandInterceptor: Send + Sync {
    fn name(&self) -> &'static str;

    /// Does this interceptor's work and calls `next.run(invocation)` to
    /// continue down the chain.
    async fn execute(&self, invocation: &mut Invocation<'_>, next: Next<'_>) -> Result<CommandOutput>;
}

/// The remainder of the chain after the current interceptor.
#[derive(Clone, Copy)]
pub struct Next<'a> {
    rest: &'a [Arc<dyn CommandInterceptor>],
}

impl<'a> Next<'a> {
    pub async fn run(self, invocation: &mut Invocation<'_>) -> Result<CommandOutput> {
        match self.rest.split_first() {
            Some((head, rest)) => head.execute(invocation, Next { rest }).await,
            None => Err(EngineError::IllegalState(format!(
                "command {} fell off the end of the interceptor chain",
                invocation.command_name()
            ))),
        }
    }
}

/// An immutable interceptor chain.
#[derive(Clone)]
pub struct CommandExecutor {
    interceptors: Arc<Vec<Arc<dyn CommandInterceptor>>>,
}

impl CommandExecutor {
    pub fn builder() -> CommandExecutorBuilder {
        CommandExecutorBuilder::new()
    }

    /// `LogInterceptor` → `CommandContextInterceptor` →
    /// `TransactionContextInterceptor` → `CommandInvoker`.
    pub fn with_defaults(core: Arc<EngineCore>) -> Self {
        CommandExecutor {
            interceptors: Arc::new(vec![
                Arc::new(LogInterceptor),
                Arc::new(CommandContextInterceptor::new(core.clone())),
                Arc::new(TransactionContextInterceptor::new(core)),
                Arc::new(CommandInvoker),
            ]),
        }
    }

    pub fn first(&self) -> Option<&Arc<dyn CommandInterceptor>> {
        self.interceptors.first()
    }

    /// A new executor with `interceptor` in front of this chain.
    pub fn with_first(&self, interceptor: Arc<dyn CommandInterceptor>) -> Self {
        let mut interceptors = Vec::with_capacity(self.interceptors.len() + 1);
        interceptors.push(interceptor);
        interceptors.extend(self.interceptors.iter().cloned());
        CommandExecutor {
            interceptors: Arc::new(interceptors),
        }
    }

    pub fn interceptor_names(&self) -> Vec<&'static str> {
        self.interceptors.iter().map(|i| i.name()).collect()
    }

    pub async fn execute<C: Command>(&self, command: &C) -> Result<C::Output> {
        let mut invocation = Invocation::new(command);
        let output = Next {
            rest: &self.interceptors,
        }
        .run(&mut invocation)
        .await?;
        output.downcast::<C::Output>().map(|boxed| *boxed).map_err(|_| {
            EngineError::IllegalState(format!(
                "command {} produced an output of an unexpected type",
                command.name()
            ))
        })
    }
}

#[derive(Default)]
pub struct CommandExecutorBuilder {
    interceptors: Vec<Arc<dyn CommandInterceptor>>,
}

impl CommandExecutorBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn interceptor(mut self, interceptor: Arc<dyn CommandInterceptor>) -> Self {
        self.interceptors.push(interceptor);
        self
    }

    /// Fails unless the chain ends with the command invoker.
    pub fn build(self) -> Result<CommandExecutor> {
        match self.interceptors.last() {
            Some(last) if last.name() == CommandInvoker::NAME => Ok(CommandExecutor {
                interceptors: Arc::new(self.interceptors),
            }),
            _ => Err(EngineError::IllegalArgument(
                "an interceptor chain must end with the CommandInvoker".into(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::EngineConfig;
    use std::sync::Mutex;

    struct Recording {
        name: &'static str,
        trail: Arc<Mutex<Vec<String>>>,
    }

    #[async_trait]
    impl CommandInterceptor for Recording {
        fn name(&self) -> &'static str {
            self.name
        }

        async fn execute(&self, invocation: &mut Invocation<'_>, next: Next<'_>) -> Result<CommandOutput> {
            self.trail.lock().unwrap().push(format!("enter {}", self.name));
            let result = next.run(invocation).await;
            self.trail.lock().unwrap().push(format!("leave {}", self.name));
            result
        }
    }

    struct Answer;

    #[async_trait]
    impl Command for Answer {
        type Output = u32;

        fn name(&self) -> &'static str {
            "Answer"
        }

        async fn execute(&self, ctx: &mut CommandContext) -> Result<u32> {
            assert!(ctx.session.has_transaction());
            Ok(42)
        }
    }

    struct Failing;

    #[async_trait]
    impl Command for Failing {
        type Output = ();

        fn name(&self) -> &'static str {
            "Failing"
        }

        async fn execute(&self, _ctx: &mut CommandContext) -> Result<()> {
            Err(EngineError::IllegalArgument("nope".into()))
        }
    }

    fn core() -> Arc<EngineCore> {
        Arc::new(EngineCore::new(EngineConfig::default()))
    }

    #[tokio::test]
    async fn test_default_chain_order() {
        let executor = CommandExecutor::with_defaults(core());
        assert_eq!(
            executor.interceptor_names(),
            vec![
                "LogInterceptor",
                "CommandContextInterceptor",
                "TransactionContextInterceptor",
                "CommandInvoker"
            ]
        );
        assert_eq!(executor.execute(&Answer).await.unwrap(), 42);
    }

    #[tokio::test]
    async fn test_with_first_wraps_the_whole_chain() {
        let trail = Arc::new(Mutex::new(Vec::new()));
        let original = CommandExecutor::with_defaults(core());
        let wrapped = original.with_first(Arc::new(Recording {
            name: "Recording",
            trail: trail.clone(),
        }));

        assert_eq!(wrapped.first().unwrap().name(), "Recording");
        assert_eq!(original.first().unwrap().name(), "LogInterceptor");

        wrapped.execute(&Answer).await.unwrap();
        assert_eq!(
            *trail.lock().unwrap(),
            vec!["enter Recording".to_string(), "leave Recording".to_string()]
        );
    }

    #[tokio::test]
    async fn test_errors_propagate_unchanged() {
        let executor = CommandExecutor::with_defaults(core());
        let err = executor.execute(&Failing).await.unwrap_err();
        assert!(matches!(err, EngineError::IllegalArgument(ref msg) if msg == "nope"));
    }

    #[test]
    fn test_builder_requires_invoker_last() {
        assert!(CommandExecutor::builder().interceptor(Arc::new(LogInterceptor)).build().is_err());
        let executor = CommandExecutor::builder()
            .interceptor(Arc::new(LogInterceptor))
            .interceptor(Arc::new(CommandContextInterceptor::new(core())))
            .interceptor(Arc::new(CommandInvoker))
            .build()
            .unwrap();
        assert_eq!(executor.interceptor_names().len(), 3);
    }
}
