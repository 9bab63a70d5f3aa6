use std::sync::Arc;

use async_trait::async_trait;

use super::{CommandInterceptor, CommandOutput, Invocation, Next};
use crate::core::Result;
use crate::engine::EngineCore;

/// Binds a transaction to the command's session; flushes and commits on
/// success, rolls back on any error.
pub struct TransactionContextInterceptor {
    core: Arc<EngineCore>,
}

impl TransactionContextInterceptor {
    pub fn new(core: Arc<EngineCore>) -> Self {
        Self { core }
    }

    async fn rollback(&self, invocation: &mut Invocation<'_>) -> Result<()> {
        let transaction = invocation.context_mut()?.session.take_transaction();
        if let Some(transaction) = transaction {
            self.core.transactions().rollback(transaction).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl CommandInterceptor for TransactionContextInterceptor {
    fn name(&self) -> &'static str {
        "TransactionContextInterceptor"
    }

    async fn execute(&self, invocation: &mut Invocation<'_>, next: Next<'_>) -> Result<CommandOutput> {
        let transaction = self.core.transactions().begin().await;
        invocation.context_mut()?.session.begin(transaction)?;

        let output = match next.run(invocation).await {
            Ok(output) => output,
            Err(err) => {
                self.rollback(invocation).await?;
                return Err(err);
            }
        };

        if let Err(err) = invocation.context_mut()?.session.flush().await {
            self.rollback(invocation).await?;
            return Err(err);
        }

        let transaction = invocation.context_mut()?.session.take_transaction();
        if let Some(transaction) = transaction {
            let elapsed = self.core.transactions().commit(transaction).await?;
            if let Some(listener) = &invocation.statement_listener {
                listener.on_database_time(elapsed);
            }
        }
        Ok(output)
    }
}
