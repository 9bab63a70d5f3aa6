use std::sync::Arc;

use chrono::{DateTime, Utc};

use super::Command;
use crate::core::Result;
use crate::engine::{EngineConfig, EngineCore};
use crate::entity::CountingPolicy;
use crate::session::DbSession;

/// State shared by everything running inside one command.
pub struct CommandContext {
    core: Arc<EngineCore>,
    pub session: DbSession,
}

impl CommandContext {
    pub fn new(core: Arc<EngineCore>, session: DbSession) -> Self {
        Self { core, session }
    }

    pub fn core(&self) -> &Arc<EngineCore> {
        &self.core
    }

    pub fn config(&self) -> &EngineConfig {
        self.core.config()
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.core.config().clock.now()
    }

    pub fn counting(&self) -> CountingPolicy {
        self.core.counting_policy()
    }

    /// Runs another command inside this context and transaction.
    pub async fn execute_nested<C: Command>(&mut self, command: &C) -> Result<C::Output> {
        command.execute(self).await
    }
}
