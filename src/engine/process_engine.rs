use std::sync::{Arc, RwLock};

use super::{EngineConfig, EngineCore};
use crate::core::Result;
use crate::interceptor::{Command, CommandExecutor};
use crate::profiler::{Profiler, TotalExecutionTimeInterceptor};
use crate::service::{
    HistoryService, ManagementService, RepositoryService, RuntimeService, TaskService,
};

const PROFILING_INTERCEPTOR: &str = "TotalExecutionTimeInterceptor";

struct EngineInner {
    core: Arc<EngineCore>,
    executor: RwLock<CommandExecutor>,
    profiler: Arc<Profiler>,
}

/// Entry point: owns the engine state and the command executor every
/// service runs its commands through. Cheap to clone.
#[derive(Clone)]
pub struct ProcessEngine {
    inner: Arc<EngineInner>,
}

impl ProcessEngine {
    pub fn new(config: EngineConfig) -> Result<Self> {
        config.validate()?;
        let name = config.engine_name.clone();
        let core = Arc::new(EngineCore::new(config));
        let executor = CommandExecutor::with_defaults(core.clone());
        log::info!("Process engine '{}' created", name);
        Ok(Self {
            inner: Arc::new(EngineInner {
                core,
                executor: RwLock::new(executor),
                profiler: Arc::new(Profiler::new()),
            }),
        })
    }

    pub fn name(&self) -> &str {
        &self.inner.core.config().engine_name
    }

    pub fn core(&self) -> &Arc<EngineCore> {
        &self.inner.core
    }

    pub fn config(&self) -> &EngineConfig {
        self.inner.core.config()
    }

    pub fn command_executor(&self) -> Result<CommandExecutor> {
        Ok(self.inner.executor.read()?.clone())
    }

    /// Replaces the chain used by subsequent commands.
    pub fn set_command_executor(&self, executor: CommandExecutor) -> Result<()> {
        *self.inner.executor.write()? = executor;
        Ok(())
    }

    pub async fn execute<C: Command>(&self, command: &C) -> Result<C::Output> {
        let executor = self.command_executor()?;
        executor.execute(command).await
    }

    pub fn profiler(&self) -> &Arc<Profiler> {
        &self.inner.profiler
    }

    /// Puts the profiling interceptor in front of the chain. Calling it
    /// again is a no-op.
    pub fn enable_profiling(&self) -> Result<Arc<Profiler>> {
        let mut executor = self.inner.executor.write()?;
        let installed = executor
            .first()
            .is_some_and(|first| first.name() == PROFILING_INTERCEPTOR);
        if !installed {
            *executor = executor.with_first(Arc::new(TotalExecutionTimeInterceptor::new(
                self.inner.profiler.clone(),
            )));
        }
        Ok(self.inner.profiler.clone())
    }

    pub fn repository_service(&self) -> RepositoryService {
        RepositoryService::new(self.clone())
    }

    pub fn runtime_service(&self) -> RuntimeService {
        RuntimeService::new(self.clone())
    }

    pub fn task_service(&self) -> TaskService {
        TaskService::new(self.clone())
    }

    pub fn management_service(&self) -> ManagementService {
        ManagementService::new(self.clone())
    }

    pub fn history_service(&self) -> HistoryService {
        HistoryService::new(self.clone())
    }
}
