//! Common imports for applications driving the engine.
//!
//! `services` covers deploying models and running instances. `advanced`
//! exposes the session and interceptor plumbing for custom commands.

pub mod services {
    pub use crate::cmd::process::Variables;
    pub use crate::core::{Clock, EngineError, ManualClock, Result, VariableValue};
    pub use crate::engine::{EngineConfig, HistoryLevel, ProcessEngine};
    pub use crate::entity::{
        ExecutionEntity, HistoricActivityInstanceEntity, HistoricProcessInstanceEntity,
        HistoricTaskInstanceEntity, HistoricVariableInstanceEntity, IdentityLinkEntity,
        IdentityLinkType, JobEntity, TaskEntity,
    };
    pub use crate::jobexecutor::{AsyncExecutor, wait_for_job_executor_to_process_all_jobs};
    pub use crate::model::{ProcessModel, ProcessModelBuilder};
    pub use crate::profiler::{ProfileReport, ProfileSession, Profiler};
    pub use crate::query::Query;
    pub use crate::service::{
        HistoryService, ManagementService, RepositoryService, RuntimeService, TaskService,
    };
}

pub mod advanced {
    pub use crate::interceptor::{
        Command, CommandContext, CommandExecutor, CommandInterceptor, DynCommand,
    };
    pub use crate::session::{DbSession, SessionSettings, StatementListener};
    pub use crate::storage::{EntityQuery, InMemoryStorage};
}

pub use services::*;
