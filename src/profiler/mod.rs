//! Command profiler: per-command statement counts and timings grouped into
//! named profile sessions.

pub mod interceptor;
pub mod report;
pub mod session;
pub mod stats;

use std::sync::{Arc, Mutex, PoisonError};

pub use interceptor::TotalExecutionTimeInterceptor;
pub use report::ProfileReport;
pub use session::ProfileSession;
pub use stats::{
    CommandExecutionRecorder, CommandExecutionResult, CommandStats, DEFAULT_COMMAND_PACKAGE,
    qualified_command_name,
};

#[derive(Debug, Default)]
pub struct Profiler {
    current: Mutex<Option<Arc<ProfileSession>>>,
    sessions: Mutex<Vec<Arc<ProfileSession>>>,
}

impl Profiler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a new session, stopping the current one if any.
    pub fn start_profile_session(&self, name: &str) -> Arc<ProfileSession> {
        let session = Arc::new(ProfileSession::new(name));
        let previous = self
            .current
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(session.clone());
        if let Some(previous) = previous {
            previous.stop();
        }
        self.sessions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(session.clone());
        session
    }

    pub fn current_profile_session(&self) -> Option<Arc<ProfileSession>> {
        self.current.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn stop_current_profile_session(&self) -> Option<Arc<ProfileSession>> {
        let stopped = self.current.lock().unwrap_or_else(PoisonError::into_inner).take();
        if let Some(session) = &stopped {
            session.stop();
        }
        stopped
    }

    /// Every session started since the last reset, oldest first.
    pub fn profile_sessions(&self) -> Vec<Arc<ProfileSession>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn reset(&self) {
        self.stop_current_profile_session();
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner).clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{EngineError, Result};
    use crate::engine::{EngineConfig, EngineCore};
    use crate::entity::VariableInstanceEntity;
    use crate::interceptor::{Command, CommandContext, CommandExecutor};
    use crate::storage::{EntityQuery, TaskCriteria};
    use async_trait::async_trait;

    struct ListTasks;

    #[async_trait]
    impl Command for ListTasks {
        type Output = usize;

        fn name(&self) -> &'static str {
            "org.flowable.task.service.impl.TaskQueryImpl"
        }

        async fn execute(&self, ctx: &mut CommandContext) -> Result<usize> {
            let query = EntityQuery::TasksByQueryCriteria(TaskCriteria::default());
            Ok(ctx.session.find_list(&query).await.len())
        }
    }

    struct Broken;

    #[async_trait]
    impl Command for Broken {
        type Output = ();

        fn name(&self) -> &'static str {
            "BrokenCmd"
        }

        async fn execute(&self, _ctx: &mut CommandContext) -> Result<()> {
            Err(EngineError::IllegalState("broken".into()))
        }
    }

    /// Inserts a variable that points at a task which does not exist.
    struct DanglingVariable;

    #[async_trait]
    impl Command for DanglingVariable {
        type Output = ();

        fn name(&self) -> &'static str {
            "DanglingVariableCmd"
        }

        async fn execute(&self, ctx: &mut CommandContext) -> Result<()> {
            ctx.session.insert_data(VariableInstanceEntity {
                id: String::new(),
                revision: 0,
                name: "orphan".into(),
                value: 1.into(),
                execution_id: None,
                process_instance_id: None,
                task_id: Some("missing-task".into()),
            })?;
            Ok(())
        }
    }

    fn profiled_executor(profiler: &Arc<Profiler>) -> CommandExecutor {
        let core = Arc::new(EngineCore::new(EngineConfig::default()));
        CommandExecutor::with_defaults(core)
            .with_first(Arc::new(TotalExecutionTimeInterceptor::new(profiler.clone())))
    }

    #[tokio::test]
    async fn test_records_commands_into_current_session() {
        let profiler = Arc::new(Profiler::new());
        let executor = profiled_executor(&profiler);

        executor.execute(&ListTasks).await.unwrap();
        assert!(profiler.profile_sessions().is_empty());

        profiler.start_profile_session("tasks");
        executor.execute(&ListTasks).await.unwrap();
        executor.execute(&ListTasks).await.unwrap();
        assert!(executor.execute(&Broken).await.is_err());
        profiler.stop_current_profile_session();
        executor.execute(&ListTasks).await.unwrap();

        let sessions = profiler.profile_sessions();
        assert_eq!(sessions.len(), 1);
        assert!(sessions[0].is_stopped());

        let summary = sessions[0].calculate_summary_statistics();
        assert_eq!(summary.len(), 2);
        let tasks = &summary["org.flowable.task.service.impl.TaskQueryImpl"];
        assert_eq!(tasks.execution_count, 2);
        assert_eq!(tasks.select_count("selectTaskByQueryCriteria"), 2);
        assert!(tasks.db_inserts.is_empty());

        let broken = &summary["org.flowable.engine.impl.cmd.BrokenCmd"];
        assert_eq!(broken.failed_count, 1);

        let report = ProfileReport::new(&sessions[0]).to_string();
        assert!(report.contains("Profile session 'tasks'"));
        assert!(report.contains("selectTaskByQueryCriteria : 2 calls"));
    }

    #[tokio::test]
    async fn test_failed_flush_keeps_issued_statements() {
        let profiler = Arc::new(Profiler::new());
        let executor = profiled_executor(&profiler);

        let session = profiler.start_profile_session("dangling");
        let err = executor.execute(&DanglingVariable).await.unwrap_err();
        profiler.stop_current_profile_session();
        assert!(matches!(err, EngineError::ConstraintViolation(_)));

        let summary = session.calculate_summary_statistics();
        let stats = &summary["org.flowable.engine.impl.cmd.DanglingVariableCmd"];
        assert_eq!(stats.failed_count, 1);
        assert_eq!(
            stats.insert_count(
                "org.flowable.variable.service.impl.persistence.entity.VariableInstanceEntityImpl"
            ),
            1
        );
    }

    #[test]
    fn test_reset_clears_sessions() {
        let profiler = Profiler::new();
        let first = profiler.start_profile_session("one");
        profiler.start_profile_session("two");
        assert!(first.is_stopped());
        assert_eq!(profiler.profile_sessions().len(), 2);

        profiler.reset();
        assert!(profiler.profile_sessions().is_empty());
        assert!(profiler.current_profile_session().is_none());
    }
}
