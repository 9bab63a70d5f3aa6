//! Engine commands. Every service call is one of these, executed through
//! the interceptor chain.

pub mod deploy;
pub mod job;
pub mod process;
pub mod query;
pub mod task;

pub use deploy::DeployCmd;
pub use job::{
    AcquireJobsCmd, AcquireTimerJobsCmd, ExecuteJobCmd, JobRetryCmd,
    MoveDeadLetterJobToExecutableJobCmd, MoveTimerToExecutableJobCmd,
};
pub use process::{
    ActivateProcessInstanceCmd, DeleteProcessInstanceCmd, GetExecutionVariablesCmd,
    MessageEventReceivedCmd, SetExecutionVariablesCmd, StartProcessInstanceCmd,
    SuspendProcessInstanceCmd, TriggerCmd,
};
pub use query::{GetTableCountCmd, ListQueryCmd};
pub use task::{
    AddIdentityLinkCmd, ClaimTaskCmd, CompleteTaskCmd, DeleteIdentityLinkCmd,
    GetIdentityLinksForTaskCmd, GetTaskVariablesCmd, RemoveTaskVariablesCmd,
    SetTaskVariablesCmd,
};

/// Fully qualified name of an engine command.
macro_rules! engine_command {
    ($name:literal) => {
        concat!("org.flowable.engine.impl.cmd.", $name)
    };
}

macro_rules! job_command {
    ($name:literal) => {
        concat!("org.flowable.job.service.impl.cmd.", $name)
    };
}

pub(crate) use engine_command;
pub(crate) use job_command;

/// Rejects blank identifiers before any storage access.
pub(crate) fn require_id(what: &str, id: &str) -> crate::core::Result<()> {
    if id.trim().is_empty() {
        return Err(crate::core::EngineError::IllegalArgument(format!(
            "{} is required",
            what
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_names_are_qualified() {
        assert_eq!(
            engine_command!("CompleteTaskCmd"),
            "org.flowable.engine.impl.cmd.CompleteTaskCmd"
        );
        assert!(job_command!("ExecuteJobCmd").starts_with("org.flowable.job"));
        assert!(engine_command!("DeployCmd").starts_with(crate::profiler::DEFAULT_COMMAND_PACKAGE));
        assert!(require_id("taskId", "  ").is_err());
    }
}
