use crate::cmd::process::Variables;
use crate::cmd::{
    ActivateProcessInstanceCmd, DeleteProcessInstanceCmd, GetExecutionVariablesCmd,
    MessageEventReceivedCmd, SetExecutionVariablesCmd, StartProcessInstanceCmd,
    SuspendProcessInstanceCmd, TriggerCmd,
};
use crate::core::Result;
use crate::engine::ProcessEngine;
use crate::entity::ExecutionEntity;
use crate::query::ProcessInstanceQuery;

#[derive(Clone)]
pub struct RuntimeService {
    engine: ProcessEngine,
}

impl RuntimeService {
    pub fn new(engine: ProcessEngine) -> Self {
        Self { engine }
    }

    pub async fn start_process_instance_by_key(&self, key: &str) -> Result<ExecutionEntity> {
        self.engine.execute(&StartProcessInstanceCmd::new(key)).await
    }

    pub async fn start_process_instance_by_key_with_variables(
        &self,
        key: &str,
        variables: Variables,
    ) -> Result<ExecutionEntity> {
        let command = StartProcessInstanceCmd::new(key).variables(variables);
        self.engine.execute(&command).await
    }

    pub async fn start_process_instance_with_business_key(
        &self,
        key: &str,
        business_key: &str,
        variables: Variables,
    ) -> Result<ExecutionEntity> {
        let command = StartProcessInstanceCmd::new(key)
            .business_key(business_key)
            .variables(variables);
        self.engine.execute(&command).await
    }

    /// Signals an execution waiting in a receive task.
    pub async fn trigger(&self, execution_id: &str) -> Result<()> {
        self.trigger_with_variables(execution_id, Variables::new()).await
    }

    pub async fn trigger_with_variables(&self, execution_id: &str, variables: Variables) -> Result<()> {
        self.engine.execute(&TriggerCmd::new(execution_id, variables)).await
    }

    pub async fn message_event_received(&self, message_name: &str, execution_id: &str) -> Result<()> {
        self.engine
            .execute(&MessageEventReceivedCmd::new(message_name, execution_id))
            .await
    }

    pub async fn suspend_process_instance_by_id(&self, process_instance_id: &str) -> Result<()> {
        self.engine
            .execute(&SuspendProcessInstanceCmd::new(process_instance_id))
            .await
    }

    pub async fn activate_process_instance_by_id(&self, process_instance_id: &str) -> Result<()> {
        self.engine
            .execute(&ActivateProcessInstanceCmd::new(process_instance_id))
            .await
    }

    pub async fn delete_process_instance(
        &self,
        process_instance_id: &str,
        delete_reason: Option<&str>,
    ) -> Result<()> {
        self.engine
            .execute(&DeleteProcessInstanceCmd::new(process_instance_id, delete_reason))
            .await
    }

    pub async fn set_variables(&self, execution_id: &str, variables: Variables) -> Result<()> {
        self.engine
            .execute(&SetExecutionVariablesCmd::new(execution_id, variables))
            .await
    }

    pub async fn get_variables(&self, execution_id: &str) -> Result<Variables> {
        self.engine.execute(&GetExecutionVariablesCmd::new(execution_id)).await
    }

    pub fn create_process_instance_query(&self) -> ProcessInstanceQuery {
        ProcessInstanceQuery::new(self.engine.clone())
    }
}
