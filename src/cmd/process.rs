use std::collections::BTreeMap;

use async_trait::async_trait;

use super::{engine_command, require_id};
use crate::core::{EngineError, Result, VariableValue};
use crate::engine::{
    Agenda, end_process_instance, latest_definition, load_execution, message_received,
    set_execution_variables, set_suspension_state, start_process_instance, trigger,
    variables_of_execution,
};
use crate::entity::ExecutionEntity;
use crate::interceptor::{Command, CommandContext};

pub type Variables = BTreeMap<String, VariableValue>;

pub struct StartProcessInstanceCmd {
    process_definition_key: String,
    business_key: Option<String>,
    variables: Variables,
}

impl StartProcessInstanceCmd {
    pub fn new(process_definition_key: &str) -> Self {
        Self {
            process_definition_key: process_definition_key.to_string(),
            business_key: None,
            variables: Variables::new(),
        }
    }

    pub fn business_key(mut self, business_key: &str) -> Self {
        self.business_key = Some(business_key.to_string());
        self
    }

    pub fn variables(mut self, variables: Variables) -> Self {
        self.variables = variables;
        self
    }
}

#[async_trait]
impl Command for StartProcessInstanceCmd {
    type Output = ExecutionEntity;

    fn name(&self) -> &'static str {
        engine_command!("StartProcessInstanceCmd")
    }

    /// Returns the instance as it stands when the command ends; `is_ended`
    /// is set when it ran to completion.
    async fn execute(&self, ctx: &mut CommandContext) -> Result<ExecutionEntity> {
        require_id("processDefinitionKey", &self.process_definition_key)?;
        let definition = latest_definition(ctx, &self.process_definition_key).await?;
        let mut agenda = Agenda::new();
        let instance = start_process_instance(
            ctx,
            &mut agenda,
            &definition,
            self.business_key.clone(),
            &self.variables,
            None,
        )
        .await?;
        agenda.run(ctx).await?;

        Ok(match ctx.session.get::<ExecutionEntity>(&instance.id) {
            Some(current) => current.clone(),
            None => ExecutionEntity {
                is_ended: true,
                is_active: false,
                ..instance
            },
        })
    }
}

/// Signals an execution waiting in a receive task or message catch event.
pub struct TriggerCmd {
    execution_id: String,
    variables: Variables,
}

impl TriggerCmd {
    pub fn new(execution_id: &str, variables: Variables) -> Self {
        Self {
            execution_id: execution_id.to_string(),
            variables,
        }
    }
}

#[async_trait]
impl Command for TriggerCmd {
    type Output = ();

    fn name(&self) -> &'static str {
        engine_command!("TriggerCmd")
    }

    async fn execute(&self, ctx: &mut CommandContext) -> Result<()> {
        require_id("executionId", &self.execution_id)?;
        let execution = load_execution(ctx, &self.execution_id).await?;
        set_execution_variables(ctx, &execution.process_instance_id, &self.variables).await?;
        let mut agenda = Agenda::new();
        trigger(ctx, &mut agenda, &self.execution_id).await?;
        agenda.run(ctx).await
    }
}

pub struct MessageEventReceivedCmd {
    message_name: String,
    execution_id: String,
}

impl MessageEventReceivedCmd {
    pub fn new(message_name: &str, execution_id: &str) -> Self {
        Self {
            message_name: message_name.to_string(),
            execution_id: execution_id.to_string(),
        }
    }
}

#[async_trait]
impl Command for MessageEventReceivedCmd {
    type Output = ();

    fn name(&self) -> &'static str {
        engine_command!("MessageEventReceivedCmd")
    }

    async fn execute(&self, ctx: &mut CommandContext) -> Result<()> {
        require_id("messageName", &self.message_name)?;
        require_id("executionId", &self.execution_id)?;
        let mut agenda = Agenda::new();
        message_received(ctx, &mut agenda, &self.message_name, &self.execution_id).await?;
        agenda.run(ctx).await
    }
}

pub struct SuspendProcessInstanceCmd {
    process_instance_id: String,
}

impl SuspendProcessInstanceCmd {
    pub fn new(process_instance_id: &str) -> Self {
        Self {
            process_instance_id: process_instance_id.to_string(),
        }
    }
}

#[async_trait]
impl Command for SuspendProcessInstanceCmd {
    type Output = ();

    fn name(&self) -> &'static str {
        engine_command!("SuspendProcessInstanceCmd")
    }

    async fn execute(&self, ctx: &mut CommandContext) -> Result<()> {
        require_id("processInstanceId", &self.process_instance_id)?;
        set_suspension_state(ctx, &self.process_instance_id, true).await
    }
}

pub struct ActivateProcessInstanceCmd {
    process_instance_id: String,
}

impl ActivateProcessInstanceCmd {
    pub fn new(process_instance_id: &str) -> Self {
        Self {
            process_instance_id: process_instance_id.to_string(),
        }
    }
}

#[async_trait]
impl Command for ActivateProcessInstanceCmd {
    type Output = ();

    fn name(&self) -> &'static str {
        engine_command!("ActivateProcessInstanceCmd")
    }

    async fn execute(&self, ctx: &mut CommandContext) -> Result<()> {
        require_id("processInstanceId", &self.process_instance_id)?;
        set_suspension_state(ctx, &self.process_instance_id, false).await
    }
}

pub struct DeleteProcessInstanceCmd {
    process_instance_id: String,
    delete_reason: String,
}

impl DeleteProcessInstanceCmd {
    pub fn new(process_instance_id: &str, delete_reason: Option<&str>) -> Self {
        Self {
            process_instance_id: process_instance_id.to_string(),
            delete_reason: delete_reason.unwrap_or("deleted").to_string(),
        }
    }
}

#[async_trait]
impl Command for DeleteProcessInstanceCmd {
    type Output = ();

    fn name(&self) -> &'static str {
        engine_command!("DeleteProcessInstanceCmd")
    }

    async fn execute(&self, ctx: &mut CommandContext) -> Result<()> {
        require_id("processInstanceId", &self.process_instance_id)?;
        let instance = load_execution(ctx, &self.process_instance_id).await?;
        if !instance.is_process_instance() {
            return Err(EngineError::IllegalArgument(format!(
                "execution '{}' is not a process instance",
                self.process_instance_id
            )));
        }
        let mut agenda = Agenda::new();
        end_process_instance(
            ctx,
            &mut agenda,
            &self.process_instance_id,
            None,
            Some(self.delete_reason.clone()),
        )
        .await?;
        agenda.run(ctx).await
    }
}

pub struct SetExecutionVariablesCmd {
    execution_id: String,
    variables: Variables,
}

impl SetExecutionVariablesCmd {
    pub fn new(execution_id: &str, variables: Variables) -> Self {
        Self {
            execution_id: execution_id.to_string(),
            variables,
        }
    }
}

#[async_trait]
impl Command for SetExecutionVariablesCmd {
    type Output = ();

    fn name(&self) -> &'static str {
        engine_command!("SetExecutionVariablesCmd")
    }

    async fn execute(&self, ctx: &mut CommandContext) -> Result<()> {
        require_id("executionId", &self.execution_id)?;
        set_execution_variables(ctx, &self.execution_id, &self.variables).await
    }
}

/// Variables visible from an execution: its own, over those of its process
/// instance.
pub struct GetExecutionVariablesCmd {
    execution_id: String,
}

impl GetExecutionVariablesCmd {
    pub fn new(execution_id: &str) -> Self {
        Self {
            execution_id: execution_id.to_string(),
        }
    }
}

#[async_trait]
impl Command for GetExecutionVariablesCmd {
    type Output = Variables;

    fn name(&self) -> &'static str {
        engine_command!("GetExecutionVariablesCmd")
    }

    async fn execute(&self, ctx: &mut CommandContext) -> Result<Variables> {
        require_id("executionId", &self.execution_id)?;
        let execution = load_execution(ctx, &self.execution_id).await?;
        let mut variables = Variables::new();
        if !execution.is_process_instance() {
            for variable in variables_of_execution(ctx, &execution.process_instance_id).await? {
                variables.insert(variable.name, variable.value);
            }
        }
        for variable in variables_of_execution(ctx, &execution.id).await? {
            variables.insert(variable.name, variable.value);
        }
        Ok(variables)
    }
}
