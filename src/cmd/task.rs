use async_trait::async_trait;

use super::process::Variables;
use super::{engine_command, require_id};
use crate::core::{EngineError, Result};
use crate::engine::{
    Agenda, Operation, add_identity_link, claim_task, delete_identity_link, delete_task,
    find_task_identity_links, find_task_variables, load_task, remove_task_variables,
    set_execution_variables, set_task_variables,
};
use crate::entity::{IdentityLinkEntity, IdentityLinkType};
use crate::interceptor::{Command, CommandContext};

pub struct CompleteTaskCmd {
    task_id: String,
    variables: Variables,
}

impl CompleteTaskCmd {
    pub fn new(task_id: &str, variables: Variables) -> Self {
        Self {
            task_id: task_id.to_string(),
            variables,
        }
    }
}

#[async_trait]
impl Command for CompleteTaskCmd {
    type Output = ();

    fn name(&self) -> &'static str {
        engine_command!("CompleteTaskCmd")
    }

    async fn execute(&self, ctx: &mut CommandContext) -> Result<()> {
        require_id("taskId", &self.task_id)?;
        let task = load_task(ctx, &self.task_id).await?;
        if task.suspended {
            return Err(EngineError::Suspended(format!("Task '{}'", task.id)));
        }
        if let Some(process_instance_id) = &task.process_instance_id {
            set_execution_variables(ctx, process_instance_id, &self.variables).await?;
        }
        delete_task(ctx, &self.task_id, None).await?;

        let mut agenda = Agenda::new();
        if let Some(execution_id) = task.execution_id {
            agenda.plan(Operation::TakeOutgoing {
                execution_id,
                only_flow: None,
            });
        }
        agenda.run(ctx).await
    }
}

/// Claims a task for a user, or unclaims it when no user is given.
pub struct ClaimTaskCmd {
    task_id: String,
    user_id: Option<String>,
}

impl ClaimTaskCmd {
    pub fn new(task_id: &str, user_id: Option<&str>) -> Self {
        Self {
            task_id: task_id.to_string(),
            user_id: user_id.map(str::to_string),
        }
    }
}

#[async_trait]
impl Command for ClaimTaskCmd {
    type Output = ();

    fn name(&self) -> &'static str {
        engine_command!("ClaimTaskCmd")
    }

    async fn execute(&self, ctx: &mut CommandContext) -> Result<()> {
        require_id("taskId", &self.task_id)?;
        claim_task(ctx, &self.task_id, self.user_id.as_deref()).await
    }
}

/// Target of an identity link command: exactly one of user or group.
#[derive(Debug, Clone)]
struct LinkTarget {
    task_id: String,
    user_id: Option<String>,
    group_id: Option<String>,
    link_type: IdentityLinkType,
}

impl LinkTarget {
    fn validate(&self) -> Result<()> {
        require_id("taskId", &self.task_id)
    }
}

pub struct AddIdentityLinkCmd {
    target: LinkTarget,
}

impl AddIdentityLinkCmd {
    pub fn new(task_id: &str, user_id: Option<&str>, group_id: Option<&str>, link_type: IdentityLinkType) -> Self {
        Self {
            target: LinkTarget {
                task_id: task_id.to_string(),
                user_id: user_id.map(str::to_string),
                group_id: group_id.map(str::to_string),
                link_type,
            },
        }
    }
}

#[async_trait]
impl Command for AddIdentityLinkCmd {
    /// Whether a link was added.
    type Output = bool;

    fn name(&self) -> &'static str {
        engine_command!("AddIdentityLinkCmd")
    }

    async fn execute(&self, ctx: &mut CommandContext) -> Result<bool> {
        self.target.validate()?;
        let target = &self.target;
        add_identity_link(
            ctx,
            &target.task_id,
            target.user_id.as_deref(),
            target.group_id.as_deref(),
            target.link_type,
        )
        .await
    }
}

pub struct DeleteIdentityLinkCmd {
    target: LinkTarget,
}

impl DeleteIdentityLinkCmd {
    pub fn new(task_id: &str, user_id: Option<&str>, group_id: Option<&str>, link_type: IdentityLinkType) -> Self {
        Self {
            target: LinkTarget {
                task_id: task_id.to_string(),
                user_id: user_id.map(str::to_string),
                group_id: group_id.map(str::to_string),
                link_type,
            },
        }
    }
}

#[async_trait]
impl Command for DeleteIdentityLinkCmd {
    /// Whether anything was removed.
    type Output = bool;

    fn name(&self) -> &'static str {
        engine_command!("DeleteIdentityLinkCmd")
    }

    async fn execute(&self, ctx: &mut CommandContext) -> Result<bool> {
        self.target.validate()?;
        let target = &self.target;
        delete_identity_link(
            ctx,
            &target.task_id,
            target.user_id.as_deref(),
            target.group_id.as_deref(),
            target.link_type,
        )
        .await
    }
}

pub struct GetIdentityLinksForTaskCmd {
    task_id: String,
}

impl GetIdentityLinksForTaskCmd {
    pub fn new(task_id: &str) -> Self {
        Self {
            task_id: task_id.to_string(),
        }
    }
}

#[async_trait]
impl Command for GetIdentityLinksForTaskCmd {
    type Output = Vec<IdentityLinkEntity>;

    fn name(&self) -> &'static str {
        engine_command!("GetIdentityLinksForTaskCmd")
    }

    async fn execute(&self, ctx: &mut CommandContext) -> Result<Vec<IdentityLinkEntity>> {
        require_id("taskId", &self.task_id)?;
        let task = load_task(ctx, &self.task_id).await?;
        find_task_identity_links(ctx, &task).await
    }
}

/// Sets task-local variables.
pub struct SetTaskVariablesCmd {
    task_id: String,
    variables: Variables,
}

impl SetTaskVariablesCmd {
    pub fn new(task_id: &str, variables: Variables) -> Self {
        Self {
            task_id: task_id.to_string(),
            variables,
        }
    }
}

#[async_trait]
impl Command for SetTaskVariablesCmd {
    type Output = ();

    fn name(&self) -> &'static str {
        engine_command!("SetTaskVariablesCmd")
    }

    async fn execute(&self, ctx: &mut CommandContext) -> Result<()> {
        require_id("taskId", &self.task_id)?;
        set_task_variables(ctx, &self.task_id, &self.variables).await
    }
}

pub struct RemoveTaskVariablesCmd {
    task_id: String,
    names: Vec<String>,
}

impl RemoveTaskVariablesCmd {
    pub fn new(task_id: &str, names: &[&str]) -> Self {
        Self {
            task_id: task_id.to_string(),
            names: names.iter().map(|name| name.to_string()).collect(),
        }
    }
}

#[async_trait]
impl Command for RemoveTaskVariablesCmd {
    /// Number of variables removed.
    type Output = usize;

    fn name(&self) -> &'static str {
        engine_command!("RemoveTaskVariablesCmd")
    }

    async fn execute(&self, ctx: &mut CommandContext) -> Result<usize> {
        require_id("taskId", &self.task_id)?;
        remove_task_variables(ctx, &self.task_id, &self.names).await
    }
}

/// Task-local variables.
pub struct GetTaskVariablesCmd {
    task_id: String,
}

impl GetTaskVariablesCmd {
    pub fn new(task_id: &str) -> Self {
        Self {
            task_id: task_id.to_string(),
        }
    }
}

#[async_trait]
impl Command for GetTaskVariablesCmd {
    type Output = Variables;

    fn name(&self) -> &'static str {
        engine_command!("GetTaskVariablesCmd")
    }

    async fn execute(&self, ctx: &mut CommandContext) -> Result<Variables> {
        require_id("taskId", &self.task_id)?;
        let task = load_task(ctx, &self.task_id).await?;
        Ok(find_task_variables(ctx, &task)
            .await?
            .into_iter()
            .map(|variable| (variable.name, variable.value))
            .collect())
    }
}
