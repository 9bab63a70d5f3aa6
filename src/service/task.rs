use crate::cmd::process::Variables;
use crate::cmd::{
    AddIdentityLinkCmd, ClaimTaskCmd, CompleteTaskCmd, DeleteIdentityLinkCmd,
    GetIdentityLinksForTaskCmd, GetTaskVariablesCmd, RemoveTaskVariablesCmd, SetTaskVariablesCmd,
};
use crate::core::Result;
use crate::engine::ProcessEngine;
use crate::entity::{IdentityLinkEntity, IdentityLinkType};
use crate::query::TaskQuery;

#[derive(Clone)]
pub struct TaskService {
    engine: ProcessEngine,
}

impl TaskService {
    pub fn new(engine: ProcessEngine) -> Self {
        Self { engine }
    }

    pub async fn complete(&self, task_id: &str) -> Result<()> {
        self.complete_with_variables(task_id, Variables::new()).await
    }

    pub async fn complete_with_variables(&self, task_id: &str, variables: Variables) -> Result<()> {
        self.engine.execute(&CompleteTaskCmd::new(task_id, variables)).await
    }

    pub async fn claim(&self, task_id: &str, user_id: &str) -> Result<()> {
        self.engine.execute(&ClaimTaskCmd::new(task_id, Some(user_id))).await
    }

    pub async fn unclaim(&self, task_id: &str) -> Result<()> {
        self.engine.execute(&ClaimTaskCmd::new(task_id, None)).await
    }

    /// Returns false when the user already was a candidate.
    pub async fn add_candidate_user(&self, task_id: &str, user_id: &str) -> Result<bool> {
        let command = AddIdentityLinkCmd::new(task_id, Some(user_id), None, IdentityLinkType::Candidate);
        self.engine.execute(&command).await
    }

    pub async fn add_candidate_group(&self, task_id: &str, group_id: &str) -> Result<bool> {
        let command = AddIdentityLinkCmd::new(task_id, None, Some(group_id), IdentityLinkType::Candidate);
        self.engine.execute(&command).await
    }

    /// Returns false when nothing was linked; no delete is issued then.
    pub async fn delete_candidate_user(&self, task_id: &str, user_id: &str) -> Result<bool> {
        let command =
            DeleteIdentityLinkCmd::new(task_id, Some(user_id), None, IdentityLinkType::Candidate);
        self.engine.execute(&command).await
    }

    pub async fn delete_candidate_group(&self, task_id: &str, group_id: &str) -> Result<bool> {
        let command =
            DeleteIdentityLinkCmd::new(task_id, None, Some(group_id), IdentityLinkType::Candidate);
        self.engine.execute(&command).await
    }

    pub async fn get_identity_links_for_task(&self, task_id: &str) -> Result<Vec<IdentityLinkEntity>> {
        self.engine.execute(&GetIdentityLinksForTaskCmd::new(task_id)).await
    }

    pub async fn set_variables_local(&self, task_id: &str, variables: Variables) -> Result<()> {
        self.engine.execute(&SetTaskVariablesCmd::new(task_id, variables)).await
    }

    /// Number of variables actually removed.
    pub async fn remove_variables_local(&self, task_id: &str, names: &[&str]) -> Result<usize> {
        self.engine.execute(&RemoveTaskVariablesCmd::new(task_id, names)).await
    }

    pub async fn get_variables_local(&self, task_id: &str) -> Result<Variables> {
        self.engine.execute(&GetTaskVariablesCmd::new(task_id)).await
    }

    pub fn create_task_query(&self) -> TaskQuery {
        TaskQuery::new(self.engine.clone())
    }
}
