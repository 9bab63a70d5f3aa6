use crate::cmd::DeployCmd;
use crate::core::Result;
use crate::engine::ProcessEngine;
use crate::entity::ProcessDefinitionEntity;
use crate::model::ProcessModel;

#[derive(Clone)]
pub struct RepositoryService {
    engine: ProcessEngine,
}

impl RepositoryService {
    pub fn new(engine: ProcessEngine) -> Self {
        Self { engine }
    }

    /// Validates and deploys a model as the next version of its key.
    pub async fn deploy(&self, model: ProcessModel) -> Result<ProcessDefinitionEntity> {
        model.validate()?;
        self.engine.execute(&DeployCmd::new(model)).await
    }

    pub async fn deploy_json(&self, json: &str) -> Result<ProcessDefinitionEntity> {
        self.deploy(ProcessModel::from_json(json)?).await
    }
}
