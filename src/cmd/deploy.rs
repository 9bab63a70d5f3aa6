use std::sync::Arc;

use async_trait::async_trait;

use super::engine_command;
use crate::core::{EngineError, Result, new_id};
use crate::engine::latest_definition;
use crate::entity::ProcessDefinitionEntity;
use crate::interceptor::{Command, CommandContext};
use crate::model::ProcessModel;

/// Deploys a model as the next version of its process key.
pub struct DeployCmd {
    model: ProcessModel,
}

impl DeployCmd {
    pub fn new(model: ProcessModel) -> Self {
        Self { model }
    }
}

#[async_trait]
impl Command for DeployCmd {
    type Output = ProcessDefinitionEntity;

    fn name(&self) -> &'static str {
        engine_command!("DeployCmd")
    }

    async fn execute(&self, ctx: &mut CommandContext) -> Result<ProcessDefinitionEntity> {
        self.model.validate()?;
        let key = &self.model.key;
        let version = match latest_definition(ctx, key).await {
            Ok(latest) => latest.version + 1,
            Err(EngineError::ObjectNotFound { .. }) => 1,
            Err(err) => return Err(err),
        };
        let definition = ProcessDefinitionEntity {
            id: format!("{}:{}:{}", key, version, new_id()),
            revision: 0,
            key: key.clone(),
            version,
            name: self.model.name.clone(),
            deployment_id: new_id(),
            resource: self.model.to_json()?,
            suspended: false,
        };
        ctx.session.insert_data(definition.clone())?;
        ctx.core()
            .deployments()
            .add(&definition.id, Arc::new(self.model.clone()))?;
        log::info!("Deployed {} version {}", key, version);
        Ok(definition)
    }
}
