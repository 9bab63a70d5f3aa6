use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::core::{EngineError, Result};
use crate::entity::ProcessDefinitionEntity;
use crate::model::ProcessModel;
use crate::session::DbSession;

/// Parsed models by process definition id.
#[derive(Debug, Default)]
pub struct DeploymentCache {
    models: RwLock<HashMap<String, Arc<ProcessModel>>>,
}

impl DeploymentCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, definition_id: &str, model: Arc<ProcessModel>) -> Result<()> {
        self.models.write()?.insert(definition_id.to_string(), model);
        Ok(())
    }

    pub fn get(&self, definition_id: &str) -> Result<Option<Arc<ProcessModel>>> {
        Ok(self.models.read()?.get(definition_id).cloned())
    }

    pub fn len(&self) -> Result<usize> {
        Ok(self.models.read()?.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    pub fn clear(&self) -> Result<()> {
        self.models.write()?.clear();
        Ok(())
    }

    /// Parses and caches the model of a definition row.
    pub fn resolve(&self, definition: &ProcessDefinitionEntity) -> Result<Arc<ProcessModel>> {
        if let Some(model) = self.get(&definition.id)? {
            return Ok(model);
        }
        let model = Arc::new(ProcessModel::from_json(&definition.resource)?);
        self.add(&definition.id, model.clone())?;
        Ok(model)
    }

    /// Cached model, or the definition row read through the session.
    pub async fn model(&self, session: &mut DbSession, definition_id: &str) -> Result<Arc<ProcessModel>> {
        if let Some(model) = self.get(definition_id)? {
            return Ok(model);
        }
        let definition = session
            .load::<ProcessDefinitionEntity>(definition_id)
            .await
            .ok_or_else(|| EngineError::not_found("process definition", definition_id))?;
        self.resolve(&definition)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ProcessModelBuilder;

    fn definition() -> ProcessDefinitionEntity {
        let model = ProcessModelBuilder::new("p")
            .start_event("start")
            .end_event("end")
            .flow("f", "start", "end")
            .build()
            .unwrap();
        ProcessDefinitionEntity {
            id: "p:1:abc".into(),
            revision: 1,
            key: "p".into(),
            version: 1,
            name: None,
            deployment_id: "d".into(),
            resource: model.to_json().unwrap(),
            suspended: false,
        }
    }

    #[test]
    fn test_resolve_parses_once() {
        let cache = DeploymentCache::new();
        assert!(cache.is_empty().unwrap());
        let first = cache.resolve(&definition()).unwrap();
        let second = cache.resolve(&definition()).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.len().unwrap(), 1);
    }
}
