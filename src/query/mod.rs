//! Fluent queries over runtime and historic entities. Each query runs as
//! one command, so it is profiled like any other.

pub mod history;
pub mod runtime;

use async_trait::async_trait;

pub use history::{
    HistoricActivityInstanceQuery, HistoricProcessInstanceQuery, HistoricTaskInstanceQuery,
    HistoricVariableInstanceQuery,
};
pub use runtime::{JobQuery, ProcessInstanceQuery, TaskQuery};

use crate::cmd::ListQueryCmd;
use crate::core::{EngineError, Result};
use crate::engine::ProcessEngine;
use crate::entity::EntityData;
use crate::storage::EntityQuery;

#[async_trait]
pub trait Query: Send + Sync {
    type Row: EntityData;

    fn engine(&self) -> &ProcessEngine;

    /// Qualified name the query is profiled under.
    fn name(&self) -> &'static str;

    fn to_entity_query(&self) -> EntityQuery;

    async fn list(&self) -> Result<Vec<Self::Row>> {
        let command = ListQueryCmd::<Self::Row>::new(self.name(), self.to_entity_query());
        self.engine().execute(&command).await
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.list().await?.len())
    }

    /// `None` without a match; more than one match is an error.
    async fn single_result(&self) -> Result<Option<Self::Row>> {
        let mut rows = self.list().await?;
        match rows.len() {
            0 => Ok(None),
            1 => Ok(rows.pop()),
            found => Err(EngineError::IllegalState(format!(
                "Query return {} results instead of max 1",
                found
            ))),
        }
    }
}

/// Rejects empty filter values before any storage access.
pub(crate) fn non_empty(what: &str, value: &str) -> Result<String> {
    if value.trim().is_empty() {
        return Err(EngineError::IllegalArgument(format!("{} is empty", what)));
    }
    Ok(value.to_string())
}
