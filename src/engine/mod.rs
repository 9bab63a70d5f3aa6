//! Process engine: configuration, deployed models and the agenda that moves
//! executions through them.

pub mod agenda;
pub mod config;
pub mod deployment;
pub mod process_engine;

mod activities;
mod behavior;
mod executions;
mod history;
mod jobs;
mod tasks;
mod variables;

use std::sync::Arc;

pub use agenda::{Agenda, Operation};
pub use config::{EngineConfig, HistoryLevel};
pub use deployment::DeploymentCache;
pub use process_engine::ProcessEngine;

pub(crate) use behavior::{fire_timer, message_received, trigger};
pub(crate) use executions::{
    end_process_instance, latest_definition, load_execution, set_suspension_state,
    start_process_instance,
};
pub(crate) use jobs::{delete_job, load_job, move_job};
pub(crate) use tasks::{
    add_identity_link, claim_task, delete_identity_link, delete_task, find_task_identity_links,
    load_task,
};
pub(crate) use variables::{
    find_task_variables, remove_task_variables, set_execution_variables, set_task_variables,
    variables_of_execution,
};

use crate::entity::CountingPolicy;
use crate::session::SessionSettings;
use crate::storage::InMemoryStorage;
use crate::transaction::TransactionManager;

/// Shared state of one engine: configuration, storage and deployed models.
pub struct EngineCore {
    config: EngineConfig,
    storage: Arc<InMemoryStorage>,
    transactions: TransactionManager,
    deployments: DeploymentCache,
    session_settings: Arc<SessionSettings>,
}

impl EngineCore {
    pub fn new(config: EngineConfig) -> Self {
        let storage = Arc::new(InMemoryStorage::new());
        let session_settings = Arc::new(config.session_settings());
        Self {
            transactions: TransactionManager::new(storage.clone()),
            deployments: DeploymentCache::new(),
            storage,
            session_settings,
            config,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn storage(&self) -> &Arc<InMemoryStorage> {
        &self.storage
    }

    pub fn transactions(&self) -> &TransactionManager {
        &self.transactions
    }

    pub fn deployments(&self) -> &DeploymentCache {
        &self.deployments
    }

    pub fn session_settings(&self) -> &Arc<SessionSettings> {
        &self.session_settings
    }

    pub fn counting_policy(&self) -> CountingPolicy {
        self.config.counting_policy()
    }
}
