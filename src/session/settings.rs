use std::collections::HashSet;
use std::time::Duration;

use crate::entity::EntityKind;
use crate::transaction::StatementKind;

/// Flush and fetch behaviour of a session, derived from the engine config.
#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub bulk_insert_enabled: bool,
    pub max_statements_in_bulk_insert: usize,
    pub bulk_insertable: HashSet<EntityKind>,
    pub eager_execution_tree_fetching: bool,
}

impl SessionSettings {
    pub fn is_bulk_insertable(&self, kind: EntityKind) -> bool {
        self.bulk_insert_enabled && self.bulk_insertable.contains(&kind)
    }
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            bulk_insert_enabled: true,
            max_statements_in_bulk_insert: 100,
            bulk_insertable: EntityKind::ALL
                .iter()
                .copied()
                .filter(|kind| kind.default_bulk_insertable())
                .collect(),
            eager_execution_tree_fetching: false,
        }
    }
}

/// Observer of every statement a session issues.
pub trait StatementListener: Send + Sync {
    fn on_statement(&self, kind: StatementKind, key: &str);

    fn on_database_time(&self, _elapsed: Duration) {}
}
