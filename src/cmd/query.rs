use std::collections::BTreeMap;
use std::marker::PhantomData;

use async_trait::async_trait;

use super::engine_command;
use crate::core::Result;
use crate::entity::{EntityData, EntityKind};
use crate::interceptor::{Command, CommandContext};
use crate::storage::EntityQuery;

/// Runs a named query and returns its rows as `E`.
pub struct ListQueryCmd<E> {
    name: &'static str,
    query: EntityQuery,
    _rows: PhantomData<fn() -> E>,
}

impl<E: EntityData> ListQueryCmd<E> {
    pub fn new(name: &'static str, query: EntityQuery) -> Self {
        Self {
            name,
            query,
            _rows: PhantomData,
        }
    }

    pub fn query(&self) -> &EntityQuery {
        &self.query
    }
}

#[async_trait]
impl<E: EntityData> Command for ListQueryCmd<E> {
    type Output = Vec<E>;

    fn name(&self) -> &'static str {
        self.name
    }

    async fn execute(&self, ctx: &mut CommandContext) -> Result<Vec<E>> {
        Ok(ctx.session.find_list_of(&self.query).await)
    }
}

/// Committed row counts per table, keyed by entity class name.
pub struct GetTableCountCmd;

#[async_trait]
impl Command for GetTableCountCmd {
    type Output = BTreeMap<String, usize>;

    fn name(&self) -> &'static str {
        engine_command!("GetTableCountCmd")
    }

    async fn execute(&self, ctx: &mut CommandContext) -> Result<BTreeMap<String, usize>> {
        let storage = ctx.core().storage().clone();
        let mut counts = BTreeMap::new();
        for kind in EntityKind::ALL {
            counts.insert(kind.class_name().to_string(), storage.row_count(kind).await);
        }
        Ok(counts)
    }
}
