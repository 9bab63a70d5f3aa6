//! Unit-of-work session: the per-command cache of loaded, created, changed
//! and deleted entities, flushed as one batch of statements.

pub mod batch;
pub mod settings;

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{Level, event};

pub use settings::{SessionSettings, StatementListener};

use crate::core::{EngineError, Result, new_id};
use crate::entity::{Entity, EntityData, EntityKind, naming, order};
use crate::storage::{BulkDelete, EntityQuery, InMemoryStorage};
use crate::transaction::{Change, StatementKind, Transaction};

type CacheKey = (EntityKind, String);

#[derive(Debug)]
struct CachedEntity {
    entity: Entity,
    /// State as read from storage or as last flushed; `None` while the
    /// entity is a pending insert of this session.
    original: Option<Entity>,
    deleted: bool,
    seq: u64,
}

impl CachedEntity {
    fn is_dirty(&self) -> bool {
        !self.deleted && self.original.as_ref().is_some_and(|original| *original != self.entity)
    }
}

#[derive(Debug)]
enum PendingDelete {
    Row {
        kind: EntityKind,
        id: String,
        revision: i32,
    },
    Bulk(BulkDelete),
}

impl PendingDelete {
    fn kind(&self) -> EntityKind {
        match self {
            PendingDelete::Row { kind, .. } => *kind,
            PendingDelete::Bulk(statement) => statement.kind(),
        }
    }

    fn to_change(&self) -> Change {
        match self {
            PendingDelete::Row { kind, id, revision } => Change::Delete {
                kind: *kind,
                id: id.clone(),
                expected_revision: *revision,
            },
            PendingDelete::Bulk(statement) => Change::BulkDelete(statement.clone()),
        }
    }
}

pub struct DbSession {
    storage: Arc<InMemoryStorage>,
    settings: Arc<SessionSettings>,
    listener: Option<Arc<dyn StatementListener>>,
    transaction: Option<Transaction>,
    cache: HashMap<CacheKey, CachedEntity>,
    inserts: Vec<CacheKey>,
    deletes: Vec<PendingDelete>,
    fetched_trees: HashSet<String>,
    next_seq: u64,
}

impl DbSession {
    pub fn new(
        storage: Arc<InMemoryStorage>,
        settings: Arc<SessionSettings>,
        listener: Option<Arc<dyn StatementListener>>,
    ) -> Self {
        Self {
            storage,
            settings,
            listener,
            transaction: None,
            cache: HashMap::new(),
            inserts: Vec::new(),
            deletes: Vec::new(),
            fetched_trees: HashSet::new(),
            next_seq: 0,
        }
    }

    pub fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    // ------------------------------------------------------------------
    // Transaction binding
    // ------------------------------------------------------------------

    pub fn begin(&mut self, transaction: Transaction) -> Result<()> {
        if let Some(current) = &self.transaction {
            return Err(EngineError::IllegalState(format!(
                "session is already bound to {}",
                current.id()
            )));
        }
        self.transaction = Some(transaction);
        Ok(())
    }

    pub fn take_transaction(&mut self) -> Option<Transaction> {
        self.transaction.take()
    }

    pub fn has_transaction(&self) -> bool {
        self.transaction.is_some()
    }

    // ------------------------------------------------------------------
    // Statement reporting
    // ------------------------------------------------------------------

    fn record(&self, kind: StatementKind, key: &str) {
        if let Some(listener) = &self.listener {
            listener.on_statement(kind, key);
        }
    }

    fn record_time(&self, elapsed: Duration) {
        if let Some(listener) = &self.listener {
            listener.on_database_time(elapsed);
        }
    }

    async fn read_by_id(&self, kind: EntityKind, id: &str) -> Option<Entity> {
        let started = Instant::now();
        let found = match self.transaction.as_ref().and_then(Transaction::staged) {
            Some(staged) => staged.get(kind, id).cloned(),
            None => self.storage.select_by_id(kind, id).await,
        };
        self.record_time(started.elapsed());
        found
    }

    async fn read_query(&self, query: &EntityQuery) -> Vec<Entity> {
        let started = Instant::now();
        let rows = match self.transaction.as_ref().and_then(Transaction::staged) {
            Some(staged) => staged.select(query),
            None => self.storage.select(query).await,
        };
        self.record_time(started.elapsed());
        rows
    }

    // ------------------------------------------------------------------
    // Cache
    // ------------------------------------------------------------------

    fn next_seq(&mut self) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        seq
    }

    /// Tracks a row read from storage unless the session already knows it.
    fn register_loaded(&mut self, entity: Entity) {
        let key = (entity.kind(), entity.id().to_string());
        if self.cache.contains_key(&key) {
            return;
        }
        let seq = self.next_seq();
        self.cache.insert(
            key,
            CachedEntity {
                original: Some(entity.clone()),
                entity,
                deleted: false,
                seq,
            },
        );
    }

    fn live(&self, kind: EntityKind, id: &str) -> Option<&Entity> {
        self.cache
            .get(&(kind, id.to_string()))
            .filter(|cached| !cached.deleted)
            .map(|cached| &cached.entity)
    }

    /// Whether the entity is a pending insert of this session.
    pub fn is_inserted(&self, kind: EntityKind, id: &str) -> bool {
        self.cache
            .get(&(kind, id.to_string()))
            .is_some_and(|cached| cached.original.is_none())
    }

    pub fn is_cached(&self, kind: EntityKind, id: &str) -> bool {
        self.live(kind, id).is_some()
    }

    // ------------------------------------------------------------------
    // Load
    // ------------------------------------------------------------------

    /// Returns the tracked entity, reading it with `selectById` on a miss.
    pub async fn load_kind(&mut self, kind: EntityKind, id: &str) -> Option<&Entity> {
        let key = (kind, id.to_string());
        if !self.cache.contains_key(&key) {
            self.record(StatementKind::Select, &naming::select_by_id_key(kind));
            let entity = self.read_by_id(kind, id).await?;
            let tree_root = match &entity {
                Entity::Execution(execution) if self.settings.eager_execution_tree_fetching => {
                    Some(execution.root_process_instance_id.clone())
                }
                _ => None,
            };
            self.register_loaded(entity);
            if let Some(root) = tree_root {
                self.fetch_execution_tree(&root).await;
            }
        }
        self.live(kind, id)
    }

    pub async fn load<E: EntityData>(&mut self, id: &str) -> Option<E> {
        self.load_in::<E>(E::KIND, id).await
    }

    pub async fn load_in<E: EntityData>(&mut self, kind: EntityKind, id: &str) -> Option<E> {
        self.load_kind(kind, id).await.and_then(E::from_entity).cloned()
    }

    pub fn get<E: EntityData>(&self, id: &str) -> Option<&E> {
        self.get_in(E::KIND, id)
    }

    pub fn get_in<E: EntityData>(&self, kind: EntityKind, id: &str) -> Option<&E> {
        self.live(kind, id).and_then(E::from_entity)
    }

    pub fn get_mut<E: EntityData>(&mut self, id: &str) -> Option<&mut E> {
        self.get_mut_in(E::KIND, id)
    }

    pub fn get_mut_in<E: EntityData>(&mut self, kind: EntityKind, id: &str) -> Option<&mut E> {
        self.cache
            .get_mut(&(kind, id.to_string()))
            .filter(|cached| !cached.deleted)
            .and_then(|cached| E::from_entity_mut(&mut cached.entity))
    }

    /// Reads every execution sharing `root` into the cache, once per session.
    pub async fn fetch_execution_tree(&mut self, root: &str) {
        if !self.fetched_trees.insert(root.to_string()) {
            return;
        }
        let query = EntityQuery::ExecutionsWithSameRootProcessInstanceId(root.to_string());
        self.record(StatementKind::Select, query.statement());
        for entity in self.read_query(&query).await {
            self.register_loaded(entity);
        }
    }

    pub fn is_tree_fetched(&self, root: &str) -> bool {
        self.fetched_trees.contains(root)
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    /// Runs the named query and merges the result with session state.
    ///
    /// Session changes win over storage rows, session deletes are hidden and
    /// matching pending inserts are appended.
    pub async fn find_list(&mut self, query: &EntityQuery) -> Vec<Entity> {
        self.record(StatementKind::Select, query.statement());
        let rows = self.read_query(query).await;

        let mut result = Vec::with_capacity(rows.len());
        let mut seen: HashSet<CacheKey> = HashSet::new();
        for row in rows {
            let key = (row.kind(), row.id().to_string());
            match self.cache.get(&key) {
                Some(cached) => {
                    if !cached.deleted && query.matches(&cached.entity) {
                        result.push(cached.entity.clone());
                    }
                }
                None => {
                    self.register_loaded(row.clone());
                    result.push(row);
                }
            }
            seen.insert(key);
        }

        let mut extra: Vec<&CachedEntity> = self
            .cache
            .iter()
            .filter(|(key, cached)| {
                !seen.contains(*key) && !cached.deleted && query.matches(&cached.entity)
            })
            .map(|(_, cached)| cached)
            .collect();
        extra.sort_by_key(|cached| cached.seq);
        result.extend(extra.into_iter().map(|cached| cached.entity.clone()));
        result
    }

    pub async fn find_list_of<E: EntityData>(&mut self, query: &EntityQuery) -> Vec<E> {
        self.find_list(query)
            .await
            .iter()
            .filter_map(E::from_entity)
            .cloned()
            .collect()
    }

    /// Cache-only lookup; issues no statement.
    pub fn find_cached(&self, query: &EntityQuery) -> Vec<Entity> {
        let mut found: Vec<&CachedEntity> = self
            .cache
            .values()
            .filter(|cached| !cached.deleted && query.matches(&cached.entity))
            .collect();
        found.sort_by_key(|cached| cached.seq);
        found.into_iter().map(|cached| cached.entity.clone()).collect()
    }

    pub fn find_cached_of<E: EntityData>(&self, query: &EntityQuery) -> Vec<E> {
        self.find_cached(query)
            .iter()
            .filter_map(E::from_entity)
            .cloned()
            .collect()
    }

    // ------------------------------------------------------------------
    // Mutations
    // ------------------------------------------------------------------

    /// Registers a new entity; an empty id gets a fresh UUID.
    pub fn insert(&mut self, mut entity: Entity) -> Result<String> {
        if entity.id().is_empty() {
            entity.set_id(new_id());
        }
        entity.set_revision(1);
        let id = entity.id().to_string();
        let key = (entity.kind(), id.clone());
        if self.cache.contains_key(&key) {
            return Err(EngineError::IllegalState(format!(
                "{} '{}' is already tracked by this session",
                key.0, id
            )));
        }
        let seq = self.next_seq();
        self.cache.insert(
            key.clone(),
            CachedEntity {
                entity,
                original: None,
                deleted: false,
                seq,
            },
        );
        self.inserts.push(key);
        Ok(id)
    }

    pub fn insert_data<E: EntityData>(&mut self, data: E) -> Result<String> {
        self.insert(data.into_entity())
    }

    /// Marks a tracked entity for deletion. A pending insert is cancelled
    /// instead, so no statement is issued for it at all.
    pub fn delete(&mut self, kind: EntityKind, id: &str) -> Result<()> {
        let key = (kind, id.to_string());
        let Some(cached) = self.cache.get_mut(&key) else {
            return Err(EngineError::IllegalState(format!(
                "{} '{}' is not tracked by this session",
                kind, id
            )));
        };
        if cached.deleted {
            return Ok(());
        }
        match &cached.original {
            None => {
                self.cache.remove(&key);
                self.inserts.retain(|pending| *pending != key);
            }
            Some(original) => {
                let revision = original.revision();
                cached.deleted = true;
                self.deletes.push(PendingDelete::Row {
                    kind,
                    id: id.to_string(),
                    revision,
                });
            }
        }
        Ok(())
    }

    /// Records one bulk delete statement. Tracked rows it covers are hidden,
    /// pending inserts it covers are cancelled.
    pub fn bulk_delete(&mut self, statement: BulkDelete) {
        let covered: Vec<CacheKey> = self
            .cache
            .iter()
            .filter(|(_, cached)| !cached.deleted && statement.matches(&cached.entity))
            .map(|(key, _)| key.clone())
            .collect();
        for key in covered {
            if let Some(cached) = self.cache.get_mut(&key) {
                if cached.original.is_none() {
                    self.cache.remove(&key);
                    self.inserts.retain(|pending| *pending != key);
                } else {
                    cached.deleted = true;
                }
            }
        }
        self.deletes.push(PendingDelete::Bulk(statement));
    }

    /// Deletes tracked rows a bulk statement would cover, one by one and
    /// without the bulk statement. For rows that can only exist in this
    /// session.
    pub fn delete_tracked(&mut self, statement: &BulkDelete) -> Result<()> {
        let covered: Vec<CacheKey> = self
            .cache
            .iter()
            .filter(|(_, cached)| !cached.deleted && statement.matches(&cached.entity))
            .map(|(key, _)| key.clone())
            .collect();
        for (kind, id) in covered {
            self.delete(kind, &id)?;
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Flush
    // ------------------------------------------------------------------

    /// Inserts in dependency order, then updates, then deletes in reverse
    /// dependency order.
    fn plan_changes(&self) -> Vec<Change> {
        let pending: Vec<Entity> = self
            .inserts
            .iter()
            .filter_map(|key| self.cache.get(key))
            .map(|cached| cached.entity.clone())
            .collect();
        let mut changes = batch::plan_inserts(pending, &self.settings);

        let position = |kind: EntityKind| {
            order::insert_order()
                .iter()
                .position(|k| *k == kind)
                .unwrap_or(usize::MAX)
        };
        let mut dirty: Vec<&CachedEntity> = self.cache.values().filter(|c| c.is_dirty()).collect();
        dirty.sort_by_key(|cached| (position(cached.entity.kind()), cached.seq));
        for cached in dirty {
            let expected_revision = cached.entity.revision();
            let mut entity = cached.entity.clone();
            entity.set_revision(expected_revision + 1);
            changes.push(Change::Update {
                entity,
                expected_revision,
            });
        }

        for kind in order::delete_order() {
            changes.extend(
                self.deletes
                    .iter()
                    .filter(|pending| pending.kind() == *kind)
                    .map(PendingDelete::to_change),
            );
        }
        changes
    }

    /// Writes pending changes into the transaction's staged view.
    ///
    /// A session without pending changes issues no statement. On failure the
    /// session state is left as it was; the caller aborts the transaction.
    pub async fn flush(&mut self) -> Result<()> {
        let changes = self.plan_changes();
        if changes.is_empty() {
            return Ok(());
        }

        let base = match &self.transaction {
            Some(transaction) if !transaction.is_staged() => Some(self.storage.snapshot().await),
            Some(_) => None,
            None => {
                return Err(EngineError::IllegalState(
                    "flush requires an active transaction".into(),
                ));
            }
        };
        let statements: Vec<(StatementKind, String)> = changes
            .iter()
            .map(|change| (change.statement_kind(), change.statement_key()))
            .collect();

        // Issued statements count even when staging fails part way.
        for (kind, key) in &statements {
            self.record(*kind, key);
        }

        let started = Instant::now();
        let staged = match self.transaction.as_mut() {
            Some(transaction) => transaction.stage(base, changes),
            None => Ok(()),
        };
        self.record_time(started.elapsed());
        staged?;
        event!(
            Level::DEBUG,
            statements = statements.len(),
            inserts = self.inserts.len(),
            deletes = self.deletes.len(),
            "session flushed"
        );
        self.after_flush();
        Ok(())
    }

    fn after_flush(&mut self) {
        for cached in self.cache.values_mut() {
            if cached.is_dirty() {
                let revision = cached.entity.revision() + 1;
                cached.entity.set_revision(revision);
                cached.original = Some(cached.entity.clone());
            }
        }
        for key in self.inserts.drain(..) {
            if let Some(cached) = self.cache.get_mut(&key) {
                cached.original = Some(cached.entity.clone());
            }
        }
        self.cache.retain(|_, cached| !cached.deleted);
        self.deletes.clear();
    }
}
