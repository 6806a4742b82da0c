//! Carbon Storage - Store Trait, In-Memory Store and Cache Layer
//!
//! Defines the store abstraction for the catalog entities and the cache-aside
//! layer that sits in front of it. The PostgreSQL store lives in carbon-api.

pub mod cache;
pub mod fetchers;
pub mod store;

pub use store::Store;

pub use fetchers::{ElectricFetcher, FuelFetcher, TreeFetcher};

// Re-export cache types for API integration
pub use cache::{
    CacheBackend, CacheConfig, CacheRead, CacheStats, CacheableEntity, ElectricCache,
    EntityCache, FuelCache, InMemoryCacheBackend, ListPolicy, LmdbCacheBackend, LmdbCacheError,
    NamespacedKey, ReadSource, ReadThrough, StorageFetcher, TreeCache, WriteOutcome,
};

use async_trait::async_trait;
use carbon_core::{
    CarbonError, CarbonResult, Electric, ElectricRequest, EntityId, EntityType, Fuel, FuelRequest,
    StorageError, Tree, TreeCategory, TreeCategoryRequest, TreeRequest, ValidationError,
};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::RwLock;

// ============================================================================
// IN-MEMORY STORE
// ============================================================================

/// One table: rows keyed by id plus the id sequence.
#[derive(Debug)]
struct Table<T> {
    rows: BTreeMap<EntityId, T>,
    next_id: EntityId,
}

impl<T> Default for Table<T> {
    fn default() -> Self {
        Self {
            rows: BTreeMap::new(),
            next_id: 1,
        }
    }
}

impl<T: Clone> Table<T> {
    fn allocate_id(&mut self) -> EntityId {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn list(&self) -> Vec<T> {
        // BTreeMap iterates in key order, which gives ascending ids.
        self.rows.values().cloned().collect()
    }
}

/// In-memory store for tests and local runs without a database.
///
/// Behaves like the PostgreSQL store: sequential ids, ordered lists, unique
/// tree and category names, hidden soft-deleted tariffs. It can also be
/// switched offline to exercise store-failure paths.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    fuels: RwLock<Table<Fuel>>,
    electrics: RwLock<Table<Electric>>,
    trees: RwLock<Table<Tree>>,
    tree_categories: RwLock<Table<TreeCategory>>,
    offline: AtomicBool,
    reads: AtomicU64,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent call fail with `StorageError::Unavailable`.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Number of list and get calls served so far.
    pub fn read_count(&self) -> u64 {
        self.reads.load(Ordering::SeqCst)
    }

    fn check_online(&self) -> CarbonResult<()> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(StorageError::Unavailable {
                reason: "store is offline".to_string(),
            }
            .into());
        }
        Ok(())
    }

    fn begin_read(&self) -> CarbonResult<()> {
        self.check_online()?;
        self.reads.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn read<T>(lock: &RwLock<Table<T>>) -> CarbonResult<std::sync::RwLockReadGuard<'_, Table<T>>> {
        lock.read()
            .map_err(|_| CarbonError::Storage(StorageError::LockPoisoned))
    }

    fn write<T>(
        lock: &RwLock<Table<T>>,
    ) -> CarbonResult<std::sync::RwLockWriteGuard<'_, Table<T>>> {
        lock.write()
            .map_err(|_| CarbonError::Storage(StorageError::LockPoisoned))
    }

    fn not_found(entity_type: EntityType, id: EntityId) -> CarbonError {
        CarbonError::Storage(StorageError::NotFound { entity_type, id })
    }

    fn name_taken(entity_type: EntityType, name: &str) -> CarbonError {
        CarbonError::Storage(StorageError::AlreadyExists {
            entity_type,
            field: "name".to_string(),
            value: name.to_string(),
        })
    }

    fn ensure_category_exists(&self, category_id: EntityId) -> CarbonResult<()> {
        let categories = Self::read(&self.tree_categories)?;
        if !categories.rows.contains_key(&category_id) {
            return Err(ValidationError::InvalidValue {
                field: "tree_category_id".to_string(),
                reason: format!("tree category {} does not exist", category_id),
            }
            .into());
        }
        Ok(())
    }
}

#[async_trait]
impl Store for InMemoryStore {
    // === Fuel Operations ===

    async fn fuel_list(&self) -> CarbonResult<Vec<Fuel>> {
        self.begin_read()?;
        Ok(Self::read(&self.fuels)?.list())
    }

    async fn fuel_get(&self, id: EntityId) -> CarbonResult<Option<Fuel>> {
        self.begin_read()?;
        Ok(Self::read(&self.fuels)?.rows.get(&id).cloned())
    }

    async fn fuel_create(&self, req: &FuelRequest) -> CarbonResult<Fuel> {
        self.check_online()?;
        let mut fuels = Self::write(&self.fuels)?;
        let fuel = req.clone().into_fuel(fuels.allocate_id());
        fuels.rows.insert(fuel.id, fuel.clone());
        Ok(fuel)
    }

    async fn fuel_update(&self, id: EntityId, req: &FuelRequest) -> CarbonResult<Fuel> {
        self.check_online()?;
        let mut fuels = Self::write(&self.fuels)?;
        let slot = fuels
            .rows
            .get_mut(&id)
            .ok_or_else(|| Self::not_found(EntityType::Fuel, id))?;
        *slot = req.clone().into_fuel(id);
        Ok(slot.clone())
    }

    async fn fuel_delete(&self, id: EntityId) -> CarbonResult<()> {
        self.check_online()?;
        let mut fuels = Self::write(&self.fuels)?;
        fuels
            .rows
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| Self::not_found(EntityType::Fuel, id))
    }

    // === Electric Operations ===

    async fn electric_list(&self) -> CarbonResult<Vec<Electric>> {
        self.begin_read()?;
        Ok(Self::read(&self.electrics)?.list())
    }

    async fn electric_get(&self, id: EntityId) -> CarbonResult<Option<Electric>> {
        self.begin_read()?;
        Ok(Self::read(&self.electrics)?.rows.get(&id).cloned())
    }

    async fn electric_create(&self, req: &ElectricRequest) -> CarbonResult<Electric> {
        self.check_online()?;
        let mut electrics = Self::write(&self.electrics)?;
        let electric = req.clone().into_electric(electrics.allocate_id());
        electrics.rows.insert(electric.id, electric.clone());
        Ok(electric)
    }

    async fn electric_update(
        &self,
        id: EntityId,
        req: &ElectricRequest,
    ) -> CarbonResult<Electric> {
        self.check_online()?;
        let mut electrics = Self::write(&self.electrics)?;
        let slot = electrics
            .rows
            .get_mut(&id)
            .ok_or_else(|| Self::not_found(EntityType::Electric, id))?;
        *slot = req.clone().into_electric(id);
        Ok(slot.clone())
    }

    async fn electric_delete(&self, id: EntityId) -> CarbonResult<()> {
        self.check_online()?;
        // Dropping the row is indistinguishable from a soft delete for readers.
        let mut electrics = Self::write(&self.electrics)?;
        electrics
            .rows
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| Self::not_found(EntityType::Electric, id))
    }

    // === Tree Operations ===

    async fn tree_list(&self) -> CarbonResult<Vec<Tree>> {
        self.begin_read()?;
        Ok(Self::read(&self.trees)?.list())
    }

    async fn tree_get(&self, id: EntityId) -> CarbonResult<Option<Tree>> {
        self.begin_read()?;
        Ok(Self::read(&self.trees)?.rows.get(&id).cloned())
    }

    async fn tree_create(&self, req: &TreeRequest) -> CarbonResult<Tree> {
        self.check_online()?;
        self.ensure_category_exists(req.tree_category_id)?;
        let mut trees = Self::write(&self.trees)?;
        if trees.rows.values().any(|t| t.name == req.name) {
            return Err(Self::name_taken(EntityType::Tree, &req.name));
        }
        let tree = req.clone().into_tree(trees.allocate_id());
        trees.rows.insert(tree.id, tree.clone());
        Ok(tree)
    }

    async fn tree_update(&self, id: EntityId, req: &TreeRequest) -> CarbonResult<Tree> {
        self.check_online()?;
        self.ensure_category_exists(req.tree_category_id)?;
        let mut trees = Self::write(&self.trees)?;
        if !trees.rows.contains_key(&id) {
            return Err(Self::not_found(EntityType::Tree, id));
        }
        if trees.rows.values().any(|t| t.id != id && t.name == req.name) {
            return Err(Self::name_taken(EntityType::Tree, &req.name));
        }
        let tree = req.clone().into_tree(id);
        trees.rows.insert(id, tree.clone());
        Ok(tree)
    }

    async fn tree_delete(&self, id: EntityId) -> CarbonResult<()> {
        self.check_online()?;
        let mut trees = Self::write(&self.trees)?;
        trees
            .rows
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| Self::not_found(EntityType::Tree, id))
    }

    // === Tree Category Operations ===

    async fn tree_category_list(&self) -> CarbonResult<Vec<TreeCategory>> {
        self.begin_read()?;
        Ok(Self::read(&self.tree_categories)?.list())
    }

    async fn tree_category_get(&self, id: EntityId) -> CarbonResult<Option<TreeCategory>> {
        self.begin_read()?;
        Ok(Self::read(&self.tree_categories)?.rows.get(&id).cloned())
    }

    async fn tree_category_create(
        &self,
        req: &TreeCategoryRequest,
    ) -> CarbonResult<TreeCategory> {
        self.check_online()?;
        let mut categories = Self::write(&self.tree_categories)?;
        if categories.rows.values().any(|c| c.name == req.name) {
            return Err(Self::name_taken(EntityType::TreeCategory, &req.name));
        }
        let category = TreeCategory {
            id: categories.allocate_id(),
            name: req.name.clone(),
        };
        categories.rows.insert(category.id, category.clone());
        Ok(category)
    }

    async fn tree_category_update(
        &self,
        id: EntityId,
        req: &TreeCategoryRequest,
    ) -> CarbonResult<TreeCategory> {
        self.check_online()?;
        let mut categories = Self::write(&self.tree_categories)?;
        if !categories.rows.contains_key(&id) {
            return Err(Self::not_found(EntityType::TreeCategory, id));
        }
        if categories
            .rows
            .values()
            .any(|c| c.id != id && c.name == req.name)
        {
            return Err(Self::name_taken(EntityType::TreeCategory, &req.name));
        }
        let category = TreeCategory {
            id,
            name: req.name.clone(),
        };
        categories.rows.insert(id, category.clone());
        Ok(category)
    }

    async fn tree_category_delete(&self, id: EntityId) -> CarbonResult<()> {
        self.check_online()?;
        let in_use = Self::read(&self.trees)?
            .rows
            .values()
            .any(|t| t.tree_category_id == id);
        if in_use {
            return Err(ValidationError::InvalidValue {
                field: "id".to_string(),
                reason: format!("tree category {} is still used by trees", id),
            }
            .into());
        }
        let mut categories = Self::write(&self.tree_categories)?;
        categories
            .rows
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| Self::not_found(EntityType::TreeCategory, id))
    }

    async fn ping(&self) -> CarbonResult<()> {
        self.check_online()
    }
}

// ============================================================================
// TESTS
// ============================================================================
