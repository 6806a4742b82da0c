//! Async store trait for the authoritative relational data.
//!
//! Every cached read path falls back to this trait, and every mutation is
//! committed here before it is mirrored into the cache. Implementations must
//! return lists ordered by ascending id.

use ::async_trait::async_trait;
use carbon_core::{
    CarbonResult, Electric, ElectricRequest, EntityId, Fuel, FuelRequest, Tree, TreeCategory,
    TreeCategoryRequest, TreeRequest,
};

/// Async store trait for catalog operations.
///
/// Updates and deletes of a missing row fail with `StorageError::NotFound`.
/// Name conflicts on trees and tree categories fail with
/// `StorageError::AlreadyExists`.
#[async_trait]
pub trait Store: Send + Sync {
    // ========================================================================
    // FUEL OPERATIONS
    // ========================================================================

    async fn fuel_list(&self) -> CarbonResult<Vec<Fuel>>;

    async fn fuel_get(&self, id: EntityId) -> CarbonResult<Option<Fuel>>;

    async fn fuel_create(&self, req: &FuelRequest) -> CarbonResult<Fuel>;

    async fn fuel_update(&self, id: EntityId, req: &FuelRequest) -> CarbonResult<Fuel>;

    async fn fuel_delete(&self, id: EntityId) -> CarbonResult<()>;

    // ========================================================================
    // ELECTRIC OPERATIONS
    // ========================================================================

    async fn electric_list(&self) -> CarbonResult<Vec<Electric>>;

    async fn electric_get(&self, id: EntityId) -> CarbonResult<Option<Electric>>;

    async fn electric_create(&self, req: &ElectricRequest) -> CarbonResult<Electric>;

    async fn electric_update(&self, id: EntityId, req: &ElectricRequest)
        -> CarbonResult<Electric>;

    /// Soft delete: the row stays but is hidden from every read.
    async fn electric_delete(&self, id: EntityId) -> CarbonResult<()>;

    // ========================================================================
    // TREE OPERATIONS
    // ========================================================================

    async fn tree_list(&self) -> CarbonResult<Vec<Tree>>;

    async fn tree_get(&self, id: EntityId) -> CarbonResult<Option<Tree>>;

    /// Insert a tree. Fails if another tree already uses the name.
    async fn tree_create(&self, req: &TreeRequest) -> CarbonResult<Tree>;

    async fn tree_update(&self, id: EntityId, req: &TreeRequest) -> CarbonResult<Tree>;

    async fn tree_delete(&self, id: EntityId) -> CarbonResult<()>;

    // ========================================================================
    // TREE CATEGORY OPERATIONS
    // ========================================================================

    async fn tree_category_list(&self) -> CarbonResult<Vec<TreeCategory>>;

    async fn tree_category_get(&self, id: EntityId) -> CarbonResult<Option<TreeCategory>>;

    async fn tree_category_create(&self, req: &TreeCategoryRequest)
        -> CarbonResult<TreeCategory>;

    async fn tree_category_update(
        &self,
        id: EntityId,
        req: &TreeCategoryRequest,
    ) -> CarbonResult<TreeCategory>;

    async fn tree_category_delete(&self, id: EntityId) -> CarbonResult<()>;

    // ========================================================================
    // HEALTH
    // ========================================================================

    /// Cheap round trip used by the readiness check.
    async fn ping(&self) -> CarbonResult<()>;
}
