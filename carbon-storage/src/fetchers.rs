//! Store-backed fetchers for the read-through cache.
//!
//! Each fetcher borrows a `Store` and exposes the list and get operations of
//! one cached entity type.

use async_trait::async_trait;
use carbon_core::{CarbonResult, Electric, EntityId, Fuel, Tree};

use crate::cache::StorageFetcher;
use crate::store::Store;

macro_rules! store_fetcher {
    ($name:ident, $entity:ty, $list:ident, $get:ident) => {
        #[doc = concat!("Reads `", stringify!($entity), "` rows from a [`Store`].")]
        pub struct $name<'a> {
            store: &'a dyn Store,
        }

        impl<'a> $name<'a> {
            pub fn new(store: &'a dyn Store) -> Self {
                Self { store }
            }
        }

        #[async_trait]
        impl StorageFetcher<$entity> for $name<'_> {
            async fn fetch_all(&self) -> CarbonResult<Vec<$entity>> {
                self.store.$list().await
            }

            async fn fetch(&self, id: EntityId) -> CarbonResult<Option<$entity>> {
                self.store.$get(id).await
            }
        }
    };
}

store_fetcher!(FuelFetcher, Fuel, fuel_list, fuel_get);
store_fetcher!(ElectricFetcher, Electric, electric_list, electric_get);
store_fetcher!(TreeFetcher, Tree, tree_list, tree_get);
