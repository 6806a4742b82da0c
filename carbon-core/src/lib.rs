//! Carbon Core - Entity Types
//!
//! Pure data structures shared by the storage and API crates: the catalog
//! entities, their request payloads, the entity type discriminator and the
//! error taxonomy. No I/O happens here.

pub mod entities;
pub mod enums;
pub mod error;
pub mod identity;

pub use entities::{
    Electric, ElectricRequest, Fuel, FuelRequest, Tree, TreeCategory, TreeCategoryRequest,
    TreeRequest,
};
pub use enums::EntityType;
pub use error::{
    CacheError, CarbonError, CarbonResult, ConfigError, StorageError, ValidationError,
};
pub use identity::{parse_entity_id, EntityId};
