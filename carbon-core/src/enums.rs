//! Enum types for catalog entities

use serde::{Deserialize, Serialize};
use std::fmt;

/// Entity type discriminator.
///
/// Fuels, electric tariffs and trees are cached; `TreeCategory` is only ever
/// served from the relational store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    Fuel,
    Electric,
    Tree,
    TreeCategory,
}

impl EntityType {
    /// Human-readable singular name used in error messages.
    pub fn label(&self) -> &'static str {
        match self {
            EntityType::Fuel => "Fuel",
            EntityType::Electric => "Electric",
            EntityType::Tree => "Tree",
            EntityType::TreeCategory => "Tree category",
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
