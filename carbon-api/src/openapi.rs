//! OpenAPI Specification for the Carbon API
//!
//! Generated by utoipa from the route annotations and the schema derives on
//! the core entity types.

use utoipa::OpenApi;

use carbon_core::{
    Electric, ElectricRequest, Fuel, FuelRequest, Tree, TreeCategory, TreeCategoryRequest,
    TreeRequest,
};

use crate::error::{ApiError, ErrorCode};
use crate::routes::health::{
    CacheStatsBody, ComponentHealth, HealthDetails, HealthResponse, HealthStatus,
};
use crate::routes::{electric, fuel, health, tree, tree_category, MessageResponse};

/// OpenAPI document for the Carbon API.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Carbon API",
        description = "Emission-factor catalog for fuels, electricity tariffs and donation trees"
    ),
    tags(
        (name = "Fuels", description = "Fuel types with emission factor and price"),
        (name = "Electrics", description = "Regional electricity tariffs"),
        (name = "Trees", description = "Trees offered for donation"),
        (name = "Tree Categories", description = "Tree groupings"),
        (name = "Health", description = "Liveness and readiness checks"),
    ),
    paths(
        fuel::list_fuels,
        fuel::get_fuel,
        fuel::create_fuel,
        fuel::update_fuel,
        fuel::delete_fuel,
        electric::list_electrics,
        electric::get_electric,
        electric::create_electric,
        electric::update_electric,
        electric::delete_electric,
        tree::list_trees,
        tree::get_tree,
        tree::create_tree,
        tree::update_tree,
        tree::delete_tree,
        tree_category::list_tree_categories,
        tree_category::get_tree_category,
        tree_category::create_tree_category,
        tree_category::update_tree_category,
        tree_category::delete_tree_category,
        health::liveness,
        health::readiness,
    ),
    components(
        schemas(
            ApiError, ErrorCode, MessageResponse,
            Fuel, FuelRequest,
            Electric, ElectricRequest,
            Tree, TreeRequest,
            TreeCategory, TreeCategoryRequest,
            HealthResponse, HealthStatus, HealthDetails, ComponentHealth, CacheStatsBody,
        )
    )
)]
pub struct ApiDoc;

impl ApiDoc {
    /// Render the document as pretty-printed JSON.
    pub fn to_json() -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&Self::openapi())
    }
}
