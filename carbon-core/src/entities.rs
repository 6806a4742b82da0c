//! Core entity structures
//!
//! Field names double as the JSON snapshot format stored in the cache, so
//! renaming a field invalidates every cached entry of that type.

use crate::{EntityId, ValidationError};
use serde::{Deserialize, Serialize};

/// Fuel type with its emission factor and unit price.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct Fuel {
    pub id: EntityId,
    pub category: String,
    pub name: String,
    /// kg CO2e per unit
    pub emission_factor: f64,
    pub price: f64,
    pub unit: String,
}

/// Payload for creating or replacing a fuel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct FuelRequest {
    pub category: String,
    pub name: String,
    pub emission_factor: f64,
    pub price: f64,
    pub unit: String,
}

impl FuelRequest {
    pub fn validate(&self) -> Result<(), ValidationError> {
        require_text("category", &self.category)?;
        require_text("name", &self.name)?;
        require_positive("emission_factor", self.emission_factor)?;
        require_positive("price", self.price)?;
        require_text("unit", &self.unit)?;
        Ok(())
    }

    /// Materialize the fuel once the store has assigned an ID.
    pub fn into_fuel(self, id: EntityId) -> Fuel {
        Fuel {
            id,
            category: self.category,
            name: self.name,
            emission_factor: self.emission_factor,
            price: self.price,
            unit: self.unit,
        }
    }
}

/// Regional electricity tariff.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct Electric {
    pub id: EntityId,
    pub province: String,
    /// kg CO2e per kWh
    pub emission_factor: f64,
    pub price: f64,
}

/// Payload for creating or replacing an electricity tariff.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ElectricRequest {
    pub province: String,
    pub emission_factor: f64,
    pub price: f64,
}

impl ElectricRequest {
    pub fn validate(&self) -> Result<(), ValidationError> {
        require_text("province", &self.province)?;
        require_positive("emission_factor", self.emission_factor)?;
        require_positive("price", self.price)?;
        Ok(())
    }

    pub fn into_electric(self, id: EntityId) -> Electric {
        Electric {
            id,
            province: self.province,
            emission_factor: self.emission_factor,
            price: self.price,
        }
    }
}

/// A tree offered in the donation catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct Tree {
    pub id: EntityId,
    pub tree_category_id: EntityId,
    pub name: String,
    pub description: String,
    pub price: f64,
    /// Units left for purchase; changes frequently through the cart flow.
    pub stock: i64,
}

/// Payload for creating or replacing a tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct TreeRequest {
    pub tree_category_id: EntityId,
    pub name: String,
    pub description: String,
    pub price: f64,
    pub stock: i64,
}

impl TreeRequest {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.tree_category_id <= 0 {
            return Err(ValidationError::MissingField {
                field: "tree_category_id".to_string(),
            });
        }
        require_text("name", &self.name)?;
        require_text("description", &self.description)?;
        require_positive("price", self.price)?;
        if self.stock <= 0 {
            return Err(ValidationError::InvalidValue {
                field: "stock".to_string(),
                reason: "must be greater than zero".to_string(),
            });
        }
        Ok(())
    }

    pub fn into_tree(self, id: EntityId) -> Tree {
        Tree {
            id,
            tree_category_id: self.tree_category_id,
            name: self.name,
            description: self.description,
            price: self.price,
            stock: self.stock,
        }
    }
}

/// Grouping for catalog trees. Not cached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct TreeCategory {
    pub id: EntityId,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct TreeCategoryRequest {
    pub name: String,
}

impl TreeCategoryRequest {
    pub fn validate(&self) -> Result<(), ValidationError> {
        require_text("name", &self.name)
    }
}

fn require_text(field: &str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::MissingField {
            field: field.to_string(),
        });
    }
    Ok(())
}

// NaN and infinities are not finite, so they fail the first check.
fn require_positive(field: &str, value: f64) -> Result<(), ValidationError> {
    if !value.is_finite() || value <= 0.0 {
        return Err(ValidationError::InvalidValue {
            field: field.to_string(),
            reason: "must be a finite number greater than zero".to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn pertamax() -> FuelRequest {
        FuelRequest {
            category: "Gas".to_string(),
            name: "Pertamax".to_string(),
            emission_factor: 2.363,
            price: 12500.0,
            unit: "Liter".to_string(),
        }
    }

    #[test]
    fn test_fuel_request_valid() {
        assert!(pertamax().validate().is_ok());
    }

    #[test]
    fn test_fuel_request_rejects_blank_name() {
        let mut req = pertamax();
        req.name = "   ".to_string();
        assert_eq!(
            req.validate(),
            Err(ValidationError::MissingField {
                field: "name".to_string()
            })
        );
    }

    #[test]
    fn test_fuel_request_rejects_non_positive_numbers() {
        let mut req = pertamax();
        req.price = 0.0;
        assert!(req.validate().is_err());

        let mut req = pertamax();
        req.emission_factor = f64::NAN;
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_fuel_snapshot_field_names() {
        let fuel = pertamax().into_fuel(1);
        let json = serde_json::to_value(&fuel).expect("fuel serializes");
        assert_eq!(json["id"], 1);
        assert_eq!(json["category"], "Gas");
        assert_eq!(json["emission_factor"], 2.363);
        assert_eq!(json["unit"], "Liter");
    }

    #[test]
    fn test_tree_request_validation() {
        let req = TreeRequest {
            tree_category_id: 2,
            name: "Mahoni".to_string(),
            description: "Swietenia mahagoni".to_string(),
            price: 35000.0,
            stock: 10,
        };
        assert!(req.validate().is_ok());

        let mut missing_category = req.clone();
        missing_category.tree_category_id = 0;
        assert!(missing_category.validate().is_err());

        let mut no_stock = req;
        no_stock.stock = 0;
        assert!(no_stock.validate().is_err());
    }

    #[test]
    fn test_electric_request_validation() {
        let req = ElectricRequest {
            province: "Jawa Barat".to_string(),
            emission_factor: 0.87,
            price: 1444.7,
        };
        assert!(req.validate().is_ok());
        assert_eq!(req.clone().into_electric(3).province, "Jawa Barat");

        let bad = ElectricRequest {
            province: String::new(),
            ..req
        };
        assert!(bad.validate().is_err());
    }

    #[test]
    fn test_tree_category_request_validation() {
        assert!(TreeCategoryRequest {
            name: "Fruit".to_string()
        }
        .validate()
        .is_ok());
        assert!(TreeCategoryRequest {
            name: String::new()
        }
        .validate()
        .is_err());
    }

    fn non_positive_or_non_finite() -> impl Strategy<Value = f64> {
        prop_oneof![
            Just(f64::NAN),
            Just(f64::INFINITY),
            Just(f64::NEG_INFINITY),
            -1.0e9f64..=0.0,
        ]
    }

    proptest! {
        #[test]
        fn prop_bad_price_is_rejected(price in non_positive_or_non_finite()) {
            let fuel = FuelRequest { price, ..pertamax() };
            prop_assert!(fuel.validate().is_err());

            let electric = ElectricRequest {
                province: "Bali".to_string(),
                emission_factor: 0.87,
                price,
            };
            prop_assert!(electric.validate().is_err());

            let tree = TreeRequest {
                tree_category_id: 1,
                name: "Jati".to_string(),
                description: "Tectona grandis".to_string(),
                price,
                stock: 5,
            };
            prop_assert!(tree.validate().is_err());
        }

        #[test]
        fn prop_into_fuel_keeps_request_fields(id in 1i64..10_000, price in 0.01f64..1.0e6) {
            let req = FuelRequest { price, ..pertamax() };
            let fuel = req.clone().into_fuel(id);
            prop_assert_eq!(fuel.id, id);
            prop_assert_eq!(fuel.price, req.price);
            prop_assert_eq!(fuel.name, req.name);
        }
    }
}
