//! Identity types for catalog entities

use crate::error::ValidationError;

/// Numeric primary key assigned by the relational store.
pub type EntityId = i64;

/// Parse a base-10 entity ID, the format used both in URL paths and as the
/// field key inside a cache namespace.
pub fn parse_entity_id(raw: &str) -> Result<EntityId, ValidationError> {
    let id = raw
        .trim()
        .parse::<EntityId>()
        .map_err(|e| ValidationError::InvalidValue {
            field: "id".to_string(),
            reason: e.to_string(),
        })?;

    if id <= 0 {
        return Err(ValidationError::InvalidValue {
            field: "id".to_string(),
            reason: "must be a positive integer".to_string(),
        });
    }

    Ok(id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_parse_entity_id_accepts_positive() {
        assert_eq!(parse_entity_id("42"), Ok(42));
        assert_eq!(parse_entity_id(" 7 "), Ok(7));
    }

    #[test]
    fn test_parse_entity_id_rejects_garbage() {
        assert!(parse_entity_id("abc").is_err());
        assert!(parse_entity_id("").is_err());
        assert!(parse_entity_id("1.5").is_err());
    }

    #[test]
    fn test_parse_entity_id_rejects_non_positive() {
        assert!(parse_entity_id("0").is_err());
        assert!(parse_entity_id("-3").is_err());
    }

    proptest! {
        #[test]
        fn prop_positive_ids_parse_back(id in 1i64..=i64::MAX) {
            prop_assert_eq!(parse_entity_id(&id.to_string()), Ok(id));
        }

        #[test]
        fn prop_non_positive_ids_are_rejected(id in i64::MIN..=0) {
            prop_assert!(parse_entity_id(&id.to_string()).is_err());
        }
    }
}
