//! Namespaced cache keys.
//!
//! Every snapshot lives under `<namespace>:<id>`, e.g. `fuels:1`. The id part
//! is the base-10 store id, so the key format is readable from any tool that
//! inspects the backend directly.

use std::fmt;

use carbon_core::EntityId;

use super::traits::CacheableEntity;

/// Separator between the namespace and the id.
const SEPARATOR: char = ':';

/// A cache key scoped to one entity namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NamespacedKey {
    namespace: &'static str,
    id: EntityId,
}

impl NamespacedKey {
    pub fn new(namespace: &'static str, id: EntityId) -> Self {
        Self { namespace, id }
    }

    /// Key for an entity of type `T`.
    pub fn for_entity<T: CacheableEntity>(id: EntityId) -> Self {
        Self::new(T::namespace(), id)
    }

    pub fn namespace(&self) -> &'static str {
        self.namespace
    }

    pub fn id(&self) -> EntityId {
        self.id
    }

    /// Encode to the byte form used by ordered key-value backends.
    pub fn encode(&self) -> Vec<u8> {
        self.to_string().into_bytes()
    }

    /// Prefix shared by every key of a namespace.
    pub fn namespace_prefix(namespace: &str) -> Vec<u8> {
        format!("{}{}", namespace, SEPARATOR).into_bytes()
    }

    /// Extract the id from an encoded key, provided it belongs to `namespace`.
    pub fn decode_id(namespace: &str, bytes: &[u8]) -> Option<EntityId> {
        let raw = std::str::from_utf8(bytes).ok()?;
        let (ns, id) = raw.split_once(SEPARATOR)?;
        if ns != namespace {
            return None;
        }
        id.parse().ok()
    }
}

impl fmt::Display for NamespacedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.namespace, SEPARATOR, self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use carbon_core::Fuel;
    use proptest::prelude::*;

    #[test]
    fn test_key_renders_namespace_and_id() {
        let key = NamespacedKey::for_entity::<Fuel>(1);
        assert_eq!(key.to_string(), "fuels:1");
        assert_eq!(key.encode(), b"fuels:1".to_vec());
    }

    #[test]
    fn test_prefix_does_not_match_other_namespaces() {
        let prefix = NamespacedKey::namespace_prefix("trees");
        assert!(NamespacedKey::new("trees", 4).encode().starts_with(&prefix));
        assert!(!NamespacedKey::new("treesx", 4).encode().starts_with(&prefix));
    }

    #[test]
    fn test_decode_rejects_foreign_or_malformed_keys() {
        assert_eq!(NamespacedKey::decode_id("fuels", b"fuels:12"), Some(12));
        assert_eq!(NamespacedKey::decode_id("fuels", b"trees:12"), None);
        assert_eq!(NamespacedKey::decode_id("fuels", b"fuels:abc"), None);
        assert_eq!(NamespacedKey::decode_id("fuels", b"fuels"), None);
    }

    proptest! {
        #[test]
        fn prop_decode_inverts_encode(id in 1i64..i64::MAX) {
            let key = NamespacedKey::new("electrics", id);
            prop_assert_eq!(NamespacedKey::decode_id("electrics", &key.encode()), Some(id));
        }
    }
}
