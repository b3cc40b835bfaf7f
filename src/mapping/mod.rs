//! # Object Mapping
//!
//! How in-memory objects are described to the engine:
//!
//! - [`Entity`] + [`Shape`]: typed records with an explicit, cached
//!   property descriptor
//! - [`DynamicEntity`] + [`Field`]: records shaped at run time
//! - [`Mapped`]: the erased contract both expose to the persistence engine
//! - [`classify`]: the runtime classifier for dynamic fields
//! - [`sanitize`]: the property-name → relationship-type rule

pub mod classify;
pub mod dynamic;
pub mod mapped;
pub mod scalar;
pub mod shape;

use std::sync::Arc;

use parking_lot::RwLock;

pub use classify::{classify, Classification, ElementKind};
pub use dynamic::{DynamicEntity, Field};
pub use mapped::{Edge, Mapped, ObjectKey, PropertyValue, Target};
pub use scalar::{ScalarField, ScalarType};
pub use shape::{Entity, Property, PropertyKind, Shape, ShapeBuilder, Weighted};

/// Shared, mutable handle to an in-memory entity. References between
/// entities use this type, so cycles are expressible.
pub type Shared<T> = Arc<RwLock<T>>;

pub fn shared<T>(value: T) -> Shared<T> {
    Arc::new(RwLock::new(value))
}

/// Turn a property name into a relationship-type token: spaces become
/// underscores and the degree sign is dropped.
pub fn sanitize(name: &str) -> String {
    name.chars()
        .filter(|c| *c != '°')
        .map(|c| if c == ' ' { '_' } else { c })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_sanitize_examples() {
        assert_eq!(sanitize("Date Of Birth°"), "Date_Of_Birth");
        assert_eq!(sanitize("Name"), "Name");
        assert_eq!(sanitize("Temp °C"), "Temp_C");
        assert_eq!(sanitize(""), "");
    }

    proptest! {
        #[test]
        fn sanitize_is_idempotent(name in "[a-zA-Z0-9 °_]{0,24}") {
            let once = sanitize(&name);
            prop_assert_eq!(sanitize(&once), once.clone());
            prop_assert!(!once.contains(' '));
            prop_assert!(!once.contains('°'));
        }

        #[test]
        fn sanitize_is_idempotent_on_any_text(name in "\\PC*") {
            let once = sanitize(&name);
            prop_assert_eq!(sanitize(&once), once);
        }
    }
}
