//! Identity of a participant in a layer ordering.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::category::OrderCategory;

/// Identifies a thing being ordered: `(family, category, id)`.
///
/// Equality and hashing use the whole triple; the category contributes only
/// its id (see [`OrderCategory`]).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OrderParticipantKey {
    family: String,
    category: OrderCategory,
    id: String,
}

impl OrderParticipantKey {
    #[must_use]
    pub fn new(family: impl Into<String>, category: OrderCategory, id: impl Into<String>) -> Self {
        Self {
            family: family.into(),
            category,
            id: id.into(),
        }
    }

    #[must_use]
    pub fn family(&self) -> &str {
        &self.family
    }

    #[must_use]
    pub fn category(&self) -> &OrderCategory {
        &self.category
    }

    /// Participant id, unique within its family and category.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Whether this key belongs to the ordering domain `(family, category)`.
    #[must_use]
    pub fn belongs_to(&self, family: &str, category: &OrderCategory) -> bool {
        self.family == family && &self.category == category
    }
}

impl fmt::Display for OrderParticipantKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.family, self.category.id(), self.id)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    #[test]
    fn identity_is_the_full_triple() {
        let a = OrderParticipantKey::new("Image Layers", OrderCategory::IMAGE_DATA, "osm");
        let same = OrderParticipantKey::new(
            "Image Layers",
            OrderCategory::new("Image Data", 0, 1),
            "osm",
        );
        let other_family =
            OrderParticipantKey::new("Feature Layers", OrderCategory::IMAGE_DATA, "osm");
        let other_category =
            OrderParticipantKey::new("Image Layers", OrderCategory::IMAGE_OVERLAY, "osm");

        assert_eq!(a, same);
        assert_ne!(a, other_family);
        assert_ne!(a, other_category);

        let mut orders = HashMap::new();
        orders.insert(a, 7);
        assert_eq!(orders.get(&same), Some(&7));
        assert_eq!(orders.get(&other_family), None);
    }

    #[test]
    fn belongs_to_checks_family_and_category() {
        let key = OrderParticipantKey::new("Feature Layers", OrderCategory::FEATURE, "roads");
        assert!(key.belongs_to("Feature Layers", &OrderCategory::FEATURE));
        assert!(!key.belongs_to("Image Layers", &OrderCategory::FEATURE));
        assert!(!key.belongs_to("Feature Layers", &OrderCategory::FEATURE_ANNOTATION));
    }

    #[test]
    fn display_joins_parts() {
        let key = OrderParticipantKey::new("Test", OrderCategory::new("Cat", 0, 4), "A");
        assert_eq!(key.to_string(), "Test/Cat/A");
    }
}
