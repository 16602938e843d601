//! Order categories: named, bounded ranges of the order-value space.
//!
//! A category describes which integers a class of participants may occupy
//! within a family. Categories in the same family are expected to partition
//! the order space, although overlaps are tolerated (and reported) by the
//! registry.

use std::borrow::Cow;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::RangeInclusive;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Well-known families
// ---------------------------------------------------------------------------

/// Family for terrain/elevation providers.
pub const ELEVATION_FAMILY: &str = "Elevation";

/// Family for tile and imagery layers.
pub const IMAGE_LAYER_FAMILY: &str = "Image Layers";

/// Family for vector feature layers.
pub const FEATURE_LAYER_FAMILY: &str = "Feature Layers";

// ---------------------------------------------------------------------------
// OrderCategory
// ---------------------------------------------------------------------------

/// Named closed interval `[min, max]` of order values.
///
/// Equality and hashing consider only the category id: two categories with
/// the same id are the same category even if their ranges differ.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderCategory {
    id: Cow<'static, str>,
    min: i32,
    max: i32,
}

impl OrderCategory {
    /// Elevation models, drawn beneath everything else.
    pub const EARTH_ELEVATION: Self = Self::new_static("Earth Elevation", 0, 9_999);

    /// Base map imagery.
    pub const IMAGE_BASE_MAP: Self = Self::new_static("Image Base Map", 10_000, 99_999);

    /// Data imagery drawn above the base maps.
    pub const IMAGE_DATA: Self = Self::new_static("Image Data", 100_000, 999_999);

    /// Imagery overlays (grids, labels) drawn above data imagery.
    pub const IMAGE_OVERLAY: Self = Self::new_static("Image Overlay", 1_000_000, 1_999_999);

    /// Vector feature layers.
    pub const FEATURE: Self = Self::new_static("Feature", 2_000_000, 9_999_999);

    /// Annotations and user places, always above feature data.
    pub const FEATURE_ANNOTATION: Self =
        Self::new_static("Feature Annotation", 10_000_000, 10_999_999);

    /// Creates a category with an owned id.
    ///
    /// # Panics
    ///
    /// Panics if `min > max`.
    #[must_use]
    pub fn new(id: impl Into<String>, min: i32, max: i32) -> Self {
        assert!(min <= max, "order range [{min}, {max}] is empty");
        Self {
            id: Cow::Owned(id.into()),
            min,
            max,
        }
    }

    /// Creates a category from a static id, usable in `const` items.
    ///
    /// # Panics
    ///
    /// Panics (at compile time for constants) if `min > max`.
    #[must_use]
    pub const fn new_static(id: &'static str, min: i32, max: i32) -> Self {
        assert!(min <= max, "order range is empty");
        Self {
            id: Cow::Borrowed(id),
            min,
            max,
        }
    }

    /// Stable identity of the category.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Lowest order value a participant may hold.
    #[must_use]
    pub fn min(&self) -> i32 {
        self.min
    }

    /// Highest order value a participant may hold.
    #[must_use]
    pub fn max(&self) -> i32 {
        self.max
    }

    #[must_use]
    pub fn range(&self) -> RangeInclusive<i32> {
        self.min..=self.max
    }

    #[must_use]
    pub fn contains(&self, order: i32) -> bool {
        self.range().contains(&order)
    }

    /// Number of distinct order values in the range.
    ///
    /// A deserialized category whose bounds are inverted has capacity 0.
    #[must_use]
    pub fn capacity(&self) -> usize {
        usize::try_from(i64::from(self.max) - i64::from(self.min) + 1).unwrap_or(0)
    }

    /// Whether the two ranges share at least one order value.
    #[must_use]
    pub fn overlaps(&self, other: &Self) -> bool {
        self.min <= other.max && other.min <= self.max
    }

    /// Whether the two categories cover exactly the same order values.
    #[must_use]
    pub fn same_range(&self, other: &Self) -> bool {
        self.min == other.min && self.max == other.max
    }
}

impl PartialEq for OrderCategory {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for OrderCategory {}

impl Hash for OrderCategory {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Display for OrderCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}, {}]", self.id, self.min, self.max)
    }
}
