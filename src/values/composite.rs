//! Ordered multi-component measurements.

use std::sync::Arc;

use crate::registry::Unit;
use crate::values::Precision;

/// One component of a composite measurement.
#[derive(Debug, Clone, PartialEq)]
pub struct CompositeComponent {
    /// The scalar in this component's unit.
    pub value: f64,
    /// The component's unit.
    pub unit: Arc<Unit>,
    /// Display precision for this component.
    pub precision: Option<Precision>,
}

impl CompositeComponent {
    /// Creates a component without display precision.
    #[inline]
    #[must_use]
    pub fn new(value: f64, unit: Arc<Unit>) -> Self {
        Self {
            value,
            unit,
            precision: None,
        }
    }
}

/// An ordered list of components intended as a single quantity, such as
/// `5 ft 7 in` or `30° 15′ 30″`. Components usually share a dimension,
/// though the data model does not force it; operations that need one
/// dimension check at use.
#[derive(Debug, Clone, PartialEq)]
pub struct CompositeValue {
    /// The components, most significant first.
    pub components: Vec<CompositeComponent>,
}

impl CompositeValue {
    /// Creates a composite from components.
    #[inline]
    #[must_use]
    pub fn new(components: Vec<CompositeComponent>) -> Self {
        Self { components }
    }

    /// The first component's unit, the anchor for flattening.
    #[must_use]
    pub fn leading_unit(&self) -> Option<&Arc<Unit>> {
        self.components.first().map(|c| &c.unit)
    }

    /// Returns true if every component's unit measures `dimension`.
    #[must_use]
    pub fn all_of_dimension(&self, dimension: &str) -> bool {
        self.components.iter().all(|c| c.unit.dimension == dimension)
    }

    /// Negates every component.
    #[must_use]
    pub fn negated(&self) -> Self {
        Self {
            components: self
                .components
                .iter()
                .map(|c| CompositeComponent {
                    value: -c.value,
                    unit: c.unit.clone(),
                    precision: c.precision,
                })
                .collect(),
        }
    }
}
