// SYNOID Quantum Aggregate Metrics
// Copyright (c) 2026 Xing_The_Creator | SYNOID
//
// Derived metrics ("awareness", "coherence", "stability", ...) are weighted
// sums over entity attributes, clamped to the metric's range. They are
// recomputed on every call and never stored.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::engine::entity::{Bound, EntityKind};
use crate::engine::store::BoundedStateStore;
use crate::error::{StateError, StateResult};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricComponent {
    pub entity: String,
    pub attribute: String,
    pub weight: f64,
}

impl MetricComponent {
    pub fn new(entity: &str, attribute: &str, weight: f64) -> Self {
        Self {
            entity: entity.to_string(),
            attribute: attribute.to_string(),
            weight,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricSpec {
    pub name: String,
    pub components: Vec<MetricComponent>,
    #[serde(default)]
    pub range: Bound,
}

impl MetricSpec {
    pub fn weighted(name: &str, components: Vec<MetricComponent>) -> Self {
        Self {
            name: name.to_string(),
            components,
            range: Bound::UNIT,
        }
    }

    /// Equal weights of `1/n` over the given `(entity, attribute)` pairs.
    pub fn average(name: &str, refs: &[(&str, &str)]) -> Self {
        let weight = if refs.is_empty() { 0.0 } else { 1.0 / refs.len() as f64 };
        let components = refs
            .iter()
            .map(|(entity, attribute)| MetricComponent::new(entity, attribute, weight))
            .collect();
        Self::weighted(name, components)
    }

    pub fn with_range(mut self, range: Bound) -> Self {
        self.range = range;
        self
    }
}

/// Stateless evaluator for [`MetricSpec`]s.
#[derive(Debug, Clone, Copy, Default)]
pub struct AggregateMetricCalculator;

impl AggregateMetricCalculator {
    pub fn new() -> Self {
        Self
    }

    /// Weighted sum of the referenced attributes, clamped to the spec's
    /// range. A missing entity or attribute is an error, never skipped.
    pub fn compute<K: EntityKind>(
        &self,
        store: &BoundedStateStore<K>,
        spec: &MetricSpec,
    ) -> StateResult<f64> {
        let mut total = 0.0;
        for component in &spec.components {
            if !component.weight.is_finite() {
                return Err(StateError::invalid(
                    &spec.name,
                    format!("weight for {}.{} is not finite", component.entity, component.attribute),
                ));
            }
            let value = store.get(&component.entity)?.value(&component.attribute)?;
            total += component.weight * value;
        }
        Ok(spec.range.clamp(total))
    }

    /// Check that every reference in `spec` resolves against `store`.
    pub fn validate<K: EntityKind>(
        &self,
        store: &BoundedStateStore<K>,
        spec: &MetricSpec,
    ) -> StateResult<()> {
        self.compute(store, spec).map(|_| ())
    }

    pub fn compute_all<K: EntityKind>(
        &self,
        store: &BoundedStateStore<K>,
        specs: &[MetricSpec],
    ) -> StateResult<BTreeMap<String, f64>> {
        specs
            .iter()
            .map(|spec| self.compute(store, spec).map(|value| (spec.name.clone(), value)))
            .collect()
    }
}
