// SYNOID Quantum Operation Dispatcher
// Copyright (c) 2026 Xing_The_Creator | SYNOID
//
// Named operations over a store: generate, transform, stabilize, amplify
// and distribute, plus any caller-registered handlers. Each operation
// checks all of its preconditions before writing anything, so a failed
// call leaves the store exactly as it found it.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;
use tracing::{debug, warn};

use crate::engine::entity::{Attribute, Bound, EntityKind};
use crate::engine::metrics::{AggregateMetricCalculator, MetricSpec};
use crate::engine::store::BoundedStateStore;
use crate::error::{StateError, StateResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationKind {
    Generate,
    Transform,
    Stabilize,
    Amplify,
    Distribute,
}

impl OperationKind {
    pub const ALL: [OperationKind; 5] = [
        OperationKind::Generate,
        OperationKind::Transform,
        OperationKind::Stabilize,
        OperationKind::Amplify,
        OperationKind::Distribute,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OperationKind::Generate => "generate",
            OperationKind::Transform => "transform",
            OperationKind::Stabilize => "stabilize",
            OperationKind::Amplify => "amplify",
            OperationKind::Distribute => "distribute",
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OperationKind {
    type Err = StateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OperationKind::ALL
            .into_iter()
            .find(|k| k.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| StateError::UnknownOperation(s.to_string()))
    }
}

/// A fully-typed built-in operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum OperationRequest {
    /// Add `amount * efficiency` to `attribute`.
    Generate {
        entity: String,
        attribute: String,
        amount: f64,
        efficiency: f64,
    },
    /// Move `amount` out of `source`; `amount * efficiency` lands in `target`.
    Transform {
        entity: String,
        source: String,
        target: String,
        amount: f64,
        efficiency: f64,
    },
    /// Move `attribute` a fraction `step` of the way toward `target`.
    Stabilize {
        entity: String,
        attribute: String,
        target: f64,
        step: f64,
    },
    /// Multiply `attribute` by `factor`.
    Amplify {
        entity: String,
        attribute: String,
        factor: f64,
    },
    /// Move `amount` out of `source` and split `amount * efficiency`
    /// evenly into `attribute` on every entity in `targets`.
    Distribute {
        entity: String,
        source: String,
        targets: Vec<String>,
        attribute: String,
        amount: f64,
        efficiency: f64,
    },
}

impl OperationRequest {
    pub fn kind(&self) -> OperationKind {
        match self {
            OperationRequest::Generate { .. } => OperationKind::Generate,
            OperationRequest::Transform { .. } => OperationKind::Transform,
            OperationRequest::Stabilize { .. } => OperationKind::Stabilize,
            OperationRequest::Amplify { .. } => OperationKind::Amplify,
            OperationRequest::Distribute { .. } => OperationKind::Distribute,
        }
    }

    pub fn entity(&self) -> &str {
        match self {
            OperationRequest::Generate { entity, .. }
            | OperationRequest::Transform { entity, .. }
            | OperationRequest::Stabilize { entity, .. }
            | OperationRequest::Amplify { entity, .. }
            | OperationRequest::Distribute { entity, .. } => entity,
        }
    }

    /// Parse the loosely-typed parameter object accepted by
    /// [`OperationDispatcher::execute`].
    pub fn from_params(kind: OperationKind, params: &Value) -> StateResult<Self> {
        let p = Params::new(params)?;
        let entity = p.string("entity")?;
        let request = match kind {
            OperationKind::Generate => OperationRequest::Generate {
                entity,
                attribute: p.string("attr")?,
                amount: p.number("amount")?,
                efficiency: p.number_or("efficiency", 1.0)?,
            },
            OperationKind::Transform => OperationRequest::Transform {
                entity,
                source: p.string("source")?,
                target: p.string("target")?,
                amount: p.number("amount")?,
                efficiency: p.number_or("efficiency", 1.0)?,
            },
            OperationKind::Stabilize => OperationRequest::Stabilize {
                entity,
                attribute: p.string("attr")?,
                target: p.number("target")?,
                step: p.number_or("step", 0.1)?,
            },
            OperationKind::Amplify => OperationRequest::Amplify {
                entity,
                attribute: p.string("attr")?,
                factor: p.number("factor")?,
            },
            OperationKind::Distribute => OperationRequest::Distribute {
                entity,
                source: p.string("source")?,
                targets: p.strings("targets")?,
                attribute: p.string("attr")?,
                amount: p.number("amount")?,
                efficiency: p.number_or("efficiency", 1.0)?,
            },
        };
        Ok(request)
    }
}

struct Params<'a>(&'a Map<String, Value>);

impl<'a> Params<'a> {
    fn new(value: &'a Value) -> StateResult<Self> {
        value
            .as_object()
            .map(Params)
            .ok_or_else(|| StateError::invalid("parameters", "expected a JSON object"))
    }

    fn string(&self, name: &str) -> StateResult<String> {
        match self.0.get(name) {
            Some(Value::String(s)) if !s.is_empty() => Ok(s.clone()),
            Some(_) => Err(StateError::invalid(name, "expected a non-empty string")),
            None => Err(StateError::invalid(name, "missing")),
        }
    }

    fn number(&self, name: &str) -> StateResult<f64> {
        match self.0.get(name) {
            Some(v) => v
                .as_f64()
                .ok_or_else(|| StateError::invalid(name, format!("expected a number, got {}", v))),
            None => Err(StateError::invalid(name, "missing")),
        }
    }

    fn number_or(&self, name: &str, default: f64) -> StateResult<f64> {
        if self.0.contains_key(name) {
            self.number(name)
        } else {
            Ok(default)
        }
    }

    fn strings(&self, name: &str) -> StateResult<Vec<String>> {
        let items = self
            .0
            .get(name)
            .and_then(Value::as_array)
            .ok_or_else(|| StateError::invalid(name, "expected an array of entity ids"))?;
        items
            .iter()
            .map(|v| {
                v.as_str()
                    .map(str::to_string)
                    .ok_or_else(|| StateError::invalid(name, format!("{} is not a string", v)))
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeDelta {
    pub entity: String,
    pub attribute: String,
    pub before: f64,
    pub after: f64,
}

impl AttributeDelta {
    pub fn change(&self) -> f64 {
        self.after - self.before
    }
}

/// What an operation did to the store, before metrics are attached.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct OperationOutcome {
    pub deltas: Vec<AttributeDelta>,
    /// Net quantity delivered to the target attribute(s).
    pub generated: f64,
    /// Quantity consumed but not delivered.
    pub loss: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationResult {
    pub operation: String,
    pub entity: String,
    pub deltas: Vec<AttributeDelta>,
    pub generated: f64,
    pub loss: f64,
    /// Derived metrics computed right after the mutation.
    pub metrics: BTreeMap<String, f64>,
}

impl OperationResult {
    pub fn delta(&self, entity: &str, attribute: &str) -> Option<&AttributeDelta> {
        self.deltas
            .iter()
            .find(|d| d.entity == entity && d.attribute == attribute)
    }
}

/// Handler for an operation registered at runtime.
pub type CustomOperation<K> =
    Box<dyn Fn(&mut BoundedStateStore<K>, &Value) -> StateResult<OperationOutcome> + Send + Sync>;

pub struct OperationDispatcher<K> {
    metrics: Vec<MetricSpec>,
    calculator: AggregateMetricCalculator,
    custom: HashMap<String, CustomOperation<K>>,
}

impl<K: EntityKind> Default for OperationDispatcher<K> {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl<K: EntityKind> OperationDispatcher<K> {
    /// `metrics` are snapshotted into every successful result.
    pub fn new(metrics: Vec<MetricSpec>) -> Self {
        Self {
            metrics,
            calculator: AggregateMetricCalculator::new(),
            custom: HashMap::new(),
        }
    }

    pub fn metrics(&self) -> &[MetricSpec] {
        &self.metrics
    }

    /// Names accepted by [`execute`](Self::execute), built-ins first.
    pub fn operations(&self) -> Vec<String> {
        let mut custom: Vec<String> = self.custom.keys().cloned().collect();
        custom.sort();
        OperationKind::ALL
            .iter()
            .map(|k| k.as_str().to_string())
            .chain(custom)
            .collect()
    }

    pub fn register<F>(&mut self, name: &str, handler: F) -> StateResult<()>
    where
        F: Fn(&mut BoundedStateStore<K>, &Value) -> StateResult<OperationOutcome>
            + Send
            + Sync
            + 'static,
    {
        let key = name.trim().to_ascii_lowercase();
        if key.is_empty() {
            return Err(StateError::invalid("operation", "name must not be empty"));
        }
        if OperationKind::from_str(&key).is_ok() || self.custom.contains_key(&key) {
            return Err(StateError::invalid(
                "operation",
                format!("'{}' is already registered", key),
            ));
        }
        self.custom.insert(key, Box::new(handler));
        Ok(())
    }

    /// Run the operation called `name` with a JSON parameter object.
    pub fn execute(
        &self,
        store: &mut BoundedStateStore<K>,
        name: &str,
        params: &Value,
    ) -> StateResult<OperationResult> {
        let key = name.trim().to_ascii_lowercase();
        let result = match self.custom.get(&key) {
            Some(handler) => self.execute_custom(store, &key, handler, params),
            None => OperationKind::from_str(&key)
                .and_then(|kind| OperationRequest::from_params(kind, params))
                .and_then(|request| self.execute_request(store, &request)),
        };
        if let Err(e) = &result {
            warn!("[DISPATCH] ⚠️ '{}' rejected: {}", name, e);
        }
        result
    }

    fn execute_custom(
        &self,
        store: &mut BoundedStateStore<K>,
        name: &str,
        handler: &CustomOperation<K>,
        params: &Value,
    ) -> StateResult<OperationResult> {
        self.validate_metrics(store)?;
        let outcome = handler(store, params)?;
        let entity = params
            .get("entity")
            .and_then(Value::as_str)
            .unwrap_or_default();
        self.finish(store, name, entity, outcome)
    }

    /// Run an already-typed built-in operation.
    pub fn execute_request(
        &self,
        store: &mut BoundedStateStore<K>,
        request: &OperationRequest,
    ) -> StateResult<OperationResult> {
        self.validate_metrics(store)?;
        let outcome = match request {
            OperationRequest::Generate {
                entity,
                attribute,
                amount,
                efficiency,
            } => generate(store, entity, attribute, *amount, *efficiency)?,
            OperationRequest::Transform {
                entity,
                source,
                target,
                amount,
                efficiency,
            } => transform(store, entity, source, target, *amount, *efficiency)?,
            OperationRequest::Stabilize {
                entity,
                attribute,
                target,
                step,
            } => stabilize(store, entity, attribute, *target, *step)?,
            OperationRequest::Amplify {
                entity,
                attribute,
                factor,
            } => amplify(store, entity, attribute, *factor)?,
            OperationRequest::Distribute {
                entity,
                source,
                targets,
                attribute,
                amount,
                efficiency,
            } => distribute(store, entity, source, targets, attribute, *amount, *efficiency)?,
        };
        self.finish(store, request.kind().as_str(), request.entity(), outcome)
    }

    // Entities are never removed by operations, so metrics that resolve
    // before the mutation still resolve after it.
    fn validate_metrics(&self, store: &BoundedStateStore<K>) -> StateResult<()> {
        for spec in &self.metrics {
            self.calculator.validate(store, spec)?;
        }
        Ok(())
    }

    fn finish(
        &self,
        store: &BoundedStateStore<K>,
        operation: &str,
        entity: &str,
        outcome: OperationOutcome,
    ) -> StateResult<OperationResult> {
        let metrics = self.calculator.compute_all(store, &self.metrics)?;
        debug!(
            "[DISPATCH] {} on '{}': generated {:.4}, loss {:.4}",
            operation, entity, outcome.generated, outcome.loss
        );
        Ok(OperationResult {
            operation: operation.to_string(),
            entity: entity.to_string(),
            deltas: outcome.deltas,
            generated: outcome.generated,
            loss: outcome.loss,
            metrics,
        })
    }
}

fn check_amount(amount: f64) -> StateResult<()> {
    if amount.is_finite() && amount > 0.0 {
        Ok(())
    } else {
        Err(StateError::invalid("amount", format!("expected a positive number, got {}", amount)))
    }
}

fn check_efficiency(efficiency: f64) -> StateResult<()> {
    if efficiency.is_finite() && efficiency > 0.0 && efficiency <= 1.0 {
        Ok(())
    } else {
        Err(StateError::invalid(
            "efficiency",
            format!("expected a value in (0, 1], got {}", efficiency),
        ))
    }
}

fn capacity_exceeded(entity: &str, attribute: &str, attempted: f64, bound: Bound) -> StateError {
    StateError::CapacityExceeded {
        entity: entity.to_string(),
        attribute: attribute.to_string(),
        attempted,
        capacity: bound.upper(),
    }
}

fn generate<K: EntityKind>(
    store: &mut BoundedStateStore<K>,
    entity_id: &str,
    attribute: &str,
    amount: f64,
    efficiency: f64,
) -> StateResult<OperationOutcome> {
    check_amount(amount)?;
    check_efficiency(efficiency)?;

    let entity = store.get_mut(entity_id)?;
    let attr = entity.attribute_mut(attribute)?;
    let before = attr.value();
    let generated = amount * efficiency;
    let after = before + generated;
    if after > attr.bound.upper() {
        return Err(capacity_exceeded(entity_id, attribute, after, attr.bound));
    }
    let after = attr.set(after);
    entity.active = true;

    Ok(OperationOutcome {
        deltas: vec![AttributeDelta {
            entity: entity_id.to_string(),
            attribute: attribute.to_string(),
            before,
            after,
        }],
        generated,
        loss: amount * (1.0 - efficiency),
    })
}

fn transform<K: EntityKind>(
    store: &mut BoundedStateStore<K>,
    entity_id: &str,
    source: &str,
    target: &str,
    amount: f64,
    efficiency: f64,
) -> StateResult<OperationOutcome> {
    check_amount(amount)?;
    check_efficiency(efficiency)?;
    if source == target {
        return Err(StateError::invalid("target", "source and target must differ"));
    }

    let entity = store.get_mut(entity_id)?;
    let src = entity.attribute(source)?.clone();
    let available = src.value() - src.bound.lower();
    if amount > available {
        return Err(StateError::InsufficientResource {
            entity: entity_id.to_string(),
            attribute: source.to_string(),
            requested: amount,
            available,
        });
    }

    let generated = amount * efficiency;
    let (target_before, target_bound) = match entity.attributes.get(target) {
        Some(attr) => (attr.value(), attr.bound),
        None => (0.0, Bound::capacity(src.bound.upper())?),
    };
    let target_after = target_before + generated;
    if target_after > target_bound.upper() {
        return Err(capacity_exceeded(entity_id, target, target_after, target_bound));
    }

    let source_after = entity.attribute_mut(source)?.set(src.value() - amount);
    let target_after = entity
        .attributes
        .entry(target.to_string())
        .or_insert_with(|| Attribute::new(0.0, target_bound, false))
        .set(target_after);
    entity.active = true;

    Ok(OperationOutcome {
        deltas: vec![
            AttributeDelta {
                entity: entity_id.to_string(),
                attribute: source.to_string(),
                before: src.value(),
                after: source_after,
            },
            AttributeDelta {
                entity: entity_id.to_string(),
                attribute: target.to_string(),
                before: target_before,
                after: target_after,
            },
        ],
        generated,
        loss: amount * (1.0 - efficiency),
    })
}

fn stabilize<K: EntityKind>(
    store: &mut BoundedStateStore<K>,
    entity_id: &str,
    attribute: &str,
    target: f64,
    step: f64,
) -> StateResult<OperationOutcome> {
    if !target.is_finite() {
        return Err(StateError::invalid("target", "must be finite"));
    }
    if !(0.0..=1.0).contains(&step) {
        return Err(StateError::invalid("step", format!("expected a value in [0, 1], got {}", step)));
    }

    let entity = store.get_mut(entity_id)?;
    let attr = entity.attribute_mut(attribute)?;
    let before = attr.value();
    let goal = attr.bound.clamp(target);
    let after = attr.set(before + (goal - before) * step);
    entity.active = true;

    Ok(OperationOutcome {
        deltas: vec![AttributeDelta {
            entity: entity_id.to_string(),
            attribute: attribute.to_string(),
            before,
            after,
        }],
        generated: 0.0,
        loss: 0.0,
    })
}

fn amplify<K: EntityKind>(
    store: &mut BoundedStateStore<K>,
    entity_id: &str,
    attribute: &str,
    factor: f64,
) -> StateResult<OperationOutcome> {
    if !factor.is_finite() || factor < 0.0 {
        return Err(StateError::invalid("factor", format!("expected a non-negative number, got {}", factor)));
    }

    let entity = store.get_mut(entity_id)?;
    let attr = entity.attribute_mut(attribute)?;
    let before = attr.value();
    let amplified = before * factor;
    if amplified > attr.bound.upper() {
        return Err(capacity_exceeded(entity_id, attribute, amplified, attr.bound));
    }
    let after = attr.set(amplified);
    entity.active = true;

    Ok(OperationOutcome {
        deltas: vec![AttributeDelta {
            entity: entity_id.to_string(),
            attribute: attribute.to_string(),
            before,
            after,
        }],
        generated: after - before,
        loss: 0.0,
    })
}

fn distribute<K: EntityKind>(
    store: &mut BoundedStateStore<K>,
    entity_id: &str,
    source: &str,
    targets: &[String],
    attribute: &str,
    amount: f64,
    efficiency: f64,
) -> StateResult<OperationOutcome> {
    check_amount(amount)?;
    check_efficiency(efficiency)?;
    if targets.is_empty() {
        return Err(StateError::invalid("targets", "at least one target is required"));
    }
    for (i, target) in targets.iter().enumerate() {
        if targets[..i].contains(target) {
            return Err(StateError::invalid("targets", format!("'{}' listed twice", target)));
        }
        if target == entity_id && attribute == source {
            return Err(StateError::invalid("targets", "cannot distribute into the source itself"));
        }
    }

    let src = store.get(entity_id)?.attribute(source)?.clone();
    let available = src.value() - src.bound.lower();
    if amount > available {
        return Err(StateError::InsufficientResource {
            entity: entity_id.to_string(),
            attribute: source.to_string(),
            requested: amount,
            available,
        });
    }

    let generated = amount * efficiency;
    let share = generated / targets.len() as f64;
    let mut planned = Vec::with_capacity(targets.len());
    for target in targets {
        let entity = store.get(target)?;
        let (before, bound) = match entity.attributes.get(attribute) {
            Some(attr) => (attr.value(), attr.bound),
            None => (0.0, Bound::capacity(src.bound.upper())?),
        };
        if before + share > bound.upper() {
            return Err(capacity_exceeded(target, attribute, before + share, bound));
        }
        planned.push((target.clone(), before, bound));
    }

    let mut deltas = Vec::with_capacity(targets.len() + 1);
    let source_entity = store.get_mut(entity_id)?;
    let source_after = source_entity.attribute_mut(source)?.set(src.value() - amount);
    source_entity.active = true;
    deltas.push(AttributeDelta {
        entity: entity_id.to_string(),
        attribute: source.to_string(),
        before: src.value(),
        after: source_after,
    });

    for (target, before, bound) in planned {
        let entity = store.get_mut(&target)?;
        let after = entity
            .attributes
            .entry(attribute.to_string())
            .or_insert_with(|| Attribute::new(0.0, bound, false))
            .set(before + share);
        entity.active = true;
        deltas.push(AttributeDelta {
            entity: target,
            attribute: attribute.to_string(),
            before,
            after,
        });
    }

    Ok(OperationOutcome {
        deltas,
        generated,
        loss: amount * (1.0 - efficiency),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::entity::attributes;
    use crate::error::ErrorKind;
    use serde_json::json;

    fn battery(energy: f64) -> BoundedStateStore<String> {
        let mut store = BoundedStateStore::new();
        store
            .create(
                "battery",
                "battery".to_string(),
                attributes([("energy", Attribute::reservoir(energy, 10_000.0).unwrap())]),
            )
            .unwrap();
        store
    }

    #[test]
    fn test_operation_names_parse() {
        assert_eq!("Generate".parse::<OperationKind>().unwrap(), OperationKind::Generate);
        assert_eq!(
            "teleport".parse::<OperationKind>().unwrap_err().kind(),
            ErrorKind::NotFound
        );
    }

    #[test]
    fn test_generate_adds_efficient_share() {
        let mut store = battery(1000.0);
        let dispatcher = OperationDispatcher::default();
        let result = dispatcher
            .execute(
                &mut store,
                "generate",
                &json!({"entity": "battery", "attr": "energy", "amount": 500, "efficiency": 0.9}),
            )
            .unwrap();
        assert_eq!(store.get("battery").unwrap().value("energy").unwrap(), 1450.0);
        assert_eq!(result.generated, 450.0);
        assert!((result.loss - 50.0).abs() < 1e-9);
        assert!(store.get("battery").unwrap().active);
    }

    #[test]
    fn test_generate_over_capacity_is_rejected() {
        let mut store = battery(9_900.0);
        let dispatcher = OperationDispatcher::default();
        let err = dispatcher
            .execute(&mut store, "generate", &json!({"entity": "battery", "attr": "energy", "amount": 200}))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::CapacityExceeded);
        let entity = store.get("battery").unwrap();
        assert_eq!(entity.value("energy").unwrap(), 9_900.0);
        assert!(!entity.active);
    }

    #[test]
    fn test_transform_creates_target_lazily() {
        let mut store = battery(1000.0);
        let dispatcher = OperationDispatcher::default();
        let result = dispatcher
            .execute(
                &mut store,
                "transform",
                &json!({"entity": "battery", "source": "energy", "target": "heat", "amount": 200, "efficiency": 0.8}),
            )
            .unwrap();
        let entity = store.get("battery").unwrap();
        assert_eq!(entity.value("energy").unwrap(), 800.0);
        assert_eq!(entity.value("heat").unwrap(), 160.0);
        assert_eq!(entity.attribute("heat").unwrap().bound.upper(), 10_000.0);
        assert!((result.loss - 40.0).abs() < 1e-9);
        assert_eq!(result.delta("battery", "energy").unwrap().change(), -200.0);
    }

    #[test]
    fn test_transform_insufficient() {
        let mut store = battery(50.0);
        let dispatcher = OperationDispatcher::default();
        let err = dispatcher
            .execute(
                &mut store,
                "transform",
                &json!({"entity": "battery", "source": "energy", "target": "heat", "amount": 100, "efficiency": 0.5}),
            )
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InsufficientResource);
        assert_eq!(store.get("battery").unwrap().value("energy").unwrap(), 50.0);
        assert!(store.get("battery").unwrap().attribute("heat").is_err());
    }

    #[test]
    fn test_stabilize_moves_toward_target() {
        let mut store: BoundedStateStore<String> = BoundedStateStore::new();
        store
            .create("field", "field".to_string(), attributes([("coherence", Attribute::unit(0.2))]))
            .unwrap();
        let dispatcher = OperationDispatcher::default();
        dispatcher
            .execute(&mut store, "stabilize", &json!({"entity": "field", "attr": "coherence", "target": 1.0, "step": 0.5}))
            .unwrap();
        assert!((store.get("field").unwrap().value("coherence").unwrap() - 0.6).abs() < 1e-12);

        // Out-of-range targets are pulled into the bound first.
        dispatcher
            .execute(&mut store, "stabilize", &json!({"entity": "field", "attr": "coherence", "target": 7.0, "step": 1.0}))
            .unwrap();
        assert_eq!(store.get("field").unwrap().value("coherence").unwrap(), 1.0);
    }

    #[test]
    fn test_amplify_capacity() {
        let mut store = battery(4_000.0);
        let dispatcher = OperationDispatcher::default();
        let err = dispatcher
            .execute(&mut store, "amplify", &json!({"entity": "battery", "attr": "energy", "factor": 3}))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::CapacityExceeded);
        assert_eq!(store.get("battery").unwrap().value("energy").unwrap(), 4_000.0);

        let ok = dispatcher
            .execute(&mut store, "amplify", &json!({"entity": "battery", "attr": "energy", "factor": 2.5}))
            .unwrap();
        assert_eq!(ok.generated, 6_000.0);
    }

    #[test]
    fn test_distribute_splits_evenly() {
        let mut store = battery(1000.0);
        for id in ["cell_a", "cell_b"] {
            store
                .create(id, "cell".to_string(), attributes([("charge", Attribute::reservoir(0.0, 500.0).unwrap())]))
                .unwrap();
        }
        let dispatcher = OperationDispatcher::default();
        let result = dispatcher
            .execute(
                &mut store,
                "distribute",
                &json!({"entity": "battery", "source": "energy", "targets": ["cell_a", "cell_b"], "attr": "charge", "amount": 400, "efficiency": 0.5}),
            )
            .unwrap();
        assert_eq!(store.get("battery").unwrap().value("energy").unwrap(), 600.0);
        assert_eq!(store.get("cell_a").unwrap().value("charge").unwrap(), 100.0);
        assert_eq!(store.get("cell_b").unwrap().value("charge").unwrap(), 100.0);
        assert_eq!(result.deltas.len(), 3);
        assert!(store.get("cell_b").unwrap().active);
    }

    #[test]
    fn test_distribute_is_all_or_nothing() {
        let mut store = battery(1000.0);
        store
            .create("cell_a", "cell".to_string(), attributes([("charge", Attribute::reservoir(0.0, 500.0).unwrap())]))
            .unwrap();
        store
            .create("cell_b", "cell".to_string(), attributes([("charge", Attribute::reservoir(450.0, 500.0).unwrap())]))
            .unwrap();
        let dispatcher = OperationDispatcher::default();
        let err = dispatcher
            .execute(
                &mut store,
                "distribute",
                &json!({"entity": "battery", "source": "energy", "targets": ["cell_a", "cell_b"], "attr": "charge", "amount": 200}),
            )
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::CapacityExceeded);
        assert_eq!(store.get("battery").unwrap().value("energy").unwrap(), 1000.0);
        assert_eq!(store.get("cell_a").unwrap().value("charge").unwrap(), 0.0);
    }

    #[test]
    fn test_malformed_parameters() {
        let mut store = battery(1000.0);
        let dispatcher = OperationDispatcher::default();
        let cases = [
            json!({"entity": "battery", "attr": "energy", "amount": "lots"}),
            json!({"entity": "battery", "attr": "energy", "amount": 10, "efficiency": 1.5}),
            json!({"entity": "battery", "attr": "energy", "amount": -10}),
            json!({"attr": "energy", "amount": 10}),
            json!([1, 2, 3]),
        ];
        for params in cases {
            let err = dispatcher.execute(&mut store, "generate", &params).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidParameter, "{}", params);
        }
    }

    #[test]
    fn test_unknown_entity_and_operation() {
        let mut store = battery(1000.0);
        let dispatcher = OperationDispatcher::default();
        let err = dispatcher
            .execute(&mut store, "generate", &json!({"entity": "ghost", "attr": "energy", "amount": 1}))
            .unwrap_err();
        assert_eq!(err, StateError::UnknownEntity("ghost".into()));
        let err = dispatcher.execute(&mut store, "warp", &json!({})).unwrap_err();
        assert_eq!(err, StateError::UnknownOperation("warp".into()));
    }

    #[test]
    fn test_custom_operation() {
        let mut store = battery(1000.0);
        let mut dispatcher = OperationDispatcher::new(vec![MetricSpec::weighted(
            "charge",
            vec![crate::engine::metrics::MetricComponent::new("battery", "energy", 0.0001)],
        )]);
        dispatcher
            .register("drain", |store: &mut BoundedStateStore<String>, _params: &Value| {
                let before = store.get("battery")?.value("energy")?;
                let after = store.set_attribute("battery", "energy", 0.0)?;
                Ok(OperationOutcome {
                    deltas: vec![AttributeDelta {
                        entity: "battery".into(),
                        attribute: "energy".into(),
                        before,
                        after,
                    }],
                    generated: 0.0,
                    loss: before,
                })
            })
            .unwrap();
        assert!(dispatcher.register("generate", |_: &mut BoundedStateStore<String>, _: &Value| Ok(OperationOutcome::default())).is_err());
        assert!(dispatcher.operations().contains(&"drain".to_string()));

        let result = dispatcher.execute(&mut store, "drain", &json!({"entity": "battery"})).unwrap();
        assert_eq!(result.loss, 1000.0);
        assert_eq!(result.metrics["charge"], 0.0);
    }
}
