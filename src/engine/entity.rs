// SYNOID Quantum Entities
// Copyright (c) 2026 Xing_The_Creator | SYNOID
//
// An entity is a named bag of bounded numeric attributes: the common
// shape behind every "field", "chamber", "reactor" and "qubit".

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Debug;

use crate::error::{StateError, StateResult};

/// Closed numeric range an attribute is clamped into. Always finite with
/// `lower <= upper`, including when deserialized.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawBound")]
pub struct Bound {
    lower: f64,
    upper: f64,
}

#[derive(Deserialize)]
struct RawBound {
    lower: f64,
    upper: f64,
}

impl TryFrom<RawBound> for Bound {
    type Error = StateError;

    fn try_from(raw: RawBound) -> StateResult<Self> {
        Bound::new(raw.lower, raw.upper)
    }
}

impl Bound {
    /// The `[0, 1]` range most attributes live in.
    pub const UNIT: Bound = Bound {
        lower: 0.0,
        upper: 1.0,
    };

    pub fn new(lower: f64, upper: f64) -> StateResult<Self> {
        if !lower.is_finite() || !upper.is_finite() {
            return Err(StateError::invalid("bound", "limits must be finite"));
        }
        if lower > upper {
            return Err(StateError::invalid(
                "bound",
                format!("lower {} is above upper {}", lower, upper),
            ));
        }
        Ok(Self { lower, upper })
    }

    /// `[0, capacity]`, the other range the simulations use.
    pub fn capacity(capacity: f64) -> StateResult<Self> {
        Self::new(0.0, capacity)
    }

    pub fn lower(&self) -> f64 {
        self.lower
    }

    pub fn upper(&self) -> f64 {
        self.upper
    }

    pub fn clamp(&self, value: f64) -> f64 {
        value.clamp(self.lower, self.upper)
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.lower && value <= self.upper
    }
}

impl Default for Bound {
    fn default() -> Self {
        Bound::UNIT
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawAttribute")]
pub struct Attribute {
    value: f64,
    pub bound: Bound,
    /// Whether the random walk is allowed to move this attribute.
    pub evolvable: bool,
}

#[derive(Deserialize)]
struct RawAttribute {
    value: f64,
    #[serde(default)]
    bound: Bound,
    #[serde(default)]
    evolvable: bool,
}

impl From<RawAttribute> for Attribute {
    fn from(raw: RawAttribute) -> Self {
        Attribute::new(raw.value, raw.bound, raw.evolvable)
    }
}

impl Attribute {
    /// Builds an attribute, clamping the initial value into `bound`.
    pub fn new(value: f64, bound: Bound, evolvable: bool) -> Self {
        let value = if value.is_finite() { bound.clamp(value) } else { bound.lower };
        Self {
            value,
            bound,
            evolvable,
        }
    }

    /// Unit-bounded, evolvable attribute.
    pub fn unit(value: f64) -> Self {
        Self::new(value, Bound::UNIT, true)
    }

    /// `[0, capacity]` attribute that only operations move.
    pub fn reservoir(value: f64, capacity: f64) -> StateResult<Self> {
        Ok(Self::new(value, Bound::capacity(capacity)?, false))
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    /// Clamps and stores; returns the value actually kept.
    pub fn set(&mut self, value: f64) -> f64 {
        self.value = self.bound.clamp(value);
        self.value
    }
}

/// Tag describing what flavor of subsystem an entity belongs to.
pub trait EntityKind: Clone + Debug + PartialEq + Send + Sync + 'static {
    fn label(&self) -> &str;
}

impl EntityKind for String {
    fn label(&self) -> &str {
        self.as_str()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity<K> {
    pub id: String,
    pub name: String,
    pub kind: K,
    pub attributes: BTreeMap<String, Attribute>,
    pub active: bool,
}

impl<K: EntityKind> Entity<K> {
    pub fn new(id: &str, kind: K, attributes: BTreeMap<String, Attribute>) -> Self {
        Self {
            id: id.to_string(),
            name: id.replace('_', " "),
            kind,
            attributes,
            active: false,
        }
    }

    pub fn attribute(&self, name: &str) -> StateResult<&Attribute> {
        self.attributes
            .get(name)
            .ok_or_else(|| StateError::UnknownAttribute {
                entity: self.id.clone(),
                attribute: name.to_string(),
            })
    }

    pub(crate) fn attribute_mut(&mut self, name: &str) -> StateResult<&mut Attribute> {
        let id = &self.id;
        self.attributes
            .get_mut(name)
            .ok_or_else(|| StateError::UnknownAttribute {
                entity: id.clone(),
                attribute: name.to_string(),
            })
    }

    /// Shorthand for `attribute(name)?.value()`.
    pub fn value(&self, name: &str) -> StateResult<f64> {
        self.attribute(name).map(Attribute::value)
    }
}

/// Convenience builder for the initial attribute map.
pub fn attributes<I, S>(items: I) -> BTreeMap<String, Attribute>
where
    I: IntoIterator<Item = (S, Attribute)>,
    S: Into<String>,
{
    items.into_iter().map(|(k, v)| (k.into(), v)).collect()
}
