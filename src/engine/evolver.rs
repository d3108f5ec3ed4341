// SYNOID Quantum Random-Walk Evolver
// Copyright (c) 2026 Xing_The_Creator | SYNOID
//
// One tick nudges every evolvable attribute by a drift term plus centered
// noise, then clamps it back into its bound:
//
//   new = clamp(value + drift * dt + noise * (u - 0.5), lower, upper)
//
// Scheduling belongs to the caller: a loop, a timer, or a test calling
// `tick` N times.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

use crate::engine::entity::EntityKind;
use crate::engine::metrics::{AggregateMetricCalculator, MetricSpec};
use crate::engine::random::RandomSource;
use crate::engine::store::BoundedStateStore;
use crate::error::{StateError, StateResult};

pub const DEFAULT_DRIFT_RATE: f64 = 0.001;
pub const DEFAULT_NOISE_AMPLITUDE: f64 = 0.1;

/// Per-attribute walk parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Dynamics {
    pub drift_rate: f64,
    pub noise_amplitude: f64,
}

impl Default for Dynamics {
    fn default() -> Self {
        Self {
            drift_rate: DEFAULT_DRIFT_RATE,
            noise_amplitude: DEFAULT_NOISE_AMPLITUDE,
        }
    }
}

impl Dynamics {
    pub fn new(drift_rate: f64, noise_amplitude: f64) -> Self {
        Self {
            drift_rate,
            noise_amplitude,
        }
    }

    fn validate(&self, name: &str) -> StateResult<()> {
        if !self.drift_rate.is_finite() {
            return Err(StateError::invalid(name, "drift_rate must be finite"));
        }
        if !self.noise_amplitude.is_finite() || self.noise_amplitude < 0.0 {
            return Err(StateError::invalid(
                name,
                "noise_amplitude must be finite and non-negative",
            ));
        }
        Ok(())
    }
}

/// Walk parameters, resolved attribute name first, then entity kind, then
/// the defaults.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EvolverConfig {
    pub defaults: Dynamics,
    /// Keyed by attribute name.
    pub attributes: HashMap<String, Dynamics>,
    /// Keyed by `EntityKind::label()`.
    pub kinds: HashMap<String, Dynamics>,
}

impl EvolverConfig {
    pub fn new(drift_rate: f64, noise_amplitude: f64) -> Self {
        Self {
            defaults: Dynamics::new(drift_rate, noise_amplitude),
            ..Self::default()
        }
    }

    pub fn with_attribute(mut self, attribute: &str, dynamics: Dynamics) -> Self {
        self.attributes.insert(attribute.to_string(), dynamics);
        self
    }

    pub fn with_kind(mut self, kind: &str, dynamics: Dynamics) -> Self {
        self.kinds.insert(kind.to_string(), dynamics);
        self
    }

    pub fn dynamics_for(&self, kind: &str, attribute: &str) -> Dynamics {
        self.attributes
            .get(attribute)
            .or_else(|| self.kinds.get(kind))
            .copied()
            .unwrap_or(self.defaults)
    }

    pub fn validate(&self) -> StateResult<()> {
        self.defaults.validate("defaults")?;
        for (name, dynamics) in self.attributes.iter().chain(self.kinds.iter()) {
            dynamics.validate(name)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TickReport {
    /// 1-based count of ticks this evolver has applied.
    pub tick: u64,
    pub attributes_updated: usize,
    pub metrics: BTreeMap<String, f64>,
}

pub struct RandomWalkEvolver<R> {
    config: EvolverConfig,
    rng: R,
    metrics: Vec<MetricSpec>,
    calculator: AggregateMetricCalculator,
    ticks: u64,
}

impl<R: RandomSource> RandomWalkEvolver<R> {
    pub fn new(config: EvolverConfig, rng: R) -> StateResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            rng,
            metrics: Vec::new(),
            calculator: AggregateMetricCalculator::new(),
            ticks: 0,
        })
    }

    /// Metrics recomputed after every tick and returned in its report.
    pub fn with_metrics(mut self, metrics: Vec<MetricSpec>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn config(&self) -> &EvolverConfig {
        &self.config
    }

    pub fn metrics(&self) -> &[MetricSpec] {
        &self.metrics
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn tick<K: EntityKind>(
        &mut self,
        store: &mut BoundedStateStore<K>,
        time_step: f64,
    ) -> StateResult<TickReport> {
        if !time_step.is_finite() || time_step < 0.0 {
            return Err(StateError::invalid(
                "time_step",
                format!("expected a finite non-negative step, got {}", time_step),
            ));
        }

        for spec in &self.metrics {
            self.calculator.validate(store, spec)?;
        }

        let config = &self.config;
        let rng = &mut self.rng;
        let mut updated = 0usize;
        store.for_each_mut(|entity| {
            let kind = entity.kind.label();
            for (name, attribute) in entity.attributes.iter_mut() {
                if !attribute.evolvable {
                    continue;
                }
                let dynamics = config.dynamics_for(kind, name);
                let noise = dynamics.noise_amplitude * (rng.next_float() - 0.5);
                attribute.set(attribute.value() + dynamics.drift_rate * time_step + noise);
                updated += 1;
            }
        });

        let metrics = self.calculator.compute_all(store, &self.metrics)?;
        self.ticks += 1;
        debug!(
            "[EVOLVER] Tick #{}: {} attributes walked, metrics {:?}",
            self.ticks, updated, metrics
        );

        Ok(TickReport {
            tick: self.ticks,
            attributes_updated: updated,
            metrics,
        })
    }

    /// Apply `ticks` steps and return the last report.
    pub fn run<K: EntityKind>(
        &mut self,
        store: &mut BoundedStateStore<K>,
        time_step: f64,
        ticks: u64,
    ) -> StateResult<Option<TickReport>> {
        let mut last = None;
        for _ in 0..ticks {
            last = Some(self.tick(store, time_step)?);
        }
        Ok(last)
    }
}
