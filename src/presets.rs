// SYNOID Quantum Presets
// Copyright (c) 2026 Xing_The_Creator | SYNOID
//
// Ready-made subsystems: the consciousness engine, the energy/matter
// engine and the multiverse navigator, each as one store plus the metric
// specs that describe it. Initial values are drawn from the supplied
// random source, so a seeded source rebuilds the same system.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::info;

use crate::engine::entity::{attributes, Attribute, EntityKind};
use crate::engine::metrics::{MetricComponent, MetricSpec};
use crate::engine::random::RandomSource;
use crate::engine::store::{BoundedStateStore, StoreConfig};
use crate::error::{StateError, StateResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubsystemKind {
    Field,
    Battery,
    Anchor,
    Timeline,
}

impl EntityKind for SubsystemKind {
    fn label(&self) -> &str {
        match self {
            SubsystemKind::Field => "field",
            SubsystemKind::Battery => "battery",
            SubsystemKind::Anchor => "anchor",
            SubsystemKind::Timeline => "timeline",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Preset {
    Consciousness,
    Energy,
    Multiverse,
}

impl Preset {
    pub const ALL: [Preset; 3] = [Preset::Consciousness, Preset::Energy, Preset::Multiverse];

    pub fn as_str(&self) -> &'static str {
        match self {
            Preset::Consciousness => "consciousness",
            Preset::Energy => "energy",
            Preset::Multiverse => "multiverse",
        }
    }

    pub fn build<R: RandomSource>(
        &self,
        config: StoreConfig,
        rng: &mut R,
    ) -> StateResult<PresetSystem> {
        let mut store = BoundedStateStore::with_config(config);

        let metrics = match self {
            Preset::Consciousness => {
                store.create(
                    "awareness_field",
                    SubsystemKind::Field,
                    attributes([
                        ("intensity", unit(rng)),
                        ("clarity", unit(rng)),
                        ("resonance", unit(rng)),
                    ]),
                )?;
                store.create(
                    "memory_field",
                    SubsystemKind::Field,
                    attributes([("intensity", unit(rng)), ("retention", unit(rng))]),
                )?;
                store.create(
                    "attention_field",
                    SubsystemKind::Field,
                    attributes([("intensity", unit(rng)), ("focus", unit(rng))]),
                )?;
                vec![
                    MetricSpec::weighted(
                        "awareness",
                        vec![
                            MetricComponent::new("awareness_field", "intensity", 0.5),
                            MetricComponent::new("attention_field", "focus", 0.3),
                            MetricComponent::new("memory_field", "intensity", 0.2),
                        ],
                    ),
                    MetricSpec::average(
                        "coherence",
                        &[
                            ("awareness_field", "clarity"),
                            ("memory_field", "retention"),
                            ("attention_field", "focus"),
                        ],
                    ),
                ]
            }
            Preset::Energy => {
                store.create(
                    "quantum_battery",
                    SubsystemKind::Battery,
                    attributes([
                        ("energy", Attribute::reservoir(1000.0 + 1000.0 * rng.next_float(), 10_000.0)?),
                        ("heat", Attribute::reservoir(0.0, 10_000.0)?),
                    ]),
                )?;
                store.create(
                    "creation_field",
                    SubsystemKind::Field,
                    attributes([("intensity", unit(rng)), ("efficiency", unit(rng))]),
                )?;
                store.create(
                    "stability_field",
                    SubsystemKind::Field,
                    attributes([("intensity", unit(rng)), ("coherence", unit(rng))]),
                )?;
                vec![
                    MetricSpec::weighted(
                        "stability",
                        vec![
                            MetricComponent::new("stability_field", "coherence", 0.6),
                            MetricComponent::new("creation_field", "efficiency", 0.4),
                        ],
                    ),
                    MetricSpec::weighted(
                        "charge",
                        vec![MetricComponent::new("quantum_battery", "energy", 1.0 / 10_000.0)],
                    ),
                ]
            }
            Preset::Multiverse => {
                store.create(
                    "reality_anchor",
                    SubsystemKind::Anchor,
                    attributes([("stability", unit(rng)), ("density", unit(rng))]),
                )?;
                for id in ["timeline_alpha", "timeline_beta"] {
                    store.create(
                        id,
                        SubsystemKind::Timeline,
                        attributes([("coherence", unit(rng)), ("divergence", unit(rng))]),
                    )?;
                }
                vec![MetricSpec::average(
                    "stability",
                    &[
                        ("reality_anchor", "stability"),
                        ("timeline_alpha", "coherence"),
                        ("timeline_beta", "coherence"),
                    ],
                )]
            }
        };

        info!(
            "[PRESET] 🧬 Built '{}' with {} entities and {} metrics",
            self,
            store.len(),
            metrics.len()
        );
        Ok(PresetSystem { store, metrics })
    }
}

/// Unit attribute starting somewhere in `[0.3, 0.8)`.
fn unit<R: RandomSource>(rng: &mut R) -> Attribute {
    Attribute::unit(0.3 + 0.5 * rng.next_float())
}

impl fmt::Display for Preset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Preset {
    type Err = StateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Preset::ALL
            .into_iter()
            .find(|p| p.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| StateError::UnknownPreset(s.to_string()))
    }
}

#[derive(Debug)]
pub struct PresetSystem {
    pub store: BoundedStateStore<SubsystemKind>,
    pub metrics: Vec<MetricSpec>,
}
