// SYNOID Quantum Simulation Config
// Copyright (c) 2026 Xing_The_Creator | SYNOID
//
// One serde struct for everything a run needs. Layers, lowest first:
// defaults, a JSON file, SYNOID_* environment variables, CLI flags.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use tracing::{info, warn};

use crate::engine::evolver::{Dynamics, EvolverConfig, DEFAULT_DRIFT_RATE, DEFAULT_NOISE_AMPLITUDE};
use crate::engine::store::{EvictionPolicy, StoreConfig};
use crate::error::{StateError, StateResult};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Maximum entities per store; `None` means unbounded.
    pub capacity: Option<usize>,
    pub eviction: EvictionPolicy,
    pub drift_rate: f64,
    pub noise_amplitude: f64,
    /// Simulated time advanced per tick.
    pub time_step: f64,
    /// Wall-clock period of the background evolution loop.
    pub tick_interval_ms: u64,
    /// Fixed seed for reproducible runs.
    pub seed: Option<u64>,
    pub attribute_dynamics: HashMap<String, Dynamics>,
    pub kind_dynamics: HashMap<String, Dynamics>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            capacity: None,
            eviction: EvictionPolicy::None,
            drift_rate: DEFAULT_DRIFT_RATE,
            noise_amplitude: DEFAULT_NOISE_AMPLITUDE,
            time_step: 1.0,
            tick_interval_ms: 1000,
            seed: None,
            attribute_dynamics: HashMap::new(),
            kind_dynamics: HashMap::new(),
        }
    }
}

impl SimulationConfig {
    /// Load from a JSON file. Missing fields take their defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let data = fs::read_to_string(path)
            .with_context(|| format!("reading config file {:?}", path))?;
        let config: SimulationConfig = serde_json::from_str(&data)
            .with_context(|| format!("parsing config file {:?}", path))?;
        info!("[CONFIG] Loaded {:?}", path);
        Ok(config)
    }

    /// Override fields from `SYNOID_*` variables. Unparseable values are
    /// logged and ignored.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides<F: Fn(&str) -> Option<String>>(&mut self, lookup: F) {
        fn parse<T: std::str::FromStr>(key: &str, raw: Option<String>) -> Option<T> {
            let raw = raw?;
            match raw.trim().parse() {
                Ok(v) => Some(v),
                Err(_) => {
                    warn!("[CONFIG] Ignoring {}={:?}: not a valid value", key, raw);
                    None
                }
            }
        }

        if let Some(v) = parse("SYNOID_DRIFT_RATE", lookup("SYNOID_DRIFT_RATE")) {
            self.drift_rate = v;
        }
        if let Some(v) = parse("SYNOID_NOISE_AMPLITUDE", lookup("SYNOID_NOISE_AMPLITUDE")) {
            self.noise_amplitude = v;
        }
        if let Some(v) = parse("SYNOID_CAPACITY", lookup("SYNOID_CAPACITY")) {
            self.capacity = Some(v);
        }
        if let Some(v) = parse("SYNOID_SEED", lookup("SYNOID_SEED")) {
            self.seed = Some(v);
        }
        if let Some(v) = parse("SYNOID_TICK_INTERVAL_MS", lookup("SYNOID_TICK_INTERVAL_MS")) {
            self.tick_interval_ms = v;
        }
    }

    pub fn validate(&self) -> StateResult<()> {
        if self.capacity == Some(0) {
            return Err(StateError::invalid("capacity", "must be at least 1"));
        }
        if !self.time_step.is_finite() || self.time_step < 0.0 {
            return Err(StateError::invalid("time_step", "must be finite and non-negative"));
        }
        if self.tick_interval_ms == 0 {
            return Err(StateError::invalid("tick_interval_ms", "must be at least 1"));
        }
        self.evolver_config().validate()
    }

    pub fn store_config(&self) -> StoreConfig {
        StoreConfig {
            capacity: self.capacity,
            eviction: self.eviction,
        }
    }

    pub fn evolver_config(&self) -> EvolverConfig {
        EvolverConfig {
            defaults: Dynamics::new(self.drift_rate, self.noise_amplitude),
            attributes: self.attribute_dynamics.clone(),
            kinds: self.kind_dynamics.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = SimulationConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.evolver_config().defaults.noise_amplitude, 0.1);
        assert_eq!(config.store_config(), StoreConfig::default());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: SimulationConfig =
            serde_json::from_str(r#"{"capacity": 8, "eviction": "fifo", "seed": 9}"#).unwrap();
        assert_eq!(config.capacity, Some(8));
        assert_eq!(config.eviction, EvictionPolicy::Fifo);
        assert_eq!(config.seed, Some(9));
        assert_eq!(config.drift_rate, DEFAULT_DRIFT_RATE);
    }

    #[test]
    fn test_load_from_file() {
        let path = std::env::temp_dir().join("synoid_quantum_config_test.json");
        fs::write(&path, r#"{"drift_rate": 0.02, "kind_dynamics": {"field": {"drift_rate": 0.0, "noise_amplitude": 0.05}}}"#).unwrap();
        let config = SimulationConfig::load(&path).unwrap();
        let _ = fs::remove_file(&path);
        assert_eq!(config.drift_rate, 0.02);
        assert_eq!(config.evolver_config().dynamics_for("field", "intensity").noise_amplitude, 0.05);
    }

    #[test]
    fn test_load_missing_file_errors() {
        assert!(SimulationConfig::load(Path::new("__no_such_config.json")).is_err());
    }

    #[test]
    fn test_overrides_skip_garbage() {
        let mut config = SimulationConfig::default();
        config.apply_overrides(|key| match key {
            "SYNOID_DRIFT_RATE" => Some("0.5".to_string()),
            "SYNOID_SEED" => Some("not-a-seed".to_string()),
            "SYNOID_CAPACITY" => Some(" 12 ".to_string()),
            _ => None,
        });
        assert_eq!(config.drift_rate, 0.5);
        assert_eq!(config.seed, None);
        assert_eq!(config.capacity, Some(12));
    }

    #[test]
    fn test_validate_rejects_zero_capacity() {
        let config = SimulationConfig {
            capacity: Some(0),
            ..SimulationConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
