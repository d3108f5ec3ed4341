// SYNOID Quantum Engine Module
// Copyright (c) 2026 Xing_The_Creator | SYNOID
//
// Bounded state store, random-walk evolver, aggregate metrics and the
// operation dispatcher. Everything here is synchronous; periodic
// evolution is driven by the caller or by `state::EvolutionLoop`.

pub mod dispatcher;
pub mod entity;
pub mod evolver;
pub mod metrics;
pub mod random;
pub mod store;

pub use dispatcher::{
    AttributeDelta, OperationDispatcher, OperationKind, OperationOutcome, OperationRequest,
    OperationResult,
};
pub use entity::{attributes, Attribute, Bound, Entity, EntityKind};
pub use evolver::{Dynamics, EvolverConfig, RandomWalkEvolver, TickReport};
pub use metrics::{AggregateMetricCalculator, MetricComponent, MetricSpec};
pub use random::{RandomSource, ScriptedSource};
pub use store::{BoundedStateStore, EvictionPolicy, StoreConfig, StoreSnapshot};
