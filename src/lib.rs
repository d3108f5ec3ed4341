// SYNOID Quantum Core Library
// Copyright (c) 2026 Xing_The_Creator | SYNOID
//
// Bounded state simulation: entities with clamped numeric attributes,
// random-walk evolution, derived metrics and named operations.

pub mod config;
pub mod engine;
pub mod error;
pub mod presets;
pub mod state;

pub use error::{ErrorKind, StateError, StateResult};
