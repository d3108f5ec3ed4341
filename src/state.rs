// SYNOID Quantum Shared State & Evolution Loop
// Copyright (c) 2026 Xing_The_Creator | SYNOID
//
// For callers that want a store that evolves on its own. The loop holds
// the write lock only for the duration of one tick; readers clone a
// snapshot under the read lock instead of borrowing live state.

use serde_json::Value;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, RwLock as StdRwLock};
use std::time::{Duration, Instant};
use tokio::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::engine::dispatcher::{OperationDispatcher, OperationResult};
use crate::engine::entity::EntityKind;
use crate::engine::evolver::{RandomWalkEvolver, TickReport};
use crate::engine::metrics::{AggregateMetricCalculator, MetricSpec};
use crate::engine::random::RandomSource;
use crate::engine::store::{BoundedStateStore, StoreSnapshot};
use crate::error::StateResult;

/// A store behind an async read/write lock, cheap to clone.
pub struct SharedStore<K> {
    inner: Arc<RwLock<BoundedStateStore<K>>>,
}

impl<K> Clone for SharedStore<K> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<K: EntityKind> SharedStore<K> {
    pub fn new(store: BoundedStateStore<K>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(store)),
        }
    }

    pub async fn read(&self) -> RwLockReadGuard<'_, BoundedStateStore<K>> {
        self.inner.read().await
    }

    pub async fn write(&self) -> RwLockWriteGuard<'_, BoundedStateStore<K>> {
        self.inner.write().await
    }

    /// Owned copy taken under the read lock; never observes a half-applied tick.
    pub async fn snapshot(&self) -> StoreSnapshot<K> {
        self.inner.read().await.snapshot()
    }

    pub async fn execute(
        &self,
        dispatcher: &OperationDispatcher<K>,
        operation: &str,
        params: &Value,
    ) -> StateResult<OperationResult> {
        let mut store = self.inner.write().await;
        dispatcher.execute(&mut *store, operation, params)
    }

    pub async fn compute(&self, spec: &MetricSpec) -> StateResult<f64> {
        let store = self.inner.read().await;
        AggregateMetricCalculator::new().compute(&*store, spec)
    }
}

/// Background task that ticks a [`SharedStore`] at a fixed period until
/// stopped. Dropping the handle also stops it.
pub struct EvolutionLoop {
    started: Instant,
    interval: Duration,
    is_running: Arc<AtomicBool>,
    tick_count: Arc<AtomicU64>,
    last_report: Arc<StdRwLock<Option<TickReport>>>,
    handle: Option<JoinHandle<()>>,
}

impl EvolutionLoop {
    /// Spawn the loop on the current tokio runtime.
    pub fn start<K, R>(
        store: SharedStore<K>,
        mut evolver: RandomWalkEvolver<R>,
        time_step: f64,
        interval: Duration,
    ) -> Self
    where
        K: EntityKind,
        R: RandomSource + Send + 'static,
    {
        let is_running = Arc::new(AtomicBool::new(true));
        let tick_count = Arc::new(AtomicU64::new(0));
        let last_report = Arc::new(StdRwLock::new(None));

        let running = is_running.clone();
        let count = tick_count.clone();
        let report_slot = last_report.clone();

        let handle = tokio::spawn(async move {
            info!("[EVOLUTION] 🌀 Loop started (interval: {:?}, dt: {})", interval, time_step);

            while running.load(Ordering::Relaxed) {
                tokio::time::sleep(interval).await;
                if !running.load(Ordering::Relaxed) {
                    break;
                }

                let result = {
                    let mut guard = store.write().await;
                    evolver.tick(&mut *guard, time_step)
                };

                match result {
                    Ok(report) => {
                        count.fetch_add(1, Ordering::Relaxed);
                        if let Ok(mut slot) = report_slot.write() {
                            *slot = Some(report);
                        }
                    }
                    Err(e) => {
                        error!("[EVOLUTION] ❌ Tick failed, stopping loop: {}", e);
                        running.store(false, Ordering::Relaxed);
                    }
                }
            }

            info!("[EVOLUTION] Loop stopped.");
        });

        Self {
            started: Instant::now(),
            interval,
            is_running,
            tick_count,
            last_report,
            handle: Some(handle),
        }
    }

    pub fn is_running(&self) -> bool {
        self.is_running.load(Ordering::Relaxed)
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_count.load(Ordering::Relaxed)
    }

    pub fn last_report(&self) -> Option<TickReport> {
        self.last_report.read().ok().and_then(|r| r.clone())
    }

    /// Ask the loop to exit; it notices at its next wake-up.
    pub fn stop(&self) {
        self.is_running.store(false, Ordering::Relaxed);
        info!("[EVOLUTION] Shutdown requested.");
    }

    /// Stop and wait for the task to finish.
    pub async fn join(mut self) {
        self.stop();
        if let Some(handle) = self.handle.take() {
            if let Err(e) = handle.await {
                error!("[EVOLUTION] Loop task ended abnormally: {}", e);
            }
        }
    }

    pub fn status_report(&self) -> String {
        let uptime = self.started.elapsed().as_secs();
        format!(
            "SYNOID Evolution Report\n  Uptime: {}m {}s\n  Interval: {:?}\n  Ticks: {}\n  Status: {}",
            uptime / 60,
            uptime % 60,
            self.interval,
            self.tick_count(),
            if self.is_running() { "EVOLVING" } else { "STOPPED" },
        )
    }
}

impl Drop for EvolutionLoop {
    fn drop(&mut self) {
        self.is_running.store(false, Ordering::Relaxed);
    }
}
