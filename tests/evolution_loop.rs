use serde_json::json;
use std::time::Duration;
use synoid_quantum::engine::random::seeded_or_entropy;
use synoid_quantum::engine::{EvolverConfig, MetricSpec, OperationDispatcher, RandomWalkEvolver, StoreConfig};
use synoid_quantum::presets::Preset;
use synoid_quantum::state::{EvolutionLoop, SharedStore};

#[tokio::test]
async fn test_loop_ticks_and_stops() {
    let mut rng = seeded_or_entropy(Some(1));
    let system = Preset::Consciousness.build(StoreConfig::default(), &mut rng).unwrap();
    let evolver = RandomWalkEvolver::new(EvolverConfig::default(), seeded_or_entropy(Some(2)))
        .unwrap()
        .with_metrics(system.metrics.clone());
    let shared = SharedStore::new(system.store);

    let evolution = EvolutionLoop::start(shared.clone(), evolver, 1.0, Duration::from_millis(5));
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert!(evolution.is_running());
    assert!(evolution.tick_count() > 0);
    let report = evolution.last_report().expect("at least one tick");
    assert!(report.metrics.contains_key("awareness"));

    evolution.stop();
    assert!(!evolution.is_running());
    evolution.join().await;

    let snapshot = shared.snapshot().await;
    for entity in &snapshot.entities {
        for attr in entity.attributes.values() {
            assert!(attr.bound.contains(attr.value()));
        }
    }
}

#[tokio::test]
async fn test_no_ticks_after_join() {
    let mut rng = seeded_or_entropy(Some(3));
    let system = Preset::Multiverse.build(StoreConfig::default(), &mut rng).unwrap();
    let evolver = RandomWalkEvolver::new(EvolverConfig::default(), seeded_or_entropy(Some(4))).unwrap();
    let shared = SharedStore::new(system.store);

    let evolution = EvolutionLoop::start(shared.clone(), evolver, 1.0, Duration::from_millis(5));
    tokio::time::sleep(Duration::from_millis(30)).await;
    evolution.join().await;

    let frozen = shared.snapshot().await;
    tokio::time::sleep(Duration::from_millis(30)).await;
    assert_eq!(shared.snapshot().await, frozen);
}

#[tokio::test]
async fn test_loop_stops_on_broken_metric() {
    let mut rng = seeded_or_entropy(Some(5));
    let system = Preset::Energy.build(StoreConfig::default(), &mut rng).unwrap();
    let evolver = RandomWalkEvolver::new(EvolverConfig::default(), seeded_or_entropy(Some(6)))
        .unwrap()
        .with_metrics(vec![MetricSpec::average("ghost", &[("phantom_field", "intensity")])]);
    let shared = SharedStore::new(system.store);
    let before = shared.snapshot().await;

    let evolution = EvolutionLoop::start(shared.clone(), evolver, 1.0, Duration::from_millis(5));
    tokio::time::sleep(Duration::from_millis(60)).await;

    assert!(!evolution.is_running());
    assert_eq!(evolution.tick_count(), 0);
    assert!(evolution.status_report().contains("STOPPED"));
    evolution.join().await;

    // The rejected tick never walked anything.
    let store = shared.read().await;
    assert_eq!(store.snapshot(), before);
}

#[tokio::test]
async fn test_operations_interleave_with_loop() {
    let mut rng = seeded_or_entropy(Some(7));
    let system = Preset::Energy.build(StoreConfig::default(), &mut rng).unwrap();
    let dispatcher = OperationDispatcher::new(system.metrics.clone());
    let evolver = RandomWalkEvolver::new(EvolverConfig::default(), seeded_or_entropy(Some(8))).unwrap();
    let shared = SharedStore::new(system.store);
    let energy_before = shared
        .snapshot()
        .await
        .get("quantum_battery")
        .unwrap()
        .value("energy")
        .unwrap();

    let evolution = EvolutionLoop::start(shared.clone(), evolver, 1.0, Duration::from_millis(2));
    for _ in 0..10 {
        shared
            .execute(
                &dispatcher,
                "transform",
                &json!({"entity": "quantum_battery", "source": "energy", "target": "heat", "amount": 10, "efficiency": 0.5}),
            )
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(3)).await;
    }
    evolution.join().await;

    // The battery is not evolvable, so only the transforms moved it.
    let snapshot = shared.snapshot().await;
    let battery = snapshot.get("quantum_battery").unwrap();
    assert!((battery.value("energy").unwrap() - (energy_before - 100.0)).abs() < 1e-9);
    assert_eq!(battery.value("heat").unwrap(), 50.0);
    assert!(shared.compute(&system.metrics[0]).await.is_ok());
}
