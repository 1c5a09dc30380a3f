// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! End-to-end scheduling scenarios.

use chrono::{Duration, Utc};
use eno_classify::classify;
use eno_cluster_port::{ClusterError, ClusterStore, InMemoryClusterStore};
use eno_config::scheduler_config::SchedulerConfig;
use eno_patch::build_patch;
use eno_sched_core::clock::FakeClock;
use eno_sched_core::Scheduler;
use eno_types::{
    Binding, Composition, CompositionStatus, Generation, InputRevision, RefDef, Synthesis,
    SynthesisUuid, Synthesizer, Uid,
};

fn synthesizer(name: &str, generation: i64, refs: Vec<RefDef>) -> Synthesizer {
    Synthesizer { uid: Uid::from(format!("{name}-uid")), name: name.into(), generation: Generation(generation), refs }
}

fn composition(name: &str, synthesizer_name: &str) -> Composition {
    Composition {
        uid: Uid::from(name),
        name: name.into(),
        namespace: "default".into(),
        generation: Generation(1),
        synthesizer_name: synthesizer_name.into(),
        bindings: vec![Binding { key: "a".into() }],
        ignore_side_effects: false,
        force_resynthesis: None,
        has_cleanup_finalizer: true,
        deleting: false,
        synth_epoch: None,
        status: CompositionStatus {
            input_revisions: vec![InputRevision { revision: Some(1), ..InputRevision::new("a") }],
            ..CompositionStatus::default()
        },
    }
}

fn completed_synthesis(observed_composition_generation: Generation, synthesizer_generation: Generation, deferred: bool, revision: i64) -> Synthesis {
    Synthesis {
        uuid: SynthesisUuid::fresh(),
        observed_composition_generation,
        observed_synthesizer_generation: synthesizer_generation,
        initialized: Some(Utc::now()),
        synthesized: Some(Utc::now()),
        reconciled: None,
        ready: None,
        canceled: None,
        attempts: 0,
        deferred,
        input_revisions: vec![InputRevision { revision: Some(revision), ..InputRevision::new("a") }],
    }
}

/// Scenario 1: a brand-new composition dispatches on the first tick with
/// `deferred=false` and the expected observed generation.
#[tokio::test]
async fn initial_synthesis() {
    let s = synthesizer("s1", 1, vec![RefDef::eager("a")]);
    let c = composition("c1", "s1");
    let store = InMemoryClusterStore::seeded(vec![c.clone()], vec![s]);
    let clock = FakeClock::at(Utc::now());
    let scheduler = Scheduler::new(store, clock, SchedulerConfig::default());

    let outcome = scheduler.tick().await.expect("tick succeeds");
    assert_eq!(outcome.dispatched, Some(Uid::from("c1")));

    let updated = scheduler.store().get_composition(&c.uid).await.unwrap().unwrap();
    let in_flight = updated.status.in_flight_synthesis.expect("in-flight slot set");
    assert_eq!(in_flight.observed_composition_generation, c.generation);
    assert!(!in_flight.deferred);
}

/// Scenario 2: a composition-generation bump takes strict priority over a
/// synthesizer rollout, even when both apply to compositions sharing the
/// same synthesizer.
#[tokio::test]
async fn composition_precedence_over_synthesizer_rollout() {
    let s1 = synthesizer("s1", 1, vec![RefDef::eager("a")]);
    let mut c1 = composition("c1", "s1");
    c1.status.current_synthesis = Some(completed_synthesis(Generation(1), Generation(1), false, 1));
    let mut c2 = composition("c2", "s1");
    c2.status.current_synthesis = Some(completed_synthesis(Generation(1), Generation(1), false, 1));

    // Bump the synthesizer (makes c2 eligible for SynthesizerModified) and
    // separately bump c1's generation (makes c1 eligible for the
    // higher-priority CompositionModified).
    let s1_bumped = synthesizer("s1", 2, vec![RefDef::eager("a")]);
    c1.generation = Generation(2);

    let store = InMemoryClusterStore::seeded(vec![c1.clone(), c2.clone()], vec![s1_bumped]);
    let clock = FakeClock::at(Utc::now());
    let scheduler = Scheduler::new(store, clock, SchedulerConfig::default());

    let first = scheduler.tick().await.expect("tick succeeds");
    assert_eq!(first.dispatched, Some(c1.uid.clone()), "composition-modified must dispatch first");

    // c2's rollout is still on phase 1: this tick only writes the synth-epoch
    // annotation onto c2, so its informer cache carries the epoch bump
    // before the real dispatch patch lands.
    let second = scheduler.tick().await.expect("tick succeeds");
    assert_eq!(second.dispatched, None, "synthesizer rollout writes its epoch annotation before dispatching");
    let c2_annotated = scheduler.store().get_composition(&c2.uid).await.unwrap().unwrap();
    assert!(c2_annotated.synth_epoch.is_some(), "epoch annotation recorded ahead of the rollout dispatch");

    let third = scheduler.tick().await.expect("tick succeeds");
    assert_eq!(third.dispatched, Some(c2.uid.clone()), "rollout dispatches once its epoch annotation is in place");
}

/// Scenario 3: a deferred input change on two compositions is spread out by
/// the cluster-wide cooldown rather than dispatching both at once.
#[tokio::test]
async fn deferred_input_cooldown_spreads_dispatches() {
    let s = synthesizer("s1", 1, vec![RefDef::deferred("a")]);
    let mut c1 = composition("c1", "s1");
    c1.status.current_synthesis = Some(completed_synthesis(Generation(1), Generation(1), true, 1));
    let mut c2 = composition("c2", "s1");
    c2.status.current_synthesis = Some(completed_synthesis(Generation(1), Generation(1), true, 1));
    // The baseline deferred syntheses were "completed" well before this test's
    // tick, so the cooldown they seed has already elapsed and the first
    // deferred dispatch below is unconstrained by it.
    let baseline_initialized = Utc::now() - Duration::seconds(10);
    c1.status.current_synthesis.as_mut().expect("set above").initialized = Some(baseline_initialized);
    c2.status.current_synthesis.as_mut().expect("set above").initialized = Some(baseline_initialized);
    // Move the shared deferred input.
    c1.status.input_revisions[0].revision = Some(2);
    c2.status.input_revisions[0].revision = Some(2);

    let store = InMemoryClusterStore::seeded(vec![c1.clone(), c2.clone()], vec![s]);
    let clock = FakeClock::at(Utc::now());
    let config = SchedulerConfig { cooldown_period_secs: 1, ..SchedulerConfig::default() };
    let scheduler = Scheduler::new(store, clock, config);

    let first = scheduler.tick().await.expect("first tick dispatches one composition");
    let first_dispatched = first.dispatched.expect("exactly one dispatch within the first 100ms");

    let second = scheduler.tick().await.expect("second tick sees the cooldown");
    assert_eq!(second.dispatched, None, "the second composition must wait out the cooldown");

    scheduler.clock().advance(Duration::milliseconds(1_001));
    let third = scheduler.tick().await.expect("third tick dispatches after the cooldown elapses");
    let second_dispatched = third.dispatched.expect("the remaining composition dispatches once cooled down");
    assert_ne!(first_dispatched, second_dispatched);

    let first_composition = scheduler.store().get_composition(&first_dispatched).await.unwrap().unwrap();
    let second_composition = scheduler.store().get_composition(&second_dispatched).await.unwrap().unwrap();
    let first_initialized = first_composition.status.in_flight_synthesis.unwrap().initialized.unwrap();
    let second_initialized = second_composition.status.in_flight_synthesis.unwrap().initialized.unwrap();
    assert!(second_initialized - first_initialized >= Duration::seconds(1));
}

/// Scenario 4: the concurrency limit caps simultaneous in-flight dispatches,
/// and `free_slots + in_flight` always equals the configured limit.
#[tokio::test]
async fn concurrency_limit_caps_in_flight_dispatches() {
    let s = synthesizer("s1", 1, vec![RefDef::eager("a")]);
    let compositions: Vec<_> = (0..150).map(|i| composition(&format!("c{i}"), "s1")).collect();
    let store = InMemoryClusterStore::seeded(compositions, vec![s]);
    let clock = FakeClock::at(Utc::now());
    let config = SchedulerConfig { concurrency_limit: 5, ..SchedulerConfig::default() };
    let scheduler = Scheduler::new(store, clock, config);

    let mut dispatched = 0;
    for _ in 0..5 {
        let outcome = scheduler.tick().await.expect("tick succeeds");
        assert!(outcome.dispatched.is_some());
        dispatched += 1;
    }
    assert_eq!(dispatched, 5);

    let outcome = scheduler.tick().await.expect("tick succeeds");
    assert_eq!(outcome.dispatched, None, "limit already saturated by 5 in-flight syntheses");
}

/// Scenario 5: a slower scheduler's patch, built against a snapshot a
/// faster one already overwrote, is rejected with `Invalid`. At most one
/// synthesis UUID is ever visible on the composition.
#[tokio::test]
async fn zombie_leader_patch_is_rejected() {
    let s = synthesizer("s1", 1, vec![RefDef::eager("a")]);
    let c = composition("c1", "s1");
    let store = InMemoryClusterStore::seeded(vec![c.clone()], vec![s.clone()]);

    // Both replicas classify the same pre-patch snapshot.
    let op = classify(&s, &c).expect("expected initial synthesis");
    let fast_patch = build_patch(&op, &s, &c).expect("fast replica builds a patch");
    let slow_patch = build_patch(&op, &s, &c).expect("slow replica builds a patch against the same snapshot");

    store.apply_patch(&c.uid, &fast_patch).await.expect("the faster replica's patch lands");
    let result = store.apply_patch(&c.uid, &slow_patch).await;
    assert!(matches!(result, Err(ClusterError::Invalid(_))));

    let updated = store.get_composition(&c.uid).await.unwrap().unwrap();
    let visible_uuid = updated.status.in_flight_synthesis.unwrap().uuid;
    assert_eq!(Some(visible_uuid), fast_patch.minted_uuid());
    assert_ne!(Some(visible_uuid), slow_patch.minted_uuid());
}

/// Scenario 6: a canceled in-flight synthesis is retried only after the
/// exponential backoff window elapses, and the wait grows with `attempts`.
#[tokio::test]
async fn retry_backoff_delays_redispatch() {
    let s = synthesizer("s1", 1, vec![RefDef::eager("a")]);
    let mut c = composition("c1", "s1");
    let now = Utc::now();
    c.status.in_flight_synthesis = Some(Synthesis {
        uuid: SynthesisUuid::fresh(),
        observed_composition_generation: Generation(1),
        observed_synthesizer_generation: Generation(1),
        initialized: Some(now - Duration::seconds(10)),
        synthesized: None,
        reconciled: None,
        ready: None,
        canceled: Some(now),
        attempts: 1,
        deferred: false,
        input_revisions: vec![],
    });

    let store = InMemoryClusterStore::seeded(vec![c.clone()], vec![s]);
    let clock = FakeClock::at(now);
    let scheduler = Scheduler::new(store, clock, SchedulerConfig::default());

    let too_soon = scheduler.tick().await.expect("tick succeeds");
    assert_eq!(too_soon.dispatched, None, "must not retry before t+15s");

    scheduler.clock().advance(Duration::seconds(15));
    let on_time = scheduler.tick().await.expect("tick succeeds");
    assert_eq!(on_time.dispatched, Some(c.uid));
}

