// Copyright 2026 the Chaos Show Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Lifecycle guarantees, exercised through the public API on the headless
//! platform.

use chaos_core::config::ShowConfig;
use chaos_core::engine::ChaosEngine;
use chaos_core::events::EventLog;
use chaos_core::filter::sanitize;
use chaos_core::headless::{Headless, HeadlessDom, HeadlessKit, HeadlessTweens};
use chaos_core::id::TimerKey;
use chaos_core::interval::{IntervalRegistry, TimerCategory, TimerOptions};
use chaos_core::phase::Phase;
use chaos_core::pool::{ElementCategory, ElementHost, ElementOptions, ElementPool, PoolConfig};
use chaos_core::scheduler::{PhaseScheduler, SchedulerConfig};
use chaos_core::time::{Duration, HostTime};
use chaos_core::tween::{Animation, OwnerKey, TweenRegistry, TweenVars};
use rand::SeedableRng;
use rand::rngs::SmallRng;

fn engine() -> (ChaosEngine<Headless, EventLog>, HeadlessKit) {
    let kit = HeadlessKit::new();
    let mut engine = ChaosEngine::new(ShowConfig::default(), kit.parts(), EventLog::new());
    kit.register_effects(&mut engine.stage_mut().effects);
    (engine, kit)
}

#[test]
fn duplicate_interval_ids_leave_one_timer() {
    let mut timers = IntervalRegistry::new();
    let key = TimerKey::from_static("particles");
    let opts = TimerOptions::new(TimerCategory::Effect);
    for payload in 0..2 {
        timers.create_interval(HostTime(0), key.clone(), Duration(50), payload, opts);
    }
    assert_eq!(timers.len(), 1);
    let fired = timers.collect_due(HostTime(50));
    assert_eq!(fired.len(), 1, "one live timer fires once");
    assert_eq!(fired[0].payload, 1, "the later registration won");
}

#[test]
fn kill_owner_only_touches_that_owner() {
    let engine = HeadlessTweens::new();
    let node = HeadlessDom::new().body();
    let mut tweens = TweenRegistry::new(engine.clone());
    let fade = Animation::To(TweenVars::new(Duration(500)).prop("opacity", 0.0));
    for (owner, count) in [("A", 3), ("B", 2)] {
        for _ in 0..count {
            tweens
                .create_animation(HostTime(0), &fade, &node, None, OwnerKey::named(owner))
                .expect("engine healthy");
        }
    }
    assert_eq!(tweens.kill_owner(&OwnerKey::named("A")), 3);
    assert_eq!(tweens.size(), 2);
    assert_eq!(tweens.count_owner(&OwnerKey::named("B")), 2);
    assert_eq!(engine.active_count(), 2);
}

#[test]
fn filter_sanitization_is_bounded_and_idempotent() {
    for hundredths in 106..400 {
        let x = f64::from(hundredths) / 100.0;
        let once = sanitize(&format!("brightness({x}) sepia({x}) hue-rotate(33deg)"));
        assert_eq!(once.value, "brightness(1.05) hue-rotate(33deg)", "x = {x}");
        let twice = sanitize(&once.value);
        assert_eq!(twice.value, once.value);
        assert!(twice.was_safe(), "sanitized output needs no further change");
    }
    for input in ["sepia(0)", "SEPIA(1)", "contrast(1) sepia(50%)"] {
        assert!(!sanitize(input).value.contains("sepia"), "{input}");
    }
}

#[test]
fn purge_evicts_the_oldest_over_budget() {
    let budget = 20;
    let mut pool = ElementPool::new(HeadlessDom::new(), PoolConfig::with_budget(budget));
    let ids: Vec<_> = (0..35)
        .map(|t| {
            pool.create_element(
                HostTime(t),
                "div",
                &[],
                None,
                ElementOptions::new(ElementCategory::Particle),
            )
            .expect("valid tag")
            .id
            .expect("tracked")
        })
        .collect();
    assert_eq!(pool.purge(HostTime(100)), 15);
    assert_eq!(pool.len(), budget);
    assert!(ids[..15].iter().all(|&id| !pool.is_alive(id)), "oldest gone");
    assert!(ids[15..].iter().all(|&id| pool.is_alive(id)), "newest kept");
}

#[test]
fn removal_is_idempotent() {
    let dom = HeadlessDom::new();
    let mut pool = ElementPool::new(dom.clone(), PoolConfig::with_budget(10));
    let make = |pool: &mut ElementPool<HeadlessDom>| {
        pool.create_element(HostTime(0), "canvas", &[], None, ElementOptions::default())
            .expect("valid tag")
            .node
    };
    let a = make(&mut pool);
    let b = make(&mut pool);

    assert!(pool.remove_node(&a));
    assert!(!pool.remove_node(&a), "second removal is a no-op");

    dom.detach_externally(b);
    assert!(pool.remove_node(&b), "record still dropped");
    assert!(!pool.remove_node(&b));
    assert_eq!(pool.len(), 0);
    assert_eq!(pool.stats().live, 0);
}

#[test]
fn back_to_back_requests_end_on_the_last() {
    let (mut engine, _kit) = engine();
    engine.set_phase(HostTime(0), Phase::Calm).expect("show accepts requests");
    engine.set_phase(HostTime(0), Phase::Glitch).expect("show accepts requests");
    let event = engine.settle(HostTime(0)).expect("glitch activates");
    assert_eq!(event.phase, Phase::Glitch);
    assert_eq!(engine.current_phase(), Some(Phase::Glitch));
    assert_eq!(engine.stage().tweens.count_owner(&Phase::Calm.into()), 0);
    assert_eq!(engine.sink().phases().collect::<Vec<_>>(), [Phase::Glitch]);
}

#[test]
fn partially_run_transition_is_cleaned_up() {
    let (mut engine, _kit) = engine();
    engine.set_phase(HostTime(0), Phase::Calm).expect("show accepts requests");
    // Four pumps reach the runner; the fifth would activate.
    for t in 0..4 {
        engine.pump(HostTime(t), None);
    }
    assert_eq!(engine.stage().tweens.count_owner(&Phase::Calm.into()), 1);
    engine.set_phase(HostTime(4), Phase::Glitch).expect("show accepts requests");
    engine.settle(HostTime(4));
    assert_eq!(engine.current_phase(), Some(Phase::Glitch));
    assert_eq!(engine.stage().tweens.count_owner(&Phase::Calm.into()), 0);
}

#[test]
fn scheduler_never_repeats_immediately() {
    let mut rng = SmallRng::seed_from_u64(0xC0FFEE);
    for phases in [vec![Phase::Calm, Phase::Ice], Phase::ALL.to_vec()] {
        let mut sched = PhaseScheduler::with_phases(SchedulerConfig::DEFAULT, phases);
        sched.start(HostTime(0));
        let mut prev = None;
        for i in 0..1000_u64 {
            let now = HostTime(i * SchedulerConfig::DEFAULT.period.millis());
            let pick = sched.poll(now, &mut rng).expect("a pick is due");
            assert_ne!(Some(pick), prev, "selection {i}");
            prev = Some(pick);
        }
    }
}

#[test]
fn second_watchdog_tick_changes_nothing() {
    let (mut engine, kit) = engine();
    engine.start(HostTime(0));
    engine.settle(HostTime(0));

    kit.filter.corrupt("sepia(1) brightness(3)");
    let stage = engine.stage_mut();
    for t in 1..=170 {
        stage
            .pool
            .create_element(
                HostTime(t),
                "div",
                &[],
                None,
                ElementOptions::new(ElementCategory::Particle),
            )
            .expect("valid tag");
    }
    for t in 171..=173 {
        stage
            .pool
            .create_element(
                HostTime(t),
                "div",
                &[],
                None,
                ElementOptions::new(ElementCategory::Background).singleton("blackout"),
            )
            .expect("valid tag");
    }

    let first = engine.run_watchdog(HostTime(20_000));
    assert!(!first.repairs.is_empty(), "first tick repairs");
    assert_eq!(kit.filter.value(), "none");

    let nodes = kit.dom.attached_count();
    let timers = engine.stage().timers.len();
    let writes = kit.filter.write_count();
    let second = engine.run_watchdog(HostTime(20_000));
    assert!(second.is_quiet(), "second tick found {:?}", second.findings);
    assert_eq!(kit.dom.attached_count(), nodes);
    assert_eq!(engine.stage().timers.len(), timers);
    assert_eq!(kit.filter.write_count(), writes);
}
