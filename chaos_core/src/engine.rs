// Copyright 2026 the Chaos Show Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The assembled show.
//!
//! [`ChaosEngine`] constructs every component once and wires them together
//! by ownership: the stage holds the registries, the controller and
//! scheduler hold their own state, and nothing is reachable globally.
//!
//! The host drives it with [`pump`](ChaosEngine::pump), typically once per
//! animation frame. A pump fires due timers (scheduler heartbeat, watchdog,
//! auto-cleanup, overlay expiry, restart resume), advances the in-flight
//! transition by one step, flushes the root filter, and publishes
//! quarantine notices. Everything else is the control surface.
//!
//! ## Lifecycle
//!
//! ```text
//! Created ──start──▶ Running ──watchdog soft restart──▶ Restarting
//!                       ▲                                  │
//!                       └──────── restart_delay ───────────┘
//!
//! any ──destroy──▶ Destroyed ──restart──▶ Running
//! ```

use alloc::boxed::Box;
use alloc::rc::Rc;
use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;

use log::{debug, error, info, warn};
use rand::SeedableRng;
use rand::rngs::SmallRng;
use serde::Serialize;

use crate::config::{PerformanceMode, ShowConfig};
use crate::controller::{PhaseController, StepOutcome, TransitionTicket};
use crate::effect::{EffectKind, VisualEffect};
use crate::error::ControlError;
use crate::events::{
    ComponentQuarantineEvent, EventSink, NoopSink, PerformanceEmergencyEvent, PhaseChangedEvent,
};
use crate::id::TimerKey;
use crate::interval::{IntervalHandle, TimerCategory, TimerOptions};
use crate::phase::Phase;
use crate::platform::{Platform, PlatformParts};
use crate::pool::PoolStats;
use crate::scheduler::PhaseScheduler;
use crate::stage::{PhaseRunner, Stage, Task};
use crate::time::{Duration, HostTime};
use crate::watchdog::{
    CleanupCounts, EscalationLevel, Health, HeapUsage, Patient, Watchdog, WatchdogReport,
};

/// Key of the scheduler heartbeat timer.
pub const HEARTBEAT: TimerKey = TimerKey::from_static("scheduler-heartbeat");
/// Key of the watchdog timer.
pub const WATCHDOG: TimerKey = TimerKey::from_static("watchdog");
/// Key of the auto-cleanup timer.
pub const AUTO_CLEANUP: TimerKey = TimerKey::from_static("auto-cleanup");
const RESUME: TimerKey = TimerKey::from_static("soft-restart-resume");

/// The heartbeat outlives critical cleanup; only a soft restart or an
/// explicit stop ends it.
const HEARTBEAT_OPTIONS: TimerOptions = TimerOptions::new(TimerCategory::Scheduler).permanent();

/// Time between auto-cleanup passes.
pub const AUTO_CLEANUP_PERIOD: Duration = Duration::from_secs(10);

/// Seed used when the config does not give one.
pub const DEFAULT_SEED: u64 = 0x00C4_A05D;

/// Where the engine is in its life.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Lifecycle {
    /// Built, not started.
    #[default]
    Created,
    /// Running normally.
    Running,
    /// Torn down by the watchdog, resuming at `resume_at`.
    Restarting {
        /// When the show comes back.
        resume_at: HostTime,
    },
    /// Shut down.
    Destroyed,
}

impl Lifecycle {
    /// Lowercase name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Running => "running",
            Self::Restarting { .. } => "restarting",
            Self::Destroyed => "destroyed",
        }
    }
}

/// A snapshot for debug consoles.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineStats {
    /// Lifecycle name.
    pub lifecycle: &'static str,
    /// The active phase.
    pub phase: Option<Phase>,
    /// The phase being transitioned to.
    pub pending_phase: Option<Phase>,
    /// Current resource profile.
    pub performance_mode: PerformanceMode,
    /// Pool population.
    pub elements: PoolStats,
    /// Elements in the document.
    pub dom_nodes: usize,
    /// Tracked tweens.
    pub tweens: usize,
    /// Managed timers.
    pub timers: usize,
    /// Enabled effects.
    pub enabled_effects: Vec<EffectKind>,
    /// Quarantined effects.
    pub quarantined_effects: Vec<EffectKind>,
    /// The root filter as last written.
    pub filter: String,
    /// Whether the scheduler is picking phases.
    pub scheduler_running: bool,
    /// Consecutive unhealthy watchdog ticks.
    pub watchdog_streak: u32,
    /// Soft restarts so far.
    pub soft_restarts: u32,
    /// Completed transitions.
    pub transitions: u64,
    /// Superseded transitions.
    pub superseded_transitions: u64,
}

/// Phase, effect, and resource coordination for one show.
pub struct ChaosEngine<P: Platform, S: EventSink = NoopSink> {
    config: ShowConfig,
    stage: Stage<P>,
    controller: PhaseController<P>,
    scheduler: PhaseScheduler,
    watchdog: Watchdog,
    sink: S,
    rng: SmallRng,
    lifecycle: Lifecycle,
    heap: Option<HeapUsage>,
    reload_requested: bool,
}

impl<P: Platform, S: EventSink> fmt::Debug for ChaosEngine<P, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChaosEngine")
            .field("lifecycle", &self.lifecycle)
            .field("controller", &self.controller)
            .field("scheduler", &self.scheduler)
            .field("stage", &self.stage)
            .finish_non_exhaustive()
    }
}

impl<P: Platform> ChaosEngine<P> {
    /// Builds an engine that publishes nothing.
    #[must_use]
    pub fn without_events(config: ShowConfig, parts: PlatformParts<P>) -> Self {
        Self::new(config, parts, NoopSink)
    }
}

impl<P: Platform, S: EventSink> ChaosEngine<P, S> {
    /// Wires a show from `config` and host services.
    ///
    /// Nothing runs until [`start`](Self::start).
    #[must_use]
    pub fn new(config: ShowConfig, parts: PlatformParts<P>, sink: S) -> Self {
        let budgets = config.budgets();
        let mut stage = Stage::new(parts, config.pool_config());
        stage.tweens.set_max_tweens(Some(tween_cap(budgets.max_tweens)));
        Self {
            scheduler: PhaseScheduler::with_phases(
                config.scheduler_config(),
                config.scheduled_phases(),
            ),
            watchdog: Watchdog::new(config.watchdog_config()),
            rng: SmallRng::seed_from_u64(config.seed.unwrap_or(DEFAULT_SEED)),
            controller: PhaseController::default(),
            stage,
            sink,
            config,
            lifecycle: Lifecycle::Created,
            heap: None,
            reload_requested: false,
        }
    }

    /// Installs the plugin for `kind`.
    pub fn register_effect(&mut self, kind: EffectKind, plugin: Box<dyn VisualEffect>) {
        self.stage.effects.register(kind, plugin);
    }

    /// Replaces the runner for `phase`.
    pub fn install_runner(&mut self, phase: Phase, runner: PhaseRunner<P>) {
        self.controller.install(phase, runner);
    }

    /// Starts the scheduler, watchdog, and cleanup timers.
    ///
    /// The first phase is requested immediately. Does nothing if already
    /// running or after [`destroy`](Self::destroy).
    pub fn start(&mut self, now: HostTime) {
        match self.lifecycle {
            Lifecycle::Created => {}
            Lifecycle::Destroyed => {
                warn!("start after destroy ignored; use restart");
                return;
            }
            Lifecycle::Running | Lifecycle::Restarting { .. } => {
                debug!("start ignored, show is {}", self.lifecycle.name());
                return;
            }
        }
        self.stage.pool.enable();
        self.register_system_timers(now);
        self.scheduler.start(now);
        self.lifecycle = Lifecycle::Running;
        info!(
            "show started: {} mode, phase every {} s",
            self.config.performance_mode,
            self.scheduler.config().period.as_secs_f64()
        );
        self.heartbeat(now);
    }

    /// Runs everything due at `now`.
    ///
    /// `heap` is the latest heap telemetry, if the host has any.
    pub fn pump(&mut self, now: HostTime, heap: Option<HeapUsage>) {
        if self.lifecycle == Lifecycle::Destroyed {
            return;
        }
        if heap.is_some() {
            self.heap = heap;
        }

        for handle in self.stage.timers.due_handles(now) {
            // A task earlier in the batch may have cancelled this one.
            let Some(fired) = self.stage.timers.fire(now, &handle) else {
                continue;
            };
            self.run_task(now, fired.payload);
        }

        if let StepOutcome::Activated(event) =
            self.controller.step(now, &mut self.stage)
        {
            self.sink.on_phase_changed(&event);
        }

        if let Err(err) = self.stage.filter.flush() {
            warn!("deferred filter write failed: {err}");
        }
        self.publish_quarantines(now);
    }

    /// Requests `phase` from the control surface.
    ///
    /// Supersedes any transition in flight and resets the scheduler cadence
    /// so the phase gets a full period.
    pub fn set_phase(
        &mut self,
        now: HostTime,
        phase: Phase,
    ) -> Result<TransitionTicket, ControlError> {
        match self.lifecycle {
            Lifecycle::Created | Lifecycle::Running => {}
            other => return Err(ControlError::Unavailable(other.name())),
        }
        self.scheduler.note_forced(phase, now);
        Ok(self.controller.set_phase(now, phase, true))
    }

    /// Like [`set_phase`](Self::set_phase), by name.
    pub fn force_phase(
        &mut self,
        now: HostTime,
        name: &str,
    ) -> Result<TransitionTicket, ControlError> {
        let phase: Phase = name.parse()?;
        self.set_phase(now, phase)
    }

    /// Finishes the in-flight transition without waiting for pumps.
    pub fn settle(&mut self, now: HostTime) -> Option<PhaseChangedEvent> {
        let event = self.controller.run_to_completion(now, &mut self.stage)?;
        self.sink.on_phase_changed(&event);
        self.publish_quarantines(now);
        Some(event)
    }

    /// The active phase.
    #[must_use]
    pub fn current_phase(&self) -> Option<Phase> {
        self.controller.current_phase()
    }

    /// Switches resource profile. Budgets shrink immediately.
    pub fn set_performance_mode(&mut self, now: HostTime, mode: PerformanceMode) {
        self.config.performance_mode = mode;
        let budgets = self.config.budgets();
        self.stage.pool.set_config(self.config.pool_config());
        self.stage
            .tweens
            .set_max_tweens(Some(tween_cap(budgets.max_tweens)));
        self.scheduler.set_period(now, budgets.scheduler_period);
        self.watchdog.set_config(self.config.watchdog_config());
        let purged = self.stage.pool.purge(now);
        info!("performance mode {mode}, purged {purged} element(s)");
    }

    /// Tears everything down and starts again.
    ///
    /// Quarantines, watchdog history, and a pending reload request are
    /// forgotten. Works from any state, including after
    /// [`destroy`](Self::destroy).
    pub fn restart(&mut self, now: HostTime) {
        info!("show restarting");
        self.teardown();
        self.stage.timers.emergency_stop();
        self.stage.effects.clear_quarantine();
        self.watchdog.reset();
        self.reload_requested = false;
        self.lifecycle = Lifecycle::Created;
        self.start(now);
    }

    /// Stops the show for good and removes everything it created.
    ///
    /// Safe to call more than once. Later element creations bypass the pool.
    pub fn destroy(&mut self) {
        if self.lifecycle == Lifecycle::Destroyed {
            return;
        }
        self.teardown();
        self.stage.timers.emergency_stop();
        self.stage.effects.disable_all();
        self.stage.pool.clear();
        self.stage.pool.disable();
        self.lifecycle = Lifecycle::Destroyed;
        info!("show destroyed");
    }

    /// Runs a watchdog tick now, outside its timer.
    pub fn run_watchdog(&mut self, now: HostTime) -> WatchdogReport {
        let report = {
            let mut vitals = Vitals {
                stage: &mut self.stage,
                controller: &mut self.controller,
                scheduler: &mut self.scheduler,
                lifecycle: &mut self.lifecycle,
                heap: self.heap,
                now,
            };
            self.watchdog.tick(now, &mut vitals)
        };
        if report.level == EscalationLevel::ReloadRequested && !self.reload_requested {
            error!("show cannot recover in-page; page reload requested");
            self.reload_requested = true;
        }
        self.sink.on_watchdog_report(&report);
        if report.level.is_emergency() {
            self.sink
                .on_performance_emergency(&PerformanceEmergencyEvent {
                    level: report.level,
                    streak: report.streak,
                    timestamp: now,
                });
        }
        report
    }

    /// Registers a host callback on the managed timer registry.
    pub fn every(
        &mut self,
        now: HostTime,
        key: TimerKey,
        period: Duration,
        options: TimerOptions,
        callback: impl Fn(HostTime) + 'static,
    ) -> IntervalHandle {
        self.stage
            .timers
            .create_interval(now, key, period, Task::Custom(Rc::new(callback)), options)
    }

    /// A snapshot of counts and state.
    #[must_use]
    pub fn stats(&self) -> EngineStats {
        EngineStats {
            lifecycle: self.lifecycle.name(),
            phase: self.controller.current_phase(),
            pending_phase: self.controller.pending(),
            performance_mode: self.config.performance_mode,
            elements: self.stage.pool.stats(),
            dom_nodes: self.stage.pool.document_node_count(),
            tweens: self.stage.tweens.size(),
            timers: self.stage.timers.len(),
            enabled_effects: self.stage.effects.enabled().collect(),
            quarantined_effects: self.stage.effects.quarantined().collect(),
            filter: self.stage.filter.current().into(),
            scheduler_running: self.scheduler.is_running(),
            watchdog_streak: self.watchdog.streak(),
            soft_restarts: self.watchdog.soft_restarts(),
            transitions: self.controller.completed(),
            superseded_transitions: self.controller.superseded(),
        }
    }

    /// Whether the watchdog gave up and the host should reload the page.
    #[must_use]
    pub fn reload_requested(&self) -> bool {
        self.reload_requested
    }

    /// Lifecycle state.
    #[must_use]
    pub fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    /// The effective configuration.
    #[must_use]
    pub fn config(&self) -> &ShowConfig {
        &self.config
    }

    /// The registries.
    #[must_use]
    pub fn stage(&self) -> &Stage<P> {
        &self.stage
    }

    /// The registries, mutably.
    pub fn stage_mut(&mut self) -> &mut Stage<P> {
        &mut self.stage
    }

    /// The phase controller.
    #[must_use]
    pub fn controller(&self) -> &PhaseController<P> {
        &self.controller
    }

    /// The scheduler.
    #[must_use]
    pub fn scheduler(&self) -> &PhaseScheduler {
        &self.scheduler
    }

    /// The scheduler, mutably (for pausing from a debug console).
    pub fn scheduler_mut(&mut self) -> &mut PhaseScheduler {
        &mut self.scheduler
    }

    /// The watchdog.
    #[must_use]
    pub fn watchdog(&self) -> &Watchdog {
        &self.watchdog
    }

    /// The event sink.
    #[must_use]
    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// The event sink, mutably.
    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    fn register_system_timers(&mut self, now: HostTime) {
        let timers = &mut self.stage.timers;
        timers.create_interval(
            now,
            HEARTBEAT,
            self.scheduler.config().heartbeat,
            Task::SchedulerHeartbeat,
            HEARTBEAT_OPTIONS,
        );
        timers.create_interval(
            now,
            WATCHDOG,
            self.watchdog.config().interval,
            Task::WatchdogTick,
            TimerOptions::new(TimerCategory::Watchdog).permanent(),
        );
        timers.create_interval(
            now,
            AUTO_CLEANUP,
            AUTO_CLEANUP_PERIOD,
            Task::AutoCleanup,
            TimerOptions::new(TimerCategory::Cleanup).permanent(),
        );
    }

    fn run_task(&mut self, now: HostTime, task: Task) {
        match task {
            Task::SchedulerHeartbeat => self.heartbeat(now),
            Task::WatchdogTick => {
                self.run_watchdog(now);
            }
            Task::AutoCleanup => {
                let timers = self.stage.timers.perform_auto_cleanup(now);
                let elements = self.stage.pool.purge(now);
                let tweens = self.stage.tweens.sweep(now);
                if timers + elements + tweens > 0 {
                    debug!(
                        "auto-cleanup: {timers} timer(s), {elements} element(s), {tweens} finished tween(s)"
                    );
                }
            }
            Task::ReleaseElement(id) => {
                self.stage.pool.release(id);
            }
            Task::ResumeAfterRestart => self.resume(now),
            Task::Custom(callback) => callback(now),
        }
    }

    fn heartbeat(&mut self, now: HostTime) {
        if let Some(phase) = self.scheduler.poll(now, &mut self.rng) {
            debug!("scheduler picked {phase}");
            self.controller.set_phase(now, phase, false);
        }
    }

    fn resume(&mut self, now: HostTime) {
        if !matches!(self.lifecycle, Lifecycle::Restarting { .. }) {
            return;
        }
        self.lifecycle = Lifecycle::Created;
        self.start(now);
        info!("show resumed after soft restart");
    }

    fn teardown(&mut self) {
        self.controller.stop(&mut self.stage);
        self.scheduler.stop();
        self.stage.tweens.emergency_stop();
    }

    fn publish_quarantines(&mut self, now: HostTime) {
        for component in self.stage.effects.take_quarantined() {
            self.sink
                .on_component_quarantine(&ComponentQuarantineEvent {
                    component,
                    timestamp: now,
                });
        }
    }
}

/// Tween count above which the oldest transient tweens are killed on
/// creation. Twice the watchdog threshold.
fn tween_cap(max_tweens: usize) -> usize {
    max_tweens.saturating_mul(2)
}

// ---------------------------------------------------------------------------
// Watchdog patient
// ---------------------------------------------------------------------------

/// The engine's components, as seen by the watchdog.
struct Vitals<'a, P: Platform> {
    stage: &'a mut Stage<P>,
    controller: &'a mut PhaseController<P>,
    scheduler: &'a mut PhaseScheduler,
    lifecycle: &'a mut Lifecycle,
    heap: Option<HeapUsage>,
    now: HostTime,
}

impl<P: Platform> Patient for Vitals<'_, P> {
    fn health(&self) -> Health {
        // Before start, during a soft restart, and after destroy nobody
        // expects phases to be picked.
        let idle = *self.lifecycle != Lifecycle::Running;
        Health {
            filter_unsafe: self.stage.filter.is_stuck_unsafe(),
            scheduler_running: self.scheduler.is_running()
                && self.stage.timers.contains(&HEARTBEAT),
            scheduler_explicitly_stopped: self.scheduler.was_explicitly_stopped() || idle,
            dom_nodes: self.stage.pool.document_node_count(),
            managed_elements: self.stage.pool.len(),
            tweens: self.stage.tweens.size(),
            timers: self.stage.timers.len(),
            heap: self.heap,
            singleton_duplicates: self.stage.pool.singleton_duplicates(),
        }
    }

    fn reset_filter(&mut self) -> bool {
        match self.stage.filter.reset() {
            Ok(wrote) => wrote,
            Err(err) => {
                warn!("watchdog filter reset failed: {err}");
                false
            }
        }
    }

    fn restart_scheduler(&mut self) -> bool {
        if *self.lifecycle != Lifecycle::Running || !self.scheduler.resume(self.now) {
            return false;
        }
        self.stage.timers.create_interval(
            self.now,
            HEARTBEAT,
            self.scheduler.config().heartbeat,
            Task::SchedulerHeartbeat,
            HEARTBEAT_OPTIONS,
        );
        warn!("scheduler had stopped; restarted");
        true
    }

    fn purge(&mut self) -> usize {
        self.stage.pool.purge(self.now)
    }

    fn dedupe_singletons(&mut self) -> usize {
        self.stage.pool.dedupe_singletons()
    }

    fn critical_cleanup(&mut self) -> CleanupCounts {
        CleanupCounts {
            tweens: self.stage.tweens.kill_all_transient(),
            timers: self.stage.timers.emergency_stop_except_permanent(),
            elements: self.stage.pool.emergency_cleanup(),
        }
    }

    fn soft_restart(&mut self, delay: Duration) {
        let resume_at = self.now + delay;
        self.controller.stop(self.stage);
        self.scheduler.stop();
        self.stage.timers.cancel(&HEARTBEAT);
        self.stage.tweens.emergency_stop();
        self.stage.timers.emergency_stop_except_permanent();
        self.stage.pool.emergency_cleanup();
        self.stage.timers.create_timeout(
            self.now,
            RESUME,
            delay,
            Task::ResumeAfterRestart,
            TimerOptions::new(TimerCategory::Cleanup).permanent(),
        );
        *self.lifecycle = Lifecycle::Restarting { resume_at };
        warn!("soft restart, resuming at {resume_at:?}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventLog;
    use crate::headless::{Headless, HeadlessKit};

    fn engine(config: ShowConfig) -> (ChaosEngine<Headless, EventLog>, HeadlessKit) {
        let kit = HeadlessKit::new();
        let mut engine = ChaosEngine::new(config, kit.parts(), EventLog::new());
        kit.register_effects(&mut engine.stage_mut().effects);
        (engine, kit)
    }

    #[test]
    fn start_requests_a_phase_and_pumps_activate_it() {
        let (mut engine, _kit) = engine(ShowConfig::default());
        engine.start(HostTime(0));
        assert!(engine.controller().is_transitioning());
        for t in 0..5 {
            engine.pump(HostTime(t), None);
        }
        assert!(engine.current_phase().is_some());
        assert_eq!(engine.sink().phases().count(), 1);
        assert!(engine.stage().timers.contains(&WATCHDOG));
    }

    #[test]
    fn start_is_idempotent() {
        let (mut engine, _kit) = engine(ShowConfig::default());
        engine.start(HostTime(0));
        let timers = engine.stage().timers.len();
        engine.start(HostTime(5));
        assert_eq!(engine.stage().timers.len(), timers);
        assert_eq!(engine.scheduler().picks(), 1);
    }

    #[test]
    fn force_phase_by_name() {
        let (mut engine, _kit) = engine(ShowConfig::default());
        engine.start(HostTime(0));
        let ticket = engine.force_phase(HostTime(1), "Ocean").expect("known phase");
        let event = engine.settle(HostTime(1)).expect("transition in flight");
        assert_eq!(event.phase, Phase::Ocean);
        assert!(event.forced);
        assert!(ticket.is_settled());
        assert!(matches!(
            engine.force_phase(HostTime(2), "disco"),
            Err(ControlError::UnknownPhase(_))
        ));
    }

    #[test]
    fn watchdog_before_start_finds_nothing() {
        let (mut engine, _kit) = engine(ShowConfig::default());
        let report = engine.run_watchdog(HostTime(0));
        assert!(report.is_quiet(), "{report:?}");
        engine.start(HostTime(0));
        engine.destroy();
        let report = engine.run_watchdog(HostTime(1));
        assert!(report.is_quiet(), "{report:?}");
    }

    #[test]
    fn destroy_twice_is_safe() {
        let (mut engine, kit) = engine(ShowConfig::default());
        engine.start(HostTime(0));
        engine.settle(HostTime(0));
        engine.destroy();
        engine.destroy();
        assert_eq!(engine.lifecycle(), Lifecycle::Destroyed);
        assert_eq!(engine.stage().timers.len(), 0);
        assert_eq!(engine.stage().pool.len(), 0);
        assert_eq!(kit.dom.attached_count(), 0);
        assert_eq!(
            engine.set_phase(HostTime(1), Phase::Calm).map(|t| t.phase()),
            Err(ControlError::Unavailable("destroyed"))
        );
        engine.pump(HostTime(100_000), None);
        assert_eq!(kit.tweens.active_count(), 0);
    }

    #[test]
    fn restart_revives_a_destroyed_show() {
        let (mut engine, _kit) = engine(ShowConfig::default());
        engine.start(HostTime(0));
        engine.destroy();
        engine.restart(HostTime(10));
        assert_eq!(engine.lifecycle(), Lifecycle::Running);
        assert!(!engine.stage().pool.is_disabled());
        assert!(engine.controller().is_transitioning());
    }

    #[test]
    fn performance_mode_shrinks_budget() {
        let (mut engine, _kit) = engine(ShowConfig::default());
        engine.set_performance_mode(HostTime(0), PerformanceMode::Low);
        let stats = engine.stats();
        assert_eq!(stats.performance_mode, PerformanceMode::Low);
        assert_eq!(stats.elements.budget, 60);
        assert_eq!(engine.watchdog().config().max_tweens, 80);
    }

    #[test]
    fn custom_timer_runs_on_pump() {
        use core::cell::Cell;

        let (mut engine, _kit) = engine(ShowConfig::default());
        let hits = Rc::new(Cell::new(0));
        let counter = Rc::clone(&hits);
        engine.every(
            HostTime(0),
            TimerKey::from_static("beat"),
            Duration(500),
            TimerOptions::new(TimerCategory::Custom),
            move |_| counter.set(counter.get() + 1),
        );
        engine.pump(HostTime(500), None);
        engine.pump(HostTime(1_000), None);
        assert_eq!(hits.get(), 2);
    }
}
