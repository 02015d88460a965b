// Copyright 2026 the Chaos Show Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Phase selection on a cadence.
//!
//! The [`PhaseScheduler`] decides *when* the show moves on and *where to*.
//! It never talks to the controller itself: [`poll`](PhaseScheduler::poll)
//! returns the phase to switch to and the caller hands it to
//! [`PhaseController::set_phase`](crate::controller::PhaseController::set_phase).
//! Whether the previous transition has finished is irrelevant; the controller
//! supersedes it.
//!
//! Selection is uniform over the configured phases minus the one chosen last,
//! so a phase never follows itself (with a single configured phase there is
//! nothing else to pick and it repeats).

use alloc::vec::Vec;

use log::debug;
use rand::Rng;

use crate::phase::Phase;
use crate::time::{Duration, HostTime};

/// Configuration for the [`PhaseScheduler`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SchedulerConfig {
    /// Time between scheduled phase changes.
    pub period: Duration,
    /// Whether [`start`](PhaseScheduler::start) picks a phase right away
    /// instead of one period later.
    pub first_immediate: bool,
    /// How often the engine polls the scheduler.
    pub heartbeat: Duration,
}

impl SchedulerConfig {
    /// Forty seconds per phase, first phase immediately.
    pub const DEFAULT: Self = Self {
        period: Duration::from_secs(40),
        first_immediate: true,
        heartbeat: Duration::from_secs(1),
    };
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Chooses the next phase and when to switch to it.
#[derive(Clone, Debug)]
pub struct PhaseScheduler {
    config: SchedulerConfig,
    phases: Vec<Phase>,
    last: Option<Phase>,
    next_at: Option<HostTime>,
    running: bool,
    explicitly_stopped: bool,
    picks: u64,
}

impl PhaseScheduler {
    /// A stopped scheduler over every phase.
    #[must_use]
    pub fn new(config: SchedulerConfig) -> Self {
        Self::with_phases(config, Phase::ALL.to_vec())
    }

    /// A stopped scheduler over `phases`.
    ///
    /// Duplicates are dropped. An empty list means every phase.
    #[must_use]
    pub fn with_phases(config: SchedulerConfig, mut phases: Vec<Phase>) -> Self {
        phases.sort_by_key(|p| p.index());
        phases.dedup();
        if phases.is_empty() {
            phases = Phase::ALL.to_vec();
        }
        Self {
            config,
            phases,
            last: None,
            next_at: None,
            running: false,
            explicitly_stopped: false,
            picks: 0,
        }
    }

    /// Begins choosing phases.
    pub fn start(&mut self, now: HostTime) {
        self.running = true;
        self.explicitly_stopped = false;
        self.next_at = Some(if self.config.first_immediate {
            now
        } else {
            now + self.config.period
        });
        debug!("scheduler started, first pick at {:?}", self.next_at);
    }

    /// Halts future selections. The active phase is left alone.
    pub fn stop(&mut self) {
        self.running = false;
        self.explicitly_stopped = true;
        self.next_at = None;
    }

    /// Restarts after an unexpected stop, one period from `now`.
    ///
    /// Does nothing after an explicit [`stop`](Self::stop).
    pub fn resume(&mut self, now: HostTime) -> bool {
        if self.explicitly_stopped {
            return false;
        }
        self.running = true;
        self.next_at = Some(now + self.config.period);
        true
    }

    /// Returns the phase to switch to if a change is due at `now`.
    pub fn poll(&mut self, now: HostTime, rng: &mut impl Rng) -> Option<Phase> {
        if !self.running || self.next_at.is_none_or(|at| at > now) {
            return None;
        }
        let phase = self.choose_next(rng);
        self.last = Some(phase);
        self.next_at = Some(now + self.config.period);
        self.picks += 1;
        Some(phase)
    }

    /// Picks uniformly among the configured phases except the last one.
    pub fn choose_next(&self, rng: &mut impl Rng) -> Phase {
        let candidates: Vec<Phase> = self
            .phases
            .iter()
            .copied()
            .filter(|&p| Some(p) != self.last)
            .collect();
        match candidates.len() {
            0 => self.phases[0],
            n => candidates[rng.gen_range(0..n)],
        }
    }

    /// Records a phase chosen outside the scheduler.
    ///
    /// The forced phase counts as the last pick and gets a full period.
    pub fn note_forced(&mut self, phase: Phase, now: HostTime) {
        self.last = Some(phase);
        if self.running {
            self.next_at = Some(now + self.config.period);
        }
    }

    /// Changes the period. A pending change further out than one new period
    /// from `now` is brought forward.
    pub fn set_period(&mut self, now: HostTime, period: Duration) {
        self.config.period = period;
        if let Some(at) = self.next_at {
            self.next_at = Some(at.min(now + period));
        }
    }

    /// Whether selections are happening.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Whether the last stop was requested through [`stop`](Self::stop).
    #[must_use]
    pub fn was_explicitly_stopped(&self) -> bool {
        self.explicitly_stopped
    }

    /// The most recent pick, forced or scheduled.
    #[must_use]
    pub fn last(&self) -> Option<Phase> {
        self.last
    }

    /// When the next pick is due.
    #[must_use]
    pub fn next_at(&self) -> Option<HostTime> {
        self.next_at
    }

    /// Number of scheduled picks so far.
    #[must_use]
    pub fn picks(&self) -> u64 {
        self.picks
    }

    /// The current configuration.
    #[must_use]
    pub fn config(&self) -> SchedulerConfig {
        self.config
    }

    /// The phases picked from.
    #[must_use]
    pub fn phases(&self) -> &[Phase] {
        &self.phases
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    use super::*;

    #[test]
    fn first_pick_is_immediate_then_periodic() {
        let mut rng = SmallRng::seed_from_u64(1);
        let mut sched = PhaseScheduler::new(SchedulerConfig::DEFAULT);
        assert_eq!(sched.poll(HostTime(0), &mut rng), None, "not started");
        sched.start(HostTime(0));
        assert!(sched.poll(HostTime(0), &mut rng).is_some());
        assert_eq!(sched.poll(HostTime(39_999), &mut rng), None);
        assert!(sched.poll(HostTime(40_000), &mut rng).is_some());
        assert_eq!(sched.picks(), 2);
    }

    #[test]
    fn never_repeats_immediately() {
        let mut rng = SmallRng::seed_from_u64(7);
        let sched_config = SchedulerConfig {
            period: Duration(1),
            ..SchedulerConfig::DEFAULT
        };
        let mut sched =
            PhaseScheduler::with_phases(sched_config, [Phase::Calm, Phase::Fire].into());
        sched.start(HostTime(0));
        let mut prev = None;
        for t in 0..500 {
            let pick = sched.poll(HostTime(t), &mut rng);
            assert!(pick.is_some(), "a pick is due every tick");
            assert_ne!(pick, prev, "repeat at tick {t}");
            prev = pick;
        }
    }

    #[test]
    fn single_phase_list_repeats() {
        let mut rng = SmallRng::seed_from_u64(0);
        let mut sched = PhaseScheduler::with_phases(
            SchedulerConfig::DEFAULT,
            [Phase::Ice, Phase::Ice].into(),
        );
        assert_eq!(sched.phases(), [Phase::Ice]);
        sched.note_forced(Phase::Ice, HostTime(0));
        assert_eq!(sched.choose_next(&mut rng), Phase::Ice);
    }

    #[test]
    fn explicit_stop_blocks_resume() {
        let mut sched = PhaseScheduler::new(SchedulerConfig::DEFAULT);
        sched.start(HostTime(0));
        sched.stop();
        assert!(sched.was_explicitly_stopped());
        assert!(!sched.resume(HostTime(10)));
        assert!(!sched.is_running());
        sched.start(HostTime(20));
        assert!(!sched.was_explicitly_stopped());
    }

    #[test]
    fn forced_phase_gets_full_period() {
        let mut rng = SmallRng::seed_from_u64(3);
        let mut sched = PhaseScheduler::new(SchedulerConfig::DEFAULT);
        sched.start(HostTime(0));
        _ = sched.poll(HostTime(0), &mut rng);
        sched.note_forced(Phase::Matrix, HostTime(30_000));
        assert_eq!(sched.next_at(), Some(HostTime(70_000)));
        assert_eq!(sched.last(), Some(Phase::Matrix));
        assert_ne!(sched.choose_next(&mut rng), Phase::Matrix);
    }

    #[test]
    fn shorter_period_pulls_next_pick_forward() {
        let mut sched = PhaseScheduler::new(SchedulerConfig {
            first_immediate: false,
            ..SchedulerConfig::DEFAULT
        });
        sched.start(HostTime(0));
        assert_eq!(sched.next_at(), Some(HostTime(40_000)));
        sched.set_period(HostTime(5_000), Duration::from_secs(10));
        assert_eq!(sched.next_at(), Some(HostTime(15_000)));
        sched.set_period(HostTime(6_000), Duration::from_secs(60));
        assert_eq!(sched.next_at(), Some(HostTime(15_000)), "never pushed back");
    }
}
