// Copyright 2026 the Chaos Show Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Periodic health checks and self-repair.
//!
//! The [`Watchdog`] owns no resources. Each [`tick`](Watchdog::tick) reads a
//! [`Health`] snapshot from a [`Patient`], repairs what is wrong, and returns
//! a [`WatchdogReport`] describing what it saw and did.
//!
//! ## Checks
//!
//! Each check fires only when its own condition holds, so a tick over a
//! healthy patient performs no repairs:
//!
//! - root filter unsafe: reset it;
//! - scheduler stopped without an explicit stop: restart it;
//! - duplicate singleton overlays: keep the oldest of each;
//! - resource pressure (document nodes, managed elements, tweens, or heap
//!   over threshold): climb the escalation ladder.
//!
//! ## Escalation ladder
//!
//! Consecutive ticks under pressure form a *streak*:
//!
//! | Condition | Level | Action |
//! |---|---|---|
//! | pressure, short streak | [`Warning`](EscalationLevel::Warning) | purge the pool |
//! | streak ≥ `critical_after`, or heap ≥ `heap_critical` | [`Critical`](EscalationLevel::Critical) | kill non-permanent tweens and timers, emergency purge |
//! | streak ≥ `restart_after` | [`SoftRestart`](EscalationLevel::SoftRestart) | stop everything and resume after `restart_delay` |
//! | soft restarts exhausted | [`ReloadRequested`](EscalationLevel::ReloadRequested) | none; the host decides |
//!
//! A tick without pressure resets the streak.

use alloc::vec::Vec;

use log::{error, info, warn};
use serde::Serialize;

use crate::config::Budgets;
use crate::time::{Duration, HostTime};

/// Thresholds and cadence for the [`Watchdog`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WatchdogConfig {
    /// Time between ticks.
    pub interval: Duration,
    /// Document element count considered runaway.
    pub max_dom_nodes: usize,
    /// Managed element count considered runaway.
    pub max_managed_elements: usize,
    /// Tracked tween count considered runaway.
    pub max_tweens: usize,
    /// Heap usage ratio that counts as pressure.
    pub heap_warning: f64,
    /// Heap usage ratio that goes straight to critical cleanup.
    pub heap_critical: f64,
    /// Streak length that escalates to critical cleanup.
    pub critical_after: u32,
    /// Streak length that escalates to a soft restart.
    pub restart_after: u32,
    /// Soft restarts allowed before a reload is requested.
    pub max_soft_restarts: u32,
    /// Pause between a soft restart's teardown and the show resuming.
    pub restart_delay: Duration,
}

impl WatchdogConfig {
    /// Balanced thresholds, ticking every twenty seconds.
    pub const DEFAULT: Self = Self {
        interval: Duration::from_secs(20),
        max_dom_nodes: 1_500,
        max_managed_elements: 150,
        max_tweens: 200,
        heap_warning: 0.75,
        heap_critical: 0.9,
        critical_after: 2,
        restart_after: 4,
        max_soft_restarts: 3,
        restart_delay: Duration::from_millis(1_500),
    };

    /// Takes the resource thresholds from `budgets`.
    #[must_use]
    pub const fn with_budgets(mut self, budgets: &Budgets) -> Self {
        self.max_dom_nodes = budgets.max_dom_nodes;
        self.max_managed_elements = budgets.element_budget;
        self.max_tweens = budgets.max_tweens;
        self
    }
}

impl Default for WatchdogConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

// ---------------------------------------------------------------------------
// Health snapshot
// ---------------------------------------------------------------------------

/// JS heap telemetry, where the browser exposes it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HeapUsage {
    /// Bytes in use.
    pub used: u64,
    /// Bytes the heap may grow to.
    pub limit: u64,
}

impl HeapUsage {
    /// Fraction of the limit in use. Zero when the limit is unknown.
    #[must_use]
    pub fn ratio(self) -> f64 {
        if self.limit == 0 {
            return 0.0;
        }
        self.used as f64 / self.limit as f64
    }
}

/// What the watchdog looks at.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Health {
    /// The page-root filter fails sanitization.
    pub filter_unsafe: bool,
    /// The scheduler is picking phases.
    pub scheduler_running: bool,
    /// The scheduler was stopped on purpose.
    pub scheduler_explicitly_stopped: bool,
    /// Elements in the document.
    pub dom_nodes: usize,
    /// Elements tracked by the pool.
    pub managed_elements: usize,
    /// Tracked tweens.
    pub tweens: usize,
    /// Managed timers.
    pub timers: usize,
    /// Heap telemetry, if available.
    pub heap: Option<HeapUsage>,
    /// Surplus singleton overlays.
    pub singleton_duplicates: usize,
}

/// Something found wrong on a tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum Finding {
    /// The root filter holds a disallowed term or out-of-range value.
    FilterUnsafe,
    /// The scheduler stopped without being asked to.
    SchedulerStopped,
    /// Too many elements in the document.
    DomNodesOver {
        /// Observed count.
        count: usize,
        /// Threshold.
        limit: usize,
    },
    /// Too many managed elements.
    ManagedElementsOver {
        /// Observed count.
        count: usize,
        /// Threshold.
        limit: usize,
    },
    /// Too many tracked tweens.
    TweensOver {
        /// Observed count.
        count: usize,
        /// Threshold.
        limit: usize,
    },
    /// Heap usage above the warning mark.
    HeapHigh {
        /// Usage in thousandths of the limit.
        permille: u32,
    },
    /// More than one live instance of a singleton overlay.
    DuplicateSingletons {
        /// Surplus instances.
        count: usize,
    },
}

impl Finding {
    /// Whether this finding counts toward the escalation streak.
    #[must_use]
    pub const fn is_pressure(self) -> bool {
        matches!(
            self,
            Self::DomNodesOver { .. }
                | Self::ManagedElementsOver { .. }
                | Self::TweensOver { .. }
                | Self::HeapHigh { .. }
        )
    }
}

/// What critical cleanup removed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct CleanupCounts {
    /// Elements removed.
    pub elements: usize,
    /// Tweens killed.
    pub tweens: usize,
    /// Timers cancelled.
    pub timers: usize,
}

/// Something done on a tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum Repair {
    /// The root filter was reset to `none`.
    ResetFilter,
    /// The scheduler was restarted.
    RestartScheduler,
    /// The pool purged expired and over-budget elements.
    Purged {
        /// Elements removed.
        removed: usize,
    },
    /// Surplus singleton overlays were removed.
    DedupedSingletons {
        /// Elements removed.
        removed: usize,
    },
    /// Everything not permanent was stopped.
    CriticalCleanup {
        /// Elements removed.
        elements: usize,
        /// Tweens killed.
        tweens: usize,
        /// Timers cancelled.
        timers: usize,
    },
    /// The show was torn down and will resume shortly.
    SoftRestart,
}

/// How far a tick escalated.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum EscalationLevel {
    /// Nothing wrong.
    #[default]
    Healthy,
    /// Routine repairs only.
    Warning,
    /// Critical cleanup ran.
    Critical,
    /// A soft restart was started.
    SoftRestart,
    /// Nothing left to try in-page.
    ReloadRequested,
}

impl EscalationLevel {
    /// Lowercase name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Healthy => "healthy",
            Self::Warning => "warning",
            Self::Critical => "critical",
            Self::SoftRestart => "soft-restart",
            Self::ReloadRequested => "reload-requested",
        }
    }

    /// Whether this level is announced as a performance emergency.
    #[must_use]
    pub const fn is_emergency(self) -> bool {
        matches!(
            self,
            Self::Critical | Self::SoftRestart | Self::ReloadRequested
        )
    }
}

impl core::fmt::Display for EscalationLevel {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.name())
    }
}

/// The outcome of one tick.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WatchdogReport {
    /// When the tick ran.
    pub timestamp: HostTime,
    /// How far it escalated.
    pub level: EscalationLevel,
    /// Consecutive ticks under pressure, including this one.
    pub streak: u32,
    /// Soft restarts so far.
    pub soft_restarts: u32,
    /// What was wrong.
    pub findings: Vec<Finding>,
    /// What was done.
    pub repairs: Vec<Repair>,
}

impl WatchdogReport {
    /// Whether the tick did anything.
    #[must_use]
    pub fn is_quiet(&self) -> bool {
        self.findings.is_empty() && self.repairs.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Patient
// ---------------------------------------------------------------------------

/// The system a [`Watchdog`] inspects and repairs.
///
/// Repairs report what they changed so the watchdog only records real work.
pub trait Patient {
    /// A fresh snapshot.
    fn health(&self) -> Health;

    /// Resets the root filter. Returns whether a write happened.
    fn reset_filter(&mut self) -> bool;

    /// Restarts the scheduler. Returns whether it was restarted.
    fn restart_scheduler(&mut self) -> bool;

    /// Purges expired and over-budget elements. Returns how many went.
    fn purge(&mut self) -> usize;

    /// Removes surplus singleton overlays. Returns how many went.
    fn dedupe_singletons(&mut self) -> usize;

    /// Stops everything not flagged permanent.
    fn critical_cleanup(&mut self) -> CleanupCounts;

    /// Tears the show down and schedules it to resume after `delay`.
    fn soft_restart(&mut self, delay: Duration);
}

// ---------------------------------------------------------------------------
// Watchdog
// ---------------------------------------------------------------------------

/// The health-check state machine.
#[derive(Clone, Debug)]
pub struct Watchdog {
    config: WatchdogConfig,
    streak: u32,
    soft_restarts: u32,
    ticks: u64,
}

impl Watchdog {
    /// A watchdog with no history.
    #[must_use]
    pub fn new(config: WatchdogConfig) -> Self {
        Self {
            config,
            streak: 0,
            soft_restarts: 0,
            ticks: 0,
        }
    }

    /// Inspects `patient` and repairs what is wrong.
    pub fn tick(&mut self, now: HostTime, patient: &mut impl Patient) -> WatchdogReport {
        self.ticks += 1;
        let health = patient.health();
        let mut findings = Vec::new();
        let mut repairs = Vec::new();

        if health.filter_unsafe {
            findings.push(Finding::FilterUnsafe);
            if patient.reset_filter() {
                repairs.push(Repair::ResetFilter);
            }
        }

        if !health.scheduler_running && !health.scheduler_explicitly_stopped {
            findings.push(Finding::SchedulerStopped);
            if patient.restart_scheduler() {
                repairs.push(Repair::RestartScheduler);
            }
        }

        if health.singleton_duplicates > 0 {
            findings.push(Finding::DuplicateSingletons {
                count: health.singleton_duplicates,
            });
            let removed = patient.dedupe_singletons();
            if removed > 0 {
                repairs.push(Repair::DedupedSingletons { removed });
            }
        }

        let pressure_start = findings.len();
        self.check_resources(&health, &mut findings);
        let under_pressure = findings.len() > pressure_start;
        let heap_critical = health
            .heap
            .is_some_and(|h| h.ratio() >= self.config.heap_critical);

        let level = if under_pressure {
            self.streak += 1;
            self.escalate(heap_critical, patient, &mut repairs)
        } else {
            self.streak = 0;
            if findings.is_empty() {
                EscalationLevel::Healthy
            } else {
                EscalationLevel::Warning
            }
        };

        if level > EscalationLevel::Healthy {
            info!(
                "watchdog: {level}, {} finding(s), {} repair(s), streak {}",
                findings.len(),
                repairs.len(),
                self.streak
            );
        }

        WatchdogReport {
            timestamp: now,
            level,
            streak: self.streak,
            soft_restarts: self.soft_restarts,
            findings,
            repairs,
        }
    }

    fn check_resources(&self, health: &Health, findings: &mut Vec<Finding>) {
        let c = &self.config;
        if health.dom_nodes > c.max_dom_nodes {
            findings.push(Finding::DomNodesOver {
                count: health.dom_nodes,
                limit: c.max_dom_nodes,
            });
        }
        if health.managed_elements > c.max_managed_elements {
            findings.push(Finding::ManagedElementsOver {
                count: health.managed_elements,
                limit: c.max_managed_elements,
            });
        }
        if health.tweens > c.max_tweens {
            findings.push(Finding::TweensOver {
                count: health.tweens,
                limit: c.max_tweens,
            });
        }
        if let Some(heap) = health.heap
            && heap.ratio() >= c.heap_warning
        {
            findings.push(Finding::HeapHigh {
                permille: permille(heap.ratio()),
            });
        }
    }

    fn escalate(
        &mut self,
        heap_critical: bool,
        patient: &mut impl Patient,
        repairs: &mut Vec<Repair>,
    ) -> EscalationLevel {
        let c = self.config;
        if self.streak >= c.restart_after {
            if self.soft_restarts >= c.max_soft_restarts {
                error!(
                    "watchdog: {} soft restarts did not relieve pressure, requesting page reload",
                    self.soft_restarts
                );
                return EscalationLevel::ReloadRequested;
            }
            self.soft_restarts += 1;
            self.streak = 0;
            warn!("watchdog: soft restart {}", self.soft_restarts);
            patient.soft_restart(c.restart_delay);
            repairs.push(Repair::SoftRestart);
            return EscalationLevel::SoftRestart;
        }
        if self.streak >= c.critical_after || heap_critical {
            let counts = patient.critical_cleanup();
            warn!("watchdog: critical cleanup {counts:?}");
            repairs.push(Repair::CriticalCleanup {
                elements: counts.elements,
                tweens: counts.tweens,
                timers: counts.timers,
            });
            return EscalationLevel::Critical;
        }
        let removed = patient.purge();
        if removed > 0 {
            repairs.push(Repair::Purged { removed });
        }
        EscalationLevel::Warning
    }

    /// Forgets the streak and restart count.
    pub fn reset(&mut self) {
        self.streak = 0;
        self.soft_restarts = 0;
    }

    /// Replaces the thresholds, keeping history.
    pub fn set_config(&mut self, config: WatchdogConfig) {
        self.config = config;
    }

    /// The current thresholds.
    #[must_use]
    pub fn config(&self) -> &WatchdogConfig {
        &self.config
    }

    /// Consecutive ticks under pressure.
    #[must_use]
    pub fn streak(&self) -> u32 {
        self.streak
    }

    /// Soft restarts since the last [`reset`](Self::reset).
    #[must_use]
    pub fn soft_restarts(&self) -> u32 {
        self.soft_restarts
    }

    /// Ticks run so far.
    #[must_use]
    pub fn ticks(&self) -> u64 {
        self.ticks
    }
}

#[expect(
    clippy::cast_possible_truncation,
    reason = "ratio is clamped to [0, 1000] before the cast"
)]
fn permille(ratio: f64) -> u32 {
    libm::round((ratio * 1000.0).clamp(0.0, 1000.0)) as u32
}
