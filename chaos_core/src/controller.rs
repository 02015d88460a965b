// Copyright 2026 the Chaos Show Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The phase state machine.
//!
//! ```text
//! Idle ──set_phase──▶ Transitioning ──5 steps──▶ Active
//!                       ▲       │                  │
//!                       └───────┴────set_phase─────┘
//!
//! any state ──stop──▶ Idle
//! ```
//!
//! A transition is a fixed sequence of [`TransitionStep`]s. Each call to
//! [`step`](PhaseController::step) performs exactly one; the gaps between
//! calls are the only points where a transition can be interrupted.
//! [`set_phase`](PhaseController::set_phase) while a transition is in flight
//! marks the old one [`Superseded`](TransitionStatus::Superseded) and starts
//! over toward the new phase. Steps the old transition already took stay
//! applied; the new transition's steps overwrite the same state.
//!
//! Only one transition exists at a time and a runner runs to completion
//! inside a single step, so two runners can never interleave.

use alloc::rc::Rc;
use alloc::vec::Vec;
use core::cell::Cell;
use core::fmt;

use log::{debug, info, warn};

use crate::events::PhaseChangedEvent;
use crate::interval::TimerCategory;
use crate::phase::Phase;
use crate::platform::Platform;
use crate::stage::{PhaseContext, PhaseRunner, PhaseTable, Stage};
use crate::time::HostTime;
use crate::tween::OwnerKey;

/// Where the controller is.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ControllerState {
    /// No phase active.
    #[default]
    Idle,
    /// Moving toward `to`.
    Transitioning {
        /// The last active phase.
        from: Option<Phase>,
        /// The requested phase.
        to: Phase,
    },
    /// A phase is running.
    Active(Phase),
}

/// One step of a transition, in execution order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TransitionStep {
    /// Turn off effects the incoming phase does not need.
    DisableEffects,
    /// Kill tweens owned by earlier phases.
    KillTweens,
    /// Release transient elements and phase timers.
    PurgeTransient,
    /// Run the incoming phase's runner.
    RunPhase,
    /// Mark the phase active.
    Activate,
}

impl TransitionStep {
    /// The step after this one.
    #[must_use]
    pub const fn next(self) -> Option<Self> {
        match self {
            Self::DisableEffects => Some(Self::KillTweens),
            Self::KillTweens => Some(Self::PurgeTransient),
            Self::PurgeTransient => Some(Self::RunPhase),
            Self::RunPhase => Some(Self::Activate),
            Self::Activate => None,
        }
    }
}

/// How a transition ended, or that it has not.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TransitionStatus {
    /// Still in flight.
    Pending,
    /// The phase became active.
    Completed,
    /// A later request replaced it. Not an error.
    Superseded,
}

/// A caller's view of one requested transition.
///
/// Cloning shares the status. The browser backend turns a ticket into a
/// promise that resolves once the status leaves [`Pending`](TransitionStatus::Pending).
#[derive(Clone)]
pub struct TransitionTicket {
    phase: Phase,
    status: Rc<Cell<TransitionStatus>>,
}

impl fmt::Debug for TransitionTicket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransitionTicket")
            .field("phase", &self.phase)
            .field("status", &self.status.get())
            .finish()
    }
}

impl TransitionTicket {
    /// The requested phase.
    #[must_use]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Current status.
    #[must_use]
    pub fn status(&self) -> TransitionStatus {
        self.status.get()
    }

    /// Whether the transition finished one way or the other.
    #[must_use]
    pub fn is_settled(&self) -> bool {
        self.status() != TransitionStatus::Pending
    }

    /// Whether a later request replaced this one.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.status() == TransitionStatus::Superseded
    }
}

/// What one [`step`](PhaseController::step) did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StepOutcome {
    /// No transition in flight.
    Idle,
    /// Performed this step; more remain.
    Advanced(TransitionStep),
    /// The transition finished.
    Activated(PhaseChangedEvent),
}

struct InFlight {
    from: Option<Phase>,
    to: Phase,
    forced: bool,
    started_at: HostTime,
    next: TransitionStep,
    failures: u32,
    status: Rc<Cell<TransitionStatus>>,
}

/// Holds the current phase and drives transitions between phases.
pub struct PhaseController<P: Platform> {
    table: PhaseTable<P>,
    state: ControllerState,
    active: Option<Phase>,
    in_flight: Option<InFlight>,
    /// Phases whose runners ran and whose tweens may still be alive.
    dirty: Vec<Phase>,
    completed: u64,
    superseded: u64,
}

impl<P: Platform> fmt::Debug for PhaseController<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PhaseController")
            .field("state", &self.state)
            .field("next_step", &self.in_flight.as_ref().map(|t| t.next))
            .field("dirty", &self.dirty)
            .field("completed", &self.completed)
            .field("superseded", &self.superseded)
            .finish_non_exhaustive()
    }
}

impl<P: Platform> Default for PhaseController<P> {
    fn default() -> Self {
        Self::new(PhaseTable::default())
    }
}

impl<P: Platform> PhaseController<P> {
    /// An idle controller running phases from `table`.
    #[must_use]
    pub fn new(table: PhaseTable<P>) -> Self {
        Self {
            table,
            state: ControllerState::Idle,
            active: None,
            in_flight: None,
            dirty: Vec::new(),
            completed: 0,
            superseded: 0,
        }
    }

    /// Starts a transition to `phase`, superseding any in flight.
    pub fn set_phase(&mut self, now: HostTime, phase: Phase, forced: bool) -> TransitionTicket {
        self.supersede();
        let status = Rc::new(Cell::new(TransitionStatus::Pending));
        debug!("transition {:?} -> {phase} requested", self.active);
        self.in_flight = Some(InFlight {
            from: self.active,
            to: phase,
            forced,
            started_at: now,
            next: TransitionStep::DisableEffects,
            failures: 0,
            status: Rc::clone(&status),
        });
        self.state = ControllerState::Transitioning {
            from: self.active,
            to: phase,
        };
        TransitionTicket { phase, status }
    }

    /// Performs the next step of the in-flight transition.
    pub fn step(&mut self, now: HostTime, stage: &mut Stage<P>) -> StepOutcome {
        let Some(flight) = self.in_flight.as_mut() else {
            return StepOutcome::Idle;
        };
        let step = flight.next;
        let to = flight.to;
        match step {
            TransitionStep::DisableEffects => {
                let off = stage.effects.disable_all_transient(to.recipe().effects);
                debug!("{to}: disabled {off} effect(s)");
            }
            TransitionStep::KillTweens => {
                let mut killed = 0;
                for phase in self.dirty.drain(..) {
                    killed += stage.tweens.kill_owner(&OwnerKey::Phase(phase));
                }
                debug!("{to}: killed {killed} phase tween(s)");
            }
            TransitionStep::PurgeTransient => {
                let released = stage.pool.release_transient();
                let cancelled = stage.timers.cancel_category(TimerCategory::Phase);
                let purged = stage.pool.purge(now);
                debug!(
                    "{to}: released {released} transient element(s), cancelled {cancelled} timer(s), purged {purged}"
                );
            }
            TransitionStep::RunPhase => {
                if !self.dirty.contains(&to) {
                    self.dirty.push(to);
                }
                let mut ctx = PhaseContext::new(stage, to, now);
                let result = self.table.run(&mut ctx);
                let mut failures = ctx.failures();
                if let Err(err) = result {
                    warn!("{to} runner failed: {err}");
                    failures = failures.max(1);
                }
                flight.failures = failures;
            }
            TransitionStep::Activate => {
                let Some(flight) = self.in_flight.take() else {
                    return StepOutcome::Idle;
                };
                flight.status.set(TransitionStatus::Completed);
                self.state = ControllerState::Active(to);
                self.active = Some(to);
                self.completed += 1;
                info!(
                    "phase {to} active ({} ms, {} failure(s))",
                    now.saturating_duration_since(flight.started_at).millis(),
                    flight.failures
                );
                return StepOutcome::Activated(PhaseChangedEvent {
                    phase: to,
                    previous: flight.from,
                    forced: flight.forced,
                    runner_failures: flight.failures,
                    timestamp: now,
                });
            }
        }
        if let Some(next) = step.next() {
            flight.next = next;
        }
        StepOutcome::Advanced(step)
    }

    /// Steps until the in-flight transition activates.
    ///
    /// Returns `None` when nothing was in flight.
    pub fn run_to_completion(
        &mut self,
        now: HostTime,
        stage: &mut Stage<P>,
    ) -> Option<PhaseChangedEvent> {
        loop {
            match self.step(now, stage) {
                StepOutcome::Idle => return None,
                StepOutcome::Advanced(_) => {}
                StepOutcome::Activated(event) => return Some(event),
            }
        }
    }

    /// Ends the current phase and returns to [`Idle`](ControllerState::Idle).
    ///
    /// Phase tweens, transient elements, phase timers, and non-permanent
    /// effects are cleared and the root filter is reset.
    pub fn stop(&mut self, stage: &mut Stage<P>) {
        self.supersede();
        stage.effects.disable_all_transient(&[]);
        for phase in self.dirty.drain(..) {
            stage.tweens.kill_owner(&OwnerKey::Phase(phase));
        }
        stage.pool.release_transient();
        stage.timers.cancel_category(TimerCategory::Phase);
        if let Err(err) = stage.filter.reset() {
            warn!("filter reset on stop failed: {err}");
        }
        self.state = ControllerState::Idle;
        self.active = None;
    }

    /// Replaces one phase's runner.
    pub fn install(&mut self, phase: Phase, runner: PhaseRunner<P>) {
        self.table.install(phase, runner);
    }

    /// The last phase to become active. Unchanged while a transition runs.
    #[must_use]
    pub fn current_phase(&self) -> Option<Phase> {
        self.active
    }

    /// The phase being transitioned to, if any.
    #[must_use]
    pub fn pending(&self) -> Option<Phase> {
        self.in_flight.as_ref().map(|t| t.to)
    }

    /// The state machine's position.
    #[must_use]
    pub fn state(&self) -> ControllerState {
        self.state
    }

    /// Whether a transition is in flight.
    #[must_use]
    pub fn is_transitioning(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Transitions that reached [`Activate`](TransitionStep::Activate).
    #[must_use]
    pub fn completed(&self) -> u64 {
        self.completed
    }

    /// Transitions replaced before finishing.
    #[must_use]
    pub fn superseded(&self) -> u64 {
        self.superseded
    }

    fn supersede(&mut self) {
        if let Some(old) = self.in_flight.take() {
            debug!("transition to {} superseded before {:?}", old.to, old.next);
            old.status.set(TransitionStatus::Superseded);
            self.superseded += 1;
        }
    }
}
