// Copyright 2026 the Chaos Show Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Published notifications.
//!
//! The engine reports what happened through an [`EventSink`]. Every method
//! defaults to a no-op, so a sink only overrides what it cares about.
//! Notifications are fire-and-forget: sinks cannot fail and cannot influence
//! the show.
//!
//! Sinks in this workspace:
//!
//! - [`NoopSink`] discards everything.
//! - [`EventLog`] keeps every event in memory.
//! - `chaos_debug` has pretty-printing and JSON-lines sinks.
//! - `chaos_backend_web` dispatches `CustomEvent`s on `window`.

use alloc::vec::Vec;

use serde::Serialize;

use crate::effect::EffectKind;
use crate::phase::Phase;
use crate::time::HostTime;
use crate::watchdog::{EscalationLevel, WatchdogReport};

// ---------------------------------------------------------------------------
// Event structs
// ---------------------------------------------------------------------------

/// A phase became active.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PhaseChangedEvent {
    /// The phase now active.
    pub phase: Phase,
    /// The phase it replaced, if any.
    pub previous: Option<Phase>,
    /// Whether the change was requested through the control surface rather
    /// than chosen by the scheduler.
    pub forced: bool,
    /// Number of runner failures during the transition.
    pub runner_failures: u32,
    /// When the phase became active.
    pub timestamp: HostTime,
}

/// The watchdog escalated past routine cleanup.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceEmergencyEvent {
    /// How far the escalation went.
    pub level: EscalationLevel,
    /// Consecutive unhealthy watchdog ticks so far.
    pub streak: u32,
    /// When the watchdog decided.
    pub timestamp: HostTime,
}

/// A component failed repeatedly and will not be used again until restart.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentQuarantineEvent {
    /// The quarantined effect.
    pub component: EffectKind,
    /// When it was quarantined.
    pub timestamp: HostTime,
}

// ---------------------------------------------------------------------------
// EventSink trait
// ---------------------------------------------------------------------------

/// Receives engine notifications.
///
/// All methods have default no-op implementations.
pub trait EventSink {
    /// Called when a phase becomes active.
    fn on_phase_changed(&mut self, e: &PhaseChangedEvent) {
        _ = e;
    }

    /// Called when the watchdog escalates to critical or beyond.
    fn on_performance_emergency(&mut self, e: &PerformanceEmergencyEvent) {
        _ = e;
    }

    /// Called when an effect is quarantined.
    fn on_component_quarantine(&mut self, e: &ComponentQuarantineEvent) {
        _ = e;
    }

    /// Called after every watchdog tick, healthy or not.
    fn on_watchdog_report(&mut self, r: &WatchdogReport) {
        _ = r;
    }
}

impl<S: EventSink + ?Sized> EventSink for &mut S {
    fn on_phase_changed(&mut self, e: &PhaseChangedEvent) {
        (**self).on_phase_changed(e);
    }

    fn on_performance_emergency(&mut self, e: &PerformanceEmergencyEvent) {
        (**self).on_performance_emergency(e);
    }

    fn on_component_quarantine(&mut self, e: &ComponentQuarantineEvent) {
        (**self).on_component_quarantine(e);
    }

    fn on_watchdog_report(&mut self, r: &WatchdogReport) {
        (**self).on_watchdog_report(r);
    }
}

// ---------------------------------------------------------------------------
// NoopSink
// ---------------------------------------------------------------------------

/// An [`EventSink`] that discards all events.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopSink;

impl EventSink for NoopSink {}

// ---------------------------------------------------------------------------
// EventLog
// ---------------------------------------------------------------------------

/// Any published event.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Event {
    /// See [`PhaseChangedEvent`].
    PhaseChanged(PhaseChangedEvent),
    /// See [`PerformanceEmergencyEvent`].
    PerformanceEmergency(PerformanceEmergencyEvent),
    /// See [`ComponentQuarantineEvent`].
    ComponentQuarantine(ComponentQuarantineEvent),
    /// See [`WatchdogReport`].
    WatchdogReport(WatchdogReport),
}

/// An [`EventSink`] that records every event in order.
#[derive(Clone, Debug, Default)]
pub struct EventLog {
    events: Vec<Event>,
}

impl EventLog {
    /// Creates an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// All recorded events, oldest first.
    #[must_use]
    pub fn events(&self) -> &[Event] {
        &self.events
    }

    /// Removes and returns all recorded events.
    pub fn take(&mut self) -> Vec<Event> {
        core::mem::take(&mut self.events)
    }

    /// The phases activated so far, in order.
    pub fn phases(&self) -> impl Iterator<Item = Phase> + '_ {
        self.events.iter().filter_map(|e| match e {
            Event::PhaseChanged(e) => Some(e.phase),
            _ => None,
        })
    }

    /// Emergency levels reported so far, in order.
    pub fn emergencies(&self) -> impl Iterator<Item = EscalationLevel> + '_ {
        self.events.iter().filter_map(|e| match e {
            Event::PerformanceEmergency(e) => Some(e.level),
            _ => None,
        })
    }

    /// Effects quarantined so far, in order.
    pub fn quarantines(&self) -> impl Iterator<Item = EffectKind> + '_ {
        self.events.iter().filter_map(|e| match e {
            Event::ComponentQuarantine(e) => Some(e.component),
            _ => None,
        })
    }
}

impl EventSink for EventLog {
    fn on_phase_changed(&mut self, e: &PhaseChangedEvent) {
        self.events.push(Event::PhaseChanged(*e));
    }

    fn on_performance_emergency(&mut self, e: &PerformanceEmergencyEvent) {
        self.events.push(Event::PerformanceEmergency(*e));
    }

    fn on_component_quarantine(&mut self, e: &ComponentQuarantineEvent) {
        self.events.push(Event::ComponentQuarantine(*e));
    }

    fn on_watchdog_report(&mut self, r: &WatchdogReport) {
        self.events.push(Event::WatchdogReport(r.clone()));
    }
}
