// Copyright 2026 the Chaos Show Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Engine events as DOM `CustomEvent`s.
//!
//! Events are queued while the engine runs and dispatched afterwards by
//! [`CustomEventSink::dispatch_pending`]. Listeners run synchronously, so
//! dispatching from inside a pump would let a listener call back into a
//! show that is still borrowed.

use alloc::string::String;
use alloc::vec::Vec;

use chaos_core::events::{
    ComponentQuarantineEvent, EventSink, PerformanceEmergencyEvent, PhaseChangedEvent,
};
use chaos_core::watchdog::WatchdogReport;
use log::warn;
use serde::Serialize;
use web_sys::{CustomEvent, CustomEventInit, EventTarget};

use crate::dom::js_error;

/// Dispatched when a phase becomes active.
pub const PHASE_CHANGED: &str = "chaos:phase-changed";
/// Dispatched when the watchdog escalates to critical or beyond.
pub const PERFORMANCE_EMERGENCY: &str = "chaos:performance-emergency";
/// Dispatched when an effect plugin is quarantined.
pub const COMPONENT_QUARANTINE: &str = "chaos:component-quarantine";
/// Dispatched after every watchdog tick.
pub const WATCHDOG_REPORT: &str = "chaos:watchdog-report";

/// Queues engine events and dispatches them on an [`EventTarget`].
///
/// Each event's `detail` is the JSON form of the core payload.
#[derive(Debug, Default)]
pub struct CustomEventSink {
    target: Option<EventTarget>,
    pending: Vec<(&'static str, String)>,
}

impl CustomEventSink {
    /// A sink dispatching on `target`.
    #[must_use]
    pub fn new(target: EventTarget) -> Self {
        Self {
            target: Some(target),
            pending: Vec::new(),
        }
    }

    /// A sink dispatching on `window`, or only queueing if there is none.
    #[must_use]
    pub fn on_window() -> Self {
        Self {
            target: web_sys::window().map(Into::into),
            pending: Vec::new(),
        }
    }

    /// Events waiting for dispatch: name and JSON detail.
    pub fn pending(&self) -> impl Iterator<Item = (&'static str, &str)> + '_ {
        self.pending.iter().map(|(name, detail)| (*name, detail.as_str()))
    }

    /// Takes the queue, for dispatch once nothing is borrowed.
    #[must_use]
    pub fn take_pending(&mut self) -> PendingEvents {
        PendingEvents {
            target: self.target.clone(),
            events: core::mem::take(&mut self.pending),
        }
    }

    /// Dispatches and clears the queue.
    pub fn dispatch_pending(&mut self) {
        self.take_pending().dispatch();
    }

    fn queue(&mut self, name: &'static str, payload: &impl Serialize) {
        match serde_json::to_string(payload) {
            Ok(detail) => self.pending.push((name, detail)),
            Err(err) => warn!("{name} payload not serializable: {err}"),
        }
    }
}

impl EventSink for CustomEventSink {
    fn on_phase_changed(&mut self, e: &PhaseChangedEvent) {
        self.queue(PHASE_CHANGED, e);
    }

    fn on_performance_emergency(&mut self, e: &PerformanceEmergencyEvent) {
        self.queue(PERFORMANCE_EMERGENCY, e);
    }

    fn on_component_quarantine(&mut self, e: &ComponentQuarantineEvent) {
        self.queue(COMPONENT_QUARANTINE, e);
    }

    fn on_watchdog_report(&mut self, r: &WatchdogReport) {
        self.queue(WATCHDOG_REPORT, r);
    }
}

/// Events taken out of a [`CustomEventSink`].
#[derive(Debug)]
#[must_use = "events are lost unless dispatched"]
pub struct PendingEvents {
    target: Option<EventTarget>,
    events: Vec<(&'static str, String)>,
}

impl PendingEvents {
    /// Dispatches every event in order. Failures are logged and skipped.
    pub fn dispatch(self) {
        let Some(target) = self.target else {
            return;
        };
        for (name, detail) in self.events {
            let detail = match js_sys::JSON::parse(&detail) {
                Ok(value) => value,
                Err(err) => {
                    warn!("{name} detail rejected: {}", js_error(err));
                    continue;
                }
            };
            let init = CustomEventInit::new();
            init.set_detail(&detail);
            let dispatched = CustomEvent::new_with_event_init_dict(name, &init)
                .and_then(|event| target.dispatch_event(&event));
            if let Err(err) = dispatched {
                warn!("dispatching {name} failed: {}", js_error(err));
            }
        }
    }
}
