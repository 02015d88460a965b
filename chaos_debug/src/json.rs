// Copyright 2026 the Chaos Show Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! JSON-lines event output.
//!
//! Each event is one [`Event`] object on its own line, tagged with `type`
//! (`phase-changed`, `performance-emergency`, `component-quarantine`,
//! `watchdog-report`). The result loads straight into `jq` or a notebook.

use std::io::{self, Write};

use chaos_core::events::{
    ComponentQuarantineEvent, Event, EventSink, PerformanceEmergencyEvent, PhaseChangedEvent,
};
use chaos_core::watchdog::WatchdogReport;

/// Writes one JSON object per event.
pub struct JsonLinesSink<W: Write> {
    writer: W,
    written: u64,
    failed: u64,
}

impl<W: Write> std::fmt::Debug for JsonLinesSink<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JsonLinesSink")
            .field("written", &self.written)
            .field("failed", &self.failed)
            .finish_non_exhaustive()
    }
}

impl<W: Write> JsonLinesSink<W> {
    /// Creates a sink that writes to the given destination.
    #[must_use]
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            written: 0,
            failed: 0,
        }
    }

    /// Lines written so far.
    #[must_use]
    pub fn written(&self) -> u64 {
        self.written
    }

    /// Events lost to write or encoding errors.
    #[must_use]
    pub fn failed(&self) -> u64 {
        self.failed
    }

    /// Flushes and returns the destination.
    pub fn into_inner(mut self) -> io::Result<W> {
        self.writer.flush()?;
        Ok(self.writer)
    }

    fn emit(&mut self, event: &Event) {
        let line = serde_json::to_writer(&mut self.writer, event)
            .map_err(io::Error::from)
            .and_then(|()| self.writer.write_all(b"\n"));
        match line {
            Ok(()) => self.written += 1,
            Err(_) => self.failed += 1,
        }
    }
}

impl<W: Write> EventSink for JsonLinesSink<W> {
    fn on_phase_changed(&mut self, e: &PhaseChangedEvent) {
        self.emit(&Event::PhaseChanged(*e));
    }

    fn on_performance_emergency(&mut self, e: &PerformanceEmergencyEvent) {
        self.emit(&Event::PerformanceEmergency(*e));
    }

    fn on_component_quarantine(&mut self, e: &ComponentQuarantineEvent) {
        self.emit(&Event::ComponentQuarantine(*e));
    }

    fn on_watchdog_report(&mut self, r: &WatchdogReport) {
        self.emit(&Event::WatchdogReport(r.clone()));
    }
}
