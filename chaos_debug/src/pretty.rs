// Copyright 2026 the Chaos Show Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Human-readable event output.
//!
//! [`PrettyPrintSink`] writes one line per event, stamped with show time in
//! seconds. Quiet watchdog ticks (nothing found, nothing repaired) are
//! skipped unless [`with_quiet_ticks`](PrettyPrintSink::with_quiet_ticks)
//! turns them on.

use std::fmt::Write as _;
use std::io::Write;

use chaos_core::events::{
    ComponentQuarantineEvent, EventSink, PerformanceEmergencyEvent, PhaseChangedEvent,
};
use chaos_core::time::HostTime;
use chaos_core::watchdog::{Finding, Repair, WatchdogReport};

/// Writes human-readable event lines to a [`Write`](std::io::Write) destination.
pub struct PrettyPrintSink<W: Write = Box<dyn Write>> {
    writer: W,
    quiet_ticks: bool,
}

impl<W: Write> std::fmt::Debug for PrettyPrintSink<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrettyPrintSink")
            .field("quiet_ticks", &self.quiet_ticks)
            .finish_non_exhaustive()
    }
}

impl PrettyPrintSink {
    /// Creates a sink that writes to stderr.
    #[must_use]
    pub fn stderr() -> Self {
        Self::with_writer(Box::new(std::io::stderr()))
    }
}

impl<W: Write> PrettyPrintSink<W> {
    /// Creates a sink that writes to the given destination.
    #[must_use]
    pub fn with_writer(writer: W) -> Self {
        Self {
            writer,
            quiet_ticks: false,
        }
    }

    /// Also prints watchdog ticks that found nothing.
    #[must_use]
    pub fn with_quiet_ticks(mut self, on: bool) -> Self {
        self.quiet_ticks = on;
        self
    }

    /// Returns the destination.
    pub fn into_inner(self) -> W {
        self.writer
    }
}

fn secs(t: HostTime) -> f64 {
    t.millis() as f64 / 1000.0
}

fn finding_text(f: Finding) -> String {
    match f {
        Finding::FilterUnsafe => "filter-unsafe".into(),
        Finding::SchedulerStopped => "scheduler-stopped".into(),
        Finding::DomNodesOver { count, limit } => format!("dom-nodes {count}/{limit}"),
        Finding::ManagedElementsOver { count, limit } => format!("elements {count}/{limit}"),
        Finding::TweensOver { count, limit } => format!("tweens {count}/{limit}"),
        Finding::HeapHigh { permille } => format!("heap {}.{}%", permille / 10, permille % 10),
        Finding::DuplicateSingletons { count } => format!("duplicate-singletons {count}"),
    }
}

fn repair_text(r: Repair) -> String {
    match r {
        Repair::ResetFilter => "reset-filter".into(),
        Repair::RestartScheduler => "restart-scheduler".into(),
        Repair::Purged { removed } => format!("purged {removed}"),
        Repair::DedupedSingletons { removed } => format!("deduped {removed}"),
        Repair::CriticalCleanup {
            elements,
            tweens,
            timers,
        } => format!("critical-cleanup elements={elements} tweens={tweens} timers={timers}"),
        Repair::SoftRestart => "soft-restart".into(),
    }
}

fn joined<T: Copy>(items: &[T], text: fn(T) -> String) -> String {
    let mut out = String::new();
    for (i, &item) in items.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        _ = write!(out, "{}", text(item));
    }
    out
}

impl<W: Write> EventSink for PrettyPrintSink<W> {
    fn on_phase_changed(&mut self, e: &PhaseChangedEvent) {
        let from = e.previous.map_or("-", |p| p.name());
        let how = if e.forced { "forced" } else { "scheduled" };
        let _ = write!(
            self.writer,
            "[{:>9.3}s] [phase] {from} -> {} ({how})",
            secs(e.timestamp),
            e.phase,
        );
        if e.runner_failures > 0 {
            let _ = write!(self.writer, " failures={}", e.runner_failures);
        }
        let _ = writeln!(self.writer);
    }

    fn on_performance_emergency(&mut self, e: &PerformanceEmergencyEvent) {
        let _ = writeln!(
            self.writer,
            "[{:>9.3}s] [EMERGENCY] level={} streak={}",
            secs(e.timestamp),
            e.level,
            e.streak,
        );
    }

    fn on_component_quarantine(&mut self, e: &ComponentQuarantineEvent) {
        let _ = writeln!(
            self.writer,
            "[{:>9.3}s] [quarantine] {}",
            secs(e.timestamp),
            e.component,
        );
    }

    fn on_watchdog_report(&mut self, r: &WatchdogReport) {
        if r.is_quiet() && !self.quiet_ticks {
            return;
        }
        let _ = writeln!(
            self.writer,
            "[{:>9.3}s] [watchdog] level={} streak={} restarts={} found=[{}] did=[{}]",
            secs(r.timestamp),
            r.level,
            r.streak,
            r.soft_restarts,
            joined(&r.findings, finding_text),
            joined(&r.repairs, repair_text),
        );
    }
}
