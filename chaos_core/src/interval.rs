// Copyright 2026 the Chaos Show Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The single source of truth for recurring timers and timeouts.
//!
//! Timers here are *virtual*: the registry owns no platform timers. One real
//! pump (the browser backend's `requestAnimationFrame` loop) calls
//! [`collect_due`](IntervalRegistry::collect_due) with the current time and
//! dispatches whatever fired. Because firing is a pure function of the
//! registry's contents, a cancelled timer cannot fire and a key can only ever
//! map to one live timer.
//!
//! ```text
//!   create_interval("watchdog", 20s) ─┐
//!   create_timeout("flash", 180ms) ───┼─► BTreeMap<TimerKey, Entry<T>>
//!                                     │         │
//!   rAF pump ── collect_due(now) ─────┘         ▼
//!                                         Vec<Fired<T>>  (in key order)
//! ```
//!
//! A late pump fires each due interval once and reschedules it a full period
//! after `now`; missed periods are dropped, not replayed.

use alloc::collections::BTreeMap;
use alloc::vec::Vec;
use core::fmt;

use log::debug;

use crate::id::TimerKey;
use crate::time::{Duration, HostTime};

/// Which subsystem owns a timer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TimerCategory {
    /// Phase scheduler heartbeat.
    Scheduler,
    /// Watchdog tick.
    Watchdog,
    /// Periodic pool and registry cleanup.
    Cleanup,
    /// Timers started by a phase runner; cancelled at every transition.
    Phase,
    /// Timers started by effects.
    Effect,
    /// Overlay expiry timeouts.
    Overlay,
    /// Anything else.
    Custom,
}

/// Per-timer options.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TimerOptions {
    /// Owning subsystem.
    pub category: TimerCategory,
    /// Age after which [`perform_auto_cleanup`](IntervalRegistry::perform_auto_cleanup)
    /// cancels the timer.
    pub max_age: Duration,
    /// Survives [`emergency_stop_except_permanent`](IntervalRegistry::emergency_stop_except_permanent).
    pub permanent: bool,
}

impl TimerOptions {
    /// Options for a timer that never expires.
    #[must_use]
    pub const fn new(category: TimerCategory) -> Self {
        Self {
            category,
            max_age: Duration::FOREVER,
            permanent: false,
        }
    }

    /// Sets the maximum age.
    #[must_use]
    pub const fn max_age(mut self, max_age: Duration) -> Self {
        self.max_age = max_age;
        self
    }

    /// Marks the timer permanent.
    #[must_use]
    pub const fn permanent(mut self) -> Self {
        self.permanent = true;
        self
    }
}

/// Identifies one registration of a timer.
///
/// Re-registering a key produces a new serial, so a handle to the replaced
/// timer can no longer clear its successor.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct IntervalHandle {
    key: TimerKey,
    serial: u64,
}

impl IntervalHandle {
    /// The timer's key.
    #[must_use]
    pub fn key(&self) -> &TimerKey {
        &self.key
    }
}

/// A timer that came due.
#[derive(Clone, Debug, PartialEq)]
pub struct Fired<T> {
    /// The registration that fired.
    pub handle: IntervalHandle,
    /// Its category.
    pub category: TimerCategory,
    /// Its payload.
    pub payload: T,
}

struct Entry<T> {
    payload: T,
    /// `None` for one-shot timeouts.
    period: Option<Duration>,
    next_due: HostTime,
    created_at: HostTime,
    options: TimerOptions,
    serial: u64,
}

/// Virtual-timer registry with replace-on-duplicate semantics.
pub struct IntervalRegistry<T> {
    timers: BTreeMap<TimerKey, Entry<T>>,
    next_serial: u64,
}

impl<T> fmt::Debug for IntervalRegistry<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IntervalRegistry")
            .field("keys", &self.timers.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

impl<T> Default for IntervalRegistry<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> IntervalRegistry<T> {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            timers: BTreeMap::new(),
            next_serial: 0,
        }
    }

    /// Registers a recurring timer, first due one `period` after `now`.
    ///
    /// Any timer already registered under `key` is cancelled first.
    pub fn create_interval(
        &mut self,
        now: HostTime,
        key: impl Into<TimerKey>,
        period: Duration,
        payload: T,
        options: TimerOptions,
    ) -> IntervalHandle {
        self.insert(now, key.into(), Some(period), now + period, payload, options)
    }

    /// Registers a one-shot timer due `delay` after `now`.
    ///
    /// Any timer already registered under `key` is cancelled first.
    pub fn create_timeout(
        &mut self,
        now: HostTime,
        key: impl Into<TimerKey>,
        delay: Duration,
        payload: T,
        options: TimerOptions,
    ) -> IntervalHandle {
        self.insert(now, key.into(), None, now + delay, payload, options)
    }

    /// Registers a one-shot timer under a generated key.
    pub fn create_anonymous_timeout(
        &mut self,
        now: HostTime,
        delay: Duration,
        payload: T,
        options: TimerOptions,
    ) -> IntervalHandle {
        let key = TimerKey::numbered(self.next_serial);
        self.create_timeout(now, key, delay, payload, options)
    }

    /// Cancels the registration `handle` refers to, if it is still current.
    pub fn clear(&mut self, handle: &IntervalHandle) -> bool {
        if self.is_current(handle) {
            self.timers.remove(&handle.key);
            true
        } else {
            false
        }
    }

    /// Cancels whatever is registered under `key`.
    pub fn cancel(&mut self, key: &TimerKey) -> bool {
        self.timers.remove(key).is_some()
    }

    /// Cancels every timer in `category`.
    pub fn cancel_category(&mut self, category: TimerCategory) -> usize {
        self.cancel_where(|e| e.options.category == category)
    }

    /// Cancels every timer older than its maximum age.
    pub fn perform_auto_cleanup(&mut self, now: HostTime) -> usize {
        let removed =
            self.cancel_where(|e| now.saturating_duration_since(e.created_at) > e.options.max_age);
        if removed > 0 {
            debug!("auto cleanup cancelled {removed} expired timers");
        }
        removed
    }

    /// Cancels every timer.
    pub fn emergency_stop(&mut self) -> usize {
        let n = self.timers.len();
        self.timers.clear();
        n
    }

    /// Cancels every timer not flagged permanent.
    pub fn emergency_stop_except_permanent(&mut self) -> usize {
        self.cancel_where(|e| !e.options.permanent)
    }

    /// Returns whether `handle` is the live registration for its key.
    #[must_use]
    pub fn is_current(&self, handle: &IntervalHandle) -> bool {
        self.timers
            .get(&handle.key)
            .is_some_and(|e| e.serial == handle.serial)
    }

    /// Returns whether anything is registered under `key`.
    #[must_use]
    pub fn contains(&self, key: &TimerKey) -> bool {
        self.timers.contains_key(key)
    }

    /// When the timer under `key` next fires.
    #[must_use]
    pub fn next_due(&self, key: &TimerKey) -> Option<HostTime> {
        self.timers.get(key).map(|e| e.next_due)
    }

    /// The earliest time any timer fires.
    #[must_use]
    pub fn earliest_due(&self) -> Option<HostTime> {
        self.timers.values().map(|e| e.next_due).min()
    }

    /// Number of live timers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.timers.len()
    }

    /// Returns `true` when no timers are live.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.timers.is_empty()
    }

    /// Number of live timers in `category`.
    #[must_use]
    pub fn count_category(&self, category: TimerCategory) -> usize {
        self.timers
            .values()
            .filter(|e| e.options.category == category)
            .count()
    }

    fn insert(
        &mut self,
        now: HostTime,
        key: TimerKey,
        period: Option<Duration>,
        next_due: HostTime,
        payload: T,
        options: TimerOptions,
    ) -> IntervalHandle {
        let serial = self.next_serial;
        self.next_serial += 1;
        if self.timers.contains_key(&key) {
            debug!("replacing timer {key}");
        }
        self.timers.insert(
            key.clone(),
            Entry {
                payload,
                period,
                next_due,
                created_at: now,
                options,
                serial,
            },
        );
        IntervalHandle { key, serial }
    }

    fn cancel_where(&mut self, mut predicate: impl FnMut(&Entry<T>) -> bool) -> usize {
        let before = self.timers.len();
        self.timers.retain(|_, e| !predicate(e));
        before - self.timers.len()
    }
}

impl<T: Clone> IntervalRegistry<T> {
    /// Returns every timer due at `now`, in key order, and advances them.
    ///
    /// Intervals are rescheduled one period after `now`; timeouts are
    /// removed.
    pub fn collect_due(&mut self, now: HostTime) -> Vec<Fired<T>> {
        self.due_handles(now)
            .into_iter()
            .filter_map(|handle| self.fire(now, &handle))
            .collect()
    }

    /// Like [`collect_due`](Self::collect_due), but hands each timer to
    /// `run` as it fires, so a callback that cancels or replaces a later
    /// timer in the same batch prevents it from running. Returns how many
    /// ran.
    pub fn run_due(&mut self, now: HostTime, mut run: impl FnMut(&mut Self, Fired<T>)) -> usize {
        let mut ran = 0;
        for handle in self.due_handles(now) {
            let Some(fired) = self.fire(now, &handle) else {
                continue;
            };
            run(self, fired);
            ran += 1;
        }
        ran
    }

    /// Handles of every timer due at `now`, in key order.
    ///
    /// Pair with [`fire`](Self::fire) to dispatch a batch while other code
    /// mutates the registry between timers.
    #[must_use]
    pub fn due_handles(&self, now: HostTime) -> Vec<IntervalHandle> {
        self.timers
            .iter()
            .filter(|(_, e)| e.next_due <= now)
            .map(|(key, e)| IntervalHandle {
                key: key.clone(),
                serial: e.serial,
            })
            .collect()
    }

    /// Fires one registration if it is still current.
    pub fn fire(&mut self, now: HostTime, handle: &IntervalHandle) -> Option<Fired<T>> {
        let entry = self
            .timers
            .get_mut(&handle.key)
            .filter(|e| e.serial == handle.serial)?;
        let fired = Fired {
            handle: handle.clone(),
            category: entry.options.category,
            payload: entry.payload.clone(),
        };
        match entry.period {
            // A zero period would fire on every pump; one tick is the floor.
            Some(period) => entry.next_due = now + period.max(Duration(1)),
            None => {
                self.timers.remove(&handle.key);
            }
        }
        Some(fired)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WATCHDOG: TimerKey = TimerKey::from_static("watchdog");

    #[test]
    fn duplicate_key_leaves_one_timer() {
        let mut reg = IntervalRegistry::new();
        let opts = TimerOptions::new(TimerCategory::Watchdog);
        let first = reg.create_interval(HostTime(0), WATCHDOG, Duration(100), 1, opts);
        let second = reg.create_interval(HostTime(0), WATCHDOG, Duration(100), 2, opts);
        assert_eq!(reg.len(), 1);
        assert!(!reg.is_current(&first), "first registration replaced");
        assert!(!reg.clear(&first), "stale handle cannot clear successor");
        assert!(reg.is_current(&second));
        let fired = reg.collect_due(HostTime(100));
        assert_eq!(fired.len(), 1);
        assert_eq!(fired[0].payload, 2);
    }

    #[test]
    fn interval_reschedules_without_catch_up() {
        let mut reg = IntervalRegistry::new();
        reg.create_interval(
            HostTime(0),
            "tick",
            Duration(100),
            (),
            TimerOptions::new(TimerCategory::Custom),
        );
        assert!(reg.collect_due(HostTime(99)).is_empty());
        assert_eq!(reg.collect_due(HostTime(450)).len(), 1, "fires once when late");
        assert_eq!(reg.next_due(&"tick".into()), Some(HostTime(550)));
    }

    #[test]
    fn timeout_fires_once() {
        let mut reg = IntervalRegistry::new();
        reg.create_timeout(
            HostTime(0),
            "flash",
            Duration(180),
            (),
            TimerOptions::new(TimerCategory::Overlay),
        );
        assert_eq!(reg.collect_due(HostTime(200)).len(), 1);
        assert!(reg.is_empty());
        assert!(reg.collect_due(HostTime(400)).is_empty());
    }

    #[test]
    fn cancelled_timer_never_fires() {
        let mut reg = IntervalRegistry::new();
        let handle = reg.create_interval(
            HostTime(0),
            "pulse",
            Duration(10),
            (),
            TimerOptions::new(TimerCategory::Effect),
        );
        assert!(reg.clear(&handle));
        assert!(!reg.clear(&handle), "clearing twice is a no-op");
        assert!(!reg.cancel(handle.key()));
        assert!(reg.collect_due(HostTime(1_000)).is_empty());
    }

    #[test]
    fn auto_cleanup_respects_max_age() {
        let mut reg = IntervalRegistry::new();
        reg.create_interval(
            HostTime(0),
            WATCHDOG,
            Duration(1_000),
            (),
            TimerOptions::new(TimerCategory::Watchdog).max_age(Duration(60_000)),
        );
        reg.create_interval(
            HostTime(0),
            "forever",
            Duration(1_000),
            (),
            TimerOptions::new(TimerCategory::Custom),
        );
        assert_eq!(reg.perform_auto_cleanup(HostTime(30_000)), 0);
        assert_eq!(reg.perform_auto_cleanup(HostTime(61_000)), 1);
        assert!(!reg.contains(&WATCHDOG));
        assert!(reg.contains(&"forever".into()), "no max age, never expires");
    }

    #[test]
    fn emergency_stop_variants() {
        let mut reg = IntervalRegistry::new();
        reg.create_interval(
            HostTime(0),
            "heartbeat",
            Duration(1_000),
            (),
            TimerOptions::new(TimerCategory::Scheduler).permanent(),
        );
        reg.create_interval(
            HostTime(0),
            "sparkle",
            Duration(50),
            (),
            TimerOptions::new(TimerCategory::Phase),
        );
        assert_eq!(reg.emergency_stop_except_permanent(), 1);
        assert_eq!(reg.emergency_stop_except_permanent(), 0);
        assert_eq!(reg.emergency_stop(), 1);
        assert!(reg.is_empty());
    }

    #[test]
    fn run_due_skips_timers_cancelled_mid_batch() {
        let mut reg = IntervalRegistry::new();
        let opts = TimerOptions::new(TimerCategory::Custom);
        reg.create_interval(HostTime(0), "a", Duration(10), "a", opts);
        reg.create_interval(HostTime(0), "b", Duration(10), "b", opts);
        let mut seen = Vec::new();
        let ran = reg.run_due(HostTime(10), |reg, fired| {
            seen.push(fired.payload);
            reg.cancel(&"b".into());
        });
        assert_eq!(ran, 1);
        assert_eq!(seen, ["a"]);
    }

    #[test]
    fn cancel_by_category() {
        let mut reg = IntervalRegistry::new();
        for i in 0..3 {
            reg.create_anonymous_timeout(
                HostTime(0),
                Duration(500),
                i,
                TimerOptions::new(TimerCategory::Phase),
            );
        }
        reg.create_interval(
            HostTime(0),
            WATCHDOG,
            Duration(1_000),
            9,
            TimerOptions::new(TimerCategory::Watchdog),
        );
        assert_eq!(reg.count_category(TimerCategory::Phase), 3);
        assert_eq!(reg.cancel_category(TimerCategory::Phase), 3);
        assert_eq!(reg.len(), 1);
    }
}
