// Copyright 2026 the Chaos Show Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The page-root filter: sanitizer and single writer.
//!
//! [`sanitize`] turns any requested CSS filter expression into one that is
//! safe to show:
//!
//! | Term | Treatment |
//! |---|---|
//! | `brightness` | clamped to `0..=1.05` |
//! | `contrast` | clamped to `0..=1.1` |
//! | `saturate` | clamped to `0..=1.2` |
//! | `hue-rotate` | unrestricted, unit kept (`deg`, `rad`, `turn`, `grad`) |
//! | `invert`, `opacity` | clamped to `0..=1` |
//! | `blur` | non-negative, `px` |
//! | `sepia`, `grayscale` | removed |
//!
//! Percentages are accepted (`120%` is `1.2`). Anything unparseable, or any
//! other filter function, turns the whole expression into `none`.
//!
//! [`FilterManager`] is the only thing allowed to write the root filter. It
//! writes instantly (never animated), coalesces same-batch requests so the
//! last one wins, and skips writes that would not change the page.

use alloc::string::{String, ToString};
use alloc::vec::Vec;
use core::fmt::Write as _;

use log::{debug, warn};

use crate::error::HostError;
use crate::time::Duration;

/// Upper bounds for the clamped filter functions.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FilterBounds {
    /// Maximum `brightness`.
    pub brightness: f64,
    /// Maximum `contrast`.
    pub contrast: f64,
    /// Maximum `saturate`.
    pub saturate: f64,
}

impl FilterBounds {
    /// The show's authoritative bounds.
    pub const SAFE: Self = Self {
        brightness: 1.05,
        contrast: 1.1,
        saturate: 1.2,
    };
}

impl Default for FilterBounds {
    fn default() -> Self {
        Self::SAFE
    }
}

/// The outcome of sanitizing one expression.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Sanitized {
    /// The safe expression (`"none"` when nothing survives).
    pub value: String,
    /// The input was malformed and replaced by `none`.
    pub substituted: bool,
    /// At least one term was clamped.
    pub clamped: bool,
    /// At least one `sepia`/`grayscale` term was removed.
    pub stripped: bool,
}

impl Sanitized {
    fn none(substituted: bool) -> Self {
        Self {
            value: "none".into(),
            substituted,
            ..Self::default()
        }
    }

    /// Returns `true` when the input needed no changes.
    #[must_use]
    pub fn was_safe(&self) -> bool {
        !(self.substituted || self.clamped || self.stripped)
    }
}

/// Sanitizes `expr` against [`FilterBounds::SAFE`].
#[must_use]
pub fn sanitize(expr: &str) -> Sanitized {
    sanitize_with(expr, &FilterBounds::SAFE)
}

/// Returns whether `expr` would pass [`sanitize`] unchanged in meaning.
///
/// An empty string (no filter set) is safe.
#[must_use]
pub fn is_safe(expr: &str) -> bool {
    expr.trim().is_empty() || sanitize(expr).was_safe()
}

/// Sanitizes `expr` against custom bounds.
#[must_use]
pub fn sanitize_with(expr: &str, bounds: &FilterBounds) -> Sanitized {
    let expr = expr.trim();
    if expr.is_empty() || expr.eq_ignore_ascii_case("none") {
        return Sanitized::none(false);
    }
    let Some(terms) = parse_terms(expr) else {
        return Sanitized::none(true);
    };

    let mut out = Sanitized::default();
    let mut kept: Vec<String> = Vec::with_capacity(terms.len());
    for (name, arg) in terms {
        let term = match name.as_str() {
            "sepia" | "grayscale" => {
                out.stripped = true;
                continue;
            }
            "brightness" => amount(arg, bounds.brightness, &mut out.clamped),
            "contrast" => amount(arg, bounds.contrast, &mut out.clamped),
            "saturate" => amount(arg, bounds.saturate, &mut out.clamped),
            "invert" | "opacity" => amount(arg, 1.0, &mut out.clamped),
            "hue-rotate" => angle(arg),
            "blur" => length(arg, &mut out.clamped),
            _ => None,
        };
        let Some(value) = term else {
            return Sanitized::none(true);
        };
        kept.push(alloc::format!("{name}({value})"));
    }

    if kept.is_empty() {
        out.value = "none".into();
    } else {
        out.value = kept.join(" ");
    }
    out
}

/// Splits `name(arg) name(arg) ...` into lowercase names and raw arguments.
fn parse_terms(expr: &str) -> Option<Vec<(String, &str)>> {
    let mut terms = Vec::new();
    let mut rest = expr;
    loop {
        rest = rest.trim_start();
        if rest.is_empty() {
            return Some(terms);
        }
        let open = rest.find('(')?;
        let name = rest[..open].trim();
        if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphabetic() || c == '-') {
            return None;
        }
        let after = &rest[open + 1..];
        let close = after.find(')')?;
        let arg = &after[..close];
        if arg.contains('(') {
            return None;
        }
        terms.push((name.to_ascii_lowercase(), arg.trim()));
        rest = &after[close + 1..];
    }
}

/// Splits a CSS number from its unit.
fn split_unit(arg: &str) -> Option<(f64, &str)> {
    let end = arg
        .find(|c: char| !(c.is_ascii_digit() || matches!(c, '.' | '-' | '+')))
        .unwrap_or(arg.len());
    let value: f64 = arg[..end].parse().ok()?;
    value.is_finite().then_some((value, &arg[end..]))
}

fn amount(arg: &str, max: f64, clamped: &mut bool) -> Option<String> {
    let (value, unit) = split_unit(arg)?;
    let value = match unit {
        "" => value,
        "%" => value / 100.0,
        _ => return None,
    };
    let safe = value.clamp(0.0, max);
    if safe != value {
        *clamped = true;
    }
    number(safe)
}

fn angle(arg: &str) -> Option<String> {
    let (value, unit) = split_unit(arg)?;
    let unit = unit.to_ascii_lowercase();
    match unit.as_str() {
        "deg" | "rad" | "turn" | "grad" => Some(number(value)? + &unit),
        "" if value == 0.0 => Some("0deg".to_string()),
        _ => None,
    }
}

fn length(arg: &str, clamped: &mut bool) -> Option<String> {
    let (value, unit) = split_unit(arg)?;
    if !(unit.eq_ignore_ascii_case("px") || (unit.is_empty() && value == 0.0)) {
        return None;
    }
    let safe = value.max(0.0);
    if safe != value {
        *clamped = true;
    }
    Some(number(safe)? + "px")
}

/// Formats a value rounded to four decimals, without a trailing `.0`.
///
/// `None` when the value is too large to round.
fn number(value: f64) -> Option<String> {
    // Adding zero folds `-0.0` into `0.0`.
    let rounded = libm::round(value * 10_000.0) / 10_000.0 + 0.0;
    if !rounded.is_finite() {
        return None;
    }
    let mut s = String::new();
    let _ = write!(s, "{rounded}");
    Some(s)
}

/// Writes the page-root filter.
pub trait FilterSink {
    /// Replaces the root filter.
    fn write(&mut self, value: &str) -> Result<(), HostError>;

    /// Reads the root filter as the page currently has it, if readable.
    fn read(&self) -> Option<String>;
}

/// The single writer of the page-root filter.
#[derive(Debug)]
pub struct FilterManager<S> {
    sink: S,
    bounds: FilterBounds,
    current: String,
    pending: Option<Sanitized>,
    writes: u64,
}

impl<S: FilterSink> FilterManager<S> {
    /// Creates a manager over `sink` using [`FilterBounds::SAFE`].
    #[must_use]
    pub fn new(sink: S) -> Self {
        Self {
            sink,
            bounds: FilterBounds::SAFE,
            current: "none".into(),
            pending: None,
            writes: 0,
        }
    }

    /// Sanitizes `expr` and writes it to the page immediately.
    ///
    /// Writes are never animated; `duration_hint` is accepted for callers
    /// that have one and otherwise ignored.
    pub fn apply(&mut self, expr: &str, duration_hint: Duration) -> Result<Sanitized, HostError> {
        _ = duration_hint;
        let sanitized = self.request(expr);
        self.flush()?;
        Ok(sanitized)
    }

    /// Queues `expr` for the next [`flush`](Self::flush). A later request
    /// replaces an earlier one.
    pub fn request(&mut self, expr: &str) -> Sanitized {
        let sanitized = sanitize_with(expr, &self.bounds);
        if !sanitized.was_safe() {
            debug!("filter `{expr}` sanitized to `{}`", sanitized.value);
        }
        self.pending = Some(sanitized.clone());
        sanitized
    }

    /// Writes the last requested value, if it differs from the page.
    ///
    /// Returns whether a write happened.
    pub fn flush(&mut self) -> Result<bool, HostError> {
        let Some(next) = self.pending.take() else {
            return Ok(false);
        };
        let on_page = self.sink.read().unwrap_or_else(|| self.current.clone());
        let on_page = if on_page.trim().is_empty() {
            "none"
        } else {
            on_page.trim()
        };
        if on_page == next.value {
            self.current = next.value;
            return Ok(false);
        }
        if let Err(err) = self.sink.write(&next.value) {
            warn!("root filter write failed: {err}");
            return Err(err);
        }
        self.writes += 1;
        self.current = next.value;
        Ok(true)
    }

    /// Writes `none`.
    pub fn reset(&mut self) -> Result<bool, HostError> {
        self.request("none");
        self.flush()
    }

    /// The last value this manager wrote (or confirmed on the page).
    #[must_use]
    pub fn current(&self) -> &str {
        &self.current
    }

    /// Returns whether the page currently shows an unsafe filter, whoever
    /// wrote it.
    #[must_use]
    pub fn is_stuck_unsafe(&self) -> bool {
        match self.sink.read() {
            Some(on_page) => !is_safe(&on_page),
            None => !is_safe(&self.current),
        }
    }

    /// Number of writes that reached the sink.
    #[must_use]
    pub fn write_count(&self) -> u64 {
        self.writes
    }

    /// Replaces the bounds used by later requests.
    pub fn set_bounds(&mut self, bounds: FilterBounds) {
        self.bounds = bounds;
    }

    /// Returns the sink.
    #[must_use]
    pub fn sink(&self) -> &S {
        &self.sink
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::headless::HeadlessFilter;

    #[test]
    fn clamps_and_strips() {
        let out = sanitize("brightness(1.4) saturate(2) sepia(0.3)");
        assert_eq!(out.value, "brightness(1.05) saturate(1.2)");
        assert!(out.clamped && out.stripped && !out.substituted);
    }

    #[test]
    fn sanitizing_is_idempotent() {
        for input in [
            "brightness(3) contrast(120%) hue-rotate(-20deg)",
            "grayscale(1)",
            "blur(-4px) invert(2) opacity(50%)",
            "saturate(0.333333333)",
        ] {
            let once = sanitize(input).value;
            let twice = sanitize(&once);
            assert_eq!(twice.value, once, "{input}");
            assert!(twice.was_safe(), "{once} is safe");
        }
    }

    #[test]
    fn numbers_too_large_to_round_become_none() {
        let nines = "9".repeat(306);
        for input in [
            alloc::format!("hue-rotate({nines}deg)"),
            alloc::format!("blur({nines}px)"),
            alloc::format!("brightness(1.2) hue-rotate(-{nines}rad)"),
        ] {
            let out = sanitize(&input);
            assert_eq!(out.value, "none", "{input}");
            assert!(out.substituted, "{input}");
            assert!(is_safe(&out.value), "output is a fixed point");
        }
        // Large but roundable angles are kept.
        assert_eq!(sanitize("hue-rotate(36000deg)").value, "hue-rotate(36000deg)");
    }

    #[test]
    fn percentages_and_units() {
        assert_eq!(sanitize("contrast(90%)").value, "contrast(0.9)");
        assert_eq!(sanitize("hue-rotate(0.5turn)").value, "hue-rotate(0.5turn)");
        assert_eq!(sanitize("HUE-ROTATE(720DEG)").value, "hue-rotate(720deg)");
        assert_eq!(sanitize("blur(0)").value, "blur(0px)");
        assert_eq!(sanitize("brightness(-1)").value, "brightness(0)");
    }

    #[test]
    fn malformed_becomes_none() {
        for input in [
            "brightness(abc)",
            "brightness(1.2",
            "drop-shadow(1px 1px red)",
            "url(#x)",
            "brightness(1)) ",
            "brightness(calc(1+1))",
            "hue-rotate(90)",
            "brightness(NaN)",
        ] {
            let out = sanitize(input);
            assert_eq!(out.value, "none", "{input}");
            assert!(out.substituted, "{input}");
        }
        assert_eq!(sanitize("sepia(1)").value, "none", "everything stripped");
        assert!(!sanitize("sepia(1)").substituted);
    }

    #[test]
    fn safety_check() {
        assert!(is_safe(""));
        assert!(is_safe("none"));
        assert!(is_safe("brightness(1.05)"));
        assert!(!is_safe("brightness(1.06)"));
        assert!(!is_safe("grayscale(0.1)"));
    }

    #[test]
    fn last_request_wins() {
        let sink = HeadlessFilter::new();
        let mut manager = FilterManager::new(sink.clone());
        manager.request("contrast(1.05)");
        manager.request("sepia(1) brightness(2)");
        assert_eq!(manager.flush(), Ok(true));
        assert_eq!(sink.value(), "brightness(1.05)");
        assert_eq!(sink.write_count(), 1, "only the last request was written");
        assert_eq!(manager.flush(), Ok(false), "nothing pending");
    }

    #[test]
    fn unchanged_value_is_not_rewritten() {
        let sink = HeadlessFilter::new();
        let mut manager = FilterManager::new(sink.clone());
        manager
            .apply("saturate(1.1)", Duration(800))
            .expect("sink healthy");
        manager
            .apply("saturate(1.1)", Duration(800))
            .expect("sink healthy");
        assert_eq!(sink.write_count(), 1);
        assert_eq!(manager.reset(), Ok(true));
        assert_eq!(manager.reset(), Ok(false));
    }

    #[test]
    fn detects_external_corruption() {
        let sink = HeadlessFilter::new();
        let mut manager = FilterManager::new(sink.clone());
        assert!(!manager.is_stuck_unsafe());
        sink.corrupt("grayscale(1)");
        assert!(manager.is_stuck_unsafe());
        assert_eq!(manager.reset(), Ok(true), "page differs from cache");
        assert_eq!(sink.value(), "none");
        assert!(!manager.is_stuck_unsafe());
    }
}
