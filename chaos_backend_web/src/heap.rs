// Copyright 2026 the Chaos Show Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Heap telemetry from `performance.memory`.
//!
//! Only Chromium exposes it. Elsewhere the watchdog runs without heap
//! findings.

use chaos_core::watchdog::HeapUsage;
use js_sys::Reflect;
use wasm_bindgen::JsValue;

/// The current heap usage, if the browser reports it.
#[must_use]
pub fn heap_usage() -> Option<HeapUsage> {
    let performance = Reflect::get(&js_sys::global(), &JsValue::from_str("performance")).ok()?;
    let memory = Reflect::get(&performance, &JsValue::from_str("memory")).ok()?;
    if !memory.is_object() {
        return None;
    }
    let read = |key: &str| {
        Reflect::get(&memory, &JsValue::from_str(key))
            .ok()
            .and_then(|v| v.as_f64())
    };
    from_stats(read("usedJSHeapSize")?, read("jsHeapSizeLimit")?)
}

/// Builds a [`HeapUsage`] from the two `performance.memory` numbers.
pub(crate) fn from_stats(used: f64, limit: f64) -> Option<HeapUsage> {
    if !(used.is_finite() && limit.is_finite()) || used < 0.0 || limit <= 0.0 {
        return None;
    }
    #[expect(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        reason = "checked non-negative and finite; byte counts fit in u64"
    )]
    let (used, limit) = (used as u64, limit as u64);
    Some(HeapUsage { used, limit })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plausible_stats_convert() {
        let usage = from_stats(3.0e8, 4.0e9).expect("valid stats");
        assert_eq!(usage.used, 300_000_000);
        assert!((usage.ratio() - 0.075).abs() < 1e-9, "ratio {}", usage.ratio());
    }

    #[test]
    fn nonsense_stats_are_ignored() {
        assert_eq!(from_stats(1.0, 0.0), None, "zero limit");
        assert_eq!(from_stats(-1.0, 10.0), None, "negative use");
        assert_eq!(from_stats(f64::NAN, 10.0), None, "nan");
    }
}
