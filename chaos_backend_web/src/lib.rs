// Copyright 2026 the Chaos Show Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Browser backend for `chaos_core`.
//!
//! This crate provides the [`Web`] platform and everything a page needs to
//! run a show:
//!
//! - [`DomHost`]: creates, appends, and detaches real DOM elements
//! - [`RootFilter`]: the `style.filter` of the document element
//! - [`JsTweenBridge`]: forwards tweens to a GSAP-style JS engine
//! - [`JsEffect`]: forwards `enable`/`disable` to a JS effect plugin
//! - [`RafLoop`]: `requestAnimationFrame` pump source
//! - [`CustomEventSink`]: re-publishes engine events as `chaos:*` DOM events
//! - [`ChaosShow`]: the `#[wasm_bindgen]` control surface
//!
//! Times are whole milliseconds from `performance.now()`.

#![no_std]

extern crate alloc;

mod dom;
mod effect;
mod events;
mod filter;
mod heap;
mod raf;
mod show;
mod tween;

pub use dom::DomHost;
pub use effect::{JsEffect, register_plugins};
pub use events::{
    COMPONENT_QUARANTINE, CustomEventSink, PERFORMANCE_EMERGENCY, PHASE_CHANGED, PendingEvents,
    WATCHDOG_REPORT,
};
pub use filter::RootFilter;
pub use heap::heap_usage;
pub use raf::RafLoop;
pub use show::ChaosShow;
pub use tween::{JsTween, JsTweenBridge, JsTweenEngine, JsTweenHandle};

use chaos_core::platform::Platform;
use chaos_core::time::HostTime;
use log::Level;
use web_sys::Element;

/// The browser platform.
#[derive(Clone, Copy, Debug)]
pub struct Web;

impl Platform for Web {
    type Node = Element;
    type Elements = DomHost;
    type Tweens = JsTweenBridge;
    type Filter = RootFilter;
}

/// Returns the current host time from `performance.now()`.
#[must_use]
pub fn now() -> HostTime {
    host_time(raf::performance_now())
}

/// Converts a `DOMHighResTimeStamp` to whole milliseconds.
///
/// Negative and non-finite stamps map to zero.
#[must_use]
pub fn host_time(ms: f64) -> HostTime {
    if !ms.is_finite() || ms <= 0.0 {
        return HostTime::ZERO;
    }
    #[expect(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        reason = "checked positive and finite; page clocks fit in u64 ms"
    )]
    let millis = ms as u64;
    HostTime(millis)
}

/// Routes `log` output to the browser console and installs the panic hook.
///
/// Logs at `Info`, or `Debug` when `verbose`. Calling it again only changes
/// the level.
pub fn init_logging(verbose: bool) {
    console_error_panic_hook::set_once();
    let level = if verbose { Level::Debug } else { Level::Info };
    if console_log::init_with_level(level).is_err() {
        log::set_max_level(level.to_level_filter());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn host_time_truncates_to_whole_millis() {
        assert_eq!(host_time(1_234.9), HostTime(1_234));
        assert_eq!(host_time(0.4), HostTime(0));
    }

    #[test]
    fn host_time_rejects_garbage() {
        assert_eq!(host_time(-5.0), HostTime::ZERO, "negative");
        assert_eq!(host_time(f64::NAN), HostTime::ZERO, "nan");
        assert_eq!(host_time(f64::INFINITY), HostTime::ZERO, "infinite");
    }
}
