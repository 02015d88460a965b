// Copyright 2026 the Chaos Show Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The page-facing control surface.
//!
//! ```js
//! const show = new ChaosShow(gsap, plugins, { performanceMode: "balanced" });
//! show.start();
//! window.addEventListener("chaos:phase-changed", (e) => console.log(e.detail));
//! await show.forcePhase("neon"); // "completed" or "superseded"
//! ```
//!
//! Effect plugins and tween callbacks run while the show is borrowed and must
//! not call back into it; such calls fail with a "busy" error instead of
//! corrupting state. Event listeners and promise callbacks run after the
//! borrow ends and may call anything.

use alloc::rc::Rc;
use alloc::string::{String, ToString};
use alloc::vec::Vec;
use core::cell::RefCell;
use core::fmt;

use chaos_core::config::{PerformanceMode, ShowConfig};
use chaos_core::controller::{TransitionStatus, TransitionTicket};
use chaos_core::engine::ChaosEngine;
use chaos_core::error::{ConfigError, ControlError};
use chaos_core::platform::PlatformParts;
use js_sys::{Function, Object, Promise};
use log::{debug, error, info, warn};
use wasm_bindgen::prelude::*;

use crate::dom::js_error;
use crate::events::PendingEvents;
use crate::{
    CustomEventSink, DomHost, JsTweenBridge, JsTweenEngine, RafLoop, RootFilter, Web, heap_usage,
    init_logging, now, register_plugins,
};

const BUSY: &str = "show is busy: effect plugins and tweens must not call back into it";

struct Shared {
    engine: ChaosEngine<Web, CustomEventSink>,
    waiters: Vec<(TransitionTicket, Function)>,
    reload_sent: bool,
}

impl Shared {
    /// Collects what has to happen once the borrow is released.
    fn aftermath(&mut self) -> Aftermath {
        let mut resolved = Vec::new();
        self.waiters.retain(|(ticket, resolve)| {
            let settled = ticket.is_settled();
            if settled {
                resolved.push((resolve.clone(), ticket.status()));
            }
            !settled
        });
        let reload = self.engine.reload_requested() && !self.reload_sent;
        self.reload_sent |= reload;
        Aftermath {
            events: self.engine.sink_mut().take_pending(),
            resolved,
            reload,
        }
    }
}

struct Aftermath {
    events: PendingEvents,
    resolved: Vec<(Function, TransitionStatus)>,
    reload: bool,
}

impl Aftermath {
    fn run(self) {
        self.events.dispatch();
        for (resolve, status) in self.resolved {
            let status = JsValue::from_str(status_name(status));
            if let Err(err) = resolve.call1(&JsValue::NULL, &status) {
                warn!("transition promise callback threw: {}", js_error(err));
            }
        }
        if self.reload {
            reload_page();
        }
    }
}

/// Runs `f` on the show, then publishes events and settles promises.
fn with_shared<R>(shared: &RefCell<Shared>, f: impl FnOnce(&mut Shared) -> R) -> Option<R> {
    let (value, aftermath) = {
        let mut guard = shared.try_borrow_mut().ok()?;
        let value = f(&mut guard);
        (value, guard.aftermath())
    };
    aftermath.run();
    Some(value)
}

fn status_name(status: TransitionStatus) -> &'static str {
    match status {
        TransitionStatus::Pending => "pending",
        TransitionStatus::Completed => "completed",
        TransitionStatus::Superseded => "superseded",
    }
}

fn reload_page() {
    error!("reloading the page to recover the show");
    let reloaded = web_sys::window()
        .ok_or_else(|| JsValue::from_str("no window"))
        .and_then(|w| w.location().reload());
    if let Err(err) = reloaded {
        error!("page reload failed: {}", js_error(err));
    }
}

fn parse_config(value: &JsValue) -> Result<ShowConfig, JsError> {
    if value.is_undefined() || value.is_null() {
        return Ok(ShowConfig::default());
    }
    let text: String = match value.as_string() {
        Some(text) => text,
        None => js_sys::JSON::stringify(value)
            .map_err(|err| JsError::new(&js_error(err).to_string()))?
            .into(),
    };
    ShowConfig::from_json(&text).map_err(|err| JsError::new(&err.to_string()))
}

/// A running show, driven by `requestAnimationFrame`.
#[wasm_bindgen]
pub struct ChaosShow {
    shared: Rc<RefCell<Shared>>,
    frames: RafLoop,
}

#[wasm_bindgen]
impl ChaosShow {
    /// Builds a show on the window's document.
    ///
    /// `tween_engine` is a GSAP-style object, `plugins` maps effect names to
    /// objects with `enable()`/`disable()`, and `config` is an optional
    /// options object or JSON string.
    #[wasm_bindgen(constructor)]
    pub fn new(
        tween_engine: JsTweenEngine,
        plugins: &Object,
        config: JsValue,
    ) -> Result<Self, JsError> {
        let config = parse_config(&config)?;
        init_logging(config.verbose);

        let elements = DomHost::from_window().map_err(|e| JsError::new(&e.to_string()))?;
        let filter =
            RootFilter::new(elements.document()).map_err(|e| JsError::new(&e.to_string()))?;
        let parts = PlatformParts {
            elements,
            tweens: JsTweenBridge::new(tween_engine),
            filter,
        };
        let mut engine = ChaosEngine::new(config, parts, CustomEventSink::on_window());
        register_plugins(&mut engine.stage_mut().effects, plugins);

        let shared = Rc::new(RefCell::new(Shared {
            engine,
            waiters: Vec::new(),
            reload_sent: false,
        }));
        let frame_shared = Rc::clone(&shared);
        let frames = RafLoop::new(move |now| {
            if with_shared(&frame_shared, |s| s.engine.pump(now, heap_usage())).is_none() {
                debug!("frame skipped, show busy");
            }
        });
        Ok(Self { shared, frames })
    }

    /// Starts the scheduler, watchdog, and frame loop.
    pub fn start(&self) -> Result<(), JsError> {
        self.with(|s| s.engine.start(now()))?;
        self.frames.start();
        Ok(())
    }

    /// Switches to the named phase.
    ///
    /// Resolves to `"completed"` when it becomes active or `"superseded"` if
    /// another request replaced it first. Rejects for unknown names and for
    /// a show that is restarting or destroyed.
    #[wasm_bindgen(js_name = "forcePhase")]
    pub fn force_phase(&self, name: &str) -> Promise {
        Promise::new(&mut |resolve, reject| {
            let outcome = with_shared(&self.shared, |s| -> Result<(), ControlError> {
                let ticket = s.engine.force_phase(now(), name)?;
                s.waiters.push((ticket, resolve.clone()));
                Ok(())
            });
            let message = match outcome {
                Some(Ok(())) => return,
                Some(Err(err)) => err.to_string(),
                None => BUSY.into(),
            };
            if let Err(err) = reject.call1(&JsValue::NULL, &js_sys::Error::new(&message)) {
                warn!("forcePhase rejection threw: {}", js_error(err));
            }
        })
    }

    /// Switches between `"high"`, `"balanced"`, and `"low"` resource use.
    #[wasm_bindgen(js_name = "setPerformanceMode")]
    pub fn set_performance_mode(&self, mode: &str) -> Result<(), JsError> {
        let mode: PerformanceMode = mode
            .parse()
            .map_err(|e: ConfigError| JsError::new(&e.to_string()))?;
        self.with(|s| s.engine.set_performance_mode(now(), mode))
    }

    /// The active phase's name, if any.
    #[wasm_bindgen(js_name = "getCurrentPhase")]
    pub fn current_phase(&self) -> Option<String> {
        let shared = self.shared.try_borrow().ok()?;
        shared.engine.current_phase().map(|p| p.name().into())
    }

    /// Stops everything and removes what the show created. Safe to repeat.
    pub fn destroy(&self) -> Result<(), JsError> {
        self.frames.stop();
        self.with(|s| s.engine.destroy())
    }

    /// Tears down and starts again, forgetting quarantines and watchdog
    /// history.
    pub fn restart(&self) -> Result<(), JsError> {
        self.with(|s| {
            s.reload_sent = false;
            s.engine.restart(now());
        })?;
        info!("show restarted from the control surface");
        self.frames.start();
        Ok(())
    }

    /// Runs one frame at `timestamp` (milliseconds) without waiting for
    /// `requestAnimationFrame`.
    pub fn pump(&self, timestamp: f64) -> Result<(), JsError> {
        let now = crate::host_time(timestamp);
        self.with(|s| s.engine.pump(now, heap_usage()))
    }

    /// Counts and state, as a plain object.
    pub fn stats(&self) -> Result<JsValue, JsError> {
        let shared = self.shared.try_borrow().map_err(|_| JsError::new(BUSY))?;
        let json = serde_json::to_string(&shared.engine.stats())
            .map_err(|e| JsError::new(&e.to_string()))?;
        js_sys::JSON::parse(&json).map_err(|e| JsError::new(&js_error(e).to_string()))
    }

    /// `created`, `running`, `restarting`, or `destroyed`.
    #[wasm_bindgen(getter)]
    pub fn lifecycle(&self) -> String {
        self.shared
            .try_borrow()
            .map_or("busy", |s| s.engine.lifecycle().name())
            .into()
    }
}

impl ChaosShow {
    fn with<R>(&self, f: impl FnOnce(&mut Shared) -> R) -> Result<R, JsError> {
        with_shared(&self.shared, f).ok_or_else(|| JsError::new(BUSY))
    }
}

impl fmt::Debug for ChaosShow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChaosShow")
            .field("lifecycle", &self.lifecycle())
            .field("frames", &self.frames)
            .finish_non_exhaustive()
    }
}
