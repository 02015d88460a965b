// Copyright 2026 the Chaos Show Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Bridge to a JS tween engine.
//!
//! The engine object must look like GSAP's global: `to(target, vars)`,
//! `fromTo(target, from, to)`, and `set(target, vars)`, where the first two
//! return a tween with `kill()`. Durations are passed in seconds.
//!
//! Completion is reported through the `onComplete` callback, not
//! `isActive()`: GSAP calls a tween inactive until its first render, which
//! would let a sweep forget a tween that is about to play.

use alloc::rc::Rc;
use alloc::vec::Vec;
use core::cell::Cell;
use core::fmt;

use chaos_core::error::HostError;
use chaos_core::tween::{TweenEngine, TweenVars};
use js_sys::{Object, Reflect};
use wasm_bindgen::closure::Closure;
use wasm_bindgen::prelude::*;
use web_sys::Element;

use crate::dom::js_error;

#[wasm_bindgen]
extern "C" {
    /// A GSAP-compatible tween engine.
    #[derive(Clone, Debug)]
    pub type JsTweenEngine;

    #[wasm_bindgen(method, catch)]
    fn to(this: &JsTweenEngine, target: &Element, vars: &Object) -> Result<JsTween, JsValue>;

    #[wasm_bindgen(method, catch, js_name = "fromTo")]
    fn from_to(
        this: &JsTweenEngine,
        target: &Element,
        from: &Object,
        to: &Object,
    ) -> Result<JsTween, JsValue>;

    #[wasm_bindgen(method, catch)]
    fn set(this: &JsTweenEngine, target: &Element, vars: &Object) -> Result<JsValue, JsValue>;

    /// A running tween.
    pub type JsTween;

    #[wasm_bindgen(method, catch)]
    fn kill(this: &JsTween) -> Result<JsValue, JsValue>;
}

/// A tween started through [`JsTweenBridge`].
///
/// Active until the engine calls its `onComplete` or it is killed.
pub struct JsTweenHandle {
    tween: JsTween,
    done: Rc<Cell<bool>>,
    // Called by the engine; must live as long as the tween.
    _on_complete: Closure<dyn FnMut()>,
}

impl JsTweenHandle {
    /// The engine's tween object.
    #[must_use]
    pub fn tween(&self) -> &JsTween {
        &self.tween
    }

    /// Whether the tween finished or was killed.
    #[must_use]
    pub fn is_done(&self) -> bool {
        self.done.get()
    }
}

impl fmt::Debug for JsTweenHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JsTweenHandle")
            .field("done", &self.done.get())
            .finish_non_exhaustive()
    }
}

/// Adds an `onComplete` to `vars` and starts the tween with `start`.
fn started(
    vars: &Object,
    start: impl FnOnce(&Object) -> Result<JsTween, JsValue>,
) -> Result<JsTweenHandle, HostError> {
    let done = Rc::new(Cell::new(false));
    let flag = Rc::clone(&done);
    let on_complete = Closure::<dyn FnMut()>::new(move || flag.set(true));
    Reflect::set(vars, &JsValue::from_str("onComplete"), on_complete.as_ref())
        .map_err(js_error)?;
    let tween = start(vars).map_err(js_error)?;
    Ok(JsTweenHandle {
        tween,
        done,
        _on_complete: on_complete,
    })
}

/// [`TweenEngine`] over a [`JsTweenEngine`].
#[derive(Clone, Debug)]
pub struct JsTweenBridge {
    engine: JsTweenEngine,
}

impl JsTweenBridge {
    /// Wraps `engine`.
    #[must_use]
    pub fn new(engine: JsTweenEngine) -> Self {
        Self { engine }
    }
}

impl TweenEngine for JsTweenBridge {
    type Target = Element;
    type Handle = JsTweenHandle;

    fn to(&mut self, target: &Element, vars: &TweenVars) -> Result<JsTweenHandle, HostError> {
        started(&vars_object(vars, true)?, |vars| self.engine.to(target, vars))
    }

    fn from_to(
        &mut self,
        target: &Element,
        from: &TweenVars,
        to: &TweenVars,
    ) -> Result<JsTweenHandle, HostError> {
        let from = vars_object(from, false)?;
        started(&vars_object(to, true)?, |vars| self.engine.from_to(target, &from, vars))
    }

    fn set(&mut self, target: &Element, vars: &TweenVars) -> Result<(), HostError> {
        self.engine
            .set(target, &vars_object(vars, false)?)
            .map(drop)
            .map_err(js_error)
    }

    fn kill(&mut self, handle: &JsTweenHandle) {
        handle.done.set(true);
        if let Err(err) = handle.tween.kill() {
            log::debug!("tween kill threw: {}", js_error(err));
        }
    }

    fn is_active(&self, handle: &JsTweenHandle) -> bool {
        !handle.done.get()
    }
}

/// The entries of a GSAP vars object. Timing keys are only emitted when
/// `timing` is set.
pub(crate) fn vars_entries(vars: &TweenVars, timing: bool) -> Vec<(&str, f64)> {
    let mut entries: Vec<(&str, f64)> = vars.props.iter().map(|(k, v)| (k.as_ref(), *v)).collect();
    if timing {
        entries.push(("duration", vars.duration.as_secs_f64()));
        let repeat = vars.repeat.as_engine_count();
        if repeat != 0 {
            entries.push(("repeat", f64::from(repeat)));
        }
    }
    entries
}

fn vars_object(vars: &TweenVars, timing: bool) -> Result<Object, HostError> {
    let object = Object::new();
    for (key, value) in vars_entries(vars, timing) {
        Reflect::set(&object, &JsValue::from_str(key), &JsValue::from_f64(value))
            .map_err(js_error)?;
    }
    if timing && vars.yoyo {
        Reflect::set(&object, &JsValue::from_str("yoyo"), &JsValue::TRUE).map_err(js_error)?;
    }
    Ok(object)
}

#[cfg(test)]
mod tests {
    use chaos_core::time::Duration;
    use chaos_core::tween::Repeat;

    use super::*;

    #[test]
    fn timing_is_in_seconds() {
        let vars = TweenVars::new(Duration(1_500)).prop("opacity", 0.5);
        assert_eq!(vars_entries(&vars, true), [("opacity", 0.5), ("duration", 1.5)]);
    }

    #[test]
    fn infinite_repeat_uses_engine_convention() {
        let vars = TweenVars::new(Duration(2_000))
            .prop("rotation", 360.0)
            .repeat(Repeat::Infinite);
        assert!(vars_entries(&vars, true).contains(&("repeat", -1.0)));
    }

    #[test]
    fn from_values_carry_no_timing() {
        let vars = TweenVars::new(Duration(900))
            .prop("x", -40.0)
            .repeat(Repeat::Count(2));
        assert_eq!(vars_entries(&vars, false), [("x", -40.0)]);
    }
}
