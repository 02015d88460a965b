// Copyright 2026 the Chaos Show Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! `requestAnimationFrame` pump source.
//!
//! The show is pumped once per animation frame. Browsers throttle or pause
//! `requestAnimationFrame` in background tabs; the engine's timers catch up
//! on the next frame because they are driven by the frame's timestamp, not
//! by how many frames ran.

use alloc::boxed::Box;
use alloc::rc::Rc;
use core::cell::{Cell, RefCell};
use core::fmt;

use chaos_core::time::HostTime;
use wasm_bindgen::closure::Closure;
use wasm_bindgen::prelude::*;

use crate::host_time;

#[wasm_bindgen]
extern "C" {
    #[wasm_bindgen(js_namespace = performance, js_name = "now")]
    pub(crate) fn performance_now() -> f64;

    #[wasm_bindgen(js_name = "requestAnimationFrame")]
    fn request_animation_frame(callback: &JsValue) -> i32;

    #[wasm_bindgen(js_name = "cancelAnimationFrame")]
    fn cancel_animation_frame(id: i32);
}

type FrameClosure = Closure<dyn FnMut(f64)>;

struct Shared {
    closure: RefCell<Option<FrameClosure>>,
    on_frame: RefCell<Box<dyn FnMut(HostTime)>>,
    running: Cell<bool>,
    frames: Cell<u64>,
    // At most one frame is ever requested.
    pending: Cell<Option<i32>>,
}

impl Shared {
    fn request(&self) {
        if self.pending.get().is_some() {
            return;
        }
        if let Some(ref closure) = *self.closure.borrow() {
            self.pending
                .set(Some(request_animation_frame(closure.as_ref().unchecked_ref())));
        }
    }
}

/// Calls a closure with the frame time on every animation frame.
///
/// Not running until [`start`](Self::start). Dropping the loop stops it.
/// Stopping and starting again from inside the frame callback still
/// delivers one call per frame.
pub struct RafLoop {
    shared: Rc<Shared>,
}

impl RafLoop {
    /// Creates a stopped loop around `on_frame`.
    pub fn new(on_frame: impl FnMut(HostTime) + 'static) -> Self {
        Self {
            shared: Rc::new(Shared {
                closure: RefCell::new(None),
                on_frame: RefCell::new(Box::new(on_frame)),
                running: Cell::new(false),
                frames: Cell::new(0),
                pending: Cell::new(None),
            }),
        }
    }

    /// Starts requesting frames. No-op if running.
    pub fn start(&self) {
        if self.shared.running.replace(true) {
            return;
        }
        if self.shared.closure.borrow().is_none() {
            let shared = Rc::clone(&self.shared);
            let closure = Closure::wrap(Box::new(move |stamp_ms: f64| {
                shared.pending.set(None);
                if !shared.running.get() {
                    return;
                }
                shared.frames.set(shared.frames.get() + 1);
                shared.on_frame.borrow_mut()(host_time(stamp_ms));
                if shared.running.get() {
                    shared.request();
                }
            }) as Box<dyn FnMut(f64)>);
            *self.shared.closure.borrow_mut() = Some(closure);
        }
        self.shared.request();
    }

    /// Cancels the pending frame. [`start`](Self::start) resumes.
    pub fn stop(&self) {
        self.shared.running.set(false);
        if let Some(id) = self.shared.pending.take() {
            cancel_animation_frame(id);
        }
    }

    /// Whether frames are being requested.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.shared.running.get()
    }

    /// Frames delivered so far.
    #[must_use]
    pub fn frames(&self) -> u64 {
        self.shared.frames.get()
    }
}

impl Drop for RafLoop {
    fn drop(&mut self) {
        self.stop();
        // The closure holds an Rc to `shared`; break the cycle.
        self.shared.closure.borrow_mut().take();
    }
}

impl fmt::Debug for RafLoop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RafLoop")
            .field("running", &self.shared.running.get())
            .field("frames", &self.shared.frames.get())
            .finish_non_exhaustive()
    }
}
