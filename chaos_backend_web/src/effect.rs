// Copyright 2026 the Chaos Show Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Effect plugins written in JS.

use alloc::boxed::Box;

use chaos_core::effect::{EffectKind, EffectRegistry, VisualEffect};
use chaos_core::error::HostError;
use js_sys::{Object, Reflect};
use log::{debug, warn};
use wasm_bindgen::prelude::*;

use crate::dom::js_error;

#[wasm_bindgen]
extern "C" {
    /// Any object with `enable()` and `disable()` methods.
    pub type JsEffect;

    #[wasm_bindgen(method, catch, js_name = "enable")]
    fn js_enable(this: &JsEffect) -> Result<JsValue, JsValue>;

    #[wasm_bindgen(method, catch, js_name = "disable")]
    fn js_disable(this: &JsEffect) -> Result<JsValue, JsValue>;
}

impl VisualEffect for JsEffect {
    fn enable(&mut self) -> Result<(), HostError> {
        self.js_enable().map(drop).map_err(js_error)
    }

    fn disable(&mut self) -> Result<(), HostError> {
        self.js_disable().map(drop).map_err(js_error)
    }
}

/// Registers every plugin found on `plugins`, keyed by effect name
/// (`"particles"`, `"holographic-scan"`, ...). Returns how many were found.
///
/// Missing effects are left unregistered; phases needing them log the gap
/// and carry on.
pub fn register_plugins(registry: &mut EffectRegistry, plugins: &Object) -> usize {
    let mut found = 0;
    for kind in EffectKind::ALL {
        let Ok(value) = Reflect::get(plugins, &JsValue::from_str(kind.name())) else {
            continue;
        };
        if value.is_undefined() || value.is_null() {
            warn!("no plugin for effect `{kind}`");
            continue;
        }
        registry.register(kind, Box::new(value.unchecked_into::<JsEffect>()));
        found += 1;
    }
    debug!("{found} effect plugin(s) registered");
    found
}
