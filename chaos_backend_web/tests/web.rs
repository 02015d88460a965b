// Copyright 2026 the Chaos Show Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Browser tests. Run with `wasm-pack test --headless --firefox chaos_backend_web`.

#![cfg(target_arch = "wasm32")]

use std::cell::RefCell;
use std::rc::Rc;

use chaos_backend_web::{
    ChaosShow, CustomEventSink, DomHost, JsTweenBridge, JsTweenEngine, PHASE_CHANGED, RafLoop,
    RootFilter,
};
use chaos_core::events::{EventSink, PhaseChangedEvent};
use chaos_core::filter::FilterSink;
use chaos_core::phase::Phase;
use chaos_core::pool::ElementHost;
use chaos_core::time::{Duration, HostTime};
use chaos_core::tween::{TweenEngine, TweenVars};
use js_sys::Object;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::JsFuture;
use wasm_bindgen_test::*;

wasm_bindgen_test_configure!(run_in_browser);

#[wasm_bindgen(inline_js = r#"
export function fakeTweens() {
  let live = [];
  const tween = (vars) => {
    const t = { dead: false, vars, kill() { this.dead = true; } };
    live.push(t);
    return t;
  };
  return {
    to(_target, vars) { return tween(vars); },
    fromTo(_target, _from, to) { return tween(to); },
    set(_target, _vars) {},
    finishAll() {
      const running = live.filter((t) => !t.dead);
      live = [];
      for (const t of running) {
        t.dead = true;
        t.vars.onComplete();
      }
    },
  };
}

export function finishAll(engine) {
  engine.finishAll();
}

export function fakePlugins() {
  const names = ["particles", "plasma", "holographic-scan", "scanlines",
                 "static-noise", "data-stream", "glitch-burst", "starfield"];
  const plugins = {};
  for (const name of names) {
    plugins[name] = { on: false, enable() { this.on = true; }, disable() { this.on = false; } };
  }
  return plugins;
}
"#)]
extern "C" {
    #[wasm_bindgen(js_name = "fakeTweens")]
    fn fake_tweens() -> JsTweenEngine;

    #[wasm_bindgen(js_name = "fakePlugins")]
    fn fake_plugins() -> Object;

    #[wasm_bindgen(js_name = "finishAll")]
    fn finish_all(engine: &JsTweenEngine);
}

fn show() -> ChaosShow {
    ChaosShow::new(fake_tweens(), &fake_plugins(), JsValue::UNDEFINED).expect("document ready")
}

async fn sleep(ms: i32) {
    let timer = js_sys::Promise::new(&mut |resolve, _| {
        web_sys::window()
            .expect("window")
            .set_timeout_with_callback_and_timeout_and_arguments_0(&resolve, ms)
            .expect("timer set");
    });
    JsFuture::from(timer).await.expect("timer fires");
}

fn pump(show: &ChaosShow, from: u32, frames: u32) {
    for i in from..from + frames {
        show.pump(f64::from(i) * 16.0).expect("not busy");
    }
}

#[wasm_bindgen_test]
fn dom_host_tracks_attachment() {
    let mut host = DomHost::from_window().expect("document has a body");
    let before = host.document_node_count();
    let node = host
        .create("div", &[("position", "fixed"), ("opacity", "0.5")])
        .expect("valid tag");
    assert!(!host.is_attached(&node));
    host.append(&node, None).expect("body accepts children");
    assert!(host.is_attached(&node));
    assert_eq!(host.document_node_count(), before + 1);
    host.detach(&node);
    assert!(!host.is_attached(&node));
    assert!(host.create("not a tag", &[]).is_err(), "invalid tag rejected");
}

#[wasm_bindgen_test(async)]
async fn restart_inside_a_frame_keeps_one_frame_per_frame() {
    let reference = RafLoop::new(|_| {});
    let slot: Rc<RefCell<Option<Rc<RafLoop>>>> = Rc::default();
    let inner = Rc::clone(&slot);
    let restarting = Rc::new(RafLoop::new(move |_| {
        if let Some(frames) = inner.borrow().as_ref() {
            frames.stop();
            frames.start();
        }
    }));
    *slot.borrow_mut() = Some(Rc::clone(&restarting));

    reference.start();
    restarting.start();
    sleep(250).await;
    restarting.stop();
    reference.stop();

    assert!(restarting.frames() > 0, "frames delivered");
    assert!(
        restarting.frames() <= reference.frames() + 1,
        "{} frames against {}",
        restarting.frames(),
        reference.frames()
    );
    slot.borrow_mut().take();
}

#[wasm_bindgen_test]
fn root_filter_round_trips() {
    let host = DomHost::from_window().expect("document has a body");
    let mut filter = RootFilter::new(host.document()).expect("html root");
    filter.write("brightness(1.05)").expect("style accepts filter");
    assert_eq!(filter.read().as_deref(), Some("brightness(1.05)"));
    filter.write("none").expect("style accepts filter");
}

#[wasm_bindgen_test]
fn tween_stays_active_until_on_complete() {
    let engine = fake_tweens();
    let mut bridge = JsTweenBridge::new(engine.clone());
    let mut host = DomHost::from_window().expect("document has a body");
    let target = host.create("div", &[]).expect("valid tag");
    let vars = TweenVars::new(Duration(300)).prop("opacity", 0.0);

    let finished = bridge.to(&target, &vars).expect("engine accepts");
    let killed = bridge.from_to(&target, &vars, &vars).expect("engine accepts");
    assert!(bridge.is_active(&finished), "active before the first render");
    bridge.kill(&killed);
    assert!(!bridge.is_active(&killed));

    finish_all(&engine);
    assert!(!bridge.is_active(&finished), "onComplete reported");
    assert!(finished.is_done());
}

#[wasm_bindgen_test]
fn phase_change_reaches_window_listeners() {
    let seen = Rc::new(RefCell::new(Vec::<JsValue>::new()));
    let record = Rc::clone(&seen);
    let listener = Closure::<dyn FnMut(web_sys::CustomEvent)>::new(move |e: web_sys::CustomEvent| {
        record.borrow_mut().push(e.detail());
    });
    let window = web_sys::window().expect("window");
    window
        .add_event_listener_with_callback(PHASE_CHANGED, listener.as_ref().unchecked_ref())
        .expect("listener added");

    let mut sink = CustomEventSink::on_window();
    sink.on_phase_changed(&PhaseChangedEvent {
        phase: Phase::Ice,
        previous: None,
        forced: false,
        runner_failures: 0,
        timestamp: HostTime(10),
    });
    assert!(seen.borrow().is_empty(), "queued until dispatched");
    sink.dispatch_pending();

    window
        .remove_event_listener_with_callback(PHASE_CHANGED, listener.as_ref().unchecked_ref())
        .expect("listener removed");
    let seen = seen.borrow();
    assert_eq!(seen.len(), 1);
    let phase = js_sys::Reflect::get(&seen[0], &"phase".into()).expect("detail has phase");
    assert_eq!(phase.as_string().as_deref(), Some("ice"));
}

#[wasm_bindgen_test(async)]
async fn forced_phase_promise_completes() {
    let show = show();
    let done = show.force_phase("neon");
    pump(&show, 1, 8);
    let status = JsFuture::from(done).await.expect("resolves");
    assert_eq!(status.as_string().as_deref(), Some("completed"));
    assert_eq!(show.current_phase().as_deref(), Some("neon"));
    show.destroy().expect("not busy");
}

#[wasm_bindgen_test(async)]
async fn replaced_request_resolves_superseded() {
    let show = show();
    let first = show.force_phase("calm");
    let second = show.force_phase("glitch");
    let first = JsFuture::from(first).await.expect("resolves");
    assert_eq!(first.as_string().as_deref(), Some("superseded"));
    pump(&show, 1, 8);
    let second = JsFuture::from(second).await.expect("resolves");
    assert_eq!(second.as_string().as_deref(), Some("completed"));
    show.destroy().expect("not busy");
}

#[wasm_bindgen_test(async)]
async fn unknown_phase_and_destroyed_show_reject() {
    let show = show();
    assert!(JsFuture::from(show.force_phase("disco")).await.is_err());
    show.destroy().expect("not busy");
    show.destroy().expect("destroy is repeatable");
    assert_eq!(show.lifecycle(), "destroyed");
    assert!(JsFuture::from(show.force_phase("calm")).await.is_err());
    show.restart().expect("not busy");
    assert_eq!(show.lifecycle(), "running");
    show.destroy().expect("not busy");
}

#[wasm_bindgen_test]
fn performance_mode_is_validated() {
    let show = show();
    show.set_performance_mode("low").expect("known mode");
    assert!(show.set_performance_mode("ludicrous").is_err());
    let stats = show.stats().expect("serializable");
    let mode = js_sys::Reflect::get(&stats, &"performanceMode".into()).expect("field");
    assert_eq!(mode.as_string().as_deref(), Some("low"));
    show.destroy().expect("not busy");
}
