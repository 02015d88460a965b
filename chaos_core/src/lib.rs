// Copyright 2026 the Chaos Show Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Phase, effect, and resource lifecycle coordination for a long-running
//! generative visual show.
//!
//! `chaos_core` decides which visual theme (a [`Phase`](phase::Phase)) is on
//! screen, switches between themes without leaking elements, tweens, or
//! timers, keeps the page-root filter inside safe bounds, and repairs the
//! show when it drifts into an unhealthy state. It is `no_std` compatible
//! (with `alloc`) and never touches a browser API directly: every host
//! service sits behind a trait in [`platform`].
//!
//! # Architecture
//!
//! ```text
//!   Host frame callback
//!       │
//!       ▼
//!   ChaosEngine::pump(now)
//!       │
//!       ├──► IntervalRegistry: due timers
//!       │        ├── heartbeat ──► PhaseScheduler::poll ──► PhaseController::set_phase
//!       │        ├── watchdog  ──► Watchdog::tick ──► repairs on the Stage
//!       │        └── cleanup   ──► expire timers, purge pool, sweep tweens
//!       │
//!       └──► PhaseController::step ──► one TransitionStep on the Stage
//!                                          │
//!              ┌───────────────────────────┘
//!              ▼
//!   Stage { ElementPool, TweenRegistry, FilterManager, EffectRegistry, timers }
//! ```
//!
//! **[`pool`]**: element pool with category tags, budgets, maximum ages, and
//! generational handles.
//!
//! **[`interval`]**: virtual timers keyed by name, with replace-on-duplicate
//! semantics and category/age-based cancellation.
//!
//! **[`tween`]**: accounting wrapper around a tween engine, grouping tweens
//! by owner so a phase's animations can be killed as a unit.
//!
//! **[`filter`]**: the single writer of the page-root CSS filter, with a
//! sanitizer that clamps and strips unsafe terms.
//!
//! **[`effect`]**: idempotent enable/disable over effect plugins, with
//! quarantine for plugins that keep failing.
//!
//! **[`phase`]**: the eighteen phases and their built-in recipes.
//!
//! **[`stage`]**: the shared registries and the runner API phases use.
//!
//! **[`controller`]**: the cancellable, stepwise transition state machine.
//!
//! **[`scheduler`]**: random phase selection without immediate repeats.
//!
//! **[`watchdog`]**: health checks and the escalation ladder.
//!
//! **[`engine`]**: everything wired together, plus the control surface.
//!
//! **[`events`]**: the [`EventSink`](events::EventSink) trait and event
//! payloads.
//!
//! **[`headless`]**: an in-memory platform for tests and simulation.
//!
//! # Crate features
//!
//! - `std` (disabled by default): Enables `std` support in dependencies.

#![no_std]
#![cfg_attr(docsrs, feature(doc_auto_cfg))]

extern crate alloc;

pub mod config;
pub mod controller;
pub mod effect;
pub mod engine;
pub mod error;
pub mod events;
pub mod filter;
pub mod headless;
pub mod id;
pub mod interval;
pub mod phase;
pub mod platform;
pub mod pool;
pub mod scheduler;
pub mod stage;
pub mod time;
pub mod tween;
pub mod watchdog;
