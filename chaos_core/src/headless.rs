// Copyright 2026 the Chaos Show Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! An in-memory platform.
//!
//! [`Headless`] runs the whole engine without a browser: a toy DOM, a tween
//! engine that never advances on its own, a filter slot, and effect plugins
//! that only count calls. Every fake is a cheap `Rc` handle, so a test keeps
//! one clone to inspect or perturb the state the engine works on (detach a
//! node behind the pool's back, corrupt the root filter, make an effect
//! fail).

use alloc::boxed::Box;
use alloc::collections::BTreeMap;
use alloc::rc::Rc;
use alloc::string::String;
use alloc::vec::Vec;
use core::cell::RefCell;
use core::fmt;

use crate::effect::{EffectKind, EffectRegistry, VisualEffect};
use crate::error::HostError;
use crate::filter::FilterSink;
use crate::platform::{Platform, PlatformParts};
use crate::pool::ElementHost;
use crate::tween::{TweenEngine, TweenVars};

/// The [`Platform`] made of this module's fakes.
#[derive(Clone, Copy, Debug, Default)]
pub struct Headless;

impl Platform for Headless {
    type Node = HeadlessNode;
    type Elements = HeadlessDom;
    type Tweens = HeadlessTweens;
    type Filter = HeadlessFilter;
}

// ---------------------------------------------------------------------------
// DOM
// ---------------------------------------------------------------------------

/// A node in a [`HeadlessDom`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct HeadlessNode(pub u32);

const BODY: HeadlessNode = HeadlessNode(0);

#[derive(Debug, Default)]
struct NodeRecord {
    tag: String,
    style: Vec<(String, String)>,
    parent: Option<HeadlessNode>,
}

#[derive(Debug, Default)]
struct DomState {
    nodes: BTreeMap<HeadlessNode, NodeRecord>,
    next: u32,
    /// Page elements outside the show's control.
    baseline: usize,
}

/// A toy document. Node 0 is the body.
#[derive(Clone, Default)]
pub struct HeadlessDom(Rc<RefCell<DomState>>);

impl fmt::Debug for HeadlessDom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.0.borrow();
        f.debug_struct("HeadlessDom")
            .field("nodes", &state.nodes.len())
            .field("baseline", &state.baseline)
            .finish()
    }
}

impl HeadlessDom {
    /// An empty document.
    #[must_use]
    pub fn new() -> Self {
        let dom = Self::default();
        dom.0.borrow_mut().next = 1;
        dom
    }

    /// Pretends the page has `count` elements of its own.
    pub fn set_baseline(&self, count: usize) {
        self.0.borrow_mut().baseline = count;
    }

    /// Detaches a node without telling the pool.
    pub fn detach_externally(&self, node: HeadlessNode) {
        if let Some(record) = self.0.borrow_mut().nodes.get_mut(&node) {
            record.parent = None;
        }
    }

    /// Returns whether `node` is reachable from the body.
    #[must_use]
    pub fn is_attached_node(&self, node: HeadlessNode) -> bool {
        let state = self.0.borrow();
        let mut current = node;
        // Depth is bounded by the node count.
        for _ in 0..=state.nodes.len() {
            if current == BODY {
                return true;
            }
            match state.nodes.get(&current).and_then(|r| r.parent) {
                Some(parent) => current = parent,
                None => return false,
            }
        }
        false
    }

    /// An inline style property of `node`.
    #[must_use]
    pub fn style_of(&self, node: HeadlessNode, property: &str) -> Option<String> {
        let state = self.0.borrow();
        let record = state.nodes.get(&node)?;
        record
            .style
            .iter()
            .find(|(k, _)| k == property)
            .map(|(_, v)| v.clone())
    }

    /// The tag `node` was created with.
    #[must_use]
    pub fn tag_of(&self, node: HeadlessNode) -> Option<String> {
        self.0.borrow().nodes.get(&node).map(|r| r.tag.clone())
    }

    /// Number of show-created nodes currently attached.
    #[must_use]
    pub fn attached_count(&self) -> usize {
        let nodes: Vec<HeadlessNode> = self.0.borrow().nodes.keys().copied().collect();
        nodes.into_iter().filter(|&n| self.is_attached_node(n)).count()
    }
}

impl ElementHost for HeadlessDom {
    type Node = HeadlessNode;

    fn create(&mut self, tag: &str, style: &[(&str, &str)]) -> Result<HeadlessNode, HostError> {
        if tag.is_empty() || !tag.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(HostError::new(alloc::format!("invalid tag `{tag}`")));
        }
        let mut state = self.0.borrow_mut();
        let node = HeadlessNode(state.next);
        state.next += 1;
        state.nodes.insert(
            node,
            NodeRecord {
                tag: tag.into(),
                style: style.iter().map(|&(k, v)| (k.into(), v.into())).collect(),
                parent: None,
            },
        );
        Ok(node)
    }

    fn append(
        &mut self,
        node: &HeadlessNode,
        container: Option<&HeadlessNode>,
    ) -> Result<(), HostError> {
        let parent = container.copied().unwrap_or(BODY);
        let mut state = self.0.borrow_mut();
        match state.nodes.get_mut(node) {
            Some(record) => {
                record.parent = Some(parent);
                Ok(())
            }
            None => Err(HostError::from("append of unknown node")),
        }
    }

    fn is_attached(&self, node: &HeadlessNode) -> bool {
        self.is_attached_node(*node)
    }

    fn detach(&mut self, node: &HeadlessNode) {
        self.detach_externally(*node);
    }

    fn document_node_count(&self) -> usize {
        self.attached_count() + self.0.borrow().baseline
    }

    fn body(&self) -> HeadlessNode {
        BODY
    }
}

// ---------------------------------------------------------------------------
// Tweens
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct TweenState {
    active: BTreeMap<u64, HeadlessNode>,
    next: u64,
    set_calls: usize,
    failing: bool,
}

/// A tween engine whose tweens run until killed or [finished](Self::finish_all).
#[derive(Clone, Default)]
pub struct HeadlessTweens(Rc<RefCell<TweenState>>);

impl fmt::Debug for HeadlessTweens {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HeadlessTweens")
            .field("active", &self.active_count())
            .finish()
    }
}

impl HeadlessTweens {
    /// An idle engine.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of tweens still playing.
    #[must_use]
    pub fn active_count(&self) -> usize {
        self.0.borrow().active.len()
    }

    /// Number of tweens playing on `node`.
    #[must_use]
    pub fn active_on(&self, node: HeadlessNode) -> usize {
        self.0.borrow().active.values().filter(|&&n| n == node).count()
    }

    /// Number of `set` calls.
    #[must_use]
    pub fn set_calls(&self) -> usize {
        self.0.borrow().set_calls
    }

    /// Lets every playing tween finish naturally.
    pub fn finish_all(&self) {
        self.0.borrow_mut().active.clear();
    }

    /// Makes every later call fail.
    pub fn set_failing(&self, failing: bool) {
        self.0.borrow_mut().failing = failing;
    }

    fn start(&self, target: HeadlessNode) -> Result<u64, HostError> {
        let mut state = self.0.borrow_mut();
        if state.failing {
            return Err(HostError::from("tween engine unavailable"));
        }
        let handle = state.next;
        state.next += 1;
        state.active.insert(handle, target);
        Ok(handle)
    }
}

impl TweenEngine for HeadlessTweens {
    type Target = HeadlessNode;
    type Handle = u64;

    fn to(&mut self, target: &HeadlessNode, vars: &TweenVars) -> Result<u64, HostError> {
        _ = vars;
        self.start(*target)
    }

    fn from_to(
        &mut self,
        target: &HeadlessNode,
        from: &TweenVars,
        to: &TweenVars,
    ) -> Result<u64, HostError> {
        _ = (from, to);
        self.start(*target)
    }

    fn set(&mut self, target: &HeadlessNode, vars: &TweenVars) -> Result<(), HostError> {
        _ = (target, vars);
        let mut state = self.0.borrow_mut();
        if state.failing {
            return Err(HostError::from("tween engine unavailable"));
        }
        state.set_calls += 1;
        Ok(())
    }

    fn kill(&mut self, handle: &u64) {
        self.0.borrow_mut().active.remove(handle);
    }

    fn is_active(&self, handle: &u64) -> bool {
        self.0.borrow().active.contains_key(handle)
    }
}

// ---------------------------------------------------------------------------
// Filter
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct FilterState {
    value: String,
    writes: u64,
}

/// The page-root filter slot.
#[derive(Clone, Default)]
pub struct HeadlessFilter(Rc<RefCell<FilterState>>);

impl fmt::Debug for HeadlessFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("HeadlessFilter").field(&self.value()).finish()
    }
}

impl HeadlessFilter {
    /// An unset filter.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The value on the page.
    #[must_use]
    pub fn value(&self) -> String {
        self.0.borrow().value.clone()
    }

    /// Number of writes received.
    #[must_use]
    pub fn write_count(&self) -> u64 {
        self.0.borrow().writes
    }

    /// Overwrites the page value without going through a manager.
    pub fn corrupt(&self, value: &str) {
        self.0.borrow_mut().value = value.into();
    }
}

impl FilterSink for HeadlessFilter {
    fn write(&mut self, value: &str) -> Result<(), HostError> {
        let mut state = self.0.borrow_mut();
        state.value = value.into();
        state.writes += 1;
        Ok(())
    }

    fn read(&self) -> Option<String> {
        Some(self.value())
    }
}

// ---------------------------------------------------------------------------
// Effects
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct EffectState {
    on: bool,
    enable_calls: usize,
    disable_calls: usize,
    failing: bool,
}

/// An effect plugin that records calls and can be made to fail.
#[derive(Clone, Default)]
pub struct HeadlessEffect(Rc<RefCell<EffectState>>);

impl fmt::Debug for HeadlessEffect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.0.borrow();
        f.debug_struct("HeadlessEffect")
            .field("on", &state.on)
            .field("failing", &state.failing)
            .finish_non_exhaustive()
    }
}

impl HeadlessEffect {
    /// A healthy, stopped plugin.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes later calls fail (or succeed again).
    pub fn set_failing(&self, failing: bool) {
        self.0.borrow_mut().failing = failing;
    }

    /// Whether the plugin believes it is running.
    #[must_use]
    pub fn is_on(&self) -> bool {
        self.0.borrow().on
    }

    /// Number of `enable` calls received.
    #[must_use]
    pub fn enable_calls(&self) -> usize {
        self.0.borrow().enable_calls
    }

    /// Number of `disable` calls received.
    #[must_use]
    pub fn disable_calls(&self) -> usize {
        self.0.borrow().disable_calls
    }

    fn toggle(&mut self, on: bool) -> Result<(), HostError> {
        let mut state = self.0.borrow_mut();
        if on {
            state.enable_calls += 1;
        } else {
            state.disable_calls += 1;
        }
        if state.failing {
            state.on = false;
            return Err(HostError::from("plugin threw"));
        }
        state.on = on;
        Ok(())
    }
}

impl VisualEffect for HeadlessEffect {
    fn enable(&mut self) -> Result<(), HostError> {
        self.toggle(true)
    }

    fn disable(&mut self) -> Result<(), HostError> {
        self.toggle(false)
    }
}

// ---------------------------------------------------------------------------
// Kit
// ---------------------------------------------------------------------------

/// One handle to every fake, for wiring an engine and inspecting it after.
#[derive(Clone, Debug)]
pub struct HeadlessKit {
    /// The document.
    pub dom: HeadlessDom,
    /// The tween engine.
    pub tweens: HeadlessTweens,
    /// The root filter.
    pub filter: HeadlessFilter,
    /// One plugin per effect, in [`EffectKind::ALL`] order.
    pub effects: [HeadlessEffect; 8],
}

impl Default for HeadlessKit {
    fn default() -> Self {
        Self::new()
    }
}

impl HeadlessKit {
    /// Fresh fakes.
    #[must_use]
    pub fn new() -> Self {
        Self {
            dom: HeadlessDom::new(),
            tweens: HeadlessTweens::new(),
            filter: HeadlessFilter::new(),
            effects: core::array::from_fn(|_| HeadlessEffect::new()),
        }
    }

    /// Platform parts sharing state with this kit.
    #[must_use]
    pub fn parts(&self) -> PlatformParts<Headless> {
        PlatformParts {
            elements: self.dom.clone(),
            tweens: self.tweens.clone(),
            filter: self.filter.clone(),
        }
    }

    /// The plugin for `kind`.
    #[must_use]
    pub fn effect(&self, kind: EffectKind) -> &HeadlessEffect {
        let idx = EffectKind::ALL
            .iter()
            .position(|&k| k == kind)
            .unwrap_or_default();
        &self.effects[idx]
    }

    /// Registers every plugin.
    pub fn register_effects(&self, registry: &mut EffectRegistry) {
        for kind in EffectKind::ALL {
            registry.register(kind, Box::new(self.effect(kind).clone()));
        }
    }
}
