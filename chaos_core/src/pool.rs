// Copyright 2026 the Chaos Show Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Element pool: the only authority on which show-created nodes are alive.
//!
//! Every DOM or canvas node an effect or phase creates goes through
//! [`ElementPool::create_element`]. The pool attaches it through an
//! [`ElementHost`], records it in struct-of-arrays storage, and hands back an
//! [`ElementHandle`] carrying a generational [`ElementId`].
//!
//! Records and attachment change together: a record exists exactly while the
//! pool considers the node attached, and removing a record always detaches
//! the node if it is still in the document. Removing something twice, or
//! something the page already detached, is a silent no-op.
//!
//! # Budgets
//!
//! [`PoolConfig::budget`] is the steady-state population. It is enforced by
//! [`purge`](ElementPool::purge), which evicts the oldest non-permanent
//! elements first. [`PoolConfig::hard_limit`] is a safety cap enforced on
//! every creation so that a runaway effect cannot grow the pool unboundedly
//! between purges.

use alloc::borrow::Cow;
use alloc::collections::BTreeMap;
use alloc::vec::Vec;

use log::{debug, warn};
use serde::Serialize;

use crate::error::HostError;
use crate::id::ElementId;
use crate::time::{Duration, HostTime};

/// Creates, attaches, and detaches platform nodes on behalf of the pool.
///
/// The browser backend implements this over `web_sys::HtmlElement`; tests use
/// [`headless::HeadlessDom`](crate::headless::HeadlessDom).
pub trait ElementHost {
    /// A cheap, clonable reference to a platform node.
    type Node: Clone + PartialEq;

    /// Creates a detached node of the given tag with inline style applied.
    fn create(&mut self, tag: &str, style: &[(&str, &str)]) -> Result<Self::Node, HostError>;

    /// Appends `node` to `container`, or to the document body when `None`.
    fn append(&mut self, node: &Self::Node, container: Option<&Self::Node>)
    -> Result<(), HostError>;

    /// Returns whether `node` currently has a parent.
    fn is_attached(&self, node: &Self::Node) -> bool;

    /// Detaches `node` from its parent. Only called when attached.
    fn detach(&mut self, node: &Self::Node);

    /// Total element count in the document, tracked or not.
    fn document_node_count(&self) -> usize;

    /// The document body, used as the default container and as the target
    /// of body-level accents.
    fn body(&self) -> Self::Node;
}

/// Broad purpose of a pooled element, used for stats and bulk release.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ElementCategory {
    /// Effect overlays and accent layers.
    #[default]
    Effect,
    /// Scrolling data/text streams.
    Stream,
    /// Individual particles.
    Particle,
    /// Glitch artifacts and flashes.
    Artifact,
    /// Full-screen backgrounds and static layers.
    Background,
}

impl ElementCategory {
    /// All categories, in stats order.
    pub const ALL: [Self; 5] = [
        Self::Effect,
        Self::Stream,
        Self::Particle,
        Self::Artifact,
        Self::Background,
    ];

    const fn slot(self) -> usize {
        match self {
            Self::Effect => 0,
            Self::Stream => 1,
            Self::Particle => 2,
            Self::Artifact => 3,
            Self::Background => 4,
        }
    }
}

/// Per-element creation options.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ElementOptions {
    /// Element category.
    pub category: ElementCategory,
    /// Age after which [`purge`](ElementPool::purge) removes the element.
    /// `None` never expires.
    pub max_age: Option<Duration>,
    /// Survives budget eviction and [`emergency_cleanup`](ElementPool::emergency_cleanup).
    pub permanent: bool,
    /// Removed by [`release_transient`](ElementPool::release_transient) at
    /// every phase transition.
    pub transient: bool,
    /// At most one live element per key is expected;
    /// [`dedupe_singletons`](ElementPool::dedupe_singletons) enforces it.
    pub singleton: Option<Cow<'static, str>>,
}

impl ElementOptions {
    /// Options for an element of the given category, with no other flags.
    #[must_use]
    pub fn new(category: ElementCategory) -> Self {
        Self {
            category,
            ..Self::default()
        }
    }

    /// Sets a maximum age.
    #[must_use]
    pub fn max_age(mut self, max_age: Duration) -> Self {
        self.max_age = Some(max_age);
        self
    }

    /// Marks the element permanent.
    #[must_use]
    pub fn permanent(mut self) -> Self {
        self.permanent = true;
        self
    }

    /// Marks the element phase-transient.
    #[must_use]
    pub fn transient(mut self) -> Self {
        self.transient = true;
        self
    }

    /// Marks the element as a singleton overlay under `key`.
    #[must_use]
    pub fn singleton(mut self, key: impl Into<Cow<'static, str>>) -> Self {
        self.singleton = Some(key.into());
        self
    }
}

/// A created node, plus its pool id when tracked.
#[derive(Clone, Debug, PartialEq)]
pub struct ElementHandle<N> {
    /// `None` when the pool was disabled and the node is untracked.
    pub id: Option<ElementId>,
    /// The platform node.
    pub node: N,
}

/// Read-only view of one record, passed to purge predicates.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ElementInfo<'a> {
    /// The element's handle.
    pub id: ElementId,
    /// Its category.
    pub category: ElementCategory,
    /// When it was created.
    pub created_at: HostTime,
    /// Its maximum age, if any.
    pub max_age: Option<Duration>,
    /// Whether it is permanent.
    pub permanent: bool,
    /// Whether it is phase-transient.
    pub transient: bool,
    /// Its singleton key, if any.
    pub singleton: Option<&'a str>,
}

/// Pool sizing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PoolConfig {
    /// Steady-state element budget, enforced by [`ElementPool::purge`].
    pub budget: usize,
    /// Absolute cap enforced on every creation (oldest evicted first).
    pub hard_limit: usize,
}

impl PoolConfig {
    /// A config whose hard limit is twice the budget.
    #[must_use]
    pub const fn with_budget(budget: usize) -> Self {
        Self {
            budget,
            hard_limit: budget.saturating_mul(2),
        }
    }
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self::with_budget(150)
    }
}

/// Live-population snapshot.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct PoolStats {
    /// Tracked elements.
    pub live: usize,
    /// Tracked elements per category, in [`ElementCategory::ALL`] order.
    pub by_category: [usize; 5],
    /// Tracked permanent elements.
    pub permanent: usize,
    /// Configured budget.
    pub budget: usize,
}

impl PoolStats {
    /// Live count for one category.
    #[must_use]
    pub fn count(&self, category: ElementCategory) -> usize {
        self.by_category[category.slot()]
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
struct ElementFlags {
    permanent: bool,
    transient: bool,
}

/// Struct-of-arrays storage for every pooled element.
///
/// Released slots are recycled through a free list; bumping the slot's
/// generation on release invalidates outstanding [`ElementId`]s.
pub struct ElementPool<H: ElementHost> {
    host: H,
    config: PoolConfig,

    // -- Per-slot records --
    node: Vec<Option<H::Node>>,
    category: Vec<ElementCategory>,
    created_at: Vec<HostTime>,
    max_age: Vec<Option<Duration>>,
    flags: Vec<ElementFlags>,
    singleton: Vec<Option<Cow<'static, str>>>,
    /// Creation order; ties in `created_at` are broken by this.
    sequence: Vec<u64>,

    // -- Allocation --
    generation: Vec<u32>,
    free_list: Vec<u32>,
    live: usize,
    next_sequence: u64,

    // -- Degraded mode --
    disabled: bool,
    warned_disabled: bool,
}

impl<H: ElementHost> core::fmt::Debug for ElementPool<H> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ElementPool")
            .field("config", &self.config)
            .field("live", &self.live)
            .field("slots", &self.node.len())
            .field("disabled", &self.disabled)
            .finish_non_exhaustive()
    }
}

impl<H: ElementHost> ElementPool<H> {
    /// Creates an empty pool over `host`.
    #[must_use]
    pub fn new(host: H, config: PoolConfig) -> Self {
        Self {
            host,
            config,
            node: Vec::new(),
            category: Vec::new(),
            created_at: Vec::new(),
            max_age: Vec::new(),
            flags: Vec::new(),
            singleton: Vec::new(),
            sequence: Vec::new(),
            generation: Vec::new(),
            free_list: Vec::new(),
            live: 0,
            next_sequence: 0,
            disabled: false,
            warned_disabled: false,
        }
    }

    // -- Creation and removal --

    /// Creates a node, attaches it, and starts tracking it.
    ///
    /// While the pool is [disabled](Self::disable) the node is still created
    /// and attached, but left untracked (`id: None`), and a warning is logged
    /// once.
    pub fn create_element(
        &mut self,
        now: HostTime,
        tag: &str,
        style: &[(&str, &str)],
        container: Option<&H::Node>,
        options: ElementOptions,
    ) -> Result<ElementHandle<H::Node>, HostError> {
        let node = self.host.create(tag, style)?;

        if self.disabled {
            if !self.warned_disabled {
                warn!("element pool disabled; creating untracked <{tag}> nodes");
                self.warned_disabled = true;
            }
            self.host.append(&node, container)?;
            return Ok(ElementHandle { id: None, node });
        }

        if self.live >= self.config.hard_limit {
            let excess = self.live + 1 - self.config.hard_limit;
            let evicted = self.evict_oldest(excess);
            debug!("pool at hard limit; evicted {evicted} oldest elements");
        }

        self.host.append(&node, container)?;
        let id = self.alloc(node.clone(), now, options);
        Ok(ElementHandle { id: Some(id), node })
    }

    /// Releases a tracked element, detaching it if it is still attached.
    ///
    /// Returns `false` (and does nothing) for stale or already-released ids.
    pub fn release(&mut self, id: ElementId) -> bool {
        if !self.is_alive(id) {
            return false;
        }
        self.remove_slot(id.idx);
        true
    }

    /// Releases the record owning `node`, if any.
    ///
    /// Untracked nodes are left alone.
    pub fn remove_node(&mut self, node: &H::Node) -> bool {
        let found = self
            .node
            .iter()
            .position(|slot| slot.as_ref() == Some(node));
        match found {
            Some(idx) => {
                #[expect(
                    clippy::cast_possible_truncation,
                    reason = "slot count is bounded by u32 allocation"
                )]
                self.remove_slot(idx as u32);
                true
            }
            None => false,
        }
    }

    // -- Purging --

    /// Removes expired elements, then evicts the oldest non-permanent ones
    /// until the live count is within budget. Returns the number removed.
    pub fn purge(&mut self, now: HostTime) -> usize {
        let expired = self.remove_where(|info| match info.max_age {
            Some(max_age) => now.saturating_duration_since(info.created_at) > max_age,
            None => false,
        });
        let over = self.live.saturating_sub(self.config.budget);
        let evicted = if over > 0 { self.evict_oldest(over) } else { 0 };
        if expired + evicted > 0 {
            debug!("pool purge: {expired} expired, {evicted} over budget");
        }
        expired + evicted
    }

    /// Like [`purge`](Self::purge), then also removes every element matching
    /// `predicate`.
    pub fn purge_where(
        &mut self,
        now: HostTime,
        predicate: impl FnMut(&ElementInfo<'_>) -> bool,
    ) -> usize {
        self.purge(now) + self.remove_where(predicate)
    }

    /// Removes every non-permanent element.
    pub fn emergency_cleanup(&mut self) -> usize {
        let removed = self.remove_where(|info| !info.permanent);
        warn!("emergency cleanup removed {removed} elements");
        removed
    }

    /// Removes every phase-transient element.
    pub fn release_transient(&mut self) -> usize {
        self.remove_where(|info| info.transient)
    }

    /// Removes every element of `category` that is not permanent.
    pub fn release_category(&mut self, category: ElementCategory) -> usize {
        self.remove_where(|info| info.category == category && !info.permanent)
    }

    /// Removes every element, permanent ones included.
    pub fn clear(&mut self) -> usize {
        self.remove_where(|_| true)
    }

    /// Returns how many singleton elements exceed one-per-key.
    #[must_use]
    pub fn singleton_duplicates(&self) -> usize {
        let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
        for key in self.singleton.iter().zip(&self.node).filter_map(|(key, node)| {
            if node.is_some() { key.as_deref() } else { None }
        }) {
            *counts.entry(key).or_default() += 1;
        }
        counts.values().map(|n| n - 1).sum()
    }

    /// Keeps only the oldest element of each singleton key.
    pub fn dedupe_singletons(&mut self) -> usize {
        let mut keep: BTreeMap<Cow<'static, str>, (u64, u32)> = BTreeMap::new();
        for idx in self.live_indices() {
            if let Some(key) = &self.singleton[idx as usize] {
                let seq = self.sequence[idx as usize];
                keep.entry(key.clone())
                    .and_modify(|best| {
                        if seq < best.0 {
                            *best = (seq, idx);
                        }
                    })
                    .or_insert((seq, idx));
            }
        }
        let mut removed = 0;
        for idx in self.live_indices() {
            if let Some(key) = &self.singleton[idx as usize]
                && keep.get(key).is_some_and(|&(_, kept)| kept != idx)
            {
                self.remove_slot(idx);
                removed += 1;
            }
        }
        removed
    }

    // -- Degraded mode --

    /// Stops tracking new elements; see [`create_element`](Self::create_element).
    pub fn disable(&mut self) {
        self.disabled = true;
    }

    /// Resumes tracking new elements.
    pub fn enable(&mut self) {
        self.disabled = false;
        self.warned_disabled = false;
    }

    /// Returns whether the pool is disabled.
    #[must_use]
    pub fn is_disabled(&self) -> bool {
        self.disabled
    }

    // -- Queries --

    /// Returns whether `id` refers to a tracked element.
    #[must_use]
    pub fn is_alive(&self, id: ElementId) -> bool {
        let idx = id.idx as usize;
        idx < self.node.len() && self.generation[idx] == id.generation && self.node[idx].is_some()
    }

    /// Returns the node for a tracked element.
    #[must_use]
    pub fn node(&self, id: ElementId) -> Option<&H::Node> {
        if self.is_alive(id) {
            self.node[id.idx as usize].as_ref()
        } else {
            None
        }
    }

    /// Returns the record for a tracked element.
    #[must_use]
    pub fn info(&self, id: ElementId) -> Option<ElementInfo<'_>> {
        if self.is_alive(id) {
            Some(self.info_at(id.idx))
        } else {
            None
        }
    }

    /// Number of tracked elements.
    #[must_use]
    pub fn len(&self) -> usize {
        self.live
    }

    /// Returns `true` when nothing is tracked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Returns the current sizing.
    #[must_use]
    pub fn config(&self) -> PoolConfig {
        self.config
    }

    /// Replaces the sizing. Takes effect at the next purge or creation.
    pub fn set_config(&mut self, config: PoolConfig) {
        self.config = config;
    }

    /// Live-population snapshot.
    #[must_use]
    pub fn stats(&self) -> PoolStats {
        let mut stats = PoolStats {
            live: self.live,
            budget: self.config.budget,
            ..PoolStats::default()
        };
        for idx in self.live_indices() {
            stats.by_category[self.category[idx as usize].slot()] += 1;
            if self.flags[idx as usize].permanent {
                stats.permanent += 1;
            }
        }
        stats
    }

    /// Total element count in the host document.
    #[must_use]
    pub fn document_node_count(&self) -> usize {
        self.host.document_node_count()
    }

    /// Returns the host.
    #[must_use]
    pub fn host(&self) -> &H {
        &self.host
    }

    /// Returns the host mutably.
    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    // -- Internal helpers --

    fn alloc(&mut self, node: H::Node, now: HostTime, options: ElementOptions) -> ElementId {
        let sequence = self.next_sequence;
        self.next_sequence += 1;
        let flags = ElementFlags {
            permanent: options.permanent,
            transient: options.transient,
        };

        let idx = if let Some(idx) = self.free_list.pop() {
            // Reuse a freed slot; its generation was bumped on release.
            let i = idx as usize;
            self.node[i] = Some(node);
            self.category[i] = options.category;
            self.created_at[i] = now;
            self.max_age[i] = options.max_age;
            self.flags[i] = flags;
            self.singleton[i] = options.singleton;
            self.sequence[i] = sequence;
            idx
        } else {
            #[expect(
                clippy::cast_possible_truncation,
                reason = "pool slots never approach u32::MAX"
            )]
            let idx = self.node.len() as u32;
            self.node.push(Some(node));
            self.category.push(options.category);
            self.created_at.push(now);
            self.max_age.push(options.max_age);
            self.flags.push(flags);
            self.singleton.push(options.singleton);
            self.sequence.push(sequence);
            self.generation.push(0);
            idx
        };

        self.live += 1;
        ElementId {
            idx,
            generation: self.generation[idx as usize],
        }
    }

    /// Detaches (if still attached) and frees a live slot.
    fn remove_slot(&mut self, idx: u32) {
        let i = idx as usize;
        let Some(node) = self.node[i].take() else {
            return;
        };
        // The page may have detached it already (e.g. a parent was replaced).
        if self.host.is_attached(&node) {
            self.host.detach(&node);
        }
        self.singleton[i] = None;
        self.generation[i] = self.generation[i].wrapping_add(1);
        self.free_list.push(idx);
        self.live -= 1;
    }

    fn info_at(&self, idx: u32) -> ElementInfo<'_> {
        let i = idx as usize;
        ElementInfo {
            id: ElementId {
                idx,
                generation: self.generation[i],
            },
            category: self.category[i],
            created_at: self.created_at[i],
            max_age: self.max_age[i],
            permanent: self.flags[i].permanent,
            transient: self.flags[i].transient,
            singleton: self.singleton[i].as_deref(),
        }
    }

    fn live_indices(&self) -> Vec<u32> {
        self.node
            .iter()
            .enumerate()
            .filter(|(_, node)| node.is_some())
            .map(|(idx, _)| {
                #[expect(
                    clippy::cast_possible_truncation,
                    reason = "pool slots never approach u32::MAX"
                )]
                let idx = idx as u32;
                idx
            })
            .collect()
    }

    fn remove_where(&mut self, mut predicate: impl FnMut(&ElementInfo<'_>) -> bool) -> usize {
        let doomed: Vec<u32> = self
            .live_indices()
            .into_iter()
            .filter(|&idx| predicate(&self.info_at(idx)))
            .collect();
        for &idx in &doomed {
            self.remove_slot(idx);
        }
        doomed.len()
    }

    /// Evicts up to `count` non-permanent elements, oldest first.
    fn evict_oldest(&mut self, count: usize) -> usize {
        let mut candidates: Vec<u32> = self
            .live_indices()
            .into_iter()
            .filter(|&idx| !self.flags[idx as usize].permanent)
            .collect();
        candidates.sort_by_key(|&idx| self.sequence[idx as usize]);
        let evicted = count.min(candidates.len());
        for &idx in &candidates[..evicted] {
            self.remove_slot(idx);
        }
        evicted
    }
}

#[cfg(test)]
mod tests {
    use alloc::vec;

    use super::*;
    use crate::headless::HeadlessDom;

    fn pool(budget: usize) -> (ElementPool<HeadlessDom>, HeadlessDom) {
        let dom = HeadlessDom::new();
        (ElementPool::new(dom.clone(), PoolConfig::with_budget(budget)), dom)
    }

    fn particle(pool: &mut ElementPool<HeadlessDom>, at: u64) -> ElementId {
        pool.create_element(
            HostTime(at),
            "div",
            &[("position", "absolute")],
            None,
            ElementOptions::new(ElementCategory::Particle),
        )
        .expect("valid tag")
        .id
        .expect("pool enabled")
    }

    #[test]
    fn create_attaches_and_tracks() {
        let (mut pool, dom) = pool(10);
        let id = particle(&mut pool, 0);
        assert!(pool.is_alive(id));
        assert_eq!(pool.len(), 1);
        let node = pool.node(id).copied().expect("tracked");
        assert!(dom.is_attached_node(node), "node is in the document");
        assert_eq!(dom.style_of(node, "position").as_deref(), Some("absolute"));
    }

    #[test]
    fn release_is_idempotent() {
        let (mut pool, dom) = pool(10);
        let id = particle(&mut pool, 0);
        let node = *pool.node(id).expect("tracked");
        assert!(pool.release(id));
        assert!(!pool.release(id), "second release is a no-op");
        assert!(!dom.is_attached_node(node));
        assert_eq!(pool.len(), 0);
    }

    #[test]
    fn externally_detached_node_releases_cleanly() {
        let (mut pool, dom) = pool(10);
        let id = particle(&mut pool, 0);
        let node = *pool.node(id).expect("tracked");
        dom.detach_externally(node);
        assert!(pool.remove_node(&node), "record still owned by pool");
        assert!(!pool.remove_node(&node));
        assert_eq!(pool.len(), 0);
    }

    #[test]
    fn purge_evicts_oldest_over_budget() {
        let (mut pool, _dom) = pool(3);
        let ids: Vec<_> = (0..5).map(|t| particle(&mut pool, t)).collect();
        assert_eq!(pool.purge(HostTime(10)), 2);
        assert!(!pool.is_alive(ids[0]));
        assert!(!pool.is_alive(ids[1]));
        assert!(ids[2..].iter().all(|&id| pool.is_alive(id)), "newest survive");
    }

    #[test]
    fn purge_removes_expired() {
        let (mut pool, _dom) = pool(10);
        let short = pool
            .create_element(
                HostTime(0),
                "canvas",
                &[],
                None,
                ElementOptions::new(ElementCategory::Artifact).max_age(Duration(500)),
            )
            .expect("valid tag")
            .id
            .expect("tracked");
        let keep = particle(&mut pool, 0);
        assert_eq!(pool.purge(HostTime(500)), 0, "age equal to max is kept");
        assert_eq!(pool.purge(HostTime(501)), 1);
        assert!(!pool.is_alive(short));
        assert!(pool.is_alive(keep));
    }

    #[test]
    fn permanent_elements_survive_eviction_and_emergency() {
        let (mut pool, _dom) = pool(1);
        let scanlines = pool
            .create_element(
                HostTime(0),
                "div",
                &[],
                None,
                ElementOptions::new(ElementCategory::Background).permanent(),
            )
            .expect("valid tag")
            .id
            .expect("tracked");
        let a = particle(&mut pool, 1);
        let b = particle(&mut pool, 2);
        pool.purge(HostTime(3));
        assert!(pool.is_alive(scanlines));
        assert!(!pool.is_alive(a));
        assert!(!pool.is_alive(b), "permanent counts toward the budget");
        particle(&mut pool, 4);
        assert_eq!(pool.emergency_cleanup(), 1);
        assert!(pool.is_alive(scanlines));
    }

    #[test]
    fn hard_limit_caps_creation() {
        let dom = HeadlessDom::new();
        let mut pool = ElementPool::new(
            dom,
            PoolConfig {
                budget: 2,
                hard_limit: 3,
            },
        );
        let ids: Vec<_> = (0..5).map(|t| particle(&mut pool, t)).collect();
        assert_eq!(pool.len(), 3);
        assert!(!pool.is_alive(ids[0]));
        assert!(!pool.is_alive(ids[1]));
    }

    #[test]
    fn stale_id_does_not_alias_reused_slot() {
        let (mut pool, _dom) = pool(10);
        let first = particle(&mut pool, 0);
        pool.release(first);
        let second = particle(&mut pool, 1);
        assert_eq!(first.index(), second.index(), "slot reused");
        assert!(!pool.is_alive(first));
        assert!(!pool.release(first));
        assert!(pool.is_alive(second));
    }

    #[test]
    fn dedupe_keeps_oldest_singleton() {
        let (mut pool, _dom) = pool(10);
        let make = |pool: &mut ElementPool<HeadlessDom>, t| {
            pool.create_element(
                HostTime(t),
                "div",
                &[],
                None,
                ElementOptions::new(ElementCategory::Background).singleton("blackout"),
            )
            .expect("valid tag")
            .id
            .expect("tracked")
        };
        let first = make(&mut pool, 0);
        let dupes = vec![make(&mut pool, 1), make(&mut pool, 2)];
        assert_eq!(pool.singleton_duplicates(), 2);
        assert_eq!(pool.dedupe_singletons(), 2);
        assert_eq!(pool.dedupe_singletons(), 0, "second pass finds nothing");
        assert!(pool.is_alive(first));
        assert!(dupes.iter().all(|&id| !pool.is_alive(id)));
    }

    #[test]
    fn disabled_pool_still_creates_untracked_nodes() {
        let (mut pool, dom) = pool(10);
        pool.disable();
        let handle = pool
            .create_element(HostTime(0), "div", &[], None, ElementOptions::default())
            .expect("valid tag");
        assert_eq!(handle.id, None);
        assert!(dom.is_attached_node(handle.node));
        assert_eq!(pool.len(), 0);
        assert!(!pool.remove_node(&handle.node), "untracked removal is a no-op");
    }

    #[test]
    fn invalid_tag_is_an_error() {
        let (mut pool, _dom) = pool(10);
        let err = pool.create_element(HostTime(0), "", &[], None, ElementOptions::default());
        assert!(err.is_err());
        assert_eq!(pool.len(), 0);
    }

    #[test]
    fn stats_count_by_category() {
        let (mut pool, _dom) = pool(10);
        particle(&mut pool, 0);
        particle(&mut pool, 1);
        pool.create_element(
            HostTime(2),
            "div",
            &[],
            None,
            ElementOptions::new(ElementCategory::Stream).transient(),
        )
        .expect("valid tag");
        let stats = pool.stats();
        assert_eq!(stats.live, 3);
        assert_eq!(stats.count(ElementCategory::Particle), 2);
        assert_eq!(stats.count(ElementCategory::Stream), 1);
        assert_eq!(pool.release_transient(), 1);
    }
}
