// Copyright 2026 the Chaos Show Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Owner-scoped accounting over a tween engine.
//!
//! The [`TweenRegistry`] is a thin wrapper around whatever concrete
//! [`TweenEngine`] the host supplies. Every tracked tween is stored under a
//! [`TweenKey`] and tagged with an [`OwnerKey`]; a phase transition kills
//! exactly the outgoing phase's tweens with
//! [`kill_owner`](TweenRegistry::kill_owner) and nothing else.
//!
//! The registry never stores tween targets. The engine holds whatever
//! reference it needs for as long as the tween runs, so tracking a tween does
//! not extend the lifetime of the node it animates.
//!
//! Tweens leave the registry in one of three ways: killed through the
//! registry, reported complete by the engine
//! ([`complete`](TweenRegistry::complete)), or found inactive by a
//! [`sweep`](TweenRegistry::sweep) for engines without completion callbacks.
//! A sweep never forgets a tween started in the current frame: some engines
//! report a tween inactive until it first renders.

use alloc::borrow::Cow;
use alloc::collections::BTreeMap;
use alloc::vec::Vec;
use core::fmt;

use log::debug;

use crate::error::HostError;
use crate::id::TweenKey;
use crate::phase::Phase;
use crate::time::{Duration, HostTime};

/// How many times a tween plays.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Repeat {
    /// Plays once.
    #[default]
    Once,
    /// Plays once and then repeats `n` more times.
    Count(u32),
    /// Repeats until killed.
    Infinite,
}

impl Repeat {
    /// The engine convention: `-1` for infinite, otherwise the extra plays.
    #[must_use]
    pub const fn as_engine_count(self) -> i32 {
        match self {
            Self::Once => 0,
            Self::Count(n) => {
                if n > i32::MAX as u32 {
                    i32::MAX
                } else {
                    n as i32
                }
            }
            Self::Infinite => -1,
        }
    }
}

/// Animated properties and timing.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TweenVars {
    /// Duration of one play.
    pub duration: Duration,
    /// Repetition.
    pub repeat: Repeat,
    /// Reverse on alternate plays.
    pub yoyo: bool,
    /// Property name and end value pairs.
    pub props: Vec<(Cow<'static, str>, f64)>,
}

impl TweenVars {
    /// Vars with a duration and no properties.
    #[must_use]
    pub fn new(duration: Duration) -> Self {
        Self {
            duration,
            ..Self::default()
        }
    }

    /// Adds an animated property.
    #[must_use]
    pub fn prop(mut self, name: impl Into<Cow<'static, str>>, value: f64) -> Self {
        self.props.push((name.into(), value));
        self
    }

    /// Sets the repetition.
    #[must_use]
    pub fn repeat(mut self, repeat: Repeat) -> Self {
        self.repeat = repeat;
        self
    }

    /// Enables yoyo.
    #[must_use]
    pub fn yoyo(mut self) -> Self {
        self.yoyo = true;
        self
    }
}

/// The kind of tween to create.
#[derive(Clone, Debug, PartialEq)]
pub enum Animation {
    /// Animate from current values to `vars`.
    To(TweenVars),
    /// Animate from one set of values to another.
    FromTo {
        /// Starting values (timing fields are ignored).
        from: TweenVars,
        /// End values and timing.
        to: TweenVars,
    },
    /// Apply values immediately. Never tracked.
    Set(TweenVars),
}

/// Groups tweens for bulk cancellation.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum OwnerKey {
    /// Persistent animations that phase transitions never kill.
    System,
    /// Animations belonging to one phase.
    Phase(Phase),
    /// Animations belonging to some other component, e.g. an effect.
    Named(Cow<'static, str>),
}

impl OwnerKey {
    /// Creates a named owner.
    #[must_use]
    pub fn named(name: impl Into<Cow<'static, str>>) -> Self {
        Self::Named(name.into())
    }

    /// Returns `true` for [`OwnerKey::System`].
    #[must_use]
    pub fn is_persistent(&self) -> bool {
        matches!(self, Self::System)
    }
}

impl From<Phase> for OwnerKey {
    fn from(phase: Phase) -> Self {
        Self::Phase(phase)
    }
}

impl fmt::Debug for OwnerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "OwnerKey({self})")
    }
}

impl fmt::Display for OwnerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::System => f.write_str("system"),
            Self::Phase(phase) => write!(f, "phase:{phase}"),
            Self::Named(name) => f.write_str(name),
        }
    }
}

/// The capability set consumed from a concrete tween library.
pub trait TweenEngine {
    /// What tweens animate.
    type Target;
    /// A running tween.
    type Handle;

    /// Starts a tween from current values to `vars`.
    fn to(&mut self, target: &Self::Target, vars: &TweenVars) -> Result<Self::Handle, HostError>;

    /// Starts a tween between two explicit value sets.
    fn from_to(
        &mut self,
        target: &Self::Target,
        from: &TweenVars,
        to: &TweenVars,
    ) -> Result<Self::Handle, HostError>;

    /// Applies values immediately.
    fn set(&mut self, target: &Self::Target, vars: &TweenVars) -> Result<(), HostError>;

    /// Stops a tween. Killing a finished tween is harmless.
    fn kill(&mut self, handle: &Self::Handle);

    /// Returns whether a tween is still playing.
    fn is_active(&self, handle: &Self::Handle) -> bool;
}

struct Tracked<H> {
    handle: H,
    owner: OwnerKey,
    created_at: HostTime,
    serial: u64,
}

/// Tracks every running tween by key and owner.
pub struct TweenRegistry<E: TweenEngine> {
    engine: E,
    tweens: BTreeMap<TweenKey, Tracked<E::Handle>>,
    max_tweens: Option<usize>,
    next_serial: u64,
}

impl<E: TweenEngine> fmt::Debug for TweenRegistry<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TweenRegistry")
            .field("size", &self.tweens.len())
            .field("max_tweens", &self.max_tweens)
            .finish_non_exhaustive()
    }
}

impl<E: TweenEngine> TweenRegistry<E> {
    /// Creates an empty registry over `engine`.
    #[must_use]
    pub fn new(engine: E) -> Self {
        Self {
            engine,
            tweens: BTreeMap::new(),
            max_tweens: None,
            next_serial: 0,
        }
    }

    /// Caps the number of tracked tweens. See
    /// [`create_animation`](Self::create_animation).
    pub fn set_max_tweens(&mut self, max: Option<usize>) {
        self.max_tweens = max;
    }

    /// Starts an animation and tracks it under `key` and `owner`.
    ///
    /// A tween already tracked under `key` is killed first. When `key` is
    /// `None` a unique one is generated. [`Animation::Set`] is applied
    /// immediately and returns `Ok(None)`.
    ///
    /// At the configured cap, inactive tweens are swept first; if the
    /// registry is still full the oldest non-system tweens are killed.
    pub fn create_animation(
        &mut self,
        now: HostTime,
        animation: &Animation,
        target: &E::Target,
        key: Option<TweenKey>,
        owner: OwnerKey,
    ) -> Result<Option<TweenKey>, HostError> {
        let handle = match animation {
            Animation::Set(vars) => {
                self.engine.set(target, vars)?;
                return Ok(None);
            }
            Animation::To(vars) => self.engine.to(target, vars)?,
            Animation::FromTo { from, to } => self.engine.from_to(target, from, to)?,
        };

        let serial = self.next_serial;
        self.next_serial += 1;
        let key = key.unwrap_or_else(|| TweenKey::numbered(serial));

        if let Some(previous) = self.tweens.remove(&key) {
            self.engine.kill(&previous.handle);
        }
        if let Some(max) = self.max_tweens
            && self.tweens.len() >= max
        {
            self.make_room(now, max);
        }

        self.tweens.insert(
            key.clone(),
            Tracked {
                handle,
                owner,
                created_at: now,
                serial,
            },
        );
        Ok(Some(key))
    }

    /// Kills and forgets every tween owned by `owner`. Returns the count.
    pub fn kill_owner(&mut self, owner: &OwnerKey) -> usize {
        let killed = self.kill_where(|t| &t.owner == owner);
        if killed > 0 {
            debug!("killed {killed} tweens owned by {owner}");
        }
        killed
    }

    /// Kills one tween. Returns `false` if it was not tracked.
    pub fn kill(&mut self, key: &TweenKey) -> bool {
        match self.tweens.remove(key) {
            Some(tracked) => {
                self.engine.kill(&tracked.handle);
                true
            }
            None => false,
        }
    }

    /// Forgets a tween that finished on its own.
    pub fn complete(&mut self, key: &TweenKey) -> bool {
        self.tweens.remove(key).is_some()
    }

    /// Forgets every tween started before `now` that the engine reports as
    /// no longer active.
    pub fn sweep(&mut self, now: HostTime) -> usize {
        let before = self.tweens.len();
        let engine = &self.engine;
        self.tweens.retain(|_, t| t.created_at >= now || engine.is_active(&t.handle));
        before - self.tweens.len()
    }

    /// Kills every tween not owned by [`OwnerKey::System`].
    pub fn kill_all_transient(&mut self) -> usize {
        self.kill_where(|t| !t.owner.is_persistent())
    }

    /// Kills everything regardless of owner.
    pub fn emergency_stop(&mut self) -> usize {
        self.kill_where(|_| true)
    }

    /// Number of tracked tweens.
    #[must_use]
    pub fn size(&self) -> usize {
        self.tweens.len()
    }

    /// Number of tracked tweens owned by `owner`.
    #[must_use]
    pub fn count_owner(&self, owner: &OwnerKey) -> usize {
        self.tweens.values().filter(|t| &t.owner == owner).count()
    }

    /// Returns whether `key` is tracked.
    #[must_use]
    pub fn contains(&self, key: &TweenKey) -> bool {
        self.tweens.contains_key(key)
    }

    /// Returns the owner of a tracked tween.
    #[must_use]
    pub fn owner_of(&self, key: &TweenKey) -> Option<&OwnerKey> {
        self.tweens.get(key).map(|t| &t.owner)
    }

    /// Returns when a tracked tween was created.
    #[must_use]
    pub fn created_at(&self, key: &TweenKey) -> Option<HostTime> {
        self.tweens.get(key).map(|t| t.created_at)
    }

    /// Returns the engine.
    #[must_use]
    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Returns the engine mutably.
    pub fn engine_mut(&mut self) -> &mut E {
        &mut self.engine
    }

    fn kill_where(&mut self, mut predicate: impl FnMut(&Tracked<E::Handle>) -> bool) -> usize {
        let doomed: Vec<TweenKey> = self
            .tweens
            .iter()
            .filter(|(_, t)| predicate(t))
            .map(|(k, _)| k.clone())
            .collect();
        for key in &doomed {
            if let Some(tracked) = self.tweens.remove(key) {
                self.engine.kill(&tracked.handle);
            }
        }
        doomed.len()
    }

    /// Frees one slot below `max`, sweeping before killing.
    fn make_room(&mut self, now: HostTime, max: usize) {
        self.sweep(now);
        while self.tweens.len() >= max {
            let oldest = self
                .tweens
                .iter()
                .filter(|(_, t)| !t.owner.is_persistent())
                .min_by_key(|(_, t)| t.serial)
                .map(|(k, _)| k.clone());
            let Some(key) = oldest else {
                // Only system tweens remain; let the registry grow.
                break;
            };
            debug!("tween cap reached; killing {key}");
            self.kill(&key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::headless::{HeadlessDom, HeadlessNode, HeadlessTweens};
    use crate::pool::ElementHost;

    fn setup() -> (TweenRegistry<HeadlessTweens>, HeadlessTweens, HeadlessNode) {
        let engine = HeadlessTweens::new();
        let node = HeadlessDom::new().body();
        (TweenRegistry::new(engine.clone()), engine, node)
    }

    fn fade() -> Animation {
        Animation::To(TweenVars::new(Duration(300)).prop("opacity", 0.0))
    }

    #[test]
    fn duplicate_key_replaces() {
        let (mut reg, engine, node) = setup();
        let key = TweenKey::from_static("logo-spin");
        reg.create_animation(HostTime(0), &fade(), &node, Some(key.clone()), OwnerKey::System)
            .expect("engine healthy");
        reg.create_animation(HostTime(1), &fade(), &node, Some(key.clone()), OwnerKey::System)
            .expect("engine healthy");
        assert_eq!(reg.size(), 1);
        assert_eq!(engine.active_count(), 1, "first tween was killed");
        assert_eq!(reg.created_at(&key), Some(HostTime(1)));
    }

    #[test]
    fn kill_owner_spares_system() {
        let (mut reg, engine, node) = setup();
        for _ in 0..3 {
            reg.create_animation(HostTime(0), &fade(), &node, None, Phase::Neon.into())
                .expect("engine healthy");
        }
        reg.create_animation(HostTime(0), &fade(), &node, None, OwnerKey::System)
            .expect("engine healthy");
        assert_eq!(reg.kill_owner(&Phase::Neon.into()), 3);
        assert_eq!(reg.kill_owner(&Phase::Neon.into()), 0, "nothing left to kill");
        assert_eq!(reg.size(), 1);
        assert_eq!(reg.kill_all_transient(), 0);
        assert_eq!(engine.active_count(), 1);
    }

    #[test]
    fn set_is_never_tracked() {
        let (mut reg, engine, node) = setup();
        let key = reg
            .create_animation(
                HostTime(0),
                &Animation::Set(TweenVars::default().prop("x", 10.0)),
                &node,
                None,
                OwnerKey::System,
            )
            .expect("engine healthy");
        assert_eq!(key, None);
        assert_eq!(reg.size(), 0);
        assert_eq!(engine.set_calls(), 1);
    }

    #[test]
    fn natural_completion_leaves_registry() {
        let (mut reg, engine, node) = setup();
        let key = reg
            .create_animation(HostTime(0), &fade(), &node, None, OwnerKey::named("logo"))
            .expect("engine healthy")
            .expect("tracked");
        let other = reg
            .create_animation(HostTime(0), &fade(), &node, None, OwnerKey::named("logo"))
            .expect("engine healthy")
            .expect("tracked");
        assert!(reg.complete(&key));
        assert!(!reg.complete(&key), "already forgotten");
        engine.finish_all();
        assert_eq!(reg.sweep(HostTime(0)), 0, "started this frame");
        assert_eq!(reg.sweep(HostTime(16)), 1);
        assert!(!reg.contains(&other));
        assert_eq!(reg.size(), 0);
    }

    #[test]
    fn cap_kills_oldest_transient() {
        let (mut reg, _engine, node) = setup();
        reg.set_max_tweens(Some(2));
        let system = reg
            .create_animation(HostTime(0), &fade(), &node, None, OwnerKey::System)
            .expect("engine healthy")
            .expect("tracked");
        let old = reg
            .create_animation(HostTime(1), &fade(), &node, None, Phase::Fire.into())
            .expect("engine healthy")
            .expect("tracked");
        let new = reg
            .create_animation(HostTime(2), &fade(), &node, None, Phase::Fire.into())
            .expect("engine healthy")
            .expect("tracked");
        assert_eq!(reg.size(), 2);
        assert!(reg.contains(&system), "system tween spared");
        assert!(!reg.contains(&old));
        assert!(reg.contains(&new));
    }

    #[test]
    fn cap_keeps_tweens_started_this_frame() {
        let (mut reg, engine, node) = setup();
        reg.set_max_tweens(Some(3));
        for _ in 0..2 {
            reg.create_animation(HostTime(0), &fade(), &node, None, Phase::Neon.into())
                .expect("engine healthy");
        }
        engine.finish_all();

        // One runner, one frame. The engine has not rendered its first tween
        // yet and reports it inactive when the second one hits the cap.
        let first = reg
            .create_animation(HostTime(40), &fade(), &node, None, Phase::Fire.into())
            .expect("engine healthy")
            .expect("tracked");
        engine.finish_all();
        let second = reg
            .create_animation(HostTime(40), &fade(), &node, None, Phase::Fire.into())
            .expect("engine healthy")
            .expect("tracked");

        assert!(reg.contains(&first), "fresh tween swept");
        assert!(reg.contains(&second));
        assert_eq!(reg.count_owner(&Phase::Neon.into()), 0, "finished tweens swept");
        assert_eq!(reg.kill_owner(&Phase::Fire.into()), 2);
    }

    #[test]
    fn emergency_stop_kills_everything() {
        let (mut reg, engine, node) = setup();
        reg.create_animation(HostTime(0), &fade(), &node, None, OwnerKey::System)
            .expect("engine healthy");
        reg.create_animation(HostTime(0), &fade(), &node, None, Phase::Ice.into())
            .expect("engine healthy");
        assert_eq!(reg.emergency_stop(), 2);
        assert_eq!(engine.active_count(), 0);
    }

    #[test]
    fn repeat_engine_counts() {
        assert_eq!(Repeat::Once.as_engine_count(), 0);
        assert_eq!(Repeat::Count(3).as_engine_count(), 3);
        assert_eq!(Repeat::Infinite.as_engine_count(), -1);
    }
}
