// Copyright 2026 the Chaos Show Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The shared registries, and the runners that act on them.
//!
//! A [`Stage`] bundles every registry a phase can touch. It is constructed
//! once by the engine and passed by reference to whoever needs it; nothing in
//! the core looks it up globally.
//!
//! A phase's side effects are produced by a [`PhaseRunner`] working through a
//! [`PhaseContext`]. The context tags everything the runner creates with the
//! phase: tweens are owned by the phase, elements are transient, and timers
//! are in [`TimerCategory::Phase`]. That tagging is what lets the controller
//! clean up exactly one phase's leftovers on the next transition.

use alloc::boxed::Box;
use alloc::format;
use alloc::rc::Rc;
use core::fmt;

use log::warn;

use crate::effect::{EffectKind, EffectRegistry};
use crate::error::RunnerError;
use crate::filter::FilterManager;
use crate::id::{ElementId, TimerKey, TweenKey};
use crate::interval::{IntervalHandle, IntervalRegistry, TimerCategory, TimerOptions};
use crate::phase::{Accent, AccentTarget, Flash, Phase, PhaseRecipe};
use crate::platform::{Platform, PlatformParts};
use crate::pool::{
    ElementCategory, ElementHandle, ElementHost, ElementOptions, ElementPool, PoolConfig,
};
use crate::time::{Duration, HostTime};
use crate::tween::{Animation, OwnerKey, TweenRegistry, TweenVars};

// ---------------------------------------------------------------------------
// Timer payloads
// ---------------------------------------------------------------------------

/// What a managed timer does when it fires.
#[derive(Clone)]
pub enum Task {
    /// Let the scheduler decide whether a phase change is due.
    SchedulerHeartbeat,
    /// Run one watchdog tick.
    WatchdogTick,
    /// Expire timers and elements past their maximum age.
    AutoCleanup,
    /// Release one pooled element (overlay expiry).
    ReleaseElement(ElementId),
    /// Finish a soft restart.
    ResumeAfterRestart,
    /// Host-supplied callback.
    Custom(Rc<dyn Fn(HostTime)>),
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SchedulerHeartbeat => f.write_str("SchedulerHeartbeat"),
            Self::WatchdogTick => f.write_str("WatchdogTick"),
            Self::AutoCleanup => f.write_str("AutoCleanup"),
            Self::ReleaseElement(id) => f.debug_tuple("ReleaseElement").field(id).finish(),
            Self::ResumeAfterRestart => f.write_str("ResumeAfterRestart"),
            Self::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

// ---------------------------------------------------------------------------
// Stage
// ---------------------------------------------------------------------------

/// Every registry the show mutates.
pub struct Stage<P: Platform> {
    /// Managed elements.
    pub pool: ElementPool<P::Elements>,
    /// Managed tweens.
    pub tweens: TweenRegistry<P::Tweens>,
    /// The root filter writer.
    pub filter: FilterManager<P::Filter>,
    /// Effect plugins.
    pub effects: EffectRegistry,
    /// Managed timers.
    pub timers: IntervalRegistry<Task>,
}

impl<P: Platform> fmt::Debug for Stage<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Stage")
            .field("pool", &self.pool)
            .field("tweens", &self.tweens)
            .field("effects", &self.effects)
            .field("timers", &self.timers)
            .finish_non_exhaustive()
    }
}

impl<P: Platform> Stage<P> {
    /// Builds a stage from host services.
    #[must_use]
    pub fn new(parts: PlatformParts<P>, pool: PoolConfig) -> Self {
        Self {
            pool: ElementPool::new(parts.elements, pool),
            tweens: TweenRegistry::new(parts.tweens),
            filter: FilterManager::new(parts.filter),
            effects: EffectRegistry::new(),
            timers: IntervalRegistry::new(),
        }
    }

    /// The document body.
    #[must_use]
    pub fn body(&self) -> P::Node {
        self.pool.host().body()
    }
}

// ---------------------------------------------------------------------------
// PhaseContext
// ---------------------------------------------------------------------------

/// What a runner sees while it sets up a phase.
pub struct PhaseContext<'a, P: Platform> {
    stage: &'a mut Stage<P>,
    phase: Phase,
    now: HostTime,
    failures: u32,
}

impl<P: Platform> fmt::Debug for PhaseContext<'_, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PhaseContext")
            .field("phase", &self.phase)
            .field("now", &self.now)
            .field("failures", &self.failures)
            .finish_non_exhaustive()
    }
}

impl<'a, P: Platform> PhaseContext<'a, P> {
    pub(crate) fn new(stage: &'a mut Stage<P>, phase: Phase, now: HostTime) -> Self {
        Self {
            stage,
            phase,
            now,
            failures: 0,
        }
    }

    /// The phase being set up.
    #[must_use]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// The transition's timestamp.
    #[must_use]
    pub fn now(&self) -> HostTime {
        self.now
    }

    /// Failures recorded so far.
    #[must_use]
    pub fn failures(&self) -> u32 {
        self.failures
    }

    /// Requests a root filter through the filter manager.
    pub fn apply_filter(&mut self, expr: &str) -> Result<(), RunnerError> {
        self.stage
            .filter
            .apply(expr, Duration::ZERO)
            .map(drop)
            .map_err(|e| self.fail(e.into()))
    }

    /// Enables an effect the phase needs.
    pub fn enable(&mut self, effect: EffectKind) -> Result<(), RunnerError> {
        self.stage
            .effects
            .enable(effect)
            .map_err(|e| self.fail(e.into()))
    }

    /// Starts a tween owned by this phase.
    pub fn animate(
        &mut self,
        animation: &Animation,
        target: &P::Node,
        key: Option<TweenKey>,
    ) -> Result<Option<TweenKey>, RunnerError> {
        let owner = OwnerKey::Phase(self.phase);
        self.stage
            .tweens
            .create_animation(self.now, animation, target, key, owner)
            .map_err(|e| self.fail(e.into()))
    }

    /// Creates a transient element that lives at most `lifetime`.
    ///
    /// Expiry is a managed timeout, so it is cancelled with the phase.
    pub fn overlay(
        &mut self,
        tag: &str,
        style: &[(&str, &str)],
        options: ElementOptions,
        lifetime: Option<Duration>,
    ) -> Result<ElementHandle<P::Node>, RunnerError> {
        let mut options = options.transient();
        if let Some(lifetime) = lifetime {
            options = options.max_age(lifetime);
        }
        let handle = self
            .stage
            .pool
            .create_element(self.now, tag, style, None, options)
            .map_err(|e| self.fail(e.into()))?;
        if let (Some(lifetime), Some(id)) = (lifetime, handle.id) {
            self.timeout(
                TimerKey::from(format!("overlay:{id}")),
                lifetime,
                Task::ReleaseElement(id),
            );
        }
        Ok(handle)
    }

    /// Registers a phase-scoped timeout.
    pub fn timeout(&mut self, key: TimerKey, delay: Duration, task: Task) -> IntervalHandle {
        self.stage.timers.create_timeout(
            self.now,
            key,
            delay,
            task,
            TimerOptions::new(TimerCategory::Phase).max_age(delay),
        )
    }

    /// Direct access to the stage, for runners with needs beyond the helpers.
    pub fn stage(&mut self) -> &mut Stage<P> {
        self.stage
    }

    /// The document body.
    #[must_use]
    pub fn body(&self) -> P::Node {
        self.stage.body()
    }

    fn fail(&mut self, err: RunnerError) -> RunnerError {
        self.failures += 1;
        warn!("phase {}: {err}", self.phase);
        err
    }
}

// ---------------------------------------------------------------------------
// Runners
// ---------------------------------------------------------------------------

/// Sets up one phase. May fail part-way; the phase still becomes active.
pub type PhaseRunner<P> = Box<dyn FnMut(&mut PhaseContext<'_, P>) -> Result<(), RunnerError>>;

/// A runner that applies a [`PhaseRecipe`].
///
/// Individual failures are recorded on the context and do not stop the rest
/// of the recipe.
#[must_use]
pub fn recipe_runner<P: Platform>(recipe: &'static PhaseRecipe) -> PhaseRunner<P> {
    Box::new(move |ctx: &mut PhaseContext<'_, P>| {
        _ = ctx.apply_filter(recipe.filter);
        for &effect in recipe.effects {
            _ = ctx.enable(effect);
        }
        if let Some(flash) = recipe.flash {
            _ = show_flash(ctx, &flash);
        }
        for (i, accent) in recipe.accents.iter().enumerate() {
            _ = run_accent(ctx, i, accent);
        }
        Ok(())
    })
}

fn show_flash<P: Platform>(
    ctx: &mut PhaseContext<'_, P>,
    flash: &Flash,
) -> Result<(), RunnerError> {
    ctx.overlay(
        "div",
        &[
            ("position", "fixed"),
            ("inset", "0"),
            ("pointer-events", "none"),
            ("background", flash.background),
            ("mix-blend-mode", flash.blend),
            ("z-index", "9000"),
        ],
        ElementOptions::new(ElementCategory::Artifact).singleton("phase-flash"),
        Some(flash.lifetime),
    )
    .map(drop)
}

fn run_accent<P: Platform>(
    ctx: &mut PhaseContext<'_, P>,
    index: usize,
    accent: &Accent,
) -> Result<(), RunnerError> {
    let target = match accent.target {
        AccentTarget::Body => ctx.body(),
        AccentTarget::Overlay => {
            ctx.overlay(
                "div",
                &[
                    ("position", "fixed"),
                    ("inset", "0"),
                    ("pointer-events", "none"),
                ],
                ElementOptions::new(ElementCategory::Effect),
                None,
            )?
            .node
        }
    };
    let mut to = TweenVars::new(accent.duration)
        .prop(accent.property, accent.to)
        .repeat(accent.repeat);
    if accent.yoyo {
        to = to.yoyo();
    }
    let animation = match accent.from {
        Some(from) => Animation::FromTo {
            from: TweenVars::default().prop(accent.property, from),
            to,
        },
        None => Animation::To(to),
    };
    let key = TweenKey::from(format!("{}:accent{index}", ctx.phase()));
    ctx.animate(&animation, &target, Some(key)).map(drop)
}

/// One runner per phase.
pub struct PhaseTable<P: Platform> {
    runners: [PhaseRunner<P>; Phase::COUNT],
}

impl<P: Platform> fmt::Debug for PhaseTable<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PhaseTable").finish_non_exhaustive()
    }
}

impl<P: Platform> Default for PhaseTable<P> {
    fn default() -> Self {
        Self::from_recipes()
    }
}

impl<P: Platform> PhaseTable<P> {
    /// A table running every phase's built-in recipe.
    #[must_use]
    pub fn from_recipes() -> Self {
        Self {
            runners: core::array::from_fn(|i| recipe_runner(Phase::ALL[i].recipe())),
        }
    }

    /// Replaces one phase's runner.
    pub fn install(&mut self, phase: Phase, runner: PhaseRunner<P>) {
        self.runners[phase.index()] = runner;
    }

    /// Runs `phase`'s runner.
    pub(crate) fn run(&mut self, ctx: &mut PhaseContext<'_, P>) -> Result<(), RunnerError> {
        (self.runners[ctx.phase().index()])(ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::headless::{Headless, HeadlessKit};

    fn stage() -> (Stage<Headless>, HeadlessKit) {
        let kit = HeadlessKit::new();
        let mut stage = Stage::new(kit.parts(), PoolConfig::with_budget(50));
        kit.register_effects(&mut stage.effects);
        (stage, kit)
    }

    #[test]
    fn recipe_runner_tags_everything_with_the_phase() {
        let (mut stage, kit) = stage();
        let mut table = PhaseTable::<Headless>::from_recipes();
        let mut ctx = PhaseContext::new(&mut stage, Phase::Neon, HostTime(0));
        table.run(&mut ctx).expect("recipe runner never fails");
        assert_eq!(ctx.failures(), 0);

        assert_eq!(kit.filter.value(), "brightness(1.05) saturate(1.2)");
        assert!(stage.effects.is_enabled(EffectKind::Particles));
        assert!(stage.effects.is_enabled(EffectKind::HolographicScan));
        assert_eq!(stage.tweens.count_owner(&Phase::Neon.into()), 1);
        assert_eq!(stage.timers.count_category(TimerCategory::Phase), 1, "flash expiry");
        assert_eq!(stage.pool.release_transient(), 2, "flash and accent overlay");
    }

    #[test]
    fn failures_are_counted_not_fatal() {
        let (mut stage, kit) = stage();
        kit.effect(EffectKind::Plasma).set_failing(true);
        let mut table = PhaseTable::<Headless>::from_recipes();
        let mut ctx = PhaseContext::new(&mut stage, Phase::Aurora, HostTime(0));
        assert!(table.run(&mut ctx).is_ok());
        assert_eq!(ctx.failures(), 1);
        assert!(stage.effects.is_enabled(EffectKind::Starfield), "rest of recipe ran");
    }

    #[test]
    fn custom_runner_replaces_recipe() {
        let (mut stage, _kit) = stage();
        let mut table = PhaseTable::<Headless>::from_recipes();
        table.install(
            Phase::Calm,
            Box::new(|ctx: &mut PhaseContext<'_, Headless>| {
                Err(RunnerError::Other(format!("no {}", ctx.phase())))
            }),
        );
        let mut ctx = PhaseContext::new(&mut stage, Phase::Calm, HostTime(0));
        assert_eq!(
            table.run(&mut ctx),
            Err(RunnerError::Other("no calm".into()))
        );
    }
}
