// Copyright 2026 the Chaos Show Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Visual-effect plugins and their registry.
//!
//! Plugins are opaque: each owns its own DOM/canvas/WebGL resources and only
//! exposes [`VisualEffect::enable`] and [`VisualEffect::disable`]. The
//! [`EffectRegistry`] remembers which effects are on, so toggling is
//! idempotent even when a plugin is not, and it isolates failures: a plugin
//! that errors is treated as disabled, and one that fails
//! [`QUARANTINE_THRESHOLD`] times in a row is quarantined and never called
//! again until [`clear_quarantine`](EffectRegistry::clear_quarantine).

use alloc::boxed::Box;
use alloc::vec::Vec;
use core::fmt;

use log::{debug, warn};
use serde::Serialize;

use crate::error::{EffectError, HostError};

/// Consecutive failures after which an effect is quarantined.
pub const QUARANTINE_THRESHOLD: u32 = 3;

/// The effect plugins a phase can toggle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum EffectKind {
    /// Floating particle overlay.
    Particles,
    /// Full-screen plasma field.
    Plasma,
    /// Sweeping holographic scan bar.
    HolographicScan,
    /// CRT scanlines.
    Scanlines,
    /// Static-noise canvas.
    StaticNoise,
    /// Scrolling data columns.
    DataStream,
    /// Periodic glitch bursts.
    GlitchBurst,
    /// Parallax starfield.
    Starfield,
}

impl EffectKind {
    /// Every effect, in registry order.
    pub const ALL: [Self; 8] = [
        Self::Particles,
        Self::Plasma,
        Self::HolographicScan,
        Self::Scanlines,
        Self::StaticNoise,
        Self::DataStream,
        Self::GlitchBurst,
        Self::Starfield,
    ];

    /// Stable kebab-case name, as used in events and by the web bridge.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Particles => "particles",
            Self::Plasma => "plasma",
            Self::HolographicScan => "holographic-scan",
            Self::Scanlines => "scanlines",
            Self::StaticNoise => "static-noise",
            Self::DataStream => "data-stream",
            Self::GlitchBurst => "glitch-burst",
            Self::Starfield => "starfield",
        }
    }

    /// Permanent effects stay on across phase transitions and are spared by
    /// critical cleanup.
    #[must_use]
    pub const fn is_permanent(self) -> bool {
        matches!(self, Self::Scanlines | Self::StaticNoise)
    }

    /// Looks an effect up by its [`name`](Self::name).
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.name() == name)
    }

    const fn slot(self) -> usize {
        self as usize
    }
}

impl fmt::Display for EffectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Which way an effect was being switched.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Toggle {
    /// `enable()`.
    Enable,
    /// `disable()`.
    Disable,
}

impl fmt::Display for Toggle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Enable => "enable",
            Self::Disable => "disable",
        })
    }
}

/// A self-contained visual subsystem.
///
/// Implementations may be synchronous and may fail; they need not be
/// idempotent themselves.
pub trait VisualEffect {
    /// Starts the effect.
    fn enable(&mut self) -> Result<(), HostError>;

    /// Stops the effect and releases its resources.
    fn disable(&mut self) -> Result<(), HostError>;
}

impl<E: VisualEffect + ?Sized> VisualEffect for Box<E> {
    fn enable(&mut self) -> Result<(), HostError> {
        (**self).enable()
    }

    fn disable(&mut self) -> Result<(), HostError> {
        (**self).disable()
    }
}

#[derive(Default)]
struct Slot {
    plugin: Option<Box<dyn VisualEffect>>,
    enabled: bool,
    failures: u32,
    quarantined: bool,
}

/// Lookup from [`EffectKind`] to plugin, with toggle state.
pub struct EffectRegistry {
    slots: [Slot; 8],
    newly_quarantined: Vec<EffectKind>,
}

impl fmt::Debug for EffectRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EffectRegistry")
            .field("enabled", &self.enabled().collect::<Vec<_>>())
            .field("quarantined", &self.quarantined().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

impl Default for EffectRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl EffectRegistry {
    /// Creates a registry with no plugins.
    #[must_use]
    pub fn new() -> Self {
        Self {
            slots: core::array::from_fn(|_| Slot::default()),
            newly_quarantined: Vec::new(),
        }
    }

    /// Installs (or replaces) the plugin for `kind`.
    ///
    /// A replaced plugin is dropped without being disabled.
    pub fn register(&mut self, kind: EffectKind, plugin: Box<dyn VisualEffect>) {
        let slot = &mut self.slots[kind.slot()];
        slot.plugin = Some(plugin);
        slot.enabled = false;
    }

    /// Returns whether a plugin is installed for `kind`.
    #[must_use]
    pub fn is_registered(&self, kind: EffectKind) -> bool {
        self.slots[kind.slot()].plugin.is_some()
    }

    /// Enables `kind` if it is not already on.
    pub fn enable(&mut self, kind: EffectKind) -> Result<(), EffectError> {
        self.toggle(kind, Toggle::Enable)
    }

    /// Disables `kind` if it is on.
    pub fn disable(&mut self, kind: EffectKind) -> Result<(), EffectError> {
        self.toggle(kind, Toggle::Disable)
    }

    /// Returns whether `kind` is currently on.
    #[must_use]
    pub fn is_enabled(&self, kind: EffectKind) -> bool {
        self.slots[kind.slot()].enabled
    }

    /// Returns whether `kind` is quarantined.
    #[must_use]
    pub fn is_quarantined(&self, kind: EffectKind) -> bool {
        self.slots[kind.slot()].quarantined
    }

    /// Iterates over enabled effects.
    pub fn enabled(&self) -> impl Iterator<Item = EffectKind> + '_ {
        EffectKind::ALL.into_iter().filter(|&k| self.is_enabled(k))
    }

    /// Iterates over quarantined effects.
    pub fn quarantined(&self) -> impl Iterator<Item = EffectKind> + '_ {
        EffectKind::ALL.into_iter().filter(|&k| self.is_quarantined(k))
    }

    /// Disables every enabled non-permanent effect not in `keep`.
    ///
    /// Failures are logged and the effect is considered off. Returns the
    /// number of effects switched off.
    pub fn disable_all_transient(&mut self, keep: &[EffectKind]) -> usize {
        let doomed: Vec<_> = self
            .enabled()
            .filter(|k| !k.is_permanent() && !keep.contains(k))
            .collect();
        for &kind in &doomed {
            if let Err(err) = self.disable(kind) {
                warn!("{err}");
            }
        }
        doomed.len()
    }

    /// Disables every enabled effect, permanent ones included.
    pub fn disable_all(&mut self) -> usize {
        let doomed: Vec<_> = self.enabled().collect();
        for &kind in &doomed {
            if let Err(err) = self.disable(kind) {
                warn!("{err}");
            }
        }
        doomed.len()
    }

    /// Lifts every quarantine and resets failure counts.
    pub fn clear_quarantine(&mut self) {
        for slot in &mut self.slots {
            slot.quarantined = false;
            slot.failures = 0;
        }
        self.newly_quarantined.clear();
    }

    /// Drains effects quarantined since the last call.
    pub fn take_quarantined(&mut self) -> Vec<EffectKind> {
        core::mem::take(&mut self.newly_quarantined)
    }

    fn toggle(&mut self, kind: EffectKind, action: Toggle) -> Result<(), EffectError> {
        let slot = &mut self.slots[kind.slot()];
        let want = action == Toggle::Enable;
        if slot.enabled == want {
            return Ok(());
        }
        if want && slot.quarantined {
            return Err(EffectError::Quarantined(kind));
        }
        let Some(plugin) = slot.plugin.as_mut() else {
            return Err(EffectError::Missing(kind));
        };

        let result = match action {
            Toggle::Enable => plugin.enable(),
            Toggle::Disable => plugin.disable(),
        };
        match result {
            Ok(()) => {
                slot.enabled = want;
                slot.failures = 0;
                debug!("effect {kind} {action}d");
                Ok(())
            }
            Err(source) => {
                // A failed toggle leaves the effect off either way.
                slot.enabled = false;
                slot.failures += 1;
                if slot.failures >= QUARANTINE_THRESHOLD && !slot.quarantined {
                    slot.quarantined = true;
                    warn!("effect {kind} quarantined after {} failures", slot.failures);
                    self.newly_quarantined.push(kind);
                }
                Err(EffectError::Failed {
                    effect: kind,
                    action,
                    source,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::headless::HeadlessEffect;

    fn registry_with(kind: EffectKind) -> (EffectRegistry, HeadlessEffect) {
        let plugin = HeadlessEffect::new();
        let mut registry = EffectRegistry::new();
        registry.register(kind, Box::new(plugin.clone()));
        (registry, plugin)
    }

    #[test]
    fn toggles_are_idempotent() {
        let (mut registry, plugin) = registry_with(EffectKind::Plasma);
        registry.enable(EffectKind::Plasma).expect("plugin healthy");
        registry.enable(EffectKind::Plasma).expect("plugin healthy");
        assert_eq!(plugin.enable_calls(), 1, "second enable is a no-op");
        registry.disable(EffectKind::Plasma).expect("plugin healthy");
        registry.disable(EffectKind::Plasma).expect("plugin healthy");
        assert_eq!(plugin.disable_calls(), 1, "second disable is a no-op");
    }

    #[test]
    fn failure_leaves_effect_off() {
        let (mut registry, plugin) = registry_with(EffectKind::Particles);
        plugin.set_failing(true);
        let err = registry
            .enable(EffectKind::Particles)
            .expect_err("plugin fails");
        assert!(matches!(err, EffectError::Failed { action: Toggle::Enable, .. }));
        assert!(!registry.is_enabled(EffectKind::Particles));
    }

    #[test]
    fn repeated_failures_quarantine() {
        let (mut registry, plugin) = registry_with(EffectKind::Starfield);
        plugin.set_failing(true);
        for _ in 0..QUARANTINE_THRESHOLD {
            assert!(registry.enable(EffectKind::Starfield).is_err());
        }
        assert!(registry.is_quarantined(EffectKind::Starfield));
        assert_eq!(registry.take_quarantined(), [EffectKind::Starfield]);
        assert!(registry.take_quarantined().is_empty(), "drained once");

        plugin.set_failing(false);
        let calls = plugin.enable_calls();
        assert_eq!(
            registry.enable(EffectKind::Starfield),
            Err(EffectError::Quarantined(EffectKind::Starfield))
        );
        assert_eq!(plugin.enable_calls(), calls, "quarantined plugin not called");

        registry.clear_quarantine();
        registry.enable(EffectKind::Starfield).expect("healthy again");
    }

    #[test]
    fn missing_plugin_is_reported() {
        let mut registry = EffectRegistry::new();
        assert_eq!(
            registry.enable(EffectKind::DataStream),
            Err(EffectError::Missing(EffectKind::DataStream))
        );
    }

    #[test]
    fn transient_disable_spares_permanent_and_kept() {
        let mut registry = EffectRegistry::new();
        for kind in EffectKind::ALL {
            registry.register(kind, Box::new(HeadlessEffect::new()));
            registry.enable(kind).expect("plugin healthy");
        }
        let off = registry.disable_all_transient(&[EffectKind::Plasma]);
        assert_eq!(off, 5, "eight minus two permanent minus one kept");
        let on: Vec<_> = registry.enabled().collect();
        assert_eq!(
            on,
            [EffectKind::Plasma, EffectKind::Scanlines, EffectKind::StaticNoise]
        );
    }

    #[test]
    fn names_round_trip() {
        for kind in EffectKind::ALL {
            assert_eq!(EffectKind::from_name(kind.name()), Some(kind));
        }
        assert_eq!(EffectKind::from_name("lasers"), None);
    }
}
