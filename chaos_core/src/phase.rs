// Copyright 2026 the Chaos Show Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Phases and their recipes.
//!
//! A [`Phase`] is a named visual theme. What a phase *does* is described by
//! its [`PhaseRecipe`]: a root filter, the effects it needs, a few accent
//! tweens, and an optional flash overlay. Recipes are plain data; the
//! [`stage`](crate::stage) module turns them into side effects.
//!
//! Some recipe filters deliberately ask for more than the safe bounds allow
//! (the `intense` phase wants `brightness(1.3)`); the filter manager clamps
//! them on the way to the page.

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::effect::EffectKind;
use crate::error::{ParsePhaseError, unknown_phase};
use crate::time::Duration;
use crate::tween::Repeat;

/// Every visual theme the show can be in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[expect(missing_docs, reason = "variant names are the documentation")]
pub enum Phase {
    Intense,
    Calm,
    Glitch,
    Techno,
    Matrix,
    Minimal,
    Chaotic,
    Retro,
    Vaporwave,
    Cyberpunk,
    Neon,
    Aurora,
    Sunset,
    Ocean,
    Forest,
    Fire,
    Ice,
    Galaxy,
}

impl Phase {
    /// Number of phases.
    pub const COUNT: usize = 18;

    /// Every phase, in table order.
    pub const ALL: [Self; Self::COUNT] = [
        Self::Intense,
        Self::Calm,
        Self::Glitch,
        Self::Techno,
        Self::Matrix,
        Self::Minimal,
        Self::Chaotic,
        Self::Retro,
        Self::Vaporwave,
        Self::Cyberpunk,
        Self::Neon,
        Self::Aurora,
        Self::Sunset,
        Self::Ocean,
        Self::Forest,
        Self::Fire,
        Self::Ice,
        Self::Galaxy,
    ];

    /// Lowercase name, as accepted by `forcePhase`.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Intense => "intense",
            Self::Calm => "calm",
            Self::Glitch => "glitch",
            Self::Techno => "techno",
            Self::Matrix => "matrix",
            Self::Minimal => "minimal",
            Self::Chaotic => "chaotic",
            Self::Retro => "retro",
            Self::Vaporwave => "vaporwave",
            Self::Cyberpunk => "cyberpunk",
            Self::Neon => "neon",
            Self::Aurora => "aurora",
            Self::Sunset => "sunset",
            Self::Ocean => "ocean",
            Self::Forest => "forest",
            Self::Fire => "fire",
            Self::Ice => "ice",
            Self::Galaxy => "galaxy",
        }
    }

    /// Position in [`Phase::ALL`].
    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// The built-in recipe for this phase.
    #[must_use]
    pub fn recipe(self) -> &'static PhaseRecipe {
        &RECIPES[self.index()]
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Phase {
    type Err = ParsePhaseError;

    /// Case-insensitive; surrounding whitespace is ignored.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        Self::ALL
            .into_iter()
            .find(|phase| phase.name().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| unknown_phase(trimmed))
    }
}

/// What an accent tween animates.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AccentTarget {
    /// The document body.
    Body,
    /// A phase-owned overlay created for the accent.
    Overlay,
}

/// One phase-owned tween.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Accent {
    /// What to animate.
    pub target: AccentTarget,
    /// Animated property.
    pub property: &'static str,
    /// Starting value, for from-to accents.
    pub from: Option<f64>,
    /// Final value.
    pub to: f64,
    /// Duration of one cycle.
    pub duration: Duration,
    /// Repetition.
    pub repeat: Repeat,
    /// Reverse on alternate cycles.
    pub yoyo: bool,
}

impl Accent {
    const fn pulse(property: &'static str, from: f64, to: f64, ms: u64) -> Self {
        Self {
            target: AccentTarget::Overlay,
            property,
            from: Some(from),
            to,
            duration: Duration(ms),
            repeat: Repeat::Infinite,
            yoyo: true,
        }
    }

    const fn drift(property: &'static str, to: f64, ms: u64) -> Self {
        Self {
            target: AccentTarget::Body,
            property,
            from: None,
            to,
            duration: Duration(ms),
            repeat: Repeat::Once,
            yoyo: false,
        }
    }
}

/// A short full-screen overlay shown at phase start.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Flash {
    /// CSS background of the overlay.
    pub background: &'static str,
    /// CSS blend mode.
    pub blend: &'static str,
    /// How long the overlay stays before its timeout releases it.
    pub lifetime: Duration,
}

/// Data describing everything a phase turns on.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PhaseRecipe {
    /// Requested root filter; sanitized before it reaches the page.
    pub filter: &'static str,
    /// Effects the phase needs enabled.
    pub effects: &'static [EffectKind],
    /// Phase-owned tweens.
    pub accents: &'static [Accent],
    /// Optional entrance flash.
    pub flash: Option<Flash>,
}

impl PhaseRecipe {
    /// Returns whether the phase needs `effect`.
    #[must_use]
    pub fn needs(&self, effect: EffectKind) -> bool {
        self.effects.contains(&effect)
    }
}

use EffectKind::{
    DataStream, GlitchBurst, HolographicScan, Particles, Plasma, Starfield, StaticNoise,
};

const fn flash(background: &'static str, blend: &'static str, ms: u64) -> Option<Flash> {
    Some(Flash {
        background,
        blend,
        lifetime: Duration(ms),
    })
}

static RECIPES: [PhaseRecipe; Phase::COUNT] = [
    // Intense
    PhaseRecipe {
        filter: "brightness(1.3) contrast(1.4) saturate(1.6)",
        effects: &[Particles, GlitchBurst, Plasma],
        accents: &[Accent::pulse("opacity", 0.2, 0.6, 400)],
        flash: flash("#fff", "overlay", 180),
    },
    // Calm
    PhaseRecipe {
        filter: "brightness(0.95) saturate(0.9)",
        effects: &[Starfield],
        accents: &[Accent::drift("opacity", 0.85, 6_000)],
        flash: None,
    },
    // Glitch
    PhaseRecipe {
        filter: "contrast(1.3) hue-rotate(90deg)",
        effects: &[GlitchBurst, StaticNoise],
        accents: &[Accent::pulse("x", -6.0, 6.0, 120)],
        flash: flash("#0ff", "difference", 120),
    },
    // Techno
    PhaseRecipe {
        filter: "contrast(1.1) saturate(1.3)",
        effects: &[Particles, HolographicScan],
        accents: &[Accent::pulse("scale", 1.0, 1.04, 500)],
        flash: flash("#f0f", "screen", 150),
    },
    // Matrix
    PhaseRecipe {
        filter: "hue-rotate(100deg) saturate(1.1)",
        effects: &[DataStream],
        accents: &[],
        flash: None,
    },
    // Minimal
    PhaseRecipe {
        filter: "none",
        effects: &[],
        accents: &[Accent::drift("opacity", 1.0, 2_000)],
        flash: None,
    },
    // Chaotic
    PhaseRecipe {
        filter: "brightness(1.2) contrast(1.5) saturate(2) hue-rotate(45deg)",
        effects: &[Particles, GlitchBurst, DataStream, Plasma],
        accents: &[
            Accent::pulse("rotation", -2.0, 2.0, 300),
            Accent::pulse("opacity", 0.1, 0.5, 220),
        ],
        flash: flash("#f00", "exclusion", 200),
    },
    // Retro
    PhaseRecipe {
        filter: "sepia(0.6) contrast(1.1)",
        effects: &[],
        accents: &[Accent::pulse("opacity", 0.3, 0.5, 1_200)],
        flash: None,
    },
    // Vaporwave
    PhaseRecipe {
        filter: "hue-rotate(280deg) saturate(1.4)",
        effects: &[Plasma, Starfield],
        accents: &[Accent::drift("opacity", 0.9, 4_000)],
        flash: flash("#ff71ce", "screen", 250),
    },
    // Cyberpunk
    PhaseRecipe {
        filter: "contrast(1.2) saturate(1.5) hue-rotate(300deg)",
        effects: &[HolographicScan, DataStream, GlitchBurst],
        accents: &[Accent::pulse("opacity", 0.2, 0.7, 350)],
        flash: flash("#0ff", "overlay", 160),
    },
    // Neon
    PhaseRecipe {
        filter: "brightness(1.1) saturate(1.8)",
        effects: &[Particles, HolographicScan],
        accents: &[Accent::pulse("opacity", 0.4, 0.9, 600)],
        flash: flash("#39ff14", "screen", 180),
    },
    // Aurora
    PhaseRecipe {
        filter: "hue-rotate(140deg) saturate(1.2)",
        effects: &[Plasma, Starfield],
        accents: &[Accent::drift("opacity", 0.8, 8_000)],
        flash: None,
    },
    // Sunset
    PhaseRecipe {
        filter: "hue-rotate(-20deg) saturate(1.3) brightness(1.02)",
        effects: &[Plasma],
        accents: &[Accent::drift("opacity", 0.9, 5_000)],
        flash: None,
    },
    // Ocean
    PhaseRecipe {
        filter: "hue-rotate(190deg) saturate(1.1)",
        effects: &[Particles, Plasma],
        accents: &[Accent::pulse("y", -4.0, 4.0, 3_000)],
        flash: None,
    },
    // Forest
    PhaseRecipe {
        filter: "hue-rotate(80deg) saturate(1.05) grayscale(0.2)",
        effects: &[Particles],
        accents: &[Accent::drift("opacity", 0.85, 5_000)],
        flash: None,
    },
    // Fire
    PhaseRecipe {
        filter: "hue-rotate(-30deg) saturate(1.6) contrast(1.2)",
        effects: &[Particles, GlitchBurst],
        accents: &[Accent::pulse("scale", 1.0, 1.03, 250)],
        flash: flash("#ff4500", "screen", 200),
    },
    // Ice
    PhaseRecipe {
        filter: "hue-rotate(200deg) brightness(1.05) saturate(0.8)",
        effects: &[Starfield, HolographicScan],
        accents: &[Accent::drift("opacity", 0.95, 3_000)],
        flash: flash("#e0ffff", "soft-light", 220),
    },
    // Galaxy
    PhaseRecipe {
        filter: "hue-rotate(250deg) saturate(1.25)",
        effects: &[Starfield, Particles, Plasma],
        accents: &[Accent::pulse("rotation", 0.0, 360.0, 60_000)],
        flash: None,
    },
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_parse_case_insensitively() {
        for phase in Phase::ALL {
            assert_eq!(phase.name().parse::<Phase>(), Ok(phase), "{phase}");
        }
        assert_eq!(" Neon ".parse::<Phase>(), Ok(Phase::Neon));
        assert!("disco".parse::<Phase>().is_err(), "unknown names rejected");
    }

    #[test]
    fn table_order_matches_indices() {
        for (i, phase) in Phase::ALL.into_iter().enumerate() {
            assert_eq!(phase.index(), i, "{phase} out of order");
        }
    }

    #[test]
    fn recipes_list_each_effect_once() {
        for phase in Phase::ALL {
            let recipe = phase.recipe();
            let mut sorted = recipe.effects.to_vec();
            sorted.sort();
            sorted.dedup();
            assert_eq!(sorted.len(), recipe.effects.len(), "{phase} repeats an effect");
        }
    }

    #[test]
    fn serde_uses_lowercase_names() {
        let json = serde_json::to_string(&Phase::Vaporwave).expect("serializable");
        assert_eq!(json, "\"vaporwave\"");
        let back: Phase = serde_json::from_str("\"ice\"").expect("valid phase");
        assert_eq!(back, Phase::Ice);
    }
}
