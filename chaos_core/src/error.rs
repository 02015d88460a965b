// Copyright 2026 the Chaos Show Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Error types.
//!
//! Only genuinely failed operations are errors here. Superseded transitions,
//! budget overflows, and unsafe filter values are ordinary outcomes
//! ([`TransitionStatus::Superseded`](crate::controller::TransitionStatus),
//! purge counts, [`Sanitized`](crate::filter::Sanitized)) because none of them
//! is ever surfaced to a caller as a failure.

use alloc::string::String;

use thiserror::Error;

use crate::effect::{EffectKind, Toggle};

/// A call into the host platform (DOM, tween engine, effect plugin) failed.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct HostError(pub String);

impl HostError {
    /// Creates a host error from any message.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

impl From<&str> for HostError {
    fn from(message: &str) -> Self {
        Self(message.into())
    }
}

/// A visual-effect plugin could not be toggled.
///
/// Always recoverable: the effect is treated as disabled and the show goes on.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum EffectError {
    /// The plugin's `enable`/`disable` reported a failure.
    #[error("effect `{effect}` failed to {action}: {source}")]
    Failed {
        /// Which effect failed.
        effect: EffectKind,
        /// What was attempted.
        action: Toggle,
        /// The plugin's own error.
        source: HostError,
    },
    /// The effect failed too often and is no longer called.
    #[error("effect `{0}` is quarantined")]
    Quarantined(EffectKind),
    /// No plugin is registered for the effect.
    #[error("no plugin registered for effect `{0}`")]
    Missing(EffectKind),
}

/// A phase runner failed part-way through.
///
/// The controller logs it and still activates the phase.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum RunnerError {
    /// A required effect could not be enabled.
    #[error(transparent)]
    Effect(#[from] EffectError),
    /// The host rejected an element or tween request.
    #[error(transparent)]
    Host(#[from] HostError),
    /// Free-form failure from a custom runner.
    #[error("phase runner failed: {0}")]
    Other(String),
}

/// The show configuration could not be used.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// The configuration text is not valid JSON for [`ShowConfig`](crate::config::ShowConfig).
    #[error("malformed show config: {0}")]
    Malformed(String),
    /// A field holds a value outside its accepted range.
    #[error("invalid value for `{field}`: {reason}")]
    InvalidValue {
        /// The offending field (camelCase, as written in the config).
        field: &'static str,
        /// Why it was rejected.
        reason: &'static str,
    },
}

/// A phase name did not match any [`Phase`](crate::phase::Phase).
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("unknown phase `{0}`")]
pub struct ParsePhaseError(pub String);

/// A control-surface request was refused.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ControlError {
    /// The requested phase name is not recognised.
    #[error(transparent)]
    UnknownPhase(#[from] ParsePhaseError),
    /// The show cannot take requests in its current lifecycle state.
    #[error("show is {0}")]
    Unavailable(&'static str),
}

/// Parsing helper shared by the `FromStr` impls.
pub(crate) fn unknown_phase(name: &str) -> ParsePhaseError {
    ParsePhaseError(name.into())
}

#[cfg(test)]
mod tests {
    use alloc::string::ToString;

    use super::*;

    #[test]
    fn effect_error_message_names_the_effect() {
        let err = EffectError::Failed {
            effect: EffectKind::Plasma,
            action: Toggle::Enable,
            source: HostError::from("webgl context lost"),
        };
        assert_eq!(
            err.to_string(),
            "effect `plasma` failed to enable: webgl context lost"
        );
    }

    #[test]
    fn runner_error_is_transparent_over_host_errors() {
        let err: RunnerError = HostError::from("bad tag").into();
        assert_eq!(err.to_string(), "bad tag");
        assert_eq!(
            unknown_phase("disco").to_string(),
            "unknown phase `disco`"
        );
    }
}
