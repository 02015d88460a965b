// Copyright 2026 the Chaos Show Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Startup configuration.
//!
//! The host page hands the engine a small feature-flag object. Every field is
//! optional; anything not given falls back to the [`PerformanceMode`]
//! preset.
//!
//! ```json
//! { "schedulerPeriodMs": 30000, "performanceMode": "low", "verbose": true }
//! ```

use alloc::string::ToString;
use alloc::vec::Vec;
use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::phase::Phase;
use crate::pool::PoolConfig;
use crate::scheduler::SchedulerConfig;
use crate::time::Duration;
use crate::watchdog::WatchdogConfig;

/// Shortest accepted scheduler period or watchdog interval.
pub const MIN_PERIOD_MS: u64 = 1_000;

/// Coarse resource profile.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PerformanceMode {
    /// Desktop-class machines.
    High,
    /// The default.
    #[default]
    Balanced,
    /// Phones and weak laptops.
    Low,
}

impl PerformanceMode {
    /// The resource budgets for this mode.
    #[must_use]
    pub const fn budgets(self) -> Budgets {
        match self {
            Self::High => Budgets::HIGH,
            Self::Balanced => Budgets::BALANCED,
            Self::Low => Budgets::LOW,
        }
    }

    /// Lowercase name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Balanced => "balanced",
            Self::Low => "low",
        }
    }
}

impl fmt::Display for PerformanceMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for PerformanceMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "high" => Ok(Self::High),
            "balanced" => Ok(Self::Balanced),
            "low" => Ok(Self::Low),
            _ => Err(ConfigError::InvalidValue {
                field: "performanceMode",
                reason: "expected `high`, `balanced`, or `low`",
            }),
        }
    }
}

/// Resource limits derived from a [`PerformanceMode`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Budgets {
    /// Steady-state managed-element budget.
    pub element_budget: usize,
    /// Tracked-tween count the watchdog treats as runaway.
    pub max_tweens: usize,
    /// Document element count the watchdog treats as runaway.
    pub max_dom_nodes: usize,
    /// Default time between scheduled phase changes.
    pub scheduler_period: Duration,
}

impl Budgets {
    /// Desktop preset.
    pub const HIGH: Self = Self {
        element_budget: 300,
        max_tweens: 400,
        max_dom_nodes: 2_500,
        scheduler_period: Duration::from_secs(35),
    };

    /// Default preset.
    pub const BALANCED: Self = Self {
        element_budget: 150,
        max_tweens: 200,
        max_dom_nodes: 1_500,
        scheduler_period: Duration::from_secs(40),
    };

    /// Low-power preset.
    pub const LOW: Self = Self {
        element_budget: 60,
        max_tweens: 80,
        max_dom_nodes: 800,
        scheduler_period: Duration::from_secs(50),
    };
}

/// The recognised startup options.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ShowConfig {
    /// Overrides the mode's scheduler period.
    pub scheduler_period_ms: Option<u64>,
    /// Resource profile.
    pub performance_mode: PerformanceMode,
    /// Debug-level logging.
    pub verbose: bool,
    /// Overrides the watchdog interval.
    pub watchdog_interval_ms: Option<u64>,
    /// Overrides the mode's element budget.
    pub element_budget: Option<usize>,
    /// Seeds phase selection, for reproducible shows.
    pub seed: Option<u64>,
    /// Restricts the scheduler to these phases.
    pub phases: Option<Vec<Phase>>,
}

impl ShowConfig {
    /// Parses and validates a JSON config object.
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_json::from_str(text).map_err(|e| ConfigError::Malformed(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Checks field ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.scheduler_period_ms.is_some_and(|ms| ms < MIN_PERIOD_MS) {
            return Err(ConfigError::InvalidValue {
                field: "schedulerPeriodMs",
                reason: "must be at least 1000",
            });
        }
        if self.watchdog_interval_ms.is_some_and(|ms| ms < MIN_PERIOD_MS) {
            return Err(ConfigError::InvalidValue {
                field: "watchdogIntervalMs",
                reason: "must be at least 1000",
            });
        }
        if self.element_budget == Some(0) {
            return Err(ConfigError::InvalidValue {
                field: "elementBudget",
                reason: "must be positive",
            });
        }
        if self.phases.as_ref().is_some_and(Vec::is_empty) {
            return Err(ConfigError::InvalidValue {
                field: "phases",
                reason: "must name at least one phase",
            });
        }
        Ok(())
    }

    /// The effective budgets: the mode preset with overrides applied.
    #[must_use]
    pub fn budgets(&self) -> Budgets {
        let mut budgets = self.performance_mode.budgets();
        if let Some(budget) = self.element_budget {
            budgets.element_budget = budget;
        }
        if let Some(ms) = self.scheduler_period_ms {
            budgets.scheduler_period = Duration(ms);
        }
        budgets
    }

    /// Pool sizing for the effective budgets.
    #[must_use]
    pub fn pool_config(&self) -> PoolConfig {
        PoolConfig::with_budget(self.budgets().element_budget)
    }

    /// Scheduler settings for the effective budgets.
    #[must_use]
    pub fn scheduler_config(&self) -> SchedulerConfig {
        SchedulerConfig {
            period: self.budgets().scheduler_period,
            ..SchedulerConfig::DEFAULT
        }
    }

    /// Watchdog settings for the effective budgets.
    #[must_use]
    pub fn watchdog_config(&self) -> WatchdogConfig {
        let budgets = self.budgets();
        let mut config = WatchdogConfig::DEFAULT.with_budgets(&budgets);
        if let Some(ms) = self.watchdog_interval_ms {
            config.interval = Duration(ms);
        }
        config
    }

    /// The phases the scheduler picks from.
    #[must_use]
    pub fn scheduled_phases(&self) -> Vec<Phase> {
        match &self.phases {
            Some(phases) => phases.clone(),
            None => Phase::ALL.to_vec(),
        }
    }
}
