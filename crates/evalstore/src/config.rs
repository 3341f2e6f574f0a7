//! Configuration and evaluation context
//!
//! Behaviour switches are carried in an explicit [`ResultsConfig`] value handed
//! to containers and the codec, never in process-wide mutable state. One-shot
//! advisories are tracked in a [`WarningsEmitted`] set owned by an
//! [`EvalContext`], so repeated loads within one context warn once while
//! separate contexts stay independent.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Environment variable prefix used by [`ResultsConfig::load`]
pub const ENV_PREFIX: &str = "EVALSTORE";

/// Behaviour switches for results containers and the file codec
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultsConfig {
    /// Reject prediction, build and test times below 1
    #[serde(default)]
    pub strict_zero_timing: bool,

    /// Warn (once per context) when a loaded file has no probability distributions
    #[serde(default = "default_true")]
    pub print_dist_missing_warning: bool,

    /// Log a warning naming the file whenever a load fails
    #[serde(default = "default_true")]
    pub print_on_load_failure: bool,
}

fn default_true() -> bool {
    true
}

impl Default for ResultsConfig {
    fn default() -> Self {
        Self {
            strict_zero_timing: false,
            print_dist_missing_warning: true,
            print_on_load_failure: true,
        }
    }
}

impl ResultsConfig {
    /// Load configuration from `EVALSTORE_*` environment variables, falling back to defaults
    pub fn load() -> Result<Self> {
        let config = config::Config::builder()
            .add_source(config::Environment::with_prefix(ENV_PREFIX))
            .build()?;

        Ok(config.try_deserialize()?)
    }

    pub fn with_strict_zero_timing(mut self, strict: bool) -> Self {
        self.strict_zero_timing = strict;
        self
    }

    pub fn with_dist_missing_warning(mut self, print: bool) -> Self {
        self.print_dist_missing_warning = print;
        self
    }

    pub fn with_print_on_load_failure(mut self, print: bool) -> Self {
        self.print_on_load_failure = print;
        self
    }
}

/// Advisory messages that are emitted at most once per context
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Warning {
    /// A results file carried no probability distributions
    DistributionsMissing,
    /// Build time appeared on both line 2 and line 3 of a results file
    BuildTimeDuplicated,
}

/// Set of advisories already emitted
#[derive(Debug, Clone, Default)]
pub struct WarningsEmitted {
    emitted: HashSet<Warning>,
}

impl WarningsEmitted {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `warning`, returning true only the first time it is seen
    pub fn first_time(&mut self, warning: Warning) -> bool {
        self.emitted.insert(warning)
    }

    pub fn contains(&self, warning: Warning) -> bool {
        self.emitted.contains(&warning)
    }

    pub fn len(&self) -> usize {
        self.emitted.len()
    }

    pub fn is_empty(&self) -> bool {
        self.emitted.is_empty()
    }
}

/// Scoped state threaded through loading and evaluation
#[derive(Debug, Clone, Default)]
pub struct EvalContext {
    pub config: ResultsConfig,
    pub warnings: WarningsEmitted,
}

impl EvalContext {
    pub fn new(config: ResultsConfig) -> Self {
        Self {
            config,
            warnings: WarningsEmitted::new(),
        }
    }
}
