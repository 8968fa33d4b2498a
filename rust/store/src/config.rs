// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Parse configuration, with defaults overridable from environment variables.

use std::fmt;
use std::str::FromStr;

use ifc_graph_core::ScanMode;
use serde::{Deserialize, Serialize};

/// How property and quantity sets are materialized
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PropertyMode {
    /// Extract every set during the parse
    #[default]
    Eager,
    /// Keep owner → definition ids and extract on first query
    OnDemand,
}

impl FromStr for PropertyMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "eager" => Ok(PropertyMode::Eager),
            "on_demand" | "on-demand" | "ondemand" | "lazy" => Ok(PropertyMode::OnDemand),
            other => Err(format!("unknown property mode '{}'", other)),
        }
    }
}

impl fmt::Display for PropertyMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PropertyMode::Eager => "eager",
            PropertyMode::OnDemand => "on_demand",
        })
    }
}

/// Parse configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Record boundary strategy.
    pub scan_mode: ScanMode,
    /// Property/quantity extraction strategy.
    pub property_mode: PropertyMode,
    /// Records between progress reports (0 disables intermediate reports).
    pub progress_interval: usize,
    /// Skip records whose type is outside the known schema types.
    pub strict_types: bool,
    /// Cache materialized sets per owner in on-demand mode.
    pub cache_on_demand: bool,
    /// Extract attributes on the rayon pool during conversion.
    pub parallel: bool,
    /// Size of the rayon pool the CLI installs.
    pub worker_threads: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            scan_mode: ScanMode::Strict,
            property_mode: PropertyMode::Eager,
            progress_interval: 10_000,
            strict_types: false,
            cache_on_demand: true,
            parallel: true,
            worker_threads: num_cpus::get(),
        }
    }
}

impl StoreConfig {
    /// Load configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            scan_mode: env_parse("IFC_SCAN_MODE", defaults.scan_mode, parse_scan_mode),
            property_mode: env_parse("IFC_PROPERTY_MODE", defaults.property_mode, str::parse),
            progress_interval: env_parse(
                "IFC_PROGRESS_INTERVAL",
                defaults.progress_interval,
                str::parse,
            ),
            strict_types: env_parse("IFC_STRICT_TYPES", defaults.strict_types, parse_flag),
            cache_on_demand: env_parse("IFC_CACHE_ON_DEMAND", defaults.cache_on_demand, parse_flag),
            parallel: env_parse("IFC_PARALLEL", defaults.parallel, parse_flag),
            worker_threads: env_parse("WORKER_THREADS", defaults.worker_threads, str::parse),
        }
    }

    pub fn with_scan_mode(mut self, mode: ScanMode) -> Self {
        self.scan_mode = mode;
        self
    }

    pub fn with_property_mode(mut self, mode: PropertyMode) -> Self {
        self.property_mode = mode;
        self
    }

    pub fn with_progress_interval(mut self, interval: usize) -> Self {
        self.progress_interval = interval;
        self
    }

    pub fn with_strict_types(mut self, strict: bool) -> Self {
        self.strict_types = strict;
        self
    }

    pub fn with_on_demand_cache(mut self, cache: bool) -> Self {
        self.cache_on_demand = cache;
        self
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }
}

fn env_parse<T, E: fmt::Display>(key: &str, default: T, parse: impl Fn(&str) -> Result<T, E>) -> T {
    match std::env::var(key) {
        Ok(raw) => parse(&raw).unwrap_or_else(|e| {
            tracing::warn!(key, value = %raw, error = %e, "Ignoring invalid configuration value");
            default
        }),
        Err(_) => default,
    }
}

fn parse_scan_mode(s: &str) -> Result<ScanMode, String> {
    match s.trim().to_ascii_lowercase().as_str() {
        "strict" => Ok(ScanMode::Strict),
        "fast" => Ok(ScanMode::Fast),
        other => Err(format!("unknown scan mode '{}'", other)),
    }
}

fn parse_flag(s: &str) -> Result<bool, String> {
    match s.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(format!("expected a boolean, got '{}'", other)),
    }
}
