//! Lookup of calculators by indicator code.

use std::collections::{BTreeMap, BTreeSet};

use climate_common::Temporality;
use tracing::{debug, warn};

use crate::calculator::{CalculatorContext, IndicatorCalculator};
use crate::calculators::{self, IndicatorProfile};

/// Constructor of a calculator.
pub type CalculatorFactory = fn(CalculatorContext) -> IndicatorCalculator;

/// One registered indicator.
///
/// Code and temporalities are read from the profile, the same one the
/// calculator checks when it runs.
#[derive(Debug, Clone)]
pub struct RegistryEntry {
    profile: &'static IndicatorProfile,
    factory: CalculatorFactory,
}

impl RegistryEntry {
    /// Code as registered, e.g. `TX90p`.
    pub fn code(&self) -> &'static str {
        self.profile.code
    }

    pub fn profile(&self) -> &'static IndicatorProfile {
        self.profile
    }

    pub fn build(&self, ctx: CalculatorContext) -> IndicatorCalculator {
        (self.factory)(ctx)
    }

    pub fn supports(&self, temporality: Temporality) -> bool {
        self.profile.temporalities.contains(&temporality)
    }
}

/// Registry of calculators keyed by upper-cased code.
#[derive(Debug, Clone, Default)]
pub struct CalculatorRegistry {
    entries: BTreeMap<String, RegistryEntry>,
}

type Registration = (&'static IndicatorProfile, CalculatorFactory);

/// Built-in indicators, one line each.
static BUILTIN: &[Registration] = &[
    (&calculators::CDD, calculators::cdd),
    (&calculators::SDII, calculators::sdii),
    (&calculators::RX1DAY, calculators::rx1day),
    (&calculators::TR20, calculators::tr20),
    (&calculators::TX90P, calculators::tx90p),
    (&calculators::R95PTOT, calculators::r95ptot),
    (&calculators::TXX, calculators::txx),
];

impl CalculatorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding every built-in indicator.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        for &(profile, factory) in BUILTIN {
            registry.register(profile, factory);
        }
        debug!(count = registry.entries.len(), "Registered built-in calculators");
        registry
    }

    /// Register the calculator built by `factory` under `profile.code`. A
    /// code that is already taken keeps its first registration and `false`
    /// is returned.
    pub fn register(&mut self, profile: &'static IndicatorProfile, factory: CalculatorFactory) -> bool {
        let key = profile.code.trim().to_uppercase();
        if let Some(existing) = self.entries.get(&key) {
            warn!(code = profile.code, existing = existing.code(), "Calculator already registered, keeping the first one");
            return false;
        }
        self.entries.insert(key, RegistryEntry { profile, factory });
        true
    }

    /// Case-insensitive lookup.
    pub fn resolve(&self, code: &str) -> Option<&RegistryEntry> {
        let entry = self.entries.get(&code.trim().to_uppercase());
        if entry.is_none() {
            warn!(code, available = ?self.list_available(), "No calculator registered for indicator");
        }
        entry
    }

    pub fn is_supported(&self, code: &str) -> bool {
        self.entries.contains_key(&code.trim().to_uppercase())
    }

    /// Whether `code` is registered and can produce `temporality`.
    pub fn supports_temporality(&self, code: &str, temporality: Temporality) -> bool {
        self.entries
            .get(&code.trim().to_uppercase())
            .is_some_and(|e| e.supports(temporality))
    }

    /// Registered codes as written in their profiles.
    pub fn list_available(&self) -> BTreeSet<String> {
        self.entries.values().map(|e| e.code().to_string()).collect()
    }
}
