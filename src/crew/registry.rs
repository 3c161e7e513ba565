//! Domain registry: `(domain, tier) -> pipeline definition`.
//!
//! Lookup is strict. An unknown domain label, an unknown tier, or a pair with
//! no registered row yields [`CrewError::UnsupportedCombination`]; nothing is
//! ever substituted.

use std::collections::HashMap;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::catalog;
use super::error::{CrewError, CrewResult};
use super::pipeline::PipelineSpec;

/// Subject area a project belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Domain {
    /// Fiction and world-building.
    History,
    /// Software products and startups.
    DigitalProduct,
    /// Brick-and-mortar ventures.
    PhysicalVenture,
}

impl Domain {
    /// Returns all domains.
    pub fn all() -> [Self; 3] {
        [Self::History, Self::DigitalProduct, Self::PhysicalVenture]
    }

    /// Canonical slug.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::History => "history",
            Self::DigitalProduct => "digital-product",
            Self::PhysicalVenture => "physical-venture",
        }
    }

    /// Human-facing name.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::History => "Stories",
            Self::DigitalProduct => "Digital Projects",
            Self::PhysicalVenture => "Ventures",
        }
    }
}

impl std::fmt::Display for Domain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Domain {
    type Err = String;

    /// Accepts canonical slugs and the legacy category labels.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "history" | "historia" => Ok(Self::History),
            "digital-product" | "projeto" => Ok(Self::DigitalProduct),
            "physical-venture" | "empreendimento" => Ok(Self::PhysicalVenture),
            other => Err(format!("unknown domain '{}'", other)),
        }
    }
}

/// Macro (strategic/world) or Micro (execution/scene) half of a project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Macro,
    Micro,
}

impl Tier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Macro => "macro",
            Self::Micro => "micro",
        }
    }
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Tier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "macro" => Ok(Self::Macro),
            "micro" => Ok(Self::Micro),
            other => Err(format!("unknown tier '{}'", other)),
        }
    }
}

/// Lookup table from `(domain, tier)` to pipeline definition.
#[derive(Debug, Clone)]
pub struct DomainRegistry {
    pipelines: HashMap<(Domain, Tier), &'static PipelineSpec>,
}

impl DomainRegistry {
    /// Creates an empty registry.
    pub fn empty() -> Self {
        Self {
            pipelines: HashMap::new(),
        }
    }

    /// Creates a registry holding every catalog row.
    pub fn with_catalog() -> Self {
        let mut registry = Self::empty();
        for spec in catalog::all() {
            registry.register(spec);
        }
        registry
    }

    /// Adds a row, replacing any existing row for the same pair.
    ///
    /// Rows should be checked with `const _: () = assert!(ROW.is_well_formed());`
    /// where they are declared.
    pub fn register(&mut self, spec: &'static PipelineSpec) -> Option<&'static PipelineSpec> {
        debug_assert!(spec.is_well_formed(), "malformed pipeline '{}'", spec.name);
        self.pipelines.insert((spec.domain, spec.tier), spec)
    }

    /// Typed lookup.
    pub fn get(&self, domain: Domain, tier: Tier) -> CrewResult<&'static PipelineSpec> {
        self.pipelines
            .get(&(domain, tier))
            .copied()
            .ok_or_else(|| CrewError::UnsupportedCombination {
                domain: domain.to_string(),
                tier: tier.to_string(),
            })
    }

    /// Lookup from free-form labels.
    pub fn resolve(&self, domain: &str, tier: &str) -> CrewResult<&'static PipelineSpec> {
        let unsupported = || CrewError::UnsupportedCombination {
            domain: domain.to_string(),
            tier: tier.to_string(),
        };

        let parsed_domain = domain.parse::<Domain>().map_err(|_| unsupported())?;
        let parsed_tier = tier.parse::<Tier>().map_err(|_| unsupported())?;
        self.get(parsed_domain, parsed_tier)
    }

    /// Registered pairs, sorted by domain then tier.
    pub fn pairs(&self) -> Vec<(Domain, Tier)> {
        let mut pairs: Vec<_> = self.pipelines.keys().copied().collect();
        pairs.sort_by_key(|(d, t)| (d.as_str(), t.as_str()));
        pairs
    }

    pub fn len(&self) -> usize {
        self.pipelines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pipelines.is_empty()
    }
}

impl Default for DomainRegistry {
    fn default() -> Self {
        Self::with_catalog()
    }
}
