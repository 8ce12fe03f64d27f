//! Per-country configuration: ISO2 codes, naming templates and indicator
//! definitions.
//!
//! The YAML layout looks like:
//!
//! ```yaml
//! countries:
//!   colombia:
//!     iso2_code: CO
//!     naming_template: "{temporal}_{country}_{variable}_{date}"
//!     indicators:
//!       - short_name: CDD
//!         name: Consecutive Dry Days
//!         data_kind: precipitation
//!         unit: days
//!         country_config:
//!           spatial_climate: true
//! ```
//!
//! `${VAR}` and `${VAR:-default}` are expanded from the environment before
//! parsing.

use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result as AnyResult};
use async_trait::async_trait;
use climate_common::IndicatorDefinition;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{IndicatorError, Result};

/// A country known to the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountryEntry {
    pub name: String,
    pub iso2_code: String,
}

/// Source of per-country configuration.
#[async_trait]
pub trait ConfigStore: Send + Sync {
    /// Look up a country by name (case-insensitive).
    async fn country(&self, name: &str) -> Result<CountryEntry>;

    /// Output naming template of the country, if one is configured.
    async fn naming_template(&self, country: &str) -> Result<Option<String>>;

    /// Indicator definitions configured for the country.
    async fn indicators(&self, country: &str) -> Result<Vec<IndicatorDefinition>>;
}

#[derive(Debug, Clone, Deserialize)]
struct CountryDocument {
    iso2_code: String,
    #[serde(default)]
    naming_template: Option<String>,
    #[serde(default)]
    indicators: Vec<IndicatorDefinition>,
}

#[derive(Debug, Clone, Deserialize)]
struct ConfigDocument {
    #[serde(default)]
    countries: HashMap<String, CountryDocument>,
}

/// [`ConfigStore`] backed by a YAML document.
#[derive(Debug, Clone)]
pub struct YamlConfigStore {
    /// Keyed by lower-cased country name.
    countries: HashMap<String, (String, CountryDocument)>,
}

impl YamlConfigStore {
    /// Load the store from a YAML file.
    pub fn load<P: AsRef<Path>>(path: P) -> AnyResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read indicator config from {:?}", path))?;
        let store = Self::from_yaml_str(&content)
            .with_context(|| format!("Failed to parse indicator config from {:?}", path))?;
        info!(path = %path.display(), countries = store.countries.len(), "Loaded indicator configuration");
        Ok(store)
    }

    /// Parse the store from YAML text.
    pub fn from_yaml_str(content: &str) -> AnyResult<Self> {
        let expanded = expand_env_vars(content)?;
        let doc: ConfigDocument =
            serde_yaml::from_str(&expanded).context("Failed to parse indicator config YAML")?;

        let mut countries = HashMap::new();
        for (name, mut entry) in doc.countries {
            let iso2 = entry.iso2_code.trim().to_uppercase();
            if iso2.len() != 2 || !iso2.chars().all(|c| c.is_ascii_alphabetic()) {
                anyhow::bail!("Country {} has an invalid ISO2 code '{}'", name, entry.iso2_code);
            }
            entry.iso2_code = iso2;
            debug!(country = %name, indicators = entry.indicators.len(), "Loaded country");
            countries.insert(name.trim().to_lowercase(), (name, entry));
        }
        Ok(Self { countries })
    }

    /// Names of the configured countries, sorted.
    pub fn countries(&self) -> Vec<String> {
        let mut names: Vec<String> = self.countries.values().map(|(n, _)| n.clone()).collect();
        names.sort();
        names
    }

    fn entry(&self, name: &str) -> Result<&(String, CountryDocument)> {
        self.countries
            .get(&name.trim().to_lowercase())
            .ok_or_else(|| IndicatorError::config(format!("country '{}' is not configured", name)))
    }
}

#[async_trait]
impl ConfigStore for YamlConfigStore {
    async fn country(&self, name: &str) -> Result<CountryEntry> {
        let (display, doc) = self.entry(name)?;
        Ok(CountryEntry {
            name: display.clone(),
            iso2_code: doc.iso2_code.clone(),
        })
    }

    async fn naming_template(&self, country: &str) -> Result<Option<String>> {
        Ok(self.entry(country)?.1.naming_template.clone())
    }

    async fn indicators(&self, country: &str) -> Result<Vec<IndicatorDefinition>> {
        Ok(self.entry(country)?.1.indicators.clone())
    }
}

/// Expand `${VAR}` and `${VAR:-default}` references.
fn expand_env_vars(content: &str) -> AnyResult<String> {
    let mut out = String::with_capacity(content.len());
    let mut rest = content;

    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let Some(end) = after.find('}') else {
            anyhow::bail!("Unclosed variable substitution: ${{{}", after);
        };
        out.push_str(&resolve_var(&after[..end])?);
        rest = &after[end + 1..];
    }
    out.push_str(rest);

    Ok(out)
}

fn resolve_var(expr: &str) -> AnyResult<String> {
    match expr.split_once(":-") {
        Some((name, default)) => match std::env::var(name.trim()) {
            Ok(val) if !val.is_empty() => Ok(val),
            _ => Ok(default.to_string()),
        },
        None => std::env::var(expr.trim()).with_context(|| format!("Environment variable {} not set", expr)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use climate_common::DataKind;

    const CONFIG: &str = r#"
countries:
  Colombia:
    iso2_code: co
    naming_template: "{temporal}_{country}_{variable}_{date}"
    indicators:
      - short_name: CDD
        name: Consecutive Dry Days
        data_kind: precipitation
        unit: days
        country_config:
          spatial_climate: true
      - short_name: TX90p
        name: Warm days
        data_kind: temperature
        unit: "%"
  Honduras:
    iso2_code: HN
"#;

    #[tokio::test]
    async fn test_country_lookup() {
        let store = YamlConfigStore::from_yaml_str(CONFIG).unwrap();
        let co = store.country("colombia").await.unwrap();
        assert_eq!(co.name, "Colombia");
        assert_eq!(co.iso2_code, "CO");
        assert_eq!(store.countries(), vec!["Colombia", "Honduras"]);
    }

    #[tokio::test]
    async fn test_indicators_and_template() {
        let store = YamlConfigStore::from_yaml_str(CONFIG).unwrap();
        let indicators = store.indicators("Colombia").await.unwrap();
        assert_eq!(indicators.len(), 2);
        assert_eq!(indicators[0].code, "CDD");
        assert!(indicators[0].is_spatially_enabled());
        assert_eq!(indicators[1].data_kind, DataKind::Temperature);
        assert!(!indicators[1].is_spatially_enabled());

        assert!(store.naming_template("Colombia").await.unwrap().is_some());
        assert!(store.naming_template("Honduras").await.unwrap().is_none());
        assert!(store.indicators("Honduras").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_country_is_config_error() {
        let store = YamlConfigStore::from_yaml_str(CONFIG).unwrap();
        let err = store.country("Atlantis").await.unwrap_err();
        assert!(matches!(err, IndicatorError::Config(_)));
    }

    #[test]
    fn test_invalid_iso2_rejected() {
        let yaml = "countries:\n  Colombia:\n    iso2_code: COL\n";
        assert!(YamlConfigStore::from_yaml_str(yaml).is_err());
    }

    #[test]
    fn test_expand_env_vars() {
        std::env::set_var("INDICATOR_TEST_ISO", "PE");
        let expanded = expand_env_vars("a: ${INDICATOR_TEST_ISO}\nb: ${INDICATOR_TEST_UNSET_VAR:-fallback}").unwrap();
        assert_eq!(expanded, "a: PE\nb: fallback");

        assert!(expand_env_vars("x: ${INDICATOR_TEST_UNSET_VAR}").is_err());
        assert!(expand_env_vars("x: ${OPEN").is_err());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("indicators.yaml");
        std::fs::write(&path, CONFIG).unwrap();
        let store = YamlConfigStore::load(&path).unwrap();
        assert_eq!(store.countries().len(), 2);

        let err = YamlConfigStore::load(dir.path().join("missing.yaml")).unwrap_err();
        assert!(format!("{:#}", err).contains("missing.yaml"));
    }
}
