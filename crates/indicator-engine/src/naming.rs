//! Output file naming.

use climate_common::Temporality;
use tracing::warn;

/// Extension of every output raster.
pub const RASTER_EXTENSION: &str = "zarr";

const PLACEHOLDERS: [&str; 4] = ["{temporal}", "{country}", "{variable}", "{date}"];

/// Renders output names from a per-country template.
///
/// Recognised placeholders are `{temporal}`, `{country}`, `{variable}` and
/// `{date}`. Without a usable template the name falls back to
/// `{temporality}_{country}_{indicator}_{year}.zarr` in lower case.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NamingConvention {
    template: Option<String>,
}

impl NamingConvention {
    pub fn new(template: Option<String>) -> Self {
        let template = template.filter(|t| !t.trim().is_empty());
        if let Some(t) = &template {
            if let Some(unknown) = unknown_placeholder(t) {
                warn!(template = %t, placeholder = %unknown, "Naming template has an unknown placeholder, using default names");
                return Self { template: None };
            }
        }
        Self { template }
    }

    pub fn template(&self) -> Option<&str> {
        self.template.as_deref()
    }

    /// Name of the raster for one indicator and year.
    pub fn render(&self, temporality: Temporality, country: &str, indicator: &str, year: i32) -> String {
        let name = match &self.template {
            Some(t) => t
                .replace("{temporal}", temporality.as_str())
                .replace("{country}", &country.to_lowercase())
                .replace("{variable}", &indicator.to_lowercase())
                .replace("{date}", &year.to_string()),
            None => format!(
                "{}_{}_{}_{}",
                temporality.as_str(),
                country,
                indicator,
                year
            )
            .to_lowercase(),
        };
        with_raster_extension(&name.replace(['/', '\\'], "_"))
    }
}

fn unknown_placeholder(template: &str) -> Option<String> {
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        let tail = &rest[open..];
        let Some(close) = tail.find('}') else {
            return Some(tail.to_string());
        };
        let placeholder = &tail[..=close];
        if !PLACEHOLDERS.contains(&placeholder) {
            return Some(placeholder.to_string());
        }
        rest = &tail[close + 1..];
    }
    None
}

/// Replace a raster-like extension with `.zarr`, or append it.
fn with_raster_extension(name: &str) -> String {
    let stem = [".tif", ".tiff", ".nc", ".zarr"]
        .iter()
        .find_map(|ext| {
            name.len()
                .checked_sub(ext.len())
                .filter(|&i| name[i..].eq_ignore_ascii_case(ext))
                .map(|i| &name[..i])
        })
        .unwrap_or(name);
    format!("{}.{}", stem, RASTER_EXTENSION)
}
