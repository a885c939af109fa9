//! Inspect the enabled repository adapters.

use std::sync::Arc;

use console::style;
use tabled::Tabled;

use steward::SourceRegistry;
use steward::registry::RegistryError;
use steward::sync::ProgressCallback;

use crate::config::Config;

use super::output::{OutputFormat, print_rows};

/// Build the configured adapters.
#[cfg(any(feature = "github", feature = "gitlab", feature = "yml"))]
pub(crate) fn build_registry(
    config: &Config,
    on_progress: Option<Arc<ProgressCallback>>,
) -> Result<SourceRegistry, RegistryError> {
    SourceRegistry::from_config(&config.registry_config(), on_progress)
}

#[cfg(not(any(feature = "github", feature = "gitlab", feature = "yml")))]
pub(crate) fn build_registry(
    _config: &Config,
    _on_progress: Option<Arc<ProgressCallback>>,
) -> Result<SourceRegistry, RegistryError> {
    Ok(SourceRegistry::default())
}

#[derive(Debug, Clone, serde::Serialize, Tabled)]
struct SourceDisplay {
    #[tabled(rename = "Order")]
    order: usize,
    #[tabled(rename = "Source")]
    source: String,
    #[tabled(rename = "Accepted URLs")]
    help: String,
}

/// List enabled adapters in resolution order.
pub(crate) fn handle_sources(
    output: OutputFormat,
    config: &Config,
) -> Result<(), Box<dyn std::error::Error>> {
    let registry = build_registry(config, None)?;

    if registry.is_empty() {
        println!(
            "{} {}",
            style("⚠").yellow(),
            RegistryError::NoSourcesEnabled
        );
        return Ok(());
    }

    let rows: Vec<SourceDisplay> = registry
        .sources()
        .iter()
        .enumerate()
        .map(|(i, source)| SourceDisplay {
            order: i + 1,
            source: source.id().to_string(),
            help: source.help_text(),
        })
        .collect();

    print_rows(&rows, output)?;
    if matches!(output, OutputFormat::Table) {
        println!("Accepted: {}", registry.help_text());
    }

    Ok(())
}
