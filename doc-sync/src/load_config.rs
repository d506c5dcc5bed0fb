/// `load_config` module: reads the static YAML config file into the core [`SyncConfig`].
///
/// This is the only place where user-supplied YAML is parsed. Secrets never
/// live in the file; the provider API key is read from the environment by
/// [`crate::provider::OpenAiProvider::new_from_env`].
///
/// # Errors
/// All errors use `anyhow::Error` and are surfaced at the CLI boundary.
///
/// For the accepted schema, see `SyncConfig` in `doc-sync-core`.
use anyhow::{Context, Result};
use doc_sync_core::config::SyncConfig;
use std::fs;
use std::path::Path;
use tracing::{error, info};

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<SyncConfig> {
    let path_ref = path.as_ref();
    info!(config_path = ?path_ref, "Loading configuration from file");

    let config_content = match fs::read_to_string(path_ref) {
        Ok(content) => content,
        Err(e) => {
            error!(error = ?e, config_path = ?path_ref, "Failed to read config file");
            return Err(anyhow::anyhow!(
                "Failed to read config file {}: {e}",
                path_ref.display()
            ));
        }
    };

    let config: SyncConfig = serde_yaml::from_str(&config_content)
        .map_err(|e| {
            error!(error = ?e, config_path = ?path_ref, "Failed to parse config YAML");
            e
        })
        .with_context(|| format!("Failed to parse config YAML {}", path_ref.display()))?;

    if config.concurrency == 0 {
        anyhow::bail!("Invalid config {}: concurrency must be at least 1", path_ref.display());
    }

    config.trace_loaded();
    Ok(config)
}
