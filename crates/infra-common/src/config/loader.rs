use crate::errors::types::Result;
use config::{Config, Environment, File, FileFormat};
use serde::de::DeserializeOwned;
use std::path::Path;

/// Load a configuration struct from an optional TOML file and environment
/// variables named `{PREFIX}_{SECTION}__{KEY}`.
///
/// The target type must implement `Deserialize` with `#[serde(default)]` so
/// that missing keys fall back to its `Default` values.
pub fn load_layered<T>(file: Option<&Path>, env_prefix: &str) -> Result<T>
where
    T: DeserializeOwned,
{
    let mut builder = Config::builder();

    if let Some(path) = file {
        tracing::debug!("Loading configuration file {}", path.display());
        builder = builder.add_source(File::from(path).format(FileFormat::Toml).required(true));
    }

    builder = builder.add_source(
        Environment::with_prefix(env_prefix)
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true),
    );

    let settings = builder.build()?;
    Ok(settings.try_deserialize::<T>()?)
}
