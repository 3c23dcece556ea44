use serde::{Deserialize, Serialize};

use crate::{rand::DEFAULT_BATCH_SIZE, weight::Probability};

/// Construction time settings shared by every weight representation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplerConfig {
    /// Seed for the sampler's random source, entropy seeded when unset.
    pub seed: Option<u64>,
    /// Number of random draws generated per refill.
    pub batch_size: usize,
    /// Used by probability mode only, but every builder rejects a value outside `[0, 0.5]`.
    pub resolution: f32,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            seed: None,
            batch_size: DEFAULT_BATCH_SIZE,
            resolution: Probability::DEFAULT_RESOLUTION,
        }
    }
}

#[cfg(feature = "config")]
pub use loader::*;

#[cfg(feature = "config")]
mod loader {
    use color_eyre::eyre::{eyre, Result};
    use config::{Config, Environment, File};
    use serde::Deserialize;
    use tracing::info;

    use super::SamplerConfig;

    pub const ENV_PREFIX: &str = "SAMPLER";

    pub fn file_config<T: for<'a> Deserialize<'a>>(path: &str) -> Result<T> {
        let settings = Config::builder()
            .add_source(File::with_name(path))
            .build()
            .map_err(|e| eyre!("load file config failed: {}", e))?;

        settings
            .try_deserialize::<T>()
            .map_err(|e| eyre!("deserialize config failed: {}", e))
    }

    /// Sampler settings from an optional file, overridden by `SAMPLER_*`
    /// environment variables.
    pub fn load_sampler_config(path: Option<&str>) -> Result<SamplerConfig> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            info!("loading sampler config from {}", path);
            builder = builder.add_source(File::with_name(path));
        }
        builder
            .add_source(Environment::with_prefix(ENV_PREFIX).try_parsing(true))
            .build()
            .map_err(|e| eyre!("load sampler config failed: {}", e))?
            .try_deserialize::<SamplerConfig>()
            .map_err(|e| eyre!("deserialize sampler config failed: {}", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = SamplerConfig::default();
        assert_eq!(config.seed, None);
        assert_eq!(config.batch_size, DEFAULT_BATCH_SIZE);
        assert_eq!(config.resolution, 0.01);
    }

    #[cfg(feature = "config")]
    #[test]
    fn partial_file_keeps_defaults() {
        use std::io::Write;

        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "seed = 9\nresolution = 0.05").unwrap();
        let path = file.path().to_str().unwrap();

        let config: SamplerConfig = file_config(path).unwrap();
        assert_eq!(config.seed, Some(9));
        assert_eq!(config.resolution, 0.05);
        assert_eq!(config.batch_size, DEFAULT_BATCH_SIZE);

        let config = load_sampler_config(Some(path)).unwrap();
        assert_eq!(config.seed, Some(9));
    }

    #[cfg(feature = "config")]
    #[test]
    fn missing_file_is_an_error() {
        assert!(file_config::<SamplerConfig>("/nonexistent/sampler.toml").is_err());
    }
}
