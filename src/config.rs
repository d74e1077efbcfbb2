//! Ambient configuration layer.
//!
//! Mirrors the corpus's `ConfigSettings` pattern: defaults live in `Default`
//! impls, an optional TOML file named by a `<SERVICE_NAME>__CONFIG`
//! environment variable overlays them, and environment variables with a
//! `__`-separated prefix take precedence over both.

use std::{path::PathBuf, time::Duration};

use serde::{Deserialize, Serialize};

use crate::equivalence::EquivalenceConfig;

const CONFIG_ENV_VAR: &str = "CONTRACT_VERIFIER__CONFIG";
const ENV_PREFIX: &str = "CONTRACT_VERIFIER";

/// Top-level settings for the verification core. `#[serde(deny_unknown_fields)]`
/// so a typo in a config file fails loudly instead of being silently ignored.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub compiler: CompilerSettings,
    pub equivalence: EquivalenceConfig,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            compiler: CompilerSettings::default(),
            equivalence: EquivalenceConfig::default(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CompilerSettings {
    /// Directory the Version Store uses to cache downloaded binaries.
    pub bin_dir: PathBuf,
    /// Base URL of the compiler binary mirror.
    pub mirror_base_url: String,
    /// Whether the driver may download a missing compiler binary, or must
    /// fail with `CompilerNotFound` instead.
    pub auto_download: bool,
    /// Per-call deadline, covering both the subprocess wait and (if
    /// triggered) the binary download.
    #[serde(with = "humantime_duration")]
    pub compile_deadline: Duration,
}

impl Default for CompilerSettings {
    fn default() -> Self {
        Self {
            bin_dir: PathBuf::from("compilers"),
            mirror_base_url: "https://binaries.soliditylang.org/".to_string(),
            auto_download: true,
            compile_deadline: Duration::from_secs(120),
        }
    }
}

mod humantime_duration {
    use serde::{de::Error as _, Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let secs = u64::deserialize(d).map_err(D::Error::custom)?;
        Ok(Duration::from_secs(secs))
    }
}

impl Settings {
    /// Builds settings from defaults, optionally overlaid by a TOML file
    /// named by `CONTRACT_VERIFIER__CONFIG`, then by `CONTRACT_VERIFIER__`-
    /// prefixed environment variables.
    pub fn build() -> anyhow::Result<Self> {
        let config_path = std::env::var(CONFIG_ENV_VAR);

        let mut builder = config::Config::builder();
        if let Ok(config_path) = &config_path {
            builder = builder.add_source(config::File::with_name(config_path));
        }
        // `__` so keys with underscores in their names (e.g. `bin_dir`)
        // stay addressable from the environment.
        builder =
            builder.add_source(config::Environment::with_prefix(ENV_PREFIX).separator("__"));

        Ok(builder.build()?.try_deserialize()?)
    }
}
