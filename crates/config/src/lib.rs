//! Configuration loading, validation and env substitution.
//!
//! Config files: `onika.toml`, `onika.yaml`, `onika.yml` or `onika.json`,
//! searched in `./` then `~/.config/onika/`.
//!
//! Supports `${ENV_VAR}` and `${ENV_VAR:-default}` substitution in the raw
//! file before parsing.

pub mod env_subst;
pub mod error;
pub mod loader;
pub mod schema;
pub mod validate;

pub use {
    error::{ConfigError, Result},
    loader::{config_dir, data_dir, discover_and_load, find_config_file, load_config},
    schema::{
        AuthScheme, BackendConfig, OnikaConfig, PersonaConfig, RouterConfig, SearchConfig,
        SessionsConfig, StorageConfig, TelegramConfig, VoiceConfig, WireFormat,
    },
    validate::{Diagnostic, Severity, ValidationResult, validate},
};
