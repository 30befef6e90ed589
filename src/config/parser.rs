use crate::config::types::Config;
use crate::config::validation::validate;
use crate::ConfigError;
use sha2::{Digest, Sha256};
use std::path::Path;

/// Parses and validates configuration text
///
/// Keys are kebab-case (`page-size`, `max-requests`, ...). The `[crawl]`
/// section may be omitted, in which case the crawl starts at the default epoch
/// with the adaptive strategy and no request cap.
pub fn parse_config(content: &str) -> Result<Config, ConfigError> {
    let config: Config = toml::from_str(content)?;
    validate(&config)?;
    Ok(config)
}

/// Loads the crawler configuration from a TOML file
///
/// # Example
///
/// ```no_run
/// use std::path::Path;
/// use cityment::config::load_config;
///
/// let config = load_config(Path::new("cityment.toml")).unwrap();
/// println!("Requesting {} with pages of {}", config.api.endpoint, config.api.page_size);
/// ```
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    parse_config(&std::fs::read_to_string(path)?)
}

/// Hex SHA-256 of configuration text, stored with every run
pub fn config_hash(content: &str) -> String {
    hex::encode(Sha256::digest(content.as_bytes()))
}

/// Loads a configuration together with the hash of the exact text parsed
///
/// The file is read once, so the hash recorded with a run always matches the
/// settings that run used.
///
/// # Returns
///
/// * `Ok((Config, String))` - The validated configuration and its hash
/// * `Err(ConfigError)` - The file could not be read, parsed or validated
pub fn load_config_with_hash(path: &Path) -> Result<(Config, String), ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let config = parse_config(&content)?;
    Ok((config, config_hash(&content)))
}
