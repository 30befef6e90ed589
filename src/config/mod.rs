//! Configuration module for Cityment
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use cityment::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("cityment.toml")).unwrap();
//! println!("Crawler will request pages of {} items", config.api.page_size);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{ApiConfig, Config, CrawlConfig, OutputConfig, UserAgentConfig};

// Re-export parser functions
pub use parser::{config_hash, load_config, load_config_with_hash, parse_config};
