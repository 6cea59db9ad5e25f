//! Configuration parsing and validation.
//!
//! Cartridge Shop is configured via a TOML file (default: `config/shop.toml`).
//! The configuration is read once at startup and passed by reference to every
//! component; nothing below `main` reads process state such as environment
//! variables on its own, except the notifier's API key, which is resolved
//! once when the notifier is built.
//!
//! # Sections
//!
//! | Section | Required | Purpose |
//! |---------|----------|---------|
//! | `[db]` | yes | SQLite database path |
//! | `[catalog]` | yes | Price-list document and normalizer options |
//! | `[server]` | yes | HTTP bind address and optional static directory |
//! | `[notify]` | no | Order and price-query notifications |
//!
//! # Example
//!
//! ```toml
//! [db]
//! path = "./data/shop.sqlite"
//!
//! [catalog]
//! source = "./catalog/cartridges.docx"
//!
//! [server]
//! bind = "127.0.0.1:3000"
//!
//! [notify]
//! provider = "log"
//! admin_email = "orders@example.com"
//! from = "shop@example.com"
//! ```

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use cartridge_shop_core::models::DEFAULT_IMAGE;
use cartridge_shop_core::normalize::DEFAULT_NOISE_WORDS;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub db: DbConfig,
    pub catalog: CatalogConfig,
    pub server: ServerConfig,
    #[serde(default)]
    pub notify: NotifyConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
}

/// Price-list import settings.
#[derive(Debug, Deserialize, Clone)]
pub struct CatalogConfig {
    /// Document imported by `shop import` and `POST /api/import`.
    pub source: PathBuf,
    /// Placeholder image stamped on every imported product.
    #[serde(default = "default_image")]
    pub default_image: String,
    /// First words that mark a line as a table header. Empty disables the filter.
    #[serde(default = "default_noise_words")]
    pub noise_words: Vec<String>,
}

fn default_image() -> String {
    DEFAULT_IMAGE.to_string()
}

fn default_noise_words() -> Vec<String> {
    DEFAULT_NOISE_WORDS.iter().map(|w| w.to_string()).collect()
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub bind: String,
    /// Directory of storefront assets served at `/`.
    #[serde(default)]
    pub static_dir: Option<PathBuf>,
}

/// Notification settings.
#[derive(Debug, Deserialize, Clone)]
pub struct NotifyConfig {
    /// `disabled`, `log`, or `http`.
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default)]
    pub admin_email: Option<String>,
    #[serde(default)]
    pub from: Option<String>,
    /// Mail relay endpoint for the `http` provider.
    #[serde(default)]
    pub endpoint: Option<String>,
    /// Name of the environment variable holding the relay API key.
    #[serde(default)]
    pub api_key_env: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Fail the order when the admin notification fails.
    #[serde(default)]
    pub required: bool,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            admin_email: None,
            from: None,
            endpoint: None,
            api_key_env: None,
            timeout_secs: default_timeout_secs(),
            required: false,
        }
    }
}

fn default_provider() -> String {
    "disabled".to_string()
}

fn default_timeout_secs() -> u64 {
    10
}

impl NotifyConfig {
    pub fn is_enabled(&self) -> bool {
        self.provider != "disabled"
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    parse_config(&content)
}

/// Parses and validates configuration text.
pub fn parse_config(content: &str) -> Result<Config> {
    let config: Config = toml::from_str(content).with_context(|| "Failed to parse config file")?;

    if config.catalog.default_image.trim().is_empty() {
        bail!("catalog.default_image must not be empty");
    }

    if config.server.bind.trim().is_empty() {
        bail!("server.bind must not be empty");
    }

    let notify = &config.notify;
    match notify.provider.as_str() {
        "disabled" | "log" => {}
        "http" => {
            if notify.endpoint.as_deref().unwrap_or("").is_empty() {
                bail!("notify.endpoint must be set when provider is 'http'");
            }
            if notify.api_key_env.as_deref().unwrap_or("").is_empty() {
                bail!("notify.api_key_env must be set when provider is 'http'");
            }
        }
        other => bail!(
            "Unknown notify provider: '{}'. Must be disabled, log, or http.",
            other
        ),
    }

    if notify.is_enabled() {
        for (key, value) in [("admin_email", &notify.admin_email), ("from", &notify.from)] {
            match value {
                Some(v) if v.contains('@') => {}
                _ => bail!(
                    "notify.{} must be an email address when provider is '{}'",
                    key,
                    notify.provider
                ),
            }
        }
    }

    if notify.required && !notify.is_enabled() {
        bail!("notify.required cannot be set while notifications are disabled");
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = r#"
[db]
path = "./data/shop.sqlite"

[catalog]
source = "./catalog/cartridges.docx"

[server]
bind = "127.0.0.1:3000"
"#;

    #[test]
    fn minimal_config_uses_defaults() {
        let cfg = parse_config(BASE).unwrap();
        assert_eq!(cfg.catalog.default_image, "default.jpg");
        assert_eq!(
            cfg.catalog.noise_words,
            vec!["Model", "Code", "Price", "Cartridge", "List"]
        );
        assert_eq!(cfg.notify.provider, "disabled");
        assert!(!cfg.notify.is_enabled());
        assert!(cfg.server.static_dir.is_none());
    }

    #[test]
    fn empty_noise_list_is_kept() {
        let cfg = parse_config(&BASE.replace(
            "source = \"./catalog/cartridges.docx\"",
            "source = \"./catalog/cartridges.docx\"\nnoise_words = []",
        ))
        .unwrap();
        assert!(cfg.catalog.noise_words.is_empty());
    }

    #[test]
    fn log_provider_requires_addresses() {
        let toml = format!("{}\n[notify]\nprovider = \"log\"\n", BASE);
        let err = parse_config(&toml).unwrap_err();
        assert!(err.to_string().contains("admin_email"));

        let toml = format!(
            "{}\n[notify]\nprovider = \"log\"\nadmin_email = \"a@b.com\"\nfrom = \"shop@b.com\"\n",
            BASE
        );
        assert!(parse_config(&toml).is_ok());
    }

    #[test]
    fn http_provider_requires_endpoint_and_key_env() {
        let toml = format!(
            "{}\n[notify]\nprovider = \"http\"\nadmin_email = \"a@b.com\"\nfrom = \"s@b.com\"\n",
            BASE
        );
        let err = parse_config(&toml).unwrap_err();
        assert!(err.to_string().contains("endpoint"));

        let toml = format!(
            "{}\n[notify]\nprovider = \"http\"\nadmin_email = \"a@b.com\"\nfrom = \"s@b.com\"\nendpoint = \"http://localhost:9/send\"\n",
            BASE
        );
        let err = parse_config(&toml).unwrap_err();
        assert!(err.to_string().contains("api_key_env"));
    }

    #[test]
    fn unknown_provider_is_rejected() {
        let toml = format!("{}\n[notify]\nprovider = \"smtp\"\n", BASE);
        let err = parse_config(&toml).unwrap_err();
        assert!(err.to_string().contains("Unknown notify provider"));
    }

    #[test]
    fn required_needs_a_provider() {
        let toml = format!("{}\n[notify]\nrequired = true\n", BASE);
        assert!(parse_config(&toml).is_err());
    }

    #[test]
    fn missing_catalog_section_fails() {
        let toml = "[db]\npath = \"x\"\n[server]\nbind = \"127.0.0.1:1\"\n";
        assert!(parse_config(toml).is_err());
    }
}
