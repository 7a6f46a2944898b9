//! Link configuration.
//!
//! Resolution order for each setting: command-line flag, environment
//! (`RELINK_HOST`, `RELINK_BASE_PATH`, read by clap), `config.json` in
//! the platform config directory, then the built-in default.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::Deserialize;

use relink_core::{BaseUrl, LinkBuilder};

/// Settings read from `config.json`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    pub host: Option<String>,
    pub base_path: Option<String>,
}

/// Get the config file path.
fn config_path() -> Result<PathBuf> {
    let dirs =
        ProjectDirs::from("", "", "relink").context("Could not determine config directory")?;
    Ok(dirs.config_dir().join("config.json"))
}

impl Config {
    /// Load the config file, or defaults if there is none.
    pub fn load() -> Result<Self> {
        let path = config_path()?;

        if !path.exists() {
            return Ok(Self::default());
        }

        let json = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let config = serde_json::from_str(&json)
            .with_context(|| format!("Invalid config file {}", path.display()))?;

        tracing::debug!(path = %path.display(), "Loaded config");

        Ok(config)
    }

    /// Build the link builder, letting explicit values override the file.
    ///
    /// Without a host, links are relative (`/api/posts/1`).
    pub fn link_builder(self, host: Option<String>, base_path: Option<String>) -> Result<LinkBuilder> {
        let base_path = base_path.or(self.base_path).unwrap_or_default();

        match host.or(self.host) {
            Some(host) => {
                let host = BaseUrl::new(&host).context("Invalid host URL")?;
                Ok(LinkBuilder::new(host, base_path))
            }
            None => Ok(LinkBuilder::relative(base_path)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use relink_core::UrlBuilder;

    #[test]
    fn explicit_values_override_file() {
        let config = Config {
            host: Some("http://file.example".to_string()),
            base_path: Some("/file".to_string()),
        };
        let links = config
            .link_builder(Some("https://flag.example".to_string()), None)
            .unwrap();
        assert_eq!(
            links.build("posts", Some("1"), None),
            "https://flag.example/file/posts/1"
        );
    }

    #[test]
    fn relative_links_without_host() {
        let links = Config::default().link_builder(None, None).unwrap();
        assert_eq!(links.build("posts", None, None), "/posts");
    }

    #[test]
    fn invalid_host_is_an_error() {
        assert!(
            Config::default()
                .link_builder(Some("not a url".to_string()), None)
                .is_err()
        );
    }
}
