use crate::error::{IoContext, Result, WeftError};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const CONFIG_FILE_NAME: &str = "weft.toml";
pub const BASE_URL_ENV: &str = "WEFT_BASE_URL";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SiteConfig {
    #[serde(default = "default_theme")]
    pub theme: String,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default = "default_layout")]
    pub default_layout: String,
    #[serde(default = "default_content_dir")]
    pub content_dir: PathBuf,
    #[serde(default = "default_static_dir")]
    pub static_dir: PathBuf,
    #[serde(default = "default_themes_dir")]
    pub themes_dir: PathBuf,
    #[serde(default = "default_index_dir")]
    pub index_dir: PathBuf,
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
}

pub fn default_theme() -> String {
    "default".to_string()
}

pub fn default_layout() -> String {
    "default.html".to_string()
}

fn default_content_dir() -> PathBuf {
    PathBuf::from("content")
}

fn default_static_dir() -> PathBuf {
    PathBuf::from("static")
}

fn default_themes_dir() -> PathBuf {
    PathBuf::from("themes")
}

fn default_index_dir() -> PathBuf {
    PathBuf::from("_index")
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("_site")
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            theme: default_theme(),
            base_url: None,
            default_layout: default_layout(),
            content_dir: default_content_dir(),
            static_dir: default_static_dir(),
            themes_dir: default_themes_dir(),
            index_dir: default_index_dir(),
            output_dir: default_output_dir(),
        }
    }
}

impl SiteConfig {
    /// Reads `weft.toml` from the project root, falling back to defaults when
    /// the file is absent. `WEFT_BASE_URL` wins over the file.
    pub fn load(root: &Path) -> Result<Self> {
        let config_path = root.join(CONFIG_FILE_NAME);

        let mut config = if config_path.exists() {
            let content =
                fs::read_to_string(&config_path).io_context("reading config", &config_path)?;
            toml::from_str(&content).map_err(|error| WeftError::TomlParse {
                path: config_path.clone(),
                message: error.to_string(),
            })?
        } else {
            SiteConfig::default()
        };

        if let Ok(url) = std::env::var(BASE_URL_ENV) {
            config.base_url = Some(url);
        }

        config.base_url = config.base_url.map(normalize_base_url);

        Ok(config)
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(normalize_base_url(url.into()));
        self
    }

    pub fn with_theme(mut self, theme: impl Into<String>) -> Self {
        self.theme = theme.into();
        self
    }
}

fn normalize_base_url(url: String) -> String {
    url.trim_end_matches('/').to_string()
}

/// Absolute locations of everything a build reads or writes.
#[derive(Debug, Clone, PartialEq)]
pub struct SitePaths {
    pub root: PathBuf,
    pub content_dir: PathBuf,
    pub static_dir: PathBuf,
    pub theme_dir: PathBuf,
    pub index_dir: PathBuf,
    pub output_dir: PathBuf,
}

impl SitePaths {
    pub fn resolve(root: &Path, config: &SiteConfig) -> Self {
        let root = root.to_path_buf();
        Self {
            content_dir: root.join(&config.content_dir),
            static_dir: root.join(&config.static_dir),
            theme_dir: root.join(&config.themes_dir).join(&config.theme),
            index_dir: root.join(&config.index_dir),
            output_dir: root.join(&config.output_dir),
            root,
        }
    }

    pub fn templates_dir(&self) -> PathBuf {
        self.theme_dir.join("templates")
    }

    pub fn layouts_dir(&self) -> PathBuf {
        self.theme_dir.join("layouts")
    }

    pub fn theme_static_dir(&self) -> PathBuf {
        self.theme_dir.join("static")
    }

    pub fn output_static_dir(&self) -> PathBuf {
        self.output_dir.join("static")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_without_config_file() {
        let dir = TempDir::new().unwrap();
        let config = SiteConfig::load(dir.path()).unwrap();
        assert_eq!(config.theme, "default");
        assert_eq!(config.default_layout, "default.html");
        assert_eq!(config.index_dir, PathBuf::from("_index"));
    }

    #[test]
    fn test_load_config_file() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join(CONFIG_FILE_NAME),
            r#"
theme = "docs"
output_dir = "public"
"#,
        )
        .unwrap();

        let config = SiteConfig::load(dir.path()).unwrap();
        assert_eq!(config.theme, "docs");
        assert_eq!(config.output_dir, PathBuf::from("public"));
        assert_eq!(config.content_dir, PathBuf::from("content"));
    }

    #[test]
    fn test_invalid_config_file() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(CONFIG_FILE_NAME), "theme = [").unwrap();
        let result = SiteConfig::load(dir.path());
        assert!(matches!(result, Err(WeftError::TomlParse { .. })));
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let config = SiteConfig::default().with_base_url("https://example.com/");
        assert_eq!(config.base_url.as_deref(), Some("https://example.com"));
    }

    #[test]
    fn test_paths_resolve_theme() {
        let config = SiteConfig::default().with_theme("dark");
        let paths = SitePaths::resolve(Path::new("/project"), &config);
        assert_eq!(paths.theme_dir, PathBuf::from("/project/themes/dark"));
        assert_eq!(
            paths.layouts_dir(),
            PathBuf::from("/project/themes/dark/layouts")
        );
        assert_eq!(
            paths.output_static_dir(),
            PathBuf::from("/project/_site/static")
        );
    }
}
