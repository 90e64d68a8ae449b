use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum WeftError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("IO error while {action} {path}: {source}")]
    IoContext {
        action: String,
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("TOML parse error in {path}: {message}")]
    TomlParse { path: PathBuf, message: String },

    #[error("JSON error in {path}: {message}")]
    Json { path: PathBuf, message: String },

    #[error("Directory walk error in {path}: {message}")]
    WalkDir { path: PathBuf, message: String },

    #[error("Invalid selector '{selector}': {message}")]
    Selector { selector: String, message: String },

    #[error("Template error: {0}")]
    Template(#[from] tera::Error),

    #[error(
        "'{key}' (from {path}) is under the reserved '/static' path. \
         Files served in their raw form belong in the static directory next to the content directory"
    )]
    ReservedPath { key: String, path: PathBuf },

    #[error("No file extension on {kind} '{name}'. Include the file extension in the reference")]
    MissingExtension { kind: String, name: String },

    #[error("No reader registered for file extension '{extension}'")]
    MissingReader { extension: String },

    #[error("Reader for file extension '{extension}' cannot decode content")]
    UnsupportedReader { extension: String },

    #[error("Template '{name}' is called recursively: {path}")]
    CyclicTemplate { name: String, path: String },

    #[error(
        "Invalid tag '{tag}' on page '{key}'. Tags may only contain letters (a-zA-Z), digits (0-9) or hyphens ('-')"
    )]
    InvalidTag { key: String, tag: String },

    #[error("Site root {path} does not point to a valid directory")]
    InvalidStaticRoot { path: PathBuf },

    #[error(
        "Page '{key}' uses the reserved path /sitemap.xml, where the generated sitemap is written"
    )]
    ReservedSitemapPath { key: String },

    #[error("Page '{key}' contains invalid links: {}", .links.join(", "))]
    BrokenLinks { key: String, links: Vec<String> },

    #[error(
        "The sitemap requires a base url to build fully-qualified URLs. \
         Set base_url in weft.toml or the WEFT_BASE_URL environment variable (e.g. https://my.site.com)"
    )]
    MissingBaseUrl,

    #[error("Page '{key}': {source}")]
    Page { key: String, source: Box<WeftError> },

    #[error("Plugin '{plugin}' failed in {hook}: {source}")]
    Plugin {
        plugin: String,
        hook: &'static str,
        source: Box<WeftError>,
    },
}

impl WeftError {
    /// The underlying error with any page or plugin attribution removed.
    pub fn root(&self) -> &WeftError {
        match self {
            WeftError::Page { source, .. } | WeftError::Plugin { source, .. } => source.root(),
            other => other,
        }
    }

    pub(crate) fn in_plugin(self, plugin: &str, hook: &'static str) -> Self {
        WeftError::Plugin {
            plugin: plugin.to_string(),
            hook,
            source: Box::new(self),
        }
    }

    pub(crate) fn in_page(self, key: &str) -> Self {
        WeftError::Page {
            key: key.to_string(),
            source: Box::new(self),
        }
    }
}

pub type Result<T> = std::result::Result<T, WeftError>;

pub trait IoContext<T> {
    fn io_context(self, action: &str, path: &Path) -> Result<T>;
}

impl<T> IoContext<T> for std::io::Result<T> {
    fn io_context(self, action: &str, path: &Path) -> Result<T> {
        self.map_err(|source| WeftError::IoContext {
            action: action.to_string(),
            path: path.to_path_buf(),
            source,
        })
    }
}
