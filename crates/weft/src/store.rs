use crate::error::{IoContext, Result, WeftError};
use crate::types::{PageRecord, PageUpdate, TagEntry};
use indexmap::IndexMap;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

const PAGES_DIR_NAME: &str = "pages";
const TAGS_DIR_NAME: &str = "tags";
const PAGES_FILE_NAME: &str = "pages.json";
const TAGS_FILE_NAME: &str = "tags.json";
const UPDATES_FILE_NAME: &str = "updates.json";

/// The persisted form of the index: one JSON file per page and per tag plus
/// combined snapshots.
#[derive(Debug, Clone)]
pub struct IndexStore {
    root: PathBuf,
}

impl IndexStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn reset(&self) -> Result<()> {
        if self.root.exists() {
            fs::remove_dir_all(&self.root).io_context("clearing index", &self.root)?;
        }
        fs::create_dir_all(&self.root).io_context("creating index", &self.root)?;
        Ok(())
    }

    pub fn page_path(&self, page: &PageRecord) -> PathBuf {
        let relative = if page.is_directory() {
            format!("{}index.json", page.key)
        } else {
            format!("{}.json", page.key)
        };
        self.root
            .join(PAGES_DIR_NAME)
            .join(relative.trim_start_matches('/'))
    }

    pub fn tag_path(&self, tag: &str) -> PathBuf {
        self.root.join(TAGS_DIR_NAME).join(format!("{tag}.json"))
    }

    pub fn pages_path(&self) -> PathBuf {
        self.root.join(PAGES_FILE_NAME)
    }

    pub fn tags_path(&self) -> PathBuf {
        self.root.join(TAGS_FILE_NAME)
    }

    pub fn updates_path(&self) -> PathBuf {
        self.root.join(UPDATES_FILE_NAME)
    }

    pub fn save_page(&self, page: &PageRecord) -> Result<()> {
        write_json(&self.page_path(page), page)
    }

    pub fn save_pages(&self, pages: &IndexMap<String, PageRecord>) -> Result<()> {
        write_json(&self.pages_path(), pages)
    }

    pub fn save_tag(&self, tag: &TagEntry) -> Result<()> {
        write_json(&self.tag_path(&tag.key), tag)
    }

    pub fn save_tags(&self, tags: &IndexMap<String, TagEntry>) -> Result<()> {
        write_json(&self.tags_path(), tags)
    }

    pub fn save_updates(&self, updates: &[PageUpdate]) -> Result<()> {
        write_json(&self.updates_path(), updates)
    }
}

pub(crate) fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let content = serde_json::to_string_pretty(value).map_err(|error| WeftError::Json {
        path: path.to_path_buf(),
        message: error.to_string(),
    })?;
    write_file(path, content.as_bytes())
}

/// Delete-then-write, creating parent directories as needed.
pub(crate) fn write_file(path: &Path, content: &[u8]) -> Result<()> {
    if path.exists() {
        fs::remove_file(path).io_context("removing", path)?;
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).io_context("creating directory", parent)?;
    }
    fs::write(path, content).io_context("writing", path)?;
    Ok(())
}
