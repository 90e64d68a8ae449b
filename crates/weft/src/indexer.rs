use crate::document::Document;
use crate::error::{Result, WeftError};
use crate::plugin::{Hooks, PluginRegistry, Registered};
use crate::site::Site;
use crate::types::{Index, PageRecord};
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use walkdir::WalkDir;

const RESERVED_PREFIX: &str = "/static";

pub struct Indexer<'a> {
    site: &'a Site,
    plugins: &'a PluginRegistry,
}

impl<'a> Indexer<'a> {
    pub fn new(site: &'a Site, plugins: &'a PluginRegistry) -> Self {
        Self { site, plugins }
    }

    /// Walks the content tree, runs the index plugins and persists the result.
    ///
    /// Fails fast: files persisted before an error stay on disk.
    pub fn index_all_content(&self) -> Result<Index> {
        self.site.store.reset()?;

        let mut index = Index::default();
        for page in self.collect_pages()? {
            debug!(key = %page.key, extension = %page.extension, "indexed page");
            index.pages.insert(page.key.clone(), page);
        }
        info!(pages = index.pages.len(), "collected content");

        self.run_page_hooks(&mut index)?;

        for registered in self.plugins.index_plugins(Hooks::INDEX) {
            registered
                .plugin()
                .process_index(self.site, &mut index)
                .map_err(|error| error.in_plugin(registered.name(), "process_index"))?;
        }

        for page in index.pages.values() {
            self.site.store.save_page(page)?;
        }
        self.site.store.save_pages(&index.pages)?;

        Ok(index)
    }

    fn collect_pages(&self) -> Result<Vec<PageRecord>> {
        let content_dir = &self.site.paths.content_dir;
        let mut pages = Vec::new();

        if !content_dir.exists() {
            return Ok(pages);
        }

        for entry in WalkDir::new(content_dir)
            .min_depth(1)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| !is_hidden(entry.path()))
        {
            let entry = entry.map_err(|error| WeftError::WalkDir {
                path: content_dir.clone(),
                message: error.to_string(),
            })?;

            if !entry.file_type().is_file() {
                continue;
            }

            let (key, extension) = derive_key(content_dir, entry.path())?;
            if is_reserved(&key) {
                return Err(WeftError::ReservedPath {
                    key,
                    path: entry.path().to_path_buf(),
                });
            }

            pages.push(PageRecord::new(key, extension));
        }

        Ok(pages)
    }

    /// Plugin-major: one plugin sees every page before the next plugin starts.
    fn run_page_hooks(&self, index: &mut Index) -> Result<()> {
        let plugins: Vec<&Registered> = self.plugins.index_plugins(Hooks::INDEX_PAGE).collect();
        if plugins.is_empty() {
            return Ok(());
        }

        let markup: Vec<String> = index
            .pages
            .values()
            .map(|page| {
                self.site
                    .decode_page_markup(page)
                    .map_err(|error| error.in_page(&page.key))
            })
            .collect::<Result<_>>()?;

        for registered in plugins {
            debug!(plugin = registered.name(), "running per-page index hook");
            index
                .pages
                .values_mut()
                .zip(&markup)
                .collect::<Vec<_>>()
                .into_par_iter()
                .try_for_each(|(page, markup)| {
                    let content = Document::parse(markup);
                    registered
                        .plugin()
                        .process_index_page(self.site, page, &content)
                        .map_err(|error| {
                            error
                                .in_plugin(registered.name(), "process_index_page")
                                .in_page(&page.key)
                        })
                })?;
        }

        Ok(())
    }
}

/// Maps a content file to its page key and source extension.
///
/// `content/about.md` becomes `/about`, `content/blog/index.md` becomes `/blog/`.
pub fn derive_key(content_dir: &Path, path: &Path) -> Result<(String, String)> {
    let relative = path.strip_prefix(content_dir).unwrap_or(path);

    let extension = relative
        .extension()
        .and_then(|extension| extension.to_str())
        .filter(|extension| !extension.is_empty())
        .ok_or_else(|| WeftError::MissingExtension {
            kind: "content".to_string(),
            name: relative.display().to_string(),
        })?
        .to_string();

    let stem: PathBuf = relative.with_extension("");
    let mut key = format!("/{}", stem.to_string_lossy().replace('\\', "/"));
    if key.ends_with("/index") {
        key.truncate(key.len() - "index".len());
    }

    Ok((key, extension))
}

fn is_reserved(key: &str) -> bool {
    key == RESERVED_PREFIX
        || key
            .strip_prefix(RESERVED_PREFIX)
            .is_some_and(|rest| rest.starts_with('/'))
}

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .map(|name| name.to_string_lossy().starts_with('.'))
        .unwrap_or(false)
}
