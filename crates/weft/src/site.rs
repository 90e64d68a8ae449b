use crate::composer::Composer;
use crate::config::{SiteConfig, SitePaths};
use crate::document::Document;
use crate::error::Result;
use crate::indexer::Indexer;
use crate::plugin::PluginRegistry;
use crate::plugins;
use crate::reader::ReaderRegistry;
use crate::store::IndexStore;
use crate::types::{BuildState, Index, PageRecord};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::info;

/// Read-only context handed to every stage and every plugin hook.
pub struct Site {
    pub config: SiteConfig,
    pub paths: SitePaths,
    pub readers: ReaderRegistry,
    pub store: IndexStore,
}

impl Site {
    pub fn new(root: impl AsRef<Path>, config: SiteConfig) -> Self {
        let paths = SitePaths::resolve(root.as_ref(), &config);
        let store = IndexStore::new(&paths.index_dir);
        Self {
            config,
            paths,
            readers: ReaderRegistry::new(),
            store,
        }
    }

    pub fn load(root: impl AsRef<Path>) -> Result<Self> {
        let config = SiteConfig::load(root.as_ref())?;
        Ok(Self::new(root, config))
    }

    pub fn base_url(&self) -> Option<&str> {
        self.config.base_url.as_deref()
    }

    pub fn path_to_page_content(&self, page: &PageRecord) -> PathBuf {
        let relative = if page.is_directory() {
            format!("{}index.{}", page.key, page.extension)
        } else {
            format!("{}.{}", page.key, page.extension)
        };
        self.paths
            .content_dir
            .join(relative.trim_start_matches('/'))
    }

    pub fn path_to_rendered(&self, page: &PageRecord) -> PathBuf {
        self.paths
            .output_dir
            .join(page.href.trim_start_matches('/'))
    }

    /// `relative` is taken below the static override directory.
    pub fn path_to_static_file(&self, relative: &str) -> PathBuf {
        self.paths
            .static_dir
            .join(relative.trim_start_matches('/'))
    }

    pub fn decode_page_markup(&self, page: &PageRecord) -> Result<String> {
        self.readers
            .decode_file(&page.extension, &self.path_to_page_content(page))
    }

    pub fn decode_page(&self, page: &PageRecord) -> Result<Document> {
        Ok(Document::parse(&self.decode_page_markup(page)?))
    }
}

/// Notified on every build state transition.
pub trait BuildObserver: Send + Sync {
    fn state_changed(&self, state: BuildState, index: &Index);
}

#[derive(Debug, Clone)]
pub struct BuildReport {
    pub pages: usize,
    pub tags: usize,
    pub duration: Duration,
}

pub struct SiteBuilder {
    site: Site,
    plugins: PluginRegistry,
    index: Index,
    state: Option<BuildState>,
    observers: Vec<Arc<dyn BuildObserver>>,
}

impl SiteBuilder {
    pub fn new(site: Site) -> Self {
        Self {
            site,
            plugins: PluginRegistry::new(),
            index: Index::default(),
            state: None,
            observers: Vec::new(),
        }
    }

    pub fn with_default_plugins(mut self) -> Self {
        plugins::register_defaults(&mut self.plugins);
        self
    }

    pub fn observe(&mut self, observer: Arc<dyn BuildObserver>) {
        self.observers.push(observer);
    }

    pub fn site(&self) -> &Site {
        &self.site
    }

    pub fn plugins_mut(&mut self) -> &mut PluginRegistry {
        &mut self.plugins
    }

    pub fn readers_mut(&mut self) -> &mut ReaderRegistry {
        &mut self.site.readers
    }

    pub fn index(&self) -> &Index {
        &self.index
    }

    /// `None` until the first build starts.
    pub fn state(&self) -> Option<BuildState> {
        self.state
    }

    pub fn build(&mut self) -> Result<BuildReport> {
        let started = Instant::now();

        self.index = Index::default();
        self.transition(BuildState::Indexing);
        info!(content = %self.site.paths.content_dir.display(), "indexing content");
        self.index = Indexer::new(&self.site, &self.plugins).index_all_content()?;

        self.transition(BuildState::Building);
        info!(output = %self.site.paths.output_dir.display(), "building site");
        Composer::new(&self.site, &self.plugins).build_site(&self.index)?;

        self.transition(BuildState::Ready);

        let report = BuildReport {
            pages: self.index.pages.len(),
            tags: self.index.tags.len(),
            duration: started.elapsed(),
        };
        info!(
            pages = report.pages,
            tags = report.tags,
            elapsed_ms = report.duration.as_millis() as u64,
            "build finished"
        );
        Ok(report)
    }

    fn transition(&mut self, state: BuildState) {
        self.state = Some(state);
        for observer in &self.observers {
            observer.state_changed(state, &self.index);
        }
    }
}
