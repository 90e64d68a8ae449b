use crate::document::Document;
use crate::error::Result;
use crate::site::Site;
use crate::types::{Index, PageRecord};
use std::ops::BitOr;
use std::sync::Arc;

/// The set of hooks a plugin implements.
///
/// Dispatch reads this once when the plugin is registered; a hook whose bit is
/// absent is never called, even though the trait supplies a no-op default.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Hooks(u16);

impl Hooks {
    pub const NONE: Hooks = Hooks(0);
    pub const INDEX_PAGE: Hooks = Hooks(1);
    pub const INDEX: Hooks = Hooks(1 << 1);
    pub const CONTENT_BEFORE_TEMPLATES: Hooks = Hooks(1 << 2);
    pub const CONTENT_AFTER_TEMPLATES: Hooks = Hooks(1 << 3);
    pub const TEMPLATE: Hooks = Hooks(1 << 4);
    pub const LAYOUT: Hooks = Hooks(1 << 5);
    pub const BEFORE_BUILD: Hooks = Hooks(1 << 6);
    pub const AFTER_BUILD: Hooks = Hooks(1 << 7);

    pub const fn contains(self, other: Hooks) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for Hooks {
    type Output = Hooks;

    fn bitor(self, other: Hooks) -> Hooks {
        Hooks(self.0 | other.0)
    }
}

/// Trees enclosing a template reference, nearest first.
pub struct Scope<'a> {
    pub document: &'a Document,
    pub parent: Option<&'a Scope<'a>>,
}

impl<'a> Scope<'a> {
    pub fn root(document: &'a Document) -> Self {
        Self {
            document,
            parent: None,
        }
    }

    pub fn nested(&'a self, document: &'a Document) -> Scope<'a> {
        Scope {
            document,
            parent: Some(self),
        }
    }

    pub fn enclosing(&self) -> impl Iterator<Item = &Document> {
        std::iter::successors(Some(self), |scope| scope.parent).map(|scope| scope.document)
    }

    pub fn depth(&self) -> usize {
        self.enclosing().count()
    }
}

pub struct TemplateContext<'a> {
    /// Template being resolved.
    pub name: &'a str,
    /// In-flight template names, outermost first, ending with `name`.
    pub stack: &'a [String],
    pub scope: &'a Scope<'a>,
    /// The page's content tree, once it exists (layout resolution only).
    pub page_content: Option<&'a Document>,
}

/// An extension of the indexing and composition pipeline.
///
/// Every hook is optional. Implement the ones the plugin needs and declare
/// them in [`Plugin::hooks`].
pub trait Plugin: Send + Sync {
    fn name(&self) -> &str;

    fn hooks(&self) -> Hooks;

    /// Runs for every page, for this plugin, before any whole-index hook.
    /// `content` is a freshly decoded view of the page.
    fn process_index_page(
        &self,
        _site: &Site,
        _page: &mut PageRecord,
        _content: &Document,
    ) -> Result<()> {
        Ok(())
    }

    /// Runs once after every plugin's per-page hook has finished.
    fn process_index(&self, _site: &Site, _index: &mut Index) -> Result<()> {
        Ok(())
    }

    fn process_content_before_templates(
        &self,
        _site: &Site,
        _page: &PageRecord,
        _content: &mut Document,
    ) -> Result<()> {
        Ok(())
    }

    fn process_content_after_templates(
        &self,
        _site: &Site,
        _page: &PageRecord,
        _content: &mut Document,
    ) -> Result<()> {
        Ok(())
    }

    /// Runs once per resolved template reference, before substitution.
    fn process_template(
        &self,
        _site: &Site,
        _page: &PageRecord,
        _template: &mut Document,
        _context: &TemplateContext<'_>,
    ) -> Result<()> {
        Ok(())
    }

    fn process_layout(
        &self,
        _site: &Site,
        _page: &PageRecord,
        _layout: &mut Document,
        _content: &Document,
    ) -> Result<()> {
        Ok(())
    }

    fn before_build(&self, _site: &Site, _index: &Index) -> Result<()> {
        Ok(())
    }

    /// Runs after every page is written and static files are copied.
    fn after_build(&self, _site: &Site, _index: &Index) -> Result<()> {
        Ok(())
    }
}

#[derive(Clone)]
pub struct Registered {
    plugin: Arc<dyn Plugin>,
    hooks: Hooks,
}

impl Registered {
    fn new(plugin: Arc<dyn Plugin>) -> Self {
        let hooks = plugin.hooks();
        Self { plugin, hooks }
    }

    pub fn plugin(&self) -> &dyn Plugin {
        self.plugin.as_ref()
    }

    pub fn name(&self) -> &str {
        self.plugin.name()
    }
}

/// Ordered plugin lists, one per phase. Registration order is dispatch order.
#[derive(Clone, Default)]
pub struct PluginRegistry {
    index: Vec<Registered>,
    page_content: Vec<Registered>,
    template: Vec<Registered>,
    layout: Vec<Registered>,
    build: Vec<Registered>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn use_index_plugin(&mut self, plugin: Arc<dyn Plugin>) {
        self.index.push(Registered::new(plugin));
    }

    pub fn use_page_content_plugin(&mut self, plugin: Arc<dyn Plugin>) {
        self.page_content.push(Registered::new(plugin));
    }

    pub fn use_template_plugin(&mut self, plugin: Arc<dyn Plugin>) {
        self.template.push(Registered::new(plugin));
    }

    pub fn use_layout_plugin(&mut self, plugin: Arc<dyn Plugin>) {
        self.layout.push(Registered::new(plugin));
    }

    pub fn use_build_plugin(&mut self, plugin: Arc<dyn Plugin>) {
        self.build.push(Registered::new(plugin));
    }

    pub fn index_plugins(&self, hook: Hooks) -> impl Iterator<Item = &Registered> {
        with_hook(&self.index, hook)
    }

    pub fn page_content_plugins(&self, hook: Hooks) -> impl Iterator<Item = &Registered> {
        with_hook(&self.page_content, hook)
    }

    pub fn template_plugins(&self) -> impl Iterator<Item = &Registered> {
        with_hook(&self.template, Hooks::TEMPLATE)
    }

    pub fn layout_plugins(&self) -> impl Iterator<Item = &Registered> {
        with_hook(&self.layout, Hooks::LAYOUT)
    }

    pub fn build_plugins(&self, hook: Hooks) -> impl Iterator<Item = &Registered> {
        with_hook(&self.build, hook)
    }

    pub fn len(&self) -> usize {
        self.index.len()
            + self.page_content.len()
            + self.template.len()
            + self.layout.len()
            + self.build.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn with_hook(plugins: &[Registered], hook: Hooks) -> impl Iterator<Item = &Registered> {
    plugins
        .iter()
        .filter(move |registered| registered.hooks.contains(hook))
}
