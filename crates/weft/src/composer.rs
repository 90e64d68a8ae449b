use crate::document::{Document, Rewrite, escape_attribute};
use crate::error::{IoContext, Result, WeftError};
use crate::plugin::{Hooks, PluginRegistry, Scope, TemplateContext};
use crate::site::Site;
use crate::store::write_file;
use crate::types::{Index, PageRecord};
use rayon::prelude::*;
use scraper::ElementRef;
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use tracing::{debug, info};
use walkdir::WalkDir;

pub const TEMPLATE_ATTR: &str = "data-template";
pub const TEMPLATE_BEHAVIOR_ATTR: &str = "data-template-behavior";
pub const LAYOUT_ATTR: &str = "data-layout";
pub const PAGE_BODY_ATTR: &str = "data-page-body";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Behavior {
    Replace,
    Wrap,
}

impl Behavior {
    fn of(element: ElementRef<'_>) -> Self {
        match element.value().attr(TEMPLATE_BEHAVIOR_ATTR) {
            Some(value) if value.eq_ignore_ascii_case("wrap") => Behavior::Wrap,
            _ => Behavior::Replace,
        }
    }
}

/// Template names currently being resolved for one page.
#[derive(Debug, Default)]
pub struct TemplateStack {
    names: Vec<String>,
    active: HashSet<String>,
}

impl TemplateStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, name: &str) -> Result<()> {
        if self.active.contains(name) {
            let mut path = self.names.join(" -> ");
            path.push_str(" -> ");
            path.push_str(name);
            return Err(WeftError::CyclicTemplate {
                name: name.to_string(),
                path,
            });
        }
        self.active.insert(name.to_string());
        self.names.push(name.to_string());
        Ok(())
    }

    pub fn pop(&mut self) {
        if let Some(name) = self.names.pop() {
            self.active.remove(&name);
        }
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

pub struct Composer<'a> {
    site: &'a Site,
    plugins: &'a PluginRegistry,
}

impl<'a> Composer<'a> {
    pub fn new(site: &'a Site, plugins: &'a PluginRegistry) -> Self {
        Self { site, plugins }
    }

    pub fn build_site(&self, index: &Index) -> Result<()> {
        let output_dir = &self.site.paths.output_dir;
        if output_dir.exists() {
            fs::remove_dir_all(output_dir).io_context("clearing output", output_dir)?;
        }
        fs::create_dir_all(output_dir).io_context("creating output", output_dir)?;

        for registered in self.plugins.build_plugins(Hooks::BEFORE_BUILD) {
            registered
                .plugin()
                .before_build(self.site, index)
                .map_err(|error| error.in_plugin(registered.name(), "before_build"))?;
        }

        index
            .pages
            .values()
            .collect::<Vec<_>>()
            .into_par_iter()
            .try_for_each(|page| {
                self.layout(page)
                    .and_then(|layout| self.save(page, &layout))
                    .map_err(|error| error.in_page(&page.key))
            })?;
        info!(pages = index.pages.len(), "composed pages");

        self.copy_static()?;

        for registered in self.plugins.build_plugins(Hooks::AFTER_BUILD) {
            registered
                .plugin()
                .after_build(self.site, index)
                .map_err(|error| error.in_plugin(registered.name(), "after_build"))?;
        }

        Ok(())
    }

    /// Composes one page: content, templates, layout, merged.
    pub fn layout(&self, page: &PageRecord) -> Result<Document> {
        debug!(key = %page.key, "composing page");

        let decoded = self.site.decode_page(page)?;
        let mut content = self.inject_templates(page, &decoded, None)?;

        for registered in self
            .plugins
            .page_content_plugins(Hooks::CONTENT_BEFORE_TEMPLATES)
        {
            registered
                .plugin()
                .process_content_before_templates(self.site, page, &mut content)
                .map_err(|error| {
                    error.in_plugin(registered.name(), "process_content_before_templates")
                })?;
        }

        // Hooks above may introduce new references; they get exactly one more pass.
        content = self.inject_templates(page, &content, None)?;

        for registered in self
            .plugins
            .page_content_plugins(Hooks::CONTENT_AFTER_TEMPLATES)
        {
            registered
                .plugin()
                .process_content_after_templates(self.site, page, &mut content)
                .map_err(|error| {
                    error.in_plugin(registered.name(), "process_content_after_templates")
                })?;
        }

        let layout_name = content
            .head_attr(LAYOUT_ATTR)
            .unwrap_or(self.site.config.default_layout.as_str())
            .to_string();
        let extension = extension_of(&layout_name, "layout")?;
        let layout_path = self.site.paths.layouts_dir().join(&layout_name);
        let layout_markup = self.site.readers.decode_file(extension, &layout_path)?;
        let mut layout =
            self.inject_templates(page, &Document::parse(&layout_markup), Some(&content))?;
        layout.append_to_head(&content.head_inner_html())?;
        layout.replace_with(&format!("[{PAGE_BODY_ATTR}]"), &content.body_inner_html())?;

        for registered in self.plugins.layout_plugins() {
            registered
                .plugin()
                .process_layout(self.site, page, &mut layout, &content)
                .map_err(|error| error.in_plugin(registered.name(), "process_layout"))?;
        }

        Ok(layout)
    }

    pub fn save(&self, page: &PageRecord, layout: &Document) -> Result<()> {
        let path = self.site.path_to_rendered(page);
        write_file(&path, layout.html().as_bytes())
    }

    /// Resolves every template reference in `document`, recursively, with a
    /// fresh resolution stack.
    pub fn inject_templates(
        &self,
        page: &PageRecord,
        document: &Document,
        page_content: Option<&Document>,
    ) -> Result<Document> {
        let mut stack = TemplateStack::new();
        self.inject(page, document, page_content, None, &mut stack)
    }

    fn inject(
        &self,
        page: &PageRecord,
        document: &Document,
        page_content: Option<&Document>,
        parent: Option<&Scope<'_>>,
        stack: &mut TemplateStack,
    ) -> Result<Document> {
        if !document.has_attribute(TEMPLATE_ATTR) {
            return Ok(document.clone());
        }

        let scope = match parent {
            Some(parent) => parent.nested(document),
            None => Scope::root(document),
        };

        document.rewrite(|element| {
            let Some(name) = element.value().attr(TEMPLATE_ATTR) else {
                return Ok(Rewrite::Keep);
            };
            let resolved = self.resolve_template(page, name, page_content, &scope, stack)?;
            Ok(match Behavior::of(element) {
                Behavior::Replace => Rewrite::Replace(resolved),
                Behavior::Wrap => Rewrite::Replace(wrap(element, &resolved)),
            })
        })
    }

    fn resolve_template(
        &self,
        page: &PageRecord,
        name: &str,
        page_content: Option<&Document>,
        scope: &Scope<'_>,
        stack: &mut TemplateStack,
    ) -> Result<String> {
        let extension = extension_of(name, "template")?;
        stack.push(name)?;
        debug!(key = %page.key, template = name, depth = stack.names().len(), "resolving template");

        let path = self.site.paths.templates_dir().join(name);
        let markup = self.site.readers.decode_file(extension, &path)?;
        let mut template = Document::parse(&markup);

        let context = TemplateContext {
            name,
            stack: stack.names(),
            scope,
            page_content,
        };
        for registered in self.plugins.template_plugins() {
            registered
                .plugin()
                .process_template(self.site, page, &mut template, &context)
                .map_err(|error| error.in_plugin(registered.name(), "process_template"))?;
        }

        let resolved = self.inject(page, &template, page_content, Some(scope), stack)?;
        stack.pop();

        Ok(resolved.fragment_html())
    }

    /// Theme static files first, then the project's override directory.
    pub fn copy_static(&self) -> Result<()> {
        let target = self.site.paths.output_static_dir();
        if target.exists() {
            fs::remove_dir_all(&target).io_context("clearing static output", &target)?;
        }
        fs::create_dir_all(&target).io_context("creating static output", &target)?;

        for source in [
            self.site.paths.theme_static_dir(),
            self.site.paths.static_dir.clone(),
        ] {
            if source.exists() {
                copy_dir(&source, &target)?;
            }
        }

        Ok(())
    }
}

fn copy_dir(source: &Path, target: &Path) -> Result<()> {
    if !source.is_dir() {
        return Err(WeftError::InvalidStaticRoot {
            path: source.to_path_buf(),
        });
    }

    let mut copied = 0usize;
    for entry in WalkDir::new(source).min_depth(1) {
        let entry = entry.map_err(|error| WeftError::WalkDir {
            path: source.to_path_buf(),
            message: error.to_string(),
        })?;

        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        let Ok(relative) = path.strip_prefix(source) else {
            continue;
        };
        let dest = target.join(relative);

        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent).io_context("creating directory", parent)?;
        }
        fs::copy(path, &dest).io_context("copying static file", path)?;
        copied += 1;
    }

    debug!(source = %source.display(), files = copied, "copied static files");
    Ok(())
}

fn extension_of<'n>(name: &'n str, kind: &str) -> Result<&'n str> {
    Path::new(name)
        .extension()
        .and_then(|extension| extension.to_str())
        .filter(|extension| !extension.is_empty())
        .ok_or_else(|| WeftError::MissingExtension {
            kind: kind.to_string(),
            name: name.to_string(),
        })
}

/// Re-synthesizes the referencing element around the resolved content,
/// without its template control attributes.
fn wrap(element: ElementRef<'_>, content: &str) -> String {
    let tag = element.value().name();
    let mut output = format!("<{tag}");

    for (name, value) in element.value().attrs() {
        if name.starts_with(TEMPLATE_ATTR) {
            continue;
        }
        if value.contains('"') {
            let value = value.replace('&', "&amp;").replace('\'', "&#39;");
            output.push_str(&format!(" {name}='{value}'"));
        } else {
            output.push_str(&format!(" {name}=\"{}\"", escape_attribute(value)));
        }
    }

    output.push('>');
    output.push_str(content);
    output.push_str(&format!("</{tag}>"));
    output
}
