use crate::document::Document;
use crate::error::{IoContext, Result, WeftError};
use pulldown_cmark::{CodeBlockKind, Event, Options, Parser, Tag, TagEnd};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use syntect::highlighting::ThemeSet;
use syntect::html::highlighted_html_for_string;
use syntect::parsing::SyntaxSet;
use tera::{Context, Tera};

/// Turns a content file of one format into HTML markup.
///
/// A reader offers a content-based entry point, a path-based one, or both.
/// Each returns `None` when the reader does not provide it.
pub trait Reader: Send + Sync {
    fn read(&self, _content: &str) -> Option<Result<String>> {
        None
    }

    fn read_file(&self, _path: &Path) -> Option<Result<String>> {
        None
    }
}

#[derive(Clone)]
pub struct ReaderRegistry {
    readers: HashMap<String, Arc<dyn Reader>>,
}

impl Default for ReaderRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ReaderRegistry {
    pub fn empty() -> Self {
        Self {
            readers: HashMap::new(),
        }
    }

    /// Registry with the built-in html, markdown and tera readers.
    pub fn new() -> Self {
        let mut registry = Self::empty();

        let html: Arc<dyn Reader> = Arc::new(HtmlReader);
        let markdown: Arc<dyn Reader> = Arc::new(MarkdownReader::new());
        registry.register_shared("html", html.clone());
        registry.register_shared("htm", html);
        registry.register_shared("md", markdown.clone());
        registry.register_shared("markdown", markdown);
        registry.register("tera", TeraReader);

        registry
    }

    pub fn register(&mut self, extension: impl Into<String>, reader: impl Reader + 'static) {
        self.readers.insert(extension.into(), Arc::new(reader));
    }

    pub fn register_shared(&mut self, extension: impl Into<String>, reader: Arc<dyn Reader>) {
        self.readers.insert(extension.into(), reader);
    }

    pub fn get(&self, extension: &str) -> Result<&dyn Reader> {
        self.readers
            .get(extension)
            .map(|reader| reader.as_ref())
            .ok_or_else(|| WeftError::MissingReader {
                extension: extension.to_string(),
            })
    }

    /// Decodes a file, preferring the reader's path-based entry point.
    pub fn decode_file(&self, extension: &str, path: &Path) -> Result<String> {
        let reader = self.get(extension)?;

        if let Some(result) = reader.read_file(path) {
            return result;
        }

        let content = fs::read_to_string(path).io_context("reading content", path)?;
        self.decode_with(reader, extension, &content)
    }

    pub fn decode(&self, extension: &str, content: &str) -> Result<String> {
        let reader = self.get(extension)?;
        self.decode_with(reader, extension, content)
    }

    fn decode_with(&self, reader: &dyn Reader, extension: &str, content: &str) -> Result<String> {
        reader
            .read(content)
            .unwrap_or_else(|| {
                Err(WeftError::UnsupportedReader {
                    extension: extension.to_string(),
                })
            })
    }
}

pub struct HtmlReader;

impl Reader for HtmlReader {
    fn read(&self, content: &str) -> Option<Result<String>> {
        Some(Ok(content.to_string()))
    }
}

/// Markdown content is an HTML wrapper: the head (and its attributes) is kept
/// as is and the text of the body is rendered as Markdown.
pub struct MarkdownReader {
    renderer: MarkdownRenderer,
}

impl Default for MarkdownReader {
    fn default() -> Self {
        Self::new()
    }
}

impl MarkdownReader {
    pub fn new() -> Self {
        Self {
            renderer: MarkdownRenderer::new(),
        }
    }
}

impl Reader for MarkdownReader {
    fn read(&self, content: &str) -> Option<Result<String>> {
        let document = Document::parse(content);

        let head = document
            .head()
            .map(|head| head.html())
            .unwrap_or_else(|| "<head></head>".to_string());

        let (body_attrs, text) = match document.body() {
            Some(body) => {
                let attrs: String = body
                    .value()
                    .attrs()
                    .map(|(name, value)| {
                        format!(" {}=\"{}\"", name, crate::document::escape_attribute(value))
                    })
                    .collect();
                (attrs, body.text().collect::<String>())
            }
            None => (String::new(), String::new()),
        };

        Some(Ok(format!(
            "{head}<body{body_attrs}>{}</body>",
            self.renderer.render(&text)
        )))
    }
}

pub struct MarkdownRenderer {
    syntax_set: SyntaxSet,
    theme_set: ThemeSet,
}

impl Default for MarkdownRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl MarkdownRenderer {
    pub fn new() -> Self {
        Self {
            syntax_set: SyntaxSet::load_defaults_newlines(),
            theme_set: ThemeSet::load_defaults(),
        }
    }

    pub fn render(&self, content: &str) -> String {
        let mut options = Options::empty();
        options.insert(Options::ENABLE_TABLES);
        options.insert(Options::ENABLE_FOOTNOTES);
        options.insert(Options::ENABLE_STRIKETHROUGH);
        options.insert(Options::ENABLE_TASKLISTS);
        options.insert(Options::ENABLE_HEADING_ATTRIBUTES);

        let parser = Parser::new_ext(content, options);
        let mut events = Vec::new();
        let mut in_code_block = false;
        let mut code_block_lang: Option<String> = None;
        let mut code_block_content = String::new();

        for event in parser {
            match event {
                Event::Start(Tag::CodeBlock(kind)) => {
                    in_code_block = true;
                    code_block_lang = match kind {
                        CodeBlockKind::Fenced(lang) if !lang.is_empty() => Some(lang.to_string()),
                        _ => None,
                    };
                    code_block_content.clear();
                }
                Event::End(TagEnd::CodeBlock) => {
                    let highlighted =
                        self.highlight(&code_block_content, code_block_lang.as_deref());
                    events.push(Event::Html(highlighted.into()));
                    in_code_block = false;
                    code_block_lang = None;
                }
                Event::Text(text) if in_code_block => {
                    code_block_content.push_str(&text);
                }
                other => events.push(other),
            }
        }

        let mut html_output = String::new();
        pulldown_cmark::html::push_html(&mut html_output, events.into_iter());
        html_output
    }

    fn highlight(&self, code: &str, lang: Option<&str>) -> String {
        let Some(lang) = lang else {
            return format!("<pre><code>{}</code></pre>", escape_html(code));
        };

        let theme = self.theme_set.themes.get("base16-ocean.dark");
        match (self.syntax_set.find_syntax_by_token(lang), theme) {
            (Some(syntax), Some(theme)) => {
                highlighted_html_for_string(code, &self.syntax_set, syntax, theme)
                    .unwrap_or_else(|_| format!("<pre><code>{}</code></pre>", escape_html(code)))
            }
            _ => format!(
                "<pre><code class=\"language-{}\">{}</code></pre>",
                escape_html(lang),
                escape_html(code)
            ),
        }
    }
}

fn escape_html(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// Renders tera templates with an empty context.
pub struct TeraReader;

impl Reader for TeraReader {
    fn read(&self, content: &str) -> Option<Result<String>> {
        Some(Tera::one_off(content, &Context::new(), false).map_err(WeftError::from))
    }

    fn read_file(&self, path: &Path) -> Option<Result<String>> {
        let content = match fs::read_to_string(path).io_context("reading template", path) {
            Ok(content) => content,
            Err(error) => return Some(Err(error)),
        };
        self.read(&content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    struct PathOnlyReader;

    impl Reader for PathOnlyReader {
        fn read_file(&self, path: &Path) -> Option<Result<String>> {
            Some(Ok(format!("from-path:{}", path.display())))
        }
    }

    struct NoEntryPoints;

    impl Reader for NoEntryPoints {}

    #[test]
    fn test_markdown_reader_keeps_head() {
        let reader = MarkdownReader::new();
        let output = reader
            .read("<head data-page-title=\"Hello\"><title>x</title></head>\n# Heading\n\nSome **bold** text.")
            .unwrap()
            .unwrap();
        assert!(output.starts_with("<head data-page-title=\"Hello\"><title>x</title></head>"));
        assert!(output.contains("<h1>Heading</h1>"));
        assert!(output.contains("<strong>bold</strong>"));
    }

    #[test]
    fn test_markdown_renders_code_blocks() {
        let renderer = MarkdownRenderer::new();
        let output = renderer.render("```rust\nfn main() {}\n```");
        assert!(output.contains("fn"));
        assert!(output.contains("main"));

        let plain = renderer.render("```\na & b\n```");
        assert_eq!(plain, "<pre><code>a &amp; b\n</code></pre>");
    }

    #[test]
    fn test_registry_prefers_path_entry_point() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("page.custom");
        fs::write(&path, "ignored").unwrap();

        let mut registry = ReaderRegistry::empty();
        registry.register("custom", PathOnlyReader);
        let output = registry.decode_file("custom", &path).unwrap();
        assert!(output.starts_with("from-path:"));
    }

    #[test]
    fn test_registry_falls_back_to_content() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("page.html");
        fs::write(&path, "<p>raw</p>").unwrap();

        let registry = ReaderRegistry::new();
        assert_eq!(registry.decode_file("html", &path).unwrap(), "<p>raw</p>");
    }

    #[test]
    fn test_missing_reader() {
        let registry = ReaderRegistry::new();
        let result = registry.decode("pug", "p hello");
        assert!(matches!(result, Err(WeftError::MissingReader { extension }) if extension == "pug"));
    }

    #[test]
    fn test_unsupported_reader() {
        let mut registry = ReaderRegistry::empty();
        registry.register("nothing", NoEntryPoints);
        let result = registry.decode("nothing", "x");
        assert!(matches!(result, Err(WeftError::UnsupportedReader { .. })));
    }

    #[test]
    fn test_tera_reader() {
        let output = TeraReader
            .read("{% set name = \"weft\" %}<p>{{ name | upper }}</p>")
            .unwrap()
            .unwrap();
        assert_eq!(output, "<p>WEFT</p>");
    }
}
