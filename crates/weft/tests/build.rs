use serde_json::Value;
use std::fs;
use std::path::Path;
use tempfile::TempDir;
use weft_ssg::{Site, SiteBuilder, SiteConfig, WeftError};

fn write(root: &Path, path: &str, content: &str) {
    let path = root.join(path);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

fn create_theme(root: &Path) {
    write(
        root,
        "themes/default/layouts/default.html",
        r#"<!DOCTYPE html><html><head><meta charset="utf-8"><title data-page-title></title></head><body><header data-template="nav.html" data-template-behavior="wrap" class="top"></header><main data-page-body></main></body></html>"#,
    );
    write(
        root,
        "themes/default/templates/nav.html",
        r#"<nav><a href="/index.html">Home</a></nav>"#,
    );
    write(
        root,
        "themes/default/templates/list.html",
        "<ul><li>posts</li></ul>",
    );
    write(root, "themes/default/static/css/site.css", "theme");
    write(root, "themes/default/static/css/theme.css", "theme only");
}

fn create_project() -> TempDir {
    let dir = TempDir::new().unwrap();
    let root = dir.path();
    create_theme(root);

    write(
        root,
        "content/index.html",
        r#"<head data-page-title="Home" data-tags="intro"></head><body><p>Welcome</p><template id="row"><li>item</li></template><a href="blog/">Blog</a><a href="about.html">About</a><a href="https://external.example">Out</a></body>"#,
    );
    write(
        root,
        "content/about.md",
        "<head data-page-title=\"About\" data-tags=\"intro foo-bar2\"></head>\n<body>\n# About\n\nSome *text*.\n</body>",
    );
    write(
        root,
        "content/blog/index.html",
        r#"<head data-page-title="Blog"></head><body><div data-template="list.html"></div></body>"#,
    );
    write(
        root,
        "content/blog/first.html",
        r#"<head data-page-title="First" data-plugin-sitemap-exclude="yes"></head><body><a href="../about.html">about</a><a href="index.html">up</a><a href="/static/css/site.css">css</a></body>"#,
    );
    write(
        root,
        "content/drafts/note.html",
        r#"<head data-page-title="Note"></head><body><p>orphan</p></body>"#,
    );
    write(root, "static/css/site.css", "override");

    dir
}

fn builder_for(root: &Path) -> SiteBuilder {
    let config = SiteConfig::default().with_base_url("https://example.com");
    SiteBuilder::new(Site::new(root, config)).with_default_plugins()
}

fn keys(stubs: impl IntoIterator<Item = String>) -> Vec<String> {
    stubs.into_iter().collect()
}

#[test]
fn test_full_build() {
    let dir = create_project();
    let root = dir.path();
    let mut builder = builder_for(root);

    let report = builder.build().unwrap();
    assert_eq!(report.pages, 5);
    assert_eq!(report.tags, 2);

    let index = builder.index();
    let order: Vec<&str> = index.pages.keys().map(String::as_str).collect();
    assert_eq!(
        order,
        vec!["/about", "/blog/first", "/blog/", "/drafts/note", "/"]
    );

    let home = fs::read_to_string(root.join("_site/index.html")).unwrap();
    assert!(home.starts_with("<!DOCTYPE html>"));
    assert!(home.contains(">Home</title>"));
    assert!(home.contains("<p>Welcome</p>"));
    assert!(home.contains(r#"<template id="row"><li>item</li></template>"#));
    assert!(!home.contains("data-page-body"));

    let about = fs::read_to_string(root.join("_site/about.html")).unwrap();
    assert!(about.contains("<h1>About</h1>"));
    assert!(about.contains("<em>text</em>"));
    assert!(about.contains(">About</title>"));

    let blog = fs::read_to_string(root.join("_site/blog/index.html")).unwrap();
    assert!(blog.contains(r#"<header class="top"><nav><a href="/index.html">Home</a></nav></header>"#));
    assert!(blog.contains("<ul><li>posts</li></ul>"));
    assert!(!blog.contains("data-template"));

    let first = &index.pages["/blog/first"];
    assert_eq!(
        keys(first.ancestors.iter().map(|stub| stub.key.clone())),
        vec!["/", "/blog/"]
    );
    assert_eq!(first.ancestors[1].title, "Blog");
    assert!(first.hash.is_some());
    assert!(first.date_last_modified.is_some());

    let note = &index.pages["/drafts/note"];
    assert_eq!(
        keys(note.ancestors.iter().map(|stub| stub.key.clone())),
        vec!["/"]
    );
    let root_page = &index.pages["/"];
    assert!(root_page.children.contains_key("/about"));
    assert!(root_page.children.contains_key("/blog/"));
    assert!(!root_page.children.contains_key("/drafts/note"));

    let intro: Vec<&str> = index.tags["intro"]
        .pages
        .iter()
        .map(|stub| stub.title.as_str())
        .collect();
    assert_eq!(intro, vec!["About", "Home"]);

    assert!(root.join("_index/pages.json").exists());
    assert!(root.join("_index/pages/blog/index.json").exists());
    assert!(root.join("_index/pages/blog/first.json").exists());
    assert!(root.join("_index/tags/foo-bar2.json").exists());
    assert!(root.join("_index/tags.json").exists());
    assert!(root.join("_index/updates.json").exists());

    let sitemap = fs::read_to_string(root.join("_site/sitemap.xml")).unwrap();
    assert!(sitemap.contains("<loc>https://example.com/about.html</loc>"));
    assert!(sitemap.contains("<loc>https://example.com/blog/index.html</loc>"));
    assert!(!sitemap.contains("first"));

    assert_eq!(
        fs::read_to_string(root.join("_site/static/css/site.css")).unwrap(),
        "override"
    );
    assert_eq!(
        fs::read_to_string(root.join("_site/static/css/theme.css")).unwrap(),
        "theme only"
    );
}

fn snapshot_without_times(root: &Path) -> Value {
    let content = fs::read_to_string(root.join("_index/pages.json")).unwrap();
    let mut snapshot: Value = serde_json::from_str(&content).unwrap();
    if let Some(pages) = snapshot.as_object_mut() {
        for page in pages.values_mut() {
            if let Some(page) = page.as_object_mut() {
                page.remove("dateCreated");
                page.remove("dateLastModified");
            }
        }
    }
    snapshot
}

#[test]
fn test_rebuild_is_idempotent() {
    let dir = create_project();
    let root = dir.path();
    let mut builder = builder_for(root);

    builder.build().unwrap();
    let first_snapshot = snapshot_without_times(root);
    let first_pages: Vec<Vec<u8>> = ["index.html", "about.html", "blog/index.html"]
        .iter()
        .map(|page| fs::read(root.join("_site").join(page)).unwrap())
        .collect();

    builder.build().unwrap();
    let second_pages: Vec<Vec<u8>> = ["index.html", "about.html", "blog/index.html"]
        .iter()
        .map(|page| fs::read(root.join("_site").join(page)).unwrap())
        .collect();

    assert_eq!(first_snapshot, snapshot_without_times(root));
    assert_eq!(first_pages, second_pages);
}

#[test]
fn test_cyclic_templates_fail_build() {
    let dir = TempDir::new().unwrap();
    let root = dir.path();
    create_theme(root);
    write(
        root,
        "themes/default/templates/nav.html",
        r#"<div data-template="sidebar.html"></div>"#,
    );
    write(
        root,
        "themes/default/templates/sidebar.html",
        r#"<div data-template="nav.html"></div>"#,
    );
    write(root, "content/index.html", "<p>home</p>");

    let error = builder_for(root).build().unwrap_err();
    assert!(matches!(error.root(), WeftError::CyclicTemplate { .. }));
    assert!(error.to_string().starts_with("Page '/': "));
    assert!(
        error
            .to_string()
            .contains("nav.html -> sidebar.html -> nav.html")
    );
}

#[test]
fn test_invalid_tag_names_plugin() {
    let dir = TempDir::new().unwrap();
    let root = dir.path();
    create_theme(root);
    write(
        root,
        "content/index.html",
        r#"<head data-tags="ok foo_bar"></head><body></body>"#,
    );

    let error = builder_for(root).build().unwrap_err();
    match &error {
        WeftError::Page { key, source } => {
            assert_eq!(key, "/");
            match source.as_ref() {
                WeftError::Plugin { plugin, hook, .. } => {
                    assert_eq!(plugin, "tags");
                    assert_eq!(*hook, "process_index_page");
                }
                other => panic!("unexpected error: {other}"),
            }
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(matches!(error.root(), WeftError::InvalidTag { tag, .. } if tag == "foo_bar"));
}

#[test]
fn test_broken_link_fails_indexing() {
    let dir = TempDir::new().unwrap();
    let root = dir.path();
    create_theme(root);
    write(
        root,
        "content/index.html",
        r#"<a href="/missing.html">gone</a><a href="http://external.example">out</a>"#,
    );

    let error = builder_for(root).build().unwrap_err();
    match error.root() {
        WeftError::BrokenLinks { key, links } => {
            assert_eq!(key, "/");
            assert_eq!(links, &vec!["/missing.html".to_string()]);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(!root.join("_site/index.html").exists());
}

#[test]
fn test_sitemap_requires_base_url() {
    let dir = create_project();
    let root = dir.path();
    let mut builder =
        SiteBuilder::new(Site::new(root, SiteConfig::default())).with_default_plugins();

    let error = builder.build().unwrap_err();
    assert!(matches!(error.root(), WeftError::MissingBaseUrl));
    assert!(root.join("_site/about.html").exists());
    assert!(!root.join("_site/sitemap.xml").exists());
}

#[test]
fn test_reserved_static_content() {
    let dir = create_project();
    let root = dir.path();
    write(root, "content/static/logo.html", "<p>logo</p>");

    let error = builder_for(root).build().unwrap_err();
    assert!(matches!(error.root(), WeftError::ReservedPath { key, .. } if key == "/static/logo"));
}
