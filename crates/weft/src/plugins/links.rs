use crate::error::{Result, WeftError};
use crate::plugin::{Hooks, Plugin};
use crate::site::Site;
use crate::types::{Index, PageRecord};
use tracing::{debug, warn};

const STATIC_PREFIX: &str = "/static/";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Link {
    Valid,
    Ignored,
    Invalid,
}

/// Fails indexing when a page links to a page or static file that does not
/// exist. External links and links opening a new window are not checked.
pub struct LinkChecker;

impl Plugin for LinkChecker {
    fn name(&self) -> &str {
        "link-checker"
    }

    fn hooks(&self) -> Hooks {
        Hooks::INDEX
    }

    fn process_index(&self, site: &Site, index: &mut Index) -> Result<()> {
        for page in index.pages.values() {
            let content = site.decode_page(page)?;
            let mut invalid = Vec::new();

            for anchor in content.select("a")? {
                if anchor.value().attr("target") == Some("_blank") {
                    continue;
                }
                let Some(href) = anchor.value().attr("href") else {
                    continue;
                };
                if href.trim().is_empty() {
                    continue;
                }

                match check(site, index, page, href) {
                    Link::Valid => debug!(key = %page.key, href, "valid link"),
                    Link::Ignored => debug!(key = %page.key, href, "ignored link"),
                    Link::Invalid => {
                        warn!(key = %page.key, href, "invalid link");
                        invalid.push(href.to_string());
                    }
                }
            }

            if !invalid.is_empty() {
                return Err(WeftError::BrokenLinks {
                    key: page.key.clone(),
                    links: invalid,
                });
            }
        }

        Ok(())
    }
}

fn check(site: &Site, index: &Index, page: &PageRecord, href: &str) -> Link {
    let lower = href.to_ascii_lowercase();
    if lower.starts_with("http://") || lower.starts_with("https://") {
        return Link::Ignored;
    }

    let without_query = href.split('?').next().unwrap_or_default();
    let target = match without_query.find('#') {
        Some(position) => &without_query[..position],
        None => without_query,
    };

    if target.is_empty() {
        return Link::Ignored;
    }

    if let Some(relative) = target.strip_prefix(STATIC_PREFIX) {
        return exists(site.path_to_static_file(relative).is_file());
    }

    if target.ends_with('/') {
        let resolved = resolve(&page.key, &format!("{target}index"));
        let key = resolved.strip_suffix("index").unwrap_or(&resolved);
        return exists(index.contains(key));
    }

    let Some(target) = target.strip_suffix(".html") else {
        return Link::Invalid;
    };

    let mut key = resolve(&page.key, target);
    if key.ends_with("/index") {
        key.truncate(key.len() - "index".len());
    }

    if key == page.key {
        Link::Ignored
    } else {
        exists(index.contains(&key))
    }
}

fn exists(found: bool) -> Link {
    if found { Link::Valid } else { Link::Invalid }
}

/// Resolves `target` against the directory of `key`, the way a browser
/// resolves a link on the rendered page.
fn resolve(key: &str, target: &str) -> String {
    let base = match key.rfind('/') {
        Some(position) => &key[..=position],
        None => "/",
    };

    let joined = if target.starts_with('/') {
        target.to_string()
    } else {
        format!("{base}{target}")
    };

    let mut segments: Vec<&str> = Vec::new();
    for segment in joined.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            segment => segments.push(segment),
        }
    }

    format!("/{}", segments.join("/"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SiteConfig;
    use std::fs;
    use tempfile::TempDir;

    fn create_site(pages: &[(&str, &str)]) -> (TempDir, Site, Index) {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("static/css")).unwrap();
        fs::write(dir.path().join("static/css/site.css"), "").unwrap();

        let site = Site::new(dir.path(), SiteConfig::default());
        let mut index = Index::default();
        for (key, body) in pages {
            let page = PageRecord::new(*key, "html");
            let path = site.path_to_page_content(&page);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(&path, body).unwrap();
            index.pages.insert(page.key.clone(), page);
        }
        (dir, site, index)
    }

    #[test]
    fn test_resolve() {
        assert_eq!(resolve("/blog/post", "other"), "/blog/other");
        assert_eq!(resolve("/blog/", "other"), "/blog/other");
        assert_eq!(resolve("/blog/post", "../about"), "/about");
        assert_eq!(resolve("/blog/post", "/about"), "/about");
        assert_eq!(resolve("/", "../../x"), "/x");
    }

    #[test]
    fn test_link_rules() {
        let (_dir, site, index) = create_site(&[
            ("/", "<p></p>"),
            ("/about", "<p></p>"),
            ("/blog/", "<p></p>"),
            ("/blog/post", "<p></p>"),
        ]);
        let post = index.pages["/blog/post"].clone();
        let status = |href: &str| check(&site, &index, &post, href);

        assert_eq!(status("http://external.example"), Link::Ignored);
        assert_eq!(status("HTTPS://external.example/x"), Link::Ignored);
        assert_eq!(status("#top"), Link::Ignored);
        assert_eq!(status("post.html"), Link::Ignored);
        assert_eq!(status("../about.html?x=1#y"), Link::Valid);
        assert_eq!(status("/about.html"), Link::Valid);
        assert_eq!(status("index.html"), Link::Valid);
        assert_eq!(status("../index.html"), Link::Valid);
        assert_eq!(status("./"), Link::Valid);
        assert_eq!(status("/"), Link::Valid);
        assert_eq!(status("/missing/"), Link::Invalid);
        assert_eq!(status("/missing.html"), Link::Invalid);
        assert_eq!(status("/about"), Link::Invalid);
        assert_eq!(status("/static/css/site.css"), Link::Valid);
        assert_eq!(status("/static/css/missing.css"), Link::Invalid);
    }

    #[test]
    fn test_broken_links_fail_page() {
        let (_dir, site, mut index) = create_site(&[
            ("/", r#"<a href="/about.html">ok</a><a href="/gone.html">x</a><a href="nope.html">y</a><a href="/gone.html" target="_blank">z</a><a>no href</a>"#),
            ("/about", "<p></p>"),
        ]);

        let error = LinkChecker.process_index(&site, &mut index).unwrap_err();
        match error {
            WeftError::BrokenLinks { key, links } => {
                assert_eq!(key, "/");
                assert_eq!(links, vec!["/gone.html", "nope.html"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_external_links_pass() {
        let (_dir, site, mut index) = create_site(&[(
            "/",
            r#"<a href="http://external.example">x</a><a href="">empty</a>"#,
        )]);
        LinkChecker.process_index(&site, &mut index).unwrap();
    }
}
