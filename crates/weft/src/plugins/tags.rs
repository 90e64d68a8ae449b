use crate::document::Document;
use crate::error::{Result, WeftError};
use crate::plugin::{Hooks, Plugin};
use crate::site::Site;
use crate::types::{Index, PageRecord, TagEntry};
use indexmap::IndexMap;

const TAGS_ATTR: &str = "data-tags";

pub struct Tags;

impl Plugin for Tags {
    fn name(&self) -> &str {
        "tags"
    }

    fn hooks(&self) -> Hooks {
        Hooks::INDEX_PAGE | Hooks::INDEX
    }

    fn process_index_page(
        &self,
        _site: &Site,
        page: &mut PageRecord,
        content: &Document,
    ) -> Result<()> {
        page.tags = parse_tags(&page.key, content.head_attr(TAGS_ATTR))?;
        Ok(())
    }

    fn process_index(&self, site: &Site, index: &mut Index) -> Result<()> {
        let mut tags: IndexMap<String, TagEntry> = IndexMap::new();
        for page in index.pages.values() {
            for tag in &page.tags {
                tags.entry(tag.clone())
                    .or_insert_with(|| TagEntry {
                        key: tag.clone(),
                        pages: Vec::new(),
                    })
                    .pages
                    .push(page.stub());
            }
        }

        for tag in tags.values() {
            site.store.save_tag(tag)?;
        }
        site.store.save_tags(&tags)?;

        index.tags = tags;
        Ok(())
    }
}

/// Splits a whitespace separated tag list, rejecting anything outside
/// `[A-Za-z0-9-]`. Duplicates are dropped.
pub fn parse_tags(key: &str, attribute: Option<&str>) -> Result<Vec<String>> {
    let mut tags: Vec<String> = Vec::new();

    for tag in attribute.unwrap_or_default().split_whitespace() {
        let valid = tag
            .chars()
            .all(|character| character.is_ascii_alphanumeric() || character == '-');
        if !valid {
            return Err(WeftError::InvalidTag {
                key: key.to_string(),
                tag: tag.to_string(),
            });
        }
        if !tags.iter().any(|existing| existing == tag) {
            tags.push(tag.to_string());
        }
    }

    Ok(tags)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SiteConfig;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_parse_tags() {
        assert_eq!(
            parse_tags("/a", Some("  rust foo-bar2 rust\n web ")).unwrap(),
            vec!["rust", "foo-bar2", "web"]
        );
        assert!(parse_tags("/a", None).unwrap().is_empty());
    }

    #[test]
    fn test_invalid_tag() {
        let result = parse_tags("/a", Some("ok foo_bar"));
        assert!(
            matches!(result, Err(WeftError::InvalidTag { key, tag }) if key == "/a" && tag == "foo_bar")
        );
    }

    #[test]
    fn test_aggregation_persists_tags() {
        let dir = TempDir::new().unwrap();
        let site = Site::new(dir.path(), SiteConfig::default());
        site.store.reset().unwrap();

        let mut index = Index::default();
        let mut first = PageRecord::new("/one", "html");
        first.tags = vec!["foo-bar2".to_string(), "rust".to_string()];
        let mut second = PageRecord::new("/two", "html");
        second.tags = vec!["rust".to_string()];
        index.pages.insert(first.key.clone(), first);
        index.pages.insert(second.key.clone(), second);

        Tags.process_index(&site, &mut index).unwrap();

        let rust: Vec<&str> = index.tags["rust"]
            .pages
            .iter()
            .map(|stub| stub.key.as_str())
            .collect();
        assert_eq!(rust, vec!["/one", "/two"]);

        let saved: TagEntry = serde_json::from_str(
            &fs::read_to_string(dir.path().join("_index/tags/foo-bar2.json")).unwrap(),
        )
        .unwrap();
        assert_eq!(saved.pages.len(), 1);

        let combined: serde_json::Value = serde_json::from_str(
            &fs::read_to_string(dir.path().join("_index/tags.json")).unwrap(),
        )
        .unwrap();
        assert!(combined.get("foo-bar2").is_some());
    }
}
