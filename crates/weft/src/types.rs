use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

pub const ROOT_KEY: &str = "/";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageRecord {
    pub key: String,
    pub extension: String,
    pub href: String,
    pub attributes: BTreeMap<String, String>,
    #[serde(default)]
    pub ancestors: Vec<Stub>,
    #[serde(default)]
    pub children: IndexMap<String, Stub>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_created: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_last_modified: Option<DateTime<Utc>>,
    #[serde(default)]
    pub plugin_attributes: Map<String, Value>,
}

impl PageRecord {
    pub fn new(key: impl Into<String>, extension: impl Into<String>) -> Self {
        let key = key.into();
        let href = href_for(&key);
        let mut attributes = BTreeMap::new();
        attributes.insert("title".to_string(), key.clone());

        Self {
            key,
            extension: extension.into(),
            href,
            attributes,
            ancestors: Vec::new(),
            children: IndexMap::new(),
            tags: Vec::new(),
            hash: None,
            date_created: None,
            date_last_modified: None,
            plugin_attributes: Map::new(),
        }
    }

    pub fn title(&self) -> &str {
        self.attributes
            .get("title")
            .map(String::as_str)
            .unwrap_or(&self.key)
    }

    pub fn stub(&self) -> Stub {
        Stub {
            key: self.key.clone(),
            href: self.href.clone(),
            title: self.title().to_string(),
        }
    }

    pub fn is_directory(&self) -> bool {
        self.key.ends_with('/')
    }

    /// Looks up `pluginAttributes[plugin][attribute]`.
    pub fn plugin_attribute(&self, plugin: &str, attribute: &str) -> Option<&Value> {
        self.plugin_attributes
            .get(plugin)
            .and_then(|value| value.as_object())
            .and_then(|map| map.get(attribute))
    }
}

/// Directory keys render to their `index.html`, everything else gains `.html`.
pub fn href_for(key: &str) -> String {
    if key.ends_with('/') {
        format!("{key}index.html")
    } else {
        format!("{key}.html")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stub {
    pub key: String,
    pub href: String,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TagEntry {
    pub key: String,
    pub pages: Vec<Stub>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageUpdate {
    pub page_key: String,
    pub date_last_modified: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Index {
    pub pages: IndexMap<String, PageRecord>,
    pub tags: IndexMap<String, TagEntry>,
    pub updates: Vec<PageUpdate>,
}

impl Index {
    pub fn page(&self, key: &str) -> Option<&PageRecord> {
        self.pages.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.pages.contains_key(key)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BuildState {
    Indexing,
    Building,
    Ready,
}

impl std::fmt::Display for BuildState {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            BuildState::Indexing => "INDEXING",
            BuildState::Building => "BUILDING",
            BuildState::Ready => "READY",
        };
        formatter.write_str(name)
    }
}
