use crate::document::{Document, Rewrite};
use crate::error::Result;
use crate::plugin::{Hooks, Plugin};
use crate::site::Site;
use crate::types::PageRecord;
use serde_json::{Map, Value};
use std::collections::HashSet;

const PAGE_PREFIX: &str = "data-page-";
const PLUGIN_PREFIX: &str = "data-plugin-";
const OMIT_PREFIX: &str = "data-plugin-attributes-omit-";
const EMPTY_PREFIX: &str = "data-plugin-attributes-empty-";

/// Lifts `data-page-*` and `data-plugin-*` attributes of the content head into
/// the index, and writes page attributes into matching layout elements.
pub struct PageAttributes;

impl Plugin for PageAttributes {
    fn name(&self) -> &str {
        "page-attributes"
    }

    fn hooks(&self) -> Hooks {
        Hooks::INDEX_PAGE | Hooks::LAYOUT
    }

    fn process_index_page(
        &self,
        _site: &Site,
        page: &mut PageRecord,
        content: &Document,
    ) -> Result<()> {
        for (name, value) in content.head_attrs() {
            if let Some(attribute) = name.strip_prefix(PAGE_PREFIX) {
                page.attributes
                    .insert(attribute.to_string(), value.to_string());
            } else if let Some(rest) = name.strip_prefix(PLUGIN_PREFIX) {
                insert_plugin_attribute(&mut page.plugin_attributes, rest, value);
            }
        }
        Ok(())
    }

    fn process_layout(
        &self,
        _site: &Site,
        page: &PageRecord,
        layout: &mut Document,
        content: &Document,
    ) -> Result<()> {
        let mut omit = HashSet::new();
        let mut empty = HashSet::new();
        for (name, _) in content.head_attrs() {
            if let Some(attribute) = name.strip_prefix(OMIT_PREFIX) {
                omit.insert(attribute.to_string());
            } else if let Some(attribute) = name.strip_prefix(EMPTY_PREFIX) {
                empty.insert(attribute.to_string());
            }
        }

        // Every page attribute applies in turn: an omitted one removes the
        // element for good, otherwise the last match decides its text.
        *layout = layout.rewrite(|element| {
            let matching: Vec<(&String, &String)> = page
                .attributes
                .iter()
                .filter(|(attribute, _)| {
                    element
                        .value()
                        .attr(&format!("{PAGE_PREFIX}{attribute}"))
                        .is_some()
                })
                .collect();

            if matching
                .iter()
                .any(|(attribute, _)| omit.contains(*attribute))
            {
                return Ok(Rewrite::Replace(String::new()));
            }

            Ok(match matching.last() {
                None => Rewrite::Keep,
                Some((attribute, _)) if empty.contains(*attribute) => Rewrite::Text(String::new()),
                Some((_, value)) => Rewrite::Text((*value).clone()),
            })
        })?;

        Ok(())
    }
}

/// `plugin` alone sets a value; `plugin-attr` sets a key of the plugin's object.
fn insert_plugin_attribute(attributes: &mut Map<String, Value>, name: &str, value: &str) {
    match name.split_once('-') {
        None => {
            attributes.insert(name.to_string(), Value::String(value.to_string()));
        }
        Some((plugin, attribute)) => {
            let entry = attributes
                .entry(plugin.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            if !entry.is_object() {
                *entry = Value::Object(Map::new());
            }
            if let Value::Object(map) = entry {
                map.insert(attribute.to_string(), Value::String(value.to_string()));
            }
        }
    }
}
