use crate::error::Result;
use crate::plugin::{Hooks, Plugin};
use crate::site::Site;
use crate::types::{Index, PageRecord, ROOT_KEY};

/// Derives `ancestors` and `children` from key prefixes.
///
/// A directory without an index page breaks the chain: it appears in no
/// ancestor list and collects no children.
pub struct Ancestry;

impl Plugin for Ancestry {
    fn name(&self) -> &str {
        "ancestry"
    }

    fn hooks(&self) -> Hooks {
        Hooks::INDEX
    }

    fn process_index(&self, _site: &Site, index: &mut Index) -> Result<()> {
        let root = index.page(ROOT_KEY).map(PageRecord::stub);
        let keys: Vec<String> = index.pages.keys().cloned().collect();

        for key in keys {
            let Some(stub) = index.page(&key).map(PageRecord::stub) else {
                continue;
            };

            let segments: Vec<&str> = key.split('/').filter(|segment| !segment.is_empty()).collect();

            let mut ancestors = Vec::new();
            if key != ROOT_KEY {
                ancestors.extend(root.clone());
            }

            let mut parent_key = String::from(ROOT_KEY);
            for segment in segments.iter().take(segments.len().saturating_sub(1)) {
                parent_key.push_str(segment);
                parent_key.push('/');
                if let Some(ancestor) = index.page(&parent_key) {
                    ancestors.push(ancestor.stub());
                }
            }

            if !segments.is_empty() {
                if let Some(parent) = index.pages.get_mut(&parent_key) {
                    parent.children.insert(key.clone(), stub);
                }
            }

            if let Some(page) = index.pages.get_mut(&key) {
                page.ancestors = ancestors;
            }
        }

        Ok(())
    }
}
