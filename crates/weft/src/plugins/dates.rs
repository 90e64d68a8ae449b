use crate::error::{IoContext, Result};
use crate::plugin::{Hooks, Plugin};
use crate::site::Site;
use crate::types::{Index, PageUpdate};
use chrono::{DateTime, Utc};
use std::fs;

/// Records file timestamps and the list of updates, newest first.
pub struct PageDates;

impl Plugin for PageDates {
    fn name(&self) -> &str {
        "page-dates"
    }

    fn hooks(&self) -> Hooks {
        Hooks::INDEX
    }

    fn process_index(&self, site: &Site, index: &mut Index) -> Result<()> {
        index.updates.clear();

        for page in index.pages.values_mut() {
            let path = site.path_to_page_content(page);
            let metadata = fs::metadata(&path).io_context("reading metadata of", &path)?;

            page.date_last_modified = metadata.modified().ok().map(DateTime::<Utc>::from);
            // Not every platform records a creation time.
            page.date_created = metadata.created().ok().map(DateTime::<Utc>::from);

            index.updates.push(PageUpdate {
                page_key: page.key.clone(),
                date_last_modified: page.date_last_modified,
            });
        }

        index
            .updates
            .sort_by(|a, b| b.date_last_modified.cmp(&a.date_last_modified));

        site.store.save_updates(&index.updates)
    }
}
