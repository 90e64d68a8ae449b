use crate::error::{Result, WeftError};
use crate::plugin::{Hooks, Plugin};
use crate::site::Site;
use crate::store::write_file;
use crate::types::{Index, PageRecord};
use tracing::info;

const SITEMAP_FILE_NAME: &str = "sitemap.xml";

/// Writes `sitemap.xml` at the output root once every page is built.
///
/// A page is left out when its head carries `data-plugin-sitemap-exclude`, or
/// when any of its ancestors does.
pub struct Sitemap;

impl Plugin for Sitemap {
    fn name(&self) -> &str {
        "sitemap"
    }

    fn hooks(&self) -> Hooks {
        Hooks::AFTER_BUILD
    }

    fn after_build(&self, site: &Site, index: &Index) -> Result<()> {
        let base_url = site.base_url().ok_or(WeftError::MissingBaseUrl)?;

        if let Some(page) = index
            .pages
            .values()
            .find(|page| page.key == "/sitemap" && page.extension == "xml")
        {
            return Err(WeftError::ReservedSitemapPath {
                key: page.key.clone(),
            });
        }

        let mut urls = String::new();
        let mut count = 0usize;
        for page in index.pages.values() {
            if is_excluded(page) || excluded_by_ancestor(index, page) {
                continue;
            }

            urls.push_str(&format!(
                "  <url>\n    <loc>{}</loc>\n",
                escape(&format!("{base_url}{}", page.href))
            ));
            if let Some(modified) = page.date_last_modified {
                urls.push_str(&format!(
                    "    <lastmod>{}</lastmod>\n",
                    modified.format("%Y-%m-%d")
                ));
            }
            urls.push_str("  </url>\n");
            count += 1;
        }

        let sitemap = format!(
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
             <urlset xmlns=\"http://www.sitemaps.org/schemas/sitemap/0.9\">\n\
             {urls}</urlset>\n"
        );

        let path = site.paths.output_dir.join(SITEMAP_FILE_NAME);
        write_file(&path, sitemap.as_bytes())?;
        info!(urls = count, path = %path.display(), "wrote sitemap");

        Ok(())
    }
}

fn is_excluded(page: &PageRecord) -> bool {
    page.plugin_attribute("sitemap", "exclude").is_some()
}

fn excluded_by_ancestor(index: &Index, page: &PageRecord) -> bool {
    page.ancestors
        .iter()
        .filter_map(|ancestor| index.page(&ancestor.key))
        .any(is_excluded)
}

fn escape(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}
