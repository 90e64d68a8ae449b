//! Built-in plugins. Each one uses only the public plugin protocol.

mod ancestry;
mod attributes;
mod dates;
mod hasher;
mod links;
mod sitemap;
mod tags;

pub use ancestry::Ancestry;
pub use attributes::PageAttributes;
pub use dates::PageDates;
pub use hasher::ContentHasher;
pub use links::LinkChecker;
pub use sitemap::Sitemap;
pub use tags::{Tags, parse_tags};

use crate::plugin::{Plugin, PluginRegistry};
use std::sync::Arc;

pub fn register_defaults(registry: &mut PluginRegistry) {
    let attributes: Arc<dyn Plugin> = Arc::new(PageAttributes);

    registry.use_index_plugin(attributes.clone());
    registry.use_index_plugin(Arc::new(PageDates));
    registry.use_index_plugin(Arc::new(Ancestry));
    registry.use_index_plugin(Arc::new(LinkChecker));
    registry.use_index_plugin(Arc::new(Tags));
    registry.use_index_plugin(Arc::new(ContentHasher));

    registry.use_layout_plugin(attributes);

    registry.use_build_plugin(Arc::new(Sitemap));
}
