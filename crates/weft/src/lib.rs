pub mod composer;
pub mod config;
pub mod document;
pub mod error;
pub mod indexer;
pub mod plugin;
pub mod plugins;
pub mod reader;
pub mod site;
pub mod store;
pub mod types;

pub use composer::*;
pub use config::*;
pub use document::*;
pub use error::*;
pub use indexer::*;
pub use plugin::*;
pub use reader::*;
pub use site::*;
pub use store::*;
pub use types::*;
