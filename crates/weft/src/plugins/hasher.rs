use crate::document::Document;
use crate::error::Result;
use crate::plugin::{Hooks, Plugin};
use crate::site::Site;
use crate::types::PageRecord;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use sha2::{Digest, Sha256};

/// base64(sha256) of the decoded page markup.
pub struct ContentHasher;

impl Plugin for ContentHasher {
    fn name(&self) -> &str {
        "content-hasher"
    }

    fn hooks(&self) -> Hooks {
        Hooks::INDEX_PAGE
    }

    fn process_index_page(
        &self,
        _site: &Site,
        page: &mut PageRecord,
        content: &Document,
    ) -> Result<()> {
        let digest = Sha256::digest(content.html().as_bytes());
        page.hash = Some(STANDARD.encode(digest));
        Ok(())
    }
}
