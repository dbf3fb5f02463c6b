//! Reading documents from disk or stdin.

use std::io::Read;
use std::path::Path;

use formsift_core::Result;
use tracing::debug;
use uuid::Uuid;

use crate::types::Document;

/// Load an OCR text file. The document id is the file stem.
pub fn load_document(path: &Path) -> Result<Document> {
    let content = std::fs::read(path)?;
    let id = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("unknown")
        .to_string();
    debug!("Loaded {} ({} bytes)", path.display(), content.len());
    Ok(Document::new(&id, content))
}

/// Read one document from stdin under a fresh id.
pub fn stdin_document() -> Result<Document> {
    let mut content = Vec::new();
    std::io::stdin().read_to_end(&mut content)?;
    let id = format!("stdin-{}", Uuid::new_v4());
    Ok(Document::new(&id, content))
}
