//! Writing documents to disk.
use std::path::{Path, PathBuf};

use crate::document::DocumentSet;
use crate::errors::OutputError;

/// Write every document as indented JSON to `<dir>/<document-name>`,
/// creating `dir` if needed. Returns the written paths.
pub fn write_documents(dir: &Path, documents: &DocumentSet) -> Result<Vec<PathBuf>, OutputError> {
    std::fs::create_dir_all(dir).map_err(|source| OutputError::CreateDir {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut written = Vec::with_capacity(documents.len());
    for (name, document) in documents.iter() {
        let text = serde_json::to_string_pretty(document).map_err(|source| OutputError::Serialize {
            name: name.to_string(),
            source,
        })?;
        let path = dir.join(name);
        std::fs::write(&path, text).map_err(|source| OutputError::Write {
            path: path.clone(),
            source,
        })?;
        tracing::debug!(path = %path.display(), "wrote document");
        written.push(path);
    }
    Ok(written)
}
