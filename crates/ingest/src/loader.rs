//! Filesystem document loader.

use crate::types::Document;
use docvec_core::{AppError, AppResult};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

/// Which files to load.
#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    /// Files or directories to load
    pub paths: Vec<PathBuf>,

    /// Include patterns (path substrings)
    pub include: Vec<String>,

    /// Exclude patterns (path substrings)
    pub exclude: Vec<String>,
}

/// Load text documents from the configured paths.
///
/// Directories are walked recursively in file-name order, skipping hidden
/// entries. Each file becomes one [`Document`] whose source id is its path.
/// Files that are not valid UTF-8 text are skipped with a warning.
pub fn load_documents(options: &LoadOptions) -> AppResult<Vec<Document>> {
    let mut documents = Vec::new();
    let mut seen = HashSet::new();

    for path in &options.paths {
        if !path.exists() {
            return Err(AppError::Config(format!("Path does not exist: {:?}", path)));
        }

        if path.is_file() {
            if seen.insert(path.clone()) {
                if let Some(doc) = load_file(path)? {
                    documents.push(doc);
                }
            }
            continue;
        }

        for entry in WalkDir::new(path)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| e.depth() == 0 || !is_hidden(e))
            .filter_map(|e| e.ok())
        {
            let entry_path = entry.path();
            if entry.file_type().is_file()
                && should_include(entry_path, options)
                && seen.insert(entry_path.to_path_buf())
            {
                if let Some(doc) = load_file(entry_path)? {
                    documents.push(doc);
                }
            }
        }
    }

    tracing::info!("Loaded {} documents", documents.len());
    Ok(documents)
}

fn load_file(path: &Path) -> AppResult<Option<Document>> {
    let bytes = std::fs::read(path)?;

    let content = match String::from_utf8(bytes) {
        Ok(content) if is_likely_text(&content) => content,
        _ => {
            tracing::warn!("Skipping non-text file: {:?}", path);
            return Ok(None);
        }
    };

    let mut document = Document::new(path.to_string_lossy(), content)
        .with_metadata("size_bytes", path.metadata()?.len());

    if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
        document = document.with_metadata("file_name", name);
    }
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        document = document.with_metadata("extension", ext);
    }

    tracing::debug!("Loaded {:?} ({} bytes)", path, document.content.len());
    Ok(Some(document))
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry
        .file_name()
        .to_str()
        .is_some_and(|name| name.starts_with('.'))
}

fn is_likely_text(data: &str) -> bool {
    !data.contains('\0')
}

/// Excludes win; with no include patterns everything else is included.
fn should_include(path: &Path, options: &LoadOptions) -> bool {
    let path_str = path.to_string_lossy();

    if options.exclude.iter().any(|p| path_str.contains(p.as_str())) {
        return false;
    }

    options.include.is_empty() || options.include.iter().any(|p| path_str.contains(p.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn fixture() -> TempDir {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("b.md"), "# Beta\n\nSecond").unwrap();
        fs::write(dir.path().join("a.txt"), "Alpha").unwrap();
        fs::create_dir(dir.path().join("nested")).unwrap();
        fs::write(dir.path().join("nested").join("c.txt"), "Gamma").unwrap();
        fs::create_dir(dir.path().join(".docvec")).unwrap();
        fs::write(dir.path().join(".docvec").join("config.yaml"), "x: 1").unwrap();
        fs::write(dir.path().join("blob.bin"), [0u8, 159, 146, 150]).unwrap();
        dir
    }

    fn names(docs: &[Document]) -> Vec<String> {
        docs.iter()
            .map(|d| d.metadata["file_name"].as_str().unwrap().to_string())
            .collect()
    }

    #[test]
    fn test_walks_in_order_skipping_hidden_and_binary() {
        let dir = fixture();
        let docs = load_documents(&LoadOptions {
            paths: vec![dir.path().to_path_buf()],
            ..Default::default()
        })
        .unwrap();

        assert_eq!(names(&docs), vec!["a.txt", "b.md", "c.txt"]);
        assert_eq!(docs[0].content, "Alpha");
        assert_eq!(docs[0].metadata["extension"], "txt");
        assert_eq!(docs[0].metadata["size_bytes"], 5);
        assert!(docs[0].source_id.ends_with("a.txt"));
    }

    #[test]
    fn test_include_exclude() {
        let dir = fixture();

        let docs = load_documents(&LoadOptions {
            paths: vec![dir.path().to_path_buf()],
            include: vec![".txt".to_string()],
            exclude: vec!["nested".to_string()],
        })
        .unwrap();

        assert_eq!(names(&docs), vec!["a.txt"]);
    }

    #[test]
    fn test_same_file_loaded_once() {
        let dir = fixture();
        let file = dir.path().join("a.txt");

        let docs = load_documents(&LoadOptions {
            paths: vec![file.clone(), dir.path().to_path_buf(), file],
            ..Default::default()
        })
        .unwrap();

        assert_eq!(names(&docs), vec!["a.txt", "b.md", "c.txt"]);
    }

    #[test]
    fn test_missing_path_is_error() {
        let dir = TempDir::new().unwrap();
        let result = load_documents(&LoadOptions {
            paths: vec![dir.path().join("missing")],
            ..Default::default()
        });
        assert!(matches!(result, Err(AppError::Config(_))));
    }
}
