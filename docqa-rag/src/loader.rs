//! Reads a directory of source files into [`Document`]s.
//!
//! PDFs produce one document per page; plain-text and markdown files produce
//! one document each. A file that fails to parse is logged and reported in
//! the [`LoadReport`]; it never aborts the rest of the batch.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::document::{Document, Metadata};
use crate::error::{RagError, Result};

/// Metadata key holding the 1-based page number of a PDF page.
pub const PAGE_KEY: &str = "page";

/// The kinds of files the loader knows how to parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    /// Portable Document Format, split by page.
    Pdf,
    /// UTF-8 plain text or markdown, loaded whole.
    Text,
}

impl FileKind {
    /// Classify a path by its extension, case-insensitively.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "pdf" => Some(Self::Pdf),
            "txt" | "md" => Some(Self::Text),
            _ => None,
        }
    }
}

/// The outcome of loading a directory.
#[derive(Debug, Default)]
pub struct LoadReport {
    /// Documents parsed from every readable file, in file order.
    pub documents: Vec<Document>,
    /// Files that could not be parsed.
    pub failures: Vec<RagError>,
}

/// Loads supported files from a single directory level.
#[derive(Debug, Clone)]
pub struct DocumentLoader {
    kinds: Vec<FileKind>,
}

impl Default for DocumentLoader {
    fn default() -> Self {
        Self { kinds: vec![FileKind::Pdf, FileKind::Text] }
    }
}

impl DocumentLoader {
    /// Create a loader that accepts every supported file kind.
    pub fn new() -> Self {
        Self::default()
    }

    /// Restrict the loader to the given file kinds.
    pub fn with_kinds(kinds: impl IntoIterator<Item = FileKind>) -> Self {
        Self { kinds: kinds.into_iter().collect() }
    }

    /// List supported files directly under `dir`, sorted by path.
    ///
    /// Entries that cannot be inspected are logged and left out; use
    /// [`load_directory`](Self::load_directory) to have them reported.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Load`] if `dir` does not exist or is not a directory.
    pub fn discover(&self, dir: &Path) -> Result<Vec<PathBuf>> {
        self.scan(dir).map(|(files, _)| files)
    }

    /// Supported files under `dir`, plus an error for every entry walkdir
    /// could not read. Symlinks are followed, so a dangling link is an error.
    fn scan(&self, dir: &Path) -> Result<(Vec<PathBuf>, Vec<RagError>)> {
        if !dir.is_dir() {
            return Err(RagError::load(dir, "not a readable directory"));
        }

        let mut files = Vec::new();
        let mut failures = Vec::new();
        for entry in WalkDir::new(dir).min_depth(1).max_depth(1).follow_links(true) {
            match entry {
                Ok(entry) => {
                    let supported = FileKind::from_path(entry.path())
                        .is_some_and(|kind| self.kinds.contains(&kind));
                    if entry.file_type().is_file() && supported {
                        files.push(entry.into_path());
                    }
                }
                Err(e) => {
                    let path = e.path().unwrap_or(dir).to_path_buf();
                    warn!(path = %path.display(), error = %e, "cannot read directory entry");
                    failures.push(RagError::load(path, e.to_string()));
                }
            }
        }

        files.sort();
        Ok((files, failures))
    }

    /// Load every supported file under `dir`.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Load`] only when the directory itself is unusable.
    /// Per-file failures, including unreadable directory entries, are
    /// collected in [`LoadReport::failures`].
    pub fn load_directory(&self, dir: &Path) -> Result<LoadReport> {
        let (files, failures) = self.scan(dir)?;
        let mut report = LoadReport { documents: Vec::new(), failures };

        for path in files {
            match self.load_file(&path) {
                Ok(documents) => {
                    debug!(path = %path.display(), documents = documents.len(), "loaded file");
                    report.documents.extend(documents);
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "skipping unreadable file");
                    report.failures.push(e);
                }
            }
        }

        info!(
            dir = %dir.display(),
            documents = report.documents.len(),
            failures = report.failures.len(),
            "loaded documents"
        );
        Ok(report)
    }

    /// Parse a single file into documents stamped with `source = <file name>`.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Load`] if the file kind is unsupported, the file
    /// cannot be read, or its content cannot be parsed.
    pub fn load_file(&self, path: &Path) -> Result<Vec<Document>> {
        let source = path
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| RagError::load(path, "file name is not valid UTF-8"))?
            .to_string();

        match FileKind::from_path(path) {
            Some(FileKind::Pdf) => load_pdf(path, &source),
            Some(FileKind::Text) => {
                let content =
                    fs::read_to_string(path).map_err(|e| RagError::load(path, e.to_string()))?;
                Ok(vec![Document::new(content, Metadata::new(source))])
            }
            None => Err(RagError::load(path, "unsupported file extension")),
        }
    }
}

fn load_pdf(path: &Path, source: &str) -> Result<Vec<Document>> {
    let pdf = lopdf::Document::load(path).map_err(|e| RagError::load(path, e.to_string()))?;

    let mut documents = Vec::new();
    for page_number in pdf.get_pages().into_keys() {
        let content = pdf
            .extract_text(&[page_number])
            .map_err(|e| RagError::load(path, format!("page {page_number}: {e}")))?;
        let metadata = Metadata::new(source).with(PAGE_KEY, page_number.to_string());
        documents.push(Document::new(content, metadata));
    }

    Ok(documents)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_supported_extensions() {
        assert_eq!(FileKind::from_path(Path::new("a.PDF")), Some(FileKind::Pdf));
        assert_eq!(FileKind::from_path(Path::new("notes.md")), Some(FileKind::Text));
        assert_eq!(FileKind::from_path(Path::new("notes.txt")), Some(FileKind::Text));
        assert_eq!(FileKind::from_path(Path::new("image.png")), None);
        assert_eq!(FileKind::from_path(Path::new("README")), None);
    }

    #[test]
    fn discovers_only_top_level_supported_files() {
        let temp = tempfile::tempdir().unwrap();
        let root = temp.path();
        fs::create_dir_all(root.join("nested")).unwrap();
        fs::write(root.join("b.txt"), "b").unwrap();
        fs::write(root.join("a.md"), "a").unwrap();
        fs::write(root.join("c.png"), "c").unwrap();
        fs::write(root.join("nested/d.txt"), "d").unwrap();

        let files = DocumentLoader::new().discover(root).unwrap();
        let names: Vec<_> =
            files.iter().map(|p| p.file_name().unwrap().to_str().unwrap()).collect();
        assert_eq!(names, vec!["a.md", "b.txt"]);
    }

    #[test]
    fn stamps_source_with_file_name() {
        let temp = tempfile::tempdir().unwrap();
        fs::write(temp.path().join("geo.txt"), "The capital of Francia is Paris.").unwrap();

        let report = DocumentLoader::new().load_directory(temp.path()).unwrap();
        assert!(report.failures.is_empty());
        assert_eq!(report.documents.len(), 1);
        assert_eq!(report.documents[0].metadata.source, "geo.txt");
        assert_eq!(report.documents[0].content, "The capital of Francia is Paris.");
    }

    #[test]
    fn unparsable_file_is_skipped_not_fatal() {
        let temp = tempfile::tempdir().unwrap();
        fs::write(temp.path().join("broken.pdf"), b"definitely not a pdf").unwrap();
        fs::write(temp.path().join("ok.txt"), "still loaded").unwrap();

        let report = DocumentLoader::new().load_directory(temp.path()).unwrap();
        assert_eq!(report.documents.len(), 1);
        assert_eq!(report.documents[0].metadata.source, "ok.txt");
        assert_eq!(report.failures.len(), 1);
        assert!(matches!(
            &report.failures[0],
            RagError::Load { path, .. } if path.ends_with("broken.pdf")
        ));
    }

    #[test]
    fn missing_directory_is_an_error() {
        let temp = tempfile::tempdir().unwrap();
        let err = DocumentLoader::new().load_directory(&temp.path().join("absent")).unwrap_err();
        assert!(matches!(err, RagError::Load { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn dangling_symlink_is_reported_not_dropped() {
        let temp = tempfile::tempdir().unwrap();
        fs::write(temp.path().join("a.txt"), "kept").unwrap();
        std::os::unix::fs::symlink(temp.path().join("gone.txt"), temp.path().join("link.txt"))
            .unwrap();

        let report = DocumentLoader::new().load_directory(temp.path()).unwrap();
        assert_eq!(report.documents.len(), 1);
        assert_eq!(report.failures.len(), 1);
        assert!(matches!(
            &report.failures[0],
            RagError::Load { path, .. } if path.ends_with("link.txt")
        ));
    }

    #[cfg(unix)]
    #[test]
    fn symlinked_file_is_loaded() {
        let temp = tempfile::tempdir().unwrap();
        let outside = tempfile::tempdir().unwrap();
        fs::write(outside.path().join("real.txt"), "linked content").unwrap();
        std::os::unix::fs::symlink(outside.path().join("real.txt"), temp.path().join("b.txt"))
            .unwrap();

        let report = DocumentLoader::new().load_directory(temp.path()).unwrap();
        assert!(report.failures.is_empty());
        assert_eq!(report.documents[0].metadata.source, "b.txt");
        assert_eq!(report.documents[0].content, "linked content");
    }

    #[test]
    fn kind_filter_limits_discovery() {
        let temp = tempfile::tempdir().unwrap();
        fs::write(temp.path().join("a.txt"), "a").unwrap();
        let files = DocumentLoader::with_kinds([FileKind::Pdf]).discover(temp.path()).unwrap();
        assert!(files.is_empty());
    }
}
