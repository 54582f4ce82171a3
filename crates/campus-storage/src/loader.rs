//! Populates the knowledge base from a directory of source documents.
//!
//! Text, Markdown and PDF files are read recursively, split into
//! overlapping character windows and written through [`KnowledgeRepository`].

use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use campus_core::config::KnowledgeConfig;
use campus_core::error::CampusError;

use crate::knowledge::KnowledgeRepository;

/// File extensions picked up by the loader.
const SUPPORTED_EXTENSIONS: &[&str] = &["txt", "md", "markdown", "pdf"];

/// Summary of a load run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub files_seen: usize,
    pub files_loaded: usize,
    /// Already present and `upsert` was off.
    pub files_skipped: usize,
    /// Unreadable, unparsable or empty files.
    pub files_failed: usize,
    pub chunks_written: usize,
}

/// Reads documents from disk and chunks them for the knowledge base.
#[derive(Debug, Clone)]
pub struct DocumentLoader {
    data_dir: PathBuf,
    chunk_size: usize,
    chunk_overlap: usize,
}

impl DocumentLoader {
    pub fn new(data_dir: impl Into<PathBuf>, chunk_size: usize, chunk_overlap: usize) -> Self {
        Self {
            data_dir: data_dir.into(),
            chunk_size: chunk_size.max(1),
            chunk_overlap: chunk_overlap.min(chunk_size.saturating_sub(1)),
        }
    }

    pub fn from_config(config: &KnowledgeConfig) -> Self {
        Self::new(&config.data_dir, config.chunk_size, config.chunk_overlap)
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// All supported documents under the data directory, sorted by path.
    pub fn discover(&self) -> Result<Vec<PathBuf>, CampusError> {
        if !self.data_dir.is_dir() {
            return Err(CampusError::Knowledge(format!(
                "knowledge directory {} does not exist",
                self.data_dir.display()
            )));
        }

        let mut files = Vec::new();
        let mut pending = vec![self.data_dir.clone()];
        while let Some(dir) = pending.pop() {
            for entry in std::fs::read_dir(&dir)? {
                let path = entry?.path();
                if path.is_dir() {
                    pending.push(path);
                } else if is_supported(&path) {
                    files.push(path);
                }
            }
        }
        files.sort();
        Ok(files)
    }

    /// Split text into windows of `chunk_size` characters, each starting
    /// `chunk_size - chunk_overlap` characters after the previous one.
    ///
    /// Runs of whitespace are collapsed first so layout noise does not eat
    /// into the window.
    pub fn chunk(&self, text: &str) -> Vec<String> {
        let normalized = text.split_whitespace().collect::<Vec<_>>().join(" ");
        let chars: Vec<char> = normalized.chars().collect();
        let mut chunks = Vec::new();
        let mut start = 0;

        while start < chars.len() {
            let end = (start + self.chunk_size).min(chars.len());
            let chunk: String = chars[start..end].iter().collect();
            let chunk = chunk.trim();
            if !chunk.is_empty() {
                chunks.push(chunk.to_string());
            }
            if end >= chars.len() {
                break;
            }
            start = end - self.chunk_overlap;
        }

        chunks
    }

    /// Load every document into the repository.
    ///
    /// With `upsert` off, sources that already have chunks are left alone;
    /// with it on, their chunks are replaced.
    pub fn load_into(
        &self,
        repo: &KnowledgeRepository,
        upsert: bool,
    ) -> Result<LoadReport, CampusError> {
        let files = self.discover()?;
        let mut report = LoadReport {
            files_seen: files.len(),
            ..LoadReport::default()
        };

        for path in files {
            let source = self.source_key(&path);

            if !upsert && repo.source_exists(&source)? {
                debug!(source = %source, "Knowledge source already loaded, skipping");
                report.files_skipped += 1;
                continue;
            }

            let text = match read_document(&path) {
                Ok(t) => t,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Failed to read document");
                    report.files_failed += 1;
                    continue;
                }
            };

            let chunks = self.chunk(&text);
            if chunks.is_empty() {
                warn!(path = %path.display(), "Document has no text, skipping");
                report.files_failed += 1;
                continue;
            }

            let written = repo.replace_source(&source, &chunks)?;
            debug!(source = %source, chunks = written, "Knowledge source loaded");
            report.files_loaded += 1;
            report.chunks_written += written;
        }

        info!(
            files_seen = report.files_seen,
            files_loaded = report.files_loaded,
            files_skipped = report.files_skipped,
            files_failed = report.files_failed,
            chunks_written = report.chunks_written,
            "Knowledge base load complete"
        );
        Ok(report)
    }

    /// Path relative to the data directory with `/` separators.
    fn source_key(&self, path: &Path) -> String {
        let relative = path.strip_prefix(&self.data_dir).unwrap_or(path);
        relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/")
    }
}

fn extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
}

fn is_supported(path: &Path) -> bool {
    extension(path).is_some_and(|e| SUPPORTED_EXTENSIONS.contains(&e.as_str()))
}

/// Plain text of a document; PDFs go through text extraction.
fn read_document(path: &Path) -> Result<String, CampusError> {
    if extension(path).as_deref() != Some("pdf") {
        return Ok(std::fs::read_to_string(path)?);
    }
    let bytes = std::fs::read(path)?;
    extract_pdf_text(&bytes)
}

fn extract_pdf_text(bytes: &[u8]) -> Result<String, CampusError> {
    // The extractor panics on some malformed files.
    match std::panic::catch_unwind(|| pdf_extract::extract_text_from_mem(bytes)) {
        Ok(Ok(text)) => Ok(text),
        Ok(Err(e)) => Err(CampusError::Knowledge(format!("PDF extraction failed: {}", e))),
        Err(_) => Err(CampusError::Knowledge("PDF extraction panicked".to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::db::Database;
    use crate::search::KnowledgeSearch;

    fn make_repo() -> KnowledgeRepository {
        KnowledgeRepository::new(Arc::new(Database::in_memory().unwrap()))
    }

    fn write(dir: &Path, rel: &str, content: &str) {
        let path = dir.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }

    #[test]
    fn test_chunk_short_text_is_single_chunk() {
        let loader = DocumentLoader::new("unused", 100, 10);
        assert_eq!(loader.chunk("Admissions open in May."), vec!["Admissions open in May."]);
    }

    #[test]
    fn test_chunk_overlap() {
        let loader = DocumentLoader::new("unused", 10, 3);
        let chunks = loader.chunk("abcdefghijklmnopqrstuvwxyz");
        assert_eq!(chunks[0], "abcdefghij");
        assert_eq!(chunks[1], "hijklmnopq");
        assert!(chunks.last().unwrap().ends_with('z'));
    }

    #[test]
    fn test_chunk_collapses_whitespace() {
        let loader = DocumentLoader::new("unused", 100, 0);
        assert_eq!(loader.chunk("  fee\n\n\tstructure  "), vec!["fee structure"]);
        assert!(loader.chunk(" \n\t ").is_empty());
    }

    #[test]
    fn test_chunk_handles_multibyte_text() {
        let loader = DocumentLoader::new("unused", 4, 1);
        let chunks = loader.chunk("छात्रावास शुल्क");
        assert!(chunks.len() > 1);
        assert!(chunks.iter().all(|c| c.chars().count() <= 4));
    }

    #[test]
    fn test_overlap_is_clamped_below_chunk_size() {
        let loader = DocumentLoader::new("unused", 5, 50);
        // Must terminate and make progress.
        let chunks = loader.chunk("abcdefghijkl");
        assert!(chunks.len() >= 2);
    }

    #[test]
    fn test_discover_filters_extensions_recursively() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "fees.md", "fees");
        write(dir.path(), "hostel/rooms.txt", "rooms");
        write(dir.path(), "brochure.PDF", "%PDF");
        write(dir.path(), "image.png", "png");
        write(dir.path(), "notes.docx", "docx");

        let loader = DocumentLoader::new(dir.path(), 100, 10);
        let files = loader.discover().unwrap();
        assert_eq!(files.len(), 3);
    }

    #[test]
    fn test_discover_missing_dir() {
        let loader = DocumentLoader::new("/nonexistent/knowledge", 100, 10);
        assert!(matches!(loader.discover(), Err(CampusError::Knowledge(_))));
    }

    #[test]
    fn test_load_into_and_skip_existing() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "fees.md", "Tuition fee details for B.Tech");
        write(dir.path(), "hostel/rooms.txt", "Twin sharing rooms with mess");
        write(dir.path(), "empty.txt", "   ");

        let repo = make_repo();
        let loader = DocumentLoader::new(dir.path(), 100, 10);

        let first = loader.load_into(&repo, false).unwrap();
        assert_eq!(first.files_seen, 3);
        assert_eq!(first.files_loaded, 2);
        assert_eq!(first.files_failed, 1);
        assert_eq!(first.chunks_written, 2);
        assert_eq!(
            repo.sources().unwrap(),
            vec!["fees.md".to_string(), "hostel/rooms.txt".to_string()]
        );

        let second = loader.load_into(&repo, false).unwrap();
        assert_eq!(second.files_loaded, 0);
        assert_eq!(second.files_skipped, 2);
        assert_eq!(repo.count().unwrap(), 2);
    }

    #[test]
    fn test_load_into_upsert_replaces() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "fees.md", "old text");
        let repo = make_repo();
        let loader = DocumentLoader::new(dir.path(), 100, 10);
        loader.load_into(&repo, false).unwrap();

        write(dir.path(), "fees.md", "new text");
        let report = loader.load_into(&repo, true).unwrap();
        assert_eq!(report.files_loaded, 1);
        assert_eq!(report.files_skipped, 0);
        assert_eq!(repo.count().unwrap(), 1);
    }

    const HOSTEL_PDF: &[u8] = include_bytes!("../tests/fixtures/hostel.pdf");

    #[test]
    fn test_extract_pdf_text() {
        let text = extract_pdf_text(HOSTEL_PDF).unwrap();
        let words: Vec<&str> = text.split_whitespace().collect();
        for word in ["Hostel", "admissions", "June", "Scholarship", "registrar"] {
            assert!(words.contains(&word), "missing {:?} in {:?}", word, text);
        }
    }

    #[test]
    fn test_load_pdf_into_searchable_chunks() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("brochures")).unwrap();
        std::fs::write(dir.path().join("brochures/hostel.pdf"), HOSTEL_PDF).unwrap();
        std::fs::write(dir.path().join("broken.pdf"), b"not a pdf at all").unwrap();

        let db = Arc::new(Database::in_memory().unwrap());
        let repo = KnowledgeRepository::new(Arc::clone(&db));
        let loader = DocumentLoader::new(dir.path(), 1000, 100);
        let report = loader.load_into(&repo, false).unwrap();
        assert_eq!(report.files_seen, 2);
        assert_eq!(report.files_loaded, 1);
        assert_eq!(report.files_failed, 1);
        assert_eq!(repo.sources().unwrap(), vec!["brochures/hostel.pdf".to_string()]);

        let hits = KnowledgeSearch::new(db)
            .search("Where are the scholarship forms?", 4)
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].source, "brochures/hostel.pdf");
    }
}
