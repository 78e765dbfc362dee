//! The batch orchestrator: walks a folder and drives every accepted image
//! through validation, canonicalization, tagging, and relocation into the
//! tagged collection.
//!
//! Files are processed sequentially and in isolation: one file's failure is
//! logged and counted, never allowed to abort the batch. A file is moved
//! into the tagged collection only when its entire pass finished without a
//! single error, so the collection never contains a half-processed image.

use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::{
    error::Result,
    file::has_extension,
    metadata,
    pipeline::{ImageSource, ImageTagger},
};

/// Extensions accepted at ingestion.
pub const INGEST_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "bmp"];

/// Aggregate outcome of one batch run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BatchReport {
    /// Errors across all files; a batch always completes and reports this.
    pub total_errors: usize,
    /// Files that matched the accepted extensions and were attempted.
    pub processed: usize,
    /// Files that finished cleanly and moved into the tagged collection.
    pub relocated: usize,
}

/// Processes every accepted image in `source`, relocating the successfully
/// tagged ones into `tagged`.
pub fn process_folder(
    source: &Path,
    tagged: &Path,
    tagger: &mut dyn ImageTagger,
) -> Result<BatchReport> {
    fs::create_dir_all(tagged)?;

    let mut files: Vec<PathBuf> = fs::read_dir(source)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file() && has_extension(path, INGEST_EXTENSIONS))
        .collect();
    files.sort();

    let mut report = BatchReport::default();
    for path in files {
        report.processed += 1;

        // Validated: the container must decode before anything touches it.
        if let Err(e) = image::open(&path) {
            tracing::warn!("error verifying image {}: {}", path.display(), e);
            report.total_errors += 1;
            continue;
        }

        let jpg_path = match metadata::canonicalize(&path) {
            Ok(p) => p,
            Err(e) => {
                tracing::warn!("error converting {}: {}", path.display(), e);
                report.total_errors += 1;
                continue;
            }
        };

        let mut error_count = 0usize;
        match tagger.tag_image(ImageSource::Path(jpg_path.clone())) {
            Ok(tags) => {
                if let Err(e) = metadata::embed_tags(&jpg_path, &tags) {
                    tracing::warn!("error adding tags to {}: {}", jpg_path.display(), e);
                    error_count += 1;
                }
            }
            Err(e) => {
                tracing::warn!("error tagging {}: {}", jpg_path.display(), e);
                error_count += 1;
            }
        }

        // Relocate only a file whose pass was entirely clean; anything else
        // stays at its current (possibly canonicalized) path, uncommitted.
        if error_count == 0 {
            match jpg_path.file_name() {
                Some(name) => {
                    let dest = tagged.join(name);
                    match fs::rename(&jpg_path, &dest) {
                        Ok(()) => {
                            report.relocated += 1;
                            tracing::info!("moved {} to {}", jpg_path.display(), tagged.display());
                        }
                        Err(e) => {
                            tracing::warn!("error moving {}: {}", jpg_path.display(), e);
                            error_count += 1;
                        }
                    }
                }
                None => error_count += 1,
            }
        }

        report.total_errors += error_count;
    }

    tracing::info!(
        "batch complete: {} processed, {} relocated, {} errors",
        report.processed,
        report.relocated,
        report.total_errors
    );
    Ok(report)
}
