//! The tag catalog and search matcher.
//!
//! `Catalog` persists (path, tags, date) records in SQLite, rebuilt by a
//! full pass over the tagged collection. Search does not trust that
//! snapshot: it re-reads tags and timestamp live from each file, trading
//! latency for freshness. A query is a comma-separated list of terms,
//! combined conjunctively; a term matches a tag token when it is a
//! whole-word prefix of it (`cat` matches `cats` and `cat`, never the
//! inside of `scatter`).

use std::{
    collections::BTreeSet,
    fs,
    path::{Path, PathBuf},
};

use regex::Regex;
use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};

use crate::{error::Result, file::has_extension, metadata};

/// Extensions accepted when indexing and searching the tagged collection.
pub const INDEX_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg"];

/// Indexed record of a tagged image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub path: PathBuf,
    pub tags: String,
    pub date: String,
}

/// The durable catalog store, keyed by path.
pub struct Catalog {
    conn: Connection,
}

impl Catalog {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Ok(Self { conn })
    }

    pub fn init(&self) -> Result<()> {
        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS images
                (path TEXT PRIMARY KEY, tags TEXT, date TEXT)",
            [],
        )?;
        Ok(())
    }

    /// Re-indexes the tagged collection: a full pass, not incremental.
    ///
    /// Every accepted file is upserted; later entries for the same path
    /// replace earlier ones. A file whose metadata cannot be read degrades
    /// to empty tags and the fallback timestamp rather than failing the
    /// pass. Entries for files removed since the last pass persist until
    /// the next one (a known staleness window).
    pub fn index_folder(&mut self, tagged: &Path) -> Result<usize> {
        let files = accepted_files(tagged)?;

        let tx = self.conn.transaction()?;
        let mut count = 0;
        for path in &files {
            let tags = metadata::read_tags(path).unwrap_or_default();
            let date = metadata::format_timestamp(&metadata::read_timestamp(path));
            tx.execute(
                "INSERT OR REPLACE INTO images (path, tags, date) VALUES (?1, ?2, ?3)",
                params![path.to_string_lossy(), tags, date],
            )?;
            count += 1;
        }
        tx.commit()?;

        tracing::info!("indexed {} images from {}", count, tagged.display());
        Ok(count)
    }

    /// Every distinct tag known to the catalog, lowercased and deduplicated.
    pub fn all_tags(&self) -> Result<BTreeSet<String>> {
        let mut stmt = self.conn.prepare("SELECT DISTINCT tags FROM images")?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;

        let mut all = BTreeSet::new();
        for tags in rows {
            for tag in tags?.split(',') {
                let tag = tag.trim().to_lowercase();
                if !tag.is_empty() {
                    all.insert(tag);
                }
            }
        }
        Ok(all)
    }
}

/// Splits a raw query string into lowercase, trimmed, non-empty terms.
pub fn split_query(query: &str) -> Vec<String> {
    query
        .split(',')
        .map(|term| term.trim().to_lowercase())
        .filter(|term| !term.is_empty())
        .collect()
}

/// Compiles each term into its word-prefix matcher. A term whose pattern
/// fails to compile maps to `None` and matches nothing.
fn compile_terms(terms: &[String]) -> Vec<Option<Regex>> {
    terms
        .iter()
        .map(|term| Regex::new(&format!(r"\b{}\w*\b", regex::escape(term))).ok())
        .collect()
}

fn matches_compiled(tags: &str, patterns: &[Option<Regex>]) -> bool {
    patterns.iter().all(|pattern| match pattern {
        Some(re) => tags
            .split(',')
            .any(|token| re.is_match(&token.to_lowercase())),
        None => false,
    })
}

/// Whether every query term word-prefix-matches at least one comma-split
/// token of the tag string. An empty term list matches everything.
pub fn matches_tags(tags: &str, terms: &[String]) -> bool {
    matches_compiled(tags, &compile_terms(terms))
}

/// Evaluates a conjunctive tag query against the tagged collection,
/// re-reading tags and timestamp live from each file. The term patterns
/// are compiled once per query, not per file.
pub fn search_folder(tagged: &Path, query: &str) -> Result<Vec<CatalogEntry>> {
    let terms = split_query(query);
    let patterns = compile_terms(&terms);

    let mut results = Vec::new();
    for path in accepted_files(tagged)? {
        let tags = metadata::read_tags(&path).unwrap_or_default();
        if matches_compiled(&tags, &patterns) {
            let date = metadata::format_timestamp(&metadata::read_timestamp(&path));
            results.push(CatalogEntry { path, tags, date });
        }
    }

    tracing::debug!("query {:?} matched {} entries", query, results.len());
    Ok(results)
}

fn accepted_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file() && has_extension(path, INDEX_EXTENSIONS))
        .collect();
    files.sort();
    Ok(files)
}
