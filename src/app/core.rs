use std::{collections::BTreeSet, path::PathBuf};

use anyhow::Result;

use argus::{
    batch::{self, BatchReport},
    catalog::{self, Catalog, CatalogEntry},
    metadata,
    pipeline::TaggingPipeline,
    tagger::Device,
};

use crate::args::V3Model;

/// Holds the configuration settings for a processing run.
#[derive(Debug, Default, Clone)]
pub struct AppConfig {
    pub model: V3Model,
    pub source_dir: PathBuf,
    pub tagged_dir: PathBuf,
    pub general_threshold: f32,
    pub character_threshold: f32,
    pub exclude_tags: String,
}

/// Downloads the configured model, tags the source folder, and relocates
/// clean files into the tagged collection.
pub async fn run_process(config: AppConfig) -> Result<BatchReport> {
    let progress_callback = Box::new(|progress: f32, message: String| {
        println!("[{:>3.0}%] {}", progress * 100.0, message);
    });

    let mut pipe = TaggingPipeline::from_pretrained(
        &config.model.repo_id(),
        Device::cpu(),
        Some(progress_callback),
    )
    .await?;
    pipe.general_threshold = config.general_threshold;
    pipe.character_threshold = config.character_threshold;
    pipe.exclude_tags = config.exclude_tags.clone();

    let report = batch::process_folder(&config.source_dir, &config.tagged_dir, &mut pipe)?;
    Ok(report)
}

/// Manually re-tags a single image.
pub fn run_tag(path: &str, tags: &str) -> Result<PathBuf> {
    let canonical = metadata::update_tags(path.as_ref(), tags)?;
    Ok(canonical)
}

/// Rebuilds the catalog from the tagged collection.
pub fn run_index(tagged: &str, db: &str) -> Result<usize> {
    let mut catalog = Catalog::open(db)?;
    catalog.init()?;
    let count = catalog.index_folder(tagged.as_ref())?;
    Ok(count)
}

/// Evaluates a tag query against the tagged collection.
pub fn run_search(tagged: &str, query: &str) -> Result<Vec<CatalogEntry>> {
    let results = catalog::search_folder(tagged.as_ref(), query)?;
    Ok(results)
}

/// Lists every distinct tag known to the catalog.
pub fn run_all_tags(db: &str) -> Result<BTreeSet<String>> {
    let catalog = Catalog::open(db)?;
    catalog.init()?;
    let tags = catalog.all_tags()?;
    Ok(tags)
}
