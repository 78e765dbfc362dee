//! The label table loaded from the model's `selected_tags.csv`.
//!
//! `LabelTags` keeps the tags in file order because the model's output
//! scores are aligned positionally with it: position `i` of a score vector
//! corresponds to row `i` of the CSV. The three derived index sets
//! (rating, general, character) partition the table by category.

use std::path::Path;

use serde::Deserialize;

use crate::error::{Result, TaggerError};
use crate::file::TagCSVFile;

/// Each record in the CSV file
#[derive(Debug, Deserialize, Clone)]
pub struct Tag {
    tag_id: i32,
    name: String,
    category: TagCategory,
    count: i32,
}

/// Tag category
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum TagCategory {
    #[serde(rename = "0")]
    General,
    #[serde(rename = "1")]
    Artist,
    #[serde(rename = "3")]
    Copyright,
    #[serde(rename = "4")]
    Character,
    #[serde(rename = "5")]
    Meta,
    #[serde(rename = "9")]
    Rating,
}

impl Tag {
    pub fn category(&self) -> TagCategory {
        self.category
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn tag_id(&self) -> i32 {
        self.tag_id
    }

    pub fn count(&self) -> i32 {
        self.count
    }
}

/// The ordered label table plus its category partition.
#[derive(Debug, Clone)]
pub struct LabelTags {
    tags: Vec<Tag>,
    rating_indexes: Vec<usize>,
    general_indexes: Vec<usize>,
    character_indexes: Vec<usize>,
}

impl LabelTags {
    /// Load from the local CSV file
    pub fn load<P: AsRef<Path>>(csv_path: P) -> Result<Self> {
        let mut reader = csv::Reader::from_path(csv_path.as_ref()).map_err(|e| {
            TaggerError::ModelUnavailable(format!(
                "failed to read CSV file at {:?}: {}",
                csv_path.as_ref(),
                e
            ))
        })?;

        let mut tags = Vec::new();
        for record in reader.deserialize() {
            let tag: Tag = record.map_err(|e| {
                TaggerError::ModelUnavailable(format!("failed to deserialize tag record: {}", e))
            })?;
            tags.push(tag);
        }

        let mut rating_indexes = Vec::new();
        let mut general_indexes = Vec::new();
        let mut character_indexes = Vec::new();
        for (i, tag) in tags.iter().enumerate() {
            match tag.category {
                TagCategory::Rating => rating_indexes.push(i),
                TagCategory::General => general_indexes.push(i),
                TagCategory::Character => character_indexes.push(i),
                _ => {}
            }
        }

        Ok(Self {
            tags,
            rating_indexes,
            general_indexes,
            character_indexes,
        })
    }

    pub async fn from_pretrained(repo_id: &str) -> Result<Self> {
        let csv_path = TagCSVFile::new(repo_id).get().await?;
        Self::load(csv_path)
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    pub fn tags(&self) -> &[Tag] {
        &self.tags
    }

    pub fn rating_indexes(&self) -> &[usize] {
        &self.rating_indexes
    }

    pub fn general_indexes(&self) -> &[usize] {
        &self.general_indexes
    }

    pub fn character_indexes(&self) -> &[usize] {
        &self.character_indexes
    }

    /// Pairs a raw score vector with the tag names, positionally.
    ///
    /// Fails when the model output length does not match the label table;
    /// neither side may ever be reordered independently of the other.
    pub fn pair(&self, probs: Vec<f32>) -> Result<Vec<(String, f32)>> {
        if probs.len() != self.tags.len() {
            return Err(TaggerError::Inference(format!(
                "tags and probabilities length mismatch ({} labels, {} scores)",
                self.tags.len(),
                probs.len()
            )));
        }

        Ok(self
            .tags
            .iter()
            .zip(probs)
            .map(|(tag, prob)| (tag.name.clone(), prob))
            .collect())
    }
}
