//! This module provides a high-level `TaggingPipeline` for processing images
//! and generating tags.
//!
//! The pipeline combines a `TaggerModel`, an `ImagePreprocessor` sized from
//! the model's declared input shape, and the `LabelTags` table. It handles
//! model loading, preprocessing, prediction, and synthesis of the final
//! comma-joined tag string. The pipeline is the explicit classifier handle:
//! construct it once at process start and pass it to every call site
//! (behind `Arc<Mutex<_>>` when shared).

use std::path::{Path, PathBuf};

use image::DynamicImage;
use indexmap::IndexMap;
use itertools::Itertools;

use crate::{
    error::{Result, TaggerError},
    processor::{ImagePreprocessor, ImageProcessor},
    tagger::{Device, TaggerModel},
    tags::LabelTags,
};

/// Default confidence threshold for general-category tags.
pub const DEFAULT_GENERAL_THRESHOLD: f32 = 0.35;

/// Default confidence threshold for character-category tags.
///
/// Higher than the general threshold: a character identification is a
/// higher-precision claim and needs more confidence behind it.
pub const DEFAULT_CHARACTER_THRESHOLD: f32 = 0.85;

/// A callback function for reporting progress.
///
/// The first argument is the progress percentage (0.0 to 1.0), and the second
/// is a status message.
pub type ProgressCallback = Box<dyn Fn(f32, String) + Send + Sync>;

/// A type alias for a map of tag predictions, from tag name to confidence score.
pub type Prediction = IndexMap<String, f32>;

/// An image handed to the pipeline: either a path to decode or an already
/// decoded bitmap.
pub enum ImageSource {
    Path(PathBuf),
    Bitmap(DynamicImage),
}

impl ImageSource {
    /// Decodes the source into a bitmap.
    pub fn into_image(self) -> Result<DynamicImage> {
        match self {
            ImageSource::Path(path) => image::open(&path)
                .map_err(|e| TaggerError::InvalidImage(format!("{}: {}", path.display(), e))),
            ImageSource::Bitmap(image) => Ok(image),
        }
    }
}

impl From<&Path> for ImageSource {
    fn from(path: &Path) -> Self {
        ImageSource::Path(path.to_path_buf())
    }
}

impl From<PathBuf> for ImageSource {
    fn from(path: PathBuf) -> Self {
        ImageSource::Path(path)
    }
}

impl From<DynamicImage> for ImageSource {
    fn from(image: DynamicImage) -> Self {
        ImageSource::Bitmap(image)
    }
}

/// Anything that can turn an image into a tag string.
///
/// The batch orchestrator only depends on this trait, which keeps it
/// testable without a model on disk.
pub trait ImageTagger {
    fn tag_image(&mut self, source: ImageSource) -> Result<String>;
}

/// Tags whose underscores are meaningful and must not become spaces.
#[rustfmt::skip]
pub const UNDERSCORE_TAGS: [&str; 19] = [
    ">_<",
    ">_o",
    "0_0",
    "o_o",
    "3_3",
    "6_9",
    "@_@",
    "u_u",
    "x_x",
    "^_^",
    "|_|",
    "=_=",
    "+_+",
    "+_-",
    "._.",
    "<o>_<o>",
    "<|>_<|>",
    "||_||",
    "(o)_(o)",
];

/// Replaces underscores with spaces unless the tag is an emoticon.
pub fn fix_tag_underscore(tag: &str) -> String {
    if UNDERSCORE_TAGS.contains(&tag) {
        tag.to_string()
    } else {
        tag.replace('_', " ")
    }
}

/// Serializes a raw tag name for the tag string: underscores become spaces
/// and literal parentheses are escaped so the result splits cleanly later.
fn format_tag(tag: &str) -> String {
    fix_tag_underscore(tag).replace('(', "\\(").replace(')', "\\)")
}

/// Selects the pairs at `indexes` whose probability is strictly greater than
/// `threshold`, sorted by descending confidence.
fn select_from_pairs(pairs: &[(String, f32)], indexes: &[usize], threshold: f32) -> Prediction {
    indexes
        .iter()
        .filter_map(|&i| pairs.get(i))
        .filter(|(_, prob)| *prob > threshold)
        .sorted_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal))
        .map(|(tag, prob)| (tag.clone(), *prob))
        .collect()
}

/// The result of a tagging operation, with tags categorized and sorted by
/// confidence. Rating-category scores are computed by the model but never
/// surface as tags.
#[derive(Debug, Clone)]
pub struct TaggingResult {
    /// Character tags.
    pub character: Prediction,
    /// General-purpose tags.
    pub general: Prediction,
}

impl TaggingResult {
    fn new(character: Prediction, general: Prediction) -> Self {
        Self { character, general }
    }

    /// Serializes the selected tags to the canonical tag string.
    ///
    /// Character tags come first, general tags second; the order is part of
    /// the contract so downstream truncation drops the right tags. The
    /// exclusion list is comma-split, trimmed, and compared
    /// case-insensitively against the raw tag names. An empty selection
    /// yields an empty string.
    pub fn to_tag_string(&self, exclude_tags: &str) -> String {
        let remove: Vec<String> = exclude_tags
            .to_lowercase()
            .split(',')
            .map(|s| s.trim().to_string())
            .collect();

        self.character
            .keys()
            .chain(self.general.keys())
            .filter(|tag| !remove.contains(&tag.to_lowercase()))
            .map(|tag| format_tag(tag))
            .join(", ")
    }
}

/// An end-to-end pipeline for image tagging.
#[derive(Debug)]
pub struct TaggingPipeline {
    /// The underlying ONNX model for tagging.
    pub model: TaggerModel,
    /// The preprocessor for preparing images, sized from the model.
    pub preprocessor: ImagePreprocessor,
    /// The set of labels the model can predict.
    pub labels: LabelTags,
    /// The confidence threshold for general-category tags (strict `>`).
    pub general_threshold: f32,
    /// The confidence threshold for character-category tags (strict `>`).
    pub character_threshold: f32,
    /// Comma-separated tag names to drop from every result.
    pub exclude_tags: String,
}

impl TaggingPipeline {
    /// Creates a new `TaggingPipeline` from an already loaded model and
    /// label table. The preprocessor's target size is read from the model.
    pub fn new(model: TaggerModel, labels: LabelTags) -> Result<Self> {
        let target_size = model.input_size()?;
        Ok(Self {
            model,
            preprocessor: ImagePreprocessor::new(target_size),
            labels,
            general_threshold: DEFAULT_GENERAL_THRESHOLD,
            character_threshold: DEFAULT_CHARACTER_THRESHOLD,
            exclude_tags: String::new(),
        })
    }

    /// Creates a new `TaggingPipeline` from a pretrained model on the
    /// Hugging Face Hub.
    pub async fn from_pretrained(
        model_name: &str,
        devices: Vec<Device>,
        progress_callback: Option<ProgressCallback>,
    ) -> Result<Self> {
        let progress_callback = progress_callback.as_ref();

        Self::report_progress(progress_callback, 0.0, "Initializing Tagger...");
        TaggerModel::init(devices)?;

        Self::report_progress(
            progress_callback,
            0.2,
            &format!("Downloading model: {}", model_name),
        );
        let model = TaggerModel::from_pretrained(model_name).await?;

        Self::report_progress(progress_callback, 0.8, "Downloading tags...");
        let labels = LabelTags::from_pretrained(model_name).await?;

        Self::report_progress(progress_callback, 1.0, "Pipeline ready.");

        Self::new(model, labels)
    }

    /// Reports progress using the provided callback.
    fn report_progress(
        progress_callback: Option<&ProgressCallback>,
        progress: f32,
        message: &str,
    ) {
        if let Some(cb) = progress_callback {
            cb(progress, message.to_string());
        }
    }

    /// Predicts categorized tags for a single image.
    pub fn predict(&mut self, source: ImageSource) -> Result<TaggingResult> {
        let image = source.into_image()?;
        let tensor = self.preprocessor.process(&image)?;
        let mut rows = self.model.predict(tensor)?;
        let scores = rows
            .pop()
            .ok_or_else(|| TaggerError::Inference("prediction returned no rows".to_string()))?;

        let pairs = self.labels.pair(scores)?;
        let character = select_from_pairs(
            &pairs,
            self.labels.character_indexes(),
            self.character_threshold,
        );
        let general = select_from_pairs(
            &pairs,
            self.labels.general_indexes(),
            self.general_threshold,
        );

        Ok(TaggingResult::new(character, general))
    }
}

impl ImageTagger for TaggingPipeline {
    fn tag_image(&mut self, source: ImageSource) -> Result<String> {
        let exclude = self.exclude_tags.clone();
        let result = self.predict(source)?;
        Ok(result.to_tag_string(&exclude))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn pairs() -> Vec<(String, f32)> {
        vec![
            ("general".to_string(), 0.99),
            ("cat".to_string(), 0.4),
            ("hatsune_miku".to_string(), 0.95),
            ("dog".to_string(), 0.35),
        ]
    }

    #[test]
    fn test_threshold_is_strict() {
        // "dog" sits exactly at the threshold and must be excluded.
        let selected = select_from_pairs(&pairs(), &[1, 3], 0.35);
        assert_eq!(selected.len(), 1);
        assert!(selected.contains_key("cat"));

        // One ULP above the threshold is included.
        let just_above = f32::from_bits(0.35f32.to_bits() + 1);
        let bumped = vec![("dog".to_string(), just_above)];
        let selected = select_from_pairs(&bumped, &[0], 0.35);
        assert!(selected.contains_key("dog"));
    }

    #[test]
    fn test_selection_sorted_by_confidence() {
        let pairs = vec![
            ("low".to_string(), 0.5),
            ("high".to_string(), 0.9),
            ("mid".to_string(), 0.7),
        ];
        let selected = select_from_pairs(&pairs, &[0, 1, 2], 0.1);
        let order: Vec<_> = selected.keys().cloned().collect();
        assert_eq!(order, vec!["high", "mid", "low"]);
    }

    #[test]
    fn test_tag_string_merges_character_first() {
        let mut character = Prediction::new();
        character.insert("hatsune_miku".to_string(), 0.95);
        let mut general = Prediction::new();
        general.insert("cat".to_string(), 0.4);
        general.insert("dog".to_string(), 0.39);

        let result = TaggingResult::new(character, general);
        assert_eq!(result.to_tag_string(""), "hatsune miku, cat, dog");
    }

    #[test]
    fn test_tag_string_exclusion_is_case_insensitive() {
        let mut general = Prediction::new();
        general.insert("cat".to_string(), 0.4);
        general.insert("dog".to_string(), 0.39);

        let result = TaggingResult::new(Prediction::new(), general);
        let tags = result.to_tag_string("Cat");
        assert!(tags.contains("dog"));
        assert!(!tags.contains("cat"));
    }

    #[test]
    fn test_tag_string_escapes_parentheses() {
        let mut general = Prediction::new();
        general.insert("sword_(weapon)".to_string(), 0.8);

        let result = TaggingResult::new(Prediction::new(), general);
        assert_eq!(result.to_tag_string(""), "sword \\(weapon\\)");
    }

    #[test]
    fn test_tag_string_empty_selection() {
        let result = TaggingResult::new(Prediction::new(), Prediction::new());
        assert_eq!(result.to_tag_string(""), "");
    }

    #[test]
    fn test_emoticon_tags_keep_underscores() {
        assert_eq!(fix_tag_underscore(">_<"), ">_<");
        assert_eq!(fix_tag_underscore("red_hat"), "red hat");
    }
}
