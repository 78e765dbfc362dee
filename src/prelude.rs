//! A collection of the most commonly used types.

pub use crate::batch::{process_folder, BatchReport, INGEST_EXTENSIONS};
pub use crate::catalog::{search_folder, Catalog, CatalogEntry};
pub use crate::error::{Result, TaggerError};
pub use crate::metadata::{canonicalize, embed_tags, read_tags, read_timestamp, update_tags};
pub use crate::pipeline::{ImageSource, ImageTagger, TaggingPipeline, TaggingResult};
pub use crate::processor::{ImagePreprocessor, ImageProcessor};
pub use crate::tagger::{Device, TaggerModel};
pub use crate::tags::LabelTags;
