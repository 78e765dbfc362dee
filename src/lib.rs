//! # Argus
//!
//! Argus is a library for automatic image tagging. It classifies images
//! with a pretrained ONNX model, embeds the resulting tags permanently in
//! each image's EXIF metadata, and answers conjunctive tag searches over
//! the tagged collection.
//!
//! ## Features
//!
//! - **High-level API**: a `TaggingPipeline` for end-to-end image tagging.
//! - **ONNX Runtime**: powered by `ort` for efficient, cross-platform inference.
//! - **Execution Providers**: supports CPU, CUDA, and other execution providers.
//! - **Durable tags**: tags travel inside the image file itself, not in a sidecar.
//! - **Search**: word-prefix conjunctive queries over the tagged collection.
//!
//! ## Modules
//!
//! - `pipeline`: the classifier handle and tag string synthesis.
//! - `tagger`: the ONNX model and session management.
//! - `processor`: image preprocessing into model input tensors.
//! - `tags`: the model's label table and its category partition.
//! - `metadata`: the JPEG/EXIF container codec.
//! - `batch`: folder processing into the tagged collection.
//! - `catalog`: the tag catalog and search matcher.
//! - `error`: the error types for the library.
//! - `prelude`: a collection of the most commonly used types.

pub mod batch;
pub mod catalog;
pub mod error;
pub mod file;
pub mod metadata;
pub mod pipeline;
pub mod prelude;
pub mod processor;
pub mod tagger;
pub mod tags;
