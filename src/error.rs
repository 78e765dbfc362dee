//! # Error Handling
//!
//! This module defines the custom error type for the `argus` library.
//!
//! `TaggerError` models every failure kind the pipeline can produce, so that
//! callers can distinguish an undecodable upload from a missing model or a
//! metadata write that went wrong. It uses the `thiserror` crate to derive
//! the `Error` trait and provide descriptive error messages.

use thiserror::Error;

/// All errors produced by the tagging, codec, batch and catalog subsystems.
#[derive(Debug, Error)]
pub enum TaggerError {
    /// The source image could not be decoded at all.
    #[error("invalid image: {0}")]
    InvalidImage(String),

    /// The model or label artifacts could not be fetched or loaded.
    #[error("model unavailable: {0}")]
    ModelUnavailable(String),

    /// The forward pass itself failed.
    #[error("inference failed: {0}")]
    Inference(String),

    /// Re-encoding an image to the canonical JPEG format failed.
    #[error("conversion failed: {0}")]
    Conversion(String),

    /// Writing the metadata block back into the container failed.
    #[error("metadata write failed: {0}")]
    MetadataWrite(String),

    /// The metadata block (or a field in it) could not be read.
    ///
    /// Always recovered locally into an empty/default value at call sites;
    /// the variant exists so the recovery decision is visible in code.
    #[error("metadata read failed: {0}")]
    MetadataRead(String),

    #[error("catalog error: {0}")]
    Catalog(#[from] rusqlite::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T, E = TaggerError> = std::result::Result<T, E>;
