//! This module provides tools for preprocessing images before they are fed
//! into the tagging model.
//!
//! It defines the `ImageProcessor` trait for generic image processing
//! operations and a concrete implementation, `ImagePreprocessor`, which
//! normalizes an arbitrary image into the tensor layout the WD tagger
//! models were trained on: square, white-padded, BGR, NHWC, pixel values
//! left in their native 0-255 range.

use image::{imageops, imageops::FilterType, DynamicImage, Rgb, RgbImage, Rgba, RgbaImage};
use ndarray::{Array, Axis, Ix4};
use rayon::prelude::*;

use crate::error::{Result, TaggerError};

/// A trait for processing images into tensors suitable for model input.
pub trait ImageProcessor {
    /// Processes a single image into a 4D tensor.
    fn process(&self, image: &DynamicImage) -> Result<Array<f32, Ix4>>;

    /// Processes a batch of images into a single 4D tensor.
    fn process_batch(&self, images: Vec<&DynamicImage>) -> Result<Array<f32, Ix4>>
    where
        Self: Sync,
    {
        let tensors: Result<Vec<_>> =
            images.into_par_iter().map(|img| self.process(img)).collect();
        let tensors = tensors?;

        ndarray::concatenate(
            Axis(0),
            &tensors.iter().map(|t| t.view()).collect::<Vec<_>>(),
        )
        .map_err(|e| TaggerError::InvalidImage(format!("failed to concatenate tensors: {}", e)))
    }
}

/// Composites any alpha channel onto an opaque white canvas and returns the
/// resulting three-channel image. Images without alpha convert directly.
pub fn flatten_to_rgb(image: &DynamicImage) -> RgbImage {
    if image.color().has_alpha() {
        let (width, height) = (image.width(), image.height());
        let mut canvas = RgbaImage::from_pixel(width, height, Rgba([255, 255, 255, 255]));
        imageops::overlay(&mut canvas, &image.to_rgba8(), 0, 0);
        DynamicImage::ImageRgba8(canvas).to_rgb8()
    } else {
        image.to_rgb8()
    }
}

/// A preprocessor that flattens, pads and resizes images to the model's
/// square input side.
#[derive(Debug, Clone)]
pub struct ImagePreprocessor {
    pub target_size: u32,
}

impl ImagePreprocessor {
    /// Creates a new `ImagePreprocessor` for the given square input side.
    ///
    /// The side must come from the loaded model's input shape, not from a
    /// hardcoded constant; see `TaggerModel::input_size`.
    pub fn new(target_size: u32) -> Self {
        Self { target_size }
    }
}

impl ImageProcessor for ImagePreprocessor {
    /// Preprocesses the image for model input.
    ///
    /// Steps, in order:
    /// 1. alpha composited onto opaque white (source-over);
    /// 2. centered on a white square canvas of side `max(width, height)`,
    ///    padding offsets by integer floor division;
    /// 3. bicubic resize to `target_size` when the canvas side differs;
    /// 4. channel order reversed to BGR (the models were trained on it);
    /// 5. a leading singleton batch dimension.
    fn process(&self, image: &DynamicImage) -> Result<Array<f32, Ix4>> {
        let rgb = flatten_to_rgb(image);
        let (width, height) = rgb.dimensions();

        let side = width.max(height);
        let mut canvas = RgbImage::from_pixel(side, side, Rgb([255, 255, 255]));
        let pad_left = (side - width) / 2;
        let pad_top = (side - height) / 2;
        imageops::overlay(&mut canvas, &rgb, pad_left as i64, pad_top as i64);

        let canvas = if side != self.target_size {
            imageops::resize(
                &canvas,
                self.target_size,
                self.target_size,
                FilterType::CatmullRom,
            )
        } else {
            canvas
        };

        let size = self.target_size as usize;
        let mut tensor = Array::zeros((size, size, 3));
        for (x, y, pixel) in canvas.enumerate_pixels() {
            let [r, g, b] = pixel.0;
            tensor[[y as usize, x as usize, 0]] = b as f32;
            tensor[[y as usize, x as usize, 1]] = g as f32;
            tensor[[y as usize, x as usize, 2]] = r as f32;
        }

        Ok(tensor.insert_axis(Axis(0)))
    }
}
