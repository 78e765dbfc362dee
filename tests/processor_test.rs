use argus::processor::{flatten_to_rgb, ImagePreprocessor, ImageProcessor};
use image::{DynamicImage, Rgb, RgbImage, Rgba, RgbaImage};
use ndarray::s;

mod common;
use common::solid_image;

#[test]
fn test_process_shape() {
    let image = solid_image(100, 100, [128, 128, 128]);
    let processor = ImagePreprocessor::new(448);
    let tensor = processor.process(&image).unwrap();

    assert_eq!(tensor.shape(), &[1, 448, 448, 3]);
    assert!(tensor.iter().any(|&x| x != 0.0));
}

#[test]
fn test_channels_are_bgr_and_native_range() {
    // No resize path: the tensor holds the raw pixel values, reversed.
    let mut img = RgbImage::from_pixel(10, 10, Rgb([0, 0, 0]));
    img.put_pixel(3, 7, Rgb([1, 2, 3]));
    let image = DynamicImage::ImageRgb8(img);

    let processor = ImagePreprocessor::new(10);
    let tensor = processor.process(&image).unwrap();

    assert_eq!(tensor[[0, 7, 3, 0]], 3.0); // blue first
    assert_eq!(tensor[[0, 7, 3, 1]], 2.0);
    assert_eq!(tensor[[0, 7, 3, 2]], 1.0); // red last
}

#[test]
fn test_padding_is_white_and_centered() {
    // A wide 800x200 red image becomes an 800x800 square with 300px of
    // white above and below, then resizes to 448; the top padding maps to
    // rows [0, 168).
    let image = solid_image(800, 200, [255, 0, 0]);
    let processor = ImagePreprocessor::new(448);
    let tensor = processor.process(&image).unwrap();

    let top_row = tensor.slice(s![0, 0, .., ..]);
    assert!(top_row.iter().all(|&v| (v - 255.0).abs() < 1e-3));

    // The center sits deep inside the red content: BGR = (0, 0, 255).
    assert!((tensor[[0, 224, 224, 0]] - 0.0).abs() < 1e-3);
    assert!((tensor[[0, 224, 224, 1]] - 0.0).abs() < 1e-3);
    assert!((tensor[[0, 224, 224, 2]] - 255.0).abs() < 1e-3);
}

#[test]
fn test_transparent_pixels_composite_to_white() {
    let img = RgbaImage::from_pixel(10, 10, Rgba([255, 0, 0, 0]));
    let image = DynamicImage::ImageRgba8(img);

    let processor = ImagePreprocessor::new(10);
    let tensor = processor.process(&image).unwrap();

    assert!(tensor.iter().all(|&v| (v - 255.0).abs() < 1e-3));
}

#[test]
fn test_flatten_blends_partial_alpha_onto_white() {
    let img = RgbaImage::from_pixel(4, 4, Rgba([0, 0, 0, 128]));
    let rgb = flatten_to_rgb(&DynamicImage::ImageRgba8(img));

    // Half-transparent black over white lands near mid-gray.
    let pixel = rgb.get_pixel(0, 0).0;
    for channel in pixel {
        assert!((channel as i32 - 127).abs() <= 2, "channel = {}", channel);
    }
}

#[test]
fn test_flatten_passes_opaque_images_through() {
    let image = solid_image(8, 8, [10, 20, 30]);
    let rgb = flatten_to_rgb(&image);
    assert_eq!(rgb.get_pixel(4, 4).0, [10, 20, 30]);
}

#[test]
fn test_process_batch() {
    let image = solid_image(100, 100, [128, 128, 128]);
    let processor = ImagePreprocessor::new(64);
    let batch = processor.process_batch(vec![&image, &image]).unwrap();

    assert_eq!(batch.shape(), &[2, 64, 64, 3]);
    let first = batch.slice(s![0, .., .., ..]);
    let second = batch.slice(s![1, .., .., ..]);
    assert_eq!(first, second);
}
