use image::{DynamicImage, Rgb, RgbImage};
use std::path::Path;

/// Builds a solid-color bitmap.
#[allow(dead_code)]
pub fn solid_image(width: u32, height: u32, color: [u8; 3]) -> DynamicImage {
    DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb(color)))
}

/// Writes a solid-color image to `path`; the format follows the extension.
#[allow(dead_code)]
pub fn write_image(path: &Path, width: u32, height: u32, color: [u8; 3]) {
    solid_image(width, height, color).save(path).unwrap();
}

/// Writes a synthetic label table CSV with one rating, two general, and one
/// character tag.
#[allow(dead_code)]
pub fn write_label_csv(dir: &Path) -> std::path::PathBuf {
    use std::io::Write;

    let path = dir.join("selected_tags.csv");
    let mut f = std::fs::File::create(&path).unwrap();
    writeln!(f, "tag_id,name,category,count").unwrap();
    writeln!(f, "1,general,9,100").unwrap();
    writeln!(f, "2,cat,0,50").unwrap();
    writeln!(f, "3,hatsune_miku,4,25").unwrap();
    writeln!(f, "4,dog,0,40").unwrap();
    path
}
