use std::{
    fs,
    io::{BufReader, Cursor},
    path::Path,
};

use argus::metadata::{
    canonicalize, embed_tags, format_timestamp, read_tags, read_timestamp, update_tags,
};
use chrono::{DateTime, Local};
use image::codecs::jpeg::JpegEncoder;
use img_parts::ImageEXIF;
use tempfile::tempdir;

mod common;
use common::{solid_image, write_image};

/// Writes a JPEG whose EXIF block carries only a DateTimeOriginal field.
fn write_jpeg_with_datetime(path: &Path, datetime: &str) {
    let rgb = solid_image(32, 32, [90, 90, 90]).to_rgb8();
    let mut encoded = Vec::new();
    JpegEncoder::new(&mut Cursor::new(&mut encoded))
        .encode_image(&rgb)
        .unwrap();

    let field = exif::Field {
        tag: exif::Tag::DateTimeOriginal,
        ifd_num: exif::In::PRIMARY,
        value: exif::Value::Ascii(vec![datetime.as_bytes().to_vec()]),
    };
    let mut writer = exif::experimental::Writer::new();
    writer.push_field(&field);
    let mut buf = Cursor::new(Vec::new());
    writer.write(&mut buf, false).unwrap();

    let mut jpeg = img_parts::jpeg::Jpeg::from_bytes(encoded.into()).unwrap();
    jpeg.set_exif(Some(buf.into_inner().into()));
    let mut out = fs::File::create(path).unwrap();
    jpeg.encoder().write_to(&mut out).unwrap();
}

#[test]
fn test_canonicalize_converts_png_and_removes_original() {
    let dir = tempdir().unwrap();
    let png_path = dir.path().join("photo.png");
    write_image(&png_path, 32, 32, [10, 200, 30]);

    let jpg_path = canonicalize(&png_path).unwrap();
    assert_eq!(jpg_path, dir.path().join("photo.jpg"));
    assert!(jpg_path.exists());
    assert!(!png_path.exists());
}

#[test]
fn test_canonicalize_leaves_jpeg_untouched() {
    let dir = tempdir().unwrap();
    let jpg_path = dir.path().join("photo.jpg");
    write_image(&jpg_path, 32, 32, [10, 200, 30]);

    let result = canonicalize(&jpg_path).unwrap();
    assert_eq!(result, jpg_path);
    assert!(jpg_path.exists());
}

#[test]
fn test_canonicalize_fails_on_undecodable_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("broken.png");
    fs::write(&path, b"not an image at all").unwrap();

    assert!(canonicalize(&path).is_err());
    assert!(path.exists(), "a failed conversion must not remove the file");
}

#[test]
fn test_embed_and_read_round_trip() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("photo.jpg");
    write_image(&path, 32, 32, [120, 120, 120]);

    let tags = "hatsune miku, cat, red hat";
    embed_tags(&path, tags).unwrap();
    assert_eq!(read_tags(&path).unwrap(), tags);
}

#[test]
fn test_embed_is_idempotent() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("photo.jpg");
    write_image(&path, 32, 32, [120, 120, 120]);

    let tags = "cat, dog";
    embed_tags(&path, tags).unwrap();
    let first = read_tags(&path).unwrap();
    embed_tags(&path, tags).unwrap();
    let second = read_tags(&path).unwrap();

    assert_eq!(first, tags);
    assert_eq!(second, tags);
}

#[test]
fn test_both_tag_fields_agree_after_write() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("photo.jpg");
    write_image(&path, 32, 32, [120, 120, 120]);

    let tags = "hatsune miku, cat";
    embed_tags(&path, tags).unwrap();

    let file = fs::File::open(&path).unwrap();
    let exif = exif::Reader::new()
        .read_from_container(&mut BufReader::new(file))
        .unwrap();

    let artist = exif.get_field(exif::Tag::Artist, exif::In::PRIMARY).unwrap();
    let artist_text = match &artist.value {
        exif::Value::Ascii(lines) => String::from_utf8_lossy(&lines[0]).to_string(),
        other => panic!("artist field is not ASCII: {:?}", other),
    };

    let comment = exif
        .get_field(exif::Tag::UserComment, exif::In::PRIMARY)
        .unwrap();
    let comment_text = match &comment.value {
        exif::Value::Undefined(bytes, _) => String::from_utf8_lossy(bytes).to_string(),
        other => panic!("user comment field is not undefined-typed: {:?}", other),
    };

    assert_eq!(artist_text.trim_end_matches('\0'), tags);
    assert_eq!(
        comment_text.trim_end_matches('\0'),
        artist_text.trim_end_matches('\0')
    );
}

#[test]
fn test_embed_flattens_alpha_sources() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("photo.png");
    let rgba = image::RgbaImage::from_pixel(16, 16, image::Rgba([255, 0, 0, 0]));
    image::DynamicImage::ImageRgba8(rgba).save(&path).unwrap();

    // The canonical encoding cannot carry alpha, so the embed path must
    // flatten before re-encoding.
    let jpg_path = update_tags(&path, "cat").unwrap();
    assert_eq!(read_tags(&jpg_path).unwrap(), "cat");

    let reloaded = image::open(&jpg_path).unwrap().to_rgb8();
    let pixel = reloaded.get_pixel(8, 8).0;
    for channel in pixel {
        assert!(channel > 250, "transparent source should flatten to white");
    }
}

#[test]
fn test_read_tags_without_metadata_is_a_recoverable_error() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("photo.jpg");
    write_image(&path, 32, 32, [120, 120, 120]);

    let result = read_tags(&path);
    assert!(result.is_err());
    // The call-site convention: collapse to the empty tag string.
    assert_eq!(result.unwrap_or_default(), "");
}

#[test]
fn test_read_timestamp_from_exif() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("photo.jpg");
    write_jpeg_with_datetime(&path, "2023:05:17 12:34:56");

    let ts = read_timestamp(&path);
    assert_eq!(format_timestamp(&ts), "2023-05-17T12:34:56");
}

#[test]
fn test_embed_preserves_capture_time() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("photo.jpg");
    write_jpeg_with_datetime(&path, "2023:05:17 12:34:56");

    embed_tags(&path, "cat, dog").unwrap();

    assert_eq!(read_tags(&path).unwrap(), "cat, dog");
    let ts = read_timestamp(&path);
    assert_eq!(format_timestamp(&ts), "2023-05-17T12:34:56");
}

#[test]
fn test_read_timestamp_falls_back_to_mtime() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("photo.jpg");
    write_image(&path, 32, 32, [120, 120, 120]);

    let mtime = fs::metadata(&path).unwrap().modified().unwrap();
    let expected = DateTime::<Local>::from(mtime).naive_local();

    let ts = read_timestamp(&path);
    assert_eq!(format_timestamp(&ts), format_timestamp(&expected));
}
