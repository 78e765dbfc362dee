//! The container codec: canonical JPEG conversion plus reading and writing
//! the tag string and capture timestamp in the image's EXIF block.
//!
//! Tags live redundantly in two fields, `Artist` (0th IFD) and
//! `UserComment` (Exif IFD); both always agree after a successful write.
//! Reading is best-effort: a missing or malformed block yields a
//! `MetadataRead` error that call sites collapse to an empty tag string,
//! and the timestamp reader always produces some value.

use std::{
    fs,
    io::{BufReader, BufWriter, Cursor},
    path::{Path, PathBuf},
};

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime};
use exif::{experimental::Writer, Field, In, Tag, Value};
use image::codecs::jpeg::JpegEncoder;
use img_parts::{jpeg::Jpeg, ImageEXIF};

use crate::{
    error::{Result, TaggerError},
    file::has_extension,
    processor::flatten_to_rgb,
};

/// Extensions already in the canonical encoding.
pub const CANONICAL_EXTENSIONS: &[&str] = &["jpg", "jpeg"];

const EXIF_DATETIME_FORMAT: &str = "%Y:%m:%d %H:%M:%S";

/// Converts an image to the canonical JPEG encoding.
///
/// A path that already carries a canonical extension is returned unchanged.
/// Otherwise the image is decoded, flattened to opaque three-channel color,
/// re-encoded as JPEG next to the original, and the original is removed.
pub fn canonicalize(path: &Path) -> Result<PathBuf> {
    if has_extension(path, CANONICAL_EXTENSIONS) {
        return Ok(path.to_path_buf());
    }

    let image = image::open(path)
        .map_err(|e| TaggerError::Conversion(format!("{}: {}", path.display(), e)))?;
    let rgb = flatten_to_rgb(&image);

    let jpg_path = path.with_extension("jpg");
    let file = fs::File::create(&jpg_path)?;
    JpegEncoder::new(&mut BufWriter::new(file))
        .encode_image(&rgb)
        .map_err(|e| TaggerError::Conversion(format!("{}: {}", jpg_path.display(), e)))?;

    fs::remove_file(path)?;
    tracing::info!("converted {} to JPG", path.display());

    Ok(jpg_path)
}

/// Writes `tags` into both the `Artist` and `UserComment` EXIF fields and
/// re-encodes the image in place.
///
/// A pre-existing block's capture-time fields survive the rewrite; a
/// malformed pre-existing block is treated as "no metadata yet". Alpha or
/// non-three-channel pixel data is flattened to opaque RGB first, because
/// the canonical encoding cannot carry it.
pub fn embed_tags(path: &Path, tags: &str) -> Result<()> {
    let bytes = fs::read(path)?;

    // Recoverable: an unreadable block simply means we start from empty.
    let existing = exif::Reader::new()
        .read_from_container(&mut Cursor::new(&bytes))
        .ok();

    let image = image::load_from_memory(&bytes)
        .map_err(|e| TaggerError::MetadataWrite(format!("{}: {}", path.display(), e)))?;
    let rgb = flatten_to_rgb(&image);

    let mut encoded = Vec::new();
    JpegEncoder::new(&mut Cursor::new(&mut encoded))
        .encode_image(&rgb)
        .map_err(|e| TaggerError::MetadataWrite(format!("{}: {}", path.display(), e)))?;

    let preserved: Vec<Field> = existing
        .iter()
        .flat_map(|exif| exif.fields())
        .filter(|f| {
            f.ifd_num == In::PRIMARY
                && matches!(
                    f.tag,
                    Tag::DateTimeOriginal | Tag::DateTimeDigitized | Tag::DateTime
                )
        })
        .map(|f| Field {
            tag: f.tag,
            ifd_num: f.ifd_num,
            value: f.value.clone(),
        })
        .collect();

    let artist = Field {
        tag: Tag::Artist,
        ifd_num: In::PRIMARY,
        value: Value::Ascii(vec![tags.as_bytes().to_vec()]),
    };
    let comment = Field {
        tag: Tag::UserComment,
        ifd_num: In::PRIMARY,
        value: Value::Undefined(tags.as_bytes().to_vec(), 0),
    };

    let mut writer = Writer::new();
    for field in &preserved {
        writer.push_field(field);
    }
    writer.push_field(&artist);
    writer.push_field(&comment);

    let mut exif_bytes = Cursor::new(Vec::new());
    writer
        .write(&mut exif_bytes, false)
        .map_err(|e| TaggerError::MetadataWrite(e.to_string()))?;

    let mut jpeg = Jpeg::from_bytes(encoded.into())
        .map_err(|e| TaggerError::MetadataWrite(e.to_string()))?;
    jpeg.set_exif(Some(exif_bytes.into_inner().into()));

    let mut out = BufWriter::new(fs::File::create(path)?);
    jpeg.encoder()
        .write_to(&mut out)
        .map_err(|e| TaggerError::MetadataWrite(e.to_string()))?;

    tracing::debug!("tags embedded into {}", path.display());
    Ok(())
}

/// Reads the tag string back from the `Artist` field.
///
/// Callers collapse the error to an empty tag string; the `Result` exists
/// so that decision is visible at the call site.
pub fn read_tags(path: &Path) -> Result<String> {
    let file = fs::File::open(path).map_err(|e| TaggerError::MetadataRead(e.to_string()))?;
    let exif = exif::Reader::new()
        .read_from_container(&mut BufReader::new(file))
        .map_err(|e| TaggerError::MetadataRead(format!("{}: {}", path.display(), e)))?;

    let field = exif
        .get_field(Tag::Artist, In::PRIMARY)
        .ok_or_else(|| TaggerError::MetadataRead(format!("{}: no artist field", path.display())))?;

    match &field.value {
        Value::Ascii(lines) => {
            let raw = lines.first().map(|l| l.as_slice()).unwrap_or_default();
            Ok(String::from_utf8_lossy(raw)
                .trim_end_matches('\0')
                .to_string())
        }
        _ => Err(TaggerError::MetadataRead(format!(
            "{}: artist field is not ASCII",
            path.display()
        ))),
    }
}

/// Reads the capture timestamp, falling back until something answers.
///
/// Order: the EXIF `DateTimeOriginal` field parsed with chrono, the same
/// field through the EXIF library's own datetime parser, and finally the
/// filesystem's modification time. Never fails.
pub fn read_timestamp(path: &Path) -> NaiveDateTime {
    if let Some(dt) = read_exif_timestamp(path) {
        return dt;
    }

    fs::metadata(path)
        .and_then(|m| m.modified())
        .map(|t| DateTime::<Local>::from(t).naive_local())
        .unwrap_or_else(|_| Local::now().naive_local())
}

fn read_exif_timestamp(path: &Path) -> Option<NaiveDateTime> {
    let file = fs::File::open(path).ok()?;
    let exif = exif::Reader::new()
        .read_from_container(&mut BufReader::new(file))
        .ok()?;

    let field = exif.get_field(Tag::DateTimeOriginal, In::PRIMARY)?;
    let raw = match &field.value {
        Value::Ascii(lines) => lines.first()?.clone(),
        _ => return None,
    };

    let text = String::from_utf8_lossy(&raw);
    if let Ok(dt) = NaiveDateTime::parse_from_str(text.trim(), EXIF_DATETIME_FORMAT) {
        return Some(dt);
    }

    // Secondary reader for the same field.
    let dt = exif::DateTime::from_ascii(&raw).ok()?;
    NaiveDate::from_ymd_opt(dt.year.into(), dt.month.into(), dt.day.into())?.and_hms_opt(
        dt.hour.into(),
        dt.minute.into(),
        dt.second.into(),
    )
}

/// Formats a timestamp the way the catalog stores it (ISO-8601, seconds).
pub fn format_timestamp(ts: &NaiveDateTime) -> String {
    ts.format("%Y-%m-%dT%H:%M:%S").to_string()
}

/// Manually re-tags a single image: canonicalize, then embed the new tags.
///
/// Returns the (possibly changed) canonical path.
pub fn update_tags(path: &Path, tags: &str) -> Result<PathBuf> {
    let canonical = canonicalize(path)?;
    embed_tags(&canonical, tags)?;
    Ok(canonical)
}
