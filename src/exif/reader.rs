use anyhow::{Context, Result};
use nom_exif::*;
use std::io::Cursor;

// IFD0 tag IDs
const TAG_MAKE: u16 = 0x010F;
const TAG_MODEL: u16 = 0x0110;
const TAG_SOFTWARE: u16 = 0x0131;
const TAG_ARTIST: u16 = 0x013B;
const TAG_COPYRIGHT: u16 = 0x8298;

// Exif sub-IFD tag IDs
const TAG_EXPOSURE_TIME: u16 = 0x829A;
const TAG_F_NUMBER: u16 = 0x829D;
const TAG_ISO: u16 = 0x8827;
const TAG_DATE_TIME_ORIGINAL: u16 = 0x9003;
const TAG_FLASH: u16 = 0x9209;
const TAG_FOCAL_LENGTH: u16 = 0x920A;
const TAG_USER_COMMENT: u16 = 0x9286;
const TAG_COLOR_SPACE: u16 = 0xA001;
const TAG_WHITE_BALANCE: u16 = 0xA403;
const TAG_LENS_MODEL: u16 = 0xA434;

const MIN_BLOCK_LEN: usize = 512;

/// Raw EXIF values, before they are rendered for display.
#[derive(Debug, Clone, Default)]
pub struct ExifData {
    pub make: Option<String>,
    pub model: Option<String>,
    pub lens: Option<String>,
    pub software: Option<String>,
    pub artist: Option<String>,
    pub copyright: Option<String>,
    pub date_taken: Option<String>,
    /// Numerator and denominator.
    pub exposure_time: Option<(u32, u32)>,
    pub f_number: Option<(u32, u32)>,
    pub focal_length: Option<(u32, u32)>,
    pub iso: Option<u32>,
    pub flash: Option<u32>,
    pub white_balance: Option<u32>,
    pub color_space: Option<u32>,
    pub user_comment: Option<String>,
    /// Signed decimal degrees.
    pub gps: Option<(f64, f64)>,
}

/// Read EXIF values from a bare TIFF block (`II*\0` / `MM\0*`).
///
/// A block nom-exif cannot parse yields empty data rather than an error.
pub fn read_exif(tiff: &[u8]) -> Result<ExifData> {
    // nom-exif reads a fixed-size header first; short blocks are zero-padded
    // so they clear it. TIFF offsets never point into the padding.
    let mut buf = tiff.to_vec();
    buf.resize(buf.len().max(MIN_BLOCK_LEN), 0);

    let mut parser = MediaParser::new();
    let ms = MediaSource::seekable(Cursor::new(buf))
        .context("Failed to open EXIF block")?;

    let iter: ExifIter = match parser.parse(ms) {
        Ok(iter) => iter,
        Err(e) => {
            log::debug!("EXIF block not readable: {e}");
            return Ok(ExifData::default());
        }
    };

    // Parse GPS info before converting to Exif (consumes the iterator)
    let gps_info = iter.parse_gps_info().ok().flatten();
    let exif: Exif = iter.into();

    let text = |tag| exif.get_by_ifd_tag_code(0, tag).and_then(entry_to_string);
    let rational = |tag| exif.get_by_ifd_tag_code(0, tag).and_then(entry_to_rational);
    let integer = |tag| exif.get_by_ifd_tag_code(0, tag).and_then(entry_to_u32);

    let mut data = ExifData {
        make: text(TAG_MAKE),
        model: text(TAG_MODEL),
        lens: text(TAG_LENS_MODEL),
        software: text(TAG_SOFTWARE),
        artist: text(TAG_ARTIST),
        copyright: text(TAG_COPYRIGHT),
        date_taken: text(TAG_DATE_TIME_ORIGINAL),
        exposure_time: rational(TAG_EXPOSURE_TIME),
        f_number: rational(TAG_F_NUMBER),
        focal_length: rational(TAG_FOCAL_LENGTH),
        iso: integer(TAG_ISO),
        flash: integer(TAG_FLASH),
        white_balance: integer(TAG_WHITE_BALANCE),
        color_space: integer(TAG_COLOR_SPACE),
        user_comment: exif
            .get_by_ifd_tag_code(0, TAG_USER_COMMENT)
            .and_then(entry_to_comment),
        gps: None,
    };

    if let Some(gps) = gps_info {
        let lat = latlng_to_decimal(&gps.latitude, gps.latitude_ref);
        let lon = latlng_to_decimal(&gps.longitude, gps.longitude_ref);
        if let (Some(lat), Some(lon)) = (lat, lon) {
            data.gps = Some((lat, lon));
        }
    }

    Ok(data)
}

/// Convert an EntryValue to an Option<String>.
fn entry_to_string(val: &EntryValue) -> Option<String> {
    let s = val.to_string();
    let s = s.trim().trim_matches('"').trim_end_matches('\0').trim().to_string();
    if s.is_empty() { None } else { Some(s) }
}

fn entry_to_rational(val: &EntryValue) -> Option<(u32, u32)> {
    match val {
        EntryValue::URational(r) => Some((r.0, r.1)),
        EntryValue::U16(v) => Some((*v as u32, 1)),
        EntryValue::U32(v) => Some((*v, 1)),
        _ => None,
    }
}

fn entry_to_u32(val: &EntryValue) -> Option<u32> {
    match val {
        EntryValue::U8(v) => Some(*v as u32),
        EntryValue::U16(v) => Some(*v as u32),
        EntryValue::U32(v) => Some(*v),
        _ => entry_to_string(val).and_then(|s| s.parse().ok()),
    }
}

/// UserComment is `undefined` data with an 8-byte character-code prefix.
fn entry_to_comment(val: &EntryValue) -> Option<String> {
    match val {
        EntryValue::Undefined(bytes) => super::decode_user_comment(bytes),
        EntryValue::Text(s) => Some(s.trim_end_matches('\0').to_string()).filter(|s| !s.is_empty()),
        _ => entry_to_string(val),
    }
}

/// Convert a nom-exif LatLng (3 URationals: deg, min, sec) to decimal degrees.
fn latlng_to_decimal(latlng: &LatLng, reference: char) -> Option<f64> {
    let part = |n: u32, d: u32| if d == 0 { None } else { Some(n as f64 / d as f64) };
    let degrees = part(latlng.0.0, latlng.0.1)?;
    let minutes = part(latlng.1.0, latlng.1.1)?;
    let seconds = part(latlng.2.0, latlng.2.1)?;

    let mut coord = degrees + minutes / 60.0 + seconds / 3600.0;

    if reference == 'S' || reference == 'W' {
        coord = -coord;
    }

    Some(coord)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{Entry, tiff};

    #[test]
    fn reads_camera_tags() {
        let block = tiff(
            vec![
                Entry::ascii(TAG_MAKE, "Canon"),
                Entry::ascii(TAG_MODEL, "Canon EOS R5"),
            ],
            vec![
                Entry::rational(TAG_EXPOSURE_TIME, &[(1, 250)]),
                Entry::rational(TAG_F_NUMBER, &[(28, 10)]),
                Entry::short(TAG_ISO, 400),
            ],
            vec![],
        );
        let data = read_exif(&block).unwrap();
        assert_eq!(data.make.as_deref(), Some("Canon"));
        assert_eq!(data.model.as_deref(), Some("Canon EOS R5"));
        assert_eq!(data.exposure_time, Some((1, 250)));
        assert_eq!(data.f_number, Some((28, 10)));
        assert_eq!(data.iso, Some(400));
        assert!(data.gps.is_none());
    }

    #[test]
    fn short_block_still_reads() {
        let block = tiff(
            vec![Entry::ascii(TAG_MAKE, "Canon"), Entry::ascii(TAG_ARTIST, "me")],
            vec![],
            vec![],
        );
        assert!(block.len() < MIN_BLOCK_LEN);
        let data = read_exif(&block).unwrap();
        assert_eq!(data.make.as_deref(), Some("Canon"));
        assert_eq!(data.artist.as_deref(), Some("me"));
    }

    #[test]
    fn south_west_gps_is_negative() {
        let block = tiff(
            vec![Entry::ascii(TAG_MAKE, "Canon")],
            vec![],
            vec![
                Entry::ascii(0x0001, "S"),
                Entry::rational(0x0002, &[(33, 1), (51, 1), (54, 1)]),
                Entry::ascii(0x0003, "W"),
                Entry::rational(0x0004, &[(70, 1), (30, 1), (0, 1)]),
            ],
        );
        let (lat, lon) = read_exif(&block).unwrap().gps.unwrap();
        assert!((lat + 33.865).abs() < 1e-6);
        assert!((lon + 70.5).abs() < 1e-6);
    }

    #[test]
    fn garbage_block_is_empty_data() {
        let data = read_exif(b"not a tiff header at all").unwrap_or_default();
        assert!(data.make.is_none());
    }
}
