//! EXIF and XMP camera metadata.
//!
//! - [`normalize`] maps a [`RawChunkSet`]'s EXIF block and XMP packet to
//!   [`CameraInfo`] and detects the editing software.
//! - `UserComment` payloads are decoded here too; some WebUI builds store
//!   their parameters there in JPEG and WebP output.
//!
//! EXIF values win; XMP fills whatever EXIF left empty.

mod reader;
mod software;

pub use reader::{ExifData, read_exif};
pub use software::EditingSoftware;

use crate::container::RawChunkSet;
use crate::metadata::{CameraInfo, GpsCoordinate, trim_float};
use crate::xmp::XmpPacket;

/// Build [`CameraInfo`] from EXIF and XMP, plus the recognized editor if any.
pub fn normalize(raw: &RawChunkSet) -> (CameraInfo, Option<EditingSoftware>) {
    let exif = raw.exif_data().cloned().unwrap_or_default();

    let mut info = CameraInfo {
        make: exif.make,
        model: exif.model,
        lens: exif.lens,
        shutter_speed: exif.exposure_time.and_then(|(n, d)| format_exposure(n, d)),
        aperture: exif.f_number.and_then(|(n, d)| ratio(n, d)).map(round_aperture),
        iso: exif.iso,
        focal_length: exif.focal_length.and_then(|(n, d)| ratio(n, d)),
        flash: exif.flash.map(flash_text),
        white_balance: exif.white_balance.and_then(white_balance_text),
        color_space: exif.color_space.and_then(color_space_text),
        gps: exif.gps.map(|(latitude, longitude)| GpsCoordinate {
            latitude,
            longitude,
        }),
        date_taken: exif.date_taken,
        artist: exif.artist,
        copyright: exif.copyright,
        software: exif.software,
    };

    if let Some(ref xmp) = raw.xmp {
        fill_from_xmp(&mut info, xmp);
    }
    if info.software.is_none() {
        info.software = raw.first("Software").map(str::to_string);
    }

    let editor = [
        info.software.as_deref(),
        raw.xmp.as_ref().and_then(|x| x.get("xmp:CreatorTool")),
        raw.first("Software"),
    ]
    .into_iter()
    .flatten()
    .find_map(EditingSoftware::identify);

    log::debug!(
        "Normalized camera data: {} field(s), editor {:?}",
        info.rows().len(),
        editor
    );
    (info, editor)
}

fn fill_from_xmp(info: &mut CameraInfo, xmp: &XmpPacket) {
    let text = |names: &[&str]| xmp.find(names).map(str::to_string);

    info.make = info.make.take().or_else(|| text(&["tiff:Make"]));
    info.model = info.model.take().or_else(|| text(&["tiff:Model"]));
    info.lens = info
        .lens
        .take()
        .or_else(|| text(&["exifEX:LensModel", "aux:Lens"]));
    info.shutter_speed = info.shutter_speed.take().or_else(|| {
        let (n, d) = parse_fraction(xmp.get("exif:ExposureTime")?)?;
        format_exposure_f64(n / d)
    });
    info.aperture = info.aperture.or_else(|| {
        let (n, d) = parse_fraction(xmp.get("exif:FNumber")?)?;
        Some(round_aperture(n / d))
    });
    info.iso = info.iso.or_else(|| {
        xmp.find(&["exif:ISOSpeedRatings", "exifEX:PhotographicSensitivity"])?
            .trim()
            .parse()
            .ok()
    });
    info.focal_length = info.focal_length.or_else(|| {
        let (n, d) = parse_fraction(xmp.get("exif:FocalLength")?)?;
        Some(n / d)
    });
    info.gps = info.gps.or_else(|| {
        Some(GpsCoordinate {
            latitude: parse_xmp_coordinate(xmp.get("exif:GPSLatitude")?)?,
            longitude: parse_xmp_coordinate(xmp.get("exif:GPSLongitude")?)?,
        })
    });
    info.date_taken = info
        .date_taken
        .take()
        .or_else(|| text(&["exif:DateTimeOriginal", "xmp:CreateDate", "photoshop:DateCreated"]));
    info.artist = info.artist.take().or_else(|| text(&["dc:creator"]));
    info.copyright = info.copyright.take().or_else(|| text(&["dc:rights"]));
    info.software = info
        .software
        .take()
        .or_else(|| text(&["xmp:CreatorTool", "tiff:Software"]));
}

/// Decode a UserComment payload: an 8-byte character code, then the text.
///
/// `UNICODE` payloads carry no byte-order mark in practice, so the order is
/// guessed from which half of the first code unit is zero.
pub(crate) fn decode_user_comment(bytes: &[u8]) -> Option<String> {
    let (code, body) = if bytes.len() >= 8 {
        bytes.split_at(8)
    } else {
        (&[][..], bytes)
    };

    let text = match code {
        b"UNICODE\0" => decode_utf16(body),
        b"ASCII\0\0\0" | b"\0\0\0\0\0\0\0\0" => String::from_utf8_lossy(body).to_string(),
        _ => String::from_utf8_lossy(bytes).to_string(),
    };

    let text = text.trim_end_matches('\0').trim().to_string();
    if text.is_empty() { None } else { Some(text) }
}

fn decode_utf16(body: &[u8]) -> String {
    let big_endian = match body {
        [0, b, ..] if *b != 0 => true,
        [a, 0, ..] if *a != 0 => false,
        _ => true,
    };
    let units: Vec<u16> = body
        .chunks_exact(2)
        .map(|pair| {
            if big_endian {
                u16::from_be_bytes([pair[0], pair[1]])
            } else {
                u16::from_le_bytes([pair[0], pair[1]])
            }
        })
        .collect();
    String::from_utf16_lossy(&units)
}

fn ratio(n: u32, d: u32) -> Option<f64> {
    if d == 0 { None } else { Some(n as f64 / d as f64) }
}

fn round_aperture(f: f64) -> f64 {
    (f * 10.0).round() / 10.0
}

/// `1/250 s` below one second, `2.5 s` above.
fn format_exposure(n: u32, d: u32) -> Option<String> {
    if d == 0 || n == 0 {
        return None;
    }
    if n == 1 {
        return Some(format!("1/{d} s"));
    }
    format_exposure_f64(n as f64 / d as f64)
}

fn format_exposure_f64(seconds: f64) -> Option<String> {
    if !seconds.is_finite() || seconds <= 0.0 {
        return None;
    }
    if seconds < 1.0 {
        Some(format!("1/{} s", (1.0 / seconds).round()))
    } else {
        Some(format!("{} s", trim_float((seconds * 10.0).round() / 10.0)))
    }
}

/// `"1/250"`, `"28/10"` or `"2.8"`.
fn parse_fraction(value: &str) -> Option<(f64, f64)> {
    let value = value.trim();
    match value.split_once('/') {
        Some((n, d)) => {
            let n: f64 = n.trim().parse().ok()?;
            let d: f64 = d.trim().parse().ok()?;
            if d == 0.0 { None } else { Some((n, d)) }
        }
        None => Some((value.parse().ok()?, 1.0)),
    }
}

/// XMP GPS form: `DD,MM.mmmK` or `DD,MM,SSK`, K one of N/S/E/W.
fn parse_xmp_coordinate(value: &str) -> Option<f64> {
    let value = value.trim();
    let hemisphere = value.chars().last()?.to_ascii_uppercase();
    if !matches!(hemisphere, 'N' | 'S' | 'E' | 'W') {
        return None;
    }
    let body = &value[..value.len() - 1];
    let parts: Vec<f64> = body
        .split(',')
        .map(|p| p.trim().parse::<f64>())
        .collect::<Result<_, _>>()
        .ok()?;

    let magnitude = match parts.as_slice() {
        [deg, min] => deg + min / 60.0,
        [deg, min, sec] => deg + min / 60.0 + sec / 3600.0,
        _ => return None,
    };
    Some(if matches!(hemisphere, 'S' | 'W') { -magnitude } else { magnitude })
}

fn flash_text(value: u32) -> String {
    let fired = if value & 0x01 != 0 { "Fired" } else { "Did not fire" };
    let mode = match (value >> 3) & 0x03 {
        1 => Some("compulsory"),
        2 => Some("off"),
        3 => Some("auto"),
        _ => None,
    };
    match mode {
        Some(mode) => format!("{fired} ({mode})"),
        None => fired.to_string(),
    }
}

fn white_balance_text(value: u32) -> Option<String> {
    match value {
        0 => Some("Auto".into()),
        1 => Some("Manual".into()),
        _ => None,
    }
}

fn color_space_text(value: u32) -> Option<String> {
    match value {
        1 => Some("sRGB".into()),
        2 => Some("Adobe RGB".into()),
        0xFFFF => Some("Uncalibrated".into()),
        _ => None,
    }
}
