use flate2::read::ZlibDecoder;
use img_parts::Bytes;
use img_parts::png::Png;
use std::io::Read;

use super::{ContainerKind, RawChunkSet, TextOrigin, decode_latin1_or_utf8};
use crate::error::Result;
use crate::xmp::XmpPacket;

const XMP_KEYWORD: &str = "XML:com.adobe.xmp";

pub(super) fn read(bytes: &[u8]) -> Result<RawChunkSet> {
    let png = Png::from_bytes(Bytes::copy_from_slice(bytes))?;
    let mut set = RawChunkSet::new(ContainerKind::Png);

    for chunk in png.chunks() {
        let data = chunk.contents();
        match &chunk.kind() {
            b"tEXt" => match split_keyword(data) {
                Some((keyword, rest)) => {
                    set.push_text(keyword, decode_latin1_or_utf8(rest), TextOrigin::PngText)
                }
                None => log::warn!("Skipping tEXt chunk without keyword separator"),
            },
            b"zTXt" => match read_ztxt(data) {
                Some((keyword, value)) => set.push_text(keyword, value, TextOrigin::PngCompressedText),
                None => log::warn!("Skipping undecodable zTXt chunk"),
            },
            b"iTXt" => match read_itxt(data) {
                Some((keyword, value)) if keyword == XMP_KEYWORD => {
                    set.xmp = Some(XmpPacket::parse(value));
                }
                Some((keyword, value)) => {
                    set.push_text(keyword, value, TextOrigin::PngInternationalText)
                }
                None => log::warn!("Skipping undecodable iTXt chunk"),
            },
            b"eXIf" => set.exif = Some(strip_exif_header(data).to_vec()),
            b"caBX" => set.c2pa = Some(data.to_vec()),
            _ => {}
        }
    }

    Ok(set)
}

/// Split `keyword\0rest`.
fn split_keyword(data: &[u8]) -> Option<(String, &[u8])> {
    let nul = data.iter().position(|&b| b == 0)?;
    let keyword = decode_latin1_or_utf8(&data[..nul]);
    Some((keyword, &data[nul + 1..]))
}

fn inflate(data: &[u8]) -> Option<Vec<u8>> {
    let mut out = Vec::new();
    match ZlibDecoder::new(data).read_to_end(&mut out) {
        Ok(_) => Some(out),
        Err(e) => {
            log::debug!("zlib inflate failed: {e}");
            None
        }
    }
}

/// `keyword\0 method compressed-text`
fn read_ztxt(data: &[u8]) -> Option<(String, String)> {
    let (keyword, rest) = split_keyword(data)?;
    let (&method, compressed) = rest.split_first()?;
    if method != 0 {
        return None;
    }
    let text = inflate(compressed)?;
    Some((keyword, decode_latin1_or_utf8(&text)))
}

/// `keyword\0 flag method language\0 translated-keyword\0 text`
fn read_itxt(data: &[u8]) -> Option<(String, String)> {
    let (keyword, rest) = split_keyword(data)?;
    if rest.len() < 2 {
        return None;
    }
    let compressed = rest[0] == 1;
    let rest = &rest[2..];
    let lang_end = rest.iter().position(|&b| b == 0)?;
    let rest = &rest[lang_end + 1..];
    let translated_end = rest.iter().position(|&b| b == 0)?;
    let text = &rest[translated_end + 1..];

    let value = if compressed {
        String::from_utf8_lossy(&inflate(text)?).to_string()
    } else {
        String::from_utf8_lossy(text).to_string()
    };
    Some((keyword, value))
}

/// Some writers keep the JPEG-style `Exif\0\0` prefix inside `eXIf`.
pub(super) fn strip_exif_header(data: &[u8]) -> &[u8] {
    data.strip_prefix(b"Exif\0\0").unwrap_or(data)
}
