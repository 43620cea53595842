use img_parts::Bytes;
use img_parts::jpeg::Jpeg;
use std::collections::BTreeMap;

use super::{ContainerKind, RawChunkSet, TextOrigin, decode_latin1_or_utf8};
use crate::error::Result;
use crate::xmp::XmpPacket;

const MARKER_APP1: u8 = 0xE1;
const MARKER_APP11: u8 = 0xEB;
const MARKER_COM: u8 = 0xFE;

const EXIF_HEADER: &[u8] = b"Exif\0\0";
const XMP_HEADER: &[u8] = b"http://ns.adobe.com/xap/1.0/\0";
const XMP_EXTENSION_HEADER: &[u8] = b"http://ns.adobe.com/xmp/extension/\0";
const JUMBF_ID: &[u8] = b"JP";

pub(super) fn read(bytes: &[u8]) -> Result<RawChunkSet> {
    let jpeg = Jpeg::from_bytes(Bytes::copy_from_slice(bytes))?;
    let mut set = RawChunkSet::new(ContainerKind::Jpeg);

    let mut exif: Vec<u8> = Vec::new();
    let mut xmp_main: Option<String> = None;
    let mut xmp_extended: BTreeMap<u32, Vec<u8>> = BTreeMap::new();
    let mut jumbf: BTreeMap<(u16, u32), Vec<u8>> = BTreeMap::new();

    for segment in jpeg.segments() {
        let data = segment.contents();
        match segment.marker() {
            MARKER_COM => set.push_text("Comment", decode_latin1_or_utf8(data), TextOrigin::JpegComment),
            MARKER_APP1 if data.starts_with(EXIF_HEADER) => {
                exif.extend_from_slice(&data[EXIF_HEADER.len()..]);
            }
            MARKER_APP1 if data.starts_with(XMP_HEADER) => {
                xmp_main = Some(String::from_utf8_lossy(&data[XMP_HEADER.len()..]).to_string());
            }
            MARKER_APP1 if data.starts_with(XMP_EXTENSION_HEADER) => {
                match extended_xmp_part(&data[XMP_EXTENSION_HEADER.len()..]) {
                    Some((offset, part)) => {
                        xmp_extended.insert(offset, part.to_vec());
                    }
                    None => log::warn!("Skipping short ExtendedXMP segment"),
                }
            }
            MARKER_APP11 if data.starts_with(JUMBF_ID) => match jumbf_part(data) {
                Some((instance, sequence, part)) => {
                    jumbf.insert((instance, sequence), part.to_vec());
                }
                None => log::warn!("Skipping short APP11 JUMBF segment"),
            },
            _ => {}
        }
    }

    if !exif.is_empty() {
        set.exif = Some(exif);
    }

    if let Some(mut xml) = xmp_main {
        // ExtendedXMP parts are a second serialized packet, appended in offset order.
        if !xmp_extended.is_empty() {
            let extended: Vec<u8> = xmp_extended.into_values().flatten().collect();
            xml.push('\n');
            xml.push_str(&String::from_utf8_lossy(&extended));
        }
        set.xmp = Some(XmpPacket::parse(xml));
    }

    if !jumbf.is_empty() {
        set.c2pa = Some(jumbf.into_values().flatten().collect());
    }

    Ok(set)
}

/// ExtendedXMP: 32-byte GUID, 4-byte full length, 4-byte offset, then data.
fn extended_xmp_part(data: &[u8]) -> Option<(u32, &[u8])> {
    if data.len() < 40 {
        return None;
    }
    let offset = u32::from_be_bytes(data[36..40].try_into().ok()?);
    Some((offset, &data[40..]))
}

/// APP11 JUMBF: `JP`, 2-byte box instance, 4-byte packet sequence, then the box.
///
/// Every packet repeats the superbox LBox/TBox header; only the first keeps it.
fn jumbf_part(data: &[u8]) -> Option<(u16, u32, &[u8])> {
    if data.len() < 8 {
        return None;
    }
    let instance = u16::from_be_bytes([data[2], data[3]]);
    let sequence = u32::from_be_bytes(data[4..8].try_into().ok()?);
    let payload = &data[8..];
    if sequence <= 1 {
        return Some((instance, sequence, payload));
    }
    let header_len = match payload.get(0..4) {
        Some([0, 0, 0, 1]) => 16,
        Some(_) => 8,
        None => return None,
    };
    Some((instance, sequence, payload.get(header_len..)?))
}
