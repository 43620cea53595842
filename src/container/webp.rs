use img_parts::webp::WebP;
use img_parts::{Bytes, ImageEXIF};

use super::png::strip_exif_header;
use super::{ContainerKind, RawChunkSet};
use crate::error::Result;
use crate::xmp::XmpPacket;

const CHUNK_XMP: [u8; 4] = *b"XMP ";

pub(super) fn read(bytes: &[u8]) -> Result<RawChunkSet> {
    let webp = WebP::from_bytes(Bytes::copy_from_slice(bytes))?;
    let mut set = RawChunkSet::new(ContainerKind::WebP);

    if let Some(exif) = webp.exif() {
        set.exif = Some(strip_exif_header(&exif).to_vec());
    }

    if let Some(xmp) = webp.chunk_by_id(CHUNK_XMP).and_then(|c| c.content().data()) {
        set.xmp = Some(XmpPacket::parse(String::from_utf8_lossy(&xmp).to_string()));
    }

    Ok(set)
}
