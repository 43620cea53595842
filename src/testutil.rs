//! Fixture builders shared by the unit tests.

use image::{DynamicImage, ImageFormat, RgbImage};
use img_parts::Bytes;
use img_parts::jpeg::{Jpeg, JpegSegment};
use img_parts::png::{Png, PngChunk};
use std::io::Cursor;

fn encode(format: ImageFormat) -> Vec<u8> {
    let mut buf = Vec::new();
    DynamicImage::ImageRgb8(RgbImage::new(4, 3))
        .write_to(&mut Cursor::new(&mut buf), format)
        .unwrap();
    buf
}

/// A 4x3 PNG with extra chunks inserted before `IEND`, in order.
pub fn png_with_chunks(chunks: &[([u8; 4], Vec<u8>)]) -> Vec<u8> {
    let mut png = Png::from_bytes(Bytes::from(encode(ImageFormat::Png))).unwrap();
    for (kind, data) in chunks {
        let at = png.chunks().len() - 1;
        png.chunks_mut()
            .insert(at, PngChunk::new(*kind, Bytes::from(data.clone())));
    }
    png.encoder().bytes().to_vec()
}

/// A 4x3 PNG with `tEXt` chunks.
pub fn png_with_text(pairs: &[(&str, &str)]) -> Vec<u8> {
    let chunks: Vec<_> = pairs
        .iter()
        .map(|(k, v)| {
            let mut data = k.as_bytes().to_vec();
            data.push(0);
            data.extend(v.as_bytes());
            (*b"tEXt", data)
        })
        .collect();
    png_with_chunks(&chunks)
}

/// A 4x3 JPEG with extra segments inserted after the first (JFIF) segment.
pub fn jpeg_with_segments(segments: &[(u8, Vec<u8>)]) -> Vec<u8> {
    let mut jpeg = Jpeg::from_bytes(Bytes::from(encode(ImageFormat::Jpeg))).unwrap();
    for (i, (marker, data)) in segments.iter().enumerate() {
        jpeg.segments_mut().insert(
            1 + i,
            JpegSegment::new_with_contents(*marker, Bytes::from(data.clone())),
        );
    }
    jpeg.encoder().bytes().to_vec()
}

/// A JPEG carrying `tiff` in an APP1 `Exif` segment.
pub fn jpeg_with_exif(tiff: &[u8]) -> Vec<u8> {
    let mut app1 = b"Exif\0\0".to_vec();
    app1.extend_from_slice(tiff);
    jpeg_with_segments(&[(0xE1, app1)])
}

fn riff_chunk(id: &[u8; 4], data: &[u8]) -> Vec<u8> {
    let mut out = id.to_vec();
    out.extend((data.len() as u32).to_le_bytes());
    out.extend_from_slice(data);
    if data.len() % 2 == 1 {
        out.push(0);
    }
    out
}

/// An extended-format WebP (VP8X header only) with extra chunks.
pub fn webp_with_chunks(chunks: &[([u8; 4], Vec<u8>)]) -> Vec<u8> {
    let mut flags = 0u8;
    for (id, _) in chunks {
        match id {
            b"EXIF" => flags |= 0x08,
            b"XMP " => flags |= 0x04,
            _ => {}
        }
    }
    let mut vp8x = vec![flags, 0, 0, 0];
    vp8x.extend(&3u32.to_le_bytes()[..3]);
    vp8x.extend(&2u32.to_le_bytes()[..3]);

    let mut body = b"WEBP".to_vec();
    body.extend(riff_chunk(b"VP8X", &vp8x));
    for (id, data) in chunks {
        body.extend(riff_chunk(id, data));
    }

    let mut out = b"RIFF".to_vec();
    out.extend((body.len() as u32).to_le_bytes());
    out.extend(body);
    out
}

// ── TIFF/EXIF builder ────────────────────────────────────────────────

pub const TAG_EXIF_IFD: u16 = 0x8769;
pub const TAG_GPS_IFD: u16 = 0x8825;

/// One little-endian IFD entry.
#[derive(Clone)]
pub struct Entry {
    tag: u16,
    kind: u16,
    count: u32,
    data: Vec<u8>,
}

impl Entry {
    pub fn ascii(tag: u16, text: &str) -> Self {
        let mut data = text.as_bytes().to_vec();
        data.push(0);
        Self { tag, kind: 2, count: data.len() as u32, data }
    }

    pub fn short(tag: u16, value: u16) -> Self {
        Self { tag, kind: 3, count: 1, data: value.to_le_bytes().to_vec() }
    }

    pub fn long(tag: u16, value: u32) -> Self {
        Self { tag, kind: 4, count: 1, data: value.to_le_bytes().to_vec() }
    }

    pub fn rational(tag: u16, values: &[(u32, u32)]) -> Self {
        let mut data = Vec::new();
        for (n, d) in values {
            data.extend(n.to_le_bytes());
            data.extend(d.to_le_bytes());
        }
        Self { tag, kind: 5, count: values.len() as u32, data }
    }

    pub fn undefined(tag: u16, bytes: &[u8]) -> Self {
        Self { tag, kind: 7, count: bytes.len() as u32, data: bytes.to_vec() }
    }
}

fn ifd_size(entries: &[Entry]) -> usize {
    let data: usize = entries
        .iter()
        .filter(|e| e.data.len() > 4)
        .map(|e| e.data.len() + e.data.len() % 2)
        .sum();
    2 + 12 * entries.len() + 4 + data
}

fn write_ifd(out: &mut Vec<u8>, entries: &[Entry]) {
    let base = out.len();
    let mut data_offset = base + 2 + 12 * entries.len() + 4;
    let mut data_area = Vec::new();

    out.extend((entries.len() as u16).to_le_bytes());
    for e in entries {
        out.extend(e.tag.to_le_bytes());
        out.extend(e.kind.to_le_bytes());
        out.extend(e.count.to_le_bytes());
        if e.data.len() <= 4 {
            let mut inline = e.data.clone();
            inline.resize(4, 0);
            out.extend(inline);
        } else {
            out.extend((data_offset as u32).to_le_bytes());
            data_area.extend(&e.data);
            if e.data.len() % 2 == 1 {
                data_area.push(0);
            }
            data_offset += e.data.len() + e.data.len() % 2;
        }
    }
    out.extend(0u32.to_le_bytes());
    out.extend(data_area);
}

/// Build a little-endian TIFF with IFD0 plus optional Exif and GPS sub-IFDs.
pub fn tiff(ifd0: Vec<Entry>, exif: Vec<Entry>, gps: Vec<Entry>) -> Vec<u8> {
    let mut ifd0 = ifd0;
    if !exif.is_empty() {
        ifd0.push(Entry::long(TAG_EXIF_IFD, 0));
    }
    if !gps.is_empty() {
        ifd0.push(Entry::long(TAG_GPS_IFD, 0));
    }
    let mut exif = exif;
    let mut gps = gps;
    for ifd in [&mut ifd0, &mut exif, &mut gps] {
        ifd.sort_by_key(|e| e.tag);
    }

    let exif_offset = 8 + ifd_size(&ifd0);
    let gps_offset = exif_offset + if exif.is_empty() { 0 } else { ifd_size(&exif) };
    for e in ifd0.iter_mut() {
        match e.tag {
            TAG_EXIF_IFD => e.data = (exif_offset as u32).to_le_bytes().to_vec(),
            TAG_GPS_IFD => e.data = (gps_offset as u32).to_le_bytes().to_vec(),
            _ => {}
        }
    }

    let mut out = b"II*\0".to_vec();
    out.extend(8u32.to_le_bytes());
    write_ifd(&mut out, &ifd0);
    if !exif.is_empty() {
        write_ifd(&mut out, &exif);
    }
    if !gps.is_empty() {
        write_ifd(&mut out, &gps);
    }
    out
}
