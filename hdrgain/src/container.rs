//! Packaging an SDR JPEG and its gain map into one file, and reading it back.

use std::fs;
use std::path::{Path, PathBuf};

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use bytes::{Bytes, BytesMut};
use img_parts::jpeg::{Jpeg, JpegSegment, markers};

use crate::error::{Error, Result};
use crate::types::GainMapMetadata;
use crate::xmp::{
    self, EXTENDED_CHUNK_SIZE, EXTENDED_XMP_PREFIX, ExtendedXmp, XMP_PREFIX, XmpPackets,
};

const GUID_LEN: usize = 32;

/// The two JPEG streams of one conversion plus the numbers that tie them together.
#[derive(Debug, Clone)]
pub struct EncodedImage {
    pub sdr_jpeg: Vec<u8>,
    pub gainmap_jpeg: Vec<u8>,
    pub metadata: GainMapMetadata,
}

/// Where [`EncodedImage::write_siblings`] put its files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiblingPaths {
    pub sdr: PathBuf,
    pub gain_map: PathBuf,
}

impl SiblingPaths {
    /// `<dir>/<stem>_sdr.jpg` and `<dir>/<stem>_gain_map.jpg` for `path`.
    pub fn for_output(path: &Path) -> Self {
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "output".to_string());
        let dir = path.parent().unwrap_or_else(|| Path::new(""));
        Self {
            sdr: dir.join(format!("{stem}_sdr.jpg")),
            gain_map: dir.join(format!("{stem}_gain_map.jpg")),
        }
    }
}

impl EncodedImage {
    /// The SDR JPEG with the gain map embedded through XMP.
    pub fn to_gainmap_jpeg(&self) -> Result<Vec<u8>> {
        let encoded = STANDARD.encode(&self.gainmap_jpeg);
        let packets = xmp::build_xmp(&self.metadata, &encoded)?;

        let mut jpeg = Jpeg::from_bytes(Bytes::copy_from_slice(&self.sdr_jpeg))?;
        let dropped = remove_xmp_segments(jpeg.segments_mut());
        if dropped > 0 {
            log::debug!("replaced {dropped} existing XMP segments");
        }
        upsert_xmp(jpeg.segments_mut(), &packets)?;
        Ok(jpeg.encoder().bytes().to_vec())
    }

    /// Write the single-file container to `path`.
    pub fn write_gainmap_jpeg(&self, path: impl AsRef<Path>) -> Result<usize> {
        let path = path.as_ref();
        let bytes = self.to_gainmap_jpeg()?;
        fs::write(path, &bytes).map_err(|e| Error::output(path, e))?;
        Ok(bytes.len())
    }

    /// Write the SDR image and the gain map as two plain JPEGs next to `path`.
    pub fn write_siblings(&self, path: impl AsRef<Path>) -> Result<SiblingPaths> {
        let paths = SiblingPaths::for_output(path.as_ref());
        self.write_pair(&paths)?;
        Ok(paths)
    }

    pub fn write_pair(&self, paths: &SiblingPaths) -> Result<()> {
        fs::write(&paths.sdr, &self.sdr_jpeg).map_err(|e| Error::output(&paths.sdr, e))?;
        fs::write(&paths.gain_map, &self.gainmap_jpeg)
            .map_err(|e| Error::output(&paths.gain_map, e))?;
        Ok(())
    }
}

fn is_xmp_segment(segment: &JpegSegment) -> bool {
    segment.marker() == markers::APP1
        && (segment.contents().starts_with(XMP_PREFIX)
            || segment.contents().starts_with(EXTENDED_XMP_PREFIX))
}

fn remove_xmp_segments(segments: &mut Vec<JpegSegment>) -> usize {
    let before = segments.len();
    segments.retain(|s| !is_xmp_segment(s));
    before - segments.len()
}

fn upsert_xmp(segments: &mut Vec<JpegSegment>, packets: &XmpPackets) -> Result<()> {
    let mut new_segments = Vec::with_capacity(2);
    new_segments.push(app1(XMP_PREFIX, &[], &packets.main));
    if let Some(ext) = &packets.extended {
        new_segments.extend(extended_segments(ext)?);
    }

    let insert_at = segments
        .iter()
        .position(|s| {
            let m = s.marker();
            m != markers::APP0 && m != markers::APP1
        })
        .unwrap_or(segments.len());
    segments.splice(insert_at..insert_at, new_segments);
    Ok(())
}

fn extended_segments(ext: &ExtendedXmp) -> Result<Vec<JpegSegment>> {
    if ext.guid.len() != GUID_LEN {
        return Err(Error::metadata(format!(
            "extended XMP GUID must be {GUID_LEN} characters"
        )));
    }
    let total = u32::try_from(ext.packet.len())
        .map_err(|_| Error::metadata("extended XMP larger than 4 GiB"))?;

    let mut out = Vec::with_capacity(ext.packet.len().div_ceil(EXTENDED_CHUNK_SIZE));
    for (i, chunk) in ext.packet.chunks(EXTENDED_CHUNK_SIZE).enumerate() {
        let offset = (i * EXTENDED_CHUNK_SIZE) as u32;
        let mut header = Vec::with_capacity(GUID_LEN + 8);
        header.extend_from_slice(ext.guid.as_bytes());
        header.extend_from_slice(&total.to_be_bytes());
        header.extend_from_slice(&offset.to_be_bytes());
        out.push(app1(EXTENDED_XMP_PREFIX, &header, chunk));
    }
    Ok(out)
}

fn app1(prefix: &[u8], header: &[u8], body: &[u8]) -> JpegSegment {
    let mut contents = BytesMut::with_capacity(prefix.len() + header.len() + body.len());
    contents.extend_from_slice(prefix);
    contents.extend_from_slice(header);
    contents.extend_from_slice(body);
    JpegSegment::new_with_contents(markers::APP1, contents.freeze())
}

/// How the gain map is carried in the XMP.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum XmpLayout {
    Inline,
    Extended,
}

/// Gain map information recovered from a container JPEG.
#[derive(Debug, Clone)]
pub struct ProbedGainMap {
    pub version: String,
    pub metadata: GainMapMetadata,
    pub layout: XmpLayout,
    pub gain_map_jpeg: Vec<u8>,
    pub gain_map_dimensions: (u32, u32),
}

/// Read gain map XMP from a JPEG. `Ok(None)` when the file carries none.
pub fn probe_gainmap_metadata(buf: &[u8]) -> Result<Option<ProbedGainMap>> {
    let jpeg = Jpeg::from_bytes(Bytes::copy_from_slice(buf))?;
    let Some(main) = jpeg
        .segments()
        .iter()
        .find(|s| s.marker() == markers::APP1 && s.contents().starts_with(XMP_PREFIX))
        .map(|s| s.contents().slice(XMP_PREFIX.len()..))
    else {
        return Ok(None);
    };
    let Some(parsed) = xmp::parse_xmp(&main)? else {
        return Ok(None);
    };

    let (layout, gain_map_jpeg) = match (parsed.gain_map_data, parsed.extended_guid) {
        (Some(data), _) => (XmpLayout::Inline, data),
        (None, Some(guid)) => {
            let packet = reassemble_extended(jpeg.segments(), &guid)?;
            (XmpLayout::Extended, xmp::parse_extended_xmp(&packet)?)
        }
        (None, None) => return Err(Error::metadata("gain map XMP carries no GImage:Data")),
    };
    let gain_map_dimensions = jpeg_dimensions(&gain_map_jpeg)?;

    Ok(Some(ProbedGainMap {
        version: parsed.version,
        metadata: parsed.metadata,
        layout,
        gain_map_jpeg,
        gain_map_dimensions,
    }))
}

fn reassemble_extended(segments: &[JpegSegment], guid: &str) -> Result<Vec<u8>> {
    let mut chunks = Vec::new();
    for seg in segments {
        let contents = seg.contents();
        if seg.marker() != markers::APP1 || !contents.starts_with(EXTENDED_XMP_PREFIX) {
            continue;
        }
        let rest = &contents[EXTENDED_XMP_PREFIX.len()..];
        if rest.len() < GUID_LEN + 8 || &rest[..GUID_LEN] != guid.as_bytes() {
            continue;
        }
        let total = read_u32_be(&rest[GUID_LEN..GUID_LEN + 4]) as usize;
        let offset = read_u32_be(&rest[GUID_LEN + 4..GUID_LEN + 8]) as usize;
        chunks.push((total, offset, &rest[GUID_LEN + 8..]));
    }

    let Some(&(total, _, _)) = chunks.first() else {
        return Err(Error::metadata(format!("extended XMP {guid} not found")));
    };
    if chunks.iter().any(|(t, _, _)| *t != total) {
        return Err(Error::metadata(format!(
            "extended XMP {guid} chunks disagree on the total length"
        )));
    }
    // The declared length is untrusted; the chunks present bound it.
    let filled: usize = chunks.iter().map(|(_, _, data)| data.len()).sum();
    if filled != total {
        return Err(Error::metadata(format!(
            "extended XMP {guid} incomplete: {filled} of {total} bytes"
        )));
    }

    let mut packet = vec![0; total];
    for (_, offset, data) in chunks {
        let end = offset
            .checked_add(data.len())
            .filter(|end| *end <= total)
            .ok_or_else(|| Error::metadata("extended XMP chunk out of bounds"))?;
        packet[offset..end].copy_from_slice(data);
    }

    let digest = format!("{:X}", md5::compute(&packet));
    if !digest.eq_ignore_ascii_case(guid) {
        log::warn!("extended XMP digest {digest} does not match GUID {guid}");
    }
    Ok(packet)
}

fn read_u32_be(bytes: &[u8]) -> u32 {
    let mut raw = [0u8; 4];
    raw.copy_from_slice(bytes);
    u32::from_be_bytes(raw)
}

fn jpeg_dimensions(data: &[u8]) -> Result<(u32, u32)> {
    let mut decoder = jpeg_decoder::Decoder::new(data);
    decoder
        .read_info()
        .map_err(|e| Error::metadata(format!("embedded gain map is not a JPEG: {e}")))?;
    let info = decoder
        .info()
        .ok_or_else(|| Error::metadata("embedded gain map has no frame header"))?;
    Ok((u32::from(info.width), u32::from(info.height)))
}
