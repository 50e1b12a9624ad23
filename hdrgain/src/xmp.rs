//! Gain map XMP packets: writer (quick-xml) and reader (roxmltree).

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use quick_xml::Writer;
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};

use crate::error::{Error, Result};
use crate::types::GainMapMetadata;

/// APP1 signature of a standard XMP packet.
pub const XMP_PREFIX: &[u8] = b"http://ns.adobe.com/xap/1.0/\0";
/// APP1 signature of an extended XMP chunk.
pub const EXTENDED_XMP_PREFIX: &[u8] = b"http://ns.adobe.com/xmp/extension/\0";
/// Largest XMP body that fits one APP1 segment next to [`XMP_PREFIX`].
pub const MAX_XMP_BODY: usize = 65504;
/// Payload bytes per extended XMP chunk.
pub const EXTENDED_CHUNK_SIZE: usize = 65400;

const NS_X: &str = "adobe:ns:meta/";
const NS_RDF: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#";
const NS_GCONTAINER: &str = "http://ns.google.com/photos/1.0/container/";
const NS_GIMAGE: &str = "http://ns.google.com/photos/1.0/image/";
const NS_GAINMAP: &str = "http://ns.adobe.com/hdr/gainmap/1.0/";
const NS_XMP_NOTE: &str = "http://ns.adobe.com/xmp/note/";

const XMP_TOOLKIT: &str = concat!("hdrgain ", env!("CARGO_PKG_VERSION"));

/// Serialized XMP, split into a main packet and an optional extended one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmpPackets {
    pub main: Vec<u8>,
    /// Present when the gain map did not fit inline.
    pub extended: Option<ExtendedXmp>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtendedXmp {
    /// Upper-case hex MD5 of `packet`.
    pub guid: String,
    pub packet: Vec<u8>,
}

/// Build the XMP describing a two-image container, with the base64 gain
/// map inline when it fits and in an extended packet otherwise.
pub fn build_xmp(metadata: &GainMapMetadata, gain_map_base64: &str) -> Result<XmpPackets> {
    let inline = write_main_packet(metadata, Some(gain_map_base64), None)?;
    if inline.len() <= MAX_XMP_BODY {
        return Ok(XmpPackets {
            main: inline,
            extended: None,
        });
    }

    log::warn!(
        "XMP packet is {} bytes, moving gain map data to extended XMP",
        inline.len()
    );
    let packet = write_extended_packet(gain_map_base64)?;
    let guid = format!("{:X}", md5::compute(&packet));
    let main = write_main_packet(metadata, None, Some(&guid))?;
    if main.len() > MAX_XMP_BODY {
        return Err(Error::metadata(format!(
            "main XMP packet is {} bytes even without gain map data",
            main.len()
        )));
    }
    Ok(XmpPackets {
        main,
        extended: Some(ExtendedXmp { guid, packet }),
    })
}

fn write_main_packet(
    metadata: &GainMapMetadata,
    data: Option<&str>,
    extended_guid: Option<&str>,
) -> Result<Vec<u8>> {
    let mut writer = Writer::new(Vec::with_capacity(1024 + data.map_or(0, str::len)));
    open_envelope(&mut writer)?;

    let mut desc = BytesStart::new("rdf:Description");
    desc.push_attribute(("rdf:about", ""));
    desc.push_attribute(("xmlns:GContainer", NS_GCONTAINER));
    desc.push_attribute(("xmlns:GImage", NS_GIMAGE));
    desc.push_attribute(("xmlns:GainMap", NS_GAINMAP));
    if let Some(guid) = extended_guid {
        desc.push_attribute(("xmlns:xmpNote", NS_XMP_NOTE));
        desc.push_attribute(("xmpNote:HasExtendedXMP", guid));
    }
    writer.write_event(Event::Start(desc))?;
    writer.write_event(Event::Start(BytesStart::new("GContainer:Directory")))?;
    writer.write_event(Event::Start(BytesStart::new("rdf:Seq")))?;

    start_item(&mut writer, "Primary")?;
    writer.write_event(Event::End(BytesEnd::new("rdf:li")))?;

    start_item(&mut writer, "GainMap")?;
    write_gainmap_fields(&mut writer, metadata)?;
    if let Some(data) = data {
        write_text_element(&mut writer, "GImage:Data", data)?;
    }
    writer.write_event(Event::End(BytesEnd::new("rdf:li")))?;

    writer.write_event(Event::End(BytesEnd::new("rdf:Seq")))?;
    writer.write_event(Event::End(BytesEnd::new("GContainer:Directory")))?;
    writer.write_event(Event::End(BytesEnd::new("rdf:Description")))?;
    close_envelope(&mut writer)?;
    Ok(writer.into_inner())
}

fn write_extended_packet(data: &str) -> Result<Vec<u8>> {
    let mut writer = Writer::new(Vec::with_capacity(512 + data.len()));
    open_envelope(&mut writer)?;
    let mut desc = BytesStart::new("rdf:Description");
    desc.push_attribute(("rdf:about", ""));
    desc.push_attribute(("xmlns:GImage", NS_GIMAGE));
    writer.write_event(Event::Start(desc))?;
    write_text_element(&mut writer, "GImage:Data", data)?;
    writer.write_event(Event::End(BytesEnd::new("rdf:Description")))?;
    close_envelope(&mut writer)?;
    Ok(writer.into_inner())
}

fn open_envelope(writer: &mut Writer<Vec<u8>>) -> quick_xml::Result<()> {
    let mut xmp = BytesStart::new("x:xmpmeta");
    xmp.push_attribute(("xmlns:x", NS_X));
    xmp.push_attribute(("x:xmptk", XMP_TOOLKIT));
    writer.write_event(Event::Start(xmp))?;
    let mut rdf = BytesStart::new("rdf:RDF");
    rdf.push_attribute(("xmlns:rdf", NS_RDF));
    writer.write_event(Event::Start(rdf))?;
    Ok(())
}

fn close_envelope(writer: &mut Writer<Vec<u8>>) -> quick_xml::Result<()> {
    writer.write_event(Event::End(BytesEnd::new("rdf:RDF")))?;
    writer.write_event(Event::End(BytesEnd::new("x:xmpmeta")))?;
    Ok(())
}

fn start_item(writer: &mut Writer<Vec<u8>>, semantic: &str) -> quick_xml::Result<()> {
    let mut li = BytesStart::new("rdf:li");
    li.push_attribute(("rdf:parseType", "Resource"));
    writer.write_event(Event::Start(li))?;
    let mut item = BytesStart::new("GContainer:Item");
    item.push_attribute(("GContainer:Mime", "image/jpeg"));
    item.push_attribute(("GContainer:Semantic", semantic));
    writer.write_event(Event::Empty(item))?;
    Ok(())
}

fn write_gainmap_fields(
    writer: &mut Writer<Vec<u8>>,
    metadata: &GainMapMetadata,
) -> quick_xml::Result<()> {
    let max = format!("{:.6}", metadata.gain_map_max_log2);
    write_text_element(writer, "GainMap:Version", GainMapMetadata::VERSION)?;
    write_text_element(
        writer,
        "GainMap:GainMapMin",
        &per_channel(&format!("{:.1}", GainMapMetadata::GAIN_MAP_MIN)),
    )?;
    write_text_element(writer, "GainMap:GainMapMax", &per_channel(&max))?;
    write_text_element(
        writer,
        "GainMap:Gamma",
        &per_channel(&format!("{:.1}", GainMapMetadata::GAMMA)),
    )?;
    write_text_element(
        writer,
        "GainMap:OffsetSDR",
        &per_channel(&format!("{:.1}", GainMapMetadata::OFFSET_SDR)),
    )?;
    write_text_element(
        writer,
        "GainMap:OffsetHDR",
        &per_channel(&format!("{:.1}", GainMapMetadata::OFFSET_HDR)),
    )?;
    write_text_element(
        writer,
        "GainMap:HDRCapacityMin",
        &format!("{:.1}", GainMapMetadata::HDR_CAPACITY_MIN),
    )?;
    write_text_element(
        writer,
        "GainMap:HDRCapacityMax",
        &format!("{:.6}", metadata.hdr_capacity_max),
    )?;
    Ok(())
}

fn per_channel(value: &str) -> String {
    format!("{value}, {value}, {value}")
}

fn write_text_element(
    writer: &mut Writer<Vec<u8>>,
    name: &str,
    text: &str,
) -> quick_xml::Result<()> {
    writer.write_event(Event::Start(BytesStart::new(name)))?;
    writer.write_event(Event::Text(BytesText::new(text)))?;
    writer.write_event(Event::End(BytesEnd::new(name)))?;
    Ok(())
}

/// Gain map description read back from a main XMP packet.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedGainMapXmp {
    pub version: String,
    pub metadata: GainMapMetadata,
    /// GUID of the extended packet holding the gain map, if any.
    pub extended_guid: Option<String>,
    /// Decoded inline `GImage:Data`.
    pub gain_map_data: Option<Vec<u8>>,
}

/// Parse a main XMP packet. `Ok(None)` when it describes no gain map.
pub fn parse_xmp(body: &[u8]) -> Result<Option<ParsedGainMapXmp>> {
    let text = std::str::from_utf8(body)
        .map_err(|e| Error::metadata(format!("XMP is not UTF-8: {e}")))?;
    let doc = roxmltree::Document::parse(text)
        .map_err(|e| Error::metadata(format!("invalid XMP: {e}")))?;

    let Some(version) = find_field(&doc, NS_GAINMAP, "Version") else {
        return Ok(None);
    };
    let max_log2 = find_field(&doc, NS_GAINMAP, "GainMapMax")
        .ok_or_else(|| Error::metadata("GainMap:GainMapMax missing"))
        .and_then(|v| parse_first_channel(&v, "GainMapMax"))?;
    let capacity_max = match find_field(&doc, NS_GAINMAP, "HDRCapacityMax") {
        Some(v) => parse_first_channel(&v, "HDRCapacityMax")?,
        None => max_log2,
    };
    let gain_map_data = find_field(&doc, NS_GIMAGE, "Data")
        .map(|data| decode_base64(&data))
        .transpose()?;

    Ok(Some(ParsedGainMapXmp {
        version,
        metadata: GainMapMetadata {
            gain_map_max_log2: max_log2,
            hdr_capacity_max: capacity_max,
        },
        extended_guid: find_field(&doc, NS_XMP_NOTE, "HasExtendedXMP"),
        gain_map_data,
    }))
}

/// Pull `GImage:Data` out of a reassembled extended packet.
pub fn parse_extended_xmp(body: &[u8]) -> Result<Vec<u8>> {
    let text = std::str::from_utf8(body)
        .map_err(|e| Error::metadata(format!("extended XMP is not UTF-8: {e}")))?;
    let doc = roxmltree::Document::parse(text)
        .map_err(|e| Error::metadata(format!("invalid extended XMP: {e}")))?;
    let data = find_field(&doc, NS_GIMAGE, "Data")
        .ok_or_else(|| Error::metadata("extended XMP carries no GImage:Data"))?;
    decode_base64(&data)
}

// Writers differ on element vs attribute form, so accept both.
fn find_field(doc: &roxmltree::Document<'_>, ns: &str, local: &str) -> Option<String> {
    doc.descendants().find_map(|node| {
        if !node.is_element() {
            return None;
        }
        if node.has_tag_name((ns, local)) {
            return Some(node.text().unwrap_or("").trim().to_string());
        }
        node.attribute((ns, local)).map(|v| v.trim().to_string())
    })
}

fn parse_first_channel(value: &str, field: &str) -> Result<f32> {
    value
        .split(',')
        .next()
        .map(str::trim)
        .and_then(|v| v.parse::<f32>().ok())
        .ok_or_else(|| Error::metadata(format!("GainMap:{field} is not a number: {value:?}")))
}

fn decode_base64(data: &str) -> Result<Vec<u8>> {
    let cleaned: String = data.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    STANDARD
        .decode(cleaned)
        .map_err(|e| Error::metadata(format!("GImage:Data is not valid base64: {e}")))
}
