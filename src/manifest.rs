//! SVX manifest interpretation
//!
//! The manifest is an XML document of the form:
//!
//! ```xml
//! <grid gridSizeX="64" gridSizeY="32" gridSizeZ="64" slicesOrientation="Y">
//!   <channels>
//!     <channel type="DENSITY" slices="density/slice%04d.png"/>
//!   </channels>
//!   <metadata>
//!     <entry key="author" value="..."/>
//!   </metadata>
//! </grid>
//! ```
//!
//! Only a missing or malformed document is an error. Missing fields
//! resolve to a descriptor with nothing to convert.
//!
//! Documents are decoded from UTF-8, UTF-16 with a byte order mark, or a
//! declared ISO-8859-1 / US-ASCII encoding. Other declared encodings are
//! accepted only when the document is plain ASCII.

use crate::archive::SliceArchive;
use crate::error::{Result, SvxError};
use crate::types::Orientation;
use log::{debug, info, warn};
use roxmltree::{Document, Node};
use std::borrow::Cow;

/// Entry name of the manifest, matched case-insensitively
pub const MANIFEST_NAME: &str = "manifest.xml";

const ROOT_ELEMENT: &str = "grid";
const DENSITY_CHANNEL: &str = "DENSITY";

/// Everything the conversion needs from the manifest
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ManifestDescriptor {
    /// Slice entry name template of the density channel
    pub slice_name_pattern: Option<String>,

    /// Axis along which slices were taken
    pub orientation: Option<Orientation>,

    /// Number of slices along the orientation axis
    pub slice_count: usize,

    /// Informational key/value pairs, in document order
    pub metadata_entries: Vec<(String, String)>,
}

impl ManifestDescriptor {
    /// True when the manifest declares slices to convert
    pub fn has_slices(&self) -> bool {
        self.slice_count > 0
            && self
                .slice_name_pattern
                .as_deref()
                .is_some_and(|p| !p.is_empty())
    }

    /// Resolved orientation, `Unknown` when not stated
    pub fn orientation(&self) -> Orientation {
        self.orientation.unwrap_or(Orientation::Unknown)
    }

    /// Look up a metadata value by key
    pub fn metadata(&self, key: &str) -> Option<&str> {
        self.metadata_entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// Locate, load and interpret the manifest of an archive
pub fn read_manifest<A: SliceArchive + ?Sized>(archive: &mut A) -> Result<ManifestDescriptor> {
    let name = archive
        .find_entry_ci(MANIFEST_NAME)
        .ok_or(SvxError::ManifestNotFound)?;
    let data = archive.read_entry(&name)?;
    parse_manifest(&data)
}

/// Encoding named by the XML declaration, if any
fn declared_encoding(data: &[u8]) -> Option<String> {
    let data = data.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(data);
    if !data.starts_with(b"<?xml") {
        return None;
    }
    let end = data.windows(2).position(|w| w == b"?>")?;
    let decl = &data[..end];
    let at = decl.windows(8).position(|w| w == b"encoding")?;

    let mut rest = decl[at + 8..].iter().copied().skip_while(u8::is_ascii_whitespace);
    if rest.next()? != b'=' {
        return None;
    }
    let mut rest = rest.skip_while(u8::is_ascii_whitespace);
    let quote = rest.next().filter(|q| *q == b'"' || *q == b'\'')?;
    let name: Vec<u8> = rest.take_while(|c| *c != quote).collect();
    Some(String::from_utf8_lossy(&name).into_owned())
}

fn decode_utf16(data: &[u8], unit: fn([u8; 2]) -> u16) -> Result<String> {
    let units = data.chunks_exact(2).map(|pair| unit([pair[0], pair[1]]));
    char::decode_utf16(units)
        .collect::<std::result::Result<String, _>>()
        .map_err(|e| SvxError::ManifestParse(e.to_string()))
}

fn utf8(data: &[u8]) -> Result<Cow<'_, str>> {
    std::str::from_utf8(data)
        .map(Cow::Borrowed)
        .map_err(|e| SvxError::ManifestParse(e.to_string()))
}

/// Decode manifest bytes to text
fn decode_text(data: &[u8]) -> Result<Cow<'_, str>> {
    if let Some(rest) = data.strip_prefix(b"\xFF\xFE") {
        return decode_utf16(rest, u16::from_le_bytes).map(Cow::Owned);
    }
    if let Some(rest) = data.strip_prefix(b"\xFE\xFF") {
        return decode_utf16(rest, u16::from_be_bytes).map(Cow::Owned);
    }

    let encoding = declared_encoding(data).map(|e| e.to_ascii_lowercase());
    match encoding.as_deref() {
        None | Some("utf-8") | Some("utf8") => utf8(data),
        Some("iso-8859-1" | "iso8859-1" | "iso_8859-1" | "latin1" | "l1")
        | Some("us-ascii" | "ascii") => {
            Ok(Cow::Owned(data.iter().map(|&b| char::from(b)).collect()))
        }
        Some(other) if data.is_ascii() => {
            debug!("Manifest declares {} but is plain ASCII", other);
            utf8(data)
        }
        Some(other) => Err(SvxError::ManifestParse(format!(
            "unsupported manifest encoding {}",
            other
        ))),
    }
}

/// Interpret manifest bytes
pub fn parse_manifest(data: &[u8]) -> Result<ManifestDescriptor> {
    let text = decode_text(data)?;
    let doc = Document::parse(&text).map_err(|e| SvxError::ManifestParse(e.to_string()))?;

    let root = doc.root_element();
    if !root.has_tag_name(ROOT_ELEMENT) {
        warn!(
            "Manifest root is <{}>, expected <{}>; nothing to convert",
            root.tag_name().name(),
            ROOT_ELEMENT
        );
        return Ok(ManifestDescriptor::default());
    }

    let slice_name_pattern = density_slices(root).map(str::to_string);
    if let Some(pattern) = &slice_name_pattern {
        info!("\tSlice name format: {}", pattern);
    }

    let orientation_attr = root.attribute("slicesOrientation");
    let orientation = match orientation_attr.filter(|v| !v.is_empty()) {
        Some(value) => {
            info!("\tOrientation: {}", value);
            Some(Orientation::from_attribute(Some(value)))
        }
        None => None,
    };

    let resolved = orientation.unwrap_or(Orientation::Unknown);
    if resolved == Orientation::Unknown {
        warn!("\tNo orientation stated. Assuming Y.");
    }

    let slice_count = root
        .attribute(resolved.grid_size_attribute())
        .and_then(parse_leading_int)
        .map(|n| n.max(0) as usize)
        .unwrap_or(0);
    info!("\tDepth: {}", slice_count);

    let metadata_entries = metadata_entries(root);
    for (key, value) in &metadata_entries {
        info!("\t{}: {}", key, value);
    }

    Ok(ManifestDescriptor {
        slice_name_pattern,
        orientation,
        slice_count,
        metadata_entries,
    })
}

fn child_elements<'a, 'input: 'a>(
    node: Node<'a, 'input>,
    name: &'a str,
) -> impl Iterator<Item = Node<'a, 'input>> + 'a {
    node.children()
        .filter(move |n| n.is_element() && n.has_tag_name(name))
}

/// `slices` of the first density channel that has one
fn density_slices<'a>(root: Node<'a, '_>) -> Option<&'a str> {
    child_elements(root, "channels")
        .flat_map(|channels| child_elements(channels, "channel"))
        .filter(|channel| channel.attribute("type") == Some(DENSITY_CHANNEL))
        .find_map(|channel| channel.attribute("slices"))
}

/// `key`/`value` pairs of every complete metadata entry
fn metadata_entries(root: Node<'_, '_>) -> Vec<(String, String)> {
    child_elements(root, "metadata")
        .flat_map(|metadata| child_elements(metadata, "entry"))
        .filter_map(|entry| {
            let key = entry.attribute("key")?;
            let value = entry.attribute("value")?;
            Some((key.to_string(), value.to_string()))
        })
        .collect()
}

/// Leading base-10 integer, in the manner of `sscanf("%d")`
fn parse_leading_int(value: &str) -> Option<i64> {
    let trimmed = value.trim_start();
    let (negative, digits) = match trimmed.as_bytes().first() {
        Some(b'-') => (true, &trimmed[1..]),
        Some(b'+') => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };

    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    if end == 0 {
        return None;
    }

    let magnitude: i64 = digits[..end].parse().ok()?;
    Some(if negative { -magnitude } else { magnitude })
}
