use crate::cursor::ByteCursor;
use crate::fourcc::{BoxKey, FourCC};
use std::collections::HashMap;

/// A value returned from a payload decoder.
///
/// Decoders may return either a human-readable text summary or structured
/// data suitable for JSON output.
#[derive(Debug, Clone)]
pub enum PayloadValue {
    Text(String),
    Structured(StructuredData),
}

/// Structured payload data for boxes with a registered decoder.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub enum StructuredData {
    /// File Type Box (ftyp)
    FileType(FtypData),
    /// Movie Header Box (mvhd)
    MovieHeader(MvhdData),
    /// Handler Reference Box (hdlr)
    HandlerReference(HdlrData),
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct FtypData {
    pub major_brand: String,
    pub minor_version: u32,
    pub compatible_brands: Vec<String>,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct MvhdData {
    pub version: u8,
    pub flags: u32,
    pub timescale: u32,
    pub duration: u64,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct HdlrData {
    pub version: u8,
    pub flags: u32,
    pub handler_type: String,
    pub name: String,
}

/// Trait for custom payload decoders.
///
/// A decoder interprets the raw payload of a specific box type (identified
/// by a [`BoxKey`]) and returns a [`PayloadValue`].
pub trait PayloadDecoder: Send + Sync {
    fn decode(&self, cur: &mut ByteCursor) -> anyhow::Result<PayloadValue>;
}

/// What the registry knows about one box type: a display name, whether its
/// payload is a sequence of child boxes, and an optional payload decoder.
pub struct BoxTemplate {
    pub name: &'static str,
    pub container: bool,
    decoder: Option<Box<dyn PayloadDecoder>>,
}

/// Registry of box templates keyed by [`BoxKey`] (4CC or GUID).
///
/// The registry is immutable once constructed; use
/// [`BoxRegistry::with_container`] / [`BoxRegistry::with_leaf`] /
/// [`BoxRegistry::with_decoder`] to build it fluently. Types with no entry
/// fall back to a generic opaque leaf.
pub struct BoxRegistry {
    map: HashMap<BoxKey, BoxTemplate>,
}

impl BoxRegistry {
    pub fn new() -> Self {
        Self { map: HashMap::new() }
    }

    /// Register a container type: its payload is parsed as child boxes.
    pub fn with_container(mut self, key: BoxKey, name: &'static str) -> Self {
        self.map.insert(
            key,
            BoxTemplate {
                name,
                container: true,
                decoder: None,
            },
        );
        self
    }

    /// Register a named leaf type with opaque payload.
    pub fn with_leaf(mut self, key: BoxKey, name: &'static str) -> Self {
        self.map.insert(
            key,
            BoxTemplate {
                name,
                container: false,
                decoder: None,
            },
        );
        self
    }

    /// Register a leaf type with a payload decoder.
    pub fn with_decoder(
        mut self,
        key: BoxKey,
        name: &'static str,
        dec: Box<dyn PayloadDecoder>,
    ) -> Self {
        self.map.insert(
            key,
            BoxTemplate {
                name,
                container: false,
                decoder: Some(dec),
            },
        );
        self
    }

    pub fn lookup(&self, key: &BoxKey) -> Option<&BoxTemplate> {
        self.map.get(key)
    }

    pub fn is_container(&self, key: &BoxKey) -> bool {
        self.map.get(key).map(|t| t.container).unwrap_or(false)
    }

    /// Human-readable name for a type, or a generic label for unknowns.
    pub fn name(&self, key: &BoxKey) -> &'static str {
        self.map.get(key).map(|t| t.name).unwrap_or("Unknown Box")
    }

    /// Try to decode a payload using a registered decoder.
    ///
    /// Returns `None` if no decoder exists for the given key.
    pub fn decode(&self, key: &BoxKey, payload: &[u8]) -> Option<anyhow::Result<PayloadValue>> {
        self.map
            .get(key)
            .and_then(|t| t.decoder.as_ref())
            .map(|d| d.decode(&mut ByteCursor::new(payload)))
    }
}

impl Default for BoxRegistry {
    fn default() -> Self {
        Self::new()
    }
}

// ---------- Decoders ----------

// ftyp: major + minor + compatible brands
pub struct FtypDecoder;

impl PayloadDecoder for FtypDecoder {
    fn decode(&self, cur: &mut ByteCursor) -> anyhow::Result<PayloadValue> {
        let major = cur.read_fourcc()?;
        let minor = cur.read_u32()?;

        let mut brands = Vec::new();
        while cur.remaining() >= 4 {
            brands.push(cur.read_fourcc()?.as_str_lossy());
        }

        Ok(PayloadValue::Structured(StructuredData::FileType(FtypData {
            major_brand: major.as_str_lossy(),
            minor_version: minor,
            compatible_brands: brands,
        })))
    }
}

// mvhd: timescale + duration
pub struct MvhdDecoder;

impl PayloadDecoder for MvhdDecoder {
    fn decode(&self, cur: &mut ByteCursor) -> anyhow::Result<PayloadValue> {
        let version = cur.read_u8()?;
        let flags = {
            let f = cur.read_bytes(3)?;
            ((f[0] as u32) << 16) | ((f[1] as u32) << 8) | (f[2] as u32)
        };

        let (timescale, duration) = if version == 1 {
            let _creation = cur.read_u64()?;
            let _modification = cur.read_u64()?;
            let ts = cur.read_u32()?;
            let dur = cur.read_u64()?;
            (ts, dur)
        } else {
            let _creation = cur.read_u32()?;
            let _modification = cur.read_u32()?;
            let ts = cur.read_u32()?;
            let dur = cur.read_u32()? as u64;
            (ts, dur)
        };

        Ok(PayloadValue::Structured(StructuredData::MovieHeader(
            MvhdData {
                version,
                flags,
                timescale,
                duration,
            },
        )))
    }
}

// hdlr: handler type + name
pub struct HdlrDecoder;

impl PayloadDecoder for HdlrDecoder {
    fn decode(&self, cur: &mut ByteCursor) -> anyhow::Result<PayloadValue> {
        let version = cur.read_u8()?;
        let flags = {
            let f = cur.read_bytes(3)?;
            ((f[0] as u32) << 16) | ((f[1] as u32) << 8) | (f[2] as u32)
        };

        let _pre_defined = cur.read_u32()?;
        let handler_type = cur.read_fourcc()?;

        // reserved (3 * 4 bytes)
        let _reserved = cur.read_bytes(12)?;

        // name: rest of payload, trailing nulls stripped
        let mut name_bytes = cur.read_bytes(cur.remaining())?.to_vec();
        while name_bytes.last() == Some(&0) {
            name_bytes.pop();
        }
        let name = String::from_utf8_lossy(&name_bytes).to_string();

        Ok(PayloadValue::Structured(StructuredData::HandlerReference(
            HdlrData {
                version,
                flags,
                handler_type: handler_type.as_str_lossy(),
                name,
            },
        )))
    }
}

// ---------- Default registry ----------

/// Registry covering the standard ISOBMFF container set plus decoders for
/// the common header boxes.
pub fn default_registry() -> BoxRegistry {
    fn cc(s: &[u8; 4]) -> BoxKey {
        BoxKey::FourCC(FourCC(*s))
    }

    BoxRegistry::new()
        .with_container(cc(b"moov"), "Movie Box")
        .with_container(cc(b"trak"), "Track Box")
        .with_container(cc(b"mdia"), "Media Box")
        .with_container(cc(b"minf"), "Media Information Box")
        .with_container(cc(b"stbl"), "Sample Table Box")
        .with_container(cc(b"edts"), "Edit Box")
        .with_container(cc(b"udta"), "User Data Box")
        .with_container(cc(b"moof"), "Movie Fragment Box")
        .with_container(cc(b"traf"), "Track Fragment Box")
        .with_container(cc(b"mvex"), "Movie Extends Box")
        .with_container(cc(b"mfra"), "Movie Fragment Random Access Box")
        .with_container(cc(b"dinf"), "Data Information Box")
        .with_container(cc(b"sinf"), "Protection Scheme Information Box")
        .with_container(cc(b"schi"), "Scheme Information Box")
        .with_container(cc(b"ipro"), "Item Protection Box")
        .with_container(cc(b"meco"), "Additional Metadata Container Box")
        .with_container(cc(b"iprp"), "Item Properties Box")
        .with_container(cc(b"ipco"), "Item Property Container Box")
        .with_leaf(cc(b"mdat"), "Media Data Box")
        .with_leaf(cc(b"free"), "Free Space Box")
        .with_leaf(cc(b"skip"), "Free Space Box")
        .with_leaf(cc(b"tkhd"), "Track Header Box")
        .with_leaf(cc(b"mdhd"), "Media Header Box")
        .with_leaf(cc(b"stsd"), "Sample Description Box")
        .with_leaf(cc(b"stts"), "Decoding Time to Sample Box")
        .with_leaf(cc(b"stsc"), "Sample To Chunk Box")
        .with_leaf(cc(b"stsz"), "Sample Size Box")
        .with_leaf(cc(b"stco"), "Chunk Offset Box")
        .with_leaf(cc(b"co64"), "Chunk Large Offset Box")
        .with_leaf(cc(b"stss"), "Sync Sample Box")
        .with_leaf(cc(b"elst"), "Edit List Box")
        .with_leaf(cc(b"sidx"), "Segment Index Box")
        .with_decoder(cc(b"ftyp"), "File Type Box", Box::new(FtypDecoder))
        .with_decoder(cc(b"mvhd"), "Movie Header Box", Box::new(MvhdDecoder))
        .with_decoder(cc(b"hdlr"), "Handler Reference Box", Box::new(HdlrDecoder))
}
