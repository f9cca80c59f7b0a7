use crate::cursor::ByteCursor;
use crate::error::{Error, Result};
use crate::frame::Frame;
use crate::synchsafe;
use log::debug;

bitflags::bitflags! {
    /// Tag header flag byte.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct TagFlags: u8 {
        const UNSYNCHRONISATION = 0x80;
        const EXTENDED_HEADER   = 0x40;
        const EXPERIMENTAL      = 0x20;
        const FOOTER            = 0x10;
    }
}

/// The 10-byte ID3v2 tag header.
///
/// The version is carried as a single fractional number (`major + minor/10`,
/// so bytes 4,0 read as 4.0). Splitting it back cannot express minor
/// versions of 10 or more; the two defined versions (3.0, 4.0) round-trip
/// exactly.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TagHeader {
    pub version: f32,
    pub flags: TagFlags,
    /// Tag size excluding this header and any footer, synchsafe on disk.
    pub size: u32,
}

impl TagHeader {
    pub const LEN: usize = 10;

    pub fn new(version: f32) -> Self {
        Self {
            version,
            flags: TagFlags::empty(),
            size: 0,
        }
    }

    pub fn major(&self) -> u8 {
        self.version as u8
    }

    pub fn minor(&self) -> u8 {
        ((self.version - self.major() as f32) * 10.0).round() as u8
    }

    pub fn parse(cur: &mut ByteCursor) -> Result<Self> {
        let magic = cur.read_bytes(3)?;
        if magic != b"ID3" {
            return Err(Error::MalformedContainer(
                "missing ID3 identifier at tag start".into(),
            ));
        }
        let major = cur.read_u8()?;
        let minor = cur.read_u8()?;
        let flags = TagFlags::from_bits_truncate(cur.read_u8()?);
        let s = cur.read_bytes(4)?;
        let size = synchsafe::decode_u28([s[0], s[1], s[2], s[3]]);
        Ok(Self {
            version: major as f32 + minor as f32 / 10.0,
            flags,
            size,
        })
    }

    pub fn render(&self) -> Result<[u8; Self::LEN]> {
        let mut out = [0u8; Self::LEN];
        out[0..3].copy_from_slice(b"ID3");
        out[3] = self.major();
        out[4] = self.minor();
        out[5] = self.flags.bits();
        out[6..10].copy_from_slice(&synchsafe::encode_u28(self.size)?);
        Ok(out)
    }
}

/// A complete ID3v2 tag: the header plus its ordered frame collection
/// (file order, duplicate identifiers preserved).
#[derive(Debug, Clone)]
pub struct Tag {
    header: TagHeader,
    /// Extended header bytes, kept verbatim for re-serialization.
    extended: Option<Vec<u8>>,
    frames: Vec<Frame>,
}

impl Tag {
    pub fn new(version: f32) -> Self {
        Self {
            header: TagHeader::new(version),
            extended: None,
            frames: Vec::new(),
        }
    }

    pub fn header(&self) -> &TagHeader {
        &self.header
    }

    pub fn header_mut(&mut self) -> &mut TagHeader {
        &mut self.header
    }

    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    /// Frames with the given 4-character identifier, in file order.
    pub fn frames_by_id(&self, id: &str) -> Vec<&Frame> {
        self.frames
            .iter()
            .filter(|f| f.id().as_str_lossy() == id)
            .collect()
    }

    /// Frames whose identifier matches a case-insensitive glob (`*`, `?`).
    pub fn frames_matching(&self, glob: &str) -> Vec<&Frame> {
        self.frames
            .iter()
            .filter(|f| f.id().matches_glob(glob))
            .collect()
    }

    pub fn add_frame(&mut self, frame: Frame) {
        self.frames.push(frame);
    }

    /// Parse a complete tag from a byte buffer.
    pub fn parse(buf: &[u8]) -> Result<Self> {
        let mut cur = ByteCursor::new(buf);
        let header = TagHeader::parse(&mut cur)?;
        let body = cur.read_bytes(header.size as usize)?;

        let major = header.major();
        let tag_unsync = header.flags.contains(TagFlags::UNSYNCHRONISATION);

        // Version 3 applies unsynchronization to the whole tag body at
        // once; version 4 moved it to individual frames.
        let decoded;
        let frames_buf: &[u8] = if major < 4 && tag_unsync {
            decoded = synchsafe::decode_unsync(body);
            &decoded
        } else {
            body
        };

        let mut fcur = ByteCursor::new(frames_buf);
        let extended = if header.flags.contains(TagFlags::EXTENDED_HEADER) {
            Some(Self::read_extended(&mut fcur, major)?)
        } else {
            None
        };

        let global_unsync = major >= 4 && tag_unsync;
        let mut frames = Vec::new();
        while fcur.remaining() >= Frame::HEADER_LEN {
            // Zero padding terminates the frame sequence.
            if frames_buf[fcur.offset()] == 0 {
                debug!("padding at offset {}, {} frames parsed", fcur.offset(), frames.len());
                break;
            }
            frames.push(Frame::parse(&mut fcur, major, global_unsync)?);
        }

        Ok(Self {
            header,
            extended,
            frames,
        })
    }

    fn read_extended(cur: &mut ByteCursor, major: u8) -> Result<Vec<u8>> {
        if major >= 4 {
            // Size field is synchsafe and counts the whole extended header.
            let s = cur.read_bytes(4)?;
            let total = synchsafe::decode_u28([s[0], s[1], s[2], s[3]]) as usize;
            let rest = total.checked_sub(4).ok_or_else(|| {
                Error::MalformedContainer(format!(
                    "extended header declares impossible size {total}"
                ))
            })?;
            let mut raw = s.to_vec();
            raw.extend_from_slice(cur.read_bytes(rest)?);
            Ok(raw)
        } else {
            // Version 3: plain 32-bit size excluding the size field itself.
            let s = cur.read_bytes(4)?;
            let rest = u32::from_be_bytes([s[0], s[1], s[2], s[3]]) as usize;
            let mut raw = s.to_vec();
            raw.extend_from_slice(cur.read_bytes(rest)?);
            Ok(raw)
        }
    }

    /// Serialize the tag: header, extended header (verbatim), frames, and
    /// a footer when the flag asks for one. The synchsafe size is
    /// recomputed from the rendered body, never trusted from parse.
    pub fn render(&self) -> Result<Vec<u8>> {
        let major = self.header.major();

        let mut body = Vec::new();
        if let Some(ext) = &self.extended {
            body.extend_from_slice(ext);
        }
        for f in &self.frames {
            body.extend_from_slice(&f.render(major)?);
        }

        let mut flags = self.header.flags;
        if major < 4 && flags.contains(TagFlags::UNSYNCHRONISATION) {
            body = synchsafe::encode_unsync(&body);
        }
        if major >= 4 {
            // Frame-level flags carry unsynchronization under version 4.
            flags.remove(TagFlags::UNSYNCHRONISATION);
        }
        if self.extended.is_none() {
            flags.remove(TagFlags::EXTENDED_HEADER);
        }

        let header = TagHeader {
            version: self.header.version,
            flags,
            size: body.len() as u32,
        };

        let mut out = Vec::with_capacity(TagHeader::LEN + body.len());
        out.extend_from_slice(&header.render()?);
        out.extend_from_slice(&body);

        if flags.contains(TagFlags::FOOTER) {
            let mut footer = header.render()?;
            footer[0..3].copy_from_slice(b"3DI");
            out.extend_from_slice(&footer);
        }

        Ok(out)
    }
}
