use crate::cursor::ByteCursor;
use crate::error::{Error, Result};
use crate::fourcc::FourCC;
use crate::synchsafe;
use log::debug;

bitflags::bitflags! {
    /// Frame status and format flags, version-independent.
    ///
    /// The in-memory representation always uses the version-4 bit meanings;
    /// the version-3 layout exists only on disk and is translated at the
    /// decode/encode boundary.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct FrameFlags: u16 {
        const DISCARD_ON_TAG_CHANGE  = 0x4000;
        const DISCARD_ON_FILE_CHANGE = 0x2000;
        const READ_ONLY              = 0x1000;
        const GROUPING_IDENTITY      = 0x0040;
        const COMPRESSION            = 0x0008;
        const ENCRYPTION             = 0x0004;
        const UNSYNCHRONISATION      = 0x0002;
        const DATA_LENGTH_INDICATOR  = 0x0001;
    }
}

impl FrameFlags {
    /// Translate an on-disk version-3 flag word into the version-independent
    /// representation.
    pub fn from_v3_bits(raw: u16) -> Self {
        let mut f = FrameFlags::empty();
        if raw & 0x8000 != 0 {
            f |= FrameFlags::DISCARD_ON_TAG_CHANGE;
        }
        if raw & 0x4000 != 0 {
            f |= FrameFlags::DISCARD_ON_FILE_CHANGE;
        }
        if raw & 0x2000 != 0 {
            f |= FrameFlags::READ_ONLY;
        }
        if raw & 0x0080 != 0 {
            f |= FrameFlags::COMPRESSION;
        }
        if raw & 0x0040 != 0 {
            f |= FrameFlags::ENCRYPTION;
        }
        if raw & 0x0020 != 0 {
            f |= FrameFlags::GROUPING_IDENTITY;
        }
        f
    }

    /// Derive the legacy version-3 flag word. Version-4-only flags
    /// (unsynchronisation, data length indicator) have no slot there and
    /// are dropped.
    pub fn to_v3_bits(self) -> u16 {
        let mut raw = 0u16;
        if self.contains(FrameFlags::DISCARD_ON_TAG_CHANGE) {
            raw |= 0x8000;
        }
        if self.contains(FrameFlags::DISCARD_ON_FILE_CHANGE) {
            raw |= 0x4000;
        }
        if self.contains(FrameFlags::READ_ONLY) {
            raw |= 0x2000;
        }
        if self.contains(FrameFlags::COMPRESSION) {
            raw |= 0x0080;
        }
        if self.contains(FrameFlags::ENCRYPTION) {
            raw |= 0x0040;
        }
        if self.contains(FrameFlags::GROUPING_IDENTITY) {
            raw |= 0x0020;
        }
        raw
    }
}

/// One ID3v2 tag frame: a 4-character identifier, a flag set, and the
/// decoded payload bytes.
#[derive(Debug, Clone)]
pub struct Frame {
    id: FourCC,
    flags: FrameFlags,
    /// Payload after un-unsynchronization.
    data: Vec<u8>,
    /// Logical payload size: the data length indicator when present,
    /// otherwise the declared on-disk size.
    data_length: u32,
}

impl Frame {
    /// On-disk header length: id + size + flags.
    pub const HEADER_LEN: usize = 10;

    pub fn new(id: FourCC, data: Vec<u8>) -> Self {
        let data_length = data.len() as u32;
        Self {
            id,
            flags: FrameFlags::empty(),
            data,
            data_length,
        }
    }

    pub fn id(&self) -> FourCC {
        self.id
    }

    pub fn flags(&self) -> FrameFlags {
        self.flags
    }

    pub fn set_flags(&mut self, flags: FrameFlags) {
        self.flags = flags;
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn set_data(&mut self, data: Vec<u8>) {
        self.data_length = data.len() as u32;
        self.data = data;
    }

    pub fn data_length(&self) -> u32 {
        self.data_length
    }

    /// Parse one frame at the cursor. `version` is the major version from
    /// the enclosing tag header; `global_unsync` is the tag-level
    /// "treat frames as unsynchronized" option (version 4 semantics).
    pub fn parse(cur: &mut ByteCursor, version: u8, global_unsync: bool) -> Result<Self> {
        let id = cur.read_fourcc()?;

        let (mut size, mut flags) = if version >= 4 {
            let s = cur.read_bytes(4)?;
            let size = synchsafe::decode_u28([s[0], s[1], s[2], s[3]]);
            let flags = FrameFlags::from_bits_truncate(cur.read_u16()?);
            (size, flags)
        } else {
            let size = cur.read_u32()?;
            let flags = FrameFlags::from_v3_bits(cur.read_u16()?);
            (size, flags)
        };

        // The data length indicator is counted in the on-disk size but is
        // not part of the payload.
        let mut declared_length = None;
        if flags.contains(FrameFlags::DATA_LENGTH_INDICATOR) {
            let b = cur.read_bytes(4)?;
            declared_length = Some(synchsafe::decode_u28([b[0], b[1], b[2], b[3]]));
            size = size.checked_sub(4).ok_or_else(|| {
                Error::MalformedContainer(format!(
                    "frame {id} declares size {size} with a data length indicator"
                ))
            })?;
        }

        let raw = cur.read_bytes(size as usize)?;
        let data = if flags.contains(FrameFlags::UNSYNCHRONISATION) || global_unsync {
            debug!("frame {id}: undoing unsynchronization ({size} bytes)");
            if global_unsync {
                flags |= FrameFlags::UNSYNCHRONISATION;
            }
            synchsafe::decode_unsync(raw)
        } else {
            raw.to_vec()
        };

        Ok(Self {
            id,
            flags,
            data,
            data_length: declared_length.unwrap_or(size),
        })
    }

    /// Serialize the frame for the given tag version.
    ///
    /// Under version 4, if unsynchronization encoding changes the payload
    /// length the frame widens its declared size, prepends a data length
    /// indicator carrying the pre-encode length, and sets both flags even
    /// when they were not set before.
    pub fn render(&self, version: u8) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity(Self::HEADER_LEN + self.data.len());

        if version >= 4 {
            let mut flags = self.flags;
            let encoded = synchsafe::encode_unsync(&self.data);
            let grew = encoded.len() != self.data.len();

            let payload = if flags.contains(FrameFlags::UNSYNCHRONISATION) || grew {
                if grew {
                    flags |= FrameFlags::UNSYNCHRONISATION | FrameFlags::DATA_LENGTH_INDICATOR;
                }
                encoded
            } else {
                self.data.clone()
            };

            let dli = flags
                .contains(FrameFlags::DATA_LENGTH_INDICATOR)
                .then_some(self.data.len() as u32);
            let disk_size = payload.len() as u32 + if dli.is_some() { 4 } else { 0 };

            out.extend_from_slice(&self.id.0);
            out.extend_from_slice(&synchsafe::encode_u28(disk_size)?);
            out.extend_from_slice(&flags.bits().to_be_bytes());
            if let Some(len) = dli {
                out.extend_from_slice(&synchsafe::encode_u28(len)?);
            }
            out.extend_from_slice(&payload);
        } else {
            // Version 3: plain 32-bit size, legacy flag layout, no
            // frame-level unsynchronization (the tag applies it globally).
            out.extend_from_slice(&self.id.0);
            out.extend_from_slice(&(self.data.len() as u32).to_be_bytes());
            out.extend_from_slice(&self.flags.to_v3_bits().to_be_bytes());
            out.extend_from_slice(&self.data);
        }

        Ok(out)
    }
}
