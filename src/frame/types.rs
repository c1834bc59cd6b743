//! LZ4 frame format types, wire constants, and error handling.

use core::fmt;

// ─────────────────────────────────────────────────────────────────────────────
// Wire constants
// ─────────────────────────────────────────────────────────────────────────────

/// Magic number opening every LZ4 frame (stored little-endian).
pub const MAGIC: u32 = 0x184D_2204;

/// First magic number of the skippable-frame range.
pub const MAGIC_SKIPPABLE_MIN: u32 = 0x184D_2A50;

/// Last magic number of the skippable-frame range.
pub const MAGIC_SKIPPABLE_MAX: u32 = 0x184D_2A5F;

/// End-of-stream marker: a block-size word of zero.
pub const EOS_MARKER: u32 = 0;

/// Seed for every XXH32 in the frame format.
pub const CHECKSUM_SEED: u32 = 0;

/// High bit of the block-size word: the payload is stored raw.
pub const BLOCK_UNCOMPRESSED_FLAG: u32 = 0x8000_0000;

/// Low 31 bits of the block-size word: the payload size in bytes.
pub const BLOCK_SIZE_MASK: u32 = 0x7FFF_FFFF;

/// Smallest valid block-maximum-size id (64 KiB).
pub const BLOCK_MAX_ID_MIN: u8 = 4;

/// Largest valid block-maximum-size id (4 MiB), also the default.
pub const BLOCK_MAX_ID_DEFAULT: u8 = 7;

/// Upper bound on the encoded header: magic + FLG + BD + content size +
/// dictionary id + check byte.
pub const MAX_HEADER_SIZE: usize = 4 + 2 + 8 + 4 + 1;

// ─────────────────────────────────────────────────────────────────────────────
// FLG / BD descriptor bytes
// ─────────────────────────────────────────────────────────────────────────────

/// The frame descriptor's FLG byte, unpacked.
///
/// Bit layout (LSB → MSB): `presetDictionary, reserved1, streamChecksum,
/// streamSize, blockChecksum, blockIndependence, version(2)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Flg {
    pub preset_dictionary: bool,
    pub reserved1: bool,
    pub stream_checksum: bool,
    pub stream_size: bool,
    pub block_checksum: bool,
    pub block_independence: bool,
    pub version: u8,
}

impl Flg {
    pub fn to_byte(self) -> u8 {
        u8::from(self.preset_dictionary)
            | (u8::from(self.reserved1) << 1)
            | (u8::from(self.stream_checksum) << 2)
            | (u8::from(self.stream_size) << 3)
            | (u8::from(self.block_checksum) << 4)
            | (u8::from(self.block_independence) << 5)
            | ((self.version & 3) << 6)
    }

    pub fn from_byte(b: u8) -> Self {
        Flg {
            preset_dictionary: b & 1 != 0,
            reserved1: b >> 1 & 1 != 0,
            stream_checksum: b >> 2 & 1 != 0,
            stream_size: b >> 3 & 1 != 0,
            block_checksum: b >> 4 & 1 != 0,
            block_independence: b >> 5 & 1 != 0,
            version: b >> 6 & 3,
        }
    }
}

impl Default for Flg {
    /// Canonical defaults: format version 1, independent blocks, content
    /// checksum on, everything else off.
    fn default() -> Self {
        Flg {
            preset_dictionary: false,
            reserved1: false,
            stream_checksum: true,
            stream_size: false,
            block_checksum: false,
            block_independence: true,
            version: 1,
        }
    }
}

/// The frame descriptor's BD byte, unpacked.
///
/// Bit layout (LSB → MSB): `reserved3(4), blockMaximumSize(3), reserved2(1)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bd {
    pub reserved3: u8,
    pub block_maximum_size: u8,
    pub reserved2: bool,
}

impl Bd {
    pub fn to_byte(self) -> u8 {
        (self.reserved3 & 0x0F)
            | ((self.block_maximum_size & 7) << 4)
            | (u8::from(self.reserved2) << 7)
    }

    pub fn from_byte(b: u8) -> Self {
        Bd {
            reserved3: b & 0x0F,
            block_maximum_size: b >> 4 & 7,
            reserved2: b >> 7 & 1 != 0,
        }
    }
}

impl Default for Bd {
    fn default() -> Self {
        Bd {
            reserved3: 0,
            block_maximum_size: BLOCK_MAX_ID_DEFAULT,
            reserved2: false,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Frame descriptor
// ─────────────────────────────────────────────────────────────────────────────

/// The decoded frame descriptor: FLG and BD plus the optional trailing
/// fields they announce.
///
/// Constructed once when a frame is opened and immutable for the frame's
/// duration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FrameDescriptor {
    pub flg: Flg,
    pub bd: Bd,
    /// Original content length in bytes; meaningful when `flg.stream_size`.
    pub stream_size: u64,
    /// Dictionary id; meaningful when `flg.preset_dictionary` (which
    /// validation rejects, so only ever seen on the wire-codec level).
    pub dict_id: u32,
}

impl FrameDescriptor {
    /// The frame's maximum block size in bytes, `1 << (8 + 2·id)`.
    pub fn max_block_size(&self) -> usize {
        crate::frame::header::block_size_from_id(self.bd.block_maximum_size)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Execution mode
// ─────────────────────────────────────────────────────────────────────────────

/// How the block pipeline executes its tasks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    /// One worker thread per in-flight block, bounded by the buffer pool.
    #[default]
    Parallel,
    /// Every task runs to completion inline on the driver thread.
    Sequential,
}

impl Mode {
    #[inline]
    pub fn is_sequential(self) -> bool {
        matches!(self, Mode::Sequential)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Error taxonomy
// ─────────────────────────────────────────────────────────────────────────────

/// Frame-level error kinds.
///
/// `Error` is the coarse sentinel latched by I/O helpers; drivers refine it
/// into a step-specific kind before returning. All other variants are
/// specific and sticky: once one is recorded for a frame, later errors do
/// not replace it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameError {
    /// Generic failure, typically a raw I/O error inside a helper.
    Error,
    InvalidMagicNumber,
    InvalidHeader,
    InvalidHeaderChecksum,
    InvalidVersion,
    InvalidBlockMaximumSize,
    PresetDictionaryNotSupported,
    BlockDependenceNotSupported,
    CannotWriteHeader,
    CannotWriteEos,
    CannotWriteStreamChecksum,
    CannotReadBlockSize,
    CannotReadBlockData,
    CannotReadBlockChecksum,
    CannotReadStreamChecksum,
    StreamChecksumMismatch,
    BlockChecksumMismatch,
    DecompressFail,
}

impl FrameError {
    /// Stable upper-case name of the error kind.
    pub fn name(&self) -> &'static str {
        match self {
            FrameError::Error => "ERROR",
            FrameError::InvalidMagicNumber => "INVALID_MAGIC_NUMBER",
            FrameError::InvalidHeader => "INVALID_HEADER",
            FrameError::InvalidHeaderChecksum => "INVALID_HEADER_CHECKSUM",
            FrameError::InvalidVersion => "INVALID_VERSION",
            FrameError::InvalidBlockMaximumSize => "INVALID_BLOCK_MAXIMUM_SIZE",
            FrameError::PresetDictionaryNotSupported => "PRESET_DICTIONARY_NOT_SUPPORTED",
            FrameError::BlockDependenceNotSupported => "BLOCK_DEPENDENCE_NOT_SUPPORTED",
            FrameError::CannotWriteHeader => "CANNOT_WRITE_HEADER",
            FrameError::CannotWriteEos => "CANNOT_WRITE_EOS",
            FrameError::CannotWriteStreamChecksum => "CANNOT_WRITE_STREAM_CHECKSUM",
            FrameError::CannotReadBlockSize => "CANNOT_READ_BLOCK_SIZE",
            FrameError::CannotReadBlockData => "CANNOT_READ_BLOCK_DATA",
            FrameError::CannotReadBlockChecksum => "CANNOT_READ_BLOCK_CHECKSUM",
            FrameError::CannotReadStreamChecksum => "CANNOT_READ_STREAM_CHECKSUM",
            FrameError::StreamChecksumMismatch => "STREAM_CHECKSUM_MISMATCH",
            FrameError::BlockChecksumMismatch => "BLOCK_CHECKSUM_MISMATCH",
            FrameError::DecompressFail => "DECOMPRESS_FAIL",
        }
    }

    /// Whether this is the coarse `ERROR` sentinel rather than a specific kind.
    #[inline]
    pub fn is_generic(&self) -> bool {
        matches!(self, FrameError::Error)
    }
}

impl fmt::Display for FrameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl std::error::Error for FrameError {}

/// Result alias used throughout the frame drivers.
pub type FrameResult<T> = Result<T, FrameError>;
