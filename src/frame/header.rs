//! Frame header encoding, decoding, and validation.
//!
//! The header is: 4-byte magic (LE), FLG, BD, an optional 8-byte content
//! size (LE), an optional 4-byte dictionary id (LE), and one check byte
//! holding bits [15:8] of `XXH32(FLG..dictId, seed 0)`.

use crate::frame::types::{
    Bd, Flg, FrameDescriptor, FrameError, FrameResult, BLOCK_MAX_ID_DEFAULT, BLOCK_MAX_ID_MIN,
    CHECKSUM_SEED, MAGIC, MAGIC_SKIPPABLE_MAX, MAGIC_SKIPPABLE_MIN, MAX_HEADER_SIZE,
};
use crate::xxhash::xxh32_oneshot;

// ─────────────────────────────────────────────────────────────────────────────
// Block-size and checksum helpers
// ─────────────────────────────────────────────────────────────────────────────

/// Maps a block-maximum-size id (4..=7) to its byte count:
/// `1 << (8 + 2·id)`, i.e. 64 KiB, 256 KiB, 1 MiB, 4 MiB.
#[inline]
pub fn block_size_from_id(id: u8) -> usize {
    debug_assert!((BLOCK_MAX_ID_MIN..=BLOCK_MAX_ID_DEFAULT).contains(&id));
    1usize << (8 + 2 * id as usize)
}

/// Extracts the header check byte from an XXH32 digest: bits [15:8].
#[inline]
pub fn check_byte(xxh: u32) -> u8 {
    (xxh >> 8) as u8
}

/// Whether `magic` introduces a skippable frame.
#[inline]
pub fn is_skippable_magic(magic: u32) -> bool {
    (MAGIC_SKIPPABLE_MIN..=MAGIC_SKIPPABLE_MAX).contains(&magic)
}

/// Byte count of the descriptor fields that follow FLG and BD, check byte
/// included.
#[inline]
pub fn ext_info_len(flg: &Flg) -> usize {
    (if flg.stream_size { 8 } else { 0 }) + (if flg.preset_dictionary { 4 } else { 0 }) + 1
}

// ─────────────────────────────────────────────────────────────────────────────
// Validation
// ─────────────────────────────────────────────────────────────────────────────

/// Validates a frame descriptor against what this codec supports.
///
/// Checks run in a fixed priority order so a descriptor with several
/// problems always reports the same kind:
/// version, preset dictionary, reserved1, block independence, block-maximum
/// id, remaining reserved bits.
pub fn validate(sd: &FrameDescriptor) -> FrameResult<()> {
    if sd.flg.version != 1 {
        return Err(FrameError::InvalidVersion);
    }
    if sd.flg.preset_dictionary {
        return Err(FrameError::PresetDictionaryNotSupported);
    }
    if sd.flg.reserved1 {
        return Err(FrameError::InvalidHeader);
    }
    if !sd.flg.block_independence {
        return Err(FrameError::BlockDependenceNotSupported);
    }
    if !(BLOCK_MAX_ID_MIN..=BLOCK_MAX_ID_DEFAULT).contains(&sd.bd.block_maximum_size) {
        return Err(FrameError::InvalidBlockMaximumSize);
    }
    if sd.bd.reserved3 != 0 || sd.bd.reserved2 {
        return Err(FrameError::InvalidHeader);
    }
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Encode / decode
// ─────────────────────────────────────────────────────────────────────────────

/// Serialises a frame header: magic, FLG, BD, optional fields, check byte.
///
/// The descriptor is assumed valid; drivers call [`validate`] first.
pub fn encode(sd: &FrameDescriptor) -> Vec<u8> {
    let mut out = Vec::with_capacity(MAX_HEADER_SIZE);
    out.extend_from_slice(&MAGIC.to_le_bytes());

    let sum_begin = out.len();
    out.push(sd.flg.to_byte());
    out.push(sd.bd.to_byte());
    if sd.flg.stream_size {
        out.extend_from_slice(&sd.stream_size.to_le_bytes());
    }
    if sd.flg.preset_dictionary {
        out.extend_from_slice(&sd.dict_id.to_le_bytes());
    }

    let h = xxh32_oneshot(&out[sum_begin..], CHECKSUM_SEED);
    out.push(check_byte(h));
    out
}

/// Parses and validates a frame header produced by [`encode`].
///
/// Returns the descriptor and the number of bytes consumed. `bytes` may
/// extend past the header.
pub fn decode(bytes: &[u8]) -> FrameResult<(FrameDescriptor, usize)> {
    if bytes.len() < 4 {
        return Err(FrameError::InvalidMagicNumber);
    }
    let magic = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
    if magic != MAGIC {
        return Err(FrameError::InvalidMagicNumber);
    }

    if bytes.len() < 4 + 2 {
        return Err(FrameError::InvalidHeader);
    }
    let flg = Flg::from_byte(bytes[4]);
    let bd = Bd::from_byte(bytes[5]);
    let mut sd = FrameDescriptor {
        flg,
        bd,
        stream_size: 0,
        dict_id: 0,
    };
    validate(&sd)?;

    let ext = ext_info_len(&flg);
    if bytes.len() < 6 + ext {
        return Err(FrameError::InvalidHeader);
    }
    let mut p = 6;
    if flg.stream_size {
        sd.stream_size = u64::from_le_bytes(bytes[p..p + 8].try_into().unwrap());
        p += 8;
    }
    if flg.preset_dictionary {
        sd.dict_id = u32::from_le_bytes(bytes[p..p + 4].try_into().unwrap());
        p += 4;
    }

    let expected = check_byte(xxh32_oneshot(&bytes[4..p], CHECKSUM_SEED));
    if bytes[p] != expected {
        return Err(FrameError::InvalidHeaderChecksum);
    }
    Ok((sd, p + 1))
}
