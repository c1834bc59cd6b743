// End-to-end tests for the frame drivers (frame::compress / frame::decompress).
//
// Coverage:
//   - literal wire-format scenarios: empty input, stored single byte,
//     multi-block zeros, block-checksum corruption, concatenated frames,
//     invalid-magic rewind
//   - round-trip across descriptor shapes, modes, and input sizes
//   - parallel output is byte-identical to sequential output
//   - corruption with checksums on is never silent
//   - skippable frames are consumed and discarded
//   - error paths: truncation, sink failures, failing codecs
//   - file-backed sources and pipe sources

use std::io::{self, BufReader, Cursor, Write};

use lz4par::frame::{compress_frame_to_vec, decompress_frame_to_vec};
use lz4par::xxhash::xxh32_oneshot;
use lz4par::{
    compress, decompress, BlockCodec, FrameDescriptor, FrameError, Lz4Codec, Mode, PipeSource,
    ReaderSource,
};

// ─────────────────────────────────────────────────────────────────────────────
// Helpers
// ─────────────────────────────────────────────────────────────────────────────

const HEADER_LEN: usize = 7; // magic + FLG + BD + check byte, no optional fields

fn descriptor(block_max_id: u8, block_checksum: bool) -> FrameDescriptor {
    let mut sd = FrameDescriptor::default();
    sd.bd.block_maximum_size = block_max_id;
    sd.flg.block_checksum = block_checksum;
    sd
}

/// Deterministic byte pattern that compresses but is not trivial.
fn patterned(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}

/// Deterministic pseudo-random bytes that LZ4 cannot shrink.
fn noise(len: usize) -> Vec<u8> {
    let mut state = 0x9E37_79B9_7F4A_7C15u64;
    (0..len)
        .map(|_| {
            state = state
                .wrapping_mul(6364136223846793005)
                .wrapping_add(1442695040888963407);
            (state >> 56) as u8
        })
        .collect()
}

/// Offsets of each block's (size-word, payload) within a frame, stopping at
/// the EOS marker. Assumes no optional descriptor fields.
fn walk_blocks(frame: &[u8], block_checksum: bool) -> Vec<(usize, usize, bool)> {
    let mut blocks = Vec::new();
    let mut p = HEADER_LEN;
    loop {
        let word = u32::from_le_bytes(frame[p..p + 4].try_into().unwrap());
        if word == 0 {
            break;
        }
        let raw = word & 0x8000_0000 != 0;
        let size = (word & 0x7FFF_FFFF) as usize;
        blocks.push((p, size, raw));
        p += 4 + size + if block_checksum { 4 } else { 0 };
    }
    blocks
}

// ─────────────────────────────────────────────────────────────────────────────
// Literal wire-format scenarios
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn empty_input_yields_header_eos_and_checksum() {
    let out = compress_frame_to_vec(b"", &FrameDescriptor::default(), Mode::Parallel).unwrap();

    let mut expected = vec![0x04, 0x22, 0x4D, 0x18, 0x64, 0x70];
    expected.push(((xxh32_oneshot(&[0x64, 0x70], 0) >> 8) & 0xFF) as u8);
    expected.extend_from_slice(&[0, 0, 0, 0]); // EOS
    expected.extend_from_slice(&0x02CC_5D05u32.to_le_bytes()); // XXH32("")
    assert_eq!(out, expected);

    assert_eq!(
        decompress_frame_to_vec(&out, Mode::Parallel).unwrap(),
        Vec::<u8>::new()
    );
}

#[test]
fn single_byte_is_stored_raw() {
    let out = compress_frame_to_vec(b"A", &FrameDescriptor::default(), Mode::Parallel).unwrap();

    // One byte cannot shrink: size word 1 with the high bit set.
    assert_eq!(&out[HEADER_LEN..HEADER_LEN + 4], &[0x01, 0x00, 0x00, 0x80]);
    assert_eq!(out[HEADER_LEN + 4], 0x41);
    // EOS, then XXH32("A").
    assert_eq!(&out[HEADER_LEN + 5..HEADER_LEN + 9], &[0, 0, 0, 0]);
    assert_eq!(
        &out[HEADER_LEN + 9..],
        &xxh32_oneshot(b"A", 0).to_le_bytes()
    );

    assert_eq!(decompress_frame_to_vec(&out, Mode::Parallel).unwrap(), b"A");
}

#[test]
fn zeros_split_into_four_compressed_blocks() {
    let data = vec![0u8; 256 * 1024];
    let out = compress_frame_to_vec(&data, &descriptor(4, false), Mode::Parallel).unwrap();

    let blocks = walk_blocks(&out, false);
    assert_eq!(blocks.len(), 4, "256 KiB at 64 KiB blocks");
    for &(_, size, raw) in &blocks {
        assert!(!raw, "zeros must compress");
        assert!(size < 64 * 1024);
    }

    assert_eq!(decompress_frame_to_vec(&out, Mode::Parallel).unwrap(), data);
}

#[test]
fn corrupted_block_payload_trips_block_checksum() {
    let data = vec![0u8; 256 * 1024];
    let mut out = compress_frame_to_vec(&data, &descriptor(4, true), Mode::Parallel).unwrap();

    // Flip the last payload byte of block #2 (a trailing literal, so the
    // block still decompresses and the payload hash is what catches it).
    let blocks = walk_blocks(&out, true);
    assert_eq!(blocks.len(), 4);
    let (off, size, _) = blocks[2];
    out[off + 4 + size - 1] ^= 0xFF;

    assert_eq!(
        decompress_frame_to_vec(&out, Mode::Parallel),
        Err(FrameError::BlockChecksumMismatch)
    );
}

#[test]
fn concatenated_frames_decode_back_to_back() {
    let mut joined =
        compress_frame_to_vec(b"", &FrameDescriptor::default(), Mode::Parallel).unwrap();
    joined.extend(compress_frame_to_vec(b"A", &FrameDescriptor::default(), Mode::Parallel).unwrap());

    assert_eq!(decompress_frame_to_vec(&joined, Mode::Parallel).unwrap(), b"A");
}

#[test]
fn invalid_magic_rewinds_four_bytes() {
    let mut bytes =
        compress_frame_to_vec(b"payload", &FrameDescriptor::default(), Mode::Parallel).unwrap();
    bytes[0] = 0x05;

    let mut src = ReaderSource::new(Cursor::new(bytes.as_slice()));
    let mut out = Vec::new();
    assert_eq!(
        decompress(&mut src, &mut out, &Lz4Codec, Mode::Parallel),
        Err(FrameError::InvalidMagicNumber)
    );
    // The cursor sits back on the offending word.
    assert_eq!(src.into_inner().position(), 0);
}

// ─────────────────────────────────────────────────────────────────────────────
// Round-trip properties
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn roundtrip_across_descriptors_and_inputs() {
    let corpora: Vec<Vec<u8>> = vec![
        Vec::new(),
        b"hello frame".to_vec(),
        patterned(64 * 1024),     // exactly one 64 KiB block
        patterned(64 * 1024 + 1), // one full block plus one byte
        patterned(300 * 1024),    // several blocks at id 4
        noise(80 * 1024),         // incompressible, stored raw
    ];
    for id in [4u8, 7] {
        for block_checksum in [false, true] {
            for stream_checksum in [false, true] {
                let mut sd = descriptor(id, block_checksum);
                sd.flg.stream_checksum = stream_checksum;
                for data in &corpora {
                    let framed = compress_frame_to_vec(data, &sd, Mode::Parallel).unwrap();
                    let restored = decompress_frame_to_vec(&framed, Mode::Parallel).unwrap();
                    assert_eq!(
                        &restored, data,
                        "id={id} bc={block_checksum} sc={stream_checksum} len={}",
                        data.len()
                    );
                }
            }
        }
    }
}

#[test]
fn content_size_field_roundtrips() {
    let data = patterned(100_000);
    let mut sd = descriptor(4, false);
    sd.flg.stream_size = true;
    sd.stream_size = data.len() as u64;

    let framed = compress_frame_to_vec(&data, &sd, Mode::Parallel).unwrap();
    assert_eq!(
        &framed[6..14],
        &(data.len() as u64).to_le_bytes(),
        "content size sits after FLG/BD"
    );
    assert_eq!(decompress_frame_to_vec(&framed, Mode::Parallel).unwrap(), data);
}

#[test]
fn parallel_output_is_byte_identical_to_sequential() {
    let data = patterned(1024 * 1024 + 12_345);
    for sd in [descriptor(4, false), descriptor(4, true), descriptor(5, true)] {
        let par = compress_frame_to_vec(&data, &sd, Mode::Parallel).unwrap();
        let seq = compress_frame_to_vec(&data, &sd, Mode::Sequential).unwrap();
        assert_eq!(par, seq);

        assert_eq!(
            decompress_frame_to_vec(&par, Mode::Parallel).unwrap(),
            decompress_frame_to_vec(&par, Mode::Sequential).unwrap()
        );
    }
}

#[test]
fn payload_corruption_is_never_silent() {
    let data = patterned(200 * 1024);
    let clean = compress_frame_to_vec(&data, &descriptor(4, false), Mode::Parallel).unwrap();

    for (off, size, _) in walk_blocks(&clean, false) {
        // Flip one byte in the middle and one at the end of each payload.
        for pos in [off + 4 + size / 2, off + 4 + size - 1] {
            let mut bad = clean.clone();
            bad[pos] ^= 0x01;
            let got = decompress_frame_to_vec(&bad, Mode::Parallel);
            assert!(
                matches!(
                    got,
                    Err(FrameError::StreamChecksumMismatch)
                        | Err(FrameError::BlockChecksumMismatch)
                        | Err(FrameError::DecompressFail)
                ),
                "flip at {pos} must fail loudly, got {got:?}"
            );
        }
    }
}

#[test]
fn skippable_frames_are_discarded() {
    let first = compress_frame_to_vec(b"left", &FrameDescriptor::default(), Mode::Parallel).unwrap();
    let second =
        compress_frame_to_vec(b"right", &FrameDescriptor::default(), Mode::Parallel).unwrap();

    let mut skippable = 0x184D_2A53u32.to_le_bytes().to_vec();
    skippable.extend_from_slice(&11u32.to_le_bytes());
    skippable.extend_from_slice(b"ignore this");

    // Leading and interleaved skippable frames.
    let mut stream = skippable.clone();
    stream.extend_from_slice(&first);
    stream.extend_from_slice(&skippable);
    stream.extend_from_slice(&second);

    assert_eq!(
        decompress_frame_to_vec(&stream, Mode::Parallel).unwrap(),
        b"leftright"
    );
}

// ─────────────────────────────────────────────────────────────────────────────
// Error paths
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn truncated_payload_reports_block_data() {
    let out = compress_frame_to_vec(&patterned(50_000), &descriptor(4, false), Mode::Parallel)
        .unwrap();
    let blocks = walk_blocks(&out, false);
    let (off, _, _) = blocks[0];
    // Cut the stream in the middle of the first payload.
    assert_eq!(
        decompress_frame_to_vec(&out[..off + 10], Mode::Parallel),
        Err(FrameError::CannotReadBlockData)
    );
}

#[test]
fn truncated_size_word_reports_block_size() {
    let out = compress_frame_to_vec(&patterned(50_000), &descriptor(4, false), Mode::Parallel)
        .unwrap();
    // Keep the header plus two bytes of the first size word.
    assert_eq!(
        decompress_frame_to_vec(&out[..HEADER_LEN + 2], Mode::Parallel),
        Err(FrameError::CannotReadBlockSize)
    );
}

#[test]
fn truncated_block_checksum_is_reported() {
    let out =
        compress_frame_to_vec(&patterned(50_000), &descriptor(4, true), Mode::Parallel).unwrap();
    let (off, size, _) = walk_blocks(&out, true)[0];
    // End the stream after the payload, inside its checksum.
    assert_eq!(
        decompress_frame_to_vec(&out[..off + 4 + size + 2], Mode::Parallel),
        Err(FrameError::CannotReadBlockChecksum)
    );
}

#[test]
fn missing_stream_checksum_is_reported() {
    let out = compress_frame_to_vec(b"abc", &FrameDescriptor::default(), Mode::Parallel).unwrap();
    // Drop the trailing digest, keep the EOS marker.
    assert_eq!(
        decompress_frame_to_vec(&out[..out.len() - 4], Mode::Parallel),
        Err(FrameError::CannotReadStreamChecksum)
    );
}

#[test]
fn corrupted_stream_checksum_is_a_mismatch() {
    let mut out =
        compress_frame_to_vec(&patterned(1000), &FrameDescriptor::default(), Mode::Parallel)
            .unwrap();
    let last = out.len() - 1;
    out[last] ^= 0xFF;
    assert_eq!(
        decompress_frame_to_vec(&out, Mode::Parallel),
        Err(FrameError::StreamChecksumMismatch)
    );
}

#[test]
fn oversized_block_size_word_is_rejected() {
    let mut out =
        compress_frame_to_vec(&patterned(1000), &descriptor(4, false), Mode::Parallel).unwrap();
    // Claim a 2 MiB payload in a 64 KiB frame (high bit clear).
    out[HEADER_LEN..HEADER_LEN + 4].copy_from_slice(&(2u32 << 20).to_le_bytes());
    assert_eq!(
        decompress_frame_to_vec(&out, Mode::Parallel),
        Err(FrameError::CannotReadBlockData)
    );
}

#[test]
fn invalid_descriptor_rejects_before_compressing() {
    let mut sd = FrameDescriptor::default();
    sd.bd.block_maximum_size = 2;
    assert_eq!(
        compress_frame_to_vec(b"data", &sd, Mode::Parallel),
        Err(FrameError::InvalidBlockMaximumSize)
    );

    let mut sd = FrameDescriptor::default();
    sd.flg.block_independence = false;
    assert_eq!(
        compress_frame_to_vec(b"data", &sd, Mode::Parallel),
        Err(FrameError::BlockDependenceNotSupported)
    );

    let mut sd = FrameDescriptor::default();
    sd.flg.preset_dictionary = true;
    assert_eq!(
        compress_frame_to_vec(b"data", &sd, Mode::Parallel),
        Err(FrameError::PresetDictionaryNotSupported)
    );
}

/// A sink that accepts `limit` bytes and fails afterwards.
struct FailingWriter {
    limit: usize,
    written: usize,
}

impl FailingWriter {
    fn new(limit: usize) -> Self {
        FailingWriter { limit, written: 0 }
    }
}

impl Write for FailingWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.written + buf.len() > self.limit {
            return Err(io::Error::other("sink full"));
        }
        self.written += buf.len();
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[test]
fn header_write_failure_is_reported() {
    let mut src = ReaderSource::from_slice(b"data");
    let mut sink = FailingWriter::new(0);
    assert_eq!(
        compress(&mut src, &mut sink, &Lz4Codec, &FrameDescriptor::default(), Mode::Parallel),
        Err(FrameError::CannotWriteHeader)
    );
}

#[test]
fn eos_write_failure_is_reported() {
    // Empty input: the 7-byte header fits, the EOS marker does not.
    let mut src = ReaderSource::from_slice(b"");
    let mut sink = FailingWriter::new(HEADER_LEN);
    assert_eq!(
        compress(&mut src, &mut sink, &Lz4Codec, &FrameDescriptor::default(), Mode::Parallel),
        Err(FrameError::CannotWriteEos)
    );
}

#[test]
fn stream_checksum_write_failure_is_reported() {
    // Header plus EOS fit, the trailing digest does not.
    let mut src = ReaderSource::from_slice(b"");
    let mut sink = FailingWriter::new(HEADER_LEN + 4);
    assert_eq!(
        compress(&mut src, &mut sink, &Lz4Codec, &FrameDescriptor::default(), Mode::Parallel),
        Err(FrameError::CannotWriteStreamChecksum)
    );
}

#[test]
fn block_write_failure_surfaces_as_eos_failure() {
    // The header fits; the first block's write fails inside a task, and the
    // driver refines the latched failure at the EOS step.
    let data = patterned(10_000);
    let mut src = ReaderSource::from_slice(&data);
    let mut sink = FailingWriter::new(HEADER_LEN);
    assert_eq!(
        compress(&mut src, &mut sink, &Lz4Codec, &FrameDescriptor::default(), Mode::Parallel),
        Err(FrameError::CannotWriteEos)
    );
}

// ─────────────────────────────────────────────────────────────────────────────
// Codec seam
// ─────────────────────────────────────────────────────────────────────────────

/// A codec that always declines to compress.
struct StoreOnly;

impl BlockCodec for StoreOnly {
    fn compress(&self, _src: &[u8], _dst: &mut [u8]) -> i32 {
        0
    }

    fn decompress(&self, src: &[u8], dst: &mut [u8]) -> i32 {
        dst[..src.len()].copy_from_slice(src);
        src.len() as i32
    }
}

#[test]
fn declining_codec_stores_every_block_raw() {
    let data = patterned(150 * 1024);
    let mut src = ReaderSource::from_slice(&data);
    let mut out = Vec::new();
    compress(&mut src, &mut out, &StoreOnly, &descriptor(4, false), Mode::Parallel).unwrap();

    let blocks = walk_blocks(&out, false);
    assert_eq!(blocks.len(), 3);
    assert!(blocks.iter().all(|&(_, _, raw)| raw));

    // Raw blocks bypass the codec on the way back, so Lz4Codec decodes them.
    assert_eq!(decompress_frame_to_vec(&out, Mode::Parallel).unwrap(), data);
}

/// A codec whose decompression always fails.
struct BrokenDecoder;

impl BlockCodec for BrokenDecoder {
    fn compress(&self, src: &[u8], dst: &mut [u8]) -> i32 {
        Lz4Codec.compress(src, dst)
    }

    fn decompress(&self, _src: &[u8], _dst: &mut [u8]) -> i32 {
        -1
    }
}

#[test]
fn failing_decompression_is_fatal() {
    let framed = compress_frame_to_vec(&vec![0u8; 50_000], &descriptor(4, false), Mode::Parallel)
        .unwrap();
    let mut src = ReaderSource::from_slice(&framed);
    let mut out = Vec::new();
    assert_eq!(
        decompress(&mut src, &mut out, &BrokenDecoder, Mode::Parallel),
        Err(FrameError::DecompressFail)
    );
}

// ─────────────────────────────────────────────────────────────────────────────
// Sources: files and pipes
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn file_source_roundtrips_through_pipe_source() {
    let data = patterned(500 * 1024);
    let mut tmp = tempfile::NamedTempFile::new().unwrap();
    tmp.write_all(&data).unwrap();
    tmp.flush().unwrap();

    let file = std::fs::File::open(tmp.path()).unwrap();
    let mut src = ReaderSource::new(BufReader::new(file));
    let mut framed = Vec::new();
    compress(&mut src, &mut framed, &Lz4Codec, &descriptor(5, true), Mode::Parallel).unwrap();

    // Decode through the non-seekable adapter.
    let mut pipe = PipeSource::new(framed.as_slice());
    let mut out = Vec::new();
    decompress(&mut pipe, &mut out, &Lz4Codec, Mode::Parallel).unwrap();
    assert_eq!(out, data);
}

#[test]
fn sequential_mode_roundtrips() {
    let data = patterned(200 * 1024);
    let framed = compress_frame_to_vec(&data, &descriptor(4, true), Mode::Sequential).unwrap();
    assert_eq!(
        decompress_frame_to_vec(&framed, Mode::Sequential).unwrap(),
        data
    );
}
