//! Classic LZMA-alone header identification: checks the 13-byte header
//! (properties byte, 4-byte little-endian dictionary size, 8-byte
//! little-endian uncompressed size) for internal consistency. This is a
//! demonstrator, not a real LZMA decoder: it never inflates the stream,
//! so it only accepts headers that declare a known, bounded uncompressed
//! size. A header whose size field is the "unknown" sentinel, or whose
//! properties byte is out of range, is rejected — which is exactly what
//! happens when the magic bytes show up by coincidence in unrelated data.

use std::path::Path;

use crate::unpacker::{UnpackFailure, UnpackSuccess, UnpackVerdict, Unpacker};

const HEADER_LEN: usize = 13;
const MAX_PROPERTIES_BYTE: u8 = 9 * 5 * 5 - 1;
/// Reject declared uncompressed sizes above this; a real stream this
/// large would need actual decompression to delimit safely.
const MAX_DECLARED_SIZE: u64 = 64 * 1024 * 1024;

pub struct LzmaUnpacker;

impl Unpacker for LzmaUnpacker {
    fn try_unpack(
        &self,
        input_path: &Path,
        offset: u64,
        _target_dir: &Path,
        _temp_dir: Option<&Path>,
    ) -> UnpackVerdict {
        check(input_path, offset).map_err(|reason| UnpackFailure::new(offset, reason))
    }
}

fn check(input_path: &Path, offset: u64) -> Result<UnpackSuccess, String> {
    let header = super::read_exact_at(input_path, offset, HEADER_LEN)
        .map_err(|e| e.to_string())?
        .ok_or_else(|| "lzma header too short".to_string())?;

    let properties = header[0];
    if properties > MAX_PROPERTIES_BYTE {
        return Err("lzma properties byte out of range".to_string());
    }

    let dict_size = u32::from_le_bytes([header[1], header[2], header[3], header[4]]);
    if dict_size == 0 {
        return Err("lzma dictionary size is zero".to_string());
    }

    let mut size_bytes = [0u8; 8];
    size_bytes.copy_from_slice(&header[5..13]);
    let uncompressed_size = u64::from_le_bytes(size_bytes);
    if uncompressed_size == u64::MAX {
        return Err("lzma uncompressed size unknown".to_string());
    }
    if uncompressed_size > MAX_DECLARED_SIZE {
        return Err("lzma declared size exceeds the demonstrator bound".to_string());
    }

    let file_len = std::fs::metadata(input_path)
        .map_err(|e| e.to_string())?
        .len();
    let remaining = file_len.saturating_sub(offset + HEADER_LEN as u64);
    let consumed_length = HEADER_LEN as u64 + uncompressed_size.min(remaining);

    Ok(UnpackSuccess {
        consumed_length,
        produced: Vec::new(),
        new_labels: std::iter::once("lzma".to_string()).collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn header(properties: u8, dict_size: u32, uncompressed_size: u64) -> Vec<u8> {
        let mut data = vec![properties];
        data.extend_from_slice(&dict_size.to_le_bytes());
        data.extend_from_slice(&uncompressed_size.to_le_bytes());
        data
    }

    #[test]
    fn accepts_a_consistent_small_header() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("x.bin");
        let mut data = header(0x5D, 1 << 20, 100);
        data.extend_from_slice(&[0u8; 100]);
        std::fs::write(&path, &data).unwrap();

        let unpacker = LzmaUnpacker;
        let success = unpacker.try_unpack(&path, 0, dir.path(), None).expect("lzma");
        assert_eq!(success.consumed_length, HEADER_LEN as u64 + 100);
    }

    #[test]
    fn rejects_unknown_size_sentinel() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("x.bin");
        let data = header(0x5D, 1 << 20, u64::MAX);
        std::fs::write(&path, &data).unwrap();

        let unpacker = LzmaUnpacker;
        assert!(unpacker.try_unpack(&path, 0, dir.path(), None).is_err());
    }

    #[test]
    fn rejects_coincidental_magic_in_text() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("x.bin");
        // Looks like the 3-byte registry pattern but the rest of the
        // "header" is arbitrary English text, not a real LZMA stream.
        let data = b"]\x00\x00 it was a bright cold day in april".to_vec();
        std::fs::write(&path, &data).unwrap();

        let unpacker = LzmaUnpacker;
        assert!(unpacker.try_unpack(&path, 0, dir.path(), None).is_err());
    }
}
