//! PNG identification: validates the signature, then walks chunk headers
//! until `IEND` to determine how much of the file the image occupies.
//! Produces no extracted children; PNG is a leaf format for this engine.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

use crate::unpacker::{UnpackFailure, UnpackSuccess, UnpackVerdict, Unpacker};

const PNG_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

pub struct PngUnpacker;

impl Unpacker for PngUnpacker {
    fn try_unpack(
        &self,
        input_path: &Path,
        offset: u64,
        _target_dir: &Path,
        _temp_dir: Option<&Path>,
    ) -> UnpackVerdict {
        walk(input_path, offset).map_err(|reason| UnpackFailure::new(offset, reason))
    }
}

fn walk(input_path: &Path, offset: u64) -> Result<UnpackSuccess, String> {
    let mut file = File::open(input_path).map_err(|e| e.to_string())?;
    file.seek(SeekFrom::Start(offset)).map_err(|e| e.to_string())?;

    let mut sig = [0u8; 8];
    read_exact(&mut file, &mut sig)?;
    if sig != PNG_SIGNATURE {
        return Err("png signature mismatch".to_string());
    }

    let mut cursor = offset + 8;
    loop {
        let mut len_bytes = [0u8; 4];
        read_exact(&mut file, &mut len_bytes)?;
        let len = u32::from_be_bytes(len_bytes) as u64;

        let mut chunk_type = [0u8; 4];
        read_exact(&mut file, &mut chunk_type)?;

        // Skip chunk data plus the trailing 4-byte CRC.
        file.seek(SeekFrom::Current(len as i64 + 4))
            .map_err(|e| e.to_string())?;
        cursor += 4 + 4 + len + 4;

        if &chunk_type == b"IEND" {
            return Ok(UnpackSuccess {
                consumed_length: cursor - offset,
                produced: Vec::new(),
                new_labels: std::iter::once("png".to_string()).collect(),
            });
        }
    }
}

fn read_exact(file: &mut File, buf: &mut [u8]) -> Result<(), String> {
    file.read_exact(buf)
        .map_err(|_| "truncated png stream".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::tempdir;

    fn sample_png() -> Vec<u8> {
        let mut data = Vec::new();
        data.extend_from_slice(&PNG_SIGNATURE);
        data.extend_from_slice(&[0x00, 0x00, 0x00, 0x0D]);
        data.extend_from_slice(b"IHDR");
        data.extend_from_slice(&[0u8; 13]);
        data.extend_from_slice(&[0x00; 4]);
        data.extend_from_slice(&[0x00, 0x00, 0x00, 0x00]);
        data.extend_from_slice(b"IEND");
        data.extend_from_slice(&[0x00; 4]);
        data
    }

    #[test]
    fn consumes_through_iend() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("x.bin");
        let png = sample_png();
        std::fs::File::create(&path).unwrap().write_all(&png).unwrap();

        let unpacker = PngUnpacker;
        let success = unpacker
            .try_unpack(&path, 0, dir.path(), None)
            .expect("png decodes");
        assert_eq!(success.consumed_length, png.len() as u64);
        assert!(success.produced.is_empty());
        assert!(success.new_labels.contains("png"));
    }

    #[test]
    fn rejects_bad_signature() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("x.bin");
        std::fs::write(&path, [0u8; 16]).unwrap();

        let unpacker = PngUnpacker;
        assert!(unpacker.try_unpack(&path, 0, dir.path(), None).is_err());
    }
}
