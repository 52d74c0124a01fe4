//! Gzip identification: parses the fixed member header plus any optional
//! RFC 1952 fields, then scans forward for the next gzip magic or EOF to
//! delimit the member. Determining the true end of the compressed stream
//! would require inflating it, which this demonstrator does not do.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

use memchr::memchr;

use crate::unpacker::{ProducedFile, UnpackFailure, UnpackSuccess, UnpackVerdict, Unpacker};

const GZIP_MAGIC: [u8; 3] = [0x1F, 0x8B, 0x08];
const SCAN_CHUNK: usize = 64 * 1024;
/// The member's compressed bytes are copied out under this name; this
/// engine does not inflate, so the child is the still-compressed blob.
const CHILD_NAME: &str = "gzip_content";

pub struct GzipUnpacker;

impl Unpacker for GzipUnpacker {
    fn try_unpack(
        &self,
        input_path: &Path,
        offset: u64,
        target_dir: &Path,
        _temp_dir: Option<&Path>,
    ) -> UnpackVerdict {
        delimit(input_path, offset, target_dir).map_err(|reason| UnpackFailure::new(offset, reason))
    }
}

fn delimit(input_path: &Path, offset: u64, target_dir: &Path) -> Result<UnpackSuccess, String> {
    let header_len = parse_header(input_path, offset)?;
    let file_len = std::fs::metadata(input_path)
        .map_err(|e| e.to_string())?
        .len();

    let mut file = File::open(input_path).map_err(|e| e.to_string())?;
    let mut cursor = offset + header_len;
    let mut carry: Vec<u8> = Vec::new();
    let mut end_offset = None;

    loop {
        if cursor >= file_len {
            end_offset = Some(file_len);
            break;
        }
        file.seek(SeekFrom::Start(cursor)).map_err(|e| e.to_string())?;
        let want = SCAN_CHUNK.min((file_len - cursor) as usize);
        let mut buf = vec![0u8; want];
        let n = read_best_effort(&mut file, &mut buf)?;
        buf.truncate(n);
        if buf.is_empty() {
            end_offset = Some(cursor);
            break;
        }

        let mut window = carry.clone();
        window.extend_from_slice(&buf);
        if let Some(pos) = find_gzip_magic(&window, 0) {
            let match_offset = cursor - carry.len() as u64 + pos as u64;
            if match_offset > offset {
                end_offset = Some(match_offset);
                break;
            }
        }

        cursor += buf.len() as u64;
        carry = if buf.len() >= GZIP_MAGIC.len() - 1 {
            buf[buf.len() - (GZIP_MAGIC.len() - 1)..].to_vec()
        } else {
            buf
        };
    }

    let end_offset = end_offset.unwrap();
    let consumed_length = end_offset - offset;
    copy_range(input_path, offset, consumed_length, &target_dir.join(CHILD_NAME))?;

    Ok(UnpackSuccess {
        consumed_length,
        produced: vec![ProducedFile::new(CHILD_NAME, Vec::<String>::new())],
        new_labels: std::iter::once("gzip".to_string()).collect(),
    })
}

fn copy_range(input_path: &Path, offset: u64, len: u64, dest: &Path) -> Result<(), String> {
    let mut src = File::open(input_path).map_err(|e| e.to_string())?;
    src.seek(SeekFrom::Start(offset)).map_err(|e| e.to_string())?;
    let mut dst = File::create(dest).map_err(|e| e.to_string())?;

    let mut remaining = len;
    let mut buf = vec![0u8; SCAN_CHUNK];
    while remaining > 0 {
        let want = (buf.len() as u64).min(remaining) as usize;
        let n = src.read(&mut buf[..want]).map_err(|e| e.to_string())?;
        if n == 0 {
            break;
        }
        dst.write_all(&buf[..n]).map_err(|e| e.to_string())?;
        remaining -= n as u64;
    }
    Ok(())
}

fn read_best_effort(file: &mut File, buf: &mut [u8]) -> Result<usize, String> {
    let mut filled = 0usize;
    while filled < buf.len() {
        let n = file.read(&mut buf[filled..]).map_err(|e| e.to_string())?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    Ok(filled)
}

fn find_gzip_magic(haystack: &[u8], from: usize) -> Option<usize> {
    if from >= haystack.len() {
        return None;
    }
    let mut pos = from;
    while pos < haystack.len() {
        let found = pos + memchr(GZIP_MAGIC[0], &haystack[pos..])?;
        if found + GZIP_MAGIC.len() <= haystack.len()
            && haystack[found..found + GZIP_MAGIC.len()] == GZIP_MAGIC
        {
            return Some(found);
        }
        pos = found + 1;
    }
    None
}

fn parse_header(input_path: &Path, offset: u64) -> Result<u64, String> {
    let fixed = super::read_exact_at(input_path, offset, 10)
        .map_err(|e| e.to_string())?
        .ok_or_else(|| "gzip header too short".to_string())?;
    if fixed[0..3] != GZIP_MAGIC {
        return Err("gzip magic mismatch".to_string());
    }
    let flags = fixed[3];
    let mut cursor = offset + 10;

    if flags & 0x04 != 0 {
        let extra_len = super::read_exact_at(input_path, cursor, 2)
            .map_err(|e| e.to_string())?
            .ok_or_else(|| "gzip extra len missing".to_string())?;
        let xlen = u16::from_le_bytes([extra_len[0], extra_len[1]]) as u64;
        cursor = cursor.saturating_add(2 + xlen);
    }
    if flags & 0x08 != 0 {
        cursor = skip_cstring(input_path, cursor)?;
    }
    if flags & 0x10 != 0 {
        cursor = skip_cstring(input_path, cursor)?;
    }
    if flags & 0x02 != 0 {
        cursor = cursor.saturating_add(2);
    }

    Ok(cursor - offset)
}

fn skip_cstring(input_path: &Path, mut offset: u64) -> Result<u64, String> {
    for _ in 0..(1024 * 1024) {
        let byte = super::read_exact_at(input_path, offset, 1)
            .map_err(|e| e.to_string())?
            .ok_or_else(|| "gzip string truncated".to_string())?;
        offset += 1;
        if byte[0] == 0 {
            return Ok(offset);
        }
    }
    Err("gzip string too long".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::tempdir;

    fn minimal_gzip_member() -> Vec<u8> {
        let mut data = Vec::new();
        data.extend_from_slice(&[0x1F, 0x8B, 0x08, 0x00]);
        data.extend_from_slice(&[0x00; 6]);
        data.extend_from_slice(b"DATA");
        data
    }

    #[test]
    fn delimits_at_next_gzip_header() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("x.bin");
        let mut data = minimal_gzip_member();
        let second = minimal_gzip_member();
        data.extend_from_slice(&second);
        std::fs::File::create(&path).unwrap().write_all(&data).unwrap();

        let unpacker = GzipUnpacker;
        let success = unpacker.try_unpack(&path, 0, dir.path(), None).expect("gzip");
        assert_eq!(success.consumed_length, minimal_gzip_member().len() as u64);
        assert_eq!(success.produced.len(), 1);
        assert_eq!(
            std::fs::read(dir.path().join(CHILD_NAME)).unwrap().len(),
            minimal_gzip_member().len()
        );
    }

    #[test]
    fn delimits_at_eof_when_no_second_member() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("x.bin");
        let data = minimal_gzip_member();
        std::fs::File::create(&path).unwrap().write_all(&data).unwrap();

        let unpacker = GzipUnpacker;
        let success = unpacker.try_unpack(&path, 0, dir.path(), None).expect("gzip");
        assert_eq!(success.consumed_length, data.len() as u64);
    }

    #[test]
    fn rejects_non_gzip_data() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("x.bin");
        std::fs::write(&path, [0u8; 16]).unwrap();

        let unpacker = GzipUnpacker;
        assert!(unpacker.try_unpack(&path, 0, dir.path(), None).is_err());
    }
}
