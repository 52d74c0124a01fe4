//! Demonstrator unpackers bound to the default signature registry.

pub mod gzip;
pub mod lzma;
pub mod png;
pub mod tar;

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

/// Reads exactly `len` bytes at `offset` from `path`, or `None` if the
/// file is shorter than that.
fn read_exact_at(path: &Path, offset: u64, len: usize) -> std::io::Result<Option<Vec<u8>>> {
    let mut file = File::open(path)?;
    file.seek(SeekFrom::Start(offset))?;
    let mut buf = vec![0u8; len];
    let mut filled = 0usize;
    while filled < len {
        let n = file.read(&mut buf[filled..])?;
        if n == 0 {
            return Ok(None);
        }
        filled += n;
    }
    Ok(Some(buf))
}
