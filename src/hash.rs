//! Streaming triple-hash: MD5, SHA-1, SHA-256 computed in one pass so the
//! file is only read once regardless of how many digests are wanted.

use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use sha1::Sha1;
use sha2::{Digest, Sha256};

/// 10 MB, per the classification design note.
const HASH_CHUNK_SIZE: usize = 10 * 1024 * 1024;

pub struct Digests {
    pub md5: String,
    pub sha1: String,
    pub sha256: String,
}

pub fn hash_file(path: &Path) -> io::Result<Digests> {
    let mut file = File::open(path)?;
    let mut md5 = md5::Context::new();
    let mut sha1 = Sha1::new();
    let mut sha256 = Sha256::new();

    let mut buf = vec![0u8; HASH_CHUNK_SIZE];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        md5.consume(&buf[..n]);
        sha1.update(&buf[..n]);
        sha256.update(&buf[..n]);
    }

    Ok(Digests {
        md5: format!("{:x}", md5.compute()),
        sha1: hex::encode(sha1.finalize()),
        sha256: hex::encode(sha256.finalize()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::tempdir;

    #[test]
    fn hashes_match_known_digests_for_empty_input() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("empty.bin");
        File::create(&path).unwrap();

        let digests = hash_file(&path).expect("hash");
        assert_eq!(digests.md5, "d41d8cd98f00b204e9800998ecf8427e");
        assert_eq!(digests.sha1, "da39a3ee5e6b4b0d3255bfef95601890afd80709");
        assert_eq!(
            digests.sha256,
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn hashes_small_file_across_multiple_algorithms() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("hello.bin");
        File::create(&path).unwrap().write_all(b"hello world").unwrap();

        let digests = hash_file(&path).expect("hash");
        assert_eq!(digests.md5, "5eb63bbbe01eeed093cb22bb8f5acdc3");
        assert_eq!(digests.sha1, "2aae6c35c94fcfb415dbe95f408b9ce91ee846ed");
        assert_eq!(
            digests.sha256,
            "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9"
        );
    }
}
