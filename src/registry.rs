//! Signature Registry: an immutable catalogue of byte anchors bound to
//! unpackers.
//!
//! Mirrors the teacher's `CarveRegistry` shape (a name-keyed table of boxed
//! handlers) but keyed on the raw signature rather than the file-type id,
//! since one display name can be shared by several signatures (e.g.
//! multiple LZMA dictionary sizes all called "lzma").

use std::sync::Arc;

use crate::unpacker::Unpacker;

/// A single registered anchor.
pub struct Signature {
    /// Unique key, e.g. `"png"`, `"tar_ustar"`.
    pub key: String,
    pub pattern: Vec<u8>,
    /// Offset of `pattern` within a recognized file. Default 0.
    pub intra_offset: u64,
    /// Shared across signatures that recognize variants of one format.
    pub display_name: String,
    pub handler: Arc<dyn Unpacker>,
}

pub struct SignatureRegistry {
    signatures: Vec<Signature>,
    max_pattern_len: usize,
    max_intra_offset: u64,
}

impl SignatureRegistry {
    /// Builds a registry from a fixed set of signatures. Panics if a
    /// pattern is empty or longer than 16 bytes, since the registry is
    /// meant to be built once at startup from a small, trusted set.
    pub fn new(signatures: Vec<Signature>) -> Self {
        let mut max_pattern_len = 0usize;
        let mut max_intra_offset = 0u64;
        for sig in &signatures {
            assert!(
                !sig.pattern.is_empty() && sig.pattern.len() <= 16,
                "signature {} has an invalid pattern length",
                sig.key
            );
            max_pattern_len = max_pattern_len.max(sig.pattern.len());
            max_intra_offset = max_intra_offset.max(sig.intra_offset);
        }
        // overlap size: the worst case is a pattern sitting right at the
        // largest intra_offset, still needing its full length visible.
        let max_intra_offset = max_intra_offset + max_pattern_len as u64;
        Self {
            signatures,
            max_pattern_len,
            max_intra_offset,
        }
    }

    pub fn signatures(&self) -> &[Signature] {
        &self.signatures
    }

    pub fn max_pattern_len(&self) -> usize {
        self.max_pattern_len
    }

    /// Overlap size required by the sliding-window scanner so that no
    /// pattern straddling a chunk boundary is missed.
    pub fn overlap(&self) -> u64 {
        self.max_intra_offset
    }

    pub fn handler(&self, key: &str) -> Option<&Arc<dyn Unpacker>> {
        self.signatures
            .iter()
            .find(|s| s.key == key)
            .map(|s| &s.handler)
    }

    pub fn display_name(&self, key: &str) -> Option<&str> {
        self.signatures
            .iter()
            .find(|s| s.key == key)
            .map(|s| s.display_name.as_str())
    }
}

/// Builds the default registry wired to the demonstrator unpackers.
pub fn default_registry() -> SignatureRegistry {
    use crate::handlers::{gzip::GzipUnpacker, lzma::LzmaUnpacker, png::PngUnpacker, tar::TarUnpacker};

    SignatureRegistry::new(vec![
        Signature {
            key: "png".to_string(),
            pattern: vec![0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A],
            intra_offset: 0,
            display_name: "png".to_string(),
            handler: Arc::new(PngUnpacker),
        },
        Signature {
            key: "gzip".to_string(),
            pattern: vec![0x1F, 0x8B, 0x08],
            intra_offset: 0,
            display_name: "gzip".to_string(),
            handler: Arc::new(GzipUnpacker),
        },
        Signature {
            key: "tar_ustar".to_string(),
            pattern: b"ustar".to_vec(),
            intra_offset: 257,
            display_name: "tar".to_string(),
            handler: Arc::new(TarUnpacker),
        },
        Signature {
            key: "lzma".to_string(),
            // Classic LZMA-alone headers commonly start with a properties
            // byte of 0x5D (lc=3, lp=0, pb=2) followed by the default 1 MiB
            // dictionary size, little-endian.
            pattern: vec![0x5D, 0x00, 0x00],
            intra_offset: 0,
            display_name: "lzma".to_string(),
            handler: Arc::new(LzmaUnpacker),
        },
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overlap_is_max_intra_offset_plus_max_pattern_len() {
        let reg = default_registry();
        // The constructor combines the global max intra_offset (257, from
        // tar_ustar) with the global max pattern length (8, from png's
        // 8-byte magic) rather than pairing each signature with its own
        // pattern length: 257 + 8 = 265.
        assert_eq!(reg.overlap(), 265);
        assert_eq!(reg.max_pattern_len(), 8);
    }

    #[test]
    fn handler_lookup_by_key() {
        let reg = default_registry();
        assert!(reg.handler("png").is_some());
        assert!(reg.handler("nonexistent").is_none());
        assert_eq!(reg.display_name("tar_ustar"), Some("tar"));
    }
}
