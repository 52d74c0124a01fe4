//! Sliding-Window Scanner: reads a file in overlapping chunks and emits
//! candidate (offset, signature) pairs for the dispatcher.

use std::collections::BTreeSet;
use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::Path;

use memchr::memchr;

use crate::registry::SignatureRegistry;

/// Default chunk size: ~2 MiB, per the scanner's design note.
pub const DEFAULT_CHUNK_SIZE: usize = 2 * 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct Candidate {
    pub offset: u64,
    pub signature_key: String,
}

/// Streaming text/binary probe with a one-way latch: once a non-printable
/// byte is seen, the probe stops testing further chunks.
#[derive(Default)]
pub struct TextProbe {
    latched_binary: bool,
}

impl TextProbe {
    pub fn feed(&mut self, data: &[u8]) {
        if self.latched_binary {
            return;
        }
        for &b in data {
            if !is_printable(b) {
                self.latched_binary = true;
                return;
            }
        }
    }

    pub fn label(&self) -> &'static str {
        if self.latched_binary { "binary" } else { "text" }
    }
}

fn is_printable(b: u8) -> bool {
    matches!(b, 0x09 | 0x0A | 0x0D | 0x20..=0x7E)
}

/// Scans `path` for every registered signature, invoking `on_batch` with
/// the sorted, deduplicated candidates found beyond `start_offset` after
/// each chunk read, and `on_chunk` with every chunk's bytes for the text
/// probe. Stops reading once `start_offset` (which the caller advances as
/// it carves ranges) reaches EOF.
///
/// `start_offset` is re-read from `next_offset` before every chunk so the
/// caller's dispatcher can advance past already-carved data mid-scan.
pub struct SlidingWindowScanner<'a> {
    registry: &'a SignatureRegistry,
    chunk_size: usize,
}

impl<'a> SlidingWindowScanner<'a> {
    pub fn new(registry: &'a SignatureRegistry) -> Self {
        Self {
            registry,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }

    #[cfg(test)]
    pub fn with_chunk_size(registry: &'a SignatureRegistry, chunk_size: usize) -> Self {
        Self {
            registry,
            chunk_size,
        }
    }

    /// Runs the scan loop. `next_offset` starts at 0 (or wherever the
    /// caller wants to resume) and is read fresh before each chunk so the
    /// dispatcher's carving can move it forward between chunks; the
    /// scanner itself never decreases it below the previous chunk's valid
    /// window minus the registry's overlap.
    pub fn scan<F>(
        &self,
        path: &Path,
        probe: &mut TextProbe,
        mut next_offset: impl FnMut() -> u64,
        mut on_batch: F,
    ) -> io::Result<()>
    where
        F: FnMut(&[Candidate]),
    {
        let overlap = self.registry.overlap();
        let mut file = File::open(path)?;
        let file_len = file.metadata()?.len();

        let mut read_head = next_offset();
        loop {
            let last_unpacked = next_offset();
            let chunk_start = if last_unpacked > read_head {
                last_unpacked
            } else {
                read_head.saturating_sub(overlap).max(last_unpacked)
            };
            if chunk_start >= file_len {
                break;
            }

            file.seek(SeekFrom::Start(chunk_start))?;
            let want = self.chunk_size.min((file_len - chunk_start) as usize);
            let mut buf = vec![0u8; want];
            let mut filled = 0usize;
            while filled < want {
                let n = file.read(&mut buf[filled..])?;
                if n == 0 {
                    break;
                }
                filled += n;
            }
            buf.truncate(filled);
            if buf.is_empty() {
                break;
            }

            probe.feed(&buf);

            let mut candidates = BTreeSet::new();
            for sig in self.registry.signatures() {
                find_pattern_matches(&buf, &sig.pattern, |local_pos| {
                    let global_pos = chunk_start + local_pos as u64;
                    let start = global_pos as i128 - sig.intra_offset as i128;
                    if start < 0 {
                        return;
                    }
                    candidates.insert(Candidate {
                        offset: start as u64,
                        signature_key: sig.key.clone(),
                    });
                });
            }

            let last_unpacked_after = next_offset();
            let batch: Vec<Candidate> = candidates
                .into_iter()
                .filter(|c| c.offset >= last_unpacked_after)
                .collect();
            if !batch.is_empty() {
                on_batch(&batch);
            }

            read_head = chunk_start + buf.len() as u64;
            if (filled as u64) < want as u64 || read_head >= file_len {
                break;
            }
        }

        Ok(())
    }
}

/// Finds all non-overlapping occurrences of `pattern` in `haystack`,
/// invoking `on_match` with each local start position.
fn find_pattern_matches(haystack: &[u8], pattern: &[u8], mut on_match: impl FnMut(usize)) {
    if pattern.is_empty() || haystack.len() < pattern.len() {
        return;
    }
    let first = pattern[0];
    let mut pos = 0usize;
    while pos < haystack.len() {
        let found = match memchr(first, &haystack[pos..]) {
            Some(i) => pos + i,
            None => break,
        };
        if found + pattern.len() <= haystack.len() && haystack[found..found + pattern.len()] == *pattern
        {
            on_match(found);
        }
        pos = found + 1;
    }
}
